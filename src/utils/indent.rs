//! Indentation helpers for moving declaration text between nesting levels.

/// Whitespace between the start of the line and `offset`, or nothing when
/// the line has other text before `offset`.
pub fn line_indent(text: &str, offset: usize) -> String {
    let line_start = text[..offset].rfind('\n').map_or(0, |idx| idx + 1);
    let prefix = &text[line_start..offset];
    if prefix.chars().all(|c| c == ' ' || c == '\t') {
        prefix.to_string()
    } else {
        String::new()
    }
}

/// Strip `indent` from every line but the first.
pub fn dedent(block: &str, indent: &str) -> String {
    let mut lines = block.split('\n');
    let mut out = String::with_capacity(block.len());
    if let Some(first) = lines.next() {
        out.push_str(first);
    }
    for line in lines {
        out.push('\n');
        out.push_str(line.strip_prefix(indent).unwrap_or(line));
    }
    out
}

/// Prefix every line but the first with `indent`. Blank lines stay blank.
pub fn reindent(text: &str, indent: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for (idx, line) in text.split('\n').enumerate() {
        if idx > 0 {
            out.push('\n');
            if !line.is_empty() {
                out.push_str(indent);
            }
        }
        out.push_str(line);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn indent_of_a_member_line() {
        let text = "class A {\n    void run() {}\n}\n";
        let offset = text.find("void").expect("member");
        assert_eq!(line_indent(text, offset), "    ");
        assert_eq!(line_indent(text, text.find("run").expect("name")), "");
    }

    #[test]
    fn dedent_then_reindent() {
        let block = "void run() {\n        go();\n    }";
        assert_eq!(dedent(block, "    "), "void run() {\n    go();\n}");
        assert_eq!(reindent("a\n  b\n\nc", "  "), "a\n    b\n\n  c");
    }
}
