//! Severity-ranked status accumulated across the phases of an operation.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Error,
    Fatal,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Severity::Info => "info",
            Severity::Warning => "warning",
            Severity::Error => "error",
            Severity::Fatal => "fatal",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusEntry {
    pub severity: Severity,
    pub message: String,
    /// Handle or path the entry is about, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Status {
    entries: Vec<StatusEntry>,
}

impl Status {
    pub fn ok() -> Self {
        Self::default()
    }

    pub fn fatal(message: impl Into<String>) -> Self {
        let mut status = Self::default();
        status.add(Severity::Fatal, message, None);
        status
    }

    pub fn add(&mut self, severity: Severity, message: impl Into<String>, context: Option<String>) {
        self.entries.push(StatusEntry { severity, message: message.into(), context });
    }

    pub fn add_info(&mut self, message: impl Into<String>) {
        self.add(Severity::Info, message, None);
    }

    pub fn add_warning(&mut self, message: impl Into<String>) {
        self.add(Severity::Warning, message, None);
    }

    pub fn add_warning_with(&mut self, message: impl Into<String>, context: impl Into<String>) {
        self.add(Severity::Warning, message, Some(context.into()));
    }

    pub fn add_error(&mut self, message: impl Into<String>) {
        self.add(Severity::Error, message, None);
    }

    pub fn add_fatal(&mut self, message: impl Into<String>) {
        self.add(Severity::Fatal, message, None);
    }

    pub fn merge(&mut self, other: Status) {
        self.entries.extend(other.entries);
    }

    pub fn entries(&self) -> &[StatusEntry] {
        &self.entries
    }

    pub fn severity(&self) -> Option<Severity> {
        self.entries.iter().map(|e| e.severity).max()
    }

    pub fn is_ok(&self) -> bool {
        self.severity().map_or(true, |s| s == Severity::Info)
    }

    pub fn has_error(&self) -> bool {
        self.severity().is_some_and(|s| s >= Severity::Error)
    }

    pub fn has_fatal(&self) -> bool {
        self.severity() == Some(Severity::Fatal)
    }

    pub fn warnings(&self) -> impl Iterator<Item = &StatusEntry> {
        self.entries.iter().filter(|e| e.severity == Severity::Warning)
    }

    /// First entry of the highest severity.
    pub fn first_message(&self) -> Option<&str> {
        let top = self.severity()?;
        self.entries.iter().find(|e| e.severity == top).map(|e| e.message.as_str())
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for entry in &self.entries {
            match &entry.context {
                Some(context) => writeln!(f, "{}: {} ({})", entry.severity, entry.message, context)?,
                None => writeln!(f, "{}: {}", entry.severity, entry.message)?,
            }
        }
        Ok(())
    }
}

/// Outcome of a structural destination check. No warnings at this layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Validation {
    Ok,
    Fatal(String),
}

impl Validation {
    pub fn fatal(reason: impl Into<String>) -> Self {
        Validation::Fatal(reason.into())
    }

    pub fn is_ok(&self) -> bool {
        matches!(self, Validation::Ok)
    }

    pub fn into_status(self) -> Status {
        match self {
            Validation::Ok => Status::ok(),
            Validation::Fatal(reason) => Status::fatal(reason),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn severity_is_the_maximum_entry() {
        let mut status = Status::ok();
        assert!(status.is_ok());
        status.add_info("searching");
        assert!(status.is_ok());
        status.add_warning("binary reference");
        assert!(!status.is_ok());
        assert!(!status.has_error());
        status.add_fatal("destination is read-only");
        assert!(status.has_fatal());
        assert_eq!(status.first_message(), Some("destination is read-only"));
    }

    #[test]
    fn display_lists_entries() {
        let mut status = Status::ok();
        status.add_warning_with("not updated", "lib/A.class");
        insta::assert_snapshot!(status.to_string(), @"warning: not updated (lib/A.class)");
    }
}
