//! Execution log: side information recorded while an operation runs, so a
//! replay of the same operation reuses earlier decisions instead of asking
//! again.
//!
//! Stored inside a descriptor as flat records, one per line, fields
//! separated by tabs:
//!
//! ```text
//! created    <selection handle>  <created handle>
//! processed  <element handle>    <processed>  <renamed>  [<new name>]
//! ```

use crate::domain::SelectionItem;
use crate::error::ReorgError;
use std::collections::{BTreeMap, BTreeSet};

const FIELD_DELIMITER: char = '\t';
const RECORD_DELIMITER: char = '\n';
const CREATED_TAG: &str = "created";
const PROCESSED_TAG: &str = "processed";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecutionLog {
    created: BTreeMap<String, String>,
    processed: BTreeSet<String>,
    renamed: BTreeMap<String, String>,
    /// Set when the log was read back from a stored operation.
    replay: bool,
}

impl ExecutionLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether decisions come from a previous run of the same operation.
    pub fn is_replay(&self) -> bool {
        self.replay
    }

    pub fn is_empty(&self) -> bool {
        self.created.is_empty() && self.processed.is_empty() && self.renamed.is_empty()
    }

    pub fn mark_as_created(&mut self, selection: &SelectionItem, created: &SelectionItem) {
        self.created.insert(selection.to_string(), created.to_string());
    }

    /// The target created for `selection` by an earlier run.
    pub fn created_for(&self, selection: &SelectionItem) -> Option<SelectionItem> {
        self.created.get(&selection.to_string()).and_then(|handle| handle.parse().ok())
    }

    pub fn mark_as_processed(&mut self, item: &SelectionItem) {
        self.processed.insert(item.to_string());
    }

    pub fn is_processed(&self, item: &SelectionItem) -> bool {
        self.processed.contains(&item.to_string())
    }

    pub fn set_new_name(&mut self, item: &SelectionItem, name: impl Into<String>) {
        let handle = item.to_string();
        self.processed.insert(handle.clone());
        self.renamed.insert(handle, name.into());
    }

    pub fn new_name(&self, item: &SelectionItem) -> Option<&str> {
        self.renamed.get(&item.to_string()).map(String::as_str)
    }

    pub fn processed_count(&self) -> usize {
        self.processed.len()
    }

    pub fn to_records(&self) -> String {
        let mut records = Vec::new();
        for (selection, created) in &self.created {
            records.push([CREATED_TAG, selection, created].join(&FIELD_DELIMITER.to_string()));
        }
        for element in &self.processed {
            let mut fields = vec![PROCESSED_TAG.to_string(), element.clone(), "true".to_string()];
            match self.renamed.get(element) {
                Some(name) => {
                    fields.push("true".to_string());
                    fields.push(name.clone());
                }
                None => fields.push("false".to_string()),
            }
            records.push(fields.join(&FIELD_DELIMITER.to_string()));
        }
        records.join(&RECORD_DELIMITER.to_string())
    }

    pub fn from_records(records: &str) -> Result<Self, ReorgError> {
        let mut log = ExecutionLog { replay: true, ..Default::default() };
        for record in records.split(RECORD_DELIMITER).filter(|r| !r.trim().is_empty()) {
            let fields: Vec<&str> = record.split(FIELD_DELIMITER).collect();
            match fields.as_slice() {
                [CREATED_TAG, selection, created] => {
                    log.created.insert(selection.to_string(), created.to_string());
                }
                [PROCESSED_TAG, element, processed, renamed, rest @ ..] => {
                    let processed = parse_flag(processed, record)?;
                    let renamed = parse_flag(renamed, record)?;
                    if processed {
                        log.processed.insert(element.to_string());
                    }
                    match (renamed, rest) {
                        (true, [name]) => {
                            log.renamed.insert(element.to_string(), name.to_string());
                        }
                        (false, []) => {}
                        _ => return Err(malformed(record)),
                    }
                }
                _ => return Err(malformed(record)),
            }
        }
        Ok(log)
    }
}

fn parse_flag(value: &str, record: &str) -> Result<bool, ReorgError> {
    value.parse::<bool>().map_err(|_| malformed(record))
}

fn malformed(record: &str) -> ReorgError {
    ReorgError::fatal(format!("malformed execution log record '{}'", record.replace('\t', " ")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(handle: &str) -> SelectionItem {
        handle.parse().expect("handle")
    }

    #[test]
    fn records_survive_a_round_trip() {
        let mut log = ExecutionLog::new();
        let dest = item("=src<pkg.b");
        log.mark_as_created(&dest, &dest);
        log.mark_as_processed(&item("=src<pkg.a{Foo.java"));
        log.set_new_name(&item("/docs/readme.txt"), "Copy of readme.txt");

        let records = log.to_records();
        insta::assert_snapshot!(records.replace('\t', " | "), @r###"
        created | =src<pkg.b | =src<pkg.b
        processed | /docs/readme.txt | true | true | Copy of readme.txt
        processed | =src<pkg.a{Foo.java | true | false
        "###);

        let parsed = ExecutionLog::from_records(&records).expect("parse");
        assert!(parsed.is_replay());
        assert_eq!(parsed.created_for(&dest), Some(dest.clone()));
        assert!(parsed.is_processed(&item("=src<pkg.a{Foo.java")));
        assert_eq!(parsed.new_name(&item("/docs/readme.txt")), Some("Copy of readme.txt"));
        assert_eq!(parsed.to_records(), records);
    }

    #[test]
    fn malformed_records_are_fatal() {
        assert!(ExecutionLog::from_records("processed\t=src<pkg.a\tmaybe\tfalse").is_err());
        assert!(ExecutionLog::from_records("renamed\tx").is_err());
        assert!(ExecutionLog::from_records("").expect("empty").is_empty());
    }
}
