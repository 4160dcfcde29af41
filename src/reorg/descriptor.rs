//! Flat key/value record describing an operation, used to replay it.
//!
//! The attribute vocabulary is fixed: `policy`, `element1..N`,
//! `destination` (element destinations) or `target` (resource
//! destinations), `location`, `references`, `qualified`, `patterns`, `log`.

use super::classify::classify;
use super::log::ExecutionLog;
use super::policy::{PolicyData, ReorgPolicy};
use crate::domain::{Destination, Location, ReorgMode, SelectionItem};
use crate::error::ReorgError;
use crate::services::SourceModel;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const ATTRIBUTE_POLICY: &str = "policy";
pub const ATTRIBUTE_ELEMENT: &str = "element";
pub const ATTRIBUTE_DESTINATION: &str = "destination";
pub const ATTRIBUTE_TARGET: &str = "target";
pub const ATTRIBUTE_LOCATION: &str = "location";
pub const ATTRIBUTE_REFERENCES: &str = "references";
pub const ATTRIBUTE_QUALIFIED: &str = "qualified";
pub const ATTRIBUTE_PATTERNS: &str = "patterns";
pub const ATTRIBUTE_LOG: &str = "log";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Descriptor {
    /// `move` or `copy`.
    pub id: String,
    pub arguments: BTreeMap<String, String>,
}

impl Descriptor {
    pub fn from_policy(policy_id: &str, data: &PolicyData, log: &ExecutionLog) -> Self {
        let mut arguments = BTreeMap::new();
        arguments.insert(ATTRIBUTE_POLICY.to_string(), policy_id.to_string());
        for (idx, item) in data.items().iter().enumerate() {
            arguments.insert(format!("{ATTRIBUTE_ELEMENT}{}", idx + 1), item.to_string());
        }
        if let Some(destination) = &data.destination {
            let key = match destination.target {
                SelectionItem::Resource { .. } => ATTRIBUTE_TARGET,
                SelectionItem::Element(_) => ATTRIBUTE_DESTINATION,
            };
            arguments.insert(key.to_string(), destination.target.to_string());
            if destination.location != Location::On {
                arguments
                    .insert(ATTRIBUTE_LOCATION.to_string(), destination.location.as_str().to_string());
            }
        }
        arguments.insert(ATTRIBUTE_REFERENCES.to_string(), data.update_references.to_string());
        arguments.insert(ATTRIBUTE_QUALIFIED.to_string(), data.update_qualified_names.to_string());
        if data.update_qualified_names && !data.file_patterns.is_empty() {
            arguments.insert(ATTRIBUTE_PATTERNS.to_string(), data.file_patterns.clone());
        }
        if !log.is_empty() {
            arguments.insert(ATTRIBUTE_LOG.to_string(), log.to_records());
        }
        Self { id: data.mode.verb().to_string(), arguments }
    }

    pub fn mode(&self) -> Result<ReorgMode, ReorgError> {
        match self.id.as_str() {
            "move" => Ok(ReorgMode::Move),
            "copy" => Ok(ReorgMode::Copy),
            other => Err(ReorgError::fatal(format!("Unknown operation '{other}' in descriptor."))),
        }
    }

    fn required(&self, key: &str) -> Result<&str, ReorgError> {
        self.arguments
            .get(key)
            .map(String::as_str)
            .ok_or_else(|| ReorgError::fatal(format!("The descriptor has no '{key}' attribute.")))
    }

    fn flag(&self, key: &str) -> Result<bool, ReorgError> {
        match self.arguments.get(key) {
            None => Ok(false),
            Some(value) => value.parse::<bool>().map_err(|_| {
                ReorgError::fatal(format!("Attribute '{key}' must be true or false, got '{value}'."))
            }),
        }
    }

    pub fn items(&self) -> Result<Vec<SelectionItem>, ReorgError> {
        let mut items = Vec::new();
        for idx in 1.. {
            let Some(handle) = self.arguments.get(&format!("{ATTRIBUTE_ELEMENT}{idx}")) else {
                break;
            };
            items.push(parse_handle(handle)?);
        }
        Ok(items)
    }

    pub fn destination(&self) -> Result<Destination, ReorgError> {
        let handle = match self.arguments.get(ATTRIBUTE_DESTINATION) {
            Some(handle) => handle.as_str(),
            None => self.required(ATTRIBUTE_TARGET)?,
        };
        let location = match self.arguments.get(ATTRIBUTE_LOCATION) {
            Some(value) => value.parse::<Location>().map_err(ReorgError::Fatal)?,
            None => Location::On,
        };
        Ok(Destination::new(parse_handle(handle)?, location))
    }
}

fn parse_handle(handle: &str) -> Result<SelectionItem, ReorgError> {
    handle.parse::<SelectionItem>().map_err(|err| ReorgError::fatal(err.to_string()))
}

/// A policy rebuilt from a descriptor, ready to be run again.
pub struct RestoredOperation {
    pub policy: Box<dyn ReorgPolicy>,
    pub destination: Destination,
    pub log: ExecutionLog,
}

/// Rebuild the policy a descriptor was written from. Destination checks are
/// disabled and the stored execution log is loaded, so the replay neither
/// re-validates nor prompts.
pub fn policy_from_descriptor(
    model: &dyn SourceModel,
    descriptor: &Descriptor,
) -> Result<RestoredOperation, ReorgError> {
    let mode = descriptor.mode()?;
    let expected = descriptor.required(ATTRIBUTE_POLICY)?;
    let items = descriptor.items()?;
    if items.is_empty() {
        return Err(ReorgError::fatal("The descriptor names no elements."));
    }
    let destination = descriptor.destination()?;

    let mut policy = classify(model, mode, &items);
    if policy.policy_id() != expected {
        return Err(ReorgError::fatal(format!(
            "The stored selection now resolves to '{}' instead of '{expected}'.",
            policy.policy_id()
        )));
    }
    let data = policy.data_mut();
    data.check_destination = false;
    data.update_references = descriptor.flag(ATTRIBUTE_REFERENCES)?;
    data.update_qualified_names = descriptor.flag(ATTRIBUTE_QUALIFIED)?;
    data.file_patterns = descriptor.arguments.get(ATTRIBUTE_PATTERNS).cloned().unwrap_or_default();

    let log = ExecutionLog::from_records(
        descriptor.arguments.get(ATTRIBUTE_LOG).map(String::as_str).unwrap_or_default(),
    )?;
    Ok(RestoredOperation { policy, destination, log })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workspace::test_support::workspace;

    #[test]
    fn descriptor_round_trips_through_json() {
        let (_tmp, ws) = workspace(&[
            ("src/pkg/a/Foo.java", "package pkg.a;\npublic class Foo {}\n"),
            ("src/pkg/b/Baz.java", "package pkg.b;\nclass Baz {}\n"),
        ]);
        let items: Vec<SelectionItem> = vec!["=src<pkg.a{Foo.java".parse().expect("handle")];
        let mut policy = classify(&ws, ReorgMode::Move, &items);
        let destination = Destination::on(SelectionItem::Element(
            "=src<pkg.b".parse().expect("handle"),
        ));
        assert!(policy.set_destination(&ws, destination.clone()).is_ok());

        let mut log = ExecutionLog::new();
        log.mark_as_processed(&items[0]);
        let descriptor = policy.descriptor(&log);
        insta::assert_json_snapshot!(descriptor, @r###"
        {
          "id": "move",
          "arguments": {
            "destination": "=src<pkg.b",
            "element1": "=src<pkg.a{Foo.java",
            "log": "processed\t=src<pkg.a{Foo.java\ttrue\tfalse",
            "policy": "moveResources",
            "qualified": "false",
            "references": "true"
          }
        }
        "###);

        let json = serde_json::to_string(&descriptor).expect("json");
        let parsed: Descriptor = serde_json::from_str(&json).expect("parse");
        let restored = policy_from_descriptor(&ws, &parsed).expect("restore");
        assert_eq!(restored.policy.policy_id(), "moveResources");
        assert!(!restored.policy.data().check_destination);
        assert_eq!(restored.destination, destination);
        assert!(restored.log.is_replay());
        assert!(restored.log.is_processed(&items[0]));
    }

    #[test]
    fn changed_selection_is_rejected() {
        let (_tmp, ws) = workspace(&[("src/pkg/a/Foo.java", "package pkg.a;\nclass Foo {}\n")]);
        let mut arguments = BTreeMap::new();
        arguments.insert("policy".to_string(), "moveMembers".to_string());
        arguments.insert("element1".to_string(), "=src<pkg.a{Foo.java".to_string());
        arguments.insert("destination".to_string(), "=src<pkg.a".to_string());
        let descriptor = Descriptor { id: "move".into(), arguments };
        let err = policy_from_descriptor(&ws, &descriptor).err().expect("mismatch");
        assert!(err.to_string().contains("moveResources"));
    }
}
