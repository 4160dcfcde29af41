//! Negotiates what happens to an entity whose name is already taken at the
//! destination.

use super::log::ExecutionLog;
use super::naming::NewNameProposer;
use crate::domain::{ReorgMode, SelectionItem};
use crate::error::ReorgError;
use crate::services::{BulkConfirmation, Conflict, ConflictChoice, ConflictQueries};

/// Decision for one entity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// Write the entity, under `new_name` if set. `overwrite` means an
    /// entity of that name is deleted first.
    Write { new_name: Option<String>, overwrite: bool },
    /// Leave the entity out of the change and of reference updates.
    Skip,
}

impl Resolution {
    pub fn is_skip(&self) -> bool {
        matches!(self, Resolution::Skip)
    }
}

/// One per operation. Bulk answers only last as long as the resolver.
#[derive(Debug)]
pub struct ConflictResolver {
    mode: ReorgMode,
    read_only_answer: Option<bool>,
    proposer: NewNameProposer,
}

impl ConflictResolver {
    pub fn new(mode: ReorgMode) -> Self {
        Self { mode, read_only_answer: None, proposer: NewNameProposer::new() }
    }

    pub fn proposer(&mut self) -> &mut NewNameProposer {
        &mut self.proposer
    }

    /// Resolve `item` against `destination`. `exists` tells whether a name is
    /// taken there; `propose` is only called when the user asks for a
    /// rename.
    pub fn resolve(
        &mut self,
        item: &SelectionItem,
        destination: &str,
        exists: impl Fn(&str) -> bool,
        propose: impl FnOnce(&mut NewNameProposer) -> String,
        queries: &mut dyn ConflictQueries,
        log: &mut ExecutionLog,
    ) -> Result<Resolution, ReorgError> {
        if log.is_replay() {
            return Ok(self.replayed(item, exists, log));
        }

        let name = item.name().to_string();
        if !exists(&name) {
            log.mark_as_processed(item);
            return Ok(Resolution::Write { new_name: None, overwrite: false });
        }

        let conflict = Conflict {
            name,
            destination: destination.to_string(),
            allow_rename: self.mode == ReorgMode::Copy,
        };
        let resolution = match queries.choose(&conflict) {
            ConflictChoice::Overwrite => Resolution::Write { new_name: None, overwrite: true },
            ConflictChoice::Skip => Resolution::Skip,
            ConflictChoice::Rename if conflict.allow_rename => {
                let new_name = propose(&mut self.proposer);
                Resolution::Write { new_name: Some(new_name), overwrite: false }
            }
            ConflictChoice::Rename => Resolution::Skip,
            ConflictChoice::Cancel => return Err(ReorgError::Cancelled),
        };
        match &resolution {
            Resolution::Write { new_name: Some(new_name), .. } => log.set_new_name(item, new_name),
            Resolution::Write { new_name: None, .. } => log.mark_as_processed(item),
            Resolution::Skip => tracing::debug!("Skipping {}", item.label()),
        }
        Ok(resolution)
    }

    /// Replays never prompt: unprocessed entities were skipped last time,
    /// renamed ones keep their recorded name, the rest overwrite.
    fn replayed(&self, item: &SelectionItem, exists: impl Fn(&str) -> bool, log: &ExecutionLog) -> Resolution {
        if !log.is_processed(item) {
            return Resolution::Skip;
        }
        match log.new_name(item) {
            Some(name) => Resolution::Write { new_name: Some(name.to_string()), overwrite: exists(name) },
            None => Resolution::Write { new_name: None, overwrite: exists(item.name()) },
        }
    }

    /// Ask whether a read-only entity may be changed anyway. `Ok(false)`
    /// means leave it out.
    pub fn confirm_read_only(
        &mut self,
        item: &SelectionItem,
        queries: &mut dyn ConflictQueries,
    ) -> Result<bool, ReorgError> {
        if let Some(answer) = self.read_only_answer {
            return Ok(answer);
        }
        let question = format!(
            "'{}' is read-only. Do you still want to {} it?",
            item.label(),
            self.mode.verb()
        );
        match queries.confirm_bulk(&question) {
            BulkConfirmation::Yes => Ok(true),
            BulkConfirmation::No => Ok(false),
            BulkConfirmation::YesToAll => {
                self.read_only_answer = Some(true);
                Ok(true)
            }
            BulkConfirmation::NoToAll => {
                self.read_only_answer = Some(false);
                Ok(false)
            }
            BulkConfirmation::Cancel => Err(ReorgError::Cancelled),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::{Confirmation, FixedQueries};

    fn field() -> SelectionItem {
        "=src<pkg{T.java[field:T.x#0".parse().expect("handle")
    }

    #[test]
    fn free_names_need_no_prompt() {
        let mut resolver = ConflictResolver::new(ReorgMode::Copy);
        let mut queries = FixedQueries::new(true, ConflictChoice::Skip);
        let mut log = ExecutionLog::new();
        let resolution = resolver
            .resolve(&field(), "U", |_| false, |_| unreachable!(), &mut queries, &mut log)
            .expect("resolve");
        assert_eq!(resolution, Resolution::Write { new_name: None, overwrite: false });
        assert_eq!(queries.prompt_count(), 0);
        assert!(log.is_processed(&field()));
    }

    #[test]
    fn rename_is_recorded_in_the_log() {
        let mut resolver = ConflictResolver::new(ReorgMode::Copy);
        let mut queries = FixedQueries::new(true, ConflictChoice::Rename);
        let mut log = ExecutionLog::new();
        let resolution = resolver
            .resolve(
                &field(),
                "U",
                |name| name == "x",
                |proposer| proposer.declaration_name("U", "x", false, &["x".to_string()]),
                &mut queries,
                &mut log,
            )
            .expect("resolve");
        assert_eq!(
            resolution,
            Resolution::Write { new_name: Some("copyOfX".into()), overwrite: false }
        );
        assert_eq!(log.new_name(&field()), Some("copyOfX"));
    }

    #[test]
    fn moves_cannot_rename() {
        let mut resolver = ConflictResolver::new(ReorgMode::Move);
        let mut queries = FixedQueries::new(true, ConflictChoice::Rename);
        let mut log = ExecutionLog::new();
        let resolution = resolver
            .resolve(&field(), "U", |_| true, |_| unreachable!(), &mut queries, &mut log)
            .expect("resolve");
        assert!(resolution.is_skip());
        assert!(!log.is_processed(&field()));
    }

    #[test]
    fn replay_follows_the_log_without_prompting() {
        let mut recorded = ExecutionLog::new();
        recorded.set_new_name(&field(), "copyOfX");
        let mut log = ExecutionLog::from_records(&recorded.to_records()).expect("log");

        let mut resolver = ConflictResolver::new(ReorgMode::Copy);
        let mut queries = FixedQueries::new(false, ConflictChoice::Cancel);
        let resolution = resolver
            .resolve(&field(), "U", |name| name == "x", |_| unreachable!(), &mut queries, &mut log)
            .expect("resolve");
        assert_eq!(
            resolution,
            Resolution::Write { new_name: Some("copyOfX".into()), overwrite: false }
        );
        let other: SelectionItem = "=src<pkg{T.java[field:T.y#0".parse().expect("handle");
        let skipped = resolver
            .resolve(&other, "U", |_| false, |_| unreachable!(), &mut queries, &mut log)
            .expect("resolve");
        assert!(skipped.is_skip());
        assert_eq!(queries.prompt_count(), 0);
    }

    #[test]
    fn read_only_bulk_answer_sticks() {
        struct Bulk(usize);
        impl ConflictQueries for Bulk {
            fn confirm(&mut self, _: &str) -> Confirmation {
                Confirmation::Yes
            }
            fn confirm_bulk(&mut self, _: &str) -> BulkConfirmation {
                self.0 += 1;
                BulkConfirmation::NoToAll
            }
            fn choose(&mut self, _: &Conflict) -> ConflictChoice {
                ConflictChoice::Skip
            }
        }
        let mut resolver = ConflictResolver::new(ReorgMode::Move);
        let mut queries = Bulk(0);
        assert!(!resolver.confirm_read_only(&field(), &mut queries).expect("first"));
        assert!(!resolver.confirm_read_only(&field(), &mut queries).expect("second"));
        assert_eq!(queries.0, 1);
    }
}
