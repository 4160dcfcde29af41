//! Terminal answers to the engine's questions.

use clap::ValueEnum;
use dialoguer::{theme::ColorfulTheme, Confirm, Select};

use crate::services::{BulkConfirmation, Confirmation, Conflict, ConflictChoice, ConflictQueries};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OnConflict {
    Ask,
    Overwrite,
    Skip,
    Rename,
}

/// Prompts on a terminal unless `--on-conflict` fixed the answer. Without a
/// terminal, confirmations are declined and conflicts skipped.
pub struct TerminalQueries {
    on_conflict: OnConflict,
    assume_yes: bool,
    attended: bool,
    theme: ColorfulTheme,
}

impl TerminalQueries {
    pub fn new(on_conflict: OnConflict, assume_yes: bool) -> Self {
        Self { on_conflict, assume_yes, attended: console::user_attended(), theme: ColorfulTheme::default() }
    }

    fn ask_yes_no(&self, question: &str) -> Option<bool> {
        if self.assume_yes {
            return Some(true);
        }
        if !self.attended {
            tracing::warn!("No terminal to ask '{}'; answering no", question);
            return Some(false);
        }
        Confirm::with_theme(&self.theme)
            .with_prompt(question)
            .default(false)
            .interact_opt()
            .unwrap_or_else(|err| {
                tracing::warn!("Prompt failed: {}", err);
                None
            })
    }
}

impl ConflictQueries for TerminalQueries {
    fn confirm(&mut self, question: &str) -> Confirmation {
        match self.ask_yes_no(question) {
            Some(true) => Confirmation::Yes,
            Some(false) => Confirmation::No,
            None => Confirmation::Cancel,
        }
    }

    fn confirm_bulk(&mut self, question: &str) -> BulkConfirmation {
        if self.assume_yes {
            return BulkConfirmation::YesToAll;
        }
        if !self.attended {
            return BulkConfirmation::NoToAll;
        }
        let items = ["Yes", "Yes to all", "No", "No to all"];
        let picked = Select::with_theme(&self.theme)
            .with_prompt(question)
            .default(0)
            .items(&items)
            .interact_opt()
            .unwrap_or(None);
        match picked {
            Some(0) => BulkConfirmation::Yes,
            Some(1) => BulkConfirmation::YesToAll,
            Some(2) => BulkConfirmation::No,
            Some(3) => BulkConfirmation::NoToAll,
            _ => BulkConfirmation::Cancel,
        }
    }

    fn choose(&mut self, conflict: &Conflict) -> ConflictChoice {
        let fixed = match self.on_conflict {
            OnConflict::Overwrite => Some(ConflictChoice::Overwrite),
            OnConflict::Skip => Some(ConflictChoice::Skip),
            OnConflict::Rename if conflict.allow_rename => Some(ConflictChoice::Rename),
            OnConflict::Rename => Some(ConflictChoice::Skip),
            OnConflict::Ask if !self.attended => Some(ConflictChoice::Skip),
            OnConflict::Ask => None,
        };
        if let Some(choice) = fixed {
            tracing::debug!("{} -> {:?}", conflict.question(), choice);
            return choice;
        }

        let mut options = vec![("Overwrite", ConflictChoice::Overwrite), ("Skip", ConflictChoice::Skip)];
        if conflict.allow_rename {
            options.push(("Keep both (rename the copy)", ConflictChoice::Rename));
        }
        let labels: Vec<&str> = options.iter().map(|(label, _)| *label).collect();
        let picked = Select::with_theme(&self.theme)
            .with_prompt(conflict.question())
            .default(1)
            .items(&labels)
            .interact_opt()
            .unwrap_or(None);
        picked.and_then(|idx| options.get(idx)).map_or(ConflictChoice::Cancel, |(_, choice)| *choice)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn conflict(allow_rename: bool) -> Conflict {
        Conflict { name: "Foo.java".into(), destination: "src/pkg/b".into(), allow_rename }
    }

    #[test]
    fn fixed_answers_never_prompt() {
        let mut queries = TerminalQueries::new(OnConflict::Rename, true);
        assert_eq!(queries.choose(&conflict(true)), ConflictChoice::Rename);
        assert_eq!(queries.choose(&conflict(false)), ConflictChoice::Skip);
        assert_eq!(queries.confirm("Create it?"), Confirmation::Yes);
        assert_eq!(queries.confirm_bulk("Read-only?"), BulkConfirmation::YesToAll);
    }
}
