//! Questions the engine asks the user.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Confirmation {
    Yes,
    No,
    Cancel,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BulkConfirmation {
    Yes,
    No,
    YesToAll,
    NoToAll,
    Cancel,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictChoice {
    Overwrite,
    Skip,
    Rename,
    Cancel,
}

/// An entity about to be written where a same-named one already exists.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conflict {
    pub name: String,
    pub destination: String,
    pub allow_rename: bool,
}

impl Conflict {
    pub fn question(&self) -> String {
        format!("'{}' already exists in '{}'.", self.name, self.destination)
    }
}

pub trait ConflictQueries {
    fn confirm(&mut self, question: &str) -> Confirmation;

    fn confirm_bulk(&mut self, question: &str) -> BulkConfirmation;

    fn choose(&mut self, conflict: &Conflict) -> ConflictChoice;
}

/// Answers every question the same way and records what was asked.
#[derive(Debug, Clone)]
pub struct FixedQueries {
    pub confirm: bool,
    pub on_conflict: ConflictChoice,
    pub asked: Vec<String>,
}

impl FixedQueries {
    pub fn new(confirm: bool, on_conflict: ConflictChoice) -> Self {
        Self { confirm, on_conflict, asked: Vec::new() }
    }

    /// Says yes and overwrites.
    pub fn yes() -> Self {
        Self::new(true, ConflictChoice::Overwrite)
    }

    pub fn prompt_count(&self) -> usize {
        self.asked.len()
    }
}

impl ConflictQueries for FixedQueries {
    fn confirm(&mut self, question: &str) -> Confirmation {
        self.asked.push(question.to_string());
        if self.confirm {
            Confirmation::Yes
        } else {
            Confirmation::No
        }
    }

    fn confirm_bulk(&mut self, question: &str) -> BulkConfirmation {
        self.asked.push(question.to_string());
        if self.confirm {
            BulkConfirmation::Yes
        } else {
            BulkConfirmation::No
        }
    }

    fn choose(&mut self, conflict: &Conflict) -> ConflictChoice {
        self.asked.push(conflict.question());
        match self.on_conflict {
            ConflictChoice::Rename if !conflict.allow_rename => ConflictChoice::Skip,
            choice => choice,
        }
    }
}
