//! Moving import declarations between source files.

use super::sub_file::SubFileReorg;
use crate::change::Change;
use crate::domain::{Destination, ReorgMode, SelectionItem};
use crate::error::ReorgError;
use crate::reorg::log::ExecutionLog;
use crate::reorg::policy::{PolicyData, ReorgContext, ReorgPolicy};
use crate::services::{ConflictQueries, ProgressMonitor, SourceModel};
use crate::status::{Status, Validation};

#[derive(Debug)]
pub struct ImportMovePolicy {
    core: SubFileReorg,
}

impl ImportMovePolicy {
    pub fn new(items: &[SelectionItem]) -> Self {
        Self { core: SubFileReorg::new(ReorgMode::Move, items) }
    }
}

impl ReorgPolicy for ImportMovePolicy {
    fn policy_id(&self) -> &'static str {
        "moveImports"
    }

    fn data(&self) -> &PolicyData {
        &self.core.data
    }

    fn data_mut(&mut self) -> &mut PolicyData {
        &mut self.core.data
    }

    fn can_enable(&self, model: &dyn SourceModel) -> bool {
        self.core.can_enable(model)
    }

    fn verify_destination(&self, model: &dyn SourceModel, destination: &Destination) -> Validation {
        self.core.verify_destination(model, destination)
    }

    fn check_final_conditions(
        &mut self,
        ctx: &ReorgContext<'_>,
        log: &mut ExecutionLog,
        queries: &mut dyn ConflictQueries,
        monitor: &mut dyn ProgressMonitor,
    ) -> Result<Status, ReorgError> {
        self.core.check_final_conditions(ctx, log, queries, monitor)
    }

    fn create_change(
        &mut self,
        _ctx: &ReorgContext<'_>,
        _monitor: &mut dyn ProgressMonitor,
    ) -> Result<Change, ReorgError> {
        self.core.create_change()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::{ChangePerformer, FixedQueries, NullProgressMonitor};
    use crate::workspace::test_support::workspace;
    use crate::workspace::FsChangePerformer;
    use std::fs;

    #[test]
    fn import_moves_to_another_file() {
        let (tmp, ws) = workspace(&[
            (
                "src/pkg/A.java",
                "package pkg;\n\nimport java.util.List;\nimport java.util.Map;\n\nclass A {\n}\n",
            ),
            ("src/pkg/B.java", "package pkg;\n\nimport java.io.File;\n\nclass B {\n}\n"),
        ]);
        let items: Vec<SelectionItem> =
            vec!["=src<pkg{A.java[import:java.util.Map#0".parse().expect("handle")];
        let mut policy = ImportMovePolicy::new(&items);
        assert!(policy.can_enable(&ws));
        let target: SelectionItem = "=src<pkg{B.java".parse().expect("handle");
        assert!(policy.set_destination(&ws, Destination::on(target)).is_ok());

        let ctx = ReorgContext::from_backend(&ws);
        let mut monitor = NullProgressMonitor::default();
        policy
            .check_final_conditions(&ctx, &mut ExecutionLog::new(), &mut FixedQueries::yes(), &mut monitor)
            .expect("conditions");
        let change = policy.create_change(&ctx, &mut monitor).expect("change");
        FsChangePerformer::new(tmp.path()).perform(&change).expect("perform");

        assert_eq!(
            fs::read_to_string(tmp.path().join("src/pkg/A.java")).expect("A"),
            "package pkg;\n\nimport java.util.List;\n\nclass A {\n}\n"
        );
        assert_eq!(
            fs::read_to_string(tmp.path().join("src/pkg/B.java")).expect("B"),
            "package pkg;\n\nimport java.io.File;\nimport java.util.Map;\n\nclass B {\n}\n"
        );
    }
}
