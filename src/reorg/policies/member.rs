//! Moving members and types between (or within) source files.

use super::sub_file::SubFileReorg;
use crate::change::Change;
use crate::domain::{Destination, ReorgMode, SelectionItem};
use crate::error::ReorgError;
use crate::reorg::log::ExecutionLog;
use crate::reorg::policy::{PolicyData, ReorgContext, ReorgPolicy};
use crate::services::{ConflictQueries, ProgressMonitor, SourceModel};
use crate::status::{Status, Validation};

/// Moves fields, methods, initializers and types. References to the moved
/// declarations are left as they are.
#[derive(Debug)]
pub struct MemberMovePolicy {
    core: SubFileReorg,
}

impl MemberMovePolicy {
    pub fn new(items: &[SelectionItem]) -> Self {
        Self { core: SubFileReorg::new(ReorgMode::Move, items) }
    }
}

impl ReorgPolicy for MemberMovePolicy {
    fn policy_id(&self) -> &'static str {
        "moveMembers"
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
    use crate::domain::Location;
    use crate::services::{ChangePerformer, FixedQueries, NullProgressMonitor};
    use crate::workspace::test_support::workspace;
    use crate::workspace::{FsChangePerformer, Workspace};
    use std::fs;
    use std::path::Path;

    fn item(handle: &str) -> SelectionItem {
        handle.parse().expect("handle")
    }

    fn move_to(ws: &Workspace, root: &Path, handles: &[&str], destination: Destination) -> Status {
        let items: Vec<SelectionItem> = handles.iter().map(|h| item(h)).collect();
        let mut policy = MemberMovePolicy::new(&items);
        assert!(policy.can_enable(ws));
        let validation = policy.set_destination(ws, destination);
        assert!(validation.is_ok(), "{validation:?}");
        let ctx = ReorgContext::from_backend(ws);
        let mut monitor = NullProgressMonitor::default();
        let status = policy
            .check_final_conditions(&ctx, &mut ExecutionLog::new(), &mut FixedQueries::yes(), &mut monitor)
            .expect("conditions");
        let change = policy.create_change(&ctx, &mut monitor).expect("change");
        FsChangePerformer::new(root).perform(&change).expect("perform");
        status
    }

    #[test]
    fn method_moves_to_another_file() {
        let (tmp, ws) = workspace(&[
            ("src/pkg/T.java", "package pkg;\n\nclass T {\n    int x;\n\n    void run() {\n        x++;\n    }\n}\n"),
            ("src/pkg/U.java", "package pkg;\n\nclass U {\n    int y;\n}\n"),
        ]);
        let status = move_to(
            &ws,
            tmp.path(),
            &["=src<pkg{T.java[method:T.run#0"],
            Destination::new(item("=src<pkg{U.java[field:U.y#0"), Location::After),
        );
        assert!(!status.has_error());
        assert!(status.first_message().is_some_and(|m| m.contains("not updated")));
        insta::assert_snapshot!(fs::read_to_string(tmp.path().join("src/pkg/T.java")).expect("T"), @r###"
        package pkg;

        class T {
            int x;
        }
        "###);
        insta::assert_snapshot!(fs::read_to_string(tmp.path().join("src/pkg/U.java")).expect("U"), @r###"
        package pkg;

        class U {
            int y;

            void run() {
                x++;
            }
        }
        "###);
    }

    #[test]
    fn moving_every_type_deletes_the_file() {
        let (tmp, ws) = workspace(&[
            ("src/pkg/Gone.java", "package pkg;\n\nclass Helper {\n}\n"),
            ("src/pkg/Main.java", "package pkg;\n\npublic class Main {\n}\n"),
        ]);
        move_to(&ws, tmp.path(), &["=src<pkg{Gone.java[type:Helper#0"], Destination::on(item("=src<pkg{Main.java")));
        assert!(!tmp.path().join("src/pkg/Gone.java").exists());
        assert_eq!(
            fs::read_to_string(tmp.path().join("src/pkg/Main.java")).expect("Main"),
            "package pkg;\n\npublic class Main {\n}\n\nclass Helper {\n}\n"
        );
    }

    #[test]
    fn moving_next_to_itself_is_rejected() {
        let (_tmp, ws) = workspace(&[(
            "src/pkg/T.java",
            "package pkg;\n\nclass T {\n    int a;\n    int b;\n    int c;\n}\n",
        )]);
        let policy = MemberMovePolicy::new(&[item("=src<pkg{T.java[field:T.b#0")]);
        let after_a = Destination::new(item("=src<pkg{T.java[field:T.a#0"), Location::After);
        let before_c = Destination::new(item("=src<pkg{T.java[field:T.c#0"), Location::Before);
        let after_c = Destination::new(item("=src<pkg{T.java[field:T.c#0"), Location::After);
        assert!(!policy.verify_destination(&ws, &after_a).is_ok());
        assert!(!policy.verify_destination(&ws, &before_c).is_ok());
        assert!(policy.verify_destination(&ws, &after_c).is_ok());
    }
}
