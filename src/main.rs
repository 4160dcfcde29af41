//! repo-reorg: move and copy source entities while keeping references intact.

use anyhow::Result;

fn main() -> Result<()> {
    repo_reorg::cli::run()
}
