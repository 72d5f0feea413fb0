use std::path::Path;

use anyhow::{Context, Result};

use crate::cli::RebuildCommand;
use crate::context;
use crate::output::{self, OutputFormat};

/// Execute a rebuild command.
pub fn run(
    cmd: RebuildCommand,
    config: Option<&Path>,
    store: &Path,
    format: OutputFormat,
) -> Result<()> {
    let ctx = context::open(config, store)?;

    let reports = match cmd.kind {
        Some(kind) => vec![
            ctx.service
                .rebuild(kind)
                .with_context(|| format!("Failed to rebuild {kind}"))?,
        ],
        None => ctx.service.rebuild_all().context("Failed to rebuild indices")?,
    };
    tracing::info!("Rebuilt {} indices", reports.len());

    output::print_rebuilds(&reports, format)
}
