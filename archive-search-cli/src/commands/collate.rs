use std::path::Path;

use anyhow::{Context, Result};
use archive_search::{Alphabet, RecalculationMode, SystemOfRecord};

use crate::cli::CollateCommand;
use crate::context;
use crate::output::{self, OutputFormat};

/// Execute a collate command.
pub fn run(
    cmd: CollateCommand,
    config: Option<&Path>,
    store: &Path,
    format: OutputFormat,
) -> Result<()> {
    // Single title: no index needed.
    if let Some(title) = cmd.title {
        let ctx = context::open(config, store)?;
        let alphabet = match ctx.store.alphabet(&cmd.site)? {
            Some(alphabet) => alphabet,
            None => {
                tracing::warn!("Site {} has no alphabet; every character is unknown", cmd.site);
                Alphabet::new(cmd.site.as_str())
            }
        };
        let collation = ctx
            .service
            .collate(&alphabet, &title)
            .with_context(|| format!("Alphabet of site {} is invalid", cmd.site))?;
        return output::print_collation(&title, &collation, format);
    }

    let (ctx, mode) = if cmd.commit {
        // Committed entries are re-synced, so the indices must exist.
        (context::open_indexed(config, store)?, RecalculationMode::Commit)
    } else {
        (context::open(config, store)?, RecalculationMode::Preview)
    };
    let report = ctx
        .service
        .recalculate(&cmd.site, mode)
        .with_context(|| format!("Failed to recalculate site {}", cmd.site))?;

    output::print_recalculation(&report, format)
}
