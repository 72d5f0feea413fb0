use std::path::PathBuf;

use archive_search::IndexKind;
use clap::{Parser, Subcommand};

use crate::output::OutputFormat;

/// archive-search - index, search and collate an archive snapshot
#[derive(Parser)]
#[command(name = "archive-search", version, about)]
pub struct Cli {
    /// Path to the configuration TOML file. Defaults apply when omitted.
    #[arg(long, env = "ARCHIVE_SEARCH_CONFIG")]
    pub config: Option<PathBuf>,

    /// Path to the JSON snapshot of the system of record.
    #[arg(long, env = "ARCHIVE_SEARCH_STORE", default_value = "./archive.json")]
    pub store: PathBuf,

    /// Output format.
    #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
    pub format: OutputFormat,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Build fresh index generations from the snapshot.
    Rebuild(RebuildCommand),
    /// Search archive content.
    Search(SearchCommand),
    /// List or search languages and standalone sites.
    Languages(LanguagesCommand),
    /// Collate a title, or recalculate a whole site.
    Collate(CollateCommand),
    /// Print the effective configuration.
    Config,
}

// --- Rebuild ---

#[derive(Parser)]
pub struct RebuildCommand {
    /// Index to rebuild (language, dictionary_entries, songs, stories, media).
    /// Every index is rebuilt when omitted.
    #[arg(long)]
    pub kind: Option<IndexKind>,
}

// --- Search ---

#[derive(Parser)]
pub struct SearchCommand {
    /// Free-text search term.
    pub query: Option<String>,

    /// Restrict to these sites.
    #[arg(long = "site")]
    pub sites: Vec<String>,

    /// Comma-separated type tags (word, phrase, song, story, audio, ...).
    #[arg(long)]
    pub types: Option<String>,

    /// Text domain: both, language or translation.
    #[arg(long)]
    pub domain: Option<String>,

    /// Only titles starting with this character sequence.
    #[arg(long)]
    pub starts_with: Option<String>,

    /// Category id; its child categories are included.
    #[arg(long)]
    pub category: Option<String>,

    /// Comma-separated visibility tiers (team, members, public).
    #[arg(long)]
    pub visibility: Option<String>,

    /// Only content suitable for kids.
    #[arg(long)]
    pub kids: Option<String>,

    /// Only content suitable for games.
    #[arg(long)]
    pub games: Option<String>,

    #[arg(long)]
    pub min_words: Option<String>,

    #[arg(long)]
    pub max_words: Option<String>,

    /// created, modified, title or random, with an optional _desc suffix.
    #[arg(long)]
    pub sort: Option<String>,

    #[arg(long)]
    pub page: Option<String>,

    #[arg(long)]
    pub page_size: Option<String>,

    /// Search as staff, bypassing visibility.
    #[arg(long, conflicts_with = "member")]
    pub staff: bool,

    /// Search as a member of a site: SITE or SITE:ROLE
    /// (member, assistant, editor, language_admin).
    #[arg(long)]
    pub member: Vec<String>,
}

// --- Languages ---

#[derive(Parser)]
pub struct LanguagesCommand {
    /// Search term; every discoverable language is listed when omitted.
    pub query: Option<String>,

    #[arg(long, default_value_t = 1)]
    pub page: usize,

    #[arg(long, default_value_t = 25)]
    pub page_size: usize,
}

// --- Collate ---

#[derive(Parser)]
pub struct CollateCommand {
    /// Site whose alphabet is used.
    #[arg(long)]
    pub site: String,

    /// Title to collate. Every dictionary entry of the site is recalculated
    /// when omitted.
    pub title: Option<String>,

    /// Apply the recalculation to the loaded snapshot and re-index the
    /// changed entries. The snapshot file itself is not modified.
    #[arg(long, conflicts_with = "title")]
    pub commit: bool,
}
