use anyhow::Result;
use archive_search::{Collation, RebuildReport, RecalculationReport, SearchPage};
use clap::ValueEnum;
use serde::Serialize;
use tabled::settings::Style;
use tabled::{Table, Tabled};

/// Output format for CLI results.
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable table.
    Table,
    /// JSON output.
    Json,
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn print_table<T: Tabled>(rows: &[T]) {
    let table = Table::new(rows).with(Style::rounded()).to_string();
    println!("{table}");
}

#[derive(Tabled)]
struct ResultRow {
    #[tabled(rename = "#")]
    rank: usize,
    id: String,
    kind: String,
    #[tabled(rename = "type")]
    type_tag: String,
    title: String,
    site: String,
    score: String,
}

/// Print one page of search results.
pub fn print_page(page: &SearchPage, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => print_json(page),
        OutputFormat::Table => {
            if page.results.is_empty() {
                println!("No results found.");
                return Ok(());
            }

            let first = (page.page - 1) * page.page_size;
            let rows: Vec<ResultRow> = page
                .results
                .iter()
                .enumerate()
                .map(|(i, r)| ResultRow {
                    rank: first + i + 1,
                    id: r.entry.id().to_string(),
                    kind: r.entry.record_kind().to_string(),
                    type_tag: r.type_tag.map(|t| t.as_str().to_string()).unwrap_or_default(),
                    title: r.entry.title().to_string(),
                    site: r.entry.site_id().unwrap_or_default().to_string(),
                    score: format!("{:.4}", r.score),
                })
                .collect();

            print_table(&rows);
            println!(
                "Page {} of {} ({} matches)",
                page.page, page.pages, page.total_count
            );
            Ok(())
        }
    }
}

#[derive(Tabled)]
struct RebuildRow {
    index: String,
    alias: String,
    generation: String,
    indexed: usize,
    replayed: usize,
    pruned: usize,
    seconds: String,
}

/// Print rebuild reports.
pub fn print_rebuilds(reports: &[RebuildReport], format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => print_json(reports),
        OutputFormat::Table => {
            let rows: Vec<RebuildRow> = reports
                .iter()
                .map(|r| RebuildRow {
                    index: r.kind.to_string(),
                    alias: r.alias.clone(),
                    generation: r.generation.clone(),
                    indexed: r.indexed,
                    replayed: r.replayed,
                    pruned: r.deleted.len(),
                    seconds: format!(
                        "{:.3}",
                        (r.finished_at - r.started_at).num_milliseconds() as f64 / 1000.0
                    ),
                })
                .collect();
            print_table(&rows);
            Ok(())
        }
    }
}

#[derive(Tabled)]
struct FieldRow {
    field: String,
    value: String,
}

/// Print the collation of a single title.
pub fn print_collation(title: &str, collation: &Collation, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => print_json(collation),
        OutputFormat::Table => {
            let unknown = collation
                .unknown_counts
                .iter()
                .map(|(grapheme, count)| format!("{grapheme} x{count}"))
                .collect::<Vec<_>>()
                .join(", ");
            let rows = vec![
                FieldRow {
                    field: "title".into(),
                    value: title.to_string(),
                },
                FieldRow {
                    field: "cleaned title".into(),
                    value: collation.cleaned_title.clone(),
                },
                FieldRow {
                    field: "title updated".into(),
                    value: collation.is_title_updated.to_string(),
                },
                FieldRow {
                    field: "order key".into(),
                    value: collation.order_key.clone(),
                },
                FieldRow {
                    field: "unknown".into(),
                    value: unknown,
                },
            ];
            print_table(&rows);
            Ok(())
        }
    }
}

#[derive(Tabled)]
struct EntryRow {
    entry: String,
    title: String,
    #[tabled(rename = "cleaned title")]
    cleaned_title: String,
    #[tabled(rename = "previous key")]
    previous: String,
    #[tabled(rename = "new key")]
    new: String,
}

#[derive(Tabled)]
struct UnknownRow {
    grapheme: String,
    count: usize,
}

/// Print a site recalculation report.
pub fn print_recalculation(report: &RecalculationReport, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => print_json(report),
        OutputFormat::Table => {
            if report.updated_entries.is_empty() {
                println!("All entries of site {} are up to date.", report.site_id);
            } else {
                let rows: Vec<EntryRow> = report
                    .updated_entries
                    .iter()
                    .map(|e| EntryRow {
                        entry: e.entry_id.clone(),
                        title: e.title.clone(),
                        cleaned_title: e.cleaned_title.clone(),
                        previous: e.previous_custom_order.clone(),
                        new: e.new_custom_order.clone(),
                    })
                    .collect();
                print_table(&rows);
            }

            if !report.unknown_character_count.is_empty() {
                let rows: Vec<UnknownRow> = report
                    .unknown_character_count
                    .iter()
                    .map(|(grapheme, count)| UnknownRow {
                        grapheme: grapheme.clone(),
                        count: *count,
                    })
                    .collect();
                println!("Characters missing from the alphabet:");
                print_table(&rows);
            }
            Ok(())
        }
    }
}
