//! Output formatting utilities for CLI commands

use comfy_table::{presets::UTF8_FULL_CONDENSED, Cell, Color, ContentArrangement, Table};
use scandrop::ingest::{FolderOutcome, NamingFlag, PassReport};

/// Print a table with custom column colors
pub fn print_table_colored(headers: &[&str], rows: Vec<Vec<(String, Option<Color>)>>) {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .set_content_arrangement(ContentArrangement::Dynamic);

    let header_cells: Vec<Cell> = headers
        .iter()
        .map(|h| Cell::new(h).fg(Color::Cyan))
        .collect();
    table.set_header(header_cells);

    for row in rows {
        let cells: Vec<Cell> = row
            .into_iter()
            .map(|(text, color)| match color {
                Some(c) => Cell::new(text).fg(c),
                None => Cell::new(text),
            })
            .collect();
        table.add_row(cells);
    }

    println!("{}", table);
}

pub fn color_for_flag(flag: NamingFlag) -> Color {
    match flag {
        NamingFlag::Ok => Color::Green,
        NamingFlag::NeedsReview => Color::Yellow,
    }
}

/// One table row per folder outcome: folder, result, flag, detail.
pub fn outcome_row(outcome: &FolderOutcome) -> Vec<(String, Option<Color>)> {
    match outcome {
        FolderOutcome::SkippedProcessed { name } => vec![
            (name.clone(), None),
            ("skipped".to_string(), Some(Color::Grey)),
            (String::new(), None),
            ("already in audit log".to_string(), None),
        ],
        FolderOutcome::SkippedExists { name } => vec![
            (name.clone(), None),
            ("skipped".to_string(), Some(Color::Grey)),
            (String::new(), None),
            ("already in destination".to_string(), None),
        ],
        FolderOutcome::SkippedNonUtf8 { path } => vec![
            (path.display().to_string(), None),
            ("skipped".to_string(), Some(Color::Grey)),
            (String::new(), None),
            ("name is not valid UTF-8".to_string(), None),
        ],
        FolderOutcome::Ingested {
            original_name,
            name,
            flag,
            destination,
            files,
        } => {
            let label = if original_name != name {
                format!("{} (was {})", name, original_name)
            } else {
                name.clone()
            };
            let detail = format!(
                "{} valid, {} renamed, {} unsupported, {} logged -> {}",
                files.valid,
                files.renamed,
                files.unsupported,
                files.logged,
                destination.display()
            );
            vec![
                (label, None),
                ("ingested".to_string(), Some(Color::Green)),
                (flag.to_string(), Some(color_for_flag(*flag))),
                (detail, None),
            ]
        }
        FolderOutcome::Failed { name, stage, error } => vec![
            (name.clone(), None),
            ("failed".to_string(), Some(Color::Red)),
            (String::new(), None),
            (format!("{}: {}", stage, error), Some(Color::Red)),
        ],
    }
}

/// Render a pass report as a table followed by a one-line summary.
pub fn print_report(report: &PassReport) {
    if report.outcomes.is_empty() {
        println!("No subfolders found in source directory.");
        return;
    }
    let rows = report.outcomes.iter().map(outcome_row).collect();
    print_table_colored(&["Folder", "Result", "Flag", "Detail"], rows);
    println!("{}", summary_line(report));
}

pub fn summary_line(report: &PassReport) -> String {
    format!(
        "{} ingested, {} skipped, {} failed ({} folders already in log)",
        report.ingested(),
        report.skipped(),
        report.failed(),
        report.processed_before
    )
}
