use std::fmt::Write;
use tracing::info;

use crate::core::dataset::ClassStats;

/// Render class counts as an aligned table with a total row
pub fn format_report(title: &str, stats: &ClassStats) -> String {
    let width = stats
        .iter()
        .map(|(label, _)| label.len())
        .chain(std::iter::once("Total".len()))
        .max()
        .unwrap_or(0);

    let mut out = String::new();
    let _ = writeln!(out, "{}", title);
    for (label, count) in stats.iter() {
        let _ = writeln!(out, "  {:<width$} | {:>6}", label, count, width = width);
    }
    let _ = write!(out, "  {:<width$} | {:>6}", "Total", stats.total(), width = width);
    out
}

/// Log a statistics table
pub fn report(title: &str, stats: &ClassStats) {
    for line in format_report(title, stats).lines() {
        info!("{}", line);
    }
}
