//! Output of normalized timelines and metric rows.

use std::fmt;
use std::io::Write;
use std::str::FromStr;

use anyhow::{bail, Result};
use serde::Serialize;

use crate::analyze::AnalysisResult;
use crate::timeline::Timeline;

const MAX_TRANSFER_WIDTH: usize = 50;
const TRANSFER_HEADER: &str = "transfer";

/// Summary output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Csv,
    Json,
    Table,
}

impl FromStr for OutputFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "csv" => Ok(OutputFormat::Csv),
            "json" => Ok(OutputFormat::Json),
            "table" => Ok(OutputFormat::Table),
            _ => bail!("Invalid output format: {s} (expected csv, json or table)"),
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OutputFormat::Csv => "csv",
            OutputFormat::Json => "json",
            OutputFormat::Table => "table",
        };
        f.write_str(name)
    }
}

/// Write one line per event: `transfer,label,relative_ts[,attachment...]`.
pub fn write_records<W: Write>(out: &mut W, timelines: &[Timeline]) -> Result<()> {
    for timeline in timelines {
        for event in &timeline.events {
            write!(out, "{},{},{}", event.transfer, event.label, event.ts)?;
            for value in &event.attachments {
                write!(out, ",{value}")?;
            }
            writeln!(out)?;
        }
    }
    Ok(())
}

#[derive(Serialize)]
struct JsonSummary<'a> {
    metrics: &'a [&'a str],
    transfers: &'a [AnalysisResult],
}

/// Write the metric rows of every transfer.
///
/// The csv format is a `", "`-joined header of metric names followed by one
/// comma-separated row of values per transfer.
pub fn write_summary<W: Write>(
    out: &mut W,
    metric_names: &[&str],
    results: &[AnalysisResult],
    format: OutputFormat,
) -> Result<()> {
    match format {
        OutputFormat::Csv => {
            writeln!(out, "{}", metric_names.join(", "))?;
            for result in results {
                let row: Vec<String> = result.values().iter().map(i64::to_string).collect();
                writeln!(out, "{}", row.join(","))?;
            }
        }
        OutputFormat::Json => {
            let summary = JsonSummary {
                metrics: metric_names,
                transfers: results,
            };
            writeln!(out, "{}", serde_json::to_string_pretty(&summary)?)?;
        }
        OutputFormat::Table => write_table(out, metric_names, results)?,
    }
    Ok(())
}

/// Cut `s` to at most `width` characters, marking the cut with `...`.
fn truncate(s: &str, width: usize) -> String {
    if s.chars().count() <= width {
        return s.to_string();
    }
    let mut cut: String = s.chars().take(width.saturating_sub(3)).collect();
    cut.push_str("...");
    cut
}

/// One aligned row per transfer. Transfer ids are opaque and may be long,
/// so that column is capped; metric values are always printed in full.
fn write_table<W: Write>(
    out: &mut W,
    metric_names: &[&str],
    results: &[AnalysisResult],
) -> Result<()> {
    if results.is_empty() {
        writeln!(out, "(no transfers)")?;
        return Ok(());
    }

    let transfers: Vec<String> = results
        .iter()
        .map(|r| truncate(r.transfer.as_str(), MAX_TRANSFER_WIDTH))
        .collect();
    let values: Vec<Vec<String>> = results
        .iter()
        .map(|r| r.values().iter().map(i64::to_string).collect())
        .collect();

    let mut widths = vec![transfers
        .iter()
        .map(|t| t.chars().count())
        .fold(TRANSFER_HEADER.len(), usize::max)];
    for (i, name) in metric_names.iter().enumerate() {
        let widest = values
            .iter()
            .filter_map(|row| row.get(i))
            .map(String::len)
            .fold(name.chars().count(), usize::max);
        widths.push(widest);
    }

    let header: Vec<String> = std::iter::once(TRANSFER_HEADER)
        .chain(metric_names.iter().copied())
        .zip(widths.iter().copied())
        .map(|(name, width)| format!("{name:width$}"))
        .collect();
    writeln!(out, "{}", header.join(" | "))?;

    let sep: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
    writeln!(out, "{}", sep.join("-+-"))?;

    for (transfer, row) in transfers.iter().zip(&values) {
        let cells: Vec<String> = std::iter::once(transfer)
            .chain(row)
            .zip(widths.iter().copied())
            .map(|(cell, width)| format!("{cell:width$}"))
            .collect();
        writeln!(out, "{}", cells.join(" | "))?;
    }
    Ok(())
}
