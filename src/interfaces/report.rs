//! Console output and file export for analysis reports.

use crate::application::analysis::AnalysisReport;
use crate::domain::clustering::{CountSelection, SelectionConfidence};
use anyhow::{Context, Result};
use std::fmt::Write as _;
use std::path::Path;

const RULE_WIDTH: usize = 80;
const BAR_WIDTH: usize = 40;

/// Prints and exports [`AnalysisReport`]s.
pub struct AnalysisReporter {
    output_dir: String,
}

impl AnalysisReporter {
    pub fn new(output_dir: &str) -> Self {
        Self {
            output_dir: output_dir.to_string(),
        }
    }

    /// Prints the header banner for an analysis run.
    pub fn print_header(&self, source: &str, instruments: usize, periods: (usize, usize), family: &str) {
        println!("{}", "=".repeat(RULE_WIDTH));
        println!("📈 EFFICIENCY RATIO CLUSTERING");
        println!("{}", "=".repeat(RULE_WIDTH));
        println!("Source:       {}", source);
        println!("Instruments:  {}", instruments);
        println!("Lengths:      [{}, {})", periods.0, periods.1);
        println!("Family:       {}", family);
        println!("{}", "=".repeat(RULE_WIDTH));
    }

    pub fn print_report(&self, report: &AnalysisReport) {
        print!("{}", Self::render_selection(&report.selection));
        print!("{}", Self::render_assignment(report));
        print!("{}", Self::render_summaries(report));
        print!("{}", Self::render_bar_chart(report));

        if !report.excluded_symbols.is_empty() {
            println!(
                "\n⚠️  Excluded (insufficient history): {}",
                report.excluded_symbols.join(", ")
            );
        }
        for column in &report.degenerate_columns {
            println!("⚠️  Constant feature column {} = {}", column.label, column.value);
        }
    }

    pub fn render_selection(selection: &CountSelection) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "\n🔢 Cluster count: {} ({:?})", selection.count, selection.method);
        if let SelectionConfidence::Degraded(reason) = selection.confidence {
            let _ = writeln!(out, "   ⚠️  Degraded selection: {}", reason);
        }
        if !selection.scores.is_empty() {
            let _ = writeln!(out, "   {:>4} | {:>14}", "k", "score");
            for (k, score) in &selection.scores {
                let marker = if *k == selection.count { " <" } else { "" };
                let _ = writeln!(out, "   {:>4} | {:>14.6}{}", k, score, marker);
            }
        }
        out
    }

    /// Instruments by ascending mean ratio.
    pub fn render_assignment(report: &AnalysisReport) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "\n{}", "=".repeat(RULE_WIDTH));
        let _ = writeln!(out, "{:<16} | {:>12} | {:>8}", "Instrument", "Mean ER", "Cluster");
        let _ = writeln!(out, "{}", "-".repeat(RULE_WIDTH));
        for row in report.assignment.sorted_by_mean_ratio() {
            let _ = writeln!(
                out,
                "{:<16} | {:>12.5} | {:>8}",
                row.symbol, row.mean_efficiency_ratio, row.cluster_label
            );
        }
        let _ = writeln!(out, "{}", "=".repeat(RULE_WIDTH));
        out
    }

    pub fn render_summaries(report: &AnalysisReport) -> String {
        let mut out = String::new();
        let _ = writeln!(
            out,
            "\n{:<8} | {:>7} | {:>9} | {:>9} | {:>9} | {:>9}",
            "Cluster", "Members", "Mean", "StdDev", "Min", "Max"
        );
        let _ = writeln!(out, "{}", "-".repeat(RULE_WIDTH));
        for summary in report.summaries() {
            let _ = writeln!(
                out,
                "{:<8} | {:>7} | {:>9.5} | {:>9.5} | {:>9.5} | {:>9.5}",
                summary.cluster_label,
                summary.members.len(),
                summary.mean_efficiency_ratio,
                summary.std_dev,
                summary.min,
                summary.max
            );
        }
        out
    }

    /// Horizontal bars of each instrument's mean ratio, tagged by cluster.
    pub fn render_bar_chart(report: &AnalysisReport) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "\n📊 Mean efficiency ratio by instrument");
        for row in report.assignment.sorted_by_mean_ratio() {
            let filled = (row.mean_efficiency_ratio.clamp(0.0, 1.0) * BAR_WIDTH as f64).round() as usize;
            let _ = writeln!(
                out,
                "{:<16} [C{}] {:<width$} {:.3}",
                row.symbol,
                row.cluster_label,
                "█".repeat(filled),
                row.mean_efficiency_ratio,
                width = BAR_WIDTH
            );
        }
        out
    }

    fn resolve(&self, filename: &str) -> String {
        if filename.contains('/') || filename.contains('\\') {
            filename.to_string()
        } else {
            format!("{}/{}", self.output_dir, filename)
        }
    }

    fn ensure_parent(path: &str) -> Result<()> {
        if let Some(parent) = Path::new(path).parent() {
            std::fs::create_dir_all(parent)
                .context(format!("Failed to create directory: {:?}", parent))?;
        }
        Ok(())
    }

    /// Writes the whole report as pretty JSON.
    pub fn export_json(&self, report: &AnalysisReport, filename: &str) -> Result<String> {
        let output_path = self.resolve(filename);
        Self::ensure_parent(&output_path)?;

        let json = serde_json::to_string_pretty(report).context("Failed to serialize report to JSON")?;
        std::fs::write(&output_path, json)
            .context(format!("Failed to write report to {}", output_path))?;

        println!("💾 Report saved to: {}", output_path);
        Ok(output_path)
    }

    /// Writes the `instrument,mean_efficiency_ratio,cluster_label` table.
    pub fn export_csv(&self, report: &AnalysisReport, filename: &str) -> Result<String> {
        let output_path = self.resolve(filename);
        Self::ensure_parent(&output_path)?;

        let file = std::fs::File::create(&output_path)
            .context(format!("Failed to create {}", output_path))?;
        Self::write_csv(report, file)?;

        println!("💾 Assignment saved to: {}", output_path);
        Ok(output_path)
    }

    pub fn write_csv<W: std::io::Write>(report: &AnalysisReport, writer: W) -> Result<()> {
        let mut wtr = csv::WriterBuilder::new().from_writer(writer);
        wtr.write_record(["instrument", "mean_efficiency_ratio", "cluster_label"])?;
        for row in report.assignment.rows() {
            wtr.write_record([
                row.symbol.clone(),
                format!("{:.5}", row.mean_efficiency_ratio),
                row.cluster_label.to_string(),
            ])?;
        }
        wtr.flush().context("Failed to flush CSV writer")?;
        Ok(())
    }
}

impl Default for AnalysisReporter {
    fn default() -> Self {
        Self::new(".")
    }
}
