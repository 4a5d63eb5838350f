//! Table formatting helpers for CLI output.

use comfy_table::{ContentArrangement, Table};
use container_factory_runtime::BuildReport;

/// Create a borderless table with the given headers.
pub fn new_table(headers: &[&str]) -> Table {
    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.load_preset(comfy_table::presets::NOTHING);
    table.set_header(headers);
    table
}

/// One row per image: build status, then push status.
pub fn build_report_table(report: &BuildReport, pushed: bool) -> Table {
    let mut table = new_table(&["IMAGE", "BUILD", "PUSH"]);
    for name in &report.built {
        let push = if !pushed {
            "skipped"
        } else if report.push_failed.contains(name) {
            "failed"
        } else {
            "ok"
        };
        table.add_row(vec![name.as_str(), "ok", push]);
    }
    for name in &report.failed {
        table.add_row(vec![name.as_str(), "failed", "-"]);
    }
    table
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report() -> BuildReport {
        BuildReport {
            built: vec!["base".to_string(), "mid".to_string()],
            failed: vec!["broken".to_string()],
            push_failed: vec!["mid".to_string()],
        }
    }

    fn rows(table: &Table) -> Vec<String> {
        table
            .to_string()
            .lines()
            .map(|l| l.split_whitespace().collect::<Vec<_>>().join(" "))
            .collect()
    }

    #[test]
    fn test_build_report_table() {
        let rows = rows(&build_report_table(&report(), true));
        assert_eq!(rows[0], "IMAGE BUILD PUSH");
        assert!(rows.contains(&"base ok ok".to_string()));
        assert!(rows.contains(&"mid ok failed".to_string()));
        assert!(rows.contains(&"broken failed -".to_string()));
    }

    #[test]
    fn test_build_report_table_local_only() {
        let rows = rows(&build_report_table(&report(), false));
        assert!(rows.contains(&"base ok skipped".to_string()));
    }
}
