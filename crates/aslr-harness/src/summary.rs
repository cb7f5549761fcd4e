//! Human-readable and JSON renderings of reports.

use crate::compare::DivergenceReport;
use crate::report::AddressReport;

/// Table of per-key addresses from both runs.
pub fn divergence_table(result: &DivergenceReport) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "{:<24}  {:>18}  {:>18}  {:>4}  {}\n",
        "Region", "Run 1", "Run 2", "Bits", "Status"
    ));
    out.push_str(&"-".repeat(80));
    out.push('\n');

    for entry in &result.entries {
        let status = if entry.collides() { "SAME" } else { "ok" };
        out.push_str(&format!(
            "{:<24}  {:>#18x}  {:>#18x}  {:>4}  {}\n",
            entry.key,
            entry.first,
            entry.second,
            entry.differing_bits(),
            status
        ));
    }
    for key in &result.unmatched {
        out.push_str(&format!("{:<24}  (only in run 2, not compared)\n", key));
    }

    let collisions = result.collisions().len();
    out.push('\n');
    if collisions == 0 {
        out.push_str(&format!(
            "RESULT: PASS ({} regions randomized)\n",
            result.entries.len()
        ));
    } else {
        out.push_str(&format!(
            "RESULT: FAIL ({}/{} regions unchanged)\n",
            collisions,
            result.entries.len()
        ));
    }
    out
}

/// Table of one decoded report.
pub fn report_table(report: &AddressReport) -> String {
    let mut out = String::new();
    out.push_str(&format!("{:<24}  {:>18}\n", "Region", "Address"));
    out.push_str(&"-".repeat(44));
    out.push('\n');
    for (key, addr) in report.iter() {
        out.push_str(&format!("{:<24}  {:>#18x}\n", key, addr));
    }
    out
}

/// Pretty-printed JSON for any serializable report.
pub fn to_json<T: serde::Serialize>(value: &T) -> serde_json::Result<String> {
    serde_json::to_string_pretty(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compare::compare_reports;

    fn report(pairs: &[(&str, u64)]) -> AddressReport {
        pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    #[test]
    fn passing_table() {
        let result = compare_reports(
            &report(&[("kernel", 0x1000), ("heap", 0x2000)]),
            &report(&[("kernel", 0x1500), ("heap", 0x2500)]),
        )
        .unwrap();
        let table = divergence_table(&result);
        assert!(table.contains("RESULT: PASS (2 regions randomized)"));
        assert!(table.contains("0x1500"));
        assert!(!table.contains("SAME"));
    }

    #[test]
    fn failing_table_marks_collisions() {
        let result = compare_reports(
            &report(&[("kernel", 0x1000), ("heap", 0x2000)]),
            &report(&[("kernel", 0x1000), ("heap", 0x2500), ("stack", 0x10)]),
        )
        .unwrap();
        let table = divergence_table(&result);
        assert!(table.contains("SAME"));
        assert!(table.contains("RESULT: FAIL (1/2 regions unchanged)"));
        assert!(table.contains("stack"));
    }

    #[test]
    fn divergence_json_shape() {
        let result = compare_reports(&report(&[("kernel", 1)]), &report(&[("kernel", 3)])).unwrap();
        let json: serde_json::Value = serde_json::from_str(&to_json(&result).unwrap()).unwrap();
        assert_eq!(json["entries"][0]["key"], "kernel");
        assert_eq!(json["entries"][0]["first"], 1);
        assert_eq!(json["entries"][0]["second"], 3);
        assert_eq!(json["unmatched"].as_array().unwrap().len(), 0);
    }

    #[test]
    fn report_table_lists_every_region() {
        let table = report_table(&report(&[("a", 0x10), ("b", 0x20)]));
        assert!(table.contains("0x10"));
        assert!(table.contains("0x20"));
        assert_eq!(table.lines().count(), 4);
    }
}
