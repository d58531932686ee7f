use crate::metrics::MetricsReport;
use crate::model::Violation;

/// Render a deterministic markdown report from metrics and violations.
pub fn render_report(
    metrics: &MetricsReport,
    violations: &[Violation],
    max_examples: usize,
) -> String {
    let mut lines = Vec::new();

    lines.push("# fakelake Evaluation Report".to_string());
    lines.push(String::new());
    lines.push("## Run summary".to_string());
    lines.push(format!("- run_id: {}", metrics.run_id));
    lines.push(format!("- base_dir: {}", metrics.base_dir));
    let seed = metrics
        .seed
        .map(|seed| seed.to_string())
        .unwrap_or_else(|| "-".to_string());
    lines.push(format!("- seed: {seed}"));
    lines.push(format!("- violations: {}", metrics.violations_total));
    lines.push(String::new());

    lines.push("## Tables and row counts".to_string());
    lines.push("| table | rows_expected | rows_found |".to_string());
    lines.push("| --- | --- | --- |".to_string());
    for table in &metrics.tables {
        lines.push(format!(
            "| {} | {} | {} |",
            table.table,
            optional(table.rows_expected),
            table.rows_found
        ));
    }
    lines.push(format!(
        "| fato_vendas | {} | {} |",
        optional(metrics.facts.rows_expected),
        metrics.facts.rows_found
    ));
    lines.push(String::new());

    lines.push("## Fact chunks".to_string());
    lines.push(format!("- partition_layout: {}", metrics.facts.partition_layout));
    lines.push(format!("- chunks: {}", metrics.facts.chunks_found));
    lines.push(format!("- files: {}", metrics.facts.files_found));
    if let (Some(min), Some(max)) = (metrics.facts.min_id, metrics.facts.max_id) {
        lines.push(format!("- sale ids: {min}..={max}"));
    }
    lines.push(String::new());

    lines.push("## Checks".to_string());
    lines.push("| check | checked | violations |".to_string());
    lines.push("| --- | --- | --- |".to_string());
    for (name, stats) in metrics.checks.named() {
        lines.push(format!(
            "| {name} | {} | {} |",
            stats.checked, stats.violations
        ));
    }
    lines.push(String::new());

    if !metrics.warnings.is_empty() {
        lines.push("## Warnings".to_string());
        for warning in &metrics.warnings {
            let hint = warning
                .hint
                .as_ref()
                .map(|hint| format!(" (hint: {hint})"))
                .unwrap_or_default();
            lines.push(format!("- {}: {}{}", warning.path, warning.message, hint));
        }
        lines.push(String::new());
    }

    if !violations.is_empty() {
        lines.push("## Top violations".to_string());
        for violation in violations.iter().take(max_examples) {
            let row = violation
                .row_id
                .map(|row| format!(" id {row}"))
                .unwrap_or_default();
            let example = violation
                .example
                .as_ref()
                .map(|value| format!(" example={value}"))
                .unwrap_or_default();
            lines.push(format!(
                "- [{}] {}{}: {}{}",
                violation.code, violation.path, row, violation.message, example
            ));
        }
        lines.push(String::new());
    }

    lines.push("## Recommendations".to_string());
    lines.extend(recommendations(metrics));
    lines.join("\n")
}

fn optional(value: Option<u64>) -> String {
    value
        .map(|value| value.to_string())
        .unwrap_or_else(|| "-".to_string())
}

fn recommendations(metrics: &MetricsReport) -> Vec<String> {
    let checks = &metrics.checks;
    let mut lines = Vec::new();
    if checks.row_counts.violations > 0 || checks.fact_ids.violations > 0 {
        lines.push("- rerun the facts stage; chunks are missing or were overwritten by a different run.".to_string());
    }
    if checks.referential.violations > 0 || checks.unit_value.violations > 0 {
        lines.push("- regenerate facts after the dimensions they were sampled from.".to_string());
    }
    if checks.sale_date_range.violations > 0 {
        lines.push("- compare the configured sale dates with the fact manifest.".to_string());
    }
    if metrics.violations_total == 0 {
        lines.push("- no violations detected; compare metrics across runs for drift.".to_string());
    }
    lines
}
