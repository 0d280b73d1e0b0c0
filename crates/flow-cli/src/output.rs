//! Human-readable rendering of a metrics record

use flow_core::ItemKind;
use flow_pipeline::MetricsRecord;
use std::fmt;

/// Rows shown in the aging table
const AGING_ROWS: usize = 10;

/// Plain-text report over one record
pub(crate) struct TextReport<'a>(pub(crate) &'a MetricsRecord);

impl fmt::Display for TextReport<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let record = self.0;
        let metrics = &record.metrics;

        writeln!(f, "{} (#{})", record.project.name, record.project.id)?;
        writeln!(f, "generated {}", metrics.generated_at.format("%Y-%m-%d %H:%M:%S UTC"))?;
        if record.partial {
            writeln!(f, "\nPARTIAL DATA")?;
            for warning in &record.warnings {
                writeln!(
                    f,
                    "  {} [{}]: {} ({} records kept)",
                    warning.source, warning.category, warning.message, warning.records_collected
                )?;
            }
        }

        writeln!(f, "\nItems")?;
        for kind in ItemKind::ALL {
            let total = metrics.totals.get(&kind).copied().unwrap_or(0);
            writeln!(f, "  {:<8} {total}", kind.as_str())?;
        }

        writeln!(f, "\nStatus distribution")?;
        for (status, count) in &metrics.status_counts {
            writeln!(f, "  {status:<24} {count}")?;
        }

        writeln!(f, "\nWork in progress: {}", metrics.wip.count)?;
        for (status, count) in &metrics.wip.count_by_status {
            writeln!(f, "  {status:<24} {count}")?;
        }

        writeln!(f, "\nOldest open items")?;
        for entry in metrics.aging.iter().take(AGING_ROWS) {
            let reference = entry.reference.map_or_else(|| "-".to_string(), |r| format!("#{r}"));
            writeln!(
                f,
                "  {reference:<7} {:>4}d  {:<18} {:<16} {}",
                entry.age_days, entry.status, entry.assignee, entry.subject
            )?;
        }

        writeln!(f, "\nThroughput (7 days): {}", metrics.throughput)?;
        match cycle_summary(&metrics.cycle_times) {
            Some((mean, median)) => writeln!(
                f,
                "Cycle time: mean {mean:.1}d, median {median}d over {} items",
                metrics.cycle_times.len()
            )?,
            None => writeln!(f, "Cycle time: no completed items")?,
        }
        writeln!(
            f,
            "Flowback: {:.1}% ({} of {} transitions)",
            metrics.flowback.rate, metrics.flowback.regressions, metrics.flowback.transitions
        )?;

        if !metrics.issues.by_type.is_empty() {
            writeln!(f, "\nIssues")?;
            for (label, counts) in [
                ("type", &metrics.issues.by_type),
                ("severity", &metrics.issues.by_severity),
                ("priority", &metrics.issues.by_priority),
            ] {
                let joined: Vec<String> = counts.iter().map(|(k, v)| format!("{k}={v}")).collect();
                writeln!(f, "  by {label:<9} {}", joined.join(", "))?;
            }
        }

        if !record.data_quality.is_empty() {
            writeln!(f, "\n{} data quality issues", record.data_quality.len())?;
        }
        Ok(())
    }
}

/// Mean and median of the samples
fn cycle_summary(samples: &[i64]) -> Option<(f64, i64)> {
    if samples.is_empty() {
        return None;
    }
    let mut sorted = samples.to_vec();
    sorted.sort_unstable();
    #[allow(clippy::cast_precision_loss)]
    let mean = sorted.iter().sum::<i64>() as f64 / sorted.len() as f64;
    Some((mean, sorted[sorted.len() / 2]))
}
