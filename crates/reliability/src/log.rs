use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use fleetmx_core::{DomainError, DomainResult};

/// One reported failure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailureEntry {
    pub timestamp: DateTime<Utc>,
    pub equipment_id: String,
    pub component_name: String,
    pub description: String,
    pub repair_time_hours: f64,
}

impl FailureEntry {
    fn matches(&self, equipment_id: &str, component_name: Option<&str>) -> bool {
        self.equipment_id == equipment_id
            && component_name.is_none_or(|c| self.component_name == c)
    }
}

/// Append-only failure history.
///
/// Entries keep insertion order and are never edited or removed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReliabilityLog {
    entries: Vec<FailureEntry>,
}

impl ReliabilityLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a failure stamped at `now`.
    pub fn log_failure(
        &mut self,
        equipment_id: impl Into<String>,
        component_name: impl Into<String>,
        description: impl Into<String>,
        repair_time_hours: f64,
        now: DateTime<Utc>,
    ) -> DomainResult<&FailureEntry> {
        self.append(FailureEntry {
            timestamp: now,
            equipment_id: equipment_id.into(),
            component_name: component_name.into(),
            description: description.into(),
            repair_time_hours,
        })
    }

    /// Append a fully formed entry (used when loading history).
    pub fn append(&mut self, entry: FailureEntry) -> DomainResult<&FailureEntry> {
        if !entry.repair_time_hours.is_finite() || entry.repair_time_hours < 0.0 {
            return Err(DomainError::invalid(format!(
                "repair_time_hours must be finite and non-negative (got {})",
                entry.repair_time_hours
            )));
        }
        tracing::info!(
            equipment_id = %entry.equipment_id,
            component = %entry.component_name,
            repair_time_hours = entry.repair_time_hours,
            "failure logged"
        );
        self.entries.push(entry);
        Ok(&self.entries[self.entries.len() - 1])
    }

    pub fn entries(&self) -> &[FailureEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Matching entries for an asset, optionally narrowed to one component.
    pub fn entries_for<'a>(
        &'a self,
        equipment_id: &'a str,
        component_name: Option<&'a str>,
    ) -> impl Iterator<Item = &'a FailureEntry> + 'a {
        self.entries
            .iter()
            .filter(move |e| e.matches(equipment_id, component_name))
    }

    /// Mean time between failures, in hours.
    ///
    /// Span between the earliest and latest matching failure divided by the
    /// number of intervals. `None` for fewer than two failures.
    pub fn calculate_mtbf(&self, equipment_id: &str, component_name: Option<&str>) -> Option<f64> {
        let mut times: Vec<DateTime<Utc>> = self
            .entries_for(equipment_id, component_name)
            .map(|e| e.timestamp)
            .collect();
        if times.len() < 2 {
            return None;
        }
        times.sort();

        let first = times[0];
        let last = times[times.len() - 1];
        let span_hours = (last - first).num_milliseconds() as f64 / 3_600_000.0;
        Some(span_hours / (times.len() - 1) as f64)
    }

    /// Mean time to repair, in hours. `None` when nothing matches.
    pub fn calculate_mttr(&self, equipment_id: &str, component_name: Option<&str>) -> Option<f64> {
        let (count, total) = self
            .entries_for(equipment_id, component_name)
            .fold((0usize, 0.0f64), |(n, sum), e| (n + 1, sum + e.repair_time_hours));
        if count == 0 {
            return None;
        }
        Some(total / count as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap()
    }

    fn log_at(log: &mut ReliabilityLog, component: &str, offset_hours: i64, repair: f64) {
        log.log_failure(
            "TR-001",
            component,
            "falla",
            repair,
            t0() + Duration::hours(offset_hours),
        )
        .unwrap();
    }

    #[test]
    fn mtbf_is_undefined_below_two_entries() {
        let mut log = ReliabilityLog::new();
        assert_eq!(log.calculate_mtbf("TR-001", None), None);
        log_at(&mut log, "Amortiguadores", 0, 1.0);
        assert_eq!(log.calculate_mtbf("TR-001", Some("Amortiguadores")), None);
    }

    #[test]
    fn mtbf_for_two_and_three_entries() {
        let mut log = ReliabilityLog::new();
        log_at(&mut log, "Amortiguadores", 0, 1.0);
        log_at(&mut log, "Amortiguadores", 100, 1.0);
        assert_eq!(log.calculate_mtbf("TR-001", Some("Amortiguadores")), Some(100.0));

        let mut log = ReliabilityLog::new();
        log_at(&mut log, "Luces", 100, 1.0);
        log_at(&mut log, "Luces", 0, 1.0);
        log_at(&mut log, "Luces", 50, 1.0);
        assert_eq!(log.calculate_mtbf("TR-001", Some("Luces")), Some(50.0));
    }

    #[test]
    fn mtbf_without_component_spans_all_components() {
        let mut log = ReliabilityLog::new();
        log_at(&mut log, "Amortiguadores", 0, 1.0);
        log_at(&mut log, "Luces", 30, 1.0);
        log_at(&mut log, "Amortiguadores", 60, 1.0);
        assert_eq!(log.calculate_mtbf("TR-001", None), Some(30.0));
        assert_eq!(log.calculate_mtbf("TR-001", Some("Amortiguadores")), Some(60.0));
        assert_eq!(log.calculate_mtbf("TR-002", None), None);
    }

    #[test]
    fn mttr_is_mean_repair_time() {
        let mut log = ReliabilityLog::new();
        assert_eq!(log.calculate_mttr("TR-001", None), None);
        log_at(&mut log, "Amortiguadores", 0, 2.0);
        log_at(&mut log, "Amortiguadores", 1, 4.0);
        log_at(&mut log, "Amortiguadores", 2, 6.0);
        assert_eq!(log.calculate_mttr("TR-001", Some("Amortiguadores")), Some(4.0));
        assert_eq!(log.calculate_mttr("TR-001", Some("Luces")), None);
    }

    #[test]
    fn negative_repair_time_is_rejected() {
        let mut log = ReliabilityLog::new();
        let err = log
            .log_failure("TR-001", "Luces", "x", -0.5, t0())
            .unwrap_err();
        assert!(matches!(err, DomainError::InvalidInput(_)));
        assert!(log.log_failure("TR-001", "Luces", "x", f64::NAN, t0()).is_err());
        assert!(log.is_empty());
    }

    #[test]
    fn entries_keep_insertion_order() {
        let mut log = ReliabilityLog::new();
        log_at(&mut log, "B", 10, 1.0);
        log_at(&mut log, "A", 0, 1.0);
        let names: Vec<&str> = log.entries().iter().map(|e| e.component_name.as_str()).collect();
        assert_eq!(names, ["B", "A"]);
    }

    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            /// Property: MTTR lies between the smallest and largest repair time.
            #[test]
            fn mttr_is_bounded_by_min_and_max(
                repairs in prop::collection::vec(0.0f64..500.0, 1..25)
            ) {
                let mut log = ReliabilityLog::new();
                for (i, r) in repairs.iter().enumerate() {
                    log.log_failure("TR-001", "P", "f", *r, t0() + Duration::hours(i as i64))
                        .unwrap();
                }
                let mttr = log.calculate_mttr("TR-001", Some("P")).unwrap();
                let min = repairs.iter().cloned().fold(f64::INFINITY, f64::min);
                let max = repairs.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
                prop_assert!(mttr >= min - 1e-9 && mttr <= max + 1e-9);
            }

            /// Property: evenly spaced failures give MTBF equal to the spacing.
            #[test]
            fn evenly_spaced_failures_give_the_spacing(step in 1i64..1_000, n in 2usize..20) {
                let mut log = ReliabilityLog::new();
                for i in 0..n {
                    let at = t0() + Duration::hours(step * i as i64);
                    log.log_failure("TR-001", "P", "f", 1.0, at).unwrap();
                }
                let mtbf = log.calculate_mtbf("TR-001", Some("P")).unwrap();
                prop_assert!((mtbf - step as f64).abs() < 1e-9);
            }
        }
    }
}
