use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use fleetmx_core::{DomainError, DomainResult, Entity, WorkOrderId};
use fleetmx_fleet::Criticality;

/// Work order status lifecycle: `pendiente → en_progreso → completada`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkOrderStatus {
    #[default]
    Pendiente,
    #[serde(alias = "en progreso")]
    EnProgreso,
    Completada,
}

impl WorkOrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkOrderStatus::Pendiente => "pendiente",
            WorkOrderStatus::EnProgreso => "en_progreso",
            WorkOrderStatus::Completada => "completada",
        }
    }

    /// Open orders block the scheduler from emitting another one for the same pair.
    pub fn is_open(&self) -> bool {
        matches!(self, WorkOrderStatus::Pendiente | WorkOrderStatus::EnProgreso)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, WorkOrderStatus::Completada)
    }
}

impl core::fmt::Display for WorkOrderStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl core::str::FromStr for WorkOrderStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace(' ', "_").as_str() {
            "pendiente" => Ok(WorkOrderStatus::Pendiente),
            "en_progreso" => Ok(WorkOrderStatus::EnProgreso),
            "completada" => Ok(WorkOrderStatus::Completada),
            other => Err(DomainError::invalid(format!("unknown work order status '{other}'"))),
        }
    }
}

/// What the technician reports when closing an order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompletionReport {
    pub start_time: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub materials_used: Vec<String>,
    pub notes: Option<String>,
}

impl CompletionReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_start_time(mut self, at: DateTime<Utc>) -> Self {
        self.start_time = Some(at);
        self
    }

    pub fn with_completed_at(mut self, at: DateTime<Utc>) -> Self {
        self.completed_at = Some(at);
        self
    }

    pub fn with_materials<I, S>(mut self, materials: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.materials_used = materials.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }
}

/// Result of [`WorkOrder::complete`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionOutcome {
    /// The order moved into `completada`. `clamped` is set when the reported
    /// completion time preceded the start time and was raised to it.
    Completed { clamped: bool },
    /// The order was already terminal; nothing changed.
    AlreadyCompleted,
}

/// Stored field values used to rebuild an order from a snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkOrderParts {
    pub id: WorkOrderId,
    pub equipment_id: String,
    pub component_name: String,
    pub due_date: NaiveDate,
    pub reason: String,
    pub classification: Criticality,
    pub materials_used: Vec<String>,
    pub notes: Option<String>,
    pub status: WorkOrderStatus,
    pub created_at: DateTime<Utc>,
    pub start_time: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

/// One maintenance task instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkOrder {
    id: WorkOrderId,
    equipment_id: String,
    component_name: String,
    due_date: NaiveDate,
    reason: String,
    classification: Criticality,
    materials_used: Vec<String>,
    notes: Option<String>,
    status: WorkOrderStatus,
    created_at: DateTime<Utc>,
    start_time: Option<DateTime<Utc>>,
    completed_at: Option<DateTime<Utc>>,
}

impl WorkOrder {
    /// Open a new `pendiente` order.
    pub fn open(
        equipment_id: impl Into<String>,
        component_name: impl Into<String>,
        due_date: NaiveDate,
        reason: impl Into<String>,
        classification: Criticality,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: WorkOrderId::new(),
            equipment_id: equipment_id.into(),
            component_name: component_name.into(),
            due_date,
            reason: reason.into(),
            classification,
            materials_used: Vec::new(),
            notes: None,
            status: WorkOrderStatus::Pendiente,
            created_at,
            start_time: None,
            completed_at: None,
        }
    }

    /// Rebuild an order from stored parts.
    ///
    /// A stored completion time earlier than the start time is raised to it.
    pub fn restore(parts: WorkOrderParts) -> Self {
        let completed_at = match (parts.start_time, parts.completed_at) {
            (Some(start), Some(end)) if end < start => Some(start),
            (_, end) => end,
        };
        Self {
            id: parts.id,
            equipment_id: parts.equipment_id,
            component_name: parts.component_name,
            due_date: parts.due_date,
            reason: parts.reason,
            classification: parts.classification,
            materials_used: parts.materials_used,
            notes: parts.notes,
            status: parts.status,
            created_at: parts.created_at,
            start_time: parts.start_time,
            completed_at,
        }
    }

    pub fn equipment_id(&self) -> &str {
        &self.equipment_id
    }

    pub fn component_name(&self) -> &str {
        &self.component_name
    }

    pub fn due_date(&self) -> NaiveDate {
        self.due_date
    }

    pub fn reason(&self) -> &str {
        &self.reason
    }

    pub fn classification(&self) -> Criticality {
        self.classification
    }

    pub fn materials_used(&self) -> &[String] {
        &self.materials_used
    }

    pub fn notes(&self) -> Option<&str> {
        self.notes.as_deref()
    }

    pub fn status(&self) -> WorkOrderStatus {
        self.status
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn start_time(&self) -> Option<DateTime<Utc>> {
        self.start_time
    }

    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }

    pub fn is_open(&self) -> bool {
        self.status.is_open()
    }

    /// Whether this order is an open order for the given (asset, component) pair.
    pub fn is_open_for(&self, equipment_id: &str, component_name: &str) -> bool {
        self.is_open() && self.equipment_id == equipment_id && self.component_name == component_name
    }

    /// `pendiente → en_progreso`.
    pub fn start(&mut self, start_time: DateTime<Utc>) -> DomainResult<()> {
        if self.status != WorkOrderStatus::Pendiente {
            return Err(DomainError::inconsistent(format!(
                "order {} is {}; only pendiente orders can be started",
                self.id, self.status
            )));
        }
        self.status = WorkOrderStatus::EnProgreso;
        self.start_time = Some(start_time);
        Ok(())
    }

    /// Move into `completada`, recording materials and notes.
    ///
    /// Completing an already completed order is a no-op. A start time in the
    /// report is only used when none was recorded when the order was started.
    pub fn complete(&mut self, report: CompletionReport, now: DateTime<Utc>) -> CompletionOutcome {
        if self.status.is_terminal() {
            return CompletionOutcome::AlreadyCompleted;
        }

        if self.start_time.is_none() {
            self.start_time = report.start_time;
        }

        let mut completed_at = self.completed_at.or(report.completed_at).unwrap_or(now);
        let mut clamped = false;
        if let Some(start) = self.start_time {
            if completed_at < start {
                tracing::warn!(
                    order_id = %self.id,
                    reported = %completed_at,
                    start = %start,
                    "completion time precedes start time; clamping to start"
                );
                completed_at = start;
                clamped = true;
            }
        }

        self.materials_used = report
            .materials_used
            .iter()
            .map(|m| m.trim())
            .filter(|m| !m.is_empty())
            .map(str::to_string)
            .collect();
        self.notes = report
            .notes
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty());
        self.completed_at = Some(completed_at);
        self.status = WorkOrderStatus::Completada;

        CompletionOutcome::Completed { clamped }
    }

    pub fn reclassify(&mut self, classification: Criticality) -> DomainResult<()> {
        self.ensure_editable()?;
        self.classification = classification;
        Ok(())
    }

    pub fn reschedule(&mut self, due_date: NaiveDate) -> DomainResult<()> {
        self.ensure_editable()?;
        self.due_date = due_date;
        Ok(())
    }

    fn ensure_editable(&self) -> DomainResult<()> {
        if self.status.is_terminal() {
            return Err(DomainError::inconsistent(format!(
                "order {} is completada and can no longer be edited",
                self.id
            )));
        }
        Ok(())
    }
}

impl Entity for WorkOrder {
    type Id = WorkOrderId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 2, 8, 0, 0).unwrap()
    }

    fn order() -> WorkOrder {
        WorkOrder::open(
            "TR-001",
            "Amortiguadores",
            t0().date_naive(),
            "scheduled maintenance",
            Criticality::Alta,
            t0(),
        )
    }

    #[test]
    fn new_order_is_pending_and_open() {
        let o = order();
        assert_eq!(o.status(), WorkOrderStatus::Pendiente);
        assert!(o.is_open_for("TR-001", "Amortiguadores"));
        assert!(!o.is_open_for("TR-001", "Luces"));
        assert!(o.start_time().is_none());
        assert!(o.completed_at().is_none());
    }

    #[test]
    fn full_lifecycle_pending_to_in_progress_to_completed() {
        let mut o = order();
        o.start(t0() + Duration::hours(1)).unwrap();
        assert_eq!(o.status(), WorkOrderStatus::EnProgreso);
        assert!(o.is_open());

        let outcome = o.complete(
            CompletionReport::new()
                .with_materials(["Amortiguador delantero", "  ", " grasa "])
                .with_notes("  cambio ok "),
            t0() + Duration::hours(3),
        );
        assert_eq!(outcome, CompletionOutcome::Completed { clamped: false });
        assert_eq!(o.status(), WorkOrderStatus::Completada);
        assert_eq!(o.materials_used(), ["Amortiguador delantero", "grasa"]);
        assert_eq!(o.notes(), Some("cambio ok"));
        assert_eq!(o.completed_at(), Some(t0() + Duration::hours(3)));
        assert!(!o.is_open());
    }

    #[test]
    fn direct_completion_from_pending_is_allowed() {
        let mut o = order();
        let outcome = o.complete(CompletionReport::new(), t0());
        assert_eq!(outcome, CompletionOutcome::Completed { clamped: false });
        assert!(o.start_time().is_none());
        assert_eq!(o.completed_at(), Some(t0()));
    }

    #[test]
    fn completion_before_start_is_clamped() {
        let mut o = order();
        let start = t0() + Duration::hours(5);
        let outcome = o.complete(
            CompletionReport::new()
                .with_start_time(start)
                .with_completed_at(t0() + Duration::hours(2)),
            t0() + Duration::hours(6),
        );
        assert_eq!(outcome, CompletionOutcome::Completed { clamped: true });
        assert_eq!(o.start_time(), Some(start));
        assert_eq!(o.completed_at(), Some(start));
    }

    #[test]
    fn recorded_start_wins_over_reported_start() {
        let mut o = order();
        o.start(t0()).unwrap();
        o.complete(
            CompletionReport::new().with_start_time(t0() + Duration::hours(9)),
            t0() + Duration::hours(1),
        );
        assert_eq!(o.start_time(), Some(t0()));
    }

    #[test]
    fn completed_order_is_final() {
        let mut o = order();
        o.complete(CompletionReport::new().with_materials(["filtro"]), t0());
        let snapshot = o.clone();

        let again = o.complete(
            CompletionReport::new().with_materials(["otro"]),
            t0() + Duration::days(1),
        );
        assert_eq!(again, CompletionOutcome::AlreadyCompleted);
        assert_eq!(o, snapshot);

        assert!(matches!(o.start(t0()), Err(DomainError::InconsistentState(_))));
        assert!(matches!(
            o.reclassify(Criticality::Baja),
            Err(DomainError::InconsistentState(_))
        ));
        assert!(o.reschedule(t0().date_naive()).is_err());
    }

    #[test]
    fn cannot_start_twice() {
        let mut o = order();
        o.start(t0()).unwrap();
        assert!(matches!(o.start(t0()), Err(DomainError::InconsistentState(_))));
    }

    #[test]
    fn open_orders_can_be_reclassified_and_rescheduled() {
        let mut o = order();
        o.reclassify(Criticality::Baja).unwrap();
        let later = NaiveDate::from_ymd_opt(2025, 7, 1).unwrap();
        o.reschedule(later).unwrap();
        assert_eq!(o.classification(), Criticality::Baja);
        assert_eq!(o.due_date(), later);
    }

    #[test]
    fn restore_raises_completion_to_start() {
        let start = t0() + Duration::hours(4);
        let o = WorkOrder::restore(WorkOrderParts {
            id: "abc123".parse().unwrap(),
            equipment_id: "TR-001".into(),
            component_name: "Luces".into(),
            due_date: t0().date_naive(),
            reason: "manually scheduled".into(),
            classification: Criticality::Media,
            materials_used: vec![],
            notes: None,
            status: WorkOrderStatus::Completada,
            created_at: t0(),
            start_time: Some(start),
            completed_at: Some(t0()),
        });
        assert_eq!(o.completed_at(), Some(start));
        assert_eq!(o.id().as_str(), "abc123");
    }

    #[test]
    fn status_parses_legacy_spelling() {
        assert_eq!(
            "en progreso".parse::<WorkOrderStatus>().unwrap(),
            WorkOrderStatus::EnProgreso
        );
        assert!("cancelada".parse::<WorkOrderStatus>().is_err());
    }
}
