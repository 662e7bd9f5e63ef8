use std::collections::HashSet;

use chrono::{Duration, NaiveDate};
use serde::Serialize;

use fleetmx_core::Entity;
use fleetmx_fleet::{AssetStatus, Fleet};
use fleetmx_orders::{WorkOrder, WorkOrderStatus, WorkRequest};

/// Orders due up to this many days ahead count as "due soon".
pub const DUE_SOON_HORIZON_DAYS: i64 = 7;

/// Headline fleet figures for the dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FleetSummary {
    pub total_assets: usize,
    /// `operativo` with no pending request.
    pub available: usize,
    /// `pendiente` orders due on or before the horizon, overdue ones included.
    pub due_soon: usize,
    pub in_maintenance: usize,
}

impl FleetSummary {
    /// Share of available assets in percent; 0 for an empty fleet.
    pub fn availability_pct(&self) -> f64 {
        if self.total_assets == 0 {
            return 0.0;
        }
        self.available as f64 / self.total_assets as f64 * 100.0
    }
}

pub(crate) fn summarize(
    fleet: &Fleet,
    orders: &[WorkOrder],
    requests: &[WorkRequest],
    today: NaiveDate,
) -> FleetSummary {
    let horizon = today + Duration::days(DUE_SOON_HORIZON_DAYS);
    let requested: HashSet<&str> = requests
        .iter()
        .filter(|r| r.is_pending())
        .map(|r| r.equipment_id())
        .collect();

    let available = fleet
        .iter()
        .filter(|a| a.status() == AssetStatus::Operativo && !requested.contains(a.id().as_str()))
        .count();
    let in_maintenance = fleet
        .iter()
        .filter(|a| a.status() == AssetStatus::EnMantenimiento)
        .count();
    let due_soon = orders
        .iter()
        .filter(|o| o.status() == WorkOrderStatus::Pendiente && o.due_date() <= horizon)
        .count();

    FleetSummary {
        total_assets: fleet.len(),
        available,
        due_soon,
        in_maintenance,
    }
}
