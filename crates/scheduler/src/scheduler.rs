use chrono::{DateTime, Utc};

use fleetmx_core::{DomainError, DomainResult, Entity, WorkOrderId};
use fleetmx_fleet::{Fleet, ServiceRecord};
use fleetmx_orders::{CompletionOutcome, CompletionReport, WorkOrder};

/// Reason attached to orders emitted by due detection.
pub const SCHEDULED_REASON: &str = "scheduled maintenance";

/// Whether an open (`pendiente`/`en_progreso`) order exists for the pair.
pub fn has_open_order(orders: &[WorkOrder], equipment_id: &str, component_name: &str) -> bool {
    orders
        .iter()
        .any(|o| o.is_open_for(equipment_id, component_name))
}

/// Outcome of [`Scheduler::complete_order`].
#[derive(Debug, Clone, PartialEq)]
pub struct CompletedOrder {
    pub order: WorkOrder,
    pub outcome: CompletionOutcome,
    /// Baseline after completion; `None` when the order was already completed.
    pub record: Option<ServiceRecord>,
}

/// Maintenance scheduler over a fleet and its order book.
///
/// Holds no state of its own: every call is evaluated against the fleet and
/// orders it borrows, so results depend only on the current snapshot.
pub struct Scheduler<'a> {
    fleet: &'a mut Fleet,
    orders: &'a mut Vec<WorkOrder>,
}

impl<'a> Scheduler<'a> {
    pub fn new(fleet: &'a mut Fleet, orders: &'a mut Vec<WorkOrder>) -> Self {
        Self { fleet, orders }
    }

    /// Emit a `pendiente` order for every due (asset, policy) pair without an
    /// open order. Returns only the orders created by this call.
    ///
    /// Records with unusable readings are logged and skipped. Assets that
    /// receive a new order move to `en_mantenimiento`.
    pub fn check_due_maintenance(&mut self, now: DateTime<Utc>) -> Vec<WorkOrder> {
        let today = now.date_naive();
        let mut created: Vec<WorkOrder> = Vec::new();

        for asset in self.fleet.iter() {
            for record in asset.records() {
                let due = record.due_axis(today, asset.cumulative_hours(), asset.cumulative_km());
                let axis = match due {
                    Ok(Some(axis)) => axis,
                    Ok(None) => continue,
                    Err(err) => {
                        tracing::warn!(
                            asset_id = %asset.id(),
                            policy = record.policy_name(),
                            error = %err,
                            "skipping service record during due scan"
                        );
                        continue;
                    }
                };

                if has_open_order(self.orders.as_slice(), asset.id(), record.policy_name())
                    || has_open_order(&created, asset.id(), record.policy_name())
                {
                    tracing::debug!(
                        asset_id = %asset.id(),
                        policy = record.policy_name(),
                        "due but an open order already exists"
                    );
                    continue;
                }

                let order = WorkOrder::open(
                    asset.id().clone(),
                    record.policy_name(),
                    today,
                    SCHEDULED_REASON,
                    record.policy().criticality(),
                    now,
                );
                tracing::info!(
                    order_id = %order.id(),
                    asset_id = %asset.id(),
                    policy = record.policy_name(),
                    trigger = %axis,
                    "scheduled maintenance order created"
                );
                created.push(order);
            }
        }

        for order in &created {
            if let Ok(asset) = self.fleet.get_mut(order.equipment_id()) {
                asset.mark_in_maintenance();
            }
        }
        self.orders.extend(created.iter().cloned());
        created
    }

    /// Complete an order and advance the matching service record.
    ///
    /// Fails with `NotFound` for an unknown id and `InconsistentState` when
    /// the order's asset is gone; in both cases nothing is modified. Completing
    /// an already completed order changes nothing.
    pub fn complete_order(
        &mut self,
        order_id: &WorkOrderId,
        report: CompletionReport,
        now: DateTime<Utc>,
    ) -> DomainResult<CompletedOrder> {
        let idx = self
            .orders
            .iter()
            .position(|o| o.id() == order_id)
            .ok_or_else(|| DomainError::not_found(format!("work order {order_id}")))?;

        if self.orders[idx].status().is_terminal() {
            return Ok(CompletedOrder {
                order: self.orders[idx].clone(),
                outcome: CompletionOutcome::AlreadyCompleted,
                record: None,
            });
        }

        let equipment_id = self.orders[idx].equipment_id().to_string();
        if !self.fleet.contains(&equipment_id) {
            return Err(DomainError::inconsistent(format!(
                "work order {order_id} references asset {equipment_id}, which no longer exists"
            )));
        }

        let order = &mut self.orders[idx];
        let outcome = order.complete(report, now);
        let component = order.component_name().to_string();
        let completed = order.clone();

        let still_open = self
            .orders
            .iter()
            .any(|o| o.is_open() && o.equipment_id() == equipment_id);

        let asset = self.fleet.get_mut(&equipment_id)?;
        let record = asset.advance_service(&component, now.date_naive()).clone();
        if !still_open {
            asset.mark_operational();
        }

        tracing::info!(
            order_id = %order_id,
            asset_id = %equipment_id,
            component = %component,
            last_service_hours = record.last_service_hours(),
            last_service_km = record.last_service_km(),
            asset_status = %asset.status(),
            "work order completed"
        );

        Ok(CompletedOrder {
            order: completed,
            outcome,
            record: Some(record),
        })
    }
}
