use chrono::{DateTime, NaiveDate, Utc};

use fleetmx_core::{DomainError, DomainResult, Entity, RequestId, WorkOrderId};
use fleetmx_core::entity::{find_by_id, find_by_id_mut};
use fleetmx_fleet::{Asset, Criticality, Fleet, MaintenancePolicy, PolicyCatalog, ServiceRecord};
use fleetmx_inventory::{Inventory, PartStock};
use fleetmx_orders::{
    CompletionOutcome, CompletionReport, WorkOrder, WorkRequest, WorkRequestDraft,
};
use fleetmx_reliability::{FailureEntry, ReliabilityLog};
use fleetmx_scheduler::{CompletedOrder, Scheduler};

use crate::summary::{FleetSummary, summarize};

/// Reason used for manual orders when none is given.
pub const MANUAL_REASON: &str = "manually scheduled";

const NOTIFICATION_TIME_FORMAT: &str = "%Y-%m-%d %H:%M";

/// Explicit application context owning the maintenance model.
///
/// Every operation validates before applying, so a failed call leaves the
/// context unchanged. Operations that stamp time take it as an argument.
#[derive(Debug, Clone, PartialEq)]
pub struct MaintenanceContext {
    pub(crate) catalog: PolicyCatalog,
    pub(crate) fleet: Fleet,
    pub(crate) inventory: Inventory,
    pub(crate) orders: Vec<WorkOrder>,
    pub(crate) requests: Vec<WorkRequest>,
    pub(crate) failures: ReliabilityLog,
    pub(crate) notifications: Vec<String>,
}

impl Default for MaintenanceContext {
    fn default() -> Self {
        Self::new()
    }
}

impl MaintenanceContext {
    /// Empty context with the standard policy catalog.
    pub fn new() -> Self {
        Self::with_catalog(PolicyCatalog::standard())
    }

    pub fn with_catalog(catalog: PolicyCatalog) -> Self {
        Self {
            catalog,
            fleet: Fleet::new(),
            inventory: Inventory::new(),
            orders: Vec::new(),
            requests: Vec::new(),
            failures: ReliabilityLog::new(),
            notifications: Vec::new(),
        }
    }

    pub fn catalog(&self) -> &PolicyCatalog {
        &self.catalog
    }

    pub fn fleet(&self) -> &Fleet {
        &self.fleet
    }

    pub fn inventory(&self) -> &Inventory {
        &self.inventory
    }

    pub fn orders(&self) -> &[WorkOrder] {
        &self.orders
    }

    pub fn requests(&self) -> &[WorkRequest] {
        &self.requests
    }

    pub fn failures(&self) -> &ReliabilityLog {
        &self.failures
    }

    pub fn notifications(&self) -> &[String] {
        &self.notifications
    }

    pub fn asset(&self, id: &str) -> DomainResult<&Asset> {
        self.fleet.get(id)
    }

    pub fn order(&self, id: &WorkOrderId) -> DomainResult<&WorkOrder> {
        find_by_id(&self.orders, id)
            .ok_or_else(|| DomainError::not_found(format!("work order {id}")))
    }

    pub fn request(&self, id: &RequestId) -> DomainResult<&WorkRequest> {
        find_by_id(&self.requests, id)
            .ok_or_else(|| DomainError::not_found(format!("work request {id}")))
    }

    fn order_mut(&mut self, id: &WorkOrderId) -> DomainResult<&mut WorkOrder> {
        find_by_id_mut(&mut self.orders, id)
            .ok_or_else(|| DomainError::not_found(format!("work order {id}")))
    }

    fn notify(&mut self, message: String) {
        tracing::debug!(notification = %message, "notification recorded");
        self.notifications.push(message);
    }

    // ---- policies & assets ----

    /// Add a policy to the catalog used for new assets.
    pub fn define_policy(&mut self, policy: MaintenancePolicy) -> DomainResult<()> {
        self.catalog.add(policy)
    }

    /// Add an asset with every catalog policy registered as just serviced.
    pub fn add_asset(
        &mut self,
        id: impl Into<String>,
        description: impl Into<String>,
        today: NaiveDate,
    ) -> DomainResult<&Asset> {
        let id = id.into();
        if self.fleet.contains(&id) {
            return Err(DomainError::duplicate(format!("asset {id}")));
        }
        let mut asset = Asset::new(id, description)?;
        for policy in self.catalog.iter() {
            asset.register_component(policy.clone(), today, None, None, None)?;
        }
        tracing::info!(
            asset_id = %asset.id(),
            policies = asset.records().len(),
            "asset added"
        );
        let asset = self.fleet.add(asset)?;
        Ok(asset)
    }

    /// Remove an asset. Its orders, requests and failures are kept.
    pub fn remove_asset(&mut self, id: &str) -> DomainResult<Asset> {
        let asset = self.fleet.remove(id)?;
        let open = self
            .orders
            .iter()
            .filter(|o| o.is_open() && o.equipment_id() == id)
            .count();
        if open > 0 {
            tracing::warn!(
                asset_id = id,
                open_orders = open,
                "asset removed with open work orders"
            );
        } else {
            tracing::info!(asset_id = id, "asset removed");
        }
        Ok(asset)
    }

    pub fn register_component(
        &mut self,
        asset_id: &str,
        policy: MaintenancePolicy,
        today: NaiveDate,
        service_date: Option<NaiveDate>,
        service_hours: Option<f64>,
        service_km: Option<f64>,
    ) -> DomainResult<&ServiceRecord> {
        let asset = self.fleet.get_mut(asset_id)?;
        asset.register_component(policy, today, service_date, service_hours, service_km)
    }

    pub fn update_horometro(&mut self, asset_id: &str, delta_hours: f64) -> DomainResult<f64> {
        self.fleet.get_mut(asset_id)?.update_horometro(delta_hours)
    }

    pub fn update_odometro(&mut self, asset_id: &str, delta_km: f64) -> DomainResult<f64> {
        self.fleet.get_mut(asset_id)?.update_odometro(delta_km)
    }

    // ---- work orders ----

    /// Emit orders for every due (asset, policy) pair. See [`Scheduler`].
    pub fn check_due_maintenance(&mut self, now: DateTime<Utc>) -> Vec<WorkOrder> {
        Scheduler::new(&mut self.fleet, &mut self.orders).check_due_maintenance(now)
    }

    pub fn complete_order(
        &mut self,
        id: &WorkOrderId,
        report: CompletionReport,
        now: DateTime<Utc>,
    ) -> DomainResult<CompletedOrder> {
        let done =
            Scheduler::new(&mut self.fleet, &mut self.orders).complete_order(id, report, now)?;

        if let CompletionOutcome::Completed { clamped } = done.outcome {
            let order = &done.order;
            self.restore_request_status(order.equipment_id());
            if clamped {
                let start = order
                    .start_time()
                    .map(|t| t.format(NOTIFICATION_TIME_FORMAT).to_string())
                    .unwrap_or_default();
                self.notify(format!(
                    "order {id}: reported completion preceded the start time and was set to {start}"
                ));
            }
            let fmt = |t: Option<DateTime<Utc>>| {
                t.map(|t| t.format(NOTIFICATION_TIME_FORMAT).to_string())
                    .unwrap_or_else(|| "-".to_string())
            };
            let materials = if order.materials_used().is_empty() {
                "N/A".to_string()
            } else {
                order.materials_used().join(", ")
            };
            let message = format!(
                "order {id} completed (start: {}, end: {}, materials: {materials})",
                fmt(order.start_time()),
                fmt(order.completed_at()),
            );
            self.notify(message);
        }
        Ok(done)
    }

    /// An asset freed by a completion goes back to `en_solicitud` while a
    /// pending request still stands against it.
    fn restore_request_status(&mut self, equipment_id: &str) {
        let pending = self
            .requests
            .iter()
            .any(|r| r.is_pending() && r.equipment_id() == equipment_id);
        if !pending {
            return;
        }
        if let Ok(asset) = self.fleet.get_mut(equipment_id) {
            if asset.raise_request() {
                tracing::debug!(asset_id = equipment_id, "asset back to en_solicitud");
            }
        }
    }

    pub fn start_order(
        &mut self,
        id: &WorkOrderId,
        start_time: DateTime<Utc>,
    ) -> DomainResult<&WorkOrder> {
        let order = self.order_mut(id)?;
        order.start(start_time)?;
        tracing::info!(order_id = %id, start_time = %start_time, "work order started");
        Ok(order)
    }

    pub fn reclassify_order(
        &mut self,
        id: &WorkOrderId,
        classification: Criticality,
    ) -> DomainResult<&WorkOrder> {
        self.order_mut(id)?.reclassify(classification)?;
        self.notify(format!("order {id} reclassified to '{classification}'"));
        self.order(id)
    }

    pub fn reschedule_order(
        &mut self,
        id: &WorkOrderId,
        due_date: NaiveDate,
    ) -> DomainResult<&WorkOrder> {
        self.order_mut(id)?.reschedule(due_date)?;
        self.notify(format!("order {id} rescheduled to {due_date}"));
        self.order(id)
    }

    /// Open an order outside the scheduler. The asset moves to `en_mantenimiento`.
    pub fn create_manual_order(
        &mut self,
        equipment_id: &str,
        component_name: &str,
        classification: Criticality,
        due_date: NaiveDate,
        reason: Option<&str>,
        now: DateTime<Utc>,
    ) -> DomainResult<&WorkOrder> {
        if component_name.trim().is_empty() {
            return Err(DomainError::invalid("component name cannot be empty"));
        }
        let asset = self.fleet.get_mut(equipment_id)?;
        let reason = reason
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .unwrap_or(MANUAL_REASON);
        let order = WorkOrder::open(
            equipment_id,
            component_name,
            due_date,
            reason,
            classification,
            now,
        );
        asset.mark_in_maintenance();

        tracing::info!(
            order_id = %order.id(),
            asset_id = equipment_id,
            component = component_name,
            classification = %classification,
            "manual work order created"
        );
        self.notify(format!(
            "order {} created manually for asset {equipment_id} with criticality '{classification}'",
            order.id()
        ));
        self.orders.push(order);
        Ok(&self.orders[self.orders.len() - 1])
    }

    // ---- work requests ----

    /// Record an operations request; an `operativo` asset moves to `en_solicitud`.
    pub fn raise_request(
        &mut self,
        draft: WorkRequestDraft,
        now: DateTime<Utc>,
    ) -> DomainResult<&WorkRequest> {
        let asset = self.fleet.get_mut(&draft.equipment_id)?;
        let request = WorkRequest::raise(draft, now)?;
        asset.raise_request();
        tracing::info!(
            request_id = %request.id(),
            asset_id = request.equipment_id(),
            component = request.component_name(),
            "work request raised"
        );
        self.requests.push(request);
        Ok(&self.requests[self.requests.len() - 1])
    }

    /// Turn a pending request into a work order.
    ///
    /// The request's comments become the order reason and a failure entry
    /// with zero repair time is logged for the component.
    pub fn convert_request(
        &mut self,
        request_id: &RequestId,
        classification: Criticality,
        due_date: NaiveDate,
        now: DateTime<Utc>,
    ) -> DomainResult<&WorkOrder> {
        let idx = self
            .requests
            .iter()
            .position(|r| r.id() == request_id)
            .ok_or_else(|| DomainError::not_found(format!("work request {request_id}")))?;
        let request = &self.requests[idx];
        if !request.is_pending() {
            return Err(DomainError::inconsistent(format!(
                "work request {request_id} was already processed"
            )));
        }
        let equipment_id = request.equipment_id().to_string();
        if !self.fleet.contains(&equipment_id) {
            return Err(DomainError::inconsistent(format!(
                "work request {request_id} references asset {equipment_id}, which no longer exists"
            )));
        }

        let component = request.component_name().to_string();
        let comments = request.comments().trim().to_string();
        let order = WorkOrder::open(
            equipment_id.as_str(),
            component.as_str(),
            due_date,
            format!("operations request: {comments}"),
            classification,
            now,
        );
        let description = if comments.is_empty() {
            "failure reported by operations".to_string()
        } else {
            comments
        };
        self.failures
            .append(FailureEntry {
                timestamp: now,
                equipment_id: equipment_id.clone(),
                component_name: component,
                description,
                repair_time_hours: 0.0,
            })?;

        self.requests[idx].mark_processed(classification)?;
        self.fleet.get_mut(&equipment_id)?.mark_in_maintenance();

        let message = format!(
            "request {request_id} converted into order {} with criticality '{classification}'",
            order.id()
        );
        tracing::info!(request_id = %request_id, order_id = %order.id(), "work request converted");
        self.notify(message);
        self.orders.push(order);
        Ok(&self.orders[self.orders.len() - 1])
    }

    // ---- inventory ----

    pub fn add_part<I, S>(
        &mut self,
        name: impl Into<String>,
        initial_stock: u32,
        min_stock: u32,
        compatible_policies: I,
    ) -> DomainResult<&PartStock>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.inventory
            .add_part(name, initial_stock, min_stock, compatible_policies)
    }

    pub fn get_stock(&self, name: &str) -> DomainResult<u32> {
        self.inventory.get_stock(name)
    }

    pub fn adjust_stock(&mut self, name: &str, delta: i64) -> DomainResult<u32> {
        let stock = self.inventory.adjust_stock(name, delta)?;
        tracing::info!(part = name, delta, stock, "stock adjusted");
        Ok(stock)
    }

    pub fn low_stock_alerts(&self) -> Vec<String> {
        self.inventory.low_stock_alerts()
    }

    pub fn parts_for_policy(&self, policy_name: &str) -> Vec<String> {
        self.inventory.parts_for_policy(policy_name)
    }

    // ---- reliability ----

    pub fn log_failure(
        &mut self,
        equipment_id: &str,
        component_name: &str,
        description: &str,
        repair_time_hours: f64,
        now: DateTime<Utc>,
    ) -> DomainResult<&FailureEntry> {
        self.failures
            .log_failure(equipment_id, component_name, description, repair_time_hours, now)
    }

    pub fn calculate_mtbf(&self, equipment_id: &str, component_name: Option<&str>) -> Option<f64> {
        self.failures.calculate_mtbf(equipment_id, component_name)
    }

    pub fn calculate_mttr(&self, equipment_id: &str, component_name: Option<&str>) -> Option<f64> {
        self.failures.calculate_mttr(equipment_id, component_name)
    }

    pub fn fleet_summary(&self, today: NaiveDate) -> FleetSummary {
        summarize(&self.fleet, &self.orders, &self.requests, today)
    }
}
