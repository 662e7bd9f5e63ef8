//! Persisted state schema.
//!
//! The DTOs mirror the stored JSON document key for key. Dates and
//! timestamps stay strings here so that a damaged value can be reported and
//! replaced instead of failing the whole document.
//!
//! Dates are written as `YYYY-MM-DD` and timestamps as RFC 3339 in UTC.
//! Older documents with naive ISO timestamps or spaced status names
//! (`en mantenimiento`) still load. Whole-number intervals are written as
//! integers.
//!
//! The policy catalog is stored under `policies` only when it differs from
//! the standard one.

use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use fleetmx_core::{Entity, RequestId, WorkOrderId};
use fleetmx_fleet::{
    Asset, AssetStatus, Criticality, MaintenancePolicy, PolicyCatalog, ServiceRecord,
};
use fleetmx_inventory::PartStock;
use fleetmx_orders::{
    RequestStatus, WorkOrder, WorkOrderParts, WorkOrderStatus, WorkRequest, WorkRequestDraft,
};
use fleetmx_reliability::FailureEntry;

use crate::context::MaintenanceContext;

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Largest integer an `f64` holds exactly.
const MAX_EXACT_INTEGER: f64 = 9_007_199_254_740_992.0;

/// Whole persisted state.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(default)]
    pub fleet: BTreeMap<String, AssetEntry>,
    #[serde(default)]
    pub inventory: BTreeMap<String, PartEntry>,
    #[serde(default)]
    pub pending_orders: Vec<OrderRow>,
    #[serde(default)]
    pub failures: Vec<FailureRow>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub work_requests: Vec<RequestRow>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub notifications_ops: Vec<String>,
    /// Catalog for new assets; absent means the standard catalog.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub policies: Option<Vec<PolicyEntry>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssetEntry {
    pub description: String,
    pub horometro: f64,
    pub odometro: f64,
    pub status: String,
    pub components: Vec<ComponentEntry>,
}

/// A stored interval keeps its JSON shape: `500` stays an integer and
/// `0.5` stays a float.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum IntervalValue {
    Whole(u64),
    Fractional(f64),
}

impl IntervalValue {
    pub fn value(self) -> f64 {
        match self {
            IntervalValue::Whole(v) => v as f64,
            IntervalValue::Fractional(v) => v,
        }
    }
}

impl From<f64> for IntervalValue {
    fn from(value: f64) -> Self {
        if value.fract() == 0.0 && (0.0..=MAX_EXACT_INTEGER).contains(&value) {
            IntervalValue::Whole(value as u64)
        } else {
            IntervalValue::Fractional(value)
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PolicyEntry {
    pub name: String,
    pub criticidad: String,
    pub hours_interval: Option<IntervalValue>,
    pub km_interval: Option<IntervalValue>,
    pub days_interval: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ComponentEntry {
    pub name: String,
    pub criticidad: String,
    pub hours_interval: Option<IntervalValue>,
    pub km_interval: Option<IntervalValue>,
    pub days_interval: Option<i64>,
    pub last_service_date: String,
    pub last_service_hours: f64,
    pub last_service_km: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PartEntry {
    pub stock: i64,
    pub min_stock: i64,
    pub fits_components: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrderRow {
    pub id: String,
    pub equipment_id: String,
    pub component_name: String,
    pub due_date: String,
    pub reason: String,
    pub classification: String,
    pub materials_used: Vec<String>,
    pub status: String,
    pub created_at: String,
    pub completed_at: Option<String>,
    pub start_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FailureRow {
    pub timestamp: String,
    pub equipment_id: String,
    pub component_name: String,
    pub description: String,
    pub repair_time_hours: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RequestRow {
    pub id: String,
    pub equipment_id: String,
    pub component_name: String,
    pub classification: String,
    pub comments: String,
    pub horometro: f64,
    pub date: String,
    pub status: String,
    pub created_at: String,
}

/// A value that was corrected while loading.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadWarning {
    /// Where the value sits, e.g. `fleet.TR-001.components[2].last_service_date`.
    pub location: String,
    pub message: String,
}

impl fmt::Display for LoadWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.location, self.message)
    }
}

/// Build a context from a snapshot.
///
/// Never fails: malformed values are replaced by safe defaults (`now`, its
/// date, `operativo`, `pendiente`, `media`, 0) and reported as warnings.
/// Entries that cannot be rebuilt at all (blank names, duplicates) are
/// skipped with a warning.
pub fn load(snapshot: &Snapshot, now: DateTime<Utc>) -> (MaintenanceContext, Vec<LoadWarning>) {
    let mut loader = Loader {
        now,
        warnings: Vec::new(),
    };
    let mut ctx = match &snapshot.policies {
        Some(entries) => MaintenanceContext::with_catalog(loader.catalog(entries)),
        None => MaintenanceContext::new(),
    };

    for (id, entry) in &snapshot.fleet {
        if let Some(asset) = loader.asset(id, entry) {
            if let Err(err) = ctx.fleet.add(asset) {
                loader.warn(format!("fleet.{id}"), err.to_string());
            }
        }
    }

    for (name, entry) in &snapshot.inventory {
        let at = format!("inventory.{name}");
        let stock = loader.count(&at, "stock", entry.stock);
        let min = loader.count(&at, "min_stock", entry.min_stock);
        match PartStock::new(name.as_str(), stock, min, entry.fits_components.iter().cloned()) {
            Ok(part) => {
                if let Err(err) = ctx.inventory.insert(part) {
                    loader.warn(at, err.to_string());
                }
            }
            Err(err) => loader.warn(at, format!("{err}; part skipped")),
        }
    }

    let mut seen_orders: HashSet<WorkOrderId> = HashSet::new();
    for (i, row) in snapshot.pending_orders.iter().enumerate() {
        let order = loader.order(i, row, &seen_orders);
        seen_orders.insert(order.id().clone());
        ctx.orders.push(order);
    }

    for (i, row) in snapshot.failures.iter().enumerate() {
        let at = format!("failures[{i}]");
        let entry = FailureEntry {
            timestamp: loader.datetime(&format!("{at}.timestamp"), &row.timestamp),
            equipment_id: row.equipment_id.clone(),
            component_name: row.component_name.clone(),
            description: row.description.clone(),
            repair_time_hours: loader.reading(&at, "repair_time_hours", row.repair_time_hours),
        };
        if let Err(err) = ctx.failures.append(entry) {
            loader.warn(at, format!("{err}; entry skipped"));
        }
    }

    let mut seen_requests: HashSet<RequestId> = HashSet::new();
    for (i, row) in snapshot.work_requests.iter().enumerate() {
        let request = loader.request(i, row, &seen_requests);
        seen_requests.insert(request.id().clone());
        ctx.requests.push(request);
    }

    ctx.notifications = snapshot.notifications_ops.clone();

    if !loader.warnings.is_empty() {
        tracing::warn!(
            warnings = loader.warnings.len(),
            "snapshot loaded with corrected values"
        );
    }
    tracing::info!(
        assets = ctx.fleet.len(),
        parts = ctx.inventory.len(),
        orders = ctx.orders.len(),
        failures = ctx.failures.len(),
        requests = ctx.requests.len(),
        policies = ctx.catalog.len(),
        "snapshot loaded"
    );
    (ctx, loader.warnings)
}

/// Write a context out as a snapshot.
pub fn serialize(ctx: &MaintenanceContext) -> Snapshot {
    let fleet = ctx
        .fleet
        .iter()
        .map(|asset| (asset.id().clone(), asset_entry(asset)))
        .collect();

    let inventory = ctx
        .inventory
        .iter()
        .map(|part| {
            (
                part.name().to_string(),
                PartEntry {
                    stock: i64::from(part.quantity()),
                    min_stock: i64::from(part.min_quantity()),
                    fits_components: part.compatible_policies().to_vec(),
                },
            )
        })
        .collect();

    let pending_orders = ctx.orders.iter().map(order_row).collect();

    let failures = ctx
        .failures
        .entries()
        .iter()
        .map(|e| FailureRow {
            timestamp: format_datetime(e.timestamp),
            equipment_id: e.equipment_id.clone(),
            component_name: e.component_name.clone(),
            description: e.description.clone(),
            repair_time_hours: e.repair_time_hours,
        })
        .collect();

    let work_requests = ctx
        .requests
        .iter()
        .map(|r| RequestRow {
            id: r.id().to_string(),
            equipment_id: r.equipment_id().to_string(),
            component_name: r.component_name().to_string(),
            classification: r.classification().as_str().to_string(),
            comments: r.comments().to_string(),
            horometro: r.horometro(),
            date: format_date(r.date()),
            status: r.status().as_str().to_string(),
            created_at: format_datetime(r.created_at()),
        })
        .collect();

    let policies = (ctx.catalog != PolicyCatalog::standard())
        .then(|| ctx.catalog.iter().map(policy_entry).collect());

    Snapshot {
        fleet,
        inventory,
        pending_orders,
        failures,
        work_requests,
        notifications_ops: ctx.notifications.clone(),
        policies,
    }
}

fn asset_entry(asset: &Asset) -> AssetEntry {
    AssetEntry {
        description: asset.description().to_string(),
        horometro: asset.cumulative_hours(),
        odometro: asset.cumulative_km(),
        status: asset.status().as_str().to_string(),
        components: asset.records().iter().map(component_entry).collect(),
    }
}

fn policy_entry(policy: &MaintenancePolicy) -> PolicyEntry {
    PolicyEntry {
        name: policy.name().to_string(),
        criticidad: policy.criticality().as_str().to_string(),
        hours_interval: policy.hours_interval().map(IntervalValue::from),
        km_interval: policy.km_interval().map(IntervalValue::from),
        days_interval: policy.days_interval().map(i64::from),
    }
}

fn component_entry(record: &ServiceRecord) -> ComponentEntry {
    let policy = policy_entry(record.policy());
    ComponentEntry {
        name: policy.name,
        criticidad: policy.criticidad,
        hours_interval: policy.hours_interval,
        km_interval: policy.km_interval,
        days_interval: policy.days_interval,
        last_service_date: format_date(record.last_service_date()),
        last_service_hours: record.last_service_hours(),
        last_service_km: record.last_service_km(),
    }
}

fn order_row(order: &WorkOrder) -> OrderRow {
    OrderRow {
        id: order.id().to_string(),
        equipment_id: order.equipment_id().to_string(),
        component_name: order.component_name().to_string(),
        due_date: format_date(order.due_date()),
        reason: order.reason().to_string(),
        classification: order.classification().as_str().to_string(),
        materials_used: order.materials_used().to_vec(),
        status: order.status().as_str().to_string(),
        created_at: format_datetime(order.created_at()),
        completed_at: order.completed_at().map(format_datetime),
        start_time: order.start_time().map(format_datetime),
        notes: order.notes().map(str::to_string),
    }
}

fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

fn format_datetime(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    NaiveDate::parse_from_str(raw, DATE_FORMAT)
        .ok()
        .or_else(|| parse_datetime(raw).map(|at| at.date_naive()))
}

fn parse_datetime(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(at) = DateTime::parse_from_rfc3339(raw) {
        return Some(at.with_timezone(&Utc));
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|naive| naive.and_utc())
}

struct Loader {
    now: DateTime<Utc>,
    warnings: Vec<LoadWarning>,
}

impl Loader {
    fn warn(&mut self, location: impl Into<String>, message: impl Into<String>) {
        let warning = LoadWarning {
            location: location.into(),
            message: message.into(),
        };
        tracing::warn!(location = %warning.location, "{}", warning.message);
        self.warnings.push(warning);
    }

    fn date(&mut self, location: &str, raw: &str) -> NaiveDate {
        parse_date(raw).unwrap_or_else(|| {
            let today = self.now.date_naive();
            self.warn(location, format!("invalid date '{raw}', using {today}"));
            today
        })
    }

    fn datetime(&mut self, location: &str, raw: &str) -> DateTime<Utc> {
        parse_datetime(raw).unwrap_or_else(|| {
            let now = self.now;
            let fallback = format_datetime(now);
            self.warn(location, format!("invalid timestamp '{raw}', using {fallback}"));
            now
        })
    }

    fn optional_datetime(&mut self, location: &str, raw: Option<&str>) -> Option<DateTime<Utc>> {
        let raw = raw?;
        if raw.trim().is_empty() {
            return None;
        }
        let parsed = parse_datetime(raw);
        if parsed.is_none() {
            self.warn(location, format!("invalid timestamp '{raw}', dropped"));
        }
        parsed
    }

    fn parse_or_default<T>(&mut self, location: &str, raw: &str) -> T
    where
        T: FromStr + Default + fmt::Display,
    {
        raw.parse().unwrap_or_else(|_| {
            let fallback = T::default();
            self.warn(location, format!("unknown value '{raw}', using {fallback}"));
            fallback
        })
    }

    fn reading(&mut self, location: &str, field: &str, value: f64) -> f64 {
        if value.is_finite() && value >= 0.0 {
            return value;
        }
        self.warn(format!("{location}.{field}"), format!("invalid reading {value}, using 0"));
        0.0
    }

    fn count(&mut self, location: &str, field: &str, value: i64) -> u32 {
        match u32::try_from(value) {
            Ok(v) => v,
            Err(_) if value < 0 => {
                let message = format!("negative count {value}, using 0");
                self.warn(format!("{location}.{field}"), message);
                0
            }
            Err(_) => {
                let message = format!("count {value} too large, capped");
                self.warn(format!("{location}.{field}"), message);
                u32::MAX
            }
        }
    }

    fn asset(&mut self, id: &str, entry: &AssetEntry) -> Option<Asset> {
        let at = format!("fleet.{id}");
        if id.trim().is_empty() {
            self.warn(at, "blank asset id; asset skipped");
            return None;
        }
        let hours = self.reading(&at, "horometro", entry.horometro);
        let km = self.reading(&at, "odometro", entry.odometro);
        let status: AssetStatus = self.parse_or_default(&format!("{at}.status"), &entry.status);
        let mut asset = Asset::restore(id, entry.description.as_str(), hours, km, status);

        for (i, component) in entry.components.iter().enumerate() {
            let cat = format!("{at}.components[{i}]");
            let fields = PolicyEntry {
                name: component.name.clone(),
                criticidad: component.criticidad.clone(),
                hours_interval: component.hours_interval,
                km_interval: component.km_interval,
                days_interval: component.days_interval,
            };
            let Some(policy) = self.policy(&cat, &fields) else {
                continue;
            };
            let date = self.date(&format!("{cat}.last_service_date"), &component.last_service_date);
            let last_hours = self.reading(&cat, "last_service_hours", component.last_service_hours);
            let last_km = self.reading(&cat, "last_service_km", component.last_service_km);
            if let Err(err) = asset.register_component(
                policy,
                self.now.date_naive(),
                Some(date),
                Some(last_hours),
                Some(last_km),
            ) {
                self.warn(cat, format!("{err}; component skipped"));
            }
        }
        Some(asset)
    }

    fn catalog(&mut self, entries: &[PolicyEntry]) -> PolicyCatalog {
        let mut catalog = PolicyCatalog::empty();
        for (i, entry) in entries.iter().enumerate() {
            let at = format!("policies[{i}]");
            let Some(policy) = self.policy(&at, entry) else {
                continue;
            };
            if let Err(err) = catalog.add(policy) {
                self.warn(at, format!("{err}; policy skipped"));
            }
        }
        catalog
    }

    fn policy(&mut self, at: &str, entry: &PolicyEntry) -> Option<MaintenancePolicy> {
        let criticality: Criticality =
            self.parse_or_default(&format!("{at}.criticidad"), &entry.criticidad);
        let mut policy = match MaintenancePolicy::new(entry.name.as_str(), criticality) {
            Ok(policy) => policy,
            Err(err) => {
                self.warn(at, format!("{err}; entry skipped"));
                return None;
            }
        };

        if let Some(hours) = entry.hours_interval {
            match policy.clone().with_hours_interval(hours.value()) {
                Ok(p) => policy = p,
                Err(err) => {
                    self.warn(format!("{at}.hours_interval"), format!("{err}; axis disabled"))
                }
            }
        }
        if let Some(km) = entry.km_interval {
            match policy.clone().with_km_interval(km.value()) {
                Ok(p) => policy = p,
                Err(err) => self.warn(format!("{at}.km_interval"), format!("{err}; axis disabled")),
            }
        }
        if let Some(days) = entry.days_interval {
            let checked = u32::try_from(days)
                .ok()
                .and_then(|d| policy.clone().with_days_interval(d).ok());
            match checked {
                Some(p) => policy = p,
                None => self.warn(
                    format!("{at}.days_interval"),
                    format!("invalid interval {days}; axis disabled"),
                ),
            }
        }
        Some(policy)
    }

    fn order(&mut self, index: usize, row: &OrderRow, seen: &HashSet<WorkOrderId>) -> WorkOrder {
        let at = format!("pending_orders[{index}]");
        let id = match row.id.parse::<WorkOrderId>() {
            Ok(id) if !seen.contains(&id) => id,
            Ok(id) => {
                let fresh = WorkOrderId::new();
                let message = format!("duplicate order id {id}, reassigned {fresh}");
                self.warn(format!("{at}.id"), message);
                fresh
            }
            Err(_) => {
                let fresh = WorkOrderId::new();
                self.warn(format!("{at}.id"), format!("missing order id, assigned {fresh}"));
                fresh
            }
        };

        let start_time =
            self.optional_datetime(&format!("{at}.start_time"), row.start_time.as_deref());
        let completed_at =
            self.optional_datetime(&format!("{at}.completed_at"), row.completed_at.as_deref());
        if let (Some(start), Some(end)) = (start_time, completed_at) {
            if end < start {
                self.warn(
                    format!("{at}.completed_at"),
                    "completion precedes start time; raised to start time",
                );
            }
        }

        let status: WorkOrderStatus = self.parse_or_default(&format!("{at}.status"), &row.status);
        let classification: Criticality =
            self.parse_or_default(&format!("{at}.classification"), &row.classification);

        WorkOrder::restore(WorkOrderParts {
            id,
            equipment_id: row.equipment_id.clone(),
            component_name: row.component_name.clone(),
            due_date: self.date(&format!("{at}.due_date"), &row.due_date),
            reason: row.reason.clone(),
            classification,
            materials_used: row.materials_used.clone(),
            notes: row.notes.clone(),
            status,
            created_at: self.datetime(&format!("{at}.created_at"), &row.created_at),
            start_time,
            completed_at,
        })
    }

    fn request(
        &mut self,
        index: usize,
        row: &RequestRow,
        seen: &HashSet<RequestId>,
    ) -> WorkRequest {
        let at = format!("work_requests[{index}]");
        let id = match row.id.parse::<RequestId>() {
            Ok(id) if !seen.contains(&id) => id,
            _ => {
                let fresh = RequestId::new();
                let message = format!("missing or duplicate request id, assigned {fresh}");
                self.warn(format!("{at}.id"), message);
                fresh
            }
        };
        let classification: Criticality =
            self.parse_or_default(&format!("{at}.classification"), &row.classification);
        let status: RequestStatus = self.parse_or_default(&format!("{at}.status"), &row.status);
        let draft = WorkRequestDraft {
            equipment_id: row.equipment_id.clone(),
            component_name: row.component_name.clone(),
            classification,
            comments: row.comments.clone(),
            horometro: self.reading(&at, "horometro", row.horometro),
            date: self.date(&format!("{at}.date"), &row.date),
        };
        let created_at = self.datetime(&format!("{at}.created_at"), &row.created_at);
        WorkRequest::restore(id, draft, status, created_at)
    }
}
