use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use fleetmx_core::{DomainError, DomainResult, Entity};

use crate::policy::MaintenancePolicy;
use crate::record::ServiceRecord;

/// Operational status of an asset.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetStatus {
    #[default]
    Operativo,
    #[serde(alias = "en solicitud")]
    EnSolicitud,
    #[serde(alias = "en mantenimiento")]
    EnMantenimiento,
}

impl AssetStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AssetStatus::Operativo => "operativo",
            AssetStatus::EnSolicitud => "en_solicitud",
            AssetStatus::EnMantenimiento => "en_mantenimiento",
        }
    }
}

impl core::fmt::Display for AssetStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl core::str::FromStr for AssetStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace(' ', "_").as_str() {
            "operativo" => Ok(AssetStatus::Operativo),
            "en_solicitud" => Ok(AssetStatus::EnSolicitud),
            "en_mantenimiento" => Ok(AssetStatus::EnMantenimiento),
            other => Err(DomainError::invalid(format!("unknown asset status '{other}'"))),
        }
    }
}

/// A vehicle of the fleet.
///
/// Cumulative counters only grow. Service records are kept in registration
/// order, one per policy name.
#[derive(Debug, Clone, PartialEq)]
pub struct Asset {
    id: String,
    description: String,
    cumulative_hours: f64,
    cumulative_km: f64,
    status: AssetStatus,
    records: Vec<ServiceRecord>,
}

impl Asset {
    pub fn new(id: impl Into<String>, description: impl Into<String>) -> DomainResult<Self> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(DomainError::invalid("asset id cannot be empty"));
        }
        Ok(Self {
            id,
            description: description.into(),
            cumulative_hours: 0.0,
            cumulative_km: 0.0,
            status: AssetStatus::Operativo,
            records: Vec::new(),
        })
    }

    /// Rebuild an asset from stored readings (snapshot load).
    pub fn restore(
        id: impl Into<String>,
        description: impl Into<String>,
        cumulative_hours: f64,
        cumulative_km: f64,
        status: AssetStatus,
    ) -> Self {
        Self {
            id: id.into(),
            description: description.into(),
            cumulative_hours,
            cumulative_km,
            status,
            records: Vec::new(),
        }
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn cumulative_hours(&self) -> f64 {
        self.cumulative_hours
    }

    pub fn cumulative_km(&self) -> f64 {
        self.cumulative_km
    }

    pub fn status(&self) -> AssetStatus {
        self.status
    }

    pub fn records(&self) -> &[ServiceRecord] {
        &self.records
    }

    pub fn record(&self, policy_name: &str) -> Option<&ServiceRecord> {
        self.records.iter().find(|r| r.policy_name() == policy_name)
    }

    /// Add running hours. Returns the new cumulative value.
    pub fn update_horometro(&mut self, delta_hours: f64) -> DomainResult<f64> {
        let delta = non_negative_delta("horometro", delta_hours)?;
        self.cumulative_hours = advanced_counter("horometro", self.cumulative_hours, delta)?;
        Ok(self.cumulative_hours)
    }

    /// Add kilometres. Returns the new cumulative value.
    pub fn update_odometro(&mut self, delta_km: f64) -> DomainResult<f64> {
        let delta = non_negative_delta("odometro", delta_km)?;
        self.cumulative_km = advanced_counter("odometro", self.cumulative_km, delta)?;
        Ok(self.cumulative_km)
    }

    /// Register a policy on this asset with its baseline service record.
    ///
    /// Unset fields default to `today` and the current readings, so a freshly
    /// registered policy counts as just serviced.
    pub fn register_component(
        &mut self,
        policy: MaintenancePolicy,
        today: NaiveDate,
        service_date: Option<NaiveDate>,
        service_hours: Option<f64>,
        service_km: Option<f64>,
    ) -> DomainResult<&ServiceRecord> {
        if self.record(policy.name()).is_some() {
            return Err(DomainError::duplicate(format!(
                "policy {} already registered on asset {}",
                policy.name(),
                self.id
            )));
        }
        let hours = service_hours.unwrap_or(self.cumulative_hours);
        let km = service_km.unwrap_or(self.cumulative_km);
        if !hours.is_finite() || !km.is_finite() || hours < 0.0 || km < 0.0 {
            return Err(DomainError::invalid(format!(
                "service baseline for {} must be finite and non-negative",
                policy.name()
            )));
        }

        let date = service_date.unwrap_or(today);
        self.records.push(ServiceRecord::new(policy, date, hours, km));
        Ok(&self.records[self.records.len() - 1])
    }

    /// Advance the baseline of `policy_name` to the current readings.
    ///
    /// An unknown name gets a record created on the fly with an untracked
    /// policy.
    pub fn advance_service(&mut self, policy_name: &str, today: NaiveDate) -> &ServiceRecord {
        let (hours, km) = (self.cumulative_hours, self.cumulative_km);
        let idx = match self.records.iter().position(|r| r.policy_name() == policy_name) {
            Some(idx) => idx,
            None => {
                tracing::warn!(
                    asset_id = %self.id,
                    component = policy_name,
                    "no service record for component; creating one from current readings"
                );
                self.records.push(ServiceRecord::new(
                    MaintenancePolicy::untracked(policy_name),
                    today,
                    hours,
                    km,
                ));
                self.records.len() - 1
            }
        };
        let record = &mut self.records[idx];
        record.advance(today, hours, km);
        record
    }

    /// `operativo → en_solicitud`. Other states are left alone.
    ///
    /// Returns whether the status changed.
    pub fn raise_request(&mut self) -> bool {
        if self.status == AssetStatus::Operativo {
            self.status = AssetStatus::EnSolicitud;
            return true;
        }
        false
    }

    /// A work order opened against the asset.
    pub fn mark_in_maintenance(&mut self) {
        self.status = AssetStatus::EnMantenimiento;
    }

    /// Back in service after the last open order was completed.
    pub fn mark_operational(&mut self) {
        self.status = AssetStatus::Operativo;
    }
}

fn non_negative_delta(counter: &str, delta: f64) -> DomainResult<f64> {
    if !delta.is_finite() {
        return Err(DomainError::invalid(format!("{counter} delta must be a finite number")));
    }
    if delta < 0.0 {
        return Err(DomainError::invalid(format!(
            "{counter} delta must be non-negative (got {delta})"
        )));
    }
    Ok(delta)
}

fn advanced_counter(counter: &str, current: f64, delta: f64) -> DomainResult<f64> {
    let next = current + delta;
    if !next.is_finite() {
        return Err(DomainError::invalid(format!(
            "{counter} would overflow ({current} + {delta})"
        )));
    }
    Ok(next)
}

impl Entity for Asset {
    type Id = String;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

/// Registry of assets keyed by their (immutable) id.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Fleet {
    assets: BTreeMap<String, Asset>,
}

impl Fleet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, asset: Asset) -> DomainResult<&mut Asset> {
        let id = asset.id().clone();
        if self.assets.contains_key(&id) {
            return Err(DomainError::duplicate(format!("asset {id}")));
        }
        Ok(self.assets.entry(id).or_insert(asset))
    }

    pub fn remove(&mut self, id: &str) -> DomainResult<Asset> {
        self.assets
            .remove(id)
            .ok_or_else(|| DomainError::not_found(format!("asset {id}")))
    }

    pub fn get(&self, id: &str) -> DomainResult<&Asset> {
        self.assets
            .get(id)
            .ok_or_else(|| DomainError::not_found(format!("asset {id}")))
    }

    pub fn get_mut(&mut self, id: &str) -> DomainResult<&mut Asset> {
        self.assets
            .get_mut(id)
            .ok_or_else(|| DomainError::not_found(format!("asset {id}")))
    }

    pub fn contains(&self, id: &str) -> bool {
        self.assets.contains_key(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Asset> {
        self.assets.values()
    }

    pub fn len(&self) -> usize {
        self.assets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::Criticality;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 5, 1).unwrap()
    }

    fn policy(name: &str) -> MaintenancePolicy {
        MaintenancePolicy::new(name, Criticality::Media)
            .unwrap()
            .with_hours_interval(500.0)
            .unwrap()
    }

    #[test]
    fn negative_delta_is_rejected_and_state_unchanged() {
        let mut asset = Asset::new("TR-001", "Tracto Kalmar").unwrap();
        asset.update_horometro(12.5).unwrap();
        let before = asset.clone();

        let err = asset.update_horometro(-1.0).unwrap_err();
        assert!(matches!(err, DomainError::InvalidInput(_)));
        assert!(asset.update_odometro(f64::INFINITY).is_err());
        assert_eq!(asset, before);
    }

    #[test]
    fn overflowing_counter_is_rejected() {
        let mut asset = Asset::new("TR-001", "Tracto").unwrap();
        assert_eq!(asset.update_horometro(1e308).unwrap(), 1e308);
        asset.update_odometro(f64::MAX).unwrap();
        let before = asset.clone();

        assert!(matches!(
            asset.update_horometro(1e308),
            Err(DomainError::InvalidInput(_))
        ));
        assert!(asset.update_odometro(f64::MAX).is_err());
        assert_eq!(asset, before);
        assert!(asset.cumulative_hours().is_finite());
    }

    #[test]
    fn register_defaults_to_current_readings() {
        let mut asset = Asset::new("TR-001", "Tracto").unwrap();
        asset.update_horometro(120.0).unwrap();
        asset.update_odometro(3_400.0).unwrap();

        let rec = asset
            .register_component(policy("Frenos"), today(), None, None, None)
            .unwrap();
        assert_eq!(rec.last_service_date(), today());
        assert_eq!(rec.last_service_hours(), 120.0);
        assert_eq!(rec.last_service_km(), 3_400.0);
    }

    #[test]
    fn register_keeps_explicit_baseline() {
        let mut asset = Asset::new("TR-001", "Tracto").unwrap();
        let old = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let rec = asset
            .register_component(policy("Frenos"), today(), Some(old), Some(0.0), Some(10.0))
            .unwrap();
        assert_eq!(rec.last_service_date(), old);
        assert_eq!(rec.last_service_km(), 10.0);
    }

    #[test]
    fn registering_same_policy_twice_is_a_duplicate() {
        let mut asset = Asset::new("TR-001", "Tracto").unwrap();
        asset
            .register_component(policy("Frenos"), today(), None, None, None)
            .unwrap();
        let err = asset
            .register_component(policy("Frenos"), today(), None, None, None)
            .unwrap_err();
        assert!(matches!(err, DomainError::DuplicateName(_)));
        assert_eq!(asset.records().len(), 1);
    }

    #[test]
    fn advance_service_creates_missing_record() {
        let mut asset = Asset::new("TR-001", "Tracto").unwrap();
        asset.update_horometro(42.0).unwrap();
        let rec = asset.advance_service("Parabrisas", today());
        assert_eq!(rec.last_service_hours(), 42.0);
        assert!(!rec.policy().has_intervals());
        assert!(asset.record("Parabrisas").is_some());
    }

    #[test]
    fn status_walks_request_maintenance_operational() {
        let mut asset = Asset::new("TR-001", "Tracto").unwrap();
        assert!(asset.raise_request());
        assert_eq!(asset.status(), AssetStatus::EnSolicitud);
        assert!(!asset.raise_request());

        asset.mark_in_maintenance();
        assert!(!asset.raise_request());
        assert_eq!(asset.status(), AssetStatus::EnMantenimiento);

        asset.mark_operational();
        assert_eq!(asset.status(), AssetStatus::Operativo);
    }

    #[test]
    fn status_accepts_legacy_spelling() {
        assert_eq!(
            "en mantenimiento".parse::<AssetStatus>().unwrap(),
            AssetStatus::EnMantenimiento
        );
        assert!("fuera de servicio".parse::<AssetStatus>().is_err());
    }

    #[test]
    fn fleet_rejects_duplicate_ids_and_reports_missing() {
        let mut fleet = Fleet::new();
        fleet.add(Asset::new("TR-001", "a").unwrap()).unwrap();
        assert!(matches!(
            fleet.add(Asset::new("TR-001", "b").unwrap()),
            Err(DomainError::DuplicateName(_))
        ));
        assert_eq!(fleet.get("TR-001").unwrap().description(), "a");
        assert!(matches!(fleet.get("TR-404"), Err(DomainError::NotFound(_))));
        assert!(fleet.remove("TR-001").is_ok());
        assert!(fleet.is_empty());
    }

    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #![proptest_config(ProptestConfig {
                cases: 256,
                ..ProptestConfig::default()
            })]

            /// Property: counters equal the sum of accepted deltas; negative deltas change nothing.
            #[test]
            fn counters_sum_accepted_deltas(
                deltas in prop::collection::vec(-1_000.0f64..1_000.0, 0..40)
            ) {
                let mut asset = Asset::new("TR-001", "Tracto").unwrap();
                let mut expected_hours = 0.0;
                let mut expected_km = 0.0;

                for d in &deltas {
                    let hours_before = asset.cumulative_hours();
                    match asset.update_horometro(*d) {
                        Ok(_) => expected_hours += *d,
                        Err(_) => prop_assert_eq!(asset.cumulative_hours(), hours_before),
                    }
                    let km_before = asset.cumulative_km();
                    match asset.update_odometro(*d * 10.0) {
                        Ok(_) => expected_km += *d * 10.0,
                        Err(_) => prop_assert_eq!(asset.cumulative_km(), km_before),
                    }
                    prop_assert!(asset.cumulative_hours() >= hours_before);
                }

                prop_assert!((asset.cumulative_hours() - expected_hours).abs() < 1e-6);
                prop_assert!((asset.cumulative_km() - expected_km).abs() < 1e-5);
            }

            /// Property: huge deltas never push a counter past f64::MAX.
            #[test]
            fn counters_stay_finite(
                deltas in prop::collection::vec(1e306f64..f64::MAX, 1..8)
            ) {
                let mut asset = Asset::new("TR-001", "Tracto").unwrap();
                for d in &deltas {
                    let before = asset.cumulative_hours();
                    match asset.update_horometro(*d) {
                        Ok(total) => prop_assert!(total.is_finite()),
                        Err(_) => prop_assert_eq!(asset.cumulative_hours(), before),
                    }
                    prop_assert!(asset.cumulative_hours().is_finite());
                }
            }
        }
    }
}
