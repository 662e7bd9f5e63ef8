use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use fleetmx_core::{DomainError, DomainResult};

use crate::policy::{DueAxis, MaintenancePolicy};

/// Last-service baseline of one policy on one asset.
///
/// Created when the policy is registered on the asset; afterwards only moved
/// forward by a work-order completion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceRecord {
    policy: MaintenancePolicy,
    last_service_date: NaiveDate,
    last_service_hours: f64,
    last_service_km: f64,
}

impl ServiceRecord {
    pub fn new(
        policy: MaintenancePolicy,
        last_service_date: NaiveDate,
        last_service_hours: f64,
        last_service_km: f64,
    ) -> Self {
        Self {
            policy,
            last_service_date,
            last_service_hours,
            last_service_km,
        }
    }

    pub fn policy(&self) -> &MaintenancePolicy {
        &self.policy
    }

    pub fn policy_name(&self) -> &str {
        self.policy.name()
    }

    pub fn last_service_date(&self) -> NaiveDate {
        self.last_service_date
    }

    pub fn last_service_hours(&self) -> f64 {
        self.last_service_hours
    }

    pub fn last_service_km(&self) -> f64 {
        self.last_service_km
    }

    /// First axis (hours, km, days) whose interval has elapsed, if any.
    ///
    /// Fails when a reading or baseline is not a finite number; the caller
    /// decides whether to skip the record.
    pub fn due_axis(
        &self,
        today: NaiveDate,
        current_hours: f64,
        current_km: f64,
    ) -> DomainResult<Option<DueAxis>> {
        for (label, value) in [
            ("cumulative hours", current_hours),
            ("cumulative km", current_km),
            ("last_service_hours", self.last_service_hours),
            ("last_service_km", self.last_service_km),
        ] {
            if !value.is_finite() {
                return Err(DomainError::invalid(format!(
                    "{label} is not a finite number for policy {}",
                    self.policy.name()
                )));
            }
        }

        if let Some(interval) = self.policy.hours_interval() {
            let elapsed = current_hours - self.last_service_hours;
            if elapsed >= interval {
                return Ok(Some(DueAxis::Hours { elapsed, interval }));
            }
        }

        if let Some(interval) = self.policy.km_interval() {
            let elapsed = current_km - self.last_service_km;
            if elapsed >= interval {
                return Ok(Some(DueAxis::Km { elapsed, interval }));
            }
        }

        if let Some(interval) = self.policy.days_interval() {
            let elapsed = (today - self.last_service_date).num_days();
            if elapsed >= i64::from(interval) {
                return Ok(Some(DueAxis::Days { elapsed, interval }));
            }
        }

        Ok(None)
    }

    /// Move the baseline to the given readings (service just performed).
    pub fn advance(&mut self, date: NaiveDate, hours: f64, km: f64) {
        self.last_service_date = date;
        self.last_service_hours = hours;
        self.last_service_km = km;
    }
}
