use core::str::FromStr;

use serde::{Deserialize, Serialize};

use fleetmx_core::{DomainError, DomainResult};

/// Criticality of a maintenance policy (and of the orders it produces).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Criticality {
    Alta,
    #[default]
    Media,
    Baja,
}

impl Criticality {
    pub fn as_str(&self) -> &'static str {
        match self {
            Criticality::Alta => "alta",
            Criticality::Media => "media",
            Criticality::Baja => "baja",
        }
    }
}

impl core::fmt::Display for Criticality {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Criticality {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "alta" => Ok(Criticality::Alta),
            "media" => Ok(Criticality::Media),
            "baja" => Ok(Criticality::Baja),
            other => Err(DomainError::invalid(format!("unknown criticality '{other}'"))),
        }
    }
}

/// Named maintenance rule with up to three trigger intervals.
///
/// An unset interval never triggers. Intervals, when set, are strictly
/// positive (and finite for the hour/km axes).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaintenancePolicy {
    name: String,
    criticality: Criticality,
    hours_interval: Option<f64>,
    km_interval: Option<f64>,
    days_interval: Option<u32>,
}

impl MaintenancePolicy {
    pub fn new(name: impl Into<String>, criticality: Criticality) -> DomainResult<Self> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(DomainError::invalid("policy name cannot be empty"));
        }
        Ok(Self {
            name,
            criticality,
            hours_interval: None,
            km_interval: None,
            days_interval: None,
        })
    }

    /// Policy for an ad-hoc component with no intervals: tracked, never due.
    pub fn untracked(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            criticality: Criticality::Media,
            hours_interval: None,
            km_interval: None,
            days_interval: None,
        }
    }

    pub fn with_hours_interval(mut self, hours: f64) -> DomainResult<Self> {
        self.hours_interval = Some(positive_interval("hours_interval", hours)?);
        Ok(self)
    }

    pub fn with_km_interval(mut self, km: f64) -> DomainResult<Self> {
        self.km_interval = Some(positive_interval("km_interval", km)?);
        Ok(self)
    }

    pub fn with_days_interval(mut self, days: u32) -> DomainResult<Self> {
        if days == 0 {
            return Err(DomainError::invalid("days_interval must be positive"));
        }
        self.days_interval = Some(days);
        Ok(self)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn criticality(&self) -> Criticality {
        self.criticality
    }

    pub fn hours_interval(&self) -> Option<f64> {
        self.hours_interval
    }

    pub fn km_interval(&self) -> Option<f64> {
        self.km_interval
    }

    pub fn days_interval(&self) -> Option<u32> {
        self.days_interval
    }

    pub fn has_intervals(&self) -> bool {
        self.hours_interval.is_some() || self.km_interval.is_some() || self.days_interval.is_some()
    }
}

fn positive_interval(field: &str, value: f64) -> DomainResult<f64> {
    if !value.is_finite() || value <= 0.0 {
        return Err(DomainError::invalid(format!(
            "{field} must be a finite positive number (got {value})"
        )));
    }
    Ok(value)
}

/// The axis that made a (asset, policy) pair due, with the measured usage.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DueAxis {
    Hours { elapsed: f64, interval: f64 },
    Km { elapsed: f64, interval: f64 },
    Days { elapsed: i64, interval: u32 },
}

impl core::fmt::Display for DueAxis {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            DueAxis::Hours { elapsed, interval } => {
                write!(f, "hours reached: {elapsed:.0} h >= {interval} h")
            }
            DueAxis::Km { elapsed, interval } => {
                write!(f, "distance reached: {elapsed:.0} km >= {interval} km")
            }
            DueAxis::Days { elapsed, interval } => {
                write!(f, "days reached: {elapsed} d >= {interval} d")
            }
        }
    }
}

/// Policies registered on every newly added asset.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PolicyCatalog {
    policies: Vec<MaintenancePolicy>,
}

impl PolicyCatalog {
    pub fn empty() -> Self {
        Self::default()
    }

    /// The three standard truck policies: shock absorbers, wipers and lights.
    pub fn standard() -> Self {
        let policy = |name: &str, hours: Option<f64>, km: Option<f64>, days: Option<u32>| {
            MaintenancePolicy {
                name: name.to_string(),
                criticality: Criticality::Alta,
                hours_interval: hours,
                km_interval: km,
                days_interval: days,
            }
        };
        Self {
            policies: vec![
                policy("Amortiguadores", Some(500.0), Some(50_000.0), Some(365)),
                policy("Limpiaparabrisas", Some(200.0), None, Some(180)),
                policy("Luces", None, None, Some(90)),
            ],
        }
    }

    pub fn add(&mut self, policy: MaintenancePolicy) -> DomainResult<()> {
        if self.get(policy.name()).is_some() {
            return Err(DomainError::duplicate(format!("policy {}", policy.name())));
        }
        self.policies.push(policy);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&MaintenancePolicy> {
        self.policies.iter().find(|p| p.name() == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &MaintenancePolicy> {
        self.policies.iter()
    }

    pub fn len(&self) -> usize {
        self.policies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.policies.is_empty()
    }
}
