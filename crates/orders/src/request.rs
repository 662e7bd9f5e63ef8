use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use fleetmx_core::{DomainError, DomainResult, Entity, RequestId};
use fleetmx_fleet::Criticality;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestStatus {
    #[default]
    Pendiente,
    Procesada,
}

impl RequestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestStatus::Pendiente => "pendiente",
            RequestStatus::Procesada => "procesada",
        }
    }
}

impl core::fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl core::str::FromStr for RequestStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "pendiente" => Ok(RequestStatus::Pendiente),
            "procesada" => Ok(RequestStatus::Procesada),
            other => Err(DomainError::invalid(format!("unknown request status '{other}'"))),
        }
    }
}

/// Operator input for a new work request.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkRequestDraft {
    pub equipment_id: String,
    pub component_name: String,
    pub classification: Criticality,
    pub comments: String,
    /// Hour-meter reading reported by the operator (informational).
    pub horometro: f64,
    pub date: NaiveDate,
}

/// A maintenance request raised by operations, later converted into a work order.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkRequest {
    id: RequestId,
    draft: WorkRequestDraft,
    status: RequestStatus,
    created_at: DateTime<Utc>,
}

impl WorkRequest {
    pub fn raise(draft: WorkRequestDraft, created_at: DateTime<Utc>) -> DomainResult<Self> {
        if draft.component_name.trim().is_empty() {
            return Err(DomainError::invalid("request component cannot be empty"));
        }
        if !draft.horometro.is_finite() || draft.horometro < 0.0 {
            return Err(DomainError::invalid(format!(
                "reported horometro must be finite and non-negative (got {})",
                draft.horometro
            )));
        }
        Ok(Self {
            id: RequestId::new(),
            draft,
            status: RequestStatus::Pendiente,
            created_at,
        })
    }

    pub fn restore(
        id: RequestId,
        draft: WorkRequestDraft,
        status: RequestStatus,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            draft,
            status,
            created_at,
        }
    }

    pub fn equipment_id(&self) -> &str {
        &self.draft.equipment_id
    }

    pub fn component_name(&self) -> &str {
        &self.draft.component_name
    }

    pub fn classification(&self) -> Criticality {
        self.draft.classification
    }

    pub fn comments(&self) -> &str {
        &self.draft.comments
    }

    pub fn horometro(&self) -> f64 {
        self.draft.horometro
    }

    pub fn date(&self) -> NaiveDate {
        self.draft.date
    }

    pub fn status(&self) -> RequestStatus {
        self.status
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn is_pending(&self) -> bool {
        self.status == RequestStatus::Pendiente
    }

    /// `pendiente → procesada`, keeping the classification chosen by maintenance.
    pub fn mark_processed(&mut self, classification: Criticality) -> DomainResult<()> {
        if !self.is_pending() {
            return Err(DomainError::inconsistent(format!(
                "request {} was already processed",
                self.id
            )));
        }
        self.draft.classification = classification;
        self.status = RequestStatus::Procesada;
        Ok(())
    }
}

impl Entity for WorkRequest {
    type Id = RequestId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}
