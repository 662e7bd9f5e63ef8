//! Generated identifiers for work orders and work requests.
//!
//! Identifiers travel through snapshots as plain lowercase hex strings, so the
//! newtypes wrap a `String` rather than a `Uuid`. Fresh ids come from UUIDv7
//! (time-ordered); ids loaded from a snapshot are kept verbatim.

use core::str::FromStr;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::DomainError;

/// Identifier of a work order.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WorkOrderId(String);

/// Identifier of an operator-raised work request.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(String);

macro_rules! impl_hex_id {
    ($t:ty, $name:literal) => {
        impl $t {
            /// Create a new identifier.
            ///
            /// Uses UUIDv7 rendered as 32 hex digits. Prefer passing IDs
            /// explicitly in tests for determinism.
            pub fn new() -> Self {
                Self(Uuid::now_v7().simple().to_string())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl Default for $t {
            fn default() -> Self {
                Self::new()
            }
        }

        impl core::fmt::Display for $t {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<Uuid> for $t {
            fn from(value: Uuid) -> Self {
                Self(value.simple().to_string())
            }
        }

        impl FromStr for $t {
            type Err = DomainError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    return Err(DomainError::invalid(format!("{}: empty identifier", $name)));
                }
                Ok(Self(trimmed.to_string()))
            }
        }
    };
}

impl_hex_id!(WorkOrderId, "WorkOrderId");
impl_hex_id!(RequestId, "RequestId");
