//! Data carried across port boundaries.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use afflictor_domain::{CorrelationId, InstanceId, TargetId};

/// Which save a pending confirmation will resolve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ConfirmationKind {
    InitialSave,
    StageSave,
}

/// A computed save outcome waiting for an explicit "apply".
///
/// Only identifies the roll; the roll itself is re-read when the
/// confirmation is applied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingConfirmation {
    pub correlation_id: CorrelationId,
    pub computed_at: DateTime<Utc>,
    pub target_id: TargetId,
    pub instance_id: InstanceId,
    pub kind: ConfirmationKind,
    #[serde(default)]
    pub consumed: bool,
}
