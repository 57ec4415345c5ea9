//! Affliction notifications
//!
//! Every state transition the lifecycle engine performs is reported as an
//! `AfflictionNotice`. Presentation layers (chat cards, logs, UI) render them
//! however they like; the engine never formats user-facing text itself.

use serde::{Deserialize, Serialize};

use crate::game_systems::DegreeOfSuccess;
use crate::ids::{InstanceId, TargetId};

/// Old and new stage of a single stage move.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StageTransition {
    pub old_stage: i32,
    pub new_stage: u32,
}

impl StageTransition {
    pub fn new(old_stage: i32, new_stage: u32) -> Self {
        Self {
            old_stage,
            new_stage,
        }
    }

    pub fn is_change(&self) -> bool {
        self.old_stage != self.new_stage as i32
    }
}

/// Why an instance left the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RemovalReason {
    Resisted,
    Recovered,
    Counteracted,
    RemovedByGm,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum AfflictionEvent {
    /// Initial save succeeded; no instance remains
    Resisted { degree: DegreeOfSuccess },
    /// Initial save failed and the target entered a stage directly
    Afflicted {
        degree: DegreeOfSuccess,
        stage: u32,
    },
    OnsetStarted {
        degree: DegreeOfSuccess,
        remaining_seconds: i64,
        stage_advancement: u32,
    },
    OnsetEnded { stage: u32 },
    StageChanged {
        #[serde(flatten)]
        transition: StageTransition,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        degree: Option<DegreeOfSuccess>,
    },
    Recovered {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        degree: Option<DegreeOfSuccess>,
    },
    /// Carries the "accept expiry" action for the GM
    MaxDurationExpired { stage: u32 },
    ReExposure {
        #[serde(flatten)]
        transition: StageTransition,
    },
    MultipleExposure {
        #[serde(flatten)]
        transition: StageTransition,
        /// False when the instance was below the minimum stage
        applied: bool,
    },
    /// First of two required virulent successes
    VirulentSuccess { consecutive_successes: u32 },
    TreatmentApplied {
        degree: DegreeOfSuccess,
        bonus: i32,
    },
    CounteractResult {
        success: bool,
        degree: DegreeOfSuccess,
        counteract_rank: u32,
        affliction_rank: u32,
    },
    /// Stage effects need GM judgment and were not applied automatically
    ManualHandlingRequired { stage: u32 },
    /// Requested stage went past the last stage
    StageClamped { requested: i32, stage: u32 },
    DurationRolled { formula: String, value: u32 },
    StageSaveDue { stage: u32, dc: i32 },
    Removed { reason: RemovalReason },
    ExpiryAccepted { stage: u32 },
    Cleansed {
        #[serde(flatten)]
        transition: StageTransition,
    },
}

impl AfflictionEvent {
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::Resisted { .. } => "resisted",
            Self::Afflicted { .. } => "afflicted",
            Self::OnsetStarted { .. } => "onset_started",
            Self::OnsetEnded { .. } => "onset_ended",
            Self::StageChanged { .. } => "stage_changed",
            Self::Recovered { .. } => "recovered",
            Self::MaxDurationExpired { .. } => "max_duration_expired",
            Self::ReExposure { .. } => "re_exposure",
            Self::MultipleExposure { .. } => "multiple_exposure",
            Self::VirulentSuccess { .. } => "virulent_success",
            Self::TreatmentApplied { .. } => "treatment_applied",
            Self::CounteractResult { .. } => "counteract_result",
            Self::ManualHandlingRequired { .. } => "manual_handling_required",
            Self::StageClamped { .. } => "stage_clamped",
            Self::DurationRolled { .. } => "duration_rolled",
            Self::StageSaveDue { .. } => "stage_save_due",
            Self::Removed { .. } => "removed",
            Self::ExpiryAccepted { .. } => "expiry_accepted",
            Self::Cleansed { .. } => "cleansed",
        }
    }

    /// Warnings are surfaced more prominently than informational notices.
    pub fn is_warning(&self) -> bool {
        matches!(
            self,
            Self::MaxDurationExpired { .. }
                | Self::ManualHandlingRequired { .. }
                | Self::StageClamped { .. }
        )
    }
}

/// An event addressed to one affliction on one target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AfflictionNotice {
    pub target_id: TargetId,
    pub instance_id: InstanceId,
    pub affliction: String,
    pub event: AfflictionEvent,
}

impl AfflictionNotice {
    pub fn new(
        target_id: TargetId,
        instance_id: InstanceId,
        affliction: impl Into<String>,
        event: AfflictionEvent,
    ) -> Self {
        Self {
            target_id,
            instance_id,
            affliction: affliction.into(),
            event,
        }
    }
}
