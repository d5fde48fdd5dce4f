use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::core::recording::{Recording, RecordingStatus};

/// The six pipeline stages, in the order they run.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum StageId {
    Upload,
    Transcription,
    BasicAnalysis,
    DeepAnalysis,
    AdvancedInsights,
    Distribution,
}

/// Display status of a single stage.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum StageStatus {
    Success,
    Processing,
    Failed,
    Pending,
}

/// Why a stage shows as failed.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StageFailure {
    /// The pipeline reported this stage in `error_step`.
    Explicit,
    /// Inferred from a missing output once the recording reached `analyzed`.
    Implicit,
}

impl StageId {
    pub const ALL: [StageId; 6] = [
        StageId::Upload,
        StageId::Transcription,
        StageId::BasicAnalysis,
        StageId::DeepAnalysis,
        StageId::AdvancedInsights,
        StageId::Distribution,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            StageId::Upload => "upload",
            StageId::Transcription => "transcription",
            StageId::BasicAnalysis => "basic_analysis",
            StageId::DeepAnalysis => "deep_analysis",
            StageId::AdvancedInsights => "advanced_insights",
            StageId::Distribution => "distribution",
        }
    }

    // Position among the stages that can fail; upload always precedes them.
    fn failure_position(self) -> Option<usize> {
        match self {
            StageId::Upload => None,
            StageId::Transcription => Some(0),
            StageId::BasicAnalysis => Some(1),
            StageId::DeepAnalysis => Some(2),
            StageId::AdvancedInsights => Some(3),
            StageId::Distribution => Some(4),
        }
    }
}

impl fmt::Display for StageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for StageId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        StageId::ALL
            .iter()
            .find(|stage| stage.as_str() == s)
            .copied()
            .ok_or_else(|| format!("unknown stage: {}", s))
    }
}

impl StageStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            StageStatus::Success => "success",
            StageStatus::Processing => "processing",
            StageStatus::Failed => "failed",
            StageStatus::Pending => "pending",
        }
    }
}

impl fmt::Display for StageStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Derives the display status of `stage` from a recording snapshot.
///
/// Pure and total: absent fields resolve to `Pending`, never to an error.
pub fn resolve_stage_status(stage: StageId, recording: &Recording) -> StageStatus {
    match recording.status {
        RecordingStatus::Processing => match stage {
            StageId::Upload => StageStatus::Success,
            StageId::Transcription => StageStatus::Processing,
            _ => StageStatus::Pending,
        },
        RecordingStatus::Failed => resolve_failed(stage, recording.error_step),
        RecordingStatus::Analyzed | RecordingStatus::Distributed | RecordingStatus::Completed => {
            resolve_settled(stage, recording)
        }
        RecordingStatus::Unknown => StageStatus::Pending,
    }
}

/// Classifies a failed stage as explicit or implicit. `None` when the stage did not fail.
pub fn classify_failure(stage: StageId, recording: &Recording) -> Option<StageFailure> {
    if resolve_stage_status(stage, recording) != StageStatus::Failed {
        return None;
    }
    if recording.error_step == Some(stage) {
        Some(StageFailure::Explicit)
    } else {
        Some(StageFailure::Implicit)
    }
}

fn resolve_failed(stage: StageId, error_step: Option<StageId>) -> StageStatus {
    let Some(position) = stage.failure_position() else {
        return StageStatus::Success;
    };
    if error_step == Some(stage) {
        return StageStatus::Failed;
    }
    match error_step.and_then(StageId::failure_position) {
        Some(failed_at) if position < failed_at => StageStatus::Success,
        _ => StageStatus::Pending,
    }
}

fn resolve_settled(stage: StageId, recording: &Recording) -> StageStatus {
    let analyzed = recording.status == RecordingStatus::Analyzed;
    let present = recording.has_output(stage);

    match stage {
        StageId::Upload | StageId::Transcription | StageId::BasicAnalysis => success_if(present),
        // Legacy heuristic: once a recording is analyzed, a later stage without
        // output is shown as failed even when nothing reported a failure.
        StageId::DeepAnalysis => {
            if analyzed && !present {
                StageStatus::Failed
            } else {
                success_if(present)
            }
        }
        StageId::AdvancedInsights => {
            let reported = recording.error_step == Some(StageId::AdvancedInsights);
            if analyzed && (reported || !present) {
                StageStatus::Failed
            } else {
                success_if(present)
            }
        }
        StageId::Distribution => success_if(recording.status == RecordingStatus::Distributed),
    }
}

fn success_if(done: bool) -> StageStatus {
    if done {
        StageStatus::Success
    } else {
        StageStatus::Pending
    }
}
