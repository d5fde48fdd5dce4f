use serde::{Deserialize, Serialize};
use std::fmt;

use crate::core::describe::{classify_overall, describe_stage, stage_label, Locale, OverallState};
use crate::core::recording::Recording;
use crate::core::stages::{classify_failure, resolve_stage_status, StageFailure, StageId, StageStatus};

/// One row of the processing timeline.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StageView {
    pub stage: StageId,
    pub label: String,
    pub status: StageStatus,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<StageFailure>,
}

/// All six stages of a recording, resolved from one snapshot.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Timeline {
    pub recording_id: Option<String>,
    pub title: Option<String>,
    pub stages: Vec<StageView>,
    pub overall: Option<OverallState>,
    pub banner: Option<String>,
}

impl Timeline {
    pub fn resolve(recording: &Recording, locale: Locale) -> Self {
        let stages = StageId::ALL
            .iter()
            .map(|&stage| StageView {
                stage,
                label: stage_label(stage, locale).to_string(),
                status: resolve_stage_status(stage, recording),
                description: describe_stage(stage, recording, locale),
                failure: classify_failure(stage, recording),
            })
            .collect();

        let overall = classify_overall(recording);

        Self {
            recording_id: recording.id.clone(),
            title: recording.title.clone(),
            stages,
            banner: overall.map(|state| state.describe(locale)),
            overall,
        }
    }

    pub fn stage(&self, stage: StageId) -> Option<&StageView> {
        self.stages.iter().find(|view| view.stage == stage)
    }

    /// Fraction of stages that succeeded, from 0.0 to 1.0.
    pub fn progress(&self) -> f32 {
        if self.stages.is_empty() {
            return 0.0;
        }
        let done = self
            .stages
            .iter()
            .filter(|view| view.status == StageStatus::Success)
            .count();
        done as f32 / self.stages.len() as f32
    }

    /// First stage that has not succeeded yet.
    pub fn current_stage(&self) -> Option<StageId> {
        self.stages
            .iter()
            .find(|view| view.status != StageStatus::Success)
            .map(|view| view.stage)
    }

    pub fn has_failure(&self) -> bool {
        self.stages
            .iter()
            .any(|view| view.status == StageStatus::Failed)
    }
}

fn status_marker(status: StageStatus) -> &'static str {
    match status {
        StageStatus::Success => "[ok]",
        StageStatus::Processing => "[..]",
        StageStatus::Failed => "[!!]",
        StageStatus::Pending => "[  ]",
    }
}

impl fmt::Display for Timeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let title = self.title.as_deref().unwrap_or("Untitled recording");
        match &self.recording_id {
            Some(id) => writeln!(f, "{} ({})", title, id)?,
            None => writeln!(f, "{}", title)?,
        }

        for view in &self.stages {
            writeln!(
                f,
                "  {} {:<20} {}",
                status_marker(view.status),
                view.label,
                view.description
            )?;
        }

        if let Some(banner) = &self.banner {
            write!(f, "  {}", banner)?;
        }
        Ok(())
    }
}
