use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::core::recording::{Recording, RecordingStatus};
use crate::core::stages::{resolve_stage_status, StageId, StageStatus};

/// Language of the stage and banner texts.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Locale {
    #[default]
    En,
    Pt,
}

/// Banner state for a whole recording.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum OverallState {
    Distributed,
    AwaitingDistribution,
    InProgress,
    Failed { step: Option<StageId> },
}

impl FromStr for Locale {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "en" => Ok(Locale::En),
            "pt" | "pt-br" => Ok(Locale::Pt),
            other => Err(format!("unsupported locale: {}", other)),
        }
    }
}

impl fmt::Display for Locale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Locale::En => write!(f, "en"),
            Locale::Pt => write!(f, "pt"),
        }
    }
}

pub fn stage_label(stage: StageId, locale: Locale) -> &'static str {
    match (locale, stage) {
        (Locale::En, StageId::Upload) => "Upload",
        (Locale::En, StageId::Transcription) => "Transcription",
        (Locale::En, StageId::BasicAnalysis) => "Basic analysis",
        (Locale::En, StageId::DeepAnalysis) => "Deep analysis",
        (Locale::En, StageId::AdvancedInsights) => "Advanced insights",
        (Locale::En, StageId::Distribution) => "Distribution",
        (Locale::Pt, StageId::Upload) => "Upload",
        (Locale::Pt, StageId::Transcription) => "Transcrição",
        (Locale::Pt, StageId::BasicAnalysis) => "Análise básica",
        (Locale::Pt, StageId::DeepAnalysis) => "Análise profunda",
        (Locale::Pt, StageId::AdvancedInsights) => "Insights avançados",
        (Locale::Pt, StageId::Distribution) => "Distribuição",
    }
}

/// Human-readable description of a stage in its current status.
///
/// A failed stage named by `error_step` shows `error_message` unchanged.
pub fn describe_stage(stage: StageId, recording: &Recording, locale: Locale) -> String {
    match resolve_stage_status(stage, recording) {
        StageStatus::Processing => match locale {
            Locale::En => "Currently processing".to_string(),
            Locale::Pt => "Processando no momento".to_string(),
        },
        StageStatus::Pending => match locale {
            Locale::En => "Waiting on earlier stages".to_string(),
            Locale::Pt => "Aguardando etapas anteriores".to_string(),
        },
        StageStatus::Failed => match (&recording.error_message, recording.error_step) {
            (Some(message), Some(step)) if step == stage => message.clone(),
            _ => match locale {
                Locale::En => "Stage failed".to_string(),
                Locale::Pt => "Etapa falhou".to_string(),
            },
        },
        StageStatus::Success => describe_success(stage, recording, locale),
    }
}

fn describe_success(stage: StageId, recording: &Recording, locale: Locale) -> String {
    match (locale, stage) {
        (Locale::En, StageId::Upload) => "Audio uploaded".to_string(),
        (Locale::Pt, StageId::Upload) => "Áudio enviado".to_string(),
        (Locale::En, StageId::Transcription) => {
            format!("{} characters transcribed", recording.transcription_chars())
        }
        (Locale::Pt, StageId::Transcription) => {
            format!("{} caracteres transcritos", recording.transcription_chars())
        }
        (Locale::En, StageId::BasicAnalysis) => format!(
            "{} tasks, {} decisions",
            recording.task_count(),
            recording.decision_count()
        ),
        (Locale::Pt, StageId::BasicAnalysis) => format!(
            "{} tarefas, {} decisões",
            recording.task_count(),
            recording.decision_count()
        ),
        (Locale::En, StageId::DeepAnalysis) => format!(
            "{} people, {} projects identified",
            recording.people_count(),
            recording.project_count()
        ),
        (Locale::Pt, StageId::DeepAnalysis) => format!(
            "{} pessoas, {} projetos identificados",
            recording.people_count(),
            recording.project_count()
        ),
        (Locale::En, StageId::AdvancedInsights) => format!(
            "{} topics, {} risks identified",
            recording.topic_count(),
            recording.risk_count()
        ),
        (Locale::Pt, StageId::AdvancedInsights) => format!(
            "{} tópicos, {} riscos identificados",
            recording.topic_count(),
            recording.risk_count()
        ),
        (Locale::En, StageId::Distribution) => {
            format!("{} actions executed", recording.distribution_count())
        }
        (Locale::Pt, StageId::Distribution) => {
            format!("{} ações executadas", recording.distribution_count())
        }
    }
}

/// Maps the coarse status to a banner. `completed` and unknown statuses have none.
pub fn classify_overall(recording: &Recording) -> Option<OverallState> {
    match recording.status {
        RecordingStatus::Distributed => Some(OverallState::Distributed),
        RecordingStatus::Analyzed => Some(OverallState::AwaitingDistribution),
        RecordingStatus::Processing => Some(OverallState::InProgress),
        RecordingStatus::Failed => Some(OverallState::Failed {
            step: recording.error_step,
        }),
        RecordingStatus::Completed | RecordingStatus::Unknown => None,
    }
}

impl OverallState {
    pub fn describe(&self, locale: Locale) -> String {
        match (locale, self) {
            (Locale::En, OverallState::Distributed) => "Completed and distributed".to_string(),
            (Locale::En, OverallState::AwaitingDistribution) => {
                "Awaiting approval and distribution".to_string()
            }
            (Locale::En, OverallState::InProgress) => "In progress".to_string(),
            (Locale::En, OverallState::Failed { step }) => {
                format!("Failed at stage {}", step_label(*step, locale))
            }
            (Locale::Pt, OverallState::Distributed) => "Concluída e distribuída".to_string(),
            (Locale::Pt, OverallState::AwaitingDistribution) => {
                "Aguardando aprovação e distribuição".to_string()
            }
            (Locale::Pt, OverallState::InProgress) => "Em processamento".to_string(),
            (Locale::Pt, OverallState::Failed { step }) => {
                format!("Falhou na etapa {}", step_label(*step, locale))
            }
        }
    }
}

fn step_label(step: Option<StageId>, locale: Locale) -> &'static str {
    match (step, locale) {
        (Some(stage), _) => stage_label(stage, locale),
        (None, Locale::En) => "unknown",
        (None, Locale::Pt) => "desconhecida",
    }
}
