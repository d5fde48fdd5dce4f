use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::core::stages::StageId;

/// A recording as returned by the hosted entity API.
///
/// Every field except `status` is optional and written by the external
/// pipeline over the lifetime of the recording. A field counts as present
/// when it exists and is not `null`; an empty string or an empty list is
/// still present. Values of the wrong shape are read as absent.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Recording {
    #[serde(default, deserialize_with = "lenient")]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub title: Option<String>,
    #[serde(default = "unknown_status")]
    pub status: RecordingStatus,
    #[serde(default, deserialize_with = "lenient")]
    pub error_step: Option<StageId>,
    #[serde(default, deserialize_with = "lenient")]
    pub error_message: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub audio_url: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub transcription: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub analysis: Option<Analysis>,
    #[serde(default, deserialize_with = "lenient")]
    pub deep_analysis: Option<DeepAnalysis>,
    #[serde(default, deserialize_with = "lenient")]
    pub advanced_insights: Option<AdvancedInsights>,
    #[serde(default, deserialize_with = "lenient")]
    pub distribution_log: Option<Vec<DistributionEntry>>,
}

/// Coarse lifecycle state written by the pipeline.
#[derive(Debug, Clone, Copy, Default, Serialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum RecordingStatus {
    #[default]
    Processing,
    Analyzed,
    Distributed,
    Completed,
    Failed,
    /// Any value the pipeline writes that this client does not know.
    Unknown,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Analysis {
    #[serde(default, deserialize_with = "lenient")]
    pub tasks: Vec<serde_json::Value>,
    #[serde(default, deserialize_with = "lenient")]
    pub decisions: Vec<serde_json::Value>,
    #[serde(default, deserialize_with = "lenient")]
    pub topics: Vec<serde_json::Value>,
    #[serde(default, deserialize_with = "lenient")]
    pub summary: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct DeepAnalysis {
    #[serde(default, deserialize_with = "lenient")]
    pub people_mentioned: Vec<serde_json::Value>,
    #[serde(default, deserialize_with = "lenient")]
    pub projects_identified: Vec<serde_json::Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AdvancedInsights {
    #[serde(default, deserialize_with = "lenient")]
    pub topics_detailed: Vec<serde_json::Value>,
    #[serde(default, deserialize_with = "lenient")]
    pub risks_identified: Vec<serde_json::Value>,
    #[serde(default, deserialize_with = "lenient")]
    pub compliance_issues: Vec<serde_json::Value>,
    #[serde(default, deserialize_with = "lenient")]
    pub follow_up_questions: Vec<serde_json::Value>,
}

/// One action executed by the distribution stage.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct DistributionEntry {
    #[serde(default, deserialize_with = "lenient")]
    pub action: String,
    #[serde(default, deserialize_with = "lenient")]
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "lenient")]
    pub details: Option<serde_json::Value>,
    #[serde(default, deserialize_with = "lenient")]
    pub entity: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub entity_id: Option<String>,
}

/// A snapshot that breaks an ordering rule the pipeline is expected to keep.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Anomaly {
    /// `error_step` or `error_message` set while the status is not `failed`.
    ErrorWithoutFailure,
    /// Status `failed` without a recognised `error_step`.
    FailureWithoutStep,
    /// Output of `stage` is present while the output of the earlier stage `missing` is not.
    OutputGap { stage: StageId, missing: StageId },
    /// Status `distributed` with no distribution actions logged.
    EmptyDistributionLog,
}

impl fmt::Display for Anomaly {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Anomaly::ErrorWithoutFailure => {
                write!(f, "error fields set on a recording that has not failed")
            }
            Anomaly::FailureWithoutStep => write!(f, "failed recording has no error_step"),
            Anomaly::OutputGap { stage, missing } => {
                write!(f, "{} output present but {} output missing", stage, missing)
            }
            Anomaly::EmptyDistributionLog => {
                write!(f, "distributed recording has an empty distribution log")
            }
        }
    }
}

impl Recording {
    pub fn new(status: RecordingStatus) -> Self {
        Self {
            status,
            ..Self::default()
        }
    }

    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    pub fn transcription_chars(&self) -> usize {
        self.transcription
            .as_deref()
            .map(|text| text.chars().count())
            .unwrap_or(0)
    }

    pub fn task_count(&self) -> usize {
        self.analysis.as_ref().map(|a| a.tasks.len()).unwrap_or(0)
    }

    pub fn decision_count(&self) -> usize {
        self.analysis.as_ref().map(|a| a.decisions.len()).unwrap_or(0)
    }

    pub fn people_count(&self) -> usize {
        self.deep_analysis
            .as_ref()
            .map(|d| d.people_mentioned.len())
            .unwrap_or(0)
    }

    pub fn project_count(&self) -> usize {
        self.deep_analysis
            .as_ref()
            .map(|d| d.projects_identified.len())
            .unwrap_or(0)
    }

    pub fn topic_count(&self) -> usize {
        self.advanced_insights
            .as_ref()
            .map(|a| a.topics_detailed.len())
            .unwrap_or(0)
    }

    pub fn risk_count(&self) -> usize {
        self.advanced_insights
            .as_ref()
            .map(|a| a.risks_identified.len())
            .unwrap_or(0)
    }

    pub fn distribution_count(&self) -> usize {
        self.distribution_log.as_ref().map(Vec::len).unwrap_or(0)
    }

    /// Whether the output a stage writes on success is present.
    pub fn has_output(&self, stage: StageId) -> bool {
        match stage {
            StageId::Upload => self.audio_url.is_some(),
            StageId::Transcription => self.transcription.is_some(),
            StageId::BasicAnalysis => self.analysis.is_some(),
            StageId::DeepAnalysis => self.deep_analysis.is_some(),
            StageId::AdvancedInsights => self.advanced_insights.is_some(),
            StageId::Distribution => self.distribution_log.is_some(),
        }
    }

    /// Lists the pipeline invariants this snapshot violates.
    ///
    /// Nothing here changes how stages resolve.
    pub fn anomalies(&self) -> Vec<Anomaly> {
        let mut found = Vec::new();

        let has_error_fields = self.error_step.is_some() || self.error_message.is_some();
        if has_error_fields && self.status != RecordingStatus::Failed {
            found.push(Anomaly::ErrorWithoutFailure);
        }
        if self.status == RecordingStatus::Failed && self.error_step.is_none() {
            found.push(Anomaly::FailureWithoutStep);
        }

        // Distribution writes a log rather than a single output, so it is
        // checked separately.
        let outputs = &StageId::ALL[..5];
        for (i, stage) in outputs.iter().enumerate() {
            if !self.has_output(*stage) {
                continue;
            }
            if let Some(missing) = outputs[..i].iter().find(|s| !self.has_output(**s)) {
                found.push(Anomaly::OutputGap {
                    stage: *stage,
                    missing: *missing,
                });
            }
        }

        if self.status == RecordingStatus::Distributed && self.distribution_count() == 0 {
            found.push(Anomaly::EmptyDistributionLog);
        }

        found
    }
}

impl RecordingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordingStatus::Processing => "processing",
            RecordingStatus::Analyzed => "analyzed",
            RecordingStatus::Distributed => "distributed",
            RecordingStatus::Completed => "completed",
            RecordingStatus::Failed => "failed",
            RecordingStatus::Unknown => "unknown",
        }
    }
}

impl fmt::Display for RecordingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for RecordingStatus {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "processing" => RecordingStatus::Processing,
            "analyzed" => RecordingStatus::Analyzed,
            "distributed" => RecordingStatus::Distributed,
            "completed" => RecordingStatus::Completed,
            "failed" => RecordingStatus::Failed,
            _ => RecordingStatus::Unknown,
        })
    }
}

impl<'de> Deserialize<'de> for RecordingStatus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = serde_json::Value::deserialize(deserializer)?;
        Ok(match value.as_str() {
            Some(raw) => raw.parse().unwrap_or(RecordingStatus::Unknown),
            None => RecordingStatus::Unknown,
        })
    }
}

fn unknown_status() -> RecordingStatus {
    RecordingStatus::Unknown
}

// Reads any JSON value and falls back to the default when it has the wrong shape.
fn lenient<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Default,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_snapshot() {
        let json = r#"{
            "id": "rec-1",
            "title": "Site visit",
            "status": "distributed",
            "audio_url": "https://files.example.com/rec-1.webm",
            "transcription": "Hello there",
            "analysis": { "tasks": ["a", "b"], "decisions": ["c"], "topics": [], "summary": "ok", "sentiment": "neutral" },
            "deep_analysis": { "people_mentioned": [{"name": "Ana"}], "projects_identified": [] },
            "advanced_insights": { "topics_detailed": [], "risks_identified": [{"risk": "budget"}] },
            "distribution_log": [
                { "action": "task_created", "timestamp": "2024-05-01T10:00:00Z", "details": "Created task", "entity": "Task", "entity_id": "t1" }
            ],
            "folder_id": "f-9"
        }"#;

        let recording = Recording::from_json(json).unwrap();
        assert_eq!(recording.status, RecordingStatus::Distributed);
        assert_eq!(recording.task_count(), 2);
        assert_eq!(recording.decision_count(), 1);
        assert_eq!(recording.people_count(), 1);
        assert_eq!(recording.risk_count(), 1);
        assert_eq!(recording.distribution_count(), 1);
        assert!(recording.distribution_log.as_ref().unwrap()[0].timestamp.is_some());
    }

    #[test]
    fn test_null_and_malformed_fields_are_absent() {
        let json = r#"{
            "status": "failed",
            "error_step": "not_a_stage",
            "error_message": null,
            "transcription": 42,
            "analysis": "oops",
            "deep_analysis": null
        }"#;

        let recording = Recording::from_json(json).unwrap();
        assert_eq!(recording.error_step, None);
        assert_eq!(recording.error_message, None);
        assert_eq!(recording.transcription, None);
        assert_eq!(recording.analysis, None);
        assert_eq!(recording.deep_analysis, None);
    }

    #[test]
    fn test_object_shaped_analysis_items_are_counted() {
        let json = r#"{
            "status": "analyzed",
            "analysis": {
                "tasks": [{ "title": "Send revised plans", "owner": "Ana" }, "Call the client"],
                "decisions": [{ "text": "Keep the brick facade" }]
            }
        }"#;

        let recording = Recording::from_json(json).unwrap();
        assert_eq!(recording.task_count(), 2);
        assert_eq!(recording.decision_count(), 1);
    }

    #[test]
    fn test_empty_values_are_present() {
        let json = r#"{ "status": "analyzed", "transcription": "", "analysis": { "tasks": [] } }"#;

        let recording = Recording::from_json(json).unwrap();
        assert_eq!(recording.transcription.as_deref(), Some(""));
        assert!(recording.has_output(StageId::Transcription));
        assert!(recording.has_output(StageId::BasicAnalysis));
        assert_eq!(recording.task_count(), 0);
    }

    #[test]
    fn test_unknown_or_missing_status() {
        let unknown = Recording::from_json(r#"{ "status": "archived" }"#).unwrap();
        assert_eq!(unknown.status, RecordingStatus::Unknown);

        let missing = Recording::from_json(r#"{ "title": "x" }"#).unwrap();
        assert_eq!(missing.status, RecordingStatus::Unknown);
    }

    #[test]
    fn test_transcription_chars_counts_characters() {
        let mut recording = Recording::new(RecordingStatus::Analyzed);
        recording.transcription = Some("reunião".to_string());
        assert_eq!(recording.transcription_chars(), 7);
    }

    #[test]
    fn test_anomalies() {
        let mut recording = Recording::new(RecordingStatus::Analyzed);
        recording.error_step = Some(StageId::AdvancedInsights);
        recording.analysis = Some(Analysis::default());
        assert_eq!(
            recording.anomalies(),
            vec![
                Anomaly::ErrorWithoutFailure,
                Anomaly::OutputGap {
                    stage: StageId::BasicAnalysis,
                    missing: StageId::Upload,
                },
            ]
        );

        let failed = Recording::new(RecordingStatus::Failed);
        assert_eq!(failed.anomalies(), vec![Anomaly::FailureWithoutStep]);

        let distributed = Recording::new(RecordingStatus::Distributed);
        assert_eq!(distributed.anomalies(), vec![Anomaly::EmptyDistributionLog]);
    }

    #[test]
    fn test_consistent_snapshot_has_no_anomalies() {
        let mut recording = Recording::new(RecordingStatus::Processing);
        recording.audio_url = Some("https://files.example.com/a.webm".to_string());
        assert!(recording.anomalies().is_empty());
    }
}
