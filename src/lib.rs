//! Client-side view of the recording processing pipeline.
//!
//! A hosted pipeline writes each recording's `status`, error fields and stage
//! outputs over time. This crate reads snapshots of those records and derives
//! the per-stage timeline shown to users.

pub mod core;
pub mod error;

pub use crate::core::describe::{classify_overall, describe_stage, Locale, OverallState};
pub use crate::core::recording::{Recording, RecordingStatus};
pub use crate::core::stages::{resolve_stage_status, StageFailure, StageId, StageStatus};
pub use crate::core::timeline::{StageView, Timeline};
pub use crate::error::{Result, TimelineError};
