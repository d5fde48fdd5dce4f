use anyhow::{bail, Context, Result};
use parking_lot::RwLock;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::core::config::PollingConfig;
use crate::core::describe::Locale;
use crate::core::source::RecordingSource;
use crate::core::timeline::Timeline;

/// Published whenever a polled recording's timeline differs from the last one seen.
#[derive(Debug, Clone, PartialEq)]
pub enum TimelineUpdate {
    Changed(Timeline),
    Removed { recording_id: String },
}

/// Latest timeline per recording, shared between the watcher and its readers.
#[derive(Debug, Default)]
pub struct TimelineBoard {
    timelines: RwLock<HashMap<String, Timeline>>,
}

impl TimelineBoard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, recording_id: &str) -> Option<Timeline> {
        self.timelines.read().get(recording_id).cloned()
    }

    pub fn len(&self) -> usize {
        self.timelines.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.timelines.read().is_empty()
    }

    /// All timelines, ordered by recording id.
    pub fn snapshot(&self) -> Vec<Timeline> {
        let timelines = self.timelines.read();
        let mut ids: Vec<&String> = timelines.keys().collect();
        ids.sort();
        ids.into_iter().map(|id| timelines[id].clone()).collect()
    }

    /// Stores `timeline` and reports whether it differs from the previous one.
    pub fn apply(&self, recording_id: &str, timeline: Timeline) -> bool {
        let mut timelines = self.timelines.write();
        if timelines.get(recording_id) == Some(&timeline) {
            return false;
        }
        timelines.insert(recording_id.to_string(), timeline);
        true
    }

    /// Drops every recording not in `keep` and returns the dropped ids.
    pub fn retain(&self, keep: &HashSet<String>) -> Vec<String> {
        let mut timelines = self.timelines.write();
        let mut removed: Vec<String> = timelines
            .keys()
            .filter(|id| !keep.contains(*id))
            .cloned()
            .collect();
        removed.sort();
        for id in &removed {
            timelines.remove(id);
        }
        removed
    }
}

/// Polls a `RecordingSource` and publishes timeline changes.
pub struct TimelineWatcher<S: RecordingSource> {
    source: Arc<S>,
    board: Arc<TimelineBoard>,
    locale: Locale,
    interval: Duration,
    max_polls: Option<u64>,
    is_running: Arc<AtomicBool>,
}

impl<S: RecordingSource> Clone for TimelineWatcher<S> {
    fn clone(&self) -> Self {
        Self {
            source: self.source.clone(),
            board: self.board.clone(),
            locale: self.locale,
            interval: self.interval,
            max_polls: self.max_polls,
            is_running: self.is_running.clone(),
        }
    }
}

impl<S: RecordingSource + 'static> TimelineWatcher<S> {
    pub fn new(source: Arc<S>, polling: &PollingConfig, locale: Locale) -> Self {
        Self {
            source,
            board: Arc::new(TimelineBoard::new()),
            locale,
            interval: Duration::from_secs(polling.interval_seconds.max(1)),
            max_polls: polling.max_polls,
            is_running: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn board(&self) -> Arc<TimelineBoard> {
        self.board.clone()
    }

    pub fn is_running(&self) -> bool {
        self.is_running.load(Ordering::Relaxed)
    }

    /// Fetches every recording once and returns what changed since the last poll.
    pub fn poll_once(&self) -> Result<Vec<TimelineUpdate>> {
        let recordings = self.source.list().context("Failed to list recordings")?;
        let mut updates = Vec::new();
        let mut seen = HashSet::new();

        for recording in recordings {
            let Some(id) = recording.id.clone() else {
                warn!("Skipping recording without an id");
                continue;
            };
            seen.insert(id.clone());

            let timeline = Timeline::resolve(&recording, self.locale);
            if self.board.apply(&id, timeline.clone()) {
                for anomaly in recording.anomalies() {
                    warn!("Recording {}: {}", id, anomaly);
                }
                debug!("Timeline changed for recording {}", id);
                updates.push(TimelineUpdate::Changed(timeline));
            }
        }

        for recording_id in self.board.retain(&seen) {
            debug!("Recording {} no longer listed", recording_id);
            updates.push(TimelineUpdate::Removed { recording_id });
        }

        Ok(updates)
    }

    /// Starts polling in the background. Updates arrive on the returned receiver.
    ///
    /// Fails when a polling loop started by this watcher is still running.
    /// Each poll runs on the blocking pool since sources may do file or network I/O.
    pub fn spawn(&self) -> Result<(mpsc::Receiver<TimelineUpdate>, JoinHandle<()>)> {
        if self.is_running.swap(true, Ordering::Relaxed) {
            warn!("Timeline watcher is already running");
            bail!("Timeline watcher is already running");
        }

        let (tx, rx) = mpsc::channel(64);
        let watcher = self.clone();
        let handle = tokio::spawn(async move {
            info!("Timeline watcher started (every {:?})", watcher.interval);
            let mut polls: u64 = 0;

            'poll: while watcher.is_running.load(Ordering::Relaxed) {
                let poller = watcher.clone();
                match tokio::task::spawn_blocking(move || poller.poll_once()).await {
                    Ok(Ok(updates)) => {
                        for update in updates {
                            if tx.send(update).await.is_err() {
                                debug!("Update receiver dropped");
                                break 'poll;
                            }
                        }
                    }
                    Ok(Err(e)) => error!("Poll failed: {:#}", e),
                    Err(e) => error!("Poll task panicked: {}", e),
                }

                polls += 1;
                if watcher.max_polls.is_some_and(|max| polls >= max) {
                    break;
                }

                tokio::time::sleep(watcher.interval).await;
            }

            watcher.is_running.store(false, Ordering::Relaxed);
            info!("Timeline watcher stopped after {} polls", polls);
        });

        Ok((rx, handle))
    }

    pub fn stop(&self) {
        self.is_running.store(false, Ordering::Relaxed);
    }
}
