//! Label-keyed time alerts and repeating timers
//!
//! The scheduler is a pure data structure: it holds scheduled fire times and
//! pops due [`TimeEvent`]s when a driver advances it to a clock-provided time.
//! Each `advance_to` call is atomic with respect to cancellation: a label
//! cancelled before the call never fires, a label whose event was already
//! popped has fired.

use std::cmp::Reverse;
use std::collections::HashMap;

use chrono::Duration;
use hermes_core::Timestamp;
use log::debug;
use priority_queue::PriorityQueue;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TimerError {
    #[error("Label already scheduled: {0}")]
    DuplicateLabel(String),

    #[error("Interval must be positive")]
    NonPositiveInterval,
}

/// A timer or alert firing, delivered into the owning strategy's event stream
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeEvent {
    /// The label the timer or alert was scheduled under
    pub label: String,
    /// The scheduled fire time (not the dispatch time)
    pub ts_event: Timestamp,
}

#[derive(Debug, Clone)]
struct TimerEntry {
    /// Re-arm interval; `None` for one-shot alerts
    interval: Option<Duration>,
    /// Inclusive stop boundary for repeating timers
    stop_time: Option<Timestamp>,
}

/// Maps labels to scheduled callbacks into a strategy's event stream
///
/// One-shot alerts fire exactly once and are removed; repeating timers re-arm
/// every interval until their stop time (the stop boundary itself fires, then
/// the timer auto-cancels) or until explicitly cancelled. Cancelling an
/// unknown label is a no-op.
#[derive(Debug, Default)]
pub struct TimerScheduler {
    entries: HashMap<String, TimerEntry>,
    // Min-heap over next fire times, one pending fire per label
    queue: PriorityQueue<String, Reverse<Timestamp>>,
}

impl TimerScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedule a one-shot alert at an absolute time
    pub fn set_time_alert(
        &mut self,
        label: impl Into<String>,
        alert_time: Timestamp,
    ) -> Result<(), TimerError> {
        let label = label.into();
        if self.entries.contains_key(&label) {
            return Err(TimerError::DuplicateLabel(label));
        }
        self.entries.insert(
            label.clone(),
            TimerEntry {
                interval: None,
                stop_time: None,
            },
        );
        self.queue.push(label, Reverse(alert_time));
        Ok(())
    }

    /// Schedule a timer firing first at `start + interval`
    ///
    /// With `repeat` false this behaves as a single alert at `start + interval`;
    /// with `repeat` true it re-arms every `interval` until `stop` (inclusive)
    /// or explicit cancellation.
    pub fn set_timer(
        &mut self,
        label: impl Into<String>,
        interval: Duration,
        start: Timestamp,
        stop: Option<Timestamp>,
        repeat: bool,
    ) -> Result<(), TimerError> {
        let label = label.into();
        if self.entries.contains_key(&label) {
            return Err(TimerError::DuplicateLabel(label));
        }
        if interval <= Duration::zero() {
            return Err(TimerError::NonPositiveInterval);
        }
        let entry = if repeat {
            TimerEntry {
                interval: Some(interval),
                stop_time: stop,
            }
        } else {
            TimerEntry {
                interval: None,
                stop_time: None,
            }
        };
        self.entries.insert(label.clone(), entry);
        self.queue.push(label, Reverse(start + interval));
        Ok(())
    }

    /// Cancel a timer; unknown labels are a logged no-op
    pub fn cancel_timer(&mut self, label: &str) {
        if self.entries.remove(label).is_none() {
            debug!("cancel_timer: no timer scheduled under '{label}'");
            return;
        }
        self.queue.remove(label);
    }

    /// Cancel a time alert; unknown labels are a logged no-op
    pub fn cancel_time_alert(&mut self, label: &str) {
        self.cancel_timer(label);
    }

    /// Pop every fire due at or before `now`, in fire-time order
    ///
    /// Repeating timers re-arm as they fire; a timer whose fire reaches its
    /// stop boundary fires that final event and is then removed.
    pub fn advance_to(&mut self, now: Timestamp) -> Vec<TimeEvent> {
        let mut events = Vec::new();
        while let Some((_, Reverse(ts))) = self.queue.peek() {
            if *ts > now {
                break;
            }
            let (label, Reverse(ts_event)) = match self.queue.pop() {
                Some(item) => item,
                None => break,
            };
            events.push(TimeEvent {
                label: label.clone(),
                ts_event,
            });

            let rearm = self.entries.get(&label).and_then(|entry| {
                let interval = entry.interval?;
                match entry.stop_time {
                    Some(stop) if ts_event >= stop => None,
                    _ => Some(ts_event + interval),
                }
            });
            match rearm {
                Some(next) => {
                    self.queue.push(label, Reverse(next));
                }
                None => {
                    self.entries.remove(&label);
                }
            }
        }
        events
    }

    /// The earliest pending fire time, if any
    pub fn next_fire_time(&self) -> Option<Timestamp> {
        self.queue.peek().map(|(_, Reverse(ts))| *ts)
    }

    /// Labels with a pending fire
    pub fn labels(&self) -> Vec<String> {
        self.entries.keys().cloned().collect()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop every scheduled timer and alert
    pub fn clear(&mut self) {
        self.entries.clear();
        self.queue.clear();
    }
}
