//! Time Window Implementation

use crate::{CapturedFrame, WindowError};
use chrono::{DateTime, Duration, Utc};
use std::collections::vec_deque;
use std::collections::VecDeque;
use tracing::debug;

/// Counters kept for the lifetime of a window
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WindowStats {
    /// Frames inserted
    pub inserted: u64,
    /// Frames evicted from the front
    pub evicted: u64,
    /// Frames whose capture time went backwards and was clamped
    pub clamped: u64,
}

/// Frames captured within the trailing `duration`, oldest first
pub struct TimeWindow {
    frames: VecDeque<CapturedFrame>,
    duration: Duration,
    stats: WindowStats,
}

impl TimeWindow {
    /// Create a window retaining frames for `duration`
    pub fn new(duration: std::time::Duration) -> Result<Self, WindowError> {
        if duration.is_zero() {
            return Err(WindowError::EmptyDuration);
        }
        let duration =
            Duration::from_std(duration).map_err(|_| WindowError::OutOfRange(duration))?;
        Ok(Self {
            frames: VecDeque::new(),
            duration,
            stats: WindowStats::default(),
        })
    }

    /// Append a frame at the back.
    ///
    /// Capture times must be non-decreasing for front-only eviction to hold.
    /// A frame stamped earlier than the newest retained frame (wall clock
    /// stepped backwards) is clamped to that frame's capture time.
    pub fn insert(&mut self, mut frame: CapturedFrame) {
        if let Some(newest) = self.frames.back() {
            if frame.capture_time < newest.capture_time {
                debug!(
                    "Capture time went backwards by {}ms, clamping",
                    (newest.capture_time - frame.capture_time).num_milliseconds()
                );
                frame.capture_time = newest.capture_time;
                self.stats.clamped += 1;
            }
        }
        self.frames.push_back(frame);
        self.stats.inserted += 1;
    }

    /// Drop frames older than `now - duration` from the front.
    ///
    /// Stops at the first frame still inside the window. Returns the number
    /// of frames removed.
    pub fn evict(&mut self, now: DateTime<Utc>) -> usize {
        let cutoff = now - self.duration;
        let mut removed = 0;
        while let Some(oldest) = self.frames.front() {
            if oldest.capture_time >= cutoff {
                break;
            }
            self.frames.pop_front();
            removed += 1;
        }
        self.stats.evicted += removed as u64;
        removed
    }

    /// Insert a frame, then evict relative to its capture time
    pub fn insert_and_evict(&mut self, frame: CapturedFrame) -> usize {
        self.insert(frame);
        match self.frames.back().map(|f| f.capture_time) {
            Some(now) => self.evict(now),
            None => 0,
        }
    }

    /// Read-only view of the retained frames
    pub fn snapshot(&self) -> WindowSnapshot<'_> {
        WindowSnapshot {
            frames: &self.frames,
        }
    }

    /// Number of frames currently retained
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Window duration
    pub fn duration(&self) -> Duration {
        self.duration
    }

    pub fn stats(&self) -> WindowStats {
        self.stats
    }

    /// Remove every frame, keeping the counters
    pub fn clear(&mut self) {
        self.frames.clear();
    }
}

/// Borrowed, ordered view of a window's frames
#[derive(Clone, Copy)]
pub struct WindowSnapshot<'a> {
    frames: &'a VecDeque<CapturedFrame>,
}

impl<'a> WindowSnapshot<'a> {
    /// Frames oldest first
    pub fn iter(&self) -> vec_deque::Iter<'a, CapturedFrame> {
        self.frames.iter()
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Oldest retained frame
    pub fn first(&self) -> Option<&'a CapturedFrame> {
        self.frames.front()
    }

    /// Newest retained frame
    pub fn last(&self) -> Option<&'a CapturedFrame> {
        self.frames.back()
    }

    /// Time between oldest and newest capture
    pub fn span(&self) -> Duration {
        match (self.first(), self.last()) {
            (Some(first), Some(last)) => last.capture_time - first.capture_time,
            _ => Duration::zero(),
        }
    }

    /// Project one value per frame, oldest first
    pub fn signal<F>(&self, f: F) -> Vec<f64>
    where
        F: Fn(&CapturedFrame) -> f64,
    {
        self.frames.iter().map(f).collect()
    }
}

impl<'a> IntoIterator for WindowSnapshot<'a> {
    type Item = &'a CapturedFrame;
    type IntoIter = vec_deque::Iter<'a, CapturedFrame>;

    fn into_iter(self) -> Self::IntoIter {
        self.frames.iter()
    }
}
