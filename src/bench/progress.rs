//! Progress side channel
//!
//! Passes report completion through a [`ProgressObserver`]. Observers are
//! only ever called between timed operations, and [`ProgressThrottle`]
//! limits calls to whole-percentage-point changes.

use tokio::sync::mpsc;

/// Which pass a progress update belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Write,
    Read,
}

impl Phase {
    pub fn description(&self) -> &'static str {
        match self {
            Phase::Write => "Writing",
            Phase::Read => "Reading",
        }
    }
}

/// Progress update sent during a pass
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProgressUpdate {
    pub phase: Phase,
    /// Blocks completed so far
    pub completed: u64,
    /// Blocks planned for the pass
    pub total: u64,
}

impl ProgressUpdate {
    /// Completion percentage (0 to 100)
    pub fn percent(&self) -> f64 {
        if self.total == 0 {
            100.0
        } else {
            (self.completed as f64) * 100.0 / (self.total as f64)
        }
    }
}

/// Receives progress updates; must return quickly
pub trait ProgressObserver {
    fn on_progress(&mut self, update: ProgressUpdate);
}

/// Observer that ignores every update
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProgress;

impl ProgressObserver for NoProgress {
    fn on_progress(&mut self, _update: ProgressUpdate) {}
}

impl<F> ProgressObserver for F
where
    F: FnMut(ProgressUpdate),
{
    fn on_progress(&mut self, update: ProgressUpdate) {
        self(update)
    }
}

/// Forwards updates to an async consumer without ever blocking the pass.
/// Updates are dropped when the channel is full or closed.
#[derive(Debug, Clone)]
pub struct ChannelObserver(pub mpsc::Sender<ProgressUpdate>);

impl ProgressObserver for ChannelObserver {
    fn on_progress(&mut self, update: ProgressUpdate) {
        let _ = self.0.try_send(update);
    }
}

/// Rate limiter emitting at most one update per percentage point
#[derive(Debug)]
pub struct ProgressThrottle {
    phase: Phase,
    total: u64,
    last_percent: Option<u64>,
}

impl ProgressThrottle {
    pub fn new(phase: Phase, total: u64) -> Self {
        Self {
            phase,
            total,
            last_percent: None,
        }
    }

    /// Report `completed` blocks if that crosses into a new whole percent
    pub fn tick(&mut self, completed: u64, observer: &mut dyn ProgressObserver) {
        let percent = if self.total == 0 {
            100
        } else {
            completed.saturating_mul(100) / self.total
        };

        if self.last_percent != Some(percent) {
            self.last_percent = Some(percent);
            observer.on_progress(ProgressUpdate {
                phase: self.phase,
                completed,
                total: self.total,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_update_percent() {
        let update = ProgressUpdate {
            phase: Phase::Write,
            completed: 50,
            total: 200,
        };
        assert_eq!(update.percent(), 25.0);

        let empty = ProgressUpdate {
            phase: Phase::Read,
            completed: 0,
            total: 0,
        };
        assert_eq!(empty.percent(), 100.0);
    }

    #[test]
    fn test_throttle_emits_once_per_percent() {
        let mut seen = Vec::new();
        let mut observer = |u: ProgressUpdate| seen.push(u.completed);
        let mut throttle = ProgressThrottle::new(Phase::Read, 10_000);

        for completed in 1..=10_000 {
            throttle.tick(completed, &mut observer);
        }

        // 0% through 100%
        assert_eq!(seen.len(), 101);
        assert_eq!(seen.first(), Some(&1));
        assert_eq!(seen[1], 100);
        assert_eq!(seen.last(), Some(&10_000));
    }

    #[test]
    fn test_throttle_small_totals_report_every_block() {
        let mut count = 0;
        let mut observer = |_u: ProgressUpdate| count += 1;
        let mut throttle = ProgressThrottle::new(Phase::Write, 4);
        for completed in 1..=4 {
            throttle.tick(completed, &mut observer);
        }
        assert_eq!(count, 4);
    }

    #[tokio::test]
    async fn test_channel_observer_never_blocks() {
        let (tx, mut rx) = mpsc::channel(1);
        let mut observer = ChannelObserver(tx);
        let update = ProgressUpdate {
            phase: Phase::Write,
            completed: 1,
            total: 2,
        };

        observer.on_progress(update);
        // Channel full: dropped instead of blocking
        observer.on_progress(ProgressUpdate { completed: 2, ..update });

        assert_eq!(rx.recv().await, Some(update));
        drop(observer);
        assert_eq!(rx.recv().await, None);
    }
}
