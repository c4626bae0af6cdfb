//! Synthetic progress for in-flight jobs.
//!
//! The backend reports nothing until a job is done, so the indicator is driven by a
//! timer towards [`PROGRESS_CEILING`] over an estimated duration per kind. Only a
//! real completion sets [`PROGRESS_COMPLETE`].

use super::types::GenerationKind;
use crate::config::ProgressConfig;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;

pub const PROGRESS_CEILING: u8 = 95;
pub const PROGRESS_COMPLETE: u8 = 100;

#[derive(Debug, Clone)]
pub struct ProgressSimulator {
    tick: Duration,
    image_duration: Duration,
    video_duration: Duration,
}

impl Default for ProgressSimulator {
    fn default() -> Self {
        Self::new(&ProgressConfig::default())
    }
}

impl ProgressSimulator {
    pub fn new(config: &ProgressConfig) -> Self {
        Self {
            tick: config.tick(),
            image_duration: Duration::from_secs(config.image_secs),
            video_duration: Duration::from_secs(config.video_secs),
        }
    }

    pub fn target_duration(&self, kind: GenerationKind) -> Duration {
        match kind {
            GenerationKind::Image => self.image_duration,
            GenerationKind::Video => self.video_duration,
        }
    }

    /// Progress shown after `ticks` ticks.
    pub fn value_after(&self, kind: GenerationKind, ticks: u64) -> u8 {
        let total_ticks = (self.target_duration(kind).as_millis() / self.tick.as_millis()).max(1);
        let value = u128::from(ticks) * u128::from(PROGRESS_CEILING) / total_ticks;
        value.min(u128::from(PROGRESS_CEILING)) as u8
    }

    /// Resets `progress` to 0 and starts advancing it on a background task.
    pub fn start(&self, kind: GenerationKind, progress: Arc<watch::Sender<u8>>) -> ProgressHandle {
        progress.send_replace(0);
        let simulator = self.clone();

        let task = tokio::spawn(async move {
            let mut ticks = 0u64;
            loop {
                tokio::time::sleep(simulator.tick).await;
                ticks += 1;
                let value = simulator.value_after(kind, ticks);
                progress.send_replace(value);
                if value >= PROGRESS_CEILING {
                    break;
                }
            }
        });

        ProgressHandle { task }
    }
}

/// A running progress simulation. Dropping the handle stops it.
#[derive(Debug)]
pub struct ProgressHandle {
    task: JoinHandle<()>,
}

impl ProgressHandle {
    pub fn cancel(self) {
        // Drop aborts the task.
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

impl Drop for ProgressHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn simulator() -> ProgressSimulator {
        ProgressSimulator::new(&ProgressConfig {
            tick_ms: 500,
            image_secs: 60,
            video_secs: 300,
        })
    }

    #[test]
    fn test_value_after_is_bounded() {
        let sim = simulator();
        assert_eq!(sim.value_after(GenerationKind::Image, 0), 0);
        assert_eq!(sim.value_after(GenerationKind::Image, 60), 47);
        assert_eq!(sim.value_after(GenerationKind::Image, 120), 95);
        assert_eq!(sim.value_after(GenerationKind::Image, 10_000), 95);

        // Video runs five times slower.
        assert_eq!(sim.value_after(GenerationKind::Video, 120), 19);
    }

    #[test]
    fn test_value_after_with_zero_duration() {
        let sim = ProgressSimulator::new(&ProgressConfig {
            tick_ms: 500,
            image_secs: 0,
            video_secs: 0,
        });
        assert_eq!(sim.value_after(GenerationKind::Image, 1), 95);
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_climbs_to_ceiling_and_stops() {
        let (tx, rx) = watch::channel(42u8);
        let handle = simulator().start(GenerationKind::Image, Arc::new(tx));
        assert_eq!(*rx.borrow(), 0);

        tokio::time::sleep(Duration::from_secs(30)).await;
        let midway = *rx.borrow();
        assert!((40..=50).contains(&midway), "midway progress was {midway}");

        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(*rx.borrow(), PROGRESS_CEILING);
        tokio::task::yield_now().await;
        assert!(handle.is_finished());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_freezes_progress() {
        let (tx, rx) = watch::channel(0u8);
        let handle = simulator().start(GenerationKind::Video, Arc::new(tx));

        tokio::time::sleep(Duration::from_secs(10)).await;
        handle.cancel();
        tokio::task::yield_now().await;
        let frozen = *rx.borrow();
        assert!(frozen > 0 && frozen < PROGRESS_CEILING);

        tokio::time::sleep(Duration::from_secs(600)).await;
        assert_eq!(*rx.borrow(), frozen);
    }
}
