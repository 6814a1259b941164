//! Recurring reset sweep.
//!
//! # Responsibility
//! - Re-run the fixed-task reset on a fixed interval for the lifetime of the
//!   server, so tasks reset promptly after midnight without request traffic.
//!
//! # Invariants
//! - Sweep failures are logged and retried on the next tick, never fatal.
//! - The loop exits only when its cancellation token fires.
//! - Each sweep runs on the blocking pool.

use daylist_core::TaskService;
use log::{info, warn};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

/// Background task that periodically calls [`TaskService::sweep`].
pub struct ResetSweeper {
    service: TaskService,
    interval: Duration,
    cancel: CancellationToken,
}

impl ResetSweeper {
    pub fn new(service: TaskService, interval: Duration) -> Self {
        Self {
            service,
            interval,
            cancel: CancellationToken::new(),
        }
    }

    /// Spawns the sweep loop on the current runtime.
    pub fn spawn(self) -> SweeperHandle {
        let cancel = self.cancel.clone();
        let join = tokio::spawn(self.run());
        SweeperHandle { cancel, join }
    }

    /// Runs until cancelled. The first sweep happens one interval from now;
    /// the startup sweep is the caller's job.
    async fn run(self) {
        info!(
            "event=sweeper_start module=sweeper status=ok interval_ms={}",
            self.interval.as_millis()
        );
        let mut ticker = tokio::time::interval_at(
            tokio::time::Instant::now() + self.interval,
            self.interval,
        );
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = self.cancel.cancelled() => {
                    info!("event=sweeper_stop module=sweeper status=ok");
                    break;
                }
                _ = ticker.tick() => self.tick().await,
            }
        }
    }

    async fn tick(&self) {
        let service = self.service.clone();
        match tokio::task::spawn_blocking(move || service.sweep()).await {
            Ok(Ok(_)) => {}
            Ok(Err(err)) => warn!(
                "event=sweeper_tick module=sweeper status=error retry=next_tick error={err}"
            ),
            Err(err) => warn!(
                "event=sweeper_tick module=sweeper status=error retry=next_tick join_error={err}"
            ),
        }
    }
}

/// Owner handle for a spawned sweeper.
pub struct SweeperHandle {
    cancel: CancellationToken,
    join: JoinHandle<()>,
}

impl SweeperHandle {
    /// Cancels the loop and waits for it to finish.
    pub async fn shutdown(self) {
        self.cancel.cancel();
        if let Err(err) = self.join.await {
            warn!("event=sweeper_stop module=sweeper status=error error={err}");
        }
    }

    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }
}

#[cfg(test)]
mod tests {
    use super::ResetSweeper;
    use chrono::{Duration as ChronoDuration, TimeZone, Utc};
    use daylist_core::{
        InMemoryTaskRepository, ManualClock, NewTask, TaskRepository, TaskService,
    };
    use std::sync::Arc;
    use std::time::Duration;

    #[tokio::test]
    async fn sweeper_resets_tasks_after_day_rollover_and_stops_on_shutdown() {
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2024, 1, 1, 23, 59, 0).unwrap(),
        ));
        let repo = Arc::new(InMemoryTaskRepository::new());
        let service = TaskService::with_clock(repo.clone(), clock.clone());
        let task = service
            .create_task(&NewTask::new("Water plants").fixed(true).completed(true))
            .unwrap();

        let handle = ResetSweeper::new(service, Duration::from_millis(10)).spawn();

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(repo.get_task(task.id).unwrap().unwrap().completed);

        clock.advance(ChronoDuration::minutes(2));
        let mut reset = false;
        for _ in 0..200 {
            if !repo.get_task(task.id).unwrap().unwrap().completed {
                reset = true;
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert!(reset, "sweeper should reset the task after midnight");
        assert_eq!(
            repo.get_task(task.id).unwrap().unwrap().last_reset,
            Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap()
        );

        handle.shutdown().await;
    }

    #[tokio::test]
    async fn shutdown_cancels_before_first_tick() {
        let service = TaskService::new(Arc::new(InMemoryTaskRepository::new()));
        let handle = ResetSweeper::new(service, Duration::from_secs(3600)).spawn();
        assert!(!handle.is_finished());

        tokio::time::timeout(Duration::from_secs(5), handle.shutdown())
            .await
            .expect("sweeper should stop promptly");
    }
}
