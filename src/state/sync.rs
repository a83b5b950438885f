// Periodic background sync driven by the syncEnabled/syncInterval settings

use crate::config::Settings;
use std::future::Future;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// Owns at most one periodic task
#[derive(Default)]
pub struct SyncScheduler {
    handle: Option<JoinHandle<()>>,
    interval: Option<Duration>,
}

impl SyncScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `tick` every `interval`, replacing any running task
    ///
    /// The first call happens one full interval after start.
    pub fn start<F, Fut>(&mut self, interval: Duration, tick: F)
    where
        F: Fn() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.stop();

        let period = interval.max(Duration::from_secs(1));
        log::debug!("Starting sync every {:?}", period);

        self.handle = Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // interval() fires immediately once
            ticker.tick().await;
            loop {
                ticker.tick().await;
                tick().await;
            }
        }));
        self.interval = Some(period);
    }

    pub fn stop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
            log::debug!("Sync stopped");
        }
        self.interval = None;
    }

    /// Start, restart or stop according to `settings`
    pub fn apply<F, Fut>(&mut self, settings: &Settings, tick: F)
    where
        F: Fn() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        if settings.sync_enabled {
            if self.interval != Some(settings.sync_interval()) || !self.is_running() {
                self.start(settings.sync_interval(), tick);
            }
        } else {
            self.stop();
        }
    }

    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    pub fn interval(&self) -> Option<Duration> {
        self.interval
    }
}

impl Drop for SyncScheduler {
    fn drop(&mut self) {
        self.stop();
    }
}
