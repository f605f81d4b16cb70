use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use telemetry_logging::{telemetry_debug, telemetry_info};
use thiserror::Error;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// Work run on every tick. Must return quickly; it never awaits a fetch.
pub type RefreshAction = Arc<dyn Fn() + Send + Sync>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScheduleError {
    #[error("polling interval for channel `{channel}` must be greater than zero")]
    ZeroInterval { channel: String },
}

/// One repeating timer per channel. Starting a channel that is already
/// running replaces its timer.
pub struct PollScheduler {
    runtime: Handle,
    jobs: HashMap<String, JoinHandle<()>>,
}

impl PollScheduler {
    pub fn new(runtime: Handle) -> Self {
        Self {
            runtime,
            jobs: HashMap::new(),
        }
    }

    /// Runs `action` now and then every `interval` until stopped.
    pub fn start(
        &mut self,
        channel: &str,
        interval: Duration,
        action: RefreshAction,
    ) -> Result<(), ScheduleError> {
        if interval.is_zero() {
            return Err(ScheduleError::ZeroInterval {
                channel: channel.to_string(),
            });
        }
        if let Some(previous) = self.jobs.remove(channel) {
            previous.abort();
            telemetry_debug!("replacing polling timer for {channel}");
        }

        let task = self.runtime.spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                action();
            }
        });
        self.jobs.insert(channel.to_string(), task);
        telemetry_info!("polling {channel} every {} ms", interval.as_millis());
        Ok(())
    }

    /// Returns false when no timer was running for `channel`.
    pub fn stop(&mut self, channel: &str) -> bool {
        match self.jobs.remove(channel) {
            Some(task) => {
                task.abort();
                telemetry_info!("stopped polling {channel}");
                true
            }
            None => false,
        }
    }

    pub fn stop_all(&mut self) {
        for (channel, task) in self.jobs.drain() {
            task.abort();
            telemetry_info!("stopped polling {channel}");
        }
    }

    pub fn is_active(&self, channel: &str) -> bool {
        self.jobs.contains_key(channel)
    }

    pub fn active_channels(&self) -> Vec<String> {
        let mut channels: Vec<_> = self.jobs.keys().cloned().collect();
        channels.sort();
        channels
    }
}

impl Drop for PollScheduler {
    fn drop(&mut self) {
        self.stop_all();
    }
}
