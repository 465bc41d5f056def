use linecut_rules::ScheduledJob;
use std::sync::Arc;
use tokio::time::{interval, Duration};

/// Runs a [`ScheduledJob`] on a fixed interval, starting immediately.
pub struct JobScheduler {
    job: Arc<dyn ScheduledJob>,
    interval_secs: u64,
}

impl JobScheduler {
    pub fn new(job: Arc<dyn ScheduledJob>, interval_secs: u64) -> Self {
        Self { job, interval_secs }
    }

    pub async fn run(&self) {
        tracing::info!(
            job = self.job.name(),
            interval_secs = self.interval_secs,
            "Job scheduler started"
        );

        let mut tick = interval(Duration::from_secs(self.interval_secs));
        loop {
            tick.tick().await;
            if let Err(e) = self.job.run().await {
                tracing::error!(job = self.job.name(), error = %e, "Scheduled job failed");
            }
        }
    }
}
