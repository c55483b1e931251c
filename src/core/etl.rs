use crate::domain::ports::Pipeline;
use crate::utils::error::Result;
use crate::utils::monitor::SystemMonitor;

/// Runs a pipeline's extract, transform and load phases in order.
pub struct EtlEngine<P: Pipeline> {
    pipeline: P,
    monitor: SystemMonitor,
}

impl<P: Pipeline> EtlEngine<P> {
    pub fn new(pipeline: P) -> Self {
        Self::new_with_monitoring(pipeline, false)
    }

    pub fn new_with_monitoring(pipeline: P, monitor_enabled: bool) -> Self {
        Self {
            pipeline,
            monitor: SystemMonitor::new(monitor_enabled),
        }
    }

    pub async fn run(&self) -> Result<String> {
        tracing::info!("Starting year review...");
        self.monitor.log_stats("Start");

        tracing::info!("Collecting activity...");
        let activities = self.pipeline.extract().await?;
        tracing::info!("Collected activity for {} members", activities.len());
        self.monitor.log_stats("Extract");

        tracing::info!("Analyzing projects...");
        let report = self.pipeline.transform(activities).await?;
        tracing::info!(
            "Identified {} projects across {} members",
            report.team_stats.total_projects,
            report.team_stats.team_size
        );
        self.monitor.log_stats("Transform");

        tracing::info!("Generating HTML pages...");
        let index = self.pipeline.load(report).await?;
        tracing::info!("Team page saved to: {}", index);
        self.monitor.log_stats("Load");
        self.monitor.log_final_stats();

        Ok(index)
    }
}
