//! Background jobs standing in for field devices.
//!
//! Each job is a pure simulation step (testable with a seeded generator)
//! plus a database pass, driven by [`schedule::PeriodicJob`]. Jobs and
//! requests are not coordinated; the last write wins.

/// Camera screenshots of waste bins
pub mod camera;

/// IoT temperature/humidity readings
pub mod iot_sensors;

/// The fixed-interval runner
pub mod schedule;

/// Waste-bin fill analysis
pub mod waste_bins;

use crate::config::app::SimulationConfig;
use crate::errors::Result;
use schedule::{PeriodicJob, RunSummary};
use sea_orm::DatabaseConnection;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::info;

/// The simulation jobs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Simulation {
    /// Waste-bin fill analysis
    WasteBins,
    /// Camera screenshots of waste bins
    Camera,
    /// IoT temperature and humidity readings
    IotSensors,
}

impl Simulation {
    /// Every job, in spawn order.
    pub const ALL: [Self; 3] = [Self::WasteBins, Self::Camera, Self::IotSensors];

    /// Name used in log lines.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::WasteBins => "waste-bin-analysis",
            Self::Camera => "camera-screenshots",
            Self::IotSensors => "iot-sensors",
        }
    }

    /// The configured period of this job.
    #[must_use]
    pub const fn interval(self, config: &SimulationConfig) -> Duration {
        match self {
            Self::WasteBins => config.waste_bin_interval(),
            Self::Camera => config.camera_interval(),
            Self::IotSensors => config.iot_interval(),
        }
    }

    /// Runner for this job with `interval`.
    #[must_use]
    pub const fn job(self, interval: Duration, config: &SimulationConfig) -> PeriodicJob {
        PeriodicJob {
            name: self.name(),
            interval,
            retry_after: config.retry_after(),
        }
    }

    /// One pass of the job.
    pub async fn tick(self, db: &DatabaseConnection) -> Result<()> {
        match self {
            Self::WasteBins => waste_bins::analyze_bins(db).await.map(drop),
            Self::Camera => camera::capture_screenshots(db).await.map(drop),
            Self::IotSensors => iot_sensors::simulate_sensors(db).await.map(drop),
        }
    }

    /// Runs the job `cycles` times (forever for `None`) every `interval`.
    pub async fn run(
        self,
        db: &DatabaseConnection,
        config: &SimulationConfig,
        interval: Duration,
        cycles: Option<u64>,
    ) -> RunSummary {
        info!(job = self.name(), interval_secs = interval.as_secs(), "Starting simulation job");
        self.job(interval, config).run(cycles, || self.tick(db)).await
    }
}

/// Spawns every job with its configured interval.
pub fn spawn_all(db: &DatabaseConnection, config: &SimulationConfig) -> Vec<JoinHandle<RunSummary>> {
    Simulation::ALL
        .into_iter()
        .map(|simulation| {
            let db = db.clone();
            let config = config.clone();
            tokio::spawn(async move {
                let interval = simulation.interval(&config);
                simulation.run(&db, &config, interval, None).await
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::*;

    #[test]
    fn test_intervals_follow_config() {
        let config = SimulationConfig {
            iot_interval_secs: 5,
            ..Default::default()
        };
        assert_eq!(Simulation::IotSensors.interval(&config), Duration::from_secs(5));
        assert_eq!(Simulation::Camera.interval(&config), Duration::from_secs(1800));
        let job = Simulation::WasteBins.job(Duration::from_secs(10), &config);
        assert_eq!(job.retry_after, Duration::from_secs(300));
        assert_eq!(job.name, "waste-bin-analysis");
    }

    #[tokio::test]
    async fn test_every_job_runs_once_on_empty_database() -> Result<()> {
        let db = setup_test_db().await?;
        let config = SimulationConfig::default();
        for simulation in Simulation::ALL {
            let summary = simulation
                .run(&db, &config, simulation.interval(&config), Some(1))
                .await;
            assert_eq!(summary, RunSummary { succeeded: 1, failed: 0 });
        }
        Ok(())
    }
}
