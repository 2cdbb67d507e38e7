#![allow(clippy::result_large_err)]

use clap::{Parser, Subcommand};
use dotenvy::dotenv;
use sea_orm::DatabaseConnection;
use smartcity_monitor::api::{self, AppState};
use smartcity_monitor::config::app::{AppConfig, load_config_or_default};
use smartcity_monitor::config::{database, seed};
use smartcity_monitor::core::{auth, iot};
use smartcity_monitor::errors::Result;
use smartcity_monitor::simulation::{self, Simulation, camera, iot_sensors, waste_bins};
use std::path::PathBuf;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

/// Smart city monitoring backend
#[derive(Debug, Parser)]
#[command(version, about)]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(long, default_value = "config.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the HTTP API (and the simulation jobs unless disabled)
    Serve,
    /// Create the regions, districts and organizations from the config file
    Seed {
        /// Also add the Farg'ona demo dataset
        #[arg(long)]
        demo: bool,
    },
    /// Create an administrative user
    CreateAdmin {
        #[arg(long)]
        username: String,
        #[arg(long)]
        password: String,
        /// Grant unrestricted access to every organization
        #[arg(long)]
        superuser: bool,
    },
    /// Give every room and boiler without a device a new IoT device
    AssociateIotDevices,
    /// Simulate waste-bin fill analysis
    AnalyzeBins {
        /// One pass instead of a periodic loop
        #[arg(long)]
        run_once: bool,
    },
    /// Simulate camera screenshots of waste bins
    SimulateCamera {
        /// One pass instead of a periodic loop
        #[arg(long)]
        run_once: bool,
    },
    /// Simulate IoT temperature and humidity readings
    SimulateIot {
        /// One pass instead of a periodic loop
        #[arg(long)]
        run_once: bool,
        /// Seconds between passes, overriding the config file
        #[arg(long)]
        interval: Option<u64>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Initialize tracing (as early as possible)
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // 2. Load .env file; DATABASE_URL and RUST_LOG may also be set externally
    dotenv().ok();

    let cli = Cli::parse();

    // 3. Load the application configuration
    let config = load_config_or_default(&cli.config)
        .inspect_err(|e| error!("Failed to load configuration: {}", e))?;

    // 4. Connect and make sure the schema exists
    let db = database::create_connection()
        .await
        .inspect_err(|e| error!("Failed to connect to database: {}", e))?;
    database::create_tables(&db)
        .await
        .inspect(|()| info!("Database initialized successfully."))
        .inspect_err(|e| error!("Failed to create tables: {}", e))?;

    match cli.command {
        Command::Serve => serve(db, config).await,
        Command::Seed { demo } => {
            let report = seed::seed_from_config(&db, &config).await?;
            info!(?report, "Configuration seeded");
            if demo {
                let report = seed::seed_demo(&db).await?;
                info!(?report, "Demo data seeded");
            }
            Ok(())
        }
        Command::CreateAdmin {
            username,
            password,
            superuser,
        } => {
            let (user, created) = auth::create_admin(&db, &username, &password, superuser).await?;
            if created {
                info!(username = %user.username, id = %user.id, "Admin user created");
            } else {
                warn!(username = %user.username, "Admin user already exists, nothing changed");
            }
            Ok(())
        }
        Command::AssociateIotDevices => {
            let provisioned = iot::associate_devices(&db).await?;
            info!(
                rooms = provisioned.rooms,
                boilers = provisioned.boilers,
                "IoT devices associated"
            );
            Ok(())
        }
        Command::AnalyzeBins { run_once } => {
            if run_once {
                let report = waste_bins::analyze_bins(&db).await?;
                info!(?report, "Waste bin analysis finished");
            } else {
                run_forever(&db, &config, Simulation::WasteBins, None).await;
            }
            Ok(())
        }
        Command::SimulateCamera { run_once } => {
            if run_once {
                let report = camera::capture_screenshots(&db).await?;
                info!(?report, "Camera screenshots captured");
            } else {
                run_forever(&db, &config, Simulation::Camera, None).await;
            }
            Ok(())
        }
        Command::SimulateIot { run_once, interval } => {
            if run_once {
                let report = iot_sensors::simulate_sensors(&db).await?;
                info!(?report, "IoT readings simulated");
            } else {
                let interval = interval.map(Duration::from_secs);
                run_forever(&db, &config, Simulation::IotSensors, interval).await;
            }
            Ok(())
        }
    }
}

async fn run_forever(
    db: &DatabaseConnection,
    config: &AppConfig,
    simulation: Simulation,
    interval: Option<Duration>,
) {
    let interval = interval.unwrap_or_else(|| simulation.interval(&config.simulation));
    tokio::select! {
        _ = simulation.run(db, &config.simulation, interval, None) => {}
        _ = tokio::signal::ctrl_c() => info!(job = simulation.name(), "Stopped"),
    }
}

async fn serve(db: DatabaseConnection, config: AppConfig) -> Result<()> {
    seed::seed_from_config(&db, &config)
        .await
        .inspect(|report| info!(?report, "Configured organizations seeded"))
        .inspect_err(|e| error!("Failed to seed configuration: {}", e))?;

    let jobs = if config.simulation.enabled {
        simulation::spawn_all(&db, &config.simulation)
    } else {
        info!("Simulation jobs disabled");
        Vec::new()
    };

    let listener = TcpListener::bind(&config.server.bind)
        .await
        .inspect_err(|e| error!("Failed to bind {}: {}", config.server.bind, e))?;
    info!(addr = %config.server.bind, "Listening");

    let app = api::router(AppState::new(db, config));
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    for job in jobs {
        job.abort();
    }
    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
