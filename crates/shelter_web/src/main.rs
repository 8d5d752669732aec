//! Dashboard server entry point.
//!
//! # Responsibility
//! - Resolve configuration, start logging and open the store.
//! - Serve the dashboard until Ctrl-C, then release the store connection.
//!
//! # Invariants
//! - A store that cannot be opened is fatal: logged, exit code 1.

use log::{error, info, warn};
use shelter_core::{init_logging, AnimalShelter, Dashboard, ShelterConfig};
use std::process::ExitCode;
use std::sync::{Arc, Mutex};

#[tokio::main]
async fn main() -> ExitCode {
    let config = match ShelterConfig::from_env() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("shelter_dashboard: {err}");
            return ExitCode::FAILURE;
        }
    };
    if let Err(err) = init_logging(&config.log_level, config.log_dir.as_deref()) {
        eprintln!("shelter_dashboard: {err}");
        return ExitCode::FAILURE;
    }

    let repo = match AnimalShelter::open(&config.store) {
        Ok(repo) => repo,
        Err(err) => {
            error!(
                "event=dashboard_start module=web status=error path={} error={err}",
                config.store.database_path().display()
            );
            eprintln!("shelter_dashboard: cannot open store: {err}");
            return ExitCode::FAILURE;
        }
    };
    let dashboard = match Dashboard::load(repo, config.patch_policy) {
        Ok(dashboard) => Arc::new(Mutex::new(dashboard)),
        Err(err) => {
            error!("event=dashboard_start module=web status=error error={err}");
            return ExitCode::FAILURE;
        }
    };

    println!("Dashboard listening on http://{}", config.http_addr);
    let served = shelter_web::serve(dashboard.clone(), &config.http_addr, shutdown_signal()).await;

    match dashboard.lock() {
        Ok(mut dashboard) => dashboard.close(),
        Err(_) => warn!("event=dashboard_stop module=web status=error reason=poisoned"),
    }

    match served {
        Ok(()) => {
            info!("event=dashboard_stop module=web status=ok");
            ExitCode::SUCCESS
        }
        Err(err) => {
            error!("event=dashboard_stop module=web status=error error={err}");
            eprintln!("shelter_dashboard: {err}");
            ExitCode::FAILURE
        }
    }
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!("event=shutdown_signal module=web status=error error={err}");
        std::future::pending::<()>().await;
    }
    info!("event=shutdown_signal module=web status=ok");
}
