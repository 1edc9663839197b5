// SPDX-FileCopyrightText: 2026 Tripcast Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `tripcast serve` command implementation.
//!
//! Opens the store, builds the dispatch pipeline over the configured
//! gateway, then runs the HTTP API and (when `retry.sweep_interval_secs`
//! is set) the background retry sweep until a shutdown signal arrives.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};
use tripcast_api::{ApiState, AuthConfig, HealthState, ServerConfig};
use tripcast_config::TripcastConfig;
use tripcast_core::TripcastError;
use tripcast_dispatch::RetrySweep;

use crate::app::App;
use crate::shutdown;

type RenderFn = Arc<dyn Fn() -> String + Send + Sync>;

/// Runs the `tripcast serve` command.
pub async fn run_serve(config: TripcastConfig) -> Result<(), TripcastError> {
    info!(
        name = config.service.name.as_str(),
        version = env!("CARGO_PKG_VERSION"),
        "starting tripcast"
    );

    let prometheus_render = init_prometheus(&config);

    let app = App::open(config).await?;
    let dispatcher = app.dispatcher()?;
    let retry = Arc::new(tripcast_dispatch::RetryCoordinator::new(dispatcher.clone()));
    let reporter = Arc::new(app.reporter()?);

    if app.config.api.bearer_token.is_none() {
        warn!("api.bearer_token is not set; every /v1 request will be rejected");
    }

    let cancel = shutdown::install_signal_handler();

    let sweep_task = match app.config.retry.sweep_interval_secs {
        0 => {
            debug!("background retry sweep disabled");
            None
        }
        secs => {
            let sweep = RetrySweep::new(retry.clone(), Duration::from_secs(secs));
            info!(interval_secs = secs, "background retry sweep enabled");
            Some(tokio::spawn(sweep.run(cancel.clone())))
        }
    };

    let state = ApiState {
        dispatcher,
        retry,
        reporter,
        health: HealthState {
            start_time: Instant::now(),
            storage: app.storage_adapter(),
            prometheus_render,
        },
    };
    let server_config = ServerConfig {
        host: app.config.api.host.clone(),
        port: app.config.api.port,
    };
    let auth = AuthConfig {
        bearer_token: app.config.api.bearer_token.clone(),
    };

    let served = tripcast_api::start_server(&server_config, state, auth, cancel.clone()).await;
    // A bind failure returns before any signal; stop the sweep too.
    cancel.cancel();

    if let Some(task) = sweep_task {
        if let Err(e) = task.await {
            warn!(error = %e, "retry sweep task ended abnormally");
        }
    }

    if let Err(e) = app.close().await {
        warn!(error = %e, "failed to close storage cleanly");
    }
    info!("tripcast stopped");
    served
}

/// Installs the Prometheus recorder when enabled and compiled in.
#[cfg(feature = "prometheus")]
fn init_prometheus(config: &TripcastConfig) -> Option<RenderFn> {
    if !config.prometheus.enabled {
        debug!("prometheus metrics disabled by configuration");
        return None;
    }
    match tripcast_prometheus::PrometheusAdapter::new() {
        Ok(adapter) => {
            info!("prometheus metrics enabled");
            let handle = adapter.handle().clone();
            Some(Arc::new(move || handle.render()) as RenderFn)
        }
        Err(e) => {
            warn!(error = %e, "prometheus initialization failed, continuing without metrics");
            None
        }
    }
}

#[cfg(not(feature = "prometheus"))]
fn init_prometheus(config: &TripcastConfig) -> Option<RenderFn> {
    if config.prometheus.enabled {
        warn!("prometheus.enabled is set but this build has no prometheus support");
    }
    None
}
