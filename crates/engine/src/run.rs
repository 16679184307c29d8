// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Top-level process wiring: CLI surface, tracing init, and the prepare/run
//! split so integration tests can drive a fully-wired engine without going
//! through `main`.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use crate::config::ConfigManager;
use crate::handler::RequestHandler;
use crate::orchestrator::{LoggingPublishSink, Orchestrator};
use crate::registry::Registry;
use crate::support::{PeriodicLogThrottler, RealUuidGen, TimerWheel};
use crate::transport::{json_gateway, EngineClient, NativeServer, Transport};

#[derive(Parser, Clone, Debug)]
#[command(name = "lom-engined", version, about = "Device-health remediation engine.")]
pub struct Config {
    /// Directory holding globals.conf.json, actions.conf.json, bindings.conf.json.
    #[arg(long, env = "LOM_CONFIG_DIR", default_value = "/etc/lom")]
    pub config_dir: PathBuf,

    /// Host the JSON gateway binds to.
    #[arg(long, env = "LOM_HOST", default_value = "127.0.0.1")]
    pub host: String,

    /// Port the JSON gateway binds to.
    #[arg(long, env = "LOM_PORT", default_value = "5555")]
    pub port: u16,

    #[arg(long, env = "LOM_LOG_FORMAT", default_value = "json")]
    pub log_format: String,

    #[arg(long, env = "LOM_LOG_LEVEL", default_value = "info")]
    pub log_level: String,
}

impl Config {
    fn globals_path(&self) -> PathBuf {
        self.config_dir.join("globals.conf.json")
    }
    fn actions_path(&self) -> PathBuf {
        self.config_dir.join("actions.conf.json")
    }
    fn bindings_path(&self) -> PathBuf {
        self.config_dir.join("bindings.conf.json")
    }
}

/// Initialize tracing/logging from config. Uses `try_init` so it's safe to
/// call multiple times (e.g. from tests).
pub fn init_tracing(config: &Config) {
    use tracing_subscriber::fmt;

    let filter = if std::env::var("LOM_LOG_LEVEL").is_err() && config.log_level == "info" {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level))
    } else {
        EnvFilter::try_new(&config.log_level).unwrap_or_else(|_| EnvFilter::new("info"))
    };

    let result = match config.log_format.as_str() {
        "json" => fmt::fmt().with_env_filter(filter).json().try_init(),
        _ => fmt::fmt().with_env_filter(filter).try_init(),
    };
    drop(result);
}

/// A fully-wired engine, bound and ready to serve, before the caller hands
/// control to [`PreparedEngine::run`].
pub struct PreparedEngine {
    pub shutdown: CancellationToken,
    pub native: Arc<dyn Transport>,
    listener: TcpListener,
    handler_task: tokio::task::JoinHandle<()>,
    /// Kept alive only so the periodic-log worker's channel stays open; the
    /// engine doesn't submit entries to it directly today.
    _periodic: PeriodicLogThrottler,
}

impl PreparedEngine {
    /// In-process client bound to the native transport, for callers that
    /// want to talk to this engine without a network hop (tests, same-binary
    /// plugins).
    pub fn client(&self, client_name: impl Into<String>) -> EngineClient {
        EngineClient::new(client_name, self.native.clone())
    }

    /// Serves the JSON gateway until `shutdown` is cancelled, then waits for
    /// the request-handler worker to drain.
    pub async fn run(self) -> anyhow::Result<()> {
        let router = json_gateway::router(self.native.clone());
        let shutdown = self.shutdown.clone();
        let result = axum::serve(self.listener, router)
            .with_graceful_shutdown(shutdown.cancelled_owned())
            .await;
        if let Err(e) = result {
            error!("json gateway server error: {e}");
        }
        let _ = self.handler_task.await;
        Ok(())
    }
}

/// Load config, wire every component, and bind the JSON gateway's listener,
/// but don't start serving yet — mirrors the teacher's prepare/run split so
/// callers can inspect the engine (or bind `client()`) before it runs.
pub async fn prepare(config: Config) -> anyhow::Result<PreparedEngine> {
    init_tracing(&config);

    let config_manager = Arc::new(ConfigManager::load(
        &config.globals_path(),
        &config.actions_path(),
        &config.bindings_path(),
    )?);

    let shutdown = CancellationToken::new();

    let min_period =
        Duration::from_secs(config_manager.globals().get_int("MIN_PERIODIC_LOG_PERIOD_SECS").max(0) as u64);
    let periodic = PeriodicLogThrottler::spawn(min_period, shutdown.clone());

    let timers = TimerWheel::spawn();
    let (timer_tx, timer_rx) = mpsc::unbounded_channel();
    let uuid_gen: Arc<dyn crate::support::UuidGen> = Arc::new(RealUuidGen::default());

    let registry = Registry::new(config_manager.clone());
    let orchestrator = Orchestrator::new(
        config_manager.clone(),
        uuid_gen.clone(),
        Arc::new(LoggingPublishSink),
        timers,
        timer_tx,
    );

    let handler = RequestHandler::new(registry, orchestrator, uuid_gen);
    let (inbox_tx, inbox_rx) = mpsc::channel(256);
    let handler_shutdown = shutdown.clone();
    let handler_task = tokio::spawn(handler.run(inbox_rx, timer_rx, handler_shutdown));

    let native: Arc<dyn Transport> = Arc::new(NativeServer::new(inbox_tx));

    let addr = format!("{}:{}", config.host, config.port);
    let listener = TcpListener::bind(&addr).await?;
    info!("lom-engined listening on {addr}");

    spawn_signal_handler(shutdown.clone());

    Ok(PreparedEngine { shutdown, native, listener, handler_task, _periodic: periodic })
}

pub async fn run(config: Config) -> anyhow::Result<()> {
    prepare(config).await?.run().await
}

fn spawn_signal_handler(shutdown: CancellationToken) {
    tokio::spawn(async move {
        let mut sigterm = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()).ok();
        let mut sigint = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::interrupt()).ok();

        tokio::select! {
            _ = async {
                if let Some(ref mut s) = sigterm { s.recv().await } else { std::future::pending().await }
            } => {
                info!("received SIGTERM");
            }
            _ = async {
                if let Some(ref mut s) = sigint { s.recv().await } else { std::future::pending().await }
            } => {
                info!("received SIGINT");
            }
        }
        shutdown.cancel();

        tokio::select! {
            _ = async {
                if let Some(ref mut s) = sigterm { s.recv().await } else { std::future::pending().await }
            } => {
                info!("received SIGTERM again, forcing exit");
            }
            _ = async {
                if let Some(ref mut s) = sigint { s.recv().await } else { std::future::pending().await }
            } => {
                info!("received SIGINT again, forcing exit");
            }
        }
        std::process::exit(130);
    });
}

#[cfg(test)]
#[path = "run_tests.rs"]
mod tests;
