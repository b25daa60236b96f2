use anyhow::Result;
use clap::Parser;
use ontime_server::{app, init_tracing, osc, persistence, AppState, Config};
use rundown::{CustomFields, ProjectData, Rundown};
use show_control::{LogOrigin, ShowControl, ShowState, SystemClock};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

async fn load_show(config: &Config) -> Result<ShowState> {
	let clock = Arc::new(SystemClock::new());
	let file = match &config.project_file {
		Some(path) => persistence::load_project(path).await?,
		None => None,
	};
	let show = match file {
		Some(file) => ShowState::from_project(file, clock)?,
		None => ShowState::new(ProjectData::default(), Rundown::new(), CustomFields::new(), clock),
	};
	Ok(show)
}

#[tokio::main]
async fn main() -> Result<()> {
	dotenv::dotenv().ok();
	let config = Config::parse();
	init_tracing(&config)?;

	let config = Arc::new(config);
	let shutdown_token = CancellationToken::new();

	// a rejected project file aborts startup here
	let show = load_show(&config).await?;
	let engine_config = config.engine_config();

	let (snapshot_tx, writer) = match &config.project_file {
		Some(path) => {
			let (tx, rx) = mpsc::channel(engine_config.snapshot_capacity.max(1));
			(Some(tx), Some(persistence::spawn_writer(path.clone(), rx)))
		}
		None => (None, None),
	};

	let control = ShowControl::spawn(show, engine_config, snapshot_tx, &shutdown_token);
	let dispatcher = control.dispatcher();

	let state = AppState::new(dispatcher.clone(), config.clone());
	let osc_task = tokio::spawn(osc::supervise(config.host.clone(), dispatcher, state.osc_settings(), shutdown_token.clone()));

	let app = app(state);
	let listener = TcpListener::bind((config.host.as_str(), config.port)).await?;
	tracing::info!(origin = %LogOrigin::Server, "listening on {}", listener.local_addr()?);

	// Spawn signal handler task with proper shutdown coordination
	let signal_shutdown_token = shutdown_token.clone();
	tokio::spawn(async move {
		tokio::signal::ctrl_c().await.ok();
		tracing::info!("Received Ctrl+C, initiating shutdown...");
		signal_shutdown_token.cancel();
	});

	// Run server with graceful shutdown
	let server_token = shutdown_token.clone();
	axum::serve(listener, app)
		.with_graceful_shutdown(async move {
			server_token.cancelled().await;
		})
		.await?;
	tracing::info!("Server stopped");

	let cleanup = async {
		osc_task.await.ok();
		control.shutdown().await;
		tracing::info!("Show engine stopped");

		// the actor held the last snapshot sender, so the writer drains and exits
		if let Some(writer) = writer {
			writer.await.ok();
			tracing::info!("Project saved");
		}
	};

	match tokio::time::timeout(config.shutdown_timeout(), cleanup).await {
		Ok(()) => tracing::info!("Graceful shutdown completed"),
		Err(_) => tracing::error!("Shutdown timeout - forcing exit"),
	}

	tracing::info!("Shutdown complete");
	Ok(())
}
