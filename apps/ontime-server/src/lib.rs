pub mod config;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod osc;
pub mod persistence;
pub mod routes;

use std::sync::Arc;

use axum::{error_handling::HandleErrorLayer, Router};
use show_control::Dispatcher;
use tokio::sync::watch;
use tower::{timeout::TimeoutLayer, BoxError, ServiceBuilder};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing_subscriber::{filter::EnvFilter, fmt::format::JsonFields, util::SubscriberInitExt, Layer};

pub use config::Config;
pub use error::ServerError;

#[derive(Clone)]
pub struct AppState {
	pub dispatcher: Dispatcher,
	pub config: Arc<Config>,
	pub osc: Arc<watch::Sender<osc::OscSettings>>,
}

impl AppState {
	/// OSC settings start from the config and may change later through the API
	pub fn new(dispatcher: Dispatcher, config: Arc<Config>) -> Self {
		let (osc, _) = watch::channel(osc::OscSettings::from_config(&config));
		Self {
			dispatcher,
			config,
			osc: Arc::new(osc),
		}
	}

	pub fn osc_settings(&self) -> watch::Receiver<osc::OscSettings> {
		self.osc.subscribe()
	}
}

async fn handle_tower_error(error: BoxError) -> ServerError {
	if error.is::<tower::timeout::error::Elapsed>() {
		tracing::warn!("Request timeout: {}", error);
		ServerError::RequestTimeout
	} else {
		tracing::error!("Unhandled tower error: {}", error);
		ServerError::TowerError(error)
	}
}

/// The full HTTP surface with its layers
pub fn app(state: AppState) -> Router {
	let timeout = state.config.request_timeout();

	Router::new()
		.merge(routes::api::api_routes())
		.merge(routes::rundown::rundown_routes())
		.merge(routes::report::report_routes())
		.merge(routes::settings::settings_routes())
		.merge(routes::health::get_health())
		.with_state(state)
		.layer(
			ServiceBuilder::new()
				.layer(axum::middleware::from_fn(metrics::metrics_middleware))
				.layer(TraceLayer::new_for_http())
				.layer(HandleErrorLayer::new(handle_tower_error))
				.layer(TimeoutLayer::new(timeout))
				.layer(CorsLayer::permissive()),
		)
}

/// JSON or pretty output, filtered by `RUST_LOG` (default `info`)
pub fn init_tracing(config: &Config) -> anyhow::Result<()> {
	use tracing_subscriber::layer::SubscriberExt;

	let filter = config
		.rust_log
		.as_deref()
		.map_or_else(|| Ok(EnvFilter::new("info")), EnvFilter::try_new)?;

	tracing_subscriber::registry()
		.with(if config.log_json {
			Box::new(
				tracing_subscriber::fmt::layer()
					.fmt_fields(JsonFields::default())
					.event_format(tracing_subscriber::fmt::format().json().flatten_event(true).with_span_list(false))
					.with_filter(filter),
			) as Box<dyn Layer<_> + Send + Sync>
		} else {
			Box::new(
				tracing_subscriber::fmt::layer()
					.event_format(tracing_subscriber::fmt::format().pretty())
					.with_filter(filter),
			)
		})
		.try_init()?;
	Ok(())
}
