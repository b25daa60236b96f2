use std::sync::Arc;

use rundown::{EntryId, ProjectFile};
use serde::Serialize;
use serde_json::Value;
use tokio::sync::{mpsc, oneshot, watch, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::actor::{ShowActor, ShowMessage};
use crate::config::EngineConfig;
use crate::error::DispatchError;
use crate::origin::Origin;
use crate::playback::{PlaybackReport, PlaybackState};
use crate::registry::CommandRegistry;
use crate::show::{RundownEdit, RundownView, ShowState};

/// Outcome of a dispatch as reported back to a protocol adapter
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DispatchReply {
	pub payload: Value,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub error: Option<String>,
}

impl DispatchReply {
	pub const fn is_ok(&self) -> bool {
		self.error.is_none()
	}
}

impl From<Result<Value, DispatchError>> for DispatchReply {
	fn from(result: Result<Value, DispatchError>) -> Self {
		match result {
			Ok(payload) => Self { payload, error: None },
			Err(e) => Self {
				payload: Value::Null,
				error: Some(e.to_string()),
			},
		}
	}
}

/// Cloneable entry point for every adapter: looks commands up, then queues them for the show actor
#[derive(Debug, Clone)]
pub struct Dispatcher {
	command_tx: mpsc::Sender<ShowMessage>,
	registry: Arc<CommandRegistry>,
}

impl Dispatcher {
	/// Run a command; never fails, errors come back inside the reply
	pub async fn dispatch(&self, name: &str, payload: Value, origin: Origin) -> DispatchReply {
		self.try_dispatch(name, payload, origin).await.into()
	}

	pub async fn try_dispatch(&self, name: &str, payload: Value, origin: Origin) -> Result<Value, DispatchError> {
		let (handler, payload) = self.registry.prepare(name, payload)?;
		self
			.request(|response| ShowMessage::Command {
				name: name.to_string(),
				handler,
				payload,
				origin,
				response,
			})
			.await?
	}

	pub async fn edit(&self, edit: RundownEdit) -> Result<Value, DispatchError> {
		self.request(|response| ShowMessage::Edit { edit, response }).await?
	}

	pub async fn view(&self) -> Result<RundownView, DispatchError> {
		self.request(|response| ShowMessage::View { response }).await
	}

	pub async fn snapshot(&self) -> Result<ProjectFile, DispatchError> {
		self.request(|response| ShowMessage::Snapshot { response }).await
	}

	/// Actual start and end of every event played so far
	pub async fn report(&self) -> Result<PlaybackReport, DispatchError> {
		self.request(|response| ShowMessage::Report { response }).await
	}

	/// Clear one event's report, or the whole report with `None`; returns what is left
	pub async fn clear_report(&self, id: Option<EntryId>) -> Result<PlaybackReport, DispatchError> {
		self.request(|response| ShowMessage::ClearReport { id, response }).await
	}

	pub fn commands(&self) -> Vec<&'static str> {
		self.registry.names()
	}

	async fn request<T>(&self, message: impl FnOnce(oneshot::Sender<T>) -> ShowMessage) -> Result<T, DispatchError> {
		let (tx, rx) = oneshot::channel();
		self.command_tx.send(message(tx)).await.map_err(|_| DispatchError::Unavailable)?;
		rx.await.map_err(|_| DispatchError::Unavailable)
	}
}

/// The show actor façade
#[derive(Debug)]
pub struct ShowControl {
	dispatcher: Dispatcher,
	state_rx: watch::Receiver<PlaybackState>,
	task_handle: Arc<Mutex<Option<JoinHandle<()>>>>,
	cancel_token: CancellationToken,
}

impl ShowControl {
	/// Spawn the show actor with the built-in commands
	pub fn spawn(show: ShowState, config: EngineConfig, snapshot_tx: Option<mpsc::Sender<ProjectFile>>, cancel: &CancellationToken) -> Self {
		Self::spawn_with_registry(show, CommandRegistry::builtin(), config, snapshot_tx, cancel)
	}

	pub fn spawn_with_registry(
		show: ShowState,
		registry: CommandRegistry,
		config: EngineConfig,
		snapshot_tx: Option<mpsc::Sender<ProjectFile>>,
		cancel: &CancellationToken,
	) -> Self {
		let cancel_token = cancel.child_token();
		let (command_tx, command_rx) = mpsc::channel(config.command_capacity.max(1));
		let (state_tx, state_rx) = watch::channel(show.playback().clone());

		let actor = ShowActor::new(show, config, state_tx, snapshot_tx);
		let task_handle = tokio::spawn(actor.run(command_rx, cancel_token.clone()));

		info!(commands = registry.names().len(), "ShowControl created");

		Self {
			dispatcher: Dispatcher {
				command_tx,
				registry: Arc::new(registry),
			},
			state_rx,
			task_handle: Arc::new(Mutex::new(Some(task_handle))),
			cancel_token,
		}
	}

	pub fn dispatcher(&self) -> Dispatcher {
		self.dispatcher.clone()
	}

	// Access state
	pub fn subscribe(&self) -> watch::Receiver<PlaybackState> {
		self.state_rx.clone()
	}
	pub fn current_state(&self) -> PlaybackState {
		self.state_rx.borrow().clone()
	}

	/// Stop the actor and wait for it to flush its last snapshot
	pub async fn shutdown(&self) {
		self.cancel_token.cancel();
		if let Some(handle) = self.task_handle.lock().await.take() {
			let _ = handle.await;
		}
	}
}
