use rundown::{EntryId, ProjectFile};
use serde_json::Value;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::EngineConfig;
use crate::error::DispatchError;
use crate::origin::{LogOrigin, Origin};
use crate::playback::{PlaybackReport, PlaybackState};
use crate::registry::{Handler, Payload};
use crate::show::{RundownEdit, RundownView, ShowState};

pub(crate) type Reply = oneshot::Sender<Result<Value, DispatchError>>;

// ============================================================================
// Messages
// ============================================================================

pub(crate) enum ShowMessage {
	Command {
		name: String,
		handler: Handler,
		payload: Payload,
		origin: Origin,
		response: Reply,
	},
	Edit {
		edit: RundownEdit,
		response: Reply,
	},
	View {
		response: oneshot::Sender<RundownView>,
	},
	Snapshot {
		response: oneshot::Sender<ProjectFile>,
	},
	Report {
		response: oneshot::Sender<PlaybackReport>,
	},
	ClearReport {
		id: Option<EntryId>,
		response: oneshot::Sender<PlaybackReport>,
	},
}

/// Reply held back until the state it describes has been published
enum Response {
	Result(Reply, Result<Value, DispatchError>),
	View(oneshot::Sender<RundownView>, Box<RundownView>),
	Snapshot(oneshot::Sender<ProjectFile>, Box<ProjectFile>),
	Report(oneshot::Sender<PlaybackReport>, PlaybackReport),
}

impl Response {
	fn send(self) {
		// the requester may have given up; nothing to do then
		let _ = match self {
			Self::Result(tx, result) => tx.send(result).map_err(drop),
			Self::View(tx, view) => tx.send(*view).map_err(drop),
			Self::Snapshot(tx, file) => tx.send(*file).map_err(drop),
			Self::Report(tx, report) => tx.send(report).map_err(drop),
		};
	}
}

// ============================================================================
// ShowActor - sole owner of the show; every mutation runs here, one at a time
// ============================================================================

pub(crate) struct ShowActor {
	show: ShowState,
	config: EngineConfig,
	state_tx: watch::Sender<PlaybackState>,
	snapshot_tx: Option<mpsc::Sender<ProjectFile>>,
	snapshot_pending: bool,
}

impl ShowActor {
	pub(crate) fn new(show: ShowState, config: EngineConfig, state_tx: watch::Sender<PlaybackState>, snapshot_tx: Option<mpsc::Sender<ProjectFile>>) -> Self {
		Self {
			show,
			config,
			state_tx,
			snapshot_tx,
			snapshot_pending: false,
		}
	}

	pub(crate) async fn run(mut self, mut command_rx: mpsc::Receiver<ShowMessage>, cancel: CancellationToken) {
		let mut ticker = interval(self.config.tick_interval());
		ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

		info!(origin = %LogOrigin::Server, tick_ms = self.config.tick_interval_ms, "show engine started");

		loop {
			tokio::select! {
				_ = ticker.tick() => self.handle_tick(),

				Some(message) = command_rx.recv() => self.handle_message(message),

				() = cancel.cancelled() => {
					info!(origin = %LogOrigin::Server, "show engine cancelled");
					break;
				}
			}
		}

		// flush a snapshot the writer had no room for
		if self.snapshot_pending {
			self.emit_snapshot();
		}
	}

	fn handle_tick(&mut self) {
		if let Some(taken) = self.show.tick() {
			info!(origin = %LogOrigin::Playback, id = %taken.entry_id, action = %taken.action, "event finished");
		}
		if self.snapshot_pending {
			self.emit_snapshot();
		}
		self.publish();
	}

	fn handle_message(&mut self, message: ShowMessage) {
		let edits = self.show.edit_count();
		let response = self.apply(message);

		if self.show.edit_count() != edits {
			self.snapshot_pending = true;
			self.emit_snapshot();
		}
		self.publish();
		response.send();
	}

	fn apply(&mut self, message: ShowMessage) -> Response {
		match message {
			ShowMessage::Command {
				name,
				handler,
				payload,
				origin,
				response,
			} => {
				let result = handler(&mut self.show, payload, origin);
				match &result {
					Ok(_) => debug!(origin = %LogOrigin::User, command = %name, via = %origin, "command handled"),
					Err(e) if e.is_recoverable() => info!(origin = %LogOrigin::User, command = %name, via = %origin, error = %e, "command rejected"),
					Err(e) => warn!(origin = %LogOrigin::User, command = %name, via = %origin, error = %e, "command failed"),
				}
				Response::Result(response, result)
			}
			ShowMessage::Edit { edit, response } => {
				let name = edit.name();
				let result = self.show.edit(edit).map_err(DispatchError::from);
				if let Err(e) = &result {
					info!(origin = %LogOrigin::User, edit = name, error = %e, "edit rejected");
				}
				Response::Result(response, result)
			}
			ShowMessage::View { response } => Response::View(response, Box::new(self.show.view())),
			ShowMessage::Snapshot { response } => Response::Snapshot(response, Box::new(self.show.to_project_file())),
			ShowMessage::Report { response } => Response::Report(response, self.show.report().clone()),
			ShowMessage::ClearReport { id, response } => {
				self.show.clear_report(id.as_deref());
				debug!(origin = %LogOrigin::User, id = ?id, "report cleared");
				Response::Report(response, self.show.report().clone())
			}
		}
	}

	fn publish(&self) {
		self.state_tx.send_replace(self.show.playback().clone());
	}

	/// Hand the rundown to the persistence writer without waiting on it
	fn emit_snapshot(&mut self) {
		let Some(tx) = &self.snapshot_tx else {
			self.snapshot_pending = false;
			return;
		};
		match tx.try_send(self.show.to_project_file()) {
			Ok(()) => self.snapshot_pending = false,
			Err(TrySendError::Full(_)) => debug!("persistence busy, snapshot retried next tick"),
			Err(TrySendError::Closed(_)) => {
				warn!(origin = %LogOrigin::Server, "persistence writer gone, snapshots disabled");
				self.snapshot_tx = None;
				self.snapshot_pending = false;
			}
		}
	}
}
