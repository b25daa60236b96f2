use std::sync::Arc;

use rundown::{CustomField, CustomFields, Entry, EntryId, EventPatch, ProjectData, ProjectFile, ResolvedRundown, ResolvedTiming, Rundown, TimeMs, TimeResolver};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info};

use crate::clock::Clock;
use crate::playback::{EndActionTaken, PlaybackEngine, PlaybackReport, PlaybackState};

/// Structural and content edits to the rundown, applied inside the show actor
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "camelCase")]
pub enum RundownEdit {
	Insert {
		entry: Entry,
		#[serde(default)]
		after: Option<EntryId>,
	},
	Patch {
		id: EntryId,
		patch: EventPatch,
	},
	SetDelay {
		id: EntryId,
		duration: TimeMs,
	},
	Remove {
		ids: Vec<EntryId>,
	},
	Clear,
	Reorder {
		id: EntryId,
		from: usize,
		to: usize,
	},
	Swap {
		a: EntryId,
		b: EntryId,
	},
	ApplyDelay {
		id: EntryId,
	},
	/// Swap in a whole project; playback stops
	Replace {
		project: ProjectFile,
	},
	AddCustomField {
		field: CustomField,
	},
	EditCustomField {
		key: String,
		field: CustomField,
	},
	RemoveCustomField {
		key: String,
	},
}

impl RundownEdit {
	pub const fn name(&self) -> &'static str {
		match self {
			Self::Insert { .. } => "insert",
			Self::Patch { .. } => "patch",
			Self::SetDelay { .. } => "set-delay",
			Self::Remove { .. } => "remove",
			Self::Clear => "clear",
			Self::Reorder { .. } => "reorder",
			Self::Swap { .. } => "swap",
			Self::ApplyDelay { .. } => "apply-delay",
			Self::Replace { .. } => "replace",
			Self::AddCustomField { .. } => "add-custom-field",
			Self::EditCustomField { .. } => "edit-custom-field",
			Self::RemoveCustomField { .. } => "remove-custom-field",
		}
	}
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimedEntry {
	pub id: EntryId,
	#[serde(flatten)]
	pub timing: ResolvedTiming,
}

/// Rundown together with its resolved schedule, as served to clients
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RundownView {
	pub version: u64,
	pub project: ProjectData,
	pub entries: Vec<Entry>,
	pub timings: Vec<TimedEntry>,
	pub first_start: Option<TimeMs>,
	pub last_end: Option<TimeMs>,
	pub total_duration: TimeMs,
	pub total_delay: TimeMs,
	pub custom_fields: CustomFields,
}

/// Everything a command may touch; owned by exactly one task at a time
#[derive(Debug)]
pub struct ShowState {
	project: ProjectData,
	rundown: Rundown,
	custom_fields: CustomFields,
	resolver: TimeResolver,
	engine: PlaybackEngine,
	clock: Arc<dyn Clock>,
	// successful edits, including whole-project replacements
	edits: u64,
}

impl ShowState {
	pub fn new(project: ProjectData, rundown: Rundown, custom_fields: CustomFields, clock: Arc<dyn Clock>) -> Self {
		Self {
			project,
			rundown,
			custom_fields,
			resolver: TimeResolver::new(),
			engine: PlaybackEngine::new(),
			clock,
			edits: 0,
		}
	}

	/// Validate a project file and build the show from it
	pub fn from_project(file: ProjectFile, clock: Arc<dyn Clock>) -> rundown::Result<Self> {
		let (project, rundown, custom_fields) = file.into_parts()?;
		Ok(Self::new(project, rundown, custom_fields, clock))
	}

	pub fn now(&self) -> TimeMs {
		self.clock.now()
	}

	pub const fn rundown(&self) -> &Rundown {
		&self.rundown
	}

	pub const fn project(&self) -> &ProjectData {
		&self.project
	}

	pub const fn custom_fields(&self) -> &CustomFields {
		&self.custom_fields
	}

	pub const fn engine(&self) -> &PlaybackEngine {
		&self.engine
	}

	/// Moves on every successful edit; unlike the rundown version it survives a replacement
	pub const fn edit_count(&self) -> u64 {
		self.edits
	}

	pub const fn playback(&self) -> &PlaybackState {
		self.engine.state()
	}

	pub const fn report(&self) -> &PlaybackReport {
		self.engine.report()
	}

	/// Drop one event's report, or all of them; not an edit, nothing is persisted
	pub fn clear_report(&mut self, id: Option<&str>) {
		self.engine.clear_report(id);
	}

	pub fn resolved(&mut self) -> Arc<ResolvedRundown> {
		self.resolver.resolved(&self.rundown)
	}

	/// Run a playback operation against the current schedule and clock
	pub fn with_playback<T>(&mut self, op: impl FnOnce(&mut PlaybackEngine, &Rundown, &ResolvedRundown, TimeMs) -> T) -> T {
		let resolved = self.resolver.resolved(&self.rundown);
		let now = self.clock.now();
		op(&mut self.engine, &self.rundown, &resolved, now)
	}

	pub fn tick(&mut self) -> Option<EndActionTaken> {
		self.with_playback(|engine, rundown, resolved, now| engine.tick(rundown, resolved, now))
	}

	/// Apply an edit; on success the schedule is re-resolved and the engine refreshed before returning
	pub fn edit(&mut self, edit: RundownEdit) -> rundown::Result<Value> {
		debug!(edit = edit.name(), "applying rundown edit");
		let reply = match edit {
			RundownEdit::Insert { entry, after } => serde_json::to_value(self.rundown.insert(entry, after.as_deref())?)?,
			RundownEdit::Patch { id, patch } => serde_json::to_value(self.rundown.patch_event(&id, patch)?)?,
			RundownEdit::SetDelay { id, duration } => {
				self.rundown.set_delay_duration(&id, duration)?;
				Value::Null
			}
			RundownEdit::Remove { ids } => {
				self.rundown.remove(&ids)?;
				Value::Null
			}
			RundownEdit::Clear => {
				self.rundown.clear();
				Value::Null
			}
			RundownEdit::Reorder { id, from, to } => {
				self.rundown.reorder(&id, from, to)?;
				Value::Null
			}
			RundownEdit::Swap { a, b } => {
				self.rundown.swap(&a, &b)?;
				Value::Null
			}
			RundownEdit::ApplyDelay { id } => {
				self.rundown.apply_delay(&id)?;
				Value::Null
			}
			RundownEdit::Replace { project } => {
				let (project, rundown, custom_fields) = project.into_parts()?;
				info!(title = %project.title, entries = rundown.len(), "replacing project");
				self.project = project;
				self.rundown = rundown;
				self.custom_fields = custom_fields;
				self.resolver.invalidate();
				self.engine = PlaybackEngine::new();
				Value::Null
			}
			RundownEdit::AddCustomField { field } => Value::String(self.custom_fields.add(field)?),
			RundownEdit::EditCustomField { key, field } => {
				self.custom_fields.edit(&key, field)?;
				Value::Null
			}
			RundownEdit::RemoveCustomField { key } => {
				self.custom_fields.remove(&key)?;
				Value::Null
			}
		};

		self.edits = self.edits.wrapping_add(1);
		self.with_playback(|engine, rundown, resolved, now| engine.on_rundown_changed(rundown, resolved, now));
		Ok(reply)
	}

	pub fn to_project_file(&self) -> ProjectFile {
		ProjectFile::from_parts(self.project.clone(), &self.rundown, self.custom_fields.clone())
	}

	pub fn view(&mut self) -> RundownView {
		let resolved = self.resolved();
		RundownView {
			version: self.rundown.version(),
			project: self.project.clone(),
			entries: self.rundown.entries().to_vec(),
			timings: resolved.iter().map(|(id, timing)| TimedEntry { id: id.to_string(), timing: *timing }).collect(),
			first_start: resolved.first_start(),
			last_end: resolved.last_end(),
			total_duration: resolved.total_duration(),
			total_delay: resolved.total_delay(),
			custom_fields: self.custom_fields.clone(),
		}
	}
}
