//! Show rundown model: ordered entries, the link-aware store and the time resolver.

pub mod custom;
pub mod entry;
pub mod error;
pub mod project;
pub mod resolver;
pub mod store;
pub mod types;

pub use custom::{CustomField, CustomFields};
pub use entry::{generate_id, Entry, EventPatch, OntimeBlock, OntimeDelay, OntimeEvent};
pub use error::{Result, RundownError};
pub use project::{ProjectData, ProjectFile};
pub use resolver::{resolve, ResolvedRundown, ResolvedTiming, TimeResolver};
pub use store::Rundown;
pub use types::{duration_between, hms, in_time_range, parse_time, wrap_end, EndAction, EntryId, TimeMs, TimeStrategy, TimerType, DAY_MS, HOUR_MS, MAX_CUE_LENGTH, MAX_TIME_MS, MINUTE_MS, SECOND_MS};
