use crate::custom::CustomFields;
use crate::entry::Entry;
use crate::error::{Result, RundownError};
use crate::store::Rundown;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct ProjectData {
	pub title: String,
	pub description: String,
}

/// On-disk shape of a show
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct ProjectFile {
	pub project: ProjectData,
	pub rundown: Vec<Entry>,
	pub custom_fields: CustomFields,
}

impl ProjectFile {
	pub fn from_json(json: &str) -> Result<Self> {
		Ok(serde_json::from_str(json)?)
	}

	pub fn to_json_pretty(&self) -> Result<String> {
		Ok(serde_json::to_string_pretty(self)?)
	}

	pub fn from_parts(project: ProjectData, rundown: &Rundown, custom_fields: CustomFields) -> Self {
		Self {
			project,
			rundown: rundown.entries().to_vec(),
			custom_fields,
		}
	}

	/// Validate and split the file; a rundown breaking the data model never gets built
	pub fn into_parts(self) -> Result<(ProjectData, Rundown, CustomFields)> {
		let rundown = Rundown::from_entries(self.rundown).map_err(|e| RundownError::InvalidProject(e.to_string()))?;
		Ok((self.project, rundown, self.custom_fields))
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn reads_camel_case_project() {
		let json = r##"{
			"project": { "title": "Gala" },
			"rundown": [
				{ "type": "event", "id": "a", "cue": "1", "timeStart": 0, "timeEnd": 60000, "duration": 60000 },
				{ "type": "delay", "id": "d", "duration": 5000 },
				{ "type": "block", "id": "b", "title": "Act 2" },
				{ "type": "event", "id": "c", "timeStrategy": "link-start", "linkStart": "a", "duration": 30000, "endAction": "load-next" }
			],
			"customFields": { "camera": { "label": "Camera", "colour": "#00f" } }
		}"##;
		let (project, rundown, fields) = ProjectFile::from_json(json).unwrap().into_parts().unwrap();
		assert_eq!(project.title, "Gala");
		assert_eq!(rundown.len(), 4);
		assert_eq!(rundown.get_event("c").unwrap().link_start.as_deref(), Some("a"));
		assert!(fields.contains("camera"));
	}

	#[test]
	fn rejects_forward_link_before_building() {
		let json = r#"{ "rundown": [
			{ "type": "event", "id": "a", "timeStrategy": "link-start", "linkStart": "b" },
			{ "type": "event", "id": "b" }
		] }"#;
		let result = ProjectFile::from_json(json).unwrap().into_parts();
		assert!(matches!(result, Err(RundownError::InvalidProject(_))));
	}

	#[test]
	fn unknown_entry_type_fails_to_parse() {
		let json = r#"{ "rundown": [ { "type": "sticker", "id": "x" } ] }"#;
		assert!(matches!(ProjectFile::from_json(json), Err(RundownError::Serialization(_))));
	}
}
