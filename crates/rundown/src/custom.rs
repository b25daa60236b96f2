use crate::error::{Result, RundownError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CustomField {
	pub label: String,
	#[serde(default)]
	pub colour: String,
}

/// Project-wide registry of custom field definitions, keyed by a stable identifier
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct CustomFields(BTreeMap<String, CustomField>);

impl CustomFields {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn get(&self, key: &str) -> Option<&CustomField> {
		self.0.get(key)
	}

	pub fn contains(&self, key: &str) -> bool {
		self.0.contains_key(key)
	}

	pub fn iter(&self) -> impl Iterator<Item = (&String, &CustomField)> {
		self.0.iter()
	}

	pub fn len(&self) -> usize {
		self.0.len()
	}

	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}

	/// Register a field, deriving its key from the label
	pub fn add(&mut self, field: CustomField) -> Result<String> {
		let key = key_from_label(&field.label)?;
		if self.0.contains_key(&key) {
			return Err(RundownError::DuplicateId(key));
		}
		self.0.insert(key.clone(), field);
		Ok(key)
	}

	/// Replace the definition under an existing key; the key itself never changes
	pub fn edit(&mut self, key: &str, field: CustomField) -> Result<()> {
		let slot = self.0.get_mut(key).ok_or_else(|| RundownError::NotFound(key.to_string()))?;
		*slot = field;
		Ok(())
	}

	/// Values stored under a removed key stay on the entries and become inert
	pub fn remove(&mut self, key: &str) -> Result<CustomField> {
		self.0.remove(key).ok_or_else(|| RundownError::NotFound(key.to_string()))
	}
}

fn key_from_label(label: &str) -> Result<String> {
	let key: String = label
		.trim()
		.chars()
		.map(|c| if c.is_alphanumeric() { c.to_ascii_lowercase() } else { '_' })
		.collect();
	if key.is_empty() || key.chars().all(|c| c == '_') {
		return Err(RundownError::invalid_field("label", "must contain a letter or digit"));
	}
	Ok(key)
}
