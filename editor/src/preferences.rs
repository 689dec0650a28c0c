use crate::consts::MAX_UNDO_HISTORY_LEN;
use crate::error::EditorError;

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// User configuration of the editing session, stored as RON.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Preferences {
	/// Oldest undo entries are dropped past this many. `None` keeps every entry.
	pub max_undo_history_len: Option<usize>,
	/// Whether documents are written to the recovery directory after every change.
	pub data_recovery: bool,
	pub recovery_directory: Option<PathBuf>,
}

impl Default for Preferences {
	fn default() -> Self {
		Self {
			max_undo_history_len: Some(MAX_UNDO_HISTORY_LEN),
			data_recovery: true,
			recovery_directory: None,
		}
	}
}

impl Preferences {
	pub fn from_ron(data: &str) -> Result<Self, EditorError> {
		Ok(ron::from_str(data)?)
	}

	pub fn to_ron(&self) -> Result<String, EditorError> {
		Ok(ron::ser::to_string_pretty(self, Default::default())?)
	}

	/// Reads the preferences stored at `path`, falling back to the defaults when the file is missing or malformed.
	pub fn read(path: &Path) -> Self {
		let Ok(data) = std::fs::read_to_string(path) else {
			return Self::default();
		};
		match Self::from_ron(&data) {
			Ok(preferences) => preferences,
			Err(error) => {
				log::warn!("Ignoring malformed preferences at {}: {error}", path.display());
				Self::default()
			}
		}
	}

	pub fn write(&self, path: &Path) -> Result<(), EditorError> {
		let data = self.to_ron()?;
		std::fs::write(path, data)?;
		Ok(())
	}

	/// Reads, updates and writes back the preferences stored at `path`.
	pub fn modify(path: &Path, f: impl FnOnce(&mut Self)) -> Result<Self, EditorError> {
		let mut preferences = Self::read(path);
		f(&mut preferences);
		preferences.write(path)?;
		Ok(preferences)
	}
}
