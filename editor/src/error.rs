use celwork_document::DocumentError;

use thiserror::Error;

/// The error type used by the Celwork editor.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum EditorError {
	#[error("The operation violated a precondition of the sprite:\n{0}")]
	PreconditionViolated(#[from] DocumentError),

	#[error("Failed to execute operation:\n{0}")]
	OperationFailed(String),

	#[error("There is nothing to undo")]
	NothingToUndo,

	#[error("There is nothing to redo")]
	NothingToRedo,

	#[error("Rolling back \"{label}\" left {} commands in an inconsistent state:\n{}", .failures.len(), .failures.join("\n"))]
	RollbackFailed { label: String, failures: Vec<String> },

	#[error("The command has not been executed")]
	NotExecuted,

	#[error("Failed to access the file system:\n{0}")]
	Io(String),

	#[error("Failed to (de)serialize data:\n{0}")]
	Serialization(String),

	#[error("Failed to read or write the preferences:\n{0}")]
	Preferences(String),
}

macro_rules! derive_from {
	($type:ty, $kind:ident) => {
		impl From<$type> for EditorError {
			fn from(error: $type) -> Self {
				EditorError::$kind(format!("{error}"))
			}
		}
	};
}

derive_from!(std::io::Error, Io);
derive_from!(serde_json::Error, Serialization);
derive_from!(ron::Error, Preferences);
derive_from!(ron::error::SpannedError, Preferences);
