use crate::document::DocumentInfo;
use crate::error::EditorError;

use celwork_document::Sprite;
use serde::{Deserialize, Serialize};

/// A change to a document's contents, named after the transaction that caused it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DocumentChange {
	Committed { label: String },
	Undone { label: String },
	Redone { label: String },
}

impl DocumentChange {
	pub fn label(&self) -> &str {
		match self {
			DocumentChange::Committed { label } | DocumentChange::Undone { label } | DocumentChange::Redone { label } => label,
		}
	}
}

/// Listens to the changes of a document. Only transactions that modify the document are reported.
///
/// A failing observer does not affect the change it was told about; its error is logged and the remaining observers
/// are still notified.
pub trait DocumentObserver: Send {
	fn on_document_changed(&mut self, document: &DocumentInfo, sprite: &Sprite, change: &DocumentChange) -> Result<(), EditorError>;
}

impl<F> DocumentObserver for F
where
	F: FnMut(&DocumentInfo, &Sprite, &DocumentChange) -> Result<(), EditorError> + Send,
{
	fn on_document_changed(&mut self, document: &DocumentInfo, sprite: &Sprite, change: &DocumentChange) -> Result<(), EditorError> {
		self(document, sprite, change)
	}
}
