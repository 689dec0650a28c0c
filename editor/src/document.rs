use crate::error::EditorError;
use crate::history::UndoHistory;
use crate::observer::{DocumentChange, DocumentObserver};
use crate::preferences::Preferences;
use crate::recovery::RecoverySession;
use crate::transaction::{Modification, Transaction};

use celwork_document::uuid::generate_uuid;
use celwork_document::{FrameIndex, LayerId, Sprite};
use serde::{Deserialize, Serialize};
use std::fmt;

#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DocumentId(pub u64);

impl DocumentId {
	pub fn new() -> Self {
		Self(generate_uuid())
	}
}

impl Default for DocumentId {
	fn default() -> Self {
		Self::new()
	}
}

impl fmt::Display for DocumentId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.0)
	}
}

/// What observers and the recovery session know about a document besides its sprite.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentInfo {
	pub id: DocumentId,
	pub filename: String,
}

/// Where the user is editing: the active layer and frame.
///
/// Every transaction records the site it was opened at and the site it was committed at. Undo and rollback return
/// to the former, redo to the latter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Site {
	pub layer: Option<LayerId>,
	pub frame: FrameIndex,
}

/// An open sprite together with its undo history, edit site and change observers.
pub struct Document {
	info: DocumentInfo,
	pub(crate) sprite: Sprite,
	pub(crate) history: UndoHistory,
	pub(crate) site: Site,
	observers: Vec<Box<dyn DocumentObserver>>,
	preferences: Preferences,
}

impl fmt::Debug for Document {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Document")
			.field("info", &self.info)
			.field("sprite", &self.sprite)
			.field("history", &self.history)
			.field("site", &self.site)
			.field("observers", &self.observers.len())
			.finish_non_exhaustive()
	}
}

impl Document {
	/// Wraps a sprite handed over by a codec or built by hand. The sprite is validated first.
	pub fn new(sprite: Sprite) -> Result<Self, EditorError> {
		Self::with_preferences(sprite, Preferences::default())
	}

	/// Like [new](Self::new), and when data recovery is enabled with a recovery directory, backs the document up there
	/// after every change.
	pub fn with_preferences(sprite: Sprite, preferences: Preferences) -> Result<Self, EditorError> {
		sprite.validate()?;

		let site = Site {
			layer: sprite.layers_in_stack_order().into_iter().rev().find(|&id| sprite.layer(id).is_ok_and(|layer| layer.is_image())),
			frame: 0,
		};
		let info = DocumentInfo {
			id: DocumentId::new(),
			filename: String::new(),
		};
		log::debug!("Opened document {} with {} layers and {} frames", info.id, sprite.layer_count(), sprite.frame_count());

		let mut document = Self {
			info,
			sprite,
			history: UndoHistory::new(preferences.max_undo_history_len),
			site,
			observers: Vec::new(),
			preferences,
		};
		document.attach_recovery_session();
		Ok(document)
	}

	fn attach_recovery_session(&mut self) {
		if !self.preferences.data_recovery {
			return;
		}
		let Some(directory) = self.preferences.recovery_directory.clone() else { return };

		let mut session = RecoverySession::new(directory);
		if session.pid().is_none()
			&& let Err(error) = session.create(std::process::id())
		{
			log::warn!("Data recovery is off for document {}: {error}", self.info.id);
			return;
		}
		self.add_observer(session);
	}

	pub fn with_filename(mut self, filename: impl Into<String>) -> Self {
		self.info.filename = filename.into();
		self
	}

	pub fn id(&self) -> DocumentId {
		self.info.id
	}

	pub fn info(&self) -> &DocumentInfo {
		&self.info
	}

	pub fn filename(&self) -> &str {
		&self.info.filename
	}

	pub fn set_filename(&mut self, filename: impl Into<String>) {
		self.info.filename = filename.into();
	}

	pub fn sprite(&self) -> &Sprite {
		&self.sprite
	}

	pub fn history(&self) -> &UndoHistory {
		&self.history
	}

	pub fn site(&self) -> Site {
		self.site
	}

	pub fn set_site(&mut self, site: Site) {
		self.site = site;
	}

	pub fn preferences(&self) -> &Preferences {
		&self.preferences
	}

	/// Applies the history limit right away. Data recovery settings only affect documents opened afterwards.
	pub fn set_preferences(&mut self, preferences: Preferences) {
		self.history.set_max_len(preferences.max_undo_history_len);
		self.preferences = preferences;
	}

	/// Opens a transaction. It holds the document until it is committed, rolled back or dropped.
	pub fn begin_transaction(&mut self, label: impl Into<String>, modification: Modification) -> Transaction<'_> {
		Transaction::new(self, label.into(), modification)
	}

	pub fn can_undo(&self) -> bool {
		self.history.can_undo()
	}

	pub fn can_redo(&self) -> bool {
		self.history.can_redo()
	}

	pub fn undo(&mut self) -> Result<(), EditorError> {
		let entry = self.history.undo(&mut self.sprite)?;
		let (label, site, modifies) = (entry.label().to_string(), entry.site_before(), entry.modifies_document());
		log::debug!("Undid \"{label}\"");

		self.site = site;
		if modifies {
			self.notify(DocumentChange::Undone { label });
		}
		Ok(())
	}

	pub fn redo(&mut self) -> Result<(), EditorError> {
		let entry = self.history.redo(&mut self.sprite)?;
		let (label, site, modifies) = (entry.label().to_string(), entry.site_after(), entry.modifies_document());
		log::debug!("Redid \"{label}\"");

		self.site = site;
		if modifies {
			self.notify(DocumentChange::Redone { label });
		}
		Ok(())
	}

	/// Whether the sprite differs from its last saved state.
	pub fn is_dirty(&self) -> bool {
		!self.history.is_saved()
	}

	pub fn mark_as_saved(&mut self) {
		self.history.mark_saved();
	}

	pub fn add_observer(&mut self, observer: impl DocumentObserver + 'static) {
		self.observers.push(Box::new(observer));
	}

	pub(crate) fn notify(&mut self, change: DocumentChange) {
		for observer in &mut self.observers {
			if let Err(error) = observer.on_document_changed(&self.info, &self.sprite, &change) {
				log::warn!("Observer of document {} failed to handle \"{}\": {error}", self.info.id, change.label());
			}
		}
	}
}
