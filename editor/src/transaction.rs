use crate::command::Command;
use crate::document::{Document, Site};
use crate::error::EditorError;
use crate::history::HistoryEntry;
use crate::observer::DocumentChange;

use celwork_document::Sprite;
use serde::{Deserialize, Serialize};

/// Whether a transaction changes the document contents, which decides if it makes the document dirty and if
/// observers hear about it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Modification {
	#[default]
	ModifyDocument,
	NonModifying,
}

impl Modification {
	pub fn modifies_document(self) -> bool {
		self == Modification::ModifyDocument
	}
}

/// A run of commands applied to a [Document] as one unit.
///
/// The transaction borrows its document mutably for its whole life, so no other transaction can be opened against
/// the same document until it ends. It ends by being committed into the undo history or rolled back. Dropping an
/// open transaction rolls it back.
#[derive(Debug)]
pub struct Transaction<'a> {
	document: &'a mut Document,
	label: String,
	modification: Modification,
	commands: Vec<Box<dyn Command>>,
	site_before: Site,
	saved_counter: i64,
	open: bool,
}

impl<'a> Transaction<'a> {
	pub(crate) fn new(document: &'a mut Document, label: String, modification: Modification) -> Self {
		log::debug!("Opened transaction \"{label}\"");
		let site_before = document.site;
		let saved_counter = document.history.saved_counter();
		Self {
			document,
			label,
			modification,
			commands: Vec::new(),
			site_before,
			saved_counter,
			open: true,
		}
	}

	pub fn label(&self) -> &str {
		&self.label
	}

	pub fn modification(&self) -> Modification {
		self.modification
	}

	/// Number of commands executed so far.
	pub fn len(&self) -> usize {
		self.commands.len()
	}

	pub fn is_empty(&self) -> bool {
		self.commands.is_empty()
	}

	/// The sprite as left by the commands executed so far.
	pub fn sprite(&self) -> &Sprite {
		&self.document.sprite
	}

	pub fn site(&self) -> Site {
		self.document.site
	}

	/// Moves the edit site. The site at commit time is restored when the transaction is redone.
	pub fn set_site(&mut self, site: Site) {
		self.document.site = site;
	}

	/// Executes a command and records it. A command that fails is dropped and leaves the transaction as it was.
	pub fn execute(&mut self, command: impl Command + 'static) -> Result<(), EditorError> {
		self.execute_boxed(Box::new(command))
	}

	pub fn execute_boxed(&mut self, mut command: Box<dyn Command>) -> Result<(), EditorError> {
		if let Err(error) = command.execute(&mut self.document.sprite) {
			log::debug!("\"{}\" failed in transaction \"{}\": {error}", command.name(), self.label);
			return Err(error);
		}

		if let Err(error) = self.commands.try_reserve(1) {
			if let Err(undo_error) = command.undo(&mut self.document.sprite) {
				log::error!("Failed to undo \"{}\" that could not be recorded: {undo_error}", command.name());
			}
			return Err(EditorError::OperationFailed(format!("Cannot record \"{}\" in transaction \"{}\": {error}", command.name(), self.label)));
		}

		log::trace!("Executed \"{}\" in transaction \"{}\"", command.name(), self.label);
		self.commands.push(command);
		Ok(())
	}

	/// Records the transaction in the undo history. A transaction without commands leaves no history entry.
	pub fn commit(mut self) {
		self.open = false;
		let commands = std::mem::take(&mut self.commands);
		let label = std::mem::take(&mut self.label);
		if commands.is_empty() {
			log::debug!("Committed empty transaction \"{label}\"");
			return;
		}

		let command_count = commands.len();
		let entry = HistoryEntry::new(label.clone(), self.modification, self.saved_counter, commands, self.site_before, self.document.site);
		self.document.history.add(entry);
		log::debug!("Committed transaction \"{label}\" with {command_count} commands");

		if self.modification.modifies_document() {
			self.document.notify(DocumentChange::Committed { label });
		}
	}

	/// Undoes every executed command in reverse order and restores the edit site.
	///
	/// A command that fails to undo does not stop the others. The failures are reported together.
	pub fn rollback(mut self) -> Result<(), EditorError> {
		self.open = false;
		self.undo_commands()
	}

	fn undo_commands(&mut self) -> Result<(), EditorError> {
		let mut failures = Vec::new();
		for mut command in std::mem::take(&mut self.commands).into_iter().rev() {
			if let Err(error) = command.undo(&mut self.document.sprite) {
				failures.push(format!("{}: {error}", command.name()));
			}
		}
		self.document.site = self.site_before;
		debug_assert_eq!(self.document.history.saved_counter(), self.saved_counter);

		if !failures.is_empty() {
			return Err(EditorError::RollbackFailed { label: self.label.clone(), failures });
		}
		log::debug!("Rolled back transaction \"{}\"", self.label);
		Ok(())
	}
}

impl Drop for Transaction<'_> {
	fn drop(&mut self) {
		if !self.open {
			return;
		}
		log::debug!("Transaction \"{}\" was dropped without being committed", self.label);
		if let Err(error) = self.undo_commands() {
			log::error!("{error}");
		}
	}
}

#[cfg(test)]
mod test {
	use super::*;
	use crate::commands::{AddCel, AddFrame, RenameLayer, SetCelOpacity};
	use crate::test_utils::{FailingCommand, test_document};
	use celwork_document::{Cel, DocumentError, Image};
	use pretty_assertions::assert_eq;

	#[test]
	fn rollback_restores_the_sprite() {
		let (mut document, layer) = test_document();
		let before = document.sprite().snapshot();
		let site = document.site();
		let format = document.sprite().pixel_format();

		let mut transaction = document.begin_transaction("Draw", Modification::ModifyDocument);
		transaction.execute(AddFrame::new(1)).unwrap();
		transaction.execute(AddCel::new(layer, Cel::from_image(1, Image::new(format, 4, 4)))).unwrap();
		transaction.execute(SetCelOpacity::new(layer, 1, 7)).unwrap();
		transaction.set_site(Site { layer: Some(layer), frame: 1 });
		assert_eq!(transaction.len(), 3);
		transaction.rollback().unwrap();

		assert_eq!(document.sprite().snapshot(), before);
		assert_eq!(document.site(), site);
		assert!(!document.can_undo());
		assert!(!document.is_dirty());
	}

	#[test]
	fn failing_command_is_not_recorded() {
		let (mut document, layer) = test_document();

		let mut transaction = document.begin_transaction("Rename", Modification::ModifyDocument);
		transaction.execute(RenameLayer::new(layer, "Ink")).unwrap();
		let error = transaction.execute(SetCelOpacity::new(layer, 3, 7)).unwrap_err();
		assert_eq!(error, EditorError::PreconditionViolated(DocumentError::CelNotFound { layer, frame: 3 }));
		assert_eq!(transaction.len(), 1);
		transaction.commit();

		assert_eq!(document.sprite().layer(layer).unwrap().name(), "Ink");
		assert_eq!(document.history().labels(), ["Rename"]);
	}

	#[test]
	fn rollback_reports_every_failure() {
		let (mut document, layer) = test_document();

		let mut transaction = document.begin_transaction("Broken", Modification::ModifyDocument);
		transaction.execute(FailingCommand::on_undo()).unwrap();
		transaction.execute(RenameLayer::new(layer, "Ink")).unwrap();
		transaction.execute(FailingCommand::on_undo()).unwrap();

		let Err(EditorError::RollbackFailed { label, failures }) = transaction.rollback() else {
			panic!("expected the rollback to fail");
		};
		assert_eq!(label, "Broken");
		assert_eq!(failures.len(), 2);
		assert_eq!(document.sprite().layer(layer).unwrap().name(), "Layer 1");
	}

	#[test]
	fn dropping_an_open_transaction_rolls_it_back() {
		let (mut document, layer) = test_document();
		let mut transaction = document.begin_transaction("Rename", Modification::ModifyDocument);
		transaction.execute(RenameLayer::new(layer, "Ink")).unwrap();
		transaction.commit();
		let before = document.sprite().snapshot();

		{
			let mut transaction = document.begin_transaction("Abandoned", Modification::ModifyDocument);
			transaction.execute(RenameLayer::new(layer, "Lines")).unwrap();
			assert!(transaction.execute(FailingCommand::on_execute()).is_err());
			assert_eq!(transaction.sprite().layer(layer).unwrap().name(), "Lines");
		}

		assert_eq!(document.sprite().snapshot(), before);
		assert_eq!(document.history().labels(), ["Rename"]);
		assert!(document.can_undo());
		assert!(document.is_dirty());
	}

	#[test]
	fn committed_entries_remember_the_saved_counter_at_open() {
		let (mut document, layer) = test_document();
		for name in ["Ink", "Lines"] {
			let mut transaction = document.begin_transaction(name, Modification::ModifyDocument);
			transaction.execute(RenameLayer::new(layer, name)).unwrap();
			transaction.commit();
		}

		let counters: Vec<i64> = document.history().entries().map(HistoryEntry::saved_counter_at_open).collect();
		assert_eq!(counters, [0, 1]);
		assert_eq!(document.history().saved_counter(), 2);
	}

	#[test]
	fn empty_commit_leaves_no_entry() {
		let (mut document, _) = test_document();
		document.begin_transaction("Nothing", Modification::ModifyDocument).commit();
		assert!(document.history().is_empty());
		assert!(!document.is_dirty());
	}
}
