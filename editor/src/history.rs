use crate::command::Command;
use crate::document::Site;
use crate::error::EditorError;
use crate::transaction::Modification;

use celwork_document::Sprite;
use std::collections::VecDeque;

/// A committed transaction: its commands in execution order and the edit sites around it.
#[derive(Debug)]
pub struct HistoryEntry {
	label: String,
	modification: Modification,
	saved_counter_at_open: i64,
	commands: Vec<Box<dyn Command>>,
	site_before: Site,
	site_after: Site,
}

impl HistoryEntry {
	pub(crate) fn new(label: String, modification: Modification, saved_counter_at_open: i64, commands: Vec<Box<dyn Command>>, site_before: Site, site_after: Site) -> Self {
		Self {
			label,
			modification,
			saved_counter_at_open,
			commands,
			site_before,
			site_after,
		}
	}

	pub fn label(&self) -> &str {
		&self.label
	}

	pub fn modification(&self) -> Modification {
		self.modification
	}

	pub fn modifies_document(&self) -> bool {
		self.modification.modifies_document()
	}

	/// The history's saved counter when the transaction behind this entry was opened.
	pub fn saved_counter_at_open(&self) -> i64 {
		self.saved_counter_at_open
	}

	/// The edit site restored when this entry is undone.
	pub fn site_before(&self) -> Site {
		self.site_before
	}

	/// The edit site restored when this entry is redone.
	pub fn site_after(&self) -> Site {
		self.site_after
	}

	pub fn command_names(&self) -> Vec<&'static str> {
		self.commands.iter().map(|command| command.name()).collect()
	}

	pub fn mem_size(&self) -> usize {
		std::mem::size_of::<Self>() + self.label.len() + self.commands.iter().map(|command| command.mem_size()).sum::<usize>()
	}

	/// Undoes every command in reverse order. On failure the commands already undone are redone again,
	/// so the entry is either fully undone or left as it was.
	fn undo(&mut self, sprite: &mut Sprite) -> Result<(), EditorError> {
		for index in (0..self.commands.len()).rev() {
			if let Err(error) = self.commands[index].undo(sprite) {
				for command in &mut self.commands[index + 1..] {
					if let Err(restore_error) = command.redo(sprite) {
						log::error!("Failed to restore \"{}\" after a failed undo of \"{}\": {restore_error}", command.name(), self.label);
					}
				}
				return Err(error);
			}
		}
		Ok(())
	}

	/// Redoes every command in order, symmetric to [undo](Self::undo).
	fn redo(&mut self, sprite: &mut Sprite) -> Result<(), EditorError> {
		for index in 0..self.commands.len() {
			if let Err(error) = self.commands[index].redo(sprite) {
				for command in self.commands[..index].iter_mut().rev() {
					if let Err(restore_error) = command.undo(sprite) {
						log::error!("Failed to restore \"{}\" after a failed redo of \"{}\": {restore_error}", command.name(), self.label);
					}
				}
				return Err(error);
			}
		}
		Ok(())
	}
}

/// The committed transactions of a document with a cursor between the undone and the applied ones.
///
/// The saved counter is the signed number of document-modifying entries between the current state and the last
/// saved one: positive when modifying entries were applied since the save, negative when the save point lies in
/// the redo tail. Once the save point is dropped from the history it cannot be reached again and the document stays
/// dirty until the next save.
#[derive(Debug, Default)]
pub struct UndoHistory {
	entries: VecDeque<HistoryEntry>,
	/// Number of entries currently applied. Entries from the cursor onwards form the redo tail.
	cursor: usize,
	saved_counter: i64,
	saved_state_lost: bool,
	max_len: Option<usize>,
}

impl UndoHistory {
	pub fn new(max_len: Option<usize>) -> Self {
		Self { max_len, ..Default::default() }
	}

	pub fn len(&self) -> usize {
		self.entries.len()
	}

	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}

	pub fn cursor(&self) -> usize {
		self.cursor
	}

	pub fn can_undo(&self) -> bool {
		self.cursor > 0
	}

	pub fn can_redo(&self) -> bool {
		self.cursor < self.entries.len()
	}

	pub fn undo_label(&self) -> Option<&str> {
		self.cursor.checked_sub(1).and_then(|index| self.entries.get(index)).map(HistoryEntry::label)
	}

	pub fn redo_label(&self) -> Option<&str> {
		self.entries.get(self.cursor).map(HistoryEntry::label)
	}

	/// Labels of every entry, oldest first, applied and undone alike.
	pub fn labels(&self) -> Vec<&str> {
		self.entries.iter().map(HistoryEntry::label).collect()
	}

	pub fn entries(&self) -> impl Iterator<Item = &HistoryEntry> {
		self.entries.iter()
	}

	pub fn mem_size(&self) -> usize {
		std::mem::size_of::<Self>() + self.entries.iter().map(HistoryEntry::mem_size).sum::<usize>()
	}

	pub fn max_len(&self) -> Option<usize> {
		self.max_len
	}

	pub fn set_max_len(&mut self, max_len: Option<usize>) {
		self.max_len = max_len;
		self.trim();
	}

	pub fn saved_counter(&self) -> i64 {
		self.saved_counter
	}

	pub fn mark_saved(&mut self) {
		self.saved_counter = 0;
		self.saved_state_lost = false;
	}

	pub fn is_saved(&self) -> bool {
		self.saved_counter == 0 && !self.saved_state_lost
	}

	/// Appends an entry after the cursor, dropping the redo tail and the oldest entries beyond the size limit.
	pub fn add(&mut self, entry: HistoryEntry) {
		if self.cursor < self.entries.len() {
			if self.saved_counter < 0 {
				self.saved_state_lost = true;
			}
			let dropped = self.entries.len() - self.cursor;
			self.entries.truncate(self.cursor);
			log::trace!("Dropped {dropped} redo entries");
		}

		if entry.modifies_document() {
			self.saved_counter += 1;
		}
		self.entries.push_back(entry);
		self.cursor += 1;
		self.trim();
	}

	/// Drops the oldest applied entries first, then the far end of the redo tail, until the size limit is met.
	fn trim(&mut self) {
		let Some(max_len) = self.max_len else { return };

		while self.entries.len() > max_len && self.cursor > 0 {
			let applied_modifications = self.entries.iter().take(self.cursor).filter(|entry| entry.modifies_document()).count() as i64;
			let Some(oldest) = self.entries.pop_front() else { break };

			// The save point sits before the dropped entry when it is at least as many modifications behind as are applied
			if oldest.modifies_document() && applied_modifications - self.saved_counter <= 0 {
				self.saved_state_lost = true;
			}
			self.cursor -= 1;
		}

		if self.entries.len() > max_len {
			let dropped = self.entries.len() - max_len;
			self.entries.truncate(max_len);
			log::trace!("Dropped {dropped} redo entries past the history limit");

			// A save point in the redo tail is as many modifying entries ahead as the counter is negative
			let kept_modifications = self.entries.iter().skip(self.cursor).filter(|entry| entry.modifies_document()).count() as i64;
			if self.saved_counter < 0 && kept_modifications < -self.saved_counter {
				self.saved_state_lost = true;
			}
		}
	}

	/// Undoes the entry before the cursor. On failure the entry is restored and the cursor does not move.
	pub fn undo(&mut self, sprite: &mut Sprite) -> Result<&HistoryEntry, EditorError> {
		let index = self.cursor.checked_sub(1).ok_or(EditorError::NothingToUndo)?;
		let entry = &mut self.entries[index];
		entry.undo(sprite)?;

		if entry.modifies_document() {
			self.saved_counter -= 1;
		}
		self.cursor = index;
		Ok(&self.entries[index])
	}

	/// Redoes the entry at the cursor. On failure the entry is restored and the cursor does not move.
	pub fn redo(&mut self, sprite: &mut Sprite) -> Result<&HistoryEntry, EditorError> {
		let index = self.cursor;
		let entry = self.entries.get_mut(index).ok_or(EditorError::NothingToRedo)?;
		entry.redo(sprite)?;

		if entry.modifies_document() {
			self.saved_counter += 1;
		}
		self.cursor = index + 1;
		Ok(&self.entries[index])
	}

	pub fn clear(&mut self) {
		self.entries.clear();
		self.cursor = 0;
		if self.saved_counter != 0 {
			self.saved_state_lost = true;
		}
	}
}
