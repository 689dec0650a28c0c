use crate::error::EditorError;

use celwork_document::Sprite;
use std::fmt::Debug;

/// An atomic, reversible mutation of a [Sprite].
///
/// A command is built from the parameters of the edit, executed once, and from then on alternates between
/// [undo](Command::undo) and [redo](Command::redo). `execute` must leave the sprite untouched when it fails, and
/// `undo` must restore exactly the state `execute` started from, image sharing included.
pub trait Command: Debug + Send {
	/// Short human readable name, used in logs and error reports.
	fn name(&self) -> &'static str;

	fn execute(&mut self, sprite: &mut Sprite) -> Result<(), EditorError>;

	fn undo(&mut self, sprite: &mut Sprite) -> Result<(), EditorError>;

	fn redo(&mut self, sprite: &mut Sprite) -> Result<(), EditorError> {
		self.execute(sprite)
	}

	/// Memory kept alive by the command to be able to reverse itself.
	fn mem_size(&self) -> usize {
		std::mem::size_of_val(self)
	}
}
