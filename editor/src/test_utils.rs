use crate::command::Command;
use crate::document::Document;
use crate::error::EditorError;

use celwork_document::uuid::set_uuid_seed;
use celwork_document::{LayerId, PixelFormat, Sprite};
use pretty_assertions::assert_eq;

pub fn init_logger() {
	let _ = env_logger::builder().is_test(true).try_init();
	set_uuid_seed(0);
}

/// A 4x4 RGB sprite with 4 frames and one image layer named "Layer 1" holding a blank cel at frame 0.
pub fn sprite_with_layer() -> (Sprite, LayerId) {
	init_logger();
	Sprite::new_with_layer(PixelFormat::Rgb, 4, 4, 4).expect("Creating the test sprite should succeed")
}

/// A document around [sprite_with_layer].
pub fn test_document() -> (Document, LayerId) {
	let (sprite, layer) = sprite_with_layer();
	(Document::new(sprite).expect("The test sprite should be valid"), layer)
}

/// Executes, undoes and redoes a command, checking the sprite snapshot after each step, then undoes it again.
pub fn assert_reversible(sprite: &mut Sprite, command: &mut impl Command) {
	let before = sprite.snapshot();
	command.execute(sprite).unwrap_or_else(|error| panic!("\"{}\" failed to execute: {error}", command.name()));
	sprite.validate().expect("The sprite should be valid after execute");
	let after = sprite.snapshot();

	command.undo(sprite).expect("Undo should succeed");
	sprite.validate().expect("The sprite should be valid after undo");
	assert_eq!(sprite.snapshot(), before, "undo of \"{}\" should restore the sprite", command.name());

	command.redo(sprite).expect("Redo should succeed");
	assert_eq!(sprite.snapshot(), after, "redo of \"{}\" should reapply the change", command.name());

	command.undo(sprite).expect("The second undo should succeed");
	assert_eq!(sprite.snapshot(), before);
}

/// A command that changes nothing and fails in the configured direction.
#[derive(Debug, Default)]
pub struct FailingCommand {
	fail_execute: bool,
	fail_undo: bool,
}

impl FailingCommand {
	pub fn on_execute() -> Self {
		Self { fail_execute: true, ..Default::default() }
	}

	pub fn on_undo() -> Self {
		Self { fail_undo: true, ..Default::default() }
	}
}

impl Command for FailingCommand {
	fn name(&self) -> &'static str {
		"Fail"
	}

	fn execute(&mut self, _sprite: &mut Sprite) -> Result<(), EditorError> {
		if self.fail_execute {
			return Err(EditorError::OperationFailed("execute was told to fail".to_string()));
		}
		Ok(())
	}

	fn undo(&mut self, _sprite: &mut Sprite) -> Result<(), EditorError> {
		if self.fail_undo {
			return Err(EditorError::OperationFailed("undo was told to fail".to_string()));
		}
		Ok(())
	}
}
