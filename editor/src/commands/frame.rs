use crate::command::Command;
use crate::error::EditorError;

use celwork_document::consts::DEFAULT_FRAME_DURATION;
use celwork_document::{Cel, DocumentError, FrameIndex, LayerId, Sprite};

// ========
// AddFrame
// ========

/// Inserts an empty frame, pushing the cels at or after it one frame later.
#[derive(Debug)]
pub struct AddFrame {
	at: FrameIndex,
	duration: u32,
}

impl AddFrame {
	pub fn new(at: FrameIndex) -> Self {
		Self::with_duration(at, DEFAULT_FRAME_DURATION)
	}

	pub fn with_duration(at: FrameIndex, duration: u32) -> Self {
		Self { at, duration }
	}
}

impl Command for AddFrame {
	fn name(&self) -> &'static str {
		"Add Frame"
	}

	fn execute(&mut self, sprite: &mut Sprite) -> Result<(), EditorError> {
		sprite.add_frame(self.at, self.duration)?;
		Ok(())
	}

	fn undo(&mut self, sprite: &mut Sprite) -> Result<(), EditorError> {
		sprite.remove_frame(self.at)?;
		Ok(())
	}
}

// ===========
// RemoveFrame
// ===========

/// Removes a frame together with every cel it holds, pulling later cels one frame earlier.
#[derive(Debug)]
pub struct RemoveFrame {
	at: FrameIndex,
	duration: Option<u32>,
	removed_cels: Vec<(LayerId, Cel)>,
}

impl RemoveFrame {
	pub fn new(at: FrameIndex) -> Self {
		Self {
			at,
			duration: None,
			removed_cels: Vec::new(),
		}
	}

	fn restore_cels(sprite: &mut Sprite, cels: Vec<(LayerId, Cel)>) -> Result<(), EditorError> {
		for (layer, cel) in cels.into_iter().rev() {
			sprite.add_cel(layer, cel)?;
		}
		Ok(())
	}
}

impl Command for RemoveFrame {
	fn name(&self) -> &'static str {
		"Remove Frame"
	}

	fn execute(&mut self, sprite: &mut Sprite) -> Result<(), EditorError> {
		let at = self.at;
		if sprite.frame_duration(at).is_none() {
			return Err(DocumentError::FrameOutOfRange(at).into());
		}
		if sprite.frame_count() <= 1 {
			return Err(DocumentError::LastFrame.into());
		}

		let mut removed_cels = Vec::new();
		for layer in sprite.image_layers(sprite.root())? {
			if sprite.find_cel(layer, at).is_some() {
				removed_cels.push((layer, sprite.remove_cel(layer, at)?));
			}
		}
		match sprite.remove_frame(at) {
			Ok(duration) => {
				self.duration = Some(duration);
				self.removed_cels = removed_cels;
				Ok(())
			}
			Err(error) => {
				Self::restore_cels(sprite, removed_cels)?;
				Err(error.into())
			}
		}
	}

	fn undo(&mut self, sprite: &mut Sprite) -> Result<(), EditorError> {
		let duration = self.duration.ok_or(EditorError::NotExecuted)?;
		sprite.add_frame(self.at, duration)?;
		self.duration = None;
		Self::restore_cels(sprite, std::mem::take(&mut self.removed_cels))
	}

	fn mem_size(&self) -> usize {
		std::mem::size_of::<Self>() + self.removed_cels.iter().map(|(_, cel)| cel.mem_size() + cel.image().mem_size()).sum::<usize>()
	}
}

// ================
// SetFrameDuration
// ================

#[derive(Debug)]
pub struct SetFrameDuration {
	frame: FrameIndex,
	duration: u32,
	previous: Option<u32>,
}

impl SetFrameDuration {
	pub fn new(frame: FrameIndex, duration: u32) -> Self {
		Self { frame, duration, previous: None }
	}
}

impl Command for SetFrameDuration {
	fn name(&self) -> &'static str {
		"Set Frame Duration"
	}

	fn execute(&mut self, sprite: &mut Sprite) -> Result<(), EditorError> {
		self.previous = Some(sprite.set_frame_duration(self.frame, self.duration)?);
		Ok(())
	}

	fn undo(&mut self, sprite: &mut Sprite) -> Result<(), EditorError> {
		let previous = self.previous.ok_or(EditorError::NotExecuted)?;
		sprite.set_frame_duration(self.frame, previous)?;
		self.previous = None;
		Ok(())
	}
}

// ==============
// DisplaceFrames
// ==============

/// Shifts the cels of a layer, or of every image layer inside a folder, that sit at or after `from`.
///
/// Undo moves back exactly the cels that were displaced, so cels that stayed behind a backwards displacement are
/// never caught by the reverse shift.
#[derive(Debug)]
pub struct DisplaceFrames {
	layer: LayerId,
	from: FrameIndex,
	delta: FrameIndex,
	displaced: Vec<(LayerId, Vec<FrameIndex>)>,
	executed: bool,
}

impl DisplaceFrames {
	pub fn new(layer: LayerId, from: FrameIndex, delta: FrameIndex) -> Self {
		Self {
			layer,
			from,
			delta,
			displaced: Vec::new(),
			executed: false,
		}
	}
}

impl Command for DisplaceFrames {
	fn name(&self) -> &'static str {
		"Displace Frames"
	}

	fn execute(&mut self, sprite: &mut Sprite) -> Result<(), EditorError> {
		let mut displaced = Vec::new();
		for layer in sprite.image_layers(self.layer)? {
			let frames = sprite.image_layer(layer)?.frames_from(self.from);
			if !frames.is_empty() {
				displaced.push((layer, frames));
			}
		}

		sprite.displace_frames(self.layer, self.from, self.delta)?;
		self.displaced = displaced;
		self.executed = true;
		Ok(())
	}

	fn undo(&mut self, sprite: &mut Sprite) -> Result<(), EditorError> {
		if !self.executed {
			return Err(EditorError::NotExecuted);
		}
		for (layer, frames) in &self.displaced {
			// The cel nearest its destination moves first so every destination is free
			let ordered: Box<dyn Iterator<Item = &FrameIndex>> = if self.delta > 0 { Box::new(frames.iter()) } else { Box::new(frames.iter().rev()) };
			for &frame in ordered {
				sprite.move_cel(*layer, frame + self.delta, frame)?;
			}
		}
		self.executed = false;
		Ok(())
	}
}
