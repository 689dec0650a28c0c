use crate::command::Command;
use crate::error::EditorError;

use celwork_document::{Cel, DocumentError, FrameIndex, LayerId, Sprite};
use glam::IVec2;

/// A cel addressed by its layer and frame.
pub type CelSite = (LayerId, FrameIndex);

fn held_mem_size(cel: Option<&Cel>) -> usize {
	cel.map_or(0, |cel| cel.mem_size() + cel.image().mem_size())
}

fn find_cel(sprite: &Sprite, (layer, frame): CelSite) -> Result<&Cel, EditorError> {
	Ok(sprite.find_cel(layer, frame).ok_or(DocumentError::CelNotFound { layer, frame })?)
}

// ======
// AddCel
// ======

/// Adds a cel to an image layer. The cel's image is shared as is.
#[derive(Debug)]
pub struct AddCel {
	layer: LayerId,
	cel: Cel,
	executed: bool,
}

impl AddCel {
	pub fn new(layer: LayerId, cel: Cel) -> Self {
		Self { layer, cel, executed: false }
	}
}

impl Command for AddCel {
	fn name(&self) -> &'static str {
		"Add Cel"
	}

	fn execute(&mut self, sprite: &mut Sprite) -> Result<(), EditorError> {
		sprite.add_cel(self.layer, self.cel.clone())?;
		self.executed = true;
		Ok(())
	}

	fn undo(&mut self, sprite: &mut Sprite) -> Result<(), EditorError> {
		if !self.executed {
			return Err(EditorError::NotExecuted);
		}
		self.cel = sprite.remove_cel(self.layer, self.cel.frame())?;
		self.executed = false;
		Ok(())
	}

	fn mem_size(&self) -> usize {
		std::mem::size_of::<Self>() + held_mem_size(Some(&self.cel))
	}
}

// =========
// RemoveCel
// =========

#[derive(Debug)]
pub struct RemoveCel {
	layer: LayerId,
	frame: FrameIndex,
	removed: Option<Cel>,
}

impl RemoveCel {
	pub fn new(layer: LayerId, frame: FrameIndex) -> Self {
		Self { layer, frame, removed: None }
	}
}

impl Command for RemoveCel {
	fn name(&self) -> &'static str {
		"Remove Cel"
	}

	fn execute(&mut self, sprite: &mut Sprite) -> Result<(), EditorError> {
		self.removed = Some(sprite.remove_cel(self.layer, self.frame)?);
		Ok(())
	}

	fn undo(&mut self, sprite: &mut Sprite) -> Result<(), EditorError> {
		let cel = self.removed.take().ok_or(EditorError::NotExecuted)?;
		if let Err(error) = sprite.add_cel(self.layer, cel.clone()) {
			self.removed = Some(cel);
			return Err(error.into());
		}
		Ok(())
	}

	fn mem_size(&self) -> usize {
		std::mem::size_of::<Self>() + held_mem_size(self.removed.as_ref())
	}
}

// =======
// MoveCel
// =======

/// Moves a cel to another frame, possibly of another image layer. The cel keeps its image and attributes.
#[derive(Debug)]
pub struct MoveCel {
	from: CelSite,
	to: CelSite,
}

impl MoveCel {
	pub fn new(from: CelSite, to: CelSite) -> Self {
		Self { from, to }
	}

	fn move_between(sprite: &mut Sprite, (from_layer, from_frame): CelSite, (to_layer, to_frame): CelSite) -> Result<(), EditorError> {
		if from_layer == to_layer {
			sprite.move_cel(from_layer, from_frame, to_frame)?;
			return Ok(());
		}

		let cel = sprite.remove_cel(from_layer, from_frame)?;
		if let Err(error) = sprite.add_cel(to_layer, cel.linked_copy(to_frame)) {
			sprite.add_cel(from_layer, cel)?;
			return Err(error.into());
		}
		Ok(())
	}
}

impl Command for MoveCel {
	fn name(&self) -> &'static str {
		"Move Cel"
	}

	fn execute(&mut self, sprite: &mut Sprite) -> Result<(), EditorError> {
		Self::move_between(sprite, self.from, self.to)
	}

	fn undo(&mut self, sprite: &mut Sprite) -> Result<(), EditorError> {
		Self::move_between(sprite, self.to, self.from)
	}
}

// =======
// CopyCel
// =======

/// Copies a cel to another frame, possibly of another image layer, replacing the cel already there.
///
/// A linked copy shares the source's image, so later linked writes show up in both cels. An unlinked copy owns a
/// duplicate of the pixels.
#[derive(Debug)]
pub struct CopyCel {
	from: CelSite,
	to: CelSite,
	linked: bool,
	copied: Option<Cel>,
	replaced: Option<Cel>,
	executed: bool,
}

impl CopyCel {
	pub fn new(from: CelSite, to: CelSite, linked: bool) -> Self {
		Self {
			from,
			to,
			linked,
			copied: None,
			replaced: None,
			executed: false,
		}
	}
}

impl Command for CopyCel {
	fn name(&self) -> &'static str {
		"Copy Cel"
	}

	fn execute(&mut self, sprite: &mut Sprite) -> Result<(), EditorError> {
		let (layer, frame) = self.to;
		if self.from == self.to {
			return Err(DocumentError::DuplicateFrame { layer, frame }.into());
		}
		sprite.image_layer(layer)?;

		// The copy made by the first execution is kept on undo so a redo brings back the very same image
		let copy = match self.copied.take() {
			Some(copy) => copy,
			None => {
				let source = find_cel(sprite, self.from)?;
				if self.linked { source.linked_copy(frame) } else { source.deep_copy(frame) }
			}
		};

		let replaced = match sprite.find_cel(layer, frame) {
			Some(_) => Some(sprite.remove_cel(layer, frame)?),
			None => None,
		};
		if let Err(error) = sprite.add_cel(layer, copy.clone()) {
			if let Some(replaced) = replaced {
				sprite.add_cel(layer, replaced)?;
			}
			self.copied = Some(copy);
			return Err(error.into());
		}

		self.replaced = replaced;
		self.executed = true;
		Ok(())
	}

	fn undo(&mut self, sprite: &mut Sprite) -> Result<(), EditorError> {
		if !self.executed {
			return Err(EditorError::NotExecuted);
		}
		let (layer, frame) = self.to;
		self.copied = Some(sprite.remove_cel(layer, frame)?);
		if let Some(replaced) = self.replaced.take() {
			sprite.add_cel(layer, replaced)?;
		}
		self.executed = false;
		Ok(())
	}

	fn mem_size(&self) -> usize {
		std::mem::size_of::<Self>() + held_mem_size(self.copied.as_ref()) + held_mem_size(self.replaced.as_ref())
	}
}

// ==============
// SetCelPosition
// ==============

#[derive(Debug)]
pub struct SetCelPosition {
	cel: CelSite,
	position: IVec2,
	previous: Option<IVec2>,
}

impl SetCelPosition {
	pub fn new(layer: LayerId, frame: FrameIndex, position: IVec2) -> Self {
		Self {
			cel: (layer, frame),
			position,
			previous: None,
		}
	}
}

impl Command for SetCelPosition {
	fn name(&self) -> &'static str {
		"Set Cel Position"
	}

	fn execute(&mut self, sprite: &mut Sprite) -> Result<(), EditorError> {
		let (layer, frame) = self.cel;
		let cel = sprite.cel_mut(layer, frame)?;
		self.previous = Some(std::mem::replace(&mut cel.position, self.position));
		Ok(())
	}

	fn undo(&mut self, sprite: &mut Sprite) -> Result<(), EditorError> {
		let (layer, frame) = self.cel;
		let previous = self.previous.ok_or(EditorError::NotExecuted)?;
		sprite.cel_mut(layer, frame)?.position = previous;
		self.previous = None;
		Ok(())
	}
}

// =============
// SetCelOpacity
// =============

#[derive(Debug)]
pub struct SetCelOpacity {
	cel: CelSite,
	opacity: u8,
	previous: Option<u8>,
}

impl SetCelOpacity {
	pub fn new(layer: LayerId, frame: FrameIndex, opacity: u8) -> Self {
		Self {
			cel: (layer, frame),
			opacity,
			previous: None,
		}
	}
}

impl Command for SetCelOpacity {
	fn name(&self) -> &'static str {
		"Set Cel Opacity"
	}

	fn execute(&mut self, sprite: &mut Sprite) -> Result<(), EditorError> {
		let (layer, frame) = self.cel;
		let cel = sprite.cel_mut(layer, frame)?;
		self.previous = Some(std::mem::replace(&mut cel.opacity, self.opacity));
		Ok(())
	}

	fn undo(&mut self, sprite: &mut Sprite) -> Result<(), EditorError> {
		let (layer, frame) = self.cel;
		let previous = self.previous.ok_or(EditorError::NotExecuted)?;
		sprite.cel_mut(layer, frame)?.opacity = previous;
		self.previous = None;
		Ok(())
	}
}

#[cfg(test)]
mod test {
	use super::*;
	use crate::test_utils::{assert_reversible, sprite_with_layer};
	use celwork_document::{Image, Layer};

	#[test]
	fn add_and_remove_cels_are_reversible() {
		let (mut sprite, layer) = sprite_with_layer();
		let cel = Cel::from_image(2, Image::new(sprite.pixel_format(), 4, 4));
		assert_reversible(&mut sprite, &mut AddCel::new(layer, cel));
		assert_reversible(&mut sprite, &mut RemoveCel::new(layer, 0));
	}

	#[test]
	fn failed_add_leaves_sprite_untouched() {
		let (mut sprite, layer) = sprite_with_layer();
		let before = sprite.snapshot();
		let mut command = AddCel::new(layer, Cel::from_image(0, Image::new(sprite.pixel_format(), 4, 4)));
		assert_eq!(command.execute(&mut sprite), Err(DocumentError::DuplicateFrame { layer, frame: 0 }.into()));
		assert_eq!(sprite.snapshot(), before);
		assert_eq!(command.undo(&mut sprite), Err(EditorError::NotExecuted));
	}

	#[test]
	fn move_cel_across_layers_keeps_the_image() {
		let (mut sprite, layer) = sprite_with_layer();
		let other = sprite.add_layer(sprite.root(), Layer::new_image()).unwrap();
		let image = sprite.find_cel(layer, 0).unwrap().image().clone();

		let mut command = MoveCel::new((layer, 0), (other, 3));
		assert_reversible(&mut sprite, &mut command);
		command.redo(&mut sprite).unwrap();
		assert!(sprite.find_cel(layer, 0).is_none());
		assert!(std::sync::Arc::ptr_eq(sprite.find_cel(other, 3).unwrap().image(), &image));
	}

	#[test]
	fn copy_cel_replaces_and_restores_destination() {
		let (mut sprite, layer) = sprite_with_layer();
		sprite.add_cel(layer, Cel::from_image(1, Image::new(sprite.pixel_format(), 4, 4))).unwrap();

		for linked in [true, false] {
			let mut command = CopyCel::new((layer, 0), (layer, 1), linked);
			assert_reversible(&mut sprite, &mut command);
			command.redo(&mut sprite).unwrap();
			let source = sprite.find_cel(layer, 0).unwrap();
			assert_eq!(source.is_linked_with(sprite.find_cel(layer, 1).unwrap()), linked);
			command.undo(&mut sprite).unwrap();
		}
	}

	#[test]
	fn cel_attributes_are_restored() {
		let (mut sprite, layer) = sprite_with_layer();
		assert_reversible(&mut sprite, &mut SetCelPosition::new(layer, 0, IVec2::new(-4, 7)));
		assert_reversible(&mut sprite, &mut SetCelOpacity::new(layer, 0, 12));
		assert_eq!(SetCelOpacity::new(layer, 5, 12).execute(&mut sprite), Err(DocumentError::CelNotFound { layer, frame: 5 }.into()));
	}
}
