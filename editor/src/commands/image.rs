use super::cel::CelSite;
use crate::command::Command;
use crate::error::EditorError;

use celwork_document::{DocumentError, FrameIndex, Image, LayerId, Sprite};
use glam::UVec2;
use std::sync::Arc;

/// How a pixel write treats an image shared by several cels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WritePolicy {
	/// Only the target cel sees the new pixels. It is detached from the shared image first.
	#[default]
	CloneOnWrite,
	/// Every cel sharing the target's image sees the new pixels and keeps sharing with the others.
	Linked,
}

/// Swaps the images of a set of cels, restoring every cel already swapped when one of them fails.
fn rebind(sprite: &mut Sprite, cels: &[CelSite], images: impl Fn(usize) -> Arc<Image>) -> Result<Vec<Arc<Image>>, EditorError> {
	let mut previous = Vec::with_capacity(cels.len());
	for (index, &(layer, frame)) in cels.iter().enumerate() {
		match sprite.replace_cel_image(layer, frame, images(index)) {
			Ok(image) => previous.push(image),
			Err(error) => {
				for (&(layer, frame), image) in cels.iter().zip(previous).rev() {
					sprite.replace_cel_image(layer, frame, image)?;
				}
				return Err(error.into());
			}
		}
	}
	Ok(previous)
}

// =========
// SetPixels
// =========

/// Overwrites a rectangular region of a cel's image.
///
/// The write never mutates an existing buffer. It builds a new image and binds it to the target cel, or with
/// [WritePolicy::Linked] to every cel that shared the old image. Undo binds the old images back, which restores
/// the exact sharing the cels had before.
#[derive(Debug)]
pub struct SetPixels {
	layer: LayerId,
	frame: FrameIndex,
	origin: UVec2,
	size: UVec2,
	pixels: Vec<u8>,
	policy: WritePolicy,
	written: Option<Arc<Image>>,
	rebound: Vec<CelSite>,
	previous: Vec<Arc<Image>>,
}

impl SetPixels {
	/// `pixels` holds the region row by row in the sprite's pixel format.
	pub fn new(layer: LayerId, frame: FrameIndex, origin: UVec2, size: UVec2, pixels: Vec<u8>, policy: WritePolicy) -> Self {
		Self {
			layer,
			frame,
			origin,
			size,
			pixels,
			policy,
			written: None,
			rebound: Vec::new(),
			previous: Vec::new(),
		}
	}

	/// The cels whose image was replaced by the last execution.
	pub fn affected_cels(&self) -> &[CelSite] {
		&self.rebound
	}
}

impl Command for SetPixels {
	fn name(&self) -> &'static str {
		"Set Pixels"
	}

	fn execute(&mut self, sprite: &mut Sprite) -> Result<(), EditorError> {
		let (layer, frame) = (self.layer, self.frame);
		let cel = sprite.find_cel(layer, frame).ok_or(DocumentError::CelNotFound { layer, frame })?;

		let written = match &self.written {
			Some(written) => Arc::clone(written),
			None => {
				let mut image = Image::clone(cel.image());
				image.put_region(self.origin, self.size, &self.pixels)?;
				Arc::new(image)
			}
		};
		let targets = match self.policy {
			WritePolicy::CloneOnWrite => vec![(layer, frame)],
			WritePolicy::Linked => sprite.linked_cels(layer, frame)?,
		};

		self.previous = rebind(sprite, &targets, |_| Arc::clone(&written))?;
		self.rebound = targets;
		self.written = Some(written);
		log::trace!("Wrote {}x{} pixels into {} cels", self.size.x, self.size.y, self.rebound.len());
		Ok(())
	}

	fn undo(&mut self, sprite: &mut Sprite) -> Result<(), EditorError> {
		if self.previous.is_empty() {
			return Err(EditorError::NotExecuted);
		}
		let previous = std::mem::take(&mut self.previous);
		if let Err(error) = rebind(sprite, &self.rebound, |index| Arc::clone(&previous[index])) {
			self.previous = previous;
			return Err(error);
		}
		Ok(())
	}

	fn mem_size(&self) -> usize {
		let images = self.written.iter().chain(&self.previous).map(|image| image.mem_size()).sum::<usize>();
		std::mem::size_of::<Self>() + self.pixels.len() + images
	}
}

// ===============
// ReplaceCelImage
// ===============

/// Binds a cel to another image. Other cels sharing the old image keep it.
#[derive(Debug)]
pub struct ReplaceCelImage {
	cel: CelSite,
	image: Arc<Image>,
	previous: Option<Arc<Image>>,
}

impl ReplaceCelImage {
	pub fn new(layer: LayerId, frame: FrameIndex, image: impl Into<Arc<Image>>) -> Self {
		Self {
			cel: (layer, frame),
			image: image.into(),
			previous: None,
		}
	}
}

impl Command for ReplaceCelImage {
	fn name(&self) -> &'static str {
		"Replace Cel Image"
	}

	fn execute(&mut self, sprite: &mut Sprite) -> Result<(), EditorError> {
		let (layer, frame) = self.cel;
		self.previous = Some(sprite.replace_cel_image(layer, frame, Arc::clone(&self.image))?);
		Ok(())
	}

	fn undo(&mut self, sprite: &mut Sprite) -> Result<(), EditorError> {
		let (layer, frame) = self.cel;
		let previous = self.previous.take().ok_or(EditorError::NotExecuted)?;
		if let Err(error) = sprite.replace_cel_image(layer, frame, Arc::clone(&previous)) {
			self.previous = Some(previous);
			return Err(error.into());
		}
		Ok(())
	}

	fn mem_size(&self) -> usize {
		std::mem::size_of::<Self>() + self.image.mem_size()
	}
}

#[cfg(test)]
mod test {
	use super::*;
	use crate::test_utils::{assert_reversible, sprite_with_layer};
	use celwork_document::{Cel, PixelFormat};

	const RED: [u8; 4] = [255, 0, 0, 255];

	fn linked_pair() -> (Sprite, LayerId) {
		let (mut sprite, layer) = sprite_with_layer();
		let linked = sprite.find_cel(layer, 0).unwrap().linked_copy(1);
		sprite.add_cel(layer, linked).unwrap();
		(sprite, layer)
	}

	fn pixel(sprite: &Sprite, layer: LayerId, frame: FrameIndex) -> Vec<u8> {
		sprite.find_cel(layer, frame).unwrap().image().pixel(1, 1).unwrap().to_vec()
	}

	#[test]
	fn clone_on_write_detaches_the_target() {
		let (mut sprite, layer) = linked_pair();
		let mut command = SetPixels::new(layer, 1, UVec2::ONE, UVec2::ONE, RED.to_vec(), WritePolicy::CloneOnWrite);
		assert_reversible(&mut sprite, &mut command);

		command.redo(&mut sprite).unwrap();
		assert_eq!(command.affected_cels(), [(layer, 1)]);
		assert_eq!(pixel(&sprite, layer, 1), RED);
		assert_eq!(pixel(&sprite, layer, 0), [0; 4]);
		assert!(!sprite.find_cel(layer, 0).unwrap().is_linked_with(sprite.find_cel(layer, 1).unwrap()));

		command.undo(&mut sprite).unwrap();
		assert!(sprite.find_cel(layer, 0).unwrap().is_linked_with(sprite.find_cel(layer, 1).unwrap()));
	}

	#[test]
	fn linked_write_reaches_every_sharer() {
		let (mut sprite, layer) = linked_pair();
		let other = sprite.find_cel(layer, 0).unwrap().deep_copy(2);
		sprite.add_cel(layer, other).unwrap();

		let mut command = SetPixels::new(layer, 1, UVec2::ONE, UVec2::ONE, RED.to_vec(), WritePolicy::Linked);
		assert_reversible(&mut sprite, &mut command);

		command.redo(&mut sprite).unwrap();
		assert_eq!(command.affected_cels(), [(layer, 0), (layer, 1)]);
		assert_eq!(pixel(&sprite, layer, 0), RED);
		assert_eq!(pixel(&sprite, layer, 1), RED);
		assert_eq!(pixel(&sprite, layer, 2), [0; 4]);
		assert!(sprite.find_cel(layer, 0).unwrap().is_linked_with(sprite.find_cel(layer, 1).unwrap()));
	}

	#[test]
	fn out_of_bounds_write_is_rejected() {
		let (mut sprite, layer) = sprite_with_layer();
		let before = sprite.snapshot();
		let mut command = SetPixels::new(layer, 0, UVec2::new(3, 3), UVec2::new(2, 2), vec![0; 16], WritePolicy::Linked);
		assert_eq!(command.execute(&mut sprite), Err(DocumentError::RegionOutOfBounds.into()));
		assert_eq!(sprite.snapshot(), before);
		assert_eq!(command.undo(&mut sprite), Err(EditorError::NotExecuted));
	}

	#[test]
	fn replace_cel_image_checks_the_format() {
		let (mut sprite, layer) = sprite_with_layer();
		assert_reversible(&mut sprite, &mut ReplaceCelImage::new(layer, 0, Image::new(PixelFormat::Rgb, 8, 8)));

		let mut wrong = ReplaceCelImage::new(layer, 0, Image::new(PixelFormat::Indexed, 8, 8));
		assert!(matches!(wrong.execute(&mut sprite), Err(EditorError::PreconditionViolated(DocumentError::PixelFormatMismatch { .. }))));
		assert!(sprite.find_cel(layer, 0).is_some_and(|cel: &Cel| cel.image().format() == PixelFormat::Rgb));
	}
}
