use crate::image::Image;
use crate::uuid::LayerId;

use glam::IVec2;
use std::sync::Arc;

/// Zero-based position on the animation timeline.
pub type FrameIndex = i32;

/// The content of one image layer at one frame.
///
/// The image is shared: cloning a cel (or copying it as a linked cel) shares the same buffer.
/// The frame and the back-reference to the owning layer are only changed by the [Sprite](crate::Sprite),
/// which keeps the layer's cel list sorted.
#[derive(Debug, Clone)]
pub struct Cel {
	frame: FrameIndex,
	image: Arc<Image>,
	layer: Option<LayerId>,
	pub position: IVec2,
	pub opacity: u8,
}

impl Cel {
	pub fn new(frame: FrameIndex, image: Arc<Image>) -> Self {
		Self {
			frame,
			image,
			layer: None,
			position: IVec2::ZERO,
			opacity: 255,
		}
	}

	pub fn from_image(frame: FrameIndex, image: Image) -> Self {
		Self::new(frame, Arc::new(image))
	}

	/// A cel at `frame` with the same attributes and an unshared copy of the image.
	pub fn deep_copy(&self, frame: FrameIndex) -> Self {
		Self {
			frame,
			image: Arc::new(Image::clone(&self.image)),
			layer: None,
			position: self.position,
			opacity: self.opacity,
		}
	}

	/// A cel at `frame` with the same attributes that shares this cel's image.
	pub fn linked_copy(&self, frame: FrameIndex) -> Self {
		Self {
			frame,
			image: Arc::clone(&self.image),
			layer: None,
			position: self.position,
			opacity: self.opacity,
		}
	}

	pub fn frame(&self) -> FrameIndex {
		self.frame
	}

	pub fn image(&self) -> &Arc<Image> {
		&self.image
	}

	/// The layer that currently owns this cel, `None` while the cel is detached.
	pub fn layer(&self) -> Option<LayerId> {
		self.layer
	}

	pub fn is_linked_with(&self, other: &Cel) -> bool {
		Arc::ptr_eq(&self.image, &other.image)
	}

	pub(crate) fn set_frame(&mut self, frame: FrameIndex) {
		self.frame = frame;
	}

	pub(crate) fn set_layer(&mut self, layer: Option<LayerId>) {
		self.layer = layer;
	}

	pub(crate) fn replace_image(&mut self, image: Arc<Image>) -> Arc<Image> {
		std::mem::replace(&mut self.image, image)
	}

	/// Size of the cel itself, the image is accounted for by the owning layer.
	pub fn mem_size(&self) -> usize {
		std::mem::size_of::<Self>()
	}
}
