use crate::cel::FrameIndex;
use crate::image::PixelFormat;
use crate::uuid::LayerId;

/// A set of different errors that can occur when mutating a sprite.
///
/// Every variant describes a violated precondition. The model checks them before mutating anything,
/// so an operation that returns one of these errors has left the sprite untouched.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DocumentError {
	#[error("Layer {0} not found")]
	LayerNotFound(LayerId),

	#[error("Layer {0} is not a folder")]
	NotAFolder(LayerId),

	#[error("Layer {0} is not an image layer")]
	NotAnImageLayer(LayerId),

	#[error("The root folder cannot be moved or removed")]
	RootLayer,

	#[error("Layer {layer} already has a cel at frame {frame}")]
	DuplicateFrame { layer: LayerId, frame: FrameIndex },

	#[error("Layer {layer} has no cel at frame {frame}")]
	CelNotFound { layer: LayerId, frame: FrameIndex },

	#[error("Image has pixel format {found} but the sprite uses {expected}")]
	PixelFormatMismatch { expected: PixelFormat, found: PixelFormat },

	#[error("Frame {0} is outside of the sprite's frame range")]
	FrameOutOfRange(FrameIndex),

	#[error("Frame {0} still contains cels")]
	FrameNotEmpty(FrameIndex),

	#[error("The last frame of a sprite cannot be removed")]
	LastFrame,

	#[error("Layer {layer} is not a child of folder {folder}")]
	NotAChild { layer: LayerId, folder: LayerId },

	#[error("Layer {0} is already part of the sprite")]
	LayerAlreadyAttached(LayerId),

	#[error("A layer cannot be stacked relative to itself")]
	CannotStackOnItself,

	#[error("The sprite already has a background layer")]
	BackgroundAlreadyExists,

	#[error("The background layer must stay at the bottom of the root folder")]
	BackgroundMustStayAtBottom,

	#[error("Layer {0} cannot be used as a background layer")]
	InvalidBackground(LayerId),

	#[error("Pixel region is outside of the image bounds")]
	RegionOutOfBounds,

	#[error("Expected {expected} bytes of pixel data, found {found}")]
	InvalidPixelData { expected: usize, found: usize },

	#[error("Structural invariant violated: {0}")]
	InvariantViolated(String),
}
