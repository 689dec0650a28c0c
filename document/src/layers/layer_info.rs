use super::folder_layer::FolderLayer;
use super::image_layer::ImageLayer;
use crate::DocumentError;
use crate::cel::Cel;
use crate::consts::{DEFAULT_FOLDER_NAME, DEFAULT_LAYER_NAME};
use crate::uuid::LayerId;

use serde::{Deserialize, Serialize};
use std::fmt;

bitflags::bitflags! {
	#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
	pub struct LayerFlags: u32 {
		const VISIBLE = 1;
		const EDITABLE = 1 << 1;
		const LOCK_MOVE = 1 << 2;
		const BACKGROUND = 1 << 3;
		const CONTINUOUS = 1 << 4;
		const COLLAPSED = 1 << 5;

		const BACKGROUND_LAYER_FLAGS = Self::LOCK_MOVE.bits() | Self::BACKGROUND.bits();
	}
}

impl Default for LayerFlags {
	fn default() -> Self {
		LayerFlags::VISIBLE | LayerFlags::EDITABLE
	}
}

#[derive(Debug, Clone)]
pub enum LayerDataType {
	Image(ImageLayer),
	Folder(FolderLayer),
}

// =========================
// LayerDataTypeDiscriminant
// =========================

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum LayerDataTypeDiscriminant {
	Image,
	Folder,
}

impl fmt::Display for LayerDataTypeDiscriminant {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		match self {
			LayerDataTypeDiscriminant::Image => write!(f, "Image"),
			LayerDataTypeDiscriminant::Folder => write!(f, "Folder"),
		}
	}
}

impl From<&LayerDataType> for LayerDataTypeDiscriminant {
	fn from(data: &LayerDataType) -> Self {
		match data {
			LayerDataType::Image(_) => LayerDataTypeDiscriminant::Image,
			LayerDataType::Folder(_) => LayerDataTypeDiscriminant::Folder,
		}
	}
}

// =====
// Layer
// =====

/// A node of the layer tree.
///
/// The parent is a non-owning back-reference: folders own their children through the sprite's layer arena,
/// and the sprite sets or clears `parent` whenever a layer is attached to or detached from a folder.
#[derive(Debug, Clone)]
pub struct Layer {
	id: LayerId,
	name: String,
	flags: LayerFlags,
	opacity: u8,
	parent: Option<LayerId>,
	data: LayerDataType,
}

impl Layer {
	pub fn new(data: LayerDataType) -> Self {
		let name = match data {
			LayerDataType::Image(_) => DEFAULT_LAYER_NAME,
			LayerDataType::Folder(_) => DEFAULT_FOLDER_NAME,
		};
		Self {
			id: LayerId::new(),
			name: name.to_string(),
			flags: LayerFlags::default(),
			opacity: 255,
			parent: None,
			data,
		}
	}

	pub fn new_image() -> Self {
		Self::new(LayerDataType::Image(ImageLayer::default()))
	}

	pub fn new_folder() -> Self {
		Self::new(LayerDataType::Folder(FolderLayer::default()))
	}

	pub fn with_name(mut self, name: impl Into<String>) -> Self {
		self.name = name.into();
		self
	}

	/// Used when rebuilding a sprite from a snapshot, where ids must survive the round trip.
	pub fn with_id(mut self, id: LayerId) -> Self {
		self.id = id;
		self
	}

	pub fn with_flags(mut self, flags: LayerFlags) -> Self {
		self.flags = flags;
		self
	}

	pub fn with_opacity(mut self, opacity: u8) -> Self {
		self.opacity = opacity;
		self
	}

	pub fn id(&self) -> LayerId {
		self.id
	}

	pub fn name(&self) -> &str {
		&self.name
	}

	pub fn flags(&self) -> LayerFlags {
		self.flags
	}

	pub fn opacity(&self) -> u8 {
		self.opacity
	}

	pub fn parent(&self) -> Option<LayerId> {
		self.parent
	}

	pub fn is_visible(&self) -> bool {
		self.flags.contains(LayerFlags::VISIBLE)
	}

	pub fn is_editable(&self) -> bool {
		self.flags.contains(LayerFlags::EDITABLE)
	}

	pub fn is_background(&self) -> bool {
		self.flags.contains(LayerFlags::BACKGROUND)
	}

	pub fn is_folder(&self) -> bool {
		matches!(self.data, LayerDataType::Folder(_))
	}

	pub fn is_image(&self) -> bool {
		matches!(self.data, LayerDataType::Image(_))
	}

	pub fn data(&self) -> &LayerDataType {
		&self.data
	}

	pub fn kind(&self) -> LayerDataTypeDiscriminant {
		(&self.data).into()
	}

	pub fn as_image(&self) -> Result<&ImageLayer, DocumentError> {
		match &self.data {
			LayerDataType::Image(image) => Ok(image),
			_ => Err(DocumentError::NotAnImageLayer(self.id)),
		}
	}

	pub(crate) fn as_image_mut(&mut self) -> Result<&mut ImageLayer, DocumentError> {
		match &mut self.data {
			LayerDataType::Image(image) => Ok(image),
			_ => Err(DocumentError::NotAnImageLayer(self.id)),
		}
	}

	pub fn as_folder(&self) -> Result<&FolderLayer, DocumentError> {
		match &self.data {
			LayerDataType::Folder(folder) => Ok(folder),
			_ => Err(DocumentError::NotAFolder(self.id)),
		}
	}

	pub(crate) fn as_folder_mut(&mut self) -> Result<&mut FolderLayer, DocumentError> {
		match &mut self.data {
			LayerDataType::Folder(folder) => Ok(folder),
			_ => Err(DocumentError::NotAFolder(self.id)),
		}
	}

	/// The cels owned directly by this layer. Folders own none, see [Sprite::cels](crate::Sprite::cels) for the recursive version.
	pub fn own_cels(&self) -> &[Cel] {
		match &self.data {
			LayerDataType::Image(image) => image.cels(),
			LayerDataType::Folder(_) => &[],
		}
	}

	/// Memory used by this layer alone, including the images of its cels but not its children.
	pub fn mem_size(&self) -> usize {
		let data = match &self.data {
			LayerDataType::Image(image) => image.mem_size(),
			LayerDataType::Folder(folder) => folder.len() * std::mem::size_of::<LayerId>(),
		};
		std::mem::size_of::<Self>() + self.name.len() + data
	}

	pub(crate) fn set_name(&mut self, name: String) -> String {
		std::mem::replace(&mut self.name, name)
	}

	pub(crate) fn set_flags(&mut self, flags: LayerFlags) -> LayerFlags {
		std::mem::replace(&mut self.flags, flags)
	}

	pub(crate) fn set_opacity(&mut self, opacity: u8) -> u8 {
		std::mem::replace(&mut self.opacity, opacity)
	}

	pub(crate) fn set_parent(&mut self, parent: Option<LayerId>) {
		self.parent = parent;
	}
}

// ============
// LayerSubtree
// ============

/// A layer detached from a sprite together with all of its descendants.
///
/// The first element is the top of the subtree, the rest follow in pre-order. Descendants keep their parent
/// back-references because their folders travel with them, only the top layer's parent is cleared.
#[derive(Debug, Clone)]
pub struct LayerSubtree {
	layers: Vec<Layer>,
}

impl LayerSubtree {
	pub(crate) fn from_layers(layers: Vec<Layer>) -> Self {
		debug_assert!(!layers.is_empty());
		Self { layers }
	}

	pub fn root(&self) -> &Layer {
		&self.layers[0]
	}

	pub fn id(&self) -> LayerId {
		self.root().id()
	}

	pub fn layers(&self) -> &[Layer] {
		&self.layers
	}

	pub fn len(&self) -> usize {
		self.layers.len()
	}

	pub fn is_empty(&self) -> bool {
		self.layers.is_empty()
	}

	pub(crate) fn into_layers(self) -> Vec<Layer> {
		self.layers
	}
}

impl From<Layer> for LayerSubtree {
	fn from(layer: Layer) -> Self {
		Self { layers: vec![layer] }
	}
}
