use crate::DocumentError;
use crate::cel::{Cel, FrameIndex};
use crate::consts::SNAPSHOT_VERSION;
use crate::image::{Image, PixelFormat};
use crate::layers::{FolderLayer, ImageLayer, Layer, LayerDataType, LayerFlags};
use crate::sprite::Sprite;
use crate::uuid::LayerId;

use glam::IVec2;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// A self-contained, comparable rendering of a [Sprite].
///
/// Images are stored once in `images` and referenced by index from the cels, so two snapshots are equal only if
/// the same cels share the same buffers. Images are numbered in the order they are first met while walking the
/// layer tree from the bottom up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpriteSnapshot {
	pub version: u32,
	pub pixel_format: PixelFormat,
	pub width: u32,
	pub height: u32,
	pub frame_durations: Vec<u32>,
	pub root: LayerSnapshot,
	pub images: Vec<Image>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayerSnapshot {
	pub id: LayerId,
	pub name: String,
	pub flags: LayerFlags,
	pub opacity: u8,
	pub content: LayerContentSnapshot,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LayerContentSnapshot {
	Image { cels: Vec<CelSnapshot> },
	Folder { layers: Vec<LayerSnapshot> },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CelSnapshot {
	pub frame: FrameIndex,
	/// Index into [SpriteSnapshot::images]
	pub image: usize,
	pub position: IVec2,
	pub opacity: u8,
}

impl SpriteSnapshot {
	pub fn layer_count(&self) -> usize {
		fn count(layer: &LayerSnapshot) -> usize {
			match &layer.content {
				LayerContentSnapshot::Image { .. } => 1,
				LayerContentSnapshot::Folder { layers } => 1 + layers.iter().map(count).sum::<usize>(),
			}
		}
		count(&self.root) - 1
	}
}

#[derive(Default)]
struct ImageTable {
	indices: FxHashMap<*const Image, usize>,
	images: Vec<Image>,
}

impl ImageTable {
	fn index_of(&mut self, image: &Arc<Image>) -> usize {
		*self.indices.entry(Arc::as_ptr(image)).or_insert_with(|| {
			self.images.push(Image::clone(image));
			self.images.len() - 1
		})
	}
}

impl Sprite {
	pub fn snapshot(&self) -> SpriteSnapshot {
		let mut table = ImageTable::default();
		let root = self.snapshot_layer(self.root(), &mut table);

		SpriteSnapshot {
			version: SNAPSHOT_VERSION,
			pixel_format: self.pixel_format(),
			width: self.width(),
			height: self.height(),
			frame_durations: self.frame_durations().to_vec(),
			root,
			images: table.images,
		}
	}

	fn snapshot_layer(&self, id: LayerId, table: &mut ImageTable) -> LayerSnapshot {
		let Ok(layer) = self.layer(id) else {
			unreachable!("folders only reference stored layers");
		};
		let content = match layer.data() {
			LayerDataType::Image(image_layer) => LayerContentSnapshot::Image {
				cels: image_layer
					.cels()
					.iter()
					.map(|cel| CelSnapshot {
						frame: cel.frame(),
						image: table.index_of(cel.image()),
						position: cel.position,
						opacity: cel.opacity,
					})
					.collect(),
			},
			LayerDataType::Folder(folder) => LayerContentSnapshot::Folder {
				layers: folder.layer_ids().iter().map(|&child| self.snapshot_layer(child, table)).collect(),
			},
		};

		LayerSnapshot {
			id,
			name: layer.name().to_string(),
			flags: layer.flags(),
			opacity: layer.opacity(),
			content,
		}
	}

	/// Rebuilds a sprite from a snapshot, keeping its layer ids and image sharing, and validates the result.
	pub fn from_snapshot(snapshot: &SpriteSnapshot) -> Result<Self, DocumentError> {
		if snapshot.version > SNAPSHOT_VERSION {
			return Err(DocumentError::InvariantViolated(format!("unsupported snapshot version {}", snapshot.version)));
		}
		if snapshot.frame_durations.is_empty() {
			return Err(DocumentError::InvariantViolated("the sprite has no frames".to_string()));
		}
		if !matches!(snapshot.root.content, LayerContentSnapshot::Folder { .. }) {
			return Err(DocumentError::NotAFolder(snapshot.root.id));
		}

		for image in &snapshot.images {
			image.check_data()?;
		}

		let images: Vec<Arc<Image>> = snapshot.images.iter().cloned().map(Arc::new).collect();
		let mut layers = FxHashMap::default();
		let root = build_layer(&snapshot.root, None, &images, &mut layers)?;

		let sprite = Sprite::from_parts(snapshot.pixel_format, snapshot.width, snapshot.height, snapshot.frame_durations.clone(), root, layers);
		sprite.validate()?;
		log::debug!("Rebuilt sprite with {} layers and {} images from a snapshot", sprite.layer_count(), images.len());
		Ok(sprite)
	}
}

fn build_layer(snapshot: &LayerSnapshot, parent: Option<LayerId>, images: &[Arc<Image>], layers: &mut FxHashMap<LayerId, Layer>) -> Result<LayerId, DocumentError> {
	let id = snapshot.id;
	if layers.contains_key(&id) {
		return Err(DocumentError::LayerAlreadyAttached(id));
	}

	let data = match &snapshot.content {
		LayerContentSnapshot::Image { cels } => {
			let mut image_layer = ImageLayer::default();
			for cel_snapshot in cels {
				let image = images
					.get(cel_snapshot.image)
					.ok_or_else(|| DocumentError::InvariantViolated(format!("cel at frame {} references missing image {}", cel_snapshot.frame, cel_snapshot.image)))?;
				if image_layer.cel(cel_snapshot.frame).is_some() {
					return Err(DocumentError::DuplicateFrame { layer: id, frame: cel_snapshot.frame });
				}

				let mut cel = Cel::new(cel_snapshot.frame, Arc::clone(image));
				cel.position = cel_snapshot.position;
				cel.opacity = cel_snapshot.opacity;
				cel.set_layer(Some(id));
				image_layer.insert_cel(cel);
			}
			LayerDataType::Image(image_layer)
		}
		LayerContentSnapshot::Folder { layers: children } => {
			// Reserve the id so a child claiming it is caught as a duplicate
			layers.insert(id, Layer::new_folder().with_id(id));
			let mut folder = FolderLayer::default();
			for child in children {
				let child_id = build_layer(child, Some(id), images, layers)?;
				folder.insert_after(child_id, folder.last_layer());
			}
			LayerDataType::Folder(folder)
		}
	};

	let mut layer = Layer::new(data).with_id(id).with_name(snapshot.name.clone()).with_flags(snapshot.flags).with_opacity(snapshot.opacity);
	layer.set_parent(parent);
	layers.insert(id, layer);
	Ok(id)
}
