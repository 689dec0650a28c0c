use crate::DocumentError;
use crate::cel::{Cel, FrameIndex};
use crate::consts::{BACKGROUND_LAYER_NAME, DEFAULT_FRAME_DURATION, DEFAULT_LAYER_NAME, MAX_FRAME_DURATION, MIN_FRAME_DURATION, ROOT_LAYER_NAME};
use crate::image::{Image, PixelFormat};
use crate::layers::{FolderLayer, ImageLayer, Layer, LayerDataType, LayerFlags, LayerSubtree};
use crate::uuid::LayerId;

use glam::UVec2;
use rustc_hash::{FxHashMap, FxHashSet};
use std::sync::Arc;

/// The root container of the timeline: canvas properties, per-frame durations and the layer tree.
///
/// Layers live in an arena keyed by [LayerId]. The tree structure is described by the folders' child lists
/// and mirrored by each layer's parent back-reference. Every mutating method checks its preconditions first
/// and returns a [DocumentError] without touching anything when one of them does not hold.
#[derive(Debug, Clone)]
pub struct Sprite {
	pixel_format: PixelFormat,
	width: u32,
	height: u32,
	frame_durations: Vec<u32>,
	root: LayerId,
	layers: FxHashMap<LayerId, Layer>,
}

impl Sprite {
	/// Creates a sprite with an empty root folder. A sprite always has at least one frame.
	pub fn new(pixel_format: PixelFormat, width: u32, height: u32, frame_count: usize) -> Self {
		let root = Layer::new_folder().with_name(ROOT_LAYER_NAME);
		let root_id = root.id();
		let mut layers = FxHashMap::default();
		layers.insert(root_id, root);

		Self {
			pixel_format,
			width,
			height,
			frame_durations: vec![DEFAULT_FRAME_DURATION; frame_count.max(1)],
			root: root_id,
			layers,
		}
	}

	/// Creates a sprite with a single image layer holding a blank cel at the first frame.
	pub fn new_with_layer(pixel_format: PixelFormat, width: u32, height: u32, frame_count: usize) -> Result<(Self, LayerId), DocumentError> {
		let mut sprite = Self::new(pixel_format, width, height, frame_count);
		let layer = sprite.add_layer(sprite.root, Layer::new_image().with_name(format!("{DEFAULT_LAYER_NAME} 1")))?;
		sprite.add_cel(layer, Cel::from_image(0, Image::new(pixel_format, width, height)))?;
		Ok((sprite, layer))
	}

	pub(crate) fn from_parts(pixel_format: PixelFormat, width: u32, height: u32, frame_durations: Vec<u32>, root: LayerId, layers: FxHashMap<LayerId, Layer>) -> Self {
		Self {
			pixel_format,
			width,
			height,
			frame_durations,
			root,
			layers,
		}
	}

	// =================
	// Canvas and frames
	// =================

	pub fn pixel_format(&self) -> PixelFormat {
		self.pixel_format
	}

	pub fn width(&self) -> u32 {
		self.width
	}

	pub fn height(&self) -> u32 {
		self.height
	}

	pub fn size(&self) -> UVec2 {
		UVec2::new(self.width, self.height)
	}

	pub fn frame_count(&self) -> usize {
		self.frame_durations.len()
	}

	pub fn last_frame(&self) -> FrameIndex {
		self.frame_durations.len() as FrameIndex - 1
	}

	pub fn frame_duration(&self, frame: FrameIndex) -> Option<u32> {
		usize::try_from(frame).ok().and_then(|index| self.frame_durations.get(index).copied())
	}

	pub fn frame_durations(&self) -> &[u32] {
		&self.frame_durations
	}

	pub fn total_duration(&self) -> u64 {
		self.frame_durations.iter().map(|&duration| duration as u64).sum()
	}

	fn check_frame(&self, frame: FrameIndex) -> Result<(), DocumentError> {
		if (0..=self.last_frame()).contains(&frame) { Ok(()) } else { Err(DocumentError::FrameOutOfRange(frame)) }
	}

	// ======
	// Layers
	// ======

	pub fn root(&self) -> LayerId {
		self.root
	}

	pub fn root_folder(&self) -> &FolderLayer {
		match self.layers.get(&self.root).map(Layer::data) {
			Some(LayerDataType::Folder(folder)) => folder,
			_ => unreachable!("the root layer of a sprite is always a folder"),
		}
	}

	pub fn layer(&self, layer: LayerId) -> Result<&Layer, DocumentError> {
		self.layers.get(&layer).ok_or(DocumentError::LayerNotFound(layer))
	}

	fn layer_mut(&mut self, layer: LayerId) -> Result<&mut Layer, DocumentError> {
		self.layers.get_mut(&layer).ok_or(DocumentError::LayerNotFound(layer))
	}

	pub fn image_layer(&self, layer: LayerId) -> Result<&ImageLayer, DocumentError> {
		self.layer(layer)?.as_image()
	}

	fn image_layer_mut(&mut self, layer: LayerId) -> Result<&mut ImageLayer, DocumentError> {
		self.layer_mut(layer)?.as_image_mut()
	}

	pub fn folder(&self, layer: LayerId) -> Result<&FolderLayer, DocumentError> {
		self.layer(layer)?.as_folder()
	}

	fn folder_mut(&mut self, layer: LayerId) -> Result<&mut FolderLayer, DocumentError> {
		self.layer_mut(layer)?.as_folder_mut()
	}

	pub fn contains_layer(&self, layer: LayerId) -> bool {
		self.layers.contains_key(&layer)
	}

	/// Number of layers in the tree, not counting the root folder.
	pub fn layer_count(&self) -> usize {
		self.layers.len() - 1
	}

	/// The layer and all of its descendants in pre-order, children visited bottom to top.
	pub fn descendants(&self, layer: LayerId) -> Result<Vec<LayerId>, DocumentError> {
		let mut result = Vec::new();
		let mut stack = vec![layer];
		while let Some(id) = stack.pop() {
			let current = self.layer(id)?;
			result.push(id);
			if let LayerDataType::Folder(folder) = current.data() {
				stack.extend(folder.layer_ids().iter().rev());
			}
		}
		Ok(result)
	}

	/// Every layer except the root, folders before their contents, from the bottom of the stack to the top.
	pub fn layers_in_stack_order(&self) -> Vec<LayerId> {
		self.descendants(self.root).map(|mut layers| layers.split_off(1)).unwrap_or_default()
	}

	/// The image layers at or below `layer`, which is `layer` itself when it is an image layer.
	pub fn image_layers(&self, layer: LayerId) -> Result<Vec<LayerId>, DocumentError> {
		Ok(self.descendants(layer)?.into_iter().filter(|id| self.layers.get(id).is_some_and(Layer::is_image)).collect())
	}

	/// The sibling directly below `layer`.
	pub fn previous_sibling(&self, layer: LayerId) -> Option<LayerId> {
		let siblings = self.folder(self.layers.get(&layer)?.parent()?).ok()?;
		let position = siblings.position_of(layer)?;
		position.checked_sub(1).map(|index| siblings.layer_ids()[index])
	}

	/// The sibling directly above `layer`.
	pub fn next_sibling(&self, layer: LayerId) -> Option<LayerId> {
		let siblings = self.folder(self.layers.get(&layer)?.parent()?).ok()?;
		let position = siblings.position_of(layer)?;
		siblings.layer_ids().get(position + 1).copied()
	}

	pub fn background_layer(&self) -> Option<LayerId> {
		self.root_folder().first_layer().filter(|id| self.layers.get(id).is_some_and(Layer::is_background))
	}

	/// Adds a layer on top of the children of `parent`.
	pub fn add_layer(&mut self, parent: LayerId, layer: Layer) -> Result<LayerId, DocumentError> {
		let after = self.folder(parent)?.last_layer();
		self.insert_layer(parent, layer.into(), after)
	}

	/// Attaches a detached subtree to `parent`, directly above `after` or at the bottom when `after` is `None`.
	pub fn insert_layer(&mut self, parent: LayerId, subtree: LayerSubtree, after: Option<LayerId>) -> Result<LayerId, DocumentError> {
		let folder = self.folder(parent)?;
		if let Some(after) = after {
			if !folder.contains(after) {
				return Err(DocumentError::NotAChild { layer: after, folder: parent });
			}
		}

		let mut incoming = FxHashSet::default();
		for layer in subtree.layers() {
			if self.layers.contains_key(&layer.id()) || !incoming.insert(layer.id()) {
				return Err(DocumentError::LayerAlreadyAttached(layer.id()));
			}
			for cel in layer.own_cels() {
				self.check_frame(cel.frame())?;
				self.check_format(cel.image())?;
			}
		}

		let top = subtree.root();
		if let Some(background) = subtree.layers()[1..].iter().find(|layer| layer.is_background()) {
			return Err(DocumentError::InvalidBackground(background.id()));
		}
		if top.is_background() {
			if !top.is_image() {
				return Err(DocumentError::InvalidBackground(top.id()));
			}
			if self.background_layer().is_some() {
				return Err(DocumentError::BackgroundAlreadyExists);
			}
			if parent != self.root || after.is_some() {
				return Err(DocumentError::BackgroundMustStayAtBottom);
			}
		} else if parent == self.root && after.is_none() && self.background_layer().is_some() {
			return Err(DocumentError::BackgroundMustStayAtBottom);
		}

		let id = subtree.id();
		for mut layer in subtree.into_layers() {
			if layer.id() == id {
				layer.set_parent(Some(parent));
			}
			self.layers.insert(layer.id(), layer);
		}
		self.folder_mut(parent)?.insert_after(id, after);

		log::trace!("Inserted layer {id} into folder {parent}");
		Ok(id)
	}

	/// Detaches a layer and all of its descendants from the sprite.
	pub fn remove_layer(&mut self, layer: LayerId) -> Result<LayerSubtree, DocumentError> {
		if layer == self.root {
			return Err(DocumentError::RootLayer);
		}
		let ids = self.descendants(layer)?;
		let parent = self.layer(layer)?.parent().ok_or(DocumentError::LayerNotFound(layer))?;

		self.folder_mut(parent)?.remove(layer);
		let mut layers = Vec::with_capacity(ids.len());
		for id in ids {
			if let Some(mut removed) = self.layers.remove(&id) {
				if id == layer {
					removed.set_parent(None);
				}
				layers.push(removed);
			}
		}

		log::trace!("Removed layer {layer} ({} layers) from folder {parent}", layers.len());
		Ok(LayerSubtree::from_layers(layers))
	}

	/// Restacks a layer among its siblings, directly above `after` or at the bottom when `after` is `None`.
	pub fn stack_layer(&mut self, layer: LayerId, after: Option<LayerId>) -> Result<(), DocumentError> {
		if layer == self.root {
			return Err(DocumentError::RootLayer);
		}
		if after == Some(layer) {
			return Err(DocumentError::CannotStackOnItself);
		}
		let moving = self.layer(layer)?;
		let parent = moving.parent().ok_or(DocumentError::LayerNotFound(layer))?;
		if let Some(after) = after {
			if !self.folder(parent)?.contains(after) {
				return Err(DocumentError::NotAChild { layer: after, folder: parent });
			}
		}

		if moving.is_background() {
			if after.is_some() {
				return Err(DocumentError::BackgroundMustStayAtBottom);
			}
		} else if parent == self.root && after.is_none() && self.background_layer().is_some() {
			return Err(DocumentError::BackgroundMustStayAtBottom);
		}

		let folder = self.folder_mut(parent)?;
		folder.remove(layer);
		folder.insert_after(layer, after);
		Ok(())
	}

	/// Turns a direct child of the root into the background layer: stacked at the bottom, move-locked and renamed.
	pub fn configure_as_background(&mut self, layer: LayerId) -> Result<(), DocumentError> {
		if self.background_layer().is_some() {
			return Err(DocumentError::BackgroundAlreadyExists);
		}
		let target = self.layer(layer)?;
		if !target.is_image() || target.parent() != Some(self.root) {
			return Err(DocumentError::InvalidBackground(layer));
		}

		let root = self.root;
		let folder = self.folder_mut(root)?;
		folder.remove(layer);
		folder.insert_after(layer, None);

		let target = self.layer_mut(layer)?;
		let flags = target.flags() | LayerFlags::BACKGROUND_LAYER_FLAGS;
		target.set_flags(flags);
		target.set_name(BACKGROUND_LAYER_NAME.to_string());
		Ok(())
	}

	/// Turns the background layer back into a regular layer, leaving it where it is.
	pub fn clear_background(&mut self, layer: LayerId) -> Result<(), DocumentError> {
		let target = self.layer_mut(layer)?;
		if !target.is_background() {
			return Err(DocumentError::InvalidBackground(layer));
		}
		let flags = target.flags() - LayerFlags::BACKGROUND_LAYER_FLAGS;
		target.set_flags(flags);
		Ok(())
	}

	pub fn set_layer_name(&mut self, layer: LayerId, name: impl Into<String>) -> Result<String, DocumentError> {
		Ok(self.layer_mut(layer)?.set_name(name.into()))
	}

	/// Replaces the flags of a layer, returning the old ones. The background flag is only changed by
	/// [configure_as_background](Self::configure_as_background) and [clear_background](Self::clear_background).
	pub fn set_layer_flags(&mut self, layer: LayerId, flags: LayerFlags) -> Result<LayerFlags, DocumentError> {
		let target = self.layer_mut(layer)?;
		if target.flags().contains(LayerFlags::BACKGROUND) != flags.contains(LayerFlags::BACKGROUND) {
			return Err(DocumentError::InvalidBackground(layer));
		}
		Ok(target.set_flags(flags))
	}

	pub fn set_layer_opacity(&mut self, layer: LayerId, opacity: u8) -> Result<u8, DocumentError> {
		Ok(self.layer_mut(layer)?.set_opacity(opacity))
	}

	// ====
	// Cels
	// ====

	fn check_format(&self, image: &Image) -> Result<(), DocumentError> {
		if image.format() != self.pixel_format {
			return Err(DocumentError::PixelFormatMismatch {
				expected: self.pixel_format,
				found: image.format(),
			});
		}
		Ok(())
	}

	/// The cel of `layer` at exactly `frame`. Folders and unknown layers have no cels.
	pub fn find_cel(&self, layer: LayerId, frame: FrameIndex) -> Option<&Cel> {
		self.layers.get(&layer)?.as_image().ok()?.cel(frame)
	}

	/// Index of the first cel of `layer` whose frame is strictly greater than `frame`.
	pub fn first_cel_after(&self, layer: LayerId, frame: FrameIndex) -> Result<usize, DocumentError> {
		Ok(self.image_layer(layer)?.first_cel_after(frame))
	}

	pub fn add_cel(&mut self, layer: LayerId, mut cel: Cel) -> Result<(), DocumentError> {
		let image_layer = self.image_layer(layer)?;
		self.check_frame(cel.frame())?;
		self.check_format(cel.image())?;
		if image_layer.cel(cel.frame()).is_some() {
			return Err(DocumentError::DuplicateFrame { layer, frame: cel.frame() });
		}

		cel.set_layer(Some(layer));
		self.image_layer_mut(layer)?.insert_cel(cel);
		Ok(())
	}

	pub fn remove_cel(&mut self, layer: LayerId, frame: FrameIndex) -> Result<Cel, DocumentError> {
		let mut cel = self.image_layer_mut(layer)?.remove_cel(frame).ok_or(DocumentError::CelNotFound { layer, frame })?;
		cel.set_layer(None);
		Ok(cel)
	}

	/// Moves a cel to another frame of the same layer. An occupied destination is rejected.
	pub fn move_cel(&mut self, layer: LayerId, frame: FrameIndex, new_frame: FrameIndex) -> Result<(), DocumentError> {
		let image_layer = self.image_layer(layer)?;
		if image_layer.cel(frame).is_none() {
			return Err(DocumentError::CelNotFound { layer, frame });
		}
		self.check_frame(new_frame)?;
		if frame == new_frame {
			return Ok(());
		}
		if image_layer.cel(new_frame).is_some() {
			return Err(DocumentError::DuplicateFrame { layer, frame: new_frame });
		}

		let image_layer = self.image_layer_mut(layer)?;
		if let Some(mut cel) = image_layer.remove_cel(frame) {
			cel.set_frame(new_frame);
			image_layer.insert_cel(cel);
		}
		Ok(())
	}

	/// Mutable access to a cel's display attributes.
	pub fn cel_mut(&mut self, layer: LayerId, frame: FrameIndex) -> Result<&mut Cel, DocumentError> {
		self.image_layer_mut(layer)?.cel_mut(frame).ok_or(DocumentError::CelNotFound { layer, frame })
	}

	/// Points a cel at another image and returns the previous one.
	pub fn replace_cel_image(&mut self, layer: LayerId, frame: FrameIndex, image: Arc<Image>) -> Result<Arc<Image>, DocumentError> {
		self.check_format(&image)?;
		let cel = self.cel_mut(layer, frame)?;
		Ok(cel.replace_image(image))
	}

	/// The cels of an image layer, or of every image layer below a folder, in stack order.
	pub fn cels(&self, layer: LayerId) -> Result<Vec<&Cel>, DocumentError> {
		let mut cels = Vec::new();
		for id in self.image_layers(layer)? {
			cels.extend(self.image_layer(id)?.cels());
		}
		Ok(cels)
	}

	/// Every cel of the sprite sharing its image with the cel of `layer` at `frame`, that cel included.
	pub fn linked_cels(&self, layer: LayerId, frame: FrameIndex) -> Result<Vec<(LayerId, FrameIndex)>, DocumentError> {
		let image = self.find_cel(layer, frame).ok_or(DocumentError::CelNotFound { layer, frame })?.image();
		let linked = self
			.cels(self.root)?
			.into_iter()
			.filter(|cel| Arc::ptr_eq(cel.image(), image))
			.filter_map(|cel| Some((cel.layer()?, cel.frame())))
			.collect();
		Ok(linked)
	}

	/// Shifts every cel at or after `from` by `delta` frames, in `layer` and, for folders, in all of its descendants.
	///
	/// The displacement is checked as a whole before any cel moves: destinations must stay within the frame range,
	/// and must not land on a cel that is not itself being displaced.
	pub fn displace_frames(&mut self, layer: LayerId, from: FrameIndex, delta: FrameIndex) -> Result<(), DocumentError> {
		let targets = self.image_layers(layer)?;
		if delta == 0 {
			return Ok(());
		}

		let last_frame = self.last_frame();
		for &target in &targets {
			let image_layer = self.image_layer(target)?;
			for frame in image_layer.frames_from(from) {
				let destination = frame.checked_add(delta).ok_or(DocumentError::FrameOutOfRange(frame))?;
				if !(0..=last_frame).contains(&destination) {
					return Err(DocumentError::FrameOutOfRange(destination));
				}
				if destination < from && image_layer.cel(destination).is_some() {
					return Err(DocumentError::DuplicateFrame { layer: target, frame: destination });
				}
			}
		}

		for target in targets {
			let image_layer = self.image_layer_mut(target)?;
			let mut frames = image_layer.frames_from(from);
			// Move the cels furthest along the direction of travel first so no destination is still occupied
			if delta > 0 {
				frames.reverse();
			}
			for frame in frames {
				if let Some(mut cel) = image_layer.remove_cel(frame) {
					cel.set_frame(frame + delta);
					image_layer.insert_cel(cel);
				}
			}
		}

		log::trace!("Displaced frames of layer {layer} from {from} by {delta}");
		Ok(())
	}

	// ================
	// Frame operations
	// ================

	/// Inserts a frame at `at`, pushing every cel at or after it one frame later.
	pub fn add_frame(&mut self, at: FrameIndex, duration: u32) -> Result<(), DocumentError> {
		let index = usize::try_from(at).ok().filter(|&index| index <= self.frame_durations.len()).ok_or(DocumentError::FrameOutOfRange(at))?;

		self.frame_durations.insert(index, duration.clamp(MIN_FRAME_DURATION, MAX_FRAME_DURATION));
		if let Err(error) = self.displace_frames(self.root, at, 1) {
			self.frame_durations.remove(index);
			return Err(error);
		}
		Ok(())
	}

	/// Removes an empty frame, pulling every later cel one frame earlier. Returns the removed frame's duration.
	pub fn remove_frame(&mut self, at: FrameIndex) -> Result<u32, DocumentError> {
		self.check_frame(at)?;
		if self.frame_durations.len() <= 1 {
			return Err(DocumentError::LastFrame);
		}
		if self.cels(self.root)?.iter().any(|cel| cel.frame() == at) {
			return Err(DocumentError::FrameNotEmpty(at));
		}

		self.displace_frames(self.root, at + 1, -1)?;
		Ok(self.frame_durations.remove(at as usize))
	}

	/// Sets the duration of a frame in milliseconds and returns the previous one.
	pub fn set_frame_duration(&mut self, frame: FrameIndex, duration: u32) -> Result<u32, DocumentError> {
		self.check_frame(frame)?;
		let slot = &mut self.frame_durations[frame as usize];
		Ok(std::mem::replace(slot, duration.clamp(MIN_FRAME_DURATION, MAX_FRAME_DURATION)))
	}

	// ===========
	// Diagnostics
	// ===========

	/// Memory used by a layer and everything below it. Images shared by several cels are counted once per cel.
	pub fn layer_mem_size(&self, layer: LayerId) -> Result<usize, DocumentError> {
		self.descendants(layer)?.into_iter().map(|id| self.layer(id).map(Layer::mem_size)).sum()
	}

	pub fn mem_size(&self) -> usize {
		std::mem::size_of::<Self>() + self.frame_durations.len() * std::mem::size_of::<u32>() + self.layers.values().map(Layer::mem_size).sum::<usize>()
	}

	/// Checks every structural invariant of the timeline.
	pub fn validate(&self) -> Result<(), DocumentError> {
		let violation = |message: String| Err(DocumentError::InvariantViolated(message));

		if self.frame_durations.is_empty() {
			return violation("the sprite has no frames".to_string());
		}
		let Some(root) = self.layers.get(&self.root) else {
			return violation(format!("root layer {} is missing", self.root));
		};
		if !root.is_folder() || root.parent().is_some() {
			return violation("the root layer must be a folder without a parent".to_string());
		}

		let mut visited = FxHashSet::default();
		let mut stack = vec![self.root];
		let mut backgrounds = Vec::new();
		while let Some(id) = stack.pop() {
			if !visited.insert(id) {
				return violation(format!("layer {id} is reachable more than once"));
			}
			let Some(layer) = self.layers.get(&id) else {
				return violation(format!("layer {id} is referenced but not stored"));
			};
			if layer.is_background() {
				backgrounds.push(id);
			}

			match layer.data() {
				LayerDataType::Folder(folder) => {
					for &child in folder.layer_ids() {
						match self.layers.get(&child) {
							Some(child_layer) if child_layer.parent() == Some(id) => stack.push(child),
							Some(_) => return violation(format!("layer {child} does not point back to its folder {id}")),
							None => return violation(format!("folder {id} contains missing layer {child}")),
						}
					}
				}
				LayerDataType::Image(image_layer) => {
					let mut previous = None;
					for cel in image_layer.cels() {
						if previous.is_some_and(|previous| previous >= cel.frame()) {
							return violation(format!("cels of layer {id} are not strictly sorted by frame"));
						}
						previous = Some(cel.frame());
						if cel.layer() != Some(id) {
							return violation(format!("cel at frame {} does not point back to layer {id}", cel.frame()));
						}
						if self.check_frame(cel.frame()).is_err() {
							return violation(format!("cel of layer {id} is at frame {} outside of the sprite", cel.frame()));
						}
						if self.check_format(cel.image()).is_err() {
							return violation(format!("cel of layer {id} at frame {} has format {}", cel.frame(), cel.image().format()));
						}
						if let Err(error) = cel.image().check_data() {
							return violation(format!("image of the cel of layer {id} at frame {}: {error}", cel.frame()));
						}
					}
				}
			}
		}

		if visited.len() != self.layers.len() {
			return violation(format!("{} stored layers are not reachable from the root", self.layers.len() - visited.len()));
		}
		match backgrounds.as_slice() {
			[] => {}
			[background] => {
				let layer = &self.layers[background];
				if !layer.is_image() || self.root_folder().first_layer() != Some(*background) {
					return violation(format!("background layer {background} must be an image layer at the bottom of the root folder"));
				}
			}
			_ => return violation(format!("the sprite has {} background layers", backgrounds.len())),
		}
		Ok(())
	}
}
