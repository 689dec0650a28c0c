use crate::command::Command;
use crate::error::EditorError;

use celwork_document::{Layer, LayerFlags, LayerId, LayerSubtree, Sprite};

// ========
// AddLayer
// ========

/// Attaches a new layer, or a whole detached subtree, to a folder.
#[derive(Debug)]
pub struct AddLayer {
	parent: LayerId,
	id: LayerId,
	/// `None` places the layer on top of its new siblings.
	after: Option<Option<LayerId>>,
	pending: Option<LayerSubtree>,
}

impl AddLayer {
	/// Adds the layer on top of the children of `parent`.
	pub fn new(parent: LayerId, layer: impl Into<LayerSubtree>) -> Self {
		let subtree = layer.into();
		Self {
			parent,
			id: subtree.id(),
			after: None,
			pending: Some(subtree),
		}
	}

	/// Adds the layer directly above `after`, or at the bottom when `after` is `None`.
	pub fn above(parent: LayerId, layer: impl Into<LayerSubtree>, after: Option<LayerId>) -> Self {
		Self { after: Some(after), ..Self::new(parent, layer) }
	}

	pub fn layer_id(&self) -> LayerId {
		self.id
	}
}

impl Command for AddLayer {
	fn name(&self) -> &'static str {
		"Add Layer"
	}

	fn execute(&mut self, sprite: &mut Sprite) -> Result<(), EditorError> {
		let subtree = self.pending.as_ref().ok_or_else(|| EditorError::OperationFailed(format!("Layer {} was already added", self.id)))?;
		let after = match self.after {
			Some(after) => after,
			None => sprite.folder(self.parent)?.last_layer(),
		};
		sprite.insert_layer(self.parent, subtree.clone(), after)?;
		self.pending = None;
		Ok(())
	}

	fn undo(&mut self, sprite: &mut Sprite) -> Result<(), EditorError> {
		if self.pending.is_some() {
			return Err(EditorError::NotExecuted);
		}
		self.pending = Some(sprite.remove_layer(self.id)?);
		Ok(())
	}

	fn mem_size(&self) -> usize {
		std::mem::size_of::<Self>() + self.pending.iter().flat_map(LayerSubtree::layers).map(Layer::mem_size).sum::<usize>()
	}
}

// ===========
// RemoveLayer
// ===========

/// Detaches a layer and its descendants. Undo puts the subtree back at the same position with the same ids.
#[derive(Debug)]
pub struct RemoveLayer {
	layer: LayerId,
	placement: Option<(LayerId, Option<LayerId>)>,
	removed: Option<LayerSubtree>,
}

impl RemoveLayer {
	pub fn new(layer: LayerId) -> Self {
		Self { layer, placement: None, removed: None }
	}
}

impl Command for RemoveLayer {
	fn name(&self) -> &'static str {
		"Remove Layer"
	}

	fn execute(&mut self, sprite: &mut Sprite) -> Result<(), EditorError> {
		let parent = sprite.layer(self.layer)?.parent();
		let after = sprite.previous_sibling(self.layer);
		let removed = sprite.remove_layer(self.layer)?;

		self.placement = parent.map(|parent| (parent, after));
		self.removed = Some(removed);
		Ok(())
	}

	fn undo(&mut self, sprite: &mut Sprite) -> Result<(), EditorError> {
		let (Some((parent, after)), Some(removed)) = (self.placement, &self.removed) else {
			return Err(EditorError::NotExecuted);
		};
		sprite.insert_layer(parent, removed.clone(), after)?;
		self.removed = None;
		Ok(())
	}

	fn mem_size(&self) -> usize {
		std::mem::size_of::<Self>() + self.removed.iter().flat_map(LayerSubtree::layers).map(Layer::mem_size).sum::<usize>()
	}
}

// ===========
// RenameLayer
// ===========

#[derive(Debug)]
pub struct RenameLayer {
	layer: LayerId,
	name: String,
}

impl RenameLayer {
	pub fn new(layer: LayerId, name: impl Into<String>) -> Self {
		Self { layer, name: name.into() }
	}

	fn swap(&mut self, sprite: &mut Sprite) -> Result<(), EditorError> {
		let name = std::mem::take(&mut self.name);
		match sprite.set_layer_name(self.layer, name.clone()) {
			Ok(previous) => self.name = previous,
			Err(error) => {
				self.name = name;
				return Err(error.into());
			}
		}
		Ok(())
	}
}

impl Command for RenameLayer {
	fn name(&self) -> &'static str {
		"Rename Layer"
	}

	// Both directions swap the stored name with the layer's
	fn execute(&mut self, sprite: &mut Sprite) -> Result<(), EditorError> {
		self.swap(sprite)
	}

	fn undo(&mut self, sprite: &mut Sprite) -> Result<(), EditorError> {
		self.swap(sprite)
	}

	fn mem_size(&self) -> usize {
		std::mem::size_of::<Self>() + self.name.len()
	}
}

// =============
// SetLayerFlags
// =============

#[derive(Debug)]
pub struct SetLayerFlags {
	layer: LayerId,
	flags: LayerFlags,
	previous: Option<LayerFlags>,
}

impl SetLayerFlags {
	pub fn new(layer: LayerId, flags: LayerFlags) -> Self {
		Self { layer, flags, previous: None }
	}
}

impl Command for SetLayerFlags {
	fn name(&self) -> &'static str {
		"Set Layer Flags"
	}

	fn execute(&mut self, sprite: &mut Sprite) -> Result<(), EditorError> {
		self.previous = Some(sprite.set_layer_flags(self.layer, self.flags)?);
		Ok(())
	}

	fn undo(&mut self, sprite: &mut Sprite) -> Result<(), EditorError> {
		let previous = self.previous.ok_or(EditorError::NotExecuted)?;
		sprite.set_layer_flags(self.layer, previous)?;
		self.previous = None;
		Ok(())
	}
}

// ===============
// SetLayerOpacity
// ===============

#[derive(Debug)]
pub struct SetLayerOpacity {
	layer: LayerId,
	opacity: u8,
	previous: Option<u8>,
}

impl SetLayerOpacity {
	pub fn new(layer: LayerId, opacity: u8) -> Self {
		Self { layer, opacity, previous: None }
	}
}

impl Command for SetLayerOpacity {
	fn name(&self) -> &'static str {
		"Set Layer Opacity"
	}

	fn execute(&mut self, sprite: &mut Sprite) -> Result<(), EditorError> {
		self.previous = Some(sprite.set_layer_opacity(self.layer, self.opacity)?);
		Ok(())
	}

	fn undo(&mut self, sprite: &mut Sprite) -> Result<(), EditorError> {
		let previous = self.previous.ok_or(EditorError::NotExecuted)?;
		sprite.set_layer_opacity(self.layer, previous)?;
		self.previous = None;
		Ok(())
	}
}

// ==========
// StackLayer
// ==========

/// Restacks a layer among its siblings, directly above `after` or at the bottom when `after` is `None`.
#[derive(Debug)]
pub struct StackLayer {
	layer: LayerId,
	after: Option<LayerId>,
	previous: Option<Option<LayerId>>,
}

impl StackLayer {
	pub fn new(layer: LayerId, after: Option<LayerId>) -> Self {
		Self { layer, after, previous: None }
	}
}

impl Command for StackLayer {
	fn name(&self) -> &'static str {
		"Stack Layer"
	}

	fn execute(&mut self, sprite: &mut Sprite) -> Result<(), EditorError> {
		let previous = sprite.previous_sibling(self.layer);
		sprite.stack_layer(self.layer, self.after)?;
		self.previous = Some(previous);
		Ok(())
	}

	fn undo(&mut self, sprite: &mut Sprite) -> Result<(), EditorError> {
		let previous = self.previous.ok_or(EditorError::NotExecuted)?;
		sprite.stack_layer(self.layer, previous)?;
		self.previous = None;
		Ok(())
	}
}

// =====================
// ConfigureAsBackground
// =====================

#[derive(Debug)]
struct LayerState {
	name: String,
	flags: LayerFlags,
	after: Option<LayerId>,
}

/// Turns a layer into the sprite's background: moved to the bottom of the root, move-locked and renamed.
#[derive(Debug)]
pub struct ConfigureAsBackground {
	layer: LayerId,
	previous: Option<LayerState>,
}

impl ConfigureAsBackground {
	pub fn new(layer: LayerId) -> Self {
		Self { layer, previous: None }
	}
}

impl Command for ConfigureAsBackground {
	fn name(&self) -> &'static str {
		"Configure as Background"
	}

	fn execute(&mut self, sprite: &mut Sprite) -> Result<(), EditorError> {
		let layer = sprite.layer(self.layer)?;
		let state = LayerState {
			name: layer.name().to_string(),
			flags: layer.flags(),
			after: sprite.previous_sibling(self.layer),
		};
		sprite.configure_as_background(self.layer)?;
		self.previous = Some(state);
		Ok(())
	}

	fn undo(&mut self, sprite: &mut Sprite) -> Result<(), EditorError> {
		let state = self.previous.take().ok_or(EditorError::NotExecuted)?;
		sprite.clear_background(self.layer)?;
		sprite.set_layer_flags(self.layer, state.flags)?;
		sprite.set_layer_name(self.layer, state.name)?;
		sprite.stack_layer(self.layer, state.after)?;
		Ok(())
	}
}
