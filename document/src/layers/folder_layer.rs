use crate::uuid::LayerId;

/// A layer that encapsulates other layers, including potentially more folders.
/// The children are stored bottom to top, see the [module documentation](super).
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FolderLayer {
	/// The IDs of the [Layer](super::Layer)s contained within the folder
	layer_ids: Vec<LayerId>,
}

impl FolderLayer {
	pub fn layer_ids(&self) -> &[LayerId] {
		&self.layer_ids
	}

	pub fn len(&self) -> usize {
		self.layer_ids.len()
	}

	pub fn is_empty(&self) -> bool {
		self.layer_ids.is_empty()
	}

	pub fn contains(&self, layer_id: LayerId) -> bool {
		self.layer_ids.contains(&layer_id)
	}

	pub fn position_of(&self, layer_id: LayerId) -> Option<usize> {
		self.layer_ids.iter().position(|id| *id == layer_id)
	}

	/// The bottom-most child.
	pub fn first_layer(&self) -> Option<LayerId> {
		self.layer_ids.first().copied()
	}

	/// The top-most child.
	pub fn last_layer(&self) -> Option<LayerId> {
		self.layer_ids.last().copied()
	}

	/// Inserts directly above `after`, or at the bottom when `after` is `None`. Returns false if `after` is not a child.
	pub(crate) fn insert_after(&mut self, layer_id: LayerId, after: Option<LayerId>) -> bool {
		let index = match after {
			Some(after) => match self.position_of(after) {
				Some(position) => position + 1,
				None => return false,
			},
			None => 0,
		};
		self.layer_ids.insert(index, layer_id);
		true
	}

	pub(crate) fn remove(&mut self, layer_id: LayerId) -> Option<usize> {
		let position = self.position_of(layer_id)?;
		self.layer_ids.remove(position);
		Some(position)
	}
}
