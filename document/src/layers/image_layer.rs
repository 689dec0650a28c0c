use crate::cel::{Cel, FrameIndex};

/// A layer holding raster content, one [Cel] per occupied frame.
///
/// Cels are kept sorted by strictly increasing frame so every lookup is a binary search.
/// Insertion and removal go through the [Sprite](crate::Sprite), which checks the preconditions and maintains
/// the cels' back-references.
#[derive(Debug, Clone, Default)]
pub struct ImageLayer {
	cels: Vec<Cel>,
}

impl ImageLayer {
	pub fn cels(&self) -> &[Cel] {
		&self.cels
	}

	pub fn len(&self) -> usize {
		self.cels.len()
	}

	pub fn is_empty(&self) -> bool {
		self.cels.is_empty()
	}

	/// Index of the cel at exactly `frame`.
	pub fn find_cel_index(&self, frame: FrameIndex) -> Option<usize> {
		self.cels.binary_search_by_key(&frame, Cel::frame).ok()
	}

	/// Index of the first cel whose frame is strictly greater than `frame`, which is where a cel for `frame` is inserted.
	pub fn first_cel_after(&self, frame: FrameIndex) -> usize {
		self.cels.partition_point(|cel| cel.frame() <= frame)
	}

	pub fn cel(&self, frame: FrameIndex) -> Option<&Cel> {
		self.find_cel_index(frame).map(|index| &self.cels[index])
	}

	pub(crate) fn cel_mut(&mut self, frame: FrameIndex) -> Option<&mut Cel> {
		self.find_cel_index(frame).map(move |index| &mut self.cels[index])
	}

	pub fn last_cel(&self) -> Option<&Cel> {
		self.cels.last()
	}

	/// Frames of the cels at or after `from`, in increasing order.
	pub fn frames_from(&self, from: FrameIndex) -> Vec<FrameIndex> {
		let start = self.cels.partition_point(|cel| cel.frame() < from);
		self.cels[start..].iter().map(Cel::frame).collect()
	}

	/// The caller guarantees that no cel exists at `cel.frame()`.
	pub(crate) fn insert_cel(&mut self, cel: Cel) {
		debug_assert!(self.find_cel_index(cel.frame()).is_none());
		let index = self.first_cel_after(cel.frame());
		self.cels.insert(index, cel);
	}

	pub(crate) fn remove_cel(&mut self, frame: FrameIndex) -> Option<Cel> {
		let index = self.find_cel_index(frame)?;
		Some(self.cels.remove(index))
	}

	pub fn mem_size(&self) -> usize {
		std::mem::size_of::<Self>() + self.cels.iter().map(|cel| cel.mem_size() + cel.image().mem_size()).sum::<usize>()
	}
}
