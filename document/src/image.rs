use crate::DocumentError;

use glam::UVec2;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PixelFormat {
	/// 8-bit RGBA
	Rgb,
	/// 8-bit value plus 8-bit alpha
	Grayscale,
	/// Palette index
	Indexed,
	Bitmap,
}

impl PixelFormat {
	pub fn bytes_per_pixel(self) -> usize {
		match self {
			PixelFormat::Rgb => 4,
			PixelFormat::Grayscale => 2,
			PixelFormat::Indexed | PixelFormat::Bitmap => 1,
		}
	}
}

impl fmt::Display for PixelFormat {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		match self {
			PixelFormat::Rgb => write!(f, "RGB"),
			PixelFormat::Grayscale => write!(f, "Grayscale"),
			PixelFormat::Indexed => write!(f, "Indexed"),
			PixelFormat::Bitmap => write!(f, "Bitmap"),
		}
	}
}

/// A raster buffer stored row by row.
///
/// Cels hold images behind an `Arc` so several cels can share one buffer. The image itself has no interior
/// mutability; writers either get a unique copy with `Arc::make_mut` or build a new buffer and rebind the cels.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Image {
	format: PixelFormat,
	width: u32,
	height: u32,
	data: Vec<u8>,
}

impl Image {
	/// Creates a fully transparent (zeroed) image.
	pub fn new(format: PixelFormat, width: u32, height: u32) -> Self {
		let len = width as usize * height as usize * format.bytes_per_pixel();
		Self {
			format,
			width,
			height,
			data: vec![0; len],
		}
	}

	pub fn from_data(format: PixelFormat, width: u32, height: u32, data: Vec<u8>) -> Result<Self, DocumentError> {
		let image = Self { format, width, height, data };
		image.check_data()?;
		Ok(image)
	}

	/// Checks that the pixel buffer holds exactly `width * height` pixels, which images read from disk may not.
	pub fn check_data(&self) -> Result<(), DocumentError> {
		let expected = self.width as usize * self.height as usize * self.format.bytes_per_pixel();
		if self.data.len() != expected {
			return Err(DocumentError::InvalidPixelData { expected, found: self.data.len() });
		}
		Ok(())
	}

	pub fn format(&self) -> PixelFormat {
		self.format
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

	pub fn data(&self) -> &[u8] {
		&self.data
	}

	fn offset(&self, x: u32, y: u32) -> Option<usize> {
		(x < self.width && y < self.height).then(|| (y as usize * self.width as usize + x as usize) * self.format.bytes_per_pixel())
	}

	pub fn pixel(&self, x: u32, y: u32) -> Option<&[u8]> {
		let offset = self.offset(x, y)?;
		Some(&self.data[offset..offset + self.format.bytes_per_pixel()])
	}

	pub fn put_pixel(&mut self, x: u32, y: u32, value: &[u8]) -> Result<(), DocumentError> {
		let bpp = self.format.bytes_per_pixel();
		if value.len() != bpp {
			return Err(DocumentError::InvalidPixelData { expected: bpp, found: value.len() });
		}
		let offset = self.offset(x, y).ok_or(DocumentError::RegionOutOfBounds)?;
		self.data[offset..offset + bpp].copy_from_slice(value);
		Ok(())
	}

	fn check_region(&self, origin: UVec2, size: UVec2) -> Result<(), DocumentError> {
		let end = origin.as_u64vec2() + size.as_u64vec2();
		if end.x > self.width as u64 || end.y > self.height as u64 {
			return Err(DocumentError::RegionOutOfBounds);
		}
		Ok(())
	}

	/// Copies the pixels of a rectangular region out of the image.
	pub fn region(&self, origin: UVec2, size: UVec2) -> Result<Vec<u8>, DocumentError> {
		self.check_region(origin, size)?;
		let row_len = size.x as usize * self.format.bytes_per_pixel();
		let mut pixels = Vec::with_capacity(row_len * size.y as usize);
		for y in origin.y..origin.y + size.y {
			if let Some(offset) = self.offset(origin.x, y) {
				pixels.extend_from_slice(&self.data[offset..offset + row_len]);
			}
		}
		Ok(pixels)
	}

	/// Overwrites a rectangular region with row-major `pixels`.
	pub fn put_region(&mut self, origin: UVec2, size: UVec2, pixels: &[u8]) -> Result<(), DocumentError> {
		self.check_region(origin, size)?;
		let row_len = size.x as usize * self.format.bytes_per_pixel();
		let expected = row_len * size.y as usize;
		if pixels.len() != expected {
			return Err(DocumentError::InvalidPixelData { expected, found: pixels.len() });
		}
		if row_len == 0 {
			return Ok(());
		}
		for (row, source) in pixels.chunks_exact(row_len).enumerate() {
			if let Some(offset) = self.offset(origin.x, origin.y + row as u32) {
				self.data[offset..offset + row_len].copy_from_slice(source);
			}
		}
		Ok(())
	}

	pub fn mem_size(&self) -> usize {
		std::mem::size_of::<Self>() + self.data.len()
	}
}
