//! The timeline model of a Celwork sprite: a tree of layers, the cels binding image layers to frames and the
//! images they display.
//!
//! Every operation in this crate is a single, checked mutation. Grouping them into reversible edits is the job of
//! the editor crate, which builds its commands on top of these primitives.

pub mod cel;
pub mod consts;
pub mod error;
pub mod image;
pub mod layers;
pub mod snapshot;
pub mod sprite;
pub mod uuid;

pub use cel::{Cel, FrameIndex};
pub use error::DocumentError;
pub use image::{Image, PixelFormat};
pub use layers::{FolderLayer, ImageLayer, Layer, LayerDataType, LayerDataTypeDiscriminant, LayerFlags, LayerSubtree};
pub use snapshot::{CelSnapshot, LayerContentSnapshot, LayerSnapshot, SpriteSnapshot};
pub use sprite::Sprite;
pub use uuid::LayerId;
