//! # Layers
//! A sprite consists of a tree of [Layers](layer_info::Layer) rooted in a single folder.
//! There are currently these different types of layers:
//! * [Folder layers](folder_layer::FolderLayer), which encapsulate sub-layers
//! * [Image layers](image_layer::ImageLayer), which hold one [Cel](crate::Cel) per occupied frame
//!
//! ## Stacking order
//! Folders store their children from bottom to top: the first child is drawn first and sits visually at the bottom.
//! The background layer, if there is one, is always the first child of the root folder.

/// Contains the [FolderLayer](folder_layer::FolderLayer) type that encapsulates other layers, including more folders.
pub mod folder_layer;
/// Contains the [ImageLayer](image_layer::ImageLayer) type with its frame-sorted cels.
pub mod image_layer;
/// Contains the base [Layer](layer_info::Layer) type, an abstraction over the different types of layers.
pub mod layer_info;

pub use folder_layer::FolderLayer;
pub use image_layer::ImageLayer;
pub use layer_info::{Layer, LayerDataType, LayerDataTypeDiscriminant, LayerFlags, LayerSubtree};
