//! The concrete [Command](crate::command::Command)s, grouped by the part of the sprite they edit.
//!
//! Commands that replace a cel's image document how they treat images shared by linked cels,
//! see [WritePolicy](image::WritePolicy).

pub mod cel;
pub mod frame;
pub mod image;
pub mod layer;

pub use cel::{AddCel, CelSite, CopyCel, MoveCel, RemoveCel, SetCelOpacity, SetCelPosition};
pub use frame::{AddFrame, DisplaceFrames, RemoveFrame, SetFrameDuration};
pub use image::{ReplaceCelImage, SetPixels, WritePolicy};
pub use layer::{AddLayer, ConfigureAsBackground, RemoveLayer, RenameLayer, SetLayerFlags, SetLayerOpacity, StackLayer};
