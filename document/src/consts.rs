// LAYER NAMES
pub const ROOT_LAYER_NAME: &str = "Root";
pub const DEFAULT_LAYER_NAME: &str = "Layer";
pub const DEFAULT_FOLDER_NAME: &str = "Layer Set";
pub const BACKGROUND_LAYER_NAME: &str = "Background";

// TIMELINE
pub const DEFAULT_FRAME_DURATION: u32 = 100; // milliseconds
pub const MIN_FRAME_DURATION: u32 = 1;
pub const MAX_FRAME_DURATION: u32 = 65535;

// SNAPSHOTS
pub const SNAPSHOT_VERSION: u32 = 1;
