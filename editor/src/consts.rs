// UNDO HISTORY
pub const MAX_UNDO_HISTORY_LEN: usize = 100;

// DATA RECOVERY
pub const RECOVERY_PID_FILE_NAME: &str = "pid";
pub const RECOVERY_VERSION_FILE_NAME: &str = "ver";
pub const RECOVERY_SPRITE_FILE_NAME: &str = "sprite.json";
pub const RECOVERY_INFO_FILE_NAME: &str = "info.json";
pub const RECOVERED_FILENAME_SUFFIX: &str = "-Recovered";

// PREFERENCES
pub const PREFERENCES_FILE_NAME: &str = "preferences.ron";

pub const CELWORK_VERSION: &str = env!("CARGO_PKG_VERSION");
