//! Constants for Beltline

/// Manifest looked up in the working directory when `--config` is not given
pub const CONFIG_FILE: &str = "beltline.json";

/// Task run when no task is named on the command line
pub const DEFAULT_TASK: &str = "default";

/// Quiet period before queued watch tasks run
pub const DEFAULT_DEBOUNCE_MS: u64 = 200;

/// Console log filter used when `RUST_LOG` is unset
pub const DEFAULT_LOG_FILTER: &str = "info";
