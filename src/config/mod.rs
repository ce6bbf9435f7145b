pub mod constants;
pub mod manifest;

pub use manifest::{Manifest, Step, WatchRule};
