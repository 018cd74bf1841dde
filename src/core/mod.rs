pub mod cancel;
pub mod config;
pub mod constants;
pub mod engine;
pub mod error;
pub mod playback;
pub mod spectrum;
pub mod surface;

pub use cancel::*;
pub use config::*;
pub use constants::*;
pub use engine::*;
pub use error::*;
pub use playback::*;
pub use spectrum::*;
pub use surface::*;

// Shaders bundled as string constants
pub static CRT_WGSL: &str = include_str!("../../shaders/crt.wgsl");
