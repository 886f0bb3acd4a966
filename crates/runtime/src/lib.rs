pub mod app;
pub mod basemap;
pub mod config;
pub mod engine;
pub mod interaction;
pub mod overlay;
pub mod recording;
pub mod sync;

pub use app::*;
pub use basemap::*;
pub use config::*;
pub use engine::*;
pub use overlay::*;
pub use sync::*;
