pub mod color;
pub mod coords;
pub mod ids;
pub mod time;

// Foundation crate: small, well-tested primitives only.
pub use color::*;
pub use coords::*;
pub use ids::*;
pub use time::*;
