//! Request handlers.

pub mod analysis;
pub mod health;
pub mod presets;
pub mod upload;

pub use analysis::*;
pub use health::*;
pub use presets::*;
pub use upload::*;
