//! Page components.

mod agents;
mod jobs;
mod layout;
mod styles;

pub use agents::*;
pub use jobs::*;
pub use layout::*;
