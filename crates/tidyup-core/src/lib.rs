pub mod actions;
pub mod config;
pub mod listing;
pub mod plan;
pub mod reconcile;
pub mod reducer;
pub mod state;

pub use actions::*;
pub use plan::*;
pub use reducer::*;
pub use state::*;
