pub mod advisor;
pub mod apply;
pub mod error;
pub mod snapshot;

pub use advisor::*;
pub use apply::*;
pub use error::*;
pub use snapshot::*;
