mod conflict;
mod errors;
mod projection;

pub mod prelude {
    pub use crate::conflict::{ConflictReason, ConflictTracker};
    pub use crate::errors::{MempoolError, MempoolResult};
    pub use crate::projection::MempoolProjection;
}

pub use prelude::*;
