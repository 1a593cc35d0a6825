pub mod extract;
pub mod metrics;
pub mod snapshot;

pub use extract::*;
pub use metrics::*;
pub use snapshot::*;
