pub mod generator;
pub mod network;
pub mod storage;
pub mod types;

pub use generator::*;
pub use network::*;
pub use storage::*;
pub use types::*;
