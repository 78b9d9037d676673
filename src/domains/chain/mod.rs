pub mod registry;
pub mod types;

pub use registry::{normalize_chain_code, ChainRegistry};
pub use types::ChainConfiguration;
