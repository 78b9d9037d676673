pub mod cache;
pub mod fallback;
pub mod repository;
pub mod service;
pub mod types;

pub use cache::ValidationCache;
pub use repository::{ReferenceRepository, SqlReferenceRepository};
pub use service::ReferenceValidator;
pub use types::{BillingCodes, CachedScalar, DegradedEvent, DrugStatus, ScalarKey, ScalarLookup, SetKey};
