//! Scoped Dependency Substitution
//!
//! - `SubstitutionRegistry` - Pending replacements keyed by canonical path
//! - `LoadInterceptor` - Load hook enforcing owner scoping and single use
//! - `Mocker` - Orchestrates a mocked load and validates full consumption

mod interceptor;
mod orchestrator;
mod registry;

pub use interceptor::LoadInterceptor;
pub use orchestrator::{MockError, Mocker};
pub use registry::{SubstitutionEntry, SubstitutionRegistry};
