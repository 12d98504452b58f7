//! Request extractors: caller identity, list descriptors and validated bodies.

mod auth;
mod query;
mod validated;

pub use auth::{AuthUser, MaybeAuthUser, StaffUser};
pub use query::*;
pub use validated::ValidatedJson;
