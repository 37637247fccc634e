//! Authentication and authorization for the helpdesk API
//!
//! Token issuance lives in an external identity service; this module only
//! validates bearer tokens and turns them into an [`AuthUser`], plus the
//! single capability-checking policy every handler consults.

pub mod jwt;
pub mod middleware;
pub mod policy;

pub use jwt::{Claims, JwtError, JwtManager};
pub use middleware::{require_auth, AuthState, AuthUser};
pub use policy::{Action, Ownership, Policy};
