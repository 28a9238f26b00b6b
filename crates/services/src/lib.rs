//! warren/crates/services/src/lib.rs
//!
//! Application services: the business rules of the forum, written against
//! the port traits in `domains`. Every operation takes an explicit
//! [`context::AuthContext`]; there is no ambient caller state.

pub mod communities;
pub mod content;
pub mod context;
pub mod feed;
pub mod roles;
pub mod topics;
pub mod users;
pub mod validate;
pub mod votes;

pub use context::AuthContext;
