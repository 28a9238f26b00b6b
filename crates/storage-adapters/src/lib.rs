//! warren/crates/storage-adapters/src/lib.rs
//!
//! Concrete implementations of the `domains` ports: Postgres repositories,
//! a redis token cache, a local-filesystem media store, and dashmap-backed
//! in-memory repositories for tests and development.

pub mod mail;
pub mod media;
pub mod memory;
pub mod postgres;
pub mod redis;

pub use mail::TracingMailer;
pub use media::LocalMediaStore;
pub use memory::MemoryStore;
pub use redis::RedisTokenCache;
