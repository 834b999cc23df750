//! Backing store collaborators.
//!
//! The cascade only talks to the authoritative store through
//! [`traits::BackingStore`]. Two implementations ship with the crate:
//! - [`memory::InMemoryStore`]: DashMap-backed, for embedding and tests
//! - [`redis::RedisStore`]: Redis via a multiplexed connection manager

pub mod traits;
pub mod memory;
pub mod redis;
pub mod retry;
