//! Address directory with an injected TTL cache

pub mod cache;
pub mod directory;

pub use cache::TtlCache;
pub use directory::{AddressDirectory, AddressError, District, Province};
