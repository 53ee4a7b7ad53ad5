//! Durable store backends for the snip URL shortener.
//!
//! Three [`LinkStore`] implementations live here: Postgres, a flat JSON
//! file, and an in-memory map, plus the boot-time selection factory that
//! picks between database and file.
//!
//! [`LinkStore`]: snip_core::LinkStore

pub mod file;
pub mod memory;
pub mod postgres;
pub mod select;

pub use file::FileStore;
pub use memory::InMemoryStore;
pub use postgres::PostgresStore;
pub use select::{select_store, AnyStore};
