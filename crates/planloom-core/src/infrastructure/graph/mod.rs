//! SQLite-backed graph store implementation

mod repository;

pub use repository::SqliteGraphStore;
