//! SQLite backend for the marketplace engine.

mod sqlite_impl;

pub mod db;
pub use db::{db_url, new_pool, run_migrations};
pub use sqlite_impl::SqliteDatabase;
