//! Database access layer
//!
//! SQLite holds the key-value `settings` table; the engine reaches it only
//! through the `SettingsStore` trait.

pub mod init;
pub mod settings;

pub use init::{connect, init_schema};
pub use settings::{SettingsStore, SqliteSettings};
