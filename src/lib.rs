/// palette-recall library
///
/// Ranking engine for a command palette: remembers which commands were run
/// and puts them on top of the next search.

pub mod config;
pub mod core;
pub mod db;
pub mod error;
pub mod logging;

// Re-exports for convenience
pub use config::{Settings, SettingsStore};
pub use db::Database;
pub use error::{PaletteError, Result};
