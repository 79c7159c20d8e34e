mod schema;
mod settings;
mod storage;

use std::io;
use std::path::{Path, PathBuf};

pub use schema::SchemaManager;
pub use settings::{Auth, Database, Device, Logger, Scheduler, Server, Settings, Tank};
pub use storage::Storage;

/// Resolves a configured path against the working directory.
pub fn normalize_path(path: impl AsRef<Path>) -> io::Result<PathBuf> {
    std::fs::canonicalize(path)
}
