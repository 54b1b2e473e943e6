//! Configuration discovery.

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{ConfigError, Result};

/// Filenames probed in each directory, in precedence order.
const CONFIG_BASENAMES: &[&str] = &["keel.toml", "keel.json"];

/// Walk up from a starting directory until a config file is found.
///
/// Returns the directory containing the config, not the file itself, so
/// layered loading can merge every format present there.
pub fn discover(start: impl AsRef<Path>) -> Result<PathBuf> {
    let mut current = Some(start.as_ref().to_path_buf());
    while let Some(dir) = current {
        for basename in CONFIG_BASENAMES {
            if dir.join(basename).is_file() {
                debug!(dir = %dir.display(), "discovered configuration");
                return Ok(dir);
            }
        }
        current = dir.parent().map(Path::to_path_buf);
    }
    Err(ConfigError::NotFound)
}
