use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use engine_logging::{engine_info, engine_warn};
use relay_core::Wildcards;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum WildcardError {
    #[error("wildcard path is not a directory: {0}")]
    NotADirectory(PathBuf),
    #[error("failed to read wildcard file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

/// Loads every `<KEY>.txt` file in `dir` as the option list for `[KEY]`.
///
/// A missing directory yields an empty set; other files are ignored.
pub fn load_wildcard_dir(dir: &Path) -> Result<Wildcards, WildcardError> {
    let mut wildcards = Wildcards::new();
    if !dir.exists() {
        engine_warn!("Wildcard directory {} not found; templates expand verbatim", dir.display());
        return Ok(wildcards);
    }
    if !dir.is_dir() {
        return Err(WildcardError::NotADirectory(dir.to_path_buf()));
    }

    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        let is_txt = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("txt"));
        let Some(key) = path.file_stem().and_then(|stem| stem.to_str()) else {
            continue;
        };
        if !is_txt || !path.is_file() {
            continue;
        }
        let contents = fs::read_to_string(&path).map_err(|source| WildcardError::Read {
            path: path.clone(),
            source,
        })?;
        wildcards.insert(key, &contents);
    }

    engine_info!("Loaded {} wildcard list(s) from {}", wildcards.len(), dir.display());
    Ok(wildcards)
}
