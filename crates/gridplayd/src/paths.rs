//! Cross-platform application paths

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::DaemonError;

/// Environment variable that replaces the OS data directory.
pub const DATA_DIR_ENV: &str = "GRIDPLAY_DATA_DIR";

/// Kinds of documents kept under the data directory, one subdirectory each.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocKind {
    Map,
    Rules,
    Path,
    QTable,
}

impl DocKind {
    pub const ALL: [DocKind; 4] = [DocKind::Map, DocKind::Rules, DocKind::Path, DocKind::QTable];

    fn dir_name(self) -> &'static str {
        match self {
            DocKind::Map => "maps",
            DocKind::Rules => "rules",
            DocKind::Path => "paths",
            DocKind::QTable => "qtables",
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppPaths {
    data_dir: PathBuf,
}

impl AppPaths {
    pub fn new() -> Result<Self, DaemonError> {
        let data_dir = match std::env::var_os(DATA_DIR_ENV) {
            Some(dir) if !dir.is_empty() => PathBuf::from(dir),
            _ => Self::default_data_dir()?,
        };
        Self::at(data_dir)
    }

    /// Uses `data_dir` as-is, creating it and its document subdirectories.
    pub fn at(data_dir: impl Into<PathBuf>) -> Result<Self, DaemonError> {
        let paths = Self {
            data_dir: data_dir.into(),
        };
        for kind in DocKind::ALL {
            fs::create_dir_all(paths.doc_dir(kind))?;
        }
        Ok(paths)
    }

    fn default_data_dir() -> Result<PathBuf, DaemonError> {
        let base = dirs::data_dir()
            .ok_or_else(|| DaemonError::Config("could not determine data directory".into()))?;
        Ok(base.join("gridplay"))
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn doc_dir(&self, kind: DocKind) -> PathBuf {
        self.data_dir.join(kind.dir_name())
    }

    /// `<data_dir>/<kind>/<id>.json`. Ids are plain file stems.
    pub fn doc_file(&self, kind: DocKind, id: &str) -> Result<PathBuf, DaemonError> {
        let valid = !id.is_empty()
            && id
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
            && !id.starts_with('.');
        if !valid {
            return Err(DaemonError::BadId(id.to_string()));
        }
        Ok(self.doc_dir(kind).join(format!("{id}.json")))
    }

    pub fn config_file(&self) -> PathBuf {
        self.data_dir.join("config.json")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_is_created_under_the_data_dir() {
        let tmp = tempfile::tempdir().unwrap();
        let paths = AppPaths::at(tmp.path()).unwrap();
        for kind in DocKind::ALL {
            assert!(paths.doc_dir(kind).is_dir());
        }
        assert_eq!(
            paths.doc_file(DocKind::Map, "level-1").unwrap(),
            tmp.path().join("maps").join("level-1.json")
        );
        assert_eq!(paths.config_file(), tmp.path().join("config.json"));
    }

    #[test]
    fn ids_cannot_escape_their_directory() {
        let tmp = tempfile::tempdir().unwrap();
        let paths = AppPaths::at(tmp.path()).unwrap();
        for bad in ["", "../secret", "a/b", ".hidden", "a\\b"] {
            assert!(
                matches!(paths.doc_file(DocKind::Rules, bad), Err(DaemonError::BadId(_))),
                "{bad:?} accepted"
            );
        }
    }
}
