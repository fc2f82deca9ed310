//! Per-band confirmed country lists.
//!
//! Countries already confirmed on a band are excluded from alerts on that
//! band. Each band may have its own list; bands without one (and an
//! unknown band) use the default list.

use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::PathBuf;

use thiserror::Error;

use crate::band::Band;

/// Errors loading a confirmed list.
#[derive(Debug, Error)]
pub enum ConfirmedError {
    #[error("Failed to read confirmed list {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Parse confirmed list content into a set of country names.
///
/// File format:
/// - One country name per line
/// - Lines starting with # are comments
/// - Empty lines are ignored
///
/// Names are uppercased to match resolved country names.
pub fn parse_confirmed(content: &str) -> HashSet<String> {
    content
        .lines()
        .filter_map(|line| {
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                return None;
            }
            Some(trimmed.to_uppercase())
        })
        .collect()
}

/// Something that can produce the confirmed set for a band.
pub trait ConfirmedSource {
    /// Load the set for `band`; `None` means the band is unknown.
    fn load(&self, band: Option<Band>) -> Result<HashSet<String>, ConfirmedError>;
}

/// Confirmed lists stored as text files.
#[derive(Debug, Clone)]
pub struct FileConfirmedSource {
    per_band: HashMap<Band, PathBuf>,
    default: PathBuf,
}

impl FileConfirmedSource {
    pub fn new(per_band: HashMap<Band, PathBuf>, default: impl Into<PathBuf>) -> Self {
        Self {
            per_band,
            default: default.into(),
        }
    }

    /// The file that will be read for `band`.
    pub fn path_for(&self, band: Option<Band>) -> &PathBuf {
        band.and_then(|b| self.per_band.get(&b))
            .unwrap_or(&self.default)
    }
}

impl ConfirmedSource for FileConfirmedSource {
    fn load(&self, band: Option<Band>) -> Result<HashSet<String>, ConfirmedError> {
        let path = self.path_for(band);
        let bytes = fs::read(path).map_err(|source| ConfirmedError::Io {
            path: path.clone(),
            source,
        })?;
        Ok(parse_confirmed(&String::from_utf8_lossy(&bytes)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::io::Write;

    fn write_list(dir: &tempfile::TempDir, name: &str, content: &str) -> PathBuf {
        let path = dir.path().join(name);
        let mut file = File::create(&path).unwrap();
        file.write_all(content.as_bytes()).unwrap();
        path
    }

    #[test]
    fn test_parse_confirmed_basic() {
        let set = parse_confirmed("FRANCE\nJAPAN\nUNITED STATES");
        assert_eq!(set.len(), 3);
        assert!(set.contains("UNITED STATES"));
    }

    #[test]
    fn test_parse_confirmed_with_comments() {
        let set = parse_confirmed("# 20m DXCC\nFRANCE\n# more\nITALY");
        assert_eq!(set.len(), 2);
        assert!(set.contains("ITALY"));
    }

    #[test]
    fn test_parse_confirmed_whitespace_and_case() {
        let set = parse_confirmed("  France  \n\t\n\nJapan\r\n");
        assert!(set.contains("FRANCE"));
        assert!(set.contains("JAPAN"));
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_parse_confirmed_empty() {
        assert!(parse_confirmed("").is_empty());
    }

    #[test]
    fn test_band_file_and_default() {
        let dir = tempfile::tempdir().unwrap();
        let m20 = write_list(&dir, "confirmed_countries_20m.txt", "FRANCE\n");
        let default = write_list(&dir, "confirmed_countries.txt", "JAPAN\nITALY\n");

        let source = FileConfirmedSource::new(HashMap::from([(Band::M20, m20)]), default);

        let set = source.load(Some(Band::M20)).unwrap();
        assert_eq!(set, HashSet::from(["FRANCE".to_string()]));

        let set = source.load(Some(Band::M40)).unwrap();
        assert_eq!(set.len(), 2);

        let set = source.load(None).unwrap();
        assert!(set.contains("JAPAN"));
    }

    #[test]
    fn test_missing_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let source = FileConfirmedSource::new(HashMap::new(), dir.path().join("absent.txt"));
        assert!(matches!(
            source.load(Some(Band::M20)),
            Err(ConfirmedError::Io { .. })
        ));
    }
}
