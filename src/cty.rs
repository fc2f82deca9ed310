//! Callsign prefix table and country resolution.
//!
//! The table is a list of `(prefix, country)` pairs, kept sorted by
//! descending prefix length so that specific prefixes such as `KH6`
//! win over general ones such as `K`. Equal-length prefixes keep their
//! load order.
//!
//! The loader reads the cty.dat layout:
//!
//! ```text
//! Hawaii:  31:  61:  OC:  21.12:  157.48:  10.0:  KH6:
//!     AH6,AH7,KH6,KH7,NH6,NH7,WH6,WH7;
//! ```

use std::cmp::Reverse;
use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;

/// Errors loading a prefix table.
#[derive(Debug, Error)]
pub enum CtyError {
    #[error("Failed to read prefix table {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Prefix table {0} contains no prefixes")]
    Empty(PathBuf),
}

/// One prefix-to-country mapping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrefixEntry {
    pub prefix: String,
    pub country: String,
}

impl PrefixEntry {
    pub fn new(prefix: impl Into<String>, country: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            country: country.into(),
        }
    }
}

/// Normalize a country name for comparison against confirmed lists.
///
/// Drops anything after the first `:`, trims and uppercases.
pub fn normalize_country(raw: &str) -> String {
    raw.split(':').next().unwrap_or_default().trim().to_uppercase()
}

/// Strip cty.dat override annotations from a prefix token.
///
/// `=W1AW(4)[7]` becomes `W1AW`.
fn clean_prefix(token: &str) -> String {
    let token = token.trim().trim_start_matches('=');
    let mut out = String::with_capacity(token.len());
    let mut closing: Option<char> = None;
    for c in token.chars() {
        match closing {
            Some(end) if c == end => closing = None,
            Some(_) => {}
            None => match c {
                '(' => closing = Some(')'),
                '[' => closing = Some(']'),
                '<' => closing = Some('>'),
                '{' => closing = Some('}'),
                '~' => closing = Some('~'),
                _ => out.push(c),
            },
        }
    }
    out.to_uppercase()
}

/// Parse cty.dat text into prefix entries, in file order.
///
/// Prefixes appearing before the first country header are dropped.
pub fn parse_cty(content: &str) -> Vec<PrefixEntry> {
    let mut entries = Vec::new();
    let mut country: Option<String> = None;

    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        if line.ends_with(':') {
            country = Some(normalize_country(line));
            continue;
        }

        let Some(ref current) = country else {
            continue;
        };

        for token in line.replace(';', "").split(',') {
            let prefix = clean_prefix(token);
            if !prefix.is_empty() {
                entries.push(PrefixEntry::new(prefix, current.clone()));
            }
        }
    }

    entries
}

/// Longest-prefix-match resolver from callsign to country.
#[derive(Debug, Clone, Default)]
pub struct CountryResolver {
    entries: Vec<PrefixEntry>,
}

impl CountryResolver {
    /// Build a resolver from entries in load order.
    ///
    /// Country names are normalized and entries with an empty prefix or
    /// country are skipped.
    pub fn new(entries: impl IntoIterator<Item = PrefixEntry>) -> Self {
        let mut entries: Vec<PrefixEntry> = entries
            .into_iter()
            .map(|e| PrefixEntry {
                prefix: e.prefix.trim().to_uppercase(),
                country: normalize_country(&e.country),
            })
            .filter(|e| !e.prefix.is_empty() && !e.country.is_empty())
            .collect();

        // Stable, so equal lengths keep load order.
        entries.sort_by_key(|e| Reverse(e.prefix.len()));

        Self { entries }
    }

    /// Load and parse a cty.dat file. Invalid UTF-8 is replaced.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, CtyError> {
        let path = path.as_ref();
        let bytes = fs::read(path).map_err(|source| CtyError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let resolver = Self::new(parse_cty(&String::from_utf8_lossy(&bytes)));
        if resolver.is_empty() {
            return Err(CtyError::Empty(path.to_path_buf()));
        }

        debug!(
            "Loaded {} prefixes from {}",
            resolver.len(),
            path.display()
        );
        Ok(resolver)
    }

    /// Resolve a callsign to its normalized country name.
    pub fn resolve(&self, callsign: &str) -> Option<&str> {
        let call = callsign.trim().to_uppercase();
        self.entries
            .iter()
            .find(|e| call.starts_with(&e.prefix))
            .map(|e| e.country.as_str())
    }

    /// Number of prefixes in the table.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the table is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in match order.
    pub fn entries(&self) -> &[PrefixEntry] {
        &self.entries
    }
}
