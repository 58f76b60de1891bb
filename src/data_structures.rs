//! Data structures and types for the subfetch subtitle downloader
//!
//! This module contains the core data model: videos under search, the
//! language priority list, candidate subtitles returned by the service and
//! the outcome of a run.

use std::path::{Path, PathBuf};

use crate::error::{ConfigError, FingerprintError};
use crate::hash;
use crate::helper_functions::Utils;

/// A video identified by path, with its derived size and fingerprint
#[derive(Debug, Clone, PartialEq)]
pub struct VideoFile {
    pub path: PathBuf,
    pub size: u64,
    pub file_name: String,
    /// `None` when the fingerprint could not be computed
    pub fingerprint: Option<String>,
}

impl VideoFile {
    /// Read size and fingerprint of the video at `path`
    ///
    /// A fingerprint failure is returned alongside the video so the caller
    /// can report it and fall back to a filename search.
    pub fn open(path: &Path) -> std::io::Result<(Self, Option<FingerprintError>)> {
        let size = std::fs::metadata(path)?.len();
        let (fingerprint, error) = match hash::fingerprint(path) {
            Ok(hash) => (Some(hash), None),
            Err(e) => (None, Some(e)),
        };
        let video = Self {
            path: path.to_path_buf(),
            size,
            file_name: Utils::get_file_name(path),
            fingerprint,
        };
        Ok((video, error))
    }
}

/// Ordered language search entries; the first code has the highest priority
///
/// An entry is either a single code (`eng`) or a comma-joined group
/// (`eng,fre`) that the service searches in one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LanguageSelector {
    entries: Vec<String>,
    codes: Vec<String>,
}

impl LanguageSelector {
    pub fn new<I, S>(entries: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut kept = Vec::new();
        let mut codes = Vec::new();
        for entry in entries {
            let entry_codes: Vec<String> = entry
                .as_ref()
                .split(',')
                .map(str::trim)
                .filter(|code| !code.is_empty())
                .map(str::to_string)
                .collect();
            if entry_codes.is_empty() {
                continue;
            }
            kept.push(entry_codes.join(","));
            codes.extend(entry_codes);
        }
        if codes.is_empty() {
            return Err(ConfigError::NoLanguages);
        }
        Ok(Self { entries: kept, codes })
    }

    /// Search entries, one remote search per entry
    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    /// Every code in priority order
    pub fn codes(&self) -> &[String] {
        &self.codes
    }

    pub fn first_code(&self) -> &str {
        &self.codes[0]
    }

    /// Number of codes searched for each video
    pub fn searched_count(&self) -> usize {
        self.codes.len()
    }

    /// Index of `code` in the priority order
    pub fn rank_of(&self, code: &str) -> Option<usize> {
        self.codes.iter().position(|c| c == code)
    }
}

/// How the service matched a candidate to the video
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchMethod {
    MovieHash,
    Other(String),
}

impl MatchMethod {
    pub fn from_tag(tag: &str) -> Self {
        if tag == "moviehash" {
            MatchMethod::MovieHash
        } else {
            MatchMethod::Other(tag.to_string())
        }
    }

    pub fn is_hash(&self) -> bool {
        matches!(self, MatchMethod::MovieHash)
    }
}

/// One subtitle returned by a search, not yet chosen
#[derive(Debug, Clone, PartialEq)]
pub struct SubtitleCandidate {
    pub file_name: String,
    /// Search code of the subtitle language (`eng`)
    pub language_code: String,
    pub language_name: String,
    /// Two-letter ISO 639 code (`en`), used for filename suffixes
    pub iso639: String,
    /// Rating as sent by the service, `"0.0"` when unrated
    pub rating: String,
    pub download_count: String,
    pub hearing_impaired: bool,
    pub matched_by: MatchMethod,
    pub download_link: String,
    /// Subtitle container extension (`srt`)
    pub format: String,
    pub movie_name: String,
}

/// Criteria of one remote search
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchCriteria {
    Hash {
        language: String,
        movie_hash: String,
        movie_size: u64,
    },
    Name {
        language: String,
        query: String,
    },
}

impl SearchCriteria {
    pub fn language(&self) -> &str {
        match self {
            SearchCriteria::Hash { language, .. } | SearchCriteria::Name { language, .. } => language,
        }
    }
}

/// Results of one language entry for one video
#[derive(Debug, Clone, PartialEq)]
pub struct LanguageSearch {
    pub language: String,
    pub candidates: Vec<SubtitleCandidate>,
}

/// Results of every language entry for one video
#[derive(Debug, Clone, PartialEq, Default)]
pub struct VideoSearch {
    pub languages: Vec<LanguageSearch>,
}

impl VideoSearch {
    /// Number of language entries that returned at least one candidate
    pub fn successful_languages(&self) -> usize {
        self.languages.iter().filter(|l| !l.candidates.is_empty()).count()
    }
}

/// Process outcome, mapped to the exit code
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitStatus {
    /// At least one subtitle was written
    Downloaded,
    /// Nothing was written, without errors
    NothingFound,
    /// A fatal error stopped the run
    Failure,
}

impl ExitStatus {
    pub fn code(self) -> u8 {
        match self {
            ExitStatus::Downloaded => 0,
            ExitStatus::NothingFound => 1,
            ExitStatus::Failure => 2,
        }
    }
}

impl From<ExitStatus> for std::process::ExitCode {
    fn from(status: ExitStatus) -> Self {
        std::process::ExitCode::from(status.code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_language_selector_flattens_groups_in_order() {
        let selector = LanguageSelector::new(["eng", "fre, spa"]).unwrap();
        assert_eq!(selector.entries(), &["eng".to_string(), "fre,spa".to_string()]);
        assert_eq!(selector.codes(), &["eng", "fre", "spa"]);
        assert_eq!(selector.first_code(), "eng");
        assert_eq!(selector.searched_count(), 3);
        assert_eq!(selector.rank_of("spa"), Some(2));
        assert_eq!(selector.rank_of("ger"), None);
    }

    #[test]
    fn test_language_selector_requires_a_code() {
        assert!(matches!(LanguageSelector::new(Vec::<String>::new()), Err(ConfigError::NoLanguages)));
        assert!(matches!(LanguageSelector::new([" ", ","]), Err(ConfigError::NoLanguages)));
    }

    #[test]
    fn test_match_method_tag() {
        assert!(MatchMethod::from_tag("moviehash").is_hash());
        assert_eq!(MatchMethod::from_tag("fulltext"), MatchMethod::Other("fulltext".to_string()));
    }

    #[test]
    fn test_exit_codes() {
        assert_eq!(ExitStatus::Downloaded.code(), 0);
        assert_eq!(ExitStatus::NothingFound.code(), 1);
        assert_eq!(ExitStatus::Failure.code(), 2);
    }
}
