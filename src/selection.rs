//! Candidate selection: automatic scoring or a manual pick
//!
//! A single candidate matched by hash is taken as is. Otherwise the
//! candidates are scored (automatic mode) or handed to the user interface
//! (manual mode).

use crate::data_structures::{LanguageSelector, SubtitleCandidate};
use crate::settings::{ColumnSettings, ColumnToggle, SelectionMode, Settings};

/// Score weight of one step in the language priority order
const LANGUAGE_RANK_WEIGHT: usize = 100;

/// Outcome of a manual selection
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    /// File name of the chosen candidate
    Chosen(String),
    Cancelled,
}

/// Optional columns shown in the selection window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ColumnVisibility {
    pub language: bool,
    pub hearing_impaired: bool,
    pub rating: bool,
    pub downloads: bool,
}

impl ColumnVisibility {
    /// Resolve `auto` toggles against one batch of candidates
    pub fn resolve(columns: &ColumnSettings, searched_languages: usize, candidates: &[SubtitleCandidate]) -> Self {
        let reveal = |toggle: ColumnToggle, condition: bool| match toggle {
            ColumnToggle::On => true,
            ColumnToggle::Off => false,
            ColumnToggle::Auto => condition,
        };
        Self {
            language: reveal(columns.language, searched_languages > 1),
            hearing_impaired: reveal(columns.hearing_impaired, candidates.iter().any(|c| c.hearing_impaired)),
            rating: reveal(columns.rating, candidates.iter().any(|c| c.rating != "0.0")),
            downloads: reveal(columns.downloads, true),
        }
    }
}

/// Everything the selection window shows
#[derive(Debug, Clone)]
pub struct SelectionRequest<'a> {
    pub video_title: &'a str,
    pub video_file_name: &'a str,
    pub candidates: &'a [SubtitleCandidate],
    pub columns: ColumnVisibility,
}

/// Severity of a message shown to the user
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Warning,
    Error,
}

/// The user-facing collaborator: manual selection and notices
pub trait UserInterface {
    fn select(&mut self, request: &SelectionRequest<'_>) -> Selection;

    fn notify(&mut self, level: NoticeLevel, title: &str, message: &str);
}

/// Lowercase name tokens, with `-`, `_` and space treated as `.`
pub fn tokenize(name: &str) -> Vec<String> {
    name.to_lowercase()
        .replace(['-', '_', ' '], ".")
        .split('.')
        .map(str::to_string)
        .collect()
}

/// Automatic selection score of one candidate
///
/// Language priority dominates: each rank step is worth more than any
/// realistic number of shared tokens. A hash match adds one point, and every
/// pair of equal tokens between the two file names adds one point.
pub fn score(candidate: &SubtitleCandidate, video_tokens: &[String], languages: &LanguageSelector) -> usize {
    let codes = languages.codes().len();
    let language = languages
        .rank_of(&candidate.language_code)
        .map(|rank| (codes - rank) * LANGUAGE_RANK_WEIGHT)
        .unwrap_or(0);

    let hash_bonus = usize::from(candidate.matched_by.is_hash());

    let shared = tokenize(&candidate.file_name)
        .iter()
        .map(|sub_part| video_tokens.iter().filter(|video_part| *video_part == sub_part).count())
        .sum::<usize>();

    language + hash_bonus + shared
}

/// Best scored candidate; the first one wins a tie
pub fn select_auto<'a>(
    candidates: &'a [SubtitleCandidate],
    video_file_name: &str,
    languages: &LanguageSelector,
) -> Option<&'a SubtitleCandidate> {
    let video_tokens = tokenize(video_file_name);
    let mut best: Option<(&SubtitleCandidate, usize)> = None;
    for candidate in candidates {
        let candidate_score = score(candidate, &video_tokens, languages);
        log::debug!("Score {} for {}", candidate_score, candidate.file_name);
        match best {
            Some((_, best_score)) if candidate_score <= best_score => {}
            _ => best = Some((candidate, candidate_score)),
        }
    }
    best.map(|(candidate, _)| candidate)
}

/// Pick one candidate out of a language result, or none when the user cancels
pub fn choose<'a>(
    candidates: &'a [SubtitleCandidate],
    video_file_name: &str,
    languages: &LanguageSelector,
    settings: &Settings,
    ui: &mut dyn UserInterface,
) -> Option<&'a SubtitleCandidate> {
    if let [only] = candidates {
        if only.matched_by.is_hash() {
            log::info!("Single hash match, selecting {}", only.file_name);
            return Some(only);
        }
    }
    if candidates.is_empty() {
        return None;
    }

    match settings.selection_mode {
        SelectionMode::Auto => {
            let chosen = select_auto(candidates, video_file_name, languages);
            if let Some(candidate) = chosen {
                log::info!("Automatically selected {}", candidate.file_name);
            }
            chosen
        }
        SelectionMode::Manual => {
            let request = SelectionRequest {
                video_title: &candidates[0].movie_name,
                video_file_name,
                candidates,
                columns: ColumnVisibility::resolve(&settings.columns, languages.searched_count(), candidates),
            };
            match ui.select(&request) {
                Selection::Chosen(file_name) => {
                    let chosen = candidates.iter().find(|c| c.file_name == file_name);
                    if chosen.is_none() {
                        log::warn!("Selected subtitle {} is not among the candidates", file_name);
                    }
                    chosen
                }
                Selection::Cancelled => {
                    log::info!("Selection cancelled for {}", video_file_name);
                    None
                }
            }
        }
    }
}
