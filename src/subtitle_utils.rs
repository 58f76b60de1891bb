//! Subtitle file utilities and language names
//!
//! This module decides where a downloaded subtitle goes and whether a video
//! already has one.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use once_cell::sync::Lazy;

use crate::config::{SUBTITLE_EXTENSIONS, SUBTITLE_LANGUAGES};
use crate::data_structures::{LanguageSelector, SubtitleCandidate};
use crate::helper_functions::Utils;
use crate::settings::{Settings, SuffixPolicy};

static LANGUAGE_NAMES: Lazy<HashMap<&'static str, &'static str>> =
    Lazy::new(|| SUBTITLE_LANGUAGES.iter().map(|&(name, code)| (code, name)).collect());

/// Utilities for working with subtitle files and language codes
pub struct SubtitleUtils;

impl SubtitleUtils {
    /// Find a subtitle that already sits next to the video
    ///
    /// Looks for `<stem>.<ext>` and, when a suffix policy is active,
    /// `<stem><separator><first language>.<ext>`. Only the first configured
    /// language is checked.
    pub fn find_existing_subtitle(
        video_path: &Path,
        settings: &Settings,
        languages: &LanguageSelector,
    ) -> Option<PathBuf> {
        let suffixed = settings.language_suffix != SuffixPolicy::Off;
        let language_suffix = format!("{}{}", settings.language_separator, languages.first_code());

        for ext in SUBTITLE_EXTENSIONS {
            let plain = Utils::sibling_with_suffix(video_path, "", ext);
            if plain.is_file() {
                return Some(plain);
            }
            if suffixed {
                let with_language = Utils::sibling_with_suffix(video_path, &language_suffix, ext);
                if with_language.is_file() {
                    return Some(with_language);
                }
            }
        }
        None
    }

    /// Check if a subtitle already exists for the video
    pub fn has_existing_subtitle(video_path: &Path, settings: &Settings, languages: &LanguageSelector) -> bool {
        Self::find_existing_subtitle(video_path, settings, languages).is_some()
    }

    /// Where the chosen subtitle is written
    ///
    /// `<stem><suffix>.<format>`, where the suffix is the separator and the
    /// two-letter code of the candidate when the policy is `on`, or `auto`
    /// with more than one successful language. `None` when the format or the
    /// code sent by the service would leave the video's directory.
    pub fn subtitle_destination(
        video_path: &Path,
        candidate: &SubtitleCandidate,
        settings: &Settings,
        successful_languages: usize,
    ) -> Option<PathBuf> {
        if !Self::is_plain_component(&candidate.format) {
            log::warn!("Refusing subtitle format {:?} from the service", candidate.format);
            return None;
        }
        let with_suffix = match settings.language_suffix {
            SuffixPolicy::On => true,
            SuffixPolicy::Auto => successful_languages > 1,
            SuffixPolicy::Off => false,
        };
        let suffix = if with_suffix {
            if !Self::is_plain_component(&candidate.iso639) {
                log::warn!("Refusing language code {:?} from the service", candidate.iso639);
                return None;
            }
            format!("{}{}", settings.language_separator, candidate.iso639)
        } else {
            String::new()
        };
        Some(Utils::sibling_with_suffix(video_path, &suffix, &candidate.format))
    }

    /// A non-empty file name fragment without separators or `..`
    fn is_plain_component(value: &str) -> bool {
        !value.is_empty() && !value.contains(['/', '\\']) && !value.contains("..")
    }

    /// Convert a language search code to a human-readable name
    pub fn language_code_to_name(code: &str) -> &str {
        LANGUAGE_NAMES.get(code).copied().unwrap_or(code)
    }
}
