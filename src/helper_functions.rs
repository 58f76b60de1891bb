//! Common utility functions and validation helpers
//!
//! This module provides path helpers, the video validity filter and the
//! collection of input paths from the command line or the file manager.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use crate::config::VIDEO_EXTENSIONS;

/// Common utility functions used throughout the application
pub struct Utils;

impl Utils {
    /// Safely get the file name from a path, returning a default if not available
    pub fn get_file_name(path: &Path) -> String {
        path.file_name()
            .and_then(|name| name.to_str())
            .unwrap_or("Unknown")
            .to_string()
    }

    /// Truncate a string to a maximum number of characters, adding ellipsis if needed
    pub fn truncate_string(s: &str, max_len: usize) -> String {
        if s.chars().count() <= max_len {
            s.to_string()
        } else {
            let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
            format!("{}...", kept)
        }
    }

    /// The video path without its extension (`/videos/movie.mkv` -> `/videos/movie`)
    pub fn strip_extension(path: &Path) -> PathBuf {
        match path.file_stem() {
            Some(stem) => path.with_file_name(stem),
            None => path.to_path_buf(),
        }
    }

    /// `<stem><suffix>.<ext>` next to the video
    pub fn sibling_with_suffix(video: &Path, suffix: &str, ext: &str) -> PathBuf {
        let mut name: OsString = Self::strip_extension(video).into_os_string();
        name.push(suffix);
        name.push(".");
        name.push(ext);
        PathBuf::from(name)
    }

    /// Expand directories into the files they contain (recursively, sorted)
    pub fn collect_paths(inputs: &[PathBuf]) -> Vec<PathBuf> {
        fn visit_dirs(dir: &Path, files: &mut Vec<PathBuf>) {
            let mut entries: Vec<PathBuf> = match dir.read_dir() {
                Ok(entries) => entries.flatten().map(|entry| entry.path()).collect(),
                Err(e) => {
                    log::warn!("Cannot list {}: {}", dir.display(), e);
                    return;
                }
            };
            entries.sort();
            for path in entries {
                if path.is_dir() {
                    visit_dirs(&path, files);
                } else {
                    files.push(path);
                }
            }
        }

        let mut files = Vec::new();
        for input in inputs {
            if input.is_dir() {
                visit_dirs(input, &mut files);
            } else {
                files.push(input.clone());
            }
        }
        files
    }

    /// Paths handed over by the Nautilus scripts menu, one URI per line
    pub fn paths_from_file_manager(uris: &str) -> Vec<PathBuf> {
        uris.lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .filter_map(|line| match reqwest::Url::parse(line) {
                Ok(url) => url.to_file_path().ok(),
                Err(_) => Some(PathBuf::from(line)),
            })
            .collect()
    }
}

/// Input validation utilities
pub struct Validation;

impl Validation {
    /// Whether `path` is a regular file that looks like a video
    ///
    /// The guessed media type wins; the extension allow-list (case-sensitive)
    /// is only consulted when no media type can be guessed.
    pub fn is_video(path: &Path) -> bool {
        if !path.is_file() {
            return false;
        }
        match mime_guess::from_path(path).first() {
            Some(mime) => mime.type_() == mime_guess::mime::VIDEO,
            None => path
                .extension()
                .and_then(|ext| ext.to_str())
                .map(|ext| VIDEO_EXTENSIONS.contains(&ext))
                .unwrap_or(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use tempfile::tempdir;

    #[test]
    fn test_mkv_file_is_a_video() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("movie.mkv");
        File::create(&path).unwrap();
        assert!(Validation::is_video(&path));
    }

    #[test]
    fn test_unknown_media_type_uses_allow_list() {
        let dir = tempdir().unwrap();
        let listed = dir.path().join("movie.x264");
        let unlisted = dir.path().join("movie.zzq");
        File::create(&listed).unwrap();
        File::create(&unlisted).unwrap();
        assert!(Validation::is_video(&listed));
        assert!(!Validation::is_video(&unlisted));
    }

    #[test]
    fn test_allow_list_is_case_sensitive() {
        let dir = tempdir().unwrap();
        let upper = dir.path().join("movie.X264");
        File::create(&upper).unwrap();
        assert!(!Validation::is_video(&upper));
    }

    #[test]
    fn test_non_video_media_type_is_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("notes.txt");
        File::create(&path).unwrap();
        assert!(!Validation::is_video(&path));
    }

    #[test]
    fn test_missing_path_and_directory_are_rejected() {
        let dir = tempdir().unwrap();
        assert!(!Validation::is_video(&dir.path().join("ghost.mkv")));
        let folder = dir.path().join("season.mkv");
        std::fs::create_dir(&folder).unwrap();
        assert!(!Validation::is_video(&folder));
    }

    #[test]
    fn test_sibling_with_suffix() {
        let video = Path::new("/videos/movie.2020.mkv");
        assert_eq!(Utils::strip_extension(video), PathBuf::from("/videos/movie.2020"));
        assert_eq!(
            Utils::sibling_with_suffix(video, "_en", "srt"),
            PathBuf::from("/videos/movie.2020_en.srt")
        );
        assert_eq!(Utils::sibling_with_suffix(video, "", "sub"), PathBuf::from("/videos/movie.2020.sub"));
    }

    #[test]
    fn test_truncate_string() {
        assert_eq!(Utils::truncate_string("short", 10), "short");
        assert_eq!(Utils::truncate_string("a-very-long-name.mkv", 10), "a-very-...");
    }

    #[test]
    fn test_collect_paths_walks_directories_sorted() {
        let dir = tempdir().unwrap();
        let season = dir.path().join("season1");
        std::fs::create_dir(&season).unwrap();
        File::create(season.join("b.mkv")).unwrap();
        File::create(season.join("a.mkv")).unwrap();
        let single = dir.path().join("film.avi");
        File::create(&single).unwrap();

        let paths = Utils::collect_paths(&[single.clone(), season.clone()]);
        assert_eq!(paths, vec![single, season.join("a.mkv"), season.join("b.mkv")]);
    }

    #[cfg(unix)]
    #[test]
    fn test_paths_from_file_manager_decodes_uris() {
        let paths = Utils::paths_from_file_manager("file:///home/me/My%20Movie.mkv\n\n/plain/path.avi\n");
        assert_eq!(
            paths,
            vec![PathBuf::from("/home/me/My Movie.mkv"), PathBuf::from("/plain/path.avi")]
        );
    }
}
