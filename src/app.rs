//! Application logic for the subfetch subtitle downloader
//!
//! [`SubtitleDownloader`] drives a whole run: filtering the inputs, opening
//! a session, and searching, selecting and downloading subtitles per video.

use std::path::{Path, PathBuf};

use crate::data_structures::{ExitStatus, LanguageSelector, VideoFile};
use crate::download::{self, Transport};
use crate::error::{ConfigError, ConnectionError, DownloadError};
use crate::helper_functions::{Utils, Validation};
use crate::opensubtitles::SubtitleService;
use crate::search::{self, RetryPolicy, SearchSession};
use crate::selection::{self, NoticeLevel, UserInterface};
use crate::settings::Settings;
use crate::subtitle_utils::SubtitleUtils;

const SERVICE_HINT: &str = "Please check:\n- Your Internet connection status\n- www.opensubtitles.org availability\n- Your downloads limit (200 subtitles per 24h)";

/// One subtitle run over a list of videos
pub struct SubtitleDownloader<'a> {
    settings: Settings,
    languages: LanguageSelector,
    service: &'a dyn SubtitleService,
    transport: &'a (dyn Transport + Sync),
    ui: &'a mut dyn UserInterface,
    retry: RetryPolicy,
}

impl<'a> SubtitleDownloader<'a> {
    pub fn new(
        settings: Settings,
        service: &'a dyn SubtitleService,
        transport: &'a (dyn Transport + Sync),
        ui: &'a mut dyn UserInterface,
    ) -> Result<Self, ConfigError> {
        let languages = settings.language_selector()?;
        Ok(Self { settings, languages, service, transport, ui, retry: RetryPolicy::default() })
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Keep the videos worth searching for
    ///
    /// Paths that are not videos are reported and dropped. Videos that
    /// already have a subtitle are dropped too, unless overwriting is enabled.
    pub fn filter_videos(&mut self, paths: Vec<PathBuf>) -> Vec<PathBuf> {
        let mut videos = Vec::new();
        for path in paths {
            if !Validation::is_video(&path) {
                self.ui.notify(
                    NoticeLevel::Warning,
                    "File type error!",
                    &format!("This file is not a video (unknown mimetype or invalid path):\n{}", path.display()),
                );
                continue;
            }
            if !self.settings.overwrite_existing {
                if let Some(existing) = SubtitleUtils::find_existing_subtitle(&path, &self.settings, &self.languages) {
                    log::info!("Skipping {}, found {}", path.display(), existing.display());
                    self.ui.notify(
                        NoticeLevel::Info,
                        "Subtitles already downloaded!",
                        &format!("A subtitles file already exists for this file:\n{}", existing.display()),
                    );
                    continue;
                }
            }
            videos.push(path);
        }
        videos
    }

    /// Filter `paths`, then search and download subtitles for what is left
    pub fn run(&mut self, paths: Vec<PathBuf>) -> ExitStatus {
        let videos = self.filter_videos(paths);
        self.process(&videos)
    }

    /// Search and download subtitles for already filtered videos
    pub fn process(&mut self, videos: &[PathBuf]) -> ExitStatus {
        if videos.is_empty() {
            log::info!("No video left to process");
            return ExitStatus::NothingFound;
        }

        let service = self.service;
        let session = match search::connect(service, &self.settings.credentials, self.retry) {
            Ok(session) => session,
            Err(e) => {
                self.report_connection_error(&e);
                return ExitStatus::Failure;
            }
        };

        let mut downloaded = 0usize;
        for path in videos {
            match self.process_video(&session, path) {
                Ok(count) => downloaded += count,
                Err(e) => {
                    log::error!("Download failed for {}: {}", path.display(), e);
                    self.ui.notify(
                        NoticeLevel::Error,
                        "Subtitling error!",
                        &format!(
                            "An error occurred while downloading or writing subtitles for {}:\n{}",
                            Utils::get_file_name(path),
                            e
                        ),
                    );
                    session.close();
                    return ExitStatus::Failure;
                }
            }
        }
        session.close();

        log::info!("Run finished, {} subtitle(s) written", downloaded);
        if downloaded > 0 {
            ExitStatus::Downloaded
        } else {
            ExitStatus::NothingFound
        }
    }

    /// Number of subtitles written for one video
    fn process_video(
        &mut self,
        session: &SearchSession<'_, dyn SubtitleService + 'a>,
        path: &Path,
    ) -> Result<usize, DownloadError> {
        let video = match VideoFile::open(path) {
            Ok((video, None)) => video,
            Ok((video, Some(e))) => {
                log::warn!("Cannot fingerprint {}: {}", path.display(), e);
                self.ui.notify(
                    NoticeLevel::Warning,
                    "Hashing error!",
                    &format!("Unable to compute the fingerprint of {}:\n{}\nSearching by file name only.", video.file_name, e),
                );
                video
            }
            Err(e) => {
                log::error!("Cannot read {}: {}", path.display(), e);
                self.ui.notify(NoticeLevel::Error, "File error!", &format!("Unable to read {}:\n{}", path.display(), e));
                return Ok(0);
            }
        };
        log::info!("Processing {} ({} bytes)", video.file_name, video.size);

        let (results, errors) = session.search_video(&video, &self.languages, &self.settings);
        for error in &errors {
            self.ui.notify(
                NoticeLevel::Error,
                "Search error!",
                &format!("Unable to reach opensubtitles.org servers!\n{}", error),
            );
        }

        let successful = results.successful_languages();
        if successful == 0 {
            self.ui.notify(
                NoticeLevel::Info,
                &format!("No subtitles found for: {}", video.file_name),
                &format!("No subtitles found for this video:\n{}", video.file_name),
            );
            return Ok(0);
        }

        let mut written = 0;
        for language in results.languages.iter().filter(|l| !l.candidates.is_empty()) {
            let chosen = selection::choose(
                &language.candidates,
                &video.file_name,
                &self.languages,
                &self.settings,
                &mut *self.ui,
            );
            let Some(candidate) = chosen else {
                log::info!("No subtitle chosen, skipping the rest of {}", video.file_name);
                break;
            };
            let Some(destination) =
                SubtitleUtils::subtitle_destination(&video.path, candidate, &self.settings, successful)
            else {
                self.ui.notify(
                    NoticeLevel::Warning,
                    "Download error!",
                    &format!("The subtitle {} has an unusable file name and was skipped.", candidate.file_name),
                );
                continue;
            };
            download::download(self.transport, &candidate.download_link, &destination)?;
            log::info!(
                "{} subtitles for {} saved as {}",
                candidate.language_name,
                video.file_name,
                destination.display()
            );
            written += 1;
        }
        Ok(written)
    }

    fn report_connection_error(&mut self, error: &ConnectionError) {
        log::error!("{}", error);
        let message = match error {
            ConnectionError::Refused(status) => {
                format!("Opensubtitles.org servers refused the connection: {}.\n\n{}", status, SERVICE_HINT)
            }
            ConnectionError::Unreachable(_) => {
                format!("Unable to reach opensubtitles.org servers!\n\n{}", SERVICE_HINT)
            }
        };
        self.ui.notify(NoticeLevel::Error, "Connection error!", &message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_structures::{MatchMethod, SearchCriteria};
    use crate::error::RpcError;
    use crate::opensubtitles::LoginResponse;
    use crate::selection::Selection;
    use crate::settings::{SelectionMode, SuffixPolicy};
    use crate::testing::{candidate, MockService, MockTransport, MockUi};
    use tempfile::{tempdir, TempDir};

    /// A hashable video file inside a fresh directory
    fn video_dir(name: &str) -> (TempDir, PathBuf) {
        let dir = tempdir().unwrap();
        let path = dir.path().join(name);
        std::fs::write(&path, vec![0u8; 131072]).unwrap();
        (dir, path)
    }

    fn settings(languages: &[&str]) -> Settings {
        Settings {
            languages: languages.iter().map(|l| l.to_string()).collect(),
            selection_mode: SelectionMode::Auto,
            ..Settings::default()
        }
    }

    fn run(
        settings: Settings,
        service: &MockService,
        transport: &MockTransport,
        ui: &mut MockUi,
        paths: Vec<PathBuf>,
    ) -> ExitStatus {
        let mut downloader = SubtitleDownloader::new(settings, service, transport, ui)
            .unwrap()
            .with_retry_policy(RetryPolicy::immediate());
        downloader.run(paths)
    }

    #[test]
    fn test_hash_match_is_downloaded() {
        let (dir, video) = video_dir("movie.mkv");
        let service = MockService::default();
        let sub = candidate("movie.srt", "eng", MatchMethod::MovieHash);
        service.push_search(Ok(vec![sub.clone()]));
        let mut transport = MockTransport::default();
        transport.serve(&sub.download_link, b"subtitle text");
        let mut ui = MockUi::default();

        let status = run(settings(&["eng"]), &service, &transport, &mut ui, vec![video]);

        assert_eq!(status, ExitStatus::Downloaded);
        assert_eq!(std::fs::read_to_string(dir.path().join("movie.srt")).unwrap(), "subtitle text");
        assert!(matches!(service.searches()[0][0], SearchCriteria::Hash { movie_size: 131072, .. }));
        assert_eq!(service.logouts().len(), 1);
    }

    #[test]
    fn test_nothing_found_exits_with_one() {
        let (_dir, video) = video_dir("movie.mkv");
        let service = MockService::default();
        let transport = MockTransport::default();
        let mut ui = MockUi::default();

        let status = run(settings(&["eng"]), &service, &transport, &mut ui, vec![video]);

        assert_eq!(status, ExitStatus::NothingFound);
        assert_eq!(ui.notices, vec![(NoticeLevel::Info, "No subtitles found for: movie.mkv".to_string())]);
        // hash tier then name tier
        assert_eq!(service.searches().len(), 2);
        assert_eq!(service.logouts().len(), 1);
    }

    #[test]
    fn test_connection_failure_exits_with_two() {
        let (_dir, video) = video_dir("movie.mkv");
        let service = MockService::default();
        service.push_login(Ok(LoginResponse { status: "503 Service Unavailable".to_string(), token: None }));
        let transport = MockTransport::default();
        let mut ui = MockUi::default();

        let status = run(settings(&["eng"]), &service, &transport, &mut ui, vec![video]);

        assert_eq!(status, ExitStatus::Failure);
        assert_eq!(ui.notices, vec![(NoticeLevel::Error, "Connection error!".to_string())]);
        assert!(service.searches().is_empty());
        assert!(service.logouts().is_empty());
    }

    #[test]
    fn test_download_failure_logs_out_once_and_exits_with_two() {
        let (dir, first) = video_dir("first.mkv");
        let second = dir.path().join("second.mkv");
        std::fs::write(&second, vec![0u8; 131072]).unwrap();
        let service = MockService::default();
        service.push_search(Ok(vec![candidate("first.srt", "eng", MatchMethod::MovieHash)]));
        let transport = MockTransport::default();
        let mut ui = MockUi::default();

        let status = run(settings(&["eng"]), &service, &transport, &mut ui, vec![first, second]);

        assert_eq!(status, ExitStatus::Failure);
        assert_eq!(service.logouts().len(), 1);
        // the second video is never searched
        assert_eq!(service.searches().len(), 1);
        assert_eq!(ui.notices, vec![(NoticeLevel::Error, "Subtitling error!".to_string())]);
    }

    #[test]
    fn test_search_errors_are_not_fatal() {
        let (dir, video) = video_dir("movie.mkv");
        let service = MockService::default();
        // hash and name searches for eng both fail, each after a retry
        for _ in 0..4 {
            service.push_search(Err(RpcError::HttpStatus(500)));
        }
        let sub = candidate("movie.fre.srt", "fre", MatchMethod::MovieHash);
        service.push_search(Ok(vec![sub.clone()]));
        let mut transport = MockTransport::default();
        transport.serve(&sub.download_link, b"bonjour");
        let mut ui = MockUi::default();

        let status = run(settings(&["eng", "fre"]), &service, &transport, &mut ui, vec![video]);

        assert_eq!(status, ExitStatus::Downloaded);
        assert_eq!(ui.notices, vec![(NoticeLevel::Error, "Search error!".to_string())]);
        // a single successful language keeps the plain name under the auto policy
        assert!(dir.path().join("movie.srt").is_file());
    }

    #[test]
    fn test_every_successful_language_gets_a_suffixed_file() {
        let (dir, video) = video_dir("movie.mkv");
        let service = MockService::default();
        let english = candidate("movie.en.srt", "eng", MatchMethod::MovieHash);
        let french = candidate("movie.fr.srt", "fre", MatchMethod::MovieHash);
        service.push_search(Ok(vec![english.clone()]));
        service.push_search(Ok(vec![french.clone()]));
        let mut transport = MockTransport::default();
        transport.serve(&english.download_link, b"hello");
        transport.serve(&french.download_link, b"bonjour");
        let mut ui = MockUi::default();

        let status = run(settings(&["eng", "fre"]), &service, &transport, &mut ui, vec![video]);

        assert_eq!(status, ExitStatus::Downloaded);
        assert_eq!(std::fs::read_to_string(dir.path().join("movie_en.srt")).unwrap(), "hello");
        assert_eq!(std::fs::read_to_string(dir.path().join("movie_fr.srt")).unwrap(), "bonjour");
        assert!(!dir.path().join("movie.srt").exists());
    }

    #[test]
    fn test_cancelled_selection_skips_the_video() {
        let (dir, video) = video_dir("movie.mkv");
        let service = MockService::default();
        service.push_search(Ok(vec![
            candidate("a.srt", "eng", MatchMethod::MovieHash),
            candidate("b.srt", "eng", MatchMethod::MovieHash),
        ]));
        let transport = MockTransport::default();
        let mut ui = MockUi::with_selections(vec![Selection::Cancelled]);
        let manual = Settings { selection_mode: SelectionMode::Manual, ..settings(&["eng"]) };

        let status = run(manual, &service, &transport, &mut ui, vec![video]);

        assert_eq!(status, ExitStatus::NothingFound);
        assert_eq!(ui.requests.len(), 1);
        assert!(transport.fetched().is_empty());
        assert!(!dir.path().join("movie.srt").exists());
    }

    #[test]
    fn test_cancel_skips_the_remaining_languages() {
        let (_dir, video) = video_dir("movie.mkv");
        let service = MockService::default();
        service.push_search(Ok(vec![
            candidate("a.srt", "eng", MatchMethod::MovieHash),
            candidate("b.srt", "eng", MatchMethod::MovieHash),
        ]));
        service.push_search(Ok(vec![
            candidate("c.srt", "fre", MatchMethod::MovieHash),
            candidate("d.srt", "fre", MatchMethod::MovieHash),
        ]));
        let transport = MockTransport::default();
        let mut ui = MockUi::with_selections(vec![Selection::Cancelled, Selection::Chosen("c.srt".to_string())]);
        let manual = Settings { selection_mode: SelectionMode::Manual, ..settings(&["eng", "fre"]) };

        let status = run(manual, &service, &transport, &mut ui, vec![video]);

        assert_eq!(status, ExitStatus::NothingFound);
        assert_eq!(ui.requests.len(), 1);
        assert!(transport.fetched().is_empty());
    }

    #[test]
    fn test_manual_choice_is_downloaded() {
        let (dir, video) = video_dir("movie.mkv");
        let service = MockService::default();
        let wanted = candidate("b.srt", "eng", MatchMethod::MovieHash);
        service.push_search(Ok(vec![candidate("a.srt", "eng", MatchMethod::MovieHash), wanted.clone()]));
        let mut transport = MockTransport::default();
        transport.serve(&wanted.download_link, b"chosen");
        let mut ui = MockUi::with_selections(vec![Selection::Chosen("b.srt".to_string())]);
        let manual = Settings { selection_mode: SelectionMode::Manual, ..settings(&["eng"]) };

        let status = run(manual, &service, &transport, &mut ui, vec![video]);

        assert_eq!(status, ExitStatus::Downloaded);
        assert_eq!(transport.fetched(), vec![wanted.download_link]);
        assert_eq!(std::fs::read_to_string(dir.path().join("movie.srt")).unwrap(), "chosen");
    }

    #[test]
    fn test_existing_subtitle_is_skipped_without_overwrite() {
        let (dir, video) = video_dir("movie.mkv");
        std::fs::write(dir.path().join("movie.srt"), "mine").unwrap();
        let service = MockService::default();
        let transport = MockTransport::default();
        let mut ui = MockUi::default();
        let keep = Settings { overwrite_existing: false, ..settings(&["eng"]) };

        let status = run(keep, &service, &transport, &mut ui, vec![video]);

        assert_eq!(status, ExitStatus::NothingFound);
        assert_eq!(service.login_calls(), 0);
        assert_eq!(std::fs::read_to_string(dir.path().join("movie.srt")).unwrap(), "mine");
    }

    #[test]
    fn test_invalid_paths_are_reported_and_skipped() {
        let dir = tempdir().unwrap();
        let notes = dir.path().join("notes.txt");
        std::fs::write(&notes, "text").unwrap();
        let service = MockService::default();
        let transport = MockTransport::default();
        let mut ui = MockUi::default();

        let status = run(settings(&["eng"]), &service, &transport, &mut ui, vec![notes]);

        assert_eq!(status, ExitStatus::NothingFound);
        assert_eq!(ui.notices, vec![(NoticeLevel::Warning, "File type error!".to_string())]);
        assert_eq!(service.login_calls(), 0);
    }

    #[test]
    fn test_small_video_is_searched_by_name() {
        let dir = tempdir().unwrap();
        let video = dir.path().join("clip.mkv");
        std::fs::write(&video, b"tiny").unwrap();
        let service = MockService::default();
        let transport = MockTransport::default();
        let mut ui = MockUi::default();
        let on = Settings { language_suffix: SuffixPolicy::On, ..settings(&["eng"]) };

        run(on, &service, &transport, &mut ui, vec![video]);

        let searches = service.searches();
        assert_eq!(searches.len(), 1);
        assert_eq!(
            searches[0][0],
            SearchCriteria::Name { language: "eng".to_string(), query: "clip.mkv".to_string() }
        );
        assert_eq!(ui.notices[0], (NoticeLevel::Warning, "Hashing error!".to_string()));
    }

    #[test]
    fn test_unusable_subtitle_format_is_skipped() {
        let (dir, video) = video_dir("movie.mkv");
        let service = MockService::default();
        let mut sub = candidate("movie.srt", "eng", MatchMethod::MovieHash);
        sub.format = "../../escape".to_string();
        service.push_search(Ok(vec![sub.clone()]));
        let mut transport = MockTransport::default();
        transport.serve(&sub.download_link, b"hello");
        let mut ui = MockUi::default();

        let status = run(settings(&["eng"]), &service, &transport, &mut ui, vec![video]);

        assert_eq!(status, ExitStatus::NothingFound);
        assert!(transport.fetched().is_empty());
        assert_eq!(ui.notices, vec![(NoticeLevel::Warning, "Download error!".to_string())]);
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }
}
