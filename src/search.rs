//! Session handling and the two-tier subtitle search
//!
//! A [`SearchSession`] owns the login token and logs out exactly once, either
//! through [`SearchSession::close`] or when it is dropped. A failed login is
//! retried once; a search is retried once when the failure looks transient.

use std::thread;
use std::time::Duration;

use crate::config::{LOGIN_OK_STATUS, RETRY_DELAY};
use crate::data_structures::{
    LanguageSearch, LanguageSelector, SearchCriteria, SubtitleCandidate, VideoFile, VideoSearch,
};
use crate::error::{ConnectionError, RpcError, SearchError};
use crate::opensubtitles::SubtitleService;
use crate::settings::{Credentials, Settings};
use crate::subtitle_utils::SubtitleUtils;

/// Pause before the single retry of a remote call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self { delay: RETRY_DELAY }
    }
}

impl RetryPolicy {
    pub fn immediate() -> Self {
        Self { delay: Duration::ZERO }
    }
}

/// Run `call`, and run it once more after the policy delay if the failure passes `retry_on`
fn with_retry<T>(
    policy: RetryPolicy,
    what: &str,
    retry_on: impl Fn(&RpcError) -> bool,
    mut call: impl FnMut() -> Result<T, RpcError>,
) -> Result<T, RpcError> {
    match call() {
        Err(e) if retry_on(&e) => {
            log::warn!("{} failed ({}), retrying in {:?}", what, e, policy.delay);
            if !policy.delay.is_zero() {
                thread::sleep(policy.delay);
            }
            call()
        }
        other => other,
    }
}

/// Log in and open a session
pub fn connect<'a, S>(
    service: &'a S,
    credentials: &Credentials,
    policy: RetryPolicy,
) -> Result<SearchSession<'a, S>, ConnectionError>
where
    S: SubtitleService + ?Sized,
{
    log::info!("Connecting to the subtitle service");
    let response =
        with_retry(policy, "Login", |_| true, || service.login(credentials)).map_err(ConnectionError::Unreachable)?;

    if response.status != LOGIN_OK_STATUS {
        return Err(ConnectionError::Refused(response.status));
    }
    let token = response
        .token
        .ok_or_else(|| ConnectionError::Refused("no session token in login answer".to_string()))?;

    log::info!("Logged in to the subtitle service");
    Ok(SearchSession { service, token, policy, closed: false })
}

/// An open session with the subtitle service
pub struct SearchSession<'a, S: SubtitleService + ?Sized> {
    service: &'a S,
    token: String,
    policy: RetryPolicy,
    closed: bool,
}

impl<'a, S: SubtitleService + ?Sized> SearchSession<'a, S> {
    /// One remote search, retried once on a transient failure
    pub fn search(&self, criteria: &SearchCriteria) -> Result<Vec<SubtitleCandidate>, SearchError> {
        with_retry(self.policy, "Search", RpcError::is_transient, || {
            self.service.search(&self.token, std::slice::from_ref(criteria))
        })
        .map_err(|source| SearchError { language: criteria.language().to_string(), source })
    }

    /// Search one language entry: by fingerprint first, then by file name
    ///
    /// A failed hash search counts as empty, so the name search still runs.
    /// The hash error is returned only when there is no name search or it
    /// fails as well.
    pub fn search_language(
        &self,
        video: &VideoFile,
        language: &str,
        search_by_name: bool,
    ) -> Result<Vec<SubtitleCandidate>, SearchError> {
        let mut hash_error = None;
        if let Some(hash) = &video.fingerprint {
            let by_hash = SearchCriteria::Hash {
                language: language.to_string(),
                movie_hash: hash.clone(),
                movie_size: video.size,
            };
            match self.search(&by_hash) {
                Ok(found) if !found.is_empty() => {
                    log::info!(
                        "{} {} subtitle(s) matched by hash for {}",
                        found.len(),
                        SubtitleUtils::language_code_to_name(language),
                        video.file_name
                    );
                    return Ok(found);
                }
                Ok(_) => {}
                Err(e) => {
                    log::warn!("{}", e);
                    hash_error = Some(e);
                }
            }
        }

        if !search_by_name {
            return match hash_error {
                Some(e) => Err(e),
                None => Ok(Vec::new()),
            };
        }

        let by_name = SearchCriteria::Name { language: language.to_string(), query: video.file_name.clone() };
        let found = self.search(&by_name)?;
        log::info!(
            "{} {} subtitle(s) matched by name for {}",
            found.len(),
            SubtitleUtils::language_code_to_name(language),
            video.file_name
        );
        Ok(found)
    }

    /// Search every language entry for a video
    ///
    /// A failing language is logged and returned among the errors; the other
    /// languages are still searched.
    pub fn search_video(
        &self,
        video: &VideoFile,
        languages: &LanguageSelector,
        settings: &Settings,
    ) -> (VideoSearch, Vec<SearchError>) {
        let mut result = VideoSearch::default();
        let mut errors = Vec::new();
        for language in languages.entries() {
            match self.search_language(video, language, settings.search_by_name) {
                Ok(candidates) => result.languages.push(LanguageSearch { language: language.clone(), candidates }),
                Err(e) => {
                    log::error!("{}", e);
                    errors.push(e);
                }
            }
        }
        (result, errors)
    }

    /// Log out now
    pub fn close(mut self) {
        self.logout();
    }

    fn logout(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        match self.service.logout(&self.token) {
            Ok(()) => log::info!("Logged out of the subtitle service"),
            Err(e) => log::warn!("Logout failed: {}", e),
        }
    }
}

impl<S: SubtitleService + ?Sized> Drop for SearchSession<'_, S> {
    fn drop(&mut self) {
        self.logout();
    }
}
