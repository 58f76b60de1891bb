//! Test doubles for the remote service, the download transport and the UI

use std::collections::{HashMap, VecDeque};
use std::io::Write;
use std::sync::Mutex;

use flate2::write::GzEncoder;
use flate2::Compression;

use crate::data_structures::{MatchMethod, SearchCriteria, SubtitleCandidate};
use crate::download::Transport;
use crate::error::{DownloadError, RpcError};
use crate::opensubtitles::{LoginResponse, SubtitleService};
use crate::selection::{ColumnVisibility, NoticeLevel, Selection, SelectionRequest, UserInterface};
use crate::settings::Credentials;

/// A candidate with neutral defaults
pub fn candidate(file_name: &str, language_code: &str, matched_by: MatchMethod) -> SubtitleCandidate {
    SubtitleCandidate {
        file_name: file_name.to_string(),
        language_code: language_code.to_string(),
        language_name: language_code.to_string(),
        iso639: language_code.chars().take(2).collect(),
        rating: "0.0".to_string(),
        download_count: "0".to_string(),
        hearing_impaired: false,
        matched_by,
        download_link: format!("http://dl.test/{}.gz", file_name),
        format: "srt".to_string(),
        movie_name: "Movie".to_string(),
    }
}

pub fn gzip(content: &[u8]) -> Vec<u8> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(content).unwrap();
    encoder.finish().unwrap()
}

/// Scripted subtitle service; unscripted calls succeed with empty answers
#[derive(Default)]
pub struct MockService {
    login_results: Mutex<VecDeque<Result<LoginResponse, RpcError>>>,
    search_results: Mutex<VecDeque<Result<Vec<SubtitleCandidate>, RpcError>>>,
    login_calls: Mutex<usize>,
    searches: Mutex<Vec<Vec<SearchCriteria>>>,
    logouts: Mutex<Vec<String>>,
}

impl MockService {
    pub fn push_login(&self, result: Result<LoginResponse, RpcError>) {
        self.login_results.lock().unwrap().push_back(result);
    }

    pub fn push_search(&self, result: Result<Vec<SubtitleCandidate>, RpcError>) {
        self.search_results.lock().unwrap().push_back(result);
    }

    pub fn login_calls(&self) -> usize {
        *self.login_calls.lock().unwrap()
    }

    pub fn searches(&self) -> Vec<Vec<SearchCriteria>> {
        self.searches.lock().unwrap().clone()
    }

    pub fn logouts(&self) -> Vec<String> {
        self.logouts.lock().unwrap().clone()
    }
}

impl SubtitleService for MockService {
    fn login(&self, _credentials: &Credentials) -> Result<LoginResponse, RpcError> {
        *self.login_calls.lock().unwrap() += 1;
        self.login_results.lock().unwrap().pop_front().unwrap_or_else(|| {
            Ok(LoginResponse { status: "200 OK".to_string(), token: Some("token".to_string()) })
        })
    }

    fn search(&self, _token: &str, criteria: &[SearchCriteria]) -> Result<Vec<SubtitleCandidate>, RpcError> {
        self.searches.lock().unwrap().push(criteria.to_vec());
        self.search_results.lock().unwrap().pop_front().unwrap_or_else(|| Ok(Vec::new()))
    }

    fn logout(&self, token: &str) -> Result<(), RpcError> {
        self.logouts.lock().unwrap().push(token.to_string());
        Ok(())
    }
}

/// Serves gzip payloads by URL; unknown URLs fail
#[derive(Default)]
pub struct MockTransport {
    payloads: HashMap<String, Vec<u8>>,
    fetched: Mutex<Vec<String>>,
}

impl MockTransport {
    pub fn serve(&mut self, url: &str, content: &[u8]) {
        self.payloads.insert(url.to_string(), gzip(content));
    }

    pub fn serve_raw(&mut self, url: &str, payload: Vec<u8>) {
        self.payloads.insert(url.to_string(), payload);
    }

    pub fn fetched(&self) -> Vec<String> {
        self.fetched.lock().unwrap().clone()
    }
}

impl Transport for MockTransport {
    fn fetch(&self, url: &str) -> Result<Vec<u8>, DownloadError> {
        self.fetched.lock().unwrap().push(url.to_string());
        self.payloads
            .get(url)
            .cloned()
            .ok_or_else(|| DownloadError::Transfer(format!("no payload for {}", url)))
    }
}

/// What a selection window was asked to show
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub title: String,
    pub file_names: Vec<String>,
    pub columns: ColumnVisibility,
}

/// Answers selections from a script; an exhausted script cancels
#[derive(Default)]
pub struct MockUi {
    selections: VecDeque<Selection>,
    pub requests: Vec<RecordedRequest>,
    pub notices: Vec<(NoticeLevel, String)>,
}

impl MockUi {
    pub fn with_selections(selections: Vec<Selection>) -> Self {
        Self { selections: selections.into(), ..Self::default() }
    }
}

impl UserInterface for MockUi {
    fn select(&mut self, request: &SelectionRequest<'_>) -> Selection {
        self.requests.push(RecordedRequest {
            title: request.video_title.to_string(),
            file_names: request.candidates.iter().map(|c| c.file_name.clone()).collect(),
            columns: request.columns,
        });
        self.selections.pop_front().unwrap_or(Selection::Cancelled)
    }

    fn notify(&mut self, level: NoticeLevel, title: &str, _message: &str) {
        self.notices.push((level, title.to_string()));
    }
}
