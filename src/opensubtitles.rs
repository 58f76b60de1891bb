//! Client for the opensubtitles.org XML-RPC service
//!
//! The rest of the crate talks to the service through [`SubtitleService`],
//! so the search and selection logic can be exercised without a network.

use std::collections::BTreeMap;

use crate::config::{APP_VERSION, CLIENT_TAG, XMLRPC_ENDPOINT};
use crate::data_structures::{MatchMethod, SearchCriteria, SubtitleCandidate};
use crate::error::RpcError;
use crate::settings::Credentials;
use crate::xmlrpc::{self, Value};

/// Answer to a login request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginResponse {
    pub status: String,
    pub token: Option<String>,
}

/// The remote subtitle search service
pub trait SubtitleService {
    fn login(&self, credentials: &Credentials) -> Result<LoginResponse, RpcError>;

    fn search(&self, token: &str, criteria: &[SearchCriteria]) -> Result<Vec<SubtitleCandidate>, RpcError>;

    fn logout(&self, token: &str) -> Result<(), RpcError>;
}

/// XML-RPC client for api.opensubtitles.org
pub struct OpenSubtitlesClient {
    http: reqwest::blocking::Client,
    endpoint: String,
}

impl OpenSubtitlesClient {
    pub fn new() -> Result<Self, reqwest::Error> {
        Self::with_endpoint(XMLRPC_ENDPOINT)
    }

    pub fn with_endpoint(endpoint: &str) -> Result<Self, reqwest::Error> {
        let http = reqwest::blocking::Client::builder()
            .user_agent(format!("subfetch/{}", APP_VERSION))
            .build()?;
        Ok(Self { http, endpoint: endpoint.to_string() })
    }

    fn call(&self, method: &str, params: &[Value]) -> Result<Value, RpcError> {
        log::debug!("XML-RPC call {} to {}", method, self.endpoint);
        let body = xmlrpc::encode_call(method, params);
        let response = self
            .http
            .post(&self.endpoint)
            .header(reqwest::header::CONTENT_TYPE, "text/xml")
            .body(body)
            .send()?;
        let status = response.status();
        if !status.is_success() {
            return Err(RpcError::HttpStatus(status.as_u16()));
        }
        let text = response.text()?;
        xmlrpc::parse_response(&text)
    }
}

impl SubtitleService for OpenSubtitlesClient {
    fn login(&self, credentials: &Credentials) -> Result<LoginResponse, RpcError> {
        let params = [
            Value::from(credentials.username.as_str()),
            Value::from(credentials.password.as_str()),
            Value::from(credentials.locale.as_str()),
            Value::from(CLIENT_TAG),
        ];
        parse_login(&self.call("LogIn", &params)?)
    }

    fn search(&self, token: &str, criteria: &[SearchCriteria]) -> Result<Vec<SubtitleCandidate>, RpcError> {
        let criteria: Vec<Value> = criteria.iter().map(criteria_value).collect();
        let response = self.call("SearchSubtitles", &[Value::from(token), Value::Array(criteria)])?;
        parse_search(&response)
    }

    fn logout(&self, token: &str) -> Result<(), RpcError> {
        self.call("LogOut", &[Value::from(token)]).map(|_| ())
    }
}

/// Search criteria as the struct the service expects
pub fn criteria_value(criteria: &SearchCriteria) -> Value {
    let mut members = BTreeMap::new();
    match criteria {
        SearchCriteria::Hash { language, movie_hash, movie_size } => {
            members.insert("sublanguageid".to_string(), Value::from(language.as_str()));
            members.insert("moviehash".to_string(), Value::from(movie_hash.as_str()));
            members.insert("moviebytesize".to_string(), Value::from(movie_size.to_string()));
        }
        SearchCriteria::Name { language, query } => {
            members.insert("sublanguageid".to_string(), Value::from(language.as_str()));
            members.insert("query".to_string(), Value::from(query.as_str()));
        }
    }
    Value::Struct(members)
}

pub fn parse_login(response: &Value) -> Result<LoginResponse, RpcError> {
    let status = response
        .get("status")
        .and_then(Value::to_text)
        .ok_or_else(|| RpcError::MalformedResponse("login answer has no status".to_string()))?;
    let token = response
        .get("token")
        .and_then(Value::to_text)
        .filter(|token| !token.is_empty());
    Ok(LoginResponse { status, token })
}

/// Candidates of a search answer; `data: false` means no results
pub fn parse_search(response: &Value) -> Result<Vec<SubtitleCandidate>, RpcError> {
    match response.get("data") {
        Some(Value::Array(rows)) => rows.iter().map(parse_candidate).collect(),
        Some(Value::Bool(false)) | Some(Value::Nil) => Ok(Vec::new()),
        Some(_) => Err(RpcError::MalformedResponse("search data is not a list".to_string())),
        None => Err(RpcError::MalformedResponse("search answer has no data".to_string())),
    }
}

pub fn parse_candidate(row: &Value) -> Result<SubtitleCandidate, RpcError> {
    let field = |name: &str| -> Result<String, RpcError> {
        row.get(name)
            .and_then(Value::to_text)
            .ok_or_else(|| RpcError::MalformedResponse(format!("subtitle record has no {}", name)))
    };

    Ok(SubtitleCandidate {
        file_name: field("SubFileName")?,
        language_code: field("SubLanguageID")?,
        language_name: field("LanguageName")?,
        iso639: field("ISO639")?,
        rating: field("SubRating")?,
        download_count: field("SubDownloadsCnt")?,
        hearing_impaired: field("SubHearingImpaired")? == "1",
        matched_by: MatchMethod::from_tag(&field("MatchedBy")?),
        download_link: field("SubDownloadLink")?,
        format: field("SubFormat")?,
        movie_name: field("MovieName")?,
    })
}
