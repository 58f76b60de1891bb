//! Fetching, decompressing and writing a chosen subtitle

use std::io::Read;
use std::path::Path;
use std::thread;
use std::time::Duration;

use flate2::read::GzDecoder;
use indicatif::{ProgressBar, ProgressStyle};

use crate::config::APP_VERSION;
use crate::error::DownloadError;
use crate::helper_functions::Utils;

/// Source of subtitle payloads
pub trait Transport {
    fn fetch(&self, url: &str) -> Result<Vec<u8>, DownloadError>;
}

/// Plain HTTP(S) transport
pub struct HttpTransport {
    http: reqwest::blocking::Client,
}

impl HttpTransport {
    pub fn new() -> Result<Self, reqwest::Error> {
        let http = reqwest::blocking::Client::builder()
            .user_agent(format!("subfetch/{}", APP_VERSION))
            .build()?;
        Ok(Self { http })
    }
}

impl Transport for HttpTransport {
    fn fetch(&self, url: &str) -> Result<Vec<u8>, DownloadError> {
        let response = self.http.get(url).send()?.error_for_status()?;
        Ok(response.bytes()?.to_vec())
    }
}

/// Decompress a gzip payload
pub fn decompress(payload: &[u8]) -> Result<Vec<u8>, DownloadError> {
    let mut decoder = GzDecoder::new(payload);
    let mut content = Vec::new();
    decoder.read_to_end(&mut content).map_err(DownloadError::Decompress)?;
    Ok(content)
}

fn fetch_and_write<T: Transport + ?Sized>(transport: &T, url: &str, destination: &Path) -> Result<(), DownloadError> {
    let payload = transport.fetch(url)?;
    let content = decompress(&payload)?;
    std::fs::write(destination, content)
        .map_err(|source| DownloadError::Write { path: destination.to_path_buf(), source })
}

/// Download the subtitle at `url` into `destination`, replacing any existing file
///
/// The transfer runs on a worker thread while a spinner is shown. The
/// download only counts as done when the file exists afterwards.
pub fn download<T>(transport: &T, url: &str, destination: &Path) -> Result<(), DownloadError>
where
    T: Transport + Sync + ?Sized,
{
    log::info!("Downloading {} to {}", url, destination.display());

    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::with_template("{spinner} {msg} [{elapsed}]").unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_message(format!("Downloading {}", Utils::get_file_name(destination)));
    pb.enable_steady_tick(Duration::from_millis(100));

    let outcome = thread::scope(|scope| {
        let worker = scope.spawn(|| fetch_and_write(transport, url, destination));
        worker.join().unwrap_or(Err(DownloadError::WorkerPanicked))
    });
    pb.finish_and_clear();

    outcome?;
    if !destination.is_file() {
        return Err(DownloadError::Missing(destination.to_path_buf()));
    }
    log::info!("Subtitle written to {}", destination.display());
    Ok(())
}
