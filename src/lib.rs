//! subfetch - Subtitle Downloader Library
//!
//! This library provides the core functionality for finding subtitles by
//! video fingerprint on opensubtitles.org and writing them next to videos.

pub mod config;
pub mod data_structures;
pub mod error;
pub mod hash;
pub mod logging;
pub mod settings;
pub mod subtitle_utils;
pub mod xmlrpc;
pub mod opensubtitles;
pub mod search;
pub mod selection;
pub mod download;
pub mod dispatch;
pub mod app;
pub mod gui;
pub mod helper_functions;

#[cfg(test)]
mod testing;

// Re-export commonly used items
pub use app::SubtitleDownloader;
pub use data_structures::*;
pub use error::*;
pub use settings::*;
