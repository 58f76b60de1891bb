//! Configuration constants for the subfetch subtitle downloader
//!
//! This module contains application-wide values: the remote endpoint,
//! supported file formats, hashing window sizes and retry timings.

use std::time::Duration;

/// The current application version (keep in sync with Cargo.toml)
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// XML-RPC endpoint of the opensubtitles.org search service
pub const XMLRPC_ENDPOINT: &str = "https://api.opensubtitles.org/xml-rpc";

/// Client tag sent with every login
pub const CLIENT_TAG: &str = "opensubtitles-download 5.0";

/// Status string the service returns on a successful login
pub const LOGIN_OK_STATUS: &str = "200 OK";

/// Size of each hashed window at the head and tail of a video
pub const HASH_CHUNK_SIZE: u64 = 65536;

/// Smallest file the fingerprinter accepts (two full windows)
pub const MIN_HASHABLE_SIZE: u64 = HASH_CHUNK_SIZE * 2;

/// Fixed backoff before the single retry of a failed remote call
pub const RETRY_DELAY: Duration = Duration::from_secs(3);

/// Delay between two sibling process spawns in batch mode
pub const DISPATCH_DELAY: Duration = Duration::from_secs(1);

/// Video container extensions accepted when no media type can be guessed
pub static VIDEO_EXTENSIONS: &[&str] = &[
    "avi", "mp4", "mov", "mkv", "mk3d", "webm", "ts", "mts", "m2ts", "ps",
    "vob", "evo", "mpeg", "mpg", "m1v", "m2p", "m2v", "m4v", "movhd", "movx",
    "qt", "mxf", "ogg", "ogm", "ogv", "rm", "rmvb", "flv", "swf", "asf", "wm",
    "wmv", "wmx", "divx", "x264", "xvid",
];

/// Subtitle extensions that count as an existing subtitle next to a video
pub static SUBTITLE_EXTENSIONS: &[&str] = &["srt", "sub", "sbv", "smi", "ssa", "ass", "usf"];

/// Languages offered by the service, as (display name, search code)
pub static SUBTITLE_LANGUAGES: &[(&str, &str)] = &[
    ("Arabic", "ara"), ("Bengali", "ben"), ("Cantonese", "yue"), ("Dutch", "nld"),
    ("English", "eng"), ("Filipino", "fil"), ("French", "fre"), ("German", "ger"),
    ("Hindi", "hin"), ("Indonesian", "ind"), ("Italian", "ita"), ("Japanese", "jpn"),
    ("Korean", "kor"), ("Mandarin", "mdr"), ("Persian", "per"), ("Portuguese", "por"),
    ("Russian", "rus"), ("Spanish", "spa"), ("Swahili", "swa"), ("Turkish", "tur"),
    ("Vietnamese", "vie"),
];

/// Default size of the selection window
pub static SELECTION_WINDOW_SIZE: [f32; 2] = [720.0, 320.0];

/// Minimum size of the selection window
pub static MIN_SELECTION_WINDOW_SIZE: [f32; 2] = [480.0, 200.0];

/// Default size of the settings window
pub static SETTINGS_WINDOW_SIZE: [f32; 2] = [520.0, 600.0];
