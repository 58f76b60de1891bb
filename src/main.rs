//! subfetch - Subtitle Downloader Tool
//!
//! Identifies videos by content hash, finds matching subtitles on
//! opensubtitles.org and writes them next to the videos.

use std::ffi::OsString;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, ValueEnum};

use subfetch::app::SubtitleDownloader;
use subfetch::config::APP_VERSION;
use subfetch::data_structures::ExitStatus;
use subfetch::dispatch::{split_batch, Dispatcher};
use subfetch::download::HttpTransport;
use subfetch::error::AppError;
use subfetch::gui::{edit_settings, pick_video_files, ConsoleUi, DesktopUi};
use subfetch::helper_functions::Utils;
use subfetch::logging::{setup_logging, shutdown_logging};
use subfetch::opensubtitles::OpenSubtitlesClient;
use subfetch::selection::UserInterface;
use subfetch::settings::{SelectionMode, Settings, SuffixPolicy};

/// Environment variable set by the Nautilus scripts menu
const FILE_MANAGER_SELECTION: &str = "NAUTILUS_SCRIPT_SELECTED_URIS";

#[derive(Parser, Debug)]
#[command(name = "subfetch", version, about = "Find and download subtitles for your videos")]
struct Cli {
    /// Video files or directories to search subtitles for
    paths: Vec<PathBuf>,

    /// Subtitle language code, or comma-joined codes searched together (repeatable, in priority order)
    #[arg(short, long = "lang", value_name = "CODES")]
    languages: Vec<String>,

    /// How a subtitle is picked among several candidates
    #[arg(long, value_enum)]
    selection: Option<SelectionMode>,

    /// Shorthand for --selection auto
    #[arg(long, conflicts_with = "selection")]
    auto: bool,

    /// Append the language code to subtitle file names
    #[arg(long, value_enum)]
    suffix: Option<SuffixPolicy>,

    /// Separator placed before the language code
    #[arg(long, value_name = "SEP")]
    separator: Option<String>,

    /// Do not fall back to a search by file name
    #[arg(long)]
    no_search_by_name: bool,

    /// Skip videos that already have a subtitle
    #[arg(long)]
    skip_existing: bool,

    /// opensubtitles.org username
    #[arg(short, long)]
    username: Option<String>,

    /// opensubtitles.org password
    #[arg(short, long)]
    password: Option<String>,

    /// No windows: notices go to the terminal, manual selection is skipped
    #[arg(long)]
    headless: bool,

    /// Process every video in this process, one after another
    #[arg(long)]
    sequential: bool,

    /// Persist the effective settings
    #[arg(long)]
    save_settings: bool,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    /// Override loaded settings with the command line
    fn apply_to(&self, settings: &mut Settings) {
        if !self.languages.is_empty() {
            settings.languages = self.languages.clone();
        }
        if self.auto {
            settings.selection_mode = SelectionMode::Auto;
        } else if let Some(mode) = self.selection {
            settings.selection_mode = mode;
        }
        if let Some(policy) = self.suffix {
            settings.language_suffix = policy;
        }
        if let Some(separator) = &self.separator {
            settings.language_separator = separator.clone();
        }
        if self.no_search_by_name {
            settings.search_by_name = false;
        }
        if self.skip_existing {
            settings.overwrite_existing = false;
        }
        if let Some(username) = &self.username {
            settings.credentials.username = username.clone();
        }
        if let Some(password) = &self.password {
            settings.credentials.password = password.clone();
        }
    }

    /// Options handed to the processes started for the rest of a batch
    fn forwarded_options(&self) -> Vec<OsString> {
        let mut options: Vec<OsString> = Vec::new();
        for language in &self.languages {
            options.push("--lang".into());
            options.push(language.into());
        }
        if self.auto {
            options.push("--auto".into());
        }
        if let Some(mode) = self.selection.and_then(|m| m.to_possible_value()) {
            options.push("--selection".into());
            options.push(mode.get_name().into());
        }
        if let Some(policy) = self.suffix.and_then(|p| p.to_possible_value()) {
            options.push("--suffix".into());
            options.push(policy.get_name().into());
        }
        if let Some(separator) = &self.separator {
            options.push("--separator".into());
            options.push(separator.into());
        }
        if self.no_search_by_name {
            options.push("--no-search-by-name".into());
        }
        if self.skip_existing {
            options.push("--skip-existing".into());
        }
        if let Some(username) = &self.username {
            options.push("--username".into());
            options.push(username.into());
        }
        if let Some(password) = &self.password {
            options.push("--password".into());
            options.push(password.into());
        }
        if self.headless {
            options.push("--headless".into());
        }
        if self.verbose {
            options.push("--verbose".into());
        }
        options
    }

    /// Command line paths, then the file manager selection, then a file picker
    fn input_paths(&self) -> Vec<PathBuf> {
        if !self.paths.is_empty() {
            return Utils::collect_paths(&self.paths);
        }
        if let Some(uris) = std::env::var_os(FILE_MANAGER_SELECTION) {
            log::info!("Using the file manager selection");
            return Utils::paths_from_file_manager(&uris.to_string_lossy());
        }
        if self.headless {
            return Vec::new();
        }
        pick_video_files()
    }
}

fn run(cli: &Cli) -> Result<ExitStatus, AppError> {
    let first_run = Settings::is_first_run();
    let mut settings = Settings::load();
    if first_run && !cli.headless {
        if let Some(edited) = edit_settings(&settings) {
            settings = edited;
        }
    }

    let mut stored = settings.clone();
    cli.apply_to(&mut settings);
    if cli.save_settings {
        settings.save()?;
        log::info!("Settings saved");
        stored = settings.clone();
    }

    let mut ui: Box<dyn UserInterface> =
        if cli.headless { Box::new(ConsoleUi) } else { Box::new(DesktopUi::new(stored)) };

    let paths = cli.input_paths();
    if paths.is_empty() {
        log::warn!("No video to process");
        return Ok(ExitStatus::NothingFound);
    }

    let service = OpenSubtitlesClient::new()?;
    let transport = HttpTransport::new()?;
    let mut downloader = SubtitleDownloader::new(settings, &service, &transport, ui.as_mut())?;

    let videos = downloader.filter_videos(paths);
    let (mut local, remote) = split_batch(videos, cli.sequential);
    if !remote.is_empty() {
        log::info!("Handing {} video(s) to separate processes", remote.len());
        let dispatcher = Dispatcher::current(cli.forwarded_options())?;
        local.extend(dispatcher.dispatch(&remote));
    }

    Ok(downloader.process(&local))
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = setup_logging(cli.verbose) {
        eprintln!("Failed to initialize logging: {}", e);
    }
    log::info!("Starting subfetch v{}", APP_VERSION);

    let status = match run(&cli) {
        Ok(status) => status,
        Err(e) => {
            log::error!("{}", e);
            eprintln!("Error: {}", e);
            ExitStatus::Failure
        }
    };
    log::info!("Exiting with code {}", status.code());

    shutdown_logging();
    status.into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_line_overrides_settings() {
        let cli = Cli::parse_from([
            "subfetch", "-l", "fre", "--lang", "eng,spa", "--auto", "--suffix", "on", "--skip-existing",
            "--no-search-by-name", "movie.mkv",
        ]);
        let mut settings = Settings::default();
        cli.apply_to(&mut settings);

        assert_eq!(settings.languages, vec!["fre", "eng,spa"]);
        assert_eq!(settings.selection_mode, SelectionMode::Auto);
        assert_eq!(settings.language_suffix, SuffixPolicy::On);
        assert!(!settings.overwrite_existing);
        assert!(!settings.search_by_name);
        assert_eq!(cli.paths, vec![PathBuf::from("movie.mkv")]);
    }

    #[test]
    fn test_defaults_survive_an_empty_command_line() {
        let cli = Cli::parse_from(["subfetch"]);
        let mut settings = Settings::default();
        cli.apply_to(&mut settings);
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn test_auto_conflicts_with_selection() {
        assert!(Cli::try_parse_from(["subfetch", "--auto", "--selection", "manual"]).is_err());
    }

    #[test]
    fn test_forwarded_options_reparse_to_the_same_settings() {
        let cli = Cli::parse_from([
            "subfetch", "-l", "fre", "--selection", "auto", "--suffix", "off", "--separator", ".",
            "--headless", "a.mkv", "b.mkv",
        ]);
        let mut args: Vec<OsString> = vec!["subfetch".into()];
        args.extend(cli.forwarded_options());
        args.push("--".into());
        args.push("b.mkv".into());
        let child = Cli::parse_from(args);

        let mut expected = Settings::default();
        cli.apply_to(&mut expected);
        let mut forwarded = Settings::default();
        child.apply_to(&mut forwarded);

        assert_eq!(forwarded, expected);
        assert!(child.headless);
        assert_eq!(child.paths, vec![PathBuf::from("b.mkv")]);
    }
}
