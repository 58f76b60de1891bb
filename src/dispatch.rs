//! Batch dispatch: one process per video
//!
//! The first video of a batch is handled by the current process; each of the
//! others is handed to a sibling process started with the same options.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::thread;
use std::time::Duration;

use crate::config::DISPATCH_DELAY;

/// Split a batch into the videos handled here and the ones handed off
pub fn split_batch(videos: Vec<PathBuf>, sequential: bool) -> (Vec<PathBuf>, Vec<PathBuf>) {
    if sequential || videos.len() <= 1 {
        return (videos, Vec::new());
    }
    let mut local = videos;
    let remote = local.split_off(1);
    (local, remote)
}

/// Starts sibling processes of the running executable
pub struct Dispatcher {
    program: PathBuf,
    options: Vec<OsString>,
    delay: Duration,
}

impl Dispatcher {
    /// Dispatcher for the current executable, forwarding `options` to every child
    pub fn current(options: Vec<OsString>) -> std::io::Result<Self> {
        Ok(Self::new(std::env::current_exe()?, options, DISPATCH_DELAY))
    }

    pub fn new(program: PathBuf, options: Vec<OsString>, delay: Duration) -> Self {
        Self { program, options, delay }
    }

    fn command_for(&self, video: &Path) -> Command {
        let mut command = Command::new(&self.program);
        command.args(&self.options);
        command.arg("--");
        command.arg(video);

        #[cfg(windows)]
        {
            use std::os::windows::process::CommandExt;
            command.creation_flags(0x08000000); // CREATE_NO_WINDOW
        }

        command
    }

    /// Start one child per video, pausing between starts
    ///
    /// Returns the videos whose process could not be started, so the caller
    /// can handle them itself.
    pub fn dispatch(&self, videos: &[PathBuf]) -> Vec<PathBuf> {
        let mut not_started = Vec::new();
        for (index, video) in videos.iter().enumerate() {
            if index > 0 && !self.delay.is_zero() {
                thread::sleep(self.delay);
            }
            match self.command_for(video).spawn() {
                Ok(child) => log::info!("Started process {} for {}", child.id(), video.display()),
                Err(e) => {
                    log::error!("Failed to start a process for {}: {}", video.display(), e);
                    not_started.push(video.clone());
                }
            }
        }
        not_started
    }
}
