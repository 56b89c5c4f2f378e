//! # Platform-specific utilities
//!
//! Questo modulo centralizza la risoluzione dei tool esterni (ffmpeg) in modo
//! cross-platform. Il path può essere forzato con la variabile `FFMPEG_PATH`,
//! altrimenti il tool viene cercato nel `PATH` di sistema.

use std::collections::HashMap;
use std::env;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use tracing::debug;

/// Platform-specific command manager with tool resolution
pub struct PlatformCommands {
    commands: HashMap<&'static str, &'static str>,
    overrides: HashMap<&'static str, PathBuf>,
}

impl PlatformCommands {
    /// Get the singleton instance
    pub fn instance() -> &'static Self {
        static INSTANCE: OnceLock<PlatformCommands> = OnceLock::new();
        INSTANCE.get_or_init(Self::new)
    }

    fn new() -> Self {
        let mut commands = HashMap::new();
        if cfg!(windows) {
            commands.insert("ffmpeg", "ffmpeg.exe");
        } else {
            commands.insert("ffmpeg", "ffmpeg");
        }

        let mut overrides = HashMap::new();
        if let Some(path) = env::var_os("FFMPEG_PATH") {
            debug!("Using ffmpeg from FFMPEG_PATH: {:?}", path);
            overrides.insert("ffmpeg", PathBuf::from(path));
        }

        Self { commands, overrides }
    }

    /// Get the platform-specific command name
    pub fn get_command<'a>(&'a self, base_name: &'a str) -> &'a str {
        match self.commands.get(base_name) {
            Some(command) => command,
            None => base_name,
        }
    }

    /// Path or bare name to hand to `Command::new`
    pub fn program(&self, base_name: &str) -> PathBuf {
        self.get_tool_path(base_name)
            .unwrap_or_else(|| PathBuf::from(self.get_command(base_name)))
    }

    /// Resolve a tool to an existing file, honoring overrides first
    pub fn get_tool_path(&self, base_name: &str) -> Option<PathBuf> {
        if let Some(path) = self.overrides.get(base_name) {
            return path.exists().then(|| path.clone());
        }
        find_in_system_path(self.get_command(base_name))
    }

    pub fn is_command_available(&self, base_name: &str) -> bool {
        self.get_tool_path(base_name).is_some()
    }
}

fn find_in_system_path(command: &str) -> Option<PathBuf> {
    let path_var = env::var_os("PATH")?;
    env::split_paths(&path_var)
        .map(|dir| dir.join(command))
        .find(|candidate| is_file(candidate))
}

fn is_file(path: &Path) -> bool {
    path.metadata().map(|m| m.is_file()).unwrap_or(false)
}
