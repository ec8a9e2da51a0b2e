//! Connection configuration, stored as a dotenv-style key/value file.
//!
//! Resolution order mirrors the documented behavior: an explicit
//! `--env-file` path wins, then the global config dir with `--global`,
//! otherwise `./.env` in the current directory. The `token` command is
//! the only writer.

use crate::error::{NoteshipError, Result};
use directories::ProjectDirs;
use std::fs;
use std::path::{Path, PathBuf};

pub const SERVER_KEY: &str = "TRILIUM_SERVER";
pub const TOKEN_KEY: &str = "TRILIUM_TOKEN";
const ENV_FILENAME: &str = ".env";

/// Server URL and auth token read from an env file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Connection {
    pub server_url: String,
    pub token: String,
}

impl Connection {
    /// Token with all but the last four characters masked, for display.
    /// Tokens shorter than eight characters are masked entirely since a
    /// visible tail would give most of them away.
    pub fn masked_token(&self) -> String {
        if self.token.chars().count() < 8 {
            return "*".repeat(8);
        }
        let tail: String = self
            .token
            .chars()
            .rev()
            .take(4)
            .collect::<Vec<_>>()
            .into_iter()
            .rev()
            .collect();
        format!("{}...{}", "*".repeat(8), tail)
    }
}

/// Location of the global env file (`~/.config/noteship/.env` or the
/// platform equivalent).
pub fn global_env_path() -> Result<PathBuf> {
    let dirs = ProjectDirs::from("com", "noteship", "noteship")
        .ok_or_else(|| NoteshipError::Config("Could not determine config dir".to_string()))?;
    Ok(dirs.config_dir().join(ENV_FILENAME))
}

/// Pick the env file to use: explicit path, global, or `./.env`.
pub fn resolve_path(explicit: Option<&Path>, global: bool) -> Result<PathBuf> {
    if let Some(path) = explicit {
        return Ok(path.to_path_buf());
    }
    if global {
        return global_env_path();
    }
    Ok(PathBuf::from(ENV_FILENAME))
}

/// Load a connection from the given env file.
pub fn load(path: &Path) -> Result<Connection> {
    if !path.exists() {
        return Err(NoteshipError::Config(format!(
            "Env file not found: {} (run `noteship token` first)",
            path.display()
        )));
    }

    let mut server_url = None;
    let mut token = None;
    for item in dotenvy::from_path_iter(path)
        .map_err(|e| NoteshipError::Config(format!("{}: {}", path.display(), e)))?
    {
        let (key, value) =
            item.map_err(|e| NoteshipError::Config(format!("{}: {}", path.display(), e)))?;
        match key.as_str() {
            SERVER_KEY => server_url = Some(value),
            TOKEN_KEY => token = Some(value),
            _ => {}
        }
    }

    match (server_url, token) {
        (Some(server_url), Some(token)) if !server_url.is_empty() && !token.is_empty() => {
            Ok(Connection { server_url, token })
        }
        _ => Err(NoteshipError::Config(format!(
            "{} must define {} and {}",
            path.display(),
            SERVER_KEY,
            TOKEN_KEY
        ))),
    }
}

/// Write a connection to the given env file, creating parent dirs.
pub fn save(path: &Path, conn: &Connection) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent).map_err(NoteshipError::Io)?;
        }
    }
    let content = format!(
        "{}={}\n{}={}\n",
        SERVER_KEY, conn.server_url, TOKEN_KEY, conn.token
    );
    fs::write(path, content).map_err(NoteshipError::Io)?;
    Ok(())
}
