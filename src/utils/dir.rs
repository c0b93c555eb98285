use std::{env, path::PathBuf};

use anyhow::{Context, Result};

const APPLICATION_DIR: &str = "crono";

/// Resolves and creates the directory holding the state file and logs.
pub fn create_application_default_path() -> Result<PathBuf> {
    let mut path = platform_state_dir()?;
    path.push(APPLICATION_DIR);

    std::fs::create_dir_all(&path)
        .with_context(|| format!("Failed to create state directory {}", path.display()))?;
    Ok(path)
}

fn platform_state_dir() -> Result<PathBuf> {
    cfg_if::cfg_if! {
        if #[cfg(windows)] {
            env::var("APPDATA")
                .map(PathBuf::from)
                .context("APPDATA should be present on Windows")
        } else if #[cfg(target_os = "macos")] {
            env::var("HOME")
                .map(|home| PathBuf::from(home).join("Library/Application Support"))
                .context("HOME should be present on macOS")
        } else {
            xdg_state_dir(env::var("XDG_STATE_HOME").ok(), env::var("HOME").ok())
                .context("Couldn't find neither XDG_STATE_HOME nor HOME")
        }
    }
}

#[cfg_attr(any(windows, target_os = "macos"), allow(dead_code))]
fn xdg_state_dir(xdg_state_home: Option<String>, home: Option<String>) -> Option<PathBuf> {
    xdg_state_home
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
        .or_else(|| home.map(|home| PathBuf::from(home).join(".local/state")))
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::xdg_state_dir;

    #[test]
    fn xdg_state_home_wins_over_home() {
        let path = xdg_state_dir(Some("/tmp/state".into()), Some("/home/user".into()));
        assert_eq!(path, Some(PathBuf::from("/tmp/state")));
    }

    #[test]
    fn falls_back_to_local_state_in_home() {
        let path = xdg_state_dir(Some("".into()), Some("/home/user".into()));
        assert_eq!(path, Some(PathBuf::from("/home/user/.local/state")));

        assert_eq!(xdg_state_dir(None, None), None);
    }
}
