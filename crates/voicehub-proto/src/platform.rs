//! Where the daemon keeps its log and config.

use std::path::PathBuf;

const APP_DIR: &str = "voicehub";

/// Log directory: `~/.local/share/voicehub` on unix.
pub fn data_dir() -> PathBuf {
    #[cfg(unix)]
    {
        home_relative(&[".local", "share"], "/tmp")
    }
    #[cfg(windows)]
    {
        if let Some(dir) = beside_exe("data") {
            return dir.join("data");
        }
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(APP_DIR)
    }
}

/// Config directory: `~/.config/voicehub` on unix.
pub fn config_dir() -> PathBuf {
    #[cfg(unix)]
    {
        home_relative(&[".config"], ".")
    }
    #[cfg(windows)]
    {
        if let Some(dir) = beside_exe("config.toml") {
            return dir;
        }
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(APP_DIR)
    }
}

#[cfg(unix)]
fn home_relative(parts: &[&str], fallback: &str) -> PathBuf {
    let base = dirs::home_dir().unwrap_or_else(|| PathBuf::from(fallback));
    parts
        .iter()
        .fold(base, |dir, part| dir.join(part))
        .join(APP_DIR)
}

/// Directory of the running executable, if `marker` exists inside it.
#[cfg_attr(unix, allow(dead_code))]
fn beside_exe(marker: &str) -> Option<PathBuf> {
    let exe = std::env::current_exe().ok()?;
    let dir = exe.parent()?;
    dir.join(marker).exists().then(|| dir.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[cfg(unix)]
    #[test]
    fn test_unix_dirs_end_in_app_dir() {
        assert!(data_dir().ends_with(".local/share/voicehub"));
        assert!(config_dir().ends_with(".config/voicehub"));
    }

    #[test]
    fn test_marker_lookup() {
        assert!(beside_exe("voicehub-no-such-marker").is_none());
    }
}
