//! Cookie jar persistence between CLI runs
//!
//! The server keeps the durable credential in an HTTP-only cookie. A browser
//! tab keeps it for free; a CLI process has to write it somewhere. The jar is
//! saved as a single `Cookie:` header value for the refresh endpoint's URL,
//! which is the only origin the durable credential is ever sent to.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use reqwest::cookie::{CookieStore, Jar};
use url::Url;

use crate::error::Result;

/// Default location of the persisted jar: `<config dir>/lovenote/session.cookies`.
pub fn default_jar_path() -> PathBuf {
    directories::ProjectDirs::from("com", "lovenote", "lovenote")
        .map(|dirs| dirs.config_dir().join("session.cookies"))
        .unwrap_or_else(|| PathBuf::from("./session.cookies"))
}

/// Loads a jar from `path`, scoping every cookie to `origin`.
///
/// A missing file yields an empty jar.
///
/// # Errors
///
/// Returns an error if the file exists but cannot be read.
pub fn load_jar(path: &Path, origin: &Url) -> Result<Arc<Jar>> {
    let jar = Arc::new(Jar::default());
    if !path.exists() {
        tracing::debug!(path = %path.display(), "no saved session cookies");
        return Ok(jar);
    }

    let contents = fs::read_to_string(path)
        .with_context(|| format!("failed to read session jar {}", path.display()))?;
    let mut loaded = 0usize;
    for entry in contents.split(';') {
        let cookie = entry.trim();
        if !cookie.is_empty() {
            jar.add_cookie_str(cookie, origin);
            loaded += 1;
        }
    }
    tracing::debug!(path = %path.display(), cookies = loaded, "loaded session cookies");
    Ok(jar)
}

/// Writes the cookies `jar` would send to `origin` into `path`.
///
/// When the jar holds nothing for `origin`, any existing file is removed so a
/// stale credential is not resurrected on the next run.
///
/// # Errors
///
/// Returns an error if the parent directory or the file cannot be written.
pub fn persist_jar(jar: &Jar, origin: &Url, path: &Path) -> Result<()> {
    let Some(header) = jar.cookies(origin) else {
        return clear_jar(path);
    };
    let value = header
        .to_str()
        .context("session cookies are not valid UTF-8")?;

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).with_context(|| {
                format!("failed to create session directory {}", parent.display())
            })?;
        }
    }
    fs::write(path, value.as_bytes())
        .with_context(|| format!("failed to write session jar {}", path.display()))?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(path, fs::Permissions::from_mode(0o600))
            .context("failed to set session jar permissions")?;
    }
    tracing::debug!(path = %path.display(), "saved session cookies");
    Ok(())
}

/// Removes the persisted jar. A missing file is not an error.
pub fn clear_jar(path: &Path) -> Result<()> {
    match fs::remove_file(path) {
        Ok(()) => {
            tracing::debug!(path = %path.display(), "removed session cookies");
            Ok(())
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(anyhow::Error::new(e)
            .context(format!("failed to remove session jar {}", path.display()))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn origin() -> Url {
        Url::parse("http://localhost:8080/api/users/refresh").unwrap()
    }

    fn header(jar: &Jar) -> Option<String> {
        jar.cookies(&origin())
            .map(|h| h.to_str().unwrap().to_string())
    }

    #[test]
    fn test_load_missing_file_gives_empty_jar() {
        let dir = TempDir::new().unwrap();
        let jar = load_jar(&dir.path().join("none.cookies"), &origin()).unwrap();
        assert!(header(&jar).is_none());
    }

    #[test]
    fn test_persisted_cookie_is_restored() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("session.cookies");

        let jar = Jar::default();
        jar.add_cookie_str("refresh_token=abc123; HttpOnly", &origin());
        persist_jar(&jar, &origin(), &path).unwrap();

        let restored = load_jar(&path, &origin()).unwrap();
        assert_eq!(header(&restored).as_deref(), Some("refresh_token=abc123"));
    }

    #[cfg(unix)]
    #[test]
    fn test_persisted_jar_is_private() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let path = dir.path().join("session.cookies");
        let jar = Jar::default();
        jar.add_cookie_str("refresh_token=x", &origin());
        persist_jar(&jar, &origin(), &path).unwrap();

        let mode = fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn test_persisting_empty_jar_removes_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("session.cookies");
        fs::write(&path, "refresh_token=stale").unwrap();

        persist_jar(&Jar::default(), &origin(), &path).unwrap();
        assert!(!path.exists());
    }

    #[test]
    fn test_clear_missing_file_is_ok() {
        let dir = TempDir::new().unwrap();
        clear_jar(&dir.path().join("absent")).unwrap();
    }

    #[test]
    fn test_default_jar_path_file_name() {
        assert!(default_jar_path().ends_with("session.cookies"));
    }
}
