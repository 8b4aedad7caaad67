//! Cached server icon encoding.
//!
//! The status action embeds the host's icon as a base64 PNG data URL.
//! Reading and encoding the file on every status request would be
//! wasteful, so the encoded string is cached and only re-read after a
//! ten-minute TTL. A read failure keeps serving the stale value when
//! one exists.

use std::path::PathBuf;
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

use base64::engine::general_purpose::STANDARD;
use base64::Engine;

const ICON_TTL: Duration = Duration::from_secs(600);

#[derive(Debug)]
struct CachedIcon {
    data_url: String,
    encoded_at: Instant,
}

/// TTL cache over the icon file's base64 data URL.
#[derive(Debug)]
pub struct IconCache {
    path: PathBuf,
    cached: Mutex<Option<CachedIcon>>,
}

impl IconCache {
    /// Create a cache over the icon file at `path`. The file is not
    /// touched until the first [`IconCache::data_url`] call.
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            cached: Mutex::new(None),
        }
    }

    /// The icon as a `data:image/png;base64,...` URL, or `None` when
    /// the file cannot be read and no earlier encoding is cached.
    pub fn data_url(&self) -> Option<String> {
        let mut cached = self.cached.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(icon) = cached.as_ref() {
            if icon.encoded_at.elapsed() < ICON_TTL {
                return Some(icon.data_url.clone());
            }
        }
        match std::fs::read(&self.path) {
            Ok(bytes) => {
                let data_url = format!("data:image/png;base64,{}", STANDARD.encode(bytes));
                *cached = Some(CachedIcon {
                    data_url: data_url.clone(),
                    encoded_at: Instant::now(),
                });
                Some(data_url)
            }
            Err(error) => {
                tracing::debug!(path = %self.path.display(), %error, "icon file not readable");
                cached.as_ref().map(|icon| icon.data_url.clone())
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_yields_none() {
        let cache = IconCache::new(PathBuf::from("does/not/exist.png"));
        assert!(cache.data_url().is_none());
    }

    #[test]
    fn encodes_and_caches_the_file() {
        let dir = std::env::temp_dir().join("ticksight-icon-test");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("server-icon.png");
        std::fs::write(&path, b"\x89PNG-fake").unwrap();

        let cache = IconCache::new(path.clone());
        let url = cache.data_url().unwrap();
        assert!(url.starts_with("data:image/png;base64,"));
        assert_eq!(url, format!("data:image/png;base64,{}", STANDARD.encode(b"\x89PNG-fake")));

        // Within the TTL the cached value survives a file change.
        std::fs::write(&path, b"different").unwrap();
        assert_eq!(cache.data_url().unwrap(), url);

        std::fs::remove_dir_all(&dir).unwrap();
    }
}
