//! Rotating pool of cookie files used to authenticate upstream requests.
//!
//! The pool is discovered from a directory scan exactly once per process and
//! frozen; cookies fetched by [`CookiePool::refresh`] land on disk for the
//! next process, not the running jar. Selection is memoryless: a cookie the
//! upstream has already burned is as likely to be picked as any other.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Once, OnceLock};

use rand::RngExt;
use rand::seq::IndexedRandom;
use tracing::{debug, info, warn};

use crate::HTTP_CLIENT;

use super::SourceResult;

/// Picks one cookie out of the frozen jar.
///
/// Kept behind a trait so alternative policies (round-robin, skip recently
/// failed) can be swapped in without touching callers.
pub trait CookieSelector: Send + Sync {
    fn pick<'a>(&self, jar: &'a [PathBuf]) -> Option<&'a PathBuf>;
}

/// Default policy: uniform random over the snapshot, no memory of failures.
pub struct UniformRandom;

impl CookieSelector for UniformRandom {
    fn pick<'a>(&self, jar: &'a [PathBuf]) -> Option<&'a PathBuf> {
        jar.choose(&mut rand::rng())
    }
}

/// Lazily discovered, immutable set of cookie files.
pub struct CookiePool {
    dir: PathBuf,
    jar: OnceLock<Vec<PathBuf>>,
    warned: Once,
    selector: Box<dyn CookieSelector>,
}

impl CookiePool {
    pub fn new(dir: PathBuf) -> Self {
        Self::with_selector(dir, Box::new(UniformRandom))
    }

    pub fn with_selector(dir: PathBuf, selector: Box<dyn CookieSelector>) -> Self {
        Self {
            dir,
            jar: OnceLock::new(),
            warned: Once::new(),
            selector,
        }
    }

    /// Returns one cookie file to authenticate with, or `None` when the pool
    /// is empty.
    ///
    /// The first call scans the cookie directory and freezes the result; an
    /// empty pool logs its warning once per process lifetime and is a
    /// degraded mode, not an error; callers proceed unauthenticated.
    pub fn select(&self) -> Option<PathBuf> {
        let jar = self.jar.get_or_init(|| discover(&self.dir));

        if jar.is_empty() {
            self.warned.call_once(|| {
                warn!(
                    "No cookie files found in {}; downloads may fail or be throttled",
                    self.dir.display()
                );
            });
            return None;
        }

        self.selector.pick(jar).cloned()
    }

    /// Fetches fresh cookie files from the given remote URLs, sequentially.
    ///
    /// Each URL is rewritten to its raw-content variant and the response body
    /// written to a uniquely named `cookie<5-digit>.txt` in the cookie
    /// directory. The first failure aborts the remaining batch and
    /// propagates: this is an explicit operator action, not a steady-state
    /// path, so fail-fast is acceptable.
    pub async fn refresh(&self, urls: &[String]) -> SourceResult<()> {
        info!("Refreshing cookies from {} source(s)...", urls.len());

        for url in urls {
            let link = url.replace("me/", "me/raw/");
            let response = HTTP_CLIENT.get(&link).send().await?.error_for_status()?;
            let body = response.bytes().await?;

            let name = format!("cookie{}.txt", rand::rng().random_range(10000..100000));
            let path = self.dir.join(name);
            fs::write(&path, &body)?;
            debug!("Saved cookie file {}", path.display());
        }

        info!("Cookie refresh complete.");
        Ok(())
    }
}

/// Scans the cookie directory for recognized files. An unreadable directory
/// yields an empty jar rather than an error.
fn discover(dir: &Path) -> Vec<PathBuf> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            debug!("Cookie directory {} not readable: {}", dir.display(), e);
            return Vec::new();
        }
    };

    entries
        .flatten()
        .map(|entry| entry.path())
        .filter(|path| path.extension().is_some_and(|ext| ext == "txt"))
        .collect()
}
