//! Headless Chromium driven as a child process
//!
//! The executable is resolved once and shared. Concurrent first callers wait
//! on the same resolution; a failed resolution leaves the cell empty so the
//! next call tries again.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::process::Command;
use tokio::sync::{OnceCell, Semaphore};

use crate::config::RenderConfig;
use crate::{Error, Result};

const PNG_SIGNATURE: &[u8] = b"\x89PNG\r\n\x1a\n";

/// Executable names tried on PATH when none is configured
const BROWSER_NAMES: &[&str] = &[
    "chromium",
    "chromium-browser",
    "google-chrome",
    "google-chrome-stable",
    "chrome",
    "headless_shell",
];

/// Turns an HTML document into PNG bytes
#[async_trait]
pub trait Rasterizer: Send + Sync {
    async fn screenshot(&self, html: &str, width: u32, height: u32) -> Result<Vec<u8>>;

    fn is_healthy(&self) -> bool;
}

/// Shared headless browser handle
pub struct BrowserPool {
    configured: Option<PathBuf>,
    executable: OnceCell<PathBuf>,
    permits: Semaphore,
    timeout: Duration,
}

impl BrowserPool {
    pub fn new(config: &RenderConfig) -> Self {
        Self {
            configured: config.chrome_path.clone(),
            executable: OnceCell::new(),
            permits: Semaphore::new(config.max_concurrent.max(1)),
            timeout: Duration::from_millis(config.timeout_ms),
        }
    }

    /// Resolve (once) and return the browser executable
    pub async fn executable(&self) -> Result<&Path> {
        let path = self
            .executable
            .get_or_try_init(|| locate_browser(self.configured.clone()))
            .await?;
        Ok(path.as_path())
    }

    pub fn is_initialized(&self) -> bool {
        self.executable.initialized()
    }
}

async fn locate_browser(configured: Option<PathBuf>) -> Result<PathBuf> {
    let candidate = match configured {
        Some(path) => {
            if !path.is_file() {
                return Err(Error::BrowserUnavailable(format!(
                    "configured browser {} does not exist",
                    path.display()
                )));
            }
            path
        }
        None => find_on_path().ok_or_else(|| {
            Error::BrowserUnavailable(format!("none of {} found on PATH", BROWSER_NAMES.join(", ")))
        })?,
    };

    let output = Command::new(&candidate)
        .arg("--version")
        .stdin(Stdio::null())
        .kill_on_drop(true)
        .output()
        .await
        .map_err(|e| Error::BrowserUnavailable(format!("{}: {}", candidate.display(), e)))?;
    if !output.status.success() {
        return Err(Error::BrowserUnavailable(format!(
            "{} --version exited with {}",
            candidate.display(),
            output.status
        )));
    }

    tracing::info!(
        browser = %candidate.display(),
        version = %String::from_utf8_lossy(&output.stdout).trim(),
        "headless browser ready"
    );
    Ok(candidate)
}

fn find_on_path() -> Option<PathBuf> {
    let paths = std::env::var_os("PATH")?;
    std::env::split_paths(&paths)
        .flat_map(|dir| BROWSER_NAMES.iter().map(move |name| dir.join(name)))
        .find(|candidate| candidate.is_file())
}

#[async_trait]
impl Rasterizer for BrowserPool {
    async fn screenshot(&self, html: &str, width: u32, height: u32) -> Result<Vec<u8>> {
        let executable = self.executable().await?.to_path_buf();
        let _permit = self
            .permits
            .acquire()
            .await
            .map_err(|e| Error::Render(e.to_string()))?;

        let scratch = tempfile::tempdir()?;
        let page = scratch.path().join("card.html");
        let output = scratch.path().join("card.png");
        tokio::fs::write(&page, html).await?;

        let mut command = Command::new(&executable);
        command
            .args([
                "--headless",
                "--disable-gpu",
                "--no-sandbox",
                "--disable-dev-shm-usage",
                "--hide-scrollbars",
                "--force-device-scale-factor=1",
                "--virtual-time-budget=2000",
            ])
            .arg(format!("--user-data-dir={}", scratch.path().join("profile").display()))
            .arg(format!("--window-size={},{}", width, height))
            .arg(format!("--screenshot={}", output.display()))
            .arg(format!("file://{}", page.display()))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let started = Instant::now();
        let result = tokio::time::timeout(self.timeout, command.output())
            .await
            .map_err(|_| Error::Timeout(self.timeout.as_millis() as u64))??;

        if !result.status.success() {
            let stderr = String::from_utf8_lossy(&result.stderr);
            return Err(Error::Render(format!(
                "browser exited with {}: {}",
                result.status,
                stderr.trim()
            )));
        }

        let png = tokio::fs::read(&output)
            .await
            .map_err(|e| Error::Render(format!("no screenshot written: {}", e)))?;
        if !png.starts_with(PNG_SIGNATURE) {
            return Err(Error::Render("screenshot is not a PNG".into()));
        }

        tracing::debug!(
            bytes = png.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "screenshot taken"
        );
        Ok(png)
    }

    fn is_healthy(&self) -> bool {
        self.executable.get().is_some_and(|path| path.is_file())
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::os::unix::fs::PermissionsExt;

    const FAKE_BROWSER: &str = r#"#!/bin/sh
for arg in "$@"; do
  case "$arg" in
    --version) echo "FakeChrome 1.0"; exit 0 ;;
    --screenshot=*) out="${arg#--screenshot=}" ;;
  esac
done
printf '\211PNG\r\n\032\nfake' > "$out"
"#;

    const SLOW_BROWSER: &str = r#"#!/bin/sh
case "$1" in
  --version) echo "SlowChrome 1.0"; exit 0 ;;
esac
exec sleep 5
"#;

    fn write_script(path: &Path, body: &str) {
        std::fs::write(path, body).unwrap();
        std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o755)).unwrap();
    }

    fn config(path: &Path, timeout_ms: u64) -> RenderConfig {
        RenderConfig {
            chrome_path: Some(path.to_path_buf()),
            timeout_ms,
            ..RenderConfig::default()
        }
    }

    #[tokio::test]
    async fn test_lazy_init_retry_screenshot_and_timeout() {
        let dir = tempfile::tempdir().unwrap();
        let fake = dir.path().join("fake-chrome");
        let slow = dir.path().join("slow-chrome");

        let pool = BrowserPool::new(&config(&fake, 5_000));
        assert!(!pool.is_healthy());
        assert!(matches!(pool.executable().await, Err(Error::BrowserUnavailable(_))));
        assert!(!pool.is_initialized());

        // Scripts are written before anything is spawned
        write_script(&fake, FAKE_BROWSER);
        write_script(&slow, SLOW_BROWSER);

        let png = pool.screenshot("<p>hi</p>", 1080, 1350).await.unwrap();
        assert!(png.starts_with(PNG_SIGNATURE));
        assert!(pool.is_healthy());
        assert_eq!(pool.executable().await.unwrap(), fake.as_path());

        let slow_pool = BrowserPool::new(&config(&slow, 200));
        let err = slow_pool.screenshot("<p>hi</p>", 1080, 1350).await.unwrap_err();
        assert!(matches!(err, Error::Timeout(200)));
    }

    #[tokio::test]
    async fn test_missing_browser_fails_every_caller() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope");
        let pool = BrowserPool::new(&config(&missing, 1_000));

        let (a, b) = tokio::join!(pool.executable(), pool.executable());
        assert!(a.is_err() && b.is_err());
        assert!(!pool.is_healthy());
    }
}
