//! Chromium process and page lifecycle.

use chromiumoxide::cdp::browser_protocol::page::{
    EventJavascriptDialogOpening, HandleJavaScriptDialogParams,
};
use chromiumoxide::cdp::js_protocol::runtime::EventConsoleApiCalled;
use chromiumoxide::{Browser, BrowserConfig, Page};
use futures::StreamExt;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

const USER_DATA_DIR_ENV: &str = "JSID_USER_DATA_DIR";

#[derive(Debug, Clone, Default)]
pub struct LaunchOptions {
    pub headless: bool,
    /// Falls back to `CHROME_BIN`, then to chromiumoxide's own lookup.
    pub chrome_bin: Option<PathBuf>,
}

impl LaunchOptions {
    fn executable(&self) -> Option<PathBuf> {
        self.chrome_bin
            .clone()
            .or_else(|| std::env::var_os("CHROME_BIN").map(PathBuf::from))
    }
}

/// Chromium profile directory. A directory we created is removed on close;
/// one named by `JSID_USER_DATA_DIR` is left alone.
#[derive(Debug)]
struct ProfileDir {
    path: PathBuf,
    owned: bool,
}

impl ProfileDir {
    fn resolve() -> Result<Self, BoxError> {
        if let Some(dir) = std::env::var_os(USER_DATA_DIR_ENV) {
            let path = PathBuf::from(dir);
            std::fs::create_dir_all(&path)?;
            info!("Using user data dir from {}: {}", USER_DATA_DIR_ENV, path.display());
            return Ok(Self { path, owned: false });
        }

        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_err(|e| format!("System clock error: {}", e))?
            .as_nanos();
        let path = std::env::temp_dir().join(format!(
            "jsid-chromium-profile-{}-{}",
            std::process::id(),
            nanos
        ));
        std::fs::create_dir_all(&path)?;
        debug!("Using isolated user data dir: {}", path.display());
        Ok(Self { path, owned: true })
    }

    fn path(&self) -> &Path {
        &self.path
    }

    fn remove(self) {
        if !self.owned {
            return;
        }
        if let Err(e) = std::fs::remove_dir_all(&self.path) {
            debug!("Failed to clean up user-data-dir {}: {}", self.path.display(), e);
        }
    }
}

pub struct CdpClient {
    pub browser: Browser,
    pub page: Page,
    handler_task: JoinHandle<()>,
    page_tasks: Vec<JoinHandle<()>>,
    profile: ProfileDir,
}

impl CdpClient {
    pub async fn launch(options: &LaunchOptions) -> Result<Self, BoxError> {
        let profile = ProfileDir::resolve()?;

        let mut builder = BrowserConfig::builder()
            .no_sandbox()
            .user_data_dir(profile.path());
        if options.headless {
            info!("Launching browser in headless mode");
        } else {
            info!("Launching browser in visible mode");
            builder = builder.with_head();
        }
        if let Some(executable) = options.executable() {
            info!("Using custom Chrome binary: {}", executable.display());
            builder = builder.chrome_executable(executable);
        }
        let config = builder
            .build()
            .map_err(|e| format!("Failed to build browser config: {}", e))?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| format!("Failed to launch browser: {}", e))?;
        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    debug!("Browser handler error (ignoring): {}", e);
                }
            }
            debug!("Browser handler task ended");
        });

        let page = browser
            .new_page("about:blank")
            .await
            .map_err(|e| format!("Failed to create page: {}", e))?;

        let page_tasks = vec![
            forward_console(&page).await?,
            accept_dialogs(&page).await?,
        ];

        Ok(Self {
            browser,
            page,
            handler_task,
            page_tasks,
            profile,
        })
    }

    pub async fn close(mut self) -> Result<(), BoxError> {
        for task in self.page_tasks.drain(..) {
            task.abort();
        }
        self.browser
            .close()
            .await
            .map_err(|e| format!("Error closing browser: {}", e))?;
        self.handler_task
            .await
            .map_err(|e| format!("Error awaiting handler: {}", e))?;
        self.profile.remove();
        Ok(())
    }
}

/// Page `console.*` output, logged at debug level.
async fn forward_console(page: &Page) -> Result<JoinHandle<()>, BoxError> {
    let mut events = page
        .event_listener::<EventConsoleApiCalled>()
        .await
        .map_err(|e| format!("Failed to subscribe to console events: {}", e))?;

    Ok(tokio::spawn(async move {
        while let Some(event) = events.next().await {
            let args: Vec<String> = event
                .args
                .iter()
                .map(|arg| {
                    arg.description
                        .clone()
                        .or_else(|| arg.value.as_ref().map(|v| v.to_string()))
                        .unwrap_or_else(|| "unknown".to_string())
                })
                .collect();
            debug!("Browser console [{:?}]: {}", event.r#type, args.join(" "));
        }
    }))
}

/// An open alert blocks every evaluation on the page, so accept them all.
async fn accept_dialogs(page: &Page) -> Result<JoinHandle<()>, BoxError> {
    let mut events = page
        .event_listener::<EventJavascriptDialogOpening>()
        .await
        .map_err(|e| format!("Failed to subscribe to dialog events: {}", e))?;

    let page = page.clone();
    Ok(tokio::spawn(async move {
        while let Some(event) = events.next().await {
            info!("Accepting {:?} dialog: {}", event.r#type, event.message);
            if let Err(e) = page.execute(HandleJavaScriptDialogParams::new(true)).await {
                warn!("Failed to accept dialog: {}", e);
            }
        }
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explicit_chrome_bin_wins() {
        let options = LaunchOptions {
            headless: true,
            chrome_bin: Some(PathBuf::from("/opt/chromium/chrome")),
        };
        assert_eq!(options.executable(), Some(PathBuf::from("/opt/chromium/chrome")));
    }

    #[test]
    fn test_owned_profile_dir_is_removed() {
        let path = std::env::temp_dir().join(format!("jsid-profile-test-{}", std::process::id()));
        std::fs::create_dir_all(&path).unwrap();

        let profile = ProfileDir {
            path: path.clone(),
            owned: true,
        };
        profile.remove();
        assert!(!path.exists());
    }

    #[test]
    fn test_borrowed_profile_dir_is_kept() {
        let dir = tempfile::tempdir().unwrap();
        let profile = ProfileDir {
            path: dir.path().to_path_buf(),
            owned: false,
        };
        profile.remove();
        assert!(dir.path().exists());
    }
}
