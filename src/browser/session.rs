use crate::browser::chrome::ChromePage;
use crate::browser::config::{ConnectionOptions, LaunchOptions};
use crate::error::{BrowserError, Result};
use headless_chrome::{Browser, Tab};
use std::{ffi::OsStr, sync::Arc, time::Duration};

/// Browser session that owns a Chrome/Chromium instance and hands out one page per research call
pub struct BrowserSession {
    /// The underlying headless_chrome Browser instance
    browser: Browser,

    /// User agent applied to every page opened by this session
    user_agent: String,
}

impl BrowserSession {
    /// Launch a new browser instance with the given options
    pub fn launch(options: LaunchOptions) -> Result<Self> {
        let mut launch_opts = headless_chrome::LaunchOptions::default();

        // Court sites refuse obvious automation, so drop the flags that advertise it
        launch_opts.ignore_default_args.push(OsStr::new("--enable-automation"));
        launch_opts.args.push(OsStr::new("--disable-blink-features=AutomationControlled"));
        launch_opts.args.push(OsStr::new("--disable-dev-shm-usage"));

        launch_opts.idle_browser_timeout = options.idle_timeout;
        launch_opts.headless = options.headless;
        launch_opts.window_size = Some((options.window_width, options.window_height));
        launch_opts.path = options.chrome_path;
        launch_opts.user_data_dir = options.user_data_dir;
        launch_opts.sandbox = options.sandbox;

        let browser = Browser::new(launch_opts).map_err(|e| BrowserError::LaunchFailed(e.to_string()))?;

        log::info!(
            headless = options.headless;
            "Browser launched"
        );

        Ok(Self {
            browser,
            user_agent: options.user_agent,
        })
    }

    /// Connect to an existing browser instance via WebSocket
    pub fn connect(options: ConnectionOptions) -> Result<Self> {
        let browser = Browser::connect_with_timeout(
            options.ws_url.clone(),
            Duration::from_millis(options.timeout),
        )
        .map_err(|e| BrowserError::ConnectionFailed(format!("{}: {}", options.ws_url, e)))?;

        Ok(Self {
            browser,
            user_agent: LaunchOptions::default().user_agent,
        })
    }

    /// Launch a browser with default options
    pub fn new() -> Result<Self> {
        Self::launch(LaunchOptions::default())
    }

    /// Open a fresh tab wrapped as a [`ChromePage`]
    ///
    /// Each research call gets its own page so concurrent calls share no DOM state. The caller
    /// closes it with [`BrowserSession::close_page`] when the call ends, including on timeout.
    pub fn open_page(&self) -> Result<ChromePage> {
        let tab = self
            .browser
            .new_tab()
            .map_err(|e| BrowserError::TabOperationFailed(format!("Failed to create tab: {}", e)))?;

        tab.set_user_agent(&self.user_agent, Some("pt-BR,pt;q=0.9"), None)
            .map_err(|e| BrowserError::TabOperationFailed(format!("Failed to set user agent: {}", e)))?;

        Ok(ChromePage::new(tab))
    }

    /// Close a tab previously returned by [`BrowserSession::open_page`]
    pub fn close_page(tab: &Arc<Tab>) -> Result<()> {
        tab.close(false)
            .map_err(|e| BrowserError::TabOperationFailed(format!("Failed to close tab: {}", e)))?;
        Ok(())
    }

    /// Get all tabs
    pub fn get_tabs(&self) -> Result<Vec<Arc<Tab>>> {
        let tabs = self
            .browser
            .get_tabs()
            .lock()
            .map_err(|e| BrowserError::TabOperationFailed(format!("Failed to get tabs: {}", e)))?
            .clone();

        Ok(tabs)
    }

    /// Get the underlying Browser instance
    pub fn browser(&self) -> &Browser {
        &self.browser
    }

    /// Close every open tab. The browser process itself exits when the session is dropped.
    pub fn close(&self) -> Result<()> {
        for tab in self.get_tabs()? {
            if let Err(e) = tab.close(false) {
                log::debug!("Ignoring failure to close tab: {}", e);
            }
        }
        Ok(())
    }
}
