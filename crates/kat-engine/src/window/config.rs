use anyhow::{ensure, Result};

/// Window configuration.
///
/// `vsync_interval` is the number of display refreshes per presented frame:
/// `0` presents immediately, `1` caps to the refresh rate, `N` to one frame
/// every `N` refreshes (where the backend supports it).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowConfig {
    pub title: String,
    pub width: u32,
    pub height: u32,
    pub vsync_interval: u32,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            title: "kat".to_string(),
            width: 1280,
            height: 720,
            vsync_interval: 1,
        }
    }
}

impl WindowConfig {
    pub fn new(title: impl Into<String>, width: u32, height: u32) -> Self {
        Self {
            title: title.into(),
            width,
            height,
            ..Self::default()
        }
    }

    pub fn with_vsync_interval(mut self, interval: u32) -> Self {
        self.vsync_interval = interval;
        self
    }

    /// Rejects zero-sized windows.
    pub fn validate(&self) -> Result<()> {
        ensure!(
            self.width > 0 && self.height > 0,
            "window size must be positive, got {}x{}",
            self.width,
            self.height
        );
        Ok(())
    }
}
