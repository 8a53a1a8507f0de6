//! Production `HostCommands` backed by the Tauri window APIs plus Win32 calls
//! for the verbs Tauri does not cover (foreground window, text injection).

use anyhow::{anyhow, Context, Result};
use tauri::{AppHandle, Emitter, Manager, WebviewWindow};

use super::{CursorPoint, HostCommands, RecordingIndicator, WindowInfo};

pub const OVERLAY_WINDOW_LABEL: &str = "main";

pub struct TauriHost {
    app: AppHandle,
}

impl TauriHost {
    pub fn new(app: AppHandle) -> Self {
        Self { app }
    }

    fn overlay(&self) -> Result<WebviewWindow> {
        self.app
            .get_webview_window(OVERLAY_WINDOW_LABEL)
            .ok_or_else(|| anyhow!("overlay window '{OVERLAY_WINDOW_LABEL}' not found"))
    }
}

impl HostCommands for TauriHost {
    fn cursor_position(&self) -> Result<CursorPoint> {
        let position = self
            .app
            .cursor_position()
            .context("querying cursor position")?;
        Ok(CursorPoint {
            x: position.x as i32,
            y: position.y as i32,
        })
    }

    fn foreground_window(&self) -> Result<WindowInfo> {
        #[cfg(windows)]
        {
            super::win32::foreground_window()
        }

        #[cfg(not(windows))]
        {
            anyhow::bail!("foreground window query is not supported on this platform")
        }
    }

    fn inject_text_at(&self, text: &str, x: i32, y: i32) -> Result<()> {
        #[cfg(windows)]
        {
            super::win32::inject_text_at(text, x, y)
        }

        #[cfg(not(windows))]
        {
            let _ = (text, x, y);
            anyhow::bail!("text injection is not supported on this platform")
        }
    }

    fn set_click_through(&self, enabled: bool) -> Result<()> {
        self.overlay()?
            .set_ignore_cursor_events(enabled)
            .context("toggling click-through")
    }

    fn set_always_on_top(&self, enabled: bool) -> Result<()> {
        self.overlay()?
            .set_always_on_top(enabled)
            .context("toggling always-on-top")
    }

    fn always_on_top(&self) -> Result<bool> {
        self.overlay()?
            .is_always_on_top()
            .context("querying always-on-top")
    }

    fn overlay_focused(&self) -> Result<bool> {
        self.overlay()?.is_focused().context("querying focus")
    }

    fn screen_size(&self) -> Result<(i32, i32)> {
        let monitor = self
            .overlay()?
            .primary_monitor()
            .context("querying primary monitor")?
            .ok_or_else(|| anyhow!("no primary monitor"))?;
        let size = monitor.size();
        Ok((size.width as i32, size.height as i32))
    }

    fn set_recording_indicator(&self, state: RecordingIndicator) -> Result<()> {
        // The overlay shell renders the indicator; there is no hardware LED.
        self.app
            .emit("recording_indicator", state)
            .context("emitting recording indicator")
    }

    fn supports_cursor_polling(&self) -> bool {
        !cfg!(any(target_os = "android", target_os = "ios"))
    }
}
