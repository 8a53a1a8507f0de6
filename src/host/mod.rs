//! Host Command Facade: the OS-level verbs the coordination core consumes.
//!
//! Every verb is an atomic, possibly-failing call with no queuing or retry of
//! its own. Retry policy lives entirely in the components above this layer.

pub mod tauri_host;
#[cfg(windows)]
mod win32;

use anyhow::Result;
use serde::{Deserialize, Serialize};

pub use tauri_host::TauriHost;

/// A raw screen coordinate as reported by the OS.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CursorPoint {
    pub x: i32,
    pub y: i32,
}

/// Snapshot of the foreground window at a point in time. Never updated in
/// place; callers re-fetch when they need current geometry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WindowInfo {
    pub title: String,
    pub application_name: String,
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl WindowInfo {
    pub fn origin(&self) -> CursorPoint {
        CursorPoint {
            x: self.x,
            y: self.y,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RecordingIndicator {
    Started,
    Paused,
    Finished,
}

/// The seam between the coordination core and the OS.
///
/// Implementations must be callable from any thread; the injection verb is
/// invoked from a blocking worker thread under a timeout.
pub trait HostCommands: Send + Sync {
    fn cursor_position(&self) -> Result<CursorPoint>;

    fn foreground_window(&self) -> Result<WindowInfo>;

    /// Inject `text` at the absolute screen coordinate. Stateful on the OS
    /// side (simulates input against whatever window has focus), which is why
    /// callers must never overlap two of these.
    fn inject_text_at(&self, text: &str, x: i32, y: i32) -> Result<()>;

    /// `true` makes the overlay pass pointer events through to the window
    /// beneath it.
    fn set_click_through(&self, enabled: bool) -> Result<()>;

    fn set_always_on_top(&self, enabled: bool) -> Result<()>;

    fn always_on_top(&self) -> Result<bool>;

    fn overlay_focused(&self) -> Result<bool>;

    fn screen_size(&self) -> Result<(i32, i32)>;

    /// Best-effort recording LED/indicator. Failures are the caller's to
    /// swallow.
    fn set_recording_indicator(&self, state: RecordingIndicator) -> Result<()>;

    /// Whether the host environment can answer global cursor queries. The
    /// hot-corner machine stays disabled when it cannot.
    fn supports_cursor_polling(&self) -> bool {
        true
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Mutex;
    use std::time::{Duration, Instant};

    #[derive(Debug, Clone)]
    pub struct InjectionCall {
        pub text: String,
        pub x: i32,
        pub y: i32,
        pub started: Instant,
        pub finished: Instant,
    }

    /// In-memory facade for tests. Injection call timing is recorded with
    /// wall-clock instants so serialization can be asserted even when the
    /// tokio clock is paused.
    pub struct MockHost {
        pub cursor: Mutex<Option<CursorPoint>>,
        pub window: Mutex<Option<WindowInfo>>,
        pub focused: AtomicBool,
        pub on_top: AtomicBool,
        pub inject_delay: Duration,
        pub fail_injection: AtomicBool,
        pub injections: Mutex<Vec<InjectionCall>>,
        pub click_through_calls: Mutex<Vec<bool>>,
        pub set_on_top_calls: Mutex<Vec<bool>>,
        pub fail_set_on_top: AtomicBool,
        pub indicator_calls: Mutex<Vec<RecordingIndicator>>,
        pub screen: (i32, i32),
    }

    impl Default for MockHost {
        fn default() -> Self {
            Self {
                cursor: Mutex::new(None),
                window: Mutex::new(None),
                focused: AtomicBool::new(false),
                on_top: AtomicBool::new(true),
                inject_delay: Duration::ZERO,
                fail_injection: AtomicBool::new(false),
                injections: Mutex::new(Vec::new()),
                click_through_calls: Mutex::new(Vec::new()),
                set_on_top_calls: Mutex::new(Vec::new()),
                fail_set_on_top: AtomicBool::new(false),
                indicator_calls: Mutex::new(Vec::new()),
                screen: (1920, 1080),
            }
        }
    }

    impl MockHost {
        pub fn with_inject_delay(delay: Duration) -> Self {
            Self {
                inject_delay: delay,
                ..Self::default()
            }
        }

        pub fn set_cursor(&self, x: i32, y: i32) {
            *self.cursor.lock().unwrap() = Some(CursorPoint { x, y });
        }

        pub fn set_window(&self, application_name: &str, x: i32, y: i32) {
            *self.window.lock().unwrap() = Some(WindowInfo {
                title: format!("{application_name} - document"),
                application_name: application_name.to_string(),
                x,
                y,
                width: 1280,
                height: 800,
            });
        }

        pub fn injection_count(&self) -> usize {
            self.injections.lock().unwrap().len()
        }
    }

    impl HostCommands for MockHost {
        fn cursor_position(&self) -> Result<CursorPoint> {
            self.cursor
                .lock()
                .unwrap()
                .ok_or_else(|| anyhow::anyhow!("cursor position unavailable"))
        }

        fn foreground_window(&self) -> Result<WindowInfo> {
            self.window
                .lock()
                .unwrap()
                .clone()
                .ok_or_else(|| anyhow::anyhow!("no foreground window"))
        }

        fn inject_text_at(&self, text: &str, x: i32, y: i32) -> Result<()> {
            let started = Instant::now();
            if !self.inject_delay.is_zero() {
                std::thread::sleep(self.inject_delay);
            }
            if self.fail_injection.load(Ordering::SeqCst) {
                anyhow::bail!("injection primitive failed");
            }
            self.injections.lock().unwrap().push(InjectionCall {
                text: text.to_string(),
                x,
                y,
                started,
                finished: Instant::now(),
            });
            Ok(())
        }

        fn set_click_through(&self, enabled: bool) -> Result<()> {
            self.click_through_calls.lock().unwrap().push(enabled);
            Ok(())
        }

        fn set_always_on_top(&self, enabled: bool) -> Result<()> {
            self.set_on_top_calls.lock().unwrap().push(enabled);
            if self.fail_set_on_top.load(Ordering::SeqCst) {
                anyhow::bail!("set_always_on_top failed");
            }
            self.on_top.store(enabled, Ordering::SeqCst);
            Ok(())
        }

        fn always_on_top(&self) -> Result<bool> {
            Ok(self.on_top.load(Ordering::SeqCst))
        }

        fn overlay_focused(&self) -> Result<bool> {
            Ok(self.focused.load(Ordering::SeqCst))
        }

        fn screen_size(&self) -> Result<(i32, i32)> {
            Ok(self.screen)
        }

        fn set_recording_indicator(&self, state: RecordingIndicator) -> Result<()> {
            self.indicator_calls.lock().unwrap().push(state);
            Ok(())
        }
    }
}
