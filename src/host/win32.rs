//! Win32 implementations of the facade verbs Tauri has no API for.

use std::ffi::OsString;
use std::os::windows::ffi::OsStringExt;
use std::path::Path;
use std::time::Duration;

use anyhow::{bail, Result};
use windows::core::PWSTR;
use windows::Win32::Foundation::{CloseHandle, POINT, RECT};
use windows::Win32::System::Threading::{
    OpenProcess, QueryFullProcessImageNameW, PROCESS_NAME_FORMAT,
    PROCESS_QUERY_LIMITED_INFORMATION,
};
use windows::Win32::UI::Input::KeyboardAndMouse::{
    SendInput, INPUT, INPUT_0, INPUT_KEYBOARD, INPUT_MOUSE, KEYBDINPUT, KEYBD_EVENT_FLAGS,
    KEYEVENTF_KEYUP, KEYEVENTF_UNICODE, MOUSEEVENTF_ABSOLUTE, MOUSEEVENTF_LEFTDOWN,
    MOUSEEVENTF_LEFTUP, MOUSEEVENTF_MOVE, MOUSEEVENTF_VIRTUALDESK, MOUSEINPUT, VIRTUAL_KEY,
};
use windows::Win32::UI::WindowsAndMessaging::{
    GetForegroundWindow, GetSystemMetrics, GetWindowRect, GetWindowTextLengthW, GetWindowTextW,
    GetWindowThreadProcessId, SM_CXVIRTUALSCREEN, SM_CYVIRTUALSCREEN, SM_XVIRTUALSCREEN,
    SM_YVIRTUALSCREEN,
};

use super::WindowInfo;

// Give the click-to-focus a moment to land before keystrokes follow.
const FOCUS_SETTLE: Duration = Duration::from_millis(50);

pub fn foreground_window() -> Result<WindowInfo> {
    unsafe {
        let hwnd = GetForegroundWindow();
        if hwnd.is_invalid() {
            bail!("no foreground window");
        }

        let mut rect = RECT::default();
        GetWindowRect(hwnd, &mut rect)?;

        let title = {
            let len = GetWindowTextLengthW(hwnd);
            if len > 0 {
                let mut buffer = vec![0u16; (len + 1) as usize];
                let copied = GetWindowTextW(hwnd, &mut buffer);
                buffer.truncate(copied as usize);
                String::from_utf16_lossy(&buffer)
            } else {
                String::new()
            }
        };

        let mut pid = 0u32;
        let _ = GetWindowThreadProcessId(hwnd, Some(&mut pid));
        let application_name = process_name(pid).unwrap_or_default();

        Ok(WindowInfo {
            title,
            application_name,
            x: rect.left,
            y: rect.top,
            width: rect.right - rect.left,
            height: rect.bottom - rect.top,
        })
    }
}

fn process_name(pid: u32) -> Option<String> {
    if pid == 0 {
        return None;
    }
    unsafe {
        let handle = OpenProcess(PROCESS_QUERY_LIMITED_INFORMATION, false, pid).ok()?;
        let mut buffer = vec![0u16; 1024];
        let mut size = buffer.len() as u32;
        let ok = QueryFullProcessImageNameW(
            handle,
            PROCESS_NAME_FORMAT(0),
            PWSTR(buffer.as_mut_ptr()),
            &mut size,
        )
        .is_ok();
        let _ = CloseHandle(handle);
        if !ok || size == 0 {
            return None;
        }
        let path = OsString::from_wide(&buffer[..size as usize])
            .to_string_lossy()
            .to_string();
        Path::new(&path)
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
    }
}

/// Click at the absolute coordinate to focus the target caret, then send the
/// text as unicode key events.
pub fn inject_text_at(text: &str, x: i32, y: i32) -> Result<()> {
    click_at(x, y)?;
    std::thread::sleep(FOCUS_SETTLE);
    send_text(text)
}

fn click_at(x: i32, y: i32) -> Result<()> {
    unsafe {
        let screen_x = GetSystemMetrics(SM_XVIRTUALSCREEN);
        let screen_y = GetSystemMetrics(SM_YVIRTUALSCREEN);
        let screen_w = GetSystemMetrics(SM_CXVIRTUALSCREEN);
        let screen_h = GetSystemMetrics(SM_CYVIRTUALSCREEN);
        if screen_w == 0 || screen_h == 0 {
            bail!("virtual screen metrics unavailable");
        }

        // SendInput absolute coordinates are normalized to 0..65535 over the
        // virtual desktop.
        let abs_x = (x - screen_x) * 65535 / screen_w;
        let abs_y = (y - screen_y) * 65535 / screen_h;
        let flags = MOUSEEVENTF_ABSOLUTE | MOUSEEVENTF_VIRTUALDESK | MOUSEEVENTF_MOVE;

        let point = POINT { x: abs_x, y: abs_y };
        let inputs = [
            mouse_input(point, flags | MOUSEEVENTF_LEFTDOWN),
            mouse_input(point, flags | MOUSEEVENTF_LEFTUP),
        ];
        let sent = SendInput(&inputs, std::mem::size_of::<INPUT>() as i32);
        if sent == 0 {
            bail!("SendInput returned 0 for focus click");
        }
    }
    Ok(())
}

fn mouse_input(point: POINT, flags: windows::Win32::UI::Input::KeyboardAndMouse::MOUSE_EVENT_FLAGS) -> INPUT {
    INPUT {
        r#type: INPUT_MOUSE,
        Anonymous: INPUT_0 {
            mi: MOUSEINPUT {
                dx: point.x,
                dy: point.y,
                mouseData: 0,
                dwFlags: flags,
                time: 0,
                dwExtraInfo: 0,
            },
        },
    }
}

fn send_text(text: &str) -> Result<()> {
    // Send as unicode scan codes (KEYEVENTF_UNICODE), one down/up pair per
    // UTF-16 unit, so layout-independent text survives.
    for code in text.encode_utf16() {
        unsafe {
            let mut input = INPUT {
                r#type: INPUT_KEYBOARD,
                Anonymous: INPUT_0 {
                    ki: KEYBDINPUT {
                        wVk: VIRTUAL_KEY(0),
                        wScan: code,
                        dwFlags: KEYEVENTF_UNICODE,
                        time: 0,
                        dwExtraInfo: 0,
                    },
                },
            };

            let sent = SendInput(&[input], std::mem::size_of::<INPUT>() as i32);
            if sent == 0 {
                bail!("SendInput returned 0");
            }

            input.Anonymous.ki.dwFlags =
                KEYBD_EVENT_FLAGS(KEYEVENTF_UNICODE.0 | KEYEVENTF_KEYUP.0);
            let sent = SendInput(&[input], std::mem::size_of::<INPUT>() as i32);
            if sent == 0 {
                bail!("SendInput returned 0");
            }
        }
    }
    Ok(())
}
