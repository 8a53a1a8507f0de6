use serde::Serialize;
use tauri::State;

use crate::AppState;

use super::LockedPosition;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LockSnapshot {
    pub locked: bool,
    pub position: Option<LockedPosition>,
}

#[tauri::command]
pub fn lock_position(state: State<'_, AppState>) -> Result<LockSnapshot, String> {
    let locked = state.locks.lock().map_err(|e| e.to_string())?;
    Ok(LockSnapshot {
        locked: true,
        position: Some((*locked).clone()),
    })
}

#[tauri::command]
pub fn unlock_position(state: State<'_, AppState>) -> Result<(), String> {
    state.locks.unlock();
    Ok(())
}

#[tauri::command]
pub fn restore_lock(
    state: State<'_, AppState>,
    application: String,
) -> Result<LockSnapshot, String> {
    let restored = state
        .locks
        .restore(&application)
        .map_err(|e| e.to_string())?;
    Ok(LockSnapshot {
        locked: restored.is_some(),
        position: restored.map(|lock| (*lock).clone()),
    })
}

#[tauri::command]
pub fn get_lock_status(state: State<'_, AppState>) -> Result<LockSnapshot, String> {
    Ok(LockSnapshot {
        locked: state.locks.is_locked(),
        position: state.locks.current().map(|lock| (*lock).clone()),
    })
}
