use tauri::State;

use crate::AppState;

use super::InboundMessage;

/// Entry point for the shell page relaying postMessage traffic from the
/// embedded surface. Always returns `Ok`: the sender must not be able to
/// distinguish a rejected message from an accepted one.
#[tauri::command]
pub fn gateway_receive(
    state: State<'_, AppState>,
    origin: String,
    message: InboundMessage,
) -> Result<(), String> {
    let _ = state.gateway.receive(&origin, message);
    Ok(())
}
