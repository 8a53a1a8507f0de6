mod bus;
mod gateway;
mod host;
mod injection;
mod interaction;
mod position;
mod settings;
mod topmost;
mod utils;

use std::sync::Arc;

use gateway::commands::gateway_receive;
use gateway::{EventSink, MessageGateway, Outbound};
use host::{HostCommands, TauriHost};
use injection::{InjectionQueue, QueueConfig};
use interaction::{CornerConfig, InteractionController};
use position::commands::{get_lock_status, lock_position, restore_lock, unlock_position};
use position::{CursorTracker, LockManager, LockStore};
use settings::{OverlaySettings, SettingsStore};
use tauri::{Manager, State};
use tokio_util::sync::CancellationToken;
use topmost::{AlwaysOnTopSupervisor, SupervisorConfig};

pub(crate) struct AppState {
    pub(crate) gateway: MessageGateway,
    pub(crate) locks: Arc<LockManager>,
    pub(crate) settings: SettingsStore,
    shutdown: CancellationToken,
}

#[tauri::command]
fn get_overlay_settings(state: State<AppState>) -> Result<OverlaySettings, String> {
    Ok(state.settings.current())
}

#[tauri::command]
fn set_overlay_settings(
    settings: OverlaySettings,
    state: State<AppState>,
) -> Result<(), String> {
    state.settings.update(settings).map_err(|e| e.to_string())
}

#[cfg_attr(mobile, tauri::mobile_entry_point)]
pub fn run() {
    // Initialize logging (reads RUST_LOG env var)
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    log::info!("Scrivo overlay starting up...");

    tauri::Builder::default()
        .plugin(tauri_plugin_opener::init())
        .setup(|app| {
            let result = (|| -> anyhow::Result<()> {
                let app_data_dir = app
                    .path()
                    .app_data_dir()
                    .map_err(|err| anyhow::anyhow!(err))?;
                std::fs::create_dir_all(&app_data_dir)?;

                let settings_store = SettingsStore::new(app_data_dir.join("settings.json"))?;
                let settings = settings_store.current();

                let host: Arc<dyn HostCommands> =
                    Arc::new(TauriHost::new(app.handle().clone()));
                let bus = bus::SignalBus::new();
                let shutdown = CancellationToken::new();

                // The overlay starts click-through; interactivity is earned
                // via the hot corner.
                host.set_click_through(true)?;

                let tracker = CursorTracker::new();
                tauri::async_runtime::spawn(
                    tracker
                        .clone()
                        .run(host.clone(), shutdown.child_token()),
                );

                let lock_store = LockStore::new(app_data_dir.join("locks.json"));
                let locks = Arc::new(LockManager::new(
                    host.clone(),
                    Some(lock_store),
                    settings.on_application_mismatch,
                ));

                let outbound = Outbound::new(Arc::new(EventSink::new(app.handle().clone())));
                let queue = InjectionQueue::start(
                    host.clone(),
                    locks.clone(),
                    tracker.clone(),
                    bus.clone(),
                    outbound.clone(),
                    QueueConfig::default(),
                    shutdown.clone(),
                );

                let gateway = MessageGateway::new(
                    settings.gateway.allowed_origins.clone(),
                    queue,
                    locks.clone(),
                    host.clone(),
                    outbound,
                );

                if settings.hot_corner.enabled {
                    let controller = InteractionController::new(
                        host.clone(),
                        bus.clone(),
                        CornerConfig {
                            corner_size: settings.hot_corner.size_px,
                            ..CornerConfig::default()
                        },
                    );
                    tauri::async_runtime::spawn(controller.run(shutdown.child_token()));
                } else {
                    log::info!("hot corner disabled in settings");
                }

                let supervisor = AlwaysOnTopSupervisor::new(
                    host.clone(),
                    bus.clone(),
                    SupervisorConfig::default(),
                );
                tauri::async_runtime::spawn(supervisor.run(shutdown.child_token()));

                app.manage(AppState {
                    gateway,
                    locks,
                    settings: settings_store,
                    shutdown,
                });

                Ok(())
            })();

            result.map_err(|err| err.into())
        })
        .on_window_event(|window, event| {
            if let tauri::WindowEvent::Destroyed = event {
                if let Some(state) = window.app_handle().try_state::<AppState>() {
                    state.shutdown.cancel();
                }
            }
        })
        .invoke_handler(tauri::generate_handler![
            gateway_receive,
            lock_position,
            unlock_position,
            restore_lock,
            get_lock_status,
            get_overlay_settings,
            set_overlay_settings,
        ])
        .run(tauri::generate_context!())
        .expect("error while running tauri application");
}
