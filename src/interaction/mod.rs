//! Hot-corner interaction mode: dwell in the bottom-right screen corner to
//! make the overlay interactive for a short window, fall back to
//! click-through everywhere else. Forced back to pass-through the instant an
//! injection starts, so simulated input never lands on the overlay itself.

use std::sync::Arc;

use log::{info, warn};
use tokio::time::{interval, Duration, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::bus::{Signal, SignalBus};
use crate::host::{CursorPoint, HostCommands};

#[derive(Debug, Clone)]
pub struct CornerConfig {
    pub poll_interval: Duration,
    pub dwell: Duration,
    pub active_duration: Duration,
    pub corner_size: i32,
}

impl Default for CornerConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(150),
            dwell: Duration::from_millis(600),
            active_duration: Duration::from_secs(5),
            corner_size: 32,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Idle,
    CornerDwelling { entered_at: Instant },
    Active { expires_at: Instant },
}

/// Window-chrome side effect requested by a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effect {
    /// Disable click-through; the overlay takes pointer input.
    EnterInteractive,
    /// Re-enable click-through; clicks fall through to the app beneath.
    ExitInteractive,
}

#[derive(Debug, Clone, Copy)]
pub struct TickInput {
    pub now: Instant,
    pub in_corner: bool,
    pub overlay_focused: bool,
    pub injection_in_flight: bool,
}

pub struct CornerMachine {
    config: CornerConfig,
    mode: Mode,
    /// Whether focus has been observed since entering Active; exits fire on
    /// the focused -> unfocused edge, not on never-focused.
    seen_focus: bool,
}

impl CornerMachine {
    pub fn new(config: CornerConfig) -> Self {
        Self {
            config,
            mode: Mode::Idle,
            seen_focus: false,
        }
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn tick(&mut self, input: TickInput) -> Option<Effect> {
        match self.mode {
            Mode::Idle => {
                if input.in_corner {
                    self.mode = Mode::CornerDwelling {
                        entered_at: input.now,
                    };
                }
                None
            }
            Mode::CornerDwelling { entered_at } => {
                if !input.in_corner {
                    self.mode = Mode::Idle;
                    return None;
                }
                let dwelled = input.now.duration_since(entered_at) >= self.config.dwell;
                if dwelled && !input.injection_in_flight {
                    self.mode = Mode::Active {
                        expires_at: input.now + self.config.active_duration,
                    };
                    self.seen_focus = false;
                    return Some(Effect::EnterInteractive);
                }
                None
            }
            Mode::Active { expires_at } => {
                if input.overlay_focused {
                    self.seen_focus = true;
                }
                let lost_focus = self.seen_focus && !input.overlay_focused;
                if input.now >= expires_at || lost_focus {
                    self.mode = Mode::Idle;
                    return Some(Effect::ExitInteractive);
                }
                None
            }
        }
    }

    /// Forced early exit: an injection is about to simulate input.
    pub fn on_injection_started(&mut self) -> Option<Effect> {
        match self.mode {
            Mode::Active { .. } => {
                self.mode = Mode::Idle;
                Some(Effect::ExitInteractive)
            }
            Mode::CornerDwelling { .. } => {
                self.mode = Mode::Idle;
                None
            }
            Mode::Idle => None,
        }
    }
}

pub struct InteractionController {
    host: Arc<dyn HostCommands>,
    bus: SignalBus,
    config: CornerConfig,
}

impl InteractionController {
    pub fn new(host: Arc<dyn HostCommands>, bus: SignalBus, config: CornerConfig) -> Self {
        Self { host, bus, config }
    }

    pub async fn run(self, cancel: CancellationToken) {
        if !self.host.supports_cursor_polling() {
            info!("host cannot poll the cursor; hot corner disabled");
            return;
        }
        let (screen_w, screen_h) = match self.host.screen_size() {
            Ok(size) => size,
            Err(err) => {
                warn!("screen size unavailable; hot corner disabled: {err:#}");
                return;
            }
        };

        let mut machine = CornerMachine::new(self.config.clone());
        let mut in_flight = false;
        let mut signals = self.bus.subscribe();
        let mut ticker = interval(self.config.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    info!("interaction controller shutting down");
                    break;
                }
                signal = signals.recv() => {
                    match signal {
                        Ok(Signal::InjectionStarted { .. }) => {
                            in_flight = true;
                            let effect = machine.on_injection_started();
                            self.apply(effect);
                        }
                        Ok(Signal::InjectionEnded { .. }) => in_flight = false,
                        Err(tokio::sync::broadcast::error::RecvError::Lagged(skipped)) => {
                            warn!("interaction controller lagged {skipped} signals");
                        }
                        Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
                    }
                }
                _ = ticker.tick() => {
                    let in_corner = match self.host.cursor_position() {
                        Ok(point) => in_hot_corner(point, screen_w, screen_h, self.config.corner_size),
                        Err(_) => false,
                    };
                    let overlay_focused = self.host.overlay_focused().unwrap_or(false);
                    let effect = machine.tick(TickInput {
                        now: Instant::now(),
                        in_corner,
                        overlay_focused,
                        injection_in_flight: in_flight,
                    });
                    self.apply(effect);
                }
            }
        }
    }

    fn apply(&self, effect: Option<Effect>) {
        let result = match effect {
            Some(Effect::EnterInteractive) => {
                info!("hot corner dwell satisfied; overlay is interactive");
                self.host.set_click_through(false)
            }
            Some(Effect::ExitInteractive) => {
                info!("overlay back to pass-through");
                self.host.set_click_through(true)
            }
            None => return,
        };
        if let Err(err) = result {
            warn!("failed to toggle click-through: {err:#}");
        }
    }
}

fn in_hot_corner(point: CursorPoint, screen_w: i32, screen_h: i32, size: i32) -> bool {
    point.x >= screen_w - size && point.y >= screen_h - size
}

#[cfg(test)]
mod tests {
    use super::*;

    fn machine() -> CornerMachine {
        CornerMachine::new(CornerConfig::default())
    }

    fn input(now: Instant, in_corner: bool) -> TickInput {
        TickInput {
            now,
            in_corner,
            overlay_focused: false,
            injection_in_flight: false,
        }
    }

    #[tokio::test]
    async fn dwell_in_corner_activates_after_threshold() {
        let mut m = machine();
        let t0 = Instant::now();

        assert_eq!(m.tick(input(t0, true)), None);
        assert!(matches!(m.mode(), Mode::CornerDwelling { .. }));

        assert_eq!(m.tick(input(t0 + Duration::from_millis(450), true)), None);
        assert_eq!(
            m.tick(input(t0 + Duration::from_millis(600), true)),
            Some(Effect::EnterInteractive)
        );
        assert!(matches!(m.mode(), Mode::Active { .. }));
    }

    #[tokio::test]
    async fn leaving_corner_before_threshold_resets() {
        let mut m = machine();
        let t0 = Instant::now();

        m.tick(input(t0, true));
        assert_eq!(m.tick(input(t0 + Duration::from_millis(300), false)), None);
        assert_eq!(m.mode(), Mode::Idle);
    }

    #[tokio::test]
    async fn injection_in_flight_defers_activation() {
        let mut m = machine();
        let t0 = Instant::now();

        m.tick(input(t0, true));
        let mut blocked = input(t0 + Duration::from_millis(700), true);
        blocked.injection_in_flight = true;
        assert_eq!(m.tick(blocked), None);
        assert!(matches!(m.mode(), Mode::CornerDwelling { .. }));

        // Once the injection ends the next tick activates.
        assert_eq!(
            m.tick(input(t0 + Duration::from_millis(900), true)),
            Some(Effect::EnterInteractive)
        );
    }

    #[tokio::test]
    async fn active_mode_expires_back_to_idle() {
        let mut m = machine();
        let t0 = Instant::now();

        m.tick(input(t0, true));
        m.tick(input(t0 + Duration::from_millis(600), true));

        assert_eq!(m.tick(input(t0 + Duration::from_secs(3), false)), None);
        assert_eq!(
            m.tick(input(t0 + Duration::from_millis(5700), false)),
            Some(Effect::ExitInteractive)
        );
        assert_eq!(m.mode(), Mode::Idle);
    }

    #[tokio::test]
    async fn losing_focus_exits_active_mode() {
        let mut m = machine();
        let t0 = Instant::now();

        m.tick(input(t0, true));
        m.tick(input(t0 + Duration::from_millis(600), true));

        let mut focused = input(t0 + Duration::from_millis(800), false);
        focused.overlay_focused = true;
        assert_eq!(m.tick(focused), None);

        assert_eq!(
            m.tick(input(t0 + Duration::from_millis(950), false)),
            Some(Effect::ExitInteractive)
        );
        assert_eq!(m.mode(), Mode::Idle);
    }

    #[tokio::test]
    async fn injection_start_forces_exit_from_active() {
        let mut m = machine();
        let t0 = Instant::now();

        m.tick(input(t0, true));
        m.tick(input(t0 + Duration::from_millis(600), true));
        assert!(matches!(m.mode(), Mode::Active { .. }));

        assert_eq!(m.on_injection_started(), Some(Effect::ExitInteractive));
        assert_eq!(m.mode(), Mode::Idle);
    }

    #[tokio::test]
    async fn corner_test_uses_bottom_right_square() {
        assert!(in_hot_corner(
            CursorPoint { x: 1910, y: 1070 },
            1920,
            1080,
            32
        ));
        assert!(!in_hot_corner(
            CursorPoint { x: 1880, y: 1070 },
            1920,
            1080,
            32
        ));
        assert!(!in_hot_corner(CursorPoint { x: 5, y: 5 }, 1920, 1080, 32));
    }
}
