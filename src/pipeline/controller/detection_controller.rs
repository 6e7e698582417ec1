use std::sync::Arc;
use tokio::sync::mpsc::Receiver;
use tokio::time::{sleep, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::actuators::ActuatorMap;
use super::notice::{Notice, NoticeLatch};
use super::runtime::{RuntimeCommand, RuntimeSettings};
use super::stats::ControllerStats;
use crate::common::Frame;
use crate::config::{Configuration, TimingSettings};
use crate::device::DeviceControl;
use crate::error::AppError;
use crate::intake::FrameSource;
use crate::pipeline::services::{DominantColorVoter, VisionBackend};
use crate::pipeline::types::ControllerState;

/// Frames collected between window entry and its deadline.
#[derive(Debug)]
struct CaptureWindow {
    deadline: Instant,
    frames: Vec<Frame>,
}

/// Presence-driven sorting loop: Idle, Scanning, Capturing, Actuating.
///
/// One call to [`tick`](Self::tick) evaluates exactly one transition.
/// Collaborator failures are logged and absorbed; they never leave the
/// current state early.
pub struct DetectionController {
    device: Arc<dyn DeviceControl>,
    frames: Box<dyn FrameSource>,
    backend: Arc<dyn VisionBackend>,
    voter: DominantColorVoter,
    actuators: ActuatorMap,
    timing: TimingSettings,
    settings: RuntimeSettings,
    commands: Option<Receiver<RuntimeCommand>>,
    state: ControllerState,
    window: Option<CaptureWindow>,
    notices: NoticeLatch,
    stats: ControllerStats,
}

impl DetectionController {
    pub fn new(
        device: Arc<dyn DeviceControl>,
        frames: Box<dyn FrameSource>,
        backend: Arc<dyn VisionBackend>,
        configuration: &Configuration,
    ) -> Self {
        Self {
            device,
            frames,
            backend,
            voter: DominantColorVoter::new(configuration.colors.clone()),
            actuators: ActuatorMap::new(configuration.actuators.clone()),
            timing: configuration.timing,
            settings: configuration.camera.into(),
            commands: None,
            state: ControllerState::Idle,
            window: None,
            notices: NoticeLatch::new(),
            stats: ControllerStats::new(),
        }
    }

    pub fn with_commands(mut self, commands: Receiver<RuntimeCommand>) -> Self {
        self.commands = Some(commands);
        self
    }

    pub fn state(&self) -> ControllerState {
        self.state
    }

    pub fn stats(&self) -> &ControllerStats {
        &self.stats
    }

    pub fn settings(&self) -> RuntimeSettings {
        self.settings
    }

    /// Pushes the configured camera settings and clears every output.
    pub async fn initialize_device(&mut self) {
        let result = self.device.set_resolution(self.settings.resolution).await;
        self.absorb("set resolution", result);
        let result = self.device.set_quality(self.settings.quality).await;
        self.absorb("set quality", result);
        let result = self
            .device
            .set_auto_white_balance(self.settings.auto_white_balance)
            .await;
        self.absorb("set auto white balance", result);
        self.clear_outputs().await;
    }

    /// Ticks until `cancel` fires, then forces outputs and illumination off.
    pub async fn run(&mut self, cancel: CancellationToken) {
        info!("Detection controller started using {} backend", self.backend.name());
        loop {
            if cancel.is_cancelled() {
                break;
            }
            self.apply_pending_commands().await;
            self.tick().await;
        }
        info!("Detection controller stopping");
        self.clear_outputs().await;
        let result = self.device.set_illumination(0).await;
        self.absorb("switch illumination off", result);
    }

    /// Drains queued runtime commands and forwards accepted ones to the device.
    pub async fn apply_pending_commands(&mut self) {
        let mut pending = Vec::new();
        if let Some(commands) = self.commands.as_mut() {
            while let Ok(command) = commands.try_recv() {
                pending.push(command);
            }
        }

        for command in pending {
            if let Err(e) = self.settings.apply(command) {
                warn!("Ignoring {:?}: {}", command, e);
                continue;
            }
            info!("Applying {:?}", command);
            let result = match command {
                RuntimeCommand::Resolution(index) => self.device.set_resolution(index).await,
                RuntimeCommand::Quality(quality) => self.device.set_quality(quality).await,
                RuntimeCommand::ToggleAutoWhiteBalance => {
                    self.device
                        .set_auto_white_balance(self.settings.auto_white_balance)
                        .await
                }
                // idle illumination stays off; the new level is used on the next cycle
                RuntimeCommand::Illumination(_) if self.state == ControllerState::Idle => Ok(()),
                RuntimeCommand::Illumination(intensity) => {
                    self.device.set_illumination(intensity).await
                }
            };
            self.absorb("apply runtime command", result);
        }
    }

    pub async fn tick(&mut self) -> ControllerState {
        let next = match self.state {
            ControllerState::Idle => self.idle().await,
            ControllerState::Scanning => self.scan().await,
            ControllerState::Capturing => self.capture().await,
            ControllerState::Actuating => self.actuate().await,
        };
        if next != self.state {
            debug!("{} -> {}", self.state, next);
        }
        self.state = next;
        next
    }

    async fn idle(&mut self) -> ControllerState {
        match self.device.read_presence().await {
            Ok(true) => {
                self.notices.clear(Notice::NoObject);
                self.notices.clear(Notice::PresenceUnavailable);
                self.stats.cycles_started += 1;
                let result = self.device.set_illumination(self.settings.illumination).await;
                self.absorb("switch illumination on", result);
                ControllerState::Scanning
            }
            Ok(false) => {
                self.notices.clear(Notice::PresenceUnavailable);
                self.notices.clear(Notice::NoColor);
                self.notices.clear(Notice::NoDominantColor);
                if self.notify(Notice::NoObject) {
                    let result = self.device.set_illumination(0).await;
                    self.absorb("switch illumination off", result);
                    self.clear_outputs().await;
                }
                sleep(self.timing.idle_poll()).await;
                ControllerState::Idle
            }
            Err(e) => {
                self.stats.device_failures += 1;
                if self.notify(Notice::PresenceUnavailable) {
                    warn!("Presence read failed: {}", e);
                }
                sleep(self.timing.idle_poll()).await;
                ControllerState::Idle
            }
        }
    }

    async fn scan(&mut self) -> ControllerState {
        let Some(frame) = self.read_frame().await else {
            sleep(self.timing.frame_retry()).await;
            return ControllerState::Scanning;
        };

        let detected = self.voter.colors().iter().any(|range| {
            let shapes = self.backend.detect(&frame, range);
            for shape in &shapes {
                debug!(
                    "{} {} at {:?} ({:.1}%)",
                    range.name, shape.kind, shape.bounding_box, shape.confidence
                );
            }
            !shapes.is_empty()
        });

        if detected {
            self.notices.clear(Notice::NoColor);
            self.notices.clear(Notice::NoDominantColor);
            info!(
                "Object detected, capturing for {:?}",
                self.timing.capture_window()
            );
            self.window = Some(CaptureWindow {
                deadline: Instant::now() + self.timing.capture_window(),
                frames: Vec::new(),
            });
            ControllerState::Capturing
        } else {
            self.notify(Notice::NoColor);
            sleep(self.timing.no_shape_poll()).await;
            ControllerState::Idle
        }
    }

    async fn capture(&mut self) -> ControllerState {
        let deadline = match &self.window {
            Some(window) => window.deadline,
            None => return ControllerState::Idle,
        };
        if Instant::now() >= deadline {
            return ControllerState::Actuating;
        }

        match self.read_frame().await {
            Some(frame) => {
                if let Some(window) = self.window.as_mut() {
                    window.frames.push(frame);
                }
            }
            None => sleep(self.timing.frame_retry()).await,
        }
        ControllerState::Capturing
    }

    async fn actuate(&mut self) -> ControllerState {
        let frames = self.window.take().map(|w| w.frames).unwrap_or_default();
        self.stats.frames_in_last_window = frames.len();

        match self.voter.vote(&frames, self.backend.as_ref()) {
            Some(color) => {
                info!("Most common color detected: {} over {} frame(s)", color, frames.len());
                self.notices.clear(Notice::NoDominantColor);
                match self.actuators.pin_for(&color) {
                    Some(pin) => self.select_output(pin).await,
                    None => warn!("No actuator bound to {}", color),
                }
            }
            None => {
                self.notify(Notice::NoDominantColor);
            }
        }

        sleep(self.timing.post_action_delay()).await;
        ControllerState::Idle
    }

    /// Clears every other output before raising `pin`, so two are never set.
    async fn select_output(&mut self, pin: u8) {
        let others: Vec<u8> = self.actuators.others(pin).collect();
        for other in others {
            let result = self.device.set_digital_output(other, false).await;
            self.absorb("clear output", result);
        }
        let result = self.device.set_digital_output(pin, true).await;
        self.absorb("set output", result);
        self.stats.actuations += 1;
    }

    async fn clear_outputs(&mut self) {
        let pins: Vec<u8> = self.actuators.pins().collect();
        for pin in pins {
            let result = self.device.set_digital_output(pin, false).await;
            self.absorb("clear output", result);
        }
    }

    /// Failed and empty reads are both skipped.
    async fn read_frame(&mut self) -> Option<Frame> {
        match self.frames.next_frame().await {
            Ok(Some(frame)) => {
                self.notices.clear(Notice::FrameUnavailable);
                Some(frame)
            }
            Ok(None) => {
                self.notify(Notice::FrameUnavailable);
                None
            }
            Err(e) => {
                if self.notify(Notice::FrameUnavailable) {
                    warn!("Frame read failed: {}", e);
                }
                None
            }
        }
    }

    fn notify(&mut self, notice: Notice) -> bool {
        let fresh = self.notices.raise(notice);
        if fresh {
            info!("{}", notice);
            self.stats.record_notice(notice);
        }
        fresh
    }

    fn absorb(&mut self, action: &str, result: Result<(), AppError>) {
        if let Err(e) = result {
            self.stats.device_failures += 1;
            warn!("Failed to {}: {}", action, e);
        }
    }
}
