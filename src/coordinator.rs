use std::io::BufRead;
use std::sync::Arc;
use std::thread;
use tokio::sync::mpsc::{self, Sender};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::{
    config::Configuration,
    device::DeviceControl,
    error::AppError,
    intake::FrameSource,
    pipeline::{DetectionController, RuntimeCommand, VisionBackend},
};

pub const COMMAND_BUFFER_SIZE: usize = 16;

pub struct Coordinator {
    controller_task: Option<JoinHandle<()>>,
    command_tx: Sender<RuntimeCommand>,
    cancel_token: CancellationToken,
}

impl Coordinator {
    fn start(controller: DetectionController, command_tx: Sender<RuntimeCommand>) -> Self {
        let cancel_token = CancellationToken::new();
        let controller_task = Self::start_controller_task(controller, cancel_token.clone());
        Self {
            controller_task: Some(controller_task),
            command_tx,
            cancel_token,
        }
    }

    fn start_controller_task(
        mut controller: DetectionController,
        cancel_token: CancellationToken,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            controller.initialize_device().await;
            controller.run(cancel_token).await;
            let stats = controller.stats();
            info!(
                "Controller finished: {} cycle(s), {} actuation(s), {} device failure(s)",
                stats.cycles_started, stats.actuations, stats.device_failures
            );
        })
    }

    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel_token.clone()
    }

    pub fn command_sender(&self) -> Sender<RuntimeCommand> {
        self.command_tx.clone()
    }

    pub fn stop(&self) {
        self.cancel_token.cancel();
    }

    /// Waits for the controller to observe cancellation and switch everything off.
    pub async fn wait(mut self) {
        if let Some(task) = self.controller_task.take() {
            if let Err(e) = task.await {
                error!("Controller task failed: {}", e);
            }
        }
    }
}

impl Drop for Coordinator {
    fn drop(&mut self) {
        self.stop();
    }
}

pub struct CoordinatorBuilder {
    configuration: Configuration,
    device: Option<Arc<dyn DeviceControl>>,
    frames: Option<Box<dyn FrameSource>>,
    backend: Option<Arc<dyn VisionBackend>>,
}

impl CoordinatorBuilder {
    pub fn new(configuration: Configuration) -> Self {
        Self {
            configuration,
            device: None,
            frames: None,
            backend: None,
        }
    }

    pub fn device(mut self, device: Arc<dyn DeviceControl>) -> Self {
        self.device = Some(device);
        self
    }

    pub fn frames(mut self, frames: Box<dyn FrameSource>) -> Self {
        self.frames = Some(frames);
        self
    }

    pub fn backend(mut self, backend: Arc<dyn VisionBackend>) -> Self {
        self.backend = Some(backend);
        self
    }

    // Overrides the configured capture window.
    pub fn capture_window_ms(mut self, capture_window_ms: u64) -> Self {
        self.configuration.timing.capture_window_ms = capture_window_ms;
        self
    }

    /// Validates the configuration and spawns the controller task.
    pub fn build(self) -> Result<Coordinator, AppError> {
        self.configuration.validate()?;
        let device = self
            .device
            .ok_or(AppError::Config("Device client not set".to_string()))?;
        let frames = self
            .frames
            .ok_or(AppError::Config("Frame source not set".to_string()))?;
        let backend = self
            .backend
            .ok_or(AppError::Config("Vision backend not set".to_string()))?;

        let (command_tx, command_rx) = mpsc::channel(COMMAND_BUFFER_SIZE);
        let controller = DetectionController::new(device, frames, backend, &self.configuration)
            .with_commands(command_rx);
        Ok(Coordinator::start(controller, command_tx))
    }
}

/// Cancels `cancel_token` on Ctrl-C.
pub fn spawn_ctrl_c_watcher(cancel_token: CancellationToken) -> JoinHandle<()> {
    tokio::spawn(async move {
        tokio::select! {
            _ = cancel_token.cancelled() => {}
            result = tokio::signal::ctrl_c() => {
                match result {
                    Ok(()) => info!("Ctrl-C received, stopping"),
                    Err(e) => error!("Failed to listen for Ctrl-C: {}", e),
                }
                cancel_token.cancel();
            }
        }
    })
}

/// Feeds operator lines from stdin into the runtime command channel.
///
/// Stdin is read on a detached thread, so runtime shutdown never waits on a
/// pending read. The thread ends at end of input or once the controller has
/// dropped its receiver.
pub fn spawn_stdin_commands(command_tx: Sender<RuntimeCommand>) -> thread::JoinHandle<()> {
    thread::spawn(move || forward_commands(std::io::stdin().lock(), command_tx))
}

fn forward_commands<R: BufRead>(reader: R, command_tx: Sender<RuntimeCommand>) {
    for line in reader.lines() {
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                warn!("Failed to read operator input: {}", e);
                break;
            }
        };
        if line.trim().is_empty() {
            continue;
        }
        match line.parse::<RuntimeCommand>() {
            Ok(command) => {
                if command_tx.blocking_send(command).is_err() {
                    break;
                }
            }
            Err(e) => warn!("{}", e),
        }
    }
}
