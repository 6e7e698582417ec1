use std::sync::Arc;
use tracing::{info, Level};

use sortbot::coordinator::{spawn_ctrl_c_watcher, spawn_stdin_commands};
use sortbot::device::EspCamClient;
use sortbot::intake::MjpegStream;
use sortbot::pipeline::ImageVisionBackend;
use sortbot::{AppError, Configuration, CoordinatorBuilder};

fn init_logging(level: Level) {
    tracing_subscriber::fmt().with_max_level(level).init();
}

#[tokio::main]
async fn main() -> Result<(), AppError> {
    let configuration = Configuration::load()?;
    init_logging(configuration.log_level()?);

    let client = EspCamClient::new(
        &configuration.device.base_url,
        configuration.device.request_timeout(),
    )?;
    let stream_url = client.stream_url(configuration.device.stream_port)?;
    info!("Connecting to camera at {}", client.base_url());
    let frames = MjpegStream::connect(
        stream_url,
        configuration.device.request_timeout(),
        configuration.device.stream_read_timeout(),
    )
    .await?;

    let coordinator = CoordinatorBuilder::new(configuration.clone())
        .device(Arc::new(client))
        .frames(Box::new(frames))
        .backend(Arc::new(ImageVisionBackend::new(configuration.shape_filter)))
        .build()?;

    spawn_ctrl_c_watcher(coordinator.cancel_token());
    spawn_stdin_commands(coordinator.command_sender());
    info!("Commands: resolution <index>, quality <10-63>, awb, led <0-255>");

    coordinator.wait().await;
    Ok(())
}
