use async_trait::async_trait;

use crate::common::Frame;
use crate::error::AppError;

/// Single-consumer video source.
///
/// `Ok(None)` means no frame was available this time; errors are transient
/// as well and callers simply try again later.
#[async_trait]
pub trait FrameSource: Send {
    async fn next_frame(&mut self) -> Result<Option<Frame>, AppError>;
}
