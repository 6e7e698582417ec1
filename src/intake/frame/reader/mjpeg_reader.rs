use async_trait::async_trait;
use image::ImageFormat;
use reqwest::{Response, Url};
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::common::Frame;
use crate::error::AppError;
use crate::intake::frame::FrameSource;

const SOI: [u8; 2] = [0xFF, 0xD8];
const EOI: [u8; 2] = [0xFF, 0xD9];

/// Largest amount of unframed stream data kept while waiting for an image end.
pub const MAX_BUFFERED_BYTES: usize = 4 * 1024 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadState {
    WaitingForStart,
    WaitingForEnd { start: usize },
}

/// Cuts complete JPEG images out of a multipart byte stream by their SOI/EOI markers.
#[derive(Debug)]
pub struct JpegSplitter {
    buffer: Vec<u8>,
    max_buffered: usize,
}

impl Default for JpegSplitter {
    fn default() -> Self {
        Self::new(MAX_BUFFERED_BYTES)
    }
}

impl JpegSplitter {
    pub fn new(max_buffered: usize) -> Self {
        Self {
            buffer: Vec::new(),
            max_buffered,
        }
    }

    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    /// Drops a partial image, e.g. when the connection it came from is gone.
    pub fn clear(&mut self) {
        self.buffer.clear();
    }

    pub fn push(&mut self, chunk: &[u8]) {
        self.buffer.extend_from_slice(chunk);
        if self.buffer.len() > self.max_buffered {
            warn!(
                "MJPEG buffer exceeded {} bytes without a complete image, dropping data",
                self.max_buffered
            );
            match rfind(&self.buffer, &SOI) {
                Some(start) if start > 0 => {
                    self.buffer.drain(..start);
                }
                _ => self.buffer.clear(),
            }
        }
    }

    pub fn state(&self) -> ReadState {
        match find(&self.buffer, &SOI) {
            Some(start) => ReadState::WaitingForEnd { start },
            None => ReadState::WaitingForStart,
        }
    }

    pub fn next_image(&mut self) -> Option<Vec<u8>> {
        match self.state() {
            ReadState::WaitingForStart => {
                // a trailing 0xFF may be the first half of the next marker
                let keep = usize::from(self.buffer.last() == Some(&0xFF));
                let drop = self.buffer.len() - keep;
                self.buffer.drain(..drop);
                None
            }
            ReadState::WaitingForEnd { start } => {
                let body = start + SOI.len();
                let end = find(&self.buffer[body..], &EOI)? + body + EOI.len();
                let image = self.buffer[start..end].to_vec();
                self.buffer.drain(..end);
                Some(image)
            }
        }
    }
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

fn rfind(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).rposition(|w| w == needle)
}

pub fn decode_jpeg(bytes: &[u8]) -> Result<Frame, AppError> {
    let image = image::load_from_memory_with_format(bytes, ImageFormat::Jpeg)?.to_rgb8();
    Ok(Frame::captured(image))
}

/// Frame source over the camera's `multipart/x-mixed-replace` MJPEG endpoint.
///
/// Every response and body read is bounded by `read_timeout`; a stream that
/// goes silent is dropped and reopened on the next read.
pub struct MjpegStream {
    http: reqwest::Client,
    url: Url,
    read_timeout: Duration,
    response: Option<Response>,
    splitter: JpegSplitter,
}

impl MjpegStream {
    /// Opens the stream. Failing here means there is no video source at all.
    pub async fn connect(
        url: Url,
        connect_timeout: Duration,
        read_timeout: Duration,
    ) -> Result<Self, AppError> {
        let http = reqwest::Client::builder()
            .connect_timeout(connect_timeout)
            .build()?;
        let mut stream = Self {
            http,
            url,
            read_timeout,
            response: None,
            splitter: JpegSplitter::default(),
        };
        let response = stream.open().await.map_err(|e| {
            AppError::VideoSource(format!("could not open video stream {}: {}", stream.url, e))
        })?;
        stream.response = Some(response);
        info!("Opened video stream {}", stream.url);
        Ok(stream)
    }

    async fn open(&self) -> Result<Response, AppError> {
        let response = timeout(self.read_timeout, self.http.get(self.url.clone()).send())
            .await
            .map_err(|_| self.stalled())??;
        Ok(response.error_for_status()?)
    }

    fn stalled(&self) -> AppError {
        AppError::VideoSource(format!(
            "no data from {} within {:?}",
            self.url, self.read_timeout
        ))
    }

    fn drop_connection(&mut self) {
        self.response = None;
        self.splitter.clear();
    }
}

#[async_trait]
impl FrameSource for MjpegStream {
    async fn next_frame(&mut self) -> Result<Option<Frame>, AppError> {
        loop {
            if let Some(jpeg) = self.splitter.next_image() {
                return decode_jpeg(&jpeg).map(Some);
            }

            if self.response.is_none() {
                debug!("Reopening video stream {}", self.url);
                self.response = Some(self.open().await?);
            }
            let Some(response) = self.response.as_mut() else {
                return Ok(None);
            };

            match timeout(self.read_timeout, response.chunk()).await {
                Ok(Ok(Some(bytes))) => self.splitter.push(&bytes),
                Ok(Ok(None)) => {
                    warn!("Video stream {} ended", self.url);
                    self.drop_connection();
                    return Ok(None);
                }
                Ok(Err(e)) => {
                    self.drop_connection();
                    return Err(e.into());
                }
                Err(_) => {
                    warn!("Video stream {} stalled, reconnecting", self.url);
                    self.drop_connection();
                    return Err(self.stalled());
                }
            }
        }
    }
}
