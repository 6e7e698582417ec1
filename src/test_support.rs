//! Frame builders and scripted collaborators shared by unit tests.

use async_trait::async_trait;
use image::{DynamicImage, GrayImage, ImageFormat, Rgb, RgbImage};
use imageproc::point::Point;
use std::collections::{HashMap, VecDeque};
use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::common::Frame;
use crate::device::DeviceControl;
use crate::error::AppError;
use crate::intake::FrameSource;
use crate::pipeline::services::{ColorMask, VisionBackend};
use crate::pipeline::types::{BoundingBox, ClassifiedShape, ColorRange, ShapeKind};

pub const GREEN: Rgb<u8> = Rgb([0, 255, 0]);
pub const BLUE: Rgb<u8> = Rgb([0, 0, 255]);
pub const BLACK: Rgb<u8> = Rgb([0, 0, 0]);

pub fn solid_frame(width: u32, height: u32, color: Rgb<u8>) -> Frame {
    Frame::captured(RgbImage::from_pixel(width, height, color))
}

/// `rect` is `(x, y, width, height)` of the foreground block.
pub fn filled_rect_frame(
    width: u32,
    height: u32,
    rect: (u32, u32, u32, u32),
    fg: Rgb<u8>,
    bg: Rgb<u8>,
) -> Frame {
    let (rx, ry, rw, rh) = rect;
    let image = RgbImage::from_fn(width, height, |x, y| {
        if x >= rx && x < rx + rw && y >= ry && y < ry + rh {
            fg
        } else {
            bg
        }
    });
    Frame::captured(image)
}

/// Left half one color, right half the other.
pub fn split_frame(width: u32, height: u32, left: Rgb<u8>, right: Rgb<u8>) -> Frame {
    let image = RgbImage::from_fn(width, height, |x, _| if x < width / 2 { left } else { right });
    Frame::captured(image)
}

pub fn disc_frame(width: u32, height: u32, center: (i64, i64), radius: i64, fg: Rgb<u8>) -> Frame {
    let (cx, cy) = center;
    let image = RgbImage::from_fn(width, height, |x, y| {
        let (dx, dy) = (x as i64 - cx, y as i64 - cy);
        if dx * dx + dy * dy <= radius * radius {
            fg
        } else {
            BLACK
        }
    });
    Frame::captured(image)
}

/// Fills the triangle `corners` on black.
pub fn triangle_frame(width: u32, height: u32, corners: [(i64, i64); 3], fg: Rgb<u8>) -> Frame {
    let side = |(ax, ay): (i64, i64), (bx, by): (i64, i64), (px, py): (i64, i64)| {
        (bx - ax) * (py - ay) - (by - ay) * (px - ax)
    };
    let [a, b, c] = corners;
    let image = RgbImage::from_fn(width, height, |x, y| {
        let p = (x as i64, y as i64);
        let (d1, d2, d3) = (side(a, b, p), side(b, c, p), side(c, a, p));
        let inside = (d1 >= 0 && d2 >= 0 && d3 >= 0) || (d1 <= 0 && d2 <= 0 && d3 <= 0);
        if inside {
            fg
        } else {
            BLACK
        }
    });
    Frame::captured(image)
}

pub fn jpeg_bytes(width: u32, height: u32, color: Rgb<u8>) -> Vec<u8> {
    let image = DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, color));
    let mut bytes = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Jpeg)
        .expect("encode jpeg");
    bytes
}

/// Walks the closed polygon through every integer step, like a traced pixel border.
pub fn polygon_contour(vertices: &[(i32, i32)]) -> Vec<Point<i32>> {
    let mut points = Vec::new();
    for (i, &(x0, y0)) in vertices.iter().enumerate() {
        let (x1, y1) = vertices[(i + 1) % vertices.len()];
        let (dx, dy) = (x1 - x0, y1 - y0);
        let steps = dx.abs().max(dy.abs()).max(1);
        for s in 0..steps {
            let t = s as f64 / steps as f64;
            points.push(Point::new(
                (x0 as f64 + dx as f64 * t).round() as i32,
                (y0 as f64 + dy as f64 * t).round() as i32,
            ));
        }
    }
    points
}

pub fn circle_contour(cx: i32, cy: i32, radius: i32, samples: usize) -> Vec<Point<i32>> {
    (0..samples)
        .map(|k| {
            let a = std::f64::consts::TAU * k as f64 / samples as f64;
            Point::new(
                (cx as f64 + radius as f64 * a.cos()).round() as i32,
                (cy as f64 + radius as f64 * a.sin()).round() as i32,
            )
        })
        .collect()
}

pub fn rectangle_shape(confidence: f32) -> ClassifiedShape {
    ClassifiedShape {
        kind: ShapeKind::Rectangle,
        bounding_box: BoundingBox::new(10, 10, 80, 40),
        confidence,
    }
}

/// Vision backend answering from a fixed per-color script, whatever the pixels.
#[derive(Debug, Clone, Default)]
pub struct ScriptedBackend {
    confidences: HashMap<String, f32>,
    shapes: HashMap<String, Vec<ClassifiedShape>>,
}

impl ScriptedBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_confidence(mut self, color: &str, confidence: f32) -> Self {
        self.confidences.insert(color.to_string(), confidence);
        self
    }

    pub fn with_shapes(mut self, color: &str, shapes: Vec<ClassifiedShape>) -> Self {
        self.shapes.insert(color.to_string(), shapes);
        self
    }
}

impl VisionBackend for ScriptedBackend {
    fn mask(&self, _frame: &Frame, range: &ColorRange) -> ColorMask {
        ColorMask {
            color: range.name.clone(),
            edges: GrayImage::new(1, 1),
            confidence: self.confidences.get(&range.name).copied().unwrap_or(0.0),
        }
    }

    fn classify(&self, mask: &ColorMask) -> Vec<ClassifiedShape> {
        self.shapes.get(&mask.color).cloned().unwrap_or_default()
    }

    fn name(&self) -> &'static str {
        "scripted"
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceCommand {
    Resolution(u8),
    Quality(u8),
    AutoWhiteBalance(bool),
    Illumination(u8),
    Output { pin: u8, high: bool },
    ReadPresence,
}

/// Device double that records every call. Presence follows a script and then
/// repeats its last value.
#[derive(Debug, Clone, Default)]
pub struct RecordingDevice {
    log: Arc<Mutex<Vec<DeviceCommand>>>,
    presence: Arc<Mutex<VecDeque<Result<bool, String>>>>,
    last_presence: Arc<Mutex<bool>>,
    fail_commands: bool,
}

impl RecordingDevice {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_presence(self, script: &[bool]) -> Self {
        {
            let mut queue = self.presence.lock().unwrap();
            queue.extend(script.iter().map(|&p| Ok(p)));
        }
        self
    }

    pub fn with_presence_error(self) -> Self {
        self.presence
            .lock()
            .unwrap()
            .push_back(Err("presence read timed out".to_string()));
        self
    }

    /// Every setter fails after being recorded.
    pub fn failing(mut self) -> Self {
        self.fail_commands = true;
        self
    }

    pub fn commands(&self) -> Vec<DeviceCommand> {
        self.log.lock().unwrap().clone()
    }

    /// Recorded commands without the presence reads.
    pub fn actions(&self) -> Vec<DeviceCommand> {
        self.commands()
            .into_iter()
            .filter(|c| *c != DeviceCommand::ReadPresence)
            .collect()
    }

    pub fn outputs(&self) -> Vec<(u8, bool)> {
        self.commands()
            .into_iter()
            .filter_map(|c| match c {
                DeviceCommand::Output { pin, high } => Some((pin, high)),
                _ => None,
            })
            .collect()
    }

    fn record(&self, command: DeviceCommand) -> Result<(), AppError> {
        self.log.lock().unwrap().push(command);
        if self.fail_commands {
            Err(AppError::DeviceResponse("device unreachable".to_string()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl DeviceControl for RecordingDevice {
    async fn set_resolution(&self, index: u8) -> Result<(), AppError> {
        self.record(DeviceCommand::Resolution(index))
    }

    async fn set_quality(&self, quality: u8) -> Result<(), AppError> {
        self.record(DeviceCommand::Quality(quality))
    }

    async fn set_auto_white_balance(&self, enabled: bool) -> Result<(), AppError> {
        self.record(DeviceCommand::AutoWhiteBalance(enabled))
    }

    async fn set_illumination(&self, intensity: u8) -> Result<(), AppError> {
        self.record(DeviceCommand::Illumination(intensity))
    }

    async fn set_digital_output(&self, pin: u8, high: bool) -> Result<(), AppError> {
        self.record(DeviceCommand::Output { pin, high })
    }

    async fn read_presence(&self) -> Result<bool, AppError> {
        self.log.lock().unwrap().push(DeviceCommand::ReadPresence);
        let next = self.presence.lock().unwrap().pop_front();
        let mut last = self.last_presence.lock().unwrap();
        match next {
            Some(Ok(present)) => {
                *last = present;
                Ok(present)
            }
            Some(Err(reason)) => Err(AppError::DeviceResponse(reason)),
            None => Ok(*last),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameStep {
    Frame,
    Empty,
    Fail,
}

/// Frame source that takes `frame_interval` per read, like a slow camera.
/// After its script runs out it keeps producing frames.
#[derive(Debug)]
pub struct ScriptedFrameSource {
    script: VecDeque<FrameStep>,
    frame: Frame,
    frame_interval: Duration,
    attempts: Arc<AtomicUsize>,
    delivered: Arc<AtomicUsize>,
}

impl ScriptedFrameSource {
    pub fn new() -> Self {
        Self {
            script: VecDeque::new(),
            frame: solid_frame(8, 8, BLACK),
            frame_interval: Duration::from_millis(200),
            attempts: Arc::new(AtomicUsize::new(0)),
            delivered: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn with_script(mut self, script: &[FrameStep]) -> Self {
        self.script.extend(script.iter().copied());
        self
    }

    /// Image handed out for every `FrameStep::Frame`.
    pub fn with_frame(mut self, frame: Frame) -> Self {
        self.frame = frame;
        self
    }

    pub fn with_frame_interval(mut self, frame_interval: Duration) -> Self {
        self.frame_interval = frame_interval;
        self
    }

    /// Every read, whatever it returned.
    pub fn attempts(&self) -> Arc<AtomicUsize> {
        self.attempts.clone()
    }

    pub fn delivered(&self) -> Arc<AtomicUsize> {
        self.delivered.clone()
    }
}

#[async_trait]
impl FrameSource for ScriptedFrameSource {
    async fn next_frame(&mut self) -> Result<Option<Frame>, AppError> {
        tokio::time::sleep(self.frame_interval).await;
        self.attempts.fetch_add(1, Ordering::SeqCst);
        match self.script.pop_front().unwrap_or(FrameStep::Frame) {
            FrameStep::Frame => {
                self.delivered.fetch_add(1, Ordering::SeqCst);
                Ok(Some(self.frame.clone()))
            }
            FrameStep::Empty => Ok(None),
            FrameStep::Fail => Err(AppError::VideoSource("frame not ready".to_string())),
        }
    }
}
