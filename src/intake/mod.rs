pub mod frame;

pub use frame::{FrameSource, JpegSplitter, MjpegStream};
