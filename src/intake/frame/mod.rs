pub mod frame_source;
pub mod reader;

pub use frame_source::FrameSource;
pub use reader::{decode_jpeg, JpegSplitter, MjpegStream};
