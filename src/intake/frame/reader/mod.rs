pub mod mjpeg_reader;

pub use mjpeg_reader::{decode_jpeg, JpegSplitter, MjpegStream, ReadState};
