pub mod chromatic;
mod sample_buffer;
mod transform;

pub use chromatic::{SliceMarker, concatenate, write_with_markers};
pub use sample_buffer::SampleBuffer;
pub use transform::{Transform, Varispeed};
