pub use canvas::{Canvas, CanvasContext};
pub use recording::{RecordedCall, RecordingContext};

mod canvas;
mod recording;
