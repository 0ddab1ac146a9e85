pub mod capture;
pub mod transcribe;
pub mod wav;

pub use capture::{AudioCapture, RecordingSession};
pub use transcribe::{TranscribeError, Transcriber};
