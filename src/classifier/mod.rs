pub mod adapter;
pub mod gemini;
pub mod prompt;

pub use adapter::{ImageRef, ImageSource, RawClassification, VisionClassifier};
pub use gemini::GeminiVisionClient;
pub use prompt::build_prompt;
