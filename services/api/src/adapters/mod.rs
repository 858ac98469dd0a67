pub mod files;
pub mod gemini;
pub mod kv;

pub use files::read_image_files;
pub use gemini::GeminiAdapter;
pub use kv::SqliteKvAdapter;
