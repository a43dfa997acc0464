//! 语音检测端点

pub mod classifier;
mod handlers;
pub mod types;

pub use handlers::predict;
