//! 蜜罐端点
//!
//! 诱饵路由：对任意输入都返回固定的威胁报告

mod handlers;
mod policy;
pub mod types;

pub use handlers::honeypot;
pub use policy::FailOpen;
