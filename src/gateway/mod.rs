//! 请求网关
//!
//! 负责 CORS 预检、API Key 提取、客户端 IP 解析与请求体的宽松读取。
//! 认证按路由执行，网关本身不拒绝任何请求。

pub mod middleware;
pub mod request;

pub use middleware::{AppState, cors_layer, panic_response, preflight_middleware};
pub use request::NormalizedRequest;
