//! 上游信号接口的 HTTP 适配器。

pub mod http;
