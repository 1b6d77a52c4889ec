//! 信号池核心领域层：实体、端口 (Port) 与错误定义。
//!
//! 本 crate 不依赖任何具体的网络或数据库实现，适配器 crate 通过实现
//! 这里定义的 Trait 接入系统。

pub mod common;
pub mod config;

pub mod signal {
    pub mod entity;
    pub mod error;
}

pub mod feed {
    pub mod error;
    pub mod port;
}

pub mod store {
    pub mod error;
    pub mod port;
}
