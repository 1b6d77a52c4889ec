//! 信号存储适配器：SQLite 实现与内存实现。

pub mod memory;
pub mod sqlite;
