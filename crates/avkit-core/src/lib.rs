//! # avkit-core
//!
//! avkit 核心库, 提供错误类型、媒体类型以及字节/比特读取工具.
//!
//! 上层的 codec 与 format crate 都建立在本 crate 之上.

pub mod bitreader;
pub mod byte_reader;
pub mod error;
pub mod media_type;

// 重导出常用类型
pub use byte_reader::ByteReader;
pub use error::{AvError, AvResult, MissingTable};
pub use media_type::MediaType;
