//! # avkit
//!
//! 纯 Rust 实现的 MP4/MOV 解封装工具集.
//!
//! 解析 ISO 基础媒体文件格式 (ISOBMFF) 的 Box 树, 为每个轨道建立采样索引,
//! 并按文件顺序交错读出所有轨道的采样.
//!
//! # 快速开始
//!
//! ```rust,no_run
//! use avkit::format::Mp4Demuxer;
//!
//! let mut demuxer = Mp4Demuxer::new(Box::new(|data, pts, dts, media_type, codec_id| {
//!     println!("{media_type} {codec_id}: {} 字节, pts={pts} dts={dts}", data.len());
//! }));
//! demuxer.open("input.mp4")?;
//! while demuxer.read().is_ok() {}
//! # Ok::<(), avkit::core::AvError>(())
//! ```
//!
//! # Crate 结构
//!
//! | Crate | 功能 |
//! |-------|------|
//! | `avkit-core` | 错误类型, 媒体类型, 字节/比特读取 |
//! | `avkit-codec` | 编解码器标识, AAC/H.264/H.265 码流转换 |
//! | `avkit-format` | Box 解析, 采样索引, 交错读取 |

pub mod logging;

/// 核心类型与工具
pub use avkit_core as core;

/// 编解码器标识与码流转换
pub use avkit_codec as codec;

/// 容器格式框架
pub use avkit_format as format;

/// 获取 avkit 版本号
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

/// 创建已注册所有内置容器格式的注册表
pub fn default_format_registry() -> avkit_format::FormatRegistry {
    let mut registry = avkit_format::FormatRegistry::new();
    avkit_format::register_all(&mut registry);
    registry
}
