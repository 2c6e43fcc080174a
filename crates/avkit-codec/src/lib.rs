//! # avkit-codec
//!
//! 编解码器标识与码流格式转换.
//!
//! 不包含任何解码器, 只提供容器层需要的编解码器相关工具:
//!
//! - [`CodecId`]: 编解码器标识, 与容器格式无关
//! - H.264 / H.265: avcC/hvcC 配置与长度前缀采样转换为 Annex B
//! - AAC: AudioSpecificConfig 解析与 ADTS 头生成

pub mod aac;
pub mod codec_id;
pub mod parsers;

// 重导出常用类型
pub use codec_id::CodecId;
