//! 码流解析器.
//!
//! MP4 中的 H.264/H.265 采样使用长度前缀 (AVCC/HVCC) 封装, 参数集放在
//! avcC/hvcC 配置中. 这里的函数把它们转换成裸流常用的 Annex B 格式.

pub mod h264;
pub mod h265;

/// Annex B 4 字节起始码
pub const START_CODE: [u8; 4] = [0x00, 0x00, 0x00, 0x01];
