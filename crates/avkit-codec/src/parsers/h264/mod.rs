//! H.264/AVC 码流格式转换.
//!
//! - avcC (AVCDecoderConfigurationRecord) 解析
//! - avcC 参数集 → Annex B
//! - 长度前缀采样 → Annex B

pub mod nal;

pub use nal::{
    AvccConfig, NalUnitType, avcc_extradata_to_annex_b, avcc_to_annex_b, parse_avcc_config,
    split_avcc,
};
