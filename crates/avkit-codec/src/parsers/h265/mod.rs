//! H.265/HEVC 码流格式转换.
//!
//! # HEVC NAL 头部 (2 字节)
//! ```text
//! ┌───────────────────────────────────────────────┐
//! │ forbidden(1) | type(6) | layer_id(6) | tid(3) │
//! └───────────────────────────────────────────────┘
//! ```

pub mod nal;

pub use nal::{
    HevcNalUnitType, HvccConfig, hvcc_extradata_to_annex_b, hvcc_to_annex_b, is_irap,
    parse_hvcc_config,
};
