//! H.264 NAL (Network Abstraction Layer) 单元与 AVCC/Annex B 转换.
//!
//! # NAL 头部 (1 字节)
//! ```text
//! ┌─────────────────────────────────────┐
//! │ forbidden(1) | ref_idc(2) | type(5) │
//! └─────────────────────────────────────┘
//! ```
//!
//! # AVCC 格式
//!
//! MP4 采样中每个 NAL 前有 `length_size` 字节的大端长度前缀:
//! ```text
//! [length: N bytes BE] [NAL data: length bytes]
//! ```

use avkit_core::{AvError, AvResult, ByteReader};
use log::debug;

use crate::parsers::START_CODE;

/// NAL 单元类型 (仅区分格式转换关心的类型)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NalUnitType {
    /// 非 IDR 图像切片
    Slice,
    /// IDR 图像切片 (关键帧)
    SliceIdr,
    /// 增补增强信息 (SEI)
    Sei,
    /// 序列参数集 (SPS)
    Sps,
    /// 图像参数集 (PPS)
    Pps,
    /// 访问单元分隔符 (AUD)
    Aud,
    /// 其他类型
    Other(u8),
}

impl NalUnitType {
    /// 从 NAL 头字节创建
    pub fn from_header(header: u8) -> Self {
        match header & 0x1F {
            1 => Self::Slice,
            5 => Self::SliceIdr,
            6 => Self::Sei,
            7 => Self::Sps,
            8 => Self::Pps,
            9 => Self::Aud,
            other => Self::Other(other),
        }
    }
}

/// avcC 配置解析结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AvccConfig {
    /// AVCProfileIndication
    pub profile: u8,
    /// AVCLevelIndication
    pub level: u8,
    /// NAL 长度前缀大小 (字节)
    pub length_size: usize,
    /// SPS 列表
    pub sps_list: Vec<Vec<u8>>,
    /// PPS 列表
    pub pps_list: Vec<Vec<u8>>,
}

/// 解析 AVCDecoderConfigurationRecord (MP4 avcC box 内容)
pub fn parse_avcc_config(data: &[u8]) -> AvResult<AvccConfig> {
    if data.len() < 7 {
        return Err(AvError::InvalidData(format!(
            "H.264: avcC 数据太短, len={}",
            data.len()
        )));
    }

    let mut r = ByteReader::new(data);
    let _version = r.read_u8()?;
    let profile = r.read_u8()?;
    let _compat = r.read_u8()?;
    let level = r.read_u8()?;
    let length_size = ((r.read_u8()? & 0x03) + 1) as usize;

    let num_sps = (r.read_u8()? & 0x1F) as usize;
    let sps_list = read_parameter_sets(&mut r, num_sps, "SPS")?;

    // 仅有 SPS 而没有 PPS 计数字段的配置按 0 个 PPS 处理
    let num_pps = if r.is_empty() {
        0
    } else {
        r.read_u8()? as usize
    };
    let pps_list = read_parameter_sets(&mut r, num_pps, "PPS")?;

    Ok(AvccConfig {
        profile,
        level,
        length_size,
        sps_list,
        pps_list,
    })
}

fn read_parameter_sets(r: &mut ByteReader<'_>, count: usize, kind: &str) -> AvResult<Vec<Vec<u8>>> {
    let mut list = Vec::with_capacity(count);
    for i in 0..count {
        let len = r.read_u16().map_err(|_| {
            AvError::InvalidData(format!("H.264: avcC {kind} 长度字段截断, index={i}"))
        })? as usize;
        if len == 0 {
            return Err(AvError::InvalidData(format!(
                "H.264: avcC {kind} 长度非法, index={i}, len=0"
            )));
        }
        let nal = r.read_bytes(len).map_err(|_| {
            AvError::InvalidData(format!(
                "H.264: avcC {kind} 数据截断, index={i}, declared_len={len}"
            ))
        })?;
        list.push(nal.to_vec());
    }
    Ok(list)
}

/// 把 avcC 配置转换为 Annex B 格式的参数集 (SPS 在前, PPS 在后)
///
/// 返回 `(annex_b, length_size)`, `length_size` 用于之后转换采样.
pub fn avcc_extradata_to_annex_b(data: &[u8]) -> AvResult<(Vec<u8>, usize)> {
    let config = parse_avcc_config(data)?;
    let mut out = Vec::new();
    for nal in config.sps_list.iter().chain(config.pps_list.iter()) {
        out.extend_from_slice(&START_CODE);
        out.extend_from_slice(nal);
    }
    debug!(
        "H.264: avcC 转 Annex B, profile={}, level={}, SPS={}, PPS={}, length_size={}",
        config.profile,
        config.level,
        config.sps_list.len(),
        config.pps_list.len(),
        config.length_size,
    );
    Ok((out, config.length_size))
}

/// 按长度前缀拆分采样中的 NAL 单元
pub fn split_avcc(data: &[u8], length_size: usize) -> AvResult<Vec<&[u8]>> {
    if !(1..=4).contains(&length_size) {
        return Err(AvError::InvalidArgument(format!(
            "NAL 长度前缀大小非法: {length_size}"
        )));
    }

    let mut r = ByteReader::new(data);
    let mut nalus = Vec::new();
    while !r.is_empty() {
        let prefix = r.read_bytes(length_size)?;
        let len = prefix
            .iter()
            .fold(0usize, |acc, &b| (acc << 8) | b as usize);
        if len == 0 {
            continue;
        }
        nalus.push(r.read_bytes(len)?);
    }
    Ok(nalus)
}

/// 把 MP4 中长度前缀的 H.264 采样转换为 Annex B
///
/// 采样中出现 IDR 而本身不携带 SPS/PPS 时, 在 IDR 前插入 `extradata`
/// (通常是 [`avcc_extradata_to_annex_b`] 的结果), 每个采样最多插入一次.
pub fn avcc_to_annex_b(sample: &[u8], length_size: usize, extradata: &[u8]) -> AvResult<Vec<u8>> {
    let nalus = split_avcc(sample, length_size)?;
    let mut out = Vec::with_capacity(sample.len() + extradata.len() + nalus.len() * 4);
    let mut params_seen = false;
    let mut extradata_written = false;

    for nal in nalus {
        match NalUnitType::from_header(nal[0]) {
            NalUnitType::Sps | NalUnitType::Pps => params_seen = true,
            NalUnitType::SliceIdr if !params_seen && !extradata_written => {
                out.extend_from_slice(extradata);
                extradata_written = true;
            }
            _ => {}
        }
        out.extend_from_slice(&START_CODE);
        out.extend_from_slice(nal);
    }
    Ok(out)
}
