//! H.265/HEVC NAL 单元与 HVCC/Annex B 转换.
//!
//! HEVC NAL 头部为 2 字节:
//! - forbidden_zero_bit (1 bit)
//! - nal_unit_type (6 bits)
//! - nuh_layer_id (6 bits)
//! - nuh_temporal_id_plus1 (3 bits)

use avkit_core::{AvError, AvResult, ByteReader};
use log::debug;

use crate::parsers::START_CODE;

/// HEVC NAL 单元类型 (仅区分格式转换关心的类型)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HevcNalUnitType {
    /// VPS (32)
    Vps,
    /// SPS (33)
    Sps,
    /// PPS (34)
    Pps,
    /// PREFIX_SEI (39)
    PrefixSei,
    /// SUFFIX_SEI (40)
    SuffixSei,
    /// 其他类型
    Other(u8),
}

impl HevcNalUnitType {
    pub fn from_type_id(id: u8) -> Self {
        match id {
            32 => Self::Vps,
            33 => Self::Sps,
            34 => Self::Pps,
            39 => Self::PrefixSei,
            40 => Self::SuffixSei,
            other => Self::Other(other),
        }
    }

    /// 从 NAL 头第一个字节提取类型
    pub fn from_header(header: u8) -> Self {
        Self::from_type_id((header >> 1) & 0x3F)
    }
}

/// 是否为 IRAP (BLA/IDR/CRA 及保留的 IRAP 类型 16..=23)
pub fn is_irap(header: u8) -> bool {
    matches!((header >> 1) & 0x3F, 16..=23)
}

/// hvcC 配置解析结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HvccConfig {
    /// general_profile_idc
    pub general_profile_idc: u8,
    /// general_level_idc
    pub general_level_idc: u8,
    /// NAL 长度字段大小
    pub length_size: usize,
    /// 按出现顺序排列的参数集/SEI 数组
    pub arrays: Vec<(HevcNalUnitType, Vec<Vec<u8>>)>,
}

/// 解析 HEVCDecoderConfigurationRecord
///
/// 数组中只允许出现 VPS/SPS/PPS/SEI, 其他类型视为损坏数据.
pub fn parse_hvcc_config(data: &[u8]) -> AvResult<HvccConfig> {
    if data.len() < 23 {
        return Err(AvError::InvalidData(format!(
            "HEVC: hvcC 数据太短, len={}",
            data.len()
        )));
    }

    let general_profile_idc = data[1] & 0x1F;
    let general_level_idc = data[12];
    // byte 21: constantFrameRate(2) | numTemporalLayers(3) | temporalIdNested(1) | lengthSizeMinusOne(2)
    let length_size = ((data[21] & 0x03) + 1) as usize;

    let mut r = ByteReader::new(&data[22..]);
    let num_arrays = r.read_u8()?;
    let mut arrays = Vec::with_capacity(num_arrays as usize);
    for i in 0..num_arrays {
        let nal_type = HevcNalUnitType::from_type_id(r.read_u8()? & 0x3F);
        if let HevcNalUnitType::Other(id) = nal_type {
            return Err(AvError::InvalidData(format!(
                "HEVC: hvcC 数组 {i} 含非法 NAL 类型 {id}"
            )));
        }
        let count = r.read_u16()? as usize;
        let mut units = Vec::with_capacity(count);
        for _ in 0..count {
            let len = r.read_u16()? as usize;
            units.push(r.read_bytes(len)?.to_vec());
        }
        arrays.push((nal_type, units));
    }

    Ok(HvccConfig {
        general_profile_idc,
        general_level_idc,
        length_size,
        arrays,
    })
}

/// 把 hvcC 配置转换为 Annex B 格式 (保持数组顺序)
///
/// 返回 `(annex_b, length_size)`.
pub fn hvcc_extradata_to_annex_b(data: &[u8]) -> AvResult<(Vec<u8>, usize)> {
    let config = parse_hvcc_config(data)?;
    let mut out = Vec::new();
    for (_, units) in &config.arrays {
        for nal in units {
            out.extend_from_slice(&START_CODE);
            out.extend_from_slice(nal);
        }
    }
    debug!(
        "HEVC: hvcC 转 Annex B, profile={}, level={}, 数组数={}, length_size={}",
        config.general_profile_idc,
        config.general_level_idc,
        config.arrays.len(),
        config.length_size,
    );
    Ok((out, config.length_size))
}

/// 把 MP4 中长度前缀的 HEVC 采样转换为 Annex B
///
/// 在采样的第一个 IRAP NAL 前插入 `extradata`.
pub fn hvcc_to_annex_b(sample: &[u8], length_size: usize, extradata: &[u8]) -> AvResult<Vec<u8>> {
    if !(1..=4).contains(&length_size) {
        return Err(AvError::InvalidArgument(format!(
            "NAL 长度前缀大小非法: {length_size}"
        )));
    }

    let mut r = ByteReader::new(sample);
    let mut out = Vec::with_capacity(sample.len() + extradata.len() + 16);
    let mut got_irap = false;
    while !r.is_empty() {
        let prefix = r.read_bytes(length_size)?;
        let len = prefix
            .iter()
            .fold(0usize, |acc, &b| (acc << 8) | b as usize);
        if len < 2 {
            return Err(AvError::InvalidData(format!(
                "HEVC: NAL 长度非法: {len}"
            )));
        }
        let nal = r.read_bytes(len)?;

        if is_irap(nal[0]) && !got_irap {
            got_irap = true;
            out.extend_from_slice(extradata);
        }
        out.extend_from_slice(&START_CODE);
        out.extend_from_slice(nal);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_hvcc(extra_array_type: Option<u8>) -> Vec<u8> {
        let mut data = vec![0u8; 22];
        data[0] = 1;
        data[1] = 0x01;
        data[12] = 93;
        data[21] = 0x0F; // lengthSizeMinusOne = 3
        let arrays: Vec<(u8, &[u8])> = vec![
            (32, &[0x40, 0x01, 0x0C][..]),
            (33, &[0x42, 0x01, 0x01][..]),
            (34, &[0x44, 0x01, 0xC1][..]),
        ];
        let n = arrays.len() + usize::from(extra_array_type.is_some());
        data.push(n as u8);
        for (t, nal) in arrays {
            data.push(0x80 | t);
            data.extend_from_slice(&1u16.to_be_bytes());
            data.extend_from_slice(&(nal.len() as u16).to_be_bytes());
            data.extend_from_slice(nal);
        }
        if let Some(t) = extra_array_type {
            data.push(t);
            data.extend_from_slice(&0u16.to_be_bytes());
        }
        data
    }

    #[test]
    fn test_hvcc_配置转_annex_b() {
        let (annex_b, length_size) = hvcc_extradata_to_annex_b(&sample_hvcc(None)).unwrap();
        assert_eq!(length_size, 4);
        assert_eq!(
            annex_b,
            vec![
                0, 0, 0, 1, 0x40, 0x01, 0x0C, 0, 0, 0, 1, 0x42, 0x01, 0x01, 0, 0, 0, 1, 0x44,
                0x01, 0xC1
            ]
        );
    }

    #[test]
    fn test_hvcc_非法数组类型() {
        // 类型 1 (TRAIL_R) 不允许出现在 hvcC 中
        assert!(parse_hvcc_config(&sample_hvcc(Some(1))).is_err());
        // SEI 前缀允许
        let config = parse_hvcc_config(&sample_hvcc(Some(39))).unwrap();
        assert_eq!(config.arrays.len(), 4);
        assert_eq!(config.arrays[3].0, HevcNalUnitType::PrefixSei);
    }

    #[test]
    fn test_首个_irap_前插入参数集() {
        let extra = [0, 0, 0, 1, 0x40, 0x01];
        // IDR_W_RADL (19) 的头字节: 19 << 1 = 0x26
        let sample = [0x00, 0x02, 0x26, 0x01, 0x00, 0x02, 0x26, 0x01];
        let out = hvcc_to_annex_b(&sample, 2, &extra).unwrap();
        let mut expected = extra.to_vec();
        expected.extend_from_slice(&[0, 0, 0, 1, 0x26, 0x01, 0, 0, 0, 1, 0x26, 0x01]);
        assert_eq!(out, expected);
    }

    #[test]
    fn test_非_irap_采样不插入() {
        // TRAIL_R (1): 头字节 0x02
        let sample = [0x00, 0x02, 0x02, 0x01];
        let out = hvcc_to_annex_b(&sample, 2, &[9, 9]).unwrap();
        assert_eq!(out, vec![0, 0, 0, 1, 0x02, 0x01]);
    }
}
