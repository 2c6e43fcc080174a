//! AAC AudioSpecificConfig 解析与 ADTS 头生成.
//!
//! MP4 中的 AAC 采样是裸 raw_data_block, 配置放在 esds 的
//! DecoderSpecificInfo 里. 导出为 `.aac` 文件时需要为每帧补上 7 字节 ADTS 头.

use avkit_core::bitreader::BitReader;
use avkit_core::{AvError, AvResult};

/// AAC 采样率索引表
pub const AAC_SAMPLE_RATES: [u32; 13] = [
    96000, 88200, 64000, 48000, 44100, 32000, 24000, 22050, 16000, 12000, 11025, 8000, 7350,
];

/// AudioSpecificConfig 中与 ADTS 相关的字段
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AudioSpecificConfig {
    /// audioObjectType (2 = AAC-LC)
    pub object_type: u8,
    /// samplingFrequencyIndex, 显式采样率时为 15
    pub sample_rate_index: u8,
    /// 采样率 (Hz)
    pub sample_rate: u32,
    /// channelConfiguration
    pub channel_config: u8,
}

impl AudioSpecificConfig {
    /// 解析 AudioSpecificConfig (ISO 14496-3 1.6.2.1)
    pub fn parse(data: &[u8]) -> AvResult<Self> {
        let mut br = BitReader::new(data);
        let mut object_type = br.read_bits(5)? as u8;
        if object_type == 31 {
            object_type = 32 + br.read_bits(6)? as u8;
        }
        let sample_rate_index = br.read_bits(4)? as u8;
        let sample_rate = if sample_rate_index == 0x0F {
            br.read_bits(24)?
        } else {
            *AAC_SAMPLE_RATES
                .get(sample_rate_index as usize)
                .ok_or_else(|| {
                    AvError::InvalidData(format!("AAC: 保留的采样率索引 {sample_rate_index}"))
                })?
        };
        let channel_config = br.read_bits(4)? as u8;

        Ok(Self {
            object_type,
            sample_rate_index,
            sample_rate,
            channel_config,
        })
    }

    /// 生成一帧的 ADTS 头 (7 字节, 无 CRC)
    ///
    /// `payload_len` 为 raw_data_block 的长度.
    pub fn adts_header(&self, payload_len: usize) -> AvResult<[u8; 7]> {
        if self.sample_rate_index > 12 {
            return Err(AvError::Unsupported(format!(
                "ADTS 无法表示显式采样率 {}",
                self.sample_rate
            )));
        }
        if !(1..=4).contains(&self.object_type) {
            return Err(AvError::Unsupported(format!(
                "ADTS 无法表示 audioObjectType={}",
                self.object_type
            )));
        }
        let frame_length = payload_len + 7;
        if frame_length > 0x1FFF {
            return Err(AvError::InvalidData(format!(
                "AAC 帧长度超出 ADTS 限制: {frame_length}"
            )));
        }

        let profile = self.object_type - 1;
        let ch = self.channel_config;
        let fl = frame_length as u32;
        Ok([
            0xFF,
            0xF1, // syncword 低 4 位 + MPEG-4 + layer 0 + protection_absent
            (profile << 6) | (self.sample_rate_index << 2) | ((ch >> 2) & 0x01),
            ((ch & 0x03) << 6) | ((fl >> 11) & 0x03) as u8,
            ((fl >> 3) & 0xFF) as u8,
            (((fl & 0x07) << 5) as u8) | 0x1F, // buffer fullness 0x7FF 高 5 位
            0xFC,                              // buffer fullness 低 6 位 + 1 个 raw_data_block
        ])
    }
}
