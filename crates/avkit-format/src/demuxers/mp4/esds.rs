//! esds (Elementary Stream Descriptor) 解析.
//!
//! ISO 14496-1 描述符结构:
//! ```text
//! ES_Descriptor (0x03)
//!   └─ DecoderConfigDescriptor (0x04)
//!        └─ DecoderSpecificInfo (0x05)
//! ```
//! 每个描述符以 1 字节 tag 开头, 长度为 1~4 字节的 7 位变长编码.

use avkit_codec::CodecId;
use avkit_core::{AvError, AvResult, ByteReader};

use super::boxes::FullBox;

const ES_DESCRIPTOR_TAG: u8 = 0x03;
const DECODER_CONFIG_TAG: u8 = 0x04;
const DECODER_SPECIFIC_INFO_TAG: u8 = 0x05;

/// esds 中对容器有用的字段
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EsDescriptor {
    pub es_id: u16,
    /// objectTypeIndication
    pub object_type: u8,
    pub stream_type: u8,
    pub max_bitrate: u32,
    pub avg_bitrate: u32,
    /// DecoderSpecificInfo 原始字节 (AAC 为 AudioSpecificConfig)
    pub decoder_specific_info: Option<Vec<u8>>,
}

impl EsDescriptor {
    /// objectTypeIndication 对应的编解码器
    pub fn codec_id(&self) -> Option<CodecId> {
        object_type_codec(self.object_type)
    }

    /// 作为轨道 extra data 的字节
    ///
    /// MPEG-1/2 Layer III 的 DecoderSpecificInfo 不是解码器配置, 不作为 extra data.
    pub fn extra_data(&self) -> Option<&[u8]> {
        if matches!(self.object_type, 0x69 | 0x6B) {
            return None;
        }
        self.decoder_specific_info.as_deref()
    }
}

/// objectTypeIndication → 编解码器
pub fn object_type_codec(object_type: u8) -> Option<CodecId> {
    let codec = match object_type {
        0x08 => CodecId::MovText,
        0x20 => CodecId::Mpeg4,
        0x21 => CodecId::H264,
        0x23 => CodecId::H265,
        0x40 | 0x66 | 0x67 | 0x68 => CodecId::Aac,
        0x60..=0x65 => CodecId::Mpeg2Video,
        0x69 | 0x6B => CodecId::Mp3,
        0x6A => CodecId::Mpeg1Video,
        0x6C => CodecId::Mjpeg,
        0x6D => CodecId::Png,
        0xA5 => CodecId::Ac3,
        0xA6 => CodecId::Eac3,
        0xA9 => CodecId::Dts,
        0xAD => CodecId::Opus,
        0xB1 => CodecId::Vp9,
        0xC1 => CodecId::Flac,
        _ => return None,
    };
    Some(codec)
}

/// 读取描述符头部, 返回 (tag, 长度)
fn read_descriptor(r: &mut ByteReader<'_>) -> AvResult<(u8, usize)> {
    let tag = r.read_u8()?;
    let mut len = 0usize;
    for _ in 0..4 {
        let b = r.read_u8()?;
        len = (len << 7) | usize::from(b & 0x7F);
        if b & 0x80 == 0 {
            break;
        }
    }
    Ok((tag, len))
}

/// 解析 esds 负载
pub fn parse_esds(payload: &[u8]) -> AvResult<EsDescriptor> {
    let mut r = ByteReader::new(payload);
    FullBox::read(&mut r)?;

    let (tag, _) = read_descriptor(&mut r)?;
    if tag != ES_DESCRIPTOR_TAG {
        return Err(AvError::InvalidData(format!(
            "esds: 期望 ES_Descriptor (0x03), 实际 tag=0x{tag:02X}"
        )));
    }
    let es_id = r.read_u16()?;
    let flags = r.read_u8()?;
    if flags & 0x80 != 0 {
        r.skip(2)?; // dependsOn_ES_ID
    }
    if flags & 0x40 != 0 {
        let url_len = r.read_u8()?;
        r.skip(usize::from(url_len))?;
    }
    if flags & 0x20 != 0 {
        r.skip(2)?; // OCR_ES_Id
    }

    let (tag, _) = read_descriptor(&mut r)?;
    if tag != DECODER_CONFIG_TAG {
        return Err(AvError::InvalidData(format!(
            "esds: 期望 DecoderConfigDescriptor (0x04), 实际 tag=0x{tag:02X}"
        )));
    }
    let object_type = r.read_u8()?;
    let stream_type = r.read_u8()? >> 2;
    r.skip(3)?; // bufferSizeDB
    let max_bitrate = r.read_u32()?;
    let avg_bitrate = r.read_u32()?;

    let mut decoder_specific_info = None;
    if !r.is_empty() {
        let (tag, len) = read_descriptor(&mut r)?;
        if tag == DECODER_SPECIFIC_INFO_TAG && len > 0 {
            let info = r.read_bytes(len).map_err(|_| {
                AvError::InvalidData(format!(
                    "esds: DecoderSpecificInfo 声明 {len} 字节, 超出剩余数据"
                ))
            })?;
            decoder_specific_info = Some(info.to_vec());
        }
    }

    Ok(EsDescriptor {
        es_id,
        object_type,
        stream_type,
        max_bitrate,
        avg_bitrate,
        decoder_specific_info,
    })
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// 构造一个 AAC esds 负载
    pub(crate) fn build_esds(object_type: u8, dsi: &[u8]) -> Vec<u8> {
        let mut dec_config = vec![object_type, 0x15, 0, 0, 0];
        dec_config.extend_from_slice(&128_000u32.to_be_bytes());
        dec_config.extend_from_slice(&96_000u32.to_be_bytes());
        dec_config.push(DECODER_SPECIFIC_INFO_TAG);
        dec_config.push(dsi.len() as u8);
        dec_config.extend_from_slice(dsi);

        let mut es = vec![0x00, 0x01, 0x00]; // ES_ID=1, flags=0
        es.push(DECODER_CONFIG_TAG);
        // 4 字节长度编码
        es.extend_from_slice(&[0x80, 0x80, 0x80, dec_config.len() as u8]);
        es.extend_from_slice(&dec_config);

        let mut payload = vec![0u8; 4];
        payload.push(ES_DESCRIPTOR_TAG);
        payload.push(es.len() as u8);
        payload.extend_from_slice(&es);
        payload
    }

    #[test]
    fn test_解析_aac_esds() {
        let esds = parse_esds(&build_esds(0x40, &[0x12, 0x10])).unwrap();
        assert_eq!(esds.es_id, 1);
        assert_eq!(esds.object_type, 0x40);
        assert_eq!(esds.stream_type, 5);
        assert_eq!(esds.max_bitrate, 128_000);
        assert_eq!(esds.codec_id(), Some(CodecId::Aac));
        assert_eq!(esds.extra_data(), Some(&[0x12, 0x10][..]));
    }

    #[test]
    fn test_mp3_不带_extra_data() {
        let esds = parse_esds(&build_esds(0x6B, &[0x00])).unwrap();
        assert_eq!(esds.codec_id(), Some(CodecId::Mp3));
        assert_eq!(esds.extra_data(), None);
    }

    #[test]
    fn test_dsi_长度越界() {
        let mut payload = build_esds(0x40, &[0x12, 0x10]);
        let len = payload.len();
        payload.truncate(len - 1);
        assert!(parse_esds(&payload).is_err());
    }

    #[test]
    fn test_缺少_es_descriptor() {
        let payload = [0, 0, 0, 0, DECODER_CONFIG_TAG, 0];
        assert!(matches!(parse_esds(&payload), Err(AvError::InvalidData(_))));
    }
}
