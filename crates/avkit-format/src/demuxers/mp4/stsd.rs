//! stsd 采样描述解析与编解码器识别.
//!
//! 每个采样描述条目本身是一个 Box, 类型码即采样格式 (avc1/mp4a/tx3g ...):
//! ```text
//! SampleEntry:  reserved(6) + data_reference_index(2)
//! VisualSampleEntry: + pre_defined/reserved(16) + width(2) + height(2)
//!                    + resolution(8) + reserved(4) + frame_count(2)
//!                    + compressorname(32) + depth(2) + pre_defined(2) + 子 Box
//! AudioSampleEntry:  + version(2) + revision(2) + vendor(4)
//!                    + channel_count(2) + sample_size(2) + compression_id(2)
//!                    + packet_size(2) + sample_rate(4, 16.16) + [v1/v2 扩展] + 子 Box
//! ```

use avkit_codec::CodecId;
use avkit_codec::parsers::{h264, h265};
use avkit_core::{AvError, AvResult, ByteReader, MediaType};

use super::boxes::{FourCc, FullBox};
use super::esds::parse_esds;
use super::framer::{BoxFramer, FrameScope};
use super::track::{AudioMetaData, DataMetaData, MetaData, SubtitleMetaData, VideoMetaData};

// ========================
// 采样格式 → 编解码器
// ========================

fn video_codec(tag: &[u8; 4]) -> Option<CodecId> {
    let codec = match tag {
        b"avc1" | b"avc2" | b"avc3" | b"avc4" | b"dva1" | b"dvav" | b"AVin" | b"ai5p"
        | b"ai5q" | b"ai52" | b"ai53" | b"ai55" | b"ai56" | b"ai1p" | b"ai1q" | b"ai12"
        | b"ai13" | b"ai15" | b"ai16" | b"aivx" | b"xalg" | b"avlg" => CodecId::H264,
        b"hvc1" | b"hev1" | b"dvhe" | b"dvh1" => CodecId::H265,
        b"vp08" => CodecId::Vp8,
        b"vp09" => CodecId::Vp9,
        b"av01" => CodecId::Av1,
        b"m1v " | b"m1v1" | b"mpeg" | b"mp1v" => CodecId::Mpeg1Video,
        b"m2v1" | b"hdv1" | b"hdv2" | b"hdv3" | b"hdv4" | b"hdv5" | b"hdv6" | b"hdv7"
        | b"hdv8" | b"xdv1" | b"xdv2" | b"xdv3" | b"xdv4" | b"xdv5" | b"xdv6" | b"xdv7"
        | b"xdv8" | b"xdv9" | b"xdva" | b"xdvb" | b"xdvc" | b"xdvd" | b"xdve" | b"xdvf"
        | b"mx5n" | b"mx5p" | b"mx4n" | b"mx4p" | b"mx3n" | b"mx3p" => CodecId::Mpeg2Video,
        b"mp4v" | b"DIVX" | b"XVID" | b"3IV2" => CodecId::Mpeg4,
        b"h263" | b"s263" => CodecId::H263,
        b"jpeg" | b"mjpa" | b"AVDJ" | b"AVRn" | b"dmb1" => CodecId::Mjpeg,
        b"apch" | b"apcn" | b"apcs" | b"apco" | b"ap4h" | b"ap4x" => CodecId::ProRes,
        b"png " | b"MNG " => CodecId::Png,
        b"raw " | b"yuv2" | b"2vuy" | b"yuvs" | b"L555" | b"L565" | b"B565" | b"24BG"
        | b"BGRA" | b"RGBA" | b"ABGR" | b"b16g" | b"b48r" | b"b64a" | b"WRAW" => {
            CodecId::RawVideo
        }
        _ => return None,
    };
    Some(codec)
}

fn audio_codec(tag: &[u8; 4]) -> Option<CodecId> {
    let codec = match tag {
        b"mp4a" => CodecId::Aac,
        b".mp2" => CodecId::Mp2,
        b".mp3" | b"mp3 " => CodecId::Mp3,
        b"Opus" => CodecId::Opus,
        b"fLaC" => CodecId::Flac,
        b"alac" => CodecId::Alac,
        b"ac-3" | b"sac3" => CodecId::Ac3,
        b"ec-3" => CodecId::Eac3,
        b"dtsc" | b"dtsh" | b"dtsl" | b"dtse" | b"DTS " => CodecId::Dts,
        b"samr" => CodecId::AmrNb,
        b"sawb" => CodecId::AmrWb,
        b"twos" | b"NONE" => CodecId::PcmS16be,
        b"sowt" => CodecId::PcmS16le,
        b"in24" => CodecId::PcmS24be,
        b"in32" => CodecId::PcmS32be,
        b"fl32" => CodecId::PcmF32be,
        b"fl64" => CodecId::PcmF64be,
        b"alaw" => CodecId::PcmAlaw,
        b"ulaw" => CodecId::PcmMulaw,
        _ => return None,
    };
    Some(codec)
}

fn subtitle_codec(tag: &[u8; 4]) -> Option<CodecId> {
    match tag {
        b"tx3g" | b"text" => Some(CodecId::MovText),
        b"c608" => Some(CodecId::Eia608),
        _ => None,
    }
}

fn data_codec(tag: &[u8; 4]) -> Option<CodecId> {
    match tag {
        b"gpmd" => Some(CodecId::BinData),
        _ => None,
    }
}

/// 采样格式 → 编解码器, 依次查视频、音频、字幕、数据表
pub fn lookup_codec(format: &FourCc) -> Option<CodecId> {
    let tag = format.as_bytes();
    video_codec(tag)
        .or_else(|| audio_codec(tag))
        .or_else(|| subtitle_codec(tag))
        .or_else(|| data_codec(tag))
}

// ========================
// 采样描述
// ========================

/// stsd Box 内容
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SampleDescription {
    pub full: FullBox,
    pub entries: Vec<SampleEntry>,
}

/// 一个采样描述条目
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SampleEntry {
    /// 采样格式
    pub format: FourCc,
    pub data_reference_index: u16,
    pub meta_data: MetaData,
}

impl SampleDescription {
    pub fn parse(payload: &[u8]) -> AvResult<Self> {
        let mut r = ByteReader::new(payload);
        let full = FullBox::read(&mut r)?;
        let entry_count = r.read_u32()? as usize;

        let mut framer = BoxFramer::new(r.rest(), 0, FrameScope::Nested);
        let mut entries = Vec::with_capacity(entry_count.min(8));
        while entries.len() < entry_count {
            let Some(header) = framer.next_box()? else {
                log::warn!(
                    "stsd: 声明 {entry_count} 个条目, 实际只有 {} 个",
                    entries.len()
                );
                break;
            };
            entries.push(SampleEntry::parse(header.fourcc, framer.payload(&header))?);
        }
        Ok(Self { full, entries })
    }

    /// 第一个条目的元数据
    pub fn meta_data(&self) -> Option<&MetaData> {
        self.entries.first().map(|e| &e.meta_data)
    }

    pub fn formats(&self) -> Vec<FourCc> {
        self.entries.iter().map(|e| e.format).collect()
    }
}

impl SampleEntry {
    pub fn parse(format: FourCc, payload: &[u8]) -> AvResult<Self> {
        let mut r = ByteReader::new(payload);
        r.skip(6)?;
        let data_reference_index = r.read_u16()?;

        let codec_id = lookup_codec(&format).ok_or_else(|| {
            AvError::InvalidData(format!("stsd: 无法识别的采样格式 '{format}'"))
        })?;
        let meta_data = match codec_id.media_type() {
            MediaType::Video => parse_video(codec_id, &mut r)?,
            MediaType::Audio => parse_audio(codec_id, &mut r)?,
            MediaType::Subtitle => MetaData::Subtitle(SubtitleMetaData {
                codec_id,
                extra_data: r.rest().to_vec(),
            }),
            MediaType::Data => MetaData::Data(DataMetaData {
                codec_id,
                extra_data: r.rest().to_vec(),
            }),
        };
        Ok(Self {
            format,
            data_reference_index,
            meta_data,
        })
    }
}

/// 切分采样描述条目末尾的子 Box
///
/// 子 Box 不影响索引, 分帧失败时只丢弃剩余部分.
fn child_boxes(data: &[u8]) -> Vec<(FourCc, &[u8])> {
    let mut framer = BoxFramer::new(data, 0, FrameScope::Nested);
    let mut children = Vec::new();
    loop {
        match framer.next_box() {
            Ok(Some(header)) => children.push((header.fourcc, framer.payload(&header))),
            Ok(None) => break,
            Err(e) => {
                log::warn!("stsd: 采样描述的子 box 分帧失败, 忽略剩余部分: {e}");
                break;
            }
        }
    }
    children
}

/// 用 esds 修正编解码器并取出解码器配置
fn apply_esds(
    payload: &[u8],
    media_type: MediaType,
    codec_id: &mut CodecId,
    extra_data: &mut Vec<u8>,
) {
    match parse_esds(payload) {
        Ok(esds) => {
            if let Some(refined) = esds.codec_id() {
                if refined.media_type() == media_type {
                    *codec_id = refined;
                }
            }
            if let Some(info) = esds.extra_data() {
                *extra_data = info.to_vec();
            }
        }
        Err(e) => log::warn!("stsd: esds 解析失败, 忽略: {e}"),
    }
}

/// 去掉 FullBox 的 version/flags
fn strip_full_box(payload: &[u8]) -> &[u8] {
    payload.get(4..).unwrap_or_default()
}

fn parse_video(codec_id: CodecId, r: &mut ByteReader<'_>) -> AvResult<MetaData> {
    r.skip(16)?;
    let width = r.read_u16()?;
    let height = r.read_u16()?;
    // 分辨率(8) + reserved(4) + frame_count(2) + compressorname(32) + depth(2) + pre_defined(2)
    r.skip(50)?;

    let mut meta = VideoMetaData {
        codec_id,
        width,
        height,
        extra_data: Vec::new(),
        length_size: None,
    };
    for (fourcc, payload) in child_boxes(r.rest()) {
        match fourcc.as_bytes() {
            b"avcC" => {
                let (annex_b, length_size) = h264::avcc_extradata_to_annex_b(payload)?;
                meta.extra_data = annex_b;
                meta.length_size = Some(length_size);
            }
            b"hvcC" => {
                let (annex_b, length_size) = h265::hvcc_extradata_to_annex_b(payload)?;
                meta.extra_data = annex_b;
                meta.length_size = Some(length_size);
            }
            b"esds" => apply_esds(
                payload,
                MediaType::Video,
                &mut meta.codec_id,
                &mut meta.extra_data,
            ),
            b"av1C" | b"vpcC" => meta.extra_data = payload.to_vec(),
            _ => {}
        }
    }
    Ok(MetaData::Video(meta))
}

fn parse_audio(codec_id: CodecId, r: &mut ByteReader<'_>) -> AvResult<MetaData> {
    let version = r.read_u16()?;
    r.skip(6)?; // revision + vendor
    let mut channel_count = r.read_u16()?;
    let mut sample_bit = r.read_u16()?;
    r.skip(4)?; // compression_id + packet_size
    let mut sample_rate = r.read_u32()? >> 16;

    match version {
        // QuickTime 声音描述 v1: samples_per_packet 等 4 个字段
        1 => r.skip(16)?,
        // QuickTime 声音描述 v2: 采样率与声道数移到扩展字段
        2 => {
            r.skip(4)?; // sizeOfStructOnly
            sample_rate = r.read_f64()? as u32;
            channel_count = u16::try_from(r.read_u32()?).unwrap_or(u16::MAX);
            r.skip(4)?; // always7F000000
            sample_bit = u16::try_from(r.read_u32()?).unwrap_or(u16::MAX);
            r.skip(12)?; // formatSpecificFlags + 每包字节数 + 每包帧数
        }
        _ => {}
    }

    let mut meta = AudioMetaData {
        codec_id,
        sample_rate,
        sample_bit,
        channel_count,
        extra_data: Vec::new(),
    };
    for (fourcc, payload) in child_boxes(r.rest()) {
        match fourcc.as_bytes() {
            b"esds" => apply_esds(
                payload,
                MediaType::Audio,
                &mut meta.codec_id,
                &mut meta.extra_data,
            ),
            // QuickTime 把 esds 放在 wave 里
            b"wave" => {
                for (inner, inner_payload) in child_boxes(payload) {
                    if inner.as_bytes() == b"esds" {
                        apply_esds(
                            inner_payload,
                            MediaType::Audio,
                            &mut meta.codec_id,
                            &mut meta.extra_data,
                        );
                    }
                }
            }
            b"dOps" => meta.extra_data = payload.to_vec(),
            b"dfLa" | b"alac" => meta.extra_data = strip_full_box(payload).to_vec(),
            _ => {}
        }
    }
    Ok(MetaData::Audio(meta))
}
