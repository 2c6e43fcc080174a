//! 编解码器标识符.
//!
//! 为每种编解码算法分配唯一标识, 与容器格式无关.

use std::fmt;

use avkit_core::MediaType;

/// 编解码器标识符
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum CodecId {
    // ========================
    // 视频编解码器
    // ========================
    /// H.264 / AVC
    H264,
    /// H.265 / HEVC
    H265,
    /// VP8
    Vp8,
    /// VP9
    Vp9,
    /// AV1
    Av1,
    /// MPEG-1 Video
    Mpeg1Video,
    /// MPEG-2 Video
    Mpeg2Video,
    /// MPEG-4 Part 2
    Mpeg4,
    /// H.263
    H263,
    /// Motion JPEG
    Mjpeg,
    /// Apple ProRes
    ProRes,
    /// PNG
    Png,
    /// Raw 视频 (未压缩)
    RawVideo,

    // ========================
    // 音频编解码器
    // ========================
    /// AAC
    Aac,
    /// MP3
    Mp3,
    /// MP2
    Mp2,
    /// Opus
    Opus,
    /// FLAC
    Flac,
    /// Apple Lossless
    Alac,
    /// AC-3
    Ac3,
    /// E-AC-3
    Eac3,
    /// DTS
    Dts,
    /// AMR 窄带
    AmrNb,
    /// AMR 宽带
    AmrWb,
    /// PCM 有符号 16 位大端
    PcmS16be,
    /// PCM 有符号 16 位小端
    PcmS16le,
    /// PCM 有符号 24 位大端
    PcmS24be,
    /// PCM 有符号 32 位大端
    PcmS32be,
    /// PCM 32 位浮点大端
    PcmF32be,
    /// PCM 64 位浮点大端
    PcmF64be,
    /// G.711 A-law
    PcmAlaw,
    /// G.711 μ-law
    PcmMulaw,

    // ========================
    // 字幕编解码器
    // ========================
    /// 3GPP Timed Text (tx3g / text)
    MovText,
    /// CEA-608 隐藏式字幕
    Eia608,

    // ========================
    // 数据
    // ========================
    /// 不透明二进制数据 (如 GoPro gpmd)
    BinData,
}

impl CodecId {
    /// 获取编解码器对应的媒体类型
    pub const fn media_type(&self) -> MediaType {
        match self {
            Self::H264
            | Self::H265
            | Self::Vp8
            | Self::Vp9
            | Self::Av1
            | Self::Mpeg1Video
            | Self::Mpeg2Video
            | Self::Mpeg4
            | Self::H263
            | Self::Mjpeg
            | Self::ProRes
            | Self::Png
            | Self::RawVideo => MediaType::Video,

            Self::Aac
            | Self::Mp3
            | Self::Mp2
            | Self::Opus
            | Self::Flac
            | Self::Alac
            | Self::Ac3
            | Self::Eac3
            | Self::Dts
            | Self::AmrNb
            | Self::AmrWb
            | Self::PcmS16be
            | Self::PcmS16le
            | Self::PcmS24be
            | Self::PcmS32be
            | Self::PcmF32be
            | Self::PcmF64be
            | Self::PcmAlaw
            | Self::PcmMulaw => MediaType::Audio,

            Self::MovText | Self::Eia608 => MediaType::Subtitle,

            Self::BinData => MediaType::Data,
        }
    }

    /// 获取编解码器的人类可读名称
    pub const fn name(&self) -> &'static str {
        match self {
            Self::H264 => "h264",
            Self::H265 => "hevc",
            Self::Vp8 => "vp8",
            Self::Vp9 => "vp9",
            Self::Av1 => "av1",
            Self::Mpeg1Video => "mpeg1video",
            Self::Mpeg2Video => "mpeg2video",
            Self::Mpeg4 => "mpeg4",
            Self::H263 => "h263",
            Self::Mjpeg => "mjpeg",
            Self::ProRes => "prores",
            Self::Png => "png",
            Self::RawVideo => "rawvideo",
            Self::Aac => "aac",
            Self::Mp3 => "mp3",
            Self::Mp2 => "mp2",
            Self::Opus => "opus",
            Self::Flac => "flac",
            Self::Alac => "alac",
            Self::Ac3 => "ac3",
            Self::Eac3 => "eac3",
            Self::Dts => "dts",
            Self::AmrNb => "amr_nb",
            Self::AmrWb => "amr_wb",
            Self::PcmS16be => "pcm_s16be",
            Self::PcmS16le => "pcm_s16le",
            Self::PcmS24be => "pcm_s24be",
            Self::PcmS32be => "pcm_s32be",
            Self::PcmF32be => "pcm_f32be",
            Self::PcmF64be => "pcm_f64be",
            Self::PcmAlaw => "pcm_alaw",
            Self::PcmMulaw => "pcm_mulaw",
            Self::MovText => "mov_text",
            Self::Eia608 => "eia_608",
            Self::BinData => "bin_data",
        }
    }
}

impl fmt::Display for CodecId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}
