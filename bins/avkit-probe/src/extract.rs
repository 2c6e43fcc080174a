//! 基本流导出.
//!
//! 每种编解码器取第一个轨道, 导出为可直接播放的裸流:
//! H.264/H.265 转为 Annex B, AAC 补 ADTS 头, 其余按原样拼接.

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use avkit_codec::CodecId;
use avkit_codec::aac::AudioSpecificConfig;
use avkit_codec::parsers::{h264, h265};
use avkit_format::demuxers::mp4::track::{MetaData, Track};

/// 采样转换方式
enum Conversion {
    AnnexB { codec: CodecId, length_size: usize },
    Adts(AudioSpecificConfig),
    Raw,
}

struct Output {
    path: PathBuf,
    writer: BufWriter<File>,
    conversion: Conversion,
    extra_data: Vec<u8>,
    samples: u64,
}

/// 按编解码器分发采样到导出文件
pub struct Extractor {
    outputs: HashMap<CodecId, Output>,
}

fn file_extension(codec: CodecId) -> &'static str {
    match codec {
        CodecId::H264 => "h264",
        CodecId::H265 => "h265",
        CodecId::Aac => "aac",
        CodecId::Mp3 => "mp3",
        CodecId::Ac3 => "ac3",
        CodecId::Eac3 => "eac3",
        _ => "bin",
    }
}

fn conversion_for(meta: &MetaData) -> Result<Conversion> {
    let conversion = match meta {
        MetaData::Video(video) if matches!(video.codec_id, CodecId::H264 | CodecId::H265) => {
            let length_size = video
                .length_size
                .with_context(|| format!("{} 轨道缺少 NAL 长度前缀大小", video.codec_id))?;
            Conversion::AnnexB {
                codec: video.codec_id,
                length_size,
            }
        }
        MetaData::Audio(audio) if audio.codec_id == CodecId::Aac => {
            let config = AudioSpecificConfig::parse(&audio.extra_data)
                .context("解析 AAC AudioSpecificConfig 失败")?;
            Conversion::Adts(config)
        }
        _ => Conversion::Raw,
    };
    Ok(conversion)
}

impl Extractor {
    /// 为每种编解码器的第一个轨道创建输出文件
    pub fn create(dir: &Path, stem: &str, tracks: &[Track]) -> Result<Self> {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("创建导出目录失败, path={}", dir.display()))?;

        let mut outputs = HashMap::new();
        for track in tracks {
            let codec = track.codec_id();
            if outputs.contains_key(&codec) {
                log::warn!("轨道 #{} 与之前的轨道编解码器相同 ({codec}), 不导出", track.index());
                continue;
            }
            let conversion = match conversion_for(track.meta_data()) {
                Ok(conversion) => conversion,
                Err(err) => {
                    log::warn!("轨道 #{} 无法导出: {err:#}", track.index());
                    continue;
                }
            };
            let path = dir.join(format!(
                "{stem}.{}.{}",
                track.media_type().as_str(),
                file_extension(codec)
            ));
            let file = File::create(&path)
                .with_context(|| format!("创建导出文件失败, path={}", path.display()))?;
            outputs.insert(
                codec,
                Output {
                    path,
                    writer: BufWriter::new(file),
                    conversion,
                    extra_data: track.meta_data().extra_data().to_vec(),
                    samples: 0,
                },
            );
        }
        Ok(Self { outputs })
    }

    /// 写入一个采样, 没有对应输出的编解码器直接忽略
    pub fn write_sample(&mut self, codec: CodecId, data: &[u8]) -> Result<()> {
        let Some(output) = self.outputs.get_mut(&codec) else {
            return Ok(());
        };
        match &output.conversion {
            Conversion::AnnexB { codec, length_size } => {
                let annex_b = match codec {
                    CodecId::H264 => h264::avcc_to_annex_b(data, *length_size, &output.extra_data)?,
                    CodecId::H265 => h265::hvcc_to_annex_b(data, *length_size, &output.extra_data)?,
                    other => bail!("{other} 不支持 Annex B 转换"),
                };
                output.writer.write_all(&annex_b)?;
            }
            Conversion::Adts(config) => {
                output.writer.write_all(&config.adts_header(data.len())?)?;
                output.writer.write_all(data)?;
            }
            Conversion::Raw => output.writer.write_all(data)?,
        }
        output.samples += 1;
        Ok(())
    }

    /// 刷新所有输出, 返回 (文件路径, 采样数)
    pub fn finish(self) -> Result<Vec<(PathBuf, u64)>> {
        let mut written = Vec::with_capacity(self.outputs.len());
        for (_, mut output) in self.outputs {
            output
                .writer
                .flush()
                .with_context(|| format!("写入导出文件失败, path={}", output.path.display()))?;
            written.push((output.path, output.samples));
        }
        written.sort();
        Ok(written)
    }
}
