//! MP4/MOV (ISO Base Media File Format) 解封装器.
//!
//! 支持 MP4 (MPEG-4 Part 14) 和 QuickTime MOV 格式.
//! 基于 ISO 14496-12 (ISOBMFF) 标准, 不支持分片 MP4 (moof) 与加密.
//!
//! # Box 树结构
//! ```text
//! ftyp                  文件类型
//! moov                  影片元数据
//! ├── mvhd              影片头部 (时长, 时间刻度)
//! └── trak              轨道 (每个音/视频流一个)
//!     ├── tkhd          轨道头部
//!     ├── edts/elst     编辑列表
//!     └── mdia          媒体信息
//!         ├── mdhd      媒体头部 (时间刻度, 时长)
//!         ├── hdlr      处理器引用 (vide/soun)
//!         └── minf      媒体详细信息
//!             └── stbl  采样表
//!                 ├── stsd  采样描述 (编解码器参数)
//!                 ├── stts  时间→采样映射
//!                 ├── ctts  合成时间偏移
//!                 ├── stsc  采样→块映射
//!                 ├── stsz  采样大小
//!                 ├── stco  块偏移 (32位)
//!                 ├── co64  块偏移 (64位)
//!                 └── stss  同步采样 (关键帧)
//! mdat                  媒体数据
//! ```
//!
//! 打开时一次性读入整个文件构建 Box 树与采样索引, 之后每次 [`Mp4Demuxer::read`]
//! 在所有轨道中选出文件位置最小的下一个采样, 定位读取并交给回调.

pub mod boxes;
pub mod esds;
pub mod framer;
mod parse;
pub mod sample_table;
pub mod stsd;
pub mod track;
mod tree;

use std::fmt;
use std::path::Path;

use avkit_core::{AvError, AvResult, MediaType};
use serde::{Deserialize, Serialize};

use crate::demuxer::{Demuxer, SampleHandler};
use crate::format_id::FormatId;
use crate::io::IoContext;
use crate::probe::{FormatProbe, ProbeScore, SCORE_EXTENSION, score_first_box};

use self::boxes::{BoxData, FourCc, FtypBox, Mp4Box};
use self::track::Track;
use self::tree::TreeBuilder;

/// 未知 Box 的处理策略
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnknownBoxPolicy {
    /// 跳过并记录警告
    #[default]
    Skip,
    /// 视为无效数据
    Fail,
}

/// MP4 解封装选项
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Mp4DemuxOptions {
    pub unknown_box_policy: UnknownBoxPolicy,
}

/// 打开过程中被容忍的问题
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseWarning {
    /// 出问题的 Box 的文件偏移
    pub offset: u64,
    pub fourcc: FourCc,
    pub message: String,
}

impl fmt::Display for ParseWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "'{}' @{}: {}", self.fourcc, self.offset, self.message)
    }
}

/// 一次成功打开的结果
struct DemuxContext {
    root: Mp4Box,
    tracks: Vec<Track>,
    io: IoContext,
    format_id: FormatId,
}

/// MP4 解封装器
pub struct Mp4Demuxer {
    options: Mp4DemuxOptions,
    handler: SampleHandler,
    context: Option<DemuxContext>,
    warnings: Vec<ParseWarning>,
    /// 复用的采样读取缓冲区
    sample_buffer: Vec<u8>,
}

impl Mp4Demuxer {
    pub fn new(handler: SampleHandler) -> Self {
        Self::with_options(handler, Mp4DemuxOptions::default())
    }

    pub fn with_options(handler: SampleHandler, options: Mp4DemuxOptions) -> Self {
        Self {
            options,
            handler,
            context: None,
            warnings: Vec::new(),
            sample_buffer: Vec::new(),
        }
    }

    /// 创建 MP4 解封装器实例 (工厂函数)
    pub fn create(handler: SampleHandler) -> Box<dyn Demuxer> {
        Box::new(Self::new(handler))
    }

    pub fn options(&self) -> &Mp4DemuxOptions {
        &self.options
    }

    /// 打开文件
    pub fn open(&mut self, path: impl AsRef<Path>) -> AvResult<()> {
        let path = path.as_ref();
        log::debug!("MP4: 打开 {}", path.display());
        self.open_io(IoContext::open_read(path)?)
    }

    /// 从 I/O 上下文打开
    ///
    /// 失败时之前打开的内容保持不变.
    pub fn open_io(&mut self, mut io: IoContext) -> AvResult<()> {
        let data = io.read_all()?;
        let data_len = data.len() as u64;
        let tree = TreeBuilder::new(self.options.unknown_box_policy).build(&data)?;
        drop(data);

        let tracks = tree
            .tracks
            .into_iter()
            .map(|builder| builder.build(data_len))
            .collect::<AvResult<Vec<_>>>()?;
        if tracks.is_empty() {
            return Err(AvError::InvalidData("MP4 文件中未找到任何轨道".into()));
        }

        let format_id = match tree.root.child(b"ftyp").map(|b| &b.data) {
            Some(BoxData::Ftyp(ftyp)) if ftyp.major_brand.as_bytes() == b"qt  " => FormatId::Mov,
            _ => FormatId::Mp4,
        };
        log::debug!(
            "MP4: 打开完成, 格式 {format_id}, {} 个轨道, {} 个 box, {} 条警告",
            tracks.len(),
            tree.root.descendant_count(),
            tree.warnings.len(),
        );

        self.context = Some(DemuxContext {
            root: tree.root,
            tracks,
            io,
            format_id,
        });
        self.warnings = tree.warnings;
        Ok(())
    }

    /// 读取下一个采样并交给回调
    ///
    /// 所有轨道的采样都读完后返回 `Err(AvError::Eof)`.
    pub fn read(&mut self) -> AvResult<()> {
        let ctx = self
            .context
            .as_mut()
            .ok_or_else(|| AvError::InvalidArgument("MP4: 尚未打开文件".into()))?;

        // 文件位置最小的下一个采样, 位置相同时取序号小的轨道
        let next = ctx
            .tracks
            .iter_mut()
            .filter_map(|t| {
                let sample = *t.peek_sample()?;
                Some((sample, t))
            })
            .min_by_key(|(sample, _)| sample.pos);
        let Some((sample, track)) = next else {
            return Err(AvError::Eof);
        };

        // 打开时已保证采样落在输入范围内
        let size = sample.size as usize;
        if self.sample_buffer.len() < size {
            self.sample_buffer.resize(size, 0);
        }
        let buf = &mut self.sample_buffer[..size];

        ctx.io.seek_to(sample.pos)?;
        ctx.io.read_exact(buf).map_err(|e| match e {
            AvError::Eof => AvError::InvalidData(format!(
                "轨道 #{} 采样 #{} (偏移 {}, {} 字节) 超出文件末尾",
                track.index(),
                track.current_sample(),
                sample.pos,
                size
            )),
            other => other,
        })?;

        (self.handler)(
            buf,
            sample.pts(),
            sample.timestamp,
            track.media_type(),
            track.codec_id(),
        );
        track.advance();
        Ok(())
    }

    pub fn track_count(&self) -> usize {
        self.tracks().len()
    }

    pub fn tracks(&self) -> &[Track] {
        self.context.as_ref().map_or(&[], |c| c.tracks.as_slice())
    }

    /// 指定媒体类型的全部轨道
    pub fn find_track(&self, media_type: MediaType) -> Vec<&Track> {
        self.tracks()
            .iter()
            .filter(|t| t.media_type() == media_type)
            .collect()
    }

    /// Box 树的虚拟根节点
    pub fn root(&self) -> Option<&Mp4Box> {
        self.context.as_ref().map(|c| &c.root)
    }

    pub fn ftyp(&self) -> Option<&FtypBox> {
        match self.root()?.child(b"ftyp").map(|b| &b.data) {
            Some(BoxData::Ftyp(ftyp)) => Some(ftyp),
            _ => None,
        }
    }

    /// 最近一次成功打开时被容忍的问题
    pub fn warnings(&self) -> &[ParseWarning] {
        &self.warnings
    }
}

impl Demuxer for Mp4Demuxer {
    fn format_id(&self) -> FormatId {
        self.context.as_ref().map_or(FormatId::Mp4, |c| c.format_id)
    }

    fn name(&self) -> &str {
        "mp4"
    }

    fn open(&mut self, io: IoContext) -> AvResult<()> {
        self.open_io(io)
    }

    fn read(&mut self) -> AvResult<()> {
        Mp4Demuxer::read(self)
    }

    fn track_count(&self) -> usize {
        Mp4Demuxer::track_count(self)
    }
}

/// MP4 格式探测器
pub struct Mp4Probe;

impl FormatProbe for Mp4Probe {
    fn probe(&self, data: &[u8], filename: Option<&str>) -> Option<ProbeScore> {
        score_first_box(data)
            .or_else(|| FormatId::from_filename(filename?).map(|_| SCORE_EXTENSION))
    }

    fn format_id(&self) -> FormatId {
        FormatId::Mp4
    }
}
