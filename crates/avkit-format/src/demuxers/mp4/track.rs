//! MP4 轨道: 解析期间的表累积与构建完成的轨道.
//!
//! 遍历 `trak` 子树时, 各表解析结果写入 [`TrackBuilder`], 同时在 [`TableMark`]
//! 中记录已出现的表. 整棵树遍历结束后, [`TrackBuilder::build`] 校验必需表并展开
//! 采样索引, 得到只读的 [`Track`].

use avkit_codec::CodecId;
use avkit_core::{AvError, AvResult, MediaType, MissingTable};
use bitflags::bitflags;

use super::boxes::{ElstBox, FourCc, HdlrBox, MdhdBox, TkhdBox};
use super::sample_table::{
    CttsEntry, IndexTables, SampleSizes, StscEntry, SttsEntry, build_sample_index,
};
use super::stsd::SampleDescription;

bitflags! {
    /// 轨道中已出现的表
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct TableMark: u16 {
        const STSD = 1 << 0;
        const STTS = 1 << 1;
        const STSC = 1 << 2;
        /// stco 或 co64
        const STCO = 1 << 3;
        /// stsz 或 stz2
        const STSZ = 1 << 4;
        const MDHD = 1 << 5;
        const STSS = 1 << 6;
        const CTTS = 1 << 7;
        const ELST = 1 << 8;

        /// 构建索引所必需的表
        const REQUIRED = Self::STSD.bits()
            | Self::STTS.bits()
            | Self::STSC.bits()
            | Self::STCO.bits()
            | Self::STSZ.bits()
            | Self::MDHD.bits();
    }
}

/// 必需表的检查顺序
const REQUIRED_TABLES: [(TableMark, MissingTable); 6] = [
    (TableMark::STSD, MissingTable::SampleDescription),
    (TableMark::STTS, MissingTable::TimeToSample),
    (TableMark::STSC, MissingTable::SampleToChunk),
    (TableMark::STCO, MissingTable::ChunkOffset),
    (TableMark::STSZ, MissingTable::SampleSize),
    (TableMark::MDHD, MissingTable::MediaHeader),
];

// ========================
// 元数据
// ========================

/// 视频轨道元数据
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoMetaData {
    pub codec_id: CodecId,
    pub width: u16,
    pub height: u16,
    /// 解码器配置; H.264/H.265 为 Annex B 格式的参数集
    pub extra_data: Vec<u8>,
    /// H.264/H.265 采样中 NAL 长度前缀的字节数
    pub length_size: Option<usize>,
}

/// 音频轨道元数据
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioMetaData {
    pub codec_id: CodecId,
    /// 采样率 (Hz, 只保留整数部分)
    pub sample_rate: u32,
    /// 采样位深
    pub sample_bit: u16,
    pub channel_count: u16,
    pub extra_data: Vec<u8>,
}

/// 字幕轨道元数据
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubtitleMetaData {
    pub codec_id: CodecId,
    pub extra_data: Vec<u8>,
}

/// 定时元数据轨道
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataMetaData {
    pub codec_id: CodecId,
    pub extra_data: Vec<u8>,
}

/// 轨道元数据, 由第一个采样描述条目得到
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MetaData {
    Video(VideoMetaData),
    Audio(AudioMetaData),
    Subtitle(SubtitleMetaData),
    Data(DataMetaData),
}

impl MetaData {
    pub fn media_type(&self) -> MediaType {
        match self {
            Self::Video(_) => MediaType::Video,
            Self::Audio(_) => MediaType::Audio,
            Self::Subtitle(_) => MediaType::Subtitle,
            Self::Data(_) => MediaType::Data,
        }
    }

    pub fn codec_id(&self) -> CodecId {
        match self {
            Self::Video(v) => v.codec_id,
            Self::Audio(a) => a.codec_id,
            Self::Subtitle(s) => s.codec_id,
            Self::Data(d) => d.codec_id,
        }
    }

    pub fn extra_data(&self) -> &[u8] {
        match self {
            Self::Video(v) => &v.extra_data,
            Self::Audio(a) => &a.extra_data,
            Self::Subtitle(s) => &s.extra_data,
            Self::Data(d) => &d.extra_data,
        }
    }
}

// ========================
// 采样索引
// ========================

/// 单个采样的索引条目
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SampleIndexEntry {
    /// 文件绝对偏移
    pub pos: u64,
    /// 解码时间戳 (媒体时间刻度)
    pub timestamp: i64,
    /// 合成时间偏移, 没有 ctts 时为 0
    pub cts_offset: i64,
    pub size: u32,
    pub key_frame: bool,
}

impl SampleIndexEntry {
    /// 显示时间戳
    pub fn pts(&self) -> i64 {
        self.timestamp.saturating_add(self.cts_offset)
    }
}

// ========================
// 轨道构建器
// ========================

/// 解析 `trak` 子树期间累积的轨道状态
#[derive(Debug, Default)]
pub struct TrackBuilder {
    index: usize,
    tkhd: Option<TkhdBox>,
    mdhd: Option<MdhdBox>,
    hdlr: Option<HdlrBox>,
    elst: Option<ElstBox>,
    stsd: Option<SampleDescription>,
    stts: Vec<SttsEntry>,
    ctts: Vec<CttsEntry>,
    stsc: Vec<StscEntry>,
    chunk_offsets: Vec<u64>,
    sizes: SampleSizes,
    sync_samples: Vec<u32>,
    mark: TableMark,
}

impl TrackBuilder {
    pub fn new(index: usize) -> Self {
        Self {
            index,
            ..Default::default()
        }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn mark(&self) -> TableMark {
        self.mark
    }

    fn set_mark(&mut self, bit: TableMark, name: &str) {
        if self.mark.contains(bit) {
            log::warn!("MP4: 轨道 #{} 出现重复的 {name}, 使用后出现的", self.index);
        }
        self.mark |= bit;
    }

    pub fn set_tkhd(&mut self, tkhd: TkhdBox) {
        self.tkhd = Some(tkhd);
    }

    pub fn set_mdhd(&mut self, mdhd: MdhdBox) {
        self.set_mark(TableMark::MDHD, "mdhd");
        self.mdhd = Some(mdhd);
    }

    /// 设置媒体处理器; QuickTime 的数据处理器 (minf 内) 不代表轨道类型, 忽略
    pub fn set_hdlr(&mut self, hdlr: HdlrBox) {
        if !hdlr.is_data_handler() {
            self.hdlr = Some(hdlr);
        }
    }

    pub fn set_elst(&mut self, elst: ElstBox) {
        self.set_mark(TableMark::ELST, "elst");
        self.elst = Some(elst);
    }

    pub fn set_sample_description(&mut self, stsd: SampleDescription) {
        self.set_mark(TableMark::STSD, "stsd");
        self.stsd = Some(stsd);
    }

    pub fn set_stts(&mut self, stts: Vec<SttsEntry>) {
        self.set_mark(TableMark::STTS, "stts");
        self.stts = stts;
    }

    pub fn set_ctts(&mut self, ctts: Vec<CttsEntry>) {
        self.set_mark(TableMark::CTTS, "ctts");
        self.ctts = ctts;
    }

    pub fn set_stsc(&mut self, stsc: Vec<StscEntry>) {
        self.set_mark(TableMark::STSC, "stsc");
        self.stsc = stsc;
    }

    pub fn set_chunk_offsets(&mut self, offsets: Vec<u64>) {
        self.set_mark(TableMark::STCO, "stco/co64");
        self.chunk_offsets = offsets;
    }

    pub fn set_sample_sizes(&mut self, sizes: SampleSizes) {
        self.set_mark(TableMark::STSZ, "stsz/stz2");
        self.sizes = sizes;
    }

    /// 设置同步采样表, 排序去重后保存
    pub fn set_sync_samples(&mut self, mut samples: Vec<u32>) {
        self.set_mark(TableMark::STSS, "stss");
        samples.sort_unstable();
        samples.dedup();
        self.sync_samples = samples;
    }

    /// 校验必需表并展开采样索引
    ///
    /// `data_len` 为输入总长度, 超出它的采样视为无效数据.
    pub fn build(self, data_len: u64) -> AvResult<Track> {
        for (bit, table) in REQUIRED_TABLES {
            if !self.mark.contains(bit) {
                return Err(AvError::IncompleteTrack {
                    track: self.index,
                    table,
                });
            }
        }
        let (Some(stsd), Some(mdhd)) = (self.stsd, self.mdhd) else {
            return Err(AvError::IncompleteTrack {
                track: self.index,
                table: MissingTable::SampleDescription,
            });
        };

        let samples = build_sample_index(&IndexTables {
            stts: &self.stts,
            ctts: self
                .mark
                .contains(TableMark::CTTS)
                .then_some(self.ctts.as_slice()),
            stsc: &self.stsc,
            chunk_offsets: &self.chunk_offsets,
            sizes: &self.sizes,
            sync_samples: self
                .mark
                .contains(TableMark::STSS)
                .then_some(self.sync_samples.as_slice()),
            data_len,
        })
        .map_err(|e| match e {
            AvError::InvalidData(msg) => {
                AvError::InvalidData(format!("轨道 #{}: {msg}", self.index))
            }
            other => other,
        })?;

        let meta_data = stsd.meta_data().cloned().ok_or_else(|| {
            AvError::InvalidData(format!("轨道 #{}: stsd 中没有采样描述条目", self.index))
        })?;
        log::debug!(
            "MP4: 轨道 #{} {} {}, {} 个采样, {} 个块",
            self.index,
            meta_data.media_type(),
            meta_data.codec_id(),
            samples.len(),
            self.chunk_offsets.len(),
        );

        Ok(Track {
            index: self.index,
            track_id: self.tkhd.as_ref().map_or(0, |t| t.track_id),
            tkhd: self.tkhd,
            handler_type: self.hdlr.map(|h| h.handler_type),
            meta_data,
            sample_description: stsd,
            mdhd,
            edit_list: self.elst,
            stts: self.stts,
            ctts: self.ctts,
            stsc: self.stsc,
            chunk_offsets: self.chunk_offsets,
            sizes: self.sizes,
            sync_samples: self.sync_samples,
            mark: self.mark,
            samples,
            current_sample: 0,
        })
    }
}

// ========================
// 轨道
// ========================

/// 构建完成的轨道
#[derive(Debug, Clone)]
pub struct Track {
    index: usize,
    track_id: u32,
    tkhd: Option<TkhdBox>,
    handler_type: Option<FourCc>,
    meta_data: MetaData,
    sample_description: SampleDescription,
    mdhd: MdhdBox,
    edit_list: Option<ElstBox>,
    stts: Vec<SttsEntry>,
    ctts: Vec<CttsEntry>,
    stsc: Vec<StscEntry>,
    chunk_offsets: Vec<u64>,
    sizes: SampleSizes,
    sync_samples: Vec<u32>,
    mark: TableMark,
    samples: Vec<SampleIndexEntry>,
    current_sample: usize,
}

impl Track {
    /// 轨道序号 (按 trak 出现顺序, 从 0 开始)
    pub fn index(&self) -> usize {
        self.index
    }

    /// tkhd 中的 track_ID, 缺少 tkhd 时为 0
    pub fn track_id(&self) -> u32 {
        self.track_id
    }

    pub fn tkhd(&self) -> Option<&TkhdBox> {
        self.tkhd.as_ref()
    }

    pub fn handler_type(&self) -> Option<FourCc> {
        self.handler_type
    }

    pub fn meta_data(&self) -> &MetaData {
        &self.meta_data
    }

    pub fn media_type(&self) -> MediaType {
        self.meta_data.media_type()
    }

    pub fn codec_id(&self) -> CodecId {
        self.meta_data.codec_id()
    }

    pub fn sample_description(&self) -> &SampleDescription {
        &self.sample_description
    }

    /// 媒体时间刻度
    pub fn timescale(&self) -> u32 {
        self.mdhd.timescale
    }

    /// 媒体时长 (媒体时间刻度)
    pub fn duration(&self) -> u64 {
        self.mdhd.duration
    }

    pub fn language(&self) -> &str {
        &self.mdhd.language
    }

    pub fn edit_list(&self) -> Option<&ElstBox> {
        self.edit_list.as_ref()
    }

    pub fn stts(&self) -> &[SttsEntry] {
        &self.stts
    }

    pub fn ctts(&self) -> &[CttsEntry] {
        &self.ctts
    }

    pub fn stsc(&self) -> &[StscEntry] {
        &self.stsc
    }

    pub fn chunk_offsets(&self) -> &[u64] {
        &self.chunk_offsets
    }

    pub fn sample_sizes(&self) -> &SampleSizes {
        &self.sizes
    }

    /// 同步采样编号 (1-based, 升序), 没有 stss 时为空
    pub fn sync_samples(&self) -> &[u32] {
        &self.sync_samples
    }

    pub fn mark(&self) -> TableMark {
        self.mark
    }

    pub fn chunk_count(&self) -> usize {
        self.chunk_offsets.len()
    }

    pub fn sample_count(&self) -> usize {
        self.samples.len()
    }

    pub fn samples(&self) -> &[SampleIndexEntry] {
        &self.samples
    }

    /// 下一个待读取的采样序号
    pub fn current_sample(&self) -> usize {
        self.current_sample
    }

    /// 下一个待读取的采样
    pub fn peek_sample(&self) -> Option<&SampleIndexEntry> {
        self.samples.get(self.current_sample)
    }

    pub(crate) fn advance(&mut self) {
        self.current_sample += 1;
    }
}
