//! 格式探测.
//!
//! ISOBMFF 没有固定魔数, 只能看文件开头第一个 Box 的类型:
//! `ftyp` 几乎可以确定, 其他常见顶层 Box 只能说明可能是, 最后才退回扩展名.

use crate::format_id::FormatId;

/// 探测置信度, 越高越确定
pub type ProbeScore = u32;

/// 只有扩展名匹配
pub const SCORE_EXTENSION: ProbeScore = 50;

/// 首个 Box 是 moov/mdat/free 等常见顶层类型, 但没有 ftyp
pub const SCORE_TOP_LEVEL_BOX: ProbeScore = 75;

/// 首个 Box 是 ftyp
pub const SCORE_MAX: ProbeScore = 100;

/// 没有 ftyp 的老式文件可能以这些 Box 开头
const TOP_LEVEL_TYPES: [&[u8; 4]; 5] = [b"moov", b"mdat", b"free", b"skip", b"wide"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProbeResult {
    pub format_id: FormatId,
    pub score: ProbeScore,
}

/// 探测器 trait
pub trait FormatProbe {
    /// 根据文件开头的若干字节和可选的文件名打分, `None` 表示不是此格式
    fn probe(&self, data: &[u8], filename: Option<&str>) -> Option<ProbeScore>;

    fn format_id(&self) -> FormatId;
}

/// 文件开头第一个 Box 的类型码
///
/// 只看头部的 8 字节, 不校验声明的大小.
pub fn first_box_type(data: &[u8]) -> Option<[u8; 4]> {
    let tag = data.get(4..8)?;
    Some([tag[0], tag[1], tag[2], tag[3]])
}

/// 按首个 Box 的类型打分
pub fn score_first_box(data: &[u8]) -> Option<ProbeScore> {
    let tag = first_box_type(data)?;
    if &tag == b"ftyp" {
        Some(SCORE_MAX)
    } else if TOP_LEVEL_TYPES.contains(&&tag) {
        Some(SCORE_TOP_LEVEL_BOX)
    } else {
        None
    }
}
