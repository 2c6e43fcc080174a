//! 容器格式标识符.

use std::fmt;

/// 容器格式标识符
///
/// MP4 与 QuickTime MOV 共用同一套 Box 结构, 由同一个解封装器处理,
/// 打开后按 ftyp 主品牌区分.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum FormatId {
    /// MPEG-4 Part 14 (MP4/M4A/M4V/3GP)
    Mp4,
    /// QuickTime File Format (MOV)
    Mov,
}

impl FormatId {
    /// 所有已知格式标识的列表
    pub const ALL: &[FormatId] = &[Self::Mp4, Self::Mov];

    /// 获取格式名称
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Mp4 => "mp4",
            Self::Mov => "mov",
        }
    }

    /// 获取格式常用的文件扩展名
    pub const fn extensions(&self) -> &'static [&'static str] {
        match self {
            Self::Mp4 => &["mp4", "m4a", "m4v", "3gp", "3g2"],
            Self::Mov => &["mov", "qt"],
        }
    }

    /// 根据文件扩展名猜测格式
    ///
    /// # 参数
    /// - `ext`: 文件扩展名 (不含 `.`, 如 "mp4", "mov")
    pub fn from_extension(ext: &str) -> Option<FormatId> {
        let ext_lower = ext.to_lowercase();
        Self::ALL
            .iter()
            .find(|id| id.extensions().contains(&ext_lower.as_str()))
            .copied()
    }

    /// 从文件路径猜测格式
    pub fn from_filename(filename: &str) -> Option<FormatId> {
        let (_, ext) = filename.rsplit_once('.')?;
        Self::from_extension(ext)
    }
}

impl fmt::Display for FormatId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}
