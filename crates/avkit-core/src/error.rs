//! 统一错误类型定义.
//!
//! 所有 avkit crate 共用的错误类型, 支持跨模块传播.

use std::fmt;

use thiserror::Error;

/// 构建采样索引所必需的表
///
/// 轨道缺少其中任何一个时, 索引无法构建.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissingTable {
    /// 采样描述表 (stsd)
    SampleDescription,
    /// 时间-采样表 (stts)
    TimeToSample,
    /// 采样-块映射表 (stsc)
    SampleToChunk,
    /// 块偏移表 (stco/co64)
    ChunkOffset,
    /// 采样大小表 (stsz/stz2)
    SampleSize,
    /// 媒体头 (mdhd)
    MediaHeader,
}

impl fmt::Display for MissingTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::SampleDescription => "采样描述表 (stsd)",
            Self::TimeToSample => "时间-采样表 (stts)",
            Self::SampleToChunk => "采样-块映射表 (stsc)",
            Self::ChunkOffset => "块偏移表 (stco/co64)",
            Self::SampleSize => "采样大小表 (stsz/stz2)",
            Self::MediaHeader => "媒体头 (mdhd)",
        };
        write!(f, "{name}")
    }
}

/// avkit 统一错误类型
#[derive(Debug, Error)]
pub enum AvError {
    /// 无效参数
    #[error("无效参数: {0}")]
    InvalidArgument(String),

    /// 不支持的操作
    #[error("不支持的操作: {0}")]
    Unsupported(String),

    /// I/O 错误
    #[error("I/O 错误: {0}")]
    Io(#[from] std::io::Error),

    /// 数据不足, 声明的长度超出了可用字节
    #[error("数据不足, 需要更多输入")]
    NeedMoreData,

    /// 已到达流末尾
    #[error("已到达流末尾")]
    Eof,

    /// 无效数据 (损坏的码流等)
    #[error("无效数据: {0}")]
    InvalidData(String),

    /// 轨道缺少必需的索引表
    #[error("轨道不完整: 轨道 #{track} 缺少{table}")]
    IncompleteTrack {
        /// 轨道序号 (按 trak 出现顺序, 从 0 开始)
        track: usize,
        /// 缺少的表
        table: MissingTable,
    },

    /// 未找到指定的容器格式
    #[error("未找到容器格式: {0}")]
    FormatNotFound(String),
}

/// avkit 统一 Result 类型
pub type AvResult<T> = Result<T, AvError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_不完整轨道_错误信息包含表名() {
        let err = AvError::IncompleteTrack {
            track: 1,
            table: MissingTable::ChunkOffset,
        };
        let msg = err.to_string();
        assert!(msg.contains("#1"));
        assert!(msg.contains("stco/co64"));
    }

    #[test]
    fn test_io_错误转换() {
        let io = std::io::Error::new(std::io::ErrorKind::UnexpectedEof, "short");
        let err: AvError = io.into();
        assert!(matches!(err, AvError::Io(_)));
    }
}
