//! 解封装器 (Demuxer) trait 定义.
//!
//! 解封装器从容器中按文件顺序取出采样, 通过回调交给调用方.

use avkit_codec::CodecId;
use avkit_core::{AvResult, MediaType};

use crate::format_id::FormatId;
use crate::io::IoContext;

/// 采样回调
///
/// 参数依次为: 采样数据, 显示时间戳, 解码时间戳, 媒体类型, 编解码器.
/// 时间戳以所属轨道的媒体时间刻度为单位. 数据切片只在回调期间有效.
pub type SampleHandler = Box<dyn FnMut(&[u8], i64, i64, MediaType, CodecId) + Send>;

/// 解封装器工厂函数类型
pub type DemuxerFactory = fn(SampleHandler) -> Box<dyn Demuxer>;

/// 解封装器 trait
///
/// 使用流程:
/// 1. 调用 `open()` 解析容器头部, 建立采样索引
/// 2. 循环调用 `read()`, 每次向回调交付一个采样
/// 3. `read()` 返回 `Err(AvError::Eof)` 表示所有采样已读完
pub trait Demuxer: Send {
    /// 获取格式标识
    fn format_id(&self) -> FormatId;

    /// 获取格式名称
    fn name(&self) -> &str;

    /// 打开容器并解析头部信息
    ///
    /// 成功后解封装器持有 `io`, 后续读取都通过它完成.
    fn open(&mut self, io: IoContext) -> AvResult<()>;

    /// 读取下一个采样
    ///
    /// # 返回
    /// - `Ok(())`: 已向回调交付一个采样
    /// - `Err(AvError::Eof)`: 已到达流末尾
    fn read(&mut self) -> AvResult<()>;

    /// 轨道数量
    fn track_count(&self) -> usize;
}
