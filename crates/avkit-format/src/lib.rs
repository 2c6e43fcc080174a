//! # avkit-format
//!
//! avkit 容器格式库, 提供解封装框架与 MP4/MOV 解封装器.

pub mod demuxer;
pub mod demuxers;
pub mod format_id;
pub mod io;
pub mod probe;
pub mod registry;

// 重导出常用类型
pub use demuxer::{Demuxer, SampleHandler};
pub use demuxers::mp4::{Mp4DemuxOptions, Mp4Demuxer, ParseWarning, UnknownBoxPolicy};
pub use format_id::FormatId;
pub use io::IoContext;
pub use probe::ProbeResult;
pub use registry::FormatRegistry;

/// 注册所有内置容器格式
pub fn register_all(registry: &mut FormatRegistry) {
    demuxers::register_all_demuxers(registry);
}
