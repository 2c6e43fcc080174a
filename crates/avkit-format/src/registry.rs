//! 容器格式注册表.
//!
//! 管理所有已注册的解封装器, 支持按格式标识查找和自动探测.

use std::collections::HashMap;
use std::io::SeekFrom;

use avkit_core::{AvError, AvResult};

use crate::demuxer::{Demuxer, DemuxerFactory, SampleHandler};
use crate::format_id::FormatId;
use crate::io::IoContext;
use crate::probe::{FormatProbe, ProbeResult};

/// 探测时最多读取的头部字节数
const PROBE_SIZE: u64 = 8192;

/// 容器格式注册表
pub struct FormatRegistry {
    /// 解封装器工厂映射
    demuxers: HashMap<FormatId, DemuxerEntry>,
    /// 格式探测器列表
    probes: Vec<Box<dyn FormatProbe + Send>>,
}

/// 解封装器注册条目
struct DemuxerEntry {
    /// 格式名称
    name: String,
    /// 工厂函数
    factory: DemuxerFactory,
}

impl FormatRegistry {
    /// 创建空的注册表
    pub fn new() -> Self {
        Self {
            demuxers: HashMap::new(),
            probes: Vec::new(),
        }
    }

    /// 注册一个解封装器
    pub fn register_demuxer(
        &mut self,
        format_id: FormatId,
        name: impl Into<String>,
        factory: DemuxerFactory,
    ) {
        self.demuxers.insert(
            format_id,
            DemuxerEntry {
                name: name.into(),
                factory,
            },
        );
    }

    /// 注册一个格式探测器
    pub fn register_probe(&mut self, probe: Box<dyn FormatProbe + Send>) {
        self.probes.push(probe);
    }

    /// 创建指定格式的解封装器实例
    pub fn create_demuxer(
        &self,
        format_id: FormatId,
        handler: SampleHandler,
    ) -> AvResult<Box<dyn Demuxer>> {
        let entry = self.demuxers.get(&format_id).ok_or_else(|| {
            AvError::FormatNotFound(format!("未找到 {} 的解封装器", format_id))
        })?;
        Ok((entry.factory)(handler))
    }

    /// 探测数据的容器格式
    ///
    /// 遍历所有已注册的探测器, 返回置信度最高的结果.
    pub fn probe(&self, data: &[u8], filename: Option<&str>) -> Option<ProbeResult> {
        let mut best: Option<ProbeResult> = None;
        for probe in &self.probes {
            if let Some(score) = probe.probe(data, filename) {
                let is_better = best.as_ref().is_none_or(|b| score > b.score);
                if is_better {
                    best = Some(ProbeResult {
                        format_id: probe.format_id(),
                        score,
                    });
                }
            }
        }
        best
    }

    /// 获取所有已注册的解封装器名称
    pub fn list_demuxers(&self) -> Vec<(FormatId, &str)> {
        let mut list: Vec<(FormatId, &str)> = self
            .demuxers
            .iter()
            .map(|(id, entry)| (*id, entry.name.as_str()))
            .collect();
        list.sort_by_key(|(_, name)| *name);
        list
    }

    /// 探测输入格式 (不打开解封装器)
    ///
    /// 读取头部数据探测格式, 然后 seek 回起始位置.
    pub fn probe_input(
        &self,
        io: &mut IoContext,
        filename: Option<&str>,
    ) -> AvResult<ProbeResult> {
        let probe_size = io.size().unwrap_or(PROBE_SIZE).min(PROBE_SIZE) as usize;
        let mut probe_buf = vec![0u8; probe_size];
        io.seek(SeekFrom::Start(0))?;
        io.read_exact(&mut probe_buf)?;

        let result = self
            .probe(&probe_buf, filename)
            .ok_or_else(|| AvError::FormatNotFound("无法识别输入文件格式".to_string()))?;
        log::debug!(
            "探测结果: {} (置信度 {})",
            result.format_id,
            result.score
        );

        io.seek(SeekFrom::Start(0))?;
        Ok(result)
    }

    /// 自动探测格式, 创建解封装器并打开
    pub fn open_input(
        &self,
        mut io: IoContext,
        filename: Option<&str>,
        handler: SampleHandler,
    ) -> AvResult<Box<dyn Demuxer>> {
        let result = self.probe_input(&mut io, filename)?;
        let mut demuxer = self.create_demuxer(result.format_id, handler)?;
        demuxer.open(io)?;
        Ok(demuxer)
    }
}

impl Default for FormatRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::probe::SCORE_MAX;

    fn registry() -> FormatRegistry {
        let mut registry = FormatRegistry::new();
        crate::register_all(&mut registry);
        registry
    }

    #[test]
    fn test_注册表列出解封装器() {
        let registry = registry();
        let list = registry.list_demuxers();
        let names: Vec<&str> = list.iter().map(|(_, name)| *name).collect();
        assert_eq!(names, vec!["mov", "mp4"]);
    }

    #[test]
    fn test_未注册格式() {
        let registry = FormatRegistry::new();
        let result = registry.create_demuxer(FormatId::Mp4, Box::new(|_, _, _, _, _| {}));
        assert!(matches!(result, Err(AvError::FormatNotFound(_))));
    }

    #[test]
    fn test_探测输入后回到起点() {
        let mut data = 16u32.to_be_bytes().to_vec();
        data.extend_from_slice(b"ftypisom\0\0\0\0");
        let mut io = IoContext::from_memory(data);
        let result = registry().probe_input(&mut io, None).unwrap();
        assert_eq!(result.format_id, FormatId::Mp4);
        assert_eq!(result.score, SCORE_MAX);
        assert_eq!(io.position().unwrap(), 0);
    }

    #[test]
    fn test_无法识别的输入() {
        let mut io = IoContext::from_memory(b"RIFF\0\0\0\0WAVE".to_vec());
        let result = registry().probe_input(&mut io, Some("a.wav"));
        assert!(matches!(result, Err(AvError::FormatNotFound(_))));
    }
}
