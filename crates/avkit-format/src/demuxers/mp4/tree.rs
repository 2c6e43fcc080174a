//! Box 树构建.
//!
//! 从文件顶层开始递归分帧, 为每个可识别的 Box 调用 [`parse_box`], 容器继续向下
//! 遍历. 遇到 `trak` 时新建 [`TrackBuilder`], 并把它显式传给子树中的解析分支.

use avkit_core::{AvError, AvResult};

use super::UnknownBoxPolicy;
use super::boxes::{BoxData, BoxKind, FourCc, Mp4Box};
use super::framer::{BoxFramer, BoxHeader, FrameScope};
use super::parse::parse_box;
use super::track::TrackBuilder;
use super::ParseWarning;

/// 最大嵌套深度
pub const MAX_DEPTH: usize = 32;

/// 一次完整遍历的结果
pub(crate) struct ParsedTree {
    pub root: Mp4Box,
    pub tracks: Vec<TrackBuilder>,
    pub warnings: Vec<ParseWarning>,
}

pub(crate) struct TreeBuilder {
    policy: UnknownBoxPolicy,
    warnings: Vec<ParseWarning>,
    tracks: Vec<TrackBuilder>,
    next_track_index: usize,
}

impl TreeBuilder {
    pub fn new(policy: UnknownBoxPolicy) -> Self {
        Self {
            policy,
            warnings: Vec::new(),
            tracks: Vec::new(),
            next_track_index: 0,
        }
    }

    /// 遍历整个文件
    pub fn build(mut self, data: &[u8]) -> AvResult<ParsedTree> {
        let mut root = Mp4Box::root(data.len() as u64);
        self.walk(data, 0, FrameScope::TopLevel, 0, &mut root, None)?;
        Ok(ParsedTree {
            root,
            tracks: self.tracks,
            warnings: self.warnings,
        })
    }

    fn warn(&mut self, offset: u64, fourcc: FourCc, message: String) {
        let warning = ParseWarning {
            offset,
            fourcc,
            message,
        };
        log::warn!("MP4: {warning}");
        self.warnings.push(warning);
    }

    /// 遍历一段相邻的 Box, 结果挂到 `parent` 下
    fn walk(
        &mut self,
        data: &[u8],
        base_offset: u64,
        scope: FrameScope,
        depth: usize,
        parent: &mut Mp4Box,
        mut track: Option<&mut TrackBuilder>,
    ) -> AvResult<()> {
        let mut framer = BoxFramer::new(data, base_offset, scope);
        while let Some(header) = framer.next_box()? {
            let payload = framer.payload(&header);
            let Some(kind) = BoxKind::from_fourcc(&header.fourcc) else {
                match self.policy {
                    UnknownBoxPolicy::Skip => self.warn(
                        header.offset,
                        header.fourcc,
                        format!("未知 box, 跳过 {} 字节", header.size),
                    ),
                    UnknownBoxPolicy::Fail => {
                        return Err(AvError::InvalidData(format!(
                            "未知 box '{}' (偏移 {})",
                            header.fourcc, header.offset
                        )));
                    }
                }
                continue;
            };

            match self.visit(kind, &header, payload, depth, track.as_deref_mut()) {
                Ok(node) => parent.children.push(node),
                Err(e) if !kind.is_critical() => {
                    self.warn(header.offset, header.fourcc, format!("解析失败, 已丢弃: {e}"));
                }
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }

    fn visit(
        &mut self,
        kind: BoxKind,
        header: &BoxHeader,
        payload: &[u8],
        depth: usize,
        mut track: Option<&mut TrackBuilder>,
    ) -> AvResult<Mp4Box> {
        if depth >= MAX_DEPTH {
            return Err(AvError::InvalidData(format!(
                "box '{}' (偏移 {}) 嵌套超过 {MAX_DEPTH} 层",
                header.fourcc, header.offset
            )));
        }

        let mut node = Mp4Box {
            fourcc: header.fourcc,
            offset: header.offset,
            size: header.size,
            data: BoxData::Container,
            children: Vec::new(),
        };

        if kind == BoxKind::Trak {
            let mut builder = TrackBuilder::new(self.next_track_index);
            self.next_track_index += 1;
            log::debug!("MP4: trak #{} 位于偏移 {}", builder.index(), header.offset);
            self.walk(
                payload,
                header.payload_offset(),
                FrameScope::Nested,
                depth + 1,
                &mut node,
                Some(&mut builder),
            )?;
            self.tracks.push(builder);
            return Ok(node);
        }

        let (data, consumed) = parse_box(kind, header, payload, track.as_deref_mut())?;
        node.data = data;
        if kind.is_container() {
            let children = payload.get(consumed..).ok_or_else(|| {
                AvError::InvalidData(format!("box '{}' 负载过短", header.fourcc))
            })?;
            self.walk(
                children,
                header.payload_offset() + consumed as u64,
                FrameScope::Nested,
                depth + 1,
                &mut node,
                track,
            )?;
        }
        Ok(node)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wrap(tag: &[u8; 4], content: &[u8]) -> Vec<u8> {
        let mut buf = ((8 + content.len()) as u32).to_be_bytes().to_vec();
        buf.extend_from_slice(tag);
        buf.extend_from_slice(content);
        buf
    }

    #[test]
    fn test_未知_box_跳过并记录警告() {
        let mut data = wrap(b"ftyp", b"isom\0\0\0\0");
        data.extend(wrap(b"uuid", &[0u8; 16]));
        let tree = TreeBuilder::new(UnknownBoxPolicy::Skip).build(&data).unwrap();
        assert_eq!(tree.root.children.len(), 1);
        assert_eq!(tree.warnings.len(), 1);
        assert_eq!(tree.warnings[0].fourcc, FourCc(*b"uuid"));
        assert_eq!(tree.warnings[0].offset, 16);
    }

    #[test]
    fn test_未知_box_严格模式报错() {
        let data = wrap(b"uuid", &[0u8; 16]);
        let result = TreeBuilder::new(UnknownBoxPolicy::Fail).build(&data);
        assert!(matches!(result, Err(AvError::InvalidData(_))));
    }

    #[test]
    fn test_非关键_box_解析失败被容忍() {
        // elst 声明 100 个条目但没有数据
        let mut elst = vec![0u8; 4];
        elst.extend_from_slice(&100u32.to_be_bytes());
        let edts = wrap(b"edts", &wrap(b"elst", &elst));
        let data = wrap(b"moov", &wrap(b"trak", &edts));
        let tree = TreeBuilder::new(UnknownBoxPolicy::Skip).build(&data).unwrap();
        assert_eq!(tree.tracks.len(), 1);
        assert_eq!(tree.warnings.len(), 1);
        let edts = tree.root.find(&[b"moov", b"trak", b"edts"]).unwrap();
        assert!(edts.children.is_empty());
    }

    #[test]
    fn test_关键_box_解析失败中止() {
        // stts 条目数超出
        let mut stts = vec![0u8; 4];
        stts.extend_from_slice(&5u32.to_be_bytes());
        let stbl = wrap(b"stbl", &wrap(b"stts", &stts));
        let data = wrap(b"moov", &wrap(b"trak", &stbl));
        assert!(TreeBuilder::new(UnknownBoxPolicy::Skip).build(&data).is_err());
    }

    #[test]
    fn test_嵌套过深() {
        let mut data = wrap(b"stbl", &[]);
        for _ in 0..MAX_DEPTH {
            data = wrap(b"minf", &data);
        }
        let result = TreeBuilder::new(UnknownBoxPolicy::Skip).build(&data);
        assert!(matches!(result, Err(AvError::InvalidData(_))));
    }

    #[test]
    fn test_轨道按出现顺序编号() {
        let mut moov = wrap(b"trak", &[]);
        moov.extend(wrap(b"trak", &[]));
        let data = wrap(b"moov", &moov);
        let tree = TreeBuilder::new(UnknownBoxPolicy::Skip).build(&data).unwrap();
        let indexes: Vec<usize> = tree.tracks.iter().map(|t| t.index()).collect();
        assert_eq!(indexes, vec![0, 1]);
        assert_eq!(tree.root.descendant_count(), 3);
    }
}
