//! MP4 Box 分帧.
//!
//! ISO 14496-12 定义的 Box 头部:
//! ```text
//! Size:       4 bytes (big-endian, 含头部本身)
//! Type:       4 bytes (FourCC)
//! [ExtSize]:  8 bytes (仅当 Size==1 时存在, 64-bit 大小)
//! ```
//!
//! 特殊大小值:
//! - 0: Box 延伸到输入末尾, 只在文件顶层合法
//! - 1: 使用 64-bit 扩展大小, 头部 16 字节
//!
//! 分帧器只在借用的字节切片上工作, 不做任何 I/O, 也不会越界访问.

use std::ops::Range;

use avkit_core::{AvError, AvResult};
use byteorder::{BigEndian, ByteOrder};

use super::boxes::FourCc;

/// 分帧所处的层级
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameScope {
    /// 文件顶层, 允许 size == 0
    TopLevel,
    /// 容器内部
    Nested,
}

/// 一个已分帧的 Box 头部
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoxHeader {
    /// Box 类型
    pub fourcc: FourCc,
    /// Box 起始位置 (文件绝对偏移)
    pub offset: u64,
    /// Box 总大小 (含头部)
    pub size: u64,
    /// 头部大小 (8 或 16 字节)
    pub header_len: usize,
    /// 负载在当前切片中的范围
    payload: Range<usize>,
}

impl BoxHeader {
    /// 负载的文件绝对偏移
    pub fn payload_offset(&self) -> u64 {
        self.offset + self.header_len as u64
    }

    /// 负载长度
    pub fn payload_len(&self) -> usize {
        self.payload.len()
    }
}

/// Box 分帧器
///
/// 在一段字节上依次切出相邻的 Box. `base_offset` 是切片开头在文件中的
/// 绝对偏移, 只用于记录位置.
pub struct BoxFramer<'a> {
    data: &'a [u8],
    base_offset: u64,
    scope: FrameScope,
    pos: usize,
}

impl<'a> BoxFramer<'a> {
    pub fn new(data: &'a [u8], base_offset: u64, scope: FrameScope) -> Self {
        Self {
            data,
            base_offset,
            scope,
            pos: 0,
        }
    }

    /// 取出下一个 Box 头部
    ///
    /// 恰好到达范围末尾时返回 `Ok(None)`.
    pub fn next_box(&mut self) -> AvResult<Option<BoxHeader>> {
        let remaining = self.data.len() - self.pos;
        if remaining == 0 {
            return Ok(None);
        }

        let rest = &self.data[self.pos..];
        if remaining < 8 {
            // QuickTime 容器末尾可能带 4 字节全零终止符
            if self.scope == FrameScope::Nested && rest.iter().all(|&b| b == 0) {
                self.pos = self.data.len();
                return Ok(None);
            }
            return Err(AvError::NeedMoreData);
        }

        let size32 = BigEndian::read_u32(&rest[0..4]);
        let fourcc = FourCc([rest[4], rest[5], rest[6], rest[7]]);

        let (size, header_len) = match size32 {
            1 => {
                if remaining < 16 {
                    return Err(AvError::NeedMoreData);
                }
                (BigEndian::read_u64(&rest[8..16]), 16usize)
            }
            0 => {
                if self.scope != FrameScope::TopLevel {
                    return Err(AvError::InvalidData(format!(
                        "box '{fourcc}' 大小为 0, 只允许出现在文件顶层"
                    )));
                }
                (remaining as u64, 8usize)
            }
            n => (u64::from(n), 8usize),
        };

        if size < header_len as u64 {
            return Err(AvError::InvalidData(format!(
                "box '{fourcc}' 声明大小 {size} 小于头部长度 {header_len}"
            )));
        }
        if size > remaining as u64 {
            return Err(AvError::NeedMoreData);
        }

        let start = self.pos;
        let end = start + size as usize;
        self.pos = end;

        Ok(Some(BoxHeader {
            fourcc,
            offset: self.base_offset + start as u64,
            size,
            header_len,
            payload: start + header_len..end,
        }))
    }

    /// 取出 Box 负载切片
    pub fn payload(&self, header: &BoxHeader) -> &'a [u8] {
        &self.data[header.payload.clone()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build_box(tag: &[u8; 4], content: &[u8]) -> Vec<u8> {
        let size = (8 + content.len()) as u32;
        let mut buf = Vec::new();
        buf.extend_from_slice(&size.to_be_bytes());
        buf.extend_from_slice(tag);
        buf.extend_from_slice(content);
        buf
    }

    #[test]
    fn test_依次切分相邻_box() {
        let mut data = build_box(b"ftyp", b"isom\0\0\0\0");
        data.extend(build_box(b"free", &[]));
        let mut framer = BoxFramer::new(&data, 100, FrameScope::TopLevel);

        let first = framer.next_box().unwrap().unwrap();
        assert_eq!(first.fourcc, FourCc(*b"ftyp"));
        assert_eq!(first.offset, 100);
        assert_eq!(first.size, 16);
        assert_eq!(first.header_len, 8);
        assert_eq!(framer.payload(&first), b"isom\0\0\0\0");

        let second = framer.next_box().unwrap().unwrap();
        assert_eq!(second.fourcc, FourCc(*b"free"));
        assert_eq!(second.payload_len(), 0);
        assert_eq!(second.payload_offset(), 124);

        assert!(framer.next_box().unwrap().is_none());
    }

    #[test]
    fn test_64位扩展大小() {
        let mut data = Vec::new();
        data.extend_from_slice(&1u32.to_be_bytes());
        data.extend_from_slice(b"mdat");
        data.extend_from_slice(&20u64.to_be_bytes());
        data.extend_from_slice(&[0xAA, 0xBB, 0xCC, 0xDD]);
        let mut framer = BoxFramer::new(&data, 0, FrameScope::TopLevel);
        let header = framer.next_box().unwrap().unwrap();
        assert_eq!(header.header_len, 16);
        assert_eq!(header.size, 20);
        assert_eq!(framer.payload(&header), &[0xAA, 0xBB, 0xCC, 0xDD]);
    }

    #[test]
    fn test_声明大小超出输入() {
        // 声明 1000 字节, 实际只有 16 字节
        let mut data = Vec::new();
        data.extend_from_slice(&1000u32.to_be_bytes());
        data.extend_from_slice(b"moov");
        data.extend_from_slice(&[0u8; 8]);
        let mut framer = BoxFramer::new(&data, 0, FrameScope::TopLevel);
        assert!(matches!(framer.next_box(), Err(AvError::NeedMoreData)));
    }

    #[test]
    fn test_头部截断() {
        let data = [0x00, 0x00, 0x00, 0x10, b'm'];
        let mut framer = BoxFramer::new(&data, 0, FrameScope::TopLevel);
        assert!(matches!(framer.next_box(), Err(AvError::NeedMoreData)));

        let mut large = Vec::new();
        large.extend_from_slice(&1u32.to_be_bytes());
        large.extend_from_slice(b"mdat");
        large.extend_from_slice(&[0, 0]);
        let mut framer = BoxFramer::new(&large, 0, FrameScope::TopLevel);
        assert!(matches!(framer.next_box(), Err(AvError::NeedMoreData)));
    }

    #[test]
    fn test_大小小于头部() {
        let mut data = Vec::new();
        data.extend_from_slice(&4u32.to_be_bytes());
        data.extend_from_slice(b"free");
        let mut framer = BoxFramer::new(&data, 0, FrameScope::TopLevel);
        assert!(matches!(framer.next_box(), Err(AvError::InvalidData(_))));
    }

    #[test]
    fn test_大小为零_仅顶层合法() {
        let mut data = Vec::new();
        data.extend_from_slice(&0u32.to_be_bytes());
        data.extend_from_slice(b"mdat");
        data.extend_from_slice(&[1, 2, 3]);

        let mut top = BoxFramer::new(&data, 0, FrameScope::TopLevel);
        let header = top.next_box().unwrap().unwrap();
        assert_eq!(header.size, 11);
        assert_eq!(top.payload(&header), &[1, 2, 3]);
        assert!(top.next_box().unwrap().is_none());

        let mut nested = BoxFramer::new(&data, 0, FrameScope::Nested);
        assert!(matches!(nested.next_box(), Err(AvError::InvalidData(_))));
    }

    #[test]
    fn test_容器末尾零终止符() {
        let mut data = build_box(b"free", &[]);
        data.extend_from_slice(&[0, 0, 0, 0]);
        let mut framer = BoxFramer::new(&data, 0, FrameScope::Nested);
        assert!(framer.next_box().unwrap().is_some());
        assert!(framer.next_box().unwrap().is_none());
    }
}
