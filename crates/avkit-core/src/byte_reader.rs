//! 大端字节切片读取器.
//!
//! 容器格式中的定长字段几乎全部是大端序. `ByteReader` 在一个借用的切片上
//! 顺序读取这些字段, 每次读取都做边界检查, 越界时返回 `InvalidData`
//! 而不是 panic.

use byteorder::{BigEndian, ByteOrder};

use crate::{AvError, AvResult};

/// 大端字节切片读取器
#[derive(Debug, Clone)]
pub struct ByteReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> ByteReader<'a> {
    /// 创建读取器, 从切片开头读取
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// 当前读取位置 (相对切片开头)
    pub fn position(&self) -> usize {
        self.pos
    }

    /// 剩余字节数
    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    /// 是否已读完
    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    /// 剩余字节切片 (不移动位置)
    pub fn rest(&self) -> &'a [u8] {
        &self.data[self.pos..]
    }

    /// 读取 n 个字节
    pub fn read_bytes(&mut self, n: usize) -> AvResult<&'a [u8]> {
        if n > self.remaining() {
            return Err(AvError::InvalidData(format!(
                "读取越界: 位置 {} 需要 {} 字节, 仅剩 {} 字节",
                self.pos,
                n,
                self.remaining(),
            )));
        }
        let slice = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    /// 跳过 n 个字节
    pub fn skip(&mut self, n: usize) -> AvResult<()> {
        self.read_bytes(n).map(|_| ())
    }

    pub fn read_u8(&mut self) -> AvResult<u8> {
        Ok(self.read_bytes(1)?[0])
    }

    pub fn read_u16(&mut self) -> AvResult<u16> {
        Ok(BigEndian::read_u16(self.read_bytes(2)?))
    }

    pub fn read_u24(&mut self) -> AvResult<u32> {
        Ok(BigEndian::read_u24(self.read_bytes(3)?))
    }

    pub fn read_u32(&mut self) -> AvResult<u32> {
        Ok(BigEndian::read_u32(self.read_bytes(4)?))
    }

    pub fn read_i32(&mut self) -> AvResult<i32> {
        Ok(BigEndian::read_i32(self.read_bytes(4)?))
    }

    pub fn read_u64(&mut self) -> AvResult<u64> {
        Ok(BigEndian::read_u64(self.read_bytes(8)?))
    }

    pub fn read_i64(&mut self) -> AvResult<i64> {
        Ok(BigEndian::read_i64(self.read_bytes(8)?))
    }

    pub fn read_f64(&mut self) -> AvResult<f64> {
        Ok(BigEndian::read_f64(self.read_bytes(8)?))
    }

    /// 读取 4 字节标签 (FourCC)
    pub fn read_fourcc(&mut self) -> AvResult<[u8; 4]> {
        let b = self.read_bytes(4)?;
        Ok([b[0], b[1], b[2], b[3]])
    }

    /// 读取 version(8) + flags(24) 头
    pub fn read_version_flags(&mut self) -> AvResult<(u8, u32)> {
        let v = self.read_u32()?;
        Ok(((v >> 24) as u8, v & 0x00FF_FFFF))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_顺序读取大端字段() {
        let data = [
            0x01, 0x00, 0x02, 0x00, 0x00, 0x03, 0x00, 0x00, 0x00, 0x04, b'a', b'v', b'c', b'1',
        ];
        let mut r = ByteReader::new(&data);
        assert_eq!(r.read_u8().unwrap(), 1);
        assert_eq!(r.read_u16().unwrap(), 2);
        assert_eq!(r.read_u24().unwrap(), 3);
        assert_eq!(r.read_u32().unwrap(), 4);
        assert_eq!(&r.read_fourcc().unwrap(), b"avc1");
        assert!(r.is_empty());
    }

    #[test]
    fn test_越界读取返回错误() {
        let data = [0x00, 0x01];
        let mut r = ByteReader::new(&data);
        assert!(matches!(r.read_u32(), Err(AvError::InvalidData(_))));
        // 失败的读取不移动位置
        assert_eq!(r.position(), 0);
        assert_eq!(r.read_u16().unwrap(), 1);
    }

    #[test]
    fn test_version_flags() {
        let data = [0x01, 0x00, 0x00, 0x05];
        let mut r = ByteReader::new(&data);
        assert_eq!(r.read_version_flags().unwrap(), (1, 5));
    }
}
