//! I/O 抽象层.
//!
//! 为解封装器提供统一的随机访问读取接口, 支持文件与内存缓冲区两种后端,
//! 调用方也可以实现 [`IoBackend`] 接入自己的数据源.

use std::io::{self, Read, Seek, SeekFrom};
use std::path::Path;

use avkit_core::{AvError, AvResult};

/// I/O 上下文
///
/// 封装底层 I/O 后端, 带一个读缓冲区. 顺序的小块读取命中缓冲区,
/// 大块读取在缓冲区为空时直接落到后端.
pub struct IoContext {
    /// 内部 I/O 实现
    inner: Box<dyn IoBackend>,
    /// 读缓冲区
    buffer: Vec<u8>,
    /// 缓冲区中的有效数据长度
    buf_len: usize,
    /// 缓冲区当前读取位置
    buf_pos: usize,
}

/// I/O 后端 trait
///
/// 实现此 trait 以支持不同的数据来源. 后端必须支持随机访问.
pub trait IoBackend: Send {
    /// 读取数据到缓冲区, 返回 0 表示已到末尾
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize>;
    /// 定位 (seek)
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64>;
    /// 获取当前位置
    fn position(&mut self) -> io::Result<u64>;
    /// 获取总大小 (如果可知)
    fn size(&self) -> Option<u64>;
}

/// 默认缓冲区大小 (32 KB)
const DEFAULT_BUFFER_SIZE: usize = 32 * 1024;

impl IoContext {
    /// 从 I/O 后端创建上下文
    pub fn new(backend: Box<dyn IoBackend>) -> Self {
        Self {
            inner: backend,
            buffer: vec![0u8; DEFAULT_BUFFER_SIZE],
            buf_len: 0,
            buf_pos: 0,
        }
    }

    /// 从文件路径打开 (只读)
    pub fn open_read(path: impl AsRef<Path>) -> AvResult<Self> {
        let file = std::fs::File::open(path)?;
        Ok(Self::new(Box::new(FileBackend::new(file))))
    }

    /// 从内存数据创建
    pub fn from_memory(data: Vec<u8>) -> Self {
        Self::new(Box::new(MemoryBackend::from_data(data)))
    }

    // ========================
    // 读取方法
    // ========================

    /// 读取指定字节数, 数据不足时返回 `Eof`
    pub fn read_exact(&mut self, buf: &mut [u8]) -> AvResult<()> {
        let mut total_read = 0;
        while total_read < buf.len() {
            let buffered = self.buf_len - self.buf_pos;
            let wanted = buf.len() - total_read;
            if buffered > 0 {
                let to_copy = buffered.min(wanted);
                buf[total_read..total_read + to_copy]
                    .copy_from_slice(&self.buffer[self.buf_pos..self.buf_pos + to_copy]);
                self.buf_pos += to_copy;
                total_read += to_copy;
            } else if wanted >= self.buffer.len() {
                // 大块读取绕过缓冲区
                let n = self.inner.read(&mut buf[total_read..])?;
                if n == 0 {
                    return Err(AvError::Eof);
                }
                total_read += n;
            } else {
                self.buf_pos = 0;
                self.buf_len = self.inner.read(&mut self.buffer)?;
                if self.buf_len == 0 {
                    return Err(AvError::Eof);
                }
            }
        }
        Ok(())
    }

    /// 从头读取全部数据
    pub fn read_all(&mut self) -> AvResult<Vec<u8>> {
        self.seek(SeekFrom::Start(0))?;
        let mut data = Vec::with_capacity(self.size().unwrap_or(0) as usize);
        let mut chunk = vec![0u8; DEFAULT_BUFFER_SIZE];
        loop {
            let n = self.inner.read(&mut chunk)?;
            if n == 0 {
                break;
            }
            data.extend_from_slice(&chunk[..n]);
        }
        Ok(data)
    }

    // ========================
    // 定位方法
    // ========================

    /// 定位 (seek)
    ///
    /// 注意: seek 会清空读缓冲区.
    pub fn seek(&mut self, pos: SeekFrom) -> AvResult<u64> {
        self.buf_pos = 0;
        self.buf_len = 0;
        Ok(self.inner.seek(pos)?)
    }

    /// 定位到绝对偏移, 已处于该位置时不触发后端 seek
    ///
    /// 返回是否真正执行了 seek.
    pub fn seek_to(&mut self, offset: u64) -> AvResult<bool> {
        if self.position()? == offset {
            return Ok(false);
        }
        self.seek(SeekFrom::Start(offset))?;
        Ok(true)
    }

    /// 获取当前位置
    ///
    /// 考虑读缓冲区中尚未消耗的数据量.
    pub fn position(&mut self) -> AvResult<u64> {
        let raw_pos = self.inner.position()?;
        let buffered = (self.buf_len - self.buf_pos) as u64;
        Ok(raw_pos - buffered)
    }

    /// 获取总大小
    pub fn size(&self) -> Option<u64> {
        self.inner.size()
    }
}

/// 文件 I/O 后端
pub struct FileBackend {
    file: std::fs::File,
    size: Option<u64>,
}

impl FileBackend {
    pub fn new(file: std::fs::File) -> Self {
        let size = file.metadata().ok().map(|m| m.len());
        Self { file, size }
    }
}

impl IoBackend for FileBackend {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.file.read(buf)
    }

    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        self.file.seek(pos)
    }

    fn position(&mut self) -> io::Result<u64> {
        self.file.stream_position()
    }

    fn size(&self) -> Option<u64> {
        self.size
    }
}

/// 内存缓冲区 I/O 后端
///
/// 用于测试和内存中处理.
pub struct MemoryBackend {
    data: Vec<u8>,
    pos: usize,
}

impl MemoryBackend {
    pub fn from_data(data: Vec<u8>) -> Self {
        Self { data, pos: 0 }
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }
}

impl IoBackend for MemoryBackend {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let available = self.data.len().saturating_sub(self.pos);
        let to_read = buf.len().min(available);
        if to_read == 0 {
            return Ok(0);
        }
        buf[..to_read].copy_from_slice(&self.data[self.pos..self.pos + to_read]);
        self.pos += to_read;
        Ok(to_read)
    }

    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        let new_pos = match pos {
            SeekFrom::Start(p) => Some(p),
            SeekFrom::Current(d) => (self.pos as u64).checked_add_signed(d),
            SeekFrom::End(d) => (self.data.len() as u64).checked_add_signed(d),
        };
        let new_pos = new_pos.ok_or_else(|| {
            io::Error::new(io::ErrorKind::InvalidInput, "seek 到负偏移")
        })?;
        self.pos = new_pos as usize;
        Ok(new_pos)
    }

    fn position(&mut self) -> io::Result<u64> {
        Ok(self.pos as u64)
    }

    fn size(&self) -> Option<u64> {
        Some(self.data.len() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_内存读取与定位() {
        let mut io = IoContext::from_memory((0u8..16).collect());
        let mut buf = [0u8; 4];
        io.read_exact(&mut buf).unwrap();
        assert_eq!(buf, [0, 1, 2, 3]);
        assert_eq!(io.position().unwrap(), 4);

        io.seek(SeekFrom::Start(10)).unwrap();
        io.read_exact(&mut buf).unwrap();
        assert_eq!(buf, [10, 11, 12, 13]);
    }

    #[test]
    fn test_seek_to_当前位置不触发_seek() {
        let mut io = IoContext::from_memory(vec![0u8; 64]);
        let mut buf = [0u8; 8];
        io.read_exact(&mut buf).unwrap();
        assert!(!io.seek_to(8).unwrap());
        assert!(io.seek_to(32).unwrap());
        assert_eq!(io.position().unwrap(), 32);
    }

    #[test]
    fn test_读取越过末尾() {
        let mut io = IoContext::from_memory(vec![1, 2, 3]);
        let mut buf = [0u8; 4];
        assert!(matches!(io.read_exact(&mut buf), Err(AvError::Eof)));
    }

    #[test]
    fn test_跨缓冲区大块读取() {
        let data: Vec<u8> = (0..DEFAULT_BUFFER_SIZE * 2).map(|i| i as u8).collect();
        let mut io = IoContext::from_memory(data.clone());
        let mut head = [0u8; 3];
        io.read_exact(&mut head).unwrap();
        let mut big = vec![0u8; DEFAULT_BUFFER_SIZE + 5];
        io.read_exact(&mut big).unwrap();
        assert_eq!(&big[..], &data[3..DEFAULT_BUFFER_SIZE + 8]);
        assert_eq!(io.position().unwrap(), (DEFAULT_BUFFER_SIZE + 8) as u64);
    }

    #[test]
    fn test_读取全部() {
        let mut io = IoContext::from_memory(vec![7u8; 100]);
        io.seek(SeekFrom::Start(50)).unwrap();
        assert_eq!(io.read_all().unwrap().len(), 100);
    }
}
