//! 比特流读取器.
//!
//! 按大端位序 (MSB first) 读取, 用于解析 AAC AudioSpecificConfig 等
//! 按位打包的编解码器配置.

use crate::{AvError, AvResult};

/// 比特流读取器
///
/// # 示例
/// ```
/// use avkit_core::bitreader::BitReader;
///
/// let data = [0b0001_0010, 0b0001_0000];
/// let mut br = BitReader::new(&data);
/// assert_eq!(br.read_bits(5).unwrap(), 2);
/// assert_eq!(br.read_bits(4).unwrap(), 4);
/// ```
pub struct BitReader<'a> {
    data: &'a [u8],
    /// 当前字节索引
    byte_pos: usize,
    /// 当前字节中的位位置 (0-7, 0 表示最高位)
    bit_pos: u8,
}

impl<'a> BitReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            byte_pos: 0,
            bit_pos: 0,
        }
    }

    /// 剩余可读位数
    pub fn bits_left(&self) -> usize {
        if self.byte_pos >= self.data.len() {
            return 0;
        }
        (self.data.len() - self.byte_pos) * 8 - self.bit_pos as usize
    }

    /// 读取 N 个位 (最多 32 位)
    pub fn read_bits(&mut self, n: u32) -> AvResult<u32> {
        if n > 32 {
            return Err(AvError::InvalidArgument(format!(
                "read_bits: n={n} 超过 32 位"
            )));
        }
        if n as usize > self.bits_left() {
            return Err(AvError::InvalidData(format!(
                "比特流不足: 需要 {n} 位, 剩余 {} 位",
                self.bits_left()
            )));
        }

        let mut result: u32 = 0;
        let mut remaining = n;
        while remaining > 0 {
            let available = 8 - self.bit_pos as u32;
            let take = remaining.min(available);
            let shift = available - take;
            let mask = ((1u32 << take) - 1) as u8;
            let bits = (self.data[self.byte_pos] >> shift) & mask;
            result = (result << take) | u32::from(bits);

            self.bit_pos += take as u8;
            if self.bit_pos >= 8 {
                self.bit_pos = 0;
                self.byte_pos += 1;
            }
            remaining -= take;
        }
        Ok(result)
    }

    pub fn read_bit(&mut self) -> AvResult<bool> {
        Ok(self.read_bits(1)? == 1)
    }

    pub fn skip_bits(&mut self, n: u32) -> AvResult<()> {
        if n as usize > self.bits_left() {
            return Err(AvError::InvalidData("比特流不足, 无法跳过".into()));
        }
        let total = self.bit_pos as u32 + n;
        self.byte_pos += (total / 8) as usize;
        self.bit_pos = (total % 8) as u8;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_bits_跨字节() {
        let data = [0b1011_0001, 0b0101_0101];
        let mut br = BitReader::new(&data);
        assert_eq!(br.read_bits(3).unwrap(), 0b101);
        assert_eq!(br.read_bits(9).unwrap(), 0b1_0001_0101);
        assert_eq!(br.bits_left(), 4);
        assert!(!br.read_bit().unwrap());
    }

    #[test]
    fn test_读取超出剩余位数() {
        let data = [0xFF];
        let mut br = BitReader::new(&data);
        br.skip_bits(6).unwrap();
        assert!(br.read_bits(3).is_err());
        assert_eq!(br.read_bits(2).unwrap(), 0b11);
    }
}
