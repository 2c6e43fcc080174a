//! MP4 采样表 (Sample Table) 解析与采样索引构建.
//!
//! 采样表 (stbl) 包含了从采样编号到文件偏移的完整映射, 由多个子 box 共同组成:
//! - stts: 解码时间→采样编号映射 (delta 编码)
//! - ctts: 合成时间偏移 (B帧重排序)
//! - stsc: 采样→块映射 (Run-Length 编码)
//! - stsz/stz2: 每个采样的字节大小
//! - stco/co64: 每个块的文件偏移
//! - stss: 同步采样 (关键帧) 索引列表
//!
//! 其余 stbl 子 box (cslg/stsh/padb/stdp/sdtp/subs/saiz/saio/sbgp/sgpd) 只做解析保存,
//! 不参与索引构建.

use avkit_core::{AvError, AvResult, ByteReader};

use super::boxes::{FourCc, FullBox};
use super::track::SampleIndexEntry;

/// 时间→采样条目 (stts)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SttsEntry {
    /// 采样计数
    pub count: u32,
    /// 每采样的时间增量
    pub delta: u32,
}

/// 合成时间偏移条目 (ctts)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CttsEntry {
    pub count: u32,
    pub offset: i32,
}

/// 采样→块条目 (stsc)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StscEntry {
    /// 起始块号 (1-based)
    pub first_chunk: u32,
    /// 每块的采样数
    pub samples_per_chunk: u32,
    /// 采样描述索引 (1-based)
    pub sample_description_index: u32,
}

/// 采样大小表 (stsz/stz2 归一化后)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SampleSizes {
    /// 统一采样大小, 非 0 时忽略 `sizes`
    pub fixed_size: u32,
    /// 采样总数
    pub sample_count: u32,
    /// 逐采样大小
    pub sizes: Vec<u32>,
}

impl SampleSizes {
    /// 第 `index` 个采样 (0-based) 的大小
    pub fn size_of(&self, index: usize) -> AvResult<u32> {
        if self.fixed_size != 0 {
            return Ok(self.fixed_size);
        }
        self.sizes.get(index).copied().ok_or_else(|| {
            AvError::InvalidData(format!(
                "采样 #{index} 超出采样大小表范围 ({} 项)",
                self.sizes.len()
            ))
        })
    }
}

/// 条目数合法性检查, 防止损坏的计数导致超大分配
fn check_entry_count(
    name: &str,
    count: usize,
    r: &ByteReader<'_>,
    entry_len: usize,
) -> AvResult<()> {
    if count > r.remaining() / entry_len {
        return Err(AvError::InvalidData(format!(
            "{name}: 条目数 {count} 超出 Box 大小 (剩余 {} 字节)",
            r.remaining()
        )));
    }
    Ok(())
}

// ========================
// 参与索引构建的表
// ========================

/// 解析 stts
pub fn parse_stts(payload: &[u8]) -> AvResult<Vec<SttsEntry>> {
    let mut r = ByteReader::new(payload);
    FullBox::read(&mut r)?;
    let count = r.read_u32()? as usize;
    check_entry_count("stts", count, &r, 8)?;
    let mut entries = Vec::with_capacity(count);
    for _ in 0..count {
        entries.push(SttsEntry {
            count: r.read_u32()?,
            delta: r.read_u32()?,
        });
    }
    Ok(entries)
}

/// 解析 ctts
///
/// 版本 0 规定为无符号偏移, 但常见写入器会写入负值, 两个版本统一按有符号读取.
pub fn parse_ctts(payload: &[u8]) -> AvResult<Vec<CttsEntry>> {
    let mut r = ByteReader::new(payload);
    FullBox::read(&mut r)?;
    let count = r.read_u32()? as usize;
    check_entry_count("ctts", count, &r, 8)?;
    let mut entries = Vec::with_capacity(count);
    for _ in 0..count {
        entries.push(CttsEntry {
            count: r.read_u32()?,
            offset: r.read_i32()?,
        });
    }
    Ok(entries)
}

/// 解析 stsc
pub fn parse_stsc(payload: &[u8]) -> AvResult<Vec<StscEntry>> {
    let mut r = ByteReader::new(payload);
    FullBox::read(&mut r)?;
    let count = r.read_u32()? as usize;
    check_entry_count("stsc", count, &r, 12)?;
    let mut entries = Vec::with_capacity(count);
    for _ in 0..count {
        entries.push(StscEntry {
            first_chunk: r.read_u32()?,
            samples_per_chunk: r.read_u32()?,
            sample_description_index: r.read_u32()?,
        });
    }
    Ok(entries)
}

/// 解析 stsz
pub fn parse_stsz(payload: &[u8]) -> AvResult<SampleSizes> {
    let mut r = ByteReader::new(payload);
    FullBox::read(&mut r)?;
    let fixed_size = r.read_u32()?;
    let sample_count = r.read_u32()?;
    let mut sizes = Vec::new();
    if fixed_size == 0 {
        check_entry_count("stsz", sample_count as usize, &r, 4)?;
        sizes.reserve(sample_count as usize);
        for _ in 0..sample_count {
            sizes.push(r.read_u32()?);
        }
    }
    Ok(SampleSizes {
        fixed_size,
        sample_count,
        sizes,
    })
}

/// 解析 stz2 (紧凑采样大小表, 字段宽 4/8/16 位)
pub fn parse_stz2(payload: &[u8]) -> AvResult<SampleSizes> {
    let mut r = ByteReader::new(payload);
    FullBox::read(&mut r)?;
    r.skip(3)?;
    let field_size = r.read_u8()?;
    let sample_count = r.read_u32()?;
    let count = sample_count as usize;

    let needed = match field_size {
        4 => count.div_ceil(2),
        8 => count,
        16 => count.saturating_mul(2),
        other => {
            return Err(AvError::InvalidData(format!(
                "stz2: 非法字段宽度 {other}"
            )));
        }
    };
    let packed = r.read_bytes(needed).map_err(|_| {
        AvError::InvalidData(format!("stz2: {count} 个采样需要 {needed} 字节, 数据不足"))
    })?;

    let sizes = match field_size {
        4 => (0..count)
            .map(|i| {
                let b = packed[i / 2];
                u32::from(if i % 2 == 0 { b >> 4 } else { b & 0x0F })
            })
            .collect(),
        8 => packed.iter().map(|&b| u32::from(b)).collect(),
        _ => packed
            .chunks_exact(2)
            .map(|c| u32::from(u16::from_be_bytes([c[0], c[1]])))
            .collect(),
    };
    Ok(SampleSizes {
        fixed_size: 0,
        sample_count,
        sizes,
    })
}

/// 解析 stco / co64, 统一为 64 位偏移
pub fn parse_chunk_offsets(payload: &[u8], is_64bit: bool) -> AvResult<Vec<u64>> {
    let mut r = ByteReader::new(payload);
    FullBox::read(&mut r)?;
    let count = r.read_u32()? as usize;
    let entry_len = if is_64bit { 8 } else { 4 };
    check_entry_count(if is_64bit { "co64" } else { "stco" }, count, &r, entry_len)?;
    let mut offsets = Vec::with_capacity(count);
    for _ in 0..count {
        let offset = if is_64bit {
            r.read_u64()?
        } else {
            u64::from(r.read_u32()?)
        };
        offsets.push(offset);
    }
    Ok(offsets)
}

/// 解析 stss (1-based 采样编号)
pub fn parse_stss(payload: &[u8]) -> AvResult<Vec<u32>> {
    let mut r = ByteReader::new(payload);
    FullBox::read(&mut r)?;
    let count = r.read_u32()? as usize;
    check_entry_count("stss", count, &r, 4)?;
    let mut samples = Vec::with_capacity(count);
    for _ in 0..count {
        samples.push(r.read_u32()?);
    }
    Ok(samples)
}

// ========================
// 辅助表
// ========================

/// cslg: 合成与解码时间关系
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CslgBox {
    pub composition_to_dts_shift: i64,
    pub least_decode_to_display_delta: i64,
    pub greatest_decode_to_display_delta: i64,
    pub composition_start_time: i64,
    pub composition_end_time: i64,
}

/// subs 中一个采样的子采样信息
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubsEntry {
    pub sample_delta: u32,
    pub subsamples: Vec<Subsample>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Subsample {
    pub size: u32,
    pub priority: u8,
    pub discardable: bool,
    pub codec_specific_parameters: u32,
}

/// saiz: 采样辅助信息大小
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaizBox {
    pub aux_info_type: Option<(FourCc, u32)>,
    pub default_sample_info_size: u8,
    pub sample_count: u32,
    pub sample_info_sizes: Vec<u8>,
}

/// saio: 采样辅助信息偏移
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaioBox {
    pub aux_info_type: Option<(FourCc, u32)>,
    pub offsets: Vec<u64>,
}

/// sbgp: 采样→分组映射
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SbgpBox {
    pub grouping_type: FourCc,
    pub grouping_type_parameter: Option<u32>,
    /// (sample_count, group_description_index)
    pub entries: Vec<(u32, u32)>,
}

/// sgpd: 分组描述
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SgpdBox {
    pub grouping_type: FourCc,
    pub default_sample_description_index: Option<u32>,
    /// 每个分组描述的原始字节
    pub entries: Vec<Vec<u8>>,
}

/// 不参与索引构建的 stbl 子表
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuxiliaryTable {
    Cslg(CslgBox),
    /// (shadowed_sample_number, sync_sample_number)
    Stsh(Vec<(u32, u32)>),
    /// 每采样一个字节的依赖标志
    Sdtp(Vec<u8>),
    /// 每两个采样一个字节的填充位
    Padb { sample_count: u32, pad_bits: Vec<u8> },
    /// 采样降级优先级
    Stdp(Vec<u16>),
    Subs(Vec<SubsEntry>),
    Saiz(SaizBox),
    Saio(SaioBox),
    Sbgp(SbgpBox),
    Sgpd(SgpdBox),
}

fn read_aux_info_type(r: &mut ByteReader<'_>, full: FullBox) -> AvResult<Option<(FourCc, u32)>> {
    if full.flags & 1 == 0 {
        return Ok(None);
    }
    Ok(Some((FourCc(r.read_fourcc()?), r.read_u32()?)))
}

impl AuxiliaryTable {
    /// 按 FourCC 解析辅助表
    pub fn parse(fourcc: &[u8; 4], payload: &[u8]) -> AvResult<Self> {
        let mut r = ByteReader::new(payload);
        let full = FullBox::read(&mut r)?;
        let table = match fourcc {
            b"cslg" => {
                let mut field = || -> AvResult<i64> {
                    if full.version == 0 {
                        Ok(i64::from(r.read_i32()?))
                    } else {
                        r.read_i64()
                    }
                };
                Self::Cslg(CslgBox {
                    composition_to_dts_shift: field()?,
                    least_decode_to_display_delta: field()?,
                    greatest_decode_to_display_delta: field()?,
                    composition_start_time: field()?,
                    composition_end_time: field()?,
                })
            }
            b"stsh" => {
                let count = r.read_u32()? as usize;
                check_entry_count("stsh", count, &r, 8)?;
                let mut entries = Vec::with_capacity(count);
                for _ in 0..count {
                    entries.push((r.read_u32()?, r.read_u32()?));
                }
                Self::Stsh(entries)
            }
            b"sdtp" => Self::Sdtp(r.rest().to_vec()),
            b"padb" => {
                let sample_count = r.read_u32()?;
                let pad_bits = r.read_bytes((sample_count as usize).div_ceil(2))?.to_vec();
                Self::Padb {
                    sample_count,
                    pad_bits,
                }
            }
            b"stdp" => Self::Stdp(
                r.rest()
                    .chunks_exact(2)
                    .map(|c| u16::from_be_bytes([c[0], c[1]]))
                    .collect(),
            ),
            b"subs" => {
                let count = r.read_u32()? as usize;
                check_entry_count("subs", count, &r, 6)?;
                let mut entries = Vec::with_capacity(count);
                for _ in 0..count {
                    let sample_delta = r.read_u32()?;
                    let n = r.read_u16()? as usize;
                    let mut subsamples = Vec::with_capacity(n);
                    for _ in 0..n {
                        let size = if full.version == 1 {
                            r.read_u32()?
                        } else {
                            u32::from(r.read_u16()?)
                        };
                        subsamples.push(Subsample {
                            size,
                            priority: r.read_u8()?,
                            discardable: r.read_u8()? != 0,
                            codec_specific_parameters: r.read_u32()?,
                        });
                    }
                    entries.push(SubsEntry {
                        sample_delta,
                        subsamples,
                    });
                }
                Self::Subs(entries)
            }
            b"saiz" => {
                let aux_info_type = read_aux_info_type(&mut r, full)?;
                let default_sample_info_size = r.read_u8()?;
                let sample_count = r.read_u32()?;
                let sample_info_sizes = if default_sample_info_size == 0 {
                    r.read_bytes(sample_count as usize)?.to_vec()
                } else {
                    Vec::new()
                };
                Self::Saiz(SaizBox {
                    aux_info_type,
                    default_sample_info_size,
                    sample_count,
                    sample_info_sizes,
                })
            }
            b"saio" => {
                let aux_info_type = read_aux_info_type(&mut r, full)?;
                let count = r.read_u32()? as usize;
                let entry_len = if full.version == 0 { 4 } else { 8 };
                check_entry_count("saio", count, &r, entry_len)?;
                let mut offsets = Vec::with_capacity(count);
                for _ in 0..count {
                    offsets.push(if full.version == 0 {
                        u64::from(r.read_u32()?)
                    } else {
                        r.read_u64()?
                    });
                }
                Self::Saio(SaioBox {
                    aux_info_type,
                    offsets,
                })
            }
            b"sbgp" => {
                let grouping_type = FourCc(r.read_fourcc()?);
                let grouping_type_parameter = if full.version == 1 {
                    Some(r.read_u32()?)
                } else {
                    None
                };
                let count = r.read_u32()? as usize;
                check_entry_count("sbgp", count, &r, 8)?;
                let mut entries = Vec::with_capacity(count);
                for _ in 0..count {
                    entries.push((r.read_u32()?, r.read_u32()?));
                }
                Self::Sbgp(SbgpBox {
                    grouping_type,
                    grouping_type_parameter,
                    entries,
                })
            }
            b"sgpd" => {
                let grouping_type = FourCc(r.read_fourcc()?);
                let default_length = if full.version == 1 { r.read_u32()? } else { 0 };
                let default_sample_description_index = if full.version >= 2 {
                    Some(r.read_u32()?)
                } else {
                    None
                };
                let count = r.read_u32()? as usize;
                let mut entries = Vec::with_capacity(count.min(r.remaining()));
                for _ in 0..count {
                    let len = match (full.version, default_length) {
                        (1, 0) => r.read_u32()? as usize,
                        (1, n) => n as usize,
                        // 版本 0 无法得知条目长度, 剩余数据作为一个条目
                        _ => r.remaining(),
                    };
                    entries.push(r.read_bytes(len)?.to_vec());
                    if r.is_empty() {
                        break;
                    }
                }
                Self::Sgpd(SgpdBox {
                    grouping_type,
                    default_sample_description_index,
                    entries,
                })
            }
            other => {
                return Err(AvError::InvalidArgument(format!(
                    "'{}' 不是辅助采样表",
                    FourCc(*other)
                )));
            }
        };
        Ok(table)
    }
}

// ========================
// 采样索引构建
// ========================

/// 构建采样索引所需的表
pub struct IndexTables<'a> {
    pub stts: &'a [SttsEntry],
    pub ctts: Option<&'a [CttsEntry]>,
    pub stsc: &'a [StscEntry],
    pub chunk_offsets: &'a [u64],
    pub sizes: &'a SampleSizes,
    /// 升序去重的同步采样编号 (1-based), None 表示全部为关键帧
    pub sync_samples: Option<&'a [u32]>,
    /// 输入总长度, 每个采样都必须落在其中
    pub data_len: u64,
}

impl IndexTables<'_> {
    /// 索引预分配容量
    ///
    /// 固定大小的 stsz 不带逐项表, 声明的采样数不受 Box 大小约束,
    /// 因此同时以 stsc 覆盖的采样数和输入长度能容纳的采样数为上限.
    fn capacity_hint(&self) -> usize {
        let chunk_end = self.chunk_offsets.len() as u64 + 1;
        let covered = self
            .stsc
            .iter()
            .enumerate()
            .map(|(i, run)| {
                let next = self
                    .stsc
                    .get(i + 1)
                    .map_or(chunk_end, |n| u64::from(n.first_chunk));
                next.saturating_sub(u64::from(run.first_chunk))
                    .saturating_mul(u64::from(run.samples_per_chunk))
            })
            .fold(0u64, u64::saturating_add);
        let fits = match self.sizes.fixed_size {
            0 => self.sizes.sizes.len() as u64,
            fixed => self.data_len / u64::from(fixed),
        };
        let hint = u64::from(self.sizes.sample_count).min(covered).min(fits);
        usize::try_from(hint).unwrap_or(0)
    }
}

/// stts 游标: 按顺序消费, 不回看
struct TimeCursor<'a> {
    runs: &'a [SttsEntry],
    run: usize,
    used: u32,
    next_ts: i64,
    last_delta: u32,
}

impl<'a> TimeCursor<'a> {
    fn new(runs: &'a [SttsEntry]) -> Self {
        Self {
            runs,
            run: 0,
            used: 0,
            next_ts: 0,
            last_delta: 0,
        }
    }

    /// 返回当前采样的解码时间, 然后前进一个增量
    fn next(&mut self) -> i64 {
        while self.run < self.runs.len() && self.used >= self.runs[self.run].count {
            self.run += 1;
            self.used = 0;
        }
        if let Some(entry) = self.runs.get(self.run) {
            self.used += 1;
            self.last_delta = entry.delta;
        }
        // 超出 stts 覆盖范围的采样沿用最后一个增量
        let ts = self.next_ts;
        self.next_ts = self.next_ts.saturating_add(i64::from(self.last_delta));
        ts
    }
}

/// ctts 游标, 超出覆盖范围的采样偏移为 0
struct OffsetCursor<'a> {
    runs: &'a [CttsEntry],
    run: usize,
    used: u32,
}

impl<'a> OffsetCursor<'a> {
    fn next(&mut self) -> i64 {
        while self.run < self.runs.len() && self.used >= self.runs[self.run].count {
            self.run += 1;
            self.used = 0;
        }
        match self.runs.get(self.run) {
            Some(entry) => {
                self.used += 1;
                i64::from(entry.offset)
            }
            None => 0,
        }
    }
}

/// 由 stsc/stco/stsz/stts/stss (及可选的 ctts) 展开每个采样的索引
///
/// 遍历 stsc 的每个 run, 最后一个 run 一直延伸到最后一个块 (含);
/// 块内采样的位置从块偏移开始逐个累加采样大小.
pub fn build_sample_index(tables: &IndexTables<'_>) -> AvResult<Vec<SampleIndexEntry>> {
    let sample_count = tables.sizes.sample_count as usize;
    let chunk_count = tables.chunk_offsets.len();

    let mut entries = Vec::with_capacity(tables.capacity_hint());
    let mut time = TimeCursor::new(tables.stts);
    let mut composition = tables.ctts.map(|runs| OffsetCursor {
        runs,
        run: 0,
        used: 0,
    });
    let mut sync_pos = 0usize;

    for (i, run) in tables.stsc.iter().enumerate() {
        if run.first_chunk == 0 {
            return Err(AvError::InvalidData(format!(
                "stsc 第 {i} 项的起始块号为 0"
            )));
        }
        let last_chunk = match tables.stsc.get(i + 1) {
            Some(next) if next.first_chunk <= run.first_chunk => {
                return Err(AvError::InvalidData(format!(
                    "stsc 起始块号未递增: 第 {i} 项 {} → 第 {} 项 {}",
                    run.first_chunk,
                    i + 1,
                    next.first_chunk
                )));
            }
            Some(next) => next.first_chunk - 1,
            None => chunk_count as u32,
        };
        if last_chunk as usize > chunk_count || run.first_chunk as usize > chunk_count + 1 {
            return Err(AvError::InvalidData(format!(
                "stsc 引用的块 {}..={} 超出块偏移表范围 ({chunk_count} 块)",
                run.first_chunk, last_chunk
            )));
        }

        for chunk in run.first_chunk..=last_chunk {
            let mut pos = tables.chunk_offsets[(chunk - 1) as usize];
            for _ in 0..run.samples_per_chunk {
                let index = entries.len();
                if index >= sample_count {
                    return Err(AvError::InvalidData(format!(
                        "stsc 描述的采样数超过采样大小表中的 {sample_count} 个"
                    )));
                }
                let size = tables.sizes.size_of(index)?;
                let timestamp = time.next();
                let cts_offset = composition.as_mut().map_or(0, |c| c.next());
                let key_frame = match tables.sync_samples {
                    None => true,
                    Some(sync) => {
                        let number = index as u32 + 1;
                        while sync_pos < sync.len() && sync[sync_pos] < number {
                            sync_pos += 1;
                        }
                        sync.get(sync_pos) == Some(&number)
                    }
                };

                let end = pos
                    .checked_add(u64::from(size))
                    .filter(|&end| end <= tables.data_len)
                    .ok_or_else(|| {
                        AvError::InvalidData(format!(
                            "采样 #{index} (块 {chunk}, 偏移 {pos}, {size} 字节) 超出输入 ({} 字节)",
                            tables.data_len
                        ))
                    })?;

                entries.push(SampleIndexEntry {
                    pos,
                    timestamp,
                    cts_offset,
                    size,
                    key_frame,
                });
                pos = end;
            }
        }
    }

    if entries.len() != sample_count {
        return Err(AvError::InvalidData(format!(
            "stsc/stco 只覆盖了 {} 个采样, 采样大小表声明了 {sample_count} 个",
            entries.len()
        )));
    }
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fullbox_payload(version: u8, body: &[u8]) -> Vec<u8> {
        let mut buf = vec![version, 0, 0, 0];
        buf.extend_from_slice(body);
        buf
    }

    fn u32s(values: &[u32]) -> Vec<u8> {
        values.iter().flat_map(|v| v.to_be_bytes()).collect()
    }

    #[test]
    fn test_stts_解析() {
        let payload = fullbox_payload(0, &u32s(&[2, 10, 1000, 5, 500]));
        let stts = parse_stts(&payload).unwrap();
        assert_eq!(
            stts,
            vec![
                SttsEntry { count: 10, delta: 1000 },
                SttsEntry { count: 5, delta: 500 }
            ]
        );
    }

    #[test]
    fn test_stts_条目数超出() {
        let payload = fullbox_payload(0, &u32s(&[1000, 1, 1]));
        assert!(matches!(parse_stts(&payload), Err(AvError::InvalidData(_))));
    }

    #[test]
    fn test_stsz_解析() {
        let payload = fullbox_payload(0, &u32s(&[0, 3, 100, 200, 300]));
        let sizes = parse_stsz(&payload).unwrap();
        assert_eq!(sizes.sample_count, 3);
        assert_eq!(sizes.size_of(1).unwrap(), 200);
        assert!(sizes.size_of(3).is_err());
    }

    #[test]
    fn test_stsz_统一大小() {
        let payload = fullbox_payload(0, &u32s(&[512, 100]));
        let sizes = parse_stsz(&payload).unwrap();
        assert_eq!(sizes.sample_count, 100);
        assert!(sizes.sizes.is_empty());
        assert_eq!(sizes.size_of(99).unwrap(), 512);
    }

    #[test]
    fn test_stz2_四位字段() {
        let mut body = vec![0, 0, 0, 4];
        body.extend_from_slice(&3u32.to_be_bytes());
        body.extend_from_slice(&[0x12, 0x30]);
        let sizes = parse_stz2(&fullbox_payload(0, &body)).unwrap();
        assert_eq!(sizes.sizes, vec![1, 2, 3]);
    }

    #[test]
    fn test_stz2_十六位字段() {
        let mut body = vec![0, 0, 0, 16];
        body.extend_from_slice(&2u32.to_be_bytes());
        body.extend_from_slice(&[0x01, 0x00, 0x00, 0x20]);
        let sizes = parse_stz2(&fullbox_payload(0, &body)).unwrap();
        assert_eq!(sizes.sizes, vec![256, 32]);
    }

    #[test]
    fn test_co64_解析() {
        let mut body = 2u32.to_be_bytes().to_vec();
        body.extend_from_slice(&0x1_0000_0000u64.to_be_bytes());
        body.extend_from_slice(&8u64.to_be_bytes());
        let offsets = parse_chunk_offsets(&fullbox_payload(0, &body), true).unwrap();
        assert_eq!(offsets, vec![0x1_0000_0000, 8]);
    }

    #[test]
    fn test_ctts_负偏移() {
        let mut body = 1u32.to_be_bytes().to_vec();
        body.extend_from_slice(&2u32.to_be_bytes());
        body.extend_from_slice(&(-512i32).to_be_bytes());
        let ctts = parse_ctts(&fullbox_payload(1, &body)).unwrap();
        assert_eq!(ctts, vec![CttsEntry { count: 2, offset: -512 }]);
    }

    #[test]
    fn test_辅助表_sbgp() {
        let mut body = b"roll".to_vec();
        body.extend_from_slice(&u32s(&[1, 10, 1]));
        let table = AuxiliaryTable::parse(b"sbgp", &fullbox_payload(0, &body)).unwrap();
        match table {
            AuxiliaryTable::Sbgp(sbgp) => {
                assert_eq!(sbgp.grouping_type, FourCc(*b"roll"));
                assert_eq!(sbgp.entries, vec![(10, 1)]);
            }
            other => panic!("期望 sbgp, 得到 {other:?}"),
        }
    }

    #[test]
    fn test_辅助表_sgpd_版本1() {
        let mut body = b"roll".to_vec();
        body.extend_from_slice(&2u32.to_be_bytes()); // default_length
        body.extend_from_slice(&2u32.to_be_bytes()); // entry_count
        body.extend_from_slice(&[0xFF, 0xFF, 0x00, 0x01]);
        let table = AuxiliaryTable::parse(b"sgpd", &fullbox_payload(1, &body)).unwrap();
        match table {
            AuxiliaryTable::Sgpd(sgpd) => {
                assert_eq!(sgpd.entries, vec![vec![0xFF, 0xFF], vec![0x00, 0x01]]);
            }
            other => panic!("期望 sgpd, 得到 {other:?}"),
        }
    }

    const DATA_LEN: u64 = 1 << 20;

    fn run(first_chunk: u32, samples_per_chunk: u32) -> StscEntry {
        StscEntry {
            first_chunk,
            samples_per_chunk,
            sample_description_index: 1,
        }
    }

    fn sizes(values: &[u32]) -> SampleSizes {
        SampleSizes {
            fixed_size: 0,
            sample_count: values.len() as u32,
            sizes: values.to_vec(),
        }
    }

    #[test]
    fn test_sample_to_chunk_展开() {
        // 块 1-2 每块 2 个采样, 块 3 起每块 1 个采样
        let stsc = [run(1, 2), run(3, 1)];
        let stts = [SttsEntry { count: 6, delta: 100 }];
        let chunk_offsets = [1000, 2000, 3000, 4000];
        let sizes = sizes(&[10, 20, 30, 40, 50, 60]);
        let index = build_sample_index(&IndexTables {
            stts: &stts,
            ctts: None,
            stsc: &stsc,
            chunk_offsets: &chunk_offsets,
            sizes: &sizes,
            sync_samples: None,
            data_len: DATA_LEN,
        })
        .unwrap();

        let positions: Vec<u64> = index.iter().map(|e| e.pos).collect();
        assert_eq!(positions, vec![1000, 1010, 2000, 2030, 3000, 4000]);
        let timestamps: Vec<i64> = index.iter().map(|e| e.timestamp).collect();
        assert_eq!(timestamps, vec![0, 100, 200, 300, 400, 500]);
        assert!(index.iter().all(|e| e.key_frame));
    }

    #[test]
    fn test_同步采样标记() {
        let stsc = [run(1, 5)];
        let stts = [SttsEntry { count: 5, delta: 1 }];
        let sizes = SampleSizes { fixed_size: 4, sample_count: 5, sizes: Vec::new() };
        let sync = [1, 4];
        let index = build_sample_index(&IndexTables {
            stts: &stts,
            ctts: None,
            stsc: &stsc,
            chunk_offsets: &[0],
            sizes: &sizes,
            sync_samples: Some(&sync),
            data_len: DATA_LEN,
        })
        .unwrap();
        let keys: Vec<bool> = index.iter().map(|e| e.key_frame).collect();
        assert_eq!(keys, vec![true, false, false, true, false]);
        assert_eq!(index[4].pos, 16);
    }

    #[test]
    fn test_stts_不足时沿用最后增量_与_ctts() {
        let stsc = [run(1, 4)];
        let stts = [SttsEntry { count: 2, delta: 512 }];
        let ctts = [CttsEntry { count: 1, offset: 1024 }];
        let sizes = sizes(&[1, 1, 1, 1]);
        let index = build_sample_index(&IndexTables {
            stts: &stts,
            ctts: Some(&ctts),
            stsc: &stsc,
            chunk_offsets: &[0],
            sizes: &sizes,
            sync_samples: None,
            data_len: DATA_LEN,
        })
        .unwrap();
        let timestamps: Vec<i64> = index.iter().map(|e| e.timestamp).collect();
        assert_eq!(timestamps, vec![0, 512, 1024, 1536]);
        assert_eq!(index[0].cts_offset, 1024);
        assert_eq!(index[1].cts_offset, 0);
    }

    #[test]
    fn test_块号越界() {
        let stsc = [run(3, 1)];
        let sizes = sizes(&[1]);
        let result = build_sample_index(&IndexTables {
            stts: &[],
            ctts: None,
            stsc: &stsc,
            chunk_offsets: &[0],
            sizes: &sizes,
            sync_samples: None,
            data_len: DATA_LEN,
        });
        assert!(matches!(result, Err(AvError::InvalidData(_))));
    }

    #[test]
    fn test_采样数与块覆盖不一致() {
        let stsc = [run(1, 2)];
        let stts = [SttsEntry { count: 3, delta: 1 }];
        // 2 个块 × 2 = 4 个采样, 但 stsz 只有 3 个
        let too_few = sizes(&[1, 1, 1]);
        let result = build_sample_index(&IndexTables {
            stts: &stts,
            ctts: None,
            stsc: &stsc,
            chunk_offsets: &[0, 100],
            sizes: &too_few,
            sync_samples: None,
            data_len: DATA_LEN,
        });
        assert!(result.is_err());

        // 1 个块 × 2 = 2 个采样, 但 stsz 有 3 个
        let result = build_sample_index(&IndexTables {
            stts: &stts,
            ctts: None,
            stsc: &stsc,
            chunk_offsets: &[0],
            sizes: &too_few,
            sync_samples: None,
            data_len: DATA_LEN,
        });
        assert!(result.is_err());
    }

    #[test]
    fn test_stsc_起始块未递增() {
        let stsc = [run(2, 1), run(2, 1)];
        let sizes = sizes(&[1, 1]);
        let result = build_sample_index(&IndexTables {
            stts: &[],
            ctts: None,
            stsc: &stsc,
            chunk_offsets: &[0, 10, 20],
            sizes: &sizes,
            sync_samples: None,
            data_len: DATA_LEN,
        });
        assert!(matches!(result, Err(AvError::InvalidData(_))));
    }

    #[test]
    fn test_固定大小表声明超大采样数() {
        // 12 字节的 stsz 声明 0xFFFFFFFF 个 1 字节采样
        let fixed = parse_stsz(&[0, 0, 0, 0, 0, 0, 0, 1, 0xFF, 0xFF, 0xFF, 0xFF]).unwrap();
        assert_eq!(fixed.sample_count, u32::MAX);
        let stsc = [run(1, 1)];
        let result = build_sample_index(&IndexTables {
            stts: &[],
            ctts: None,
            stsc: &stsc,
            chunk_offsets: &[0],
            sizes: &fixed,
            sync_samples: None,
            data_len: DATA_LEN,
        });
        assert!(matches!(result, Err(AvError::InvalidData(_))));

        // 单个块声明同样多的采样, 越过输入末尾时停止
        let stsc = [run(1, u32::MAX)];
        let result = build_sample_index(&IndexTables {
            stts: &[],
            ctts: None,
            stsc: &stsc,
            chunk_offsets: &[0],
            sizes: &fixed,
            sync_samples: None,
            data_len: 64,
        });
        assert!(matches!(result, Err(AvError::InvalidData(_))));
    }

    #[test]
    fn test_采样超出输入末尾() {
        let stsc = [run(1, 2)];
        let stts = [SttsEntry { count: 2, delta: 1 }];
        let oversized = sizes(&[8, u32::MAX]);
        let err = build_sample_index(&IndexTables {
            stts: &stts,
            ctts: None,
            stsc: &stsc,
            chunk_offsets: &[100],
            sizes: &oversized,
            sync_samples: None,
            data_len: 4096,
        })
        .unwrap_err();
        assert!(matches!(err, AvError::InvalidData(_)));
        assert!(err.to_string().contains("#1"));

        // 恰好到达末尾是合法的
        let exact = sizes(&[8, 8]);
        let index = build_sample_index(&IndexTables {
            stts: &stts,
            ctts: None,
            stsc: &stsc,
            chunk_offsets: &[100],
            sizes: &exact,
            sync_samples: None,
            data_len: 116,
        })
        .unwrap();
        assert_eq!(index[1].pos, 108);
    }
}
