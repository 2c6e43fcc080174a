//! MP4 Box 类型与 Box 树.
//!
//! `BoxKind` 是解析器能识别的全部 Box 类型的封闭集合, `Mp4Box` 是解析后的树节点.
//! 头部类 Box (ftyp/mvhd/tkhd/mdhd/hdlr/elst 等) 的结构体与解析函数也放在这里,
//! 采样表类 Box 见 `sample_table`, 采样描述见 `stsd`.

use std::fmt;

use avkit_core::{AvResult, ByteReader};

/// 4 字节类型码
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct FourCc(pub [u8; 4]);

impl FourCc {
    pub fn as_bytes(&self) -> &[u8; 4] {
        &self.0
    }
}

impl fmt::Display for FourCc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for &b in &self.0 {
            let c = if b.is_ascii_graphic() || b == b' ' {
                b as char
            } else {
                '?'
            };
            write!(f, "{c}")?;
        }
        Ok(())
    }
}

impl fmt::Debug for FourCc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FourCc(\"{self}\")")
    }
}

/// 可识别的 Box 类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BoxKind {
    // ========================
    // 文件顶层
    // ========================
    Ftyp,
    Free,
    Skip,
    Mdat,
    Moov,
    Mvhd,
    Udta,

    // ========================
    // 轨道
    // ========================
    Trak,
    Tkhd,
    /// 轨道引用容器
    Tref,
    /// tref 内的引用类型 (hint/cdsc/font/hind/vdep/vplx/subt/chap)
    TrackReference,
    /// 轨道分组容器
    Trgr,
    Msrc,
    Edts,
    Elst,
    Mdia,
    Mdhd,
    Hdlr,
    Elng,
    Minf,
    Vmhd,
    Smhd,
    Hmhd,
    Sthd,
    Nmhd,
    Dinf,
    Dref,
    Url,
    Urn,

    // ========================
    // 采样表
    // ========================
    Stbl,
    Stsd,
    Stts,
    Ctts,
    Cslg,
    Stsc,
    Stsz,
    Stz2,
    Stco,
    Co64,
    Stss,
    Stsh,
    Padb,
    Stdp,
    Sdtp,
    Subs,
    Saiz,
    Saio,
    Sbgp,
    Sgpd,
}

impl BoxKind {
    /// 从 FourCC 识别, 未知类型返回 None
    pub fn from_fourcc(fourcc: &FourCc) -> Option<Self> {
        let kind = match &fourcc.0 {
            b"ftyp" => Self::Ftyp,
            b"free" => Self::Free,
            b"skip" => Self::Skip,
            b"mdat" => Self::Mdat,
            b"moov" => Self::Moov,
            b"mvhd" => Self::Mvhd,
            b"udta" => Self::Udta,
            b"trak" => Self::Trak,
            b"tkhd" => Self::Tkhd,
            b"tref" => Self::Tref,
            b"hint" | b"cdsc" | b"font" | b"hind" | b"vdep" | b"vplx" | b"subt" | b"chap" => {
                Self::TrackReference
            }
            b"trgr" => Self::Trgr,
            b"msrc" => Self::Msrc,
            b"edts" => Self::Edts,
            b"elst" => Self::Elst,
            b"mdia" => Self::Mdia,
            b"mdhd" => Self::Mdhd,
            b"hdlr" => Self::Hdlr,
            b"elng" => Self::Elng,
            b"minf" => Self::Minf,
            b"vmhd" => Self::Vmhd,
            b"smhd" => Self::Smhd,
            b"hmhd" => Self::Hmhd,
            b"sthd" => Self::Sthd,
            b"nmhd" => Self::Nmhd,
            b"dinf" => Self::Dinf,
            b"dref" => Self::Dref,
            b"url " => Self::Url,
            b"urn " => Self::Urn,
            b"stbl" => Self::Stbl,
            b"stsd" => Self::Stsd,
            b"stts" => Self::Stts,
            b"ctts" => Self::Ctts,
            b"cslg" => Self::Cslg,
            b"stsc" => Self::Stsc,
            b"stsz" => Self::Stsz,
            b"stz2" => Self::Stz2,
            b"stco" => Self::Stco,
            b"co64" => Self::Co64,
            b"stss" => Self::Stss,
            b"stsh" => Self::Stsh,
            b"padb" => Self::Padb,
            b"stdp" => Self::Stdp,
            b"sdtp" => Self::Sdtp,
            b"subs" => Self::Subs,
            b"saiz" => Self::Saiz,
            b"saio" => Self::Saio,
            b"sbgp" => Self::Sbgp,
            b"sgpd" => Self::Sgpd,
            _ => return None,
        };
        Some(kind)
    }

    /// 是否为容器 (负载中包含子 Box)
    pub fn is_container(&self) -> bool {
        matches!(
            self,
            Self::Moov
                | Self::Trak
                | Self::Tref
                | Self::Trgr
                | Self::Edts
                | Self::Mdia
                | Self::Minf
                | Self::Dinf
                | Self::Dref
                | Self::Stbl
        )
    }

    /// 解析失败时是否必须中止打开
    ///
    /// moov/trak/mdia/minf/stbl 链以及构建采样索引要用到的头部和表属于关键 Box,
    /// 其余 Box 出错时只记录警告.
    pub fn is_critical(&self) -> bool {
        matches!(
            self,
            Self::Moov
                | Self::Mvhd
                | Self::Trak
                | Self::Tkhd
                | Self::Mdia
                | Self::Mdhd
                | Self::Hdlr
                | Self::Minf
                | Self::Stbl
                | Self::Stsd
                | Self::Stts
                | Self::Ctts
                | Self::Stsc
                | Self::Stsz
                | Self::Stz2
                | Self::Stco
                | Self::Co64
                | Self::Stss
        )
    }
}

/// FullBox 的 version 与 flags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FullBox {
    pub version: u8,
    pub flags: u32,
}

impl FullBox {
    pub fn read(r: &mut ByteReader<'_>) -> AvResult<Self> {
        let (version, flags) = r.read_version_flags()?;
        Ok(Self { version, flags })
    }
}

/// 采样表类 Box 在树中的摘要 (表内容归属轨道)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableInfo {
    pub full: FullBox,
    pub entry_count: usize,
}

/// Box 解析结果
#[derive(Debug, Clone, PartialEq)]
pub enum BoxData {
    /// 虚拟根节点
    File,
    /// 纯容器
    Container,
    Ftyp(FtypBox),
    /// free/skip 占位
    Free,
    /// 媒体数据, 记录负载位置而不复制
    Mdat { data_offset: u64, data_len: u64 },
    Mvhd(MvhdBox),
    /// 用户数据, 内容不解析
    Udta,
    Tkhd(TkhdBox),
    TrackReference { track_ids: Vec<u32> },
    TrackGroup { full: FullBox, track_group_id: u32 },
    Elst(ElstBox),
    Mdhd(MdhdBox),
    Hdlr(HdlrBox),
    Elng { full: FullBox, language: String },
    MediaInfoHeader(MediaInfoHeader),
    Dref { full: FullBox, entry_count: u32 },
    DataEntry(DataEntry),
    /// 采样描述摘要
    SampleDescription { full: FullBox, formats: Vec<FourCc> },
    /// 参与构建索引的采样表
    Table(TableInfo),
    /// 其他辅助采样表
    Auxiliary(super::sample_table::AuxiliaryTable),
}

/// Box 树节点
#[derive(Debug, Clone, PartialEq)]
pub struct Mp4Box {
    pub fourcc: FourCc,
    /// Box 起始位置 (文件绝对偏移)
    pub offset: u64,
    /// Box 总大小 (含头部)
    pub size: u64,
    pub data: BoxData,
    pub children: Vec<Mp4Box>,
}

impl Mp4Box {
    /// 创建虚拟根节点
    pub fn root(size: u64) -> Self {
        Self {
            fourcc: FourCc(*b"root"),
            offset: 0,
            size,
            data: BoxData::File,
            children: Vec::new(),
        }
    }

    /// 第一个指定类型的子节点
    pub fn child(&self, fourcc: &[u8; 4]) -> Option<&Mp4Box> {
        self.children.iter().find(|c| &c.fourcc.0 == fourcc)
    }

    /// 按路径查找节点, 每一级取第一个匹配的子节点
    pub fn find(&self, path: &[&[u8; 4]]) -> Option<&Mp4Box> {
        path.iter().try_fold(self, |node, fourcc| node.child(fourcc))
    }

    /// 子树中的节点总数 (不含自身)
    pub fn descendant_count(&self) -> usize {
        self.children
            .iter()
            .map(|c| 1 + c.descendant_count())
            .sum()
    }
}

/// 读取以 NUL 结尾 (或直到末尾) 的字符串
pub(crate) fn read_c_string(bytes: &[u8]) -> String {
    let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
    String::from_utf8_lossy(&bytes[..end]).into_owned()
}

// ========================
// 文件与影片头
// ========================

/// ftyp Box 数据
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FtypBox {
    /// 主品牌
    pub major_brand: FourCc,
    pub minor_version: u32,
    /// 兼容品牌列表
    pub compatible_brands: Vec<FourCc>,
}

impl FtypBox {
    pub fn parse(payload: &[u8]) -> AvResult<Self> {
        let mut r = ByteReader::new(payload);
        let major_brand = FourCc(r.read_fourcc()?);
        let minor_version = r.read_u32()?;
        let mut compatible_brands = Vec::with_capacity(r.remaining() / 4);
        while r.remaining() >= 4 {
            compatible_brands.push(FourCc(r.read_fourcc()?));
        }
        Ok(Self {
            major_brand,
            minor_version,
            compatible_brands,
        })
    }
}

/// mvhd Box 数据
#[derive(Debug, Clone, PartialEq)]
pub struct MvhdBox {
    pub full: FullBox,
    pub creation_time: u64,
    pub modification_time: u64,
    pub timescale: u32,
    pub duration: u64,
    /// 播放速率 (16.16 定点)
    pub rate: i32,
    /// 音量 (8.8 定点)
    pub volume: i16,
    pub matrix: [i32; 9],
    pub next_track_id: u32,
}

impl MvhdBox {
    pub fn parse(payload: &[u8]) -> AvResult<Self> {
        let mut r = ByteReader::new(payload);
        let full = FullBox::read(&mut r)?;
        let (creation_time, modification_time, timescale, duration) = if full.version == 1 {
            (r.read_u64()?, r.read_u64()?, r.read_u32()?, r.read_u64()?)
        } else {
            (
                u64::from(r.read_u32()?),
                u64::from(r.read_u32()?),
                r.read_u32()?,
                u64::from(r.read_u32()?),
            )
        };
        let rate = r.read_i32()?;
        let volume = r.read_u16()? as i16;
        r.skip(10)?; // reserved
        let matrix = read_matrix(&mut r)?;
        r.skip(24)?; // pre_defined
        let next_track_id = r.read_u32()?;
        Ok(Self {
            full,
            creation_time,
            modification_time,
            timescale,
            duration,
            rate,
            volume,
            matrix,
            next_track_id,
        })
    }
}

fn read_matrix(r: &mut ByteReader<'_>) -> AvResult<[i32; 9]> {
    let mut matrix = [0i32; 9];
    for v in &mut matrix {
        *v = r.read_i32()?;
    }
    Ok(matrix)
}

// ========================
// 轨道头
// ========================

/// tkhd Box 数据
#[derive(Debug, Clone, PartialEq)]
pub struct TkhdBox {
    pub full: FullBox,
    pub creation_time: u64,
    pub modification_time: u64,
    pub track_id: u32,
    pub duration: u64,
    pub layer: i16,
    pub alternate_group: i16,
    pub volume: i16,
    pub matrix: [i32; 9],
    /// 显示宽度 (16.16 定点的整数部分)
    pub width: u32,
    /// 显示高度 (16.16 定点的整数部分)
    pub height: u32,
}

impl TkhdBox {
    pub fn parse(payload: &[u8]) -> AvResult<Self> {
        let mut r = ByteReader::new(payload);
        let full = FullBox::read(&mut r)?;
        let (creation_time, modification_time, track_id, duration) = if full.version == 1 {
            let c = r.read_u64()?;
            let m = r.read_u64()?;
            let id = r.read_u32()?;
            r.skip(4)?;
            (c, m, id, r.read_u64()?)
        } else {
            let c = u64::from(r.read_u32()?);
            let m = u64::from(r.read_u32()?);
            let id = r.read_u32()?;
            r.skip(4)?;
            (c, m, id, u64::from(r.read_u32()?))
        };
        r.skip(8)?;
        let layer = r.read_u16()? as i16;
        let alternate_group = r.read_u16()? as i16;
        let volume = r.read_u16()? as i16;
        r.skip(2)?;
        let matrix = read_matrix(&mut r)?;
        let width = r.read_u32()? >> 16;
        let height = r.read_u32()? >> 16;
        Ok(Self {
            full,
            creation_time,
            modification_time,
            track_id,
            duration,
            layer,
            alternate_group,
            volume,
            matrix,
            width,
            height,
        })
    }
}

/// elst 中的一段编辑
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EditListEntry {
    /// 片段时长 (mvhd 时间刻度)
    pub segment_duration: u64,
    /// 媒体起始时间 (媒体时间刻度, -1 表示空编辑)
    pub media_time: i64,
    pub media_rate_integer: i16,
    pub media_rate_fraction: i16,
}

/// elst Box 数据
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElstBox {
    pub full: FullBox,
    pub entries: Vec<EditListEntry>,
}

impl ElstBox {
    pub fn parse(payload: &[u8]) -> AvResult<Self> {
        let mut r = ByteReader::new(payload);
        let full = FullBox::read(&mut r)?;
        let count = r.read_u32()? as usize;
        let entry_len = if full.version == 1 { 20 } else { 12 };
        if count > r.remaining() / entry_len {
            return Err(avkit_core::AvError::InvalidData(format!(
                "elst: 条目数 {count} 超出 Box 大小"
            )));
        }
        let mut entries = Vec::with_capacity(count);
        for _ in 0..count {
            let (segment_duration, media_time) = if full.version == 1 {
                (r.read_u64()?, r.read_i64()?)
            } else {
                (u64::from(r.read_u32()?), i64::from(r.read_i32()?))
            };
            entries.push(EditListEntry {
                segment_duration,
                media_time,
                media_rate_integer: r.read_u16()? as i16,
                media_rate_fraction: r.read_u16()? as i16,
            });
        }
        Ok(Self { full, entries })
    }
}

// ========================
// 媒体头
// ========================

/// mdhd Box 数据
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MdhdBox {
    pub full: FullBox,
    pub creation_time: u64,
    pub modification_time: u64,
    /// 媒体时间刻度 (每秒的时间单位数)
    pub timescale: u32,
    pub duration: u64,
    /// ISO 639-2/T 语言码
    pub language: String,
}

impl MdhdBox {
    pub fn parse(payload: &[u8]) -> AvResult<Self> {
        let mut r = ByteReader::new(payload);
        let full = FullBox::read(&mut r)?;
        let (creation_time, modification_time, timescale, duration) = if full.version == 1 {
            (r.read_u64()?, r.read_u64()?, r.read_u32()?, r.read_u64()?)
        } else {
            (
                u64::from(r.read_u32()?),
                u64::from(r.read_u32()?),
                r.read_u32()?,
                u64::from(r.read_u32()?),
            )
        };
        // pad(1) + 3 个 5 位字符, 每个字符以 0x60 为基准
        let packed = r.read_u16()?;
        let language = [10u16, 5, 0]
            .iter()
            .map(|&shift| (((packed >> shift) & 0x1F) as u8 + 0x60) as char)
            .collect();
        Ok(Self {
            full,
            creation_time,
            modification_time,
            timescale,
            duration,
            language,
        })
    }
}

/// hdlr Box 数据
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HdlrBox {
    pub full: FullBox,
    /// QuickTime 组件类型 (mhlr/dhlr), MP4 中为 0
    pub component_type: FourCc,
    /// 处理器类型 (vide/soun/text/sbtl/meta ...)
    pub handler_type: FourCc,
    pub name: String,
}

impl HdlrBox {
    pub fn parse(payload: &[u8]) -> AvResult<Self> {
        let mut r = ByteReader::new(payload);
        let full = FullBox::read(&mut r)?;
        let component_type = FourCc(r.read_fourcc()?);
        let handler_type = FourCc(r.read_fourcc()?);
        r.skip(12)?;
        let rest = r.rest();
        // QuickTime 使用 Pascal 字符串 (首字节为长度)
        let name = match rest.first() {
            Some(&len) if component_type.0 != [0; 4] && len as usize == rest.len() - 1 => {
                String::from_utf8_lossy(&rest[1..]).into_owned()
            }
            _ => read_c_string(rest),
        };
        Ok(Self {
            full,
            component_type,
            handler_type,
            name,
        })
    }

    /// 是否为 QuickTime 数据处理器 (minf 内的 hdlr)
    pub fn is_data_handler(&self) -> bool {
        &self.component_type.0 == b"dhlr"
    }
}

/// 媒体信息头 (vmhd/smhd/hmhd/sthd/nmhd)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaInfoHeader {
    Video {
        graphics_mode: u16,
        opcolor: [u16; 3],
    },
    Sound {
        /// 立体声平衡 (8.8 定点)
        balance: i16,
    },
    Hint {
        max_pdu_size: u16,
        avg_pdu_size: u16,
        max_bitrate: u32,
        avg_bitrate: u32,
    },
    Subtitle,
    Null,
}

impl MediaInfoHeader {
    pub fn parse(fourcc: &[u8; 4], payload: &[u8]) -> AvResult<Self> {
        let mut r = ByteReader::new(payload);
        FullBox::read(&mut r)?;
        let header = match fourcc {
            b"vmhd" => Self::Video {
                graphics_mode: r.read_u16()?,
                opcolor: [r.read_u16()?, r.read_u16()?, r.read_u16()?],
            },
            b"smhd" => Self::Sound {
                balance: r.read_u16()? as i16,
            },
            b"hmhd" => Self::Hint {
                max_pdu_size: r.read_u16()?,
                avg_pdu_size: r.read_u16()?,
                max_bitrate: r.read_u32()?,
                avg_bitrate: r.read_u32()?,
            },
            b"sthd" => Self::Subtitle,
            _ => Self::Null,
        };
        Ok(header)
    }
}

/// dref 中的数据引用 (url/urn)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataEntry {
    pub full: FullBox,
    pub name: Option<String>,
    pub location: Option<String>,
}

impl DataEntry {
    /// flags 第 0 位: 媒体数据与本文件在一起, 无 location
    pub fn is_self_contained(&self) -> bool {
        self.full.flags & 1 != 0
    }

    pub fn parse(fourcc: &[u8; 4], payload: &[u8]) -> AvResult<Self> {
        let mut r = ByteReader::new(payload);
        let full = FullBox::read(&mut r)?;
        let rest = r.rest();
        let (name, location) = if fourcc == b"urn " {
            let name = read_c_string(rest);
            let after = rest.get(name.len() + 1..).unwrap_or(&[]);
            let location = (!after.is_empty()).then(|| read_c_string(after));
            (Some(name), location)
        } else if full.flags & 1 != 0 || rest.is_empty() {
            (None, None)
        } else {
            (None, Some(read_c_string(rest)))
        };
        Ok(Self {
            full,
            name,
            location,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_box_类型识别() {
        assert_eq!(BoxKind::from_fourcc(&FourCc(*b"moov")), Some(BoxKind::Moov));
        assert_eq!(BoxKind::from_fourcc(&FourCc(*b"co64")), Some(BoxKind::Co64));
        assert_eq!(
            BoxKind::from_fourcc(&FourCc(*b"vdep")),
            Some(BoxKind::TrackReference)
        );
        assert_eq!(BoxKind::from_fourcc(&FourCc(*b"xxxx")), None);
        assert!(BoxKind::Stbl.is_container());
        assert!(!BoxKind::Stsd.is_container());
        assert!(BoxKind::Stco.is_critical());
        assert!(!BoxKind::Elst.is_critical());
    }

    #[test]
    fn test_fourcc_显示() {
        assert_eq!(FourCc(*b"url ").to_string(), "url ");
        assert_eq!(FourCc([0xA9, b'n', b'a', b'm']).to_string(), "?nam");
    }

    #[test]
    fn test_ftyp_解析() {
        let mut content = Vec::new();
        content.extend_from_slice(b"isom");
        content.extend_from_slice(&0x200u32.to_be_bytes());
        content.extend_from_slice(b"isom");
        content.extend_from_slice(b"mp41");
        let ftyp = FtypBox::parse(&content).unwrap();
        assert_eq!(ftyp.major_brand, FourCc(*b"isom"));
        assert_eq!(ftyp.minor_version, 0x200);
        assert_eq!(
            ftyp.compatible_brands,
            vec![FourCc(*b"isom"), FourCc(*b"mp41")]
        );
    }

    #[test]
    fn test_mdhd_语言码() {
        let mut content = vec![0u8; 4]; // version 0
        content.extend_from_slice(&0u32.to_be_bytes());
        content.extend_from_slice(&0u32.to_be_bytes());
        content.extend_from_slice(&90000u32.to_be_bytes());
        content.extend_from_slice(&180000u32.to_be_bytes());
        // "und" = (21 << 10) | (14 << 5) | 4
        content.extend_from_slice(&0x55C4u16.to_be_bytes());
        content.extend_from_slice(&0u16.to_be_bytes());
        let mdhd = MdhdBox::parse(&content).unwrap();
        assert_eq!(mdhd.timescale, 90000);
        assert_eq!(mdhd.duration, 180000);
        assert_eq!(mdhd.language, "und");
    }

    #[test]
    fn test_tkhd_版本1() {
        let mut content = vec![1, 0, 0, 3];
        content.extend_from_slice(&1u64.to_be_bytes());
        content.extend_from_slice(&2u64.to_be_bytes());
        content.extend_from_slice(&7u32.to_be_bytes()); // track_id
        content.extend_from_slice(&[0u8; 4]);
        content.extend_from_slice(&5000u64.to_be_bytes());
        content.extend_from_slice(&[0u8; 16]); // reserved + layer/group/volume/reserved
        content.extend_from_slice(&[0u8; 36]);
        content.extend_from_slice(&(1920u32 << 16).to_be_bytes());
        content.extend_from_slice(&(1080u32 << 16).to_be_bytes());
        let tkhd = TkhdBox::parse(&content).unwrap();
        assert_eq!(tkhd.full, FullBox { version: 1, flags: 3 });
        assert_eq!(tkhd.track_id, 7);
        assert_eq!(tkhd.duration, 5000);
        assert_eq!((tkhd.width, tkhd.height), (1920, 1080));
    }

    #[test]
    fn test_hdlr_两种名称格式() {
        // version/flags + pre_defined(0) + handler_type + reserved + C 字符串
        let mut mp4 = vec![0u8; 8];
        mp4.extend_from_slice(b"vide");
        mp4.extend_from_slice(&[0u8; 12]);
        mp4.extend_from_slice(b"VideoHandler\0");
        let hdlr = HdlrBox::parse(&mp4).unwrap();
        assert_eq!(hdlr.handler_type, FourCc(*b"vide"));
        assert!(!hdlr.is_data_handler());
        assert_eq!(hdlr.name, "VideoHandler");

        let mut qt = vec![0u8; 4];
        qt.extend_from_slice(b"dhlr");
        qt.extend_from_slice(b"alis");
        qt.extend_from_slice(&[0u8; 12]);
        qt.push(5);
        qt.extend_from_slice(b"Alias");
        let hdlr = HdlrBox::parse(&qt).unwrap();
        assert!(hdlr.is_data_handler());
        assert_eq!(hdlr.name, "Alias");
    }

    #[test]
    fn test_elst_条目数超出() {
        let mut content = vec![0u8; 4];
        content.extend_from_slice(&100u32.to_be_bytes());
        content.extend_from_slice(&[0u8; 12]);
        assert!(ElstBox::parse(&content).is_err());
    }

    #[test]
    fn test_url_自包含() {
        let entry = DataEntry::parse(b"url ", &[0, 0, 0, 1]).unwrap();
        assert!(entry.is_self_contained());
        assert_eq!(entry.location, None);
    }

    #[test]
    fn test_按路径查找() {
        let mut root = Mp4Box::root(100);
        let mut moov = Mp4Box {
            fourcc: FourCc(*b"moov"),
            offset: 0,
            size: 50,
            data: BoxData::Container,
            children: Vec::new(),
        };
        moov.children.push(Mp4Box {
            fourcc: FourCc(*b"trak"),
            offset: 8,
            size: 42,
            data: BoxData::Container,
            children: Vec::new(),
        });
        root.children.push(moov);
        assert_eq!(root.find(&[b"moov", b"trak"]).map(|b| b.offset), Some(8));
        assert!(root.find(&[b"moov", b"mvhd"]).is_none());
        assert_eq!(root.descendant_count(), 2);
    }
}
