//! Box 负载解析分派.
//!
//! 每种 [`BoxKind`] 对应一个解析分支. 轨道相关的 Box 把解析结果写入当前的
//! [`TrackBuilder`], 树中只保留摘要.

use avkit_core::{AvError, AvResult, ByteReader};

use super::boxes::{
    BoxData, BoxKind, DataEntry, ElstBox, FtypBox, FullBox, HdlrBox, MdhdBox, MediaInfoHeader,
    MvhdBox, TableInfo, TkhdBox, read_c_string,
};
use super::framer::BoxHeader;
use super::sample_table::{
    AuxiliaryTable, parse_chunk_offsets, parse_ctts, parse_stsc, parse_stss, parse_stsz,
    parse_stts, parse_stz2,
};
use super::stsd::SampleDescription;
use super::track::TrackBuilder;

/// 轨道级 Box 必须出现在 trak 内
fn require_track<'a>(
    header: &BoxHeader,
    track: Option<&'a mut TrackBuilder>,
) -> AvResult<&'a mut TrackBuilder> {
    track.ok_or_else(|| {
        AvError::InvalidData(format!(
            "'{}' (偏移 {}) 出现在 trak 之外",
            header.fourcc, header.offset
        ))
    })
}

fn table_info(payload: &[u8], entry_count: usize) -> AvResult<BoxData> {
    let full = FullBox::read(&mut ByteReader::new(payload))?;
    Ok(BoxData::Table(TableInfo { full, entry_count }))
}

/// 解析一个 Box 的负载
///
/// 返回解析结果与消耗的负载字节数. 容器的子 Box 从消耗的字节之后开始.
pub fn parse_box(
    kind: BoxKind,
    header: &BoxHeader,
    payload: &[u8],
    track: Option<&mut TrackBuilder>,
) -> AvResult<(BoxData, usize)> {
    let len = payload.len();
    let data = match kind {
        BoxKind::Moov
        | BoxKind::Trak
        | BoxKind::Tref
        | BoxKind::Trgr
        | BoxKind::Edts
        | BoxKind::Mdia
        | BoxKind::Minf
        | BoxKind::Dinf
        | BoxKind::Stbl => return Ok((BoxData::Container, 0)),
        BoxKind::Dref => {
            let mut r = ByteReader::new(payload);
            let full = FullBox::read(&mut r)?;
            let entry_count = r.read_u32()?;
            return Ok((BoxData::Dref { full, entry_count }, 8));
        }

        BoxKind::Ftyp => BoxData::Ftyp(FtypBox::parse(payload)?),
        BoxKind::Free | BoxKind::Skip => BoxData::Free,
        BoxKind::Mdat => BoxData::Mdat {
            data_offset: header.payload_offset(),
            data_len: len as u64,
        },
        BoxKind::Mvhd => BoxData::Mvhd(MvhdBox::parse(payload)?),
        BoxKind::Udta => BoxData::Udta,

        BoxKind::Tkhd => {
            let tkhd = TkhdBox::parse(payload)?;
            require_track(header, track)?.set_tkhd(tkhd.clone());
            BoxData::Tkhd(tkhd)
        }
        BoxKind::TrackReference => {
            let track_ids = payload
                .chunks_exact(4)
                .map(|c| u32::from_be_bytes([c[0], c[1], c[2], c[3]]))
                .collect();
            BoxData::TrackReference { track_ids }
        }
        BoxKind::Msrc => {
            let mut r = ByteReader::new(payload);
            let full = FullBox::read(&mut r)?;
            BoxData::TrackGroup {
                full,
                track_group_id: r.read_u32()?,
            }
        }
        BoxKind::Elst => {
            let elst = ElstBox::parse(payload)?;
            require_track(header, track)?.set_elst(elst.clone());
            BoxData::Elst(elst)
        }
        BoxKind::Mdhd => {
            let mdhd = MdhdBox::parse(payload)?;
            require_track(header, track)?.set_mdhd(mdhd.clone());
            BoxData::Mdhd(mdhd)
        }
        BoxKind::Hdlr => {
            let hdlr = HdlrBox::parse(payload)?;
            // moov/udta 下的 meta 也会携带 hdlr, 只有 trak 内的才属于轨道
            if let Some(track) = track {
                track.set_hdlr(hdlr.clone());
            }
            BoxData::Hdlr(hdlr)
        }
        BoxKind::Elng => {
            let mut r = ByteReader::new(payload);
            let full = FullBox::read(&mut r)?;
            BoxData::Elng {
                full,
                language: read_c_string(r.rest()),
            }
        }
        BoxKind::Vmhd | BoxKind::Smhd | BoxKind::Hmhd | BoxKind::Sthd | BoxKind::Nmhd => {
            BoxData::MediaInfoHeader(MediaInfoHeader::parse(header.fourcc.as_bytes(), payload)?)
        }
        BoxKind::Url | BoxKind::Urn => {
            BoxData::DataEntry(DataEntry::parse(header.fourcc.as_bytes(), payload)?)
        }

        // ========================
        // 采样表
        // ========================
        BoxKind::Stsd => {
            let stsd = SampleDescription::parse(payload)?;
            let data = BoxData::SampleDescription {
                full: stsd.full,
                formats: stsd.formats(),
            };
            require_track(header, track)?.set_sample_description(stsd);
            data
        }
        BoxKind::Stts => {
            let stts = parse_stts(payload)?;
            let data = table_info(payload, stts.len())?;
            require_track(header, track)?.set_stts(stts);
            data
        }
        BoxKind::Ctts => {
            let ctts = parse_ctts(payload)?;
            let data = table_info(payload, ctts.len())?;
            require_track(header, track)?.set_ctts(ctts);
            data
        }
        BoxKind::Stsc => {
            let stsc = parse_stsc(payload)?;
            let data = table_info(payload, stsc.len())?;
            require_track(header, track)?.set_stsc(stsc);
            data
        }
        BoxKind::Stsz | BoxKind::Stz2 => {
            let sizes = if kind == BoxKind::Stsz {
                parse_stsz(payload)?
            } else {
                parse_stz2(payload)?
            };
            let data = table_info(payload, sizes.sample_count as usize)?;
            require_track(header, track)?.set_sample_sizes(sizes);
            data
        }
        BoxKind::Stco | BoxKind::Co64 => {
            let offsets = parse_chunk_offsets(payload, kind == BoxKind::Co64)?;
            let data = table_info(payload, offsets.len())?;
            require_track(header, track)?.set_chunk_offsets(offsets);
            data
        }
        BoxKind::Stss => {
            let stss = parse_stss(payload)?;
            let data = table_info(payload, stss.len())?;
            require_track(header, track)?.set_sync_samples(stss);
            data
        }
        BoxKind::Cslg
        | BoxKind::Stsh
        | BoxKind::Padb
        | BoxKind::Stdp
        | BoxKind::Sdtp
        | BoxKind::Subs
        | BoxKind::Saiz
        | BoxKind::Saio
        | BoxKind::Sbgp
        | BoxKind::Sgpd => {
            BoxData::Auxiliary(AuxiliaryTable::parse(header.fourcc.as_bytes(), payload)?)
        }
    };
    Ok((data, len))
}
