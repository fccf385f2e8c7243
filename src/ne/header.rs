//! NE (New Executable) header layout
//!
//! Field layout grounded on the teacher's `ldr::pe` module's header-reading
//! style (fixed-offset little-endian reads, bounds-checked against the
//! image length before every access) applied to the older NE format instead
//! of PE/COFF.

use crate::error::{KernelError, Result};

const MZ_MAGIC: [u8; 2] = *b"MZ";
const NE_MAGIC: [u8; 2] = *b"NE";
const E_LFANEW_OFFSET: usize = 0x3C;
pub const NE_HEADER_SIZE: usize = 0x40;
pub const SEGMENT_DESCRIPTOR_SIZE: usize = 8;

fn read_u16(data: &[u8], offset: usize) -> Result<u16> {
    let bytes = data.get(offset..offset + 2).ok_or(KernelError::BadData)?;
    Ok(u16::from_le_bytes([bytes[0], bytes[1]]))
}

fn read_u32(data: &[u8], offset: usize) -> Result<u32> {
    let bytes = data.get(offset..offset + 4).ok_or(KernelError::BadData)?;
    Ok(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
}

/// The MS-DOS stub header every NE file begins with; all that matters here
/// is the "MZ" magic and the pointer to the real (NE) header.
#[derive(Debug, Clone, Copy)]
pub struct MzHeader {
    pub e_lfanew: u32,
}

impl MzHeader {
    pub fn parse(data: &[u8]) -> Result<MzHeader> {
        if data.len() < E_LFANEW_OFFSET + 4 {
            return Err(KernelError::BadData);
        }
        if data[0..2] != MZ_MAGIC {
            return Err(KernelError::BadData);
        }
        let e_lfanew = read_u32(data, E_LFANEW_OFFSET)?;
        Ok(MzHeader { e_lfanew })
    }
}

/// The 64-byte NE header. Only the fields this crate's segment loader
/// actually consumes are decoded; the rest of the format (resource table,
/// module reference table, entry table, ...) is out of scope.
#[derive(Debug, Clone, Copy)]
pub struct NeHeader {
    pub linker_major: u8,
    pub linker_minor: u8,
    pub entry_table_offset: u16,
    pub entry_table_length: u16,
    pub auto_data_seg_index: u16,
    pub init_heap_size: u16,
    pub init_stack_size: u16,
    pub seg_count: u16,
    pub seg_table_offset: u16,
    /// File offsets in the segment table are sectors; shift left by this
    /// amount to get a byte offset.
    pub file_align_shift: u16,
    /// Absolute file offset of the NE header itself (needed because
    /// `seg_table_offset` is relative to it).
    pub base_offset: usize,
}

impl NeHeader {
    pub fn parse(data: &[u8], base_offset: usize) -> Result<NeHeader> {
        let header = data
            .get(base_offset..base_offset + NE_HEADER_SIZE)
            .ok_or(KernelError::BadData)?;
        if header[0..2] != NE_MAGIC {
            return Err(KernelError::BadData);
        }
        Ok(NeHeader {
            linker_major: header[2],
            linker_minor: header[3],
            entry_table_offset: read_u16(header, 0x04)?,
            entry_table_length: read_u16(header, 0x06)?,
            auto_data_seg_index: read_u16(header, 0x0E)?,
            init_heap_size: read_u16(header, 0x10)?,
            init_stack_size: read_u16(header, 0x12)?,
            seg_count: read_u16(header, 0x1C)?,
            seg_table_offset: read_u16(header, 0x22)?,
            file_align_shift: read_u16(header, 0x32)?,
            base_offset,
        })
    }
}

/// One 8-byte segment table entry. `data_offset`/`data_length` are already
/// resolved to absolute byte values (sector shift applied, zero-means-65536
/// resolved) so callers never re-derive the quirky on-disk encoding.
#[derive(Debug, Clone, Copy)]
pub struct SegmentDescriptor {
    pub data_offset: usize,
    pub data_length: usize,
    pub flags: u16,
    pub min_alloc: usize,
}

/// A segment whose `data_offset` sector field is zero carries no data on
/// disk (BSS-only, e.g.); its length also resolves to zero regardless of
/// the on-disk length field.
fn resolve_length(raw_sector: u16, raw_len: u16) -> usize {
    if raw_sector == 0 {
        return 0;
    }
    if raw_len == 0 {
        65536
    } else {
        raw_len as usize
    }
}

impl SegmentDescriptor {
    fn parse_one(entry: &[u8], align_shift: u16) -> Result<SegmentDescriptor> {
        let raw_sector = read_u16(entry, 0)?;
        let raw_len = read_u16(entry, 2)?;
        let flags = read_u16(entry, 4)?;
        let raw_min_alloc = read_u16(entry, 6)?;

        let data_length = resolve_length(raw_sector, raw_len);
        let data_offset = (raw_sector as usize) << align_shift;
        let min_alloc = if raw_min_alloc == 0 {
            65536
        } else {
            raw_min_alloc as usize
        };

        Ok(SegmentDescriptor {
            data_offset,
            data_length,
            flags,
            min_alloc,
        })
    }

    /// Parse the entire segment table named by `header`, bounds-checking
    /// every entry against `data`'s length.
    pub fn parse_table(data: &[u8], header: &NeHeader) -> Result<Vec<SegmentDescriptor>> {
        let table_start = header
            .base_offset
            .checked_add(header.seg_table_offset as usize)
            .ok_or(KernelError::BadData)?;
        let mut segments = Vec::with_capacity(header.seg_count as usize);
        for i in 0..header.seg_count as usize {
            let entry_start = table_start
                .checked_add(i * SEGMENT_DESCRIPTOR_SIZE)
                .ok_or(KernelError::BadData)?;
            let entry = data
                .get(entry_start..entry_start + SEGMENT_DESCRIPTOR_SIZE)
                .ok_or(KernelError::BadData)?;
            let descriptor = SegmentDescriptor::parse_one(entry, header.file_align_shift)?;
            if descriptor.data_length > 0 {
                let end = descriptor
                    .data_offset
                    .checked_add(descriptor.data_length)
                    .ok_or(KernelError::BadData)?;
                if end > data.len() {
                    return Err(KernelError::BadData);
                }
            }
            segments.push(descriptor);
        }
        Ok(segments)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn le16(v: u16) -> [u8; 2] {
        v.to_le_bytes()
    }
    fn le32(v: u32) -> [u8; 4] {
        v.to_le_bytes()
    }

    fn build_image(segments: &[(u16, u16)]) -> Vec<u8> {
        let ne_offset: usize = 0x40;
        let seg_table_rel: u16 = NE_HEADER_SIZE as u16;
        let seg_table_abs = ne_offset + seg_table_rel as usize;
        let seg_bytes = segments.len() * SEGMENT_DESCRIPTOR_SIZE;
        let mut image = vec![0u8; seg_table_abs + seg_bytes];

        image[0..2].copy_from_slice(b"MZ");
        image[E_LFANEW_OFFSET..E_LFANEW_OFFSET + 4].copy_from_slice(&le32(ne_offset as u32));

        let ne = &mut image[ne_offset..ne_offset + NE_HEADER_SIZE];
        ne[0..2].copy_from_slice(b"NE");
        ne[0x1C..0x1E].copy_from_slice(&le16(segments.len() as u16));
        ne[0x22..0x24].copy_from_slice(&le16(seg_table_rel));
        ne[0x32..0x34].copy_from_slice(&le16(0)); // no sector shift for this fixture

        for (i, (sector, len)) in segments.iter().enumerate() {
            let entry_start = seg_table_abs + i * SEGMENT_DESCRIPTOR_SIZE;
            image[entry_start..entry_start + 2].copy_from_slice(&le16(*sector));
            image[entry_start + 2..entry_start + 4].copy_from_slice(&le16(*len));
        }
        image
    }

    #[test]
    fn parses_mz_and_ne_headers() {
        let image = build_image(&[(1, 16)]);
        let mz = MzHeader::parse(&image).unwrap();
        let ne = NeHeader::parse(&image, mz.e_lfanew as usize).unwrap();
        assert_eq!(ne.seg_count, 1);
    }

    #[test]
    fn rejects_bad_mz_magic() {
        let mut image = build_image(&[(1, 16)]);
        image[0] = b'X';
        assert_eq!(MzHeader::parse(&image).unwrap_err(), KernelError::BadData);
    }

    #[test]
    fn zero_length_field_means_65536() {
        // Needs a large enough image; just check the resolver directly.
        assert_eq!(resolve_length(1, 0), 65536);
        assert_eq!(resolve_length(0, 0), 0);
        assert_eq!(resolve_length(1, 16), 16);
    }

    #[test]
    fn segment_table_rejects_out_of_bounds_data() {
        let mut image = build_image(&[(1, 16)]);
        // Point the one segment's sector far past the end of the file.
        let ne_offset = 0x40usize;
        let seg_table_abs = ne_offset + NE_HEADER_SIZE;
        image[seg_table_abs..seg_table_abs + 2].copy_from_slice(&le16(9000));
        let mz = MzHeader::parse(&image).unwrap();
        let ne = NeHeader::parse(&image, mz.e_lfanew as usize).unwrap();
        assert_eq!(
            SegmentDescriptor::parse_table(&image, &ne).unwrap_err(),
            KernelError::BadData
        );
    }

    #[test]
    fn segment_table_in_bounds_parses_cleanly() {
        let image = build_image(&[(1, 16), (0, 0)]);
        let mz = MzHeader::parse(&image).unwrap();
        let ne = NeHeader::parse(&image, mz.e_lfanew as usize).unwrap();
        let segments = SegmentDescriptor::parse_table(&image, &ne).unwrap();
        assert_eq!(segments.len(), 2);
        assert_eq!(segments[0].data_offset, 1);
        assert_eq!(segments[0].data_length, 16);
        assert_eq!(segments[1].data_length, 0); // sector 0 => no data
    }
}
