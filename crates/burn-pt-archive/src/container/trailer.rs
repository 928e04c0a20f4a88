use std::io::{Cursor, Read, Seek, SeekFrom};

use byteorder::{LittleEndian, ReadBytesExt};

use super::base::{MAX_COMMENT_SIZE, TRAILER_SIGNATURE, TRAILER_SIZE};
use crate::error::{ArchiveError, Stage, StageContext};

/// The end of central directory record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Trailer {
    /// Offset of the record from the start of the file.
    pub offset: u64,
    /// Total number of entries in the central directory.
    pub entry_count: u16,
    /// Size of the central directory in bytes.
    pub directory_size: u32,
    /// Offset of the central directory from the start of the file.
    pub directory_offset: u32,
    /// Length of the archive comment following the record.
    pub comment_len: u16,
}

/// Locates and decodes the end of central directory record.
///
/// The record is followed by a comment of unknown length, so the tail of the file is
/// scanned backward, one byte at a time, for the rightmost occurrence of the signature.
pub fn find_trailer<R: Read + Seek>(
    reader: &mut R,
    file_len: u64,
) -> Result<Trailer, ArchiveError> {
    if file_len < TRAILER_SIZE {
        return Err(ArchiveError::format(
            Stage::TrailerScan,
            format!(
                "file is {file_len} bytes, need at least {TRAILER_SIZE} bytes for an end of central directory record"
            ),
        ));
    }

    let window_len = file_len.min(TRAILER_SIZE + MAX_COMMENT_SIZE);
    let window_start = file_len - window_len;

    reader
        .seek(SeekFrom::Start(window_start))
        .at(Stage::TrailerScan)?;
    let mut window = vec![0u8; window_len as usize];
    reader.read_exact(&mut window).at(Stage::TrailerScan)?;

    let position = scan_backward(&window).ok_or_else(|| {
        ArchiveError::format(
            Stage::TrailerScan,
            "can't find end of central directory signature",
        )
    })?;

    log::debug!(
        "End of central directory found at offset {}",
        window_start + position as u64
    );

    let record = &window[position..position + TRAILER_SIZE as usize];
    decode(record, window_start + position as u64)
}

/// Rightmost position in `window` where a full record starting with the signature fits.
fn scan_backward(window: &[u8]) -> Option<usize> {
    let signature = TRAILER_SIGNATURE.to_le_bytes();
    let last = window.len().checked_sub(TRAILER_SIZE as usize)?;

    (0..=last)
        .rev()
        .find(|&pos| window[pos..pos + 4] == signature)
}

fn decode(record: &[u8], offset: u64) -> Result<Trailer, ArchiveError> {
    let mut r = Cursor::new(record);

    let _signature = r.read_u32::<LittleEndian>().at(Stage::TrailerScan)?;
    let disk = r.read_u16::<LittleEndian>().at(Stage::TrailerScan)?;
    let directory_disk = r.read_u16::<LittleEndian>().at(Stage::TrailerScan)?;
    let disk_entries = r.read_u16::<LittleEndian>().at(Stage::TrailerScan)?;
    let entry_count = r.read_u16::<LittleEndian>().at(Stage::TrailerScan)?;
    let directory_size = r.read_u32::<LittleEndian>().at(Stage::TrailerScan)?;
    let directory_offset = r.read_u32::<LittleEndian>().at(Stage::TrailerScan)?;
    let comment_len = r.read_u16::<LittleEndian>().at(Stage::TrailerScan)?;

    if entry_count == u16::MAX || directory_size == u32::MAX || directory_offset == u32::MAX {
        return Err(ArchiveError::format(
            Stage::TrailerScan,
            "ZIP64 archives are not supported",
        ));
    }

    if disk != 0 || directory_disk != 0 || disk_entries != entry_count {
        return Err(ArchiveError::format(
            Stage::TrailerScan,
            "multi-disk archives are not supported",
        ));
    }

    Ok(Trailer {
        offset,
        entry_count,
        directory_size,
        directory_offset,
        comment_len,
    })
}
