use std::collections::HashSet;
use std::io::{Cursor, Read, Seek, SeekFrom};

use byteorder::{LittleEndian, ReadBytesExt};

use super::base::{CENTRAL_RECORD_SIZE, CENTRAL_SIGNATURE, DirectoryRecord};
use super::trailer::Trailer;
use crate::error::{ArchiveError, Stage, StageContext};

/// Reads the central directory described by `trailer`.
///
/// Records are returned in the order they appear. Only metadata is read, entry
/// payloads are left untouched.
pub fn read_directory<R: Read + Seek>(
    reader: &mut R,
    trailer: &Trailer,
) -> Result<Vec<DirectoryRecord>, ArchiveError> {
    let start = trailer.directory_offset as u64;
    let end = start + trailer.directory_size as u64;

    if end > trailer.offset {
        return Err(ArchiveError::format(
            Stage::DirectoryParse,
            format!(
                "central directory {start}..{end} overlaps the end of central directory record at {}",
                trailer.offset
            ),
        ));
    }

    reader.seek(SeekFrom::Start(start)).at(Stage::DirectoryParse)?;
    let mut directory = vec![0u8; trailer.directory_size as usize];
    reader
        .read_exact(&mut directory)
        .at(Stage::DirectoryParse)?;

    parse_records(&directory, trailer.entry_count as usize)
}

/// Parses `count` central directory records from `directory`.
pub fn parse_records(directory: &[u8], count: usize) -> Result<Vec<DirectoryRecord>, ArchiveError> {
    let mut r = Cursor::new(directory);
    let mut records = Vec::with_capacity(count);
    let mut names = HashSet::with_capacity(count);

    for index in 0..count {
        let remaining = directory.len() - r.position() as usize;
        if remaining < CENTRAL_RECORD_SIZE {
            return Err(truncated(index, count));
        }

        let signature = r.read_u32::<LittleEndian>().at(Stage::DirectoryParse)?;
        if signature != CENTRAL_SIGNATURE {
            return Err(ArchiveError::format(
                Stage::DirectoryParse,
                format!("record {index} has invalid signature 0x{signature:08x}"),
            ));
        }

        // Version made by, version needed, flags.
        r.seek(SeekFrom::Current(6)).at(Stage::DirectoryParse)?;
        let compression_method = r.read_u16::<LittleEndian>().at(Stage::DirectoryParse)?;
        // Modification time, date and CRC-32.
        r.seek(SeekFrom::Current(8)).at(Stage::DirectoryParse)?;
        let compressed_size = r.read_u32::<LittleEndian>().at(Stage::DirectoryParse)?;
        let uncompressed_size = r.read_u32::<LittleEndian>().at(Stage::DirectoryParse)?;
        let name_len = r.read_u16::<LittleEndian>().at(Stage::DirectoryParse)? as usize;
        let extra_len = r.read_u16::<LittleEndian>().at(Stage::DirectoryParse)? as usize;
        let comment_len = r.read_u16::<LittleEndian>().at(Stage::DirectoryParse)? as usize;
        // Disk number, internal and external attributes.
        r.seek(SeekFrom::Current(8)).at(Stage::DirectoryParse)?;
        let header_offset = r.read_u32::<LittleEndian>().at(Stage::DirectoryParse)?;

        let remaining = directory.len() - r.position() as usize;
        if remaining < name_len + extra_len + comment_len {
            return Err(truncated(index, count));
        }

        let mut name = vec![0u8; name_len];
        r.read_exact(&mut name).at(Stage::DirectoryParse)?;
        let name = String::from_utf8(name).map_err(|_| {
            ArchiveError::format(
                Stage::DirectoryParse,
                format!("record {index} has a name that is not valid UTF-8"),
            )
        })?;
        r.seek(SeekFrom::Current((extra_len + comment_len) as i64))
            .at(Stage::DirectoryParse)?;

        if compressed_size == u32::MAX
            || uncompressed_size == u32::MAX
            || header_offset == u32::MAX
        {
            return Err(ArchiveError::format(
                Stage::DirectoryParse,
                format!("entry '{name}' uses ZIP64 extensions, which are not supported"),
            ));
        }

        if !names.insert(name.clone()) {
            return Err(ArchiveError::format(
                Stage::DirectoryParse,
                format!("duplicate entry name '{name}'"),
            ));
        }

        records.push(DirectoryRecord::new(
            name,
            compression_method,
            compressed_size as u64,
            uncompressed_size as u64,
            header_offset as u64,
        ));
    }

    log::debug!("Read {} central directory records", records.len());

    Ok(records)
}

fn truncated(index: usize, count: usize) -> ArchiveError {
    ArchiveError::format(
        Stage::DirectoryParse,
        format!("central directory ends inside record {index} of {count}"),
    )
}
