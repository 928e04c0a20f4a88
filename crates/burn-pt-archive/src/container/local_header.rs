use std::io::{Read, Seek, SeekFrom};

use byteorder::{LittleEndian, ReadBytesExt};

use super::base::{
    ArchiveEntry, DirectoryRecord, LOCAL_HEADER_SIZE, LOCAL_NAME_LENGTH_OFFSET, LOCAL_SIGNATURE,
};
use crate::error::{ArchiveError, Stage, StageContext};

/// Locates the payload of every record by reading its local file header.
///
/// The local header carries its own name and extra field lengths, which may differ from the
/// central directory copy (PyTorch pads the local extra field to align tensor data), so the
/// payload offset can only be computed from the local header itself.
pub fn resolve_entries<R: Read + Seek>(
    reader: &mut R,
    records: Vec<DirectoryRecord>,
    file_len: u64,
) -> Result<Vec<ArchiveEntry>, ArchiveError> {
    records
        .into_iter()
        .map(|record| {
            let data_offset = resolve_data_offset(reader, &record, file_len)?;
            Ok(ArchiveEntry::from_record(record, data_offset))
        })
        .collect()
}

/// Computes the offset of the first payload byte of `record`.
pub fn resolve_data_offset<R: Read + Seek>(
    reader: &mut R,
    record: &DirectoryRecord,
    file_len: u64,
) -> Result<u64, ArchiveError> {
    if record.header_offset + LOCAL_HEADER_SIZE > file_len {
        return Err(ArchiveError::format(
            Stage::HeaderResolve,
            format!(
                "local header of '{}' at offset {} is past the end of the file ({file_len} bytes)",
                record.name, record.header_offset
            ),
        ));
    }

    reader
        .seek(SeekFrom::Start(record.header_offset))
        .at(Stage::HeaderResolve)?;
    let signature = reader
        .read_u32::<LittleEndian>()
        .at(Stage::HeaderResolve)?;
    if signature != LOCAL_SIGNATURE {
        return Err(ArchiveError::format(
            Stage::HeaderResolve,
            format!(
                "local header of '{}' has invalid signature 0x{signature:08x}",
                record.name
            ),
        ));
    }

    reader
        .seek(SeekFrom::Start(record.header_offset + LOCAL_NAME_LENGTH_OFFSET))
        .at(Stage::HeaderResolve)?;
    let name_len = reader
        .read_u16::<LittleEndian>()
        .at(Stage::HeaderResolve)? as u64;
    let extra_len = reader
        .read_u16::<LittleEndian>()
        .at(Stage::HeaderResolve)? as u64;

    let data_offset = record.header_offset + LOCAL_HEADER_SIZE + name_len + extra_len;
    if data_offset + record.compressed_size > file_len {
        return Err(ArchiveError::format(
            Stage::HeaderResolve,
            format!(
                "payload of '{}' ({} bytes at offset {data_offset}) extends past the end of the file ({file_len} bytes)",
                record.name, record.compressed_size
            ),
        ));
    }

    log::trace!("Entry '{}' data at offset {data_offset}", record.name);

    Ok(data_offset)
}
