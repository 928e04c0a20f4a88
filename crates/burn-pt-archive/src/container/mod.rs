//! Minimal reader for the ZIP container of PyTorch checkpoints.
//!
//! Only what is needed to locate stored entries is implemented:
//!
//! ```text
//! ┌──────────────────────────────────┐
//! │  Local header + payload (×N)     │  header size = 30 + name + extra
//! ├──────────────────────────────────┤
//! │  Central directory (×N records)  │  46 bytes + name + extra + comment
//! ├──────────────────────────────────┤
//! │  End of central directory (22)   │  entry count, directory size/offset
//! │  Comment (0..=65535)             │
//! └──────────────────────────────────┘
//! ```
//!
//! Compressed entries are cataloged but cannot be read. ZIP64 and multi-disk archives are
//! rejected.

/// Record layouts and the entry catalog.
pub mod base;
/// Central directory parsing.
pub mod directory;
/// Local file headers and payload offsets.
pub mod local_header;
/// End of central directory record.
pub mod trailer;


pub use base::{ArchiveEntry, ContainerIndex, METHOD_STORED};

use std::io::{Read, Seek, SeekFrom};

use crate::error::{ArchiveError, Stage, StageContext};

impl ContainerIndex {
    /// Reads the catalog of an archive: trailer, central directory and local headers.
    pub fn read<R: Read + Seek>(reader: &mut R) -> Result<Self, ArchiveError> {
        let file_len = reader.seek(SeekFrom::End(0)).at(Stage::TrailerScan)?;

        let trailer = trailer::find_trailer(reader, file_len)?;
        let records = directory::read_directory(reader, &trailer)?;
        let entries = local_header::resolve_entries(reader, records, file_len)?;

        log::debug!(
            "Cataloged {} entries (central directory at offset {}, {} bytes)",
            entries.len(),
            trailer.directory_offset,
            trailer.directory_size
        );

        Ok(Self::from_entries(entries))
    }
}

/// Reads the payload of a stored entry.
///
/// `stage` is the stage reported on failure: the descriptor is read while resolving the order,
/// tensors while streaming.
pub fn read_stored<R: Read + Seek>(
    reader: &mut R,
    entry: &ArchiveEntry,
    stage: Stage,
) -> Result<Vec<u8>, ArchiveError> {
    if !entry.is_stored() {
        return Err(ArchiveError::UnsupportedCompression {
            stage,
            name: entry.name().to_string(),
            method: entry.compression_method(),
        });
    }

    if entry.compressed_size() != entry.uncompressed_size() {
        return Err(ArchiveError::format(
            stage,
            format!(
                "stored entry '{}' declares {} bytes on disk but {} uncompressed",
                entry.name(),
                entry.compressed_size(),
                entry.uncompressed_size()
            ),
        ));
    }

    let len = usize::try_from(entry.uncompressed_size()).map_err(|_| {
        ArchiveError::format(
            stage,
            format!("entry '{}' does not fit in memory", entry.name()),
        )
    })?;

    let mut bytes = vec![0u8; len];
    reader
        .seek(SeekFrom::Start(entry.data_offset()))
        .at(stage)?;
    reader.read_exact(&mut bytes).at(stage)?;

    Ok(bytes)
}
