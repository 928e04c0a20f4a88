use std::collections::HashMap;

/// Signature of the end of central directory record ("PK\x05\x06").
pub const TRAILER_SIGNATURE: u32 = 0x0605_4b50;
/// Size of the end of central directory record without its comment.
pub const TRAILER_SIZE: u64 = 22;
/// Largest comment that can trail the end of central directory record.
pub const MAX_COMMENT_SIZE: u64 = u16::MAX as u64;

/// Signature of a central directory record ("PK\x01\x02").
pub const CENTRAL_SIGNATURE: u32 = 0x0201_4b50;
/// Size of the fixed part of a central directory record.
pub const CENTRAL_RECORD_SIZE: usize = 46;

/// Signature of a local file header ("PK\x03\x04").
pub const LOCAL_SIGNATURE: u32 = 0x0403_4b50;
/// Size of the fixed part of a local file header.
pub const LOCAL_HEADER_SIZE: u64 = 30;
/// Offset of the name length field inside a local file header.
pub const LOCAL_NAME_LENGTH_OFFSET: u64 = 26;

/// Compression method for entries stored without compression.
pub const METHOD_STORED: u16 = 0;

/// An entry as described by the central directory, before its payload is located.
#[derive(new, Debug, Clone, PartialEq, Eq)]
pub struct DirectoryRecord {
    pub(crate) name: String,
    pub(crate) compression_method: u16,
    pub(crate) compressed_size: u64,
    pub(crate) uncompressed_size: u64,
    pub(crate) header_offset: u64,
}

/// One named object inside the container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveEntry {
    pub(crate) name: String,
    pub(crate) compression_method: u16,
    pub(crate) compressed_size: u64,
    pub(crate) uncompressed_size: u64,
    pub(crate) header_offset: u64,
    pub(crate) data_offset: u64,
}

impl ArchiveEntry {
    pub(crate) fn from_record(record: DirectoryRecord, data_offset: u64) -> Self {
        Self {
            name: record.name,
            compression_method: record.compression_method,
            compressed_size: record.compressed_size,
            uncompressed_size: record.uncompressed_size,
            header_offset: record.header_offset,
            data_offset,
        }
    }

    /// Path of the entry inside the archive.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Compression method recorded in the central directory.
    pub fn compression_method(&self) -> u16 {
        self.compression_method
    }

    /// Whether the payload is stored without compression.
    pub fn is_stored(&self) -> bool {
        self.compression_method == METHOD_STORED
    }

    /// Number of payload bytes as written in the file.
    pub fn compressed_size(&self) -> u64 {
        self.compressed_size
    }

    /// Number of payload bytes once decompressed.
    pub fn uncompressed_size(&self) -> u64 {
        self.uncompressed_size
    }

    /// Offset of the local file header from the start of the file.
    pub fn header_offset(&self) -> u64 {
        self.header_offset
    }

    /// Offset of the first payload byte from the start of the file.
    pub fn data_offset(&self) -> u64 {
        self.data_offset
    }
}

/// Catalog of every entry in an archive, in central directory order.
#[derive(Debug, Clone)]
pub struct ContainerIndex {
    entries: Vec<ArchiveEntry>,
    by_name: HashMap<String, usize>,
}

impl ContainerIndex {
    /// Builds the catalog and its name lookup.
    ///
    /// Names must be unique, callers check this while parsing the directory.
    pub(crate) fn from_entries(entries: Vec<ArchiveEntry>) -> Self {
        let by_name = entries
            .iter()
            .enumerate()
            .map(|(index, entry)| (entry.name.clone(), index))
            .collect();

        Self { entries, by_name }
    }

    /// All entries in central directory order.
    pub fn entries(&self) -> &[ArchiveEntry] {
        &self.entries
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the archive has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entry at the given catalog position.
    pub fn get(&self, index: usize) -> Option<&ArchiveEntry> {
        self.entries.get(index)
    }

    /// Catalog position of the entry with the given name.
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.by_name.get(name).copied()
    }

    /// Entry with the given name.
    pub fn find(&self, name: &str) -> Option<&ArchiveEntry> {
        self.index_of(name).map(|index| &self.entries[index])
    }
}
