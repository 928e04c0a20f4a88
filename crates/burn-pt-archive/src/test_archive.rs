//! Byte-exact archive fixtures for unit tests.

use std::io::Cursor;

use crate::container::ContainerIndex;
use crate::container::base::{CENTRAL_SIGNATURE, LOCAL_SIGNATURE, TRAILER_SIGNATURE};

/// Pickle `BINUNICODE` opcode, used by PyTorch for storage keys.
pub(crate) const BINUNICODE: u8 = b'X';

struct TestEntry {
    name: String,
    data: Vec<u8>,
    method: u16,
    local_extra: Vec<u8>,
    central_extra: Vec<u8>,
}

/// Writes small stored archives with full control over every header field.
#[derive(Default)]
pub(crate) struct TestArchive {
    entries: Vec<TestEntry>,
    comment: Vec<u8>,
}

impl TestArchive {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Adds a stored entry.
    pub(crate) fn stored(self, name: &str, data: &[u8]) -> Self {
        self.entry(name, data, 0)
    }

    /// Adds an entry tagged with `method`; the payload is written as given.
    pub(crate) fn entry(mut self, name: &str, data: &[u8], method: u16) -> Self {
        self.entries.push(TestEntry {
            name: name.to_string(),
            data: data.to_vec(),
            method,
            local_extra: Vec::new(),
            central_extra: Vec::new(),
        });
        self
    }

    /// Pads the local extra field of the last entry, the way PyTorch aligns tensor data.
    pub(crate) fn local_padding(mut self, len: usize) -> Self {
        if let Some(entry) = self.entries.last_mut() {
            entry.local_extra = vec![b'Z'; len];
        }
        self
    }

    /// Sets a central directory only extra field on the last entry.
    pub(crate) fn central_extra(mut self, extra: &[u8]) -> Self {
        if let Some(entry) = self.entries.last_mut() {
            entry.central_extra = extra.to_vec();
        }
        self
    }

    pub(crate) fn comment(mut self, comment: &[u8]) -> Self {
        self.comment = comment.to_vec();
        self
    }

    /// Builds the archive and reads its catalog back.
    pub(crate) fn index(&self) -> ContainerIndex {
        ContainerIndex::read(&mut Cursor::new(self.build())).unwrap()
    }

    pub(crate) fn build(&self) -> Vec<u8> {
        let mut out = Vec::new();
        let mut offsets = Vec::with_capacity(self.entries.len());

        for entry in &self.entries {
            offsets.push(out.len() as u32);
            out.extend_from_slice(&LOCAL_SIGNATURE.to_le_bytes());
            out.extend_from_slice(&20u16.to_le_bytes());
            out.extend_from_slice(&0u16.to_le_bytes());
            out.extend_from_slice(&entry.method.to_le_bytes());
            out.extend_from_slice(&[0u8; 8]);
            out.extend_from_slice(&(entry.data.len() as u32).to_le_bytes());
            out.extend_from_slice(&(entry.data.len() as u32).to_le_bytes());
            out.extend_from_slice(&(entry.name.len() as u16).to_le_bytes());
            out.extend_from_slice(&(entry.local_extra.len() as u16).to_le_bytes());
            out.extend_from_slice(entry.name.as_bytes());
            out.extend_from_slice(&entry.local_extra);
            out.extend_from_slice(&entry.data);
        }

        let directory_offset = out.len() as u32;
        for (entry, offset) in self.entries.iter().zip(offsets) {
            out.extend_from_slice(&CENTRAL_SIGNATURE.to_le_bytes());
            out.extend_from_slice(&20u16.to_le_bytes());
            out.extend_from_slice(&20u16.to_le_bytes());
            out.extend_from_slice(&0u16.to_le_bytes());
            out.extend_from_slice(&entry.method.to_le_bytes());
            out.extend_from_slice(&[0u8; 8]);
            out.extend_from_slice(&(entry.data.len() as u32).to_le_bytes());
            out.extend_from_slice(&(entry.data.len() as u32).to_le_bytes());
            out.extend_from_slice(&(entry.name.len() as u16).to_le_bytes());
            out.extend_from_slice(&(entry.central_extra.len() as u16).to_le_bytes());
            out.extend_from_slice(&0u16.to_le_bytes());
            out.extend_from_slice(&[0u8; 8]);
            out.extend_from_slice(&offset.to_le_bytes());
            out.extend_from_slice(entry.name.as_bytes());
            out.extend_from_slice(&entry.central_extra);
        }
        let directory_size = out.len() as u32 - directory_offset;

        let count = self.entries.len() as u16;
        out.extend_from_slice(&TRAILER_SIGNATURE.to_le_bytes());
        out.extend_from_slice(&0u16.to_le_bytes());
        out.extend_from_slice(&0u16.to_le_bytes());
        out.extend_from_slice(&count.to_le_bytes());
        out.extend_from_slice(&count.to_le_bytes());
        out.extend_from_slice(&directory_size.to_le_bytes());
        out.extend_from_slice(&directory_offset.to_le_bytes());
        out.extend_from_slice(&(self.comment.len() as u16).to_le_bytes());
        out.extend_from_slice(&self.comment);

        out
    }
}

/// Encodes a pickle `BINUNICODE` string.
pub(crate) fn binunicode(value: &str) -> Vec<u8> {
    let mut bytes = vec![BINUNICODE];
    bytes.extend_from_slice(&(value.len() as u32).to_le_bytes());
    bytes.extend_from_slice(value.as_bytes());
    bytes
}

/// A descriptor stream shaped like the persistent ids PyTorch writes for each storage:
/// `('storage', torch.FloatStorage, '<key>', 'cpu', numel)`.
pub(crate) fn storage_pickle(keys: &[&str]) -> Vec<u8> {
    let mut bytes = vec![0x80, 0x02, b'}', b'q', 0x00, b'('];
    for (position, key) in keys.iter().enumerate() {
        bytes.extend(binunicode(&format!("layer{position}.weight")));
        bytes.extend_from_slice(b"ctorch._utils\n_rebuild_tensor_v2\n(");
        bytes.extend(binunicode("storage"));
        bytes.extend_from_slice(b"ctorch\nFloatStorage\n");
        bytes.extend(binunicode(key));
        bytes.extend(binunicode("cpu"));
        bytes.extend_from_slice(&[b'K', 4, b't', b'Q', b'K', 0]);
    }
    bytes.extend_from_slice(b"u.");
    bytes
}
