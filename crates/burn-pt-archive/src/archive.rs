use std::fs::File;
use std::io::{BufReader, Read, Seek};
use std::path::Path;

use crate::config::LoadArgs;
use crate::container::{ArchiveEntry, ContainerIndex, read_stored};
use crate::error::{ArchiveError, Stage, StageContext};
use crate::order::{OrderStrategy, TensorCatalog, TensorOrder, resolve_order};
use crate::stream::TensorStream;

/// An opened PyTorch archive, handing out tensor payloads in parameter order.
///
/// The catalog and the tensor order are resolved when opening; tensor bytes are only read on
/// demand by [next_tensor](PtArchive::next_tensor).
pub struct PtArchive<R = BufReader<File>> {
    reader: R,
    index: ContainerIndex,
    root: String,
    stream: TensorStream,
}

impl PtArchive<BufReader<File>> {
    /// Opens the archive at `path` with the default [LoadArgs].
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, ArchiveError> {
        Self::open_with(LoadArgs::new(path.as_ref().to_path_buf()))
    }

    /// Opens the archive described by `args`.
    pub fn open_with(args: LoadArgs) -> Result<Self, ArchiveError> {
        let file = File::open(&args.file).at(Stage::TrailerScan)?;
        log::debug!("Opening PyTorch archive {}", args.file.display());

        Self::from_reader(BufReader::new(file), &args)
    }
}

impl<R: Read + Seek> PtArchive<R> {
    /// Opens an archive from any seekable source. `args.file` is not used.
    pub fn from_reader(mut reader: R, args: &LoadArgs) -> Result<Self, ArchiveError> {
        let index = ContainerIndex::read(&mut reader)?;
        let catalog = TensorCatalog::new(&index, args.root.as_deref());

        log::debug!(
            "Found {} tensor payloads under '{}/' ({} entries)",
            catalog.payload_count(),
            catalog.root(),
            index.len()
        );

        let order = resolve_order(&catalog, args.strategy, |position| {
            let entry = index.get(position).ok_or_else(|| {
                ArchiveError::format(
                    Stage::OrderResolve,
                    format!("descriptor position {position} is outside the catalog"),
                )
            })?;
            read_stored(&mut reader, entry, Stage::OrderResolve)
        })?;

        Ok(Self {
            reader,
            root: catalog.root().to_string(),
            index,
            stream: TensorStream::new(order),
        })
    }

    /// Returns the payload of the next tensor and moves the cursor past it.
    ///
    /// # Errors
    ///
    /// * [EndOfStream](ArchiveError::EndOfStream) once every tensor was handed out.
    /// * [UnsupportedCompression](ArchiveError::UnsupportedCompression) when the entry is
    ///   compressed. The cursor stays on that entry, so the error repeats on every call until
    ///   [skip](PtArchive::skip) moves past it.
    pub fn next_tensor(&mut self) -> Result<Vec<u8>, ArchiveError> {
        let position = self.stream.current()?;
        let entry = self.index.get(position).ok_or_else(|| {
            ArchiveError::format(
                Stage::StreamRead,
                format!("tensor position {position} is outside the catalog"),
            )
        })?;

        let bytes = read_stored(&mut self.reader, entry, Stage::StreamRead)?;
        log::trace!(
            "Tensor {} read from '{}' ({} bytes)",
            self.stream.position(),
            entry.name(),
            bytes.len()
        );
        self.stream.advance();

        Ok(bytes)
    }

    /// Moves the cursor past the next tensor without reading it.
    ///
    /// Returns [EndOfStream](ArchiveError::EndOfStream) once every tensor was handed out.
    pub fn skip(&mut self) -> Result<(), ArchiveError> {
        let position = self.stream.current()?;
        if let Some(entry) = self.index.get(position) {
            log::debug!("Skipping tensor {} ('{}')", self.stream.position(), entry.name());
        }
        self.stream.advance();

        Ok(())
    }

    /// Reads any stored entry by its full name, without touching the tensor cursor.
    pub fn read_entry(&mut self, name: &str) -> Result<Vec<u8>, ArchiveError> {
        let entry = self.index.find(name).ok_or_else(|| {
            ArchiveError::format(Stage::StreamRead, format!("no entry named '{name}'"))
        })?;

        read_stored(&mut self.reader, entry, Stage::StreamRead)
    }
}

impl<R> PtArchive<R> {
    /// Catalog of every entry in the archive.
    pub fn index(&self) -> &ContainerIndex {
        &self.index
    }

    /// Entries in central directory order.
    pub fn entries(&self) -> &[ArchiveEntry] {
        self.index.entries()
    }

    /// Top level directory of the archive.
    pub fn root(&self) -> &str {
        &self.root
    }

    /// The resolved tensor order.
    pub fn tensor_order(&self) -> &TensorOrder {
        self.stream.order()
    }

    /// The strategy that produced the tensor order.
    pub fn strategy(&self) -> OrderStrategy {
        self.stream.order().strategy()
    }

    /// Archive entries of the tensors, in replay order.
    pub fn tensor_entries(&self) -> impl Iterator<Item = &ArchiveEntry> {
        self.stream
            .order()
            .indices()
            .iter()
            .filter_map(|&position| self.index.get(position))
    }

    /// Cursor state of the tensor stream.
    pub fn stream(&self) -> &TensorStream {
        &self.stream
    }
}
