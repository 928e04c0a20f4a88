//! Copying tensor payloads into model storage.
//!
//! The archive only yields raw bytes; the element type and count of each tensor come from the
//! destination, which must be visited in the order the tensors were saved (for every module,
//! its parameters and then its buffers).

use std::io::{Read, Seek};

use byteorder::{ByteOrder, LittleEndian};
use half::{bf16, f16};

use crate::archive::PtArchive;
use crate::error::ArchiveError;

/// Errors raised while copying tensors into their destinations.
#[derive(thiserror::Error, Debug)]
pub enum LoadError {
    /// Error reading the archive.
    #[error("Archive error: {0}")]
    Archive(#[from] ArchiveError),

    /// The payload does not hold as many bytes as the destination expects.
    #[error(
        "Size mismatch for tensor {position}: destination expects {expected} bytes, archive holds {actual}"
    )]
    SizeMismatch {
        /// Position of the tensor in the archive order.
        position: usize,
        /// Byte length expected by the destination.
        expected: usize,
        /// Byte length of the payload.
        actual: usize,
    },

    /// The payload length is not a multiple of the element size.
    #[error("{len} bytes is not a multiple of the {dtype:?} element size")]
    UnalignedData {
        /// Payload length.
        len: usize,
        /// Declared storage type.
        dtype: StorageDType,
    },

    /// The storage type cannot be converted to the destination type.
    #[error("{dtype:?} storage cannot be converted to {target}")]
    UnsupportedConversion {
        /// Declared storage type.
        dtype: StorageDType,
        /// Destination element type.
        target: &'static str,
    },
}

/// Element type of a tensor storage, as saved by PyTorch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StorageDType {
    /// `torch.float64`
    F64,
    /// `torch.float32`
    F32,
    /// `torch.float16`
    F16,
    /// `torch.bfloat16`
    BF16,
    /// `torch.int64`
    I64,
    /// `torch.int32`
    I32,
    /// `torch.int16`
    I16,
    /// `torch.int8`
    I8,
    /// `torch.uint8`
    U8,
    /// `torch.bool`
    Bool,
}

impl StorageDType {
    /// Size of one element in bytes.
    pub fn size(&self) -> usize {
        match self {
            StorageDType::F64 | StorageDType::I64 => 8,
            StorageDType::F32 | StorageDType::I32 => 4,
            StorageDType::F16 | StorageDType::BF16 | StorageDType::I16 => 2,
            StorageDType::I8 | StorageDType::U8 | StorageDType::Bool => 1,
        }
    }
}

/// Byte length of `num_elements` elements of `dtype`, `None` when it overflows `usize`.
pub fn expected_len(dtype: StorageDType, num_elements: usize) -> Option<usize> {
    dtype.size().checked_mul(num_elements)
}

/// Checks that the payload of the tensor at `position` holds exactly `num_elements` elements.
pub fn check_len(
    position: usize,
    dtype: StorageDType,
    num_elements: usize,
    bytes: &[u8],
) -> Result<(), LoadError> {
    match expected_len(dtype, num_elements) {
        Some(expected) if expected == bytes.len() => Ok(()),
        // An overflowing length can never match a payload held in memory.
        expected => Err(LoadError::SizeMismatch {
            position,
            expected: expected.unwrap_or(usize::MAX),
            actual: bytes.len(),
        }),
    }
}

/// Decodes little-endian floating point storage into `f32` values.
pub fn decode_f32(bytes: &[u8], dtype: StorageDType) -> Result<Vec<f32>, LoadError> {
    if bytes.len() % dtype.size() != 0 {
        return Err(LoadError::UnalignedData {
            len: bytes.len(),
            dtype,
        });
    }

    let count = bytes.len() / dtype.size();
    let values = match dtype {
        StorageDType::F32 => {
            let mut values = vec![0.0; count];
            LittleEndian::read_f32_into(bytes, &mut values);
            values
        }
        StorageDType::F64 => {
            let mut wide = vec![0.0; count];
            LittleEndian::read_f64_into(bytes, &mut wide);
            wide.into_iter().map(|value| value as f32).collect()
        }
        StorageDType::F16 => half_bits(bytes, count)
            .map(|bits| f16::from_bits(bits).to_f32())
            .collect(),
        StorageDType::BF16 => half_bits(bytes, count)
            .map(|bits| bf16::from_bits(bits).to_f32())
            .collect(),
        StorageDType::I64
        | StorageDType::I32
        | StorageDType::I16
        | StorageDType::I8
        | StorageDType::U8
        | StorageDType::Bool => {
            return Err(LoadError::UnsupportedConversion {
                dtype,
                target: "f32",
            });
        }
    };

    Ok(values)
}

fn half_bits(bytes: &[u8], count: usize) -> impl Iterator<Item = u16> {
    let mut bits = vec![0u16; count];
    LittleEndian::read_u16_into(bytes, &mut bits);
    bits.into_iter()
}

/// Whether a tensor is a trainable parameter or a buffer such as running statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TensorKind {
    /// Trainable parameter.
    Parameter,
    /// Non-trainable buffer.
    Buffer,
}

/// Model storage receiving one tensor payload.
pub trait TensorDestination {
    /// Whether the destination is a parameter or a buffer.
    fn kind(&self) -> TensorKind;

    /// Element type the payload was saved with.
    fn storage_dtype(&self) -> StorageDType;

    /// Number of elements the destination holds.
    fn num_elements(&self) -> usize;

    /// Copies the payload in.
    ///
    /// `bytes` holds exactly `num_elements` elements of `storage_dtype`.
    fn assign(&mut self, bytes: &[u8]) -> Result<(), LoadError>;
}

/// `f32` storage filled from floating point payloads of any precision.
#[derive(new, Debug)]
pub struct F32Slot<'a> {
    data: &'a mut [f32],
    storage: StorageDType,
    kind: TensorKind,
}

impl TensorDestination for F32Slot<'_> {
    fn kind(&self) -> TensorKind {
        self.kind
    }

    fn storage_dtype(&self) -> StorageDType {
        self.storage
    }

    fn num_elements(&self) -> usize {
        self.data.len()
    }

    fn assign(&mut self, bytes: &[u8]) -> Result<(), LoadError> {
        let values = decode_f32(bytes, self.storage)?;
        for (dst, src) in self.data.iter_mut().zip(values) {
            *dst = src;
        }
        Ok(())
    }
}

/// Byte storage receiving the payload verbatim.
#[derive(Debug)]
pub struct RawSlot<'a> {
    data: &'a mut [u8],
    storage: StorageDType,
    kind: TensorKind,
}

impl<'a> RawSlot<'a> {
    /// Wraps `data`, which must hold a whole number of `storage` elements.
    pub fn new(
        data: &'a mut [u8],
        storage: StorageDType,
        kind: TensorKind,
    ) -> Result<Self, LoadError> {
        if data.len() % storage.size() != 0 {
            return Err(LoadError::UnalignedData {
                len: data.len(),
                dtype: storage,
            });
        }

        Ok(Self {
            data,
            storage,
            kind,
        })
    }
}

impl TensorDestination for RawSlot<'_> {
    fn kind(&self) -> TensorKind {
        self.kind
    }

    fn storage_dtype(&self) -> StorageDType {
        self.storage
    }

    fn num_elements(&self) -> usize {
        self.data.len() / self.storage.size()
    }

    fn assign(&mut self, bytes: &[u8]) -> Result<(), LoadError> {
        for (dst, src) in self.data.iter_mut().zip(bytes) {
            *dst = *src;
        }
        Ok(())
    }
}

/// Number of tensors copied by [load_into].
#[derive(new, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadSummary {
    /// Parameters assigned.
    pub parameters: usize,
    /// Buffers assigned.
    pub buffers: usize,
    /// Tensors left in the archive.
    pub unused: usize,
}

/// Fills every destination with the next tensor of the archive, in order.
///
/// Fails on the first tensor that cannot be read or whose size does not match its
/// destination. Destinations before it keep their new content.
pub fn load_into<'d, R, I>(
    archive: &mut PtArchive<R>,
    destinations: I,
) -> Result<LoadSummary, LoadError>
where
    R: Read + Seek,
    I: IntoIterator<Item = &'d mut dyn TensorDestination>,
{
    let mut summary = LoadSummary::default();

    for destination in destinations {
        let position = archive.stream().position();
        let bytes = archive.next_tensor()?;
        check_len(
            position,
            destination.storage_dtype(),
            destination.num_elements(),
            &bytes,
        )?;
        destination.assign(&bytes)?;

        match destination.kind() {
            TensorKind::Parameter => summary.parameters += 1,
            TensorKind::Buffer => summary.buffers += 1,
        }
    }

    summary.unused = archive.stream().remaining();
    log::info!(
        "Loaded {} parameters and {} buffers",
        summary.parameters,
        summary.buffers
    );
    if summary.unused > 0 {
        log::warn!("{} tensors of the archive were not used", summary.unused);
    }

    Ok(summary)
}
