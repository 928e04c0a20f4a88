#![warn(missing_docs)]
#![cfg_attr(docsrs, feature(doc_cfg))]

//! `burn-pt-archive` reads the tensor payloads of PyTorch checkpoints (`.pt` files written by
//! `torch.save`) without a pickle interpreter.
//!
//! A checkpoint is a ZIP archive whose `data/` entries hold raw tensor storages. The archive is
//! cataloged, the order in which tensors were saved is recovered, and payloads are then handed
//! out one at a time, ready to be copied into model storage in that same order.
//!
//! ```no_run
//! use burn_pt_archive::PtArchive;
//!
//! let mut archive = PtArchive::open("yolov5s.pt").expect("Failed to open archive");
//! while let Ok(bytes) = archive.next_tensor() {
//!     println!("{} bytes", bytes.len());
//! }
//! ```

#[macro_use]
extern crate derive_new;

pub mod apply;

pub mod container;

/// Logger setup for binaries.
pub mod logger;

pub mod order;

mod archive;
mod config;
mod error;
mod stream;

#[cfg(test)]
mod test_archive;

pub use archive::PtArchive;
pub use config::LoadArgs;
pub use container::{ArchiveEntry, ContainerIndex};
pub use error::{ArchiveError, Stage};
pub use order::{OrderStrategy, TensorOrder};
pub use stream::TensorStream;
