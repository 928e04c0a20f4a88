//! Reconstruction of the order in which tensors were saved.
//!
//! The container does not record which storage belongs to which parameter. The order is
//! recovered either from the storage identifiers themselves, when they are consecutive
//! integers, or by scanning the pickle descriptor stream for the identifiers it references.
//! Producer versions differ in how identifiers are written, hence the three strategies.

/// Payload entries keyed by storage identifier.
pub mod catalog;
/// Identifiers written as plain decimal text.
pub mod digit_run;
/// Strategy selection and fallback.
pub mod resolver;
/// Identifiers that are consecutive integers.
pub mod sequential;
/// Identifiers written as length-prefixed pickle strings.
pub mod token;

pub use catalog::TensorCatalog;
pub use resolver::resolve_order;

use core::fmt;
use std::collections::HashSet;

/// A way of recovering the tensor order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OrderStrategy {
    /// Identifiers are the consecutive integers `0, 1, 2, …`.
    SequentialIndex,
    /// Identifiers are read from length-prefixed strings in the descriptor stream.
    LengthPrefixedToken,
    /// Identifiers are runs of decimal digits in the descriptor stream.
    DigitRun,
}

impl OrderStrategy {
    /// Whether the strategy scans the descriptor stream.
    pub fn needs_descriptor(&self) -> bool {
        !matches!(self, OrderStrategy::SequentialIndex)
    }

    /// Runs the strategy.
    ///
    /// Returns `None` when the strategy is not applicable: identifiers that are not
    /// consecutive integers for [SequentialIndex](OrderStrategy::SequentialIndex), or a
    /// missing descriptor stream for the scanning strategies. Scanning strategies may return
    /// an order shorter than the number of payload entries.
    pub fn resolve(
        &self,
        catalog: &TensorCatalog,
        descriptor: Option<&[u8]>,
    ) -> Option<TensorOrder> {
        match self {
            OrderStrategy::SequentialIndex => sequential::sequential_index(catalog),
            OrderStrategy::LengthPrefixedToken => {
                descriptor.map(|bytes| token::length_prefixed_tokens(catalog, bytes))
            }
            OrderStrategy::DigitRun => {
                descriptor.map(|bytes| digit_run::digit_runs(catalog, bytes))
            }
        }
    }
}

impl fmt::Display for OrderStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OrderStrategy::SequentialIndex => "sequential-index",
            OrderStrategy::LengthPrefixedToken => "length-prefixed-token",
            OrderStrategy::DigitRun => "digit-run",
        };
        f.write_str(name)
    }
}

/// Catalog positions of the tensor payload entries, in the order they must be replayed.
///
/// No position appears twice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TensorOrder {
    indices: Vec<usize>,
    strategy: OrderStrategy,
}

impl TensorOrder {
    /// Catalog positions in replay order.
    pub fn indices(&self) -> &[usize] {
        &self.indices
    }

    /// The strategy that produced the order.
    pub fn strategy(&self) -> OrderStrategy {
        self.strategy
    }

    /// Number of tensors.
    pub fn len(&self) -> usize {
        self.indices.len()
    }

    /// Whether no tensor was found.
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Catalog position of the tensor at `position` in replay order.
    pub fn get(&self, position: usize) -> Option<usize> {
        self.indices.get(position).copied()
    }
}

/// Accumulates an order, keeping the first occurrence of every entry.
pub(crate) struct OrderBuilder<'a> {
    catalog: &'a TensorCatalog,
    strategy: OrderStrategy,
    indices: Vec<usize>,
    seen: HashSet<usize>,
}

impl<'a> OrderBuilder<'a> {
    pub(crate) fn new(catalog: &'a TensorCatalog, strategy: OrderStrategy) -> Self {
        Self {
            catalog,
            strategy,
            indices: Vec::with_capacity(catalog.payload_count()),
            seen: HashSet::with_capacity(catalog.payload_count()),
        }
    }

    /// Appends the payload entry named by `id`.
    ///
    /// Identifiers without a payload entry are skipped: descriptor streams reference
    /// plenty of digit strings unrelated to storages.
    pub(crate) fn push_identifier(&mut self, id: &str) {
        match self.catalog.lookup(id) {
            Some(index) => {
                if self.seen.insert(index) {
                    self.indices.push(index);
                }
            }
            None => log::trace!("{}: no payload entry named '{id}', skipped", self.strategy),
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.indices.len()
    }

    pub(crate) fn finish(self) -> TensorOrder {
        TensorOrder {
            indices: self.indices,
            strategy: self.strategy,
        }
    }
}
