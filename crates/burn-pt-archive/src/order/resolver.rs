use super::{OrderStrategy, TensorCatalog, TensorOrder};
use crate::error::{ArchiveError, Stage};

/// Resolves the tensor order of an archive.
///
/// Without a `forced` strategy, strategies are tried from cheapest to most permissive:
/// sequential identifiers first (the descriptor is never read), then length-prefixed tokens,
/// and digit runs when tokens do not account for every payload entry.
///
/// `read_descriptor` is given the catalog position of the descriptor entry and is called at
/// most once, only when a scanning strategy runs.
pub fn resolve_order<F>(
    catalog: &TensorCatalog,
    forced: Option<OrderStrategy>,
    read_descriptor: F,
) -> Result<TensorOrder, ArchiveError>
where
    F: FnOnce(usize) -> Result<Vec<u8>, ArchiveError>,
{
    let expected = catalog.payload_count();

    let order = match forced {
        Some(strategy) => {
            let descriptor = match strategy.needs_descriptor() {
                true => Some(descriptor_bytes(catalog, read_descriptor)?),
                false => None,
            };
            run(strategy, catalog, descriptor.as_deref())?
        }
        None => match OrderStrategy::SequentialIndex.resolve(catalog, None) {
            Some(order) => order,
            None => {
                let descriptor = descriptor_bytes(catalog, read_descriptor)?;
                let order = run(OrderStrategy::LengthPrefixedToken, catalog, Some(&descriptor))?;

                if order.len() < expected {
                    log::debug!(
                        "{} strategy found {} of {expected} tensors, trying {}",
                        order.strategy(),
                        order.len(),
                        OrderStrategy::DigitRun
                    );
                    run(OrderStrategy::DigitRun, catalog, Some(&descriptor))?
                } else {
                    order
                }
            }
        },
    };

    if order.len() < expected {
        log::warn!(
            "Only {} of {expected} tensors could be ordered with the {} strategy",
            order.len(),
            order.strategy()
        );
    } else {
        log::info!(
            "Resolved the order of {} tensors with the {} strategy",
            order.len(),
            order.strategy()
        );
    }

    Ok(order)
}

fn run(
    strategy: OrderStrategy,
    catalog: &TensorCatalog,
    descriptor: Option<&[u8]>,
) -> Result<TensorOrder, ArchiveError> {
    strategy.resolve(catalog, descriptor).ok_or_else(|| {
        ArchiveError::format(
            Stage::OrderResolve,
            format!(
                "the {strategy} strategy does not apply to the {} tensors under '{}/data/'",
                catalog.payload_count(),
                catalog.root()
            ),
        )
    })
}

fn descriptor_bytes<F>(
    catalog: &TensorCatalog,
    read_descriptor: F,
) -> Result<Vec<u8>, ArchiveError>
where
    F: FnOnce(usize) -> Result<Vec<u8>, ArchiveError>,
{
    let index = catalog.descriptor().ok_or_else(|| {
        ArchiveError::format(
            Stage::OrderResolve,
            format!("no root descriptor '{}'", catalog.descriptor_name()),
        )
    })?;

    read_descriptor(index)
}
