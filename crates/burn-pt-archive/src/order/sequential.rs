use super::{OrderBuilder, OrderStrategy, TensorCatalog, TensorOrder};

/// Orders payloads by their identifier when identifiers are `0, 1, 2, …`.
///
/// Only applies when every identifier is a plain decimal integer smaller than the number of
/// entries in the archive. Entries `0, 1, 2, …` are collected until one is missing, and the
/// result is kept only if it covers every payload entry.
pub fn sequential_index(catalog: &TensorCatalog) -> Option<TensorOrder> {
    let eligible = catalog.identifiers().all(|id| {
        !id.is_empty()
            && id.bytes().all(|b| b.is_ascii_digit())
            && id
                .parse::<usize>()
                .is_ok_and(|value| value < catalog.entry_count())
    });

    if !eligible {
        return None;
    }

    let mut order = OrderBuilder::new(catalog, OrderStrategy::SequentialIndex);
    for id in 0usize.. {
        let before = order.len();
        order.push_identifier(&id.to_string());
        if order.len() == before {
            break;
        }
    }

    (order.len() == catalog.payload_count()).then(|| order.finish())
}
