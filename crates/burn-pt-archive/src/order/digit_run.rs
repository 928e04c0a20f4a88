use super::{OrderBuilder, OrderStrategy, TensorCatalog, TensorOrder};

/// Orders payloads by the runs of decimal digits found in the descriptor stream.
///
/// Older producers keyed storages by memory addresses written as plain decimal text, so every
/// maximal run of ASCII digits is a candidate identifier. A run is only considered once a
/// non-digit byte ends it: a run touching the end of the stream is dropped.
pub fn digit_runs(catalog: &TensorCatalog, descriptor: &[u8]) -> TensorOrder {
    let mut order = OrderBuilder::new(catalog, OrderStrategy::DigitRun);
    let mut run_start = None;

    for (pos, byte) in descriptor.iter().enumerate() {
        if byte.is_ascii_digit() {
            run_start.get_or_insert(pos);
            continue;
        }

        if let Some(start) = run_start.take() {
            // The run only holds ASCII digits.
            if let Ok(candidate) = core::str::from_utf8(&descriptor[start..pos]) {
                order.push_identifier(candidate);
            }
        }
    }

    order.finish()
}
