use super::{OrderBuilder, OrderStrategy, TensorCatalog, TensorOrder};

/// Pickle `BINUNICODE` opcode: a 4-byte little-endian length followed by UTF-8 bytes.
///
/// PyTorch writes storage keys of persistent ids with it.
pub const TOKEN_MARKER: u8 = b'X';

const LENGTH_SIZE: usize = 4;

/// Orders payloads by the numeric strings found in the descriptor stream.
///
/// Every marker byte is tentatively read as a length-prefixed string. A string made only of
/// decimal digits is a storage identifier and the scan resumes after it. Anything else means
/// the marker was ordinary content: the length prefix is given back and the scan resumes on
/// the byte right after the marker.
pub fn length_prefixed_tokens(catalog: &TensorCatalog, descriptor: &[u8]) -> TensorOrder {
    let mut order = OrderBuilder::new(catalog, OrderStrategy::LengthPrefixedToken);
    let mut pos = 0;

    while pos < descriptor.len() {
        if descriptor[pos] != TOKEN_MARKER {
            pos += 1;
            continue;
        }

        pos += 1;
        match numeric_token(descriptor, pos) {
            Some((token, end)) => {
                order.push_identifier(token);
                pos = end;
            }
            // The length prefix was not one, rewind to just after the marker.
            None => continue,
        }
    }

    order.finish()
}

/// Reads a length-prefixed string starting at `pos` when it only holds ASCII digits.
///
/// Returns the string and the position following it.
fn numeric_token(descriptor: &[u8], pos: usize) -> Option<(&str, usize)> {
    let length_end = pos.checked_add(LENGTH_SIZE)?;
    let length: [u8; LENGTH_SIZE] = descriptor.get(pos..length_end)?.try_into().ok()?;
    let length = u32::from_le_bytes(length) as usize;

    let end = length_end.checked_add(length)?;
    let candidate = descriptor.get(length_end..end)?;
    if !candidate.iter().all(u8::is_ascii_digit) {
        return None;
    }

    // Digits are ASCII, the conversion cannot fail.
    let token = core::str::from_utf8(candidate).ok()?;
    Some((token, end))
}
