use crate::error::ArchiveError;
use crate::order::TensorOrder;

/// Forward-only cursor over a [TensorOrder].
///
/// The cursor only moves once a tensor has been handed out, so a failed read leaves it on the
/// entry that failed.
#[derive(new, Debug, Clone)]
pub struct TensorStream {
    order: TensorOrder,
    #[new(default)]
    cursor: usize,
}

impl TensorStream {
    /// Number of tensors already handed out.
    pub fn position(&self) -> usize {
        self.cursor
    }

    /// Number of tensors left.
    pub fn remaining(&self) -> usize {
        self.order.len() - self.cursor
    }

    /// Total number of tensors in the stream.
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Whether the stream holds no tensor at all.
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Whether every tensor has been handed out.
    pub fn is_exhausted(&self) -> bool {
        self.cursor >= self.order.len()
    }

    /// The order being replayed.
    pub fn order(&self) -> &TensorOrder {
        &self.order
    }

    /// Catalog position of the entry under the cursor.
    pub(crate) fn current(&self) -> Result<usize, ArchiveError> {
        self.order.get(self.cursor).ok_or(ArchiveError::EndOfStream {
            consumed: self.cursor,
        })
    }

    pub(crate) fn advance(&mut self) {
        if !self.is_exhausted() {
            self.cursor += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::order::{OrderStrategy, TensorCatalog};
    use crate::test_archive::TestArchive;

    fn stream(count: usize) -> TensorStream {
        let mut archive = TestArchive::new();
        for id in 0..count {
            archive = archive.stored(&format!("archive/data/{id}"), &[id as u8]);
        }
        let index = archive.index();
        let catalog = TensorCatalog::new(&index, None);
        TensorStream::new(OrderStrategy::SequentialIndex.resolve(&catalog, None).unwrap())
    }

    #[test]
    fn test_cursor_walks_the_order() {
        let mut stream = stream(3);
        assert_eq!(stream.len(), 3);

        for expected in 0..3 {
            assert_eq!(stream.position(), expected);
            assert_eq!(stream.remaining(), 3 - expected);
            assert_eq!(stream.current().unwrap(), expected);
            stream.advance();
        }

        assert!(stream.is_exhausted());
        assert_eq!(stream.remaining(), 0);
    }

    #[test]
    fn test_end_of_stream_keeps_cursor() {
        let mut stream = stream(1);
        stream.advance();

        for _ in 0..2 {
            let err = stream.current().unwrap_err();
            assert!(matches!(err, ArchiveError::EndOfStream { consumed: 1 }));
            stream.advance();
            assert_eq!(stream.position(), 1);
        }
    }

    #[test]
    fn test_empty_stream() {
        let stream = stream(0);

        assert!(stream.is_empty());
        assert!(stream.is_exhausted());
        assert!(matches!(
            stream.current(),
            Err(ArchiveError::EndOfStream { consumed: 0 })
        ));
    }
}
