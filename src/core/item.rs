use crate::error::CsvFileError;

/// Result of a single read: `Ok(None)` once the source is exhausted.
pub type ItemReaderResult<I> = Result<Option<I>, CsvFileError>;

/// Result of a write, flush, open or close on an [`ItemWriter`].
pub type ItemWriterResult = Result<(), CsvFileError>;

/// A source of items, read one at a time.
pub trait ItemReader<I> {
    fn read(&self) -> ItemReaderResult<I>;
}

/// A sink of items, written one batch at a time.
///
/// `open` and `close` bracket the writes. Callers are expected to call
/// `close` even when a write failed.
pub trait ItemWriter<O> {
    fn write(&self, items: &[O]) -> ItemWriterResult;

    fn flush(&self) -> ItemWriterResult {
        Ok(())
    }

    fn open(&self) -> ItemWriterResult {
        Ok(())
    }

    fn close(&self) -> ItemWriterResult {
        Ok(())
    }
}
