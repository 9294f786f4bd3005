/// CSV support for reading and writing delimited records.
///
/// # Module Architecture
///
/// The CSV module consists of two main components:
///
/// 1. **CsvRecordReader**: splits delimited text into [`Record`](crate::core::record::Record)s,
///    positional ones by default, or named ones keyed by a normalized header row.
///
/// 2. **CsvRecordWriter**: writes records back as delimited rows, after an
///    optional header row.
///
/// Both components follow the builder pattern and can be configured directly
/// or from an [`OptionSet`](crate::core::options::OptionSet). They implement
/// the crate's `ItemReader` and `ItemWriter` traits; [`CsvFile`](crate::CsvFile)
/// drives them to load and save whole files.
///
/// # Quoting asymmetry
///
/// The header row is always read and written with the default `"` quote,
/// while data rows use the configured quote character. A file saved with a
/// custom quote therefore reads back identically.
///
/// # Examples
///
/// ```
/// use csvfile::item::csv::{csv_reader::CsvRecordReaderBuilder, csv_writer::CsvRecordWriterBuilder};
/// use csvfile::core::item::{ItemReader, ItemWriter};
///
/// let reader = CsvRecordReaderBuilder::new()
///     .has_header(true)
///     .from_reader("City,Pop\nBoston,4628910\n".as_bytes())
///     .unwrap();
///
/// let mut records = Vec::new();
/// while let Some(record) = reader.read().unwrap() {
///     records.push(record);
/// }
/// assert_eq!(records[0].get("pop"), Some("4628910"));
///
/// let writer = CsvRecordWriterBuilder::new()
///     .separator(b'|')
///     .header(reader.header().to_vec())
///     .from_writer(vec![])
///     .unwrap();
/// writer.write(&records).unwrap();
///
/// let output = String::from_utf8(writer.into_inner().unwrap()).unwrap();
/// assert_eq!(output, "City|Pop\nBoston|4628910\n");
/// ```

/// A module providing facilities for reading CSV data records.
pub mod csv_reader;

/// A module providing facilities for writing CSV data records.
pub mod csv_writer;
