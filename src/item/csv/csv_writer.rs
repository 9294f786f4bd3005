use std::{
    cell::RefCell,
    fs::File,
    io::{self, Write},
    path::Path,
    result,
};

use csv::{Writer, WriterBuilder};
use log::debug;

use crate::{
    core::{
        item::{ItemWriter, ItemWriterResult},
        options::{DEFAULT_TEXT_DELIMITER, OptionSet},
        record::Record,
    },
    error::CsvFileError,
};

/// Writes records as delimited rows.
///
/// Positional records are written as is. Named records are written by value,
/// in insertion order, the field names are discarded.
pub struct CsvRecordWriter<T: Write> {
    wrapper: RefCell<Writer<T>>,
}

impl<T: Write> ItemWriter<Record> for CsvRecordWriter<T> {
    fn write(&self, items: &[Record]) -> ItemWriterResult {
        let mut wrapper = self.wrapper.borrow_mut();
        for item in items {
            wrapper
                .write_record(item.values())
                .map_err(|error| CsvFileError::ItemWriter(error.to_string()))?;
        }
        Ok(())
    }

    /// Flush the contents of the internal buffer to the underlying writer.
    ///
    /// If there was a problem writing to the underlying writer, then an error
    /// is returned.
    ///
    /// Note that this also flushes the underlying writer.
    fn flush(&self) -> ItemWriterResult {
        let result = self.wrapper.borrow_mut().flush();
        match result {
            Ok(()) => Ok(()),
            Err(error) => Err(CsvFileError::ItemWriter(error.to_string())),
        }
    }

    fn close(&self) -> ItemWriterResult {
        self.flush()
    }
}

impl<T: Write> CsvRecordWriter<T> {
    pub fn into_inner(self) -> result::Result<T, CsvFileError> {
        let result = self.wrapper.into_inner().into_inner();
        match result {
            Ok(inner) => Ok(inner),
            Err(error) => Err(CsvFileError::ItemWriter(error.to_string())),
        }
    }
}

/// A builder for configuring CSV record writing.
///
/// The header row, when given, is written with the separator and the default
/// `"` quote. Data rows use the configured quote character. Fields are quoted
/// only when they hold the separator, the quote or a line break, and embedded
/// quotes are doubled. Rows end with `\n` and may differ in length.
pub struct CsvRecordWriterBuilder {
    separator: u8,
    quote: u8,
    header: Vec<String>,
}

impl Default for CsvRecordWriterBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl CsvRecordWriterBuilder {
    pub fn new() -> CsvRecordWriterBuilder {
        CsvRecordWriterBuilder {
            separator: b',',
            quote: DEFAULT_TEXT_DELIMITER,
            header: Vec::new(),
        }
    }

    /// Takes separator and quote from `options`. The header is left unset.
    pub fn from_options(options: &OptionSet) -> CsvRecordWriterBuilder {
        CsvRecordWriterBuilder {
            separator: options.separator,
            quote: options.text_delimiter,
            header: Vec::new(),
        }
    }

    pub fn separator(mut self, separator: u8) -> CsvRecordWriterBuilder {
        self.separator = separator;
        self
    }

    pub fn quote(mut self, quote: u8) -> CsvRecordWriterBuilder {
        self.quote = quote;
        self
    }

    /// Sets the header row. An empty header writes no header row.
    pub fn header<I, S>(mut self, header: I) -> CsvRecordWriterBuilder
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.header = header.into_iter().map(Into::into).collect();
        self
    }

    /// Creates a `CsvRecordWriter` writing to `path`, created or truncated.
    ///
    /// # Errors
    /// `CsvFileError::Open` if the file cannot be created.
    pub fn from_path<P: AsRef<Path>>(self, path: P) -> Result<CsvRecordWriter<File>, CsvFileError> {
        let path = path.as_ref();
        let file = File::create(path).map_err(|source| CsvFileError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        self.from_writer(file)
    }

    /// Creates a `CsvRecordWriter` over any writer, writing the header row
    /// right away.
    ///
    /// # Example
    ///
    /// ```
    /// # use std::error::Error;
    /// # use csvfile::{item::csv::csv_writer::CsvRecordWriterBuilder, core::item::ItemWriter, core::record::Record};
    /// # fn main() { example().unwrap(); }
    /// fn example() -> Result<(), Box<dyn Error>> {
    ///     let wtr = CsvRecordWriterBuilder::new()
    ///         .separator(b';')
    ///         .quote(b'\'')
    ///         .header(["City; Town", "Country"])
    ///         .from_writer(vec![])?;
    ///
    ///     let boston: Record = [("city", "Boston"), ("country", "United States")].into_iter().collect();
    ///     wtr.write(&[boston, Record::from(vec!["Lyon; Rhône", "France"])])?;
    ///
    ///     let data = String::from_utf8(wtr.into_inner()?)?;
    ///     assert_eq!(data, "\
    /// \"City; Town\";Country
    /// Boston;United States
    /// 'Lyon; Rhône';France
    /// ");
    ///     Ok(())
    /// }
    /// ```
    ///
    /// # Errors
    /// `CsvFileError::ItemWriter` or `CsvFileError::Io` if the header row
    /// cannot be written.
    pub fn from_writer<W: io::Write>(self, mut wtr: W) -> Result<CsvRecordWriter<W>, CsvFileError> {
        if !self.header.is_empty() {
            let mut header_wtr = WriterBuilder::new()
                .flexible(true)
                .delimiter(self.separator)
                .quote(DEFAULT_TEXT_DELIMITER)
                .from_writer(&mut wtr);
            header_wtr
                .write_record(&self.header)
                .map_err(|error| CsvFileError::ItemWriter(error.to_string()))?;
            header_wtr.flush()?;
            debug!("Wrote CSV header with {} columns", self.header.len());
        }

        let wtr = WriterBuilder::new()
            .flexible(true)
            .delimiter(self.separator)
            .quote(self.quote)
            .from_writer(wtr);

        Ok(CsvRecordWriter {
            wrapper: RefCell::new(wtr),
        })
    }
}
