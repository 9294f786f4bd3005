use std::{
    path::{Path, PathBuf},
    slice,
};

use log::{debug, info, warn};

use crate::{
    core::{
        item::{ItemReader, ItemWriter},
        options::{FileMode, OptionSet, OptionValue},
        record::Record,
    },
    error::CsvFileError,
    item::csv::{csv_reader::CsvRecordReaderBuilder, csv_writer::CsvRecordWriterBuilder},
};

/// A CSV file loaded into memory.
///
/// The file is parsed once, when the `CsvFile` is opened. Records can then be
/// read, replaced or edited in place, and written back with [`save`](CsvFile::save).
/// No file handle is kept between calls: opening and saving each open the
/// file, read or write it fully, and close it before returning.
///
/// Besides the usual iterators, a `CsvFile` carries a restartable cursor over
/// its records ([`rewind`](CsvFile::rewind), [`advance`](CsvFile::advance),
/// [`current`](CsvFile::current), [`key`](CsvFile::key), [`valid`](CsvFile::valid)).
///
/// # Examples
///
/// ```
/// use csvfile::{CsvFile, core::record::Record};
/// use tempfile::TempDir;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let dir = TempDir::new()?;
/// let path = dir.path().join("people.csv");
///
/// let mut people = CsvFile::builder().has_header(true).open(&path)?;
/// assert!(people.is_empty());
///
/// people.set_header(["First Name", "Age"]);
/// people.push([("first_name", "Ann"), ("age", "30")].into_iter().collect());
/// people.save()?;
///
/// let people = CsvFile::builder().has_header(true).open(&path)?;
/// assert_eq!(people.len(), 1);
/// assert_eq!(people.records()[0].get("first_name"), Some("Ann"));
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct CsvFile {
    path: PathBuf,
    options: OptionSet,
    header: Vec<String>,
    records: Vec<Record>,
    position: usize,
}

impl CsvFile {
    /// Opens and parses the file at `path`.
    ///
    /// An existing file is opened with the read mode and parsed. An absent
    /// file is opened with the write mode, which creates it for the default
    /// `w+` mode, and yields an empty document.
    ///
    /// # Errors
    /// `CsvFileError::Open` if the file cannot be opened with the mode it
    /// needs, `CsvFileError::Io` or `CsvFileError::ItemReader` if it cannot be
    /// read.
    pub fn open<P: AsRef<Path>>(path: P, options: OptionSet) -> Result<Self, CsvFileError> {
        let path = path.as_ref().to_path_buf();
        let (header, records) = Self::parse(&path, &options)?;

        Ok(CsvFile {
            path,
            options,
            header,
            records,
            position: 0,
        })
    }

    /// Starts a [`CsvFileBuilder`].
    pub fn builder() -> CsvFileBuilder {
        CsvFileBuilder::new()
    }

    fn parse(path: &Path, options: &OptionSet) -> Result<(Vec<String>, Vec<Record>), CsvFileError> {
        if !path.exists() {
            debug!(
                "CSV file {} does not exist, opening it with mode '{}'",
                path.display(),
                options.write_mode
            );
            options.write_mode.open(path)?;
            return Ok((Vec::new(), Vec::new()));
        }

        debug!(
            "Parsing CSV file {} with mode '{}'",
            path.display(),
            options.read_mode
        );

        let file = options.read_mode.open(path)?;
        let reader = CsvRecordReaderBuilder::from_options(options).from_reader(file)?;

        let mut records = Vec::new();
        while let Some(record) = reader.read()? {
            records.push(record);
        }

        if reader.skipped_count() > 0 {
            warn!(
                "Skipped {} malformed rows in {}",
                reader.skipped_count(),
                path.display()
            );
        }
        debug!("Parsed {} records from {}", records.len(), path.display());

        Ok((reader.into_header(), records))
    }

    /// Writes the header (in header mode) and every record back to the file.
    ///
    /// The file is opened with the write mode, which truncates it for the
    /// default `w+` mode. The writer is closed even when a write fails; the
    /// file may then hold only part of the records.
    ///
    /// # Errors
    /// `CsvFileError::Open` if the file cannot be opened,
    /// `CsvFileError::ItemWriter` or `CsvFileError::Io` if writing fails.
    pub fn save(&self) -> Result<(), CsvFileError> {
        debug!(
            "Saving {} records to {} with mode '{}'",
            self.records.len(),
            self.path.display(),
            self.options.write_mode
        );

        let file = self.options.write_mode.open(&self.path)?;
        let header: &[String] = if self.options.header {
            &self.header
        } else {
            &[]
        };

        let writer = CsvRecordWriterBuilder::from_options(&self.options)
            .header(header.iter().cloned())
            .from_writer(file)?;

        let written = writer
            .open()
            .and_then(|()| writer.write(&self.records))
            .and_then(|()| writer.flush());
        let closed = writer.close();
        written.and(closed)?;

        info!(
            "Saved {} records to {}",
            self.records.len(),
            self.path.display()
        );
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn options(&self) -> &OptionSet {
        &self.options
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    /// Mutable access to the records. No shape check is performed.
    pub fn records_mut(&mut self) -> &mut Vec<Record> {
        &mut self.records
    }

    /// Replaces every record and rewinds the cursor.
    ///
    /// Records are not checked against the header mode: mixing positional and
    /// named records is the caller's responsibility.
    pub fn set_records(&mut self, records: Vec<Record>) -> &mut Self {
        self.records = records;
        self.position = 0;
        self
    }

    pub fn push(&mut self, record: Record) -> &mut Self {
        self.records.push(record);
        self
    }

    /// Header row as read from the file or last set, empty without a header.
    pub fn header(&self) -> &[String] {
        &self.header
    }

    /// Replaces the header.
    ///
    /// Each column name is trimmed, and columns that are empty after trimming
    /// are removed. Removal shifts every later column one position left, so
    /// a header with blank columns no longer lines up with positional values.
    ///
    /// ```
    /// # use csvfile::CsvFile;
    /// # let dir = tempfile::TempDir::new().unwrap();
    /// let mut file = CsvFile::builder().open(dir.path().join("data.csv")).unwrap();
    /// file.set_header([" Name ", "  ", "Age"]);
    /// assert_eq!(file.header(), ["Name", "Age"]);
    /// ```
    pub fn set_header<I, S>(&mut self, header: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.header = header
            .into_iter()
            .map(|column| column.as_ref().trim().to_string())
            .filter(|column| !column.is_empty())
            .collect();
        self
    }

    /// Value of an option, `None` for unknown names.
    pub fn option(&self, name: &str) -> Option<OptionValue> {
        self.options.get(name)
    }

    /// Sets an option by name. Unknown names and unfit values are ignored.
    ///
    /// Options only affect later calls: records already loaded are not parsed
    /// again.
    pub fn set_option<V: Into<OptionValue>>(&mut self, name: &str, value: V) -> &mut Self {
        self.options.set(name, value);
        self
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> slice::Iter<'_, Record> {
        self.records.iter()
    }

    pub fn iter_mut(&mut self) -> slice::IterMut<'_, Record> {
        self.records.iter_mut()
    }

    /// Moves the cursor back to the first record and returns it.
    pub fn rewind(&mut self) -> Option<&Record> {
        self.position = 0;
        self.current()
    }

    /// Moves the cursor to the next record and returns it, `None` once the
    /// cursor has passed the last record.
    pub fn advance(&mut self) -> Option<&Record> {
        if self.position < self.records.len() {
            self.position += 1;
        }
        self.current()
    }

    /// Record under the cursor.
    pub fn current(&self) -> Option<&Record> {
        self.records.get(self.position)
    }

    /// Index of the record under the cursor.
    pub fn key(&self) -> Option<usize> {
        self.valid().then_some(self.position)
    }

    /// Whether the cursor is on a record.
    pub fn valid(&self) -> bool {
        self.position < self.records.len()
    }
}

impl<'a> IntoIterator for &'a CsvFile {
    type Item = &'a Record;
    type IntoIter = slice::Iter<'a, Record>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

impl<'a> IntoIterator for &'a mut CsvFile {
    type Item = &'a mut Record;
    type IntoIter = slice::IterMut<'a, Record>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter_mut()
    }
}

/// Builder for opening a [`CsvFile`] with custom options.
///
/// # Examples
///
/// ```no_run
/// use csvfile::CsvFileBuilder;
///
/// # fn example() -> Result<(), csvfile::CsvFileError> {
/// let file = CsvFileBuilder::new()
///     .separator(b';')
///     .text_delimiter(b'\'')
///     .has_header(true)
///     .write_mode("a".parse()?)
///     .open("./exports/orders.csv")?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, Default)]
pub struct CsvFileBuilder {
    options: OptionSet,
}

impl CsvFileBuilder {
    pub fn new() -> Self {
        Self {
            options: OptionSet::default(),
        }
    }

    /// Replaces every option at once.
    pub fn options(mut self, options: OptionSet) -> Self {
        self.options = options;
        self
    }

    pub fn separator(mut self, separator: u8) -> Self {
        self.options.separator = separator;
        self
    }

    pub fn text_delimiter(mut self, text_delimiter: u8) -> Self {
        self.options.text_delimiter = text_delimiter;
        self
    }

    /// Maximum row length in bytes, 0 for unbounded.
    pub fn length(mut self, length: usize) -> Self {
        self.options.length = length;
        self
    }

    pub fn fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.options.fields = fields.into_iter().map(Into::into).collect();
        self
    }

    pub fn read_mode(mut self, mode: FileMode) -> Self {
        self.options.read_mode = mode;
        self
    }

    pub fn write_mode(mut self, mode: FileMode) -> Self {
        self.options.write_mode = mode;
        self
    }

    pub fn has_header(mut self, yes: bool) -> Self {
        self.options.header = yes;
        self
    }

    /// Opens and parses the file at `path`, see [`CsvFile::open`].
    pub fn open<P: AsRef<Path>>(self, path: P) -> Result<CsvFile, CsvFileError> {
        CsvFile::open(path, self.options)
    }
}
