use csv::{ByteRecord, Reader, ReaderBuilder, Trim};
use indexmap::IndexMap;
use log::{debug, warn};
use std::{
    cell::{Cell, RefCell},
    collections::VecDeque,
    fs::File,
    io::{Cursor, Read},
    path::Path,
};

use crate::{
    core::{
        item::{ItemReader, ItemReaderResult},
        options::{DEFAULT_TEXT_DELIMITER, OptionSet},
        record::{Record, normalize_field_name},
    },
    error::CsvFileError,
};

/// A CSV record reader that implements the `ItemReader` trait.
///
/// The whole source is buffered when the reader is built, which closes the
/// source before the first record is read. Rows are then split lazily, one
/// per call to `read`.
///
/// Without a header every row becomes a [`Record::Positional`]. With a header
/// the first row is consumed as column names and every later row becomes a
/// [`Record::Named`] keyed by the normalized names:
///
/// - a column whose header cell is empty is dropped,
/// - values beyond the last header column are dropped,
/// - header columns beyond the last value are absent from the record.
///
/// Rows are never trimmed and may have differing lengths. Blank lines are
/// skipped. A trailing row whose quoted field is never closed is skipped and
/// counted in [`skipped_count`](CsvRecordReader::skipped_count). A row longer
/// than the configured `length` is cut into chunks of at most `length` bytes,
/// each read as a row of its own, so no data is lost.
///
/// # Examples
///
/// ```
/// use csvfile::item::csv::csv_reader::CsvRecordReaderBuilder;
/// use csvfile::core::item::ItemReader;
///
/// let data = "\
/// First Name,,Age
/// Ann,x,30
/// ";
///
/// let reader = CsvRecordReaderBuilder::new()
///     .has_header(true)
///     .from_reader(data.as_bytes())
///     .unwrap();
///
/// let record = reader.read().unwrap().unwrap();
/// assert_eq!(record.get("first_name"), Some("Ann"));
/// assert_eq!(record.get("age"), Some("30"));
/// assert_eq!(record.len(), 2);
///
/// assert!(reader.read().unwrap().is_none());
/// ```
pub struct CsvRecordReader {
    /// Header row as read, empty without a header
    header: Vec<String>,
    /// Record key per header column, `None` where the header cell is empty
    keys: Vec<Option<String>>,
    has_header: bool,
    separator: u8,
    quote: u8,
    length: usize,
    source: RefCell<RecordSource>,
    /// Rows cut from an over-long line, waiting to be returned
    pending: RefCell<VecDeque<Vec<String>>>,
    skipped: Cell<usize>,
}

struct RecordSource {
    reader: Reader<Cursor<Vec<u8>>>,
    /// Offset of the first data row in the buffer
    offset: usize,
    /// Lines consumed by the header row
    lines_before: u64,
    record: ByteRecord,
}

impl RecordSource {
    /// Reads the next row and returns it with its raw bytes.
    fn next(&mut self) -> Result<Option<(Vec<String>, &[u8])>, csv::Error> {
        if !self.reader.read_byte_record(&mut self.record)? {
            return Ok(None);
        }

        let start = self.offset + record_start(&self.record);
        let end = self.offset + self.reader.position().byte() as usize;

        let values = self
            .record
            .iter()
            .map(|field| String::from_utf8_lossy(field).into_owned())
            .collect();

        let data = self.reader.get_ref().get_ref();
        let raw = trim_line_breaks(&data[start.min(data.len())..end.min(data.len())]);

        Ok(Some((values, raw)))
    }
}

fn record_start(record: &ByteRecord) -> usize {
    record
        .position()
        .map(|position| position.byte() as usize)
        .unwrap_or_default()
}

fn trim_line_breaks(raw: &[u8]) -> &[u8] {
    let is_break = |b: &u8| *b == b'\r' || *b == b'\n';
    let start = raw.iter().position(|b| !is_break(b)).unwrap_or(raw.len());
    let end = raw.iter().rposition(|b| !is_break(b)).map_or(start, |i| i + 1);
    &raw[start..end]
}

/// Whether a raw row ends inside a quoted field.
///
/// Mirrors the csv crate's quoting rules: a quote opens a quoted field only at
/// the start of a field, and a doubled quote inside it is an escaped quote.
fn has_unterminated_quote(raw: &[u8], separator: u8, quote: u8) -> bool {
    #[derive(PartialEq)]
    enum State {
        FieldStart,
        Unquoted,
        Quoted,
        QuoteInQuoted,
    }

    let mut state = State::FieldStart;
    for &byte in raw {
        state = match state {
            State::FieldStart if byte == quote => State::Quoted,
            State::FieldStart | State::Unquoted if byte == separator => State::FieldStart,
            State::FieldStart | State::Unquoted => State::Unquoted,
            State::Quoted if byte == quote => State::QuoteInQuoted,
            State::Quoted => State::Quoted,
            State::QuoteInQuoted if byte == quote => State::Quoted,
            State::QuoteInQuoted if byte == separator => State::FieldStart,
            State::QuoteInQuoted => State::Unquoted,
        };
    }
    state == State::Quoted
}

fn row_reader(separator: u8, quote: u8) -> ReaderBuilder {
    let mut builder = ReaderBuilder::new();
    builder
        .trim(Trim::None)
        .delimiter(separator)
        .quote(quote)
        .has_headers(false)
        .flexible(true);
    builder
}

/// Cuts a raw row into chunks of at most `length` bytes.
///
/// A cut never falls inside a UTF-8 sequence unless the sequence alone is
/// longer than `length`.
fn split_long_row(raw: &[u8], length: usize) -> Vec<&[u8]> {
    let mut chunks = Vec::new();
    let mut rest = raw;
    while rest.len() > length {
        let mut cut = length;
        while cut > 0 && rest[cut] & 0xC0 == 0x80 {
            cut -= 1;
        }
        if cut == 0 {
            cut = length;
        }
        let (chunk, tail) = rest.split_at(cut);
        chunks.push(chunk);
        rest = tail;
    }
    if !rest.is_empty() {
        chunks.push(rest);
    }
    chunks
}

/// Splits each chunk of an over-long row into field values.
fn parse_chunks(
    raw: &[u8],
    length: usize,
    separator: u8,
    quote: u8,
) -> Result<Vec<Vec<String>>, CsvFileError> {
    let mut rows = Vec::new();
    for chunk in split_long_row(raw, length) {
        let mut reader = row_reader(separator, quote).from_reader(chunk);
        for record in reader.byte_records() {
            let record = record.map_err(|error| CsvFileError::ItemReader(error.to_string()))?;
            rows.push(
                record
                    .iter()
                    .map(|field| String::from_utf8_lossy(field).into_owned())
                    .collect(),
            );
        }
    }
    Ok(rows)
}

impl CsvRecordReader {
    /// Header row as read from the source, before normalization.
    pub fn header(&self) -> &[String] {
        &self.header
    }

    /// Consumes the reader, returning the header row.
    pub fn into_header(self) -> Vec<String> {
        self.header
    }

    /// Number of malformed rows skipped so far.
    pub fn skipped_count(&self) -> usize {
        self.skipped.get()
    }

    fn to_record(&self, values: Vec<String>) -> Record {
        if !self.has_header {
            return Record::Positional(values);
        }

        let mut fields = IndexMap::with_capacity(self.keys.len().min(values.len()));
        for (key, value) in self.keys.iter().zip(values) {
            if let Some(key) = key {
                fields.insert(key.clone(), value);
            }
        }
        Record::Named(fields)
    }

    fn skip(&self, reason: &str, line: u64) {
        warn!("Skipping CSV row at line {}: {}", line, reason);
        self.skipped.set(self.skipped.get() + 1);
    }
}

impl ItemReader<Record> for CsvRecordReader {
    /// Reads the next row from the buffered source.
    ///
    /// # Returns
    /// - `Ok(Some(record))` if a row is read
    /// - `Ok(None)` if there are no more rows
    /// - `Err(CsvFileError::ItemReader(error))` if the csv reader fails
    fn read(&self) -> ItemReaderResult<Record> {
        if let Some(values) = self.pending.borrow_mut().pop_front() {
            return Ok(Some(self.to_record(values)));
        }

        let mut source = self.source.borrow_mut();

        loop {
            let line = source.lines_before + source.reader.position().line();
            let next = source
                .next()
                .map_err(|error| CsvFileError::ItemReader(error.to_string()))?;

            let Some((values, raw)) = next else {
                return Ok(None);
            };

            if has_unterminated_quote(raw, self.separator, self.quote) {
                self.skip("unterminated quoted field", line);
                continue;
            }

            if self.length > 0 && raw.len() > self.length {
                let mut rows: VecDeque<_> =
                    parse_chunks(raw, self.length, self.separator, self.quote)?.into();
                warn!(
                    "Splitting CSV row at line {}: {} bytes exceed the length limit of {}",
                    line,
                    raw.len(),
                    self.length
                );
                let Some(first) = rows.pop_front() else {
                    continue;
                };
                *self.pending.borrow_mut() = rows;
                return Ok(Some(self.to_record(first)));
            }

            return Ok(Some(self.to_record(values)));
        }
    }
}

/// A builder for configuring CSV record reading.
///
/// # Default Configuration
///
/// - Separator: comma (,)
/// - Quote: double quote (")
/// - Header: disabled
/// - Length: unbounded
///
/// # Examples
///
/// ```
/// use csvfile::item::csv::csv_reader::CsvRecordReaderBuilder;
/// use csvfile::core::item::ItemReader;
/// use csvfile::core::record::Record;
///
/// let reader = CsvRecordReaderBuilder::new()
///     .separator(b';')
///     .quote(b'\'')
///     .from_reader("'a;b';c\n".as_bytes())
///     .unwrap();
///
/// assert_eq!(reader.read().unwrap(), Some(Record::from(vec!["a;b", "c"])));
/// ```
pub struct CsvRecordReaderBuilder {
    separator: u8,
    quote: u8,
    has_header: bool,
    length: usize,
}

impl Default for CsvRecordReaderBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl CsvRecordReaderBuilder {
    pub fn new() -> Self {
        let options = OptionSet::default();
        Self {
            separator: options.separator,
            quote: options.text_delimiter,
            has_header: options.header,
            length: options.length,
        }
    }

    /// Takes separator, quote, header flag and length from `options`.
    pub fn from_options(options: &OptionSet) -> Self {
        Self {
            separator: options.separator,
            quote: options.text_delimiter,
            has_header: options.header,
            length: options.length,
        }
    }

    pub fn separator(mut self, separator: u8) -> Self {
        self.separator = separator;
        self
    }

    /// Sets the quote character used for data rows.
    ///
    /// The header row is always read with the default `"` quote, matching
    /// the way headers are written.
    pub fn quote(mut self, quote: u8) -> Self {
        self.quote = quote;
        self
    }

    /// Sets whether the first row is a header.
    pub fn has_header(mut self, yes: bool) -> Self {
        self.has_header = yes;
        self
    }

    /// Sets the maximum row length in bytes, line breaks excluded. Longer rows
    /// are split into further rows. 0 disables the limit.
    pub fn length(mut self, length: usize) -> Self {
        self.length = length;
        self
    }

    /// Creates a `CsvRecordReader` from a reader.
    ///
    /// The reader is read to the end and dropped before this returns.
    ///
    /// A header row longer than `length` is cut like any other row: the first
    /// chunk names the columns and the others are read as data rows.
    ///
    /// # Errors
    /// `CsvFileError::Io` if reading fails, `CsvFileError::ItemReader` if the
    /// header row cannot be split or never closes a quoted field.
    pub fn from_reader<R: Read>(self, mut rdr: R) -> Result<CsvRecordReader, CsvFileError> {
        let mut data = Vec::new();
        rdr.read_to_end(&mut data)?;
        drop(rdr);

        debug!("Buffered {} bytes of CSV data", data.len());

        let mut pending = VecDeque::new();
        let (header, offset, lines_before) = if self.has_header {
            let mut header_reader =
                row_reader(self.separator, DEFAULT_TEXT_DELIMITER).from_reader(data.as_slice());
            let mut record = ByteRecord::new();
            if header_reader
                .read_byte_record(&mut record)
                .map_err(|error| CsvFileError::ItemReader(error.to_string()))?
            {
                let position = header_reader.position();
                let end = (position.byte() as usize).min(data.len());
                let raw = trim_line_breaks(&data[record_start(&record).min(end)..end]);

                if has_unterminated_quote(raw, self.separator, DEFAULT_TEXT_DELIMITER) {
                    return Err(CsvFileError::ItemReader(
                        "header row has an unterminated quoted field".to_string(),
                    ));
                }

                let header = if self.length > 0 && raw.len() > self.length {
                    warn!(
                        "Splitting CSV header: {} bytes exceed the length limit of {}",
                        raw.len(),
                        self.length
                    );
                    pending = parse_chunks(
                        raw,
                        self.length,
                        self.separator,
                        DEFAULT_TEXT_DELIMITER,
                    )?
                    .into();
                    pending.pop_front().unwrap_or_default()
                } else {
                    record
                        .iter()
                        .map(|cell| String::from_utf8_lossy(cell).into_owned())
                        .collect()
                };
                (header, end, position.line() - 1)
            } else {
                (Vec::new(), data.len(), 0)
            }
        } else {
            (Vec::new(), 0, 0)
        };

        let keys = header
            .iter()
            .map(|cell: &String| (!cell.is_empty()).then(|| normalize_field_name(cell)))
            .collect();

        let mut cursor = Cursor::new(data);
        cursor.set_position(offset as u64);
        let reader = row_reader(self.separator, self.quote).from_reader(cursor);

        Ok(CsvRecordReader {
            header,
            keys,
            has_header: self.has_header,
            separator: self.separator,
            quote: self.quote,
            length: self.length,
            source: RefCell::new(RecordSource {
                reader,
                offset,
                lines_before,
                record: ByteRecord::new(),
            }),
            pending: RefCell::new(pending),
            skipped: Cell::new(0),
        })
    }

    /// Creates a `CsvRecordReader` from a file path.
    ///
    /// # Errors
    /// `CsvFileError::Open` if the file cannot be opened for reading.
    pub fn from_path<P: AsRef<Path>>(self, path: P) -> Result<CsvRecordReader, CsvFileError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| CsvFileError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        self.from_reader(file)
    }
}

#[cfg(test)]
mod tests {
    use std::error::Error;

    use super::*;

    fn read_all(reader: &CsvRecordReader) -> Result<Vec<Record>, CsvFileError> {
        let mut records = Vec::new();
        while let Some(record) = reader.read()? {
            records.push(record);
        }
        Ok(records)
    }

    fn named(fields: &[(&str, &str)]) -> Record {
        fields.iter().copied().collect()
    }

    #[test]
    fn rows_without_header_should_be_positional() -> Result<(), Box<dyn Error>> {
        let data = "Boston, United States ,4628910\nConcord,\"United, States\",42695\n";

        let reader = CsvRecordReaderBuilder::new().from_reader(data.as_bytes())?;

        assert_eq!(
            read_all(&reader)?,
            vec![
                Record::from(vec!["Boston", " United States ", "4628910"]),
                Record::from(vec!["Concord", "United, States", "42695"]),
            ]
        );
        assert!(reader.header().is_empty());

        Ok(())
    }

    #[test]
    fn header_should_name_fields() -> Result<(), Box<dyn Error>> {
        let data = "First Name,Age\nAnn,30\nBob,25\n";

        let reader = CsvRecordReaderBuilder::new()
            .has_header(true)
            .from_reader(data.as_bytes())?;

        assert_eq!(reader.header(), ["First Name", "Age"]);
        assert_eq!(
            read_all(&reader)?,
            vec![
                named(&[("first_name", "Ann"), ("age", "30")]),
                named(&[("first_name", "Bob"), ("age", "25")]),
            ]
        );

        Ok(())
    }

    #[test]
    fn empty_header_cells_drop_their_column() -> Result<(), Box<dyn Error>> {
        let reader = CsvRecordReaderBuilder::new()
            .has_header(true)
            .from_reader("Name,,Age\nAnn,x,30\n".as_bytes())?;

        let record = reader.read()?.ok_or("missing record")?;

        assert_eq!(record, named(&[("name", "Ann"), ("age", "30")]));

        Ok(())
    }

    #[test]
    fn ragged_rows_are_zipped_against_the_header() -> Result<(), Box<dyn Error>> {
        let data = "a,b,c\n1\n1,2,3,4\n";

        let reader = CsvRecordReaderBuilder::new()
            .has_header(true)
            .from_reader(data.as_bytes())?;

        assert_eq!(
            read_all(&reader)?,
            vec![
                named(&[("a", "1")]),
                named(&[("a", "1"), ("b", "2"), ("c", "3")]),
            ]
        );

        Ok(())
    }

    #[test]
    fn duplicate_names_keep_first_position_and_last_value() -> Result<(), Box<dyn Error>> {
        let reader = CsvRecordReaderBuilder::new()
            .has_header(true)
            .from_reader("Id,Name,ID\n1,Ann,2\n".as_bytes())?;

        let record = reader.read()?.ok_or("missing record")?;

        assert_eq!(record, named(&[("id", "2"), ("name", "Ann")]));
        assert_eq!(record.values(), vec!["2", "Ann"]);

        Ok(())
    }

    #[test]
    fn header_uses_default_quote_and_rows_use_configured_quote() -> Result<(), Box<dyn Error>> {
        let data = "\"Last, First\";Note\n'Doe; Jane';'it''s'\n";

        let reader = CsvRecordReaderBuilder::new()
            .separator(b';')
            .quote(b'\'')
            .has_header(true)
            .from_reader(data.as_bytes())?;

        assert_eq!(reader.header(), ["Last, First", "Note"]);
        assert_eq!(
            read_all(&reader)?,
            vec![named(&[("last,_first", "Doe; Jane"), ("note", "it's")])]
        );

        Ok(())
    }

    #[test]
    fn quoted_fields_may_span_lines() -> Result<(), Box<dyn Error>> {
        let reader =
            CsvRecordReaderBuilder::new().from_reader("1,\"two\nlines\"\r\n3,4\r\n".as_bytes())?;

        assert_eq!(
            read_all(&reader)?,
            vec![
                Record::from(vec!["1", "two\nlines"]),
                Record::from(vec!["3", "4"]),
            ]
        );
        assert_eq!(reader.skipped_count(), 0);

        Ok(())
    }

    #[test]
    fn blank_lines_are_skipped() -> Result<(), Box<dyn Error>> {
        let reader = CsvRecordReaderBuilder::new().from_reader("a,b\n\n\nc,d\n\n".as_bytes())?;

        assert_eq!(read_all(&reader)?.len(), 2);
        assert_eq!(reader.skipped_count(), 0);

        Ok(())
    }

    #[test]
    fn unterminated_quote_skips_only_the_trailing_row() -> Result<(), Box<dyn Error>> {
        let data = "a,b\nc,\"d\ne,f\n";

        let reader = CsvRecordReaderBuilder::new().from_reader(data.as_bytes())?;

        assert_eq!(read_all(&reader)?, vec![Record::from(vec!["a", "b"])]);
        assert_eq!(reader.skipped_count(), 1);

        Ok(())
    }

    #[test]
    fn rows_longer_than_length_are_split() -> Result<(), Box<dyn Error>> {
        let data = "a,b\nthis,row,is,far,too,long\nc,d\n";

        let reader = CsvRecordReaderBuilder::new()
            .length(10)
            .from_reader(data.as_bytes())?;

        assert_eq!(
            read_all(&reader)?,
            vec![
                Record::from(vec!["a", "b"]),
                Record::from(vec!["this", "row", "i"]),
                Record::from(vec!["s", "far", "too", ""]),
                Record::from(vec!["long"]),
                Record::from(vec!["c", "d"]),
            ]
        );
        assert_eq!(reader.skipped_count(), 0);

        Ok(())
    }

    #[test]
    fn long_header_is_split_into_header_and_rows() -> Result<(), Box<dyn Error>> {
        let reader = CsvRecordReaderBuilder::new()
            .has_header(true)
            .length(7)
            .from_reader("id,name,extra\n1,Ann\n".as_bytes())?;

        assert_eq!(reader.header(), ["id", "name"]);
        assert_eq!(
            read_all(&reader)?,
            vec![
                named(&[("id", ""), ("name", "extra")]),
                named(&[("id", "1"), ("name", "Ann")]),
            ]
        );

        Ok(())
    }

    #[test]
    fn header_with_unterminated_quote_is_an_error() {
        let result = CsvRecordReaderBuilder::new()
            .has_header(true)
            .from_reader("id,\"name\n1,Ann\n2,Bob\n".as_bytes());

        assert!(matches!(result, Err(CsvFileError::ItemReader(_))));
    }

    #[test]
    fn long_rows_are_not_cut_inside_a_character() {
        let chunks = split_long_row("ab\u{e9}cd".as_bytes(), 3);
        assert_eq!(chunks, vec![&b"ab"[..], "\u{e9}c".as_bytes(), &b"d"[..]]);
        assert_eq!(split_long_row(b"abc", 3), vec![&b"abc"[..]]);
    }

    #[test]
    fn empty_source_with_header_has_no_header() -> Result<(), Box<dyn Error>> {
        let reader = CsvRecordReaderBuilder::new()
            .has_header(true)
            .from_reader("".as_bytes())?;

        assert!(reader.read()?.is_none());
        assert!(reader.into_header().is_empty());

        Ok(())
    }

    #[test]
    fn invalid_utf8_is_replaced() -> Result<(), Box<dyn Error>> {
        let reader = CsvRecordReaderBuilder::new().from_reader(&b"caf\xe9,ok\n"[..])?;

        assert_eq!(
            reader.read()?,
            Some(Record::from(vec!["caf\u{fffd}", "ok"]))
        );

        Ok(())
    }

    #[test]
    fn records_should_be_read_from_path() -> Result<(), Box<dyn Error>> {
        let dir = tempfile::TempDir::new()?;
        let path = dir.path().join("cities.csv");
        std::fs::write(&path, "Boston,4628910\n")?;

        let reader = CsvRecordReaderBuilder::new().from_path(&path)?;
        assert_eq!(read_all(&reader)?, vec![Record::from(vec!["Boston", "4628910"])]);

        let missing = CsvRecordReaderBuilder::new().from_path(dir.path().join("missing.csv"));
        assert!(matches!(missing, Err(CsvFileError::Open { .. })));

        Ok(())
    }

    #[test]
    fn unterminated_quote_detection_follows_quoting_rules() {
        assert!(has_unterminated_quote(b"a,\"b", b',', b'"'));
        assert!(has_unterminated_quote(b"\"a\"\"", b',', b'"'));
        assert!(!has_unterminated_quote(b"a,\"b\"", b',', b'"'));
        assert!(!has_unterminated_quote(b"a\"b,c", b',', b'"'));
        assert!(!has_unterminated_quote(b"\"a\"\"b\",c", b',', b'"'));
        assert!(!has_unterminated_quote(b"\"a\"x,\"", b',', b'\''));
    }

    #[test]
    fn line_breaks_are_trimmed_from_raw_rows() {
        assert_eq!(trim_line_breaks(b"\n\r\nab\r\n"), b"ab");
        assert_eq!(trim_line_breaks(b"\n\n"), b"");
        assert_eq!(trim_line_breaks(b"a\nb"), b"a\nb");
    }
}
