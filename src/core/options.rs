//! Options controlling how a CSV file is opened, parsed and saved.
//!
//! The set of keys is fixed: `separator`, `text_delimiter`, `length`,
//! `fields`, `readmode`, `writemode` and `header`. Any other key is ignored
//! when setting and reported as absent when getting, so option access never
//! fails.
//!
//! # Examples
//!
//! ```
//! use csvfile::core::options::{OptionSet, OptionValue};
//!
//! # fn main() -> Result<(), csvfile::CsvFileError> {
//! let mut options = OptionSet::from_pairs([
//!     ("separator", OptionValue::from(';')),
//!     ("header", OptionValue::from(true)),
//!     ("colour", OptionValue::from("blue")),
//! ])?;
//!
//! assert_eq!(options.separator, b';');
//! assert!(options.header);
//! assert_eq!(options.get("colour"), None);
//!
//! options.set("length", 4096);
//! assert_eq!(options.get("length"), Some(OptionValue::Integer(4096)));
//! # Ok(())
//! # }
//! ```

use std::{
    fmt,
    fs::{File, OpenOptions},
    path::Path,
    str::FromStr,
};

use log::{debug, warn};
use serde_json::Value;

use crate::error::CsvFileError;

/// Default field separator.
pub const DEFAULT_SEPARATOR: u8 = b',';

/// Default quote character.
pub const DEFAULT_TEXT_DELIMITER: u8 = b'"';

/// Name of a recognized option.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OptionName {
    Separator,
    TextDelimiter,
    Length,
    /// Reserved, stored but not used by parsing.
    Fields,
    ReadMode,
    WriteMode,
    Header,
}

impl OptionName {
    pub const ALL: [OptionName; 7] = [
        OptionName::Separator,
        OptionName::TextDelimiter,
        OptionName::Length,
        OptionName::Fields,
        OptionName::ReadMode,
        OptionName::WriteMode,
        OptionName::Header,
    ];

    /// Looks up an option by its key, `None` for unknown keys.
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "separator" => Some(OptionName::Separator),
            "text_delimiter" => Some(OptionName::TextDelimiter),
            "length" => Some(OptionName::Length),
            "fields" => Some(OptionName::Fields),
            "readmode" => Some(OptionName::ReadMode),
            "writemode" => Some(OptionName::WriteMode),
            "header" => Some(OptionName::Header),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OptionName::Separator => "separator",
            OptionName::TextDelimiter => "text_delimiter",
            OptionName::Length => "length",
            OptionName::Fields => "fields",
            OptionName::ReadMode => "readmode",
            OptionName::WriteMode => "writemode",
            OptionName::Header => "header",
        }
    }
}

impl fmt::Display for OptionName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Loosely typed option value, as found in an options map.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OptionValue {
    Char(char),
    Integer(i64),
    Bool(bool),
    Text(String),
    List(Vec<String>),
}

impl OptionValue {
    fn from_json(value: Value) -> Option<Self> {
        match value {
            Value::Bool(flag) => Some(OptionValue::Bool(flag)),
            Value::Number(number) => number.as_i64().map(OptionValue::Integer),
            Value::String(text) => Some(OptionValue::Text(text)),
            Value::Array(items) => Some(OptionValue::List(
                items
                    .into_iter()
                    .map(|item| match item {
                        Value::String(text) => text,
                        other => other.to_string(),
                    })
                    .collect(),
            )),
            Value::Null | Value::Object(_) => None,
        }
    }

    /// A single ASCII character, given either as a char or a one-char string.
    fn as_ascii_byte(&self) -> Option<u8> {
        let c = match self {
            OptionValue::Char(c) => *c,
            OptionValue::Text(text) => {
                let mut chars = text.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) => c,
                    _ => return None,
                }
            }
            _ => return None,
        };
        c.is_ascii().then_some(c as u8)
    }

    fn as_length(&self) -> Option<usize> {
        match self {
            OptionValue::Integer(n) => usize::try_from(*n).ok(),
            OptionValue::Text(text) => text.trim().parse().ok(),
            _ => None,
        }
    }

    fn as_flag(&self) -> Option<bool> {
        match self {
            OptionValue::Bool(flag) => Some(*flag),
            OptionValue::Integer(n) => Some(*n != 0),
            _ => None,
        }
    }

    fn as_mode(&self) -> Option<Result<FileMode, CsvFileError>> {
        match self {
            OptionValue::Char(c) => Some(c.to_string().parse()),
            OptionValue::Text(text) => Some(text.parse()),
            _ => None,
        }
    }
}

impl From<char> for OptionValue {
    fn from(value: char) -> Self {
        OptionValue::Char(value)
    }
}

impl From<u8> for OptionValue {
    fn from(value: u8) -> Self {
        OptionValue::Char(value as char)
    }
}

impl From<i32> for OptionValue {
    fn from(value: i32) -> Self {
        OptionValue::Integer(value.into())
    }
}

impl From<i64> for OptionValue {
    fn from(value: i64) -> Self {
        OptionValue::Integer(value)
    }
}

impl From<usize> for OptionValue {
    fn from(value: usize) -> Self {
        OptionValue::Integer(i64::try_from(value).unwrap_or(i64::MAX))
    }
}

impl From<bool> for OptionValue {
    fn from(value: bool) -> Self {
        OptionValue::Bool(value)
    }
}

impl From<&str> for OptionValue {
    fn from(value: &str) -> Self {
        OptionValue::Text(value.to_string())
    }
}

impl From<String> for OptionValue {
    fn from(value: String) -> Self {
        OptionValue::Text(value)
    }
}

impl<S: Into<String>> From<Vec<S>> for OptionValue {
    fn from(values: Vec<S>) -> Self {
        OptionValue::List(values.into_iter().map(Into::into).collect())
    }
}

/// fopen-style file mode: `r`, `r+`, `w`, `w+`, `a`, `a+`, `x`, `x+`, `c`, `c+`.
///
/// The `b` and `t` flags are accepted and have no effect.
///
/// ```
/// use csvfile::core::options::FileMode;
///
/// let mode: FileMode = "w+".parse().unwrap();
/// assert!(mode.is_readable());
/// assert!(mode.is_writable());
/// assert_eq!(mode.to_string(), "w+");
///
/// assert!("q".parse::<FileMode>().is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileMode {
    mode: String,
    read: bool,
    write: bool,
    append: bool,
    truncate: bool,
    create: bool,
    create_new: bool,
}

impl FileMode {
    /// Mode used to parse an existing file (`r`).
    pub fn read() -> Self {
        FileMode {
            mode: "r".to_string(),
            read: true,
            write: false,
            append: false,
            truncate: false,
            create: false,
            create_new: false,
        }
    }

    /// Mode used to save, and to create an absent file (`w+`).
    pub fn write() -> Self {
        FileMode {
            mode: "w+".to_string(),
            read: true,
            write: true,
            append: false,
            truncate: true,
            create: true,
            create_new: false,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.mode
    }

    pub fn is_readable(&self) -> bool {
        self.read
    }

    pub fn is_writable(&self) -> bool {
        self.write || self.append
    }

    pub fn open_options(&self) -> OpenOptions {
        let mut options = OpenOptions::new();
        options
            .read(self.read)
            .write(self.write)
            .append(self.append)
            .truncate(self.truncate)
            .create(self.create)
            .create_new(self.create_new);
        options
    }

    /// Opens `path` with this mode.
    ///
    /// # Errors
    /// `CsvFileError::Open` if the file cannot be opened.
    pub fn open<P: AsRef<Path>>(&self, path: P) -> Result<File, CsvFileError> {
        let path = path.as_ref();
        self.open_options()
            .open(path)
            .map_err(|source| CsvFileError::Open {
                path: path.to_path_buf(),
                source,
            })
    }
}

impl FromStr for FileMode {
    type Err = CsvFileError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let flags: String = s.chars().filter(|c| *c != 'b' && *c != 't').collect();
        let plus = flags.len() == 2 && flags.ends_with('+');
        if flags.len() != 1 && !plus {
            return Err(CsvFileError::Configuration(format!(
                "Unsupported file mode: '{}'",
                s
            )));
        }

        let mut mode = FileMode {
            mode: s.to_string(),
            read: plus,
            write: plus,
            append: false,
            truncate: false,
            create: false,
            create_new: false,
        };

        match flags.chars().next() {
            Some('r') => mode.read = true,
            Some('w') => {
                mode.write = true;
                mode.truncate = true;
                mode.create = true;
            }
            Some('a') => {
                mode.write = false;
                mode.append = true;
                mode.create = true;
            }
            Some('x') => {
                mode.write = true;
                mode.create_new = true;
            }
            Some('c') => {
                mode.write = true;
                mode.create = true;
            }
            _ => {
                return Err(CsvFileError::Configuration(format!(
                    "Unsupported file mode: '{}'",
                    s
                )));
            }
        }

        Ok(mode)
    }
}

impl fmt::Display for FileMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.mode)
    }
}

/// The active parsing and serialization options of a CSV file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptionSet {
    /// Field separator (default `,`)
    pub separator: u8,
    /// Quote character (default `"`)
    pub text_delimiter: u8,
    /// Maximum row length in bytes, 0 for unbounded
    pub length: usize,
    /// Reserved
    pub fields: Vec<String>,
    /// Mode used to open an existing file for parsing (default `r`)
    pub read_mode: FileMode,
    /// Mode used to save, and to create an absent file (default `w+`)
    pub write_mode: FileMode,
    /// Whether the first row is a header (default false)
    pub header: bool,
}

impl Default for OptionSet {
    fn default() -> Self {
        Self {
            separator: DEFAULT_SEPARATOR,
            text_delimiter: DEFAULT_TEXT_DELIMITER,
            length: 0,
            fields: Vec::new(),
            read_mode: FileMode::read(),
            write_mode: FileMode::write(),
            header: false,
        }
    }
}

impl OptionSet {
    /// Merges `pairs` over the defaults.
    ///
    /// Unknown keys are ignored.
    ///
    /// # Errors
    /// `CsvFileError::Configuration` if a recognized key carries a value of
    /// the wrong shape.
    pub fn from_pairs<I, K, V>(pairs: I) -> Result<Self, CsvFileError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<OptionValue>,
    {
        let mut options = Self::default();
        for (key, value) in pairs {
            match OptionName::parse(key.as_ref()) {
                Some(name) => options.apply(name, value.into())?,
                None => debug!("Ignoring unknown option '{}'", key.as_ref()),
            }
        }
        Ok(options)
    }

    /// Merges the members of a JSON object over the defaults.
    ///
    /// ```
    /// use csvfile::core::options::OptionSet;
    ///
    /// let options = OptionSet::from_json(r#"{"separator": ";", "header": true}"#).unwrap();
    /// assert_eq!(options.separator, b';');
    /// assert!(options.header);
    /// ```
    ///
    /// # Errors
    /// `CsvFileError::Configuration` if the text is not a JSON object or a
    /// recognized key carries a value of the wrong shape.
    pub fn from_json(json: &str) -> Result<Self, CsvFileError> {
        let value: Value = serde_json::from_str(json)
            .map_err(|error| CsvFileError::Configuration(error.to_string()))?;

        let Value::Object(members) = value else {
            return Err(CsvFileError::Configuration(
                "Options must be a JSON object".to_string(),
            ));
        };

        let mut options = Self::default();
        for (key, value) in members {
            let Some(name) = OptionName::parse(&key) else {
                debug!("Ignoring unknown option '{}'", key);
                continue;
            };
            let value = OptionValue::from_json(value).ok_or_else(|| {
                CsvFileError::Configuration(format!("Unsupported value for option '{}'", key))
            })?;
            options.apply(name, value)?;
        }
        Ok(options)
    }

    /// Current value of an option, `None` for unknown names.
    pub fn get(&self, name: &str) -> Option<OptionValue> {
        OptionName::parse(name).map(|name| self.value(name))
    }

    pub fn value(&self, name: OptionName) -> OptionValue {
        match name {
            OptionName::Separator => OptionValue::from(self.separator),
            OptionName::TextDelimiter => OptionValue::from(self.text_delimiter),
            OptionName::Length => OptionValue::from(self.length),
            OptionName::Fields => OptionValue::List(self.fields.clone()),
            OptionName::ReadMode => OptionValue::Text(self.read_mode.to_string()),
            OptionName::WriteMode => OptionValue::Text(self.write_mode.to_string()),
            OptionName::Header => OptionValue::Bool(self.header),
        }
    }

    /// Sets an option by name.
    ///
    /// Unknown names are a no-op. A value that does not fit the option is
    /// logged and ignored.
    pub fn set<V: Into<OptionValue>>(&mut self, name: &str, value: V) -> &mut Self {
        match OptionName::parse(name) {
            Some(name) => {
                if let Err(error) = self.apply(name, value.into()) {
                    warn!("Ignoring value for option '{}': {}", name, error);
                }
            }
            None => debug!("Ignoring unknown option '{}'", name),
        }
        self
    }

    /// Sets a recognized option.
    ///
    /// # Errors
    /// `CsvFileError::Configuration` if the value does not fit the option;
    /// the option keeps its previous value.
    pub fn apply(&mut self, name: OptionName, value: OptionValue) -> Result<(), CsvFileError> {
        let invalid = || {
            CsvFileError::Configuration(format!("Invalid value {:?} for option '{}'", value, name))
        };

        match name {
            OptionName::Separator => self.separator = value.as_ascii_byte().ok_or_else(invalid)?,
            OptionName::TextDelimiter => {
                self.text_delimiter = value.as_ascii_byte().ok_or_else(invalid)?
            }
            OptionName::Length => self.length = value.as_length().ok_or_else(invalid)?,
            OptionName::Fields => match &value {
                OptionValue::List(fields) => self.fields = fields.clone(),
                _ => return Err(invalid()),
            },
            OptionName::ReadMode => self.read_mode = value.as_mode().ok_or_else(invalid)??,
            OptionName::WriteMode => self.write_mode = value.as_mode().ok_or_else(invalid)??,
            OptionName::Header => self.header = value.as_flag().ok_or_else(invalid)?,
        }
        Ok(())
    }
}
