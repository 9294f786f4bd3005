#![cfg_attr(docsrs, feature(doc_cfg))]
//#![warn(missing_docs)]

/*!
 # CSV files for Rust

 Load a delimited text file into memory, work on its rows, and save it back
 in the same format.

 ## Core Concepts

- **CsvFile:** a whole file held in memory. It is parsed once when opened and
  rewritten by `save`. No file handle outlives a call.
- **Record:** one row. Without a header it is the list of its values
  (`Record::Positional`); with a header it maps normalized column names to
  values (`Record::Named`). All values are strings.
- **OptionSet:** separator, quote character, row length limit, file modes and
  header flag. Unknown option names are ignored, never an error.
- **CsvRecordReader / CsvRecordWriter:** the parser and serializer used by
  `CsvFile`, usable on their own over any `io::Read` / `io::Write`.

 ## Header mode

 With the header option enabled, the first row names the columns. Names are
 lower-cased and each space becomes an underscore, so `First Name` is read as
 `first_name`. Columns with an empty header cell are dropped, as are values
 beyond the last header column.

 ## Getting Started

```rust
# use std::error::Error;
use csvfile::{CsvFile, core::options::OptionSet};
# use tempfile::TempDir;

# fn main() -> Result<(), Box<dyn Error>> {
# let dir = TempDir::new()?;
# let path = dir.path().join("cars.csv");
# std::fs::write(&path, "Year,Make,Model\n1948,Porsche,356\n1995,Peugeot,205\n")?;
let options = OptionSet::from_pairs([("header", true)])?;
let mut cars = CsvFile::open(&path, options)?;

for car in &cars {
    println!("{:?} {:?}", car.get("make"), car.get("model"));
}

cars.records_mut().retain(|car| car.get("year") != Some("1995"));
cars.save()?;

assert_eq!(std::fs::read_to_string(&path)?, "Year,Make,Model\n1948,Porsche,356\n");
# Ok(())
# }
```

 ## Logging

 The crate logs through the `log` facade: open, parse and save at `debug`,
 completed saves at `info`, skipped rows and ignored option values at `warn`.

 ## License
 Licensed under either of

 -   Apache License, Version 2.0
     ([LICENSE-APACHE](LICENSE-APACHE) or <http://www.apache.org/licenses/LICENSE-2.0>)
 -   MIT license
     ([LICENSE-MIT](LICENSE-MIT) or <http://opensource.org/licenses/MIT>)

 at your option.
 */

/// Records, options and reader/writer seams
pub mod core;

/// Error types for CSV file operations
pub mod error;

#[doc(inline)]
pub use error::*;

/// In-memory CSV documents
pub mod document;

#[doc(inline)]
pub use document::{CsvFile, CsvFileBuilder};

/// CSV record reader and writer
pub mod item;
