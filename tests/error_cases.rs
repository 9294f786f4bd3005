mod common;

use common::MockFile;

use std::{error::Error, fs};

use tempfile::TempDir;

use csvfile::{
    CsvFile, CsvFileBuilder, CsvFileError,
    core::{item::ItemWriter, options::OptionSet, record::Record},
    item::csv::csv_writer::CsvRecordWriterBuilder,
};

#[test]
fn failing_writer_reports_an_item_writer_error() {
    common::init_logger();

    let writer = CsvRecordWriterBuilder::new()
        .from_writer(MockFile::failing())
        .expect("no header, nothing written yet");

    let written = writer
        .write(&[Record::from(vec!["Boston", "4628910"])])
        .and_then(|()| writer.flush());

    assert!(matches!(written, Err(CsvFileError::ItemWriter(_))));
    assert!(writer.close().is_err());
}

#[test]
fn failing_writer_fails_while_writing_the_header() {
    let result = CsvRecordWriterBuilder::new()
        .header(["city", "pop"])
        .from_writer(MockFile::failing());

    assert!(result.is_err());
}

#[test]
fn accepting_writer_flushes_every_record() -> Result<(), Box<dyn Error>> {
    let writer = CsvRecordWriterBuilder::new()
        .header(["city"])
        .from_writer(MockFile::accepting())?;

    writer.open()?;
    writer.write(&[Record::from(vec!["Boston"]), Record::from(vec!["Concord"])])?;
    writer.close()?;

    Ok(())
}

#[test]
fn directory_path_cannot_be_parsed() -> Result<(), Box<dyn Error>> {
    let dir = TempDir::new()?;

    let result = CsvFile::open(dir.path(), OptionSet::default());

    // Some platforms refuse to open a directory, others refuse to read it.
    assert!(matches!(
        result,
        Err(CsvFileError::Open { .. }) | Err(CsvFileError::Io(_))
    ));

    Ok(())
}

#[test]
fn missing_parent_directory_cannot_be_created() -> Result<(), Box<dyn Error>> {
    let dir = TempDir::new()?;
    let path = dir.path().join("missing").join("data.csv");

    let result = CsvFileBuilder::new().open(&path);

    let error = result.err().ok_or("open should fail")?;
    assert!(matches!(error, CsvFileError::Open { .. }));
    assert!(error.to_string().starts_with("Failed to open file"));

    Ok(())
}

#[test]
fn save_fails_when_the_write_mode_cannot_open_the_file() -> Result<(), Box<dyn Error>> {
    let dir = TempDir::new()?;
    let path = dir.path().join("data.csv");
    fs::write(&path, "a,b\n")?;

    let mut file = CsvFileBuilder::new().write_mode("x".parse()?).open(&path)?;
    file.push(Record::from(vec!["c", "d"]));

    assert!(matches!(file.save(), Err(CsvFileError::Open { .. })));
    assert_eq!(fs::read_to_string(&path)?, "a,b\n");

    Ok(())
}

#[test]
fn save_fails_when_the_write_mode_is_read_only() -> Result<(), Box<dyn Error>> {
    let dir = TempDir::new()?;
    let path = dir.path().join("data.csv");
    fs::write(&path, "a,b\n")?;

    let file = CsvFileBuilder::new().write_mode("r".parse()?).open(&path)?;

    assert!(file.save().is_err());
    assert_eq!(fs::read_to_string(&path)?, "a,b\n");

    Ok(())
}

#[test]
fn invalid_option_values_are_configuration_errors() {
    let result = OptionSet::from_pairs([("writemode", "rw")]);
    assert!(matches!(result, Err(CsvFileError::Configuration(_))));

    let result = OptionSet::from_json(r#"{"separator": 44}"#);
    assert!(matches!(result, Err(CsvFileError::Configuration(_))));
}
