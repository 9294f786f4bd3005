use std::env::temp_dir;

use csvfile::{CsvFile, CsvFileBuilder, CsvFileError, core::record::Record};

fn main() -> Result<(), CsvFileError> {
    env_logger::init();

    let path = temp_dir().join("csvfile_cars.csv");
    std::fs::remove_file(&path).ok();

    let mut cars = CsvFileBuilder::new().has_header(true).open(&path)?;
    cars.set_header(["Year", "Make", "Model", "Description"]);
    cars.set_records(vec![
        car("1948", "Porsche", "356", "Luxury sports car"),
        car("1995", "Peugeot", "205", "City car"),
        car("1967", "Ford", "Mustang fastback 1967", "American car, \"pony\" class"),
    ]);
    cars.save()?;

    let mut cars = CsvFile::builder().has_header(true).open(&path)?;
    println!("{} cars in {}", cars.len(), cars.path().display());

    let mut current = cars.rewind().cloned();
    while let Some(car) = current {
        println!(
            "#{:?}: {} {} ({})",
            cars.key(),
            car.get("make").unwrap_or_default(),
            car.get("model").unwrap_or_default(),
            car.get("year").unwrap_or_default()
        );
        current = cars.advance().cloned();
    }

    Ok(())
}

fn car(year: &str, make: &str, model: &str, description: &str) -> Record {
    [
        ("year", year),
        ("make", make),
        ("model", model),
        ("description", description),
    ]
    .into_iter()
    .collect()
}
