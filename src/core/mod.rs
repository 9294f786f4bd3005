/// Reader and writer seams shared by the CSV parser and serializer
pub mod item;

/// Parser and serializer options
pub mod options;

/// In-memory representation of a CSV row
pub mod record;
