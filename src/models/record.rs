/// One row of text cells.
pub type DelimitedRecord = Vec<String>;

pub const DELIMITED_EXTENSION: &str = "csv";

/// Header row of the merged master dataset.
pub const MASTER_HEADER: [&str; 10] = [
    "BANK",
    "IFSC",
    "MICR",
    "BRANCH",
    "ADDRESS",
    "CONTACT",
    "CITY",
    "DISTRICT",
    "STATE",
    "ABBREVIATION",
];
