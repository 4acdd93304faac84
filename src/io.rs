//! Reading molecule datasets and writing frequency tables

use std::{
    fs::File,
    io::{Cursor, Read, Write},
    path::Path,
};

use log::debug;
use polars::prelude::*;

use crate::{error::Result, Dataset, Error, FrequencyTable};

pub const SMILES_COLUMN: &str = "Frag_Smiles";
pub const FREQUENCY_COLUMN: &str = "Frag_Frequency";

/// read the SMILES in `column` of a CSV file. every row must have one
pub fn read_csv(mut r: impl Read, column: &str) -> Result<Vec<String>> {
    let mut csv = Vec::new();
    r.read_to_end(&mut csv)?;
    let df = CsvReader::new(Cursor::new(csv)).finish()?;
    let Ok(col) = df.column(column) else {
        return Err(Error::MissingColumn(column.to_owned()));
    };
    col.as_materialized_series()
        .str()?
        .into_iter()
        .enumerate()
        .map(|(row, smiles)| {
            smiles
                .map(str::to_owned)
                .ok_or(Error::MissingDescriptor { row })
        })
        .collect()
}

/// load the SMILES from `path`, a QCArchive JSON export if the name ends in
/// `.json` and a CSV file with a `column` of SMILES otherwise
pub fn read_dataset(path: impl AsRef<Path>, column: &str) -> Result<Vec<String>> {
    let path = path.as_ref();
    let json = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
    let smiles = if json {
        Dataset::load(path)?.to_smiles()
    } else {
        read_csv(File::open(path)?, column)?
    };
    debug!("read {} molecules from {}", smiles.len(), path.display());
    Ok(smiles)
}

/// write the whole of `table` as CSV, in first-seen order
pub fn write_table(w: impl Write, table: &FrequencyTable) -> Result<()> {
    let (smiles, counts): (Vec<&str>, Vec<u32>) = table.iter().unzip();
    let mut df = df!(
        SMILES_COLUMN => smiles,
        FREQUENCY_COLUMN => counts,
    )?;
    CsvWriter::new(w).finish(&mut df)?;
    Ok(())
}
