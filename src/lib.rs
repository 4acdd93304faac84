use std::{fs::File, io::Read, path::Path};

use indexmap::IndexMap;
use serde::Deserialize;

pub mod aromaticity;
pub mod brics;
pub mod canon;
pub mod config;
pub mod depict;
pub mod error;
pub mod fragments;
pub mod io;
pub mod molecule;
#[cfg(feature = "rdkit")]
pub mod rdkit;
pub mod report;
pub mod smiles;
pub mod stereo;

pub use config::{Backend, Config};
pub use error::{Error, Result, SmilesError};
pub use fragments::{
    count_fragments, Brics, CanonicalFragment, Canonicalizer, Decomposer,
    FragmentCounter, FrequencyTable, Native,
};
pub use molecule::Molecule;
pub use report::Report;

#[derive(Deserialize)]
struct Record {
    cmiles: String,
}

/// A QCArchive dataset export, only the canonical SMILES of each entry are
/// kept
#[derive(Deserialize)]
pub struct Dataset {
    entries: IndexMap<String, Vec<Record>>,
}

impl Dataset {
    pub fn load(path: impl AsRef<Path>) -> Result<Dataset> {
        let f = File::open(path)?;
        Self::from_reader(f)
    }

    pub fn from_reader(r: impl Read) -> Result<Dataset> {
        let r: Self = serde_json::from_reader(r)?;
        Ok(r)
    }

    /// consume `self` and return the contained vector of canonical SMILES
    /// strings, in file order
    pub fn to_smiles(self) -> Vec<String> {
        self.entries
            .into_values()
            .flatten()
            .map(|v| v.cmiles)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_dataset() {
        let json = r#"{"entries": {
            "b": [{"cmiles": "CCO"}, {"cmiles": "c1ccccc1"}],
            "a": [{"cmiles": "CC(=O)O", "extra": 1}]
        }}"#;
        let got = Dataset::from_reader(json.as_bytes()).unwrap().to_smiles();
        assert_eq!(got, vec!["CCO", "c1ccccc1", "CC(=O)O"]);
    }
}
