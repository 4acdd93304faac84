use std::{fs::File, path::{Path, PathBuf}};

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Which implementation decomposes, canonicalizes and draws fragments
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    #[default]
    Native,
    Rdkit,
}

/// Settings for a run. Anything left out of a config file takes its default
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// only fragments with more heavy atoms than this are counted
    pub min_heavy_atoms: i64,
    /// how many of the most frequent fragments to report
    pub nfrags: usize,
    pub render_image: bool,
    pub csv_out: PathBuf,
    pub svg_out: PathBuf,
    pub smiles_column: String,
    pub backend: Backend,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            min_heavy_atoms: 5,
            nfrags: 10,
            render_image: false,
            csv_out: PathBuf::from("fragment_freq.csv"),
            svg_out: PathBuf::from("frags.svg"),
            smiles_column: String::from("SMILES"),
            backend: Backend::Native,
        }
    }
}

impl Config {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let f = File::open(path)?;
        Ok(serde_json::from_reader(f)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial() {
        let got: Config =
            serde_json::from_str(r#"{"nfrags": 3, "backend": "rdkit"}"#).unwrap();
        let want = Config {
            nfrags: 3,
            backend: Backend::Rdkit,
            ..Config::default()
        };
        assert_eq!(got, want);
    }

    #[test]
    fn negative_threshold() {
        let got: Config = serde_json::from_str(r#"{"min_heavy_atoms": -1}"#).unwrap();
        assert_eq!(got.min_heavy_atoms, -1);
    }
}
