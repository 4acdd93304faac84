use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// A failure to turn SMILES text into a [Molecule](crate::molecule::Molecule).
/// `pos` is the byte offset into the input where the problem was noticed
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SmilesError {
    #[error("unexpected character {ch:?} at {pos}")]
    UnexpectedChar { ch: char, pos: usize },

    #[error("unexpected end of input inside {context}")]
    UnexpectedEnd { context: &'static str },

    #[error("unknown element {symbol:?} at {pos}")]
    UnknownElement { symbol: String, pos: usize },

    #[error("bond at {pos} is not followed by an atom")]
    DanglingBond { pos: usize },

    #[error("branch opened at {pos} has no preceding atom")]
    OrphanBranch { pos: usize },

    #[error("branch opened at {pos} is never closed")]
    UnclosedBranch { pos: usize },

    #[error("unmatched ')' at {pos}")]
    UnmatchedParen { pos: usize },

    #[error("ring bond {digit} opened at {pos} is never closed")]
    UnclosedRing { digit: u16, pos: usize },

    #[error("ring bond {digit} has conflicting bond orders")]
    RingBondConflict { digit: u16 },

    #[error("ring bond {digit} at {pos} would bond an atom to itself or duplicate a bond")]
    BadRingClosure { digit: u16, pos: usize },

    #[error("atom {index} ({symbol}) has an impossible valence of {valence}")]
    Valence {
        index: usize,
        symbol: &'static str,
        valence: u8,
    },

    #[error("aromatic atom {index} is not in a ring")]
    AromaticOutsideRing { index: usize },

    #[error("can't find a Kekulé structure for the aromatic system around atom {index}")]
    Kekulize { index: usize },
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("failed to parse SMILES {smiles:?}: {source}")]
    InvalidMoleculeDescriptor {
        smiles: String,
        #[source]
        source: SmilesError,
    },

    /// RDKit refused the SMILES, it doesn't tell us why
    #[error("RDKit could not parse SMILES {smiles:?}")]
    RejectedByBackend { smiles: String },

    #[error("row {row} of the dataset has no SMILES")]
    MissingDescriptor { row: usize },

    #[error("the dataset has no column named {0:?}")]
    MissingColumn(String),

    #[error("the {0} backend is not available in this build")]
    BackendUnavailable(&'static str),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Polars(#[from] polars::error::PolarsError),

    #[cfg(feature = "rdkit")]
    #[error(transparent)]
    Python(#[from] pyo3::PyErr),
}

impl Error {
    pub(crate) fn invalid(smiles: &str, source: SmilesError) -> Self {
        let smiles = smiles.to_owned();

        Self::InvalidMoleculeDescriptor { smiles, source }
    }
}
