//! SMILES reading and writing

use crate::{error::SmilesError, molecule::Molecule};

use self::{parser::Parser, scanner::scan};

mod parser;
mod scanner;
pub(crate) mod writer;

impl Molecule {
    /// parse `s` the way RDKit's `MolFromSmiles` does for our purposes:
    /// valences are checked, explicit hydrogen atoms are folded into their
    /// heavy neighbors, aromatic input must have a Kekulé form and Kekulé
    /// rings are aromatized
    pub fn from_smiles(s: &str) -> Result<Self, SmilesError> {
        let tokens = scan(s)?;
        let mol = Parser::new(tokens).parse()?;
        mol.check_valences()?;
        let mut mol = mol.fold_hydrogens();
        mol.check_kekule()?;
        mol.perceive_aromaticity();
        Ok(mol)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_hydrogens_are_folded() {
        let mol = Molecule::from_smiles("[H]OC([H])([H])[H]").unwrap();
        assert_eq!(mol.len(), 2);
        assert_eq!(mol.total_hydrogens(0), 1);
        assert_eq!(mol.total_hydrogens(1), 3);

        // deuterium stays
        let mol = Molecule::from_smiles("[2H]C").unwrap();
        assert_eq!(mol.len(), 2);

        // and so does molecular hydrogen
        let mol = Molecule::from_smiles("[H][H]").unwrap();
        assert_eq!(mol.len(), 2);
    }

    #[test]
    fn bad_valence() {
        assert!(matches!(
            Molecule::from_smiles("C(C)(C)(C)(C)C"),
            Err(SmilesError::Valence { index: 0, .. })
        ));
        assert!(Molecule::from_smiles("CS(=O)(=O)C").is_ok());
        // bracket atoms are checked with their hydrogens and charge
        assert!(matches!(
            Molecule::from_smiles("C[N](C)(C)C"),
            Err(SmilesError::Valence { index: 1, .. })
        ));
        assert!(matches!(
            Molecule::from_smiles("[CH5]"),
            Err(SmilesError::Valence { index: 0, .. })
        ));
        assert!(Molecule::from_smiles("C[N+](C)(C)C").is_ok());
        assert!(Molecule::from_smiles("C[O-]").is_ok());
    }

    #[test]
    fn hypervalent_iodine() {
        for s in ["CCOC(=O)c1ccccc1I(OC(C)=O)OC(C)=O", "O=I(=O)c1ccccc1"] {
            let mol = Molecule::from_smiles(s).unwrap();
            let iodine = mol.atoms.iter().position(|a| a.element == 53).unwrap();
            assert_eq!(mol.total_hydrogens(iodine), 0, "{s}");
        }
    }

    #[test]
    fn empty() {
        let mol = Molecule::from_smiles("").unwrap();
        assert!(mol.is_empty());
    }
}
