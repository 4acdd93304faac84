// the same fragment counting done by calling RDKit through an embedded Python
// interpreter (needs the rdkit package importable, see build.rs for conda)
use std::collections::BTreeSet;

use pyo3::{
    prelude::PyAnyMethods,
    types::{PyDict, PyDictMethods, PyModule},
    Bound, PyAny, Python,
};

use crate::{
    depict::Depictor,
    error::Result,
    fragments::{CanonicalFragment, Canonicalizer, Decomposer},
    Error,
};

fn chem(py: Python<'_>) -> Result<Bound<'_, PyModule>> {
    Ok(PyModule::import_bound(py, "rdkit.Chem")?)
}

/// `Chem.MolFromSmiles`, which hands back `None` rather than raising
fn mol_from_smiles<'py>(py: Python<'py>, smiles: &str) -> Result<Bound<'py, PyAny>> {
    let mol = chem(py)?.call_method1("MolFromSmiles", (smiles,))?;
    if mol.is_none() {
        return Err(Error::RejectedByBackend {
            smiles: smiles.to_owned(),
        });
    }
    Ok(mol)
}

/// [Decomposer], [Canonicalizer] and [Depictor] backed by RDKit
#[derive(Clone, Copy, Debug, Default)]
pub struct Rdkit;

impl Decomposer for Rdkit {
    fn decompose(&self, smiles: &str) -> Result<BTreeSet<String>> {
        Python::with_gil(|py| {
            let mol = mol_from_smiles(py, smiles)?;
            if mol.call_method0("GetNumAtoms")?.extract::<usize>()? == 0 {
                return Ok(BTreeSet::new());
            }
            let brics = PyModule::import_bound(py, "rdkit.Chem.BRICS")?;
            let frags = brics.call_method1("BRICSDecompose", (mol,))?;
            let mut ret = BTreeSet::new();
            for frag in frags.iter()? {
                ret.insert(frag?.extract::<String>()?);
            }
            Ok(ret)
        })
    }
}

impl Canonicalizer for Rdkit {
    fn canonicalize(&self, fragment: &str) -> Result<CanonicalFragment> {
        Python::with_gil(|py| {
            let chem = chem(py)?;
            let all_chem = PyModule::import_bound(py, "rdkit.Chem.AllChem")?;
            let mol = mol_from_smiles(py, fragment)?;
            let dummy = mol_from_smiles(py, "*")?;
            let hydrogen = mol_from_smiles(py, "[H]")?;
            let capped = all_chem
                .call_method1("ReplaceSubstructs", (mol, dummy, hydrogen, true))?
                .get_item(0)?;
            let mol = chem.call_method1("RemoveHs", (capped,))?;
            let smiles = chem
                .call_method1("MolToSmiles", (mol.clone(),))?
                .extract()?;
            let heavy_atoms = mol.call_method0("GetNumHeavyAtoms")?.extract()?;
            Ok(CanonicalFragment {
                smiles,
                heavy_atoms,
            })
        })
    }
}

impl Depictor for Rdkit {
    fn grid_svg(
        &self,
        fragments: &[&str],
        legends: &[String],
        per_row: usize,
    ) -> Result<String> {
        Python::with_gil(|py| {
            let mols = fragments
                .iter()
                .map(|smiles| mol_from_smiles(py, smiles))
                .collect::<Result<Vec<_>>>()?;
            let draw = PyModule::import_bound(py, "rdkit.Chem.Draw")?;
            let kwargs = PyDict::new_bound(py);
            kwargs.set_item("molsPerRow", per_row)?;
            kwargs.set_item("useSVG", true)?;
            kwargs.set_item("legends", legends.to_vec())?;
            let svg = draw.call_method("MolsToGridImage", (mols,), Some(&kwargs))?;
            Ok(svg.extract()?)
        })
    }
}
