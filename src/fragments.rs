use std::{cmp::Reverse, collections::BTreeSet};

use indexmap::IndexMap;
use itertools::Itertools;
use log::{debug, info};

use crate::{brics, error::Result, molecule::Molecule, Error};

/// Splits a molecule into its set of labelled fragments
pub trait Decomposer {
    fn decompose(&self, smiles: &str) -> Result<BTreeSet<String>>;
}

/// Turns a labelled fragment into the key it is counted under
pub trait Canonicalizer {
    fn canonicalize(&self, fragment: &str) -> Result<CanonicalFragment>;
}

/// A fragment with its placeholders replaced by hydrogen, written as
/// canonical SMILES
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CanonicalFragment {
    pub smiles: String,
    pub heavy_atoms: usize,
}

/// [Decomposer] using the built-in BRICS rules
#[derive(Clone, Copy, Debug, Default)]
pub struct Brics;

impl Decomposer for Brics {
    fn decompose(&self, smiles: &str) -> Result<BTreeSet<String>> {
        let mol =
            Molecule::from_smiles(smiles).map_err(|e| Error::invalid(smiles, e))?;
        if mol.is_empty() {
            return Ok(BTreeSet::new());
        }
        Ok(brics::fragments(&mol))
    }
}

/// [Canonicalizer] using the built-in SMILES writer
#[derive(Clone, Copy, Debug, Default)]
pub struct Native;

impl Canonicalizer for Native {
    fn canonicalize(&self, fragment: &str) -> Result<CanonicalFragment> {
        let mut mol = Molecule::from_smiles(fragment)
            .map_err(|e| Error::invalid(fragment, e))?;
        mol.cap_placeholders();
        let mol = mol.fold_hydrogens();
        Ok(CanonicalFragment {
            smiles: mol.to_smiles(),
            heavy_atoms: mol.heavy_atom_count(),
        })
    }
}

/// Occurrence counts of canonical fragments, iterated in the order each
/// fragment was first seen
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FrequencyTable {
    counts: IndexMap<String, u32>,
}

impl FrequencyTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// count one more occurrence of `smiles`
    pub fn add(&mut self, smiles: impl Into<String>) {
        *self.counts.entry(smiles.into()).or_insert(0) += 1;
    }

    pub fn get(&self, smiles: &str) -> Option<u32> {
        self.counts.get(smiles).copied()
    }

    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, u32)> {
        self.counts.iter().map(|(k, &v)| (k.as_str(), v))
    }

    /// every entry by descending count. equal counts keep first-seen order
    pub fn ranked(&self) -> Vec<(&str, u32)> {
        self.iter().sorted_by_key(|&(_, count)| Reverse(count)).collect()
    }

    /// the `n` most frequent entries, or all of them if there are fewer
    pub fn top(&self, n: usize) -> Vec<(&str, u32)> {
        let mut ret = self.ranked();
        ret.truncate(n);
        ret
    }
}

impl FromIterator<(String, u32)> for FrequencyTable {
    fn from_iter<T: IntoIterator<Item = (String, u32)>>(iter: T) -> Self {
        let mut ret = Self::new();
        for (smiles, count) in iter {
            *ret.counts.entry(smiles).or_insert(0) += count;
        }
        ret
    }
}

/// Decomposes molecules and tallies their fragments
pub struct FragmentCounter {
    decomposer: Box<dyn Decomposer>,
    canonicalizer: Box<dyn Canonicalizer>,
}

impl Default for FragmentCounter {
    fn default() -> Self {
        Self::new(Brics, Native)
    }
}

impl FragmentCounter {
    pub fn new(
        decomposer: impl Decomposer + 'static,
        canonicalizer: impl Canonicalizer + 'static,
    ) -> Self {
        Self {
            decomposer: Box::new(decomposer),
            canonicalizer: Box::new(canonicalizer),
        }
    }

    /// count every canonical fragment of `molecules` with more than `m` heavy
    /// atoms. the first molecule that fails to parse aborts the count
    pub fn count_fragments<I, S>(&self, molecules: I, m: i64) -> Result<FrequencyTable>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut table = FrequencyTable::new();
        let mut seen = 0;
        for (i, smiles) in molecules.into_iter().enumerate() {
            let smiles = smiles.as_ref();
            let fragments = self.decomposer.decompose(smiles)?;
            debug!("molecule {i} ({smiles}): {} fragments", fragments.len());
            for fragment in fragments {
                let CanonicalFragment {
                    smiles: canonical,
                    heavy_atoms,
                } = self.canonicalizer.canonicalize(&fragment)?;
                if heavy_atoms as i64 > m {
                    table.add(canonical);
                }
            }
            seen += 1;
        }
        info!(
            "found {} distinct fragments with more than {m} heavy atoms in {seen} molecules",
            table.len()
        );
        Ok(table)
    }
}

/// [FragmentCounter::count_fragments] with the built-in BRICS rules and
/// canonicalizer
pub fn count_fragments<I, S>(molecules: I, m: i64) -> Result<FrequencyTable>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    FragmentCounter::default().count_fragments(molecules, m)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonicalize_fragment() {
        let got = Native.canonicalize("[16*]c1ccccc1[16*]").unwrap();
        assert_eq!(got.smiles, "c1ccccc1");
        assert_eq!(got.heavy_atoms, 6);

        let got = Native.canonicalize("[3*]O[3*]").unwrap();
        assert_eq!(got.smiles, "O");
        assert_eq!(got.heavy_atoms, 1);

        let got = Native.canonicalize("[7*]=C(C)C").unwrap();
        assert_eq!(got.smiles, "CCC");
    }

    #[test]
    fn canonical_is_stable() {
        for s in ["[1*]C(C)=O", "[4*]CCC([6*])=O", "[16*]c1ccc([14*])nc1"] {
            let once = Native.canonicalize(s).unwrap().smiles;
            let twice = Native.canonicalize(&once).unwrap().smiles;
            assert_eq!(once, twice);
        }
    }

    #[test]
    fn ranking() {
        let table: FrequencyTable = [("A", 3), ("B", 5), ("C", 5), ("D", 1)]
            .into_iter()
            .map(|(k, v)| (k.to_owned(), v))
            .collect();
        assert_eq!(table.top(2), vec![("B", 5), ("C", 5)]);
        assert_eq!(
            table.ranked(),
            vec![("B", 5), ("C", 5), ("A", 3), ("D", 1)]
        );
        assert_eq!(table.top(10).len(), 4);
    }

    #[test]
    fn first_seen_order() {
        let mut table = FrequencyTable::new();
        table.add("CC");
        table.add("O");
        table.add("CC");
        let got: Vec<_> = table.iter().collect();
        assert_eq!(got, vec![("CC", 2), ("O", 1)]);
    }

    #[test]
    fn one_molecule_counts_twice() {
        // [4*]C1(C)CCCCC1 and [15*]C1(C)CCCCC1 both cap to methylcyclohexane
        let table = count_fragments(["COC1(C)CCCCC1"], 0).unwrap();
        let key = Native.canonicalize("CC1CCCCC1").unwrap().smiles;
        assert_eq!(table.get(&key), Some(2));
        assert_eq!(table.get("CO"), Some(1));
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn empty_smiles_has_no_fragments() {
        assert!(Brics.decompose("").unwrap().is_empty());
        assert!(count_fragments([""], -1).unwrap().is_empty());
    }

    #[test]
    fn bad_smiles() {
        let err = count_fragments(["CCO", "C1CC"], 0).unwrap_err();
        assert!(matches!(
            err,
            Error::InvalidMoleculeDescriptor { ref smiles, .. } if smiles == "C1CC"
        ));
    }
}
