//! Canonical SMILES. Atoms are ranked by refining their invariants against
//! their neighbors' ranks until the partition stops splitting. Ties that
//! survive refinement are broken by trying each atom of the first tied class
//! in turn, and the lexicographically smallest SMILES over all the choices
//! wins. Stereo marks are only written where the refined classes show they
//! mean something

use crate::{
    molecule::{BondOrder, Molecule},
    smiles::writer,
    stereo::Stereo,
};

/// give up exploring alternative tie breaks after this many complete
/// rankings and take the first candidate from then on
const SEARCH_LIMIT: usize = 256;

type Invariant = (u8, bool, i8, Option<u16>, usize, u8, bool);

fn invariants(mol: &Molecule) -> Vec<Invariant> {
    let ring_atoms = mol.ring_atoms(&mol.ring_bonds());
    (0..mol.len())
        .map(|a| {
            let atom = &mol.atoms[a];
            (
                atom.element,
                atom.aromatic,
                atom.charge,
                atom.isotope,
                mol.degree(a),
                mol.total_hydrogens(a),
                ring_atoms[a],
            )
        })
        .collect()
}

/// replace each key with its position among the sorted distinct keys
fn densify<K: Ord>(keys: &[K]) -> Vec<usize> {
    let mut sorted: Vec<&K> = keys.iter().collect();
    sorted.sort();
    sorted.dedup();
    keys.iter()
        .map(|k| sorted.binary_search(&k).unwrap_or_default())
        .collect()
}

fn class_count(classes: &[usize]) -> usize {
    classes.iter().max().map_or(0, |&m| m + 1)
}

/// split classes by the sorted (class, bond order) pairs of each atom's
/// neighbors until nothing changes. new class ids keep the order of the old
/// ones
fn refine(mol: &Molecule, mut classes: Vec<usize>) -> Vec<usize> {
    let mut count = class_count(&classes);
    loop {
        let keys: Vec<(usize, Vec<(usize, BondOrder)>)> = (0..mol.len())
            .map(|a| {
                let mut around: Vec<_> = mol
                    .neighbors(a)
                    .iter()
                    .map(|&(n, b)| (classes[n], mol.bonds[b].order))
                    .collect();
                around.sort_unstable();
                (classes[a], around)
            })
            .collect();
        let next = densify(&keys);
        let next_count = class_count(&next);
        if next_count == count {
            return next;
        }
        classes = next;
        count = next_count;
    }
}

/// the atoms sharing the lowest class that has more than one member
fn first_tie(classes: &[usize]) -> Option<Vec<usize>> {
    let mut sizes = vec![0; class_count(classes)];
    for &c in classes {
        sizes[c] += 1;
    }
    let tied = sizes.iter().position(|&s| s > 1)?;
    Some(
        classes
            .iter()
            .enumerate()
            .filter(|&(_, &c)| c == tied)
            .map(|(a, _)| a)
            .collect(),
    )
}

struct Search<'a> {
    mol: &'a Molecule,
    stereo: &'a Stereo,
    leaves: usize,
    best: Option<String>,
}

impl Search<'_> {
    fn run(&mut self, classes: Vec<usize>) {
        let classes = refine(self.mol, classes);
        let Some(tied) = first_tie(&classes) else {
            self.leaves += 1;
            let smiles = writer::write(self.mol, &classes, self.stereo);
            if self.best.as_ref().map_or(true, |b| smiles < *b) {
                self.best = Some(smiles);
            }
            return;
        };
        for (i, &atom) in tied.iter().enumerate() {
            if i > 0 && self.leaves >= SEARCH_LIMIT {
                break;
            }
            // pull `atom` ahead of the rest of its class
            let keys: Vec<(usize, bool)> = classes
                .iter()
                .enumerate()
                .map(|(a, &c)| (c, a != atom))
                .collect();
            self.run(densify(&keys));
        }
    }
}

/// canonical SMILES for `mol`. structurally identical molecules give the
/// same string however their atoms were ordered
pub fn canonical_smiles(mol: &Molecule) -> String {
    if mol.is_empty() {
        return String::new();
    }
    let classes = refine(mol, densify(&invariants(mol)));
    let stereo = Stereo::perceive(mol, &classes);
    let mut search = Search {
        mol,
        stereo: &stereo,
        leaves: 0,
        best: None,
    };
    search.run(classes);
    search.best.unwrap_or_default()
}

impl Molecule {
    pub fn to_smiles(&self) -> String {
        canonical_smiles(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn canon(s: &str) -> String {
        Molecule::from_smiles(s).unwrap().to_smiles()
    }

    #[test]
    fn writer_follows_ranks() {
        let none = Stereo::default();
        let mol = Molecule::from_smiles("CC(=O)O").unwrap();
        assert_eq!(writer::write(&mol, &[0, 1, 2, 3], &none), "CC(=O)O");
        assert_eq!(writer::write(&mol, &[0, 1, 3, 2], &none), "CC(O)=O");

        let mol = Molecule::from_smiles("c1ccccc1").unwrap();
        assert_eq!(writer::write(&mol, &[0, 1, 2, 3, 4, 5], &none), "c1ccccc1");
    }

    #[test]
    fn simple() {
        assert_eq!(canon("OCC"), "CCO");
        assert_eq!(canon("CCO"), "CCO");
        assert_eq!(canon("C1=CC=CC=C1"), canon("C=1C=CC=CC=1"));
        assert_eq!(canon("c1ccccc1"), "c1ccccc1");
        assert_eq!(canon("c1ccccc1C"), "Cc1ccccc1");
        assert_eq!(canon(""), "");
    }

    #[test]
    fn order_independent() {
        let groups: &[&[&str]] = &[
            &["c1ccncc1", "n1ccccc1", "c1cnccc1"],
            &["CC(=O)Oc1ccccc1C(=O)O", "OC(=O)c1ccccc1OC(C)=O"],
            &["C1CCC2CCCCC2C1", "C1CCCC2CCCCC12"],
            &["CC(C)(C)c1ccc(C(C)(C)C)cc1", "c1cc(C(C)(C)C)ccc1C(C)(C)C"],
            &["[NH3+]CC([O-])=O", "[O-]C(=O)C[NH3+]"],
            &["Cl.CN", "CN.Cl"],
        ];
        for group in groups {
            let want = canon(group[0]);
            for s in &group[1..] {
                assert_eq!(canon(s), want, "{s} vs {}", group[0]);
            }
        }
    }

    #[test]
    fn brackets_only_when_needed() {
        assert_eq!(canon("[CH4]"), "C");
        assert_eq!(canon("c1cc[nH]c1"), "c1cc[nH]c1");
        assert_eq!(canon("[13CH4]"), "[13CH4]");
        assert_eq!(canon("C[N+](C)(C)C"), "C[N+](C)(C)C");
        assert_eq!(canon("[16*]c1ccccc1"), "[16*]c1ccccc1");
    }

    #[test]
    fn tetrahedral_centers() {
        let r = canon("F[C@H](Cl)Br");
        assert_eq!(canon("Cl[C@@H](F)Br"), r);
        assert_eq!(canon("[C@@H](F)(Cl)Br"), r);
        assert_eq!(canon("Br[C@@H](Cl)F"), r);
        assert_ne!(canon("F[C@@H](Cl)Br"), r);
        assert_ne!(canon("FC(Cl)Br"), r);
        assert_eq!(canon("C[C@H]1CCCN1"), canon("C[C@@H]1NCCC1"));
        assert_ne!(canon("C[C@H]1CCCN1"), canon("C[C@@H]1CCCN1"));
        // two methyls make it no center at all
        assert_eq!(canon("C[C@H](C)O"), canon("CC(C)O"));
    }

    #[test]
    fn double_bonds() {
        let trans = canon("F/C=C/F");
        let cis = canon("F/C=C\\F");
        assert_eq!(canon("F\\C=C\\F"), trans);
        assert_eq!(canon("C(/F)=C/F"), cis);
        assert_eq!(canon("F\\C=C/F"), cis);
        assert_ne!(cis, trans);
        assert_ne!(canon("FC=CF"), trans);
        assert_ne!(canon("FC=CF"), cis);
        // identical substituents on one end
        assert_eq!(canon("C/C=C(/C)C"), canon("CC=C(C)C"));
        // too small a ring to be trans
        assert_eq!(canon("C1CCC/C=C/1"), canon("C1CCCC=C1"));
    }

    #[test]
    fn idempotent() {
        for s in [
            "F[C@H](Cl)Br",
            "C[C@@H]1CCCN1",
            "F/C=C/F",
            "C/C=C\\C=C\\C",
            "N[C@@H](Cc1ccccc1)C(=O)O",
            "C[S@](=O)CC",
            "CC(=O)Oc1ccccc1C(=O)O",
            "O=C(O)c1ccc2[nH]ccc2c1",
            "CN1CCC[C@H]1c1cccnc1",
            "C%10CC%10",
            "[2H]C([2H])([2H])Cl",
        ] {
            let once = canon(s);
            assert_eq!(canon(&once), once, "{s}");
        }
    }
}
