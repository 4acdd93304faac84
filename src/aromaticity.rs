//! Hückel aromaticity for rings written in Kekulé form, so that `C1=CC=CC=C1`
//! and `c1ccccc1` end up as the same molecule. Rings that are only aromatic
//! together, like the two rings of azulene, are tested as one envelope

use std::collections::BTreeSet;

use itertools::Itertools;

use crate::{
    error::SmilesError,
    molecule::{
        allowed_valences, BondOrder, Molecule, CARBON, NITROGEN, OXYGEN, SULFUR,
    },
};

/// rings bigger than this are never considered on their own
const MAX_RING: usize = 7;

/// most rings combined into one envelope
const MAX_FUSED: usize = 4;

/// the shortest cycle through each ring bond, as long as it has at most
/// [MAX_RING] atoms
pub(crate) fn small_rings(mol: &Molecule, ring_bonds: &[bool]) -> Vec<Vec<usize>> {
    let mut seen = BTreeSet::new();
    let mut ret = Vec::new();
    for b in (0..mol.bonds.len()).filter(|&b| ring_bonds[b]) {
        let Some(path) = mol.shortest_cycle(b, MAX_RING) else {
            continue;
        };
        let key: BTreeSet<usize> = path.iter().copied().collect();
        if seen.insert(key) {
            ret.push(path);
        }
    }
    ret
}

/// pi electrons `atom` puts into `ring`, or `None` if it can't be part of an
/// aromatic ring at all
fn electrons(mol: &Molecule, atom: usize, ring: &[usize], in_ring: &[bool]) -> Option<u8> {
    let a = &mol.atoms[atom];
    let mut doubles = mol
        .neighbors(atom)
        .iter()
        .filter(|&&(_, b)| mol.bonds[b].order == BondOrder::Double);
    let double = doubles.next().map(|&(n, _)| n);
    if doubles.next().is_some()
        || mol
            .neighbors(atom)
            .iter()
            .any(|&(_, b)| mol.bonds[b].order == BondOrder::Triple)
    {
        return None;
    }
    // a double bond inside this ring or into a fused ring shares its
    // electrons with the ring, one pointing at O or S takes them away
    let shared = |p: usize| {
        ring.contains(&p)
            || (in_ring[p] && matches!(mol.atoms[p].element, CARBON | NITROGEN))
    };
    match (a.element, a.charge, double) {
        (CARBON, 0, Some(p)) if shared(p) => Some(1),
        (CARBON, 0, Some(p)) if matches!(mol.atoms[p].element, OXYGEN | SULFUR | NITROGEN) => {
            Some(0)
        }
        (NITROGEN, 0 | 1, Some(p)) if shared(p) => Some(1),
        (NITROGEN, 0, None) if mol.degree(atom) + mol.total_hydrogens(atom) as usize == 3 => {
            Some(2)
        }
        (OXYGEN | SULFUR, 0, None) if mol.degree(atom) == 2 => Some(2),
        _ => None,
    }
}

fn huckel(mol: &Molecule, ring: &[usize], in_ring: &[bool]) -> bool {
    let total: Option<u8> = ring
        .iter()
        .map(|&a| electrons(mol, a, ring, in_ring))
        .sum();
    total.is_some_and(|e| e % 4 == 2)
}

/// whether the rings picked out by `combo` hang together through shared
/// bonds
fn fused(rings: &[Vec<usize>], combo: &[usize]) -> bool {
    let shares = |i: usize, j: usize| {
        rings[i].iter().filter(|a| rings[j].contains(a)).count() >= 2
    };
    let mut reached = vec![combo[0]];
    let mut grew = true;
    while grew {
        grew = false;
        for &r in combo {
            if !reached.contains(&r) && reached.iter().any(|&q| shares(q, r)) {
                reached.push(r);
                grew = true;
            }
        }
    }
    reached.len() == combo.len()
}

/// an aromatic atom short of a double bond in its Kekulé form. atoms whose
/// valence is complete with single bonds, like the N of pyrrole, and atoms
/// with an exocyclic double bond already have one
fn needs_double(mol: &Molecule, atom: usize) -> bool {
    let a = &mol.atoms[atom];
    if !a.aromatic
        || mol
            .neighbors(atom)
            .iter()
            .any(|&(_, b)| mol.bonds[b].order == BondOrder::Double)
    {
        return false;
    }
    let allowed = allowed_valences(a.element, a.charge);
    let valence = mol.bond_valence(atom) + mol.total_hydrogens(atom);
    !allowed.contains(&valence) && allowed.contains(&(valence + 1))
}

/// pair up every atom in `open` along the edges of `graph`, trying the most
/// constrained atom first
fn perfect_matching(graph: &[Vec<usize>], open: &mut [bool]) -> bool {
    let pick = (0..open.len())
        .filter(|&a| open[a])
        .min_by_key(|&a| graph[a].iter().filter(|&&n| open[n]).count());
    let Some(a) = pick else {
        return true;
    };
    open[a] = false;
    for &n in &graph[a] {
        if !open[n] {
            continue;
        }
        open[n] = false;
        if perfect_matching(graph, open) {
            return true;
        }
        open[n] = true;
    }
    open[a] = true;
    false
}

impl Molecule {
    /// mark Kekulé rings with 4n + 2 pi electrons aromatic. atoms that were
    /// already aromatic are left alone, and every atom keeps its hydrogen
    /// count. stereo marks on what becomes aromatic are dropped
    pub fn perceive_aromaticity(&mut self) {
        let ring_bonds = self.ring_bonds();
        if !ring_bonds.contains(&true) {
            return;
        }
        let in_ring = self.ring_atoms(&ring_bonds);
        let hydrogens: Vec<u8> =
            (0..self.len()).map(|a| self.total_hydrogens(a)).collect();

        let rings: Vec<Vec<usize>> = small_rings(self, &ring_bonds)
            .into_iter()
            .filter(|ring| ring.iter().all(|&a| !self.atoms[a].aromatic))
            .collect();
        let mut aromatic: Vec<bool> =
            rings.iter().map(|r| huckel(self, r, &in_ring)).collect();
        for size in 2..=rings.len().min(MAX_FUSED) {
            for combo in (0..rings.len()).combinations(size) {
                if combo.iter().all(|&r| aromatic[r]) || !fused(&rings, &combo) {
                    continue;
                }
                let envelope: Vec<usize> = combo
                    .iter()
                    .flat_map(|&r| rings[r].iter().copied())
                    .unique()
                    .collect();
                if huckel(self, &envelope, &in_ring) {
                    for &r in &combo {
                        aromatic[r] = true;
                    }
                }
            }
        }
        if !aromatic.contains(&true) {
            return;
        }

        for (ring, _) in rings.iter().zip(&aromatic).filter(|&(_, &a)| a) {
            for (i, &a) in ring.iter().enumerate() {
                let b = ring[(i + 1) % ring.len()];
                self.atoms[a].aromatic = true;
                self.atoms[a].chirality = None;
                if let Some(bond) = self.bond_between(a, b) {
                    self.bonds[bond].order = BondOrder::Aromatic;
                    self.bonds[bond].stereo = None;
                }
            }
        }
        for (a, &h) in hydrogens.iter().enumerate() {
            if self.total_hydrogens(a) != h {
                self.atoms[a].hydrogens = Some(h);
            }
        }
    }

    /// reject aromatic input that can't be drawn with alternating double
    /// bonds: aromatic atoms outside rings, and ring systems where the atoms
    /// that still need a double bond can't all be paired up
    pub(crate) fn check_kekule(&self) -> Result<(), SmilesError> {
        if !self.atoms.iter().any(|a| a.aromatic) {
            return Ok(());
        }
        let ring_bonds = self.ring_bonds();
        let in_ring = self.ring_atoms(&ring_bonds);
        if let Some(index) =
            (0..self.len()).find(|&a| self.atoms[a].aromatic && !in_ring[a])
        {
            return Err(SmilesError::AromaticOutsideRing { index });
        }
        let mut open: Vec<bool> =
            (0..self.len()).map(|a| needs_double(self, a)).collect();
        let graph: Vec<Vec<usize>> = (0..self.len())
            .map(|a| {
                self.neighbors(a)
                    .iter()
                    .filter(|&&(n, b)| {
                        open[a] && open[n] && self.bonds[b].order == BondOrder::Aromatic
                    })
                    .map(|&(n, _)| n)
                    .collect()
            })
            .collect();
        // one aromatic system at a time keeps a failure local
        let mut seen = vec![false; self.len()];
        for start in 0..self.len() {
            if !open[start] || seen[start] {
                continue;
            }
            let mut system = vec![start];
            seen[start] = true;
            let mut i = 0;
            while i < system.len() {
                for &n in &graph[system[i]] {
                    if !seen[n] {
                        seen[n] = true;
                        system.push(n);
                    }
                }
                i += 1;
            }
            let mut local = vec![false; self.len()];
            for &a in &system {
                local[a] = true;
            }
            if system.len() % 2 == 1 || !perfect_matching(&graph, &mut local) {
                return Err(SmilesError::Kekulize { index: start });
            }
            for &a in &system {
                open[a] = false;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn canon(s: &str) -> String {
        Molecule::from_smiles(s).unwrap().to_smiles()
    }

    #[test]
    fn kekule_rings() {
        assert_eq!(canon("C1=CC=CC=C1"), "c1ccccc1");
        assert_eq!(canon("C1=CC=CN1"), canon("c1cc[nH]c1"));
        assert_eq!(canon("C1=COC=C1"), canon("c1ccoc1"));
        assert_eq!(canon("CC1=CC=CC=N1"), canon("Cc1ccccn1"));
        assert_eq!(canon("O=C1C=CC=CN1"), canon("O=c1cccc[nH]1"));
        assert_eq!(canon("C1=CC=C2C=CC=CC2=C1"), canon("c1ccc2ccccc2c1"));
        // neither ring of azulene is aromatic by itself
        assert_eq!(canon("C1=CC=C2C=CC=C2C=C1"), canon("c1ccc2cccc2cc1"));
    }

    #[test]
    fn envelope_only_when_needed() {
        let mol = Molecule::from_smiles("C1=CC=C2C=CC=C2C=C1").unwrap();
        assert!(mol.atoms.iter().all(|a| a.aromatic));
        assert!(mol.bonds.iter().all(|b| b.order == BondOrder::Aromatic));

        // pentalene has 8 electrons around the outside
        let mol = Molecule::from_smiles("C1=CC2=CC=CC2=C1").unwrap();
        assert!(mol.atoms.iter().all(|a| !a.aromatic));
    }

    #[test]
    fn kekule_check() {
        use SmilesError as E;
        let err = |s: &str| Molecule::from_smiles(s).unwrap_err();
        assert_eq!(err("c1cccc1"), E::Kekulize { index: 0 });
        assert_eq!(err("cc"), E::AromaticOutsideRing { index: 0 });
        assert_eq!(err("Cc"), E::AromaticOutsideRing { index: 1 });
        for s in [
            "c1ccccc1",
            "c1cc[nH]c1",
            "Cn1cnc2c1c(=O)n(C)c(=O)n2C",
            "O=c1cccc[nH]1",
            "c1ccc2ccccc2c1",
            "C[n+]1ccccc1",
            "c1ccc2cccc2cc1",
        ] {
            assert!(Molecule::from_smiles(s).is_ok(), "{s}");
        }
    }

    #[test]
    fn aromatizing_drops_stereo() {
        let mol = Molecule::from_smiles("C1=CC=CC=C1/C=C/F").unwrap();
        let double = mol
            .bonds
            .iter()
            .find(|b| b.order == BondOrder::Double)
            .unwrap();
        assert!(double.stereo.is_some());
        assert!(mol.bonds.iter().all(|b| b.order != BondOrder::Aromatic
            || b.stereo.is_none()));
    }

    #[test]
    fn not_aromatic() {
        for s in ["C1=CCCC=C1", "O=C1C=CC(=O)C=C1", "C1CCCCC1", "C1=CC=CC1"] {
            let mol = Molecule::from_smiles(s).unwrap();
            assert!(mol.atoms.iter().all(|a| !a.aromatic), "{s}");
        }
    }

    #[test]
    fn rings_found() {
        let mol = Molecule::from_smiles("C1CCC2CCCC2C1").unwrap();
        let rings = small_rings(&mol, &mol.ring_bonds());
        let mut sizes: Vec<usize> = rings.iter().map(Vec::len).collect();
        sizes.sort_unstable();
        assert_eq!(sizes, vec![5, 6]);
    }
}
