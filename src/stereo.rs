//! Tetrahedral centers and double-bond geometry. Both are stored relative to
//! particular neighbors, so every operation that rebuilds a molecule has to
//! carry them over to the new atom indices. Whether a stored mark still
//! describes a real stereo element is only decided when writing SMILES

use crate::molecule::{
    Bond, BondOrder, BondStereo, Chirality, Molecule, NITROGEN, PHOSPHORUS, SULFUR,
};

/// double bonds in rings smaller than this can only be cis
const MIN_STEREO_RING: usize = 8;

/// whether `to` is an odd rearrangement of `from`, or `None` when it holds
/// different items
pub(crate) fn odd_permutation<T: PartialEq>(from: &[T], to: &[T]) -> Option<bool> {
    if from.len() != to.len() {
        return None;
    }
    let mut used = vec![false; from.len()];
    let mut perm = Vec::with_capacity(to.len());
    for t in to {
        let i = (0..from.len()).find(|&i| !used[i] && from[i] == *t)?;
        used[i] = true;
        perm.push(i);
    }
    let mut odd = false;
    for i in 0..perm.len() {
        for j in i + 1..perm.len() {
            if perm[i] > perm[j] {
                odd = !odd;
            }
        }
    }
    Some(odd)
}

impl Molecule {
    /// the neighbors a [Chirality] on `atom` refers to. an implicit
    /// hydrogen, or the lone pair of a three-coordinate center, comes first
    /// as `None`, then the bonded atoms in adjacency order
    pub fn stereo_neighbors(&self, atom: usize) -> Vec<Option<usize>> {
        let mut ret = Vec::with_capacity(4);
        if self.total_hydrogens(atom) > 0 || self.degree(atom) == 3 {
            ret.push(None);
        }
        ret.extend(self.neighbors(atom).iter().map(|&(n, _)| Some(n)));
        ret
    }

    /// re-express stereo copied from `old` in terms of `self`. `origin[a]` is
    /// the atom of `old` that atom `a` was copied from, and `map(center,
    /// neighbor)` gives what a neighbor of an old center turned into, or
    /// `None` if it is gone
    pub(crate) fn carry_stereo<F>(&mut self, old: &Molecule, origin: &[usize], map: F)
    where
        F: Fn(usize, usize) -> Option<usize>,
    {
        for a in 0..self.len() {
            let Some(chirality) = self.atoms[a].chirality else {
                continue;
            };
            let o = origin[a];
            let before: Vec<Option<usize>> = old
                .stereo_neighbors(o)
                .into_iter()
                .map(|n| n.and_then(|n| map(o, n)))
                .collect();
            let after = self.stereo_neighbors(a);
            self.atoms[a].chirality = odd_permutation(&before, &after)
                .map(|odd| if odd { chirality.flip() } else { chirality });
        }
        for b in 0..self.bonds.len() {
            if let Some(stereo) = self.bonds[b].stereo {
                self.bonds[b].stereo = self.carry_bond(b, stereo, origin, &map);
            }
        }
    }

    fn carry_bond<F>(
        &self,
        bond: usize,
        stereo: BondStereo,
        origin: &[usize],
        map: &F,
    ) -> Option<BondStereo>
    where
        F: Fn(usize, usize) -> Option<usize>,
    {
        let Bond { atom1, atom2, .. } = self.bonds[bond];
        let mut cis = stereo.cis;
        let mut refs = [0; 2];
        let ends = [(atom1, atom2, stereo.refs.0), (atom2, atom1, stereo.refs.1)];
        for (i, (end, other, old_ref)) in ends.into_iter().enumerate() {
            let kept = map(origin[end], old_ref)
                .filter(|&n| n != other && self.bond_between(end, n).is_some());
            refs[i] = match kept {
                Some(n) => n,
                None => {
                    // the other substituent sits on the opposite side
                    cis = !cis;
                    self.neighbors(end)
                        .iter()
                        .map(|&(n, _)| n)
                        .find(|&n| n != other)?
                }
            };
        }
        Some(BondStereo {
            refs: (refs[0], refs[1]),
            cis,
        })
    }
}

/// The stereo marks of a molecule that still describe something, given the
/// symmetry classes of its atoms
#[derive(Clone, Debug, Default)]
pub(crate) struct Stereo {
    centers: Vec<Option<Chirality>>,
    bonds: Vec<Option<BondStereo>>,
}

impl Stereo {
    /// a center needs four different surroundings and a double bond two
    /// different substituents on each end. atoms in the same class of
    /// `classes` count as the same
    pub(crate) fn perceive(mol: &Molecule, classes: &[usize]) -> Self {
        let centers = (0..mol.len())
            .map(|a| {
                mol.atoms[a]
                    .chirality
                    .filter(|_| is_center(mol, a, classes))
            })
            .collect();
        let ring_bonds = mol.ring_bonds();
        let bonds = (0..mol.bonds.len())
            .map(|b| {
                mol.bonds[b]
                    .stereo
                    .filter(|_| is_stereo_bond(mol, b, classes, &ring_bonds))
            })
            .collect();
        Self { centers, bonds }
    }

    pub(crate) fn center(&self, atom: usize) -> Option<Chirality> {
        self.centers.get(atom).copied().flatten()
    }

    /// stereo double bonds as `(bond, stereo)`
    pub(crate) fn double_bonds(&self) -> impl Iterator<Item = (usize, BondStereo)> + '_ {
        self.bonds
            .iter()
            .enumerate()
            .filter_map(|(b, s)| Some((b, (*s)?)))
    }
}

fn is_center(mol: &Molecule, atom: usize, classes: &[usize]) -> bool {
    let a = &mol.atoms[atom];
    let hydrogens = mol.total_hydrogens(atom) as usize;
    if a.aromatic || hydrogens > 1 {
        return false;
    }
    let hypervalent = matches!(a.element, SULFUR | PHOSPHORUS | 34);
    let saturated = mol
        .neighbors(atom)
        .iter()
        .all(|&(_, b)| mol.bonds[b].order == BondOrder::Single);
    let shape = match mol.degree(atom) + hydrogens {
        4 => saturated || hypervalent,
        3 => hydrogens == 0 && hypervalent,
        _ => false,
    };
    if !shape {
        return false;
    }
    let mut around: Vec<usize> =
        mol.neighbors(atom).iter().map(|&(n, _)| classes[n]).collect();
    around.sort_unstable();
    around.windows(2).all(|w| w[0] != w[1])
}

fn is_stereo_bond(
    mol: &Molecule,
    bond: usize,
    classes: &[usize],
    ring_bonds: &[bool],
) -> bool {
    let Bond { atom1, atom2, order, .. } = mol.bonds[bond];
    if order != BondOrder::Double {
        return false;
    }
    if ring_bonds[bond]
        && mol.shortest_cycle(bond, MIN_STEREO_RING - 1).is_some()
    {
        return false;
    }
    [(atom1, atom2), (atom2, atom1)].into_iter().all(|(end, other)| {
        let subs: Vec<usize> = mol
            .neighbors(end)
            .iter()
            .map(|&(n, _)| n)
            .filter(|&n| n != other)
            .collect();
        match (subs.as_slice(), mol.total_hydrogens(end)) {
            ([_], 1) => true,
            // the lone pair of an imine nitrogen
            ([_], 0) => mol.atoms[end].element == NITROGEN,
            ([x, y], 0) => classes[*x] != classes[*y],
            _ => false,
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn permutations() {
        assert_eq!(odd_permutation(&[1, 2, 3, 4], &[1, 2, 3, 4]), Some(false));
        assert_eq!(odd_permutation(&[1, 2, 3, 4], &[2, 1, 3, 4]), Some(true));
        assert_eq!(odd_permutation(&[1, 2, 3, 4], &[2, 3, 1, 4]), Some(false));
        assert_eq!(odd_permutation(&[1, 2, 3], &[1, 2, 4]), None);
        assert_eq!(
            odd_permutation(&[None, Some(0), Some(2)], &[Some(0), None, Some(2)]),
            Some(true)
        );
    }

    #[test]
    fn folded_hydrogen_keeps_center() {
        // the explicit hydrogen becomes the implicit one, F and Cl keep
        // their places
        let a = Molecule::from_smiles("[C@]([H])(F)(Cl)Br").unwrap();
        let b = Molecule::from_smiles("[C@H](F)(Cl)Br").unwrap();
        assert_eq!(a.len(), 4);
        assert_eq!(a.to_smiles(), b.to_smiles());
    }

    #[test]
    fn submolecule_keeps_geometry() {
        let mol = Molecule::from_smiles("F/C=C/Cl.O").unwrap();
        let sub = mol.submolecule(&mol.component_of(0));
        let want = Molecule::from_smiles("F/C=C/Cl").unwrap();
        assert_eq!(sub.to_smiles(), want.to_smiles());
        let double = sub
            .bonds
            .iter()
            .find(|b| b.order == BondOrder::Double)
            .and_then(|b| b.stereo);
        assert_eq!(double.map(|s| s.cis), Some(false));
    }

    #[test]
    fn symmetric_marks_are_dropped() {
        let mol = Molecule::from_smiles("C[C@H](C)O").unwrap();
        let classes = [0, 1, 0, 2];
        assert_eq!(Stereo::perceive(&mol, &classes).center(1), None);

        let mol = Molecule::from_smiles("C[C@H](N)O").unwrap();
        let classes = [0, 1, 2, 3];
        assert!(Stereo::perceive(&mol, &classes).center(1).is_some());
    }
}
