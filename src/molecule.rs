//! Molecular graph representation. Atoms and bonds live in flat vectors and
//! an adjacency list of `(neighbor, bond index)` pairs is kept alongside them

use std::collections::VecDeque;

use crate::error::SmilesError;

/// element symbols indexed by atomic number. 0 is the placeholder (dummy)
/// atom left behind when a bond is cut
pub const SYMBOLS: [&str; 119] = [
    "*", "H", "He", "Li", "Be", "B", "C", "N", "O", "F", "Ne", "Na", "Mg",
    "Al", "Si", "P", "S", "Cl", "Ar", "K", "Ca", "Sc", "Ti", "V", "Cr", "Mn",
    "Fe", "Co", "Ni", "Cu", "Zn", "Ga", "Ge", "As", "Se", "Br", "Kr", "Rb",
    "Sr", "Y", "Zr", "Nb", "Mo", "Tc", "Ru", "Rh", "Pd", "Ag", "Cd", "In",
    "Sn", "Sb", "Te", "I", "Xe", "Cs", "Ba", "La", "Ce", "Pr", "Nd", "Pm",
    "Sm", "Eu", "Gd", "Tb", "Dy", "Ho", "Er", "Tm", "Yb", "Lu", "Hf", "Ta",
    "W", "Re", "Os", "Ir", "Pt", "Au", "Hg", "Tl", "Pb", "Bi", "Po", "At",
    "Rn", "Fr", "Ra", "Ac", "Th", "Pa", "U", "Np", "Pu", "Am", "Cm", "Bk",
    "Cf", "Es", "Fm", "Md", "No", "Lr", "Rf", "Db", "Sg", "Bh", "Hs", "Mt",
    "Ds", "Rg", "Cn", "Nh", "Fl", "Mc", "Lv", "Ts", "Og",
];

pub const DUMMY: u8 = 0;
pub const HYDROGEN: u8 = 1;
pub const BORON: u8 = 5;
pub const CARBON: u8 = 6;
pub const NITROGEN: u8 = 7;
pub const OXYGEN: u8 = 8;
pub const PHOSPHORUS: u8 = 15;
pub const SULFUR: u8 = 16;

/// look up the atomic number for `symbol`, which must be capitalized
pub fn atomic_number(symbol: &str) -> Option<u8> {
    SYMBOLS[1..]
        .iter()
        .position(|&s| s == symbol)
        .map(|i| i as u8 + 1)
}

/// valences RDKit accepts for a neutral atom of `element`. an empty list
/// means the element isn't checked
fn neutral_valences(element: u8) -> &'static [u8] {
    match element {
        HYDROGEN | 9 | 17 | 35 => &[1],
        BORON => &[3],
        CARBON | 14 => &[4],
        NITROGEN => &[3],
        OXYGEN => &[2],
        PHOSPHORUS | 33 => &[3, 5, 7],
        SULFUR | 34 | 52 => &[2, 4, 6],
        53 => &[1, 3, 5],
        _ => &[],
    }
}

/// allowed valences for `element` carrying `charge`. a charged atom gets the
/// valences of its isoelectronic neighbor in the periodic table, so `[N+]`
/// behaves like carbon and `[O-]` like fluorine
pub(crate) fn allowed_valences(element: u8, charge: i8) -> &'static [u8] {
    if element == DUMMY {
        return &[];
    }
    match u8::try_from(element as i16 - charge as i16) {
        Ok(shifted) if shifted > DUMMY => neutral_valences(shifted),
        _ => &[],
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum BondOrder {
    Single,
    Double,
    Triple,
    Quadruple,
    Aromatic,
}

impl BondOrder {
    /// contribution to the sigma + pi valence of an atom. aromatic bonds
    /// count as 1 and the aromatic atom gets its extra electron from the ring
    pub fn valence(self) -> u8 {
        match self {
            BondOrder::Single | BondOrder::Aromatic => 1,
            BondOrder::Double => 2,
            BondOrder::Triple => 3,
            BondOrder::Quadruple => 4,
        }
    }
}

/// `@` or `@@`: looking from the first of [Molecule::stereo_neighbors],
/// the rest go round anticlockwise or clockwise
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Chirality {
    Anticlockwise,
    Clockwise,
}

impl Chirality {
    pub fn flip(self) -> Self {
        match self {
            Chirality::Anticlockwise => Chirality::Clockwise,
            Chirality::Clockwise => Chirality::Anticlockwise,
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            Chirality::Anticlockwise => "@",
            Chirality::Clockwise => "@@",
        }
    }
}

/// geometry of a double bond. `refs.0` is a neighbor of the bond's `atom1`
/// and `refs.1` one of its `atom2`
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BondStereo {
    pub refs: (usize, usize),
    /// the two reference atoms are on the same side
    pub cis: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Atom {
    /// atomic number, [DUMMY] for placeholders
    pub element: u8,
    pub aromatic: bool,
    pub charge: i8,
    pub isotope: Option<u16>,
    /// hydrogen count written inside brackets. `None` means the count is
    /// implied by the default valence of an organic-subset atom
    pub hydrogens: Option<u8>,
    pub chirality: Option<Chirality>,
}

impl Atom {
    pub fn new(element: u8) -> Self {
        Self {
            element,
            aromatic: false,
            charge: 0,
            isotope: None,
            hydrogens: None,
            chirality: None,
        }
    }

    pub fn aromatic(element: u8) -> Self {
        Self {
            aromatic: true,
            ..Self::new(element)
        }
    }

    /// a placeholder atom labelled with `label` in the isotope slot, the way
    /// `[16*]` is written
    pub fn placeholder(label: u16) -> Self {
        Self {
            isotope: Some(label),
            hydrogens: Some(0),
            ..Self::new(DUMMY)
        }
    }

    pub fn symbol(&self) -> &'static str {
        SYMBOLS[self.element as usize]
    }

    pub fn is_placeholder(&self) -> bool {
        self.element == DUMMY
    }

    pub fn is_heavy(&self) -> bool {
        self.element > HYDROGEN
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Bond {
    pub atom1: usize,
    pub atom2: usize,
    pub order: BondOrder,
    pub stereo: Option<BondStereo>,
}

impl Bond {
    pub fn new(atom1: usize, atom2: usize, order: BondOrder) -> Self {
        Self {
            atom1,
            atom2,
            order,
            stereo: None,
        }
    }

    /// the end of `self` that isn't `atom`
    pub fn other(&self, atom: usize) -> usize {
        if self.atom1 == atom {
            self.atom2
        } else {
            self.atom1
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Molecule {
    pub atoms: Vec<Atom>,
    pub bonds: Vec<Bond>,
    /// adjacency[i] = (neighbor, bond index) for every bond touching atom i
    adjacency: Vec<Vec<(usize, usize)>>,
}

impl Molecule {
    pub fn new(atoms: Vec<Atom>, bonds: Vec<Bond>) -> Self {
        let mut adjacency = vec![Vec::new(); atoms.len()];
        for (b, bond) in bonds.iter().enumerate() {
            adjacency[bond.atom1].push((bond.atom2, b));
            adjacency[bond.atom2].push((bond.atom1, b));
        }
        Self {
            atoms,
            bonds,
            adjacency,
        }
    }

    pub fn add_atom(&mut self, atom: Atom) -> usize {
        self.atoms.push(atom);
        self.adjacency.push(Vec::new());
        self.atoms.len() - 1
    }

    pub fn add_bond(&mut self, atom1: usize, atom2: usize, order: BondOrder) {
        let b = self.bonds.len();
        self.bonds.push(Bond::new(atom1, atom2, order));
        self.adjacency[atom1].push((atom2, b));
        self.adjacency[atom2].push((atom1, b));
    }

    pub fn len(&self) -> usize {
        self.atoms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.atoms.is_empty()
    }

    pub fn neighbors(&self, atom: usize) -> &[(usize, usize)] {
        &self.adjacency[atom]
    }

    pub fn degree(&self, atom: usize) -> usize {
        self.adjacency[atom].len()
    }

    pub fn bond_between(&self, a: usize, b: usize) -> Option<usize> {
        self.adjacency[a]
            .iter()
            .find(|&&(n, _)| n == b)
            .map(|&(_, bond)| bond)
    }

    /// sum of [BondOrder::valence] over the bonds of `atom`
    pub fn bond_valence(&self, atom: usize) -> u8 {
        self.adjacency[atom]
            .iter()
            .map(|&(_, b)| self.bonds[b].order.valence())
            .sum()
    }

    /// hydrogens an unbracketed atom would carry given its current bonds.
    /// bracket atoms and elements outside the organic subset get none
    pub fn implicit_hydrogens(&self, atom: usize) -> u8 {
        let a = &self.atoms[atom];
        if a.hydrogens.is_some() || a.charge != 0 {
            return 0;
        }
        self.default_hydrogens(atom).unwrap_or(0)
    }

    /// the hydrogen count the valence model predicts for `atom`, whether or
    /// not it is bracketed, or `None` when its bonds already exceed every
    /// allowed valence. used to decide if brackets can be dropped
    pub(crate) fn default_hydrogens(&self, atom: usize) -> Option<u8> {
        let a = &self.atoms[atom];
        let valence = self.bond_valence(atom);
        let allowed = allowed_valences(a.element, 0);
        if a.aromatic {
            // only aromatic carbon and boron pick up hydrogens implicitly,
            // pyrrole-type nitrogens are written as [nH]
            let max = allowed.last().copied()?;
            return match a.element {
                CARBON => (valence <= max).then(|| 3u8.saturating_sub(valence)),
                BORON => (valence <= max).then(|| 2u8.saturating_sub(valence)),
                _ => (valence <= max).then_some(0),
            };
        }
        allowed.iter().find(|&&v| v >= valence).map(|v| v - valence)
    }

    pub fn total_hydrogens(&self, atom: usize) -> u8 {
        self.atoms[atom]
            .hydrogens
            .unwrap_or_else(|| self.implicit_hydrogens(atom))
    }

    /// atoms heavier than hydrogen, which excludes placeholders too
    pub fn heavy_atom_count(&self) -> usize {
        self.atoms.iter().filter(|a| a.is_heavy()).count()
    }

    /// reject atoms whose bonds and written hydrogens exceed every valence
    /// allowed for their element and charge
    pub(crate) fn check_valences(&self) -> Result<(), SmilesError> {
        for (index, atom) in self.atoms.iter().enumerate() {
            let Some(&max) = allowed_valences(atom.element, atom.charge).last()
            else {
                continue;
            };
            let valence = self.bond_valence(index) + atom.hydrogens.unwrap_or(0);
            if valence > max {
                return Err(SmilesError::Valence {
                    index,
                    symbol: atom.symbol(),
                    valence,
                });
            }
        }
        Ok(())
    }

    /// flag every bond that lies on a ring, found as the complement of the
    /// bridges of the graph
    pub fn ring_bonds(&self) -> Vec<bool> {
        const UNSEEN: usize = usize::MAX;
        let n = self.atoms.len();
        let mut in_ring = vec![true; self.bonds.len()];
        let mut disc = vec![UNSEEN; n];
        let mut low = vec![0; n];
        let mut time = 0;
        for root in 0..n {
            if disc[root] != UNSEEN {
                continue;
            }
            disc[root] = time;
            low[root] = time;
            time += 1;
            // (atom, bond we arrived by, next adjacency slot to look at)
            let mut stack = vec![(root, UNSEEN, 0)];
            while let Some(top) = stack.last_mut() {
                let (v, via, slot) = *top;
                top.2 += 1;
                match self.adjacency[v].get(slot) {
                    Some(&(_, b)) if b == via => {}
                    Some(&(w, b)) => {
                        if disc[w] == UNSEEN {
                            disc[w] = time;
                            low[w] = time;
                            time += 1;
                            stack.push((w, b, 0));
                        } else {
                            low[v] = low[v].min(disc[w]);
                        }
                    }
                    None => {
                        stack.pop();
                        if let Some(&(u, _, _)) = stack.last() {
                            low[u] = low[u].min(low[v]);
                            if low[v] > disc[u] {
                                in_ring[via] = false;
                            }
                        }
                    }
                }
            }
        }
        in_ring
    }

    pub fn ring_atoms(&self, ring_bonds: &[bool]) -> Vec<bool> {
        (0..self.atoms.len())
            .map(|a| self.adjacency[a].iter().any(|&(_, b)| ring_bonds[b]))
            .collect()
    }

    /// the shortest cycle through `bond` as a list of atoms, or `None` if
    /// the bond is in no ring or every cycle through it is longer than
    /// `limit`
    pub(crate) fn shortest_cycle(&self, bond: usize, limit: usize) -> Option<Vec<usize>> {
        let Bond { atom1, atom2, .. } = self.bonds[bond];
        let mut parent = vec![None; self.len()];
        let mut queue = VecDeque::from([(atom1, 1)]);
        parent[atom1] = Some(atom1);
        while let Some((a, len)) = queue.pop_front() {
            if a == atom2 {
                break;
            }
            if len >= limit {
                continue;
            }
            for &(n, nb) in &self.adjacency[a] {
                if nb != bond && parent[n].is_none() {
                    parent[n] = Some(a);
                    queue.push_back((n, len + 1));
                }
            }
        }
        parent[atom2]?;
        let mut path = vec![atom2];
        let mut cur = atom2;
        while let Some(p) = parent[cur].filter(|&p| p != cur) {
            path.push(p);
            cur = p;
        }
        Some(path)
    }

    /// the atoms connected to `start`, sorted
    pub fn component_of(&self, start: usize) -> Vec<usize> {
        let mut seen = vec![false; self.atoms.len()];
        self.reach(start, &mut seen)
    }

    fn reach(&self, start: usize, seen: &mut [bool]) -> Vec<usize> {
        seen[start] = true;
        let mut queue = VecDeque::from([start]);
        let mut component = Vec::new();
        while let Some(a) = queue.pop_front() {
            component.push(a);
            for &(n, _) in &self.adjacency[a] {
                if !seen[n] {
                    seen[n] = true;
                    queue.push_back(n);
                }
            }
        }
        component.sort_unstable();
        component
    }

    /// connected components as lists of atom indices, each sorted, in order
    /// of their lowest atom
    pub fn components(&self) -> Vec<Vec<usize>> {
        let mut seen = vec![false; self.atoms.len()];
        let mut ret = Vec::new();
        for start in 0..self.atoms.len() {
            if !seen[start] {
                ret.push(self.reach(start, &mut seen));
            }
        }
        ret
    }

    /// copy out the atoms in `keep` and the bonds between them, stereo
    /// included. the second value maps old atom indices to new ones. stereo
    /// still refers to the old indices until [Molecule::carry_stereo] runs
    fn extract(&self, keep: &[usize]) -> (Molecule, Vec<Option<usize>>) {
        let mut map = vec![None; self.atoms.len()];
        for (new, &old) in keep.iter().enumerate() {
            map[old] = Some(new);
        }
        let atoms = keep.iter().map(|&a| self.atoms[a].clone()).collect();
        let bonds = self
            .bonds
            .iter()
            .filter_map(|b| {
                Some(Bond {
                    stereo: b.stereo,
                    ..Bond::new(map[b.atom1]?, map[b.atom2]?, b.order)
                })
            })
            .collect();
        (Molecule::new(atoms, bonds), map)
    }

    /// copy out the atoms in `keep` and the bonds between them
    pub fn submolecule(&self, keep: &[usize]) -> Molecule {
        let (mut ret, map) = self.extract(keep);
        ret.carry_stereo(self, keep, |_, n| map[n]);
        ret
    }

    /// turn every placeholder into a hydrogen atom
    pub fn cap_placeholders(&mut self) {
        for atom in self.atoms.iter_mut().filter(|a| a.is_placeholder()) {
            *atom = Atom {
                hydrogens: Some(0),
                ..Atom::new(HYDROGEN)
            };
        }
    }

    /// remove hydrogen atoms that hang off a single heavy atom, moving them
    /// into that atom's hydrogen count. the heavy atom keeps its total
    /// hydrogen count, so it gains brackets when its valence alone no longer
    /// implies the right number
    pub fn fold_hydrogens(&self) -> Molecule {
        let removable: Vec<bool> = (0..self.atoms.len())
            .map(|i| {
                let a = &self.atoms[i];
                a.element == HYDROGEN
                    && a.charge == 0
                    && a.isotope.is_none()
                    && a.hydrogens.unwrap_or(0) == 0
                    && self.degree(i) == 1
                    && self.atoms[self.adjacency[i][0].0].is_heavy()
            })
            .collect();
        if !removable.contains(&true) {
            return self.clone();
        }
        let mut targets: Vec<u8> =
            (0..self.atoms.len()).map(|i| self.total_hydrogens(i)).collect();
        // a hydrogen standing in for a double-bonded placeholder is worth two
        for i in (0..self.atoms.len()).filter(|&i| removable[i]) {
            let (heavy, bond) = self.adjacency[i][0];
            targets[heavy] += self.bonds[bond].order.valence();
        }
        let keep: Vec<usize> =
            (0..self.atoms.len()).filter(|&i| !removable[i]).collect();
        let (mut ret, map) = self.extract(&keep);
        for (new, &old) in keep.iter().enumerate() {
            let target = targets[old];
            let atom = &ret.atoms[new];
            let stays_implicit =
                atom.hydrogens.is_none() && ret.implicit_hydrogens(new) == target;
            if !stays_implicit {
                ret.atoms[new].hydrogens = Some(target);
            }
        }
        // hydrogen counts have to be final before stereo is carried over,
        // a folded hydrogen becomes the implicit one
        ret.carry_stereo(self, &keep, |_, n| map[n]);
        ret
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ethanol() -> Molecule {
        let atoms = vec![
            Atom::new(CARBON),
            Atom::new(CARBON),
            Atom::new(OXYGEN),
        ];
        let bonds = vec![
            Bond::new(0, 1, BondOrder::Single),
            Bond::new(1, 2, BondOrder::Single),
        ];
        Molecule::new(atoms, bonds)
    }

    fn benzene() -> Molecule {
        let atoms = vec![Atom::aromatic(CARBON); 6];
        let bonds = (0..6)
            .map(|i| Bond::new(i, (i + 1) % 6, BondOrder::Aromatic))
            .collect();
        Molecule::new(atoms, bonds)
    }

    #[test]
    fn lookup() {
        assert_eq!(atomic_number("C"), Some(6));
        assert_eq!(atomic_number("Cl"), Some(17));
        assert_eq!(atomic_number("Og"), Some(118));
        assert_eq!(atomic_number("*"), None);
        assert_eq!(atomic_number("Xx"), None);
    }

    #[test]
    fn hydrogens() {
        let mol = ethanol();
        assert_eq!(mol.total_hydrogens(0), 3);
        assert_eq!(mol.total_hydrogens(1), 2);
        assert_eq!(mol.total_hydrogens(2), 1);
        assert_eq!(mol.heavy_atom_count(), 3);

        let mol = benzene();
        assert!((0..6).all(|i| mol.total_hydrogens(i) == 1));
    }

    #[test]
    fn rings() {
        let mut mol = benzene();
        let c = mol.add_atom(Atom::new(CARBON));
        mol.add_bond(0, c, BondOrder::Single);
        let ring = mol.ring_bonds();
        assert_eq!(ring, vec![true, true, true, true, true, true, false]);
        let atoms = mol.ring_atoms(&ring);
        assert_eq!(atoms.iter().filter(|&&r| r).count(), 6);
        assert!(!atoms[c]);

        assert!(ethanol().ring_bonds().iter().all(|&r| !r));
    }

    #[test]
    fn components() {
        let mut mol = ethanol();
        mol.add_atom(Atom::new(17));
        assert_eq!(mol.components(), vec![vec![0, 1, 2], vec![3]]);
        let sub = mol.submolecule(&[1, 2]);
        assert_eq!(sub.len(), 2);
        assert_eq!(sub.bonds, vec![Bond::new(0, 1, BondOrder::Single)]);
    }

    #[test]
    fn capped_placeholder_folds_into_carbon() {
        let mut mol = ethanol();
        let p = mol.add_atom(Atom::placeholder(4));
        mol.add_bond(2, p, BondOrder::Single);
        assert_eq!(mol.total_hydrogens(2), 0);
        mol.cap_placeholders();
        let got = mol.fold_hydrogens();
        assert_eq!(got.len(), 3);
        assert_eq!(got.atoms[2].hydrogens, None);
        assert_eq!(got.total_hydrogens(2), 1);
    }

    #[test]
    fn folding_into_aromatic_nitrogen_adds_brackets() {
        // pyrrole ring with the nitrogen substituent replaced by hydrogen
        let mut atoms = vec![Atom::aromatic(CARBON); 4];
        atoms.push(Atom::aromatic(NITROGEN));
        atoms.push(Atom::new(HYDROGEN));
        let mut bonds: Vec<Bond> = (0..5)
            .map(|i| Bond::new(i, (i + 1) % 5, BondOrder::Aromatic))
            .collect();
        bonds.push(Bond::new(4, 5, BondOrder::Single));
        let got = Molecule::new(atoms, bonds).fold_hydrogens();
        assert_eq!(got.len(), 5);
        assert_eq!(got.atoms[4].hydrogens, Some(1));
    }

    #[test]
    fn valence_check() {
        let mut mol = ethanol();
        mol.bonds[1].order = BondOrder::Triple;
        let mol = Molecule::new(mol.atoms, mol.bonds);
        assert!(matches!(
            mol.check_valences(),
            Err(SmilesError::Valence { index: 2, .. })
        ));
    }
}
