//! BRICS fragmentation (Degen et al., ChemMedChem 2008). Each environment is
//! an atom predicate equivalent to the published SMARTS, and a bond is broken
//! when it is acyclic, has the order a rule asks for and joins atoms in that
//! rule's two environments.
//!
//! Breaking follows RDKit's `BRICSDecompose`: every match of every rule in a
//! group cuts one bond of the molecule, each cut gives two new pieces, and
//! the pieces are examined again until nothing in the group matches. A bond
//! that fits several rules is cut once per labelling

use std::collections::{BTreeSet, VecDeque};

use crate::molecule::{
    Atom, Bond, BondOrder, Molecule, CARBON, DUMMY, HYDROGEN, NITROGEN, OXYGEN,
    SULFUR,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Env {
    L1,
    L3,
    L4,
    L5,
    L6,
    L7a,
    L7b,
    L8,
    L9,
    L10,
    L11,
    L12,
    L13,
    L14,
    L15,
    L16,
}

impl Env {
    /// the number written on the placeholder atom, 7a and 7b both become 7
    pub fn label(self) -> u16 {
        match self {
            Env::L1 => 1,
            Env::L3 => 3,
            Env::L4 => 4,
            Env::L5 => 5,
            Env::L6 => 6,
            Env::L7a | Env::L7b => 7,
            Env::L8 => 8,
            Env::L9 => 9,
            Env::L10 => 10,
            Env::L11 => 11,
            Env::L12 => 12,
            Env::L13 => 13,
            Env::L14 => 14,
            Env::L15 => 15,
            Env::L16 => 16,
        }
    }
}

type Rule = (Env, Env, BondOrder);

use BondOrder::{Double as D, Single as S};
use Env::*;

/// the published compatibility table, grouped by the first environment.
/// groups are applied in order, and each is exhausted before the next one
/// gets a look at the pieces
const RULES: &[&[Rule]] = &[
    &[(L1, L3, S), (L1, L5, S), (L1, L10, S)],
    &[(L3, L4, S), (L3, L13, S), (L3, L14, S), (L3, L15, S), (L3, L16, S)],
    &[(L4, L5, S), (L4, L11, S)],
    &[(L5, L12, S), (L5, L14, S), (L5, L16, S), (L5, L13, S), (L5, L15, S)],
    &[(L6, L13, S), (L6, L14, S), (L6, L15, S), (L6, L16, S)],
    &[(L7a, L7b, D)],
    &[
        (L8, L9, S),
        (L8, L10, S),
        (L8, L13, S),
        (L8, L14, S),
        (L8, L15, S),
        (L8, L16, S),
    ],
    &[(L9, L13, S), (L9, L14, S), (L9, L15, S), (L9, L16, S)],
    &[(L10, L13, S), (L10, L14, S), (L10, L15, S), (L10, L16, S)],
    &[(L11, L13, S), (L11, L14, S), (L11, L15, S), (L11, L16, S)],
    &[(L13, L14, S), (L13, L15, S), (L13, L16, S)],
    &[(L14, L14, S), (L14, L15, S), (L14, L16, S)],
    &[(L15, L16, S)],
    &[(L16, L16, S)],
];

/// a molecule together with its ring perception, which breaking acyclic
/// bonds never changes
struct Context<'a> {
    mol: &'a Molecule,
    ring_bonds: Vec<bool>,
    ring_atoms: Vec<bool>,
}

impl<'a> Context<'a> {
    fn new(mol: &'a Molecule) -> Self {
        let ring_bonds = mol.ring_bonds();
        let ring_atoms = mol.ring_atoms(&ring_bonds);
        Self {
            mol,
            ring_bonds,
            ring_atoms,
        }
    }

    fn order(&self, bond: usize) -> BondOrder {
        self.mol.bonds[bond].order
    }

    /// an unwritten SMARTS bond: single or aromatic
    fn plain(&self, bond: usize) -> bool {
        matches!(self.order(bond), BondOrder::Single | BondOrder::Aromatic)
    }

    /// `-;!@`
    fn chain_single(&self, bond: usize) -> bool {
        self.order(bond) == BondOrder::Single && !self.ring_bonds[bond]
    }

    /// `-;@`
    fn ring_single(&self, bond: usize) -> bool {
        self.order(bond) == BondOrder::Single && self.ring_bonds[bond]
    }

    fn aromatic_bond(&self, bond: usize) -> bool {
        self.order(bond) == BondOrder::Aromatic
    }

    /// `[#a,#b,...]`
    fn any_of(&self, atom: usize, elements: &[u8]) -> bool {
        elements.contains(&self.mol.atoms[atom].element)
    }

    /// `[A,B,...]`
    fn aliphatic(&self, atom: usize, elements: &[u8]) -> bool {
        !self.mol.atoms[atom].aromatic && self.any_of(atom, elements)
    }

    /// `[a,b,...]`
    fn aromatic(&self, atom: usize, elements: &[u8]) -> bool {
        self.mol.atoms[atom].aromatic && self.any_of(atom, elements)
    }

    /// `=O`
    fn carbonyl(&self, atom: usize, bond: usize) -> bool {
        self.order(bond) == BondOrder::Double && self.aliphatic(atom, &[OXYGEN])
    }

    fn has<P>(&self, atom: usize, p: P) -> bool
    where
        P: Fn(usize, usize) -> bool,
    {
        self.mol.neighbors(atom).iter().any(|&(n, b)| p(n, b))
    }

    fn count<P>(&self, atom: usize, p: P) -> usize
    where
        P: Fn(usize, usize) -> bool,
    {
        self.mol.neighbors(atom).iter().filter(|&&(n, b)| p(n, b)).count()
    }

    /// two different neighbors of `atom`, one matching `p` and the other `q`
    fn pair<P, Q>(&self, atom: usize, p: P, q: Q) -> bool
    where
        P: Fn(usize, usize) -> bool,
        Q: Fn(usize, usize) -> bool,
    {
        let around = self.mol.neighbors(atom);
        around.iter().any(|&(n1, b1)| {
            p(n1, b1) && around.iter().any(|&(n2, b2)| n2 != n1 && q(n2, b2))
        })
    }

    fn matches(&self, env: Env, a: usize) -> bool {
        let atom = &self.mol.atoms[a];
        let degree = self.mol.degree(a);
        let is = |element| atom.element == element && !atom.aromatic;
        let is_aromatic = |element| atom.element == element && atom.aromatic;
        let in_ring = self.ring_atoms[a];
        let any_double =
            self.has(a, |_, b| self.order(b) == BondOrder::Double);
        match env {
            // [C;D3]([#0,#6,#7,#8])(=O)
            L1 => {
                is(CARBON)
                    && degree == 3
                    && self.has(a, |n, b| self.carbonyl(n, b))
                    && self.has(a, |n, b| {
                        self.plain(b)
                            && self.any_of(n, &[DUMMY, CARBON, NITROGEN, OXYGEN])
                    })
            }
            // [O;D2]-;!@[#0,#6,#1]
            L3 => {
                is(OXYGEN)
                    && degree == 2
                    && self.has(a, |n, b| {
                        self.chain_single(b)
                            && self.any_of(n, &[DUMMY, CARBON, HYDROGEN])
                    })
            }
            // [C;!D1;!$(C=*)]-;!@[#6]
            L4 => {
                is(CARBON)
                    && degree != 1
                    && !any_double
                    && self.has(a, |n, b| {
                        self.chain_single(b) && self.any_of(n, &[CARBON])
                    })
            }
            // [N;!D1;!$(N=*);!$(N-[!#6;!#16;!#0;!#1]);!$([N;R]@[C;R]=O)]
            L5 => {
                let hetero = self.has(a, |n, b| {
                    self.order(b) == BondOrder::Single
                        && !self.any_of(n, &[CARBON, SULFUR, DUMMY, HYDROGEN])
                });
                let lactam = in_ring
                    && self.has(a, |n, b| {
                        self.ring_bonds[b]
                            && self.ring_atoms[n]
                            && self.aliphatic(n, &[CARBON])
                            && self.has(n, |o, ob| self.carbonyl(o, ob))
                    });
                is(NITROGEN) && degree != 1 && !any_double && !hetero && !lactam
            }
            // [C;D3;!R](=O)-;!@[#0,#6,#7,#8]
            L6 => {
                is(CARBON)
                    && degree == 3
                    && !in_ring
                    && self.has(a, |n, b| self.carbonyl(n, b))
                    && self.has(a, |n, b| {
                        self.chain_single(b)
                            && self.any_of(n, &[DUMMY, CARBON, NITROGEN, OXYGEN])
                    })
            }
            // [C;D2,D3]-[#6]
            L7a | L7b => {
                is(CARBON)
                    && (degree == 2 || degree == 3)
                    && self.has(a, |n, b| {
                        self.order(b) == BondOrder::Single
                            && self.any_of(n, &[CARBON])
                    })
            }
            // [C;!R;!D1;!$(C!-*)]
            L8 => {
                is(CARBON)
                    && !in_ring
                    && degree != 1
                    && !self.has(a, |_, b| self.order(b) != BondOrder::Single)
            }
            // [n;+0;$(n(:[c,n,o,s]):[c,n,o,s])]
            L9 => {
                let ring_neighbor = |n, b| {
                    self.aromatic_bond(b)
                        && self.aromatic(n, &[CARBON, NITROGEN, OXYGEN, SULFUR])
                };
                is_aromatic(NITROGEN)
                    && atom.charge == 0
                    && self.pair(a, ring_neighbor, ring_neighbor)
            }
            // [N;R;$(N(@C(=O))@[C,N,O,S])]
            L10 => {
                is(NITROGEN)
                    && in_ring
                    && self.pair(
                        a,
                        |n, b| {
                            self.ring_bonds[b]
                                && self.aliphatic(n, &[CARBON])
                                && self.has(n, |o, ob| self.carbonyl(o, ob))
                        },
                        |n, b| {
                            self.ring_bonds[b]
                                && self.aliphatic(
                                    n,
                                    &[CARBON, NITROGEN, OXYGEN, SULFUR],
                                )
                        },
                    )
            }
            // [S;D2](-;!@[#0,#6])
            L11 => {
                is(SULFUR)
                    && degree == 2
                    && self.has(a, |n, b| {
                        self.chain_single(b) && self.any_of(n, &[DUMMY, CARBON])
                    })
            }
            // [S;D4]([#6,#0])(=O)(=O)
            L12 => {
                is(SULFUR)
                    && degree == 4
                    && self.has(a, |n, b| {
                        self.plain(b) && self.any_of(n, &[CARBON, DUMMY])
                    })
                    && self.count(a, |n, b| self.carbonyl(n, b)) >= 2
            }
            // [C;$(C(-;@[C,N,O,S])-;@[N,O,S])]
            L13 => {
                is(CARBON)
                    && self.pair(
                        a,
                        |n, b| {
                            self.ring_single(b)
                                && self.aliphatic(
                                    n,
                                    &[CARBON, NITROGEN, OXYGEN, SULFUR],
                                )
                        },
                        |n, b| {
                            self.ring_single(b)
                                && self.aliphatic(n, &[NITROGEN, OXYGEN, SULFUR])
                        },
                    )
            }
            // [c;$(c(:[c,n,o,s]):[n,o,s])]
            L14 => {
                is_aromatic(CARBON)
                    && self.pair(
                        a,
                        |n, b| {
                            self.aromatic_bond(b)
                                && self.aromatic(
                                    n,
                                    &[CARBON, NITROGEN, OXYGEN, SULFUR],
                                )
                        },
                        |n, b| {
                            self.aromatic_bond(b)
                                && self.aromatic(n, &[NITROGEN, OXYGEN, SULFUR])
                        },
                    )
            }
            // [C;$(C(-;@C)-;@C)]
            L15 => {
                let ring_carbon =
                    |n, b| self.ring_single(b) && self.aliphatic(n, &[CARBON]);
                is(CARBON) && self.pair(a, ring_carbon, ring_carbon)
            }
            // [c;$(c(:c):c)]
            L16 => {
                let ring_carbon =
                    |n, b| self.aromatic_bond(b) && self.aromatic(n, &[CARBON]);
                is_aromatic(CARBON) && self.pair(a, ring_carbon, ring_carbon)
            }
        }
    }

    /// the labels to put on `bond`'s first and second atom for each way
    /// `rule` matches it
    fn apply(&self, rule: &Rule, bond: usize) -> Vec<(u16, u16)> {
        let &(first, second, order) = rule;
        let Bond { atom1, atom2, .. } = self.mol.bonds[bond];
        let mut ret = Vec::new();
        if self.ring_bonds[bond] || self.order(bond) != order {
            return ret;
        }
        if self.matches(first, atom1) && self.matches(second, atom2) {
            ret.push((first.label(), second.label()));
        }
        if self.matches(first, atom2) && self.matches(second, atom1) {
            ret.push((second.label(), first.label()));
        }
        ret
    }

    /// every distinct cut the rules in `rules` allow
    fn breaks<'r>(&self, rules: impl Iterator<Item = &'r Rule>) -> Vec<BricsBond> {
        let mut ret = Vec::new();
        for rule in rules {
            for bond in 0..self.mol.bonds.len() {
                for labels in self.apply(rule, bond) {
                    let brics = BricsBond { bond, labels };
                    if !ret.contains(&brics) {
                        ret.push(brics);
                    }
                }
            }
        }
        ret
    }
}

/// A bond BRICS would break, with the labels its two placeholders get
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BricsBond {
    pub bond: usize,
    pub labels: (u16, u16),
}

/// every cut some rule allows on `mol` as it is, sorted by bond. a bond
/// matching several rules, or one rule both ways round, appears once per
/// distinct pair of labels
pub fn find_bonds(mol: &Molecule) -> Vec<BricsBond> {
    let ctx = Context::new(mol);
    let mut ret = ctx.breaks(RULES.iter().flat_map(|group| group.iter()));
    ret.sort_by_key(|b| b.bond);
    ret
}

/// replace `bond` with a placeholder on each end, bonded with the same
/// order, and return the piece on each side of it. anything not connected
/// to the bond is left behind
fn cut(mol: &Molecule, brics: &BricsBond) -> [Molecule; 2] {
    let Bond {
        atom1,
        atom2,
        order,
        ..
    } = mol.bonds[brics.bond];
    let mut atoms = mol.atoms.clone();
    let mut bonds: Vec<Bond> = mol
        .bonds
        .iter()
        .enumerate()
        .filter(|&(b, _)| b != brics.bond)
        .map(|(_, bond)| bond.clone())
        .collect();
    let mut origin: Vec<usize> = (0..mol.len()).collect();
    for (atom, label) in [(atom1, brics.labels.0), (atom2, brics.labels.1)] {
        atoms.push(Atom::placeholder(label));
        bonds.push(Bond::new(atom, atoms.len() - 1, order));
        origin.push(atom);
    }
    let (p1, p2) = (mol.len(), mol.len() + 1);
    let mut broken = Molecule::new(atoms, bonds);
    // each end now sees its placeholder where the other end was
    broken.carry_stereo(mol, &origin, |center, n| {
        if (center, n) == (atom1, atom2) {
            Some(p1)
        } else if (center, n) == (atom2, atom1) {
            Some(p2)
        } else {
            Some(n)
        }
    });
    [
        broken.submolecule(&broken.component_of(atom1)),
        broken.submolecule(&broken.component_of(atom2)),
    ]
}

/// break every BRICS bond in `mol` and return the canonical SMILES of the
/// pieces, placeholders included. a molecule with nothing to break comes back
/// whole
pub fn fragments(mol: &Molecule) -> BTreeSet<String> {
    let whole = mol.to_smiles();
    if log::log_enabled!(log::Level::Trace) {
        let bonds = find_bonds(mol);
        log::trace!("{whole}: {} BRICS bonds {bonds:?}", bonds.len());
    }
    let mut seen = BTreeSet::from([whole.clone()]);
    let mut pool = VecDeque::from([(whole, mol.clone())]);
    let mut cuts = 0;
    for group in RULES {
        let mut unmatched = VecDeque::new();
        while let Some((smiles, cur)) = pool.pop_front() {
            let found = Context::new(&cur).breaks(group.iter());
            if found.is_empty() {
                unmatched.push_back((smiles, cur));
                continue;
            }
            for brics in &found {
                cuts += 1;
                for piece in cut(&cur, brics) {
                    let key = piece.to_smiles();
                    if seen.insert(key.clone()) {
                        pool.push_back((key, piece));
                    }
                }
            }
        }
        pool = unmatched;
    }
    log::trace!("made {cuts} cuts, {} leaves", pool.len());
    pool.into_iter().map(|(smiles, _)| smiles).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frags(s: &str) -> BTreeSet<String> {
        fragments(&Molecule::from_smiles(s).unwrap())
    }

    fn canon(want: &[&str]) -> BTreeSet<String> {
        want.iter()
            .map(|s| Molecule::from_smiles(s).unwrap().to_smiles())
            .collect()
    }

    #[test]
    fn aspirin() {
        let got = frags("CC(=O)Oc1ccccc1C(=O)O");
        let want = canon(&[
            "[1*]C(C)=O",
            "[3*]O[3*]",
            "[16*]c1ccccc1[16*]",
            "[6*]C(=O)O",
        ]);
        assert_eq!(got, want);
    }

    #[test]
    fn ether_ketone() {
        let got = frags("CCCOCCC(=O)c1ccccc1");
        let want = canon(&[
            "[16*]c1ccccc1",
            "[3*]O[3*]",
            "[4*]CCC",
            "[4*]CCC([6*])=O",
        ]);
        assert_eq!(got, want);
    }

    #[test]
    fn nothing_to_break() {
        assert_eq!(frags("CCO"), canon(&["CCO"]));
        assert_eq!(frags("c1ccccc1"), canon(&["c1ccccc1"]));
        assert_eq!(frags("C1CCCCC1"), canon(&["C1CCCCC1"]));
        assert!(find_bonds(&Molecule::from_smiles("CCO").unwrap()).is_empty());
    }

    #[test]
    fn biphenyl() {
        let mol = Molecule::from_smiles("c1ccccc1-c1ccccc1").unwrap();
        let bonds = find_bonds(&mol);
        assert_eq!(bonds.len(), 1);
        assert_eq!(bonds[0].labels, (16, 16));
        assert_eq!(fragments(&mol), canon(&["[16*]c1ccccc1"]));
    }

    #[test]
    fn amide() {
        // the amide C-N bond is 1-5, the N-aryl bond 5-16
        let got = frags("CC(=O)Nc1ccccc1");
        let want = canon(&["[1*]C(C)=O", "[5*]N[5*]", "[16*]c1ccccc1"]);
        assert_eq!(got, want);
    }

    #[test]
    fn ring_bonds_survive() {
        // every bond of a lactam is in the ring, and the N is not L5
        let got = frags("O=C1CCCN1");
        assert_eq!(got, canon(&["O=C1CCCN1"]));
    }

    #[test]
    fn alternative_labels() {
        // the ring carbon is both L4 and L15 to the ether oxygen
        let mol = Molecule::from_smiles("COC1(C)CCCCC1").unwrap();
        let bonds = find_bonds(&mol);
        assert_eq!(bonds.len(), 2);
        assert_eq!(bonds[0].bond, bonds[1].bond);
        let got = fragments(&mol);
        let want = canon(&["[3*]OC", "[4*]C1(C)CCCCC1", "[15*]C1(C)CCCCC1"]);
        assert_eq!(got, want);
    }

    #[test]
    fn counter_ions_dropped() {
        let got = frags("COC(C)=O.[Na+]");
        assert_eq!(got, canon(&["[1*]C(C)=O", "[3*]OC"]));
        // unless nothing is broken
        assert_eq!(frags("CCO.[Na+]"), canon(&["CCO.[Na+]"]));
    }

    #[test]
    fn cut_keeps_stereo() {
        // a fluorine on the far end keeps the double bond out of L7
        let mol = Molecule::from_smiles("F/C=C/COC").unwrap();
        let want = canon(&["[4*]C/C=C/F", "[3*]OC"]);
        assert_eq!(fragments(&mol), want);
        assert_ne!(fragments(&mol), canon(&["[4*]C/C=C\\F", "[3*]OC"]));
    }

    #[test]
    fn double_bond_placeholder() {
        let mol = Molecule::from_smiles("CC(C)=C(C)C").unwrap();
        let bonds = find_bonds(&mol);
        assert_eq!(bonds.len(), 1);
        assert_eq!(bonds[0].labels, (7, 7));
        assert_eq!(fragments(&mol), canon(&["[7*]=C(C)C"]));
    }
}
