//! Writing SMILES for a molecule given a ranking of its atoms. The traversal
//! is done in two passes: the first walks the graph depth-first, always taking
//! the lowest-ranked neighbor next, and records which bonds become ring
//! closures. The second pass emits atoms, ring-closure digits and branches in
//! the same order

use std::fmt::Write;

use super::scanner::Direction;
use crate::{
    molecule::{
        Atom, Bond, BondOrder, BondStereo, Chirality, Molecule, BORON, CARBON, DUMMY,
    },
    stereo::{odd_permutation, Stereo},
};

/// Manager of ring-closure digits. The lowest free digit is always handed out
/// first
#[derive(Default)]
struct DigitHeap {
    used: Vec<u16>,
}

impl DigitHeap {
    fn take(&mut self) -> u16 {
        let mut digit = 1;
        while self.used.contains(&digit) {
            digit += 1;
        }
        self.used.push(digit);
        digit
    }

    fn release(&mut self, digit: u16) {
        self.used.retain(|&d| d != digit);
    }
}

/// ring-closure bonds touching an atom. `partner` is the other end
#[derive(Clone, Copy)]
struct Closure {
    bond: usize,
    partner: usize,
}

struct Walk<'a> {
    mol: &'a Molecule,
    ranks: &'a [usize],
    stereo: &'a Stereo,
    /// position of each atom in the traversal, `None` until reached
    preorder: Vec<Option<usize>>,
    parent: Vec<Option<usize>>,
    bond_seen: Vec<bool>,
    children: Vec<Vec<(usize, usize)>>,
    closures: Vec<Vec<Closure>>,
    /// `/` or `\` on tree bonds, read from the end written first
    marks: Vec<Option<Direction>>,
}

impl<'a> Walk<'a> {
    fn new(mol: &'a Molecule, ranks: &'a [usize], stereo: &'a Stereo) -> Self {
        let n = mol.len();
        Self {
            mol,
            ranks,
            stereo,
            preorder: vec![None; n],
            parent: vec![None; n],
            bond_seen: vec![false; mol.bonds.len()],
            children: vec![Vec::new(); n],
            closures: vec![Vec::new(); n],
            marks: vec![None; mol.bonds.len()],
        }
    }

    fn sorted_neighbors(&self, atom: usize) -> Vec<(usize, usize)> {
        let mut ret = self.mol.neighbors(atom).to_vec();
        ret.sort_by_key(|&(n, _)| self.ranks[n]);
        ret
    }

    /// first pass
    fn explore(&mut self, atom: usize, counter: &mut usize) {
        self.preorder[atom] = Some(*counter);
        *counter += 1;
        for (n, b) in self.sorted_neighbors(atom) {
            if self.bond_seen[b] {
                continue;
            }
            self.bond_seen[b] = true;
            if self.preorder[n].is_some() {
                // back edge to an ancestor
                self.closures[n].push(Closure {
                    bond: b,
                    partner: atom,
                });
                self.closures[atom].push(Closure {
                    bond: b,
                    partner: n,
                });
            } else {
                self.children[atom].push((n, b));
                self.parent[n] = Some(atom);
                self.explore(n, counter);
            }
        }
    }

    /// closures sorted by partner rank, the ones closing earlier rings first
    fn sorted_closures(&self, atom: usize) -> Vec<Closure> {
        let mut closures = self.closures[atom].clone();
        closures.sort_by_key(|c| {
            (self.preorder[c.partner] > self.preorder[atom], self.ranks[c.partner])
        });
        closures
    }

    /// the chirality to write on `atom`, relative to the order its neighbors
    /// come out in
    fn chirality(&self, atom: usize) -> Option<Chirality> {
        let center = self.stereo.center(atom)?;
        let stored = self.mol.stereo_neighbors(atom);
        let mut written: Vec<Option<usize>> = self.parent[atom].into_iter().map(Some).collect();
        if stored.first() == Some(&None) {
            written.push(None);
        }
        written.extend(self.sorted_closures(atom).iter().map(|c| Some(c.partner)));
        written.extend(self.children[atom].iter().map(|&(n, _)| Some(n)));
        let odd = odd_permutation(&stored, &written)?;
        Some(if odd { center.flip() } else { center })
    }

    /// whether `bond` is written from `end`
    fn written_from(&self, bond: usize, end: usize) -> bool {
        let Bond { atom1, atom2, .. } = self.mol.bonds[bond];
        let other = if atom1 == end { atom2 } else { atom1 };
        self.preorder[end] < self.preorder[other]
    }

    /// single tree bonds around `end` that can carry a mark, as
    /// `(substituent, bond)` in the order they are written
    fn carriers(&self, end: usize, other: usize) -> Vec<(usize, usize)> {
        let mut ret: Vec<(usize, usize)> = self
            .mol
            .neighbors(end)
            .iter()
            .copied()
            .filter(|&(n, b)| {
                n != other
                    && self.mol.bonds[b].order == BondOrder::Single
                    && (self.parent[n] == Some(end) || self.parent[end] == Some(n))
            })
            .collect();
        ret.sort_by_key(|&(n, _)| self.preorder[n]);
        ret
    }

    /// is `sub` above `end` according to the mark on their bond
    fn marked_up(&self, end: usize, sub: usize, bond: usize) -> Option<bool> {
        let mark = self.marks[bond]?;
        Some((mark == Direction::Up) == self.written_from(bond, end))
    }

    /// choose `/` and `\` for the stereo double bonds, walking them in the
    /// order they are written. a bond shared between two double bonds keeps
    /// the mark the first one gave it
    fn place_marks(&mut self) {
        let mut bonds: Vec<(usize, BondStereo)> = self
            .stereo
            .double_bonds()
            .filter(|&(b, _)| {
                let bond = &self.mol.bonds[b];
                self.preorder[bond.atom1].is_some()
            })
            .collect();
        bonds.sort_by_key(|&(b, _)| {
            let bond = &self.mol.bonds[b];
            self.preorder[bond.atom1].min(self.preorder[bond.atom2])
        });
        for (b, stereo) in bonds {
            let Bond { atom1, atom2, .. } = self.mol.bonds[b];
            let (first, second, ref1, ref2) =
                if self.preorder[atom1] < self.preorder[atom2] {
                    (atom1, atom2, stereo.refs.0, stereo.refs.1)
                } else {
                    (atom2, atom1, stereo.refs.1, stereo.refs.0)
                };
            let carriers1 = self.carriers(first, second);
            let carriers2 = self.carriers(second, first);
            if carriers1.is_empty() || carriers2.is_empty() {
                continue;
            }
            // up-ness of each reference atom implied by marks already placed
            let known = |carriers: &[(usize, usize)], end: usize, r: usize| {
                carriers.iter().find_map(|&(n, bond)| {
                    let up = self.marked_up(end, n, bond)?;
                    Some(if n == r { up } else { !up })
                })
            };
            let up1 = known(&carriers1, first, ref1);
            let up2 = known(&carriers2, second, ref2);
            let (up1, up2) = match (up1, up2) {
                (Some(a), Some(b)) if (a == b) != stereo.cis => continue,
                (Some(a), Some(b)) => (a, b),
                (Some(a), None) => (a, a == stereo.cis),
                (None, Some(b)) => (b == stereo.cis, b),
                (None, None) => {
                    // start with a `/` on the first mark written
                    let (n, bond) = carriers1[0];
                    let up = self.written_from(bond, first);
                    let a = if n == ref1 { up } else { !up };
                    (a, a == stereo.cis)
                }
            };
            for (carriers, end, r, up) in
                [(carriers1, first, ref1, up1), (carriers2, second, ref2, up2)]
            {
                for (n, bond) in carriers {
                    if self.marks[bond].is_some() {
                        continue;
                    }
                    let sub_up = if n == r { up } else { !up };
                    self.marks[bond] = Some(if sub_up == self.written_from(bond, end) {
                        Direction::Up
                    } else {
                        Direction::Down
                    });
                }
            }
        }
    }

    fn bond_symbol(&self, bond: usize) -> &'static str {
        match self.marks[bond] {
            Some(Direction::Up) => "/",
            Some(Direction::Down) => "\\",
            None => bond_symbol(self.mol, bond),
        }
    }

    /// second pass
    fn emit(
        &self,
        atom: usize,
        out: &mut String,
        digits: &mut DigitHeap,
        open: &mut [Option<u16>],
    ) {
        out.push_str(&atom_symbol(self.mol, atom, self.chirality(atom)));

        let closures = self.sorted_closures(atom);
        // close the rings opened by ancestors, then open the ones that close
        // further on. digits freed here can't be reused until the next atom
        let mut released = Vec::new();
        for c in &closures {
            if let Some(digit) = open[c.bond].take() {
                push_digit(out, digit);
                released.push(digit);
            }
        }
        for c in &closures {
            if self.preorder[atom] < self.preorder[c.partner] {
                let digit = digits.take();
                out.push_str(bond_symbol(self.mol, c.bond));
                push_digit(out, digit);
                open[c.bond] = Some(digit);
            }
        }
        for digit in released {
            digits.release(digit);
        }

        let children = &self.children[atom];
        for (i, &(child, bond)) in children.iter().enumerate() {
            let last = i + 1 == children.len();
            if !last {
                out.push('(');
            }
            out.push_str(self.bond_symbol(bond));
            self.emit(child, out, digits, open);
            if !last {
                out.push(')');
            }
        }
    }
}

fn push_digit(out: &mut String, digit: u16) {
    if digit < 10 {
        let _ = write!(out, "{digit}");
    } else {
        let _ = write!(out, "%{digit:02}");
    }
}

fn bond_symbol(mol: &Molecule, bond: usize) -> &'static str {
    let b = &mol.bonds[bond];
    let both_aromatic = mol.atoms[b.atom1].aromatic && mol.atoms[b.atom2].aromatic;
    match b.order {
        BondOrder::Single if both_aromatic => "-",
        BondOrder::Single => "",
        BondOrder::Double => "=",
        BondOrder::Triple => "#",
        BondOrder::Quadruple => "$",
        BondOrder::Aromatic if both_aromatic => "",
        BondOrder::Aromatic => ":",
    }
}

fn organic_subset(atom: &Atom) -> bool {
    if atom.aromatic {
        matches!(atom.element, BORON | CARBON | 7 | 8 | 15 | 16)
    } else {
        matches!(atom.element, BORON | CARBON | 7 | 8 | 9 | 15 | 16 | 17 | 35 | 53)
    }
}

fn element_symbol(atom: &Atom) -> String {
    if atom.aromatic {
        atom.symbol().to_ascii_lowercase()
    } else {
        atom.symbol().to_owned()
    }
}

fn atom_symbol(mol: &Molecule, index: usize, chirality: Option<Chirality>) -> String {
    let atom = &mol.atoms[index];
    let hydrogens = mol.total_hydrogens(index);
    let plain = atom.charge == 0 && atom.isotope.is_none() && chirality.is_none();
    if atom.element == DUMMY && plain && hydrogens == 0 {
        return "*".to_owned();
    }
    // an over-valent atom has no default and keeps its brackets
    if organic_subset(atom) && plain && Some(hydrogens) == mol.default_hydrogens(index) {
        return element_symbol(atom);
    }
    let mut ret = String::from("[");
    if let Some(isotope) = atom.isotope {
        let _ = write!(ret, "{isotope}");
    }
    ret.push_str(&element_symbol(atom));
    if let Some(chirality) = chirality {
        ret.push_str(chirality.symbol());
    }
    match hydrogens {
        0 => {}
        1 => ret.push('H'),
        h => {
            let _ = write!(ret, "H{h}");
        }
    }
    match atom.charge {
        0 => {}
        1 => ret.push('+'),
        -1 => ret.push('-'),
        c if c > 0 => {
            let _ = write!(ret, "+{c}");
        }
        c => {
            let _ = write!(ret, "-{}", -(c as i16));
        }
    }
    ret.push(']');
    ret
}

/// write SMILES for `mol`, starting each connected component from its
/// lowest-ranked atom and breaking every tie by rank. components are sorted
/// so the output doesn't depend on their order in `mol`. only the stereo
/// in `stereo` is written
pub(crate) fn write(mol: &Molecule, ranks: &[usize], stereo: &Stereo) -> String {
    let mut parts: Vec<String> = mol
        .components()
        .into_iter()
        .map(|component| {
            // components are non-empty
            let start = component
                .iter()
                .copied()
                .min_by_key(|&a| ranks[a])
                .unwrap_or(component[0]);
            write_component(mol, ranks, stereo, start)
        })
        .collect();
    parts.sort();
    parts.join(".")
}

fn write_component(
    mol: &Molecule,
    ranks: &[usize],
    stereo: &Stereo,
    start: usize,
) -> String {
    let mut walk = Walk::new(mol, ranks, stereo);
    walk.explore(start, &mut 0);
    walk.place_marks();
    let mut out = String::new();
    let mut digits = DigitHeap::default();
    let mut open = vec![None; mol.bonds.len()];
    walk.emit(start, &mut out, &mut digits, &mut open);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::molecule::OXYGEN;

    #[test]
    fn overvalent_atom_keeps_brackets() {
        let atoms = vec![
            Atom::new(CARBON),
            Atom {
                hydrogens: Some(0),
                ..Atom::new(OXYGEN)
            },
            Atom::new(CARBON),
            Atom::new(CARBON),
        ];
        let bonds = vec![
            Bond::new(0, 1, BondOrder::Single),
            Bond::new(1, 2, BondOrder::Single),
            Bond::new(1, 3, BondOrder::Single),
        ];
        let mol = Molecule::new(atoms, bonds);
        let got = write(&mol, &[0, 1, 2, 3], &Stereo::default());
        assert_eq!(got, "C[O](C)C");
    }

    #[test]
    fn chirality_in_written_order() {
        let mol = Molecule::from_smiles("F[C@H](Cl)Br").unwrap();
        let stereo = Stereo::perceive(&mol, &[0, 1, 2, 3]);
        assert_eq!(write(&mol, &[0, 1, 2, 3], &stereo), "F[C@H](Cl)Br");
        // starting from the carbon puts the hydrogen first
        assert_eq!(write(&mol, &[1, 0, 2, 3], &stereo), "[C@@H](F)(Cl)Br");
        // without perceived stereo the brackets go
        assert_eq!(write(&mol, &[0, 1, 2, 3], &Stereo::default()), "FC(Cl)Br");
    }

    #[test]
    fn first_mark_is_up() {
        let mol = Molecule::from_smiles("F\\C=C\\F").unwrap();
        let stereo = Stereo::perceive(&mol, &[0, 1, 1, 0]);
        assert_eq!(write(&mol, &[0, 1, 2, 3], &stereo), "F/C=C/F");
        let mol = Molecule::from_smiles("F/C=C\\F").unwrap();
        let stereo = Stereo::perceive(&mol, &[0, 1, 1, 0]);
        assert_eq!(write(&mol, &[0, 1, 2, 3], &stereo), "F/C=C\\F");
    }
}
