//! Parser for SMILES. Grammar, roughly:
//!
//! smiles -> chain ("." chain)*
//! chain -> atom (ring_bond | branch | bond? atom)*
//! ring_bond -> bond? DIGIT
//! branch -> "(" bond? chain ")"
//!
//! No AST is built. Tokens are turned directly into atoms and bonds, with a
//! stack for open branches and a table for open ring bonds

use std::collections::BTreeMap;

use super::scanner::{Direction, Token};
use crate::{
    error::SmilesError,
    molecule::{Atom, Bond, BondOrder, BondStereo, Chirality, Molecule},
    stereo::odd_permutation,
};

/// a bond whose order may not have been written down. unwritten bonds are
/// single, or aromatic between two aromatic atoms in a ring
struct PendingBond {
    atom1: usize,
    atom2: usize,
    order: Option<BondOrder>,
    /// a `/` or `\` mark and the atom it was written after
    direction: Option<(usize, Direction)>,
}

/// a bond symbol waiting for its second atom, with its offset
#[derive(Clone, Copy)]
struct BondSymbol {
    order: BondOrder,
    direction: Option<Direction>,
    pos: usize,
}

struct OpenRing {
    atom: usize,
    order: Option<BondOrder>,
    direction: Option<Direction>,
    pos: usize,
    /// where the partner goes in the opening atom's neighbor order
    slot: usize,
}

pub(super) struct Parser {
    /// `tokens` represents a single input SMILES string decomposed into a
    /// sequence of tokens with their offsets. We turn this sequence back into
    /// a [Molecule]
    tokens: Vec<(Token, usize)>,
    cur: usize,
    atoms: Vec<Atom>,
    bonds: Vec<PendingBond>,
    /// neighbors of each atom in the order they were written, with `None`
    /// for a bracket hydrogen count. chirality refers to this order
    written: Vec<Vec<Option<usize>>>,
    /// whether each atom was bonded to the atom before it
    has_prev: Vec<bool>,
    /// the atom the next bond starts from, `None` right after a '.'
    prev: Option<usize>,
    bond: Option<BondSymbol>,
    branches: Vec<(usize, usize)>,
    rings: BTreeMap<u16, OpenRing>,
}

impl Parser {
    pub(super) fn new(tokens: Vec<(Token, usize)>) -> Self {
        Self {
            tokens,
            cur: 0,
            atoms: Vec::new(),
            bonds: Vec::new(),
            written: Vec::new(),
            has_prev: Vec::new(),
            prev: None,
            bond: None,
            branches: Vec::new(),
            rings: BTreeMap::new(),
        }
    }

    #[inline]
    fn at_end(&self) -> bool {
        self.peek().is_end()
    }

    fn peek(&self) -> &Token {
        &self.tokens[self.cur].0
    }

    fn advance(&mut self) -> (Token, usize) {
        let ret = self.tokens[self.cur].clone();
        if !self.at_end() {
            self.cur += 1;
        }
        ret
    }

    pub(super) fn parse(mut self) -> Result<Molecule, SmilesError> {
        while !self.at_end() {
            let (token, pos) = self.advance();
            match token {
                Token::Atom { element, aromatic } => {
                    let atom = Atom {
                        aromatic,
                        ..Atom::new(element)
                    };
                    self.atom(atom);
                }
                Token::Bracket(b) => {
                    let atom = Atom {
                        element: b.element,
                        aromatic: b.aromatic,
                        charge: b.charge,
                        isotope: b.isotope,
                        hydrogens: Some(b.hydrogens),
                        chirality: b.chirality,
                    };
                    self.atom(atom);
                }
                Token::Bond(order) => self.bond_symbol(order, None, pos)?,
                Token::Directional(d) => {
                    self.bond_symbol(BondOrder::Single, Some(d), pos)?
                }
                Token::RingDigit(digit) => self.ring_bond(digit, pos)?,
                Token::LParen => {
                    let Some(prev) = self.prev else {
                        return Err(SmilesError::OrphanBranch { pos });
                    };
                    if let Some(b) = self.bond {
                        return Err(SmilesError::DanglingBond { pos: b.pos });
                    }
                    self.branches.push((prev, pos));
                }
                Token::RParen => {
                    if let Some(b) = self.bond {
                        return Err(SmilesError::DanglingBond { pos: b.pos });
                    }
                    let Some((atom, _)) = self.branches.pop() else {
                        return Err(SmilesError::UnmatchedParen { pos });
                    };
                    self.prev = Some(atom);
                }
                Token::Dot => {
                    if let Some(b) = self.bond {
                        return Err(SmilesError::DanglingBond { pos: b.pos });
                    }
                    if let Some(&(_, pos)) = self.branches.last() {
                        return Err(SmilesError::UnclosedBranch { pos });
                    }
                    self.prev = None;
                }
                Token::End => unreachable!("loop stops before End"),
            }
        }
        self.finish()
    }

    fn bond_symbol(
        &mut self,
        order: BondOrder,
        direction: Option<Direction>,
        pos: usize,
    ) -> Result<(), SmilesError> {
        if self.bond.is_some() || self.prev.is_none() {
            return Err(SmilesError::DanglingBond { pos });
        }
        self.bond = Some(BondSymbol {
            order,
            direction,
            pos,
        });
        Ok(())
    }

    fn atom(&mut self, atom: Atom) {
        let index = self.atoms.len();
        let bracket_h = atom.hydrogens.is_some_and(|h| h > 0);
        self.atoms.push(atom);
        self.written.push(Vec::new());
        self.has_prev.push(self.prev.is_some());
        if let Some(prev) = self.prev {
            let symbol = self.bond.take();
            self.bonds.push(PendingBond {
                atom1: prev,
                atom2: index,
                order: symbol.map(|b| b.order),
                direction: symbol.and_then(|b| b.direction).map(|d| (prev, d)),
            });
            self.written[prev].push(Some(index));
            self.written[index].push(Some(prev));
        }
        if bracket_h {
            self.written[index].push(None);
        }
        self.prev = Some(index);
    }

    fn ring_bond(&mut self, digit: u16, pos: usize) -> Result<(), SmilesError> {
        let Some(atom) = self.prev else {
            return Err(SmilesError::DanglingBond { pos });
        };
        let symbol = self.bond.take();
        let order = symbol.map(|b| b.order);
        let direction = symbol.and_then(|b| b.direction);
        let Some(open) = self.rings.remove(&digit) else {
            let slot = self.written[atom].len();
            self.written[atom].push(None);
            let open = OpenRing {
                atom,
                order,
                direction,
                pos,
                slot,
            };
            self.rings.insert(digit, open);
            return Ok(());
        };
        let order = match (open.order, order) {
            (Some(a), Some(b)) if a != b => {
                return Err(SmilesError::RingBondConflict { digit })
            }
            (a, b) => a.or(b),
        };
        let duplicate = self.bonds.iter().any(|b| {
            (b.atom1, b.atom2) == (open.atom, atom)
                || (b.atom2, b.atom1) == (open.atom, atom)
        });
        if open.atom == atom || duplicate {
            return Err(SmilesError::BadRingClosure { digit, pos });
        }
        let direction = open
            .direction
            .map(|d| (open.atom, d))
            .or(direction.map(|d| (atom, d)));
        self.bonds.push(PendingBond {
            atom1: open.atom,
            atom2: atom,
            order,
            direction,
        });
        self.written[open.atom][open.slot] = Some(atom);
        self.written[atom].push(Some(open.atom));
        Ok(())
    }

    /// settle the unwritten bond orders and build the [Molecule]
    fn finish(self) -> Result<Molecule, SmilesError> {
        if let Some(b) = self.bond {
            return Err(SmilesError::DanglingBond { pos: b.pos });
        }
        if let Some(&(_, pos)) = self.branches.last() {
            return Err(SmilesError::UnclosedBranch { pos });
        }
        if let Some((&digit, open)) = self.rings.iter().next() {
            return Err(SmilesError::UnclosedRing {
                digit,
                pos: open.pos,
            });
        }
        let atoms = self.atoms;
        let guess = |b: &PendingBond| {
            let order = b.order.unwrap_or(
                if atoms[b.atom1].aromatic && atoms[b.atom2].aromatic {
                    BondOrder::Aromatic
                } else {
                    BondOrder::Single
                },
            );
            Bond::new(b.atom1, b.atom2, order)
        };
        let bonds: Vec<Bond> = self.bonds.iter().map(guess).collect();
        let mut mol = Molecule::new(atoms, bonds);
        // an unwritten bond joining two aromatic rings, as in biphenyl
        // written c1ccccc1c1ccccc1, is single
        let ring = mol.ring_bonds();
        for (b, pending) in self.bonds.iter().enumerate() {
            if pending.order.is_none()
                && !ring[b]
                && mol.bonds[b].order == BondOrder::Aromatic
            {
                mol.bonds[b].order = BondOrder::Single;
            }
        }
        for b in 0..mol.bonds.len() {
            if mol.bonds[b].order == BondOrder::Double {
                mol.bonds[b].stereo = double_bond_stereo(&mol, &self.bonds, b);
            }
        }
        let written = self.written.into_iter().zip(self.has_prev);
        for (a, (written, has_prev)) in written.enumerate() {
            if let Some(chirality) = mol.atoms[a].chirality {
                mol.atoms[a].chirality =
                    tetrahedral(&mol, a, written, has_prev, chirality);
            }
        }
        Ok(mol)
    }
}

/// the side of `end` that `sub` is on according to the mark on their bond,
/// if it has one
fn marked_up(
    mol: &Molecule,
    pending: &[PendingBond],
    end: usize,
    sub: usize,
) -> Option<bool> {
    let b = mol.bond_between(end, sub)?;
    let (from, d) = pending[b].direction?;
    Some(if from == end {
        d == Direction::Up
    } else {
        d == Direction::Down
    })
}

fn double_bond_stereo(
    mol: &Molecule,
    pending: &[PendingBond],
    bond: usize,
) -> Option<BondStereo> {
    let Bond { atom1, atom2, .. } = mol.bonds[bond];
    let side = |end: usize, other: usize| {
        mol.neighbors(end)
            .iter()
            .filter(|&&(n, _)| n != other)
            .find_map(|&(n, _)| Some((n, marked_up(mol, pending, end, n)?)))
    };
    let (ref1, up1) = side(atom1, atom2)?;
    let (ref2, up2) = side(atom2, atom1)?;
    Some(BondStereo {
        refs: (ref1, ref2),
        cis: up1 == up2,
    })
}

/// re-express `chirality`, given relative to the written neighbor order,
/// relative to [Molecule::stereo_neighbors]. dropped if the atom can't be a
/// tetrahedral center
fn tetrahedral(
    mol: &Molecule,
    atom: usize,
    mut written: Vec<Option<usize>>,
    has_prev: bool,
    chirality: Chirality,
) -> Option<Chirality> {
    if written.len() == 3 && !written.contains(&None) {
        // the lone pair sits where an implicit hydrogen would
        written.insert(has_prev as usize, None);
    }
    let odd = odd_permutation(&written, &mol.stereo_neighbors(atom))?;
    Some(if odd { chirality.flip() } else { chirality })
}
