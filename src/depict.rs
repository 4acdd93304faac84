//! 2D depiction of fragments as an SVG grid. Coordinates come from a
//! breadth-first placement that is then relaxed with springs on bonds,
//! 1-3 distances and ring chords, plus a short range repulsion between
//! everything else

use std::{
    collections::{BTreeMap, VecDeque},
    f32::consts::{PI, TAU},
    fmt::{self, Display},
};

use glam::Vec2;

use crate::{
    aromaticity::small_rings,
    error::Result,
    molecule::{BondOrder, Molecule, CARBON},
    Error,
};

/// the number of fragments drawn side by side
pub const PER_ROW: usize = 4;

const CELL: f32 = 200.0;
const LEGEND: f32 = 20.0;
const PADDING: f32 = 20.0;
/// longest a bond is allowed to be drawn, in pixels
const MAX_BOND: f32 = 30.0;
const STEPS: usize = 500;

/// Draws a grid of molecules
pub trait Depictor {
    /// an SVG with one cell per fragment, `per_row` across, each labelled
    /// with the matching entry of `legends`
    fn grid_svg(
        &self,
        fragments: &[&str],
        legends: &[String],
        per_row: usize,
    ) -> Result<String>;
}

/// [Depictor] computing its own coordinates
#[derive(Clone, Copy, Debug, Default)]
pub struct Svg;

impl Depictor for Svg {
    fn grid_svg(
        &self,
        fragments: &[&str],
        legends: &[String],
        per_row: usize,
    ) -> Result<String> {
        let cells = fragments
            .iter()
            .enumerate()
            .map(|(i, smiles)| {
                let mol = Molecule::from_smiles(smiles)
                    .map_err(|e| Error::invalid(smiles, e))?;
                let coords = layout(&mol);
                Ok(Cell {
                    mol,
                    coords,
                    legend: legends.get(i).cloned().unwrap_or_default(),
                })
            })
            .collect::<Result<Vec<_>>>()?;
        let grid = Grid {
            cells,
            per_row: per_row.max(1),
        };
        Ok(grid.to_string())
    }
}

fn pair(a: usize, b: usize) -> (usize, usize) {
    (a.min(b), a.max(b))
}

/// place each component breadth-first, continuing every bond at an angle from
/// the one before it, and lay the components out left to right
fn initial(mol: &Molecule) -> Vec<Vec2> {
    let mut pos = vec![Vec2::ZERO; mol.len()];
    let mut placed = vec![false; mol.len()];
    let mut left = 0.0;
    for component in mol.components() {
        let root = component[0];
        placed[root] = true;
        pos[root] = Vec2::new(left, 0.0);
        // (atom, direction it was reached from, zig or zag)
        let mut queue = VecDeque::from([(root, None, false)]);
        while let Some((atom, dir, flip)) = queue.pop_front() {
            let children: Vec<usize> = mol
                .neighbors(atom)
                .iter()
                .map(|&(n, _)| n)
                .filter(|&n| !placed[n])
                .collect();
            let c = children.len();
            for (i, &child) in children.iter().enumerate() {
                let step = match dir {
                    None => Vec2::from_angle(TAU * i as f32 / c as f32),
                    Some(d) => {
                        let angle = if c == 1 {
                            if flip {
                                PI / 3.0
                            } else {
                                -PI / 3.0
                            }
                        } else {
                            let spread = 4.0 * PI / 3.0 / c as f32;
                            (i as f32 - (c - 1) as f32 / 2.0) * spread
                        };
                        Vec2::from_angle(angle).rotate(d)
                    }
                };
                placed[child] = true;
                pos[child] = pos[atom] + step;
                queue.push_back((child, Some(step), !flip));
            }
        }
        let right = component
            .iter()
            .map(|&a| pos[a].x)
            .fold(left, f32::max);
        left = right + 2.0;
    }
    pos
}

/// target distances between pairs of atoms as (length, stiffness)
fn springs(mol: &Molecule, rings: &[Vec<usize>]) -> BTreeMap<(usize, usize), (f32, f32)> {
    let mut ret = BTreeMap::new();
    for a in 0..mol.len() {
        let around = mol.neighbors(a);
        let order = |o| around.iter().filter(|&&(_, b)| mol.bonds[b].order == o).count();
        let linear = order(BondOrder::Triple) > 0 || order(BondOrder::Double) > 1;
        let length = match around.len() {
            _ if linear => 2.0,
            4.. => 2f32.sqrt(),
            _ => 3f32.sqrt(),
        };
        for (i, &(n1, _)) in around.iter().enumerate() {
            for &(n2, _) in &around[i + 1..] {
                ret.insert(pair(n1, n2), (length, 0.5));
            }
        }
    }
    // regular polygons for rings
    for ring in rings {
        let k = ring.len();
        for i in 0..k {
            for j in i + 1..k {
                let d = (j - i).min(k - (j - i)) as f32;
                let chord = (PI * d / k as f32).sin() / (PI / k as f32).sin();
                ret.insert(pair(ring[i], ring[j]), (chord, 1.0));
            }
        }
    }
    for bond in &mol.bonds {
        ret.insert(pair(bond.atom1, bond.atom2), (1.0, 1.0));
    }
    ret
}

/// 2D coordinates for `mol` in bond-length units
pub fn layout(mol: &Molecule) -> Vec<Vec2> {
    let mut pos = initial(mol);
    let rings = small_rings(mol, &mol.ring_bonds());
    let springs = springs(mol, &rings);
    let n = mol.len();
    for _ in 0..STEPS {
        let mut force = vec![Vec2::ZERO; n];
        for i in 0..n {
            for j in i + 1..n {
                let delta = pos[j] - pos[i];
                // pull apart atoms sitting on top of each other
                let dir = delta
                    .try_normalize()
                    .unwrap_or_else(|| Vec2::from_angle(i as f32 + j as f32));
                let dist = delta.length().max(1e-3);
                let f = match springs.get(&(i, j)) {
                    Some(&(length, k)) => k * (dist - length),
                    None if dist < 2.5 => -0.2 / (dist * dist),
                    None => continue,
                };
                force[i] += dir * f;
                force[j] -= dir * f;
            }
        }
        for (p, f) in pos.iter_mut().zip(&force) {
            *p += (*f * 0.1).clamp_length_max(0.3);
        }
    }
    pos
}

struct Cell {
    mol: Molecule,
    coords: Vec<Vec2>,
    legend: String,
}

struct Grid {
    cells: Vec<Cell>,
    per_row: usize,
}

fn color(element: u8) -> &'static str {
    match element {
        7 => "#0000FF",
        8 => "#FF0000",
        9 | 17 => "#33CCCC",
        15 => "#FF7F00",
        16 => "#CCCC00",
        35 => "#7F4C19",
        _ => "#000000",
    }
}

/// atoms other than plain carbon get a text label, with their hydrogens
fn label(mol: &Molecule, atom: usize) -> Option<String> {
    let a = &mol.atoms[atom];
    if a.element == CARBON && a.charge == 0 && a.isotope.is_none() && mol.degree(atom) > 0 {
        return None;
    }
    let mut ret = String::new();
    if let Some(isotope) = a.isotope {
        ret.push_str(&isotope.to_string());
    }
    ret.push_str(a.symbol());
    match mol.total_hydrogens(atom) {
        0 => {}
        1 => ret.push('H'),
        h => ret.push_str(&format!("H{h}")),
    }
    match a.charge {
        0 => {}
        1 => ret.push('+'),
        -1 => ret.push('-'),
        c if c > 0 => ret.push_str(&format!("{c}+")),
        c => ret.push_str(&format!("{}-", -(c as i16))),
    }
    Some(ret)
}

fn line(f: &mut fmt::Formatter<'_>, a: Vec2, b: Vec2, dashed: bool) -> fmt::Result {
    let dash = if dashed { ";stroke-dasharray:4,3" } else { "" };
    writeln!(
        f,
        "<path d='M {:.1},{:.1} L {:.1},{:.1}' style='fill:none;stroke:#000000;stroke-width:2px;stroke-linecap:butt{dash}' />",
        a.x, a.y, b.x, b.y
    )
}

impl Cell {
    /// map layout coordinates into the cell whose top left corner is `origin`
    fn project(&self, origin: Vec2) -> Vec<Vec2> {
        let min = self.coords.iter().copied().fold(Vec2::INFINITY, Vec2::min);
        let max = self
            .coords
            .iter()
            .copied()
            .fold(Vec2::NEG_INFINITY, Vec2::max);
        if self.coords.is_empty() {
            return Vec::new();
        }
        let extent = (max - min).max(Vec2::splat(1e-3));
        let room = Vec2::new(CELL - 2.0 * PADDING, CELL - LEGEND - 2.0 * PADDING);
        let scale = (room / extent).min_element().min(MAX_BOND);
        let center = origin + Vec2::new(CELL / 2.0, (CELL - LEGEND) / 2.0);
        let mid = (min + max) / 2.0;
        self.coords
            .iter()
            // flip y so the drawing isn't mirrored
            .map(|&p| center + (p - mid) * Vec2::new(scale, -scale))
            .collect()
    }

    fn render(&self, f: &mut fmt::Formatter<'_>, origin: Vec2) -> fmt::Result {
        let pos = self.project(origin);
        let rings = small_rings(&self.mol, &self.mol.ring_bonds());
        for bond in &self.mol.bonds {
            let (a, b) = (pos[bond.atom1], pos[bond.atom2]);
            let normal = (b - a).perp().normalize_or_zero();
            match bond.order {
                BondOrder::Single => line(f, a, b, false)?,
                BondOrder::Double => {
                    line(f, a + normal * 2.5, b + normal * 2.5, false)?;
                    line(f, a - normal * 2.5, b - normal * 2.5, false)?;
                }
                BondOrder::Triple | BondOrder::Quadruple => {
                    line(f, a, b, false)?;
                    line(f, a + normal * 4.0, b + normal * 4.0, false)?;
                    line(f, a - normal * 4.0, b - normal * 4.0, false)?;
                }
                BondOrder::Aromatic => {
                    line(f, a, b, false)?;
                    // dashes on the inside of the ring
                    let inside = rings
                        .iter()
                        .find(|r| r.contains(&bond.atom1) && r.contains(&bond.atom2))
                        .map(|r| {
                            let c = r.iter().map(|&i| pos[i]).sum::<Vec2>() / r.len() as f32;
                            if (c - a).dot(normal) < 0.0 {
                                -normal
                            } else {
                                normal
                            }
                        })
                        .unwrap_or(normal);
                    let shrink = (b - a) * 0.15;
                    line(f, a + shrink + inside * 5.0, b - shrink + inside * 5.0, true)?;
                }
            }
        }
        for (atom, p) in pos.iter().enumerate() {
            let Some(text) = label(&self.mol, atom) else {
                continue;
            };
            let fill = color(self.mol.atoms[atom].element);
            writeln!(
                f,
                "<circle cx='{:.1}' cy='{:.1}' r='8' style='fill:#FFFFFF;stroke:none' />",
                p.x, p.y
            )?;
            writeln!(
                f,
                "<text x='{:.1}' y='{:.1}' text-anchor='middle' dominant-baseline='central' style='font-size:14px;font-family:sans-serif;fill:{fill}'>{text}</text>",
                p.x, p.y
            )?;
        }
        writeln!(
            f,
            "<text x='{:.1}' y='{:.1}' text-anchor='middle' style='font-size:12px;font-family:sans-serif;fill:#000000'>{}</text>",
            origin.x + CELL / 2.0,
            origin.y + CELL - LEGEND / 2.0,
            self.legend
        )
    }
}

impl Display for Grid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rows = self.cells.len().div_ceil(self.per_row);
        let cols = self.cells.len().min(self.per_row);
        let (width, height) = (cols as f32 * CELL, rows as f32 * CELL);
        writeln!(f, "<?xml version='1.0' encoding='iso-8859-1'?>")?;
        writeln!(
            f,
            "<svg version='1.1' baseProfile='full' xmlns='http://www.w3.org/2000/svg' width='{width}px' height='{height}px' viewBox='0 0 {width} {height}'>"
        )?;
        writeln!(
            f,
            "<rect style='opacity:1.0;fill:#FFFFFF;stroke:none' width='{width}' height='{height}' x='0' y='0'> </rect>"
        )?;
        for (i, cell) in self.cells.iter().enumerate() {
            let origin = Vec2::new(
                (i % self.per_row) as f32 * CELL,
                (i / self.per_row) as f32 * CELL,
            );
            cell.render(f, origin)?;
        }
        writeln!(f, "</svg>")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mol(s: &str) -> Molecule {
        Molecule::from_smiles(s).unwrap()
    }

    #[test]
    fn bonds_come_out_even() {
        for s in ["c1ccccc1", "CCCCO", "CC(C)(C)C", "C1CCCC1"] {
            let mol = mol(s);
            let pos = layout(&mol);
            for bond in &mol.bonds {
                let d = pos[bond.atom1].distance(pos[bond.atom2]);
                assert!((d - 1.0).abs() < 0.15, "{s}: bond length {d}");
            }
        }
    }

    #[test]
    fn hexagon() {
        let mol = mol("c1ccccc1");
        let pos = layout(&mol);
        let center = pos.iter().sum::<Vec2>() / 6.0;
        for p in &pos {
            assert!((p.distance(center) - 1.0).abs() < 0.1);
        }
    }

    #[test]
    fn labels() {
        let mol = mol("CC(=O)[NH3+]");
        assert_eq!(label(&mol, 0), None);
        assert_eq!(label(&mol, 2).as_deref(), Some("O"));
        assert_eq!(label(&mol, 3).as_deref(), Some("NH3+"));
        assert_eq!(label(&self::mol("C"), 0).as_deref(), Some("CH4"));
    }

    #[test]
    fn grid() {
        let frags = ["c1ccccc1", "CCO", "O=C(O)c1ccccc1", "C1CCNCC1", "Cl"];
        let legends: Vec<String> = (1..=5).map(|i| i.to_string()).collect();
        let svg = Svg.grid_svg(&frags, &legends, PER_ROW).unwrap();
        assert!(svg.starts_with("<?xml"));
        assert!(svg.contains("width='800px' height='400px'"));
        assert!(svg.trim_end().ends_with("</svg>"));
        assert_eq!(svg.matches(">5</text>").count(), 1);
        assert!(svg.contains(">Cl"));
    }

    #[test]
    fn empty_grid() {
        let svg = Svg.grid_svg(&[], &[], PER_ROW).unwrap();
        assert!(svg.contains("width='0px' height='0px'"));
    }

    #[test]
    fn bad_fragment() {
        let got = Svg.grid_svg(&["C1CC"], &[String::new()], PER_ROW);
        assert!(matches!(got, Err(Error::InvalidMoleculeDescriptor { .. })));
    }
}
