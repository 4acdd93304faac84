use std::{iter::Peekable, str::CharIndices};

use crate::{
    error::SmilesError,
    molecule::{atomic_number, BondOrder, Chirality, DUMMY},
};

/// the contents of a `[...]` atom. atom classes are read but not kept, and
/// so are chirality classes other than tetrahedral
#[derive(Clone, Debug, PartialEq)]
pub(super) struct BracketAtom {
    pub(super) isotope: Option<u16>,
    pub(super) element: u8,
    pub(super) aromatic: bool,
    pub(super) chirality: Option<Chirality>,
    pub(super) hydrogens: u8,
    pub(super) charge: i8,
}

/// a `/` or `\` single bond
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(super) enum Direction {
    Up,
    Down,
}

#[derive(Clone, Debug, PartialEq)]
pub(super) enum Token {
    // punctuation
    LParen,
    RParen,
    Dot,
    // atoms
    Atom { element: u8, aromatic: bool },
    Bracket(BracketAtom),
    // bonds
    Bond(BondOrder),
    Directional(Direction),
    RingDigit(u16),
    // end
    End,
}

impl Token {
    /// Returns `true` if the token is [`End`].
    ///
    /// [`End`]: Token::End
    #[must_use]
    pub(super) fn is_end(&self) -> bool {
        matches!(self, Self::End)
    }
}

type Chars<'a> = Peekable<CharIndices<'a>>;

fn get_digits(chars: &mut Chars<'_>) -> String {
    let mut digits = String::new();
    while let Some(&(_, c)) = chars.peek().filter(|(_, c)| c.is_ascii_digit()) {
        digits.push(c);
        chars.next();
    }
    digits
}

fn number<T: std::str::FromStr>(
    chars: &mut Chars<'_>,
    pos: usize,
) -> Result<Option<T>, SmilesError> {
    let digits = get_digits(chars);
    if digits.is_empty() {
        return Ok(None);
    }
    digits
        .parse()
        .map(Some)
        .map_err(|_| SmilesError::UnexpectedChar { ch: '0', pos })
}

/// read an element symbol inside brackets. lowercase symbols are aromatic
fn bracket_symbol(
    chars: &mut Chars<'_>,
    s: &str,
) -> Result<(u8, bool), SmilesError> {
    let Some((pos, first)) = chars.next() else {
        return Err(SmilesError::UnexpectedEnd {
            context: "bracket atom",
        });
    };
    if first == '*' {
        return Ok((DUMMY, false));
    }
    if first.is_ascii_lowercase() {
        // two-letter aromatic symbols first
        let two = s.get(pos..pos + 2);
        if let Some(sym @ ("se" | "as" | "te")) = two {
            chars.next();
            let element = capitalize(sym);
            return atomic_number(&element)
                .map(|e| (e, true))
                .ok_or(SmilesError::UnknownElement { symbol: element, pos });
        }
        let element = capitalize(&first.to_string());
        return match first {
            'b' | 'c' | 'n' | 'o' | 'p' | 's' => atomic_number(&element)
                .map(|e| (e, true))
                .ok_or(SmilesError::UnknownElement { symbol: element, pos }),
            _ => Err(SmilesError::UnknownElement {
                symbol: first.to_string(),
                pos,
            }),
        };
    }
    if !first.is_ascii_uppercase() {
        return Err(SmilesError::UnexpectedChar { ch: first, pos });
    }
    let mut symbol = first.to_string();
    if let Some(&(_, c)) = chars.peek() {
        if c.is_ascii_lowercase() {
            let candidate = format!("{first}{c}");
            if atomic_number(&candidate).is_some() {
                chars.next();
                symbol = candidate;
            }
        }
    }
    atomic_number(&symbol)
        .map(|e| (e, false))
        .ok_or(SmilesError::UnknownElement { symbol, pos })
}

fn capitalize(s: &str) -> String {
    let mut c = s.chars();
    match c.next() {
        Some(f) => f.to_ascii_uppercase().to_string() + c.as_str(),
        None => String::new(),
    }
}

fn bracket(chars: &mut Chars<'_>, s: &str) -> Result<BracketAtom, SmilesError> {
    let start = chars.peek().map_or(s.len(), |&(p, _)| p);
    let isotope = number(chars, start)?;
    let (element, aromatic) = bracket_symbol(chars, s)?;
    let mut hydrogens = 0;
    let mut charge = 0i8;
    let mut chirality = None;
    loop {
        let Some((pos, c)) = chars.next() else {
            return Err(SmilesError::UnexpectedEnd {
                context: "bracket atom",
            });
        };
        match c {
            '@' => {
                let mut end = pos + 1;
                chirality = Some(Chirality::Anticlockwise);
                if chars.peek().is_some_and(|&(_, c)| c == '@') {
                    chars.next();
                    end += 1;
                    chirality = Some(Chirality::Clockwise);
                }
                // @TH1, @AL2, @SP3, @TB10, @OH22
                let tag = s.get(end..end + 2);
                if let Some(tag @ ("TH" | "AL" | "SP" | "TB" | "OH")) = tag {
                    chars.next();
                    chars.next();
                    chirality = match (tag, get_digits(chars).as_str()) {
                        ("TH", "1") => Some(Chirality::Anticlockwise),
                        ("TH", "2") => Some(Chirality::Clockwise),
                        _ => None,
                    };
                }
            }
            'H' => hydrogens = number(chars, pos)?.unwrap_or(1),
            '+' | '-' => {
                let sign = if c == '+' { 1 } else { -1 };
                let mut n = 1;
                while chars.peek().is_some_and(|&(_, d)| d == c) {
                    chars.next();
                    n += 1;
                }
                if let Some(m) = number::<i8>(chars, pos)? {
                    n = m;
                }
                charge = sign * n;
            }
            ':' => {
                // atom class, only meaningful to reaction tools
                if get_digits(chars).is_empty() {
                    return Err(SmilesError::UnexpectedChar { ch: c, pos });
                }
            }
            ']' => break,
            _ => return Err(SmilesError::UnexpectedChar { ch: c, pos }),
        }
    }
    Ok(BracketAtom {
        isotope,
        element,
        aromatic,
        chirality,
        hydrogens,
        charge,
    })
}

/// split `s` into tokens, each paired with its byte offset in `s`
pub(super) fn scan(s: &str) -> Result<Vec<(Token, usize)>, SmilesError> {
    use Token as T;
    let mut chars = s.char_indices().peekable();
    let mut ret = Vec::new();
    while let Some((pos, c)) = chars.next() {
        let got = match c {
            '(' => T::LParen,
            ')' => T::RParen,
            '.' => T::Dot,
            '[' => T::Bracket(bracket(&mut chars, s)?),
            '-' => T::Bond(BondOrder::Single),
            '/' => T::Directional(Direction::Up),
            '\\' => T::Directional(Direction::Down),
            '=' => T::Bond(BondOrder::Double),
            '#' => T::Bond(BondOrder::Triple),
            '$' => T::Bond(BondOrder::Quadruple),
            ':' => T::Bond(BondOrder::Aromatic),
            '0'..='9' => T::RingDigit(c as u16 - '0' as u16),
            '%' => {
                // exactly two digits follow, %123 is ring 12 then ring 3
                let mut n = 0;
                for _ in 0..2 {
                    match chars.next() {
                        Some((_, d)) if d.is_ascii_digit() => {
                            n = n * 10 + (d as u16 - '0' as u16);
                        }
                        _ => {
                            return Err(SmilesError::UnexpectedChar {
                                ch: c,
                                pos,
                            })
                        }
                    }
                }
                T::RingDigit(n)
            }
            '*' => T::Atom {
                element: DUMMY,
                aromatic: false,
            },
            'B' | 'C' => {
                let second = if c == 'B' { 'r' } else { 'l' };
                let symbol = if chars.peek().is_some_and(|&(_, n)| n == second)
                {
                    chars.next();
                    format!("{c}{second}")
                } else {
                    c.to_string()
                };
                organic(&symbol, false, pos)?
            }
            'N' | 'O' | 'P' | 'S' | 'F' | 'I' => {
                organic(&c.to_string(), false, pos)?
            }
            'b' | 'c' | 'n' | 'o' | 'p' | 's' => {
                organic(&capitalize(&c.to_string()), true, pos)?
            }
            _ => return Err(SmilesError::UnexpectedChar { ch: c, pos }),
        };
        ret.push((got, pos));
    }
    ret.push((T::End, s.len()));
    Ok(ret)
}

fn organic(symbol: &str, aromatic: bool, pos: usize) -> Result<Token, SmilesError> {
    let element = atomic_number(symbol).ok_or(SmilesError::UnknownElement {
        symbol: symbol.to_owned(),
        pos,
    })?;
    Ok(Token::Atom { element, aromatic })
}
