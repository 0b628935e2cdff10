//! Natural ("alphanumeric") ordering for keys
//!
//! Keys are compared the way a locale-aware collator with numeric collation
//! orders them: runs of digits compare by numeric value, text compares without
//! regard to case or accents, and punctuation sorts before digits, which sort
//! before letters. Keys equal on all of that order unaccented before accented,
//! then lowercase first, and finally by raw bytes, so the order is total.

use std::cmp::Ordering;
use std::iter::Peekable;
use std::str::CharIndices;
use unicode_normalization::UnicodeNormalization;
use unicode_normalization::char::is_combining_mark;

/// Compare two keys in natural order
pub fn sort_alpha_num(a: &str, b: &str) -> Ordering {
    compare_chunks(a, b)
        .then_with(|| compare_accents(a, b))
        .then_with(|| compare_case(a, b))
        .then_with(|| a.cmp(b))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Chunk<'a> {
    Digits(&'a str),
    Text(&'a str),
}

struct Chunks<'a> {
    source: &'a str,
    chars: Peekable<CharIndices<'a>>,
}

impl<'a> Chunks<'a> {
    fn new(source: &'a str) -> Self {
        Self {
            source,
            chars: source.char_indices().peekable(),
        }
    }
}

impl<'a> Iterator for Chunks<'a> {
    type Item = Chunk<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let (start, first) = self.chars.next()?;
        let digits = first.is_ascii_digit();
        let mut end = start + first.len_utf8();
        while let Some(&(idx, c)) = self.chars.peek() {
            if c.is_ascii_digit() != digits {
                break;
            }
            end = idx + c.len_utf8();
            self.chars.next();
        }
        let run = &self.source[start..end];
        Some(if digits {
            Chunk::Digits(run)
        } else {
            Chunk::Text(run)
        })
    }
}

/// Primary ordering class of a character
fn rank(c: char) -> u8 {
    if c.is_whitespace() || c.is_ascii_punctuation() {
        0
    } else if c.is_ascii_digit() {
        1
    } else {
        2
    }
}

fn compare_digits(a: &str, b: &str) -> Ordering {
    let a = a.trim_start_matches('0');
    let b = b.trim_start_matches('0');
    a.len().cmp(&b.len()).then_with(|| a.cmp(b))
}

/// Base letters of `text`, lowercased and stripped of accents
fn fold(text: &str) -> impl Iterator<Item = char> + '_ {
    text.nfd()
        .filter(|c| !is_combining_mark(*c))
        .flat_map(char::to_lowercase)
}

fn compare_text(a: &str, b: &str) -> Ordering {
    let mut a = fold(a);
    let mut b = fold(b);
    loop {
        match (a.next(), b.next()) {
            (None, None) => return Ordering::Equal,
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(x), Some(y)) => {
                let ord = rank(x).cmp(&rank(y)).then_with(|| x.cmp(&y));
                if ord != Ordering::Equal {
                    return ord;
                }
            }
        }
    }
}

/// Combining marks attached to each base character of `text`
fn accents(text: &str) -> Vec<Vec<char>> {
    let mut groups: Vec<Vec<char>> = Vec::new();
    for c in text.nfd() {
        match groups.last_mut() {
            Some(marks) if is_combining_mark(c) => marks.push(c),
            _ => groups.push(Vec::new()),
        }
    }
    groups
}

/// Unaccented before accented at the first character whose marks differ
fn compare_accents(a: &str, b: &str) -> Ordering {
    accents(a).cmp(&accents(b))
}

fn compare_chunks(a: &str, b: &str) -> Ordering {
    let mut a = Chunks::new(a);
    let mut b = Chunks::new(b);
    loop {
        let ord = match (a.next(), b.next()) {
            (None, None) => return Ordering::Equal,
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(Chunk::Digits(x)), Some(Chunk::Digits(y))) => compare_digits(x, y),
            (Some(Chunk::Text(x)), Some(Chunk::Text(y))) => compare_text(x, y),
            // A text run never starts with a digit, so the ranks differ
            (Some(Chunk::Digits(_)), Some(Chunk::Text(y))) => {
                1.cmp(&y.chars().next().map_or(0, rank))
            }
            (Some(Chunk::Text(x)), Some(Chunk::Digits(_))) => {
                x.chars().next().map_or(0, rank).cmp(&1)
            }
        };
        if ord != Ordering::Equal {
            return ord;
        }
    }
}

/// Lowercase before uppercase at the first position differing only in case
fn compare_case(a: &str, b: &str) -> Ordering {
    a.chars()
        .zip(b.chars())
        .find(|(x, y)| x != y)
        .map_or(Ordering::Equal, |(x, y)| {
            match (x.is_lowercase(), y.is_lowercase()) {
                (true, false) => Ordering::Less,
                (false, true) => Ordering::Greater,
                _ => Ordering::Equal,
            }
        })
}
