// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Five-field cron grammar: `minute hour day month day-of-week`.
//!
//! Each field is a comma list of atoms; an atom is `*`, `N`, or `N-M`, any of
//! which may carry a `/step` suffix. Day-of-week runs 0–7 with 7 normalized
//! to Sunday (0). `*/step` counts from the field minimum. A bare `/step` is
//! invalid. Reversed ranges parse but never match.
//!
//! The grammar is implemented here rather than pulled from a crate because
//! the scheduler's dedupe and the SLA tests depend on these exact semantics.

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CronParseError {
    #[error("expected 5 fields, got {0}")]
    WrongFieldCount(usize),

    #[error("empty atom in field {field}")]
    EmptyAtom { field: &'static str },

    #[error("invalid atom {atom:?} in field {field}")]
    InvalidAtom { field: &'static str, atom: String },

    #[error("step must be a positive integer in {atom:?}")]
    InvalidStep { atom: String },

    #[error("value {value} out of range {min}..={max} for field {field}")]
    OutOfRange { field: &'static str, value: u32, min: u32, max: u32 },
}

const FIELD_NAMES: [&str; 5] = ["minute", "hour", "day", "month", "day-of-week"];
const FIELD_BOUNDS: [(u32, u32); 5] = [(0, 59), (0, 23), (1, 31), (1, 12), (0, 7)];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
enum Atom {
    /// `*` or `*/step`: every value from the field minimum, stepped.
    Any { step: u32 },
    Exact(u32),
    /// `N-M` or `N-M/step`. `start > end` never matches.
    Range { start: u32, end: u32, step: u32 },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct Field {
    min: u32,
    atoms: Vec<Atom>,
}

impl Field {
    fn matches(&self, value: u32) -> bool {
        self.atoms.iter().any(|atom| match *atom {
            Atom::Any { step } => value
                .checked_sub(self.min)
                .is_some_and(|offset| offset % step == 0),
            Atom::Exact(n) => n == value,
            Atom::Range { start, end, step } => {
                start <= value && value <= end && (value - start) % step == 0
            }
        })
    }
}

/// A parsed five-field cron expression.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CronExpr {
    fields: [Field; 5],
}

impl CronExpr {
    pub fn parse(expr: &str) -> Result<Self, CronParseError> {
        let raw: Vec<&str> = expr.split_whitespace().collect();
        if raw.len() != 5 {
            return Err(CronParseError::WrongFieldCount(raw.len()));
        }

        let mut fields = Vec::with_capacity(5);
        for (index, text) in raw.iter().enumerate() {
            fields.push(parse_field(text, index)?);
        }
        // Length checked above; the conversion cannot fail.
        match <[Field; 5]>::try_from(fields) {
            Ok(fields) => Ok(Self { fields }),
            Err(_) => Err(CronParseError::WrongFieldCount(raw.len())),
        }
    }

    /// Match against broken-down local time. `weekday` is 0–6 with 0=Sunday;
    /// 7 is accepted and treated as Sunday.
    pub fn matches(&self, minute: u32, hour: u32, day: u32, month: u32, weekday: u32) -> bool {
        let dow = if weekday == 7 { 0 } else { weekday };
        self.fields[0].matches(minute)
            && self.fields[1].matches(hour)
            && self.fields[2].matches(day)
            && self.fields[3].matches(month)
            && self.fields[4].matches(dow)
    }
}

fn parse_field(text: &str, index: usize) -> Result<Field, CronParseError> {
    let name = FIELD_NAMES[index];
    let (min, max) = FIELD_BOUNDS[index];
    let is_dow = index == 4;

    let mut atoms = Vec::new();
    for part in text.split(',') {
        let part = part.trim();
        if part.is_empty() {
            return Err(CronParseError::EmptyAtom { field: name });
        }
        atoms.push(parse_atom(part, name, min, max, is_dow)?);
    }
    Ok(Field { min, atoms })
}

fn parse_atom(
    atom: &str,
    field: &'static str,
    min: u32,
    max: u32,
    is_dow: bool,
) -> Result<Atom, CronParseError> {
    let (base, step) = match atom.split_once('/') {
        Some((base, step_text)) => {
            let step = parse_number(step_text)
                .filter(|s| *s > 0)
                .ok_or_else(|| CronParseError::InvalidStep { atom: atom.to_string() })?;
            (base, step)
        }
        None => (atom, 1),
    };

    if base.is_empty() {
        // A bare "/step" is not part of the grammar.
        return Err(CronParseError::InvalidAtom { field, atom: atom.to_string() });
    }

    if base == "*" {
        return Ok(Atom::Any { step });
    }

    if let Some((start_text, end_text)) = base.split_once('-') {
        let start = parse_bounded(start_text, field, min, max)?;
        let end = parse_bounded(end_text, field, min, max)?;
        let (start, end) = if is_dow {
            (normalize_dow(start), normalize_dow(end))
        } else {
            (start, end)
        };
        return Ok(Atom::Range { start, end, step });
    }

    // Plain value. A step suffix is grammatical but has no effect on a
    // single value, so it is accepted and ignored.
    let value = parse_bounded(base, field, min, max)?;
    let value = if is_dow { normalize_dow(value) } else { value };
    Ok(Atom::Exact(value))
}

fn parse_number(text: &str) -> Option<u32> {
    if text.is_empty() || !text.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    text.parse().ok()
}

fn parse_bounded(
    text: &str,
    field: &'static str,
    min: u32,
    max: u32,
) -> Result<u32, CronParseError> {
    let value = parse_number(text)
        .ok_or_else(|| CronParseError::InvalidAtom { field, atom: text.to_string() })?;
    if value < min || value > max {
        return Err(CronParseError::OutOfRange { field, value, min, max });
    }
    Ok(value)
}

fn normalize_dow(value: u32) -> u32 {
    if value == 7 {
        0
    } else {
        value
    }
}

#[cfg(test)]
#[path = "cron_tests.rs"]
mod tests;
