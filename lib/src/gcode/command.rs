//! Motion command rendering and length prediction.
//!
//! A [`Command`] is a keyword plus an ordered list of [`Term`]s. The same term
//! list is either rendered to text ([`Command::to_gcode`]) or measured
//! ([`Command::rendered_len`]). Terms live inline in the command, so building
//! and measuring one never allocates. The two always agree because each
//! term's characters come from one [`FixedDecimal`].

use crate::config::MAX_PRECISION;
use crate::CoordF;
use std::fmt;

/// Most terms a command can carry (X Y Z I J E F, plus one spare).
pub const MAX_TERMS: usize = 8;

/// A number rounded to a fixed number of decimals.
///
/// Rounds half away from zero. A minus sign is printed only when the rounded
/// magnitude is non-zero, so `-0.0001` at 3 decimals renders as `0.000`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedDecimal {
    negative: bool,
    scaled: u64,
    precision: u8,
}

impl FixedDecimal {
    /// Round `value` to `precision` decimals (at most [`MAX_PRECISION`]).
    pub fn new(value: CoordF, precision: u8) -> Self {
        let precision = precision.min(MAX_PRECISION);
        let factor = 10u64.pow(precision as u32) as CoordF;
        // `as` saturates, and maps NaN to 0
        let scaled = (value.abs() * factor).round() as u64;
        Self {
            negative: value < 0.0 && scaled != 0,
            scaled,
            precision,
        }
    }

    #[inline]
    fn factor(&self) -> u64 {
        10u64.pow(self.precision as u32)
    }

    /// Whether a minus sign is printed.
    #[inline]
    pub fn is_negative(&self) -> bool {
        self.negative
    }

    /// Number of characters the value renders to.
    pub fn rendered_len(&self) -> usize {
        let sign = usize::from(self.negative);
        let integer = digit_count(self.scaled / self.factor());
        let fraction = if self.precision > 0 {
            1 + self.precision as usize
        } else {
            0
        };
        sign + integer + fraction
    }
}

impl fmt::Display for FixedDecimal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.negative {
            f.write_str("-")?;
        }
        let factor = self.factor();
        write!(f, "{}", self.scaled / factor)?;
        if self.precision > 0 {
            write!(
                f,
                ".{:0width$}",
                self.scaled % factor,
                width = self.precision as usize
            )?;
        }
        Ok(())
    }
}

/// Number of decimal digits in `n` (1 for zero).
#[inline]
fn digit_count(n: u64) -> usize {
    n.checked_ilog10().map_or(1, |d| d as usize + 1)
}

/// One parameter of a command, e.g. `X12.500`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Term {
    /// Parameter letter.
    pub letter: char,
    /// Rounded value.
    pub value: FixedDecimal,
}

impl Term {
    /// Placeholder for unused slots.
    const EMPTY: Term = Term {
        letter: ' ',
        value: FixedDecimal {
            negative: false,
            scaled: 0,
            precision: 0,
        },
    };

    /// Create a term from a raw value.
    pub fn new(letter: char, value: CoordF, precision: u8) -> Self {
        Self {
            letter,
            value: FixedDecimal::new(value, precision),
        }
    }

    /// Characters added to the command: separator, letter and value.
    #[inline]
    pub fn rendered_len(&self) -> usize {
        1 + self.letter.len_utf8() + self.value.rendered_len()
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.letter, self.value)
    }
}

/// A motion command: keyword followed by space-separated terms.
///
/// Holds up to [`MAX_TERMS`] terms inline. Slots past `len` always hold
/// the same placeholder, so the derived equality compares only real terms.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Command {
    keyword: &'static str,
    terms: [Term; MAX_TERMS],
    len: usize,
}

impl Command {
    /// Create a command with no terms.
    pub fn new(keyword: &'static str) -> Self {
        Self {
            keyword,
            terms: [Term::EMPTY; MAX_TERMS],
            len: 0,
        }
    }

    /// Append a term. Terms past [`MAX_TERMS`] are dropped.
    pub fn push(&mut self, letter: char, value: CoordF, precision: u8) {
        debug_assert!(self.len < MAX_TERMS, "too many terms for {}", self.keyword);
        if let Some(slot) = self.terms.get_mut(self.len) {
            *slot = Term::new(letter, value, precision);
            self.len += 1;
        }
    }

    /// Append a term only when `condition` holds.
    pub fn push_if(&mut self, condition: bool, letter: char, value: CoordF, precision: u8) {
        if condition {
            self.push(letter, value, precision);
        }
    }

    /// Command keyword, e.g. `G2`.
    pub fn keyword(&self) -> &'static str {
        self.keyword
    }

    /// Terms in emission order.
    pub fn terms(&self) -> &[Term] {
        &self.terms[..self.len]
    }

    /// Find a term by letter.
    pub fn term(&self, letter: char) -> Option<&Term> {
        self.terms().iter().find(|t| t.letter == letter)
    }

    /// Exact length of [`Command::to_gcode`] without building it.
    pub fn rendered_len(&self) -> usize {
        self.keyword.len() + self.terms().iter().map(Term::rendered_len).sum::<usize>()
    }

    /// Render the command text.
    pub fn to_gcode(&self) -> String {
        let mut gcode = String::with_capacity(self.rendered_len());
        // Writing to a String cannot fail
        let _ = fmt::write(&mut gcode, format_args!("{}", self));
        gcode
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.keyword)?;
        for term in self.terms() {
            write!(f, " {}", term)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render(value: f64, precision: u8) -> (String, usize) {
        let d = FixedDecimal::new(value, precision);
        (d.to_string(), d.rendered_len())
    }

    #[test]
    fn test_fixed_decimal_rendering() {
        assert_eq!(render(12.5, 3).0, "12.500");
        assert_eq!(render(-3.14159, 2).0, "-3.14");
        assert_eq!(render(0.0, 3).0, "0.000");
        assert_eq!(render(1200.4, 0).0, "1200");
        assert_eq!(render(0.00125, 5).0, "0.00125");
        assert_eq!(render(9.9996, 3).0, "10.000");
    }

    #[test]
    fn test_fixed_decimal_negative_zero() {
        assert_eq!(render(-0.0001, 3).0, "0.000");
        assert_eq!(render(-0.0, 3).0, "0.000");
        assert_eq!(render(-0.0006, 3).0, "-0.001");
        assert!(!FixedDecimal::new(-0.0001, 3).is_negative());
    }

    #[test]
    fn test_fixed_decimal_length_matches_rendering() {
        let values = [
            0.0, -0.0, 0.4, -0.4, 0.5, -0.5, 9.9994, 9.9996, -9.9996, 99.99951, 100.0, -100.0,
            123456.789, -0.00049, 1e-9, 7.0,
        ];
        for &v in &values {
            for precision in 0..=MAX_PRECISION {
                let (text, len) = render(v, precision);
                assert_eq!(text.len(), len, "value {} precision {}", v, precision);
            }
        }
    }

    #[test]
    fn test_precision_clamped() {
        let d = FixedDecimal::new(1.0, 12);
        assert_eq!(d.to_string(), "1.000000");
    }

    #[test]
    fn test_command_rendering() {
        let mut cmd = Command::new("G3");
        cmd.push('X', 10.0, 3);
        cmd.push('Y', -2.5, 3);
        cmd.push_if(false, 'Z', 1.0, 3);
        cmd.push('I', 5.0, 3);
        cmd.push('J', 0.0, 3);
        cmd.push_if(true, 'E', 0.12345, 5);
        cmd.push_if(true, 'F', 1200.0, 0);

        let gcode = cmd.to_gcode();
        assert_eq!(gcode, "G3 X10.000 Y-2.500 I5.000 J0.000 E0.12345 F1200");
        assert_eq!(cmd.rendered_len(), gcode.len());
        assert_eq!(cmd.term('E').unwrap().to_string(), "E0.12345");
        assert!(cmd.term('Z').is_none());
        assert_eq!(cmd.keyword(), "G3");
        assert_eq!(cmd.terms().len(), 6);
    }

    #[test]
    fn test_empty_command() {
        let cmd = Command::new("G5");
        assert_eq!(cmd.to_gcode(), "G5");
        assert_eq!(cmd.rendered_len(), 2);
    }

    #[test]
    fn test_full_command_equality() {
        let mut a = Command::new("G2");
        let mut b = Command::new("G2");
        for (i, letter) in "XYZIJEF".chars().enumerate() {
            a.push(letter, i as f64, 3);
            b.push(letter, i as f64, 3);
        }
        assert_eq!(a, b);
        assert_eq!(a.terms().len(), 7);
        assert_eq!(a.rendered_len(), a.to_gcode().len());

        b.push_if(false, 'Q', 1.0, 3);
        assert_eq!(a, b);
    }

    #[test]
    fn test_digit_count() {
        assert_eq!(digit_count(0), 1);
        assert_eq!(digit_count(9), 1);
        assert_eq!(digit_count(10), 2);
        assert_eq!(digit_count(u64::MAX), 20);
    }
}
