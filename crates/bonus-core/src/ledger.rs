// Number ledger: ordered, one-decimal entries for a single session.

use std::str::FromStr;

use rust_decimal::{Decimal, RoundingStrategy};
use thiserror::Error;

/// Number of fractional digits every stored value carries.
pub const DECIMAL_PLACES: u32 = 1;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    #[error("index {index} is out of range for a ledger of {len} entries")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("total no longer fits at one decimal place")]
    Overflow,
}

// ---------------------------------------------------------------------------
// Normalization and parsing
// ---------------------------------------------------------------------------

/// Round to one decimal place (half away from zero) and pin the scale so the
/// value always displays with exactly one fractional digit (`2` -> `2.0`).
///
/// Used for every value entering the ledger and for every total shown to the
/// user, so what is stored and what is displayed never disagree.
pub fn normalize(value: Decimal) -> Decimal {
    let mut rounded =
        value.round_dp_with_strategy(DECIMAL_PLACES, RoundingStrategy::MidpointAwayFromZero);
    rounded.rescale(DECIMAL_PLACES);
    if rounded.is_zero() {
        rounded.set_sign_positive(true);
    }
    rounded
}

/// [`normalize`], but `None` when the value is too large to carry a
/// fractional digit. Near Decimal's 28-digit limit `rescale` leaves the
/// scale untouched, which would display `…9` instead of `…9.0`.
pub fn normalize_checked(value: Decimal) -> Option<Decimal> {
    let rounded = normalize(value);
    (rounded.scale() == DECIMAL_PLACES).then_some(rounded)
}

/// Parse user text as a decimal number and normalize it.
///
/// Accepts an optional sign followed by digits with an optional fractional
/// part (`"3"`, `"-1.5"`, `"+.5"`, `"2."`). Anything else, including the
/// empty string, exponents and digit separators, yields `None`. So do
/// values too large to keep one decimal place.
pub fn parse_amount(text: &str) -> Option<Decimal> {
    let text = text.trim();
    let (negative, unsigned) = match text.as_bytes().first().copied()? {
        b'-' => (true, &text[1..]),
        b'+' => (false, &text[1..]),
        _ => (false, text),
    };

    let (int_part, frac_part) = match unsigned.split_once('.') {
        Some((i, f)) => (i, f),
        None => (unsigned, ""),
    };

    let all_digits = |s: &str| s.bytes().all(|b| b.is_ascii_digit());
    if int_part.is_empty() && frac_part.is_empty() {
        return None;
    }
    if !all_digits(int_part) || !all_digits(frac_part) {
        return None;
    }

    let canonical = format!(
        "{}{}.{}",
        if negative { "-" } else { "" },
        if int_part.is_empty() { "0" } else { int_part },
        if frac_part.is_empty() { "0" } else { frac_part },
    );

    // Values beyond Decimal's 28-digit precision are treated as malformed.
    Decimal::from_str(&canonical).ok().and_then(normalize_checked)
}

// ---------------------------------------------------------------------------
// Ledger
// ---------------------------------------------------------------------------

/// Ordered list of normalized entries. Order is insertion order; removals
/// shift later entries down by one.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Ledger {
    entries: Vec<Decimal>,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a value at the end and return the stored (normalized) value.
    ///
    /// Fails with [`LedgerError::Overflow`] and leaves the ledger unchanged
    /// if the new total could not be represented.
    pub fn append(&mut self, value: Decimal) -> Result<Decimal, LedgerError> {
        let stored = normalize_checked(value).ok_or(LedgerError::Overflow)?;
        self.entries.push(stored);
        if let Err(e) = self.sum() {
            self.entries.pop();
            return Err(e);
        }
        Ok(stored)
    }

    /// Replace the entry at `index` in place. Returns the stored value.
    ///
    /// Same overflow rule as [`Ledger::append`].
    pub fn update(&mut self, index: usize, value: Decimal) -> Result<Decimal, LedgerError> {
        let len = self.entries.len();
        let stored = normalize_checked(value).ok_or(LedgerError::Overflow)?;
        let slot = self
            .entries
            .get_mut(index)
            .ok_or(LedgerError::IndexOutOfRange { index, len })?;
        let previous = std::mem::replace(slot, stored);
        if let Err(e) = self.sum() {
            self.entries[index] = previous;
            return Err(e);
        }
        Ok(stored)
    }

    /// Remove and return the entry at `index`.
    pub fn remove_at(&mut self, index: usize) -> Result<Decimal, LedgerError> {
        if index >= self.entries.len() {
            return Err(LedgerError::IndexOutOfRange {
                index,
                len: self.entries.len(),
            });
        }
        Ok(self.entries.remove(index))
    }

    /// Entry at `index`, if any.
    pub fn get(&self, index: usize) -> Option<Decimal> {
        self.entries.get(index).copied()
    }

    /// Sum of all entries, reported at one decimal.
    pub fn sum(&self) -> Result<Decimal, LedgerError> {
        self.entries
            .iter()
            .try_fold(Decimal::ZERO, |acc, v| acc.checked_add(*v))
            .and_then(normalize_checked)
            .ok_or(LedgerError::Overflow)
    }

    pub fn count(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Snapshot of the entries in order.
    pub fn entries(&self) -> Vec<Decimal> {
        self.entries.clone()
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn normalize_rounds_half_away_from_zero() {
        assert_eq!(normalize(d("1.05")).to_string(), "1.1");
        assert_eq!(normalize(d("0.15")).to_string(), "0.2");
        assert_eq!(normalize(d("-1.05")).to_string(), "-1.1");
        assert_eq!(normalize(d("1.04")).to_string(), "1.0");
    }

    #[test]
    fn normalize_pads_integers_to_one_decimal() {
        assert_eq!(normalize(d("2")).to_string(), "2.0");
        assert_eq!(normalize(Decimal::ZERO).to_string(), "0.0");
    }

    #[test]
    fn parse_amount_accepts_plain_decimals() {
        assert_eq!(parse_amount("1.05").unwrap().to_string(), "1.1");
        assert_eq!(parse_amount("2").unwrap().to_string(), "2.0");
        assert_eq!(parse_amount("-3.25").unwrap().to_string(), "-3.3");
        assert_eq!(parse_amount("+4").unwrap().to_string(), "4.0");
        assert_eq!(parse_amount(".5").unwrap().to_string(), "0.5");
        assert_eq!(parse_amount("7.").unwrap().to_string(), "7.0");
        assert_eq!(parse_amount("  1.5  ").unwrap().to_string(), "1.5");
    }

    #[test]
    fn parse_amount_rejects_non_numbers() {
        for bad in ["", " ", "-", "+", ".", "abc", "1.2.3", "1e3", "1_000", "１", "1,5", "--1", "NaN"] {
            assert!(parse_amount(bad).is_none(), "expected {bad:?} to be rejected");
        }
    }

    #[test]
    fn parse_amount_rejects_overflowing_input() {
        assert!(parse_amount("999999999999999999999999999999999").is_none());
    }

    #[test]
    fn append_preserves_insertion_order() {
        let mut ledger = Ledger::new();
        assert_eq!(ledger.append(d("1")).unwrap().to_string(), "1.0");
        ledger.append(d("2.5")).unwrap();
        ledger.append(d("0.25")).unwrap();
        let shown: Vec<String> = ledger.entries().iter().map(|v| v.to_string()).collect();
        assert_eq!(shown, vec!["1.0", "2.5", "0.3"]);
        assert_eq!(ledger.count(), 3);
    }

    #[test]
    fn update_replaces_in_place() {
        let mut ledger = Ledger::new();
        ledger.append(d("1.0")).unwrap();
        ledger.append(d("2.5")).unwrap();
        assert_eq!(ledger.update(0, d("9")).unwrap().to_string(), "9.0");
        assert_eq!(ledger.entries(), vec![d("9.0"), d("2.5")]);
    }

    #[test]
    fn remove_shifts_later_entries() {
        let mut ledger = Ledger::new();
        for v in ["1.0", "2.0", "3.0"] {
            ledger.append(d(v)).unwrap();
        }
        assert_eq!(ledger.remove_at(1).unwrap(), d("2.0"));
        assert_eq!(ledger.entries(), vec![d("1.0"), d("3.0")]);
        assert_eq!(ledger.get(1), Some(d("3.0")));
    }

    #[test]
    fn out_of_range_never_mutates() {
        let mut ledger = Ledger::new();
        ledger.append(d("1.0")).unwrap();
        let before = ledger.clone();

        assert_eq!(
            ledger.update(1, d("5")),
            Err(LedgerError::IndexOutOfRange { index: 1, len: 1 })
        );
        assert_eq!(
            ledger.remove_at(7),
            Err(LedgerError::IndexOutOfRange { index: 7, len: 1 })
        );
        assert_eq!(ledger, before);
    }

    #[test]
    fn sum_reports_one_decimal() {
        let mut ledger = Ledger::new();
        assert_eq!(ledger.sum().unwrap().to_string(), "0.0");
        ledger.append(d("1.0")).unwrap();
        ledger.append(d("2.5")).unwrap();
        assert_eq!(ledger.sum().unwrap().to_string(), "3.5");
    }

    #[test]
    fn parse_amount_rejects_values_that_cannot_keep_a_decimal() {
        // 28 digits: parses as a Decimal but has no room for `.0`.
        assert!(parse_amount("9999999999999999999999999999").is_none());
        assert!(parse_amount("9000000000000000000000000000").is_none());
        let big = parse_amount("999999999999999999999999999").unwrap();
        assert_eq!(big.scale(), DECIMAL_PLACES);
        assert_eq!(big.to_string(), "999999999999999999999999999.0");
    }

    #[test]
    fn append_refuses_entry_that_would_overflow_total() {
        let big = parse_amount("999999999999999999999999999").unwrap();
        let mut ledger = Ledger::new();
        let mut accepted = 0;
        while ledger.append(big).is_ok() {
            accepted += 1;
            assert!(accepted < 10, "total never overflowed");
        }
        assert_eq!(ledger.count(), accepted);
        assert_eq!(ledger.append(big), Err(LedgerError::Overflow));
        assert_eq!(ledger.sum().unwrap().scale(), DECIMAL_PLACES);
    }

    #[test]
    fn update_refuses_overflow_and_keeps_old_value() {
        let big = parse_amount("999999999999999999999999999").unwrap();
        let mut ledger = Ledger::new();
        ledger.append(d("1.0")).unwrap();
        while ledger.append(big).is_ok() {}
        let before = ledger.clone();

        assert_eq!(ledger.update(0, big), Err(LedgerError::Overflow));
        assert_eq!(ledger, before);
        assert_eq!(ledger.get(0), Some(d("1.0")));
    }
}
