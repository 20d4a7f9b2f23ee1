//! CLDR plural categories and per-language cardinal rules.
//!
//! Counts are reduced to CLDR operands before a rule runs, so `"1.0"` and
//! `1` can land in different categories (English: `other` vs `one`).

use crate::error::{I18nError, Result};
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

/// A CLDR plural category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PluralCategory {
    Zero,
    One,
    Two,
    Few,
    Many,
    Other,
}

impl PluralCategory {
    pub const ALL: [PluralCategory; 6] = [
        PluralCategory::Zero,
        PluralCategory::One,
        PluralCategory::Two,
        PluralCategory::Few,
        PluralCategory::Many,
        PluralCategory::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PluralCategory::Zero => "zero",
            PluralCategory::One => "one",
            PluralCategory::Two => "two",
            PluralCategory::Few => "few",
            PluralCategory::Many => "many",
            PluralCategory::Other => "other",
        }
    }
}

impl FromStr for PluralCategory {
    type Err = ();

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "zero" => Ok(PluralCategory::Zero),
            "one" => Ok(PluralCategory::One),
            "two" => Ok(PluralCategory::Two),
            "few" => Ok(PluralCategory::Few),
            "many" => Ok(PluralCategory::Many),
            "other" => Ok(PluralCategory::Other),
            _ => Err(()),
        }
    }
}

impl fmt::Display for PluralCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// CLDR plural operands of a number.
///
/// * `n` absolute value
/// * `i` integer digits
/// * `v` number of visible fraction digits (with trailing zeros)
/// * `f` visible fraction digits as an integer (with trailing zeros)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PluralOperands {
    pub n: f64,
    pub i: u64,
    pub v: usize,
    pub f: u64,
}

impl PluralOperands {
    /// Operands from a decimal string such as `"5"`, `"-1"` or `"1.50"`.
    pub fn parse(input: &str) -> Result<PluralOperands> {
        let malformed = || I18nError::MalformedCount {
            value: input.to_string(),
        };

        let trimmed = input.trim();
        let unsigned = trimmed
            .strip_prefix('-')
            .or_else(|| trimmed.strip_prefix('+'))
            .unwrap_or(trimmed);

        let (int_part, frac_part) = match unsigned.split_once('.') {
            Some((int_part, frac_part)) => (int_part, frac_part),
            None => (unsigned, ""),
        };

        let digits_only = |s: &str| s.chars().all(|c| c.is_ascii_digit());
        if int_part.is_empty() || !digits_only(int_part) || !digits_only(frac_part) {
            return Err(malformed());
        }
        if unsigned.contains('.') && frac_part.is_empty() {
            return Err(malformed());
        }

        let n: f64 = unsigned.parse().map_err(|_| malformed())?;
        let i = int_part.parse::<u64>().unwrap_or(u64::MAX);
        let f = if frac_part.is_empty() {
            0
        } else {
            frac_part.parse::<u64>().unwrap_or(u64::MAX)
        };

        Ok(PluralOperands {
            n,
            i,
            v: frac_part.len(),
            f,
        })
    }

    pub fn from_i64(value: i64) -> PluralOperands {
        let i = value.unsigned_abs();
        PluralOperands {
            n: i as f64,
            i,
            v: 0,
            f: 0,
        }
    }

    pub fn from_f64(value: f64) -> Result<PluralOperands> {
        if !value.is_finite() {
            return Err(I18nError::MalformedCount {
                value: value.to_string(),
            });
        }
        PluralOperands::parse(&value.abs().to_string())
    }

    /// `n` as an integer when it has no fraction.
    fn integral(&self) -> Option<u64> {
        if self.f == 0 {
            Some(self.i)
        } else {
            None
        }
    }

    /// `n % m` when `n` is integral; CLDR integer ranges never match fractions.
    fn n_mod(&self, m: u64) -> Option<u64> {
        self.integral().map(|n| n % m)
    }

    fn n_in(&self, lo: u64, hi: u64) -> bool {
        self.integral().is_some_and(|n| (lo..=hi).contains(&n))
    }
}

/// Categories a language distinguishes, `other` always last.
pub fn categories(language: &str) -> &'static [PluralCategory] {
    use PluralCategory::*;
    match rule_family(language) {
        RuleFamily::Invariant => &[Other],
        RuleFamily::OneIntegral
        | RuleFamily::OneExact
        | RuleFamily::ZeroOrOne
        | RuleFamily::Persian => &[One, Other],
        RuleFamily::EastSlavic
        | RuleFamily::Polish
        | RuleFamily::WestSlavic
        | RuleFamily::Lithuanian => &[One, Few, Many, Other],
        RuleFamily::SouthSlavic | RuleFamily::Romanian => &[One, Few, Other],
        RuleFamily::Latvian => &[Zero, One, Other],
        RuleFamily::Hebrew => &[One, Two, Other],
        RuleFamily::Slovenian => &[One, Two, Few, Other],
        RuleFamily::Irish => &[One, Two, Few, Many, Other],
        RuleFamily::Arabic | RuleFamily::Welsh => &[Zero, One, Two, Few, Many, Other],
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RuleFamily {
    Invariant,
    OneIntegral,
    OneExact,
    ZeroOrOne,
    Persian,
    EastSlavic,
    SouthSlavic,
    Polish,
    WestSlavic,
    Lithuanian,
    Latvian,
    Romanian,
    Arabic,
    Hebrew,
    Irish,
    Welsh,
    Slovenian,
}

fn rule_family(language: &str) -> RuleFamily {
    match language {
        "ja" | "zh" | "ko" | "vi" | "th" | "id" | "ms" | "lo" | "my" | "km" | "yue" | "jv" => {
            RuleFamily::Invariant
        }
        "es" | "el" | "hu" | "tr" | "bg" | "az" | "kk" | "uz" | "sq" | "ta" | "te" | "mn"
        | "ne" | "eu" => RuleFamily::OneExact,
        "fr" | "pt" | "hy" | "kab" => RuleFamily::ZeroOrOne,
        "fa" | "hi" | "bn" | "gu" | "kn" | "zu" | "am" => RuleFamily::Persian,
        "ru" | "uk" | "be" => RuleFamily::EastSlavic,
        "sr" | "hr" | "bs" | "sh" => RuleFamily::SouthSlavic,
        "pl" => RuleFamily::Polish,
        "cs" | "sk" => RuleFamily::WestSlavic,
        "lt" => RuleFamily::Lithuanian,
        "lv" => RuleFamily::Latvian,
        "ro" | "mo" => RuleFamily::Romanian,
        "ar" => RuleFamily::Arabic,
        "he" | "iw" => RuleFamily::Hebrew,
        "ga" => RuleFamily::Irish,
        "cy" => RuleFamily::Welsh,
        "sl" => RuleFamily::Slovenian,
        // Germanic default (en, de, nl, sv, da, nb, it, fi, et, ...)
        _ => RuleFamily::OneIntegral,
    }
}

/// Select the plural category of `operands` for a primary language subtag.
///
/// # Example
/// ```
/// use request_i18n::i18n::{plural_category, PluralCategory, PluralOperands};
///
/// let one = PluralOperands::from_i64(1);
/// assert_eq!(plural_category("en", &one), PluralCategory::One);
///
/// let twenty_two = PluralOperands::from_i64(22);
/// assert_eq!(plural_category("ru", &twenty_two), PluralCategory::Few);
/// ```
pub fn plural_category(language: &str, op: &PluralOperands) -> PluralCategory {
    use PluralCategory::*;

    let i = op.i;
    let v = op.v;
    let f = op.f;
    let i10 = i % 10;
    let i100 = i % 100;
    let f10 = f % 10;
    let f100 = f % 100;

    match rule_family(language) {
        RuleFamily::Invariant => Other,

        RuleFamily::OneIntegral => {
            if i == 1 && v == 0 {
                One
            } else {
                Other
            }
        }

        RuleFamily::OneExact => {
            if op.n == 1.0 {
                One
            } else {
                Other
            }
        }

        RuleFamily::ZeroOrOne => {
            if i <= 1 {
                One
            } else {
                Other
            }
        }

        RuleFamily::Persian => {
            if i == 0 || op.n == 1.0 {
                One
            } else {
                Other
            }
        }

        RuleFamily::EastSlavic => {
            if v != 0 {
                Other
            } else if i10 == 1 && i100 != 11 {
                One
            } else if (2..=4).contains(&i10) && !(12..=14).contains(&i100) {
                Few
            } else {
                Many
            }
        }

        RuleFamily::SouthSlavic => {
            if (v == 0 && i10 == 1 && i100 != 11) || (f10 == 1 && f100 != 11) {
                One
            } else if (v == 0 && (2..=4).contains(&i10) && !(12..=14).contains(&i100))
                || ((2..=4).contains(&f10) && !(12..=14).contains(&f100))
            {
                Few
            } else {
                Other
            }
        }

        RuleFamily::Polish => {
            if v != 0 {
                Other
            } else if i == 1 {
                One
            } else if (2..=4).contains(&i10) && !(12..=14).contains(&i100) {
                Few
            } else {
                Many
            }
        }

        RuleFamily::WestSlavic => {
            if v != 0 {
                Many
            } else if i == 1 {
                One
            } else if (2..=4).contains(&i) {
                Few
            } else {
                Other
            }
        }

        RuleFamily::Lithuanian => {
            let n10 = op.n_mod(10);
            let n100 = op.n_mod(100);
            let teen = n100.is_some_and(|n| (11..=19).contains(&n));
            if n10 == Some(1) && !teen {
                One
            } else if n10.is_some_and(|n| (2..=9).contains(&n)) && !teen {
                Few
            } else if f != 0 {
                Many
            } else {
                Other
            }
        }

        RuleFamily::Latvian => {
            let n10 = op.n_mod(10);
            let n100 = op.n_mod(100);
            if n10 == Some(0)
                || n100.is_some_and(|n| (11..=19).contains(&n))
                || (v == 2 && (11..=19).contains(&f100))
            {
                Zero
            } else if (n10 == Some(1) && n100 != Some(11))
                || (v == 2 && f10 == 1 && f100 != 11)
                || (v != 2 && f10 == 1)
            {
                One
            } else {
                Other
            }
        }

        RuleFamily::Romanian => {
            let n100 = op.n_mod(100);
            if i == 1 && v == 0 {
                One
            } else if v != 0
                || op.n == 0.0
                || (op.n != 1.0 && n100.is_some_and(|n| (1..=19).contains(&n)))
            {
                Few
            } else {
                Other
            }
        }

        RuleFamily::Arabic => {
            let n100 = op.n_mod(100);
            if op.n == 0.0 {
                Zero
            } else if op.n == 1.0 {
                One
            } else if op.n == 2.0 {
                Two
            } else if n100.is_some_and(|n| (3..=10).contains(&n)) {
                Few
            } else if n100.is_some_and(|n| (11..=99).contains(&n)) {
                Many
            } else {
                Other
            }
        }

        RuleFamily::Hebrew => {
            if (i == 1 && v == 0) || (i == 0 && v != 0) {
                One
            } else if i == 2 && v == 0 {
                Two
            } else {
                Other
            }
        }

        RuleFamily::Irish => {
            if op.n == 1.0 {
                One
            } else if op.n == 2.0 {
                Two
            } else if op.n_in(3, 6) {
                Few
            } else if op.n_in(7, 10) {
                Many
            } else {
                Other
            }
        }

        RuleFamily::Welsh => {
            if op.n == 0.0 {
                Zero
            } else if op.n == 1.0 {
                One
            } else if op.n == 2.0 {
                Two
            } else if op.n == 3.0 {
                Few
            } else if op.n == 6.0 {
                Many
            } else {
                Other
            }
        }

        RuleFamily::Slovenian => {
            if v == 0 && i100 == 1 {
                One
            } else if v == 0 && i100 == 2 {
                Two
            } else if (v == 0 && (3..=4).contains(&i100)) || v != 0 {
                Few
            } else {
                Other
            }
        }
    }
}
