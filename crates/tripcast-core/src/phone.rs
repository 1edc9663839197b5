// SPDX-FileCopyrightText: 2026 Tripcast Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Phone number normalization to canonical `+<country><subscriber>` form.
//!
//! Rosters arrive with local 10-digit numbers, trunk-prefixed numbers
//! (`0` + 10 digits), numbers that already carry the country code without a
//! plus sign, and fully international numbers. Every send attempt goes
//! through [`normalize_phone`] first; anything it rejects never reaches the
//! gateway.

use thiserror::Error;

/// Shortest international number (country code + subscriber) accepted.
const MIN_INTERNATIONAL_DIGITS: usize = 8;
/// E.164 maximum.
const MAX_INTERNATIONAL_DIGITS: usize = 15;
/// Length of a national subscriber number.
const NATIONAL_DIGITS: usize = 10;

/// Reasons a phone number cannot be normalized.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PhoneError {
    #[error("phone number is empty")]
    Empty,

    #[error("phone number contains invalid character `{0}`")]
    InvalidCharacter(char),

    #[error("phone number has {0} digits, expected a 10-digit national or a full international number")]
    InvalidLength(usize),
}

/// Normalize `raw` to `+<digits>`.
///
/// `default_country_code` is the dialing code (digits only, e.g. `"91"`)
/// applied to national numbers.
pub fn normalize_phone(raw: &str, default_country_code: &str) -> Result<String, PhoneError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(PhoneError::Empty);
    }

    let (international, rest) = if let Some(rest) = trimmed.strip_prefix('+') {
        (true, rest)
    } else if let Some(rest) = trimmed.strip_prefix("00") {
        (true, rest)
    } else {
        (false, trimmed)
    };

    let mut digits = String::with_capacity(rest.len());
    for c in rest.chars() {
        match c {
            '0'..='9' => digits.push(c),
            ' ' | '-' | '(' | ')' | '.' => {}
            other => return Err(PhoneError::InvalidCharacter(other)),
        }
    }

    if digits.is_empty() {
        return Err(PhoneError::Empty);
    }

    if international {
        return international_form(&digits);
    }

    let len = digits.len();
    if len == NATIONAL_DIGITS {
        return Ok(format!("+{default_country_code}{digits}"));
    }
    if len == NATIONAL_DIGITS + 1 && digits.starts_with('0') {
        return Ok(format!("+{default_country_code}{}", &digits[1..]));
    }
    if len == NATIONAL_DIGITS + default_country_code.len()
        && digits.starts_with(default_country_code)
    {
        return Ok(format!("+{digits}"));
    }

    Err(PhoneError::InvalidLength(len))
}

fn international_form(digits: &str) -> Result<String, PhoneError> {
    let len = digits.len();
    if !(MIN_INTERNATIONAL_DIGITS..=MAX_INTERNATIONAL_DIGITS).contains(&len) {
        return Err(PhoneError::InvalidLength(len));
    }
    Ok(format!("+{digits}"))
}

/// Mask all but the last four digits, for log output.
pub fn mask_phone(phone: &str) -> String {
    let chars: Vec<char> = phone.chars().collect();
    let keep = chars.len().min(4);
    let hidden = chars.len() - keep;
    let mut masked = "*".repeat(hidden);
    masked.extend(&chars[hidden..]);
    masked
}
