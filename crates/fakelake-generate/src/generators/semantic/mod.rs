//! pt_BR flavoured attribute values for the dimension tables.

use chrono::{Months, NaiveDate};
use fake::Fake;
use fake::faker::address::pt_br::CityName;
use fake::faker::name::pt_br::Name;
use rand::{Rng, RngCore};

pub fn person_name(rng: &mut dyn RngCore) -> String {
    Name().fake_with_rng(rng)
}

pub fn city(rng: &mut dyn RngCore) -> String {
    CityName().fake_with_rng(rng)
}

pub fn state_code(rng: &mut dyn RngCore) -> &'static str {
    STATES[rng.random_range(0..STATES.len())]
}

/// Eleven-digit CPF with valid check digits, unformatted.
pub fn cpf(rng: &mut dyn RngCore) -> String {
    let mut digits = [0_u8; 11];
    for digit in digits.iter_mut().take(9) {
        *digit = rng.random_range(0..=9);
    }
    digits[9] = cpf_check_digit(&digits[..9]);
    digits[10] = cpf_check_digit(&digits[..10]);
    digits.iter().map(|d| char::from(b'0' + *d)).collect()
}

/// Uniform date in `[start, end]`, both inclusive. Returns `start` when the
/// window is inverted.
pub fn date_between(start: NaiveDate, end: NaiveDate, rng: &mut dyn RngCore) -> NaiveDate {
    let span = (end - start).num_days();
    if span <= 0 {
        return start;
    }
    start + chrono::Duration::days(rng.random_range(0..=span))
}

/// `reference` shifted back by whole years, clamped for Feb 29.
pub fn years_before(reference: NaiveDate, years: u32) -> NaiveDate {
    reference
        .checked_sub_months(Months::new(years * 12))
        .unwrap_or(reference)
}

/// Money amount in cents drawn uniformly from `[min, max]` and rounded to
/// two decimals.
pub fn money_cents(min: f64, max: f64, rng: &mut dyn RngCore) -> i64 {
    let value = rng.random_range(min..=max);
    (value * 100.0).round() as i64
}

pub fn pick<'a>(values: &'a [&'a str], rng: &mut dyn RngCore) -> &'a str {
    values[rng.random_range(0..values.len())]
}

fn cpf_check_digit(digits: &[u8]) -> u8 {
    let mut sum = 0_u32;
    let mut weight = digits.len() as u32 + 1;
    for digit in digits {
        sum += (*digit as u32) * weight;
        weight = weight.saturating_sub(1);
    }
    let remainder = sum % 11;
    if remainder < 2 {
        0
    } else {
        (11 - remainder) as u8
    }
}

pub const STATES: &[&str] = &[
    "AC", "AL", "AP", "AM", "BA", "CE", "DF", "ES", "GO", "MA", "MT", "MS", "MG", "PA", "PB", "PR",
    "PE", "PI", "RJ", "RN", "RS", "RO", "RR", "SC", "SP", "SE", "TO",
];
