//! Date-format token grammar and value parsing for the `date` rule.
//!
//! A format string is scanned into tokens (`Y-m-d`, `M d, Y`, ...); a field
//! value is then parsed token by token. A value that matches the pattern but
//! names a calendar-invalid date (February 31) is rejected. Successful parses
//! yield a midnight-UTC timestamp, which comparison rules read later in the
//! same pass.

use chrono::{Datelike, NaiveDate, Utc};
use winnow::ascii::Caseless;
use winnow::combinator::alt;
use winnow::error::ModalResult;
use winnow::prelude::*;
use winnow::token::{any, literal, take_while};

const MONTHS: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

const WEEKDAYS: [&str; 7] = [
    "Sunday",
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday",
];

/// One position in a date format. Format characters follow the widespread
/// PHP `date()` convention; anything unrecognized is a literal separator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum DateToken {
    /// `d`: day, two digits, 01-31.
    Day2,
    /// `j`: day without leading zero, 1-31.
    Day,
    /// `D`: three-letter weekday name.
    WeekdayAbbr,
    /// `l`: full weekday name.
    WeekdayFull,
    /// `N`: ISO weekday number, 1-7.
    WeekdayNum,
    /// `S`: English ordinal suffix (st, nd, rd, th).
    Ordinal,
    /// `w`: weekday number, 0-6.
    WeekdayNum0,
    /// `F`: full month name.
    MonthFull,
    /// `M`: three-letter month name.
    MonthAbbr,
    /// `m`: month, two digits, 01-12.
    Month2,
    /// `n`: month without leading zero, 1-12.
    Month,
    /// `Y`: four-digit year.
    Year4,
    /// `y`: two-digit year, resolved into the 1900s.
    Year2,
    /// `G`: hour 0-23 without leading zero.
    Hour,
    /// `H`: hour 00-23.
    Hour2,
    /// `g`: 12-hour clock hour without leading zero.
    Hour12,
    /// `h`: 12-hour clock hour, two digits.
    Hour12Padded,
    /// `a` / `A`: am or pm.
    Meridiem,
    /// `i`: minutes, 00-59.
    Minute,
    /// `s`: seconds, 00-59.
    Second,
    /// `U`: seconds since the epoch.
    Unix,
    Literal(char),
}

/// A scanned date format, ready to parse values against.
#[derive(Debug, Clone)]
pub(crate) struct DateFormat {
    tokens: Vec<DateToken>,
}

/// Date components extracted while parsing a value. Missing components get
/// defaults (first day, first month, current year) before the calendar check.
#[derive(Debug, Default)]
struct DateParts {
    day: Option<u32>,
    month: Option<u32>,
    year: Option<i32>,
}

impl DateFormat {
    pub(crate) fn scan(format: &str) -> Self {
        let tokens = format
            .chars()
            .map(|c| match c {
                'd' => DateToken::Day2,
                'j' => DateToken::Day,
                'D' => DateToken::WeekdayAbbr,
                'l' => DateToken::WeekdayFull,
                'N' => DateToken::WeekdayNum,
                'S' => DateToken::Ordinal,
                'w' => DateToken::WeekdayNum0,
                'F' => DateToken::MonthFull,
                'M' => DateToken::MonthAbbr,
                'm' => DateToken::Month2,
                'n' => DateToken::Month,
                'Y' => DateToken::Year4,
                'y' => DateToken::Year2,
                'G' => DateToken::Hour,
                'H' => DateToken::Hour2,
                'g' => DateToken::Hour12,
                'h' => DateToken::Hour12Padded,
                'a' | 'A' => DateToken::Meridiem,
                'i' => DateToken::Minute,
                's' => DateToken::Second,
                'U' => DateToken::Unix,
                other => DateToken::Literal(other),
            })
            .collect();
        Self { tokens }
    }

    /// Parse a value against the format. `None` if the value does not match
    /// the pattern or resolves to a calendar-invalid date.
    pub(crate) fn parse_date(&self, value: &str) -> Option<NaiveDate> {
        // A format made of nothing but separators matches no value.
        if self
            .tokens
            .iter()
            .all(|t| matches!(t, DateToken::Literal(_)))
        {
            return None;
        }

        let mut input = value;
        let mut parts = DateParts::default();
        for &token in &self.tokens {
            match_token(token, &mut input, &mut parts).ok()?;
        }
        if !input.is_empty() {
            return None;
        }

        let year = parts.year.unwrap_or_else(|| Utc::now().year());
        let month = parts.month.unwrap_or(1);
        let day = parts.day.unwrap_or(1);
        NaiveDate::from_ymd_opt(year, month, day)
    }

    /// The derived timestamp for a matching value: midnight UTC of the
    /// resolved date, in seconds since the epoch.
    pub(crate) fn timestamp(&self, value: &str) -> Option<i64> {
        self.parse_date(value)
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .map(|dt| dt.and_utc().timestamp())
    }
}

fn one_digit(input: &mut &str) -> ModalResult<u32> {
    take_while(1..=1, |c: char| c.is_ascii_digit())
        .try_map(|s: &str| s.parse::<u32>())
        .parse_next(input)
}

fn two_digit(input: &mut &str) -> ModalResult<u32> {
    take_while(2..=2, |c: char| c.is_ascii_digit())
        .try_map(|s: &str| s.parse::<u32>())
        .parse_next(input)
}

fn one_or_two_digit(input: &mut &str) -> ModalResult<u32> {
    take_while(1..=2, |c: char| c.is_ascii_digit())
        .try_map(|s: &str| s.parse::<u32>())
        .parse_next(input)
}

fn four_digit(input: &mut &str) -> ModalResult<i32> {
    take_while(4..=4, |c: char| c.is_ascii_digit())
        .try_map(|s: &str| s.parse::<i32>())
        .parse_next(input)
}

fn alpha_word<'i>(input: &mut &'i str) -> ModalResult<&'i str> {
    take_while(1.., |c: char| c.is_ascii_alphabetic()).parse_next(input)
}

fn three_alpha<'i>(input: &mut &'i str) -> ModalResult<&'i str> {
    take_while(3..=3, |c: char| c.is_ascii_alphabetic()).parse_next(input)
}

fn month_full(input: &mut &str) -> ModalResult<u32> {
    alpha_word
        .verify_map(|word: &str| {
            MONTHS
                .iter()
                .position(|m| m.eq_ignore_ascii_case(word))
                .map(|i| i as u32 + 1)
        })
        .parse_next(input)
}

fn month_abbr(input: &mut &str) -> ModalResult<u32> {
    three_alpha
        .verify_map(|word: &str| {
            MONTHS
                .iter()
                .position(|m| m[..3].eq_ignore_ascii_case(word))
                .map(|i| i as u32 + 1)
        })
        .parse_next(input)
}

fn weekday_full(input: &mut &str) -> ModalResult<()> {
    alpha_word
        .verify(|word: &str| WEEKDAYS.iter().any(|d| d.eq_ignore_ascii_case(word)))
        .void()
        .parse_next(input)
}

fn weekday_abbr(input: &mut &str) -> ModalResult<()> {
    three_alpha
        .verify(|word: &str| WEEKDAYS.iter().any(|d| d[..3].eq_ignore_ascii_case(word)))
        .void()
        .parse_next(input)
}

fn literal_char(c: char, input: &mut &str) -> ModalResult<()> {
    any.verify(move |ch: &char| ch.eq_ignore_ascii_case(&c))
        .void()
        .parse_next(input)
}

fn match_token(token: DateToken, input: &mut &str, parts: &mut DateParts) -> ModalResult<()> {
    match token {
        DateToken::Day2 => {
            parts.day = Some(
                two_digit
                    .verify(|d: &u32| (1..=31).contains(d))
                    .parse_next(input)?,
            );
        }
        DateToken::Day => {
            parts.day = Some(
                one_or_two_digit
                    .verify(|d: &u32| (1..=31).contains(d))
                    .parse_next(input)?,
            );
        }
        DateToken::WeekdayAbbr => weekday_abbr(input)?,
        DateToken::WeekdayFull => weekday_full(input)?,
        DateToken::WeekdayNum => {
            one_digit
                .verify(|d: &u32| (1..=7).contains(d))
                .void()
                .parse_next(input)?;
        }
        DateToken::Ordinal => {
            alt((
                literal(Caseless("st")),
                literal(Caseless("nd")),
                literal(Caseless("rd")),
                literal(Caseless("th")),
            ))
            .void()
            .parse_next(input)?;
        }
        DateToken::WeekdayNum0 => {
            one_digit.verify(|d: &u32| *d <= 6).void().parse_next(input)?;
        }
        DateToken::MonthFull => {
            parts.month = Some(month_full(input)?);
        }
        DateToken::MonthAbbr => {
            parts.month = Some(month_abbr(input)?);
        }
        DateToken::Month2 => {
            parts.month = Some(
                two_digit
                    .verify(|m: &u32| (1..=12).contains(m))
                    .parse_next(input)?,
            );
        }
        DateToken::Month => {
            parts.month = Some(
                one_or_two_digit
                    .verify(|m: &u32| (1..=12).contains(m))
                    .parse_next(input)?,
            );
        }
        DateToken::Year4 => {
            parts.year = Some(four_digit(input)?);
        }
        DateToken::Year2 => {
            let y = two_digit(input)?;
            parts.year = Some(1900 + y as i32);
        }
        DateToken::Hour => {
            one_or_two_digit
                .verify(|h: &u32| *h <= 23)
                .void()
                .parse_next(input)?;
        }
        DateToken::Hour2 => {
            two_digit.verify(|h: &u32| *h <= 23).void().parse_next(input)?;
        }
        DateToken::Hour12 => {
            one_or_two_digit
                .verify(|h: &u32| *h <= 12)
                .void()
                .parse_next(input)?;
        }
        DateToken::Hour12Padded => {
            two_digit.verify(|h: &u32| *h <= 12).void().parse_next(input)?;
        }
        DateToken::Meridiem => {
            alt((literal(Caseless("am")), literal(Caseless("pm"))))
                .void()
                .parse_next(input)?;
        }
        DateToken::Minute | DateToken::Second => {
            two_digit.verify(|v: &u32| *v <= 59).void().parse_next(input)?;
        }
        DateToken::Unix => {
            take_while(1.., |c: char| c.is_ascii_digit())
                .void()
                .parse_next(input)?;
        }
        DateToken::Literal(c) => literal_char(c, input)?,
    }
    Ok(())
}
