use chrono::NaiveDate;
use nom::{
    branch::alt,
    bytes::complete::{tag, take_while, take_while_m_n},
    character::complete::one_of,
    combinator::{all_consuming, map, map_res, opt, value},
    sequence::{preceded, tuple},
    IResult,
};
use thiserror::Error;
use xmltree::Element;

use crate::xml::{self, QName};

/// An error reading an RFC 3339 date construct.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum DateError {
    /// The value does not have the `YYYY-MM-DDThh:mm:ss[.fff](Z|±hh:mm)` form.
    #[error("Not a valid RFC 3339 date: {0:?}")]
    InvalidDate(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Stamp {
    year: i32,
    month: u32,
    day: u32,
    hour: i64,
    minute: i64,
    second: i64,
    /// The hour component of the UTC offset; `None` for `Z`.
    offset_hours: Option<i64>,
}

fn digits<'a, T: std::str::FromStr>(n: usize) -> impl FnMut(&'a str) -> IResult<&'a str, T> {
    map_res(take_while_m_n(n, n, |c: char| c.is_ascii_digit()), str::parse)
}

fn offset(input: &str) -> IResult<&str, Option<i64>> {
    alt((
        value(None, tag("Z")),
        map(
            tuple((one_of("+-"), digits::<i64>(2), tag(":"), digits::<i64>(2))),
            |(sign, hours, _, _)| Some(if sign == '-' { -hours } else { hours }),
        ),
    ))(input)
}

fn stamp(input: &str) -> IResult<&str, Stamp> {
    let fraction = opt(preceded(tag("."), take_while(|c: char| c.is_ascii_digit())));
    map(
        all_consuming(tuple((
            digits::<i32>(4),
            tag("-"),
            digits::<u32>(2),
            tag("-"),
            digits::<u32>(2),
            tag("T"),
            digits::<i64>(2),
            tag(":"),
            digits::<i64>(2),
            tag(":"),
            digits::<i64>(2),
            fraction,
            offset,
        ))),
        |(year, _, month, _, day, _, hour, _, minute, _, second, _, offset_hours)| Stamp {
            year,
            month,
            day,
            hour,
            minute,
            second,
            offset_hours,
        },
    )(input)
}

impl Stamp {
    /// Seconds since the epoch, with the hour offset applied to the hour field.
    ///
    /// Only the hour component of a `±hh:mm` offset is applied; the minutes are ignored,
    /// so half-hour zones come out shifted by their minute part.
    fn epoch_seconds(&self) -> Option<i64> {
        let midnight = NaiveDate::from_ymd_opt(self.year, self.month, self.day)?
            .and_hms_opt(0, 0, 0)?
            .and_utc()
            .timestamp();
        let hour = self.hour - self.offset_hours.unwrap_or(0);
        Some(midnight + hour * 3600 + self.minute * 60 + self.second)
    }
}

/// Read the date construct `name` from the children of `tree`, as seconds since the epoch
/// in UTC.
///
/// Names without a namespace are looked up in the Atom namespace, so `"updated"` and
/// `"{http://www.w3.org/2007/app}edited"` are both valid.
pub fn read_date<'a>(tree: &Element, name: impl Into<QName<'a>>) -> Result<i64, DateError> {
    let raw = xml::child(tree, name.into())
        .map(xml::text)
        .unwrap_or_default();
    parse_date(&raw)
}

pub(crate) fn parse_date(raw: &str) -> Result<i64, DateError> {
    stamp(raw)
        .ok()
        .and_then(|(_, s)| s.epoch_seconds())
        .ok_or_else(|| DateError::InvalidDate(raw.to_owned()))
}
