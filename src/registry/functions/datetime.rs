// Copyright 2024 OctoFHIR Team
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Date and time functions
//!
//! Patterns use the familiar `yyyy-MM-dd HH:mm:ss` letters and are
//! translated to chrono format strings before parsing.

use crate::model::{Context, TIMEZONE, Token, Value};
use crate::registry::function::{
    FunctionDescriptor, FunctionError, FunctionResult, StellarFunction, args,
};
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, Offset, TimeZone, Utc};
use std::sync::LazyLock;

/// Translate a date pattern such as `yyyy-MM-dd HH:mm:ss.SSS` to chrono syntax
pub fn translate_pattern(pattern: &str) -> String {
    let chars: Vec<char> = pattern.chars().collect();
    let mut out = String::with_capacity(pattern.len() * 2);
    let mut i = 0;

    while i < chars.len() {
        let ch = chars[i];
        if ch == '\'' {
            // quoted literal; '' is an escaped quote
            i += 1;
            while i < chars.len() {
                if chars[i] == '\'' {
                    if chars.get(i + 1) == Some(&'\'') {
                        out.push('\'');
                        i += 2;
                        continue;
                    }
                    break;
                }
                push_literal(&mut out, chars[i]);
                i += 1;
            }
            i += 1;
            continue;
        }

        let run = chars[i..].iter().take_while(|c| **c == ch).count();
        let translated = match (ch, run) {
            ('y', 2) => Some("%y"),
            ('y', _) => Some("%Y"),
            ('M', 1 | 2) => Some("%m"),
            ('M', 3) => Some("%b"),
            ('M', _) => Some("%B"),
            ('d', _) => Some("%d"),
            ('H', _) => Some("%H"),
            ('h', _) => Some("%I"),
            ('m', _) => Some("%M"),
            ('s', _) => Some("%S"),
            ('S', 3) => Some("%3f"),
            ('S', 6) => Some("%6f"),
            ('S', 9) => Some("%9f"),
            ('a', _) => Some("%p"),
            ('E', 1..=3) => Some("%a"),
            ('E', _) => Some("%A"),
            ('Z', _) => Some("%z"),
            ('X', _) => Some("%:z"),
            _ => None,
        };
        match translated {
            Some(spec) => out.push_str(spec),
            None => (0..run).for_each(|_| push_literal(&mut out, ch)),
        }
        i += run;
    }
    out
}

fn push_literal(out: &mut String, ch: char) {
    if ch == '%' {
        out.push_str("%%");
    } else {
        out.push(ch);
    }
}

/// Parse a zone designator: `UTC`, `GMT`, `Z` or a `+HH:MM` style offset
pub fn parse_zone(zone: &str) -> Option<FixedOffset> {
    let zone = zone.trim();
    if matches!(zone.to_ascii_uppercase().as_str(), "UTC" | "GMT" | "Z") {
        return Some(Utc.fix());
    }
    let offset = zone
        .strip_prefix("UTC")
        .or_else(|| zone.strip_prefix("GMT"))
        .unwrap_or(zone);
    let (sign, rest) = match offset.as_bytes().first()? {
        b'+' => (1, &offset[1..]),
        b'-' => (-1, &offset[1..]),
        _ => return None,
    };
    let digits: String = rest.chars().filter(|c| *c != ':').collect();
    if !digits.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    let (hours, minutes) = match digits.len() {
        1 | 2 => (digits.parse::<i32>().ok()?, 0),
        4 => (digits[..2].parse::<i32>().ok()?, digits[2..].parse::<i32>().ok()?),
        _ => return None,
    };
    if hours > 23 || minutes > 59 {
        return None;
    }
    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
}

/// Text to epoch milliseconds
pub struct ToEpochTimestampFunction;

impl ToEpochTimestampFunction {
    fn zone(&self, args: &[Token], context: &Context) -> FunctionResult<FixedOffset> {
        let requested = match args::string(self.name(), args, 2)? {
            Some(zone) => Some(zone.to_string()),
            None => context.get(TIMEZONE).and_then(Value::as_str).map(str::to_string),
        };
        match requested {
            None => Ok(Utc.fix()),
            Some(zone) => parse_zone(&zone).ok_or_else(|| {
                FunctionError::evaluation(self.name(), format!("unsupported time zone '{zone}'"))
            }),
        }
    }
}

fn parse_local(text: &str, format: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(text, format).ok().or_else(|| {
        NaiveDate::parse_from_str(text, format)
            .ok()
            .and_then(|date| date.and_hms_opt(0, 0, 0))
    })
}

impl StellarFunction for ToEpochTimestampFunction {
    fn descriptor(&self) -> &FunctionDescriptor {
        static SIG: LazyLock<FunctionDescriptor> = LazyLock::new(|| {
            FunctionDescriptor::new(
                "TO_EPOCH_TIMESTAMP",
                "Returns the epoch timestamp of the date in milliseconds",
                &[
                    "dateTime - DateTime in String format",
                    "format - DateTime format as a String",
                    "timezone - Optional zone: UTC, GMT, Z or an offset such as +05:30",
                ],
                "Epoch timestamp in milliseconds as a long, or null if the text does not match",
            )
            .with_arity(2, Some(3))
        });
        &SIG
    }

    fn apply(&self, args: &[Token], context: &Context) -> FunctionResult<Token> {
        self.validate_args(args)?;
        let (Some(text), Some(pattern)) = (
            args::string(self.name(), args, 0)?,
            args::string(self.name(), args, 1)?,
        ) else {
            return Ok(Token::null());
        };
        let format = translate_pattern(pattern);

        if let Ok(stamped) = DateTime::parse_from_str(text, &format) {
            return Ok(Token::from(stamped.timestamp_millis()));
        }

        let zone = self.zone(args, context)?;
        let Some(local) = parse_local(text, &format) else {
            log::trace!("{}: '{text}' does not match '{pattern}'", self.name());
            return Ok(Token::null());
        };
        Ok(zone
            .from_local_datetime(&local)
            .single()
            .map(|instant| Token::from(instant.timestamp_millis()))
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EXPECTED: i64 = 1_452_013_350_000;

    fn call(args: &[Token], context: &Context) -> FunctionResult<Token> {
        ToEpochTimestampFunction.apply(args, context)
    }

    #[test]
    fn test_translate_pattern() {
        assert_eq!(translate_pattern("yyyy-MM-dd HH:mm:ss"), "%Y-%m-%d %H:%M:%S");
        assert_eq!(translate_pattern("dd/MMM/yyyy"), "%d/%b/%Y");
        assert_eq!(translate_pattern("yyyy-MM-dd'T'HH:mm"), "%Y-%m-%dT%H:%M");
        assert_eq!(translate_pattern("HH:mm:ss.SSS"), "%H:%M:%S.%3f");
    }

    #[test]
    fn test_parse_zone() {
        assert_eq!(parse_zone("UTC"), FixedOffset::east_opt(0));
        assert_eq!(parse_zone("+05:30"), FixedOffset::east_opt(19_800));
        assert_eq!(parse_zone("-0800"), FixedOffset::west_opt(28_800));
        assert_eq!(parse_zone("GMT+1"), FixedOffset::east_opt(3_600));
        assert_eq!(parse_zone("Mars/Olympus"), None);
    }

    #[test]
    fn test_epoch_utc() {
        let args = [
            "2016-01-05 17:02:30".into(),
            "yyyy-MM-dd HH:mm:ss".into(),
            "UTC".into(),
        ];
        assert_eq!(call(&args, Context::empty()).unwrap(), Token::from(EXPECTED));
    }

    #[test]
    fn test_epoch_context_zone() {
        let args = ["2016-01-05 18:02:30".into(), "yyyy-MM-dd HH:mm:ss".into()];
        let context = Context::builder().with(TIMEZONE, "+01:00").build();
        assert_eq!(call(&args, &context).unwrap(), Token::from(EXPECTED));
        // no zone anywhere falls back to UTC
        let args = ["2016-01-05 17:02:30".into(), "yyyy-MM-dd HH:mm:ss".into()];
        assert_eq!(call(&args, Context::empty()).unwrap(), Token::from(EXPECTED));
    }

    #[test]
    fn test_epoch_failures() {
        let args = ["yesterday".into(), "yyyy-MM-dd".into()];
        assert!(call(&args, Context::empty()).unwrap().is_null());
        let args = [
            "2016-01-05".into(),
            "yyyy-MM-dd".into(),
            "Mars/Olympus".into(),
        ];
        assert!(matches!(
            call(&args, Context::empty()),
            Err(FunctionError::Evaluation { .. })
        ));
    }
}
