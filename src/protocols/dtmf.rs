//! DTMF (Dual-Tone Multi-Frequency) relay payload handling
//!
//! Tones travel as the body of SIP INFO requests using the
//! `application/dtmf-relay` format:
//!
//! ```text
//! Signal=5\r\nDuration=160
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Shortest tone an outgoing event may carry (ms)
pub const MIN_DURATION: u32 = 70;
/// Longest tone an outgoing event may carry (ms)
pub const MAX_DURATION: u32 = 6000;
/// Duration used when the caller does not pick one (ms)
pub const DEFAULT_DURATION: u32 = 100;
/// Smallest pause a session may leave between two tones (ms)
pub const MIN_INTER_TONE_GAP: u32 = 50;
/// Pause a session leaves between two tones unless configured (ms)
pub const DEFAULT_INTER_TONE_GAP: u32 = 500;

pub const CONTENT_TYPE: &str = "application/dtmf-relay";

/// Every symbol a relay body may carry, in keypad order
pub const TONE_ALPHABET: &str = "0123456789ABCD#*";

/// A single validated keypad symbol, always uppercase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "char", into = "char")]
pub struct Tone(char);

impl Tone {
    /// Accepts the symbol only as written; lowercase `a`-`d` are rejected.
    pub fn new(symbol: char) -> Option<Self> {
        TONE_ALPHABET.contains(symbol).then_some(Self(symbol))
    }

    pub fn as_char(self) -> char {
        self.0
    }
}

impl fmt::Display for Tone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<char> for Tone {
    type Error = Error;

    fn try_from(symbol: char) -> Result<Self> {
        Tone::new(symbol).ok_or_else(|| Error::validation(format!("Invalid tone: {}", symbol)))
    }
}

impl From<Tone> for char {
    fn from(tone: Tone) -> char {
        tone.0
    }
}

/// Caller-supplied tone before normalization
///
/// Text is uppercased and numbers are rendered in decimal, so `"a"` and
/// `'a'` both become `A`, and `7` becomes `7` while `10` is rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToneInput {
    Text(String),
    Number(i64),
}

impl ToneInput {
    pub fn normalize(&self) -> Result<Tone> {
        let symbol = match self {
            ToneInput::Text(text) if text.is_empty() => {
                return Err(Error::validation("Not enough arguments: no tone supplied"));
            }
            ToneInput::Text(text) => text.to_uppercase(),
            ToneInput::Number(number) => number.to_string(),
        };

        let mut chars = symbol.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => Tone::new(c),
            _ => None,
        }
        .ok_or_else(|| Error::validation(format!("Invalid tone: {}", symbol)))
    }
}

impl From<&str> for ToneInput {
    fn from(text: &str) -> Self {
        ToneInput::Text(text.to_string())
    }
}

impl From<String> for ToneInput {
    fn from(text: String) -> Self {
        ToneInput::Text(text)
    }
}

impl From<char> for ToneInput {
    fn from(symbol: char) -> Self {
        ToneInput::Text(symbol.to_string())
    }
}

impl From<Tone> for ToneInput {
    fn from(tone: Tone) -> Self {
        ToneInput::Text(tone.to_string())
    }
}

impl From<u8> for ToneInput {
    fn from(number: u8) -> Self {
        ToneInput::Number(number.into())
    }
}

impl From<u32> for ToneInput {
    fn from(number: u32) -> Self {
        ToneInput::Number(number.into())
    }
}

impl From<i32> for ToneInput {
    fn from(number: i32) -> Self {
        ToneInput::Number(number.into())
    }
}

impl From<i64> for ToneInput {
    fn from(number: i64) -> Self {
        ToneInput::Number(number)
    }
}

/// Decoded `application/dtmf-relay` body
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelayPayload {
    pub tone: Tone,
    pub duration: u32,
}

impl RelayPayload {
    pub fn new(tone: Tone, duration: u32) -> Self {
        Self { tone, duration }
    }

    /// Two CRLF-separated lines, no trailing line break
    pub fn encode(&self) -> String {
        format!("Signal={}\r\nDuration={}", self.tone, self.duration)
    }

    pub fn decode(body: &str) -> Option<Self> {
        let (signal, duration) = split_relay_lines(body)?;
        Some(Self {
            tone: parse_signal_line(signal)?,
            duration: parse_duration_line(duration)?,
        })
    }
}

/// Splits a body on CRLF, yielding the two lines only when there are exactly two.
pub fn split_relay_lines(body: &str) -> Option<(&str, &str)> {
    let mut lines = body.split("\r\n");
    match (lines.next(), lines.next(), lines.next()) {
        (Some(first), Some(second), None) => Some((first, second)),
        _ => None,
    }
}

/// `Signal <ws>* = <ws>* <tone>`, anchored at the line start
///
/// Anything after the tone symbol is ignored, so `Signal=12` yields `1`.
pub fn parse_signal_line(line: &str) -> Option<Tone> {
    let value = field_value(line, "Signal")?;
    Tone::new(value.chars().next()?)
}

/// `Duration <ws>* = <ws>* <1-4 digits>`, anchored at the line start
///
/// Only the first four digits are read and the rest of the line is ignored.
/// The value is not range checked; it reports what the peer claims it played.
pub fn parse_duration_line(line: &str) -> Option<u32> {
    let value = field_value(line, "Duration")?;
    let end = value
        .char_indices()
        .take_while(|(i, c)| *i < 4 && c.is_ascii_digit())
        .count();

    if end == 0 {
        return None;
    }
    value[..end].parse().ok()
}

fn field_value<'a>(line: &'a str, name: &str) -> Option<&'a str> {
    let rest = line.strip_prefix(name)?.trim_start();
    Some(rest.strip_prefix('=')?.trim_start())
}
