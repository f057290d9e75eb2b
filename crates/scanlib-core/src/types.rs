//! Core types used throughout scanlib.
//!
//! These are the scalar values that cross the wire in more than one
//! command: memory indices (with the `-1` null sentinel), quick keys (with
//! the `.` null sentinel) and fixed-width frequencies.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Wire encoding of an absent index.
pub const NULL_INDEX: &str = "-1";

/// Wire encoding of an absent quick key.
pub const NULL_QUICK_KEY: &str = ".";

/// Address of a record in the scanner's memory.
///
/// Indices are assigned by the device when a record is created and stay
/// stable while it exists. The `-1` sentinel never becomes an `Index`: it
/// is decoded to `None` by [`Index::parse_link`], so there is no way to do
/// arithmetic on it by accident.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Index(u32);

impl Index {
    /// Create an index from a raw device address.
    pub fn new(raw: u32) -> Self {
        Index(raw)
    }

    /// Return the raw device address.
    pub fn get(&self) -> u32 {
        self.0
    }

    /// Decode a link field, mapping the `-1` sentinel to `None`.
    ///
    /// Any other negative or non-numeric value is an
    /// [`Error::UnexpectedResponse`].
    pub fn parse_link(field: &str) -> Result<Option<Index>> {
        if field == NULL_INDEX {
            return Ok(None);
        }
        field
            .parse::<u32>()
            .map(|raw| Some(Index(raw)))
            .map_err(|_| Error::UnexpectedResponse(format!("invalid index field: {field:?}")))
    }

    /// Decode a field that must carry a real index.
    pub fn parse(field: &str) -> Result<Index> {
        Index::parse_link(field)?.ok_or_else(|| {
            Error::UnexpectedResponse("null index where a record was expected".into())
        })
    }

    /// Encode an optional link for the wire (`None` becomes `-1`).
    pub fn link_to_wire(link: Option<Index>) -> String {
        match link {
            Some(index) => index.to_string(),
            None => NULL_INDEX.to_string(),
        }
    }
}

impl fmt::Display for Index {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A 1-9 shortcut key assigned to one of the first nine siblings in a scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct QuickKey(u8);

impl QuickKey {
    /// Lowest assignable quick key.
    pub const MIN: u8 = 1;
    /// Highest assignable quick key.
    pub const MAX: u8 = 9;

    /// Create a quick key, returning `None` outside 1-9.
    pub fn new(key: u8) -> Option<Self> {
        (Self::MIN..=Self::MAX).contains(&key).then_some(QuickKey(key))
    }

    /// Quick key for the sibling at a 1-based `position`: the position
    /// itself for the first nine siblings, absent afterwards.
    pub fn for_position(position: usize) -> Option<Self> {
        u8::try_from(position).ok().and_then(QuickKey::new)
    }

    /// Return the key number.
    pub fn get(&self) -> u8 {
        self.0
    }

    /// Decode a quick key field, mapping the `.` sentinel to `None`.
    pub fn parse_field(field: &str) -> Result<Option<QuickKey>> {
        if field == NULL_QUICK_KEY {
            return Ok(None);
        }
        field
            .parse::<u8>()
            .ok()
            .and_then(QuickKey::new)
            .map(Some)
            .ok_or_else(|| Error::UnexpectedResponse(format!("invalid quick key field: {field:?}")))
    }

    /// Encode an optional quick key for the wire (`None` becomes `.`).
    pub fn to_wire(key: Option<QuickKey>) -> String {
        match key {
            Some(key) => key.0.to_string(),
            None => NULL_QUICK_KEY.to_string(),
        }
    }
}

impl TryFrom<u8> for QuickKey {
    type Error = String;

    fn try_from(key: u8) -> std::result::Result<Self, Self::Error> {
        QuickKey::new(key).ok_or_else(|| format!("quick key {key} outside 1-9"))
    }
}

impl From<QuickKey> for u8 {
    fn from(key: QuickKey) -> u8 {
        key.0
    }
}

impl fmt::Display for QuickKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A channel frequency in units of 100 Hz (1/10000 MHz).
///
/// On the wire it is always exactly eight zero-padded digits, e.g.
/// `01544300` for 154.4300 MHz.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Frequency(u32);

impl Frequency {
    /// Largest value that fits in the eight-digit wire field.
    pub const MAX_UNITS: u32 = 99_999_999;

    /// Create a frequency from a count of 100 Hz units.
    pub fn from_units(units: u32) -> Self {
        Frequency(units)
    }

    /// Return the frequency as a count of 100 Hz units.
    pub fn units(&self) -> u32 {
        self.0
    }

    /// Return the frequency in hertz.
    pub fn hz(&self) -> u64 {
        u64::from(self.0) * 100
    }

    /// Encode as the eight-digit wire field.
    ///
    /// Returns [`Error::InvalidParameter`] if the value does not fit.
    pub fn to_wire(&self) -> Result<String> {
        if self.0 > Self::MAX_UNITS {
            return Err(Error::InvalidParameter(format!(
                "frequency {} does not fit in 8 digits",
                self.0
            )));
        }
        Ok(format!("{:08}", self.0))
    }

    /// Decode the wire field.
    pub fn parse_field(field: &str) -> Result<Frequency> {
        if field.is_empty() || !field.bytes().all(|b| b.is_ascii_digit()) {
            return Err(Error::UnexpectedResponse(format!(
                "invalid frequency field: {field:?}"
            )));
        }
        field
            .parse::<u32>()
            .map(Frequency)
            .map_err(|_| Error::UnexpectedResponse(format!("invalid frequency field: {field:?}")))
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:04} MHz", self.0 / 10_000, self.0 % 10_000)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn index_null_sentinel_is_none() {
        assert_eq!(Index::parse_link("-1").unwrap(), None);
    }

    #[test]
    fn index_parses_digits() {
        assert_eq!(Index::parse_link("42").unwrap(), Some(Index::new(42)));
        assert_eq!(Index::parse("7").unwrap().get(), 7);
    }

    #[test]
    fn index_rejects_other_negatives() {
        assert!(matches!(
            Index::parse_link("-2"),
            Err(Error::UnexpectedResponse(_))
        ));
        assert!(Index::parse_link("abc").is_err());
        assert!(Index::parse_link("").is_err());
    }

    #[test]
    fn index_parse_requires_a_record() {
        assert!(matches!(
            Index::parse("-1"),
            Err(Error::UnexpectedResponse(_))
        ));
    }

    #[test]
    fn index_link_to_wire() {
        assert_eq!(Index::link_to_wire(None), "-1");
        assert_eq!(Index::link_to_wire(Some(Index::new(3))), "3");
    }

    #[test]
    fn quick_key_bounds() {
        assert!(QuickKey::new(0).is_none());
        assert_eq!(QuickKey::new(1).unwrap().get(), 1);
        assert_eq!(QuickKey::new(9).unwrap().get(), 9);
        assert!(QuickKey::new(10).is_none());
    }

    #[test]
    fn quick_key_for_position() {
        assert_eq!(QuickKey::for_position(1), QuickKey::new(1));
        assert_eq!(QuickKey::for_position(9), QuickKey::new(9));
        assert_eq!(QuickKey::for_position(10), None);
        assert_eq!(QuickKey::for_position(0), None);
        assert_eq!(QuickKey::for_position(300), None);
    }

    #[test]
    fn quick_key_wire_sentinel() {
        assert_eq!(QuickKey::parse_field(".").unwrap(), None);
        assert_eq!(QuickKey::parse_field("4").unwrap(), QuickKey::new(4));
        assert!(QuickKey::parse_field("0").is_err());
        assert_eq!(QuickKey::to_wire(None), ".");
        assert_eq!(QuickKey::to_wire(QuickKey::new(5)), "5");
    }

    #[test]
    fn quick_key_serde_rejects_out_of_range() {
        let ok: QuickKey = serde_json::from_str("3").unwrap();
        assert_eq!(ok.get(), 3);
        assert!(serde_json::from_str::<QuickKey>("12").is_err());
    }

    #[test]
    fn frequency_wire_is_eight_digits() {
        let f = Frequency::from_units(1_544_300);
        assert_eq!(f.to_wire().unwrap(), "01544300");
        assert_eq!(f.hz(), 154_430_000);
    }

    #[test]
    fn frequency_too_large_for_wire() {
        let f = Frequency::from_units(100_000_000);
        assert!(matches!(f.to_wire(), Err(Error::InvalidParameter(_))));
    }

    #[test]
    fn frequency_parse_field() {
        assert_eq!(
            Frequency::parse_field("00250000").unwrap(),
            Frequency::from_units(250_000)
        );
        assert!(Frequency::parse_field("").is_err());
        assert!(Frequency::parse_field("12a4").is_err());
    }

    #[test]
    fn frequency_display_mhz() {
        assert_eq!(Frequency::from_units(1_544_300).to_string(), "154.4300 MHz");
        assert_eq!(Frequency::from_units(250_000).to_string(), "25.0000 MHz");
    }
}
