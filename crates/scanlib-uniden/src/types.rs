//! BC246T enumerated values and their wire codes.
//!
//! Each enum knows its wire text (`as_str`) and parses it back (`FromStr`).
//! Serde names match the wire text so exported documents read the same as
//! the protocol.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Error returned when a wire or document value is not a known code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseValueError {
    kind: &'static str,
    value: String,
}

impl ParseValueError {
    fn new(kind: &'static str, value: &str) -> Self {
        ParseValueError {
            kind,
            value: value.to_string(),
        }
    }
}

impl fmt::Display for ParseValueError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown {}: {:?}", self.kind, self.value)
    }
}

impl std::error::Error for ParseValueError {}

/// Radio system protocol of a System record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SystemType {
    /// Conventional.
    #[serde(rename = "CNV")]
    Conventional,
    /// Motorola Type II Smartnet, 800 MHz standard plan.
    #[serde(rename = "M82S")]
    Motorola82Standard,
    /// Motorola Type II, 800 MHz splinter plan.
    #[serde(rename = "M82P")]
    Motorola82Splinter,
    /// Motorola Type II, 900 MHz.
    #[serde(rename = "M92")]
    Motorola92,
    /// Motorola Type II, VHF.
    #[serde(rename = "MV2")]
    MotorolaVhf2,
    /// Motorola Type II, UHF.
    #[serde(rename = "MU2")]
    MotorolaUhf2,
    /// Motorola Type I, 800 MHz standard plan.
    #[serde(rename = "M81S")]
    Motorola81Standard,
    /// Motorola Type I, 800 MHz splinter plan.
    #[serde(rename = "M81P")]
    Motorola81Splinter,
    /// EDACS narrow.
    #[serde(rename = "EDN")]
    EdacsNarrow,
    /// EDACS wide.
    #[serde(rename = "EDW")]
    EdacsWide,
    /// EDACS SCAT.
    #[serde(rename = "EDS")]
    EdacsScat,
    /// LTR.
    #[serde(rename = "LTR")]
    Ltr,
    /// Motorola Type II, 800 MHz custom plan.
    #[serde(rename = "M82C")]
    Motorola82Custom,
    /// Motorola Type I, 800 MHz custom plan.
    #[serde(rename = "M81C")]
    Motorola81Custom,
}

impl SystemType {
    /// Every system type, in the order the scanner documents them.
    pub const ALL: [SystemType; 14] = [
        SystemType::Conventional,
        SystemType::Motorola82Standard,
        SystemType::Motorola82Splinter,
        SystemType::Motorola92,
        SystemType::MotorolaVhf2,
        SystemType::MotorolaUhf2,
        SystemType::Motorola81Standard,
        SystemType::Motorola81Splinter,
        SystemType::EdacsNarrow,
        SystemType::EdacsWide,
        SystemType::EdacsScat,
        SystemType::Ltr,
        SystemType::Motorola82Custom,
        SystemType::Motorola81Custom,
    ];

    /// Wire code for this system type.
    pub fn as_str(&self) -> &'static str {
        match self {
            SystemType::Conventional => "CNV",
            SystemType::Motorola82Standard => "M82S",
            SystemType::Motorola82Splinter => "M82P",
            SystemType::Motorola92 => "M92",
            SystemType::MotorolaVhf2 => "MV2",
            SystemType::MotorolaUhf2 => "MU2",
            SystemType::Motorola81Standard => "M81S",
            SystemType::Motorola81Splinter => "M81P",
            SystemType::EdacsNarrow => "EDN",
            SystemType::EdacsWide => "EDW",
            SystemType::EdacsScat => "EDS",
            SystemType::Ltr => "LTR",
            SystemType::Motorola82Custom => "M82C",
            SystemType::Motorola81Custom => "M81C",
        }
    }
}

impl fmt::Display for SystemType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SystemType {
    type Err = ParseValueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SystemType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| ParseValueError::new("system type", s))
    }
}

/// Kind of Group: channel group (conventional) or talkgroup (trunked).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GroupType {
    /// Conventional channel group, created with `AGC`.
    #[serde(rename = "C")]
    Channel,
    /// Trunked talkgroup group, created with `AGI`.
    #[serde(rename = "T")]
    Talkgroup,
}

impl GroupType {
    /// Wire code for this group type.
    pub fn as_str(&self) -> &'static str {
        match self {
            GroupType::Channel => "C",
            GroupType::Talkgroup => "T",
        }
    }

    /// Command that appends a group of this type to a system.
    pub fn append_command(&self) -> &'static str {
        match self {
            GroupType::Channel => "AGC",
            GroupType::Talkgroup => "AGI",
        }
    }
}

impl FromStr for GroupType {
    type Err = ParseValueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "C" => Ok(GroupType::Channel),
            "T" => Ok(GroupType::Talkgroup),
            _ => Err(ParseValueError::new("group type", s)),
        }
    }
}

/// Channel demodulation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Modulation {
    /// Use the band default.
    Auto,
    /// Wide FM.
    Fm,
    /// Narrow FM.
    Nfm,
    /// AM.
    Am,
}

impl Modulation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Modulation::Auto => "AUTO",
            Modulation::Fm => "FM",
            Modulation::Nfm => "NFM",
            Modulation::Am => "AM",
        }
    }
}

impl FromStr for Modulation {
    type Err = ParseValueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "AUTO" => Ok(Modulation::Auto),
            "FM" => Ok(Modulation::Fm),
            "NFM" => Ok(Modulation::Nfm),
            "AM" => Ok(Modulation::Am),
            _ => Err(ParseValueError::new("modulation", s)),
        }
    }
}

/// Display backlight behaviour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Backlight {
    /// On for 10 seconds after a key press.
    #[serde(rename = "10")]
    TenSeconds,
    /// On for 30 seconds after a key press.
    #[serde(rename = "30")]
    ThirtySeconds,
    /// On while a key is held.
    #[serde(rename = "KY")]
    Keypress,
    /// On while the squelch is open.
    #[serde(rename = "SQ")]
    Squelch,
}

impl Backlight {
    pub fn as_str(&self) -> &'static str {
        match self {
            Backlight::TenSeconds => "10",
            Backlight::ThirtySeconds => "30",
            Backlight::Keypress => "KY",
            Backlight::Squelch => "SQ",
        }
    }
}

impl FromStr for Backlight {
    type Err = ParseValueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "10" => Ok(Backlight::TenSeconds),
            "30" => Ok(Backlight::ThirtySeconds),
            "KY" => Ok(Backlight::Keypress),
            "SQ" => Ok(Backlight::Squelch),
            _ => Err(ParseValueError::new("backlight", s)),
        }
    }
}

/// Priority channel scanning mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum PriorityMode {
    Off,
    On,
    DoNotDisturb,
}

impl PriorityMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            PriorityMode::Off => "0",
            PriorityMode::On => "1",
            PriorityMode::DoNotDisturb => "2",
        }
    }
}

impl TryFrom<u8> for PriorityMode {
    type Error = ParseValueError;

    fn try_from(v: u8) -> Result<Self, Self::Error> {
        match v {
            0 => Ok(PriorityMode::Off),
            1 => Ok(PriorityMode::On),
            2 => Ok(PriorityMode::DoNotDisturb),
            _ => Err(ParseValueError::new("priority mode", &v.to_string())),
        }
    }
}

impl From<PriorityMode> for u8 {
    fn from(mode: PriorityMode) -> u8 {
        mode as u8
    }
}

impl FromStr for PriorityMode {
    type Err = ParseValueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse::<u8>()
            .map_err(|_| ParseValueError::new("priority mode", s))
            .and_then(PriorityMode::try_from)
    }
}

/// A front-panel key, as named by the `KEY` command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyCode {
    Menu,
    Func,
    Hold,
    Scan,
    Lockout,
    Light,
    /// A numeric key, `0` through `9`.
    Digit(u8),
    Dot,
    Enter,
    VfoRight,
    VfoLeft,
    VfoPush,
    Power,
}

impl KeyCode {
    /// Wire code for this key, or `None` for a digit outside `0..=9`.
    pub fn code(&self) -> Option<char> {
        Some(match self {
            KeyCode::Menu => 'M',
            KeyCode::Func => 'F',
            KeyCode::Hold => 'H',
            KeyCode::Scan => 'S',
            KeyCode::Lockout => 'L',
            KeyCode::Light => 'T',
            KeyCode::Digit(d) => char::from_digit(u32::from(*d), 10)?,
            KeyCode::Dot => '.',
            KeyCode::Enter => 'E',
            KeyCode::VfoRight => '>',
            KeyCode::VfoLeft => '<',
            KeyCode::VfoPush => '^',
            KeyCode::Power => 'P',
        })
    }
}

impl FromStr for KeyCode {
    type Err = ParseValueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut chars = s.chars();
        let (Some(c), None) = (chars.next(), chars.next()) else {
            return Err(ParseValueError::new("key", s));
        };
        match c.to_ascii_uppercase() {
            'M' => Ok(KeyCode::Menu),
            'F' => Ok(KeyCode::Func),
            'H' => Ok(KeyCode::Hold),
            'S' => Ok(KeyCode::Scan),
            'L' => Ok(KeyCode::Lockout),
            'T' => Ok(KeyCode::Light),
            '.' => Ok(KeyCode::Dot),
            'E' => Ok(KeyCode::Enter),
            '>' => Ok(KeyCode::VfoRight),
            '<' => Ok(KeyCode::VfoLeft),
            '^' => Ok(KeyCode::VfoPush),
            'P' => Ok(KeyCode::Power),
            d => d
                .to_digit(10)
                .map(|d| KeyCode::Digit(d as u8))
                .ok_or_else(|| ParseValueError::new("key", s)),
        }
    }
}

/// How a key is actuated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum KeyMode {
    #[default]
    Press,
    LongPress,
    Hold,
    Release,
}

impl KeyMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            KeyMode::Press => "P",
            KeyMode::LongPress => "L",
            KeyMode::Hold => "H",
            KeyMode::Release => "R",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn system_type_round_trips_through_wire_code() {
        for t in SystemType::ALL {
            assert_eq!(t.as_str().parse::<SystemType>().unwrap(), t);
        }
    }

    #[test]
    fn system_type_rejects_unknown_code() {
        let err = "P25".parse::<SystemType>().unwrap_err();
        assert_eq!(err.to_string(), "unknown system type: \"P25\"");
    }

    #[test]
    fn system_type_serializes_as_wire_code() {
        let json = serde_json::to_string(&SystemType::Motorola82Standard).unwrap();
        assert_eq!(json, "\"M82S\"");
    }

    #[test]
    fn group_type_selects_append_command() {
        assert_eq!(GroupType::Channel.append_command(), "AGC");
        assert_eq!(GroupType::Talkgroup.append_command(), "AGI");
    }

    #[test]
    fn modulation_serde_uses_uppercase() {
        let m: Modulation = serde_json::from_str("\"NFM\"").unwrap();
        assert_eq!(m, Modulation::Nfm);
        assert_eq!(serde_json::to_string(&Modulation::Auto).unwrap(), "\"AUTO\"");
    }

    #[test]
    fn backlight_codes() {
        assert_eq!("KY".parse::<Backlight>().unwrap(), Backlight::Keypress);
        assert_eq!(Backlight::ThirtySeconds.as_str(), "30");
        assert!("20".parse::<Backlight>().is_err());
    }

    #[test]
    fn priority_mode_is_numeric_in_documents() {
        assert_eq!(serde_json::to_string(&PriorityMode::DoNotDisturb).unwrap(), "2");
        assert!(serde_json::from_str::<PriorityMode>("3").is_err());
        assert_eq!("1".parse::<PriorityMode>().unwrap(), PriorityMode::On);
    }

    #[test]
    fn key_codes() {
        assert_eq!(KeyCode::Scan.code(), Some('S'));
        assert_eq!(KeyCode::Digit(7).code(), Some('7'));
        assert_eq!(KeyCode::Digit(12).code(), None);
        assert_eq!("s".parse::<KeyCode>().unwrap(), KeyCode::Scan);
        assert_eq!("4".parse::<KeyCode>().unwrap(), KeyCode::Digit(4));
        assert!("SCAN".parse::<KeyCode>().is_err());
    }

    #[test]
    fn key_mode_default_is_press() {
        assert_eq!(KeyMode::default().as_str(), "P");
    }
}
