//! The portable memory document.
//!
//! A [`Document`] is the JSON projection of a scanner's memory: device
//! identity, device-wide settings, and the system / group / channel tree in
//! scan order. Record nodes keep their attributes as a JSON field map so the
//! default-elision codec can work on them directly; structural fields never
//! appear in a document.
//!
//! ```json
//! {
//!   "meta": { "created_at": "2026-10-19T12:00:00Z" },
//!   "info": { "model": "BC246T", "firmware": "Version 1.06.00" },
//!   "settings": { "backlight": "10", "battery_save": false, "key_beep": true,
//!                 "greeting": ["Uniden", "BC246T"], "priority_mode": 0 },
//!   "systems": [ { "system_type": "CNV", "name": "Fire", "sequence_number": 1,
//!                  "groups": [ { "group_name": "Dispatch", "channels": [
//!                    { "name": "Main", "frequency": 1544300, "modulation": "NFM" } ] } ] } ]
//! }
//! ```

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use scanlib_core::{Error, Result};

use crate::types::{Backlight, PriorityMode};

/// JSON Schema every document is validated against.
pub const SCHEMA_JSON: &str = include_str!("../schema/bc246t.schema.json");

/// Maximum number of schema violations reported in one error.
const MAX_REPORTED_VIOLATIONS: usize = 4;

/// A complete memory document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Document {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<Map<String, Value>>,
    pub info: DeviceInfo,
    pub settings: DeviceSettings,
    pub systems: Vec<SystemNode>,
}

/// Identity of the scanner a document was taken from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceInfo {
    pub model: String,
    pub firmware: String,
}

/// Device-wide settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceSettings {
    pub backlight: Backlight,
    pub battery_save: bool,
    pub key_beep: bool,
    /// One or two greeting lines.
    pub greeting: Vec<String>,
    pub priority_mode: PriorityMode,
}

impl DeviceSettings {
    /// The greeting as the two lines the scanner stores.
    pub fn greeting_lines(&self) -> (&str, &str) {
        let line = |i: usize| self.greeting.get(i).map_or("", String::as_str);
        (line(0), line(1))
    }
}

/// A System and its groups.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemNode {
    #[serde(flatten)]
    pub fields: Map<String, Value>,
    #[serde(default)]
    pub groups: Vec<GroupNode>,
}

/// A Group and its channels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupNode {
    #[serde(flatten)]
    pub fields: Map<String, Value>,
    #[serde(default)]
    pub channels: Vec<ChannelNode>,
}

/// A Channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelNode {
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl Document {
    /// Parse a document from JSON text.
    ///
    /// This only checks the overall shape. Use [`validate`] for the full
    /// schema.
    pub fn from_json(text: &str) -> Result<Document> {
        serde_json::from_str(text).map_err(|e| Error::Document(format!("invalid document: {e}")))
    }

    /// Render the document as pretty-printed JSON.
    pub fn to_json_pretty(&self) -> Result<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| Error::Document(format!("cannot encode document: {e}")))
    }

    /// Total number of groups across all systems.
    pub fn group_count(&self) -> usize {
        self.systems.iter().map(|s| s.groups.len()).sum()
    }

    /// Total number of channels across all groups.
    pub fn channel_count(&self) -> usize {
        self.systems
            .iter()
            .flat_map(|s| &s.groups)
            .map(|g| g.channels.len())
            .sum()
    }
}

/// Validate a document against the bundled JSON Schema.
pub fn validate(document: &Document) -> Result<()> {
    let value = serde_json::to_value(document)
        .map_err(|e| Error::Document(format!("cannot encode document: {e}")))?;
    validate_value(&value)
}

/// Validate raw JSON against the bundled JSON Schema.
pub fn validate_value(value: &Value) -> Result<()> {
    let schema: Value = serde_json::from_str(SCHEMA_JSON)
        .map_err(|e| Error::Document(format!("bundled schema is not JSON: {e}")))?;
    let validator = jsonschema::validator_for(&schema)
        .map_err(|e| Error::Document(format!("bundled schema does not compile: {e}")))?;

    let mut errors = validator.iter_errors(value);
    if let Some(first) = errors.next() {
        let mut message = first.to_string();
        for err in errors.take(MAX_REPORTED_VIOLATIONS - 1) {
            message.push_str("; ");
            message.push_str(&err.to_string());
        }
        return Err(Error::Document(format!("schema violation: {message}")));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> Value {
        json!({
            "meta": {"created_at": "2026-10-19T12:00:00Z"},
            "info": {"model": "BC246T", "firmware": "Version 1.06.00"},
            "settings": {
                "backlight": "KY",
                "battery_save": true,
                "key_beep": false,
                "greeting": ["Hello"],
                "priority_mode": 1
            },
            "systems": [{
                "system_type": "CNV",
                "name": "County Fire",
                "quick_key": 1,
                "sequence_number": 1,
                "groups": [{
                    "group_name": "Dispatch",
                    "quick_key": null,
                    "channels": [
                        {"name": "Main", "frequency": 1544300, "modulation": "NFM"},
                        {"name": "Tac", "frequency": 4531250, "modulation": "FM", "priority": 1}
                    ]
                }]
            }]
        })
    }

    #[test]
    fn sample_is_valid() {
        validate_value(&sample()).unwrap();
    }

    #[test]
    fn decodes_and_counts() {
        let doc: Document = serde_json::from_value(sample()).unwrap();
        assert_eq!(doc.systems.len(), 1);
        assert_eq!(doc.group_count(), 1);
        assert_eq!(doc.channel_count(), 2);
        assert_eq!(doc.settings.backlight, Backlight::Keypress);
        assert_eq!(doc.settings.greeting_lines(), ("Hello", ""));
        assert_eq!(doc.systems[0].fields["name"], "County Fire");
        assert!(!doc.systems[0].fields.contains_key("groups"));
    }

    #[test]
    fn reencodes_to_same_json() {
        let doc: Document = serde_json::from_value(sample()).unwrap();
        assert_eq!(serde_json::to_value(&doc).unwrap(), sample());
        validate(&doc).unwrap();
    }

    #[test]
    fn missing_top_level_section_is_invalid() {
        let mut value = sample();
        value.as_object_mut().unwrap().remove("settings");
        assert!(matches!(validate_value(&value), Err(Error::Document(_))));
    }

    #[test]
    fn wrong_model_is_invalid() {
        let mut value = sample();
        value["info"]["model"] = json!("BCD396T");
        assert!(validate_value(&value).is_err());
    }

    #[test]
    fn frequency_outside_bands_is_invalid() {
        let mut value = sample();
        value["systems"][0]["groups"][0]["channels"][0]["frequency"] = json!(600000);
        assert!(validate_value(&value).is_err());
    }

    #[test]
    fn frequency_off_step_is_invalid() {
        let mut value = sample();
        value["systems"][0]["groups"][0]["channels"][0]["frequency"] = json!(1544301);
        assert!(validate_value(&value).is_err());
    }

    #[test]
    fn long_name_is_invalid() {
        let mut value = sample();
        value["systems"][0]["name"] = json!("Seventeen chars!!");
        assert!(validate_value(&value).is_err());
    }

    #[test]
    fn structural_field_is_invalid() {
        let mut value = sample();
        value["systems"][0]["forward_index"] = json!(4);
        assert!(validate_value(&value).is_err());
    }

    #[test]
    fn too_many_systems_is_invalid() {
        let mut value = sample();
        let system = value["systems"][0].clone();
        value["systems"] = Value::Array(vec![system; 201]);
        assert!(validate_value(&value).is_err());
    }

    #[test]
    fn unknown_top_level_key_is_rejected_on_decode() {
        let mut value = sample();
        value["extra"] = json!(1);
        assert!(Document::from_json(&value.to_string()).is_err());
    }
}
