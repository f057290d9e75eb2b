//! Default elision for exported records.
//!
//! A portable document only carries the fields a record does not share with
//! the factory defaults. [`DefaultTable::strip`] removes fields equal to
//! their default on export; [`DefaultTable::fill`] restores absent fields
//! before import. Both work on the JSON field map of a single record.

use serde_json::{Map, Value};

/// A default value in a [`DefaultTable`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DefaultValue {
    Null,
    Bool(bool),
    Int(i64),
    Text(&'static str),
}

impl DefaultValue {
    pub fn to_value(self) -> Value {
        match self {
            DefaultValue::Null => Value::Null,
            DefaultValue::Bool(b) => Value::Bool(b),
            DefaultValue::Int(n) => Value::from(n),
            DefaultValue::Text(s) => Value::from(s),
        }
    }

    fn matches(self, value: &Value) -> bool {
        match (self, value) {
            (DefaultValue::Null, Value::Null) => true,
            (DefaultValue::Bool(a), Value::Bool(b)) => a == *b,
            (DefaultValue::Int(a), Value::Number(b)) => b.as_i64() == Some(a),
            (DefaultValue::Text(a), Value::String(b)) => a == b,
            _ => false,
        }
    }
}

/// Immutable field-to-default table for one record kind.
#[derive(Debug, Clone, Copy)]
pub struct DefaultTable {
    fields: &'static [(&'static str, DefaultValue)],
}

pub const SYSTEM_DEFAULTS: DefaultTable = DefaultTable {
    fields: &[
        ("quick_key", DefaultValue::Null),
        ("hold_time", DefaultValue::Int(2)),
        ("lockout", DefaultValue::Bool(false)),
        ("attenuation", DefaultValue::Bool(false)),
        ("delay_time", DefaultValue::Int(2)),
        ("data_skip", DefaultValue::Bool(false)),
        ("emergency_alert", DefaultValue::Bool(false)),
    ],
};

pub const GROUP_DEFAULTS: DefaultTable = DefaultTable {
    fields: &[
        ("group_type", DefaultValue::Text("C")),
        ("quick_key", DefaultValue::Null),
        ("lockout", DefaultValue::Bool(false)),
    ],
};

pub const CHANNEL_DEFAULTS: DefaultTable = DefaultTable {
    fields: &[
        ("search_step", DefaultValue::Int(0)),
        ("ctcss_dcs_mode", DefaultValue::Int(0)),
        ("ctcss_dcs_tone_lockout", DefaultValue::Bool(false)),
        ("lockout", DefaultValue::Bool(false)),
        ("priority", DefaultValue::Int(0)),
        ("attenuation", DefaultValue::Bool(false)),
        ("alert", DefaultValue::Bool(false)),
    ],
};

impl DefaultTable {
    /// Default for `field`, if the table has one.
    pub fn get(&self, field: &str) -> Option<DefaultValue> {
        self.fields
            .iter()
            .find(|(name, _)| *name == field)
            .map(|(_, default)| *default)
    }

    /// Copy of `fields` without the entries equal to their default.
    pub fn strip(&self, fields: &Map<String, Value>) -> Map<String, Value> {
        fields
            .iter()
            .filter(|(name, value)| !self.get(name).is_some_and(|d| d.matches(value)))
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect()
    }

    /// Copy of `fields` with every absent defaulted field inserted.
    pub fn fill(&self, fields: &Map<String, Value>) -> Map<String, Value> {
        let mut filled = fields.clone();
        for (name, default) in self.fields {
            if !filled.contains_key(*name) {
                filled.insert((*name).to_string(), default.to_value());
            }
        }
        filled
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn map(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(m) => m,
            other => panic!("not an object: {other}"),
        }
    }

    #[test]
    fn strip_removes_only_default_values() {
        let system = map(json!({
            "system_type": "CNV",
            "name": "Police",
            "quick_key": null,
            "hold_time": 2,
            "lockout": true,
            "delay_time": 3,
            "data_skip": false,
        }));
        let stripped = SYSTEM_DEFAULTS.strip(&system);
        assert_eq!(
            Value::Object(stripped),
            json!({
                "system_type": "CNV",
                "name": "Police",
                "lockout": true,
                "delay_time": 3,
            })
        );
    }

    #[test]
    fn fill_restores_absent_defaults_without_overwriting() {
        let group = map(json!({"group_name": "Tac", "lockout": true}));
        let filled = GROUP_DEFAULTS.fill(&group);
        assert_eq!(
            Value::Object(filled),
            json!({"group_name": "Tac", "lockout": true, "group_type": "C", "quick_key": null})
        );
    }

    #[test]
    fn group_without_quick_key_drops_the_field() {
        let group = map(json!({"group_name": "Ops", "quick_key": null, "group_sequence": 10}));
        assert_eq!(
            Value::Object(GROUP_DEFAULTS.strip(&group)),
            json!({"group_name": "Ops", "group_sequence": 10})
        );
        assert_eq!(GROUP_DEFAULTS.get("quick_key"), Some(DefaultValue::Null));
    }

    #[test]
    fn type_mismatch_is_not_a_default() {
        let channel = map(json!({"priority": "0", "lockout": 0}));
        assert_eq!(CHANNEL_DEFAULTS.strip(&channel).len(), 2);
    }

    #[test]
    fn strip_fill_strip_is_stable() {
        let cases = [
            (
                SYSTEM_DEFAULTS,
                json!({"name": "A", "quick_key": 1, "hold_time": 2, "attenuation": true}),
            ),
            (
                GROUP_DEFAULTS,
                json!({"group_name": "G", "group_type": "T", "lockout": false}),
            ),
            (
                CHANNEL_DEFAULTS,
                json!({"name": "C", "frequency": 1544300, "priority": 1, "alert": false}),
            ),
        ];
        for (table, record) in cases {
            let once = table.strip(&map(record));
            let again = table.strip(&table.fill(&once));
            assert_eq!(again, once);
        }
    }

    #[test]
    fn lookup() {
        assert_eq!(SYSTEM_DEFAULTS.get("delay_time"), Some(DefaultValue::Int(2)));
        assert_eq!(SYSTEM_DEFAULTS.get("name"), None);
        assert_eq!(DefaultValue::Text("C").to_value(), json!("C"));
    }
}
