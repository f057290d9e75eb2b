//! Uniden scanner model definitions.
//!
//! Each supported scanner is described by a [`ScannerModel`]. Models are
//! defined as factory functions (e.g. [`bc246t()`]).
//!
//! | Model  | Baud  | Systems | Memory blocks |
//! |--------|-------|---------|---------------|
//! | BC246T | 57600 | 200     | 2500          |

/// Longest name the scanner stores for a system, group or channel.
pub const NAME_MAX_LEN: usize = 16;

/// Longest line of the power-on greeting.
pub const GREETING_LINE_MAX_LEN: usize = 16;

/// Static model definition for a Uniden scanner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScannerModel {
    /// Human-readable model name.
    pub name: &'static str,
    /// Model identifier as reported by the `MDL` command.
    pub model_id: &'static str,
    /// Factory default serial baud rate.
    pub default_baud_rate: u32,
    /// Maximum number of System records.
    pub max_systems: usize,
    /// Total memory blocks shared by systems, groups and channels.
    ///
    /// Also the hop bound when walking group and channel chains, whose
    /// length the scanner does not report.
    pub memory_capacity: usize,
}

/// Uniden BC246T handheld trunking scanner.
pub fn bc246t() -> ScannerModel {
    ScannerModel {
        name: "BC246T",
        model_id: "BC246T",
        default_baud_rate: 57600,
        max_systems: 200,
        memory_capacity: 2500,
    }
}

/// Every supported model.
pub fn all_models() -> Vec<ScannerModel> {
    vec![bc246t()]
}

/// Look up a model by the identifier the scanner reports.
pub fn model_by_id(model_id: &str) -> Option<ScannerModel> {
    all_models().into_iter().find(|m| m.model_id == model_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bc246t_definition() {
        let m = bc246t();
        assert_eq!(m.model_id, "BC246T");
        assert_eq!(m.default_baud_rate, 57600);
        assert!(m.memory_capacity > m.max_systems);
    }

    #[test]
    fn lookup_by_reported_id() {
        assert_eq!(model_by_id("BC246T"), Some(bc246t()));
        assert_eq!(model_by_id("BCD396T"), None);
    }
}
