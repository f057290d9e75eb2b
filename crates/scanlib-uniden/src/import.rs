//! Import: materialize a [`Document`] into scanner memory.
//!
//! The document is decoded completely before the scanner is touched: every
//! node's omitted fields are filled from the default tables and the result
//! is checked against the record types. Then, inside Program Mode, memory
//! is cleared (optional), device settings are written, and each system,
//! group and channel is created and written in document order.
//!
//! Quick keys and sequence numbers are positional. The n-th system gets
//! sequence number n and, for n up to 9, quick key n; the same holds for
//! groups within their system. Channels have neither. Values carried by the
//! document for these fields are ignored.
//!
//! Import is not transactional. A failure part way leaves what was already
//! written; by default the next attempt starts by clearing memory.

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use scanlib_core::{Error, Index, QuickKey, Result};

use crate::defaults::{DefaultTable, CHANNEL_DEFAULTS, GROUP_DEFAULTS, SYSTEM_DEFAULTS};
use crate::document::{self, DeviceInfo, DeviceSettings, Document};
use crate::memory::{ChannelSettings, GroupSettings, SystemSettings};
use crate::scanner::Scanner;
use crate::types::{GroupType, KeyCode, KeyMode, SystemType};

/// Options for [`import`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportOptions {
    /// Erase all memory before writing.
    pub clear_memory: bool,
    /// Check the document against the bundled schema first.
    pub validate: bool,
    /// Press Scan after leaving Program Mode.
    pub resume_scanning: bool,
}

impl Default for ImportOptions {
    fn default() -> Self {
        ImportOptions {
            clear_memory: true,
            validate: true,
            resume_scanning: true,
        }
    }
}

/// Where a system or group ended up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placement {
    /// Index assigned by the scanner.
    pub index: Index,
    /// 1-based position among its siblings.
    pub sequence_number: usize,
    /// Quick key written with the record.
    pub quick_key: Option<QuickKey>,
}

/// What [`import`] wrote.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportReport {
    pub systems: Vec<Placement>,
    pub groups: Vec<Placement>,
    pub channels: Vec<Index>,
}

/// How a document's origin compares to the connected scanner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Compatibility {
    /// Same model and firmware.
    Match,
    /// Same model, different firmware. Usually safe to proceed.
    FirmwareMismatch { device: String, document: String },
    /// Different model. The document does not apply.
    ModelMismatch { device: String, document: String },
}

/// Compare the connected scanner with the scanner a document came from.
pub fn check_compatibility(device: &DeviceInfo, document: &DeviceInfo) -> Compatibility {
    if device.model != document.model {
        Compatibility::ModelMismatch {
            device: device.model.clone(),
            document: document.model.clone(),
        }
    } else if device.firmware != document.firmware {
        Compatibility::FirmwareMismatch {
            device: device.firmware.clone(),
            document: document.firmware.clone(),
        }
    } else {
        Compatibility::Match
    }
}

#[derive(Debug, Deserialize)]
struct SystemTemplate {
    system_type: SystemType,
    #[serde(flatten)]
    settings: SystemSettings,
}

#[derive(Debug, Deserialize)]
struct GroupTemplate {
    group_type: GroupType,
    #[serde(flatten)]
    settings: GroupSettings,
}

#[derive(Debug)]
struct SystemPlan {
    system_type: SystemType,
    settings: SystemSettings,
    groups: Vec<GroupPlan>,
}

#[derive(Debug)]
struct GroupPlan {
    group_type: GroupType,
    settings: GroupSettings,
    channels: Vec<ChannelSettings>,
}

fn decode<T: DeserializeOwned>(
    fields: &Map<String, Value>,
    defaults: &DefaultTable,
    path: &str,
) -> Result<T> {
    serde_json::from_value(Value::Object(defaults.fill(fields)))
        .map_err(|e| Error::Document(format!("{path}: {e}")))
}

fn plan(document: &Document) -> Result<Vec<SystemPlan>> {
    document
        .systems
        .iter()
        .enumerate()
        .map(|(s, system)| {
            let path = format!("systems[{s}]");
            let template: SystemTemplate = decode(&system.fields, &SYSTEM_DEFAULTS, &path)?;
            let groups = system
                .groups
                .iter()
                .enumerate()
                .map(|(g, group)| {
                    let path = format!("{path}.groups[{g}]");
                    let template: GroupTemplate = decode(&group.fields, &GROUP_DEFAULTS, &path)?;
                    let channels = group
                        .channels
                        .iter()
                        .enumerate()
                        .map(|(c, channel)| {
                            decode(
                                &channel.fields,
                                &CHANNEL_DEFAULTS,
                                &format!("{path}.channels[{c}]"),
                            )
                        })
                        .collect::<Result<Vec<ChannelSettings>>>()?;
                    Ok(GroupPlan {
                        group_type: template.group_type,
                        settings: GroupSettings {
                            quick_key: QuickKey::for_position(g + 1),
                            ..template.settings
                        },
                        channels,
                    })
                })
                .collect::<Result<Vec<_>>>()?;
            Ok(SystemPlan {
                system_type: template.system_type,
                settings: SystemSettings {
                    quick_key: QuickKey::for_position(s + 1),
                    ..template.settings
                },
                groups,
            })
        })
        .collect()
}

/// Write a [`Document`] into the scanner.
///
/// Validation and decoding happen before any command is sent. Program Mode
/// is exited whether or not writing succeeds. A failure to resume scanning
/// afterwards is logged, not returned.
pub async fn import(
    scanner: &Scanner,
    document: &Document,
    options: &ImportOptions,
) -> Result<ImportReport> {
    if options.validate {
        document::validate(document)?;
    }
    let max_systems = scanner.model().max_systems;
    if document.systems.len() > max_systems {
        return Err(Error::InvalidParameter(format!(
            "document has {} systems, the scanner holds at most {max_systems}",
            document.systems.len()
        )));
    }
    let plans = plan(document)?;

    scanner.enter_program_mode().await?;
    let body = materialize(scanner, &document.settings, &plans, options).await;
    let report = scanner.finish_program_session(body).await?;

    if options.resume_scanning {
        if let Err(e) = scanner.push_key(KeyCode::Scan, KeyMode::Press).await {
            warn!(error = %e, "memory written, but scanning did not resume");
        }
    }

    info!(
        systems = report.systems.len(),
        groups = report.groups.len(),
        channels = report.channels.len(),
        "import complete"
    );
    Ok(report)
}

/// Write device-wide settings. Requires Program Mode.
pub async fn apply_settings(scanner: &Scanner, settings: &DeviceSettings) -> Result<()> {
    let (line1, line2) = settings.greeting_lines();
    scanner.set_backlight(settings.backlight).await?;
    scanner.set_battery_save(settings.battery_save).await?;
    scanner.set_key_beep(settings.key_beep).await?;
    scanner.set_greeting(line1, line2).await?;
    scanner.set_priority_mode(settings.priority_mode).await
}

async fn materialize(
    scanner: &Scanner,
    settings: &DeviceSettings,
    plans: &[SystemPlan],
    options: &ImportOptions,
) -> Result<ImportReport> {
    if options.clear_memory {
        scanner.clear_memory().await?;
    }
    apply_settings(scanner, settings).await?;

    let mut report = ImportReport::default();
    for (s, system) in plans.iter().enumerate() {
        let system_index = scanner.create_system(system.system_type).await?;
        scanner
            .set_system_info(system_index, &system.settings)
            .await?;
        report.systems.push(Placement {
            index: system_index,
            sequence_number: s + 1,
            quick_key: system.settings.quick_key,
        });
        info!(
            position = s + 1,
            index = %system_index,
            name = %system.settings.name,
            "imported system"
        );

        for (g, group) in system.groups.iter().enumerate() {
            let group_index = scanner.append_group(system_index, group.group_type).await?;
            scanner.set_group_info(group_index, &group.settings).await?;
            report.groups.push(Placement {
                index: group_index,
                sequence_number: g + 1,
                quick_key: group.settings.quick_key,
            });
            debug!(
                index = %group_index,
                name = %group.settings.group_name,
                channels = group.channels.len(),
                "imported group"
            );

            for channel in &group.channels {
                let channel_index = scanner.append_channel(group_index).await?;
                scanner.set_channel_info(channel_index, channel).await?;
                report.channels.push(channel_index);
            }
        }
    }
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::ScannerBuilder;
    use crate::export::{export, ExportOptions};
    use crate::models::bc246t;
    use scanlib_test_harness::{MockTransport, SimulatedScanner};
    use serde_json::json;

    async fn scanner_for(sim: &SimulatedScanner) -> Scanner {
        ScannerBuilder::new(bc246t())
            .build_with_transport(Box::new(sim.clone()))
            .await
            .unwrap()
    }

    fn settings_json() -> Value {
        json!({
            "backlight": "30",
            "battery_save": true,
            "key_beep": false,
            "greeting": ["County", "Scanner"],
            "priority_mode": 1
        })
    }

    fn document(systems: Value) -> Document {
        serde_json::from_value(json!({
            "info": {"model": "BC246T", "firmware": "Version 1.06.00"},
            "settings": settings_json(),
            "systems": systems
        }))
        .unwrap()
    }

    fn cnv_document() -> Document {
        document(json!([{
            "system_type": "CNV",
            "name": "County Fire",
            "quick_key": 1,
            "sequence_number": 1,
            "lockout": false,
            "groups": [{
                "group_name": "Dispatch",
                "quick_key": 1,
                "group_sequence": 1,
                "channels": [
                    {"name": "Main", "frequency": 1544300, "modulation": "NFM"},
                    {"name": "Tac 2", "frequency": 4531250, "modulation": "FM",
                     "priority": 1, "lockout": false}
                ]
            }]
        }]))
    }

    #[tokio::test]
    async fn one_system_round_trips_modulo_defaults() {
        let sim = SimulatedScanner::new();
        let scanner = scanner_for(&sim).await;
        let input = cnv_document();

        import(&scanner, &input, &ImportOptions::default())
            .await
            .unwrap();
        let output = export(&scanner, &ExportOptions::default()).await.unwrap();

        let expected = document(json!([{
            "system_type": "CNV",
            "name": "County Fire",
            "quick_key": 1,
            "sequence_number": 1,
            "groups": [{
                "group_name": "Dispatch",
                "quick_key": 1,
                "group_sequence": 1,
                "channels": [
                    {"name": "Main", "frequency": 1544300, "modulation": "NFM"},
                    {"name": "Tac 2", "frequency": 4531250, "modulation": "FM", "priority": 1}
                ]
            }]
        }]));
        assert_eq!(output.systems, expected.systems);
        assert_eq!(output.settings, input.settings);
        assert_eq!(output.info, input.info);
    }

    #[tokio::test]
    async fn eleven_systems_get_nine_quick_keys() {
        let sim = SimulatedScanner::new();
        let scanner = scanner_for(&sim).await;
        let systems: Vec<Value> = (1..=11)
            .map(|n| json!({"system_type": "CNV", "name": format!("System {n}")}))
            .collect();

        let report = import(&scanner, &document(Value::Array(systems)), &ImportOptions::default())
            .await
            .unwrap();

        let expected: Vec<Option<u8>> = (1..=11u8).map(|n| (n <= 9).then_some(n)).collect();
        assert_eq!(sim.system_quick_keys(), expected);
        assert_eq!(report.systems[9].quick_key, None);
        assert_eq!(report.systems[10].sequence_number, 11);
        assert_eq!(report.systems[8].quick_key, QuickKey::new(9));
    }

    #[tokio::test]
    async fn group_positions_restart_per_system() {
        let sim = SimulatedScanner::new();
        let scanner = scanner_for(&sim).await;
        let doc = document(json!([
            {"system_type": "CNV", "name": "A", "groups": [{"group_name": "A1"}, {"group_name": "A2"}]},
            {"system_type": "LTR", "name": "B", "groups": [{"group_name": "B1", "group_type": "T"}]}
        ]));

        let report = import(&scanner, &doc, &ImportOptions::default())
            .await
            .unwrap();
        let positions: Vec<_> = report
            .groups
            .iter()
            .map(|p| (p.sequence_number, p.quick_key.map(|k| k.get())))
            .collect();
        assert_eq!(positions, vec![(1, Some(1)), (2, Some(2)), (1, Some(1))]);

        let exported = export(&scanner, &ExportOptions::default()).await.unwrap();
        assert_eq!(exported.systems[1].groups[0].fields["group_type"], "T");
    }

    #[tokio::test]
    async fn import_clears_existing_memory() {
        let sim = SimulatedScanner::new();
        sim.handle_line("PRG");
        sim.handle_line("CSY,CNV");
        sim.handle_line("CSY,CNV");
        sim.handle_line("EPG");
        let scanner = scanner_for(&sim).await;

        import(&scanner, &cnv_document(), &ImportOptions::default())
            .await
            .unwrap();
        assert_eq!(sim.system_count(), 1);
        assert!(!sim.is_program_mode());
        assert_eq!(sim.received_lines().last().map(String::as_str), Some("KEY,S,P"));
    }

    #[tokio::test]
    async fn keep_memory_appends() {
        let sim = SimulatedScanner::new();
        sim.handle_line("PRG");
        sim.handle_line("CSY,CNV");
        sim.handle_line("EPG");
        let scanner = scanner_for(&sim).await;
        let options = ImportOptions {
            clear_memory: false,
            validate: true,
            resume_scanning: false,
        };

        import(&scanner, &cnv_document(), &options).await.unwrap();
        assert_eq!(sim.system_count(), 2);
        assert!(!sim.received_lines().iter().any(|l| l == "CLR" || l.starts_with("KEY")));
    }

    #[tokio::test]
    async fn failed_resume_does_not_fail_a_written_import() {
        let mut mock = MockTransport::new();
        mock.expect(b"PRG\r", b"PRG,OK\r");
        mock.expect(b"CLR\r", b"CLR,OK\r");
        mock.expect(b"BLT,30\r", b"BLT,OK\r");
        mock.expect(b"BSV,1\r", b"BSV,OK\r");
        mock.expect(b"KBP,0\r", b"KBP,OK\r");
        mock.expect(b"OMS,County,Scanner\r", b"OMS,OK\r");
        mock.expect(b"PRI,1\r", b"PRI,OK\r");
        mock.expect(b"EPG\r", b"EPG,OK\r");
        mock.expect(b"KEY,S,P\r", b"KEY,NG\r");
        let scanner = ScannerBuilder::new(bc246t())
            .build_with_transport(Box::new(mock))
            .await
            .unwrap();

        let report = import(&scanner, &document(json!([])), &ImportOptions::default())
            .await
            .unwrap();
        assert!(report.systems.is_empty());
    }

    #[tokio::test]
    async fn memory_exhaustion_stops_import_and_exits_program_mode() {
        let sim = SimulatedScanner::new();
        sim.set_capacity(3);
        let scanner = scanner_for(&sim).await;

        let result = import(&scanner, &cnv_document(), &ImportOptions::default()).await;
        assert!(matches!(result, Err(Error::OutOfResources)));
        assert!(!sim.is_program_mode());
        assert_eq!(sim.record_count(), 3);
    }

    #[tokio::test]
    async fn invalid_document_sends_nothing() {
        let mock = MockTransport::new();
        let scanner = ScannerBuilder::new(bc246t())
            .build_with_transport(Box::new(mock))
            .await
            .unwrap();
        let doc = document(json!([{"system_type": "CNV", "name": "A", "hold_time": 300}]));

        let result = import(&scanner, &doc, &ImportOptions::default()).await;
        assert!(matches!(result, Err(Error::Document(_))));
    }

    #[tokio::test]
    async fn undecodable_node_fails_before_program_mode_without_validation() {
        let sim = SimulatedScanner::new();
        let scanner = scanner_for(&sim).await;
        let doc = document(json!([{"system_type": "CNV"}]));
        let options = ImportOptions {
            validate: false,
            ..ImportOptions::default()
        };

        let result = import(&scanner, &doc, &options).await;
        match result {
            Err(Error::Document(message)) => assert!(message.starts_with("systems[0]")),
            other => panic!("expected Document error, got {other:?}"),
        }
        assert!(sim.received_lines().is_empty());
    }

    #[test]
    fn compatibility_verdicts() {
        let device = DeviceInfo {
            model: "BC246T".into(),
            firmware: "Version 1.06.00".into(),
        };
        assert_eq!(check_compatibility(&device, &device), Compatibility::Match);

        let newer = DeviceInfo {
            firmware: "Version 1.07.00".into(),
            ..device.clone()
        };
        assert!(matches!(
            check_compatibility(&device, &newer),
            Compatibility::FirmwareMismatch { .. }
        ));

        let other = DeviceInfo {
            model: "BCD396T".into(),
            ..device.clone()
        };
        assert!(matches!(
            check_compatibility(&device, &other),
            Compatibility::ModelMismatch { .. }
        ));
    }
}
