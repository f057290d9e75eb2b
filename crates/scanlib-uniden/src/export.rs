//! Export: project scanner memory into a [`Document`].
//!
//! The system list is walked from its head, and within each system its
//! group list, and within each group its channel list, always following
//! `forward_index`. Each record becomes a document node holding its
//! semantic fields; structural fields are dropped and, unless asked
//! otherwise, fields equal to their factory default are elided.
//!
//! Walks are bounded. The system list may not be longer than the scanner's
//! system count, and group and channel lists may not be longer than the
//! model's memory capacity. Every record must link back to the one visited
//! before it, systems and groups must carry strictly increasing sequence
//! numbers, and the last record visited must be the list's tail. Any
//! violation is an [`Error::InconsistentChain`].

use chrono::{SecondsFormat, Utc};
use serde_json::{Map, Value};
use tracing::{debug, info};

use scanlib_core::{Error, Index, Result};

use crate::defaults::{DefaultTable, CHANNEL_DEFAULTS, GROUP_DEFAULTS, SYSTEM_DEFAULTS};
use crate::document::{
    self, ChannelNode, DeviceInfo, DeviceSettings, Document, GroupNode, SystemNode,
};
use crate::memory::{ChainRecord, ChainScope, GroupRecord, SystemRecord};
use crate::scanner::Scanner;

/// Options for [`export`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportOptions {
    /// Keep fields that equal their factory default.
    pub include_defaults: bool,
    /// Check the finished document against the bundled schema.
    pub validate: bool,
}

impl Default for ExportOptions {
    fn default() -> Self {
        ExportOptions {
            include_defaults: false,
            validate: true,
        }
    }
}

/// Bounded walk along one linked list.
///
/// Feed it each fetched record with [`advance`](Self::advance); it yields
/// the next index to fetch and checks the list's shape as it goes.
#[derive(Debug)]
pub struct ChainWalker {
    scope: ChainScope,
    next: Option<Index>,
    previous: Option<Index>,
    last_sequence: Option<u32>,
    visited: usize,
    bound: usize,
}

impl ChainWalker {
    /// Start at `head`, allowing at most `bound` records.
    pub fn new(scope: ChainScope, head: Option<Index>, bound: usize) -> Self {
        ChainWalker {
            scope,
            next: head,
            previous: None,
            last_sequence: None,
            visited: 0,
            bound,
        }
    }

    /// Index of the next record to fetch, or `None` at the end of the list.
    pub fn next_index(&self) -> Result<Option<Index>> {
        let Some(index) = self.next else {
            return Ok(None);
        };
        if self.visited >= self.bound {
            return Err(Error::InconsistentChain(format!(
                "{} does not end within {} records (next is {index})",
                self.scope, self.bound
            )));
        }
        Ok(Some(index))
    }

    /// Record that `record` was fetched and move past it.
    pub fn advance<R: ChainRecord>(&mut self, record: &R) -> Result<()> {
        if record.reverse_index() != self.previous {
            return Err(Error::InconsistentChain(format!(
                "{} {} in {} links back to {}, expected {}",
                R::KIND,
                record.index(),
                self.scope,
                Index::link_to_wire(record.reverse_index()),
                Index::link_to_wire(self.previous),
            )));
        }
        if let (Some(last), Some(sequence)) = (self.last_sequence, record.sequence()) {
            if sequence <= last {
                return Err(Error::InconsistentChain(format!(
                    "{} {} in {} has sequence number {sequence}, not above {last}",
                    R::KIND,
                    record.index(),
                    self.scope,
                )));
            }
        }
        self.last_sequence = record.sequence();
        self.previous = Some(record.index());
        self.next = record.forward_index();
        self.visited += 1;
        Ok(())
    }

    /// Check that the walk ended on `tail` and return the number of records
    /// visited.
    pub fn finish(self, tail: Option<Index>) -> Result<usize> {
        if self.previous != tail {
            return Err(Error::InconsistentChain(format!(
                "{} ends at {}, but its tail is {}",
                self.scope,
                Index::link_to_wire(self.previous),
                Index::link_to_wire(tail),
            )));
        }
        Ok(self.visited)
    }
}

/// Turn a record into document fields.
///
/// Structural fields are removed. Defaulted fields are elided unless
/// `include_defaults` is set.
pub fn record_fields<R: ChainRecord>(
    record: &R,
    defaults: &DefaultTable,
    include_defaults: bool,
) -> Result<Map<String, Value>> {
    let value = serde_json::to_value(record)
        .map_err(|e| Error::Document(format!("cannot encode {}: {e}", R::KIND)))?;
    let Value::Object(mut fields) = value else {
        return Err(Error::Document(format!("{} did not encode as an object", R::KIND)));
    };
    for name in R::STRUCTURAL_FIELDS {
        fields.remove(*name);
    }
    if include_defaults {
        Ok(fields)
    } else {
        Ok(defaults.strip(&fields))
    }
}

/// Read the whole scanner into a [`Document`].
///
/// Identity is read first, then Program Mode is entered for settings and
/// memory. Program Mode is exited whether or not the walk succeeds.
pub async fn export(scanner: &Scanner, options: &ExportOptions) -> Result<Document> {
    let info = read_device_info(scanner).await?;

    scanner.enter_program_mode().await?;
    let body = async {
        let settings = read_settings(scanner).await?;
        let systems = project_systems(scanner, options).await?;
        Ok::<_, Error>((settings, systems))
    }
    .await;
    let (settings, systems) = scanner.finish_program_session(body).await?;

    let mut meta = Map::new();
    meta.insert(
        "created_at".to_string(),
        Value::String(Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)),
    );

    let document = Document {
        meta: Some(meta),
        info,
        settings,
        systems,
    };
    if options.validate {
        document::validate(&document)?;
    }

    info!(
        systems = document.systems.len(),
        groups = document.group_count(),
        channels = document.channel_count(),
        "export complete"
    );
    Ok(document)
}

/// Read the scanner's model and firmware version.
pub async fn read_device_info(scanner: &Scanner) -> Result<DeviceInfo> {
    Ok(DeviceInfo {
        model: scanner.model_name().await?,
        firmware: scanner.firmware_version().await?,
    })
}

/// Read the device-wide settings. Requires Program Mode.
pub async fn read_settings(scanner: &Scanner) -> Result<DeviceSettings> {
    let (line1, line2) = scanner.greeting().await?;
    Ok(DeviceSettings {
        backlight: scanner.backlight().await?,
        battery_save: scanner.battery_save().await?,
        key_beep: scanner.key_beep().await?,
        greeting: vec![line1, line2],
        priority_mode: scanner.priority_mode().await?,
    })
}

/// Walk the system list into document nodes. Requires Program Mode.
pub async fn project_systems(
    scanner: &Scanner,
    options: &ExportOptions,
) -> Result<Vec<SystemNode>> {
    let count = scanner.system_count().await?;
    let head = scanner.head_index(ChainScope::Systems).await?;
    let tail = scanner.tail_index(ChainScope::Systems).await?;

    let mut walker = ChainWalker::new(ChainScope::Systems, head, count);
    let mut nodes = Vec::with_capacity(count);
    while let Some(index) = walker.next_index()? {
        let system = scanner.system_info(index).await?;
        walker.advance(&system)?;
        debug!(index = %index, name = %system.settings.name, "system");

        let groups = project_groups(scanner, &system, options).await?;
        nodes.push(SystemNode {
            fields: record_fields(&system, &SYSTEM_DEFAULTS, options.include_defaults)?,
            groups,
        });
    }

    let visited = walker.finish(tail)?;
    if visited != count {
        return Err(Error::InconsistentChain(format!(
            "system list has {visited} records, but the scanner counts {count}"
        )));
    }
    Ok(nodes)
}

async fn project_groups(
    scanner: &Scanner,
    system: &SystemRecord,
    options: &ExportOptions,
) -> Result<Vec<GroupNode>> {
    let scope = ChainScope::Groups(system.index);
    let mut walker = ChainWalker::new(
        scope,
        system.group_head_index,
        scanner.model().memory_capacity,
    );
    let mut nodes = Vec::new();
    while let Some(index) = walker.next_index()? {
        let group = scanner.group_info(index).await?;
        walker.advance(&group)?;
        debug!(index = %index, name = %group.settings.group_name, "group");

        let channels = project_channels(scanner, &group, options).await?;
        nodes.push(GroupNode {
            fields: record_fields(&group, &GROUP_DEFAULTS, options.include_defaults)?,
            channels,
        });
    }
    walker.finish(system.group_tail_index)?;
    Ok(nodes)
}

async fn project_channels(
    scanner: &Scanner,
    group: &GroupRecord,
    options: &ExportOptions,
) -> Result<Vec<ChannelNode>> {
    let scope = ChainScope::Channels(group.index);
    let mut walker = ChainWalker::new(
        scope,
        group.channel_head_index,
        scanner.model().memory_capacity,
    );
    let mut nodes = Vec::new();
    while let Some(index) = walker.next_index()? {
        let channel = scanner.channel_info(index).await?;
        walker.advance(&channel)?;
        nodes.push(ChannelNode {
            fields: record_fields(&channel, &CHANNEL_DEFAULTS, options.include_defaults)?,
        });
    }
    walker.finish(group.channel_tail_index)?;
    Ok(nodes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::ScannerBuilder;
    use crate::memory::{ChannelRecord, ChannelSettings, SystemSettings};
    use crate::models::bc246t;
    use crate::types::{Modulation, SystemType};
    use scanlib_core::Frequency;
    use scanlib_test_harness::SimulatedScanner;
    use serde_json::json;

    async fn scanner_for(sim: &SimulatedScanner) -> Scanner {
        ScannerBuilder::new(bc246t())
            .build_with_transport(Box::new(sim.clone()))
            .await
            .unwrap()
    }

    /// Three systems; the second with one group of two channels.
    fn populated() -> SimulatedScanner {
        let sim = SimulatedScanner::new();
        for line in [
            "PRG",
            "CSY,CNV",
            "SIN,1,Alpha,1,2,0,0,2,0,0",
            "CSY,LTR",
            "SIN,2,Bravo,2,5,0,0,2,0,0",
            "AGC,2",
            "GIN,3,Ops,.,0",
            "ACC,3",
            "CIN,4,Main,01544300,0,NFM,0,0,0,0,0,0",
            "ACC,3",
            "CIN,5,Tac,04531250,0,FM,0,0,0,1,0,0",
            "CSY,CNV",
            "SIN,6,Charlie,3,2,0,0,2,0,0",
            "EPG",
        ] {
            let reply = sim.handle_line(line);
            assert!(!reply.ends_with("ERR") && !reply.ends_with("NG"), "{line} -> {reply}");
        }
        sim
    }

    fn channel(index: u32, reverse: Option<u32>, forward: Option<u32>) -> ChannelRecord {
        ChannelRecord {
            index: Index::new(index),
            settings: ChannelSettings {
                name: "x".into(),
                frequency: Frequency::from_units(1_544_300),
                search_step: 0,
                modulation: Modulation::Auto,
                ctcss_dcs_mode: 0,
                ctcss_dcs_tone_lockout: false,
                lockout: false,
                priority: 0,
                attenuation: false,
                alert: false,
            },
            reverse_index: reverse.map(Index::new),
            forward_index: forward.map(Index::new),
            system_index: Index::new(1),
            group_index: Index::new(2),
        }
    }

    fn system(index: u32, reverse: Option<u32>, forward: Option<u32>, sequence: u32) -> SystemRecord {
        SystemRecord {
            index: Index::new(index),
            system_type: SystemType::Conventional,
            settings: SystemSettings {
                name: "x".into(),
                quick_key: None,
                hold_time: 2,
                lockout: false,
                attenuation: false,
                delay_time: 2,
                data_skip: false,
                emergency_alert: false,
            },
            reverse_index: reverse.map(Index::new),
            forward_index: forward.map(Index::new),
            group_head_index: None,
            group_tail_index: None,
            sequence_number: sequence,
        }
    }

    // ---------------------------------------------------------------
    // ChainWalker
    // ---------------------------------------------------------------

    #[test]
    fn walker_rejects_repeated_sequence_number() {
        let mut walker = ChainWalker::new(ChainScope::Systems, Some(Index::new(2)), 5);
        walker.advance(&system(2, None, Some(3), 1)).unwrap();
        walker.advance(&system(3, Some(2), Some(4), 2)).unwrap();
        let result = walker.advance(&system(4, Some(3), None, 2));
        assert!(matches!(result, Err(Error::InconsistentChain(_))));
    }

    #[test]
    fn walker_accepts_gaps_in_sequence_numbers() {
        let mut walker = ChainWalker::new(ChainScope::Systems, Some(Index::new(2)), 5);
        walker.advance(&system(2, None, Some(3), 1)).unwrap();
        walker.advance(&system(3, Some(2), None, 5)).unwrap();
        assert_eq!(walker.finish(Some(Index::new(3))).unwrap(), 2);
    }

    #[test]
    fn walker_follows_a_well_formed_list() {
        let scope = ChainScope::Channels(Index::new(2));
        let mut walker = ChainWalker::new(scope, Some(Index::new(10)), 5);
        assert_eq!(walker.next_index().unwrap(), Some(Index::new(10)));
        walker.advance(&channel(10, None, Some(11))).unwrap();
        assert_eq!(walker.next_index().unwrap(), Some(Index::new(11)));
        walker.advance(&channel(11, Some(10), None)).unwrap();
        assert_eq!(walker.next_index().unwrap(), None);
        assert_eq!(walker.finish(Some(Index::new(11))).unwrap(), 2);
    }

    #[test]
    fn walker_rejects_broken_back_link() {
        let scope = ChainScope::Channels(Index::new(2));
        let mut walker = ChainWalker::new(scope, Some(Index::new(10)), 5);
        walker.advance(&channel(10, None, Some(11))).unwrap();
        let result = walker.advance(&channel(11, Some(7), None));
        assert!(matches!(result, Err(Error::InconsistentChain(_))));
    }

    #[test]
    fn walker_rejects_list_longer_than_bound() {
        let scope = ChainScope::Channels(Index::new(2));
        let mut walker = ChainWalker::new(scope, Some(Index::new(10)), 1);
        walker.advance(&channel(10, None, Some(10))).unwrap();
        assert!(matches!(
            walker.next_index(),
            Err(Error::InconsistentChain(_))
        ));
    }

    #[test]
    fn walker_rejects_wrong_tail() {
        let scope = ChainScope::Channels(Index::new(2));
        let mut walker = ChainWalker::new(scope, Some(Index::new(10)), 5);
        walker.advance(&channel(10, None, None)).unwrap();
        assert!(walker.finish(Some(Index::new(12))).is_err());
    }

    #[test]
    fn empty_list_ends_immediately() {
        let walker = ChainWalker::new(ChainScope::Systems, None, 0);
        assert_eq!(walker.next_index().unwrap(), None);
        assert_eq!(walker.finish(None).unwrap(), 0);
    }

    #[test]
    fn record_fields_drop_structure_and_defaults() {
        let fields = record_fields(&channel(10, None, Some(11)), &CHANNEL_DEFAULTS, false).unwrap();
        assert_eq!(
            Value::Object(fields),
            json!({"name": "x", "frequency": 1544300, "modulation": "AUTO"})
        );

        let full = record_fields(&channel(10, None, Some(11)), &CHANNEL_DEFAULTS, true).unwrap();
        assert_eq!(full.len(), 10);
        assert!(!full.contains_key("forward_index"));
        assert!(!full.contains_key("group_index"));
    }

    // ---------------------------------------------------------------
    // Against the simulator
    // ---------------------------------------------------------------

    #[tokio::test]
    async fn export_walks_in_list_order() {
        let sim = populated();
        let scanner = scanner_for(&sim).await;

        let doc = export(&scanner, &ExportOptions::default()).await.unwrap();

        assert_eq!(doc.info.model, "BC246T");
        assert!(doc.meta.as_ref().unwrap().contains_key("created_at"));
        let names: Vec<_> = doc.systems.iter().map(|s| s.fields["name"].clone()).collect();
        assert_eq!(names, vec![json!("Alpha"), json!("Bravo"), json!("Charlie")]);

        let bravo = &doc.systems[1];
        assert_eq!(bravo.fields["system_type"], "LTR");
        assert_eq!(bravo.fields["hold_time"], 5);
        assert_eq!(bravo.fields["sequence_number"], 2);
        assert!(!bravo.fields.contains_key("delay_time"));
        assert_eq!(bravo.groups.len(), 1);
        assert_eq!(
            Value::Object(bravo.groups[0].fields.clone()),
            json!({"group_name": "Ops", "group_sequence": 1})
        );
        let channels = &bravo.groups[0].channels;
        assert_eq!(channels.len(), 2);
        assert_eq!(
            Value::Object(channels[1].fields.clone()),
            json!({"name": "Tac", "frequency": 4531250, "modulation": "FM", "priority": 1})
        );
        assert!(!sim.is_program_mode());
    }

    #[tokio::test]
    async fn export_with_defaults_keeps_every_field() {
        let sim = populated();
        let scanner = scanner_for(&sim).await;
        let options = ExportOptions {
            include_defaults: true,
            validate: true,
        };

        let doc = export(&scanner, &options).await.unwrap();
        let alpha = &doc.systems[0].fields;
        assert_eq!(alpha["delay_time"], 2);
        assert_eq!(alpha["lockout"], false);
        assert!(!alpha.contains_key("forward_index"));
        assert!(!alpha.contains_key("group_head_index"));
    }

    #[tokio::test]
    async fn export_reads_settings() {
        let sim = populated();
        sim.handle_line("PRG");
        sim.handle_line("BLT,SQ");
        sim.handle_line("OMS,Hello,World");
        sim.handle_line("EPG");
        let scanner = scanner_for(&sim).await;

        let doc = export(&scanner, &ExportOptions::default()).await.unwrap();
        assert_eq!(doc.settings.greeting, vec!["Hello", "World"]);
        assert_eq!(doc.settings.backlight, crate::types::Backlight::Squelch);
    }

    #[tokio::test]
    async fn blank_attenuation_exports_as_default() {
        let sim = populated();
        sim.set_blank_attenuation(true);
        let scanner = scanner_for(&sim).await;

        let doc = export(&scanner, &ExportOptions::default()).await.unwrap();
        assert!(!doc.systems[0].fields.contains_key("attenuation"));
    }

    #[tokio::test]
    async fn cyclic_system_list_is_inconsistent() {
        let sim = populated();
        assert!(sim.corrupt_forward_link(6, Some(1)));
        let scanner = scanner_for(&sim).await;

        let result = export(&scanner, &ExportOptions::default()).await;
        assert!(matches!(result, Err(Error::InconsistentChain(_))));
        assert!(!sim.is_program_mode());
    }

    #[tokio::test]
    async fn truncated_channel_list_is_inconsistent() {
        let sim = populated();
        assert!(sim.corrupt_forward_link(4, None));
        let scanner = scanner_for(&sim).await;

        let result = export(&scanner, &ExportOptions::default()).await;
        assert!(matches!(result, Err(Error::InconsistentChain(_))));
    }

    #[tokio::test]
    async fn skipping_forward_link_is_inconsistent() {
        let sim = populated();
        assert!(sim.corrupt_forward_link(1, Some(6)));
        let scanner = scanner_for(&sim).await;

        let result = export(&scanner, &ExportOptions::default()).await;
        assert!(matches!(result, Err(Error::InconsistentChain(_))));
    }

    #[tokio::test]
    async fn empty_memory_exports_no_systems() {
        let sim = SimulatedScanner::new();
        let scanner = scanner_for(&sim).await;
        let doc = export(&scanner, &ExportOptions::default()).await.unwrap();
        assert!(doc.systems.is_empty());
        assert_eq!(doc.settings.greeting, vec!["Uniden", "BC246T"]);
    }

    #[tokio::test]
    async fn export_after_delete_and_create_numbers_by_position() {
        let sim = SimulatedScanner::new();
        for line in ["PRG", "CSY,CNV", "CSY,CNV", "CSY,CNV", "DSY,1", "CSY,CNV", "EPG"] {
            sim.handle_line(line);
        }
        for (index, name) in [(2, "B"), (3, "C"), (4, "D")] {
            sim.handle_line("PRG");
            sim.handle_line(&format!("SIN,{index},{name},.,2,0,0,2,0,0"));
            sim.handle_line("EPG");
        }
        let scanner = scanner_for(&sim).await;

        let doc = export(&scanner, &ExportOptions::default()).await.unwrap();
        let sequences: Vec<_> = doc
            .systems
            .iter()
            .map(|s| s.fields["sequence_number"].clone())
            .collect();
        assert_eq!(sequences, vec![json!(1), json!(2), json!(3)]);
    }
}
