//! An in-memory BC246T that speaks the remote-control protocol.
//!
//! [`SimulatedScanner`] implements [`Transport`] and answers each command
//! line the way the scanner does: the same field layouts, the `ERR` / `NG`
//! markers, Program Mode gating, real doubly-linked record chains and a
//! finite memory that reports `-1` when a create command cannot allocate.
//!
//! Tests can reach into the simulated memory to inject faults (break a
//! forward link, shrink the memory, blank the attenuation field) and to
//! inspect what a driver operation left behind.
//!
//! ```
//! use scanlib_test_harness::SimulatedScanner;
//!
//! let sim = SimulatedScanner::new();
//! assert_eq!(sim.handle_line("MDL"), "MDL,BC246T");
//! assert_eq!(sim.handle_line("SCT"), "SCT,NG");
//! assert_eq!(sim.handle_line("PRG"), "PRG,OK");
//! assert_eq!(sim.handle_line("SCT"), "SCT,0");
//! ```

use async_trait::async_trait;
use std::collections::{BTreeMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use scanlib_core::error::{Error, Result};
use scanlib_core::transport::Transport;

const SYSTEM_TYPES: &[&str] = &[
    "CNV", "M82S", "M82P", "M92", "MV2", "MU2", "M81S", "M81P", "EDN", "EDW", "EDS", "LTR",
    "M82C", "M81C",
];
const MODULATIONS: &[&str] = &["AUTO", "FM", "NFM", "AM"];
const BACKLIGHTS: &[&str] = &["10", "30", "KY", "SQ"];
const SEARCH_STEPS: &[u16] = &[0, 500, 625, 750, 1000, 1250, 1500, 2000, 2500, 5000, 10000];
const KEY_CODES: &[&str] = &[
    "M", "F", "H", "S", "L", "T", "1", "2", "3", "4", "5", "6", "7", "8", "9", "0", ".", "E",
    ">", "<", "^", "P",
];
const KEY_MODES: &[&str] = &["P", "L", "H", "R"];
const TEXT_MAX: usize = 16;

/// Default number of memory blocks (systems + groups + channels).
pub const DEFAULT_CAPACITY: usize = 2500;

#[derive(Debug, Clone, Copy, Default)]
struct Links {
    reverse: Option<u32>,
    forward: Option<u32>,
}

trait Linked {
    fn links(&self) -> Links;
    fn links_mut(&mut self) -> &mut Links;
}

#[derive(Debug, Clone)]
struct SimSystem {
    system_type: String,
    name: String,
    quick_key: Option<u8>,
    hold_time: u8,
    lockout: bool,
    attenuation: bool,
    delay_time: u8,
    data_skip: bool,
    emergency_alert: bool,
    links: Links,
    group_head: Option<u32>,
    group_tail: Option<u32>,
}

#[derive(Debug, Clone)]
struct SimGroup {
    group_type: char,
    name: String,
    quick_key: Option<u8>,
    lockout: bool,
    links: Links,
    system: u32,
    channel_head: Option<u32>,
    channel_tail: Option<u32>,
}

#[derive(Debug, Clone)]
struct SimChannel {
    name: String,
    frequency: u32,
    search_step: u16,
    modulation: String,
    ctcss_dcs: u8,
    tone_lockout: bool,
    lockout: bool,
    priority: u8,
    attenuation: bool,
    alert: bool,
    links: Links,
    system: u32,
    group: u32,
}

macro_rules! impl_linked {
    ($($ty:ty),*) => {
        $(impl Linked for $ty {
            fn links(&self) -> Links {
                self.links
            }
            fn links_mut(&mut self) -> &mut Links {
                &mut self.links
            }
        })*
    };
}

impl_linked!(SimSystem, SimGroup, SimChannel);

fn append<T: Linked>(
    map: &mut BTreeMap<u32, T>,
    head: &mut Option<u32>,
    tail: &mut Option<u32>,
    index: u32,
    mut record: T,
) {
    *record.links_mut() = Links {
        reverse: *tail,
        forward: None,
    };
    match tail.and_then(|t| map.get_mut(&t)) {
        Some(last) => last.links_mut().forward = Some(index),
        None => *head = Some(index),
    }
    *tail = Some(index);
    map.insert(index, record);
}

fn unlink<T: Linked>(
    map: &mut BTreeMap<u32, T>,
    head: &mut Option<u32>,
    tail: &mut Option<u32>,
    index: u32,
) -> Option<T> {
    let record = map.remove(&index)?;
    let links = record.links();
    match links.reverse.and_then(|r| map.get_mut(&r)) {
        Some(prev) => prev.links_mut().forward = links.forward,
        None => *head = links.forward,
    }
    match links.forward.and_then(|f| map.get_mut(&f)) {
        Some(next) => next.links_mut().reverse = links.reverse,
        None => *tail = links.reverse,
    }
    Some(record)
}

/// 1-based position of `index` in its list, counted along reverse links.
fn position<T: Linked>(map: &BTreeMap<u32, T>, index: u32) -> u32 {
    let mut position = 1;
    let mut current = map.get(&index).and_then(|r| r.links().reverse);
    while let Some(previous) = current {
        if position as usize > map.len() {
            break;
        }
        position += 1;
        current = map.get(&previous).and_then(|r| r.links().reverse);
    }
    position
}

fn flag(v: bool) -> &'static str {
    if v { "1" } else { "0" }
}

fn link(v: Option<u32>) -> String {
    v.map_or_else(|| "-1".to_string(), |i| i.to_string())
}

fn quick_key(v: Option<u8>) -> String {
    v.map_or_else(|| ".".to_string(), |k| k.to_string())
}

fn parse_flag(s: &str) -> Option<bool> {
    match s {
        "0" => Some(false),
        "1" => Some(true),
        _ => None,
    }
}

fn parse_quick_key(s: &str) -> Option<Option<u8>> {
    if s == "." {
        return Some(None);
    }
    match s.parse::<u8>() {
        Ok(k @ 1..=9) => Some(Some(k)),
        _ => None,
    }
}

fn parse_text(s: &str) -> Option<String> {
    (s.chars().count() <= TEXT_MAX).then(|| s.to_string())
}

fn parse_bounded(s: &str, max: u8) -> Option<u8> {
    s.parse::<u8>().ok().filter(|v| *v <= max)
}

/// Device-wide settings, reset by `CLR`.
#[derive(Debug, Clone)]
struct Settings {
    backlight: String,
    battery_save: bool,
    key_beep: bool,
    greeting: (String, String),
    priority_mode: u8,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            backlight: "10".into(),
            battery_save: false,
            key_beep: true,
            greeting: ("Uniden".into(), "BC246T".into()),
            priority_mode: 0,
        }
    }
}

#[derive(Debug)]
struct SimMemory {
    model: String,
    firmware: String,
    program_mode: bool,
    settings: Settings,
    capacity: usize,
    next_index: u32,
    systems: BTreeMap<u32, SimSystem>,
    groups: BTreeMap<u32, SimGroup>,
    channels: BTreeMap<u32, SimChannel>,
    system_head: Option<u32>,
    system_tail: Option<u32>,
    blank_attenuation: bool,
    battery_raw: u8,
    received: Vec<String>,
}

impl SimMemory {
    fn new() -> Self {
        SimMemory {
            model: "BC246T".into(),
            firmware: "Version 1.06.00".into(),
            program_mode: false,
            settings: Settings::default(),
            capacity: DEFAULT_CAPACITY,
            next_index: 1,
            systems: BTreeMap::new(),
            groups: BTreeMap::new(),
            channels: BTreeMap::new(),
            system_head: None,
            system_tail: None,
            blank_attenuation: false,
            battery_raw: 200,
            received: Vec::new(),
        }
    }

    fn record_count(&self) -> usize {
        self.systems.len() + self.groups.len() + self.channels.len()
    }

    fn system_indices(&self) -> Vec<u32> {
        let mut out = Vec::new();
        let mut cursor = self.system_head;
        while let Some(index) = cursor {
            if out.len() > self.systems.len() {
                break;
            }
            out.push(index);
            cursor = self.systems.get(&index).and_then(|s| s.links.forward);
        }
        out
    }

    fn handle_line(&mut self, line: &str) -> String {
        self.received.push(line.to_string());
        let parts: Vec<&str> = line.split(',').collect();
        let (command, args) = match parts.split_first() {
            Some((command, args)) => (*command, args),
            None => return "ERR".into(),
        };

        let reply = match command {
            "MDL" => Some(format!("MDL,{}", self.model)),
            "VER" => Some(format!("VER,{}", self.firmware)),
            "PRG" => {
                self.program_mode = true;
                Some("PRG,OK".into())
            }
            "EPG" => {
                self.program_mode = false;
                Some("EPG,OK".into())
            }
            "KEY" => Some(self.key(args)),
            "POF" => Some("POF,OK".into()),
            _ => None,
        };
        if let Some(reply) = reply {
            tracing::trace!(line, reply = %reply, "sim");
            return reply;
        }

        if !self.program_mode {
            return format!("{command},NG");
        }

        let reply = match command {
            "BLT" => self.backlight(args),
            "BSV" => Self::toggle(command, &mut self.settings.battery_save, args),
            "KBP" => Self::toggle(command, &mut self.settings.key_beep, args),
            "OMS" => self.greeting_command(args),
            "PRI" => self.priority_mode(args),
            "CLR" => self.clear(args),
            "MEM" => self.memory_used(args),
            "BAV" => format!("BAV,{}", self.battery_raw),
            "SCT" => format!("SCT,{}", self.systems.len()),
            "SIH" => format!("SIH,{}", link(self.system_head)),
            "SIT" => format!("SIT,{}", link(self.system_tail)),
            "CSY" => self.create_system(args),
            "DSY" => self.delete_system(args),
            "SIN" => self.system_info(args),
            "AGC" => self.append_group(command, 'C', args),
            "AGI" => self.append_group(command, 'T', args),
            "DGR" => self.delete_group(args),
            "GIN" => self.group_info(args),
            "ACC" => self.append_channel(args),
            "DCH" => self.delete_channel(args),
            "CIN" => self.channel_info(args),
            _ => "ERR".into(),
        };
        tracing::trace!(line, reply = %reply, "sim");
        reply
    }

    fn allocate(&mut self) -> Option<u32> {
        if self.record_count() >= self.capacity {
            return None;
        }
        let index = self.next_index;
        self.next_index += 1;
        Some(index)
    }

    fn key(&mut self, args: &[&str]) -> String {
        match args {
            [code, mode] if KEY_CODES.contains(code) && KEY_MODES.contains(mode) => {
                "KEY,OK".into()
            }
            _ => "KEY,ERR".into(),
        }
    }

    fn toggle(command: &str, value: &mut bool, args: &[&str]) -> String {
        match args {
            [] => format!("{command},{}", flag(*value)),
            [v] => match parse_flag(v) {
                Some(v) => {
                    *value = v;
                    format!("{command},OK")
                }
                None => format!("{command},ERR"),
            },
            _ => format!("{command},ERR"),
        }
    }

    fn backlight(&mut self, args: &[&str]) -> String {
        match args {
            [] => format!("BLT,{}", self.settings.backlight),
            [v] if BACKLIGHTS.contains(v) => {
                self.settings.backlight = v.to_string();
                "BLT,OK".into()
            }
            _ => "BLT,ERR".into(),
        }
    }

    fn greeting_command(&mut self, args: &[&str]) -> String {
        let lines = match args {
            [] => {
                let (l1, l2) = &self.settings.greeting;
                return format!("OMS,{l1},{l2}");
            }
            [l1] => (parse_text(l1), Some(String::new())),
            [l1, l2] => (parse_text(l1), parse_text(l2)),
            _ => return "OMS,ERR".into(),
        };
        match lines {
            (Some(l1), Some(l2)) => {
                self.settings.greeting = (l1, l2);
                "OMS,OK".into()
            }
            _ => "OMS,ERR".into(),
        }
    }

    fn priority_mode(&mut self, args: &[&str]) -> String {
        match args {
            [] => format!("PRI,{}", self.settings.priority_mode),
            [v] => match parse_bounded(v, 2) {
                Some(v) => {
                    self.settings.priority_mode = v;
                    "PRI,OK".into()
                }
                None => "PRI,ERR".into(),
            },
            _ => "PRI,ERR".into(),
        }
    }

    fn clear(&mut self, args: &[&str]) -> String {
        if !args.is_empty() {
            return "CLR,ERR".into();
        }
        self.systems.clear();
        self.groups.clear();
        self.channels.clear();
        self.system_head = None;
        self.system_tail = None;
        self.settings = Settings::default();
        "CLR,OK".into()
    }

    fn memory_used(&self, args: &[&str]) -> String {
        if !args.is_empty() || self.capacity == 0 {
            return "MEM,ERR".into();
        }
        format!("MEM,{}", self.record_count() * 100 / self.capacity)
    }

    fn index_arg(args: &[&str]) -> Option<u32> {
        args.first().and_then(|s| s.parse::<u32>().ok())
    }

    // ---------------------------------------------------------------
    // Systems
    // ---------------------------------------------------------------

    fn create_system(&mut self, args: &[&str]) -> String {
        let [system_type] = args else {
            return "CSY,ERR".into();
        };
        if !SYSTEM_TYPES.contains(system_type) {
            return "CSY,ERR".into();
        }
        let Some(index) = self.allocate() else {
            return "CSY,-1".into();
        };
        let system = SimSystem {
            system_type: system_type.to_string(),
            name: String::new(),
            quick_key: None,
            hold_time: 2,
            lockout: false,
            attenuation: false,
            delay_time: 2,
            data_skip: false,
            emergency_alert: false,
            links: Links::default(),
            group_head: None,
            group_tail: None,
        };
        append(
            &mut self.systems,
            &mut self.system_head,
            &mut self.system_tail,
            index,
            system,
        );
        format!("CSY,{index}")
    }

    fn delete_system(&mut self, args: &[&str]) -> String {
        let (Some(index), 1) = (Self::index_arg(args), args.len()) else {
            return "DSY,ERR".into();
        };
        match unlink(
            &mut self.systems,
            &mut self.system_head,
            &mut self.system_tail,
            index,
        ) {
            Some(_) => {
                self.groups.retain(|_, g| g.system != index);
                self.channels.retain(|_, c| c.system != index);
                "DSY,OK".into()
            }
            None => "DSY,ERR".into(),
        }
    }

    fn system_info(&mut self, args: &[&str]) -> String {
        let Some(index) = Self::index_arg(args) else {
            return "SIN,ERR".into();
        };
        let blank = self.blank_attenuation;
        let sequence = position(&self.systems, index);
        let Some(system) = self.systems.get_mut(&index) else {
            return "SIN,ERR".into();
        };
        match args {
            [_] => format!(
                "SIN,{},{},{},{},{},{},{},{},{},{},{},{},{},{}",
                system.system_type,
                system.name,
                quick_key(system.quick_key),
                system.hold_time,
                flag(system.lockout),
                if blank { "" } else { flag(system.attenuation) },
                system.delay_time,
                flag(system.data_skip),
                flag(system.emergency_alert),
                link(system.links.reverse),
                link(system.links.forward),
                link(system.group_head),
                link(system.group_tail),
                sequence,
            ),
            [_, name, qk, hold, lout, att, dly, skp, emg] => {
                let parsed = (
                    parse_text(name),
                    parse_quick_key(qk),
                    parse_bounded(hold, 255),
                    parse_flag(lout),
                    parse_flag(att),
                    parse_bounded(dly, 5),
                    parse_flag(skp),
                    parse_flag(emg),
                );
                let (
                    Some(name),
                    Some(qk),
                    Some(hold),
                    Some(lout),
                    Some(att),
                    Some(dly),
                    Some(skp),
                    Some(emg),
                ) = parsed
                else {
                    return "SIN,ERR".into();
                };
                system.name = name;
                system.quick_key = qk;
                system.hold_time = hold;
                system.lockout = lout;
                system.attenuation = att;
                system.delay_time = dly;
                system.data_skip = skp;
                system.emergency_alert = emg;
                "SIN,OK".into()
            }
            _ => "SIN,ERR".into(),
        }
    }

    // ---------------------------------------------------------------
    // Groups
    // ---------------------------------------------------------------

    fn append_group(&mut self, command: &str, group_type: char, args: &[&str]) -> String {
        let (Some(system_index), 1) = (Self::index_arg(args), args.len()) else {
            return format!("{command},ERR");
        };
        if !self.systems.contains_key(&system_index) {
            return format!("{command},ERR");
        }
        let Some(index) = self.allocate() else {
            return format!("{command},-1");
        };
        let Some(system) = self.systems.get_mut(&system_index) else {
            return format!("{command},ERR");
        };
        let group = SimGroup {
            group_type,
            name: String::new(),
            quick_key: None,
            lockout: false,
            links: Links::default(),
            system: system_index,
            channel_head: None,
            channel_tail: None,
        };
        append(
            &mut self.groups,
            &mut system.group_head,
            &mut system.group_tail,
            index,
            group,
        );
        format!("{command},{index}")
    }

    fn delete_group(&mut self, args: &[&str]) -> String {
        let (Some(index), 1) = (Self::index_arg(args), args.len()) else {
            return "DGR,ERR".into();
        };
        let Some(system_index) = self.groups.get(&index).map(|g| g.system) else {
            return "DGR,ERR".into();
        };
        let Some(system) = self.systems.get_mut(&system_index) else {
            return "DGR,ERR".into();
        };
        unlink(
            &mut self.groups,
            &mut system.group_head,
            &mut system.group_tail,
            index,
        );
        self.channels.retain(|_, c| c.group != index);
        "DGR,OK".into()
    }

    fn group_info(&mut self, args: &[&str]) -> String {
        let Some(index) = Self::index_arg(args) else {
            return "GIN,ERR".into();
        };
        let sequence = position(&self.groups, index);
        let Some(group) = self.groups.get_mut(&index) else {
            return "GIN,ERR".into();
        };
        match args {
            [_] => format!(
                "GIN,{},{},{},{},{},{},{},{},{},{}",
                group.group_type,
                group.name,
                quick_key(group.quick_key),
                flag(group.lockout),
                link(group.links.reverse),
                link(group.links.forward),
                group.system,
                link(group.channel_head),
                link(group.channel_tail),
                sequence,
            ),
            [_, name, qk, lout] => {
                let (Some(name), Some(qk), Some(lout)) =
                    (parse_text(name), parse_quick_key(qk), parse_flag(lout))
                else {
                    return "GIN,ERR".into();
                };
                group.name = name;
                group.quick_key = qk;
                group.lockout = lout;
                "GIN,OK".into()
            }
            _ => "GIN,ERR".into(),
        }
    }

    // ---------------------------------------------------------------
    // Channels
    // ---------------------------------------------------------------

    fn append_channel(&mut self, args: &[&str]) -> String {
        let (Some(group_index), 1) = (Self::index_arg(args), args.len()) else {
            return "ACC,ERR".into();
        };
        let Some(system_index) = self.groups.get(&group_index).map(|g| g.system) else {
            return "ACC,ERR".into();
        };
        let Some(index) = self.allocate() else {
            return "ACC,-1".into();
        };
        let Some(group) = self.groups.get_mut(&group_index) else {
            return "ACC,ERR".into();
        };
        let channel = SimChannel {
            name: String::new(),
            frequency: 0,
            search_step: 0,
            modulation: "AUTO".into(),
            ctcss_dcs: 0,
            tone_lockout: false,
            lockout: false,
            priority: 0,
            attenuation: false,
            alert: false,
            links: Links::default(),
            system: system_index,
            group: group_index,
        };
        append(
            &mut self.channels,
            &mut group.channel_head,
            &mut group.channel_tail,
            index,
            channel,
        );
        format!("ACC,{index}")
    }

    fn delete_channel(&mut self, args: &[&str]) -> String {
        let (Some(index), 1) = (Self::index_arg(args), args.len()) else {
            return "DCH,ERR".into();
        };
        let Some(group_index) = self.channels.get(&index).map(|c| c.group) else {
            return "DCH,ERR".into();
        };
        let Some(group) = self.groups.get_mut(&group_index) else {
            return "DCH,ERR".into();
        };
        unlink(
            &mut self.channels,
            &mut group.channel_head,
            &mut group.channel_tail,
            index,
        );
        "DCH,OK".into()
    }

    fn channel_info(&mut self, args: &[&str]) -> String {
        let Some(index) = Self::index_arg(args) else {
            return "CIN,ERR".into();
        };
        let blank = self.blank_attenuation;
        let Some(channel) = self.channels.get_mut(&index) else {
            return "CIN,ERR".into();
        };
        match args {
            [_] => format!(
                "CIN,{},{:08},{},{},{},{},{},{},{},{},{},{},{},{}",
                channel.name,
                channel.frequency,
                channel.search_step,
                channel.modulation,
                channel.ctcss_dcs,
                flag(channel.tone_lockout),
                flag(channel.lockout),
                channel.priority,
                if blank { "" } else { flag(channel.attenuation) },
                flag(channel.alert),
                link(channel.links.reverse),
                link(channel.links.forward),
                channel.system,
                channel.group,
            ),
            [_, name, frq, stp, md, ctcss, tlock, lout, pri, att, alt] => {
                let step = stp.parse::<u16>().ok().filter(|s| SEARCH_STEPS.contains(s));
                let modulation = MODULATIONS.contains(md).then(|| md.to_string());
                let frequency = (frq.len() == 8)
                    .then(|| frq.parse::<u32>().ok())
                    .flatten();
                let parsed = (
                    parse_text(name),
                    frequency,
                    step,
                    modulation,
                    parse_bounded(ctcss, 231),
                    parse_flag(tlock),
                    parse_flag(lout),
                    parse_bounded(pri, 2),
                    parse_flag(att),
                    parse_flag(alt),
                );
                let (
                    Some(name),
                    Some(frequency),
                    Some(step),
                    Some(modulation),
                    Some(ctcss),
                    Some(tlock),
                    Some(lout),
                    Some(pri),
                    Some(att),
                    Some(alt),
                ) = parsed
                else {
                    return "CIN,ERR".into();
                };
                channel.name = name;
                channel.frequency = frequency;
                channel.search_step = step;
                channel.modulation = modulation;
                channel.ctcss_dcs = ctcss;
                channel.tone_lockout = tlock;
                channel.lockout = lout;
                channel.priority = pri;
                channel.attenuation = att;
                channel.alert = alt;
                "CIN,OK".into()
            }
            _ => "CIN,ERR".into(),
        }
    }
}

/// A simulated BC246T attached to a [`Transport`].
///
/// Clones share the same simulated memory, so a test can hand one clone to
/// the driver and keep another to inspect or corrupt the state.
#[derive(Debug, Clone)]
pub struct SimulatedScanner {
    memory: Arc<Mutex<SimMemory>>,
    connected: bool,
    pending: VecDeque<u8>,
}

impl SimulatedScanner {
    /// A connected BC246T with empty memory, outside Program Mode.
    pub fn new() -> Self {
        SimulatedScanner {
            memory: Arc::new(Mutex::new(SimMemory::new())),
            connected: true,
            pending: VecDeque::new(),
        }
    }

    fn memory(&self) -> MutexGuard<'_, SimMemory> {
        self.memory.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Process one command line (without terminator) and return the reply
    /// line (without terminator).
    pub fn handle_line(&self, line: &str) -> String {
        self.memory().handle_line(line)
    }

    /// Override the model name reported by `MDL`.
    pub fn set_model(&self, model: &str) {
        self.memory().model = model.to_string();
    }

    /// Override the firmware string reported by `VER`.
    pub fn set_firmware(&self, firmware: &str) {
        self.memory().firmware = firmware.to_string();
    }

    /// Limit the total number of records the memory can hold.
    pub fn set_capacity(&self, capacity: usize) {
        self.memory().capacity = capacity;
    }

    /// Report attenuation as an empty field in `SIN` / `CIN` replies.
    pub fn set_blank_attenuation(&self, blank: bool) {
        self.memory().blank_attenuation = blank;
    }

    /// Overwrite the forward link of whichever record lives at `index`.
    ///
    /// Returns `false` if no record has that index.
    pub fn corrupt_forward_link(&self, index: u32, forward: Option<u32>) -> bool {
        let mut memory = self.memory();
        let memory = &mut *memory;
        let links = if let Some(r) = memory.systems.get_mut(&index) {
            r.links_mut()
        } else if let Some(r) = memory.groups.get_mut(&index) {
            r.links_mut()
        } else if let Some(r) = memory.channels.get_mut(&index) {
            r.links_mut()
        } else {
            return false;
        };
        links.forward = forward;
        true
    }

    /// Whether the simulated scanner is in Program Mode.
    pub fn is_program_mode(&self) -> bool {
        self.memory().program_mode
    }

    /// Every command line received, without the terminator.
    pub fn received_lines(&self) -> Vec<String> {
        self.memory().received.clone()
    }

    /// Number of systems in memory.
    pub fn system_count(&self) -> usize {
        self.memory().systems.len()
    }

    /// Number of records of any kind in memory.
    pub fn record_count(&self) -> usize {
        self.memory().record_count()
    }

    /// System indices in chain order, following forward links from the head.
    pub fn system_indices(&self) -> Vec<u32> {
        self.memory().system_indices()
    }

    /// Quick keys of the systems in chain order.
    pub fn system_quick_keys(&self) -> Vec<Option<u8>> {
        let memory = self.memory();
        memory
            .system_indices()
            .iter()
            .filter_map(|i| memory.systems.get(i))
            .map(|s| s.quick_key)
            .collect()
    }

    /// The two greeting lines.
    pub fn greeting(&self) -> (String, String) {
        self.memory().settings.greeting.clone()
    }
}

impl Default for SimulatedScanner {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Transport for SimulatedScanner {
    async fn send(&mut self, data: &[u8]) -> Result<()> {
        if !self.connected {
            return Err(Error::NotConnected);
        }
        let Some((&b'\r', body)) = data.split_last() else {
            return Err(Error::Transport("command line missing terminator".into()));
        };
        let reply = match std::str::from_utf8(body) {
            Ok(line) => self.handle_line(line),
            Err(_) => "ERR".into(),
        };
        self.pending.extend(reply.as_bytes());
        self.pending.push_back(b'\r');
        Ok(())
    }

    async fn receive(&mut self, buf: &mut [u8], _timeout: Duration) -> Result<usize> {
        if !self.connected {
            return Err(Error::NotConnected);
        }
        if self.pending.is_empty() {
            return Err(Error::Timeout);
        }
        let n = self.pending.len().min(buf.len());
        for (slot, byte) in buf.iter_mut().zip(self.pending.drain(..n)) {
            *slot = byte;
        }
        Ok(n)
    }

    async fn close(&mut self) -> Result<()> {
        self.connected = false;
        self.pending.clear();
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected
    }
}
