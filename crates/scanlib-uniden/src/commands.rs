//! BC246T command builders and response parsers.
//!
//! This module provides functions to construct command lines for every
//! remote-control command the driver uses, and to decode the corresponding
//! response fields.
//!
//! All functions are pure. Builders that take user values validate them
//! before producing any bytes and fail with [`Error::InvalidParameter`];
//! parsers fail with [`Error::UnexpectedResponse`] when a response has the
//! wrong shape or an unknown value.
//!
//! # Field conventions
//!
//! Booleans are `1`/`0`. A missing index is `-1`, a missing quick key is
//! `.`. Frequencies are eight digits in units of 100 Hz. Set commands answer
//! `<CMD>,OK`.

use std::str::FromStr;

use scanlib_core::{Error, Frequency, Index, QuickKey, Result};

use crate::memory::{
    ChannelRecord, ChannelSettings, GroupRecord, GroupSettings, SystemRecord, SystemSettings,
};
use crate::models::{GREETING_LINE_MAX_LEN, NAME_MAX_LEN};
use crate::protocol::{encode_command, frequency_arg};
use crate::types::{Backlight, GroupType, KeyCode, KeyMode, PriorityMode, SystemType};

/// Longest delay time, in seconds.
pub const DELAY_TIME_MAX: u8 = 5;

/// Highest CTCSS/DCS mode code.
pub const CTCSS_DCS_MAX: u8 = 231;

/// Highest channel priority value.
pub const PRIORITY_MAX: u8 = 2;

/// Search steps accepted for a channel, in units of 10 Hz (0 = auto).
pub const SEARCH_STEPS: [u16; 11] = [0, 500, 625, 750, 1000, 1250, 1500, 2000, 2500, 5000, 10000];

/// Battery reference voltage for the raw `BAV` reading.
const BATTERY_FULL_SCALE_VOLTS: f32 = 3.3;

// ---------------------------------------------------------------
// Argument validation
// ---------------------------------------------------------------

fn check_text(what: &str, value: &str, max_len: usize) -> Result<()> {
    if value.chars().count() > max_len {
        return Err(Error::InvalidParameter(format!(
            "{what} {value:?} is longer than {max_len} characters"
        )));
    }
    if value.contains([',', '\r']) {
        return Err(Error::InvalidParameter(format!(
            "{what} {value:?} contains a comma or carriage return"
        )));
    }
    Ok(())
}

fn check_max(what: &str, value: u8, max: u8) -> Result<()> {
    if value > max {
        return Err(Error::InvalidParameter(format!(
            "{what} {value} is out of range 0-{max}"
        )));
    }
    Ok(())
}

// ---------------------------------------------------------------
// Identity and session
// ---------------------------------------------------------------

/// Build a "read model" command (`MDL`).
pub fn cmd_read_model() -> Vec<u8> {
    encode_command("MDL", &[])
}

/// Build a "read firmware version" command (`VER`).
pub fn cmd_read_firmware_version() -> Vec<u8> {
    encode_command("VER", &[])
}

/// Build an "enter Program Mode" command (`PRG`).
///
/// Memory and settings commands answer `NG` outside Program Mode.
pub fn cmd_enter_program_mode() -> Vec<u8> {
    encode_command("PRG", &[])
}

/// Build an "exit Program Mode" command (`EPG`).
pub fn cmd_exit_program_mode() -> Vec<u8> {
    encode_command("EPG", &[])
}

// ---------------------------------------------------------------
// Settings
// ---------------------------------------------------------------

/// Build a "read backlight" command (`BLT`).
pub fn cmd_read_backlight() -> Vec<u8> {
    encode_command("BLT", &[])
}

/// Build a "set backlight" command (`BLT,<mode>`).
pub fn cmd_set_backlight(backlight: Backlight) -> Vec<u8> {
    encode_command("BLT", &[backlight.as_str().into()])
}

/// Build a "read battery save" command (`BSV`).
pub fn cmd_read_battery_save() -> Vec<u8> {
    encode_command("BSV", &[])
}

/// Build a "set battery save" command (`BSV,1` / `BSV,0`).
pub fn cmd_set_battery_save(on: bool) -> Vec<u8> {
    encode_command("BSV", &[on.into()])
}

/// Build a "read key beep" command (`KBP`).
pub fn cmd_read_key_beep() -> Vec<u8> {
    encode_command("KBP", &[])
}

/// Build a "set key beep" command (`KBP,1` / `KBP,0`).
pub fn cmd_set_key_beep(on: bool) -> Vec<u8> {
    encode_command("KBP", &[on.into()])
}

/// Build a "read greeting" command (`OMS`).
pub fn cmd_read_greeting() -> Vec<u8> {
    encode_command("OMS", &[])
}

/// Build a "set greeting" command (`OMS,<line1>,<line2>`).
///
/// Each line is at most 16 characters. Longer lines are rejected rather
/// than truncated.
pub fn cmd_set_greeting(line1: &str, line2: &str) -> Result<Vec<u8>> {
    check_text("greeting line", line1, GREETING_LINE_MAX_LEN)?;
    check_text("greeting line", line2, GREETING_LINE_MAX_LEN)?;
    Ok(encode_command("OMS", &[line1.into(), line2.into()]))
}

/// Build a "read priority mode" command (`PRI`).
pub fn cmd_read_priority_mode() -> Vec<u8> {
    encode_command("PRI", &[])
}

/// Build a "set priority mode" command (`PRI,<0-2>`).
pub fn cmd_set_priority_mode(mode: PriorityMode) -> Vec<u8> {
    encode_command("PRI", &[mode.as_str().into()])
}

// ---------------------------------------------------------------
// Memory and remote control
// ---------------------------------------------------------------

/// Build a "clear all memory" command (`CLR`).
///
/// Erases every system, group and channel and resets settings.
pub fn cmd_clear_memory() -> Vec<u8> {
    encode_command("CLR", &[])
}

/// Build a "read used memory" command (`MEM`).
pub fn cmd_read_memory_used() -> Vec<u8> {
    encode_command("MEM", &[])
}

/// Build a "push key" command (`KEY,<key>,<mode>`).
pub fn cmd_push_key(key: KeyCode, mode: KeyMode) -> Result<Vec<u8>> {
    let code = key
        .code()
        .ok_or_else(|| Error::InvalidParameter(format!("no such key: {key:?}")))?;
    Ok(encode_command(
        "KEY",
        &[code.to_string().into(), mode.as_str().into()],
    ))
}

/// Build a "power off" command (`POF`).
pub fn cmd_power_off() -> Vec<u8> {
    encode_command("POF", &[])
}

/// Build a "read battery voltage" command (`BAV`).
pub fn cmd_read_battery_voltage() -> Vec<u8> {
    encode_command("BAV", &[])
}

// ---------------------------------------------------------------
// Systems
// ---------------------------------------------------------------

/// Build a "read system count" command (`SCT`).
pub fn cmd_read_system_count() -> Vec<u8> {
    encode_command("SCT", &[])
}

/// Build a "read system list head" command (`SIH`).
pub fn cmd_read_system_head() -> Vec<u8> {
    encode_command("SIH", &[])
}

/// Build a "read system list tail" command (`SIT`).
pub fn cmd_read_system_tail() -> Vec<u8> {
    encode_command("SIT", &[])
}

/// Build a "create system" command (`CSY,<type>`).
pub fn cmd_create_system(system_type: SystemType) -> Vec<u8> {
    encode_command("CSY", &[system_type.as_str().into()])
}

/// Build a "delete system" command (`DSY,<index>`).
pub fn cmd_delete_system(index: Index) -> Vec<u8> {
    encode_command("DSY", &[index.into()])
}

/// Build a "read system info" command (`SIN,<index>`).
pub fn cmd_read_system_info(index: Index) -> Vec<u8> {
    encode_command("SIN", &[index.into()])
}

/// Build a "set system info" command.
///
/// `SIN,<index>,<name>,<quick key>,<hold>,<lockout>,<att>,<delay>,<data skip>,<emergency>`
pub fn cmd_set_system_info(index: Index, settings: &SystemSettings) -> Result<Vec<u8>> {
    check_text("system name", &settings.name, NAME_MAX_LEN)?;
    check_max("delay time", settings.delay_time, DELAY_TIME_MAX)?;
    Ok(encode_command(
        "SIN",
        &[
            index.into(),
            settings.name.as_str().into(),
            settings.quick_key.into(),
            settings.hold_time.into(),
            settings.lockout.into(),
            settings.attenuation.into(),
            settings.delay_time.into(),
            settings.data_skip.into(),
            settings.emergency_alert.into(),
        ],
    ))
}

// ---------------------------------------------------------------
// Groups
// ---------------------------------------------------------------

/// Build an "append group" command: `AGC,<system>` for a channel group,
/// `AGI,<system>` for a talkgroup group.
pub fn cmd_append_group(system: Index, group_type: GroupType) -> Vec<u8> {
    encode_command(group_type.append_command(), &[system.into()])
}

/// Build a "delete group" command (`DGR,<index>`).
pub fn cmd_delete_group(index: Index) -> Vec<u8> {
    encode_command("DGR", &[index.into()])
}

/// Build a "read group info" command (`GIN,<index>`).
pub fn cmd_read_group_info(index: Index) -> Vec<u8> {
    encode_command("GIN", &[index.into()])
}

/// Build a "set group info" command (`GIN,<index>,<name>,<quick key>,<lockout>`).
pub fn cmd_set_group_info(index: Index, settings: &GroupSettings) -> Result<Vec<u8>> {
    check_text("group name", &settings.group_name, NAME_MAX_LEN)?;
    Ok(encode_command(
        "GIN",
        &[
            index.into(),
            settings.group_name.as_str().into(),
            settings.quick_key.into(),
            settings.lockout.into(),
        ],
    ))
}

// ---------------------------------------------------------------
// Channels
// ---------------------------------------------------------------

/// Build an "append channel" command (`ACC,<group>`).
pub fn cmd_append_channel(group: Index) -> Vec<u8> {
    encode_command("ACC", &[group.into()])
}

/// Build a "delete channel" command (`DCH,<index>`).
pub fn cmd_delete_channel(index: Index) -> Vec<u8> {
    encode_command("DCH", &[index.into()])
}

/// Build a "read channel info" command (`CIN,<index>`).
pub fn cmd_read_channel_info(index: Index) -> Vec<u8> {
    encode_command("CIN", &[index.into()])
}

/// Build a "set channel info" command.
///
/// `CIN,<index>,<name>,<freq>,<step>,<mod>,<ctcss>,<tlock>,<lockout>,<pri>,<att>,<alert>`
pub fn cmd_set_channel_info(index: Index, settings: &ChannelSettings) -> Result<Vec<u8>> {
    check_text("channel name", &settings.name, NAME_MAX_LEN)?;
    check_max("CTCSS/DCS mode", settings.ctcss_dcs_mode, CTCSS_DCS_MAX)?;
    check_max("priority", settings.priority, PRIORITY_MAX)?;
    if !SEARCH_STEPS.contains(&settings.search_step) {
        return Err(Error::InvalidParameter(format!(
            "search step {} is not supported",
            settings.search_step
        )));
    }
    Ok(encode_command(
        "CIN",
        &[
            index.into(),
            settings.name.as_str().into(),
            frequency_arg(settings.frequency)?,
            settings.search_step.into(),
            settings.modulation.as_str().into(),
            settings.ctcss_dcs_mode.into(),
            settings.ctcss_dcs_tone_lockout.into(),
            settings.lockout.into(),
            settings.priority.into(),
            settings.attenuation.into(),
            settings.alert.into(),
        ],
    ))
}

// ---------------------------------------------------------------
// Field decoding
// ---------------------------------------------------------------

fn expect_fields<'a>(fields: &'a [String], count: usize) -> Result<&'a [String]> {
    if fields.len() != count {
        return Err(Error::UnexpectedResponse(format!(
            "expected {count} fields, got {}: {fields:?}",
            fields.len()
        )));
    }
    Ok(fields)
}

fn parse_flag(what: &str, field: &str) -> Result<bool> {
    match field {
        "1" => Ok(true),
        "0" => Ok(false),
        _ => Err(Error::UnexpectedResponse(format!(
            "invalid {what} flag: {field:?}"
        ))),
    }
}

/// Attenuation is sometimes reported as an empty field; that reads as off.
fn parse_flag_or_blank(what: &str, field: &str) -> Result<bool> {
    if field.is_empty() {
        return Ok(false);
    }
    parse_flag(what, field)
}

fn parse_value<T>(what: &str, field: &str) -> Result<T>
where
    T: FromStr,
{
    field
        .parse::<T>()
        .map_err(|_| Error::UnexpectedResponse(format!("invalid {what}: {field:?}")))
}

/// Return the single value field of a two-field response.
pub fn parse_single(fields: &[String]) -> Result<&str> {
    let fields = expect_fields(fields, 2)?;
    Ok(&fields[1])
}

/// Check the `<CMD>,OK` acknowledgement of a set command.
pub fn parse_ok(fields: &[String]) -> Result<()> {
    match parse_single(fields)? {
        "OK" => Ok(()),
        other => Err(Error::UnexpectedResponse(format!(
            "expected OK, got {other:?}"
        ))),
    }
}

/// Parse a `1`/`0` setting response (`BSV`, `KBP`).
pub fn parse_flag_response(fields: &[String]) -> Result<bool> {
    let value = parse_single(fields)?;
    parse_flag(&fields[0], value)
}

/// Parse a `BLT` response.
pub fn parse_backlight_response(fields: &[String]) -> Result<Backlight> {
    parse_value("backlight", parse_single(fields)?)
}

/// Parse a `PRI` response.
pub fn parse_priority_mode_response(fields: &[String]) -> Result<PriorityMode> {
    parse_value("priority mode", parse_single(fields)?)
}

/// Parse an `OMS` response into its two greeting lines.
pub fn parse_greeting_response(fields: &[String]) -> Result<(String, String)> {
    let fields = expect_fields(fields, 3)?;
    Ok((fields[1].clone(), fields[2].clone()))
}

/// Parse a `MEM` response: percentage of memory in use.
pub fn parse_memory_used_response(fields: &[String]) -> Result<u8> {
    let used: u8 = parse_value("memory usage", parse_single(fields)?)?;
    if used > 100 {
        return Err(Error::UnexpectedResponse(format!(
            "memory usage {used}% exceeds 100%"
        )));
    }
    Ok(used)
}

/// Parse a `BAV` response into volts.
pub fn parse_battery_voltage_response(fields: &[String]) -> Result<f32> {
    let raw: u8 = parse_value("battery level", parse_single(fields)?)?;
    Ok(BATTERY_FULL_SCALE_VOLTS * f32::from(raw) / 255.0)
}

/// Parse an `SCT` response.
pub fn parse_count_response(fields: &[String]) -> Result<usize> {
    parse_value("count", parse_single(fields)?)
}

/// Parse an `SIH` / `SIT` response.
pub fn parse_link_response(fields: &[String]) -> Result<Option<Index>> {
    Index::parse_link(parse_single(fields)?)
}

/// Parse the reply to a create or append command.
///
/// `-1` means the scanner had no free memory and maps to
/// [`Error::OutOfResources`].
pub fn parse_created_index(fields: &[String]) -> Result<Index> {
    Index::parse_link(parse_single(fields)?)?.ok_or(Error::OutOfResources)
}

/// Parse an `SIN` read response (15 fields).
///
/// `SIN,<type>,<name>,<qk>,<hold>,<lockout>,<att>,<delay>,<skip>,<emg>,<rev>,<fwd>,<grp head>,<grp tail>,<seq>`
pub fn parse_system_info(index: Index, fields: &[String]) -> Result<SystemRecord> {
    let f = expect_fields(fields, 15)?;
    Ok(SystemRecord {
        index,
        system_type: parse_value("system type", &f[1])?,
        settings: SystemSettings {
            name: f[2].clone(),
            quick_key: QuickKey::parse_field(&f[3])?,
            hold_time: parse_value("hold time", &f[4])?,
            lockout: parse_flag("lockout", &f[5])?,
            attenuation: parse_flag_or_blank("attenuation", &f[6])?,
            delay_time: parse_value("delay time", &f[7])?,
            data_skip: parse_flag("data skip", &f[8])?,
            emergency_alert: parse_flag("emergency alert", &f[9])?,
        },
        reverse_index: Index::parse_link(&f[10])?,
        forward_index: Index::parse_link(&f[11])?,
        group_head_index: Index::parse_link(&f[12])?,
        group_tail_index: Index::parse_link(&f[13])?,
        sequence_number: parse_value("sequence number", &f[14])?,
    })
}

/// Parse a `GIN` read response (11 fields).
///
/// `GIN,<type>,<name>,<qk>,<lockout>,<rev>,<fwd>,<system>,<chn head>,<chn tail>,<seq>`
pub fn parse_group_info(index: Index, fields: &[String]) -> Result<GroupRecord> {
    let f = expect_fields(fields, 11)?;
    Ok(GroupRecord {
        index,
        group_type: parse_value("group type", &f[1])?,
        settings: GroupSettings {
            group_name: f[2].clone(),
            quick_key: QuickKey::parse_field(&f[3])?,
            lockout: parse_flag("lockout", &f[4])?,
        },
        reverse_index: Index::parse_link(&f[5])?,
        forward_index: Index::parse_link(&f[6])?,
        system_index: Index::parse(&f[7])?,
        channel_head_index: Index::parse_link(&f[8])?,
        channel_tail_index: Index::parse_link(&f[9])?,
        group_sequence: parse_value("group sequence", &f[10])?,
    })
}

/// Parse a `CIN` read response (15 fields).
///
/// `CIN,<name>,<freq>,<step>,<mod>,<ctcss>,<tlock>,<lockout>,<pri>,<att>,<alert>,<rev>,<fwd>,<system>,<group>`
pub fn parse_channel_info(index: Index, fields: &[String]) -> Result<ChannelRecord> {
    let f = expect_fields(fields, 15)?;
    Ok(ChannelRecord {
        index,
        settings: ChannelSettings {
            name: f[1].clone(),
            frequency: Frequency::parse_field(&f[2])?,
            search_step: parse_value("search step", &f[3])?,
            modulation: parse_value("modulation", &f[4])?,
            ctcss_dcs_mode: parse_value("CTCSS/DCS mode", &f[5])?,
            ctcss_dcs_tone_lockout: parse_flag("tone lockout", &f[6])?,
            lockout: parse_flag("lockout", &f[7])?,
            priority: parse_value("priority", &f[8])?,
            attenuation: parse_flag_or_blank("attenuation", &f[9])?,
            alert: parse_flag("alert", &f[10])?,
        },
        reverse_index: Index::parse_link(&f[11])?,
        forward_index: Index::parse_link(&f[12])?,
        system_index: Index::parse(&f[13])?,
        group_index: Index::parse(&f[14])?,
    })
}
