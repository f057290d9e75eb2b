//! The scanner's record graph: systems, groups and channels.
//!
//! Scanner memory is three levels of doubly linked lists. Systems form one
//! list; each system owns a list of groups; each group owns a list of
//! channels. Every record is addressed by a device-assigned [`Index`] and
//! carries its neighbours (`reverse_index` / `forward_index`) and parent
//! back-references as plain data. Absent links are `None`, decoded from the
//! scanner's `-1`.
//!
//! Records here are snapshots. The scanner owns the canonical state; create
//! and delete go through the device, which performs the linking.

use serde::{Deserialize, Serialize};

use scanlib_core::{Frequency, Index, QuickKey, Result};

use crate::commands;
use crate::scanner::Scanner;
use crate::types::{GroupType, Modulation, SystemType};

/// Editable attributes of a System, as written by `SIN`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SystemSettings {
    pub name: String,
    pub quick_key: Option<QuickKey>,
    pub hold_time: u8,
    pub lockout: bool,
    pub attenuation: bool,
    pub delay_time: u8,
    pub data_skip: bool,
    pub emergency_alert: bool,
}

/// A System record as read back from the scanner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SystemRecord {
    pub index: Index,
    pub system_type: SystemType,
    #[serde(flatten)]
    pub settings: SystemSettings,
    pub reverse_index: Option<Index>,
    pub forward_index: Option<Index>,
    pub group_head_index: Option<Index>,
    pub group_tail_index: Option<Index>,
    pub sequence_number: u32,
}

/// Editable attributes of a Group, as written by `GIN`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupSettings {
    pub group_name: String,
    pub quick_key: Option<QuickKey>,
    pub lockout: bool,
}

/// A Group record as read back from the scanner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GroupRecord {
    pub index: Index,
    pub group_type: GroupType,
    #[serde(flatten)]
    pub settings: GroupSettings,
    pub reverse_index: Option<Index>,
    pub forward_index: Option<Index>,
    pub system_index: Index,
    pub channel_head_index: Option<Index>,
    pub channel_tail_index: Option<Index>,
    pub group_sequence: u32,
}

/// Editable attributes of a Channel, as written by `CIN`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelSettings {
    pub name: String,
    pub frequency: Frequency,
    pub search_step: u16,
    pub modulation: Modulation,
    pub ctcss_dcs_mode: u8,
    pub ctcss_dcs_tone_lockout: bool,
    pub lockout: bool,
    pub priority: u8,
    pub attenuation: bool,
    pub alert: bool,
}

/// A Channel record as read back from the scanner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChannelRecord {
    pub index: Index,
    #[serde(flatten)]
    pub settings: ChannelSettings,
    pub reverse_index: Option<Index>,
    pub forward_index: Option<Index>,
    pub system_index: Index,
    pub group_index: Index,
}

/// A record that lives in one of the scanner's linked lists.
pub trait ChainRecord: Serialize {
    /// Record kind, for messages.
    const KIND: &'static str;

    /// Fields that only describe the record's position in memory.
    const STRUCTURAL_FIELDS: &'static [&'static str];

    fn index(&self) -> Index;
    fn reverse_index(&self) -> Option<Index>;
    fn forward_index(&self) -> Option<Index>;

    /// Position number the scanner reports, if the kind carries one.
    fn sequence(&self) -> Option<u32> {
        None
    }
}

impl ChainRecord for SystemRecord {
    const KIND: &'static str = "system";
    const STRUCTURAL_FIELDS: &'static [&'static str] = &[
        "index",
        "reverse_index",
        "forward_index",
        "group_head_index",
        "group_tail_index",
    ];

    fn index(&self) -> Index {
        self.index
    }
    fn reverse_index(&self) -> Option<Index> {
        self.reverse_index
    }
    fn forward_index(&self) -> Option<Index> {
        self.forward_index
    }
    fn sequence(&self) -> Option<u32> {
        Some(self.sequence_number)
    }
}

impl ChainRecord for GroupRecord {
    const KIND: &'static str = "group";
    const STRUCTURAL_FIELDS: &'static [&'static str] = &[
        "index",
        "reverse_index",
        "forward_index",
        "system_index",
        "channel_head_index",
        "channel_tail_index",
    ];

    fn index(&self) -> Index {
        self.index
    }
    fn reverse_index(&self) -> Option<Index> {
        self.reverse_index
    }
    fn forward_index(&self) -> Option<Index> {
        self.forward_index
    }
    fn sequence(&self) -> Option<u32> {
        Some(self.group_sequence)
    }
}

impl ChainRecord for ChannelRecord {
    const KIND: &'static str = "channel";
    const STRUCTURAL_FIELDS: &'static [&'static str] = &[
        "index",
        "reverse_index",
        "forward_index",
        "system_index",
        "group_index",
    ];

    fn index(&self) -> Index {
        self.index
    }
    fn reverse_index(&self) -> Option<Index> {
        self.reverse_index
    }
    fn forward_index(&self) -> Option<Index> {
        self.forward_index
    }
}

/// One linked list in scanner memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChainScope {
    /// The top-level system list.
    Systems,
    /// The group list of the given system.
    Groups(Index),
    /// The channel list of the given group.
    Channels(Index),
}

impl std::fmt::Display for ChainScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChainScope::Systems => f.write_str("system list"),
            ChainScope::Groups(system) => write!(f, "group list of system {system}"),
            ChainScope::Channels(group) => write!(f, "channel list of group {group}"),
        }
    }
}

impl Scanner {
    /// First record of a list, or `None` if it is empty.
    pub async fn head_index(&self, scope: ChainScope) -> Result<Option<Index>> {
        match scope {
            ChainScope::Systems => {
                let fields = self.execute_command(&commands::cmd_read_system_head()).await?;
                commands::parse_link_response(&fields)
            }
            ChainScope::Groups(system) => Ok(self.system_info(system).await?.group_head_index),
            ChainScope::Channels(group) => Ok(self.group_info(group).await?.channel_head_index),
        }
    }

    /// Last record of a list, or `None` if it is empty.
    pub async fn tail_index(&self, scope: ChainScope) -> Result<Option<Index>> {
        match scope {
            ChainScope::Systems => {
                let fields = self.execute_command(&commands::cmd_read_system_tail()).await?;
                commands::parse_link_response(&fields)
            }
            ChainScope::Groups(system) => Ok(self.system_info(system).await?.group_tail_index),
            ChainScope::Channels(group) => Ok(self.group_info(group).await?.channel_tail_index),
        }
    }

    // ---------------------------------------------------------------
    // Systems
    // ---------------------------------------------------------------

    /// Number of systems in memory (`SCT`).
    pub async fn system_count(&self) -> Result<usize> {
        let fields = self.execute_command(&commands::cmd_read_system_count()).await?;
        commands::parse_count_response(&fields)
    }

    /// Read a System record (`SIN`).
    pub async fn system_info(&self, index: Index) -> Result<SystemRecord> {
        let fields = self
            .execute_command(&commands::cmd_read_system_info(index))
            .await?;
        commands::parse_system_info(index, &fields)
    }

    /// Write a System's editable attributes (`SIN`).
    pub async fn set_system_info(&self, index: Index, settings: &SystemSettings) -> Result<()> {
        let cmd = commands::cmd_set_system_info(index, settings)?;
        self.execute_set_command(&cmd).await
    }

    /// Create a System at the tail of the system list (`CSY`).
    ///
    /// Returns [`Error::OutOfResources`](scanlib_core::Error::OutOfResources)
    /// when the scanner has no free memory.
    pub async fn create_system(&self, system_type: SystemType) -> Result<Index> {
        let fields = self
            .execute_command(&commands::cmd_create_system(system_type))
            .await?;
        commands::parse_created_index(&fields)
    }

    /// Delete a System with all its groups and channels (`DSY`).
    pub async fn delete_system(&self, index: Index) -> Result<()> {
        self.execute_set_command(&commands::cmd_delete_system(index))
            .await
    }

    // ---------------------------------------------------------------
    // Groups
    // ---------------------------------------------------------------

    /// Read a Group record (`GIN`).
    pub async fn group_info(&self, index: Index) -> Result<GroupRecord> {
        let fields = self
            .execute_command(&commands::cmd_read_group_info(index))
            .await?;
        commands::parse_group_info(index, &fields)
    }

    /// Write a Group's editable attributes (`GIN`).
    pub async fn set_group_info(&self, index: Index, settings: &GroupSettings) -> Result<()> {
        let cmd = commands::cmd_set_group_info(index, settings)?;
        self.execute_set_command(&cmd).await
    }

    /// Append a Group to a system's group list (`AGC` / `AGI`).
    pub async fn append_group(&self, system: Index, group_type: GroupType) -> Result<Index> {
        let fields = self
            .execute_command(&commands::cmd_append_group(system, group_type))
            .await?;
        commands::parse_created_index(&fields)
    }

    /// Delete a Group with all its channels (`DGR`).
    pub async fn delete_group(&self, index: Index) -> Result<()> {
        self.execute_set_command(&commands::cmd_delete_group(index))
            .await
    }

    // ---------------------------------------------------------------
    // Channels
    // ---------------------------------------------------------------

    /// Read a Channel record (`CIN`).
    pub async fn channel_info(&self, index: Index) -> Result<ChannelRecord> {
        let fields = self
            .execute_command(&commands::cmd_read_channel_info(index))
            .await?;
        commands::parse_channel_info(index, &fields)
    }

    /// Write a Channel's editable attributes (`CIN`).
    pub async fn set_channel_info(&self, index: Index, settings: &ChannelSettings) -> Result<()> {
        let cmd = commands::cmd_set_channel_info(index, settings)?;
        self.execute_set_command(&cmd).await
    }

    /// Append a Channel to a group's channel list (`ACC`).
    pub async fn append_channel(&self, group: Index) -> Result<Index> {
        let fields = self
            .execute_command(&commands::cmd_append_channel(group))
            .await?;
        commands::parse_created_index(&fields)
    }

    /// Delete a Channel (`DCH`).
    pub async fn delete_channel(&self, index: Index) -> Result<()> {
        self.execute_set_command(&commands::cmd_delete_channel(index))
            .await
    }
}
