//! Scanner -- the BC246T protocol engine.
//!
//! [`Scanner`] owns the transport and runs one command at a time: it writes
//! a command line, reads until the carriage return, classifies `ERR` / `NG`
//! replies, and checks that the reply echoes the command name. The typed
//! wrappers here cover identity, Program Mode, device settings and remote
//! control. Memory record wrappers live in [`crate::memory`].

use std::time::Duration;

use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use scanlib_core::error::{Error, Result};
use scanlib_core::transport::Transport;

use crate::commands;
use crate::models::ScannerModel;
use crate::protocol::{self, DecodeResult};
use crate::types::{Backlight, KeyCode, KeyMode, PriorityMode};

/// Longest reply line accepted before giving up on a terminator.
const MAX_RESPONSE_LEN: usize = 1024;

/// A connected Uniden scanner.
///
/// Constructed via [`ScannerBuilder`](crate::builder::ScannerBuilder).
pub struct Scanner {
    transport: Mutex<Box<dyn Transport>>,
    model: ScannerModel,
    command_timeout: Duration,
}

impl Scanner {
    pub(crate) fn new(
        transport: Box<dyn Transport>,
        model: ScannerModel,
        command_timeout: Duration,
    ) -> Self {
        Scanner {
            transport: Mutex::new(transport),
            model,
            command_timeout,
        }
    }

    /// The model definition this scanner was built for.
    pub fn model(&self) -> &ScannerModel {
        &self.model
    }

    /// Send one encoded command line and return the reply fields.
    ///
    /// The transport lock is held for the whole exchange, so exactly one
    /// command is outstanding at a time. The first reply field is checked
    /// against the command name.
    pub async fn execute_command(&self, cmd: &[u8]) -> Result<Vec<String>> {
        let name = protocol::command_name(cmd);
        debug!(
            command = name,
            line = %String::from_utf8_lossy(cmd).trim_end_matches('\r'),
            "send"
        );

        let fields = {
            let mut transport = self.transport.lock().await;
            transport.send(cmd).await?;
            self.read_response(&mut transport, name).await?
        };

        if fields.first().map(String::as_str) != Some(name) {
            return Err(Error::UnexpectedResponse(format!(
                "expected reply to {name}, got {fields:?}"
            )));
        }
        debug!(command = name, ?fields, "recv");
        Ok(fields)
    }

    async fn read_response(
        &self,
        transport: &mut Box<dyn Transport>,
        name: &str,
    ) -> Result<Vec<String>> {
        let mut buf = [0u8; 256];
        let mut response_buf = Vec::new();

        loop {
            let n = match tokio::time::timeout(
                self.command_timeout,
                transport.receive(&mut buf, self.command_timeout),
            )
            .await
            {
                Ok(Ok(0)) | Err(_) => return Err(Error::Timeout),
                Ok(Ok(n)) => n,
                Ok(Err(e)) => return Err(e),
            };
            response_buf.extend_from_slice(&buf[..n]);

            match protocol::decode_response(&response_buf) {
                DecodeResult::Response { fields, .. } => return Ok(fields),
                DecodeResult::Rejected(_) => {
                    return Err(Error::Rejected {
                        command: name.to_string(),
                    });
                }
                DecodeResult::NotGood(_) => {
                    return Err(Error::InvalidState {
                        command: name.to_string(),
                    });
                }
                DecodeResult::Malformed(_) => {
                    return Err(Error::UnexpectedResponse(format!(
                        "reply to {name} is not valid text"
                    )));
                }
                DecodeResult::Incomplete if response_buf.len() > MAX_RESPONSE_LEN => {
                    return Err(Error::UnexpectedResponse(format!(
                        "reply to {name} exceeds {MAX_RESPONSE_LEN} bytes without a terminator"
                    )));
                }
                DecodeResult::Incomplete => {}
            }
        }
    }

    /// Send a set command and check its `OK` acknowledgement.
    pub(crate) async fn execute_set_command(&self, cmd: &[u8]) -> Result<()> {
        let fields = self.execute_command(cmd).await?;
        commands::parse_ok(&fields)
    }

    /// Close the underlying transport.
    pub async fn close(&self) -> Result<()> {
        self.transport.lock().await.close().await
    }

    // ---------------------------------------------------------------
    // Identity
    // ---------------------------------------------------------------

    /// Model name reported by the scanner (`MDL`).
    pub async fn model_name(&self) -> Result<String> {
        let fields = self.execute_command(&commands::cmd_read_model()).await?;
        commands::parse_single(&fields).map(str::to_string)
    }

    /// Firmware version reported by the scanner (`VER`).
    pub async fn firmware_version(&self) -> Result<String> {
        let fields = self
            .execute_command(&commands::cmd_read_firmware_version())
            .await?;
        commands::parse_single(&fields).map(str::to_string)
    }

    // ---------------------------------------------------------------
    // Program Mode
    // ---------------------------------------------------------------

    /// Enter Program Mode (`PRG`). Scanning stops until it is exited.
    pub async fn enter_program_mode(&self) -> Result<()> {
        self.execute_set_command(&commands::cmd_enter_program_mode())
            .await?;
        info!("entered program mode");
        Ok(())
    }

    /// Exit Program Mode (`EPG`).
    pub async fn exit_program_mode(&self) -> Result<()> {
        self.execute_set_command(&commands::cmd_exit_program_mode())
            .await?;
        info!("exited program mode");
        Ok(())
    }

    /// Leave Program Mode after `result` was produced inside it.
    ///
    /// The exit is always attempted. An error from `result` takes precedence
    /// over a failed exit, which is then only logged.
    pub async fn finish_program_session<T>(&self, result: Result<T>) -> Result<T> {
        let exit = self.exit_program_mode().await;
        match (result, exit) {
            (Ok(value), Ok(())) => Ok(value),
            (Ok(_), Err(e)) => Err(e),
            (Err(e), Ok(())) => Err(e),
            (Err(e), Err(exit_err)) => {
                warn!(error = %exit_err, "failed to exit program mode after error");
                Err(e)
            }
        }
    }

    // ---------------------------------------------------------------
    // Settings
    // ---------------------------------------------------------------

    pub async fn backlight(&self) -> Result<Backlight> {
        let fields = self.execute_command(&commands::cmd_read_backlight()).await?;
        commands::parse_backlight_response(&fields)
    }

    pub async fn set_backlight(&self, backlight: Backlight) -> Result<()> {
        self.execute_set_command(&commands::cmd_set_backlight(backlight))
            .await
    }

    pub async fn battery_save(&self) -> Result<bool> {
        let fields = self
            .execute_command(&commands::cmd_read_battery_save())
            .await?;
        commands::parse_flag_response(&fields)
    }

    pub async fn set_battery_save(&self, on: bool) -> Result<()> {
        self.execute_set_command(&commands::cmd_set_battery_save(on))
            .await
    }

    pub async fn key_beep(&self) -> Result<bool> {
        let fields = self.execute_command(&commands::cmd_read_key_beep()).await?;
        commands::parse_flag_response(&fields)
    }

    pub async fn set_key_beep(&self, on: bool) -> Result<()> {
        self.execute_set_command(&commands::cmd_set_key_beep(on))
            .await
    }

    /// The two lines of the power-on greeting (`OMS`).
    pub async fn greeting(&self) -> Result<(String, String)> {
        let fields = self.execute_command(&commands::cmd_read_greeting()).await?;
        commands::parse_greeting_response(&fields)
    }

    pub async fn set_greeting(&self, line1: &str, line2: &str) -> Result<()> {
        let cmd = commands::cmd_set_greeting(line1, line2)?;
        self.execute_set_command(&cmd).await
    }

    pub async fn priority_mode(&self) -> Result<PriorityMode> {
        let fields = self
            .execute_command(&commands::cmd_read_priority_mode())
            .await?;
        commands::parse_priority_mode_response(&fields)
    }

    pub async fn set_priority_mode(&self, mode: PriorityMode) -> Result<()> {
        self.execute_set_command(&commands::cmd_set_priority_mode(mode))
            .await
    }

    // ---------------------------------------------------------------
    // Memory and remote control
    // ---------------------------------------------------------------

    /// Erase all systems, groups and channels (`CLR`).
    pub async fn clear_memory(&self) -> Result<()> {
        self.execute_set_command(&commands::cmd_clear_memory())
            .await?;
        info!("cleared scanner memory");
        Ok(())
    }

    /// Percentage of record memory in use (`MEM`).
    pub async fn memory_used(&self) -> Result<u8> {
        let fields = self
            .execute_command(&commands::cmd_read_memory_used())
            .await?;
        commands::parse_memory_used_response(&fields)
    }

    /// Battery voltage in volts (`BAV`).
    pub async fn battery_voltage(&self) -> Result<f32> {
        let fields = self
            .execute_command(&commands::cmd_read_battery_voltage())
            .await?;
        commands::parse_battery_voltage_response(&fields)
    }

    /// Simulate a front-panel key (`KEY`).
    pub async fn push_key(&self, key: KeyCode, mode: KeyMode) -> Result<()> {
        let cmd = commands::cmd_push_key(key, mode)?;
        self.execute_set_command(&cmd).await
    }

    /// Switch the scanner off (`POF`).
    pub async fn power_off(&self) -> Result<()> {
        self.execute_set_command(&commands::cmd_power_off()).await
    }
}
