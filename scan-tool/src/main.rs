// scan-tool -- command-line export, import and status for the Uniden BC246T.
//
// Usage:
//   scan-tool --port /dev/ttyUSB0 info
//   scan-tool --port /dev/ttyUSB0 export --output memory.json
//   scan-tool --port /dev/ttyUSB0 import memory.json --yes
//   scan-tool --port /dev/ttyUSB0 import memory.json --keep-memory --no-resume
//   scan-tool --port /dev/ttyUSB0 clear --yes
//   scan-tool --mock export --include-defaults

mod logging;

use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use tracing::{info, warn};

use scanlib_test_harness::SimulatedScanner;
use scanlib_uniden::export::read_device_info;
use scanlib_uniden::models::bc246t;
use scanlib_uniden::{
    Compatibility, Document, ExportOptions, ImportOptions, Scanner, ScannerBuilder,
    check_compatibility, export, import,
};

use crate::logging::{LogFormat, LogLevel, init_logging};

// ---------------------------------------------------------------------------
// CLI argument definitions
// ---------------------------------------------------------------------------

/// Read, back up and restore a Uniden BC246T over its serial port.
#[derive(Parser)]
#[command(name = "scan-tool", version, about)]
struct Cli {
    /// Serial port path (e.g. /dev/ttyUSB0, COM3).
    /// Required unless --mock is used.
    #[arg(long, env = "SCANLIB_PORT")]
    port: Option<String>,

    /// Override the model's default baud rate.
    #[arg(long, env = "SCANLIB_BAUD")]
    baud: Option<u32>,

    /// Time to wait for each response, in milliseconds.
    #[arg(long, default_value_t = 1000)]
    timeout_ms: u64,

    /// Talk to an in-memory simulated scanner instead of a serial port.
    #[arg(long)]
    mock: bool,

    #[arg(long, value_enum, default_value = "warn")]
    log_level: LogLevel,

    #[arg(long, value_enum, default_value = "text")]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print model, firmware, memory usage and battery voltage.
    #[command(alias = "status")]
    Info,

    /// Read all of scanner memory into a JSON document.
    Export {
        /// Keep fields that equal their factory default.
        #[arg(long)]
        include_defaults: bool,

        /// Write the document here instead of stdout.
        #[arg(long, short)]
        output: Option<PathBuf>,

        /// Skip schema validation of the result.
        #[arg(long)]
        no_validate: bool,
    },

    /// Write a JSON document into scanner memory.
    Import {
        /// Document to import.
        file: PathBuf,

        /// Proceed on a firmware mismatch without asking.
        #[arg(long)]
        force: bool,

        /// Append to existing memory instead of clearing it first.
        #[arg(long)]
        keep_memory: bool,

        /// Do not press Scan when done.
        #[arg(long)]
        no_resume: bool,

        /// Erase memory without asking first.
        #[arg(long, short)]
        yes: bool,
    },

    /// Erase all systems, groups and channels.
    Clear {
        /// Do not ask for confirmation.
        #[arg(long, short)]
        yes: bool,
    },
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Prompt the user for y/N confirmation. Returns true only if "y" or "Y" entered.
fn confirm(prompt: &str) -> bool {
    eprint!("{prompt}");
    io::stderr().flush().ok();
    let mut input = String::new();
    if io::stdin().read_line(&mut input).is_err() {
        return false;
    }
    matches!(input.trim(), "y" | "Y")
}

/// Whether an import has to ask before it erases scanner memory.
fn import_needs_wipe_confirmation(keep_memory: bool, yes: bool) -> bool {
    !keep_memory && !yes
}

async fn create_scanner(cli: &Cli) -> Result<Scanner> {
    let mut builder =
        ScannerBuilder::new(bc246t()).command_timeout(Duration::from_millis(cli.timeout_ms));
    if let Some(baud) = cli.baud {
        builder = builder.baud_rate(baud);
    }

    if cli.mock {
        info!("using simulated scanner");
        return builder
            .build_with_transport(Box::new(SimulatedScanner::new()))
            .await
            .context("failed to set up simulated scanner");
    }

    let Some(port) = cli.port.as_deref() else {
        bail!("--port (or SCANLIB_PORT) is required unless --mock is used");
    };
    builder
        .serial_port(port)
        .build()
        .await
        .with_context(|| format!("failed to open {port}"))
}

fn read_document(path: &Path) -> Result<Document> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    Document::from_json(&text).with_context(|| format!("{} is not a memory document", path.display()))
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

async fn cmd_info(scanner: &Scanner) -> Result<()> {
    let device = read_device_info(scanner)
        .await
        .context("failed to identify scanner")?;

    scanner.enter_program_mode().await?;
    let body = async {
        let used = scanner.memory_used().await?;
        let volts = scanner.battery_voltage().await?;
        let systems = scanner.system_count().await?;
        Ok::<_, scanlib_core::Error>((used, volts, systems))
    }
    .await;
    let (used, volts, systems) = scanner
        .finish_program_session(body)
        .await
        .context("failed to read scanner status")?;

    println!("Scanner");
    println!("  Model:          {}", device.model);
    println!("  Firmware:       {}", device.firmware);
    println!();
    println!("Status");
    println!("  Memory used:    {used}%");
    println!("  Systems:        {systems} of {}", scanner.model().max_systems);
    println!("  Battery:        {volts:.2} V");
    Ok(())
}

async fn cmd_export(
    scanner: &Scanner,
    include_defaults: bool,
    output: Option<&Path>,
    validate: bool,
) -> Result<()> {
    let options = ExportOptions {
        include_defaults,
        validate,
    };
    let document = export(scanner, &options).await.context("export failed")?;
    let text = document.to_json_pretty()?;

    match output {
        Some(path) => {
            std::fs::write(path, format!("{text}\n"))
                .with_context(|| format!("failed to write {}", path.display()))?;
            eprintln!(
                "Exported {} systems, {} groups, {} channels to {}",
                document.systems.len(),
                document.group_count(),
                document.channel_count(),
                path.display()
            );
        }
        None => println!("{text}"),
    }
    Ok(())
}

async fn cmd_import(
    scanner: &Scanner,
    file: &Path,
    force: bool,
    keep_memory: bool,
    no_resume: bool,
    yes: bool,
) -> Result<()> {
    let document = read_document(file)?;
    let device = read_device_info(scanner)
        .await
        .context("failed to identify scanner")?;

    match check_compatibility(&device, &document.info) {
        Compatibility::Match => {}
        Compatibility::ModelMismatch { device, document } => {
            bail!("document was taken from a {document}, this scanner is a {device}");
        }
        Compatibility::FirmwareMismatch { device, document } => {
            warn!(device = %device, document = %document, "firmware mismatch");
            if !force
                && !confirm(&format!(
                    "Document firmware {document:?} differs from scanner firmware {device:?}. Continue? [y/N] "
                ))
            {
                bail!("import cancelled");
            }
        }
    }

    if import_needs_wipe_confirmation(keep_memory, yes)
        && !confirm("Import erases all scanner memory first. Continue? [y/N] ")
    {
        bail!("import cancelled");
    }

    let options = ImportOptions {
        clear_memory: !keep_memory,
        validate: true,
        resume_scanning: !no_resume,
    };
    let report = import(scanner, &document, &options)
        .await
        .context("import failed")?;

    eprintln!(
        "Imported {} systems, {} groups, {} channels",
        report.systems.len(),
        report.groups.len(),
        report.channels.len()
    );
    Ok(())
}

async fn cmd_clear(scanner: &Scanner, yes: bool) -> Result<()> {
    if !yes && !confirm("Erase all scanner memory? [y/N] ") {
        bail!("clear cancelled");
    }
    scanner.enter_program_mode().await?;
    let result = scanner.clear_memory().await;
    scanner
        .finish_program_session(result)
        .await
        .context("failed to clear memory")?;
    eprintln!("Scanner memory cleared");
    Ok(())
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.log_format, cli.log_level);

    let scanner = create_scanner(&cli).await?;

    let result = match &cli.command {
        Command::Info => cmd_info(&scanner).await,
        Command::Export {
            include_defaults,
            output,
            no_validate,
        } => cmd_export(&scanner, *include_defaults, output.as_deref(), !no_validate).await,
        Command::Import {
            file,
            force,
            keep_memory,
            no_resume,
            yes,
        } => cmd_import(&scanner, file, *force, *keep_memory, *no_resume, *yes).await,
        Command::Clear { yes } => cmd_clear(&scanner, *yes).await,
    };

    scanner.close().await.ok();
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn status_is_an_alias_for_info() {
        let cli = Cli::try_parse_from(["scan-tool", "--mock", "status"]).unwrap();
        assert!(matches!(cli.command, Command::Info));
    }

    #[test]
    fn import_flags() {
        let cli = Cli::try_parse_from([
            "scan-tool",
            "--port",
            "/dev/ttyUSB0",
            "import",
            "memory.json",
            "--keep-memory",
            "--no-resume",
        ])
        .unwrap();
        match cli.command {
            Command::Import {
                file,
                force,
                keep_memory,
                no_resume,
                yes,
            } => {
                assert_eq!(file, PathBuf::from("memory.json"));
                assert!(!force);
                assert!(keep_memory);
                assert!(no_resume);
                assert!(!yes);
            }
            _ => panic!("expected import"),
        }
    }

    #[test]
    fn import_yes_skips_the_wipe_prompt() {
        let cli = Cli::try_parse_from(["scan-tool", "--mock", "import", "memory.json", "--yes"])
            .unwrap();
        let Command::Import {
            keep_memory, yes, ..
        } = cli.command
        else {
            panic!("expected import");
        };
        assert!(yes);
        assert!(!import_needs_wipe_confirmation(keep_memory, yes));

        let cli = Cli::try_parse_from(["scan-tool", "--mock", "import", "memory.json", "-y"])
            .unwrap();
        assert!(matches!(cli.command, Command::Import { yes: true, .. }));
    }

    #[test]
    fn import_asks_before_wiping_unless_memory_is_kept() {
        assert!(import_needs_wipe_confirmation(false, false));
        assert!(!import_needs_wipe_confirmation(true, false));
        assert!(!import_needs_wipe_confirmation(false, true));
    }

    #[tokio::test]
    async fn mock_export_then_import() {
        let cli = Cli::try_parse_from(["scan-tool", "--mock", "info"]).unwrap();
        let scanner = create_scanner(&cli).await.unwrap();
        cmd_info(&scanner).await.unwrap();

        let document = export(&scanner, &ExportOptions::default()).await.unwrap();
        assert!(document.systems.is_empty());
        let report = import(&scanner, &document, &ImportOptions::default())
            .await
            .unwrap();
        assert!(report.systems.is_empty());
    }
}
