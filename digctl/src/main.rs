//! digctl - run DIG output bring-up against a simulated adapter
//!
//! Usage: `digctl [board.json]`, or `digctl --init [board.json]` to write the
//! built-in board description.

mod settings;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use dig_core::{DisplayAdapter, ModeStatus, PowerState};
use dig_hw::{ConnectorType, FirmwareTables, HdmiController};
use dig_sim::{Access, SimCrtc, SimFirmware, SimHdmi, SimRegisters};
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use settings::{BoardConfig, OutputEntry};

fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "digctl=info,dig_core=info,dig_hw=info,dig_sim=info".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let mut args = std::env::args().skip(1).peekable();
    if args.peek().map(String::as_str) == Some("--init") {
        args.next();
        let path = match args.next() {
            Some(p) => PathBuf::from(p),
            None => BoardConfig::default_path()?,
        };
        BoardConfig::default().save_to(&path)?;
        println!("wrote {}", path.display());
        return Ok(());
    }

    let board = match args.next() {
        Some(p) => BoardConfig::load_from(&PathBuf::from(p))?,
        None => BoardConfig::load()?,
    };
    run(&board)
}

fn run(board: &BoardConfig) -> anyhow::Result<()> {
    let regs = Arc::new(SimRegisters::new());
    let mut adapter = DisplayAdapter::new(regs.clone(), regs.clone())
        .with_config(board.adapter.clone())
        .with_igp(board.igp);
    if let Some(config) = board.firmware_config() {
        let firmware: Arc<dyn FirmwareTables> = Arc::new(SimFirmware::from_config(config));
        adapter = adapter.with_firmware(firmware);
    }
    let adapter = Arc::new(adapter);
    info!("Starting bring-up of {} outputs", board.outputs.len());

    let mut outputs = Vec::new();
    for entry in &board.outputs {
        let hdmi: Option<Box<dyn HdmiController>> = match entry.connector {
            ConnectorType::Panel => None,
            _ => Some(Box::new(SimHdmi::new())),
        };
        match adapter.create_output(entry.id, entry.connector, hdmi) {
            Ok(mut output) => {
                output.attach_crtc(Arc::new(SimCrtc::new(entry.crtc)));
                outputs.push((entry, output));
            }
            Err(e) => error!("{}: {}", entry.id, e),
        }
    }

    for (entry, output) in &mut outputs {
        regs.clear_trace();
        if let Err(e) = output.allocate() {
            warn!("{}: {}", entry.id, e);
            continue;
        }
        bring_up(entry, output)?;
        print_trace(entry, &regs.trace());
    }

    for (entry, output) in &mut outputs {
        output.power(PowerState::Shutdown);
        if let Err(e) = output.free() {
            warn!("{}: {}", entry.id, e);
        }
    }

    for event in adapter.drain_slot_events() {
        println!("slot event: {:?}", event);
    }
    Ok(())
}

fn bring_up(entry: &OutputEntry, output: &mut dig_core::Output) -> anyhow::Result<()> {
    let mode = entry.mode();
    if output.mode_valid(&mode) != ModeStatus::Ok {
        warn!("{}: mode {} rejected", entry.id, mode);
        return Ok(());
    }
    output
        .mode(&mode)
        .with_context(|| format!("programming {} on {}", mode, entry.id))?;
    output.power(PowerState::On);
    Ok(())
}

fn print_trace(entry: &OutputEntry, trace: &[Access]) {
    let writes = trace
        .iter()
        .filter(|a| matches!(a, Access::Write { .. }))
        .count();
    let delay_us: u64 = trace
        .iter()
        .map(|a| match a {
            Access::Delay { us } => u64::from(*us),
            _ => 0,
        })
        .sum();
    println!(
        "{} ({:?}): {} writes, {} us of settle time",
        entry.id, entry.connector, writes, delay_us
    );
    for access in trace {
        if let Ok(line) = serde_json::to_string(access) {
            println!("  {}", line);
        }
    }
}
