//! driverwiz - main entry point
//!
//! Wires the wizard core to a terminal session: CLI parsing, tracing
//! setup, the scripted execution engine and the event loop that serializes
//! key events, timer ticks and engine events into the router.

use std::io::Write;
use std::time::{Duration, Instant};

use anyhow::Context;
use crossterm::event::{self, Event};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use driverwiz::cli::{Cli, Commands};
use driverwiz::{
    CarryPayload, DeviceSummary, DriverEngine, DriverSelection, EngineEvent, EngineHandle,
    EnginePlan, EventRouter, KeyOutcome, NavEvent, PipelineKind, Screen, ScriptedEngine,
};

/// Spinner tick interval on the progressing screens.
const TICK_INTERVAL: Duration = Duration::from_millis(120);

/// Initialize the tracing subscriber. `RUST_LOG` overrides the default
/// `info` filter.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> anyhow::Result<()> {
    init_tracing();
    let cli = Cli::parse_args();

    match &cli.command {
        Some(Commands::Validate { plan }) => {
            info!("validating engine plan: {}", plan.display());
            match EnginePlan::load_from_file(plan) {
                Ok(loaded) => {
                    println!("plan is valid: {} events", loaded.events.len());
                }
                Err(e) => {
                    eprintln!("plan validation failed: {e}");
                    std::process::exit(1);
                }
            }
        }
        Some(Commands::Install { script }) => {
            let engine = engine_from(script.as_deref())?;
            run_wizard(PipelineKind::Install, engine, &cli)?;
        }
        Some(Commands::Uninstall { script }) => {
            let engine = engine_from(script.as_deref())?;
            run_wizard(PipelineKind::Uninstall, engine, &cli)?;
        }
        None => {
            info!("no command specified, running the install wizard");
            run_wizard(PipelineKind::Install, ScriptedEngine::demo(), &cli)?;
        }
    }

    Ok(())
}

fn engine_from(script: Option<&std::path::Path>) -> anyhow::Result<ScriptedEngine> {
    match script {
        Some(path) => ScriptedEngine::from_file(path)
            .with_context(|| format!("loading engine plan from {}", path.display())),
        None => Ok(ScriptedEngine::demo()),
    }
}

/// Device summary used when no real detection engine is attached.
fn placeholder_device() -> DeviceSummary {
    DeviceSummary {
        vendor: "Acme".to_string(),
        model: "ZX-9000 Accelerator".to_string(),
        bus_id: "0000:03:00.0".to_string(),
        current_module: None,
    }
}

/// Run one wizard session until the operator leaves a terminal screen.
fn run_wizard(kind: PipelineKind, engine: ScriptedEngine, cli: &Cli) -> anyhow::Result<()> {
    let mut router = EventRouter::with_log_lines(cli.log_lines);
    if kind == PipelineKind::Uninstall {
        router.navigate(NavEvent::BeginUninstall);
    }

    let interactive = !cli.batch;
    if interactive {
        enable_raw_mode().context("enabling raw terminal mode")?;
    }
    let result = session_loop(&mut router, &engine, interactive);
    if interactive {
        let _ = disable_raw_mode();
    }
    result?;

    let failed = matches!(
        router.screen(),
        Screen::InstallFailed | Screen::UninstallFailed
    );
    print_outcome(&router);
    if failed && cli.batch {
        std::process::exit(1);
    }
    Ok(())
}

fn session_loop(
    router: &mut EventRouter,
    engine: &ScriptedEngine,
    interactive: bool,
) -> anyhow::Result<()> {
    let mut handle: Option<EngineHandle> = None;
    let mut last_line = String::new();
    let mut last_tick = Instant::now();

    loop {
        // External collaborators the core only sees as events: detection
        // resolves immediately with the placeholder device.
        if router.screen() == Screen::Detecting {
            router.navigate(NavEvent::DetectionFinished(placeholder_device()));
        }

        // A fresh run on a progressing screen needs an engine worker.
        if router.screen().is_progressing() && handle.is_none() {
            let run = router.run().expect("progressing screen without a run");
            let selection = router.navigator().selection().cloned();
            debug!(pipeline = %run.kind(), "spawning engine worker");
            handle = Some(engine.spawn(run.kind(), selection.as_ref())?);
        }

        // Drain engine events in arrival order.
        if let Some(h) = &handle {
            while let Some(event) = h.try_recv() {
                router.dispatch_engine(event);
            }
        }

        // Spinner ticks; cosmetic only.
        if router.run().is_some() && last_tick.elapsed() >= TICK_INTERVAL {
            router.dispatch_engine(EngineEvent::Tick);
            last_tick = Instant::now();
        }

        render_status(router, &mut last_line, interactive)?;

        if router.screen().is_terminal() {
            break;
        }

        if interactive {
            if event::poll(Duration::from_millis(100)).context("polling terminal events")? {
                match event::read().context("reading terminal event")? {
                    Event::Key(key) => {
                        // Selecting advances with a concrete selection, not
                        // a bare continue.
                        if router.screen() == Screen::Selecting
                            && key.code == event::KeyCode::Enter
                        {
                            router.navigate(NavEvent::SelectionConfirmed(default_selection(
                                router,
                            )));
                        } else if router.handle_key(key) == KeyOutcome::Quit {
                            break;
                        }
                    }
                    // Layout is not this crate's concern
                    Event::Resize(..) => {}
                    _ => {}
                }
            }
        } else {
            batch_advance(router);
            std::thread::sleep(Duration::from_millis(20));
        }

        // A leftover worker after exiting the progressing screen should
        // stop emitting.
        if router.run().is_none() {
            if let Some(h) = handle.take() {
                h.request_cancel();
                h.join();
            }
        }
    }

    if let Some(h) = handle.take() {
        h.request_cancel();
        h.join();
    }
    Ok(())
}

/// Auto-advance one step of the flow in batch mode.
fn batch_advance(router: &mut EventRouter) {
    match router.screen() {
        Screen::Welcome | Screen::Confirming | Screen::UninstallConfirming => {
            router.navigate(NavEvent::Continue);
        }
        Screen::Selecting => {
            router.navigate(NavEvent::SelectionConfirmed(default_selection(router)));
        }
        screen if screen.is_progressing() => {
            if router.run().map(|run| run.is_terminal()).unwrap_or(false) {
                router.request_exit();
            }
        }
        _ => {}
    }
}

/// Selection used when the operator just presses through: the detected
/// device with the default driver and no optional components.
fn default_selection(router: &EventRouter) -> DriverSelection {
    let device = match router.payload() {
        CarryPayload::Device(device) => device.clone(),
        _ => placeholder_device(),
    };
    DriverSelection::new(device, "latest")
}

const SPINNER: &[char] = &['|', '/', '-', '\\'];

/// Emit a one-line status whenever it changes. Raw mode needs explicit
/// carriage returns.
fn render_status(
    router: &EventRouter,
    last_line: &mut String,
    interactive: bool,
) -> anyhow::Result<()> {
    let line = match router.run() {
        Some(run) => {
            let spinner = SPINNER[(run.ticks() as usize) % SPINNER.len()];
            let percent = (run.progress() * 100.0).round() as u32;
            let step = run
                .ledger()
                .get(run.current_step())
                .map(|step| step.description.as_str())
                .unwrap_or("");
            format!("{spinner} [{percent:3}%] {step}")
        }
        None => format!("screen: {}", router.screen()),
    };
    if line != *last_line {
        let newline = if interactive { "\r\n" } else { "\n" };
        print!("{line}{newline}");
        std::io::stdout().flush()?;
        *last_line = line;
    }
    Ok(())
}

/// Print the final screen's carry payload as plain lines.
fn print_outcome(router: &EventRouter) {
    match router.payload() {
        CarryPayload::Outcome(report) => {
            println!("{}", router.screen());
            for package in &report.installed {
                println!("installed: {package}");
            }
            for package in &report.removed {
                println!("removed: {package}");
            }
            if report.reboot_required {
                println!("reboot required to finish applying changes");
            }
            if let Some(message) = &report.message {
                println!("{message}");
            }
        }
        CarryPayload::Failure(failure) => {
            println!("{}", router.screen());
            if failure.step_description.is_empty() {
                println!("error: {}", failure.error);
            } else {
                println!("error during '{}': {}", failure.step_description, failure.error);
            }
        }
        _ => println!("{}", router.screen()),
    }
}
