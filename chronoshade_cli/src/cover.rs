//! Cover assembly and command execution: config mapping, relay backend,
//! worker thread, and progress reporting.

use crate::cli::{Commands, json_mode};
use crate::error_fmt::INVALID_CONFIG;
use chronoshade_config::{ActuatorKind, Config, CoverCfg};
use chronoshade_core::conversions::cover_setup;
use chronoshade_core::{
    Command, CoverHandle, CoverRemote, CoverSnapshot, JsonFileStore, Level, Momentary, Motion,
    MovementController, Result,
};
use chronoshade_traits::{DirectionalActuator, LevelActuator, MomentaryActuator};
use eyre::WrapErr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Set to a non-empty value other than `0` to make the simulated relay fail.
#[cfg(not(all(feature = "hardware", target_os = "linux")))]
pub const SIM_FAIL_ENV: &str = "CHRONOSHADE_SIM_FAIL";

type BoxedActuator = Box<dyn DirectionalActuator + Send>;

fn wrap<R>(kind: ActuatorKind, relay: R) -> BoxedActuator
where
    R: LevelActuator + MomentaryActuator + Send + 'static,
{
    match kind {
        ActuatorKind::Level => Box::new(Level(relay)),
        ActuatorKind::Momentary => Box::new(Momentary(relay)),
    }
}

#[cfg(all(feature = "hardware", target_os = "linux"))]
fn make_actuator(id: &str, cfg: &CoverCfg) -> Result<BoxedActuator> {
    use chronoshade_hardware::RelayPins;

    let Some(pins) = cfg.pins else {
        return Err(eyre::eyre!("cover {id} has no [pins] for the gpio backend").wrap_err(INVALID_CONFIG));
    };
    let relay = chronoshade_hardware::gpio::GpioRelay::new(RelayPins {
        open: pins.open,
        close: pins.close,
        stop: pins.stop,
    })
    .wrap_err_with(|| format!("open relay pins of cover {id}"))?;
    Ok(wrap(cfg.actuator, relay))
}

#[cfg(not(all(feature = "hardware", target_os = "linux")))]
fn make_actuator(id: &str, cfg: &CoverCfg) -> Result<BoxedActuator> {
    let relay = chronoshade_hardware::SimulatedRelay::new(id);
    if std::env::var(SIM_FAIL_ENV).is_ok_and(|v| !v.is_empty() && v != "0") {
        relay.set_failing(true);
    }
    Ok(wrap(cfg.actuator, relay))
}

/// Build cover `raw_id` from the config and start its worker.
pub fn open_cover(cfg: &Config, raw_id: &str) -> Result<CoverHandle> {
    let Some((id, cover)) = cfg.cover(raw_id) else {
        let known: Vec<&str> = cfg.covers.keys().map(String::as_str).collect();
        eyre::bail!("unknown cover {raw_id:?} (configured: {})", known.join(", "));
    };
    let setup = cover_setup(&id, cover, &cfg.controller)?;
    let actuator = make_actuator(&id, cover)?;
    let store = JsonFileStore::new(&cfg.state.path);
    CoverHandle::spawn(MovementController::new(setup, actuator, store))
}

/// Map a subcommand to the cover commands it issues; empty for read-only ones.
fn command_for(cmd: &Commands) -> Vec<Command> {
    use chronoshade_core::AxisKind;
    match cmd {
        Commands::Open(_) => vec![Command::Open],
        Commands::Close(_) => vec![Command::Close],
        Commands::SetPosition { position, .. } => vec![Command::SetPosition(*position)],
        Commands::OpenTilt(_) => vec![Command::OpenTilt],
        Commands::CloseTilt(_) => vec![Command::CloseTilt],
        Commands::SetTilt { tilt, .. } => vec![Command::SetTilt(*tilt)],
        Commands::Stop(_) => vec![Command::Stop],
        Commands::Calibrate { position, tilt, .. } => {
            let mut out = Vec::new();
            if let Some(value) = position {
                out.push(Command::Calibrate {
                    axis: AxisKind::Position,
                    value: *value,
                });
            }
            if let Some(value) = tilt {
                out.push(Command::Calibrate {
                    axis: AxisKind::Tilt,
                    value: *value,
                });
            }
            out
        }
        Commands::Status(_) | Commands::CheckConfig => Vec::new(),
    }
}

/// Run one cover subcommand to completion and return the final snapshot.
pub fn run_cover_command(cfg: &Config, raw_id: &str, cmd: &Commands) -> Result<CoverSnapshot> {
    let handle = open_cover(cfg, raw_id)?;
    let commands = command_for(cmd);
    if commands.is_empty() {
        return handle.snapshot();
    }

    let interrupted = Arc::new(AtomicBool::new(false));
    install_stop_on_ctrlc(handle.remote(), interrupted.clone());
    for c in commands {
        handle.send(c)?;
    }
    // A subscription opens with the current state, so the first update
    // already reflects the commands above.
    let updates = handle.subscribe()?;
    loop {
        let snap = updates
            .recv()
            .map_err(|_| chronoshade_core::CoverError::Disconnected)?;
        if !snap.is_moving() {
            if interrupted.load(Ordering::Relaxed) {
                tracing::warn!(cover = %snap.cover, position = snap.position, "interrupted; cover stopped");
            }
            return Ok(snap);
        }
        report_progress(&snap);
    }
}

fn install_stop_on_ctrlc(remote: CoverRemote, interrupted: Arc<AtomicBool>) {
    let res = ctrlc::set_handler(move || {
        interrupted.store(true, Ordering::Relaxed);
        if let Err(e) = remote.stop() {
            tracing::error!(error = %e, "stop on interrupt failed");
        }
    });
    if let Err(e) = res {
        tracing::warn!(error = %e, "could not install Ctrl-C handler; interrupting will not stop the cover");
    }
}

fn motion_name(m: Motion) -> &'static str {
    match m {
        Motion::Idle => "idle",
        Motion::Opening => "opening",
        Motion::Closing => "closing",
    }
}

/// Render a simple progress bar of `width` characters for a 0-100 value.
pub fn render_bar(value: u8, width: usize) -> String {
    let filled = usize::from(value.min(100)) * width / 100;
    format!("[{}{}]", "#".repeat(filled), ".".repeat(width - filled))
}

fn report_progress(s: &CoverSnapshot) {
    if json_mode() {
        if let Ok(line) = serde_json::to_string(s) {
            println!("{line}");
        }
        return;
    }
    if s.tilt_motion != Motion::Idle {
        let tilt = s.tilt.unwrap_or(0);
        println!(
            "{} tilt {} {tilt:>3}% {}",
            s.cover,
            render_bar(tilt, 20),
            motion_name(s.tilt_motion)
        );
    } else {
        println!(
            "{} {} {:>3}% {}",
            s.cover,
            render_bar(s.position, 20),
            s.position,
            motion_name(s.motion)
        );
    }
}

/// Final one-line summary of a cover.
pub fn print_summary(s: &CoverSnapshot) {
    if json_mode() {
        if let Ok(line) = serde_json::to_string(s) {
            println!("{line}");
        }
        return;
    }
    match s.tilt {
        Some(t) => println!(
            "{}: position {}%, tilt {t}% ({})",
            s.cover,
            s.position,
            motion_name(s.motion)
        ),
        None => println!("{}: position {}% ({})", s.cover, s.position, motion_name(s.motion)),
    }
}

/// Validate the whole config and build every cover without starting it.
pub fn check_config(cfg: &Config) -> Result<()> {
    use chronoshade_core::TravelProfile;
    use chronoshade_traits::Direction;

    cfg.validate().wrap_err(INVALID_CONFIG)?;
    let mut rows = Vec::new();
    for raw_id in cfg.covers.keys() {
        let Some((id, cover)) = cfg.cover(raw_id) else {
            continue;
        };
        let setup = cover_setup(&id, cover, &cfg.controller)?;
        let opening_s = setup.profile.map(Direction::Opening).total_secs();
        let closing_s = setup.profile.map(Direction::Closing).total_secs();
        let actuator = match cover.actuator {
            ActuatorKind::Level => "level",
            ActuatorKind::Momentary => "momentary",
        };
        if json_mode() {
            rows.push(serde_json::json!({
                "cover": id,
                "name": setup.name,
                "actuator": actuator,
                "opening_s": opening_s,
                "closing_s": closing_s,
                "tilt": setup.tilt.is_some(),
            }));
        } else {
            println!(
                "{id} ({}): {actuator}, opening {opening_s:.1}s, closing {closing_s:.1}s, tilt {}",
                setup.name,
                if setup.tilt.is_some() { "yes" } else { "no" }
            );
        }
    }
    if json_mode() {
        println!("{}", serde_json::json!({ "ok": true, "covers": rows }));
    } else {
        println!("config ok: {} cover(s)", cfg.covers.len());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::CoverArg;

    #[test]
    fn bar_scales_to_width() {
        assert_eq!(render_bar(0, 10), "[..........]");
        assert_eq!(render_bar(50, 10), "[#####.....]");
        assert_eq!(render_bar(100, 10), "[##########]");
        assert_eq!(render_bar(250, 4), "[####]");
    }

    #[test]
    fn calibrate_issues_one_command_per_axis() {
        let cmd = Commands::Calibrate {
            target: CoverArg {
                cover: "porch".into(),
            },
            position: Some(37),
            tilt: Some(80),
        };
        assert_eq!(command_for(&cmd).len(), 2);
        assert!(command_for(&Commands::CheckConfig).is_empty());
    }
}
