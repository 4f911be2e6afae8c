#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
//! Config schema for chronoshade.
//!
//! - `Config` and sub-structs are deserialized from TOML and validated.
//! - Time maps arrive as a JSON object string, a TOML table, or a total
//!   travel time with evenly spaced positions. This crate only parses them;
//!   structural checks (endpoints, monotonicity) happen in `chronoshade_core`
//!   when a cover is built.
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Full travel time used when a cover gives no timing at all.
pub const DEFAULT_TRAVEL_SECS: f64 = 10.0;
/// Bounds of a tilt travel time, exclusive lower and inclusive upper.
pub const TILT_TIME_RANGE_S: (f64, f64) = (0.1, 300.0);

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct Logging {
    pub file: Option<String>,  // path to .log (JSON lines)
    pub level: Option<String>, // "info","debug"
    /// Log rotation policy: "never" | "daily" | "hourly" (default: never)
    pub rotation: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ControllerCfg {
    /// Live re-estimation interval while a cover moves (ms).
    pub tick_ms: u64,
    /// Delay before a momentary actuator is released again (ms).
    pub release_ms: u64,
}

impl Default for ControllerCfg {
    fn default() -> Self {
        Self {
            tick_ms: 100,
            release_ms: 1000,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct StateCfg {
    /// JSON file holding the last known estimate of every cover.
    pub path: PathBuf,
}

impl Default for StateCfg {
    fn default() -> Self {
        Self {
            path: PathBuf::from("chronoshade_state.json"),
        }
    }
}

#[derive(Debug, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ActuatorKind {
    /// Motor runs while the direction relay is held.
    #[default]
    Level,
    /// Push-button style: every command is pulsed and released.
    Momentary,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
pub struct Pins {
    pub open: u8,
    pub close: u8,
    pub stop: Option<u8>,
}

/// Raw time map as written in the config file.
#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(untagged)]
pub enum TimeMapInput {
    /// `'{"0": 0, "10": 100}'`
    Json(String),
    /// `{ "0" = 0, "10" = 100 }`
    Table(BTreeMap<String, f64>),
}

/// How the breakpoints of one direction are to be built.
#[derive(Debug, Clone, PartialEq)]
pub enum MapSpec {
    /// Explicit `(seconds, position)` pairs, in file order.
    Breakpoints(Vec<(f64, u8)>),
    /// `positions` spread evenly over `total_s` seconds.
    Evenly { total_s: f64, positions: Vec<u8> },
}

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default, deny_unknown_fields)]
pub struct CoverCfg {
    /// Display name; the table key is used when absent.
    pub name: Option<String>,
    pub actuator: ActuatorKind,
    pub opening_time_map: Option<TimeMapInput>,
    pub closing_time_map: Option<TimeMapInput>,
    /// Simple mode: total travel time of each direction (s).
    pub opening_time: Option<f64>,
    pub closing_time: Option<f64>,
    /// Simple mode: positions passed at evenly spaced times.
    pub opening_positions: Option<Vec<u8>>,
    pub closing_positions: Option<Vec<u8>>,
    pub tilting_time_down: Option<f64>,
    pub tilting_time_up: Option<f64>,
    /// GPIO relay pins; only needed for the hardware backend.
    pub pins: Option<Pins>,
}

impl CoverCfg {
    pub fn opening_map(&self) -> eyre::Result<MapSpec> {
        map_spec(
            "opening",
            self.opening_time_map.as_ref(),
            self.opening_time,
            self.opening_positions.as_deref(),
            &[0, 100],
        )
    }

    pub fn closing_map(&self) -> eyre::Result<MapSpec> {
        map_spec(
            "closing",
            self.closing_time_map.as_ref(),
            self.closing_time,
            self.closing_positions.as_deref(),
            &[100, 0],
        )
    }

    pub fn has_tilt(&self) -> bool {
        self.tilting_time_down.is_some() || self.tilting_time_up.is_some()
    }
}

#[derive(Debug, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub logging: Logging,
    #[serde(default)]
    pub controller: ControllerCfg,
    #[serde(default)]
    pub state: StateCfg,
    /// One table per cover; the key is the cover's stable identity.
    #[serde(default)]
    pub covers: BTreeMap<String, CoverCfg>,
}

pub fn load_toml(s: &str) -> Result<Config, toml::de::Error> {
    toml::from_str::<Config>(s)
}

/// Stable identity of a cover: lower-cased, with every character outside
/// `[a-z0-9_]` replaced by `_`.
pub fn normalize_id(raw: &str) -> String {
    raw.chars()
        .map(|c| {
            let c = c.to_ascii_lowercase();
            if c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

impl Config {
    /// Look a cover up by id, comparing normalized identities.
    pub fn cover(&self, id: &str) -> Option<(String, &CoverCfg)> {
        let wanted = normalize_id(id);
        self.covers
            .iter()
            .find(|(key, _)| normalize_id(key) == wanted)
            .map(|(_, cfg)| (wanted, cfg))
    }

    pub fn validate(&self) -> eyre::Result<()> {
        // Controller
        if self.controller.tick_ms == 0 {
            eyre::bail!("controller.tick_ms must be >= 1");
        }
        if self.controller.tick_ms > 10_000 {
            eyre::bail!("controller.tick_ms is unreasonably large (>10s)");
        }
        if self.controller.release_ms == 0 {
            eyre::bail!("controller.release_ms must be >= 1");
        }
        if self.controller.release_ms > 60_000 {
            eyre::bail!("controller.release_ms is unreasonably large (>60s)");
        }

        // Logging
        if let Some(rotation) = self.logging.rotation.as_deref()
            && !matches!(rotation, "never" | "daily" | "hourly")
        {
            eyre::bail!("logging.rotation must be one of never, daily, hourly (got {rotation:?})");
        }

        // State
        if self.state.path.as_os_str().is_empty() {
            eyre::bail!("state.path must not be empty");
        }

        // Covers
        if self.covers.is_empty() {
            eyre::bail!("no covers configured; add at least one [covers.<id>] table");
        }
        let mut seen: BTreeMap<String, &str> = BTreeMap::new();
        for (key, cover) in &self.covers {
            let id = normalize_id(key);
            if id.is_empty() {
                eyre::bail!("cover id must not be empty");
            }
            if let Some(other) = seen.insert(id.clone(), key) {
                eyre::bail!("covers {other:?} and {key:?} both normalize to id {id:?}");
            }
            validate_cover(&id, cover)?;
        }

        Ok(())
    }
}

fn validate_cover(id: &str, c: &CoverCfg) -> eyre::Result<()> {
    for (dir, map, time, positions) in [
        (
            "opening",
            &c.opening_time_map,
            c.opening_time,
            &c.opening_positions,
        ),
        (
            "closing",
            &c.closing_time_map,
            c.closing_time,
            &c.closing_positions,
        ),
    ] {
        if map.is_some() && (time.is_some() || positions.is_some()) {
            eyre::bail!(
                "covers.{id}: give either {dir}_time_map or {dir}_time/{dir}_positions, not both"
            );
        }
        if let Some(t) = time
            && !(t > 0.0 && t <= 86_400.0)
        {
            eyre::bail!("covers.{id}.{dir}_time must be in (0, 86400] seconds");
        }
    }
    c.opening_map()
        .map_err(|e| eyre::eyre!("covers.{id}: {e}"))?;
    c.closing_map()
        .map_err(|e| eyre::eyre!("covers.{id}: {e}"))?;

    let (lo, hi) = TILT_TIME_RANGE_S;
    for (field, value) in [
        ("tilting_time_down", c.tilting_time_down),
        ("tilting_time_up", c.tilting_time_up),
    ] {
        if let Some(t) = value
            && !(t > lo && t <= hi)
        {
            eyre::bail!("covers.{id}.{field} must be in ({lo}, {hi}] seconds");
        }
    }

    if let Some(p) = c.pins
        && (p.open == p.close || p.stop.is_some_and(|s| s == p.open || s == p.close))
    {
        eyre::bail!("covers.{id}.pins must use distinct pins");
    }
    if c.actuator == ActuatorKind::Momentary
        && let Some(p) = c.pins
        && p.stop.is_none()
    {
        eyre::bail!("covers.{id}: momentary covers need pins.stop wired");
    }
    Ok(())
}

fn map_spec(
    dir: &str,
    map: Option<&TimeMapInput>,
    total_s: Option<f64>,
    positions: Option<&[u8]>,
    default_positions: &[u8],
) -> eyre::Result<MapSpec> {
    if let Some(input) = map {
        return parse_time_map(input)
            .map(MapSpec::Breakpoints)
            .map_err(|e| eyre::eyre!("{dir}_time_map: {e}"));
    }
    Ok(MapSpec::Evenly {
        total_s: total_s.unwrap_or(DEFAULT_TRAVEL_SECS),
        positions: positions.unwrap_or(default_positions).to_vec(),
    })
}

/// Parse a time map into `(seconds, position)` pairs.
///
/// Keys must parse as finite numbers and positions must be whole numbers in
/// 0..=100. Ordering and coverage are not checked here.
pub fn parse_time_map(input: &TimeMapInput) -> eyre::Result<Vec<(f64, u8)>> {
    let entries: Vec<(String, f64)> = match input {
        TimeMapInput::Json(text) => {
            let obj: BTreeMap<String, serde_json::Value> = serde_json::from_str(text)
                .map_err(|e| eyre::eyre!("time map is not a JSON object: {e}"))?;
            obj.into_iter()
                .map(|(k, v)| {
                    v.as_f64()
                        .map(|p| (k.clone(), p))
                        .ok_or_else(|| eyre::eyre!("position for time {k:?} is not a number: {v}"))
                })
                .collect::<eyre::Result<_>>()?
        }
        TimeMapInput::Table(table) => table.iter().map(|(k, v)| (k.clone(), *v)).collect(),
    };

    entries
        .into_iter()
        .map(|(key, position)| {
            let secs: f64 = key
                .trim()
                .parse()
                .map_err(|_| eyre::eyre!("time {key:?} is not a number"))?;
            if !secs.is_finite() {
                eyre::bail!("time {key:?} must be finite");
            }
            if position.fract() != 0.0 || !(0.0..=100.0).contains(&position) {
                eyre::bail!("position {position} at time {key:?} must be a whole number 0-100");
            }
            Ok((secs, position as u8))
        })
        .collect()
}
