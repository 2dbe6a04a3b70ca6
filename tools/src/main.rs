//! save-runner: headless savegame load/re-save tool.
//!
//! Usage:
//!   save-runner --in game.sav
//!   save-runner --in game.sav --out resaved.sav --reason "manual"
//!   save-runner --in game.sav --ruleset classic.json --config save.json --seed 7

use anyhow::{Context, Result};
use civsave_core::{
    config::SaveConfig,
    engine::{LoadReport, SaveEngine},
    ruleset::Ruleset,
    world::World,
};
use std::env;

#[derive(serde::Serialize)]
struct RunOutput<'a> {
    input:  &'a str,
    output: Option<&'a str>,
    report: &'a LoadReport,
}

fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let input = string_arg(&args, "--in").context("missing --in <savegame>")?;
    let output = string_arg(&args, "--out");
    let seed = parse_arg(&args, "--seed", 42u64);
    let reason = string_arg(&args, "--reason")
        .map(str::to_string)
        .unwrap_or_else(default_reason);

    let ruleset = match string_arg(&args, "--ruleset") {
        Some(path) => Ruleset::load(path)?,
        None => Ruleset::classic(),
    };
    let config = match string_arg(&args, "--config") {
        Some(path) => SaveConfig::load(path)?,
        None => SaveConfig::default(),
    };

    log::info!("save-runner: loading {input} (ruleset '{}', seed {seed})", ruleset.name);

    let engine = SaveEngine::build(seed);
    let mut world = World::default();
    let report = match engine.load_path(input, &ruleset, &mut world) {
        Ok(report) => report,
        Err(e) => {
            eprintln!("{e}");
            std::process::exit(1);
        }
    };

    if let Some(path) = output {
        engine.save_path(path, &world, &ruleset, &config, &reason)?;
        log::info!("save-runner: wrote {path}");
    }

    let out = RunOutput { input, output, report: &report };
    println!("{}", serde_json::to_string_pretty(&out)?);
    Ok(())
}

fn string_arg<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.windows(2).find(|w| w[0] == flag).map(|w| w[1].as_str())
}

fn parse_arg<T: std::str::FromStr + Copy>(args: &[String], flag: &str, default: T) -> T {
    args.windows(2)
        .find(|w| w[0] == flag)
        .and_then(|w| w[1].parse().ok())
        .unwrap_or(default)
}

fn default_reason() -> String {
    format!("save-runner {}", chrono::Utc::now().format("%Y-%m-%d %H:%M:%S"))
}
