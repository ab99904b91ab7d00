// Copyright (C) 2025  Tom Waddington
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published
// by the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

use padcast::logging::init_logging;
use padcast::sink::{FrameSink, HexSink, MonitorSink, NullSink};
use padcast::types::ConfigOverrides;
use padcast::{
    InputReport, PlaybackConfig, ScriptLibrary, Sequencer, Transport, builtin, parse_script,
};

#[derive(Parser, Debug)]
#[command(name = "padcast", version, about = "Play scripted controller input")]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Play a script at the poll cadence until stopped
    Run {
        /// Script file; the built-in egg hatcher when omitted
        script: Option<PathBuf>,

        /// Poll interval in milliseconds
        #[arg(long)]
        poll_ms: Option<u64>,

        /// Poll jitter as a fraction of the interval (0.0 to 1.0)
        #[arg(long, value_parser = parse_jitter)]
        jitter: Option<f64>,

        /// Stop after this many ticks
        #[arg(long)]
        ticks: Option<u64>,

        #[arg(long, value_enum, default_value_t = Output::Hex)]
        output: Output,
    },
    /// Parse and validate a script
    Check { script: Option<PathBuf> },
    /// Print the engine's cursor for each tick, without waiting between ticks
    Trace {
        script: Option<PathBuf>,

        #[arg(long, default_value_t = 200)]
        ticks: u64,

        /// Only print ticks that compute a fresh frame
        #[arg(long)]
        fresh_only: bool,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Output {
    Hex,
    Monitor,
    None,
}

fn parse_jitter(s: &str) -> Result<f64, String> {
    let jitter: f64 = s.parse().map_err(|e| format!("{}", e))?;
    if (0.0..=1.0).contains(&jitter) {
        Ok(jitter)
    } else {
        Err(format!("jitter must be between 0.0 and 1.0, got {}", jitter))
    }
}

fn load(path: Option<&Path>) -> Result<(ScriptLibrary, ConfigOverrides)> {
    match path {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read script {}", path.display()))?;
            let script = parse_script(&text)
                .with_context(|| format!("Failed to parse {}", path.display()))?;
            let overrides = script.config.clone();
            let library = script
                .into_library()
                .with_context(|| format!("Failed to load {}", path.display()))?;
            Ok((library, overrides))
        }
        None => Ok((builtin()?, ConfigOverrides::default())),
    }
}

async fn run(
    script: Option<PathBuf>,
    cli_overrides: ConfigOverrides,
    ticks: Option<u64>,
    output: Output,
) -> Result<()> {
    let (library, overrides) = load(script.as_deref())?;

    let mut config = PlaybackConfig::default();
    overrides.apply(&mut config);
    cli_overrides.apply(&mut config);

    let sink: Box<dyn FrameSink> = match output {
        Output::Hex => Box::new(HexSink::new(io::stdout())),
        Output::Monitor => Box::new(MonitorSink::new(io::stdout())),
        Output::None => Box::new(NullSink),
    };

    let mut sequencer = Sequencer::new(library.into_program());
    let mut transport = Transport::new(sink, config)?;
    transport.run(&mut sequencer, ticks).await?;
    Ok(())
}

fn check(script: Option<PathBuf>) -> Result<()> {
    let (library, overrides) = load(script.as_deref())?;
    let program = library.get_program();

    println!(
        "✓ {} sequences, {} phases",
        library.sequences().len(),
        program.len()
    );
    for (index, phase) in program.phases().iter().enumerate() {
        println!(
            "  {:>2}: {} ({} steps) {} -> {}",
            index,
            phase.sequence.name,
            phase.sequence.len(),
            phase.looping,
            phase.successor
        );
    }
    if let Some(interval) = overrides.poll_interval {
        println!("  poll: {:?}", interval);
    }
    if let Some(jitter) = overrides.jitter {
        println!("  jitter: {}", jitter);
    }
    Ok(())
}

fn trace(script: Option<PathBuf>, ticks: u64, fresh_only: bool) -> Result<()> {
    let (library, _) = load(script.as_deref())?;
    let mut sequencer = Sequencer::new(library.into_program());

    let stdout = io::stdout();
    let mut out = stdout.lock();
    writeln!(out, "tick phase step loop slot held report")?;
    for n in 0..ticks {
        let tick = sequencer.next_tick();
        if fresh_only && tick.held {
            continue;
        }
        writeln!(
            out,
            "{} {} {} {} {} {} {}",
            n,
            tick.phase,
            tick.step,
            tick.loop_count,
            tick.slot,
            if tick.held { "held" } else { "new" },
            InputReport::encode(&tick.frame).to_hex()
        )?;
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    info!(version = env!("CARGO_PKG_VERSION"), "padcast starting");

    match cli.command {
        Command::Run {
            script,
            poll_ms,
            jitter,
            ticks,
            output,
        } => {
            let overrides = ConfigOverrides {
                poll_interval: poll_ms.map(Duration::from_millis),
                jitter,
            };
            run(script, overrides, ticks, output).await
        }
        Command::Check { script } => check(script),
        Command::Trace {
            script,
            ticks,
            fresh_only,
        } => trace(script, ticks, fresh_only),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_definition() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_run_flags() {
        let cli = Cli::try_parse_from([
            "padcast", "-vv", "run", "eggs.pad", "--poll-ms", "16", "--jitter", "0.1", "--ticks",
            "10", "--output", "none",
        ])
        .unwrap();
        assert_eq!(cli.verbose, 2);
        match cli.command {
            Command::Run {
                script,
                poll_ms,
                jitter,
                ticks,
                output,
            } => {
                assert_eq!(script, Some(PathBuf::from("eggs.pad")));
                assert_eq!(poll_ms, Some(16));
                assert_eq!(jitter, Some(0.1));
                assert_eq!(ticks, Some(10));
                assert!(matches!(output, Output::None));
            }
            other => panic!("Expected run command, got {:?}", other),
        }
    }

    #[test]
    fn test_jitter_out_of_range_rejected() {
        assert!(Cli::try_parse_from(["padcast", "run", "--jitter", "2"]).is_err());
    }

    #[test]
    fn test_load_builtin_and_file() {
        let (builtin_library, overrides) = load(None).unwrap();
        assert_eq!(overrides, ConfigOverrides::default());

        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("scripts/egg_hatcher.pad");
        let (file_library, overrides) = load(Some(path.as_path())).unwrap();
        assert_eq!(file_library, builtin_library);
        assert_eq!(overrides.poll_interval, Some(Duration::from_millis(8)));
    }

    #[test]
    fn test_load_missing_file() {
        assert!(load(Some(Path::new("/nonexistent/script.pad"))).is_err());
    }
}
