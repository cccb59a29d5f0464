//! Thin CLI shell over the script runtime: parse scripts, run them, and
//! capture the resulting pattern as JSON.

use anyhow::{bail, Context, Result};
use cadenza_core::{Event, Fraction, Pattern, QueryContext, StaticPattern};
use cadenza_script::bindings::as_pattern;
use cadenza_script::Engine;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "cadenza", about = "Pattern scripting engine", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Parse a script and dump its AST.
    Parse {
        /// Script file to parse.
        file: PathBuf,
        /// Emit the AST as JSON instead of the debug form.
        #[arg(long)]
        json: bool,
    },
    /// Evaluate a script and print the events of the resulting pattern.
    Run {
        /// Script file to evaluate.
        file: PathBuf,
        /// Arc begin, in cycles.
        #[arg(long, default_value_t = 0.0)]
        from: f64,
        /// Arc end, in cycles.
        #[arg(long, default_value_t = 1.0)]
        to: f64,
        /// Random seed for the query context.
        #[arg(long, default_value_t = 0)]
        seed: i64,
    },
    /// Evaluate a script and write the captured pattern as JSON.
    Capture {
        /// Script file to evaluate.
        file: PathBuf,
        /// Number of whole cycles to capture.
        #[arg(long, default_value_t = 1)]
        cycles: i64,
        /// Output file; stdout when omitted.
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Random seed for the query context.
        #[arg(long, default_value_t = 0)]
        seed: i64,
    },
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    match cli.command {
        Command::Parse { file, json } => {
            let source = std::fs::read_to_string(&file)
                .with_context(|| format!("reading {}", file.display()))?;
            let program = cadenza_script::parse(&source)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&program)?);
            } else {
                println!("{program:#?}");
            }
            Ok(())
        }
        Command::Run {
            file,
            from,
            to,
            seed,
        } => {
            let pattern = eval_file(&file)?;
            if to <= from {
                bail!("empty arc: --to must be greater than --from");
            }
            let ctx = QueryContext::with_seed(seed);
            let events =
                pattern.query_arc(Fraction::from_f64(from), Fraction::from_f64(to), &ctx);
            println!("{} event(s) in [{from}, {to})", events.len());
            for event in &events {
                println!("{}", describe(event));
            }
            Ok(())
        }
        Command::Capture {
            file,
            cycles,
            output,
            seed,
        } => {
            let pattern = eval_file(&file)?;
            let ctx = QueryContext::with_seed(seed);
            let captured = StaticPattern::capture(&pattern, cycles, &ctx);
            let json = serde_json::to_string_pretty(&captured)?;
            match output {
                Some(path) => std::fs::write(&path, json)
                    .with_context(|| format!("writing {}", path.display()))?,
                None => println!("{json}"),
            }
            Ok(())
        }
    }
}

fn eval_file(file: &PathBuf) -> Result<Pattern> {
    let source =
        std::fs::read_to_string(file).with_context(|| format!("reading {}", file.display()))?;
    let mut engine = Engine::with_defaults();
    let value = engine
        .eval(&source)
        .with_context(|| format!("evaluating {}", file.display()))?;
    match as_pattern(&value) {
        Some(p) => Ok(p),
        None => bail!(
            "script evaluated to {}, expected a pattern",
            value.type_name()
        ),
    }
}

fn describe(event: &Event) -> String {
    let mut fields = Vec::new();
    if let Some(note) = &event.data.note {
        fields.push(format!("note={note}"));
    }
    if let Some(value) = &event.data.value {
        fields.push(format!("value={value}"));
    }
    if let Some(speed) = event.data.speed {
        fields.push(format!("speed={speed}"));
    }
    for (name, value) in &event.data.controls {
        fields.push(format!("{name}={value}"));
    }
    let timing = match event.whole {
        Some(w) if w == event.part => format!("{}", event.part),
        Some(w) => format!("{} of {}", event.part, w),
        None => format!("{} (continuous)", event.part),
    };
    format!("  {timing}  {}", fields.join(" "))
}
