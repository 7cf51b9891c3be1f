use std::fs::File;
use std::path::PathBuf;

use anyhow::{Context, Result};
use deskgame_engine::cli::HarnessArgs;
use deskgame_engine::harness;

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    if let Err(err) = run_cli() {
        log::error!("[tool-harness] error: {err:?}");
        std::process::exit(1);
    }
}

fn run_cli() -> Result<()> {
    let mut args: Vec<String> = std::env::args().collect();
    if args.iter().any(|arg| arg == "--help" || arg == "-h") {
        print_help();
        return Ok(());
    }
    let output = take_output_flag(&mut args)?;
    let options = HarnessArgs::parse(args)?.into_options();
    let report = harness::run(&options)?;

    match output {
        Some(path) => {
            let file = File::create(&path).with_context(|| format!("writing report to '{}'", path.display()))?;
            serde_json::to_writer_pretty(file, &report).with_context(|| "serializing harness report")?;
            log::info!("[tool-harness] wrote {}", path.display());
        }
        None => {
            serde_json::to_writer_pretty(std::io::stdout(), &report)?;
            println!();
        }
    }
    Ok(())
}

fn take_output_flag(args: &mut Vec<String>) -> Result<Option<PathBuf>> {
    let Some(index) = args.iter().position(|arg| arg == "--output" || arg == "-o") else {
        return Ok(None);
    };
    if index + 1 >= args.len() {
        anyhow::bail!("Expected a value after '{}'", args[index]);
    }
    let path = PathBuf::from(args.remove(index + 1));
    args.remove(index);
    Ok(Some(path))
}

fn print_help() {
    println!("Usage: tool_harness [--config <path>] [--tools <dir>] [--select <tool>] [--frames <n>]");
    println!("                    [--trigger on|off] [--mouse x,y] [--output <path>]");
    println!("  --config    Runtime config JSON (defaults when missing)");
    println!("  --tools     Tools directory, overriding base_path/tools_dir");
    println!("  --select    Tool to select after loading");
    println!("  --frames    Frames to simulate (default 60)");
    println!("  --trigger   Hold the trigger for the whole run");
    println!("  --mouse     Cursor position for triggers");
    println!("  -o, --output  Write the JSON report to a file instead of stdout");
}
