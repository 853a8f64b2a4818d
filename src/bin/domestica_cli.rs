use domestica::export::write_primers_tsv;
use domestica::progress::{NullSink, ProgressSink, StderrSink};
use domestica::protocol::{ProtocolRequest, run_request};
use serde::Serialize;
use std::{env, fs};

fn usage() {
    eprintln!(
        "Usage:\n  \
  domestica_cli --version\n  \
  domestica_cli [--quiet] protocol '<request-json>'\n  \
  domestica_cli [--quiet] export-tsv '<request-json>' OUTPUT.tsv\n  \
  domestica_cli species\n\n  \
  Tip: pass @file.json instead of inline JSON"
    );
}

fn load_json_arg(value: &str) -> Result<String, String> {
    if let Some(path) = value.strip_prefix('@') {
        fs::read_to_string(path).map_err(|e| format!("Could not read JSON file '{path}': {e}"))
    } else {
        Ok(value.to_string())
    }
}

fn parse_request(json_arg: &str) -> Result<ProtocolRequest, String> {
    let json = load_json_arg(json_arg)?;
    serde_json::from_str(&json).map_err(|e| format!("Invalid request JSON: {e}"))
}

fn print_json<T: Serialize>(value: &T) -> Result<(), String> {
    let text = serde_json::to_string_pretty(value)
        .map_err(|e| format!("Could not serialize JSON output: {e}"))?;
    println!("{text}");
    Ok(())
}

fn parse_quiet_flag(args: &[String]) -> (bool, usize) {
    if args.len() >= 2 && args[1] == "--quiet" {
        return (true, 2);
    }
    (false, 1)
}

fn main() {
    env_logger::init();
    if let Err(e) = run() {
        eprintln!("{e}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), String> {
    let args: Vec<String> = env::args().collect();
    if args.len() <= 1 {
        usage();
        return Err("Missing command".to_string());
    }
    if args.iter().any(|a| a == "--version" || a == "-V") {
        println!("domestica {}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    let (quiet, cmd_idx) = parse_quiet_flag(&args);
    if args.len() <= cmd_idx {
        usage();
        return Err("Missing command".to_string());
    }
    let sink: &dyn ProgressSink = if quiet { &NullSink } else { &StderrSink };

    let command = &args[cmd_idx];
    match command.as_str() {
        "protocol" => {
            if args.len() <= cmd_idx + 1 {
                usage();
                return Err("Missing request JSON".to_string());
            }
            let request = parse_request(&args[cmd_idx + 1])?;
            let results = run_request(&request, sink).map_err(|e| e.to_string())?;
            print_json(&results)
        }
        "export-tsv" => {
            if args.len() <= cmd_idx + 2 {
                usage();
                return Err("export-tsv requires: '<request-json>' OUTPUT.tsv".to_string());
            }
            let request = parse_request(&args[cmd_idx + 1])?;
            let output = &args[cmd_idx + 2];
            let results = run_request(&request, sink).map_err(|e| e.to_string())?;
            write_primers_tsv(output, &results).map_err(|e| e.to_string())?;
            println!("Wrote primers for {} sequence(s) to '{output}'", results.len());
            Ok(())
        }
        "species" => {
            // Bundled codon usage tables; others load from a JSON path
            // passed as the request's `species` field.
            print_json(&["escherichia_coli"])
        }
        _ => {
            usage();
            Err(format!("Unknown command '{command}'"))
        }
    }
}
