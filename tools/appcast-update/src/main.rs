//! Binary entrypoint: update `appcast.xml` in the current directory.
//!
//! Reads `sign_update.txt` and `appcast.xml`, takes release identifiers from
//! the GHOSTTY_* environment variables, writes `appcast_new.xml`, and prints
//! one JSON summary line to stdout. Logs go to stderr (`RUST_LOG`).

use appcast_update::{run, Config, Release};
use std::io::{self, Write};
use tracing_subscriber::EnvFilter;

fn main() {
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
    .with_writer(io::stderr)
    .init();

  if let Err(e) = run_binary() {
    let _ = writeln!(io::stderr(), "appcast-update error: {}", e);
    std::process::exit(1);
  }
}

fn run_binary() -> Result<(), Box<dyn std::error::Error>> {
  // Captured once; everything downstream uses this instant.
  let release = Release::from_env()?;
  let config = Config::in_dir(&std::env::current_dir()?);

  let report = run(&config, &release)?;
  io::stdout().lock().write_all(report.to_json_line()?.as_bytes())?;
  Ok(())
}
