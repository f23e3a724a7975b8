mod logging;

use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use canvalytics::{Config, Dispatcher, Workbench};
use clap::Parser;
use tracing::info;

#[derive(Parser, Debug)]
#[command(
    name = "canvalytics",
    about = "Answer Canvalytics requests: one JSON object per stdin line, one response per stdout line"
)]
struct Args {
    /// TOML config file. Falls back to $CANVALYTICS_CONFIG, then to defaults.
    #[arg(long)]
    config: Option<PathBuf>,
}

fn main() -> Result<(), logging::BoxError> {
    let args = Args::parse();
    logging::init()?;

    let config = Config::load(args.config.as_deref())?;
    let dispatcher = Dispatcher::new(Workbench::new(config));
    info!("ready for requests on stdin");

    let mut stdout = io::stdout().lock();
    let mut handled = 0usize;
    for line in io::stdin().lock().lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let response = dispatcher.handle_json(&line);
        serde_json::to_writer(&mut stdout, &response)?;
        stdout.write_all(b"\n")?;
        stdout.flush()?;
        handled += 1;
    }

    info!(handled, "stdin closed, exiting");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args() {
        let args = Args::try_parse_from(["canvalytics", "--config", "local.toml"]).unwrap();
        assert_eq!(args.config, Some(PathBuf::from("local.toml")));
        assert!(Args::try_parse_from(["canvalytics"]).unwrap().config.is_none());
        assert!(Args::try_parse_from(["canvalytics", "--verbose"]).is_err());
    }
}
