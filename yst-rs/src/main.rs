use std::io::Write;

use tracing::warn;

use yst::cli::{self, CliArgs};
use yst::config::Config;
use yst::{ClientStatus, FileSource, Template};

const USAGE: &str =
    "Usage: yst [-L<dir>] [-c<config>] [-e<encoding>] [-m<model-file>] [-s<status>] [-i<id>] <template-file>";

fn main() {
    yst::init_tracing();

    let args = match cli::parse_args() {
        Ok(a) => a,
        Err(e) => {
            eprintln!("yst: {e}");
            eprintln!("{USAGE}");
            std::process::exit(1);
        }
    };

    if let Err(e) = run(&args) {
        eprintln!("yst: {e}");
        std::process::exit(1);
    }
}

fn run(args: &CliArgs) -> Result<(), Box<dyn std::error::Error>> {
    // ── Settings: config file, then command-line overrides ────────────────────
    let mut config = match &args.config {
        Some(path) => {
            let (config, errors) = Config::load_file(path)?;
            for e in errors {
                warn!(file = %path.display(), "{e}");
            }
            config
        }
        None => Config::new(),
    };
    if let Some(dir) = &args.libdir {
        config.libdir = Some(dir.clone());
    }
    if let Some(encoding) = &args.encoding {
        config.apply("template.encoding", encoding)?;
    }

    // ── Model and status ──────────────────────────────────────────────────────
    let model = match &args.model {
        Some(path) => std::fs::read_to_string(path)?,
        None => String::new(),
    };
    let status = if config.may_process_on_server {
        args.status.unwrap_or_default()
    } else {
        ClientStatus::DisableYeipeeOnClient
    };

    // ── Render ────────────────────────────────────────────────────────────────
    let template = Template::lua(args.template_id(), FileSource::new(&args.template), &config)?;
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    template.print(&model, status, &mut out)?;
    out.flush()?;
    Ok(())
}
