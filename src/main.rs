use std::fs::File;
use std::io::{Read, stdin, stdout};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use askpdf::event_source::TerminalEventSource;
use askpdf::panic_handler::initialize_panic_handler;
use askpdf::pdf::DocumentSource;
use askpdf::terminal::TerminalSession;
use askpdf::theme::{ThemeId, set_theme};
use askpdf::{Viewer, ViewerOptions, run_app_with_event_source, settings};
use clap::Parser;
use log::{error, info, warn};
use ratatui::{Terminal, backend::CrosstermBackend};
use simplelog::{Config, LevelFilter, WriteLogger};

/// Terminal PDF reader: select text, then copy it or ask a question about it
#[derive(Parser, Debug)]
#[command(name = "askpdf", version, about)]
struct Args {
    /// PDF to open; `-` reads it from stdin
    file: Option<PathBuf>,

    /// Question answering endpoint (overrides the config file)
    #[arg(long, value_name = "URL")]
    endpoint: Option<String>,

    /// Keep the selection when the document scrolls
    #[arg(long)]
    keep_selection_on_scroll: bool,

    /// off, error, warn, info, debug or trace
    #[arg(long, value_name = "LEVEL", default_value = "info", value_parser = parse_level)]
    log_level: LevelFilter,

    #[arg(long, value_name = "PATH", default_value = "askpdf.log")]
    log_file: PathBuf,
}

fn parse_level(value: &str) -> Result<LevelFilter, String> {
    value
        .parse()
        .map_err(|_| format!("unknown log level {value:?}"))
}

fn document_source(file: Option<PathBuf>) -> Result<DocumentSource> {
    match file {
        None => Ok(DocumentSource::None),
        Some(path) if path.as_os_str() == "-" => {
            let mut data = Vec::new();
            stdin()
                .lock()
                .read_to_end(&mut data)
                .context("Failed to read the document from stdin")?;
            info!("Read {} bytes from stdin", data.len());
            Ok(DocumentSource::Bytes {
                name: "stdin".to_string(),
                data: Arc::from(data),
            })
        }
        Some(path) => Ok(DocumentSource::Path(path)),
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    WriteLogger::init(
        args.log_level,
        Config::default(),
        File::create(&args.log_file)
            .with_context(|| format!("Failed to create log file {:?}", args.log_file))?,
    )?;

    info!("Starting askpdf");

    initialize_panic_handler();

    settings::load_settings();
    settings::apply_overrides(args.endpoint.as_deref(), args.keep_selection_on_scroll);

    let theme_name = settings::get_theme_name();
    match ThemeId::from_name(&theme_name) {
        Some(theme) => set_theme(theme),
        None => warn!("Unknown theme {theme_name:?}, keeping the default"),
    }

    // Read stdin before the terminal switches to raw mode
    let source = document_source(args.file)?;

    let mut viewer = Viewer::with_defaults(ViewerOptions::from_settings())?;
    viewer.open(source);

    let session = TerminalSession::enter()?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout()))?;
    terminal.clear()?;

    let mut event_source = TerminalEventSource;
    let res = run_app_with_event_source(&mut terminal, &mut viewer, &mut event_source);

    drop(session);
    terminal.show_cursor()?;

    if let Err(err) = res {
        error!("Application error: {err:?}");
        println!("{err:?}");
    }

    info!("Shutting down askpdf");
    Ok(())
}
