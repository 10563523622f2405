use std::path::PathBuf;

use clap::{CommandFactory, Parser};
use color_eyre::eyre::WrapErr;

mod app;
mod catalog;
mod clipboard;
mod completion;
mod compose;
mod error;
mod keys;
mod layout;
mod logging;
mod spec;
mod ui;
mod widgets;

use app::App;

/// Compose a command line by pressing mnemonic keys
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Command to compose: a spec file path, or the name of a spec in the
    /// commands directory or bundled with brief (e.g. "git")
    #[arg(required_unless_present = "usage")]
    command: Option<String>,

    /// Directory holding `<name>.cmd.yaml` specs
    #[arg(long, env = "BRIEF_COMMANDS_DIR", default_value = "commands")]
    commands_dir: PathBuf,

    /// Do not copy the accepted command to the clipboard
    #[arg(long)]
    no_clipboard: bool,

    /// Write log records to this file instead of after the session ends
    #[arg(long, env = "BRIEF_LOG_FILE")]
    log_file: Option<PathBuf>,

    /// Generate usage spec for this tool
    #[arg(long)]
    usage: bool,
}

fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;

    let args = Args::parse();
    let deferred_log = logging::init(args.log_file.as_deref())
        .wrap_err("unable to open the log file")?;

    let result = run(args);
    if let Some(deferred) = &deferred_log {
        deferred.flush_to(&mut std::io::stderr())?;
    }
    result
}

fn run(args: Args) -> color_eyre::Result<()> {
    // Handle --usage flag to output usage spec
    if args.usage {
        let mut cmd = Args::command();
        let bin_name = std::env::args()
            .next()
            .unwrap_or_else(|| "brief".to_string());
        let mut buf = Vec::new();
        clap_usage::generate(&mut cmd, bin_name, &mut buf);
        print!("{}", String::from_utf8_lossy(&buf));
        return Ok(());
    }

    let Some(name) = args.command else {
        return Err(color_eyre::eyre::eyre!(
            "a command name is required. Use --help for usage information."
        ));
    };

    let (tree, source) = catalog::resolve(&name, &args.commands_dir).wrap_err_with(|| {
        format!(
            "unable to load `{name}` (bundled specs: {})",
            catalog::bundled_names().collect::<Vec<_>>().join(", ")
        )
    })?;
    log::info!("composing `{name}` from {source:?}");

    let mut app = App::new(tree)?;

    let mut terminal = ratatui::init();
    let result = run_event_loop(&mut terminal, &mut app);
    ratatui::restore();

    match result {
        Ok(Some(command)) => {
            println!("{command}");
            if !args.no_clipboard {
                match clipboard::copy(&mut std::io::stderr(), &command) {
                    Ok(()) => eprintln!("(copied to clipboard)"),
                    Err(e) => eprintln!("unable to copy to clipboard: {e}"),
                }
            }
            Ok(())
        }
        Ok(None) => Ok(()),
        Err(e) => Err(e),
    }
}

fn run_event_loop(
    terminal: &mut ratatui::DefaultTerminal,
    app: &mut App,
) -> color_eyre::Result<Option<String>> {
    use crossterm::event::{self, Event, KeyCode, KeyEventKind, KeyModifiers};

    loop {
        terminal.draw(|frame| ui::render(frame, app))?;

        match event::read()? {
            Event::Key(key) => {
                if key.kind != KeyEventKind::Press {
                    continue;
                }

                // Quit from any mode, prompts included
                if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
                    return Ok(None);
                }

                match app.handle_key(key)? {
                    app::Action::None => {}
                    app::Action::Quit => return Ok(None),
                    app::Action::Accept => return Ok(Some(app.build_command())),
                }
            }
            Event::Resize(_, _) => {
                // Pages are laid out again on the next draw
            }
            _ => {}
        }
    }
}
