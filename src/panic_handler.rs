use crossterm::{
    cursor::Show,
    event::{DisableBracketedPaste, DisableMouseCapture},
    execute,
    terminal::{LeaveAlternateScreen, disable_raw_mode},
};
use std::io::{self, Write};
use std::panic;

/// Pretty backtraces, with the terminal handed back before they print
pub fn initialize_panic_handler() {
    better_panic::install();

    let default_hook = panic::take_hook();
    panic::set_hook(Box::new(move |panic_info| {
        restore_terminal();
        log::error!("Panic: {panic_info}");

        default_hook(panic_info);

        std::process::exit(1);
    }));
}

/// Undo everything `TerminalSession::enter` turned on.
///
/// Safe to call more than once; errors are ignored since the terminal may
/// already be gone.
pub fn restore_terminal() {
    let _ = disable_raw_mode();
    let mut out = io::stdout();
    let _ = execute!(
        out,
        DisableBracketedPaste,
        DisableMouseCapture,
        LeaveAlternateScreen
    );
    let _ = execute!(io::stderr(), Show);
    let _ = writeln!(io::stderr());
}
