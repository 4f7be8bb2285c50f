use std::env;
use std::io::{self, stdout};

use crossterm::{
    event::{EnableBracketedPaste, EnableMouseCapture},
    execute,
    terminal::{EnterAlternateScreen, enable_raw_mode},
};
use log::debug;

use crate::panic_handler::restore_terminal;
use crate::pdf::CellSize;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TerminalKind {
    Kitty,
    Ghostty,
    Konsole,
    WezTerm,
    ITerm,
    AppleTerminal,
    VsCode,
    Tmux,
    Unknown,
}

#[derive(Clone, Debug, Default)]
pub struct TerminalEnv {
    pub term_program: String,
    pub term: String,
    pub colorterm: String,
    pub iterm_session: bool,
    pub kitty_window: bool,
    pub konsole: bool,
    pub tmux: bool,
    pub ssh: bool,
}

impl TerminalEnv {
    pub fn read() -> Self {
        let term_program = env::var("TERM_PROGRAM")
            .ok()
            .map(|v| v.to_ascii_lowercase())
            .unwrap_or_default();
        let term = env::var("TERM")
            .ok()
            .map(|v| v.to_ascii_lowercase())
            .unwrap_or_default();
        let colorterm = env::var("COLORTERM")
            .ok()
            .map(|v| v.to_ascii_lowercase())
            .unwrap_or_default();

        Self {
            term_program,
            term,
            colorterm,
            iterm_session: env::var("ITERM_SESSION_ID").is_ok(),
            kitty_window: env::var("KITTY_WINDOW_ID").is_ok(),
            konsole: env::var("KONSOLE_VERSION").is_ok(),
            tmux: env::var("TMUX").is_ok(),
            ssh: env::var("SSH_TTY").is_ok() || env::var("SSH_CONNECTION").is_ok(),
        }
    }
}

#[derive(Clone, Debug)]
pub struct TerminalCapabilities {
    pub env: TerminalEnv,
    pub kind: TerminalKind,
    pub supports_true_color: bool,
    /// OSC 52 must go through tmux DCS passthrough
    pub wrap_for_tmux: bool,
}

pub fn detect_terminal() -> TerminalCapabilities {
    detect_terminal_from_env(TerminalEnv::read())
}

pub fn detect_terminal_from_env(env: TerminalEnv) -> TerminalCapabilities {
    let kind = detect_kind(&env);
    let supports_true_color = supports_true_color_env(&env);
    let wrap_for_tmux = env.tmux;
    debug!(
        "Terminal: {kind:?}, true color: {supports_true_color}, tmux: {wrap_for_tmux}, ssh: {}",
        env.ssh
    );
    TerminalCapabilities {
        env,
        kind,
        supports_true_color,
        wrap_for_tmux,
    }
}

pub fn supports_true_color() -> bool {
    supports_true_color_env(&TerminalEnv::read())
}

/// Cell size in pixels from the terminal's window size report
pub fn query_cell_size() -> CellSize {
    match crossterm::terminal::window_size() {
        Ok(size) => CellSize::from_window(size.columns, size.rows, size.width, size.height),
        Err(e) => {
            debug!("Window size report unavailable ({e}), using fallback cell size");
            CellSize::FALLBACK
        }
    }
}

/// Raw mode, alternate screen, mouse capture and bracketed paste for as long
/// as the guard lives
pub struct TerminalSession {
    _private: (),
}

impl TerminalSession {
    pub fn enter() -> io::Result<Self> {
        enable_raw_mode()?;
        let session = Self { _private: () };
        execute!(
            stdout(),
            EnterAlternateScreen,
            EnableMouseCapture,
            EnableBracketedPaste
        )?;
        debug!("Terminal session started");
        Ok(session)
    }
}

impl Drop for TerminalSession {
    fn drop(&mut self) {
        restore_terminal();
        debug!("Terminal session restored");
    }
}

fn detect_kind(env: &TerminalEnv) -> TerminalKind {
    if env.term_program == "kitty" {
        return TerminalKind::Kitty;
    }
    if env.term_program == "ghostty" {
        return TerminalKind::Ghostty;
    }
    if env.term_program == "konsole" || env.konsole {
        return TerminalKind::Konsole;
    }
    if env.term_program == "wezterm" {
        return TerminalKind::WezTerm;
    }
    if env.term_program == "iterm.app" || env.iterm_session {
        return TerminalKind::ITerm;
    }
    if env.term_program == "apple_terminal" {
        return TerminalKind::AppleTerminal;
    }
    if env.term_program == "vscode" {
        return TerminalKind::VsCode;
    }
    if env.tmux {
        return TerminalKind::Tmux;
    }
    if env.kitty_window || env.term.contains("kitty") {
        return TerminalKind::Kitty;
    }
    if env.term.contains("ghostty") {
        return TerminalKind::Ghostty;
    }
    TerminalKind::Unknown
}

fn supports_true_color_env(env: &TerminalEnv) -> bool {
    env.colorterm == "truecolor"
        || env.colorterm == "24bit"
        || env.term.contains("truecolor")
        || env.term.contains("24bit")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tmux_requires_wrapping() {
        let caps = detect_terminal_from_env(TerminalEnv {
            term: "tmux-256color".into(),
            tmux: true,
            ..TerminalEnv::default()
        });
        assert_eq!(caps.kind, TerminalKind::Tmux);
        assert!(caps.wrap_for_tmux);
        assert!(!caps.supports_true_color);
    }

    #[test]
    fn program_wins_over_tmux() {
        let caps = detect_terminal_from_env(TerminalEnv {
            term_program: "wezterm".into(),
            colorterm: "truecolor".into(),
            tmux: true,
            ..TerminalEnv::default()
        });
        assert_eq!(caps.kind, TerminalKind::WezTerm);
        assert!(caps.supports_true_color);
        assert!(caps.wrap_for_tmux);
    }

    #[test]
    fn unknown_terminal() {
        let caps = detect_terminal_from_env(TerminalEnv::default());
        assert_eq!(caps.kind, TerminalKind::Unknown);
    }
}
