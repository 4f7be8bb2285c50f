//! Clipboard access with an OSC 52 fallback
//!
//! The system clipboard (arboard) is tried first. When it is unavailable,
//! for example over SSH or without a display server, the text is handed to
//! the terminal emulator through the OSC 52 escape instead.

use std::io::{self, Write};

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use log::{debug, warn};
use thiserror::Error;

const OSC52_START: &[u8] = b"\x1b]52;c;";
const BEL: &[u8] = b"\x07";
const DCS_START: &[u8] = b"\x1bPtmux;";
const DCS_END: &[u8] = b"\x1b\\";
const TMUX_OSC52_START: &[u8] = b"\x1b\x1b]52;c;";

#[derive(Debug, Error)]
pub enum ClipboardError {
    #[error("Failed to access clipboard: {0}")]
    Unavailable(String),
    #[error("Failed to write clipboard escape: {0}")]
    Io(#[from] io::Error),
}

impl From<arboard::Error> for ClipboardError {
    fn from(e: arboard::Error) -> Self {
        ClipboardError::Unavailable(e.to_string())
    }
}

pub trait ClipboardBackend {
    fn set_text(&mut self, text: &str) -> Result<(), ClipboardError>;
}

/// The platform clipboard, opened on first use
#[derive(Default)]
pub struct SystemClipboard {
    clipboard: Option<arboard::Clipboard>,
}

impl ClipboardBackend for SystemClipboard {
    fn set_text(&mut self, text: &str) -> Result<(), ClipboardError> {
        if self.clipboard.is_none() {
            self.clipboard = Some(arboard::Clipboard::new()?);
        }
        let Some(clipboard) = self.clipboard.as_mut() else {
            return Err(ClipboardError::Unavailable("clipboard not initialized".into()));
        };
        if let Err(e) = clipboard.set_text(text) {
            // Reopen next time; the display connection may have gone away
            self.clipboard = None;
            return Err(e.into());
        }
        Ok(())
    }
}

/// Build the OSC 52 sequence that puts `text` on the terminal's clipboard
#[must_use]
pub fn osc52_sequence(text: &str, tmux: bool) -> Vec<u8> {
    let payload = BASE64.encode(text.as_bytes());
    let mut out = Vec::with_capacity(payload.len() + 16);
    if tmux {
        out.extend_from_slice(DCS_START);
        out.extend_from_slice(TMUX_OSC52_START);
        out.extend_from_slice(payload.as_bytes());
        out.extend_from_slice(BEL);
        out.extend_from_slice(DCS_END);
    } else {
        out.extend_from_slice(OSC52_START);
        out.extend_from_slice(payload.as_bytes());
        out.extend_from_slice(BEL);
    }
    out
}

/// Terminal clipboard through OSC 52, wrapped for tmux passthrough if needed
pub struct Osc52Clipboard<W: Write> {
    writer: W,
    tmux: bool,
}

impl<W: Write> Osc52Clipboard<W> {
    pub fn new(writer: W, tmux: bool) -> Self {
        Self { writer, tmux }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl Osc52Clipboard<io::Stdout> {
    #[must_use]
    pub fn stdout(tmux: bool) -> Self {
        Self::new(io::stdout(), tmux)
    }
}

impl<W: Write> ClipboardBackend for Osc52Clipboard<W> {
    fn set_text(&mut self, text: &str) -> Result<(), ClipboardError> {
        self.writer.write_all(&osc52_sequence(text, self.tmux))?;
        self.writer.flush()?;
        Ok(())
    }
}

/// Which path a copy ended up taking
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CopyPath {
    Primary,
    Fallback,
    Failed,
}

/// Tries the primary backend, then the fallback
pub struct FallbackClipboard {
    primary: Box<dyn ClipboardBackend>,
    fallback: Box<dyn ClipboardBackend>,
    last_copied: Option<String>,
}

impl FallbackClipboard {
    pub fn new(primary: Box<dyn ClipboardBackend>, fallback: Box<dyn ClipboardBackend>) -> Self {
        Self {
            primary,
            fallback,
            last_copied: None,
        }
    }

    /// arboard first, OSC 52 on stdout second
    #[must_use]
    pub fn system(tmux: bool) -> Self {
        Self::new(
            Box::new(SystemClipboard::default()),
            Box::new(Osc52Clipboard::stdout(tmux)),
        )
    }

    pub fn copy(&mut self, text: &str) -> CopyPath {
        self.last_copied = Some(text.to_string());

        match self.primary.set_text(text) {
            Ok(()) => {
                debug!("Copied {} bytes to the system clipboard", text.len());
                return CopyPath::Primary;
            }
            Err(e) => warn!("{e}, falling back to OSC 52"),
        }

        match self.fallback.set_text(text) {
            Ok(()) => CopyPath::Fallback,
            Err(e) => {
                warn!("Clipboard fallback failed: {e}");
                CopyPath::Failed
            }
        }
    }

    #[must_use]
    pub fn last_copied(&self) -> Option<&str> {
        self.last_copied.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Broken;

    impl ClipboardBackend for Broken {
        fn set_text(&mut self, _text: &str) -> Result<(), ClipboardError> {
            Err(ClipboardError::Unavailable("no display".into()))
        }
    }

    struct Shared(std::rc::Rc<std::cell::RefCell<Vec<String>>>);

    impl ClipboardBackend for Shared {
        fn set_text(&mut self, text: &str) -> Result<(), ClipboardError> {
            self.0.borrow_mut().push(text.to_string());
            Ok(())
        }
    }

    #[test]
    fn osc52_encodes_base64_payload() {
        assert_eq!(osc52_sequence("hi", false), b"\x1b]52;c;aGk=\x07".to_vec());
    }

    #[test]
    fn osc52_under_tmux_is_wrapped() {
        assert_eq!(
            osc52_sequence("hi", true),
            b"\x1bPtmux;\x1b\x1b]52;c;aGk=\x07\x1b\\".to_vec()
        );
    }

    #[test]
    fn osc52_backend_writes_sequence() {
        let mut backend = Osc52Clipboard::new(Vec::new(), false);
        backend.set_text("hi").unwrap();
        assert_eq!(backend.into_inner(), b"\x1b]52;c;aGk=\x07".to_vec());
    }

    #[test]
    fn primary_success_skips_fallback() {
        let primary = std::rc::Rc::new(std::cell::RefCell::new(Vec::new()));
        let fallback = std::rc::Rc::new(std::cell::RefCell::new(Vec::new()));
        let mut clipboard = FallbackClipboard::new(
            Box::new(Shared(primary.clone())),
            Box::new(Shared(fallback.clone())),
        );

        assert_eq!(clipboard.copy("text"), CopyPath::Primary);
        assert_eq!(primary.borrow().as_slice(), ["text"]);
        assert!(fallback.borrow().is_empty());
    }

    #[test]
    fn failing_primary_uses_fallback() {
        let fallback = std::rc::Rc::new(std::cell::RefCell::new(Vec::new()));
        let mut clipboard =
            FallbackClipboard::new(Box::new(Broken), Box::new(Shared(fallback.clone())));

        assert_eq!(clipboard.copy("text"), CopyPath::Fallback);
        assert_eq!(fallback.borrow().as_slice(), ["text"]);
        assert_eq!(clipboard.last_copied(), Some("text"));
    }

    #[test]
    fn both_failing_reports_failed() {
        let mut clipboard = FallbackClipboard::new(Box::new(Broken), Box::new(Broken));
        assert_eq!(clipboard.copy("text"), CopyPath::Failed);
    }
}
