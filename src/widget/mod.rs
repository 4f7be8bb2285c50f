pub mod ask_dialog;
pub mod file_prompt;
pub mod floating_menu;
pub mod hud_message;

pub use ask_dialog::{AskDialog, DialogEvent, DialogHit, DialogState};
pub use file_prompt::{FilePrompt, FilePromptAction};
pub use floating_menu::{FloatingMenu, MenuAction, MenuHit};
pub use hud_message::{HudMessage, HudMode};
