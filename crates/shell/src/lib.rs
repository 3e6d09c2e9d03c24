pub mod json;
pub mod shell;
pub mod tabs;

pub use shell::{
    CaretTarget, CloseOutcome, DialogService, EditorShell, SavePrompt, SaveStatus, ShellError,
};
pub use tabs::{Tab, TabRegistry, UNTITLED_TITLE};
