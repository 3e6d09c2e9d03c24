pub mod language;

pub use language::{
    shared_registry, HighlightError, HighlightKind, HighlightToken, LanguageDefinition, LanguageId,
    LanguageRegistry, LanguageSpec, StringRule,
};
