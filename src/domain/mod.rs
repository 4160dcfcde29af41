//! Core data types shared by the engine, the workspace backend and the CLI.

pub mod config;
pub mod element;
pub mod handle;
pub mod source;

pub use config::ReorgConfig;
pub use element::{
    DeclarationId, DeclarationKind, Destination, Element, Location, NamespaceId, ReorgMode,
    ResourcePath, SelectionItem, UnitId,
};
pub use handle::HandleParseError;
pub use source::{DeclarationInfo, SourceRange};
