//! Topology documents: the indentation DSL, the trees it produces and the
//! class registry that gives each node its default properties.

mod classes;
mod document;
mod parser;
mod slots;
mod tree;
mod warning;

pub use classes::{ClassRegistry, FALLBACK_CLASS, THEMES, theme_id, theme_name};
pub use document::{Document, VIEW_DIRECTIVE};
pub use parser::{
    KNOWN_DIRECTIVES, ParseResult, Parser, classify_content, collapse_whitespace, parse,
};
pub use slots::assign_slots;
pub use tree::{
    Binding, Content, GridLayout, Node, NodeId, SlotCounts, SlotData, Tree, TreeBuilder, Variable,
    Walk,
};
pub use warning::{ParseWarning, WarningKind, suggest};
