use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;

use crate::tree::{Content, Node, Tree};

/// Reserved directive that opens a named view.
pub const VIEW_DIRECTIVE: &str = "view";

/// A parsed topology: directives, the main tree and any named views.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub directives: IndexMap<String, String>,
    pub tree: Tree,
    pub views: IndexMap<String, Tree>,
}

impl Document {
    pub fn directive(&self, name: &str) -> Option<&str> {
        self.directives.get(name).map(String::as_str)
    }

    /// Total node count across the main tree and all views.
    pub fn node_count(&self) -> usize {
        self.tree.len() + self.views.values().map(Tree::len).sum::<usize>()
    }

    /// Print source text that parses back to this document. Uses a two-space
    /// indent, puts directives first and views after the main tree.
    pub fn to_source(&self) -> String {
        let mut out = String::new();
        for (name, value) in &self.directives {
            if value.is_empty() {
                let _ = writeln!(out, "@{name}");
            } else {
                let _ = writeln!(out, "@{name} {value}");
            }
        }
        write_tree(&mut out, &self.tree);
        for (name, view) in &self.views {
            let _ = writeln!(out, "@{VIEW_DIRECTIVE} {name}");
            write_tree(&mut out, view);
        }
        out
    }
}

fn write_tree(out: &mut String, tree: &Tree) {
    for (_, node) in tree.walk() {
        for _ in 0..node.depth {
            out.push_str("  ");
        }
        write_node(out, node);
        out.push('\n');
    }
}

fn write_node(out: &mut String, node: &Node) {
    out.push_str(&node.class_path);

    let mut overrides: Vec<String> = node
        .overrides
        .iter()
        .map(|(axis, value)| format!("{axis}:{value}"))
        .collect();
    if let Some(action) = &node.action {
        overrides.push(format!("act:{action}"));
    }
    if !overrides.is_empty() {
        let _ = write!(out, "[{}]", overrides.join(","));
    }

    match &node.content {
        Content::None => {}
        Content::Text(text) => {
            let _ = write!(out, "|{text}");
        }
        Content::Texture => out.push_str("|~"),
        Content::Fields(fields) => {
            let _ = write!(out, "|{}", fields.join(";"));
        }
        Content::Grid(grid) => {
            let mut parts = Vec::new();
            if !grid.columns.is_empty() {
                parts.push(format!("c:{}", join_weights(&grid.columns)));
            }
            if !grid.rows.is_empty() {
                parts.push(format!("r:{}", join_weights(&grid.rows)));
            }
            let _ = write!(out, "|{}", parts.join(" "));
        }
        Content::Bound(variables) => {
            out.push('|');
            for variable in variables {
                out.push_str(&variable.prefix);
                out.push_str(variable.binding.sigil());
                out.push_str(&variable.suffix);
            }
        }
    }
}

fn join_weights(weights: &[u8]) -> String {
    weights
        .iter()
        .map(u8::to_string)
        .collect::<Vec<_>>()
        .join(",")
}
