//! Topology trees: an arena of immutable nodes plus the stack-based builder
//! shared by the text parser and the binary decoder.

use lattice_props::{PrimeProduct, PropertySet};
use serde::{Deserialize, Serialize};

use crate::classes::ClassRegistry;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodeId(pub usize);

/// Which data array a variable reads from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Binding {
    Owner,
    User,
    /// The product of the nearest preceding owner and user values.
    Computed,
}

impl Binding {
    pub fn sigil(&self) -> &'static str {
        match self {
            Binding::Owner => "$o",
            Binding::User => "$u",
            Binding::Computed => "$c",
        }
    }

    pub fn from_sigil_letter(letter: char) -> Option<Binding> {
        match letter {
            'o' => Some(Binding::Owner),
            'u' => Some(Binding::User),
            'c' => Some(Binding::Computed),
            _ => None,
        }
    }
}

/// One positional data slot inside bound text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Variable {
    pub binding: Binding,
    /// Literal text between the previous sigil (or line start) and this one.
    pub prefix: String,
    /// Trailing literal text; only the last variable of a line carries one.
    pub suffix: String,
    /// Index into the owner, user or computed array, per view.
    pub slot: usize,
    /// `(owner slot, user slot)` a computed variable multiplies.
    pub derived_from: Option<(usize, usize)>,
}

impl Variable {
    pub fn new(binding: Binding, prefix: impl Into<String>) -> Self {
        Self {
            binding,
            prefix: prefix.into(),
            suffix: String::new(),
            slot: 0,
            derived_from: None,
        }
    }
}

/// Column and row weights of a grid layout instruction.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridLayout {
    pub columns: Vec<u8>,
    pub rows: Vec<u8>,
}

impl GridLayout {
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty() && self.rows.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Content {
    #[default]
    None,
    Text(String),
    /// Filler text must be supplied by the host.
    Texture,
    Fields(Vec<String>),
    Grid(GridLayout),
    Bound(Vec<Variable>),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    pub class_path: String,
    /// Properties set explicitly in `class[axis:value]` brackets.
    pub overrides: PropertySet,
    pub action: Option<String>,
    pub content: Content,
    pub depth: usize,
    pub children: Vec<NodeId>,
}

impl Node {
    pub fn new(class_path: impl Into<String>) -> Self {
        Self {
            class_path: class_path.into(),
            overrides: PropertySet::new(),
            action: None,
            content: Content::None,
            depth: 0,
            children: Vec::new(),
        }
    }

    pub fn text(&self) -> Option<&str> {
        match &self.content {
            Content::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn fields(&self) -> Option<&[String]> {
        match &self.content {
            Content::Fields(fields) => Some(fields),
            _ => None,
        }
    }

    pub fn is_texture(&self) -> bool {
        matches!(self.content, Content::Texture)
    }

    pub fn grid(&self) -> Option<&GridLayout> {
        match &self.content {
            Content::Grid(grid) => Some(grid),
            _ => None,
        }
    }

    pub fn variables(&self) -> &[Variable] {
        match &self.content {
            Content::Bound(variables) => variables,
            _ => &[],
        }
    }

    /// First segment of the class path.
    pub fn class_name(&self) -> &str {
        self.class_path
            .split('.')
            .next()
            .unwrap_or(&self.class_path)
    }

    /// Class defaults with this node's overrides on top.
    pub fn properties(&self, registry: &ClassRegistry) -> PropertySet {
        registry.defaults_for(&self.class_path).overlay(&self.overrides)
    }

    pub fn prime(&self, registry: &ClassRegistry) -> PrimeProduct {
        lattice_props::encode(&self.properties(registry))
    }
}

/// Slot totals per binding class.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotCounts {
    pub owner: usize,
    pub user: usize,
    pub computed: usize,
}

impl SlotCounts {
    pub fn total(&self) -> usize {
        self.owner + self.user + self.computed
    }
}

/// Values supplied for a view's owner and user slots.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SlotData {
    pub owner: Vec<String>,
    pub user: Vec<String>,
}

/// One rooted forest: the main document or a named view.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tree {
    nodes: Vec<Node>,
    roots: Vec<NodeId>,
    pub slot_counts: SlotCounts,
}

impl Tree {
    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0)
    }

    pub(crate) fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.0]
    }

    pub fn roots(&self) -> &[NodeId] {
        &self.roots
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Number of levels, so a lone root has depth 1.
    pub fn depth(&self) -> usize {
        self.nodes.iter().map(|n| n.depth + 1).max().unwrap_or(0)
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes
            .iter()
            .position(|n| n.children.contains(&id))
            .map(NodeId)
    }

    /// Pre-order walk driven by an explicit stack.
    pub fn walk(&self) -> Walk<'_> {
        Walk {
            tree: self,
            stack: self.roots.iter().rev().copied().collect(),
        }
    }

    /// Text for a node with owner/user values substituted into its slots.
    /// Computed slots multiply their two sources; a source that is missing or
    /// not numeric renders as nothing.
    pub fn render_text(&self, id: NodeId, data: &SlotData) -> Option<String> {
        match &self.node(id).content {
            Content::Text(text) => Some(text.clone()),
            Content::Fields(fields) => Some(fields.join(" ")),
            Content::Bound(variables) => {
                let mut out = String::new();
                for variable in variables {
                    out.push_str(&variable.prefix);
                    out.push_str(&slot_value(variable, data));
                    out.push_str(&variable.suffix);
                }
                Some(out)
            }
            Content::None | Content::Texture | Content::Grid(_) => None,
        }
    }
}

fn slot_value(variable: &Variable, data: &SlotData) -> String {
    match variable.binding {
        Binding::Owner => data.owner.get(variable.slot).cloned().unwrap_or_default(),
        Binding::User => data.user.get(variable.slot).cloned().unwrap_or_default(),
        Binding::Computed => {
            let Some((owner, user)) = variable.derived_from else {
                return String::new();
            };
            let parse = |values: &[String], ix: usize| -> Option<f64> {
                values.get(ix).and_then(|v| v.trim().parse::<f64>().ok())
            };
            match (parse(&data.owner, owner), parse(&data.user, user)) {
                (Some(a), Some(b)) => format_number(a * b),
                _ => String::new(),
            }
        }
    }
}

fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{value}")
    }
}

pub struct Walk<'a> {
    tree: &'a Tree,
    stack: Vec<NodeId>,
}

impl<'a> Iterator for Walk<'a> {
    type Item = (NodeId, &'a Node);

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.stack.pop()?;
        let node = self.tree.node(id);
        self.stack.extend(node.children.iter().rev().copied());
        Some((id, node))
    }
}

/// Places nodes by indent level using a stack of `(node, indent)` frames.
#[derive(Debug, Default)]
pub struct TreeBuilder {
    tree: Tree,
    stack: Vec<(NodeId, usize)>,
}

impl TreeBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach `node` under the nearest open frame with a smaller indent.
    /// Returns its id and whether the indent skipped a level.
    pub fn push(&mut self, indent: usize, mut node: Node) -> (NodeId, bool) {
        while self.stack.last().is_some_and(|(_, open)| *open >= indent) {
            self.stack.pop();
        }

        let id = NodeId(self.tree.nodes.len());
        let jumped = match self.stack.last() {
            Some(&(parent, parent_indent)) => {
                node.depth = self.tree.node(parent).depth + 1;
                self.tree.node_mut(parent).children.push(id);
                indent > parent_indent + 1
            }
            None => {
                node.depth = 0;
                self.tree.roots.push(id);
                indent > 0
            }
        };
        self.tree.nodes.push(node);
        self.stack.push((id, indent));
        (id, jumped)
    }

    pub fn is_empty(&self) -> bool {
        self.tree.is_empty()
    }

    /// Close the tree. Slots are not yet assigned.
    pub fn finish(self) -> Tree {
        self.tree
    }
}
