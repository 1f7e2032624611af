//! Line-oriented parser for the topology DSL.
//!
//! ```text
//! @theme dark
//! # comment
//! header[buoyancy:level]|Welcome back
//!   nav|c:1,3
//!     button[act:home]|Home
//!   text|Hello $o, you have $u items
//! card|icon;Title;Body text
//! @view settings
//! form
//!   field|~
//! ```
//!
//! The parser never fails. Anything it cannot make sense of falls back to a
//! documented default and is reported as a [`ParseWarning`].

use indexmap::IndexMap;
use lattice_props::{Axis, PropertyError, PropertySet, PropertyTable};
use serde::{Deserialize, Serialize};

use crate::classes::{ClassRegistry, FALLBACK_CLASS, THEMES, theme_id};
use crate::document::{Document, VIEW_DIRECTIVE};
use crate::slots::assign_slots;
use crate::tree::{Binding, Content, GridLayout, Node, NodeId, Tree, TreeBuilder, Variable};
use crate::warning::{ParseWarning, WarningKind, suggest};

const COMMENT_MARKER: char = '#';
const DIRECTIVE_MARKER: char = '@';
const CONTENT_SEPARATOR: char = '|';
const TEXTURE_MARKER: &str = "~";
const FIELD_SEPARATOR: char = ';';
const ACTION_KEY: &str = "act";

/// Directives with a defined meaning. Others are kept but warned about.
pub const KNOWN_DIRECTIVES: &[&str] = &["theme", "title", "lang", "version", "flags"];

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParseResult {
    pub document: Document,
    pub warnings: Vec<ParseWarning>,
}

impl ParseResult {
    pub fn tree(&self) -> &Tree {
        &self.document.tree
    }

    pub fn view(&self, name: &str) -> Option<&Tree> {
        self.document.views.get(name)
    }

    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }
}

/// Parse with the built-in class registry.
pub fn parse(source: &str) -> ParseResult {
    Parser::new(ClassRegistry::standard()).parse(source)
}

pub struct Parser<'a> {
    registry: &'a ClassRegistry,
    table: &'static PropertyTable,
}

/// Tree under construction plus the source line of every node in it.
struct OpenTree {
    name: Option<String>,
    builder: TreeBuilder,
    lines: Vec<usize>,
}

impl OpenTree {
    fn new(name: Option<String>) -> Self {
        Self {
            name,
            builder: TreeBuilder::new(),
            lines: Vec::new(),
        }
    }
}

impl<'a> Parser<'a> {
    pub fn new(registry: &'a ClassRegistry) -> Self {
        Self {
            registry,
            table: PropertyTable::standard(),
        }
    }

    pub fn parse(&self, source: &str) -> ParseResult {
        let mut directives = IndexMap::new();
        let mut views = IndexMap::new();
        let mut main_tree = None;
        let mut warnings = Vec::new();
        let mut indent_unit = None;
        let mut open = OpenTree::new(None);

        for (ix, raw_line) in source.lines().enumerate() {
            let line_number = ix + 1;
            let trimmed = raw_line.trim();
            if trimmed.is_empty() || trimmed.starts_with(COMMENT_MARKER) {
                continue;
            }

            if let Some(rest) = trimmed.strip_prefix(DIRECTIVE_MARKER) {
                let Some((name, value)) = split_directive(rest) else {
                    log::debug!("ignoring malformed directive on line {line_number}: {trimmed}");
                    continue;
                };
                if name == VIEW_DIRECTIVE {
                    if value.is_empty() {
                        log::debug!("ignoring unnamed view on line {line_number}");
                        continue;
                    }
                    let finished = std::mem::replace(&mut open, OpenTree::new(Some(value.to_string())));
                    self.close_tree(finished, &mut main_tree, &mut views, &mut warnings);
                    if views.contains_key(value) {
                        warnings.push(ParseWarning::new(
                            WarningKind::DuplicateView,
                            value,
                            line_number,
                        ));
                    }
                    continue;
                }
                self.check_directive(name, value, line_number, &mut warnings);
                directives.insert(name.to_string(), collapse_whitespace(value));
                continue;
            }

            let leading = raw_line.len() - raw_line.trim_start().len();
            let indent = match (leading, indent_unit) {
                (0, _) => 0,
                (_, Some(unit)) => (leading + unit / 2) / unit,
                (_, None) => {
                    log::debug!("indent unit is {leading} (line {line_number})");
                    indent_unit = Some(leading);
                    1
                }
            };

            let node = self.parse_content_line(trimmed, line_number, &mut warnings);
            let (_, jumped) = open.builder.push(indent, node);
            open.lines.push(line_number);
            if jumped {
                warnings.push(ParseWarning::new(
                    WarningKind::IndentJump,
                    raw_line.trim_end(),
                    line_number,
                ));
            }
        }
        self.close_tree(open, &mut main_tree, &mut views, &mut warnings);

        let document = Document {
            directives,
            tree: main_tree.unwrap_or_default(),
            views,
        };
        log::debug!(
            "parsed {} nodes in {} view(s) with {} warning(s)",
            document.node_count(),
            document.views.len() + 1,
            warnings.len()
        );
        ParseResult { document, warnings }
    }

    fn close_tree(
        &self,
        open: OpenTree,
        main_tree: &mut Option<Tree>,
        views: &mut IndexMap<String, Tree>,
        warnings: &mut Vec<ParseWarning>,
    ) {
        let mut tree = open.builder.finish();
        for NodeId(ix) in assign_slots(&mut tree) {
            let value = tree.node(NodeId(ix)).class_path.clone();
            warnings.push(ParseWarning::new(
                WarningKind::UnboundComputed,
                value,
                open.lines.get(ix).copied().unwrap_or_default(),
            ));
        }
        match open.name {
            Some(name) => {
                views.insert(name, tree);
            }
            None => *main_tree = Some(tree),
        }
    }

    fn check_directive(
        &self,
        name: &str,
        value: &str,
        line: usize,
        warnings: &mut Vec<ParseWarning>,
    ) {
        if !KNOWN_DIRECTIVES.contains(&name) {
            warnings.push(
                ParseWarning::new(WarningKind::UnknownDirective, name, line)
                    .with_suggestion(suggest(name, KNOWN_DIRECTIVES.iter().copied())),
            );
        } else if name == "theme" && theme_id(value).is_none() {
            warnings.push(
                ParseWarning::new(WarningKind::UnknownTheme, value, line)
                    .with_suggestion(suggest(value, THEMES.iter().copied())),
            );
        }
    }

    fn parse_content_line(
        &self,
        line: &str,
        line_number: usize,
        warnings: &mut Vec<ParseWarning>,
    ) -> Node {
        let (head, content) = split_content(line);
        let (class_path, overrides) = split_overrides(head);

        let class_path = if class_path.is_empty() {
            warnings.push(ParseWarning::new(WarningKind::EmptyClassPath, line, line_number));
            FALLBACK_CLASS.to_string()
        } else {
            class_path
        };

        let class_name = class_path.split('.').next().unwrap_or(&class_path);
        if !self.registry.contains(class_name) {
            warnings.push(
                ParseWarning::new(WarningKind::UnknownClass, class_name, line_number)
                    .with_suggestion(suggest(class_name, self.registry.names())),
            );
        }

        let mut node = Node::new(class_path);
        if let Some(overrides) = overrides {
            self.apply_overrides(&mut node, overrides, line_number, warnings);
        }
        node.content = classify_content(content);
        node
    }

    fn apply_overrides(
        &self,
        node: &mut Node,
        overrides: &str,
        line: usize,
        warnings: &mut Vec<ParseWarning>,
    ) {
        let mut set = PropertySet::new();
        for entry in overrides.split(',').map(str::trim).filter(|e| !e.is_empty()) {
            let Some((key, value)) = entry.split_once(':') else {
                warnings.push(ParseWarning::new(WarningKind::MalformedOverride, entry, line));
                continue;
            };
            let (key, value) = (key.trim(), value.trim());
            if key == ACTION_KEY {
                node.action = Some(value.to_string());
                continue;
            }
            match self.table.lookup_named(key, value) {
                Ok(property) => {
                    if set.try_insert(property).is_err() {
                        warnings.push(ParseWarning::new(WarningKind::DuplicateAxis, entry, line));
                    }
                }
                Err(PropertyError::UnknownAxis(_)) => {
                    let candidates = Axis::ALL
                        .iter()
                        .map(|a| a.name())
                        .chain(std::iter::once(ACTION_KEY));
                    warnings.push(
                        ParseWarning::new(WarningKind::UnknownAxis, key, line)
                            .with_suggestion(suggest(key, candidates)),
                    );
                }
                Err(_) => {
                    let candidates: Vec<&str> = Axis::from_name(key)
                        .map(|axis| self.table.values_for(axis).map(|v| v.name).collect())
                        .unwrap_or_default();
                    warnings.push(
                        ParseWarning::new(WarningKind::UnknownPropertyValue, entry, line)
                            .with_suggestion(suggest(value, candidates)),
                    );
                }
            }
        }
        node.overrides = set;
    }
}

/// `name value` after the `@`. The name must be a lowercase identifier.
fn split_directive(rest: &str) -> Option<(&str, &str)> {
    let (name, value) = match rest.split_once(char::is_whitespace) {
        Some((name, value)) => (name, value.trim()),
        None => (rest, ""),
    };
    let mut chars = name.chars();
    let valid = chars.next().is_some_and(|c| c.is_ascii_lowercase())
        && chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_' || c == '-');
    valid.then_some((name, value))
}

/// Split at the first `|` outside brackets, or failing that the first
/// whitespace outside brackets.
fn split_content(line: &str) -> (&str, &str) {
    let mut depth = 0usize;
    let mut first_space = None;
    for (ix, c) in line.char_indices() {
        match c {
            '[' => depth += 1,
            ']' => depth = depth.saturating_sub(1),
            CONTENT_SEPARATOR if depth == 0 => {
                return (line[..ix].trim(), line[ix + 1..].trim());
            }
            c if c.is_whitespace() && depth == 0 && first_space.is_none() => {
                first_space = Some(ix);
            }
            _ => {}
        }
    }
    match first_space {
        Some(ix) => (line[..ix].trim(), line[ix..].trim()),
        None => (line.trim(), ""),
    }
}

/// Pull `[...]` out of a class path, returning the remaining path and the
/// bracket contents.
fn split_overrides(head: &str) -> (String, Option<&str>) {
    let Some(open) = head.find('[') else {
        return (head.to_string(), None);
    };
    let (inside, after) = match head[open + 1..].find(']') {
        Some(close) => (
            &head[open + 1..open + 1 + close],
            &head[open + 1 + close + 1..],
        ),
        None => (&head[open + 1..], ""),
    };
    let path = format!("{}{}", &head[..open], after).trim().to_string();
    (path, Some(inside))
}

/// Decide what kind of content a line carries: texture, grid weights, bound
/// text, fields or plain text, in that order.
pub fn classify_content(content: &str) -> Content {
    let content = content.trim();
    if content.is_empty() {
        Content::None
    } else if content == TEXTURE_MARKER {
        Content::Texture
    } else if let Some(grid) = parse_grid(content) {
        Content::Grid(grid)
    } else if let Some(variables) = parse_bound(content) {
        Content::Bound(variables)
    } else if content.contains(FIELD_SEPARATOR) {
        Content::Fields(
            content
                .split(FIELD_SEPARATOR)
                .map(|f| collapse_whitespace(f.trim()))
                .collect(),
        )
    } else {
        Content::Text(collapse_whitespace(content))
    }
}

/// Replace every run of whitespace with a single space. Stored text never
/// holds more than the binary form's word lists can carry.
pub fn collapse_whitespace(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_run = false;
    for c in text.chars() {
        if c.is_whitespace() {
            if !in_run {
                out.push(' ');
            }
            in_run = true;
        } else {
            out.push(c);
            in_run = false;
        }
    }
    out
}

/// `c:1,3`, `r:1,2`, or both separated by whitespace or `;`.
fn parse_grid(content: &str) -> Option<GridLayout> {
    let mut grid = GridLayout::default();
    for token in content
        .split(|c: char| c.is_whitespace() || c == FIELD_SEPARATOR)
        .filter(|t| !t.is_empty())
    {
        let (axis, weights) = token.split_once(':')?;
        let target = match axis {
            "c" if grid.columns.is_empty() => &mut grid.columns,
            "r" if grid.rows.is_empty() => &mut grid.rows,
            _ => return None,
        };
        for weight in weights.split(',') {
            let weight: u8 = weight.trim().parse().ok()?;
            if weight == 0 {
                return None;
            }
            target.push(weight);
        }
    }
    (!grid.is_empty()).then_some(grid)
}

/// Split text around `$o`, `$u` and `$c` sigils. A sigil followed by a letter
/// or digit is plain text.
fn parse_bound(content: &str) -> Option<Vec<Variable>> {
    let mut variables: Vec<Variable> = Vec::new();
    let mut literal_start = 0;
    let bytes = content.as_bytes();
    let mut ix = 0;
    while ix < bytes.len() {
        if bytes[ix] == b'$' && ix + 1 < bytes.len() {
            let binding = Binding::from_sigil_letter(bytes[ix + 1] as char);
            let boundary = bytes.get(ix + 2).is_none_or(|b| !b.is_ascii_alphanumeric());
            if let (Some(binding), true) = (binding, boundary) {
                variables.push(Variable::new(
                    binding,
                    collapse_whitespace(&content[literal_start..ix]),
                ));
                ix += 2;
                literal_start = ix;
                continue;
            }
        }
        ix += 1;
    }
    let last = variables.last_mut()?;
    last.suffix = collapse_whitespace(&content[literal_start..]);
    Some(variables)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    /// Class paths and depths in walk order, for structural comparison.
    fn shape(tree: &Tree) -> Vec<(usize, String)> {
        tree.walk()
            .map(|(_, n)| (n.depth, n.class_path.clone()))
            .collect()
    }

    #[test]
    fn test_three_levels_one_root() {
        let result = parse("card\n  list\n    item|Hello\n");
        let tree = result.tree();
        assert_eq!(tree.roots().len(), 1);
        assert_eq!(tree.depth(), 3);
        assert!(result.warnings.is_empty(), "{:?}", result.warnings);
    }

    #[test]
    fn test_indent_unit_normalization() {
        let one = "card\n list\n  item|a\n  item|b\n footer\nhero\n";
        let two = "card\n  list\n    item|a\n    item|b\n  footer\nhero\n";
        let four = "card\n    list\n        item|a\n        item|b\n    footer\nhero\n";
        let one = parse(one);
        let two = parse(two);
        let four = parse(four);
        assert_eq!(one.tree(), two.tree());
        assert_eq!(two.tree(), four.tree());
        assert_eq!(
            shape(two.tree()),
            vec![
                (0, "card".to_string()),
                (1, "list".to_string()),
                (2, "item".to_string()),
                (2, "item".to_string()),
                (1, "footer".to_string()),
                (0, "hero".to_string()),
            ]
        );
    }

    #[test]
    fn test_odd_indent_rounds_to_nearest_level() {
        // Unit 2; three spaces rounds up to level 2.
        let result = parse("card\n  list\n   item\n");
        assert_eq!(result.tree().node(NodeId(2)).depth, 2);
    }

    #[test]
    fn test_fields_content() {
        let result = parse("card|icon;Title;Body text");
        let node = result.tree().node(NodeId(0));
        assert_eq!(
            node.fields(),
            Some(&["icon".to_string(), "Title".to_string(), "Body text".to_string()][..])
        );
        assert_eq!(node.text(), None);
    }

    #[test]
    fn test_content_classification_priority() {
        assert_eq!(classify_content("~"), Content::Texture);
        assert_eq!(
            classify_content("c:1,3 r:1,2"),
            Content::Grid(GridLayout {
                columns: vec![1, 3],
                rows: vec![1, 2],
            })
        );
        assert_eq!(
            classify_content("r:2;c:1"),
            Content::Grid(GridLayout {
                columns: vec![1],
                rows: vec![2],
            })
        );
        // A sigil wins over the field separator.
        assert!(matches!(classify_content("a;$o"), Content::Bound(_)));
        assert_eq!(
            classify_content("c:x"),
            Content::Text("c:x".to_string())
        );
        assert_eq!(
            classify_content("cost $output"),
            Content::Text("cost $output".to_string())
        );
        assert_eq!(classify_content(""), Content::None);
    }

    #[test]
    fn test_bound_text_prefix_and_suffix() {
        let Content::Bound(vars) = classify_content("Hi $o, you owe $c today") else {
            panic!("expected bound text");
        };
        assert_eq!(vars.len(), 2);
        assert_eq!(vars[0].binding, Binding::Owner);
        assert_eq!(vars[0].prefix, "Hi ");
        assert_eq!(vars[0].suffix, "");
        assert_eq!(vars[1].binding, Binding::Computed);
        assert_eq!(vars[1].prefix, ", you owe ");
        assert_eq!(vars[1].suffix, " today");
    }

    #[test]
    fn test_whitespace_runs_collapse() {
        assert_eq!(classify_content("a  b\tc"), Content::Text("a b c".into()));
        assert_eq!(
            classify_content("one  two ; three"),
            Content::Fields(vec!["one two".into(), "three".into()])
        );

        let Content::Bound(vars) = classify_content("Total:  $o\t\t$u  coins") else {
            panic!("expected bound text");
        };
        assert_eq!(vars[0].prefix, "Total: ");
        assert_eq!(vars[1].prefix, " ");
        assert_eq!(vars[1].suffix, " coins");

        let result = parse("@title my   shop\ntext|$o  $u");
        assert_eq!(result.document.directive("title"), Some("my shop"));
        assert_eq!(result.tree().node(result.tree().roots()[0]).variables()[1].prefix, " ");
    }

    #[test]
    fn test_slots_reset_per_view() {
        let source = "\
text|$o and $u
text|$o
@view settings
text|$o and $u
text|$o
";
        let result = parse(source);
        let main = result.tree();
        let view = result.view("settings").unwrap();
        assert_eq!(main, view);
        assert_eq!(main.slot_counts.owner, 2);
        assert_eq!(main.node(NodeId(1)).variables()[0].slot, 1);
        assert_eq!(parse(source), result);
    }

    #[test]
    fn test_directives_and_views() {
        let source = "\
@theme dark
@title  Shop front
@  malformed
@Bad value
header|Top
@view cart
list
  item|one
@view
item|still cart
";
        let result = parse(source);
        let doc = &result.document;
        assert_eq!(doc.directive("theme"), Some("dark"));
        assert_eq!(doc.directive("title"), Some("Shop front"));
        assert_eq!(doc.directives.len(), 2);
        assert_eq!(doc.tree.len(), 1);
        let cart = &doc.views["cart"];
        assert_eq!(cart.roots().len(), 2);
        assert!(result.warnings.is_empty(), "{:?}", result.warnings);
    }

    #[test]
    fn test_unknown_names_warn_with_suggestions() {
        let source = "\
@theem dark
@theme neon
hedaer|Welcome
card[densty:solid,mass:9,charge:repel,charge:attract,oops]
";
        let result = parse(source);
        let kinds: Vec<(WarningKind, &str, Option<&str>)> = result
            .warnings
            .iter()
            .map(|w| (w.kind, w.value.as_str(), w.suggestion.as_deref()))
            .collect();
        assert_eq!(
            kinds,
            vec![
                (WarningKind::UnknownDirective, "theem", Some("theme")),
                (WarningKind::UnknownTheme, "neon", None),
                (WarningKind::UnknownClass, "hedaer", Some("header")),
                (WarningKind::UnknownAxis, "densty", Some("density")),
                (WarningKind::UnknownPropertyValue, "mass:9", None),
                (WarningKind::DuplicateAxis, "charge:attract", None),
                (WarningKind::MalformedOverride, "oops", None),
            ]
        );
        // Unknown class still produces a node, with the written path.
        assert_eq!(result.tree().node(NodeId(0)).class_path, "hedaer");
        let card = result.tree().node(NodeId(1));
        assert_eq!(card.overrides.get(Axis::Charge), Some("repel"));
    }

    #[test]
    fn test_overrides_action_and_pipe_optional() {
        let result = parse("button.primary[act:checkout, mass:2.0] Pay now");
        let node = result.tree().node(NodeId(0));
        assert_eq!(node.class_path, "button.primary");
        assert_eq!(node.action.as_deref(), Some("checkout"));
        assert_eq!(node.overrides.get(Axis::Mass), Some("2.0"));
        assert_eq!(node.text(), Some("Pay now"));

        let registry = ClassRegistry::standard();
        let props = node.properties(registry);
        assert_eq!(props.get(Axis::Role), Some("button"));
        assert_eq!(props.mass(), Some(2.0));
    }

    #[test]
    fn test_indent_jump_and_unbound_computed_warn() {
        let result = parse("card\n  text|x\n      text|$c\n");
        let kinds: Vec<WarningKind> = result.warnings.iter().map(|w| w.kind).collect();
        assert_eq!(kinds, vec![WarningKind::IndentJump, WarningKind::UnboundComputed]);
        assert_eq!(result.warnings[1].line, 3);
    }

    #[test]
    fn test_to_source_reparses_identically() {
        let source = "\
@theme light
header[buoyancy:level]|Welcome
  nav|c:1,3
    button[act:home]|Home
    button|Cart $o items
hero|~
card|icon;Title;Body text
@view profile
form
  field|Name: $u
  text|Total $c
";
        let first = parse(source);
        let printed = first.document.to_source();
        let second = parse(&printed);
        assert_eq!(second.document, first.document);
        assert_eq!(second.document.to_source(), printed);
    }
}
