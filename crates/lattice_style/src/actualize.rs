//! Φ: decoded properties plus a node's structural position to style
//! attributes.
//!
//! Three passes run in a fixed order, each free to overwrite the last:
//!
//! 1. intrinsic, from the physical axes (density, mass, charge and so on)
//! 2. role presets, from the declared structural role
//! 3. positional refinements, from [`StructuralContext`] alone
//!
//! The first two depend only on the property set, so their output can be
//! cached per prime product. Every size is the base unit scaled by a power of
//! the golden ratio.

use lattice_props::{Axis, PropertySet};
use lattice_topology::{ClassRegistry, Content, NodeId, Tree};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const GOLDEN_RATIO: f64 = 1.618_033_988_749_895;
pub const GOLDEN_RATIO_INV: f64 = 0.618_033_988_749_895;

/// Spacing unit in pixels.
pub const BASE_UNIT: f64 = 8.0;
/// Body font size in pixels.
pub const BASE_FONT: f64 = 16.0;

/// `BASE_UNIT * φ^step`.
pub fn scale(step: i32) -> f64 {
    BASE_UNIT * GOLDEN_RATIO.powi(step)
}

fn px(value: f64) -> String {
    let rounded = (value * 100.0).round() / 100.0;
    let text = format!("{rounded:.2}");
    let text = text.trim_end_matches('0').trim_end_matches('.');
    format!("{text}px")
}

/// Ordered attribute name to value map handed to the presentation layer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StyleAttributes(BTreeMap<String, String>);

impl StyleAttributes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, name: &str, value: impl Into<String>) {
        self.0.insert(name.to_string(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }

    pub fn remove(&mut self, name: &str) -> Option<String> {
        self.0.remove(name)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LayoutHint {
    Row,
    Column,
    Grid { columns: Vec<u8>, rows: Vec<u8> },
}

/// Where a node sits relative to its parent and siblings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StructuralContext {
    pub child_index: usize,
    /// Number of children of the parent, this node included.
    pub sibling_count: usize,
    pub parent_role: Option<String>,
    pub layout_hint: Option<LayoutHint>,
}

impl StructuralContext {
    pub fn new(child_index: usize, sibling_count: usize) -> Self {
        Self {
            child_index,
            sibling_count,
            ..Default::default()
        }
    }

    pub fn with_parent_role(mut self, role: impl Into<String>) -> Self {
        self.parent_role = Some(role.into());
        self
    }

    pub fn with_layout_hint(mut self, hint: LayoutHint) -> Self {
        self.layout_hint = Some(hint);
        self
    }

    pub fn is_first(&self) -> bool {
        self.child_index == 0
    }

    pub fn is_last(&self) -> bool {
        self.sibling_count > 0 && self.child_index + 1 == self.sibling_count
    }

    /// Context of `id` within `tree`. Roots count as siblings of each other.
    pub fn for_node(tree: &Tree, id: NodeId, registry: &ClassRegistry) -> Self {
        let parent = tree.parent(id);
        let siblings = match parent {
            Some(parent) => tree.node(parent).children.as_slice(),
            None => tree.roots(),
        };
        let mut context = Self::new(
            siblings.iter().position(|s| *s == id).unwrap_or_default(),
            siblings.len(),
        );
        context.parent_role = parent
            .and_then(|p| tree.node(p).properties(registry).get(Axis::Role))
            .map(str::to_string);
        if let Content::Grid(grid) = &tree.node(id).content {
            context.layout_hint = Some(LayoutHint::Grid {
                columns: grid.columns.clone(),
                rows: grid.rows.clone(),
            });
        }
        context
    }
}

/// Full Φ.
pub fn actualize(properties: &PropertySet, context: &StructuralContext) -> StyleAttributes {
    let mut style = actualize_base(properties);
    apply_positional(&mut style, context);
    style
}

/// The context-free part of Φ: intrinsic and role passes.
pub fn actualize_base(properties: &PropertySet) -> StyleAttributes {
    let mut style = StyleAttributes::new();
    apply_intrinsic(&mut style, properties);
    if let Some(role) = properties.get(Axis::Role) {
        apply_role(&mut style, role);
    }
    style
}

fn apply_intrinsic(style: &mut StyleAttributes, properties: &PropertySet) {
    for (axis, value) in properties.iter() {
        match axis {
            Axis::Density => density(style, value),
            Axis::Temperature => {
                let tint = match value {
                    "cold" => "#4a90d9",
                    "cool" => "#7fb3d5",
                    "warm" => "#e8a15c",
                    _ => "#d9534f",
                };
                style.set("tint", tint);
            }
            Axis::Charge => {
                let step = match value {
                    "repel" => 1,
                    "attract" => -1,
                    _ => 0,
                };
                style.set("gap", px(scale(step)));
                style.set("padding", px(scale(step)));
            }
            Axis::Friction => {
                let transition = match value {
                    "frictionless" => format!("all {}ms linear", millis(0)),
                    "smooth" => format!("all {}ms ease-out", millis(1)),
                    "grippy" => format!("all {}ms ease-in-out", millis(2)),
                    _ => "none".to_string(),
                };
                style.set("transition", transition);
            }
            Axis::Pressure => {
                let (grow, shrink) = match value {
                    "vacuum" => ("1", "0".to_string()),
                    "ambient" => ("1", "1".to_string()),
                    _ => ("0", format!("{GOLDEN_RATIO:.3}")),
                };
                style.set("flex-grow", grow);
                style.set("flex-shrink", shrink);
            }
            Axis::Buoyancy => {
                let z = match value {
                    "sinking" => "-1",
                    "level" => "0",
                    _ => "10",
                };
                style.set("z-index", z);
            }
            Axis::Mass => elevation(style, value),
            Axis::Role | Axis::Interaction | Axis::Signal | Axis::Focus => {}
        }
    }
}

fn millis(step: i32) -> u32 {
    (100.0 * GOLDEN_RATIO.powi(step)).round() as u32
}

fn density(style: &mut StyleAttributes, value: &str) {
    let (background, border, radius) = match value {
        "void" => ("transparent", "none", "0".to_string()),
        "gas" => ("var(--surface-translucent)", "none", px(scale(1))),
        "liquid" => ("var(--surface-muted)", "none", px(scale(1))),
        "solid" => ("var(--surface)", "1px solid var(--border)", px(scale(0))),
        _ => (
            "var(--surface-raised)",
            "1px solid var(--border-strong)",
            px(scale(-1)),
        ),
    };
    style.set("background", background);
    style.set("border", border);
    style.set("border-radius", radius);
}

fn elevation(style: &mut StyleAttributes, mass: &str) {
    let level: i32 = match mass {
        "0.25" => 0,
        "0.5" => 1,
        "1.0" => 2,
        "2.0" => 3,
        _ => 4,
    };
    style.set("elevation", level.to_string());
    let shadow = if level == 0 {
        "none".to_string()
    } else {
        let alpha = 0.1 * GOLDEN_RATIO.powi(level - 1);
        format!(
            "0 {} {} rgba(0,0,0,{alpha:.2})",
            px(scale(level - 2)),
            px(scale(level - 1))
        )
    };
    style.set("box-shadow", shadow);
}

fn apply_role(style: &mut StyleAttributes, role: &str) {
    match role {
        "page-header" => {
            style.set("position", "sticky");
            style.set("top", "0");
            style.set("width", "100%");
            style.set("display", "flex");
            style.set("flex-direction", "row");
            style.set("align-items", "center");
            style.set("z-index", "100");
        }
        "hero" => {
            style.set("display", "flex");
            style.set("flex-direction", "column");
            style.set("justify-content", "center");
            style.set("min-height", format!("{:.1}vh", GOLDEN_RATIO_INV * 100.0));
        }
        "list" => {
            style.set("display", "flex");
            style.set("flex-direction", "column");
            style.set("--divider", "1px solid var(--border)");
        }
        "card" => {
            style.set("display", "flex");
            style.set("flex-direction", "column");
            style.set("padding", px(scale(1)));
        }
        "nav" => {
            style.set("display", "flex");
            style.set("flex-direction", "row");
            style.set("gap", px(scale(1)));
        }
        "footer" => {
            style.set("width", "100%");
            style.set("display", "flex");
            style.set("flex-direction", "row");
            style.set("justify-content", "space-between");
        }
        "button" => {
            style.set("display", "inline-flex");
            style.set("align-items", "center");
            style.set("justify-content", "center");
            style.set("cursor", "pointer");
            style.set("padding", format!("{} {}", px(scale(-1)), px(scale(1))));
            style.set("min-height", px(scale(3)));
        }
        "form" | "field" => {
            style.set("display", "flex");
            style.set("flex-direction", "column");
            style.set("gap", px(scale(-1)));
        }
        "grid" => {
            style.set("display", "grid");
            style.set("gap", px(scale(0)));
        }
        "modal" => {
            style.set("position", "fixed");
            style.set("max-width", format!("{:.1}vw", GOLDEN_RATIO_INV * 100.0));
            style.set("z-index", "1000");
        }
        "media" => {
            style.set("max-width", "100%");
            style.set("object-fit", "cover");
        }
        _ => {}
    }
}

/// The context-dependent pass, applied on top of [`actualize_base`].
pub fn apply_positional(style: &mut StyleAttributes, context: &StructuralContext) {
    match &context.layout_hint {
        Some(LayoutHint::Grid { columns, rows }) => {
            style.set("display", "grid");
            if !columns.is_empty() {
                style.set("grid-template-columns", fractions(columns));
            }
            if !rows.is_empty() {
                style.set("grid-template-rows", fractions(rows));
            }
        }
        Some(LayoutHint::Row) => {
            style.set("display", "flex");
            style.set("flex-direction", "row");
        }
        Some(LayoutHint::Column) => {
            style.set("display", "flex");
            style.set("flex-direction", "column");
        }
        None => {}
    }

    match context.parent_role.as_deref() {
        Some("hero") if context.is_first() => {
            style.set("font-size", px(BASE_FONT * GOLDEN_RATIO * GOLDEN_RATIO));
            style.set("font-weight", "700");
            style.set("line-height", format!("{:.3}", 2.0 * GOLDEN_RATIO_INV));
        }
        Some("list") => {
            let divider = if context.is_last() {
                "none"
            } else {
                "var(--divider)"
            };
            style.set("border-bottom", divider);
        }
        _ => {}
    }
}

fn fractions(weights: &[u8]) -> String {
    weights
        .iter()
        .map(|w| format!("{w}fr"))
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use lattice_props::PropertyTable;
    use pretty_assertions::assert_eq;

    fn props(text: &str) -> PropertySet {
        PropertyTable::standard().parse_set(text).unwrap()
    }

    #[test]
    fn test_px_formatting() {
        assert_eq!(px(scale(0)), "8px");
        assert_eq!(px(scale(1)), "12.94px");
        assert_eq!(px(scale(-1)), "4.94px");
        assert_eq!(millis(1), 162);
    }

    #[test]
    fn test_intrinsic_pass() {
        let style = actualize_base(&props("density:solid,mass:1.0,charge:attract,friction:smooth"));
        assert_eq!(style.get("background"), Some("var(--surface)"));
        assert_eq!(style.get("border-radius"), Some("8px"));
        assert_eq!(style.get("elevation"), Some("2"));
        assert_eq!(style.get("gap"), Some("4.94px"));
        assert_eq!(style.get("transition"), Some("all 162ms ease-out"));
        assert_eq!(actualize_base(&props("mass:0.25")).get("box-shadow"), Some("none"));
    }

    #[test]
    fn test_role_overrides_intrinsic() {
        // Buoyancy alone puts the header at 10; the role preset wins.
        let style = actualize_base(&props("role:page-header,buoyancy:floating"));
        assert_eq!(style.get("position"), Some("sticky"));
        assert_eq!(style.get("width"), Some("100%"));
        assert_eq!(style.get("flex-direction"), Some("row"));
        assert_eq!(style.get("z-index"), Some("100"));
    }

    #[test]
    fn test_positional_hero_headline_and_list_divider() {
        let text = props("density:void");
        let first_in_hero = StructuralContext::new(0, 2).with_parent_role("hero");
        let second_in_hero = StructuralContext::new(1, 2).with_parent_role("hero");
        assert_eq!(actualize(&text, &first_in_hero).get("font-size"), Some("41.89px"));
        assert_eq!(actualize(&text, &second_in_hero).get("font-size"), None);

        let item = props("density:gas");
        let middle = StructuralContext::new(1, 3).with_parent_role("list");
        let last = StructuralContext::new(2, 3).with_parent_role("list");
        assert_eq!(actualize(&item, &middle).get("border-bottom"), Some("var(--divider)"));
        assert_eq!(actualize(&item, &last).get("border-bottom"), Some("none"));
    }

    #[test]
    fn test_grid_layout_hint() {
        let context = StructuralContext::new(0, 1).with_layout_hint(LayoutHint::Grid {
            columns: vec![1, 3],
            rows: vec![],
        });
        let style = actualize(&PropertySet::new(), &context);
        assert_eq!(style.get("display"), Some("grid"));
        assert_eq!(style.get("grid-template-columns"), Some("1fr 3fr"));
        assert_eq!(style.get("grid-template-rows"), None);
    }

    #[test]
    fn test_actualize_is_deterministic() {
        let set = props("density:crystal,temperature:hot,pressure:compressed,role:modal");
        let context = StructuralContext::new(2, 3).with_parent_role("list");
        assert_eq!(actualize(&set, &context), actualize(&set, &context));
    }

    #[test]
    fn test_context_for_node() {
        let parsed = lattice_topology::parse("hero\n  title|Big\n  text|Small\nlist\n  item|c:1,2\n");
        let tree = parsed.tree();
        let registry = ClassRegistry::standard();

        let title = StructuralContext::for_node(tree, NodeId(1), registry);
        assert_eq!(title, StructuralContext::new(0, 2).with_parent_role("hero"));

        let item = StructuralContext::for_node(tree, NodeId(4), registry);
        assert!(item.is_last());
        assert_eq!(item.parent_role.as_deref(), Some("list"));
        assert_eq!(
            item.layout_hint,
            Some(LayoutHint::Grid {
                columns: vec![1, 2],
                rows: vec![],
            })
        );

        let root = StructuralContext::for_node(tree, NodeId(3), registry);
        assert_eq!(root, StructuralContext::new(1, 2));
    }
}
