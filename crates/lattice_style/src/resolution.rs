use lattice_props::{Axis, PrimeProduct, PropertyError, PropertySet};
use serde::{Deserialize, Serialize};

use crate::actualize::{StructuralContext, StyleAttributes, actualize_base, apply_positional};

/// Component kind for nodes without a declared role.
pub const GENERIC_COMPONENT: &str = "box";

/// Everything a renderer needs to know about one prime product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resolution {
    pub product: PrimeProduct,
    pub properties: PropertySet,
    pub style: StyleAttributes,
    /// Gestures the node responds to.
    pub actions: Vec<String>,
    /// Where the node's events are delivered, nearest first.
    pub emit_targets: Vec<String>,
    pub component: String,
    /// `None` removes the node from keyboard navigation.
    pub nav_order: Option<u8>,
}

impl Resolution {
    /// Decode `product` and run the context-free passes.
    pub fn compute(product: PrimeProduct) -> Result<Self, PropertyError> {
        let properties = lattice_props::decode(product)?;
        Ok(Self::from_properties(product, properties))
    }

    /// Decode `product` and run every pass for `context`.
    pub fn compute_in(
        product: PrimeProduct,
        context: &StructuralContext,
    ) -> Result<Self, PropertyError> {
        Ok(Self::compute(product)?.refine(context))
    }

    pub fn from_properties(product: PrimeProduct, properties: PropertySet) -> Self {
        let style = actualize_base(&properties);
        let actions = actions_for(properties.get(Axis::Interaction));
        let emit_targets = emit_targets_for(properties.get(Axis::Signal));
        let component = properties
            .get(Axis::Role)
            .unwrap_or(GENERIC_COMPONENT)
            .to_string();
        let nav_order = nav_order_for(properties.get(Axis::Focus));
        Self {
            product,
            properties,
            style,
            actions,
            emit_targets,
            component,
            nav_order,
        }
    }

    /// A copy with the positional pass applied.
    pub fn refine(&self, context: &StructuralContext) -> Self {
        let mut refined = self.clone();
        apply_positional(&mut refined.style, context);
        refined
    }

    pub fn is_interactive(&self) -> bool {
        !self.actions.is_empty()
    }
}

fn actions_for(interaction: Option<&str>) -> Vec<String> {
    let actions: &[&str] = match interaction {
        Some("tap") => &["press"],
        Some("hold") => &["press", "long-press"],
        Some("swipe") => &["swipe-left", "swipe-right"],
        Some("submit") => &["press", "submit"],
        Some("toggle") => &["toggle"],
        _ => &[],
    };
    actions.iter().map(|a| a.to_string()).collect()
}

fn emit_targets_for(signal: Option<&str>) -> Vec<String> {
    let targets: &[&str] = match signal {
        Some("local") => &["self"],
        Some("parent") => &["parent"],
        Some("owner") => &["parent", "owner"],
        Some("broadcast") => &["parent", "owner", "broadcast"],
        _ => &[],
    };
    targets.iter().map(|t| t.to_string()).collect()
}

fn nav_order_for(focus: Option<&str>) -> Option<u8> {
    match focus {
        Some("skip") => None,
        Some("first") => Some(0),
        Some("early") => Some(1),
        Some("late") => Some(3),
        _ => Some(2),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actualize::actualize;
    use lattice_props::PropertyTable;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_semantics_from_axes() {
        let product = PropertyTable::standard()
            .encode_pairs([
                ("role", "button"),
                ("interaction", "submit"),
                ("signal", "owner"),
                ("focus", "first"),
            ])
            .unwrap();
        let resolution = Resolution::compute(product).unwrap();
        assert_eq!(resolution.component, "button");
        assert_eq!(resolution.actions, vec!["press", "submit"]);
        assert_eq!(resolution.emit_targets, vec!["parent", "owner"]);
        assert_eq!(resolution.nav_order, Some(0));
        assert!(resolution.is_interactive());
    }

    #[test]
    fn test_empty_product_is_generic() {
        let resolution = Resolution::compute(PrimeProduct::EMPTY).unwrap();
        assert_eq!(resolution.component, GENERIC_COMPONENT);
        assert!(resolution.style.is_empty());
        assert!(!resolution.is_interactive());
        assert_eq!(resolution.nav_order, Some(2));
    }

    #[test]
    fn test_refine_matches_full_actualization() {
        let product = PrimeProduct(7 * 19 * 97);
        let context = StructuralContext::new(0, 3).with_parent_role("hero");
        let refined = Resolution::compute_in(product, &context).unwrap();
        let properties = lattice_props::decode(product).unwrap();
        assert_eq!(refined.style, actualize(&properties, &context));
    }

    #[test]
    fn test_foreign_product_is_rejected() {
        assert!(Resolution::compute(PrimeProduct(49)).is_err());
    }
}
