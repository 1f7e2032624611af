//! Slot assignment: a depth-first walk numbering every variable per binding
//! class. Identical trees always receive identical slots.

use crate::tree::{Binding, Content, NodeId, SlotCounts, Tree};

/// Number the variables of `tree` and record the totals in
/// `tree.slot_counts`. Returns the nodes holding a computed variable with no
/// owner or no user slot before it.
pub fn assign_slots(tree: &mut Tree) -> Vec<NodeId> {
    let order: Vec<NodeId> = tree.walk().map(|(id, _)| id).collect();

    let mut counts = SlotCounts::default();
    let mut last_owner = None;
    let mut last_user = None;
    let mut unbound = Vec::new();

    for id in order {
        let Content::Bound(variables) = &mut tree.node_mut(id).content else {
            continue;
        };
        for variable in variables.iter_mut() {
            match variable.binding {
                Binding::Owner => {
                    variable.slot = counts.owner;
                    last_owner = Some(counts.owner);
                    counts.owner += 1;
                }
                Binding::User => {
                    variable.slot = counts.user;
                    last_user = Some(counts.user);
                    counts.user += 1;
                }
                Binding::Computed => {
                    variable.slot = counts.computed;
                    variable.derived_from = last_owner.zip(last_user);
                    counts.computed += 1;
                    if variable.derived_from.is_none() && !unbound.contains(&id) {
                        unbound.push(id);
                    }
                }
            }
        }
    }

    log::debug!(
        "assigned {} owner, {} user, {} computed slots",
        counts.owner,
        counts.user,
        counts.computed
    );
    tree.slot_counts = counts;
    unbound
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::{Node, TreeBuilder, Variable};
    use pretty_assertions::assert_eq;

    fn bound(bindings: &[Binding]) -> Node {
        let mut node = Node::new("text");
        node.content = Content::Bound(bindings.iter().map(|b| Variable::new(*b, "")).collect());
        node
    }

    fn slots(tree: &Tree, id: NodeId) -> Vec<(usize, Option<(usize, usize)>)> {
        tree.node(id)
            .variables()
            .iter()
            .map(|v| (v.slot, v.derived_from))
            .collect()
    }

    #[test]
    fn test_counters_are_per_binding_class() {
        let mut builder = TreeBuilder::new();
        let (a, _) = builder.push(0, bound(&[Binding::Owner, Binding::User]));
        let (b, _) = builder.push(1, bound(&[Binding::Owner, Binding::Computed]));
        let (c, _) = builder.push(0, bound(&[Binding::User, Binding::Owner, Binding::Computed]));
        let mut tree = builder.finish();

        assert!(assign_slots(&mut tree).is_empty());
        assert_eq!(slots(&tree, a), vec![(0, None), (0, None)]);
        assert_eq!(slots(&tree, b), vec![(1, None), (0, Some((1, 0)))]);
        assert_eq!(slots(&tree, c), vec![(1, None), (2, None), (1, Some((2, 1)))]);
        assert_eq!(
            tree.slot_counts,
            SlotCounts {
                owner: 3,
                user: 2,
                computed: 2
            }
        );
    }

    #[test]
    fn test_computed_without_sources_is_reported() {
        let mut builder = TreeBuilder::new();
        let (a, _) = builder.push(0, bound(&[Binding::Owner, Binding::Computed]));
        let mut tree = builder.finish();
        assert_eq!(assign_slots(&mut tree), vec![a]);
        assert_eq!(slots(&tree, a), vec![(0, None), (0, None)]);
    }

    #[test]
    fn test_assignment_is_repeatable() {
        let mut builder = TreeBuilder::new();
        builder.push(0, bound(&[Binding::User, Binding::Owner, Binding::Computed]));
        builder.push(1, bound(&[Binding::Owner]));
        let mut first = builder.finish();
        let mut second = first.clone();
        assign_slots(&mut first);
        assign_slots(&mut second);
        assign_slots(&mut second);
        assert_eq!(first, second);
    }
}
