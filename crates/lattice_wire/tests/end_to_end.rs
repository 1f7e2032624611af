use lattice_style::{ResolutionCache, StructuralContext};
use lattice_topology::{ClassRegistry, Document, SlotData, Tree, parse};
use lattice_wire::{Dictionary, ErrorCorrection, Packager, PackagerConfig};
use pretty_assertions::assert_eq;

const WALLET: &str = "\
# wallet screen
@theme midnight
@title wallet
header|wallet
hero
  title|Balance: $o coins
  text.muted|rate $u per day
list
  item|Today $c earned
  item[act:open]|history
grid c:1,3
  card
    image.avatar ~
    field.email|email;required
  card[buoyancy:floating]|zephyr quark
button.primary[interaction:submit]|send
@view settings
nav|back
form
  toggle|dark mode";

fn packed_roundtrip(packager: &Packager, source: &str) -> Document {
    let package = smol::block_on(packager.pack(source)).unwrap();
    assert!(package.warnings.is_empty(), "{:?}", package.warnings);
    smol::block_on(packager.unpack(&package.payload)).unwrap()
}

/// Style of every node in walk order, as (class path, resolution JSON).
fn styles(tree: &Tree, cache: &ResolutionCache) -> Vec<(String, String)> {
    let registry = ClassRegistry::standard();
    tree.walk()
        .map(|(id, node)| {
            let context = StructuralContext::for_node(tree, id, registry);
            let resolution = cache.resolve_in(node.prime(registry), &context).unwrap();
            (
                node.class_path.clone(),
                serde_json::to_string(&resolution).unwrap(),
            )
        })
        .collect()
}

#[test]
fn test_document_survives_the_wire() {
    let packager = Packager::new(PackagerConfig::default());
    let parsed = parse(WALLET).document;
    let unpacked = packed_roundtrip(&packager, WALLET);
    assert_eq!(unpacked, parsed);
    assert_eq!(unpacked.directive("theme"), Some("midnight"));
    assert_eq!(unpacked.views.len(), 1);

    let reparsed = parse(&unpacked.to_source());
    assert!(reparsed.warnings.is_empty());
    assert_eq!(reparsed.document, parsed);
}

#[test]
fn test_unpacked_tree_renders_slots() {
    let packager = Packager::new(PackagerConfig {
        compress: false,
        error_correction: ErrorCorrection::L,
        ..Default::default()
    });
    let document = packed_roundtrip(&packager, WALLET);
    let tree = &document.tree;
    assert_eq!(tree.slot_counts.owner, 1);
    assert_eq!(tree.slot_counts.user, 1);
    assert_eq!(tree.slot_counts.computed, 1);

    let data = SlotData {
        owner: vec!["120".into()],
        user: vec!["3".into()],
    };
    let rendered: Vec<String> = tree
        .walk()
        .filter_map(|(id, _)| tree.render_text(id, &data))
        .collect();
    assert!(rendered.contains(&"Balance: 120 coins".to_string()));
    assert!(rendered.contains(&"rate 3 per day".to_string()));
    assert!(rendered.contains(&"Today 360 earned".to_string()));
}

#[test]
fn test_styles_match_on_both_ends() {
    let packager = Packager::new(PackagerConfig::default());
    let parsed = parse(WALLET).document;
    let unpacked = packed_roundtrip(&packager, WALLET);

    let sender = ResolutionCache::new();
    let receiver = ResolutionCache::new();
    assert_eq!(styles(&unpacked.tree, &receiver), styles(&parsed.tree, &sender));
    for (name, view) in &parsed.views {
        assert_eq!(styles(&unpacked.views[name], &receiver), styles(view, &sender));
    }

    let stats = receiver.stats();
    assert!(stats.hits > 0);
    assert!(stats.entries < parsed.node_count());
}

#[test]
fn test_shared_session_dictionary() {
    let mut sender = Packager::new(PackagerConfig {
        compress: false,
        ..Default::default()
    });
    let plain = smol::block_on(sender.pack(WALLET)).unwrap();

    for word in ["zephyr", "quark", "wallet", "coins", "earned"] {
        sender.dictionary_mut().words_mut().register_if_absent(word).unwrap();
    }
    let learned = smol::block_on(sender.pack(WALLET)).unwrap();
    assert!(learned.binary_len < plain.binary_len);

    let extensions = sender.dictionary().words().extensions().to_vec();
    let receiver = Packager::with_dictionary(
        PackagerConfig::default(),
        Dictionary::with_extensions(extensions.iter().map(String::as_str), std::iter::empty())
            .unwrap(),
    );
    assert_eq!(
        smol::block_on(receiver.unpack(&learned.payload)).unwrap(),
        parse(WALLET).document
    );

    let stranger = Packager::new(PackagerConfig::default());
    assert!(smol::block_on(stranger.unpack(&learned.payload)).is_err());
}

#[test]
fn test_spacing_survives_packing() {
    let packager = Packager::new(PackagerConfig {
        compress: false,
        ..Default::default()
    });
    for source in ["text|Total:  $o coins", "text|$o  $u", "text|a  b c", "text|x\t;  y"] {
        let unpacked = packed_roundtrip(&packager, source);
        assert_eq!(unpacked, parse(source).document, "{source:?}");
    }
}
