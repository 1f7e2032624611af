//! Known component classes, their default properties, and theme names.

use lattice_props::{PropertySet, PropertyTable};
use std::collections::HashMap;
use std::sync::LazyLock;

/// Class every unknown name falls back to. It carries no defaults.
pub const FALLBACK_CLASS: &str = "box";

const STANDARD_CLASSES: &[(&str, &str)] = &[
    (FALLBACK_CLASS, ""),
    ("header", "role:page-header,density:solid,buoyancy:floating"),
    ("hero", "role:hero,density:liquid,mass:2.0"),
    ("list", "role:list,charge:attract"),
    ("item", "density:gas,charge:neutral"),
    ("card", "role:card,density:solid,mass:1.0,charge:neutral"),
    ("nav", "role:nav,focus:early"),
    ("footer", "role:footer,density:gas,buoyancy:sinking"),
    ("button", "role:button,interaction:tap,signal:parent,focus:normal,friction:smooth"),
    ("link", "interaction:tap,signal:parent,focus:normal"),
    ("form", "role:form,signal:owner"),
    ("field", "role:field,signal:local,focus:normal"),
    ("toggle", "interaction:toggle,signal:parent,focus:normal"),
    ("grid", "role:grid"),
    ("row", "pressure:ambient"),
    ("col", "pressure:ambient"),
    ("modal", "role:modal,density:crystal,buoyancy:floating,mass:4.0"),
    ("text", "density:void"),
    ("title", "density:void"),
    ("image", "role:media"),
    ("icon", "role:media,mass:0.25"),
    ("divider", "density:solid,mass:0.25"),
    ("spacer", "density:void,pressure:compressed"),
];

/// Theme names by wire id.
pub const THEMES: &[&str] = &["default", "light", "dark", "contrast", "sepia", "midnight"];

pub fn theme_id(name: &str) -> Option<u8> {
    THEMES.iter().position(|t| *t == name).map(|ix| ix as u8)
}

pub fn theme_name(id: u8) -> Option<&'static str> {
    THEMES.get(id as usize).copied()
}

static STANDARD: LazyLock<ClassRegistry> = LazyLock::new(ClassRegistry::new);

/// Maps class names to their default property sets.
#[derive(Debug, Clone)]
pub struct ClassRegistry {
    names: Vec<String>,
    defaults: HashMap<String, PropertySet>,
}

impl ClassRegistry {
    pub fn standard() -> &'static ClassRegistry {
        &STANDARD
    }

    /// A registry holding the built-in classes.
    pub fn new() -> Self {
        let mut registry = Self {
            names: Vec::new(),
            defaults: HashMap::new(),
        };
        let table = PropertyTable::standard();
        for (name, defaults) in STANDARD_CLASSES {
            match table.parse_set(defaults) {
                Ok(set) => registry.register(*name, set),
                Err(e) => log::error!("built-in class '{name}' has bad defaults: {e}"),
            }
        }
        registry
    }

    /// Add or replace a class.
    pub fn register(&mut self, name: impl Into<String>, defaults: PropertySet) {
        let name = name.into();
        if self.defaults.insert(name.clone(), defaults).is_none() {
            self.names.push(name);
        }
    }

    pub fn contains(&self, class_name: &str) -> bool {
        self.defaults.contains_key(class_name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }

    /// Defaults for the head segment of `class_path`, or the fallback's when
    /// the head is unknown.
    pub fn defaults_for(&self, class_path: &str) -> PropertySet {
        let head = class_path.split('.').next().unwrap_or(class_path);
        self.defaults
            .get(head)
            .or_else(|| self.defaults.get(FALLBACK_CLASS))
            .cloned()
            .unwrap_or_default()
    }
}

impl Default for ClassRegistry {
    fn default() -> Self {
        Self::new()
    }
}
