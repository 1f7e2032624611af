//! The property table: one declarative list of (axis, value, prime) rows from
//! which both lookup directions are built.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::LazyLock;

use crate::error::PropertyError;
use crate::factorize::{factorize, is_prime};
use crate::property_set::{PrimeProduct, PropertySet};

/// A category of mutually exclusive property values.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Axis {
    /// Surface fill: background, border and corner radius.
    Density,
    /// Color warmth of the surface tint.
    Temperature,
    /// Spacing between and around children.
    Charge,
    /// Transition timing.
    Friction,
    /// Flex grow and shrink.
    Pressure,
    /// Stacking order.
    Buoyancy,
    /// Elevation.
    Mass,
    /// Declared structural role.
    Role,
    /// What the node does when touched.
    Interaction,
    /// Where the node's events are delivered.
    Signal,
    /// Position in keyboard/navigation order.
    Focus,
}

impl Axis {
    pub const ALL: [Axis; 11] = [
        Axis::Density,
        Axis::Temperature,
        Axis::Charge,
        Axis::Friction,
        Axis::Pressure,
        Axis::Buoyancy,
        Axis::Mass,
        Axis::Role,
        Axis::Interaction,
        Axis::Signal,
        Axis::Focus,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Axis::Density => "density",
            Axis::Temperature => "temperature",
            Axis::Charge => "charge",
            Axis::Friction => "friction",
            Axis::Pressure => "pressure",
            Axis::Buoyancy => "buoyancy",
            Axis::Mass => "mass",
            Axis::Role => "role",
            Axis::Interaction => "interaction",
            Axis::Signal => "signal",
            Axis::Focus => "focus",
        }
    }

    pub fn from_name(name: &str) -> Option<Axis> {
        Axis::ALL.iter().copied().find(|axis| axis.name() == name)
    }
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One row of the property table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PropertyValue {
    pub axis: Axis,
    pub name: &'static str,
    pub prime: u32,
}

const fn row(axis: Axis, name: &'static str, prime: u32) -> PropertyValue {
    PropertyValue { axis, name, prime }
}

/// The standard table. Primes are consecutive from 2 so that trial division
/// over the list is a complete factorization for every encodable product.
pub const STANDARD_VALUES: &[PropertyValue] = &[
    row(Axis::Density, "void", 2),
    row(Axis::Density, "gas", 3),
    row(Axis::Density, "liquid", 5),
    row(Axis::Density, "solid", 7),
    row(Axis::Density, "crystal", 11),
    row(Axis::Temperature, "cold", 13),
    row(Axis::Temperature, "cool", 17),
    row(Axis::Temperature, "warm", 19),
    row(Axis::Temperature, "hot", 23),
    row(Axis::Charge, "repel", 29),
    row(Axis::Charge, "neutral", 31),
    row(Axis::Charge, "attract", 37),
    row(Axis::Friction, "frictionless", 41),
    row(Axis::Friction, "smooth", 43),
    row(Axis::Friction, "grippy", 47),
    row(Axis::Friction, "rigid", 53),
    row(Axis::Pressure, "vacuum", 59),
    row(Axis::Pressure, "ambient", 61),
    row(Axis::Pressure, "compressed", 67),
    row(Axis::Buoyancy, "sinking", 71),
    row(Axis::Buoyancy, "level", 73),
    row(Axis::Buoyancy, "floating", 79),
    row(Axis::Mass, "0.25", 83),
    row(Axis::Mass, "0.5", 89),
    row(Axis::Mass, "1.0", 97),
    row(Axis::Mass, "2.0", 101),
    row(Axis::Mass, "4.0", 103),
    row(Axis::Role, "page-header", 107),
    row(Axis::Role, "hero", 109),
    row(Axis::Role, "list", 113),
    row(Axis::Role, "card", 127),
    row(Axis::Role, "nav", 131),
    row(Axis::Role, "footer", 137),
    row(Axis::Role, "button", 139),
    row(Axis::Role, "form", 149),
    row(Axis::Role, "grid", 151),
    row(Axis::Role, "modal", 157),
    row(Axis::Role, "field", 163),
    row(Axis::Role, "media", 167),
    row(Axis::Interaction, "tap", 173),
    row(Axis::Interaction, "hold", 179),
    row(Axis::Interaction, "swipe", 181),
    row(Axis::Interaction, "submit", 191),
    row(Axis::Interaction, "toggle", 193),
    row(Axis::Signal, "local", 197),
    row(Axis::Signal, "parent", 199),
    row(Axis::Signal, "owner", 211),
    row(Axis::Signal, "broadcast", 223),
    row(Axis::Focus, "skip", 227),
    row(Axis::Focus, "first", 229),
    row(Axis::Focus, "early", 233),
    row(Axis::Focus, "normal", 239),
    row(Axis::Focus, "late", 241),
];

static STANDARD: LazyLock<PropertyTable> = LazyLock::new(|| {
    log::debug!(
        "building standard property table ({} values)",
        STANDARD_VALUES.len()
    );
    PropertyTable::build(STANDARD_VALUES)
});

/// Bidirectional lookup between property values and primes.
#[derive(Debug)]
pub struct PropertyTable {
    values: &'static [PropertyValue],
    /// Ascending list of every prime in the table.
    primes: Vec<u32>,
    by_prime: HashMap<u32, usize>,
    by_name: HashMap<Axis, HashMap<&'static str, usize>>,
}

impl PropertyTable {
    /// The built-in table, built once on first use.
    pub fn standard() -> &'static PropertyTable {
        &STANDARD
    }

    /// Build a table from rows, checking that every prime is prime, used once,
    /// and that no (axis, name) pair repeats.
    pub fn from_values(values: &'static [PropertyValue]) -> Result<Self, PropertyError> {
        let mut seen_primes: HashMap<u32, &PropertyValue> = HashMap::new();
        let mut seen_names: HashSet<(Axis, &str)> = HashSet::new();
        for value in values {
            if !is_prime(value.prime) {
                return Err(PropertyError::InvalidTable(format!(
                    "{}:{} is bound to non-prime {}",
                    value.axis, value.name, value.prime
                )));
            }
            if let Some(previous) = seen_primes.insert(value.prime, value) {
                return Err(PropertyError::InvalidTable(format!(
                    "prime {} bound to both {}:{} and {}:{}",
                    value.prime, previous.axis, previous.name, value.axis, value.name
                )));
            }
            if !seen_names.insert((value.axis, value.name)) {
                return Err(PropertyError::InvalidTable(format!(
                    "{}:{} declared twice",
                    value.axis, value.name
                )));
            }
        }
        Ok(Self::build(values))
    }

    fn build(values: &'static [PropertyValue]) -> Self {
        let mut primes: Vec<u32> = values.iter().map(|v| v.prime).collect();
        primes.sort_unstable();
        let by_prime = values
            .iter()
            .enumerate()
            .map(|(ix, v)| (v.prime, ix))
            .collect();
        let mut by_name: HashMap<Axis, HashMap<&'static str, usize>> = HashMap::new();
        for (ix, v) in values.iter().enumerate() {
            by_name.entry(v.axis).or_default().insert(v.name, ix);
        }
        Self {
            values,
            primes,
            by_prime,
            by_name,
        }
    }

    pub fn values(&self) -> &'static [PropertyValue] {
        self.values
    }

    /// Every prime in the table, ascending.
    pub fn primes(&self) -> &[u32] {
        &self.primes
    }

    pub fn values_for(&self, axis: Axis) -> impl Iterator<Item = &'static PropertyValue> + '_ {
        self.values.iter().filter(move |v| v.axis == axis)
    }

    pub fn lookup(&self, axis: Axis, name: &str) -> Option<&'static PropertyValue> {
        let ix = *self.by_name.get(&axis)?.get(name)?;
        Some(&self.values[ix])
    }

    /// Resolve textual `axis` and `value` names, as written in source overrides.
    pub fn lookup_named(
        &self,
        axis: &str,
        value: &str,
    ) -> Result<&'static PropertyValue, PropertyError> {
        let axis =
            Axis::from_name(axis).ok_or_else(|| PropertyError::UnknownAxis(axis.to_string()))?;
        self.lookup(axis, value)
            .ok_or_else(|| PropertyError::UnknownValue {
                axis,
                value: value.to_string(),
            })
    }

    pub fn by_prime(&self, prime: u32) -> Option<&'static PropertyValue> {
        self.by_prime.get(&prime).map(|&ix| &self.values[ix])
    }

    /// Multiply the primes of every value present in `set`. Absent axes
    /// contribute a factor of 1, so the empty set encodes to 1.
    pub fn encode(&self, set: &PropertySet) -> PrimeProduct {
        let product = set
            .iter()
            .filter_map(|(axis, name)| self.lookup(axis, name))
            .fold(1u128, |product, value| product * value.prime as u128);
        PrimeProduct(product)
    }

    /// Encode `(axis, value)` pairs supplied in any order, rejecting a second
    /// value for an axis that is already set.
    pub fn encode_pairs<'a>(
        &self,
        pairs: impl IntoIterator<Item = (&'a str, &'a str)>,
    ) -> Result<PrimeProduct, PropertyError> {
        let mut set = PropertySet::new();
        for (axis, name) in pairs {
            set.try_insert(self.lookup_named(axis, name)?)?;
        }
        Ok(self.encode(&set))
    }

    /// Recover the property set from a product.
    ///
    /// Products of 0 or 1 decode to the empty set. A product that repeats a
    /// prime, combines two primes of one axis, or carries a factor outside the
    /// table is rejected rather than guessed at.
    pub fn decode(&self, product: PrimeProduct) -> Result<PropertySet, PropertyError> {
        let mut set = PropertySet::new();
        if product.0 <= 1 {
            return Ok(set);
        }

        let factorization = factorize(product.0, &self.primes);
        if !factorization.is_complete() {
            return Err(PropertyError::UnknownFactor {
                product: product.0,
                residual: factorization.residual,
            });
        }

        for (prime, multiplicity) in factorization.factors {
            if multiplicity > 1 {
                return Err(PropertyError::RepeatedFactor {
                    prime,
                    multiplicity,
                });
            }
            let Some(value) = self.by_prime(prime) else {
                return Err(PropertyError::UnknownFactor {
                    product: product.0,
                    residual: prime as u128,
                });
            };
            set.try_insert(value)?;
        }
        Ok(set)
    }

    /// Parse the textual form `axis:value,axis:value`.
    pub fn parse_set(&self, text: &str) -> Result<PropertySet, PropertyError> {
        let mut set = PropertySet::new();
        for entry in text.split(',').map(str::trim).filter(|e| !e.is_empty()) {
            let (axis, value) = entry
                .split_once(':')
                .ok_or_else(|| PropertyError::Malformed(entry.to_string()))?;
            set.try_insert(self.lookup_named(axis.trim(), value.trim())?)?;
        }
        Ok(set)
    }
}


#[cfg(test)]
mod property_tests {
    use super::*;
    use proptest::prelude::*;
    use proptest::sample::Index;

    /// Any partial set: each axis is unset or holds one of its values.
    fn property_set() -> impl Strategy<Value = PropertySet> {
        proptest::collection::vec(proptest::option::of(any::<Index>()), Axis::ALL.len())
            .prop_map(|picks| {
                let table = PropertyTable::standard();
                let mut set = PropertySet::new();
                for (axis, pick) in Axis::ALL.into_iter().zip(picks) {
                    let values: Vec<_> = table.values_for(axis).collect();
                    if let Some(pick) = pick {
                        set.insert(values[pick.index(values.len())]);
                    }
                }
                set
            })
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(500))]

        /// Decoding an encoded set gives the same set back.
        #[test]
        fn prop_decode_inverts_encode(set in property_set()) {
            let table = PropertyTable::standard();
            let product = table.encode(&set);
            prop_assert_eq!(table.decode(product).unwrap(), set);
        }

        /// The product does not depend on the order values are given in.
        #[test]
        fn prop_encoding_is_order_independent(
            pairs in property_set()
                .prop_map(|set| {
                    set.iter()
                        .map(|(axis, name)| (axis.name(), name))
                        .collect::<Vec<_>>()
                })
                .prop_shuffle()
        ) {
            let table = PropertyTable::standard();
            let mut sorted = pairs.clone();
            sorted.sort();
            prop_assert_eq!(
                table.encode_pairs(pairs.iter().copied()).unwrap(),
                table.encode_pairs(sorted.iter().copied()).unwrap()
            );
        }

        /// Multiplying any table prime in twice is always rejected.
        #[test]
        fn prop_repeated_prime_is_rejected(set in property_set(), pick in any::<Index>()) {
            let table = PropertyTable::standard();
            let product = table.encode(&set);
            let prime = table.primes()[pick.index(table.primes().len())] as u128;
            let doubled = PrimeProduct(product.get() * prime * prime);
            let is_repeated = matches!(
                table.decode(doubled),
                Err(PropertyError::RepeatedFactor { .. })
            );
            prop_assert!(is_repeated);
        }
    }
}
