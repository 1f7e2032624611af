use serde::{Deserialize, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;

use crate::error::PropertyError;
use crate::table::{Axis, PropertyTable, PropertyValue};

/// The integer encoding of a property set.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct PrimeProduct(pub u128);

impl PrimeProduct {
    /// The product of no primes.
    pub const EMPTY: PrimeProduct = PrimeProduct(1);

    pub fn get(self) -> u128 {
        self.0
    }
}

impl fmt::Display for PrimeProduct {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for PrimeProduct {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse().map(PrimeProduct)
    }
}

/// At most one value per axis, ordered by axis.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Deserialize)]
#[serde(try_from = "BTreeMap<Axis, String>")]
pub struct PropertySet {
    values: BTreeMap<Axis, &'static str>,
}

impl PropertySet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn get(&self, axis: Axis) -> Option<&'static str> {
        self.values.get(&axis).copied()
    }

    pub fn contains(&self, axis: Axis) -> bool {
        self.values.contains_key(&axis)
    }

    /// Set the value for its axis, returning the value it replaced.
    pub fn insert(&mut self, value: &'static PropertyValue) -> Option<&'static str> {
        self.values.insert(value.axis, value.name)
    }

    /// Set the value for its axis, failing if the axis already holds one.
    pub fn try_insert(&mut self, value: &'static PropertyValue) -> Result<(), PropertyError> {
        if let Some(existing) = self.values.get(&value.axis) {
            return Err(PropertyError::AxisConflict {
                axis: value.axis,
                first: existing.to_string(),
                second: value.name.to_string(),
            });
        }
        self.values.insert(value.axis, value.name);
        Ok(())
    }

    pub fn remove(&mut self, axis: Axis) -> Option<&'static str> {
        self.values.remove(&axis)
    }

    pub fn iter(&self) -> impl Iterator<Item = (Axis, &'static str)> + '_ {
        self.values.iter().map(|(axis, name)| (*axis, *name))
    }

    /// A copy of `self` with every axis set in `other` taking `other`'s value.
    pub fn overlay(&self, other: &PropertySet) -> PropertySet {
        let mut values = self.values.clone();
        values.extend(other.values.iter().map(|(axis, name)| (*axis, *name)));
        PropertySet { values }
    }

    /// Numeric reading of the mass axis, if set.
    pub fn mass(&self) -> Option<f32> {
        self.get(Axis::Mass).and_then(|m| m.parse().ok())
    }
}

impl Serialize for PropertySet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.values.serialize(serializer)
    }
}

impl TryFrom<BTreeMap<Axis, String>> for PropertySet {
    type Error = PropertyError;

    fn try_from(raw: BTreeMap<Axis, String>) -> Result<Self, Self::Error> {
        let table = PropertyTable::standard();
        let mut set = PropertySet::new();
        for (axis, name) in raw {
            let value = table
                .lookup(axis, &name)
                .ok_or(PropertyError::UnknownValue { axis, value: name })?;
            set.insert(value);
        }
        Ok(set)
    }
}

impl fmt::Display for PropertySet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (ix, (axis, name)) in self.iter().enumerate() {
            if ix > 0 {
                f.write_str(",")?;
            }
            write!(f, "{axis}:{name}")?;
        }
        Ok(())
    }
}

impl std::str::FromStr for PropertySet {
    type Err = PropertyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PropertyTable::standard().parse_set(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn value(axis: Axis, name: &str) -> &'static PropertyValue {
        PropertyTable::standard().lookup(axis, name).unwrap()
    }

    #[test]
    fn test_insert_replaces_try_insert_refuses() {
        let mut set = PropertySet::new();
        assert_eq!(set.insert(value(Axis::Density, "gas")), None);
        assert_eq!(set.insert(value(Axis::Density, "solid")), Some("gas"));
        assert!(set.try_insert(value(Axis::Density, "void")).is_err());
        assert_eq!(set.get(Axis::Density), Some("solid"));
    }

    #[test]
    fn test_overlay_prefers_other() {
        let base: PropertySet = "density:solid,role:card,mass:1.0".parse().unwrap();
        let overrides: PropertySet = "mass:4.0,focus:first".parse().unwrap();
        let merged = base.overlay(&overrides);
        assert_eq!(merged.to_string(), "density:solid,mass:4.0,role:card,focus:first");
        assert_eq!(merged.mass(), Some(4.0));
    }

    #[test]
    fn test_serde_roundtrip_and_validation() {
        let set: PropertySet = "temperature:cool,signal:broadcast".parse().unwrap();
        let json = serde_json::to_string(&set).unwrap();
        assert_eq!(json, r#"{"temperature":"cool","signal":"broadcast"}"#);
        let back: PropertySet = serde_json::from_str(&json).unwrap();
        assert_eq!(back, set);

        assert!(serde_json::from_str::<PropertySet>(r#"{"density":"lead"}"#).is_err());
    }

    #[test]
    fn test_prime_product_parse() {
        assert_eq!("12901".parse::<PrimeProduct>().unwrap(), PrimeProduct(12901));
        assert!("-3".parse::<PrimeProduct>().is_err());
        assert_eq!(PrimeProduct::EMPTY.to_string(), "1");
    }
}
