//! Prime-factorization property encoding.
//!
//! Every semantic property value a node can carry is bound to a distinct prime,
//! and the primes are partitioned into disjoint axes. A node's property set is
//! encoded as the product of its primes, which is commutative and compact, and
//! decoded again by trial division over the ascending prime list.
//!
//! ```text
//! {density: solid, temperature: warm, mass: 1.0}  →  7 × 19 × 97 = 12901
//! ```

mod error;
mod factorize;
mod property_set;
mod table;

pub use error::PropertyError;
pub use factorize::{Factorization, factorize, is_prime};
pub use property_set::{PrimeProduct, PropertySet};
pub use table::{Axis, PropertyTable, PropertyValue, STANDARD_VALUES};

/// Encode a property set against the standard table.
pub fn encode(set: &PropertySet) -> PrimeProduct {
    PropertyTable::standard().encode(set)
}

/// Decode a prime product against the standard table.
pub fn decode(product: PrimeProduct) -> Result<PropertySet, PropertyError> {
    PropertyTable::standard().decode(product)
}
