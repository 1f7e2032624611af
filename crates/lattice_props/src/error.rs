use thiserror::Error;

use crate::table::Axis;

/// Contract violations in property encoding and decoding.
///
/// Every violation is rejected; nothing is clamped. Encoding refuses a second
/// value for an occupied axis, and decoding refuses any product that could not
/// have come out of the encoder.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PropertyError {
    #[error("unknown axis: {0}")]
    UnknownAxis(String),

    #[error("unknown value '{value}' for axis {axis}")]
    UnknownValue { axis: Axis, value: String },

    #[error("axis {axis} given two values: '{first}' and '{second}'")]
    AxisConflict {
        axis: Axis,
        first: String,
        second: String,
    },

    #[error("prime {prime} appears {multiplicity} times in product")]
    RepeatedFactor { prime: u32, multiplicity: u32 },

    #[error("product {product} has factor {residual} outside the property table")]
    UnknownFactor { product: u128, residual: u128 },

    #[error("malformed property list: {0}")]
    Malformed(String),

    #[error("invalid property table: {0}")]
    InvalidTable(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_messages_are_lowercase_fragments() {
        let errors = [
            PropertyError::UnknownAxis("colour".into()),
            PropertyError::UnknownValue {
                axis: Axis::Density,
                value: "lead".into(),
            },
            PropertyError::AxisConflict {
                axis: Axis::Density,
                first: "gas".into(),
                second: "solid".into(),
            },
            PropertyError::RepeatedFactor {
                prime: 7,
                multiplicity: 2,
            },
            PropertyError::UnknownFactor {
                product: 1757,
                residual: 251,
            },
            PropertyError::Malformed("density".into()),
            PropertyError::InvalidTable("empty".into()),
        ];
        for error in errors {
            let message = error.to_string();
            assert!(message.starts_with(|c: char| c.is_ascii_lowercase()), "{message}");
        }
        assert_eq!(
            PropertyError::RepeatedFactor {
                prime: 7,
                multiplicity: 2
            }
            .to_string(),
            "prime 7 appears 2 times in product"
        );
    }
}
