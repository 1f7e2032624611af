//! Byte-mode capacity of QR symbols, for sizing payloads before a symbol is
//! generated elsewhere.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorCorrection {
    /// About 7% recovery.
    L,
    /// About 15% recovery.
    #[default]
    M,
    /// About 25% recovery.
    Q,
    /// About 30% recovery.
    H,
}

impl ErrorCorrection {
    pub const ALL: [ErrorCorrection; 4] = [
        ErrorCorrection::L,
        ErrorCorrection::M,
        ErrorCorrection::Q,
        ErrorCorrection::H,
    ];

    fn column(self) -> usize {
        match self {
            ErrorCorrection::L => 0,
            ErrorCorrection::M => 1,
            ErrorCorrection::Q => 2,
            ErrorCorrection::H => 3,
        }
    }
}

impl fmt::Display for ErrorCorrection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let letter = match self {
            ErrorCorrection::L => "L",
            ErrorCorrection::M => "M",
            ErrorCorrection::Q => "Q",
            ErrorCorrection::H => "H",
        };
        f.write_str(letter)
    }
}

impl FromStr for ErrorCorrection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "L" => Ok(ErrorCorrection::L),
            "M" => Ok(ErrorCorrection::M),
            "Q" => Ok(ErrorCorrection::Q),
            "H" => Ok(ErrorCorrection::H),
            other => Err(format!("unknown error correction level '{other}'")),
        }
    }
}

/// Bytes per symbol version (1 to 40), columns L, M, Q, H.
const BYTE_CAPACITY: [[u16; 4]; 40] = [
    [17, 14, 11, 7],
    [32, 26, 20, 14],
    [53, 42, 32, 24],
    [78, 62, 46, 34],
    [106, 84, 60, 44],
    [134, 106, 74, 58],
    [154, 122, 86, 64],
    [192, 152, 108, 84],
    [230, 180, 130, 98],
    [271, 213, 151, 119],
    [321, 251, 177, 137],
    [367, 287, 203, 155],
    [425, 331, 241, 177],
    [458, 362, 258, 194],
    [520, 412, 292, 220],
    [586, 450, 322, 250],
    [644, 504, 364, 280],
    [718, 560, 394, 310],
    [792, 624, 442, 338],
    [858, 666, 482, 382],
    [929, 711, 509, 403],
    [1003, 779, 565, 439],
    [1091, 857, 611, 461],
    [1171, 911, 661, 511],
    [1273, 997, 715, 535],
    [1367, 1059, 751, 593],
    [1465, 1125, 805, 625],
    [1528, 1190, 868, 658],
    [1628, 1264, 908, 698],
    [1732, 1370, 982, 742],
    [1840, 1452, 1030, 790],
    [1952, 1538, 1112, 842],
    [2068, 1628, 1168, 898],
    [2188, 1722, 1228, 958],
    [2303, 1809, 1283, 983],
    [2431, 1911, 1351, 1051],
    [2563, 1989, 1423, 1093],
    [2699, 2099, 1499, 1139],
    [2809, 2213, 1579, 1219],
    [2953, 2331, 1663, 1273],
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymbolEstimate {
    pub level: ErrorCorrection,
    /// Smallest version (1 to 40) that holds the payload.
    pub version: u8,
    pub capacity: usize,
    /// Unused bytes left in that version.
    pub headroom: usize,
}

pub fn capacity(version: u8, level: ErrorCorrection) -> Option<usize> {
    let row = BYTE_CAPACITY.get((version as usize).checked_sub(1)?)?;
    Some(row[level.column()] as usize)
}

pub fn max_capacity(level: ErrorCorrection) -> usize {
    BYTE_CAPACITY[BYTE_CAPACITY.len() - 1][level.column()] as usize
}

/// The smallest symbol holding `len` bytes, or `None` if none can.
pub fn estimate(len: usize, level: ErrorCorrection) -> Option<SymbolEstimate> {
    BYTE_CAPACITY
        .iter()
        .enumerate()
        .map(|(ix, row)| (ix as u8 + 1, row[level.column()] as usize))
        .find(|(_, capacity)| *capacity >= len)
        .map(|(version, capacity)| SymbolEstimate {
            level,
            version,
            capacity,
            headroom: capacity - len,
        })
}

/// Length of `len` bytes as unpadded base64url text.
pub fn base64url_len(len: usize) -> usize {
    base64::encoded_len(len, false).unwrap_or(usize::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_capacity_grows_with_version_and_shrinks_with_level() {
        for level in ErrorCorrection::ALL {
            assert!(BYTE_CAPACITY.windows(2).all(|w| w[0][level.column()] < w[1][level.column()]));
        }
        for row in BYTE_CAPACITY {
            assert!(row.windows(2).all(|w| w[0] > w[1]));
        }
        assert_eq!(capacity(1, ErrorCorrection::M), Some(14));
        assert_eq!(capacity(0, ErrorCorrection::M), None);
        assert_eq!(capacity(41, ErrorCorrection::M), None);
        assert_eq!(max_capacity(ErrorCorrection::L), 2953);
    }

    #[test]
    fn test_estimate_picks_smallest_version() {
        assert_eq!(
            estimate(14, ErrorCorrection::M),
            Some(SymbolEstimate {
                level: ErrorCorrection::M,
                version: 1,
                capacity: 14,
                headroom: 0
            })
        );
        let estimate_15 = estimate(15, ErrorCorrection::M).unwrap();
        assert_eq!((estimate_15.version, estimate_15.headroom), (2, 11));
        assert_eq!(estimate(0, ErrorCorrection::H).unwrap().version, 1);
        assert_eq!(estimate(1274, ErrorCorrection::H), None);
        assert_eq!(estimate(2953, ErrorCorrection::L).unwrap().version, 40);
    }

    #[test]
    fn test_level_parsing_and_base64_length() {
        assert_eq!("q".parse::<ErrorCorrection>(), Ok(ErrorCorrection::Q));
        assert!("Z".parse::<ErrorCorrection>().is_err());
        assert_eq!(ErrorCorrection::default().to_string(), "M");
        assert_eq!(base64url_len(0), 0);
        assert_eq!(base64url_len(3), 4);
        assert_eq!(base64url_len(4), 6);
    }
}
