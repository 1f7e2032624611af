//! Variable-length integers.
//!
//! Counts, lengths and local indices use a 1-2 byte varint:
//!
//! - `0..=127`:      1 byte  `0xxxxxxx`
//! - `128..=32767`:  2 bytes `1xxxxxxx xxxxxxxx` (high seven bits first)
//!
//! Override products use unsigned LEB128, which fits any `u128`.

pub const VARINT_MAX: u16 = 0x7FFF;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VarintError {
    /// The buffer ended inside the value; `needed` bytes were required.
    Truncated { needed: usize },
    /// The value does not fit its target type.
    Overflow,
}

/// Append `value` as a 1-2 byte varint. Returns `None` above [`VARINT_MAX`].
pub fn write_varint(out: &mut Vec<u8>, value: usize) -> Option<()> {
    match value {
        0..=0x7F => out.push(value as u8),
        0x80..=0x7FFF => {
            out.push(((value >> 8) as u8) | 0x80);
            out.push(value as u8);
        }
        _ => return None,
    }
    Some(())
}

/// Read a 1-2 byte varint, returning the value and bytes consumed.
pub fn read_varint(bytes: &[u8]) -> Result<(u16, usize), VarintError> {
    let Some(&first) = bytes.first() else {
        return Err(VarintError::Truncated { needed: 1 });
    };
    if first & 0x80 == 0 {
        return Ok((first as u16, 1));
    }
    let Some(&second) = bytes.get(1) else {
        return Err(VarintError::Truncated { needed: 2 });
    };
    Ok(((((first & 0x7F) as u16) << 8) | second as u16, 2))
}

pub fn write_leb128(out: &mut Vec<u8>, mut value: u128) {
    loop {
        let byte = (value & 0x7F) as u8;
        value >>= 7;
        if value == 0 {
            out.push(byte);
            return;
        }
        out.push(byte | 0x80);
    }
}

pub fn read_leb128(bytes: &[u8]) -> Result<(u128, usize), VarintError> {
    let mut value = 0u128;
    for (ix, &byte) in bytes.iter().enumerate() {
        let shift = ix as u32 * 7;
        let low = (byte & 0x7F) as u128;
        if shift >= 128 || (shift > 121 && low >> (128 - shift) != 0) {
            return Err(VarintError::Overflow);
        }
        value |= low << shift;
        if byte & 0x80 == 0 {
            return Ok((value, ix + 1));
        }
    }
    Err(VarintError::Truncated {
        needed: bytes.len() + 1,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn varint(value: usize) -> Vec<u8> {
        let mut out = Vec::new();
        write_varint(&mut out, value).unwrap();
        out
    }

    #[test]
    fn test_encode_single_byte() {
        assert_eq!(varint(0), vec![0x00]);
        assert_eq!(varint(42), vec![0x2A]);
        assert_eq!(varint(127), vec![0x7F]);
    }

    #[test]
    fn test_encode_two_bytes() {
        assert_eq!(varint(128), vec![0x80, 0x80]);
        assert_eq!(varint(256), vec![0x81, 0x00]);
        assert_eq!(varint(1000), vec![0x83, 0xE8]);
        assert_eq!(varint(32767), vec![0xFF, 0xFF]);
        assert_eq!(write_varint(&mut Vec::new(), 32768), None);
    }

    #[test]
    fn test_decode_all_values() {
        for value in 0..=VARINT_MAX as usize {
            let bytes = varint(value);
            assert_eq!(read_varint(&bytes), Ok((value as u16, bytes.len())));
        }
    }

    #[test]
    fn test_decode_truncated() {
        assert_eq!(read_varint(&[]), Err(VarintError::Truncated { needed: 1 }));
        assert_eq!(read_varint(&[0x81]), Err(VarintError::Truncated { needed: 2 }));
    }

    #[test]
    fn test_leb128() {
        for value in [0u128, 1, 127, 128, 12901, u64::MAX as u128, u128::MAX] {
            let mut out = Vec::new();
            write_leb128(&mut out, value);
            assert_eq!(read_leb128(&out), Ok((value, out.len())));
        }

        let mut out = Vec::new();
        write_leb128(&mut out, 12901);
        assert_eq!(out, vec![0xE5, 0x64]);
        assert_eq!(
            read_leb128(&out[..1]),
            Err(VarintError::Truncated { needed: 2 })
        );

        // Nineteen continuation bytes overflow a u128.
        let too_long = [0xFF; 20];
        assert_eq!(read_leb128(&too_long), Err(VarintError::Overflow));
    }
}
