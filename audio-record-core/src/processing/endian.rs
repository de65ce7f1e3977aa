/// Byte order of the samples a source delivers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ByteOrder {
    Little,
    Big,
}

impl ByteOrder {
    /// Byte order of the host platform.
    pub const fn native() -> Self {
        if cfg!(target_endian = "little") {
            Self::Little
        } else {
            Self::Big
        }
    }
}

/// Rewrite 16-bit samples in place so they are little-endian.
///
/// No-op when `source_order` is already little-endian. Only whole two-byte
/// samples are touched; a trailing odd byte is left as is.
pub fn normalize_to_little_endian(bytes: &mut [u8], source_order: ByteOrder) {
    if source_order == ByteOrder::Little {
        return;
    }
    for sample in bytes.chunks_exact_mut(2) {
        sample.swap(0, 1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn little_endian_source_is_untouched() {
        let original = vec![0x01, 0x02, 0x03, 0x04];
        let mut bytes = original.clone();
        normalize_to_little_endian(&mut bytes, ByteOrder::Little);
        normalize_to_little_endian(&mut bytes, ByteOrder::Little);
        assert_eq!(bytes, original);
    }

    #[test]
    fn big_endian_source_swaps_pairs() {
        let mut bytes = 1000i16.to_be_bytes().to_vec();
        bytes.extend_from_slice(&(-2i16).to_be_bytes());

        normalize_to_little_endian(&mut bytes, ByteOrder::Big);

        assert_eq!(i16::from_le_bytes([bytes[0], bytes[1]]), 1000);
        assert_eq!(i16::from_le_bytes([bytes[2], bytes[3]]), -2);
    }

    #[test]
    fn big_endian_swap_is_its_own_inverse() {
        let original: Vec<u8> = (0u8..64).collect();
        let mut bytes = original.clone();
        normalize_to_little_endian(&mut bytes, ByteOrder::Big);
        assert_ne!(bytes, original);
        normalize_to_little_endian(&mut bytes, ByteOrder::Big);
        assert_eq!(bytes, original);
    }

    #[test]
    fn trailing_odd_byte_is_left_alone() {
        let mut bytes = vec![0xAA, 0xBB, 0xCC];
        normalize_to_little_endian(&mut bytes, ByteOrder::Big);
        assert_eq!(bytes, vec![0xBB, 0xAA, 0xCC]);
    }

    #[test]
    fn native_matches_target() {
        let expected = if cfg!(target_endian = "little") {
            ByteOrder::Little
        } else {
            ByteOrder::Big
        };
        assert_eq!(ByteOrder::native(), expected);
    }
}
