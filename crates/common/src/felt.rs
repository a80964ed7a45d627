use std::borrow::Cow;
use std::error::Error;

/// The Starknet field element.
///
/// Forms the basic building block of most Starknet interactions: addresses,
/// class hashes, selectors and calldata are all [Felt]s.
#[derive(Clone, Copy, PartialEq, Hash, Eq, PartialOrd, Ord)]
pub struct Felt([u8; 32]);

/// The field modulus `2^251 + 17 * 2^192 + 1` in big-endian.
const MODULUS: [u8; 32] = [
    0x08, 0, 0, 0, 0, 0, 0, 0x11, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0,
    0, 0x01,
];

impl std::fmt::Debug for Felt {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Felt({self})")
    }
}

impl std::fmt::Display for Felt {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Zero-padded to the full width.
        write!(f, "0x{self:x}")
    }
}

impl std::fmt::LowerHex for Felt {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.iter().try_for_each(|&b| write!(f, "{b:02x}"))
    }
}

impl Default for Felt {
    fn default() -> Self {
        Felt::ZERO
    }
}

/// Error returned by [Felt::from_be_bytes] indicating that
/// the maximum field value was exceeded.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct OverflowError;

impl Error for OverflowError {}

const OVERFLOW_MSG: &str = "The field element maximum value was exceeded.";

impl std::fmt::Display for OverflowError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(OVERFLOW_MSG)
    }
}

impl Felt {
    pub const ZERO: Felt = Felt([0u8; 32]);

    /// Returns the big-endian representation of this [Felt].
    pub const fn to_be_bytes(self) -> [u8; 32] {
        self.0
    }

    /// Big-endian representation of this [Felt].
    pub const fn as_be_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Convenience function which extends [Felt::from_be_bytes] to work with
    /// slices.
    pub const fn from_be_slice(bytes: &[u8]) -> Result<Self, OverflowError> {
        if bytes.len() > 32 {
            return Err(OverflowError);
        }

        let mut buf = [0u8; 32];
        let mut index = 0;

        while index < bytes.len() {
            buf[32 - bytes.len() + index] = bytes[index];
            index += 1;
        }

        Felt::from_be_bytes(buf)
    }

    /// Creates a [Felt] from big-endian bytes.
    ///
    /// Returns [OverflowError] if not less than the field modulus.
    pub const fn from_be_bytes(bytes: [u8; 32]) -> Result<Self, OverflowError> {
        let mut index = 0;
        while index < 32 {
            if bytes[index] < MODULUS[index] {
                return Ok(Felt(bytes));
            }
            if bytes[index] > MODULUS[index] {
                return Err(OverflowError);
            }
            index += 1;
        }

        // Equal to the modulus.
        Err(OverflowError)
    }

    /// Clears the top 6 bits of `bytes`, which always leaves a value below
    /// the field modulus.
    pub const fn from_masked_be_bytes(mut bytes: [u8; 32]) -> Self {
        bytes[0] &= 0x03;
        Felt(bytes)
    }

    pub const fn from_u64(u: u64) -> Self {
        match Self::from_be_slice(&u.to_be_bytes()) {
            Ok(x) => x,
            Err(_) => panic!("64 bits is less than 251 bits"),
        }
    }

    /// Parses a decimal numeral into a [Felt].
    ///
    /// Only ASCII digits are accepted; signs, whitespace and an empty string
    /// are rejected.
    pub fn from_decimal_str(s: &str) -> Result<Self, DecimalParseError> {
        if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
            return Err(DecimalParseError::InvalidDigit);
        }

        let value = num_bigint::BigUint::parse_bytes(s.as_bytes(), 10)
            .ok_or(DecimalParseError::InvalidDigit)?;

        Felt::from_be_slice(&value.to_bytes_be()).map_err(|_| DecimalParseError::Overflow)
    }
}

impl From<u64> for Felt {
    fn from(value: u64) -> Self {
        Self::from_u64(value)
    }
}

impl Felt {
    /// Parses up to 64 hex digits of either case, optionally prefixed by
    /// "0x". Usable in const contexts, see [felt!](crate::felt!).
    pub const fn from_hex_str(hex_str: &str) -> Result<Self, HexParseError> {
        const fn nibble(digit: u8) -> Result<u8, HexParseError> {
            match digit {
                b'0'..=b'9' => Ok(digit - b'0'),
                b'a'..=b'f' => Ok(digit - b'a' + 10),
                b'A'..=b'F' => Ok(digit - b'A' + 10),
                other => Err(HexParseError::InvalidNibble(other)),
            }
        }

        let bytes = hex_str.as_bytes();
        let first = match bytes {
            [b'0', b'x', ..] => 2,
            _ => 0,
        };

        let digits = bytes.len() - first;
        if digits > 64 {
            return Err(HexParseError::InvalidLength {
                max: 64,
                actual: digits,
            });
        }

        // Fill from the least significant nibble upwards.
        let mut buf = [0u8; 32];
        let mut i = 0;
        while i < digits {
            let value = match nibble(bytes[bytes.len() - 1 - i]) {
                Ok(value) => value,
                Err(e) => return Err(e),
            };
            let shift = if i % 2 == 0 { 0 } else { 4 };
            buf[31 - i / 2] |= value << shift;
            i += 1;
        }

        match Felt::from_be_bytes(buf) {
            Ok(felt) => Ok(felt),
            Err(OverflowError) => Err(HexParseError::Overflow),
        }
    }

    /// Number of significant hex digits, with zero having a single digit.
    fn significant_digits(&self) -> usize {
        let skipped = self.0.iter().take_while(|&&b| b == 0).count();
        match self.0.get(skipped) {
            None => 1,
            Some(first) if *first < 0x10 => (32 - skipped) * 2 - 1,
            Some(_) => (32 - skipped) * 2,
        }
    }

    /// "0x" followed by the hex digits without leading zeros.
    pub fn to_hex_str(&self) -> Cow<'static, str> {
        let padded = format!("{self:x}");
        let minimal = &padded[64 - self.significant_digits()..];
        Cow::Owned(format!("0x{minimal}"))
    }
}

#[derive(Debug, PartialEq, Eq)]
pub enum HexParseError {
    InvalidNibble(u8),
    InvalidLength { max: usize, actual: usize },
    Overflow,
}

impl Error for HexParseError {}

impl From<OverflowError> for HexParseError {
    fn from(_: OverflowError) -> Self {
        Self::Overflow
    }
}

impl std::fmt::Display for HexParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidNibble(n) => write!(f, "Invalid hex digit {:?}", char::from(*n)),
            Self::InvalidLength { max, actual } => {
                write!(f, "Expected at most {max} hex digits, got {actual}")
            }
            Self::Overflow => f.write_str(OVERFLOW_MSG),
        }
    }
}

#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum DecimalParseError {
    #[error("Not a decimal numeral")]
    InvalidDigit,
    #[error("{}", OVERFLOW_MSG)]
    Overflow,
}

impl serde::Serialize for Felt {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_hex_str())
    }
}

impl<'de> serde::Deserialize<'de> for Felt {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        struct FeltVisitor;

        impl serde::de::Visitor<'_> for FeltVisitor {
            type Value = Felt;

            fn expecting(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                formatter.write_str("a hex string of up to 64 digits with an optional '0x' prefix")
            }

            fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                Felt::from_hex_str(v).map_err(E::custom)
            }
        }

        deserializer.deserialize_str(FeltVisitor)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions_sorted::assert_eq;

    use super::*;

    #[test]
    fn bytes_round_trip() {
        let original = [
            0x00, 0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08, 0x09, 0x0A, 0x0B, 0x0C, 0x0D,
            0x0E, 0x0F, 0x10, 0x11, 0x12, 0x13, 0x14, 0x15, 0x16, 0x17, 0x18, 0x19, 0x1A, 0x1B,
            0x1C, 0x1D, 0x1E, 0x1F,
        ];
        let felt = Felt::from_be_bytes(original).unwrap();
        assert_eq!(felt.to_be_bytes(), original);
    }

    #[test]
    fn from_bytes_overflow() {
        assert_eq!(Felt::from_be_bytes(MODULUS), Err(OverflowError));

        let mut max_val = MODULUS;
        max_val[31] -= 1;
        Felt::from_be_bytes(max_val).unwrap();

        let mut above = MODULUS;
        above[0] = 0x09;
        above[31] = 0x00;
        assert_eq!(Felt::from_be_bytes(above), Err(OverflowError));
    }

    mod from_be_slice {
        use pretty_assertions_sorted::assert_eq;

        use super::*;

        #[test]
        fn too_long() {
            let mut bytes = Felt::from_u64(0xabcdef).to_be_bytes().to_vec();
            bytes.push(0);
            Felt::from_be_slice(&bytes).unwrap_err();
        }

        #[test]
        fn short_slice() {
            let result = Felt::from_be_slice(&[0xab, 0xcd]);
            assert_eq!(result, Ok(Felt::from_u64(0xabcd)));
        }

        #[test]
        fn overflow() {
            assert_eq!(Felt::from_be_slice(&MODULUS[..]), Err(OverflowError));
        }
    }

    mod from_hex_str {
        use assert_matches::assert_matches;

        use pretty_assertions_sorted::assert_eq;

        use super::*;

        fn expected() -> Felt {
            let mut bytes = [0; 32];
            bytes[31] = 0xEF;
            bytes[30] = 0xCD;
            bytes[29] = 0xAB;
            bytes[28] = 0xef;
            bytes[27] = 0xcd;
            bytes[26] = 0xab;
            bytes[25] = 0x89;
            bytes[24] = 0x67;
            bytes[23] = 0x45;
            bytes[22] = 0x23;
            bytes[21] = 0x01;
            Felt::from_be_bytes(bytes).unwrap()
        }

        #[rstest::rstest]
        #[case::simple("0123456789abcdefABCDEF")]
        #[case::prefix("0x0123456789abcdefABCDEF")]
        #[case::leading_zeros("0000000000123456789abcdefABCDEF")]
        #[case::prefix_and_leading_zeros("0x0000000000123456789abcdefABCDEF")]
        fn accepted(#[case] input: &str) {
            assert_eq!(Felt::from_hex_str(input).unwrap(), expected());
        }

        #[test]
        fn invalid_nibble() {
            assert_matches!(Felt::from_hex_str("0x123z").unwrap_err(), HexParseError::InvalidNibble(n) => assert_eq!(n, b'z'))
        }

        #[test]
        fn invalid_len() {
            assert_matches!(Felt::from_hex_str(&"1".repeat(65)).unwrap_err(), HexParseError::InvalidLength{max: 64, actual: n} => assert_eq!(n, 65))
        }

        #[test]
        fn overflow() {
            let mut modulus =
                "0x800000000000011000000000000000000000000000000000000000000000001".to_string();
            assert_eq!(
                Felt::from_hex_str(&modulus).unwrap_err(),
                HexParseError::Overflow
            );
            modulus.pop();
            modulus.push('0');
            Felt::from_hex_str(&modulus).unwrap();
        }
    }

    mod from_decimal_str {
        use pretty_assertions_sorted::assert_eq;

        use super::*;

        #[test]
        fn small() {
            assert_eq!(Felt::from_decimal_str("12").unwrap(), Felt::from_u64(12));
        }

        #[test]
        fn modulus_minus_one() {
            // P - 1
            let s = "3618502788666131213697322783095070105623107215331596699973092056135872020480";
            let expected =
                Felt::from_hex_str("0x800000000000011000000000000000000000000000000000000000000000000")
                    .unwrap();
            assert_eq!(Felt::from_decimal_str(s).unwrap(), expected);
        }

        #[rstest::rstest]
        #[case::empty("", DecimalParseError::InvalidDigit)]
        #[case::sign("-1", DecimalParseError::InvalidDigit)]
        #[case::hex("0x12", DecimalParseError::InvalidDigit)]
        #[case::whitespace(" 12", DecimalParseError::InvalidDigit)]
        #[case::modulus(
            "3618502788666131213697322783095070105623107215331596699973092056135872020481",
            DecimalParseError::Overflow
        )]
        fn rejected(#[case] input: &str, #[case] expected: DecimalParseError) {
            assert_eq!(Felt::from_decimal_str(input).unwrap_err(), expected);
        }
    }

    mod to_hex_str {
        use pretty_assertions_sorted::assert_eq;

        use super::*;

        #[rstest::rstest]
        #[case::zero("0x0")]
        #[case::odd("0x1234567890abcde")]
        #[case::even("0x1234567890abcdef")]
        #[case::max("0x800000000000011000000000000000000000000000000000000000000000000")]
        fn minimal(#[case] hex: &str) {
            let felt = Felt::from_hex_str(hex).unwrap();
            assert_eq!(felt.to_hex_str(), hex);
        }

        #[test]
        fn display_is_zero_padded() {
            let felt = Felt::from_u64(0x45);
            assert_eq!(
                felt.to_string(),
                "0x0000000000000000000000000000000000000000000000000000000000000045"
            );
        }
    }
}
