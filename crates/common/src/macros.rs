/// Declares the [Felt](crate::Felt) newtypes along with a `macro_prelude`
/// module exporting a const constructor macro per type, e.g.
/// `class_hash!("0x123")`.
///
/// Expands to a module, so it can only be invoked once per crate.
macro_rules! felt_newtypes {
    ($($name:ident),+ $(,)?) => {
        $(
            #[derive(
                Copy,
                Clone,
                Default,
                PartialEq,
                Eq,
                PartialOrd,
                Ord,
                Hash,
                serde::Serialize,
                serde::Deserialize,
            )]
            pub struct $name(pub $crate::Felt);

            impl $name {
                pub const ZERO: Self = Self($crate::Felt::ZERO);

                pub fn as_inner(&self) -> &$crate::Felt {
                    &self.0
                }
            }

            // `ClassHash(0x...)` instead of `ClassHash(Felt(0x...))`.
            impl std::fmt::Debug for $name {
                fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                    write!(f, "{}({})", stringify!($name), self.0)
                }
            }

            impl std::fmt::Display for $name {
                fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                    std::fmt::Display::fmt(&self.0, f)
                }
            }

            paste::paste! {
                #[macro_export]
                macro_rules! [<$name:snake>] {
                    ($hex:expr) => {
                        $name($crate::felt!($hex))
                    };
                }
            }
        )+

        pub mod macro_prelude {
            pub use super::felt;

            paste::paste! {
                $(pub use [<$name:snake>];)+
            }
        }
    };
}

pub(super) use felt_newtypes;

/// A [Felt](crate::Felt) from a hex literal, checked at compile time.
#[macro_export]
macro_rules! felt {
    ($hex:expr) => {{
        // Binding to a const moves any parse failure to compile time.
        const PARSED: $crate::Felt = match $crate::Felt::from_hex_str($hex) {
            Ok(felt) => felt,
            Err($crate::HexParseError::InvalidNibble(_)) => panic!("Invalid hex digit"),
            Err($crate::HexParseError::InvalidLength { .. }) => panic!("Too many hex digits"),
            Err($crate::HexParseError::Overflow) => panic!("Felt overflow"),
        };
        PARSED
    }};
}
