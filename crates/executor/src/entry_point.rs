use lantern_common::class_definition::{CairoEntryPoints, EntryPointType};
use lantern_common::{ByteCodeOffset, EntryPoint};

use crate::error::CallError;

/// A selector located within a class's entry point table.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct ResolvedEntryPoint {
    pub entry_point_type: EntryPointType,
    pub selector: EntryPoint,
    pub offset: ByteCodeOffset,
}

/// Looks up `selector` among the class entry points of the given type.
///
/// Selectors of other entry point types never match, so a constructor or L1
/// handler cannot be reached through an external call.
pub fn resolve(
    entry_points: &CairoEntryPoints,
    selector: EntryPoint,
    entry_point_type: EntryPointType,
) -> Result<ResolvedEntryPoint, CallError> {
    entry_points
        .of_type(entry_point_type)
        .iter()
        .find(|entry| entry.selector == selector)
        .map(|entry| ResolvedEntryPoint {
            entry_point_type,
            selector,
            offset: entry.offset,
        })
        .ok_or(CallError::InvalidMessageSelector)
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use lantern_common::class_definition::SelectorAndOffset;
    use lantern_common::macro_prelude::*;
    use pretty_assertions_sorted::assert_eq;

    use super::*;

    fn entry_points() -> CairoEntryPoints {
        CairoEntryPoints {
            constructor: vec![SelectorAndOffset {
                selector: EntryPoint::CONSTRUCTOR,
                offset: byte_code_offset!("0x35"),
            }],
            external: vec![
                SelectorAndOffset {
                    selector: entry_point!(
                        "0x0362398bec32bc0ebb411203221a35a0301193a96f317ebe5e40be9f60d15320"
                    ),
                    offset: byte_code_offset!("0x54"),
                },
                SelectorAndOffset {
                    selector: EntryPoint::hashed(b"get_balance"),
                    offset: byte_code_offset!("0x76"),
                },
            ],
            l1_handler: vec![],
        }
    }

    #[test]
    fn external_selector() {
        let resolved = resolve(
            &entry_points(),
            EntryPoint::hashed(b"get_balance"),
            EntryPointType::External,
        )
        .unwrap();

        assert_eq!(
            resolved,
            ResolvedEntryPoint {
                entry_point_type: EntryPointType::External,
                selector: EntryPoint::hashed(b"get_balance"),
                offset: byte_code_offset!("0x76"),
            }
        );
    }

    #[rstest::rstest]
    #[case::unknown(EntryPoint::hashed(b"no_such_function"))]
    #[case::zero(EntryPoint::ZERO)]
    #[case::constructor_is_not_external(EntryPoint::CONSTRUCTOR)]
    fn unresolved(#[case] selector: EntryPoint) {
        assert_matches!(
            resolve(&entry_points(), selector, EntryPointType::External),
            Err(CallError::InvalidMessageSelector)
        );
    }

    #[test]
    fn empty_table() {
        assert_matches!(
            resolve(
                &entry_points(),
                EntryPoint::hashed(b"get_balance"),
                EntryPointType::L1Handler
            ),
            Err(CallError::InvalidMessageSelector)
        );
    }
}
