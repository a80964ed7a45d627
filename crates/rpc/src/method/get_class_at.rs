use anyhow::Context;
use lantern_common::{codec, ContractAddress};
use serde::Deserialize;

use crate::context::RpcContext;
use crate::types::class::ContractClass;

crate::error::generate_rpc_error_subset!(Error: ContractNotFound);

#[derive(Debug, Deserialize, PartialEq, Eq)]
pub struct Input {
    contract_address: String,
}

pub async fn get_class_at(context: RpcContext, input: Input) -> Result<ContractClass, Error> {
    let contract_address = match codec::normalize(&input.contract_address) {
        Ok(address) => ContractAddress(address),
        Err(error) => {
            tracing::debug!(%error, "Malformed contract address");
            return Err(Error::ContractNotFound);
        }
    };

    let span = tracing::Span::current();
    tokio::task::spawn_blocking(move || -> Result<ContractClass, Error> {
        let _g = span.enter();
        let mut db = context
            .storage
            .connection()
            .context("Opening database connection")?;

        let tx = db.transaction().context("Creating database transaction")?;

        let class_hash = tx
            .contract_class_hash(contract_address)
            .context("Fetching class hash")?
            .ok_or(Error::ContractNotFound)?;

        let definition = tx
            .class_definition(class_hash)
            .context("Fetching class definition")?
            .with_context(|| format!("Class {class_hash} of deployed contract is missing"))?;

        let class = ContractClass::from_definition_bytes(&definition)
            .with_context(|| format!("Converting class {class_hash}"))?;

        Ok(class)
    })
    .await
    .context("Joining blocking task")?
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use pretty_assertions_sorted::assert_eq;
    use serde_json::json;

    use super::*;
    use crate::test_utils::{CLASS_HASH, CONTRACT_ADDRESS, OTHER_CONTRACT_ADDRESS};

    mod parsing {
        use pretty_assertions_sorted::assert_eq;

        use super::*;

        #[test]
        fn positional_args() {
            let input = serde_json::from_value::<Input>(json!(["0xabcde"])).unwrap();
            assert_eq!(
                input,
                Input {
                    contract_address: "0xabcde".to_owned()
                }
            );
        }

        #[test]
        fn named_args() {
            let input =
                serde_json::from_value::<Input>(json!({ "contract_address": "0xabcde" })).unwrap();
            assert_eq!(
                input,
                Input {
                    contract_address: "0xabcde".to_owned()
                }
            );
        }
    }

    fn input(contract_address: &str) -> Input {
        Input {
            contract_address: contract_address.to_owned(),
        }
    }

    #[test_log::test(tokio::test)]
    async fn matches_get_class() {
        let context = RpcContext::for_tests();

        let expected = crate::method::get_class(
            context.clone(),
            serde_json::from_value(json!({ "class_hash": CLASS_HASH.to_string() })).unwrap(),
        )
        .await
        .unwrap();

        for address in [CONTRACT_ADDRESS, OTHER_CONTRACT_ADDRESS] {
            let class = get_class_at(context.clone(), input(&address.to_string()))
                .await
                .unwrap();
            assert_eq!(class, expected);
        }
    }

    #[rstest::rstest]
    #[case::not_deployed("0x07b529269b82f3f3ebbb2c463a9e1edaa2c6eea8fa308ff70b30398766a2e20c")]
    #[case::malformed("0xnot-an-address")]
    #[tokio::test]
    async fn contract_not_found(#[case] contract_address: &str) {
        let context = RpcContext::for_tests();

        let error = get_class_at(context, input(contract_address))
            .await
            .unwrap_err();
        assert_matches!(error, Error::ContractNotFound);
    }
}
