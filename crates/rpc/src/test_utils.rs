//! Fixtures shared by the method tests.
use lantern_common::macro_prelude::*;
use lantern_common::{CallResultValue, ClassHash, ContractAddress, EntryPoint};
use lantern_executor::test_utils::ScriptedEngine;
use lantern_executor::EngineFailure;
use lantern_storage::{Storage, StorageBuilder};

pub const BALANCE_CONTRACT_DEFINITION: &[u8] = include_bytes!("../fixtures/balance_contract.json");

pub const CLASS_HASH: ClassHash =
    class_hash!("0x075dc4457c66bc9e4d7b6ab2a4e4f2ae1f8a3bd0b3a3f3d6e4e0b3e3a7c1f2b4");

pub const CONTRACT_ADDRESS: ContractAddress =
    contract_address!("0x057dde83c18c0efe7123c36a52d704cf27d5c38cdf0b1e1edc3b0dae3ee4e374");

/// A second deployment of the same class.
pub const OTHER_CONTRACT_ADDRESS: ContractAddress =
    contract_address!("0x02a3d2b1c0d6b5e3f6a4e1c1b2d3e4f5a6b7c8d9e0f1a2b3c4d5e6f7a8b9c0d1");

pub const ASSERT_TRAP: &str = "Error at pc=0:118:\nAn ASSERT_EQ instruction failed: 10:0 != 10:1.";

pub fn get_balance() -> EntryPoint {
    EntryPoint::hashed(b"get_balance")
}

pub fn setup_storage() -> Storage {
    let storage = StorageBuilder::in_memory().unwrap();
    let mut connection = storage.connection().unwrap();
    let tx = connection.transaction().unwrap();

    tx.insert_cairo_class_definition(CLASS_HASH, BALANCE_CONTRACT_DEFINITION)
        .unwrap();
    tx.insert_contract(CONTRACT_ADDRESS, CLASS_HASH).unwrap();
    tx.insert_contract(OTHER_CONTRACT_ADDRESS, CLASS_HASH)
        .unwrap();
    tx.commit().unwrap();

    storage
}

/// `get_balance` returns 0x45 when called without arguments and trips an
/// assertion otherwise.
pub fn balance_engine() -> ScriptedEngine {
    ScriptedEngine::default().with(CONTRACT_ADDRESS, get_balance(), |calldata| {
        if calldata.is_empty() {
            Ok(vec![CallResultValue(felt!("0x45"))])
        } else {
            Err(EngineFailure::Trap(ASSERT_TRAP.to_owned()))
        }
    })
}
