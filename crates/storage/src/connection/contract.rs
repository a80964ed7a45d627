use anyhow::Context;
use lantern_common::{ClassHash, ContractAddress};

use crate::prelude::*;

impl Transaction<'_> {
    /// Records a deployed contract. The class must already be stored and an
    /// address can only ever be deployed once.
    pub fn insert_contract(
        &self,
        address: ContractAddress,
        class_hash: ClassHash,
    ) -> anyhow::Result<()> {
        if let Some(existing) = self.contract_class_hash(address)? {
            anyhow::ensure!(
                existing == class_hash,
                "Contract {address} is already deployed with class {existing}"
            );
            return Ok(());
        }

        anyhow::ensure!(
            self.class_definition_exists(class_hash)?,
            "Class {class_hash} of contract {address} is not declared"
        );

        self.inner()
            .execute(
                "INSERT INTO contracts (address, class_hash) VALUES (:address, :class_hash)",
                named_params! {
                    ":address": &address,
                    ":class_hash": &class_hash,
                },
            )
            .context("Inserting contract")?;

        Ok(())
    }

    pub fn contract_class_hash(
        &self,
        address: ContractAddress,
    ) -> anyhow::Result<Option<ClassHash>> {
        self.inner()
            .query_row(
                "SELECT class_hash FROM contracts WHERE address = ?",
                params![&address],
                |row| row.get_class_hash(0),
            )
            .optional()
            .context("Querying contract's class hash")
    }
}

#[cfg(test)]
mod tests {
    use lantern_common::macro_prelude::*;
    use pretty_assertions_sorted::assert_eq;

    use super::*;
    use crate::StorageBuilder;

    const DEFINITION: &[u8] = br#"{"program":{},"entry_points_by_type":{}}"#;

    fn setup() -> crate::Storage {
        let storage = StorageBuilder::in_memory().unwrap();
        let mut db = storage.connection().unwrap();
        let tx = db.transaction().unwrap();
        tx.insert_cairo_class_definition(class_hash!("0xc1"), DEFINITION)
            .unwrap();
        tx.insert_cairo_class_definition(class_hash!("0xc2"), DEFINITION)
            .unwrap();
        tx.commit().unwrap();
        storage
    }

    #[test]
    fn deployed_contract_resolves_to_class() {
        let storage = setup();
        let mut db = storage.connection().unwrap();
        let tx = db.transaction().unwrap();

        let address = contract_address!("0xabc");
        tx.insert_contract(address, class_hash!("0xc1")).unwrap();

        assert_eq!(
            tx.contract_class_hash(address).unwrap(),
            Some(class_hash!("0xc1"))
        );
        assert_eq!(
            tx.contract_class_hash(contract_address!("0xdef")).unwrap(),
            None
        );
    }

    #[test]
    fn redeploy_with_other_class_is_rejected() {
        let storage = setup();
        let mut db = storage.connection().unwrap();
        let tx = db.transaction().unwrap();

        let address = contract_address!("0xabc");
        tx.insert_contract(address, class_hash!("0xc1")).unwrap();
        // Same class is idempotent.
        tx.insert_contract(address, class_hash!("0xc1")).unwrap();
        tx.insert_contract(address, class_hash!("0xc2"))
            .unwrap_err();

        assert_eq!(
            tx.contract_class_hash(address).unwrap(),
            Some(class_hash!("0xc1"))
        );
    }

    #[test]
    fn undeclared_class_is_rejected() {
        let storage = setup();
        let mut db = storage.connection().unwrap();
        let tx = db.transaction().unwrap();

        tx.insert_contract(contract_address!("0xabc"), class_hash!("0xdead"))
            .unwrap_err();
    }
}
