//! Working collection of one record type, persisted through [`Storage`].
//!
//! Customers and inventory both go through this service. The collection is
//! loaded once, mutated in memory, and saved whole.

use anyhow::{bail, Context, Result};
use shared::Record;
use std::path::Path;
use tracing::{debug, info};

use super::identifier::next_record_identifier;
use super::ordering::{search_records, sort_records};
use super::transfer_service;
use crate::storage::Storage;

pub struct RecordService<R: Record> {
    storage: Storage,
    records: Vec<R>,
}

impl<R: Record> RecordService<R> {
    /// Service with an empty collection; call [`load`](Self::load) to fill it
    pub fn new(storage: Storage) -> Self {
        Self {
            storage,
            records: Vec::new(),
        }
    }

    /// Replace the working collection with what is stored
    pub fn load(&mut self) -> Result<()> {
        self.records = self
            .storage
            .read_records::<R>()
            .with_context(|| format!("Failed to load {}", R::TABLE))?;
        debug!("Loaded {} {} records", self.records.len(), R::TABLE);
        Ok(())
    }

    pub fn records(&self) -> &[R] {
        &self.records
    }

    pub fn get(&self, id: i64) -> Option<&R> {
        self.records.iter().find(|record| record.id() == id)
    }

    /// Lowest identifier not used by the working collection
    pub fn next_id(&self) -> i64 {
        next_record_identifier(&self.records)
    }

    /// Store one new record and add it to the collection
    pub fn add(&mut self, record: R) -> Result<()> {
        if self.get(record.id()).is_some() {
            bail!("{} already has a record with id {}", R::TABLE, record.id());
        }
        self.storage
            .insert_record(&record)
            .with_context(|| format!("Failed to add record {} to {}", record.id(), R::TABLE))?;
        info!("Added record {} to {}", record.id(), R::TABLE);
        self.records.push(record);
        Ok(())
    }

    /// Swap in a new version of an existing record and save the collection.
    /// The working collection only changes once the save succeeded.
    pub fn update(&mut self, record: R) -> Result<()> {
        let id = record.id();
        let Some(position) = self.records.iter().position(|existing| existing.id() == id) else {
            bail!("{} has no record with id {}", R::TABLE, id);
        };

        let mut updated = self.records.clone();
        updated[position] = record;
        self.persist(&updated)?;
        self.records = updated;

        info!("Updated record {} in {}", id, R::TABLE);
        Ok(())
    }

    /// Remove a record; returns whether one was present
    pub fn remove(&mut self, id: i64) -> Result<bool> {
        if self.get(id).is_none() {
            debug!("No record {} in {} to remove", id, R::TABLE);
            return Ok(false);
        }

        self.storage
            .delete_record::<R>(id)
            .with_context(|| format!("Failed to remove record {} from {}", id, R::TABLE))?;
        self.records.retain(|record| record.id() != id);

        info!("Removed record {} from {}", id, R::TABLE);
        Ok(true)
    }

    /// Persist the whole working collection, replacing the stored table
    pub fn save(&self) -> Result<()> {
        self.persist(&self.records)
    }

    fn persist(&self, records: &[R]) -> Result<()> {
        self.storage
            .replace_records(records)
            .with_context(|| format!("Failed to save {}", R::TABLE))
    }

    /// Save and reload, so the collection reflects exactly what was stored
    pub fn refresh(&mut self) -> Result<()> {
        self.save()?;
        self.load()
    }

    pub fn sorted_by(&self, column: usize) -> Result<Vec<R>> {
        Ok(sort_records(&self.records, column)?)
    }

    pub fn search(&self, column: usize, query: &str) -> Result<Vec<R>> {
        Ok(search_records(&self.records, column, query)?)
    }

    pub fn export_csv<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        transfer_service::export_to_path(&self.records, path)
    }

    /// Replace the collection with the file's records and save it.
    /// A file with any bad line or repeated identifier leaves the collection
    /// and the store untouched.
    pub fn import_csv<P: AsRef<Path>>(&mut self, path: P) -> Result<usize> {
        let imported = transfer_service::import_from_path::<R, _>(path)?;
        self.persist(&imported)?;
        self.records = imported;
        Ok(self.records.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DatabaseKind;
    use crate::storage::test_utils::TestEnvironment;
    use shared::{Customer, Item};
    use std::fs;

    fn customer(id: i64, firstname: &str) -> Customer {
        Customer {
            id,
            firstname: firstname.to_string(),
            surname: "Evans".to_string(),
            contact: "01632 960001".to_string(),
            address: "5 Church Road".to_string(),
        }
    }

    fn service<R: Record>(env: &TestEnvironment, kind: DatabaseKind) -> RecordService<R> {
        let mut service = RecordService::new(Storage::new(&env.config(kind)));
        service.load().unwrap();
        service
    }

    #[test]
    fn test_add_persists_and_allocates_ids() {
        let env = TestEnvironment::new().unwrap();
        let mut customers = service::<Customer>(&env, DatabaseKind::Local);
        assert_eq!(customers.next_id(), 1);

        customers.add(customer(1, "Ann")).unwrap();
        customers.add(customer(customers.next_id(), "Bob")).unwrap();
        assert!(customers.add(customer(1, "Dup")).is_err());

        let reloaded = service::<Customer>(&env, DatabaseKind::Local);
        assert_eq!(reloaded.records(), customers.records());
        assert_eq!(reloaded.next_id(), 3);
    }

    #[test]
    fn test_update_and_remove() {
        let env = TestEnvironment::new().unwrap();
        let mut customers = service::<Customer>(&env, DatabaseKind::Text);
        customers.add(customer(1, "Ann")).unwrap();
        customers.add(customer(2, "Bob")).unwrap();

        let mut changed = customer(2, "Robert");
        changed.contact = "01632 960999".to_string();
        customers.update(changed.clone()).unwrap();
        assert!(customers.update(customer(7, "Ghost")).is_err());

        assert!(customers.remove(1).unwrap());
        assert!(!customers.remove(1).unwrap());

        let reloaded = service::<Customer>(&env, DatabaseKind::Text);
        assert_eq!(reloaded.records(), &[changed]);
        assert_eq!(reloaded.next_id(), 1);
    }

    #[test]
    fn test_price_is_stored_rounded() {
        let env = TestEnvironment::new().unwrap();
        let mut inventory = service::<Item>(&env, DatabaseKind::Text);
        inventory
            .add(Item {
                id: 1,
                brand: "Acme".into(),
                kind: "Widget".into(),
                name: "Small Widget".into(),
                price: 9.999,
                stock: 10,
            })
            .unwrap();
        inventory.refresh().unwrap();
        assert_eq!(inventory.records()[0].price, 10.0);
    }

    #[test]
    fn test_failed_import_keeps_collection() {
        let env = TestEnvironment::new().unwrap();
        let mut customers = service::<Customer>(&env, DatabaseKind::Local);
        customers.add(customer(1, "Ann")).unwrap();

        let bad = env.path().join("bad.csv");
        fs::write(&bad, "2,Bob,Jones,0456,Here\nthree,Cat,Lee,0789,There\n").unwrap();
        assert!(customers.import_csv(&bad).is_err());
        assert_eq!(customers.records(), &[customer(1, "Ann")]);

        let good = env.path().join("good.csv");
        fs::write(&good, "5,Eve,Stone,0111,Far\n").unwrap();
        assert_eq!(customers.import_csv(&good).unwrap(), 1);

        let reloaded = service::<Customer>(&env, DatabaseKind::Local);
        assert_eq!(reloaded.records().len(), 1);
        assert_eq!(reloaded.records()[0].id, 5);
    }

    #[test]
    fn test_import_rejects_repeated_identifiers() {
        for kind in [DatabaseKind::Local, DatabaseKind::Text] {
            let env = TestEnvironment::new().unwrap();
            let mut customers = service::<Customer>(&env, kind);
            customers.add(customer(3, "Cat")).unwrap();

            let file = env.path().join("repeated.csv");
            fs::write(&file, "1,Ann,A,0,X\n1,Bob,B,0,Y\n").unwrap();
            assert!(customers.import_csv(&file).is_err(), "{kind}");
            assert_eq!(customers.records(), &[customer(3, "Cat")]);

            let reloaded = service::<Customer>(&env, kind);
            assert_eq!(reloaded.records(), &[customer(3, "Cat")], "{kind}");
        }
    }

    #[test]
    fn test_add_rejects_non_positive_identifier() {
        let env = TestEnvironment::new().unwrap();
        let mut customers = service::<Customer>(&env, DatabaseKind::Text);
        assert!(customers.add(customer(-4, "Neg")).is_err());
        assert!(customers.add(customer(0, "Zero")).is_err());
        assert!(customers.records().is_empty());
        assert!(service::<Customer>(&env, DatabaseKind::Text).records().is_empty());
    }

    #[test]
    fn test_failed_writes_leave_collection_unchanged() {
        let env = TestEnvironment::new().unwrap();
        let mut customers = service::<Customer>(&env, DatabaseKind::Text);
        customers.add(customer(1, "Ann")).unwrap();
        customers.add(customer(2, "Bob")).unwrap();

        // A directory where the table file should be makes every write fail
        let table_file = env.path().join("text").join("Customers.csv");
        fs::remove_file(&table_file).unwrap();
        fs::create_dir(&table_file).unwrap();

        assert!(customers.remove(1).is_err());
        assert!(customers.update(customer(2, "Robert")).is_err());

        let good = env.path().join("good.csv");
        fs::write(&good, "5,Eve,Stone,0111,Far\n").unwrap();
        assert!(customers.import_csv(&good).is_err());

        assert_eq!(customers.records(), &[customer(1, "Ann"), customer(2, "Bob")]);
    }

    #[test]
    fn test_sort_and_search() {
        let env = TestEnvironment::new().unwrap();
        let mut customers = service::<Customer>(&env, DatabaseKind::Text);
        customers.add(customer(1, "Zoe")).unwrap();
        customers.add(customer(2, "Adam")).unwrap();
        customers.add(customer(3, "Mia")).unwrap();

        let names: Vec<String> = customers
            .sorted_by(1)
            .unwrap()
            .into_iter()
            .map(|c| c.firstname)
            .collect();
        assert_eq!(names, vec!["Adam", "Mia", "Zoe"]);
        assert_eq!(customers.search(1, "MI").unwrap().len(), 1);
        assert!(customers.sorted_by(5).is_err());
    }
}
