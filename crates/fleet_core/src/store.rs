//! Entity stores: the only owners of vehicle and customer records.
//!
//! Both stores are ECS resources on the simulation [`World`](bevy_ecs::world::World).
//! Systems and coordinators borrow them through the world and look records up by
//! id; nothing else keeps a copy of a record.
//!
//! Lookup by id is O(1) and iteration follows insertion order. Removal leaves a
//! tombstone that is compacted away once tombstones outnumber live records.

use std::collections::HashMap;
use std::hash::Hash;

use bevy_ecs::prelude::Resource;

use crate::customer::{Customer, CustomerRequest, CustomerStatus};
use crate::ids::{CustomerId, VehicleId};
use crate::vehicle::Vehicle;

/// Tombstones are only compacted above this many slots.
const COMPACT_MIN_SLOTS: usize = 64;

/// Insertion-ordered map with O(1) lookup and amortised O(1) removal.
#[derive(Debug, Clone)]
pub struct OrderedStore<K, V> {
    slots: Vec<Option<(K, V)>>,
    index: HashMap<K, usize>,
}

impl<K, V> Default for OrderedStore<K, V> {
    fn default() -> Self {
        Self {
            slots: Vec::new(),
            index: HashMap::new(),
        }
    }
}

impl<K: Copy + Eq + Hash, V> OrderedStore<K, V> {
    /// Inserts a record. Re-inserting an existing key replaces the value in place,
    /// keeping its original position.
    pub fn insert(&mut self, key: K, value: V) -> Option<V> {
        if let Some(&slot) = self.index.get(&key) {
            let previous = self.slots[slot].replace((key, value));
            return previous.map(|(_, v)| v);
        }
        self.index.insert(key, self.slots.len());
        self.slots.push(Some((key, value)));
        None
    }

    pub fn get(&self, key: &K) -> Option<&V> {
        let slot = *self.index.get(key)?;
        self.slots[slot].as_ref().map(|(_, v)| v)
    }

    pub fn get_mut(&mut self, key: &K) -> Option<&mut V> {
        let slot = *self.index.get(key)?;
        self.slots[slot].as_mut().map(|(_, v)| v)
    }

    pub fn contains(&self, key: &K) -> bool {
        self.index.contains_key(key)
    }

    pub fn remove(&mut self, key: &K) -> Option<V> {
        let slot = self.index.remove(key)?;
        let removed = self.slots[slot].take().map(|(_, v)| v);
        self.compact_if_sparse();
        removed
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&K, &V)> {
        self.slots
            .iter()
            .filter_map(|slot| slot.as_ref().map(|(k, v)| (k, v)))
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (&K, &mut V)> {
        self.slots
            .iter_mut()
            .filter_map(|slot| slot.as_mut().map(|(k, v)| (&*k, v)))
    }

    pub fn keys(&self) -> Vec<K> {
        self.iter().map(|(k, _)| *k).collect()
    }

    fn compact_if_sparse(&mut self) {
        if self.slots.len() < COMPACT_MIN_SLOTS || self.index.len() * 2 > self.slots.len() {
            return;
        }
        self.slots.retain(Option::is_some);
        for (slot, entry) in self.slots.iter().enumerate() {
            if let Some((key, _)) = entry {
                self.index.insert(*key, slot);
            }
        }
    }
}

/// The fleet, keyed by vehicle id.
#[derive(Debug, Default, Resource)]
pub struct VehicleStore {
    vehicles: OrderedStore<VehicleId, Vehicle>,
}

impl VehicleStore {
    pub fn insert(&mut self, vehicle: Vehicle) {
        self.vehicles.insert(vehicle.id(), vehicle);
    }

    pub fn get(&self, id: VehicleId) -> Option<&Vehicle> {
        self.vehicles.get(&id)
    }

    pub fn get_mut(&mut self, id: VehicleId) -> Option<&mut Vehicle> {
        self.vehicles.get_mut(&id)
    }

    pub fn remove(&mut self, id: VehicleId) -> Option<Vehicle> {
        self.vehicles.remove(&id)
    }

    pub fn len(&self) -> usize {
        self.vehicles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vehicles.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Vehicle> {
        self.vehicles.iter().map(|(_, v)| v)
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Vehicle> {
        self.vehicles.iter_mut().map(|(_, v)| v)
    }

    pub fn ids(&self) -> Vec<VehicleId> {
        self.vehicles.keys()
    }
}

/// Customers currently in the system, keyed by customer id.
#[derive(Debug, Default, Resource)]
pub struct CustomerStore {
    customers: OrderedStore<CustomerId, Customer>,
}

impl CustomerStore {
    pub fn insert(&mut self, customer: Customer) {
        self.customers.insert(customer.id(), customer);
    }

    /// Adds freshly generated requests; each joins the next request pool.
    pub fn insert_requests(&mut self, requests: Vec<CustomerRequest>) {
        for request in requests {
            self.insert(Customer::new(request));
        }
    }

    pub fn get(&self, id: CustomerId) -> Option<&Customer> {
        self.customers.get(&id)
    }

    pub fn get_mut(&mut self, id: CustomerId) -> Option<&mut Customer> {
        self.customers.get_mut(&id)
    }

    pub fn remove(&mut self, id: CustomerId) -> Option<Customer> {
        self.customers.remove(&id)
    }

    pub fn len(&self) -> usize {
        self.customers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.customers.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Customer> {
        self.customers.iter().map(|(_, c)| c)
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Customer> {
        self.customers.iter_mut().map(|(_, c)| c)
    }

    pub fn ids(&self) -> Vec<CustomerId> {
        self.customers.keys()
    }

    /// Drains the request pool: waiting customers that are new since the last
    /// drain or were flagged to carry over. Their pool flags are cleared.
    pub fn take_request_pool(&mut self) -> Vec<CustomerRequest> {
        self.iter_mut()
            .filter(|c| c.status() == CustomerStatus::Waiting && c.in_request_pool())
            .map(|c| {
                c.leave_request_pool();
                c.request().clone()
            })
            .collect()
    }

    /// Puts a waiting customer back into the next request pool.
    pub fn carry_over(&mut self, id: CustomerId) -> bool {
        match self.get_mut(id) {
            Some(customer) if customer.status() == CustomerStatus::Waiting => {
                customer.flag_carry_over();
                true
            }
            _ => false,
        }
    }

    pub fn count_with_status(&self, status: CustomerStatus) -> usize {
        self.iter().filter(|c| c.status() == status).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn iterates_in_insertion_order_after_removals() {
        let mut store = OrderedStore::default();
        for key in [5u64, 3, 9, 1] {
            store.insert(key, key * 10);
        }
        store.remove(&3);
        assert_eq!(store.keys(), vec![5, 9, 1]);
        store.insert(3, 30);
        assert_eq!(store.keys(), vec![5, 9, 1, 3]);
        assert_eq!(store.get(&9), Some(&90));
        assert_eq!(store.len(), 4);
    }

    #[test]
    fn reinsert_replaces_in_place() {
        let mut store = OrderedStore::default();
        store.insert(1u64, "a");
        store.insert(2u64, "b");
        assert_eq!(store.insert(1, "c"), Some("a"));
        assert_eq!(store.keys(), vec![1, 2]);
        assert_eq!(store.get(&1), Some(&"c"));
    }

    #[test]
    fn compaction_keeps_lookup_and_order() {
        let mut store = OrderedStore::default();
        for key in 0u64..200 {
            store.insert(key, key);
        }
        for key in (0u64..200).filter(|k| k % 4 != 0) {
            assert_eq!(store.remove(&key), Some(key));
        }
        assert_eq!(store.len(), 50);
        assert!(store.slots.len() < 200, "tombstones should have been compacted");
        let keys = store.keys();
        assert_eq!(keys, (0u64..200).filter(|k| k % 4 == 0).collect::<Vec<_>>());
        for key in keys {
            assert_eq!(store.get(&key), Some(&key));
        }
        assert!(store.remove(&1).is_none());
    }

    #[test]
    fn iter_mut_updates_values() {
        let mut store = OrderedStore::default();
        store.insert(1u64, 1);
        store.insert(2u64, 2);
        for (_, value) in store.iter_mut() {
            *value *= 10;
        }
        assert_eq!(store.get(&2), Some(&20));
    }
}
