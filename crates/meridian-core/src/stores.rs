// SPDX-License-Identifier: Apache-2.0
//! Equipment/supply stores.
//!
//! A store is an asset ledger referenced by id from forces, mobilization
//! requests, engagement supply checks, and readiness supply events. Asset
//! lines are sorted and strictly positive, the same discipline as station
//! inventories.

use thiserror::Error;

/// Store identifier.
pub type StoreId = u64;
/// Asset identifier.
pub type AssetId = u64;

/// Errors surfaced by the store registry.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum StoreError {
    /// Zero id or zero quantity.
    #[error("invalid argument")]
    InvalidArgument,
    /// Store id already registered.
    #[error("duplicate store id")]
    DuplicateId,
    /// Unknown store.
    #[error("store not found")]
    NotFound,
    /// Registry at capacity.
    #[error("store registry full")]
    Full,
    /// Consumption exceeds the stored quantity.
    #[error("insufficient store quantity")]
    Insufficient,
    /// Addition would overflow the stored quantity.
    #[error("store overflow")]
    Overflow,
}

#[derive(Debug, Clone)]
struct Store {
    store_id: StoreId,
    // (asset_id, qty), sorted by asset, qty > 0
    assets: Vec<(AssetId, u32)>,
}

/// Id-sorted store table.
#[derive(Debug)]
pub struct StoreRegistry {
    stores: Vec<Store>,
    capacity: usize,
}

impl StoreRegistry {
    /// Creates an empty registry bounded at `capacity` stores.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            stores: Vec::new(),
            capacity,
        }
    }

    /// Registers an empty store.
    pub fn register(&mut self, store_id: StoreId) -> Result<(), StoreError> {
        if store_id == 0 {
            return Err(StoreError::InvalidArgument);
        }
        if self.stores.len() >= self.capacity {
            return Err(StoreError::Full);
        }
        match self.stores.binary_search_by_key(&store_id, |s| s.store_id) {
            Ok(_) => Err(StoreError::DuplicateId),
            Err(idx) => {
                self.stores.insert(
                    idx,
                    Store {
                        store_id,
                        assets: Vec::new(),
                    },
                );
                Ok(())
            }
        }
    }

    fn store_mut(&mut self, store_id: StoreId) -> Result<&mut Store, StoreError> {
        match self.stores.binary_search_by_key(&store_id, |s| s.store_id) {
            Ok(idx) => Ok(&mut self.stores[idx]),
            Err(_) => Err(StoreError::NotFound),
        }
    }

    /// Quantity of `asset_id` in the store, zero when absent.
    pub fn get_qty(&self, store_id: StoreId, asset_id: AssetId) -> Result<u32, StoreError> {
        let idx = self
            .stores
            .binary_search_by_key(&store_id, |s| s.store_id)
            .map_err(|_| StoreError::NotFound)?;
        let store = &self.stores[idx];
        Ok(store
            .assets
            .binary_search_by_key(&asset_id, |(id, _)| *id)
            .map_or(0, |i| store.assets[i].1))
    }

    /// Deposits `qty > 0` of an asset.
    pub fn add(&mut self, store_id: StoreId, asset_id: AssetId, qty: u32) -> Result<(), StoreError> {
        if asset_id == 0 || qty == 0 {
            return Err(StoreError::InvalidArgument);
        }
        let store = self.store_mut(store_id)?;
        match store.assets.binary_search_by_key(&asset_id, |(id, _)| *id) {
            Ok(idx) => {
                let line = &mut store.assets[idx];
                line.1 = line.1.checked_add(qty).ok_or(StoreError::Overflow)?;
            }
            Err(idx) => store.assets.insert(idx, (asset_id, qty)),
        }
        Ok(())
    }

    /// Consumes `qty > 0` of an asset, erasing the line at zero.
    pub fn consume(
        &mut self,
        store_id: StoreId,
        asset_id: AssetId,
        qty: u32,
    ) -> Result<(), StoreError> {
        if asset_id == 0 || qty == 0 {
            return Err(StoreError::InvalidArgument);
        }
        let store = self.store_mut(store_id)?;
        let idx = store
            .assets
            .binary_search_by_key(&asset_id, |(id, _)| *id)
            .map_err(|_| StoreError::Insufficient)?;
        if store.assets[idx].1 < qty {
            return Err(StoreError::Insufficient);
        }
        store.assets[idx].1 -= qty;
        if store.assets[idx].1 == 0 {
            store.assets.remove(idx);
        }
        Ok(())
    }

    /// Number of registered stores.
    #[must_use]
    pub fn len(&self) -> usize {
        self.stores.len()
    }

    /// True when no stores are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.stores.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn consume_erases_empty_lines() {
        let mut stores = StoreRegistry::with_capacity(4);
        stores.register(1).unwrap();
        stores.add(1, 42, 10).unwrap();
        stores.consume(1, 42, 10).unwrap();
        assert_eq!(stores.get_qty(1, 42).unwrap(), 0);
    }

    #[test]
    fn insufficient_consumption_is_rejected() {
        let mut stores = StoreRegistry::with_capacity(4);
        stores.register(1).unwrap();
        stores.add(1, 42, 5).unwrap();
        assert_eq!(stores.consume(1, 42, 6).unwrap_err(), StoreError::Insufficient);
        assert_eq!(stores.get_qty(1, 42).unwrap(), 5);
    }

    #[test]
    fn unknown_store_is_not_found() {
        let stores = StoreRegistry::with_capacity(4);
        assert_eq!(stores.get_qty(9, 1).unwrap_err(), StoreError::NotFound);
    }
}
