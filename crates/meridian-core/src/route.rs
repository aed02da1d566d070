// SPDX-License-Identifier: Apache-2.0
//! Route graph: transfer lanes between stations.

use thiserror::Error;

use crate::registry::{Keyed, Registry, RegistryError};
use crate::station::StationId;

/// Route identifier.
pub type RouteId = u64;

/// Errors surfaced by the route graph.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RouteError {
    /// Zero id.
    #[error("invalid argument")]
    InvalidArgument,
    /// Route id already registered.
    #[error("duplicate route id")]
    DuplicateId,
    /// Unknown route.
    #[error("route not found")]
    NotFound,
    /// Graph at capacity.
    #[error("route graph full")]
    Full,
    /// Zero duration or zero capacity.
    #[error("invalid route data")]
    InvalidData,
}

impl From<RegistryError> for RouteError {
    fn from(err: RegistryError) -> Self {
        match err {
            RegistryError::InvalidId => Self::InvalidArgument,
            RegistryError::DuplicateId => Self::DuplicateId,
            RegistryError::Full => Self::Full,
            RegistryError::NotFound => Self::NotFound,
        }
    }
}

/// A directed transfer lane.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Route {
    /// Route id, nonzero.
    pub route_id: RouteId,
    /// Source station.
    pub src_station_id: StationId,
    /// Destination station.
    pub dst_station_id: StationId,
    /// Transit time in ticks, `> 0`.
    pub duration_ticks: u64,
    /// Maximum units per transfer, `> 0`.
    pub capacity_units: u64,
}

impl Keyed for Route {
    fn key(&self) -> u64 {
        self.route_id
    }
}

/// Id-sorted route store.
#[derive(Debug)]
pub struct RouteGraph {
    routes: Registry<Route>,
}

impl RouteGraph {
    /// Creates an empty graph bounded at `capacity` routes.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            routes: Registry::with_capacity(capacity),
        }
    }

    /// Registers a route.
    pub fn register(&mut self, route: Route) -> Result<(), RouteError> {
        if route.route_id == 0 || route.src_station_id == 0 || route.dst_station_id == 0 {
            return Err(RouteError::InvalidArgument);
        }
        if route.duration_ticks == 0 || route.capacity_units == 0 {
            return Err(RouteError::InvalidData);
        }
        self.routes.insert(route)?;
        Ok(())
    }

    /// Looks up a route.
    #[must_use]
    pub fn get(&self, route_id: RouteId) -> Option<&Route> {
        self.routes.get(route_id)
    }

    /// Number of registered routes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    /// True when no routes are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Iterates routes in ascending id order.
    pub fn iter(&self) -> impl Iterator<Item = &Route> {
        self.routes.iter()
    }

    /// Resets the graph to empty (save-load entry point).
    pub fn reset(&mut self) {
        self.routes.clear();
    }

    /// Canonical state blob: count, then 40-byte route records in id order.
    pub fn encode_blob(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&(self.routes.len() as u32).to_le_bytes());
        for route in self.routes.iter() {
            out.extend_from_slice(&route.route_id.to_le_bytes());
            out.extend_from_slice(&route.src_station_id.to_le_bytes());
            out.extend_from_slice(&route.dst_station_id.to_le_bytes());
            out.extend_from_slice(&route.duration_ticks.to_le_bytes());
            out.extend_from_slice(&route.capacity_units.to_le_bytes());
        }
    }
}
