//! Keyed stores for configuration entities.
//!
//! # Design Decisions
//! - One generic store (`ItemStore`) parameterized by entity type and an
//!   injected "construct default for id" function
//! - Route and cluster stores are type aliases with their own constructors
//! - Stores are rebuilt per snapshot; a published snapshot only exposes reads

pub mod item_store;

pub use item_store::ItemStore;

use crate::cluster::ClusterInfo;
use crate::routing::RouteInfo;

/// Routes keyed by route id.
pub type RouteStore = ItemStore<RouteInfo>;

/// Clusters keyed by cluster id.
pub type ClusterStore = ItemStore<ClusterInfo>;

impl RouteStore {
    /// Store whose `get_or_create` yields unbound routes.
    pub fn empty() -> Self {
        ItemStore::new(|id: &String| RouteInfo::new(id.clone()))
    }
}

impl ClusterStore {
    /// Store whose `get_or_create` yields empty clusters.
    pub fn empty() -> Self {
        ItemStore::new(|id: &String| ClusterInfo::new(id.clone()))
    }
}
