//! Read-only access to the storefront state (catalog and cart).
//!
//! The UI never reaches into global state: it holds a `StoreSource` and asks
//! it for the current snapshot, polling for changes between events.

use std::fs;
use std::io;
use std::path::PathBuf;
use std::time::SystemTime;

use serde::Deserialize;
use thiserror::Error;

use crate::catalog::{Catalog, Product, ProductId};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to read store file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to parse store file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CartItem {
    #[serde(alias = "productId", alias = "id")]
    pub product_id: ProductId,
    #[serde(default = "default_quantity")]
    pub quantity: u32,
}

fn default_quantity() -> u32 {
    1
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Cart {
    items: Vec<CartItem>,
}

impl Cart {
    pub fn new(items: Vec<CartItem>) -> Self {
        Self { items }
    }

    /// Number of cart lines, as shown on the cart badge.
    pub fn count_items(&self) -> usize {
        self.items.len()
    }
}

#[derive(Debug, Clone, Default)]
pub struct StoreSnapshot {
    pub catalog: Catalog,
    pub cart: Cart,
}

impl StoreSnapshot {
    pub fn new(catalog: Catalog, cart: Cart) -> Self {
        Self { catalog, cart }
    }
}

/// Polling interface over externally owned application state.
pub trait StoreSource {
    /// The most recently loaded snapshot.
    fn snapshot(&self) -> StoreSnapshot;

    /// Reload if the backing state changed. Returns whether the snapshot
    /// changed. On error the previous snapshot stays current.
    fn poll(&mut self) -> Result<bool, StoreError>;
}

// =============================================================================
// State file format
// =============================================================================

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum StateFile {
    Bare(Vec<Product>),
    Items {
        items: Vec<Product>,
    },
    Full {
        products: Items<Product>,
        #[serde(default)]
        cart: Items<CartItem>,
    },
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Items<T> {
    Wrapped { items: Vec<T> },
    List(Vec<T>),
}

impl<T> Default for Items<T> {
    fn default() -> Self {
        Items::List(Vec::new())
    }
}

impl<T> Items<T> {
    fn into_vec(self) -> Vec<T> {
        match self {
            Items::Wrapped { items } => items,
            Items::List(items) => items,
        }
    }
}

fn parse_state(raw: &str) -> Result<(Vec<Product>, Vec<CartItem>), serde_json::Error> {
    let state: StateFile = serde_json::from_str(raw)?;
    Ok(match state {
        StateFile::Bare(items) => (items, Vec::new()),
        StateFile::Items { items } => (items, Vec::new()),
        StateFile::Full { products, cart } => (products.into_vec(), cart.into_vec()),
    })
}

// =============================================================================
// Sources
// =============================================================================

/// Fixed in-memory state. `replace` publishes a new snapshot.
#[cfg(test)]
#[derive(Debug, Clone, Default)]
pub struct StaticStore {
    snapshot: StoreSnapshot,
    dirty: bool,
}

#[cfg(test)]
impl StaticStore {
    pub fn new(products: Vec<Product>, cart: Cart) -> Self {
        Self {
            snapshot: StoreSnapshot::new(Catalog::new(products, 1), cart),
            dirty: false,
        }
    }

    pub fn replace(&mut self, products: Vec<Product>, cart: Cart) {
        let revision = self.snapshot.catalog.revision() + 1;
        self.snapshot = StoreSnapshot::new(Catalog::new(products, revision), cart);
        self.dirty = true;
    }
}

#[cfg(test)]
impl StoreSource for StaticStore {
    fn snapshot(&self) -> StoreSnapshot {
        self.snapshot.clone()
    }

    fn poll(&mut self) -> Result<bool, StoreError> {
        Ok(std::mem::take(&mut self.dirty))
    }
}

/// State backed by a JSON file, reloaded when its modification time changes.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    snapshot: StoreSnapshot,
    loaded_mtime: Option<SystemTime>,
    present: bool,
}

impl FileStore {
    /// A store that has not been read yet. Its snapshot is empty until the
    /// first successful `poll`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            snapshot: StoreSnapshot::default(),
            loaded_mtime: None,
            present: false,
        }
    }

    /// Open the store and perform the initial load. A missing file is an
    /// empty store.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let mut store = Self::new(path);
        store.poll()?;
        Ok(store)
    }

    fn load(&mut self, mtime: Option<SystemTime>) -> Result<(), StoreError> {
        let raw = fs::read_to_string(&self.path).map_err(|source| StoreError::Read {
            path: self.path.clone(),
            source,
        })?;
        let (products, cart) = parse_state(&raw).map_err(|source| StoreError::Parse {
            path: self.path.clone(),
            source,
        })?;

        let revision = self.snapshot.catalog.revision() + 1;
        tracing::info!(
            path = %self.path.display(),
            products = products.len(),
            cart_items = cart.len(),
            revision,
            "loaded store"
        );
        self.snapshot = StoreSnapshot::new(Catalog::new(products, revision), Cart::new(cart));
        self.loaded_mtime = mtime;
        self.present = true;
        Ok(())
    }
}

impl StoreSource for FileStore {
    fn snapshot(&self) -> StoreSnapshot {
        self.snapshot.clone()
    }

    fn poll(&mut self) -> Result<bool, StoreError> {
        let metadata = match fs::metadata(&self.path) {
            Ok(metadata) => metadata,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                if !self.present && self.snapshot.catalog.revision() > 0 {
                    return Ok(false);
                }
                tracing::info!(path = %self.path.display(), "store file not found, using empty catalog");
                let revision = self.snapshot.catalog.revision() + 1;
                self.snapshot = StoreSnapshot::new(Catalog::new(Vec::new(), revision), Cart::default());
                self.loaded_mtime = None;
                self.present = false;
                return Ok(true);
            }
            Err(source) => {
                return Err(StoreError::Read {
                    path: self.path.clone(),
                    source,
                })
            }
        };

        let mtime = metadata.modified().ok();
        if self.present && mtime.is_some() && mtime == self.loaded_mtime {
            return Ok(false);
        }

        self.load(mtime)?;
        Ok(true)
    }
}
