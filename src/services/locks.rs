use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard, OwnedRwLockReadGuard, OwnedRwLockWriteGuard, RwLock};

/// In-process serialization of stock mutations.
///
/// Item operations hold the shared side of `gate` plus the mutex for their
/// item name; a full wipe holds the exclusive side and so waits for every
/// in-flight item operation.
///
/// In single-writer mode every item operation takes the exclusive side
/// instead, for backends that allow only one write transaction at a time.
#[derive(Clone, Default)]
pub struct ItemLocks {
    gate: Arc<RwLock<()>>,
    items: Arc<DashMap<String, Arc<Mutex<()>>>>,
    single_writer: bool,
}

enum GateGuard {
    Shared(OwnedRwLockReadGuard<()>),
    Exclusive(OwnedRwLockWriteGuard<()>),
}

/// Held for the duration of one item mutation.
///
/// Dropping it releases the item mutex, evicts the slot when no other task
/// holds or waits on it, and then releases the gate.
pub struct ItemGuard {
    item: Option<(String, OwnedMutexGuard<()>)>,
    items: Arc<DashMap<String, Arc<Mutex<()>>>>,
    _gate: GateGuard,
}

impl Drop for ItemGuard {
    fn drop(&mut self) {
        if let Some((name, guard)) = self.item.take() {
            drop(guard);
            // Slots are cloned under the shard lock, so a count of one means
            // the map holds the only reference.
            self.items
                .remove_if(&name, |_, slot| Arc::strong_count(slot) == 1);
        }
    }
}

/// Held for the duration of a full wipe.
pub struct WipeGuard {
    _gate: OwnedRwLockWriteGuard<()>,
}

impl ItemLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn single_writer() -> Self {
        Self {
            single_writer: true,
            ..Self::default()
        }
    }

    pub async fn lock_item(&self, name: &str) -> ItemGuard {
        if self.single_writer {
            let gate = self.gate.clone().write_owned().await;
            return ItemGuard {
                item: None,
                items: self.items.clone(),
                _gate: GateGuard::Exclusive(gate),
            };
        }

        let gate = self.gate.clone().read_owned().await;
        let slot = self.items.entry(name.to_string()).or_default().clone();
        let item = slot.lock_owned().await;
        ItemGuard {
            item: Some((name.to_string(), item)),
            items: self.items.clone(),
            _gate: GateGuard::Shared(gate),
        }
    }

    pub async fn lock_all(&self) -> WipeGuard {
        WipeGuard {
            _gate: self.gate.clone().write_owned().await,
        }
    }

    pub fn tracked_items(&self) -> usize {
        self.items.len()
    }
}
