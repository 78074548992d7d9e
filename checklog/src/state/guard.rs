use std::ops::{Deref, DerefMut};

use super::OffsetStore;

/// Saves the wrapped store exactly once, either on `finish` or when dropped.
///
/// Dropping covers early returns and unwinding out of a scan, so a run that got
/// halfway still persists the offsets it recorded.
#[derive(Debug)]
pub struct PersistGuard<'a> {
    store: &'a mut OffsetStore,
    saved: bool,
}

impl<'a> PersistGuard<'a> {
    pub fn new(store: &'a mut OffsetStore) -> Self {
        Self {
            store,
            saved: false,
        }
    }

    /// Saves now and returns whether the save succeeded
    pub fn finish(mut self) -> bool {
        self.persist()
    }

    fn persist(&mut self) -> bool {
        if self.saved {
            return true;
        }
        self.saved = true;
        self.store.save()
    }
}

impl Deref for PersistGuard<'_> {
    type Target = OffsetStore;

    fn deref(&self) -> &Self::Target {
        self.store
    }
}

impl DerefMut for PersistGuard<'_> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.store
    }
}

impl Drop for PersistGuard<'_> {
    fn drop(&mut self) {
        self.persist();
    }
}
