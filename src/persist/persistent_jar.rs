use std::any::Any;

use crate::context::ReadContext;
use crate::errors::JarError;
use crate::jar::{Jar, JarHandle, JarId, MemoryJar, SetOptions, WireLoadReport};
use crate::persist::JarStoreHandle;

/// A [`Jar`] decorator that persists changes after each mutation.
///
/// Transparent for reads, eager for writes: every successful mutation
/// snapshots the inner jar back into the owning store.
pub struct PersistentJar {
    /// Id this jar is addressed by in the store.
    jar_id: JarId,
    /// Inner jar that holds the actual record state.
    pub inner: JarHandle,
    /// Handle to the store responsible for persistence.
    store_handle: JarStoreHandle,
}

impl PersistentJar {
    /// Creates a persistence-enabled wrapper around an existing jar.
    pub fn new(jar_id: JarId, inner: JarHandle, store_handle: JarStoreHandle) -> Self {
        Self {
            jar_id,
            inner,
            store_handle,
        }
    }

    /// Snapshots the inner jar and persists it to the backing store.
    ///
    /// The inner jar must be a [`MemoryJar`]; anything else cannot be
    /// snapshotted and is skipped with a warning.
    fn persist(&self) {
        let snapshot = {
            let inner = self.inner.read().unwrap();
            match inner.as_any().downcast_ref::<MemoryJar>() {
                Some(jar) => jar.clone(),
                None => {
                    log::warn!("Jar[{}]: inner jar is not snapshottable, skipping persist", self.jar_id);
                    return;
                }
            }
        };

        self.store_handle.persist_snapshot(self.jar_id, &snapshot);
    }
}

impl Jar for PersistentJar {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    /// Upserts through the inner jar, then persists on success.
    fn set(&mut self, name: &str, value: &str, options: SetOptions) -> Result<(), JarError> {
        self.inner.write().unwrap().set(name, value, options)?;
        self.persist();
        Ok(())
    }

    fn get(&self, name: &str, ctx: &ReadContext) -> Option<String> {
        self.inner.read().unwrap().get(name, ctx)
    }

    fn delete(&mut self, name: &str, path: &str, domain: Option<&str>) {
        self.inner.write().unwrap().delete(name, path, domain);
        self.persist();
    }

    fn enumerate(&self, ctx: &ReadContext) -> Vec<(String, String)> {
        self.inner.read().unwrap().enumerate(ctx)
    }

    fn enumerate_wire(&self, ctx: &ReadContext) -> String {
        self.inner.read().unwrap().enumerate_wire(ctx)
    }

    fn load_from_wire(&mut self, wire: &str) -> WireLoadReport {
        let report = self.inner.write().unwrap().load_from_wire(wire);
        self.persist();
        report
    }

    fn clear_session(&mut self) {
        self.inner.write().unwrap().clear_session();
        self.persist();
    }

    fn clear(&mut self) {
        self.inner.write().unwrap().clear();
        self.persist();
    }

    fn origin(&self) -> String {
        self.inner.read().unwrap().origin()
    }
}
