use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::jar::{jar_handle, JarHandle, JarId, MemoryJar};
use crate::persist::JarStore;

/// Jar store without persistence: jars live only as long as the store.
pub struct InMemoryJarStore {
    /// Minted jars per id.
    jars: RwLock<HashMap<JarId, JarHandle>>,
}

impl InMemoryJarStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            jars: RwLock::new(HashMap::new()),
        })
    }
}

impl JarStore for InMemoryJarStore {
    fn jar_for(&self, jar_id: JarId, origin: &str) -> Option<JarHandle> {
        use std::collections::hash_map::Entry;

        let mut jars = self.jars.write().unwrap();
        let handle = match jars.entry(jar_id) {
            Entry::Occupied(o) => o.get().clone(),
            Entry::Vacant(v) => {
                let handle = jar_handle(MemoryJar::new(origin));
                v.insert(handle.clone());
                handle
            }
        };
        Some(handle)
    }

    fn persist_snapshot(&self, _jar_id: JarId, _snapshot: &MemoryJar) {}

    fn remove_jar(&self, jar_id: JarId) {
        self.jars.write().unwrap().remove(&jar_id);
    }

    fn persist_all(&self) {}
}
