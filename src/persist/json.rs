//! JSON-backed jar store.
//!
//! `JsonJarStore` persists **all** jars in a single JSON file on disk. It
//! implements the [`JarStore`] trait and returns jars wrapped in
//! [`PersistentJar`], so that **every mutation** to a jar triggers a snapshot
//! write back to this store.
//!
//! ### Design
//! - One file for all jars (`JarStoreFile { jars: HashMap<JarId, MemoryJar> }`).
//! - In-memory cache: `jars: RwLock<HashMap<JarId, JarHandle>>` for quick reuse.
//! - The store keeps a self handle (`store_self`) so the persistent jars can
//!   call back into `persist_snapshot`.
//!
//! ### I/O characteristics & caveats
//! - `persist_snapshot` and `remove_jar` **read then rewrite** the entire
//!   JSON file. For large datasets, use the SQLite-backed store.
//! - Read-modify-write sequences serialize behind a store-level lock, so
//!   concurrent persists through one store cannot drop each other's jars.
//!   File writes themselves are not atomic against other processes.
//! - I/O and serialization failures are logged and leave the previous file
//!   contents in place; an unreadable file hydrates as empty.

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard, RwLock};

use serde::{Deserialize, Serialize};

use crate::jar::{jar_handle, Jar, JarHandle, JarId, MemoryJar};
use crate::persist::{JarStore, JarStoreHandle, PersistentJar};

/// On-disk representation of all jars.
#[derive(Debug, Default, Serialize, Deserialize)]
struct JarStoreFile {
    jars: HashMap<JarId, MemoryJar>,
}

/// A JSON-based jar store that persists jars across sessions.
///
/// The store caches minted jars in memory and loads/saves them to a single
/// JSON file. Jars returned by this store are wrapped in [`PersistentJar`],
/// so writes automatically trigger persistence to disk.
pub struct JsonJarStore {
    /// Path to the JSON file where jars are stored.
    path: PathBuf,

    /// Minted jars per id.
    jars: RwLock<HashMap<JarId, JarHandle>>,

    /// Self handle, so `PersistentJar` can call back into this store.
    ///
    /// Initialized in [`new`](Self::new) and read-only thereafter.
    store_self: RwLock<Option<JarStoreHandle>>,

    /// Serializes read-modify-write passes over the file.
    file_lock: Mutex<()>,
}

impl JsonJarStore {
    /// Creates (or opens) a JSON jar store at `path`.
    ///
    /// If the file does not exist, an empty structure is written to disk.
    pub fn new(path: PathBuf) -> Arc<Self> {
        if !path.exists() {
            match serde_json::to_vec(&JarStoreFile::default()) {
                Ok(bytes) => {
                    if let Err(e) = fs::write(&path, bytes) {
                        log::warn!("Cannot seed jar store file {:?}: {}", path, e);
                    }
                }
                Err(e) => log::warn!("Cannot serialize empty jar store: {}", e),
            }
        }

        let store = Arc::new(Self {
            path,
            jars: RwLock::new(HashMap::new()),
            store_self: RwLock::new(None),
            file_lock: Mutex::new(()),
        });

        {
            let mut self_ref = store.store_self.write().unwrap();
            *self_ref = Some(store.clone() as JarStoreHandle);
        }

        store
    }

    /// Takes the file lock for the duration of a read-modify-write pass.
    fn lock_file(&self) -> MutexGuard<'_, ()> {
        self.file_lock.lock().unwrap()
    }

    /// Loads and deserializes the full jar store file. An unreadable or
    /// corrupt file yields an empty structure. Callers that write the file
    /// back must hold the guard from [`Self::lock_file`] across both steps.
    fn load_file(&self) -> JarStoreFile {
        match fs::read_to_string(&self.path) {
            Ok(contents) => serde_json::from_str(&contents).unwrap_or_else(|e| {
                log::warn!("Corrupt jar store file {:?}: {}", self.path, e);
                JarStoreFile::default()
            }),
            Err(e) => {
                log::warn!("Cannot read jar store file {:?}: {}", self.path, e);
                JarStoreFile::default()
            }
        }
    }

    /// Serializes and writes the full jar store file (pretty-printed).
    fn save_file(&self, store_file: &JarStoreFile) {
        match serde_json::to_string_pretty(store_file) {
            Ok(contents) => {
                if let Err(e) = fs::write(&self.path, contents) {
                    log::error!("Cannot write jar store file {:?}: {}", self.path, e);
                }
            }
            Err(e) => log::error!("Cannot serialize jar store: {}", e),
        }
    }
}

impl JarStore for JsonJarStore {
    /// Returns the jar handle for `jar_id`, creating it if needed.
    ///
    /// Behavior:
    /// - A cached jar is returned as-is.
    /// - Otherwise a serialized jar is loaded from disk (if present) or an
    ///   empty [`MemoryJar`] for `origin` is created.
    /// - Either way the jar is wrapped in a [`PersistentJar`] bound to this
    ///   store so that subsequent mutations persist automatically.
    fn jar_for(&self, jar_id: JarId, origin: &str) -> Option<JarHandle> {
        {
            // Fast path: already in memory
            let jars = self.jars.read().unwrap();
            if let Some(jar) = jars.get(&jar_id) {
                return Some(jar.clone());
            }
        }

        // Load from disk
        let mut file = {
            let _guard = self.lock_file();
            self.load_file()
        };
        let jar = file
            .jars
            .remove(&jar_id)
            .unwrap_or_else(|| MemoryJar::new(origin));
        let inner = jar_handle(jar);

        let store_ref = self.store_self.read().unwrap();
        let store = store_ref.as_ref()?.clone();

        let persistent = jar_handle(PersistentJar::new(jar_id, inner, store));
        self.jars.write().unwrap().insert(jar_id, persistent.clone());

        Some(persistent)
    }

    /// Persists a snapshot of one jar to disk.
    ///
    /// Called by [`PersistentJar`] after each mutation. Reads the current
    /// file, replaces the jar entry, and writes the file back.
    fn persist_snapshot(&self, jar_id: JarId, snapshot: &MemoryJar) {
        let _guard = self.lock_file();
        let mut store_file = self.load_file();
        store_file.jars.insert(jar_id, snapshot.clone());
        self.save_file(&store_file);
    }

    /// Removes `jar_id` from both the in-memory cache and the on-disk file.
    fn remove_jar(&self, jar_id: JarId) {
        self.jars.write().unwrap().remove(&jar_id);

        let _guard = self.lock_file();
        let mut file = self.load_file();
        file.jars.remove(&jar_id);
        self.save_file(&file);
    }

    /// Persists **all** cached jars to disk by snapshotting them.
    ///
    /// Only jars of type [`PersistentJar`] wrapping a [`MemoryJar`] are
    /// snapshotted, which keeps the on-disk format stable.
    fn persist_all(&self) {
        let jars = self.jars.read().unwrap();

        let _guard = self.lock_file();
        let mut file = self.load_file();
        for (jar_id, jar) in jars.iter() {
            if let Ok(jar) = jar.read() {
                if let Some(persist) = jar.as_any().downcast_ref::<PersistentJar>() {
                    if let Ok(inner) = persist.inner.read() {
                        if let Some(memory) = inner.as_any().downcast_ref::<MemoryJar>() {
                            file.jars.insert(*jar_id, memory.clone());
                        }
                    }
                }
            }
        }

        self.save_file(&file);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::ReadContext;
    use crate::jar::SetOptions;

    fn ctx() -> ReadContext {
        ReadContext::new("example.com", "/")
    }

    #[test]
    fn mutations_survive_a_store_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("jars.json");
        let id = JarId::new();

        {
            let store = JsonJarStore::new(path.clone());
            let jar = store.jar_for(id, "example.com").unwrap();
            jar.write()
                .unwrap()
                .set("lang", "en", SetOptions::default())
                .unwrap();
        }

        let store = JsonJarStore::new(path);
        let jar = store.jar_for(id, "example.com").unwrap();
        assert_eq!(jar.read().unwrap().get("lang", &ctx()).as_deref(), Some("en"));
        assert_eq!(jar.read().unwrap().origin(), "example.com");
    }

    #[test]
    fn remove_jar_forgets_persisted_state() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("jars.json");
        let id = JarId::new();

        let store = JsonJarStore::new(path.clone());
        let jar = store.jar_for(id, "example.com").unwrap();
        jar.write()
            .unwrap()
            .set("lang", "en", SetOptions::default())
            .unwrap();

        store.remove_jar(id);

        let store = JsonJarStore::new(path);
        let jar = store.jar_for(id, "example.com").unwrap();
        assert_eq!(jar.read().unwrap().get("lang", &ctx()), None);
    }

    #[test]
    fn same_id_returns_same_handle() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonJarStore::new(dir.path().join("jars.json"));
        let id = JarId::new();

        let a = store.jar_for(id, "example.com").unwrap();
        let b = store.jar_for(id, "example.com").unwrap();
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn different_ids_get_different_handles() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonJarStore::new(dir.path().join("jars.json"));

        let a = store.jar_for(JarId::new(), "example.com").unwrap();
        let b = store.jar_for(JarId::new(), "example.com").unwrap();
        assert!(!Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn concurrent_persists_do_not_drop_each_other() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("jars.json");
        let id1 = JarId::new();
        let id2 = JarId::new();

        {
            let store = JsonJarStore::new(path.clone());
            let jar1 = store.jar_for(id1, "one.example.com").unwrap();
            let jar2 = store.jar_for(id2, "two.example.com").unwrap();

            // Each mutation triggers a whole-file read-modify-write; racing
            // them from two threads must not lose either jar's records.
            let t1 = std::thread::spawn(move || {
                for i in 0..20 {
                    jar1.write()
                        .unwrap()
                        .set(&format!("k{}", i), "1", SetOptions::default())
                        .unwrap();
                }
            });
            let t2 = std::thread::spawn(move || {
                for i in 0..20 {
                    jar2.write()
                        .unwrap()
                        .set(&format!("k{}", i), "2", SetOptions::default())
                        .unwrap();
                }
            });
            t1.join().unwrap();
            t2.join().unwrap();
        }

        let store = JsonJarStore::new(path);
        let jar1 = store.jar_for(id1, "one.example.com").unwrap();
        let jar2 = store.jar_for(id2, "two.example.com").unwrap();
        let ctx1 = ReadContext::new("one.example.com", "/");
        let ctx2 = ReadContext::new("two.example.com", "/");
        for i in 0..20 {
            let name = format!("k{}", i);
            assert_eq!(jar1.read().unwrap().get(&name, &ctx1).as_deref(), Some("1"));
            assert_eq!(jar2.read().unwrap().get(&name, &ctx2).as_deref(), Some("2"));
        }
    }

    #[test]
    fn corrupt_file_hydrates_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("jars.json");
        fs::write(&path, b"not json at all").unwrap();

        let store = JsonJarStore::new(path);
        let jar = store.jar_for(JarId::new(), "example.com").unwrap();
        assert!(jar.read().unwrap().enumerate(&ctx()).is_empty());
    }

    #[test]
    fn persist_all_flushes_cached_jars() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("jars.json");
        let id = JarId::new();

        let store = JsonJarStore::new(path.clone());
        let jar = store.jar_for(id, "example.com").unwrap();
        jar.write()
            .unwrap()
            .set("a", "1", SetOptions::default())
            .unwrap();

        // Blow the file away; persist_all must restore the cached state.
        fs::write(&path, b"{\"jars\":{}}").unwrap();
        store.persist_all();

        let reopened = JsonJarStore::new(path);
        let jar = reopened.jar_for(id, "example.com").unwrap();
        assert_eq!(jar.read().unwrap().get("a", &ctx()).as_deref(), Some("1"));
    }
}
