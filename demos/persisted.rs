//! Jars minted from a SQLite-backed store survive process restarts.
//!
//! Run with `cargo run --example persisted --features sqlite_store`.

use scopejar::{Jar, JarId, JarStore, ReadContext, SetOptions, SqliteJarStore};

fn main() {
    env_logger::init();

    let store = SqliteJarStore::new("jars.sqlite".into());
    let id = JarId::new();

    let jar = store.jar_for(id, "example.com").expect("store mints jars on demand");
    jar.write()
        .unwrap()
        .set("lang", "en", SetOptions::default())
        .unwrap();

    // Every mutation above already snapshotted to jars.sqlite; a new store
    // over the same file sees the state.
    let reopened = SqliteJarStore::new("jars.sqlite".into());
    let jar = reopened.jar_for(id, "example.com").unwrap();
    let ctx = ReadContext::new("example.com", "/");
    println!("lang = {:?}", jar.read().unwrap().get("lang", &ctx));

    store.remove_jar(id);
    reopened.remove_jar(id);
}
