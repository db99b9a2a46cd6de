//! Walkthrough of the jar API: set/get/delete, scoping, and the wire format.
//!
//! Run with `cargo run --example basic` (set `RUST_LOG=debug` to watch the
//! jar log its mutations).

use scopejar::{Jar, MemoryJar, ReadContext, SameSite, SetOptions};
use time::{Duration, OffsetDateTime};

fn main() {
    env_logger::init();

    let mut jar = MemoryJar::new("app.example.com");

    jar.set("username", "Sarina", SetOptions::default()).unwrap();
    jar.set("userId", "101", SetOptions::default()).unwrap();
    jar.set(
        "token",
        "abc123",
        SetOptions::default()
            .expires(OffsetDateTime::now_utc() + Duration::days(30))
            .secure(true)
            .same_site(SameSite::Strict),
    )
    .unwrap();
    jar.set("pref", "Dark Theme", SetOptions::default().path("/settings"))
        .unwrap();

    let ctx = ReadContext::new("app.example.com", "/");
    println!("bulk view:      {}", jar.enumerate_wire(&ctx));

    let secure_settings = ReadContext::new("app.example.com", "/settings/ui").secure(true);
    println!("secure view:    {}", jar.enumerate_wire(&secure_settings));

    // Same name, different scopes: the most specific record wins.
    jar.set("a", "1", SetOptions::default().path("/x")).unwrap();
    jar.set("a", "2", SetOptions::default().path("/x/y")).unwrap();
    let deep = ReadContext::new("app.example.com", "/x/y/z");
    println!("a at /x/y/z:    {:?}", jar.get("a", &deep));

    jar.delete("username", "/", None);
    println!("after delete:   {}", jar.enumerate_wire(&ctx));

    // Hydrate a fresh jar from a wire snapshot; bad tokens are reported.
    let mut restored = MemoryJar::new("app.example.com");
    let report = restored.load_from_wire("lang=en; country=India; bad");
    println!(
        "hydrated {} records, skipped {:?}",
        report.loaded,
        report.skipped.iter().map(|t| t.token.as_str()).collect::<Vec<_>>()
    );
}
