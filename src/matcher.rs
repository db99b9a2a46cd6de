//! Visibility rules: which records a given read context may see, and which
//! single record wins when several visible ones share a name.

use crate::context::ReadContext;
use crate::record::{Record, SameSite};

/// Whether `record` is visible to `ctx`. Expiry is not checked here; callers
/// feed this only records that are live at their "now".
pub fn record_matches(record: &Record, ctx: &ReadContext) -> bool {
    if !path_matches(&record.path, &ctx.path) {
        return false;
    }
    if !domain_matches(record, &ctx.domain) {
        return false;
    }
    if record.secure && !ctx.is_secure {
        return false;
    }
    same_site_allows(record.same_site, ctx)
}

/// Segment-boundary prefix test. `"/app"` matches `"/app"` and `"/app/x"`
/// but never `"/application"`; `"/"` matches everything.
pub fn path_matches(record_path: &str, request_path: &str) -> bool {
    if record_path == request_path {
        return true;
    }
    if !request_path.starts_with(record_path) {
        return false;
    }
    if record_path.ends_with('/') {
        return true;
    }
    request_path.as_bytes().get(record_path.len()) == Some(&b'/')
}

/// Host-only records require the exact creating origin; records with a
/// domain attribute match it or any subdomain of it.
fn domain_matches(record: &Record, request_domain: &str) -> bool {
    match &record.domain {
        None => request_domain == record.origin,
        Some(domain) => {
            request_domain == domain || request_domain.ends_with(&format!(".{}", domain))
        }
    }
}

fn same_site_allows(policy: SameSite, ctx: &ReadContext) -> bool {
    match policy {
        SameSite::Strict => ctx.is_same_site_peer,
        SameSite::Lax => ctx.is_same_site_peer || ctx.is_top_level_read,
        // None records were forced secure at write time.
        SameSite::None => true,
    }
}

/// Specificity tie-break for duplicate names: longest path wins, then a
/// record with a domain attribute beats one without. Ties beyond that keep
/// the earliest (insertion-order) record.
pub fn select_winner<'a, I>(candidates: I) -> Option<&'a Record>
where
    I: IntoIterator<Item = &'a Record>,
{
    candidates.into_iter().fold(None, |best, candidate| match best {
        None => Some(candidate),
        Some(current) => {
            let better = (candidate.path.len(), candidate.domain.is_some())
                > (current.path.len(), current.domain.is_some());
            if better {
                Some(candidate)
            } else {
                Some(current)
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(path: &str, domain: Option<&str>) -> Record {
        Record {
            name: "a".to_string(),
            value: "v".to_string(),
            path: path.to_string(),
            domain: domain.map(str::to_string),
            origin: "app.example.com".to_string(),
            secure: false,
            expires: None,
            same_site: SameSite::default(),
        }
    }

    fn ctx() -> ReadContext {
        ReadContext::new("app.example.com", "/")
    }

    #[test]
    fn path_prefix_respects_segment_boundaries() {
        assert!(path_matches("/", "/"));
        assert!(path_matches("/", "/anything"));
        assert!(path_matches("/app", "/app"));
        assert!(path_matches("/app", "/app/x"));
        assert!(path_matches("/app/", "/app/x"));
        assert!(!path_matches("/app", "/application"));
        assert!(!path_matches("/app/x", "/app"));
    }

    #[test]
    fn host_only_records_require_the_exact_origin() {
        let r = record("/", None);
        assert!(record_matches(&r, &ReadContext::new("app.example.com", "/")));
        assert!(!record_matches(&r, &ReadContext::new("example.com", "/")));
        assert!(!record_matches(&r, &ReadContext::new("sub.app.example.com", "/")));
    }

    #[test]
    fn domain_records_match_subdomains_by_suffix() {
        let r = record("/", Some("example.com"));
        assert!(record_matches(&r, &ReadContext::new("example.com", "/")));
        assert!(record_matches(&r, &ReadContext::new("app.example.com", "/")));
        // Suffix must sit on a label boundary.
        assert!(!record_matches(&r, &ReadContext::new("notexample.com", "/")));
    }

    #[test]
    fn secure_records_are_invisible_to_insecure_reads() {
        let mut r = record("/", None);
        r.secure = true;
        assert!(!record_matches(&r, &ctx().secure(false)));
        assert!(record_matches(&r, &ctx().secure(true)));
    }

    #[test]
    fn same_site_gate_matrix() {
        let strict = |mut r: Record| {
            r.same_site = SameSite::Strict;
            r
        };
        let none = |mut r: Record| {
            r.same_site = SameSite::None;
            r.secure = true;
            r
        };

        let peer = ctx();
        let cross_top = ctx().same_site_peer(false).top_level_read(true);
        let cross_sub = ctx().same_site_peer(false).top_level_read(false);

        let s = strict(record("/", None));
        assert!(record_matches(&s, &peer));
        assert!(!record_matches(&s, &cross_top));
        assert!(!record_matches(&s, &cross_sub));

        let lax = record("/", None);
        assert!(record_matches(&lax, &peer));
        assert!(record_matches(&lax, &cross_top));
        assert!(!record_matches(&lax, &cross_sub));

        let n = none(record("/", None));
        assert!(record_matches(&n, &peer.clone().secure(true)));
        assert!(record_matches(&n, &cross_sub.clone().secure(true)));
    }

    #[test]
    fn longest_path_wins_then_domain_presence() {
        let shallow = record("/x", None);
        let deep = record("/x/y", None);
        let with_domain = record("/x", Some("example.com"));

        let winner = select_winner([&shallow, &deep, &with_domain]).unwrap();
        assert_eq!(winner.path, "/x/y");

        let winner = select_winner([&shallow, &with_domain]).unwrap();
        assert!(winner.domain.is_some());
    }

    #[test]
    fn tie_break_keeps_insertion_order_on_full_tie() {
        let mut first = record("/x", None);
        first.value = "first".to_string();
        let mut second = record("/x", None);
        second.value = "second".to_string();

        let winner = select_winner([&first, &second]).unwrap();
        assert_eq!(winner.value, "first");
    }
}
