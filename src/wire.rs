//! Wire format: serialization and parsing.
//!
//! The wire form is a semicolon-and-space delimited list of `name=value`
//! tokens. A single serialized record carries its non-default attributes
//! after the `name=value` token, in the fixed order `expires`, `path`,
//! `domain`, `secure`, `samesite`:
//!
//! ```text
//! token=abc123; expires=Wed, 31 Dec 2025 23:59:59 +0000; path=/account; secure; samesite=strict
//! ```
//!
//! The bulk form joins `name=value` pairs only; attributes are write-only
//! metadata and are never echoed on enumeration:
//!
//! ```text
//! username=Sarina; userId=101; lang=en
//! ```
//!
//! Values are percent-encoded for `%`, `;`, `=`, spaces and ASCII controls so
//! the round trip is bit-exact. Names and attribute tokens are never encoded;
//! name legality is enforced at write time instead.

use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, CONTROLS};
use time::format_description::well_known::Rfc2822;

use crate::errors::JarError;
use crate::record::{Record, SameSite};

/// Characters escaped in values. `%` must be in the set or decoding a value
/// that legitimately contains `%` would not round-trip.
const VALUE_ESCAPE: &AsciiSet = &CONTROLS.add(b' ').add(b';').add(b'=').add(b'%');

/// One token that failed to parse, with the reason. Collected by
/// [`parse_all`] instead of aborting the whole parse.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MalformedToken {
    pub token: String,
    pub error: JarError,
}

/// Outcome of a bulk parse: the usable pairs plus per-token failures.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WireParse {
    pub pairs: Vec<(String, String)>,
    pub malformed: Vec<MalformedToken>,
}

/// Serializes a single record with its non-default attributes.
pub fn serialize_one(record: &Record) -> String {
    let mut out = format!(
        "{}={}",
        record.name,
        utf8_percent_encode(&record.value, VALUE_ESCAPE)
    );

    if let Some(at) = record.expires {
        // Rfc2822 formatting only fails for years outside 0..=9999.
        if let Ok(stamp) = at.format(&Rfc2822) {
            out.push_str("; expires=");
            out.push_str(&stamp);
        }
    }
    if record.path != "/" {
        out.push_str("; path=");
        out.push_str(&record.path);
    }
    if let Some(domain) = &record.domain {
        out.push_str("; domain=");
        out.push_str(domain);
    }
    if record.secure {
        out.push_str("; secure");
    }
    if record.same_site != SameSite::Lax {
        out.push_str("; samesite=");
        out.push_str(record.same_site.as_wire_str());
    }

    out
}

/// Serialized size of a record, as counted against the per-domain ceiling.
pub fn serialized_len(record: &Record) -> usize {
    serialize_one(record).len()
}

/// Joins `name=value` pairs with `"; "`. This is the bulk-read view: no
/// attributes, values percent-encoded.
pub fn serialize_all<'a, I>(pairs: I) -> String
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    pairs
        .into_iter()
        .map(|(name, value)| format!("{}={}", name, utf8_percent_encode(value, VALUE_ESCAPE)))
        .collect::<Vec<_>>()
        .join("; ")
}

/// Parses one `name=value` token, percent-decoding the value.
///
/// Fails with [`JarError::MalformedRecord`] when the token has no `=`, an
/// empty name, or a value that does not decode to valid UTF-8.
pub fn parse_one(token: &str) -> Result<(String, String), JarError> {
    let token = token.trim();
    let (name, raw_value) = token
        .split_once('=')
        .ok_or_else(|| JarError::MalformedRecord(token.to_string()))?;

    if name.is_empty() {
        return Err(JarError::MalformedRecord(token.to_string()));
    }

    let value = percent_decode_str(raw_value)
        .decode_utf8()
        .map_err(|_| JarError::MalformedRecord(token.to_string()))?;

    Ok((name.to_string(), value.into_owned()))
}

/// Parses a full wire string, splitting on `"; "`.
///
/// Tokens that fail [`parse_one`] are collected in
/// [`WireParse::malformed`] without aborting the rest of the parse.
pub fn parse_all(wire: &str) -> WireParse {
    let mut outcome = WireParse::default();
    if wire.trim().is_empty() {
        return outcome;
    }

    for token in wire.split("; ") {
        match parse_one(token) {
            Ok(pair) => outcome.pairs.push(pair),
            Err(error) => {
                log::warn!("Skipping malformed wire token {:?}: {}", token, error);
                outcome.malformed.push(MalformedToken {
                    token: token.to_string(),
                    error,
                });
            }
        }
    }

    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    fn record(name: &str, value: &str) -> Record {
        Record {
            name: name.to_string(),
            value: value.to_string(),
            path: "/".to_string(),
            domain: None,
            origin: "example.com".to_string(),
            secure: false,
            expires: None,
            same_site: SameSite::default(),
        }
    }

    #[test]
    fn default_attributes_are_omitted() {
        assert_eq!(serialize_one(&record("lang", "en")), "lang=en");
    }

    #[test]
    fn attributes_emit_in_fixed_order() {
        let mut r = record("token", "abc123");
        r.expires = Some(datetime!(2025-12-31 23:59:59 UTC));
        r.path = "/app".to_string();
        r.domain = Some("example.com".to_string());
        r.secure = true;
        r.same_site = SameSite::Strict;

        assert_eq!(
            serialize_one(&r),
            "token=abc123; expires=Wed, 31 Dec 2025 23:59:59 +0000; \
             path=/app; domain=example.com; secure; samesite=strict"
        );
    }

    #[test]
    fn reserved_characters_round_trip() {
        for value in ["a;b", "a=b", "dark theme", "50%", "; = %", "naïve"] {
            let token = serialize_one(&record("pref", value));
            let (name, decoded) = parse_one(&token).unwrap();
            assert_eq!(name, "pref");
            assert_eq!(decoded, value, "value {:?} did not round-trip", value);
        }
    }

    #[test]
    fn empty_value_round_trips() {
        let token = serialize_one(&record("flag", ""));
        assert_eq!(token, "flag=");
        assert_eq!(parse_one(&token).unwrap(), ("flag".into(), "".into()));
    }

    #[test]
    fn parse_one_rejects_tokens_without_separator() {
        assert!(matches!(parse_one("bad"), Err(JarError::MalformedRecord(_))));
        assert!(matches!(parse_one("=v"), Err(JarError::MalformedRecord(_))));
    }

    #[test]
    fn parse_all_collects_failures_without_aborting() {
        let outcome = parse_all("a=1; b=2; bad; c=3");
        assert_eq!(
            outcome.pairs,
            vec![
                ("a".to_string(), "1".to_string()),
                ("b".to_string(), "2".to_string()),
                ("c".to_string(), "3".to_string()),
            ]
        );
        assert_eq!(outcome.malformed.len(), 1);
        assert_eq!(outcome.malformed[0].token, "bad");
    }

    #[test]
    fn parse_all_of_empty_input_is_empty() {
        let outcome = parse_all("");
        assert!(outcome.pairs.is_empty());
        assert!(outcome.malformed.is_empty());
    }

    #[test]
    fn serialize_all_joins_pairs_only() {
        let pairs = [("username", "Sarina"), ("userId", "101"), ("lang", "en")];
        assert_eq!(
            serialize_all(pairs),
            "username=Sarina; userId=101; lang=en"
        );
    }

    #[test]
    fn serialize_all_never_echoes_attributes() {
        let mut r = record("s", "v");
        r.secure = true;
        r.same_site = SameSite::Strict;
        // Bulk form only ever sees (name, value) pairs.
        assert_eq!(serialize_all([(r.name.as_str(), r.value.as_str())]), "s=v");
    }
}
