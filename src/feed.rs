//! # Feed identifiers
//! The closed set of named over/under feeds and the normalization applied to
//! incoming feed names before lookup. Anything outside this set is never
//! stored; callers get a rejection instead.

use serde::{Deserialize, Serialize};

/// The fixed feed set, known at startup and never extended at runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Feed {
    Asn,
    Pup,
    Backup,
    Prst,
}

impl Feed {
    /// All feeds, in the order they appear in status payloads.
    pub const ALL: [Feed; 4] = [Feed::Asn, Feed::Pup, Feed::Backup, Feed::Prst];

    /// Canonical uppercase label as used in JSON keys and event records.
    pub fn label(self) -> &'static str {
        match self {
            Feed::Asn => "ASN",
            Feed::Pup => "PUP",
            Feed::Backup => "BACKUP",
            Feed::Prst => "PRST",
        }
    }

    /// Lowercase path segment used by the overlay routes.
    pub fn slug(self) -> &'static str {
        match self {
            Feed::Asn => "asn",
            Feed::Pup => "pup",
            Feed::Backup => "backup",
            Feed::Prst => "prst",
        }
    }

    /// Normalize a raw feed name: trim surrounding whitespace, uppercase.
    /// This is the only transformation applied to producer input.
    pub fn normalize(raw: &str) -> String {
        raw.trim().to_uppercase()
    }

    /// Look up an already-normalized name in the fixed set.
    pub fn from_normalized(name: &str) -> Option<Feed> {
        Feed::ALL.iter().copied().find(|f| f.label() == name)
    }

    /// Look up a lowercase overlay slug (exact match).
    pub fn from_slug(slug: &str) -> Option<Feed> {
        Feed::ALL.iter().copied().find(|f| f.slug() == slug)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_trims_and_uppercases() {
        assert_eq!(Feed::normalize(" asn "), "ASN");
        assert_eq!(Feed::normalize("\tPrSt\n"), "PRST");
        assert_eq!(Feed::normalize(""), "");
    }

    #[test]
    fn normalize_is_idempotent() {
        let once = Feed::normalize("  backup ");
        assert_eq!(Feed::normalize(&once), once);
    }

    #[test]
    fn lookup_covers_the_fixed_set_and_nothing_else() {
        for f in Feed::ALL {
            assert_eq!(Feed::from_normalized(f.label()), Some(f));
            assert_eq!(Feed::from_slug(f.slug()), Some(f));
        }
        assert_eq!(Feed::from_normalized("XYZ"), None);
        assert_eq!(Feed::from_normalized("asn"), None); // lookup expects normalized input
        assert_eq!(Feed::from_slug("ASN"), None); // slugs are lowercase only
    }

    #[test]
    fn serializes_as_uppercase_label() {
        assert_eq!(serde_json::to_value(Feed::Backup).unwrap(), "BACKUP");
    }
}
