//! Join keys shared by scraped records and persisted entities.
//!
//! Entity keys in the geographic dataset were normalized with the same
//! rules at load time, so every key generated or matched here must go
//! through these functions.

/// Characters removed from a lowercased key, applied in this order.
pub const STRIP_CHARS: [char; 5] = ['\'', ' ', '.', '-', '/'];

/// Composite key for the provider-locality store.
///
/// `build_key("American Electric Power", "Henrico")` is
/// `"americanelectricpowerhenrico"`.
pub fn build_key(provider: &str, locality: &str) -> String {
    normalize(&format!("{provider}{locality}"))
}

/// Looser key used when dissolving records by locality: lowercase and
/// apostrophes removed, everything else kept.
pub fn dissolve_key(locality: &str) -> String {
    locality.to_lowercase().replace('\'', "")
}

fn normalize(raw: &str) -> String {
    let mut key = raw.to_lowercase();
    for ch in STRIP_CHARS {
        key = key.replace(ch, "");
    }
    key
}
