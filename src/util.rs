//! Shared utility functions

/// Tracking/session query parameters to strip during URL normalization
const TRACKING_PARAMS: &[&str] = &[
    "utm_source",
    "utm_medium",
    "utm_campaign",
    "utm_term",
    "utm_content",
    "fbclid",
    "gclid",
    "sid",
    "sessionid",
    "phpsessid",
    "jsessionid",
];

/// Normalize a URL for action deduplication
///
/// - Strips fragments
/// - Removes `www.` prefix from hostnames
/// - Removes trailing slashes from non-root paths
/// - Strips tracking/session query parameters
/// - Sorts remaining query parameters
/// - Lowercases the result
pub fn normalize_url(url: &url::Url) -> String {
    let mut normalized = url.clone();

    // Remove fragment
    normalized.set_fragment(None);

    // Strip www. prefix from hostname
    if let Some(host) = normalized.host_str().map(|h| h.to_string()) {
        if let Some(stripped) = host.strip_prefix("www.") {
            if let Err(e) = normalized.set_host(Some(stripped)) {
                tracing::warn!("Failed to strip www. from {}: {}", host, e);
            }
        }
    }

    // Remove trailing slash from non-root paths
    let path = normalized.path().to_string();
    if path.len() > 1 && path.ends_with('/') {
        normalized.set_path(&path[..path.len() - 1]);
    }

    // Filter out tracking parameters and sort remaining ones
    if let Some(query) = normalized.query() {
        let params: Vec<_> = query
            .split('&')
            .filter(|p| {
                let key = p.split('=').next().unwrap_or("");
                let key_lower = key.to_lowercase();
                !TRACKING_PARAMS.contains(&key_lower.as_str())
            })
            .collect();

        if params.is_empty() {
            normalized.set_query(None);
        } else {
            let mut sorted_params = params;
            sorted_params.sort();
            normalized.set_query(Some(&sorted_params.join("&")));
        }
    }

    normalized.as_str().to_lowercase()
}

/// Truncate a string for display, collapsing newlines to spaces.
/// Handles multi-byte characters by finding a valid char boundary.
pub fn truncate_for_display(s: &str, max_len: usize) -> String {
    let s = s.replace('\n', " ");
    if s.len() <= max_len {
        return s;
    }
    let mut end = max_len;
    while end > 0 && !s.is_char_boundary(end) {
        end -= 1;
    }
    s[..end].to_string()
}

/// Compute SimHash from an iterator of string features using xxh3.
///
/// SimHash is a locality-sensitive hash that produces similar hashes for
/// similar inputs. Each feature string is hashed, and the resulting bits
/// are accumulated in a 64-element vote array. The final hash is formed
/// by setting each bit position to 1 if more features had that bit set
/// than not.
pub fn compute_simhash<'a>(features: impl Iterator<Item = &'a str>) -> u64 {
    let mut v = [0i32; 64];
    let mut has_features = false;

    for feature in features {
        has_features = true;
        let hash = xxhash_rust::xxh3::xxh3_64(feature.as_bytes());
        for i in 0..64 {
            if (hash >> i) & 1 == 1 {
                v[i] += 1;
            } else {
                v[i] -= 1;
            }
        }
    }

    if !has_features {
        return 0;
    }

    let mut simhash: u64 = 0;
    for i in 0..64 {
        if v[i] > 0 {
            simhash |= 1u64 << i;
        }
    }
    simhash
}
