// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Route strings: base-path extraction, normalization and tokenization.
//!
//! A route has the shape `/` (empty) or `/view(/elementId/view)*`. The
//! tokenization contract is:
//!
//! - one leading `/` is stripped;
//! - an empty remainder yields no tokens;
//! - otherwise the remainder is split on every `/`, so a doubled or trailing
//!   separator yields an empty token, which never matches.
//!
//! Trailing separators are trimmed by [`normalize`] unless the router is
//! configured to keep them.

use alloc::string::String;

use smallvec::SmallVec;

/// Path component of `base_url`, without a trailing `/`.
///
/// Accepts absolute URLs (`https://host/app/`) and bare paths (`/app`). Query
/// and fragment are ignored.
pub fn base_path(base_url: &str) -> String {
    let without_scheme = match base_url.find("://") {
        Some(i) => {
            let rest = &base_url[i + 3..];
            rest.find('/').map_or("", |j| &rest[j..])
        }
        None => base_url,
    };
    let path = without_scheme
        .split(['?', '#'])
        .next()
        .unwrap_or_default();
    String::from(path.trim_end_matches('/'))
}

/// Prepare an incoming route for matching.
///
/// Trims one trailing `/` (unless `leave_trailing_slash`) and strips `base`
/// when the route starts with it on a segment boundary.
pub fn normalize(route: &str, base: &str, leave_trailing_slash: bool) -> String {
    let mut route = route;
    if !base.is_empty()
        && let Some(rest) = route.strip_prefix(base)
        && (rest.is_empty() || rest.starts_with('/'))
    {
        route = rest;
    }
    if !leave_trailing_slash && route.len() > 1 {
        route = route.strip_suffix('/').unwrap_or(route);
    }
    if route.is_empty() {
        return String::from("/");
    }
    String::from(route)
}

/// Split a normalized route into its tokens.
pub fn tokenize(route: &str) -> SmallVec<[&str; 8]> {
    let rest = route.strip_prefix('/').unwrap_or(route);
    if rest.is_empty() {
        return SmallVec::new();
    }
    rest.split('/').collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_path_from_urls_and_paths() {
        assert_eq!(base_path("https://example.com/app/"), "/app");
        assert_eq!(base_path("https://example.com"), "");
        assert_eq!(base_path("http://localhost:8080/a/b?x=1#top"), "/a/b");
        assert_eq!(base_path("/app"), "/app");
        assert_eq!(base_path(""), "");
    }

    #[test]
    fn normalize_strips_base_on_segment_boundary() {
        assert_eq!(normalize("/app/home", "/app", false), "/home");
        assert_eq!(normalize("/app", "/app", false), "/");
        assert_eq!(normalize("/application/home", "/app", false), "/application/home");
    }

    #[test]
    fn normalize_trailing_slash() {
        assert_eq!(normalize("/home/", "", false), "/home");
        assert_eq!(normalize("/home/", "", true), "/home/");
        assert_eq!(normalize("/", "", false), "/");
        assert_eq!(normalize("", "", false), "/");
    }

    #[test]
    fn tokenization_contract() {
        assert!(tokenize("/").is_empty());
        assert!(tokenize("").is_empty());
        assert_eq!(tokenize("/home").as_slice(), &["home"]);
        assert_eq!(tokenize("/users/list/42").as_slice(), &["users", "list", "42"]);
        assert_eq!(tokenize("/home/").as_slice(), &["home", ""]);
        assert_eq!(tokenize("//home").as_slice(), &["", "home"]);
    }
}
