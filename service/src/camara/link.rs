//! `Link` response header parsing (RFC 8288), limited to what pagination
//! needs: finding the `next` relation.

use reqwest::header::{HeaderMap, LINK};
use reqwest::Url;

/// Absolute URL of the `rel="next"` target, resolved against `base`.
///
/// Looks at every `Link` header, since servers may split relations across
/// several of them.
pub fn next_link(headers: &HeaderMap, base: &Url) -> Option<String> {
    headers
        .get_all(LINK)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(','))
        .find_map(|entry| parse_entry(entry).filter(|(_, rels)| rels.contains(&"next")))
        .and_then(|(target, _)| base.join(target).ok())
        .map(String::from)
}

/// Split `<target>; rel="a b"; title=...` into the target and its relations.
fn parse_entry(entry: &str) -> Option<(&str, Vec<&str>)> {
    let mut parts = entry.split(';');
    let target = parts
        .next()?
        .trim()
        .strip_prefix('<')?
        .strip_suffix('>')?;

    let rels = parts
        .filter_map(|param| {
            let (name, value) = param.split_once('=')?;
            name.trim()
                .eq_ignore_ascii_case("rel")
                .then(|| value.trim().trim_matches('"'))
        })
        .flat_map(str::split_whitespace)
        .collect();

    Some((target, rels))
}
