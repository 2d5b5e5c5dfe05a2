//! Tyre size parsing and normalization. Every place that compares sizes goes
//! through here so that `215/60 R16`, `215-60r16` and `215/60ZR16 91V` all land
//! on the same key.
use std::{collections::BTreeSet, fmt, sync::LazyLock};

use regex::Regex;

/// Width, aspect ratio and rim diameter. Displays as `215/60R16`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TyreSize {
    pub width: u16,
    pub aspect: u16,
    pub rim: u16,
}

// width, separator, aspect, optional construction letters, rim. The trailing
// group catches a third rim digit so that e.g. `2024` is not read as rim 20.
static SIZE_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(\d{3,4})(?:\s*[/\-]\s*|\s+)(\d{2})\s*(?:ZR|Z|R)?\s*-?\s*(\d{2})(\d?)")
        .expect("Tyre size regex invalid")
});

impl TyreSize {
    fn from_parts(width: &str, aspect: &str, rim: &str) -> Option<Self> {
        let size = Self {
            width: width.parse().ok()?,
            aspect: aspect.parse().ok()?,
            rim: rim.parse().ok()?,
        };
        size.is_plausible().then_some(size)
    }

    const fn is_plausible(&self) -> bool {
        self.width >= 100
            && self.width <= 400
            && self.aspect >= 20
            && self.aspect <= 95
            && self.rim >= 10
            && self.rim <= 30
    }

    /// Parse the first size found in `text`.
    pub fn parse(text: &str) -> Option<Self> {
        extract_sizes(text).into_iter().next()
    }
}

impl fmt::Display for TyreSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}R{}", self.width, self.aspect, self.rim)
    }
}

/// Every distinct size mentioned in `text`, in order of first appearance.
pub fn extract_sizes(text: &str) -> Vec<TyreSize> {
    let mut seen = BTreeSet::new();
    SIZE_REGEX
        .captures_iter(text)
        .filter_map(|caps| {
            let (_, [width, aspect, rim, extra_digit]) = caps.extract();
            if width.len() != 3 || !extra_digit.is_empty() {
                return None;
            }
            TyreSize::from_parts(width, aspect, rim)
        })
        .filter(|size| seen.insert(*size))
        .collect()
}

/// Uppercase and drop everything outside `[0-9A-Z/]`.
pub fn normalize_loose(text: &str) -> String {
    text.chars()
        .map(|c| c.to_ascii_uppercase())
        .filter(|c| c.is_ascii_digit() || c.is_ascii_uppercase() || *c == '/')
        .collect()
}

/// The key a size string is stored and matched under: the canonical form when
/// it parses, the loose normalization otherwise.
pub fn size_key(text: &str) -> String {
    TyreSize::parse(text).map_or_else(|| normalize_loose(text), |size| size.to_string())
}

/// A `LIKE` pattern over `size_key` for a user's size query. Full sizes match
/// exactly, partial sizes (`215`, `215/60`) by prefix. Keys only contain
/// `[0-9A-Z/]`, so no escaping is needed.
pub fn size_search_pattern(query: &str) -> Option<String> {
    if let Some(size) = TyreSize::parse(query) {
        return Some(size.to_string());
    }
    let groups: Vec<&str> = query
        .split(|c: char| !c.is_ascii_digit())
        .filter(|group| !group.is_empty())
        .collect();
    match groups.as_slice() {
        [width] if width.len() == 3 => Some(format!("{width}/%")),
        [width, aspect] if width.len() == 3 && aspect.len() <= 2 => {
            Some(format!("{width}/{aspect}%"))
        }
        _ => {
            let loose = normalize_loose(query);
            (!loose.is_empty()).then(|| format!("{loose}%"))
        }
    }
}

/// Distinct widths across `sizes`, ascending.
pub fn distinct_widths<S: AsRef<str>>(sizes: &[S]) -> Vec<u16> {
    parsed(sizes).map(|size| size.width).collect::<BTreeSet<_>>().into_iter().collect()
}

/// Distinct aspect ratios for a width, ascending.
pub fn distinct_aspects<S: AsRef<str>>(sizes: &[S], width: u16) -> Vec<u16> {
    parsed(sizes)
        .filter(|size| size.width == width)
        .map(|size| size.aspect)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Distinct rim diameters for a width and aspect ratio, ascending.
pub fn distinct_rims<S: AsRef<str>>(sizes: &[S], width: u16, aspect: u16) -> Vec<u16> {
    parsed(sizes)
        .filter(|size| size.width == width && size.aspect == aspect)
        .map(|size| size.rim)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

fn parsed<S: AsRef<str>>(sizes: &[S]) -> impl Iterator<Item = TyreSize> + '_ {
    sizes.iter().filter_map(|size| TyreSize::parse(size.as_ref()))
}

#[cfg(test)]
mod tests {
    use super::*;

    const CANONICAL: TyreSize = TyreSize {
        width: 215,
        aspect: 60,
        rim: 16,
    };

    #[test]
    fn parses_common_spellings() {
        for text in [
            "215/60 R16",
            "215 / 60 r 16",
            "215-60R16",
            "215/60ZR16",
            "215/60R16 91V",
            "215 60 16",
            "Apollo Alnac 215/60R16 tubeless",
        ] {
            assert_eq!(TyreSize::parse(text), Some(CANONICAL), "{text}");
        }
    }

    #[test]
    fn displays_canonical_form() {
        assert_eq!(CANONICAL.to_string(), "215/60R16");
    }

    #[test]
    fn rejects_non_sizes() {
        assert_eq!(TyreSize::parse("Swift 2023"), None);
        assert_eq!(TyreSize::parse("2015 20 24"), None);
        assert_eq!(TyreSize::parse("999/99R99"), None);
        assert_eq!(TyreSize::parse(""), None);
    }

    #[test]
    fn extracts_every_size_once() {
        let sizes = extract_sizes(
            "Front 205/55R16, rear 225/45 R17; spare 205/55 r16 and 215/60ZR16.",
        );
        let rendered: Vec<String> = sizes.iter().map(ToString::to_string).collect();
        assert_eq!(rendered, vec!["205/55R16", "225/45R17", "215/60R16"]);
    }

    #[test]
    fn extracts_adjacent_sizes() {
        let rendered: Vec<String> = extract_sizes("[\"185/65R15\",\"195/55R16\"]")
            .iter()
            .map(ToString::to_string)
            .collect();
        assert_eq!(rendered, vec!["185/65R15", "195/55R16"]);
    }

    #[test]
    fn loose_normalization() {
        assert_eq!(normalize_loose(" 155/80 r13-lt "), "155/80R13LT");
        assert_eq!(normalize_loose("%_'"), "");
    }

    #[test]
    fn size_key_prefers_canonical_form() {
        assert_eq!(size_key("215 / 60 r 16"), "215/60R16");
        assert_eq!(size_key("6.00-16 8PR"), "600168PR");
    }

    #[test]
    fn search_patterns() {
        assert_eq!(size_search_pattern("215/60 R16").as_deref(), Some("215/60R16"));
        assert_eq!(size_search_pattern("215").as_deref(), Some("215/%"));
        assert_eq!(size_search_pattern("215/6").as_deref(), Some("215/6%"));
        assert_eq!(size_search_pattern("215 60").as_deref(), Some("215/60%"));
        assert_eq!(size_search_pattern("lt").as_deref(), Some("LT%"));
        assert_eq!(size_search_pattern("  ").as_deref(), None);
    }

    #[test]
    fn facets_are_sorted_and_deduplicated() {
        let sizes = [
            "215/60R16",
            "195/55 R16",
            "215/55R17",
            "215/60 r16",
            "215/60R15",
            "junk",
        ];
        assert_eq!(distinct_widths(&sizes), vec![195, 215]);
        assert_eq!(distinct_aspects(&sizes, 215), vec![55, 60]);
        assert_eq!(distinct_rims(&sizes, 215, 60), vec![15, 16]);
        assert!(distinct_rims(&sizes, 175, 65).is_empty());
    }
}
