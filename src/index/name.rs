//! Package base-name normalization

use std::fmt;
use std::ops::Deref;

/// Longest base-name kept, in bytes
pub const MAX_NAME_LEN: usize = 49;

/// A package base-name: no version suffix, no whitespace, at most 49 bytes
///
/// Ordering is byte-wise, which is what the persisted list is sorted by.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PackageName(String);

impl PackageName {
    /// Normalizes a raw name such as `"curl-8.4.0   Command line tool"`
    ///
    /// The input is cut at the first `-` followed by a digit or at the first
    /// whitespace, whichever comes first, then capped at [`MAX_NAME_LEN`].
    /// Returns `None` when nothing is left.
    pub fn normalize(raw: &str) -> Option<Self> {
        let bytes = raw.as_bytes();
        let mut end = bytes.len();

        for (i, &b) in bytes.iter().enumerate() {
            let version_start = b == b'-' && bytes.get(i + 1).is_some_and(u8::is_ascii_digit);
            if version_start || is_space(b) {
                end = i;
                break;
            }
        }

        if end > MAX_NAME_LEN {
            end = MAX_NAME_LEN;
            while !raw.is_char_boundary(end) {
                end -= 1;
            }
        }

        if end == 0 {
            None
        } else {
            Some(Self(raw[..end].to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Deref for PackageName {
    type Target = str;

    fn deref(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for PackageName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PackageName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// C `isspace` in the POSIX locale; unlike `u8::is_ascii_whitespace` it
/// includes vertical tab
pub(crate) fn is_space(b: u8) -> bool {
    matches!(b, b' ' | b'\t' | b'\n' | 0x0b | 0x0c | b'\r')
}

#[cfg(test)]
mod tests {
    use super::*;

    fn norm(raw: &str) -> Option<String> {
        PackageName::normalize(raw).map(|n| n.to_string())
    }

    #[test]
    fn test_strips_version_suffix() {
        assert_eq!(norm("curl-8.4.0"), Some("curl".to_string()));
        assert_eq!(norm("py311-setuptools-63.1.0_1"), Some("py311-setuptools".to_string()));
        assert_eq!(norm("libX11-1.8.7,1.txz"), Some("libX11".to_string()));
    }

    #[test]
    fn test_keeps_dash_not_followed_by_digit() {
        assert_eq!(norm("xorg-fonts-truetype"), Some("xorg-fonts-truetype".to_string()));
        assert_eq!(norm("pkg-devel.txz"), Some("pkg-devel.txz".to_string()));
        assert_eq!(norm("trailing-"), Some("trailing-".to_string()));
    }

    #[test]
    fn test_stops_at_whitespace() {
        assert_eq!(
            norm("bash-5.2.21                    GNU Project's Bourne Again SHell"),
            Some("bash".to_string())
        );
        assert_eq!(norm("vim\n"), Some("vim".to_string()));
        assert_eq!(norm("tmux\r\n"), Some("tmux".to_string()));
        assert_eq!(norm("a\x0bb"), Some("a".to_string()));
    }

    #[test]
    fn test_whitespace_before_version() {
        assert_eq!(norm("foo bar-1.0"), Some("foo".to_string()));
    }

    #[test]
    fn test_empty_results_are_discarded() {
        assert_eq!(norm(""), None);
        assert_eq!(norm("\n"), None);
        assert_eq!(norm("  leading"), None);
        assert_eq!(norm("-1.0"), None);
    }

    #[test]
    fn test_length_cap() {
        let long = "a".repeat(80);
        let name = PackageName::normalize(&long).unwrap();
        assert_eq!(name.len(), MAX_NAME_LEN);
    }

    #[test]
    fn test_length_cap_respects_char_boundary() {
        // 48 ASCII bytes followed by a two-byte character straddling the cap
        let raw = format!("{}é", "b".repeat(48));
        let name = PackageName::normalize(&raw).unwrap();
        assert_eq!(name.len(), 48);
    }

    #[test]
    fn test_normalized_names_hold_invariants() {
        let inputs = [
            "gettext-runtime-0.22.3",
            "   ",
            "p5-Locale-gettext-1.07",
            "name\twith-1tab",
            &"z-".repeat(40),
            "ends-with-dash-",
        ];
        for raw in inputs {
            if let Some(name) = PackageName::normalize(raw) {
                assert!(name.len() <= MAX_NAME_LEN);
                assert!(!name.bytes().any(is_space));
                let bytes = name.as_bytes();
                for w in bytes.windows(2) {
                    assert!(!(w[0] == b'-' && w[1].is_ascii_digit()), "{}", name);
                }
            }
        }
    }
}
