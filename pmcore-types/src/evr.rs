//! Epoch/Version/Release and RPM-style version comparison.

use std::{cmp::Ordering, fmt::Display, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::Error;

/// Compares two raw version or release segments using RPM's `rpmvercmp` rules.
///
/// Segments are split into alternating runs of digits and letters; runs are
/// compared numerically (ignoring leading zeros) or lexically, respectively.
/// A leading `~` sorts strictly before anything else, including the end of
/// string. A leading `^` sorts strictly after anything else, but before a
/// plain (non-`^`, non-`~`) continuation — it marks a pre-release snapshot
/// that is newer than the last tagged release yet older than the next one.
pub fn rpmvercmp(a: &str, b: &str) -> Ordering {
    if a == b {
        return Ordering::Equal;
    }

    let a = a.as_bytes();
    let b = b.as_bytes();
    let (mut i, mut j) = (0usize, 0usize);

    loop {
        while i < a.len() && !is_alnum(a[i]) && a[i] != b'~' && a[i] != b'^' {
            i += 1;
        }
        while j < b.len() && !is_alnum(b[j]) && b[j] != b'~' && b[j] != b'^' {
            j += 1;
        }

        let a_tilde = i < a.len() && a[i] == b'~';
        let b_tilde = j < b.len() && b[j] == b'~';
        if a_tilde || b_tilde {
            if !a_tilde {
                return Ordering::Greater;
            }
            if !b_tilde {
                return Ordering::Less;
            }
            i += 1;
            j += 1;
            continue;
        }

        let a_caret = i < a.len() && a[i] == b'^';
        let b_caret = j < b.len() && b[j] == b'^';
        if a_caret || b_caret {
            if i >= a.len() {
                return Ordering::Less;
            }
            if j >= b.len() {
                return Ordering::Greater;
            }
            if !a_caret {
                return Ordering::Greater;
            }
            if !b_caret {
                return Ordering::Less;
            }
            i += 1;
            j += 1;
            continue;
        }

        if i >= a.len() || j >= b.len() {
            break;
        }

        let a_start = i;
        let b_start = j;
        let numeric = a[i].is_ascii_digit();
        if numeric {
            while i < a.len() && a[i].is_ascii_digit() {
                i += 1;
            }
            while j < b.len() && b[j].is_ascii_digit() {
                j += 1;
            }
        } else {
            while i < a.len() && a[i].is_ascii_alphabetic() {
                i += 1;
            }
            while j < b.len() && b[j].is_ascii_alphabetic() {
                j += 1;
            }
        }

        // A numeric segment always outranks an alphabetic one.
        if b_start == j {
            return if numeric {
                Ordering::Greater
            } else {
                Ordering::Less
            };
        }

        let a_seg = &a[a_start..i];
        let b_seg = &b[b_start..j];
        let ord = if numeric {
            let a_trim = trim_leading_zeros(a_seg);
            let b_trim = trim_leading_zeros(b_seg);
            a_trim
                .len()
                .cmp(&b_trim.len())
                .then_with(|| a_trim.cmp(b_trim))
        } else {
            a_seg.cmp(b_seg)
        };
        if ord != Ordering::Equal {
            return ord;
        }
    }

    match (i < a.len(), j < b.len()) {
        (false, false) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (true, true) => unreachable!("loop only exits when one side is exhausted"),
    }
}

fn is_alnum(c: u8) -> bool {
    c.is_ascii_alphanumeric()
}

fn trim_leading_zeros(seg: &[u8]) -> &[u8] {
    let mut idx = 0;
    while idx + 1 < seg.len() && seg[idx] == b'0' {
        idx += 1;
    }
    &seg[idx..]
}

/// A package epoch. Defaults to `0` and is omitted from the canonical EVR
/// string when zero.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct Epoch(pub u32);

impl Display for Epoch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An (epoch, version, release) triple, compared with RPM version semantics.
///
/// Ordering compares epoch numerically first, then version and release with
/// [`rpmvercmp`]. Equality requires all three components to match exactly
/// (after defaulting a missing epoch to `0`).
#[derive(Clone, Debug, Eq, Hash, Serialize, Deserialize)]
pub struct Evr {
    epoch: Epoch,
    version: String,
    release: String,
}

impl Evr {
    /// Creates a new [`Evr`] from its components.
    pub fn new(epoch: Epoch, version: impl Into<String>, release: impl Into<String>) -> Self {
        Self {
            epoch,
            version: version.into(),
            release: release.into(),
        }
    }

    /// Parses an EVR string of the form `[epoch:]version-release` or
    /// `[epoch:]version` (release optional, e.g. for requirement bounds).
    pub fn parse(input: &str) -> Result<Self, Error> {
        let (epoch_str, rest) = match input.split_once(':') {
            Some((e, rest)) => (Some(e), rest),
            None => (None, input),
        };
        let epoch = match epoch_str {
            Some(e) => Epoch(e.parse().map_err(|_| Error::InvalidEvr(input.to_string()))?),
            None => Epoch(0),
        };
        if rest.is_empty() {
            return Err(Error::InvalidEvr(input.to_string()));
        }
        let (version, release) = match rest.rsplit_once('-') {
            Some((v, r)) => (v, r),
            None => (rest, ""),
        };
        if version.is_empty() {
            return Err(Error::InvalidEvr(input.to_string()));
        }
        Ok(Self::new(epoch, version, release))
    }

    /// Returns the epoch.
    pub fn epoch(&self) -> Epoch {
        self.epoch
    }

    /// Returns the version string.
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Returns the release string (empty if unset).
    pub fn release(&self) -> &str {
        &self.release
    }
}

impl FromStr for Evr {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Evr::parse(s)
    }
}

impl Display for Evr {
    /// Formats as the canonical EVR string, omitting a zero epoch.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.epoch.0 != 0 {
            write!(f, "{}:", self.epoch)?;
        }
        write!(f, "{}", self.version)?;
        if !self.release.is_empty() {
            write!(f, "-{}", self.release)?;
        }
        Ok(())
    }
}

impl PartialEq for Evr {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Ord for Evr {
    fn cmp(&self, other: &Self) -> Ordering {
        self.epoch
            .cmp(&other.epoch)
            .then_with(|| rpmvercmp(&self.version, &other.version))
            .then_with(|| rpmvercmp(&self.release, &other.release))
    }
}

impl PartialOrd for Evr {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case("6:5.0-11", "5.0-0", Ordering::Greater)]
    #[case("0:5.0-0", "5.0-0", Ordering::Equal)]
    fn evr_ordering(#[case] a: &str, #[case] b: &str, #[case] expected: Ordering) {
        let a = Evr::parse(a).unwrap();
        let b = Evr::parse(b).unwrap();
        assert_eq!(a.cmp(&b), expected);
    }

    #[test]
    fn tilde_lowers() {
        assert_eq!(rpmvercmp("1.0~rc1", "1.0"), Ordering::Less);
    }

    #[test]
    fn caret_raises() {
        assert_eq!(rpmvercmp("1.0", "1.0^post"), Ordering::Less);
    }

    #[test]
    fn numeric_segment_beats_alpha() {
        assert_eq!(rpmvercmp("1.0", "1.a"), Ordering::Greater);
    }

    #[test]
    fn leading_zeros_ignored() {
        assert_eq!(rpmvercmp("007", "7"), Ordering::Equal);
    }
}
