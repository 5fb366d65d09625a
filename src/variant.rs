//! API variant profiles
//!
//! Each autocomplete API version accepts a different alphabet and caps the
//! number of suggestions returned per call. The crawler uses the cap as its
//! truncation signal, so the profile must match the service exactly.

use crate::SweepError;

/// Maximum prefix length explored for every built-in variant
pub const DEFAULT_MAX_PREFIX_LENGTH: usize = 10;

const LOWERCASE: [&str; 26] = [
    "a", "b", "c", "d", "e", "f", "g", "h", "i", "j", "k", "l", "m", "n", "o", "p", "q", "r", "s",
    "t", "u", "v", "w", "x", "y", "z",
];

const V2_CHARS: [&str; 36] = [
    "0", "1", "2", "3", "4", "5", "6", "7", "8", "9", "a", "b", "c", "d", "e", "f", "g", "h", "i",
    "j", "k", "l", "m", "n", "o", "p", "q", "r", "s", "t", "u", "v", "w", "x", "y", "z",
];

// The trailing empty string forces one query with no prefix at all.
const V3_CHARS: [&str; 40] = [
    "0", "1", "2", "3", "4", "5", "6", "7", "8", "9", "a", "b", "c", "d", "e", "f", "g", "h", "i",
    "j", "k", "l", "m", "n", "o", "p", "q", "r", "s", "t", "u", "v", "w", "x", "y", "z", "+", "-",
    ".", "",
];

/// Static description of one API variant
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VariantProfile {
    /// Variant identifier, also the URL path segment (e.g. "v1")
    pub id: &'static str,

    /// Ordered strings appended to a prefix to form its children
    pub character_set: &'static [&'static str],

    /// Largest number of suggestions the API returns in one call
    pub max_page_size: usize,

    /// Longest prefix the traversal will query, in characters
    pub max_prefix_length: usize,

    /// Default request budget per rolling minute
    pub requests_per_minute: u32,
}

/// Lowercase letters only
pub const V1: VariantProfile = VariantProfile {
    id: "v1",
    character_set: &LOWERCASE,
    max_page_size: 10,
    max_prefix_length: DEFAULT_MAX_PREFIX_LENGTH,
    requests_per_minute: 100,
};

/// Digits then lowercase letters
pub const V2: VariantProfile = VariantProfile {
    id: "v2",
    character_set: &V2_CHARS,
    max_page_size: 12,
    max_prefix_length: DEFAULT_MAX_PREFIX_LENGTH,
    requests_per_minute: 50,
};

/// Digits, lowercase letters, a few punctuation marks, and the empty string
pub const V3: VariantProfile = VariantProfile {
    id: "v3",
    character_set: &V3_CHARS,
    max_page_size: 15,
    max_prefix_length: DEFAULT_MAX_PREFIX_LENGTH,
    requests_per_minute: 80,
};

/// All built-in profiles, in their canonical order
pub const PROFILES: [VariantProfile; 3] = [V1, V2, V3];

impl VariantProfile {
    /// Looks up a built-in profile by its identifier
    pub fn by_id(id: &str) -> Option<&'static VariantProfile> {
        PROFILES.iter().find(|profile| profile.id == id)
    }

    /// Like [`VariantProfile::by_id`] but reports unknown identifiers as an error
    pub fn require(id: &str) -> Result<&'static VariantProfile, SweepError> {
        Self::by_id(id).ok_or_else(|| SweepError::UnknownVariant(id.to_string()))
    }

    /// Returns true if a result of `count` suggestions is presumed truncated
    pub fn is_truncated(&self, count: usize) -> bool {
        count >= self.max_page_size
    }

    /// Upper bound on the number of distinct prefixes the traversal can visit
    ///
    /// Saturates at `u128::MAX`; used for reporting only.
    pub fn prefix_space_bound(&self) -> u128 {
        let k = self.character_set.len() as u128;
        (1..=self.max_prefix_length as u32)
            .map(|len| k.saturating_pow(len))
            .fold(0u128, |acc, n| acc.saturating_add(n))
    }
}
