//! Postcode normalisation and cached resolution to coordinates.
//!
//! Postcodes are matched exactly after normalisation: ASCII letters are
//! uppercased, surrounding whitespace is trimmed and internal whitespace runs
//! collapse to a single space. [`PostcodeResolver`] keys its cache on
//! `"pc:" + normalised code` and reads through a [`PostcodeStore`] on a miss.

use std::fmt;

use crate::cache::{CachePolicy, LookupCache};
use crate::{BackendError, Coordinate};

/// A normalised postcode.
///
/// # Examples
///
/// ```
/// use deliveryzone_core::Postcode;
///
/// let postcode = Postcode::new(" sw1a  1aa ");
/// assert_eq!(postcode.as_str(), "SW1A 1AA");
/// assert_eq!(postcode.cache_key(), "pc:SW1A 1AA");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize), serde(transparent))]
pub struct Postcode(String);

impl Postcode {
    /// Normalise `raw` and wrap it.
    #[must_use]
    pub fn new(raw: &str) -> Self {
        Self(Self::normalize(raw))
    }

    /// Uppercase, trim and collapse internal whitespace.
    ///
    /// The function is idempotent.
    #[must_use]
    pub fn normalize(raw: &str) -> String {
        raw.split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
            .to_ascii_uppercase()
    }

    /// The normalised code.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether normalisation left nothing behind.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Key under which resolved coordinates are cached.
    #[must_use]
    pub fn cache_key(&self) -> String {
        format!("pc:{}", self.0)
    }
}

impl fmt::Display for Postcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A postcode and its centroid, as written by the importer.
#[derive(Debug, Clone, PartialEq)]
pub struct PostcodeRecord {
    /// Normalised postcode; unique across the dataset.
    pub postcode: Postcode,
    /// Centroid of the postcode.
    pub location: Coordinate,
}

/// Read-only lookup of postcode centroids.
///
/// Implementations receive already-normalised codes and match them exactly.
pub trait PostcodeStore {
    /// Return the coordinate recorded for `postcode`, if any.
    ///
    /// # Errors
    /// Returns [`BackendError`] when the backing store cannot be read.
    fn find_by_normalized_code(
        &self,
        postcode: &Postcode,
    ) -> Result<Option<Coordinate>, BackendError>;
}

impl<T: PostcodeStore + ?Sized> PostcodeStore for &T {
    fn find_by_normalized_code(
        &self,
        postcode: &Postcode,
    ) -> Result<Option<Coordinate>, BackendError> {
        (**self).find_by_normalized_code(postcode)
    }
}

/// Outcome of resolving a postcode.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PostcodeLookup {
    /// The postcode exists at this coordinate.
    Found(Coordinate),
    /// The postcode is absent from the dataset.
    Missing,
}

impl PostcodeLookup {
    /// The coordinate, if the postcode was found.
    #[must_use]
    pub const fn coordinate(self) -> Option<Coordinate> {
        match self {
            Self::Found(coordinate) => Some(coordinate),
            Self::Missing => None,
        }
    }
}

impl From<Option<Coordinate>> for PostcodeLookup {
    fn from(value: Option<Coordinate>) -> Self {
        value.map_or(Self::Missing, Self::Found)
    }
}

/// Resolves postcodes through a cache in front of a [`PostcodeStore`].
///
/// Construct one per process and share it; the cache is the only state it
/// carries.
///
/// # Examples
///
/// ```
/// use deliveryzone_core::{
///     Coordinate, MemoryCache, PostcodeLookup, PostcodeResolver, SystemClock,
///     test_support::MemoryPostcodeStore,
/// };
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let palace = Coordinate::new(51.501_009, -0.141_588)?;
/// let store = MemoryPostcodeStore::default().with_postcode("SW1A 1AA", palace);
/// let resolver = PostcodeResolver::new(store, MemoryCache::new(SystemClock));
///
/// assert_eq!(resolver.resolve("sw1a 1aa")?, PostcodeLookup::Found(palace));
/// assert_eq!(resolver.resolve("ZZ1 1ZZ")?, PostcodeLookup::Missing);
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct PostcodeResolver<P, K> {
    store: P,
    cache: K,
    policy: CachePolicy,
}

impl<P, K> PostcodeResolver<P, K>
where
    P: PostcodeStore,
    K: LookupCache,
{
    /// Build a resolver using [`CachePolicy::default`].
    pub fn new(store: P, cache: K) -> Self {
        Self {
            store,
            cache,
            policy: CachePolicy::default(),
        }
    }

    /// Replace the cache expiry policy.
    #[must_use]
    pub fn with_policy(mut self, policy: CachePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Expiry policy applied to cached lookups.
    #[must_use]
    pub const fn policy(&self) -> &CachePolicy {
        &self.policy
    }

    /// Normalise `raw` and resolve it.
    ///
    /// # Errors
    /// Returns [`BackendError`] when the postcode store fails. Failures are
    /// never cached.
    pub fn resolve(&self, raw: &str) -> Result<PostcodeLookup, BackendError> {
        self.resolve_postcode(&Postcode::new(raw))
    }

    /// Resolve an already-normalised postcode.
    ///
    /// # Errors
    /// Returns [`BackendError`] when the postcode store fails.
    pub fn resolve_postcode(&self, postcode: &Postcode) -> Result<PostcodeLookup, BackendError> {
        self.cache
            .get_or_compute(&postcode.cache_key(), &self.policy, || {
                self.store
                    .find_by_normalized_code(postcode)
                    .map(PostcodeLookup::from)
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MemoryCache;
    use crate::test_support::{FailingPostcodeStore, ManualClock, MemoryPostcodeStore};
    use rstest::{fixture, rstest};
    use std::time::Duration;

    #[fixture]
    fn palace() -> Coordinate {
        Coordinate::new(51.501_009, -0.141_588).expect("valid coordinate")
    }

    #[rstest]
    #[case(" sw1a  1aa ", "SW1A 1AA")]
    #[case("ec1a\t1bb", "EC1A 1BB")]
    #[case("M1 1AE", "M1 1AE")]
    #[case("   ", "")]
    #[case("\n m1 \r\n 1ae\n", "M1 1AE")]
    fn normalises_postcodes(#[case] raw: &str, #[case] expected: &str) {
        assert_eq!(Postcode::normalize(raw), expected);
    }

    #[rstest]
    fn normalisation_is_idempotent() {
        let once = Postcode::normalize("  w1a \t 0ax ");
        assert_eq!(Postcode::normalize(&once), once);
    }

    #[rstest]
    fn resolves_normalised_input(palace: Coordinate) {
        let store = MemoryPostcodeStore::default().with_postcode("SW1A 1AA", palace);
        let resolver = PostcodeResolver::new(store, MemoryCache::new(ManualClock::default()));
        let lookup = resolver.resolve(" sw1a 1aa").expect("lookup succeeds");
        assert_eq!(lookup, PostcodeLookup::Found(palace));
    }

    #[rstest]
    fn repeated_hits_read_the_store_once(palace: Coordinate) {
        let store = MemoryPostcodeStore::default().with_postcode("SW1A 1AA", palace);
        let resolver = PostcodeResolver::new(&store, MemoryCache::new(ManualClock::default()));
        for _ in 0..3 {
            resolver.resolve("SW1A 1AA").expect("lookup succeeds");
        }
        assert_eq!(store.lookups(), 1);
    }

    #[rstest]
    fn hits_expire_after_a_day(palace: Coordinate) {
        let clock = ManualClock::default();
        let store = MemoryPostcodeStore::default().with_postcode("SW1A 1AA", palace);
        let resolver = PostcodeResolver::new(&store, MemoryCache::new(clock.clone()));

        resolver.resolve("SW1A 1AA").expect("first lookup");
        clock.advance(Duration::from_secs(23 * 60 * 60));
        resolver.resolve("SW1A 1AA").expect("cached lookup");
        assert_eq!(store.lookups(), 1);

        clock.advance(Duration::from_secs(60 * 60));
        resolver.resolve("SW1A 1AA").expect("expired lookup");
        assert_eq!(store.lookups(), 2);
    }

    #[rstest]
    fn misses_are_cached_for_the_shorter_ttl() {
        let clock = ManualClock::default();
        let store = MemoryPostcodeStore::default();
        let resolver = PostcodeResolver::new(&store, MemoryCache::new(clock.clone()));

        assert_eq!(
            resolver.resolve("ZZ1 1ZZ").expect("lookup"),
            PostcodeLookup::Missing
        );
        resolver.resolve("zz1 1zz").expect("cached miss");
        assert_eq!(store.lookups(), 1);

        clock.advance(Duration::from_secs(60 * 60));
        resolver.resolve("ZZ1 1ZZ").expect("expired miss");
        assert_eq!(store.lookups(), 2);
    }

    #[rstest]
    fn misses_bypass_the_cache_when_disabled() {
        let store = MemoryPostcodeStore::default();
        let policy = CachePolicy {
            missing_ttl: None,
            ..CachePolicy::default()
        };
        let resolver = PostcodeResolver::new(&store, MemoryCache::new(ManualClock::default()))
            .with_policy(policy);

        resolver.resolve("ZZ1 1ZZ").expect("first miss");
        resolver.resolve("ZZ1 1ZZ").expect("second miss");
        assert_eq!(store.lookups(), 2);
    }

    #[rstest]
    fn backend_failures_propagate_and_are_not_cached() {
        let cache = MemoryCache::new(ManualClock::default());
        let resolver = PostcodeResolver::new(FailingPostcodeStore, &cache);
        let err = resolver.resolve("SW1A 1AA").expect_err("store failure");
        assert_eq!(err.operation(), "postcode lookup");
        assert!(cache.is_empty());
    }
}
