//! Cached detection of installed client CLIs.
//!
//! Listing servers annotates each client with whether its executable is on
//! PATH, so a user can tell at a glance that a `codex` entry is pointless
//! on a machine without Codex. A PATH probe walks the filesystem, and the
//! list command needs one per registered client, so results are cached for
//! a short TTL ([`AVAILABILITY_CACHE_TTL`]).
//!
//! There is no global state here: callers construct one [`AvailabilityCache`]
//! and pass it by reference to whatever needs it.

use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use crate::constants::AVAILABILITY_CACHE_TTL;
use crate::server::{ClientKind, ClientRegistry, ClientSpec};
use crate::utils::platform::command_exists;

#[derive(Debug, Clone, Copy)]
struct Probe {
    available: bool,
    checked_at: Instant,
}

/// Remembers, per client, whether its executable was found on PATH.
#[derive(Debug)]
pub struct AvailabilityCache {
    ttl: Duration,
    probes: BTreeMap<ClientKind, Probe>,
    probe: fn(&str) -> bool,
}

impl Default for AvailabilityCache {
    fn default() -> Self {
        Self::new()
    }
}

impl AvailabilityCache {
    /// Creates a cache with the standard TTL.
    #[must_use]
    pub fn new() -> Self {
        Self::with_ttl(AVAILABILITY_CACHE_TTL)
    }

    /// Creates a cache whose probes expire after `ttl`.
    #[must_use]
    pub fn with_ttl(ttl: Duration) -> Self {
        Self { ttl, probes: BTreeMap::new(), probe: command_exists }
    }

    #[cfg(test)]
    fn with_probe(ttl: Duration, probe: fn(&str) -> bool) -> Self {
        Self { ttl, probes: BTreeMap::new(), probe }
    }

    /// Whether the client's executable is on PATH, probing at most once per
    /// TTL window.
    pub fn is_available(&mut self, spec: &ClientSpec) -> bool {
        if let Some(probe) = self.probes.get(&spec.kind)
            && probe.checked_at.elapsed() < self.ttl
        {
            return probe.available;
        }

        let available = (self.probe)(&spec.binary);
        tracing::debug!("probed '{}' for {}: available={available}", spec.binary, spec.kind);
        self.probes
            .insert(spec.kind.clone(), Probe { available, checked_at: Instant::now() });
        available
    }

    /// Re-probes every registered client immediately, replacing all cached
    /// results. Entries for clients no longer in the registry are dropped.
    pub fn refresh(&mut self, registry: &ClientRegistry) {
        let now = Instant::now();
        self.probes = registry
            .specs()
            .iter()
            .map(|spec| {
                let available = (self.probe)(&spec.binary);
                (spec.kind.clone(), Probe { available, checked_at: now })
            })
            .collect();
        tracing::debug!("refreshed availability for {} clients", self.probes.len());
    }

    /// Forgets all cached probes. The next lookup probes again.
    pub fn invalidate(&mut self) {
        self.probes.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn registry() -> ClientRegistry {
        ClientRegistry::with_home(Path::new("/home/test"))
    }

    fn claude_spec(registry: &ClientRegistry) -> ClientSpec {
        registry.get(&ClientKind::claude()).unwrap().clone()
    }

    #[test]
    fn test_missing_binary_is_unavailable() {
        let registry = registry();
        let mut spec = claude_spec(&registry);
        spec.binary = "mcpsync-test-binary-that-cannot-exist".to_string();

        let mut cache = AvailabilityCache::new();
        assert!(!cache.is_available(&spec));
    }

    #[test]
    fn test_probe_is_cached_within_ttl() {
        static CALLS: AtomicUsize = AtomicUsize::new(0);
        fn probe(_: &str) -> bool {
            CALLS.fetch_add(1, Ordering::SeqCst);
            true
        }

        let registry = registry();
        let spec = claude_spec(&registry);
        let mut cache = AvailabilityCache::with_probe(Duration::from_secs(60), probe);

        assert!(cache.is_available(&spec));
        assert!(cache.is_available(&spec));
        assert_eq!(CALLS.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_expired_probe_runs_again() {
        static CALLS: AtomicUsize = AtomicUsize::new(0);
        fn probe(_: &str) -> bool {
            CALLS.fetch_add(1, Ordering::SeqCst);
            false
        }

        let registry = registry();
        let spec = claude_spec(&registry);
        let mut cache = AvailabilityCache::with_probe(Duration::ZERO, probe);

        assert!(!cache.is_available(&spec));
        assert!(!cache.is_available(&spec));
        assert_eq!(CALLS.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_refresh_probes_every_client() {
        static CALLS: AtomicUsize = AtomicUsize::new(0);
        fn probe(_: &str) -> bool {
            CALLS.fetch_add(1, Ordering::SeqCst);
            true
        }

        let registry = registry();
        let mut cache = AvailabilityCache::with_probe(Duration::from_secs(60), probe);

        cache.refresh(&registry);
        assert_eq!(CALLS.load(Ordering::SeqCst), registry.specs().iter().count());

        // Refreshed entries satisfy lookups without another probe
        let spec = claude_spec(&registry);
        cache.is_available(&spec);
        assert_eq!(CALLS.load(Ordering::SeqCst), registry.specs().iter().count());
    }

    #[test]
    fn test_invalidate_forces_probe() {
        static CALLS: AtomicUsize = AtomicUsize::new(0);
        fn probe(_: &str) -> bool {
            CALLS.fetch_add(1, Ordering::SeqCst);
            true
        }

        let registry = registry();
        let spec = claude_spec(&registry);
        let mut cache = AvailabilityCache::with_probe(Duration::from_secs(60), probe);

        cache.is_available(&spec);
        cache.invalidate();
        cache.is_available(&spec);
        assert_eq!(CALLS.load(Ordering::SeqCst), 2);
    }
}
