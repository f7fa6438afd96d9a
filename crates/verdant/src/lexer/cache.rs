//! Per-parse token cache.
//!
//! Several GLR heads often lex the same position in the same mode. The cache
//! lets them share one result.

use crate::language::LexMode;
use crate::lexer::LexedToken;
use lru::LruCache;
use std::num::NonZeroUsize;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct TokenKey {
    position: u32,
    mode: LexMode,
    external_state: Option<Arc<[u8]>>,
}

/// Hit and miss counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TokenCacheStats {
    pub hits: usize,
    pub misses: usize,
}

/// LRU map from (position, lex mode, scanner state) to the lexed token.
/// A capacity of zero disables caching.
pub(crate) struct TokenCache {
    cache: Option<LruCache<TokenKey, LexedToken>>,
    stats: TokenCacheStats,
}

impl TokenCache {
    pub(crate) fn new(capacity: usize) -> Self {
        Self {
            cache: NonZeroUsize::new(capacity).map(LruCache::new),
            stats: TokenCacheStats::default(),
        }
    }

    pub(crate) fn get(
        &mut self,
        position: u32,
        mode: LexMode,
        external_state: Option<&Arc<[u8]>>,
    ) -> Option<LexedToken> {
        let cache = self.cache.as_mut()?;
        let key = TokenKey {
            position,
            mode,
            external_state: external_state.cloned(),
        };
        if let Some(token) = cache.get(&key) {
            self.stats.hits += 1;
            Some(token.clone())
        } else {
            self.stats.misses += 1;
            None
        }
    }

    pub(crate) fn insert(
        &mut self,
        position: u32,
        mode: LexMode,
        external_state: Option<&Arc<[u8]>>,
        token: LexedToken,
    ) {
        if let Some(cache) = self.cache.as_mut() {
            let key = TokenKey {
                position,
                mode,
                external_state: external_state.cloned(),
            };
            cache.put(key, token);
        }
    }

    pub(crate) const fn stats(&self) -> TokenCacheStats {
        self.stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::language::Symbol;
    use crate::syntax::Length;

    fn token(symbol: u16) -> LexedToken {
        LexedToken {
            symbol: Symbol::new(symbol),
            start: Length::zero(),
            size: Length::of(b"x"),
            lookahead_bytes: 1,
            external_state: None,
        }
    }

    #[test]
    fn test_keyed_by_mode_and_scanner_state() {
        let mut cache = TokenCache::new(4);
        let mode = LexMode::default();
        let state: Arc<[u8]> = Arc::from(&b"a"[..]);
        cache.insert(0, mode, None, token(1));
        cache.insert(0, mode, Some(&state), token(2));

        assert_eq!(cache.get(0, mode, None).map(|t| t.symbol), Some(Symbol::new(1)));
        assert_eq!(
            cache.get(0, mode, Some(&state)).map(|t| t.symbol),
            Some(Symbol::new(2))
        );
        assert!(cache.get(0, LexMode::ERROR, None).is_none());
        assert!(cache.get(1, mode, None).is_none());
        assert_eq!(cache.stats(), TokenCacheStats { hits: 2, misses: 2 });
    }

    #[test]
    fn test_zero_capacity_disables_cache() {
        let mut cache = TokenCache::new(0);
        cache.insert(0, LexMode::default(), None, token(1));
        assert!(cache.get(0, LexMode::default(), None).is_none());
        assert_eq!(cache.stats(), TokenCacheStats::default());
    }

    #[test]
    fn test_evicts_least_recent() {
        let mut cache = TokenCache::new(2);
        let mode = LexMode::default();
        cache.insert(0, mode, None, token(1));
        cache.insert(1, mode, None, token(2));
        assert!(cache.get(0, mode, None).is_some());
        cache.insert(2, mode, None, token(3));
        assert!(cache.get(1, mode, None).is_none());
        assert!(cache.get(0, mode, None).is_some());
    }
}
