//! Cache du stock disponible par produit.
//!
//! Projection dérivée : elle n'est jamais la source de vérité. Chaque écriture
//! susceptible de changer un disponible l'invalide (par produit ou en entier),
//! et un TTL nul désactive complètement le cache.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use parking_lot::Mutex;

#[derive(Debug, Clone, Copy)]
struct CacheEntry {
    disponible: i32,
    inserted_at: Instant,
}

#[derive(Debug)]
pub struct StockCache {
    ttl: Duration,
    entries: Mutex<HashMap<i32, CacheEntry>>,
    invalidations: AtomicU64,
}

impl StockCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Mutex::new(HashMap::new()),
            invalidations: AtomicU64::new(0),
        }
    }

    pub fn disabled() -> Self {
        Self::new(Duration::ZERO)
    }

    pub fn get(&self, produit_id: i32) -> Option<i32> {
        if self.ttl.is_zero() {
            return None;
        }

        let mut entries = self.entries.lock();
        match entries.get(&produit_id) {
            Some(entry) if entry.inserted_at.elapsed() < self.ttl => Some(entry.disponible),
            Some(_) => {
                entries.remove(&produit_id);
                None
            }
            None => None,
        }
    }

    pub fn put(&self, produit_id: i32, disponible: i32) {
        if self.ttl.is_zero() {
            return;
        }

        self.entries.lock().insert(
            produit_id,
            CacheEntry {
                disponible,
                inserted_at: Instant::now(),
            },
        );
    }

    pub fn invalidate(&self, produit_id: i32) {
        self.entries.lock().remove(&produit_id);
        self.invalidations.fetch_add(1, Ordering::Relaxed);
    }

    pub fn invalidate_all(&self) {
        self.entries.lock().clear();
        self.invalidations.fetch_add(1, Ordering::Relaxed);
    }

    /// Nombre d'invalidations (par produit ou globales) depuis la création
    pub fn invalidation_count(&self) -> u64 {
        self.invalidations.load(Ordering::Relaxed)
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
