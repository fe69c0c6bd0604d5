//! The finite pool of unallocated skins.

use std::collections::BTreeSet;

use orchard_protocol::SkinIndex;
use rand::Rng;

use crate::WorldError;

/// The set of pooled skin indices no player currently holds.
///
/// Starts full (`0..SkinIndex::POOL_SIZE`). Only pooled indices are ever
/// accepted back, so [`SkinIndex::OVERFLOW`] can't leak into the pool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColorPool {
    free: BTreeSet<SkinIndex>,
}

impl ColorPool {
    /// A pool holding every skin.
    pub fn full() -> Self {
        Self {
            free: (0..SkinIndex::POOL_SIZE).map(SkinIndex).collect(),
        }
    }

    /// Takes a random free skin out of the pool.
    ///
    /// # Errors
    /// Returns [`WorldError::SkinPoolExhausted`] if every skin is taken.
    pub fn allocate(&mut self, rng: &mut impl Rng) -> Result<SkinIndex, WorldError> {
        if self.free.is_empty() {
            return Err(WorldError::SkinPoolExhausted);
        }
        let pick = rng.random_range(0..self.free.len());
        let skin = self
            .free
            .iter()
            .nth(pick)
            .copied()
            .ok_or(WorldError::SkinPoolExhausted)?;
        self.free.remove(&skin);
        Ok(skin)
    }

    /// Puts a skin back. Returns `false` for non-pooled indices and for
    /// skins that were already free.
    pub fn release(&mut self, skin: SkinIndex) -> bool {
        skin.is_pooled() && self.free.insert(skin)
    }

    pub fn contains(&self, skin: SkinIndex) -> bool {
        self.free.contains(&skin)
    }

    /// Number of skins still available.
    pub fn remaining(&self) -> usize {
        self.free.len()
    }

    pub fn is_empty(&self) -> bool {
        self.free.is_empty()
    }
}

impl Default for ColorPool {
    fn default() -> Self {
        Self::full()
    }
}
