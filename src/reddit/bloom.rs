use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

const WORDS: usize = 8;
const BITS: u64 = (WORDS * 64) as u64;

/// Fixed-size bloom filter over identifier bytes.
///
/// Only answers "definitely absent" or "possibly present"; callers must
/// confirm a positive answer with an exact comparison.
#[derive(Debug, Clone)]
pub struct BloomFilter {
    words: [u64; WORDS],
    hashes: u32,
}

impl BloomFilter {
    pub fn new(hashes: u32) -> Self {
        Self {
            words: [0; WORDS],
            hashes: hashes.max(1),
        }
    }

    pub fn insert(&mut self, key: &[u8]) {
        for bit in self.bit_positions(key) {
            self.words[(bit / 64) as usize] |= 1 << (bit % 64);
        }
    }

    pub fn may_contain(&self, key: &[u8]) -> bool {
        self.bit_positions(key)
            .all(|bit| self.words[(bit / 64) as usize] & (1 << (bit % 64)) != 0)
    }

    pub fn clear(&mut self) {
        self.words = [0; WORDS];
    }

    // Kirsch-Mitzenmacher: slot_i = h1 + i * h2
    fn bit_positions(&self, key: &[u8]) -> impl Iterator<Item = u64> {
        let h1 = hash_with_seed(key, 0x51_7c_c1_b7);
        let h2 = hash_with_seed(key, 0x27_22_0a_95) | 1;
        (0..u64::from(self.hashes)).map(move |i| h1.wrapping_add(i.wrapping_mul(h2)) % BITS)
    }
}

impl Default for BloomFilter {
    fn default() -> Self {
        Self::new(3)
    }
}

fn hash_with_seed(key: &[u8], seed: u64) -> u64 {
    let mut hasher = DefaultHasher::new();
    seed.hash(&mut hasher);
    key.hash(&mut hasher);
    hasher.finish()
}
