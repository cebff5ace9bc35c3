use sha2::{Digest, Sha256};
use std::collections::{BTreeSet, HashMap};
use std::sync::{Mutex, PoisonError};

/// Hex SHA-256 of a construction string followed by its imports.
pub fn content_hash(construction: &str, imports: &BTreeSet<String>) -> String {
    let mut hasher = Sha256::new();
    hasher.update(construction.as_bytes());
    for import in imports {
        hasher.update(import.as_bytes());
    }
    format!("{:x}", hasher.finalize())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SplitRole {
    Train,
    Test,
}

impl SplitRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            SplitRole::Train => "train",
            SplitRole::Test => "test",
        }
    }
}

/// `{hash}_{dataset}_{seed}_{fold}_{train|test}`
pub fn artifact_name(hash: &str, dataset: &str, seed: u64, fold: usize, role: SplitRole) -> String {
    format!("{}_{}_{}_{}_{}", hash, dataset, seed, fold, role.as_str())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ArtifactState {
    InFlight,
    Written,
}

/// Tracks which feature-extractor outputs are being, or have been, materialised.
///
/// A hash is claimed by one evaluation at a time. The claim becomes permanent
/// with `commit` once every fold wrote its artifacts; `release` hands it back
/// so a later evaluation of the same phenotype can write them instead.
pub struct ArtifactRegistry {
    states: Mutex<HashMap<String, ArtifactState>>,
}

impl ArtifactRegistry {
    pub fn new() -> Self {
        Self {
            states: Mutex::new(HashMap::new()),
        }
    }

    /// True iff `hash` was neither in flight nor written, in which case the
    /// caller now owns the claim and must `commit` or `release` it.
    pub fn claim(&self, hash: &str) -> bool {
        let mut states = self.states.lock().unwrap_or_else(PoisonError::into_inner);
        if states.contains_key(hash) {
            return false;
        }
        states.insert(hash.to_string(), ArtifactState::InFlight);
        true
    }

    pub fn commit(&self, hash: &str) {
        self.states
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(hash.to_string(), ArtifactState::Written);
    }

    /// Drop an in-flight claim. Written artifacts stay written.
    pub fn release(&self, hash: &str) {
        let mut states = self.states.lock().unwrap_or_else(PoisonError::into_inner);
        if states.get(hash) == Some(&ArtifactState::InFlight) {
            states.remove(hash);
        }
    }

    pub fn is_written(&self, hash: &str) -> bool {
        self.states.lock().unwrap_or_else(PoisonError::into_inner).get(hash) == Some(&ArtifactState::Written)
    }

    /// Number of written hashes.
    pub fn len(&self) -> usize {
        self.states
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .filter(|&&state| state == ArtifactState::Written)
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for ArtifactRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_hash_is_stable_and_import_sensitive() {
        let none = BTreeSet::new();
        let some: BTreeSet<String> = ["from a import B".to_string()].into_iter().collect();
        let h1 = content_hash("B()", &none);
        assert_eq!(h1, content_hash("B()", &none));
        assert_eq!(h1.len(), 64);
        assert_ne!(h1, content_hash("B()", &some));
        assert_ne!(h1, content_hash("C()", &none));
    }

    #[test]
    fn test_artifact_name() {
        assert_eq!(artifact_name("ab12", "FD001", 42, 3, SplitRole::Test), "ab12_FD001_42_3_test");
    }

    #[test]
    fn test_single_claim_in_flight() {
        let registry = Arc::new(ArtifactRegistry::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let registry = Arc::clone(&registry);
                thread::spawn(move || registry.claim("same"))
            })
            .collect();
        let winners = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|&won| won)
            .count();
        assert_eq!(winners, 1);
        assert!(!registry.claim("same"));
        assert!(!registry.is_written("same"));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_released_claim_can_be_taken_again() {
        let registry = ArtifactRegistry::new();
        assert!(registry.claim("h"));
        registry.release("h");
        assert!(registry.claim("h"));
        registry.commit("h");
        assert!(registry.is_written("h"));
        assert_eq!(registry.len(), 1);

        // written artifacts are never rewritten
        registry.release("h");
        assert!(!registry.claim("h"));
        assert!(registry.is_written("h"));
    }
}
