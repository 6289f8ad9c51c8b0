use crate::error::AstError;
use crc32fast::Hasher;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

/// Stable identity of an AST node within a module.
///
/// `peer` distinguishes collaborators creating nodes concurrently, `seq` is a
/// per-peer counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AstId {
    pub peer: u32,
    pub seq: u32,
}

impl AstId {
    pub fn new(peer: u32, seq: u32) -> Self {
        Self { peer, seq }
    }
}

impl fmt::Display for AstId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.peer, self.seq)
    }
}

impl FromStr for AstId {
    type Err = AstError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || AstError::InvalidAstId(s.to_string());
        let (peer, seq) = s.split_once(':').ok_or_else(invalid)?;
        Ok(Self {
            peer: peer.parse().map_err(|_| invalid())?,
            seq: seq.parse().map_err(|_| invalid())?,
        })
    }
}

/// Identity of a node as seen by the language server and collaborators.
/// Transferred to the replacement when a node's value is replaced.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ExternalId(pub String);

impl fmt::Display for ExternalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Generate a document seed from its name using CRC32
pub fn get_document_seed(name: &str) -> String {
    let mut hasher = Hasher::new();
    hasher.update(name.as_bytes());
    format!("{:08x}", hasher.finalize())
}

/// Sequential ID generator for the nodes of one module.
///
/// Clones share the counter, so every edit session of a module draws from the
/// same sequence.
#[derive(Debug, Clone)]
pub struct IdGenerator {
    seed: String,
    peer: u32,
    count: Arc<AtomicU32>,
}

impl IdGenerator {
    pub fn new(document: &str, peer: u32) -> Self {
        Self::from_seed(get_document_seed(document), peer)
    }

    pub fn from_seed(seed: String, peer: u32) -> Self {
        Self {
            seed,
            peer,
            count: Arc::new(AtomicU32::new(0)),
        }
    }

    /// Generator for scratch modules that are never synchronized.
    pub fn transient() -> Self {
        Self::new("transient", 0)
    }

    fn next(&self) -> u32 {
        self.count.fetch_add(1, Ordering::Relaxed) + 1
    }

    pub fn next_ast_id(&self) -> AstId {
        AstId::new(self.peer, self.next())
    }

    pub fn new_external_id(&self) -> ExternalId {
        ExternalId(format!("{}-{}-{}", self.seed, self.peer, self.next()))
    }

    pub fn seed(&self) -> &str {
        &self.seed
    }

    pub fn peer(&self) -> u32 {
        self.peer
    }

    /// Make sure future ids are greater than `id` (used after loading nodes created elsewhere).
    pub fn observe(&self, id: AstId) {
        if id.peer == self.peer {
            self.count.fetch_max(id.seq, Ordering::Relaxed);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_seed_generation() {
        let id1 = get_document_seed("Main.enso");
        let id2 = get_document_seed("Main.enso");
        assert_eq!(id1, id2);
        assert_ne!(id1, get_document_seed("Other.enso"));
    }

    #[test]
    fn test_sequential_ids_shared_between_clones() {
        let gen = IdGenerator::new("Main.enso", 7);
        let clone = gen.clone();

        let a = gen.next_ast_id();
        let b = clone.next_ast_id();
        let ext = gen.new_external_id();

        assert_eq!(a, AstId::new(7, 1));
        assert_eq!(b, AstId::new(7, 2));
        assert!(ext.0.starts_with(gen.seed()));
        assert!(ext.0.ends_with("-7-3"));
    }

    #[test]
    fn test_ast_id_string_roundtrip() {
        let id = AstId::new(12, 345);
        assert_eq!(id.to_string(), "12:345");
        assert_eq!("12:345".parse::<AstId>().unwrap(), id);
        assert!("12-345".parse::<AstId>().is_err());
    }

    #[test]
    fn test_observe_advances_counter() {
        let gen = IdGenerator::new("Main.enso", 1);
        gen.observe(AstId::new(1, 100));
        gen.observe(AstId::new(2, 500));
        assert_eq!(gen.next_ast_id(), AstId::new(1, 101));
    }
}
