//! Single-slot parse cache.

use crate::error::ParseResult;
use crate::parser::parse_module;
use crate::tree::Tree;
use std::sync::Arc;

/// Remembers the last parsed source so that re-parsing unchanged text is free.
#[derive(Debug, Default)]
pub struct ParseCache {
    last: Option<(String, Arc<Tree>)>,
}

impl ParseCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn parse(&mut self, source: &str) -> ParseResult<Arc<Tree>> {
        if let Some((cached, tree)) = &self.last {
            if cached == source {
                return Ok(tree.clone());
            }
        }
        let tree = Arc::new(parse_module(source)?);
        self.last = Some((source.to_string(), tree.clone()));
        Ok(tree)
    }

    pub fn clear(&mut self) {
        self.last = None;
    }
}
