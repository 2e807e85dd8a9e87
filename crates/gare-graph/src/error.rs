//! Errors surfaced to callers of the graph engine.
//!
//! Messy data never produces an error here. These variants cover calls that
//! indicate an integration bug, plus failures bubbled up from the record store.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum GraphError {
    #[error("unknown layout strategy: {0}")]
    UnknownStrategy(String),

    #[error("invalid canvas size {width}x{height}")]
    InvalidCanvas { width: f64, height: f64 },

    #[error("link distance {0} outside 50..=300")]
    InvalidLinkDistance(f64),

    #[error("unknown node: {0}")]
    UnknownNode(String),

    #[error("unknown edge: {0}")]
    UnknownEdge(u64),

    #[error("non-finite coordinates for {0}")]
    InvalidPoint(String),

    #[error("record store error: {0}")]
    Store(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, GraphError>;
