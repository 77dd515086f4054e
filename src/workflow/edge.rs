//! Workflow edge definitions for connecting nodes.
//!
//! Every node has at most one default successor (`connectedTo`); condition and
//! switch nodes may also carry named branches.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Which output of a node an edge leaves from.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Handle {
    /// Default output, `connectedTo`.
    Next,
    /// Named branch such as `true`, `default` or a switch case.
    Branch(String),
}

impl Handle {
    pub fn branch(key: &str) -> Self {
        Handle::Branch(key.to_string())
    }
}

impl fmt::Display for Handle {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        match self {
            Handle::Next => write!(f, "next"),
            Handle::Branch(key) => write!(f, "branch:{}", key),
        }
    }
}

/// Edge weight stored in the workflow graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edge {
    pub handle: Handle,
}

impl Edge {
    pub fn new(handle: Handle) -> Self {
        Self {
            handle,
        }
    }
}
