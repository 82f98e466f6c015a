//! Workflow node ids

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Step of the workflow graph; persisted as a checkpoint's pending node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Node {
    /// Cache lookup, then reuse, adapt or generate
    Generate,
    /// Consume the human verdict and pick the next step
    Evaluate,
    /// New answer from feedback
    Regenerate,
    /// Persist the validated answer to the cache
    Save,
    /// Terminal
    End,
}

impl Node {
    pub const ALL: [Node; 5] = [Node::Generate, Node::Evaluate, Node::Regenerate, Node::Save, Node::End];

    pub fn as_str(&self) -> &'static str {
        match self {
            Node::Generate => "generate",
            Node::Evaluate => "evaluate",
            Node::Regenerate => "regenerate",
            Node::Save => "save",
            Node::End => "end",
        }
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Node {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Node::ALL
            .into_iter()
            .find(|n| n.as_str() == s)
            .ok_or_else(|| format!("unknown node: {}", s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_all_nodes() {
        for node in Node::ALL {
            assert_eq!(node.as_str().parse::<Node>().unwrap(), node);
        }
        assert!("generating".parse::<Node>().is_err());
    }
}
