//! Kinematic relationship graph.
//!
//! Nodes are named frames; an edge `parent -> child` means the child is
//! attached to (or rests on) the parent. Every frame has at most one parent,
//! and each frame's origin is relative to its parent (global for roots).

use std::collections::HashMap;

use lgp_core::{LgpError, Result};
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use serde::{Deserialize, Serialize};

use crate::geometry::Configuration;

/// Role of a frame in the world.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FrameKind {
    Robot,
    Human,
    Object,
    Location,
}

/// A named frame with its local origin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    pub name: String,
    pub kind: FrameKind,
    pub origin: Configuration,
}

/// Attachment/support graph between agents, objects and locations.
#[derive(Debug, Clone, Default)]
pub struct KinematicTree {
    graph: DiGraph<Frame, ()>,
    index: HashMap<String, NodeIndex>,
}

impl KinematicTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a root frame.
    pub fn add_frame(
        &mut self,
        name: impl Into<String>,
        kind: FrameKind,
        origin: Configuration,
    ) -> Result<()> {
        let name = name.into();
        if self.index.contains_key(&name) {
            return Err(LgpError::Config(format!("Frame {} already exists", name)));
        }
        let node = self.graph.add_node(Frame {
            name: name.clone(),
            kind,
            origin,
        });
        self.index.insert(name, node);
        Ok(())
    }

    fn node(&self, name: &str) -> Result<NodeIndex> {
        self.index
            .get(name)
            .copied()
            .ok_or_else(|| LgpError::UnknownFrame {
                frame: name.to_string(),
            })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn frame(&self, name: &str) -> Option<&Frame> {
        self.index.get(name).map(|&n| &self.graph[n])
    }

    /// Frames of a kind, sorted by name.
    pub fn frames_of_kind(&self, kind: FrameKind) -> Vec<&Frame> {
        let mut frames: Vec<&Frame> = self
            .graph
            .node_weights()
            .filter(|f| f.kind == kind)
            .collect();
        frames.sort_by(|a, b| a.name.cmp(&b.name));
        frames
    }

    pub fn has_edge(&self, parent: &str, child: &str) -> bool {
        match (self.index.get(parent), self.index.get(child)) {
            (Some(&p), Some(&c)) => self.graph.find_edge(p, c).is_some(),
            _ => false,
        }
    }

    /// The support a frame is attached to.
    pub fn parent(&self, child: &str) -> Option<&str> {
        let node = *self.index.get(child)?;
        self.graph
            .neighbors_directed(node, Direction::Incoming)
            .next()
            .map(|p| self.graph[p].name.as_str())
    }

    /// Frames attached to `parent`, sorted by name.
    pub fn children(&self, parent: &str) -> Vec<&str> {
        let Some(&node) = self.index.get(parent) else {
            return Vec::new();
        };
        let mut children: Vec<&str> = self
            .graph
            .neighbors_directed(node, Direction::Outgoing)
            .map(|c| self.graph[c].name.as_str())
            .collect();
        children.sort_unstable();
        children
    }

    /// Attach `child` to `parent`. The child must currently be free.
    pub fn attach(&mut self, parent: &str, child: &str) -> Result<()> {
        let p = self.node(parent)?;
        let c = self.node(child)?;
        if let Some(current) = self.parent(child) {
            return Err(LgpError::AlreadyAttached {
                frame: child.to_string(),
                parent: current.to_string(),
            });
        }
        if self.is_ancestor(child, parent) {
            return Err(LgpError::Config(format!(
                "Attaching {} to {} would create a cycle",
                child, parent
            )));
        }
        self.graph.add_edge(p, c, ());
        Ok(())
    }

    /// Detach `child` from its support, returning the former parent.
    pub fn detach(&mut self, child: &str) -> Option<String> {
        let c = *self.index.get(child)?;
        let edge = self
            .graph
            .edges_directed(c, Direction::Incoming)
            .next()
            .map(|e| e.id())?;
        let (parent, _) = self.graph.edge_endpoints(edge)?;
        let name = self.graph[parent].name.clone();
        self.graph.remove_edge(edge);
        Some(name)
    }

    /// Move `child` onto `parent`, returning its former support.
    ///
    /// On error the tree is left unchanged.
    pub fn reparent(&mut self, parent: &str, child: &str) -> Result<Option<String>> {
        self.node(parent)?;
        self.node(child)?;
        if self.is_ancestor(child, parent) {
            return Err(LgpError::Config(format!(
                "Attaching {} to {} would create a cycle",
                child, parent
            )));
        }
        let previous = self.detach(child);
        self.attach(parent, child)?;
        Ok(previous)
    }

    /// True if `ancestor` is `frame` or lies on its parent chain.
    pub fn is_ancestor(&self, ancestor: &str, frame: &str) -> bool {
        let mut current = Some(frame);
        while let Some(name) = current {
            if name == ancestor {
                return true;
            }
            current = self.parent(name);
        }
        false
    }

    pub fn origin(&self, name: &str) -> Option<&Configuration> {
        self.frame(name).map(|f| &f.origin)
    }

    /// Set a frame's local origin.
    pub fn set_origin(&mut self, name: &str, origin: Configuration) -> Result<()> {
        let node = self.node(name)?;
        self.graph[node].origin = origin;
        Ok(())
    }

    /// Global position: the frame's origin composed along its parent chain.
    pub fn global_origin(&self, name: &str) -> Option<Configuration> {
        let mut position = self.origin(name)?.clone();
        let mut current = self.parent(name);
        while let Some(parent) = current {
            position = position.offset(self.origin(parent)?);
            current = self.parent(parent);
        }
        Some(position)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tree() -> KinematicTree {
        let mut tree = KinematicTree::new();
        tree.add_frame("robot", FrameKind::Robot, Configuration::new(vec![1.0, 1.0]))
            .unwrap();
        tree.add_frame("table", FrameKind::Location, Configuration::new(vec![2.0, 0.0]))
            .unwrap();
        tree.add_frame("cup", FrameKind::Object, Configuration::new(vec![0.5, 0.0]))
            .unwrap();
        tree.attach("table", "cup").unwrap();
        tree
    }

    #[test]
    fn test_attach_and_parent() {
        let tree = tree();
        assert!(tree.has_edge("table", "cup"));
        assert_eq!(tree.parent("cup"), Some("table"));
        assert_eq!(tree.children("table"), vec!["cup"]);
        assert_eq!(tree.parent("table"), None);
    }

    #[test]
    fn test_single_support() {
        let mut tree = tree();
        let err = tree.attach("robot", "cup").unwrap_err();
        assert!(matches!(err, LgpError::AlreadyAttached { .. }));
    }

    #[test]
    fn test_detach() {
        let mut tree = tree();
        assert_eq!(tree.detach("cup"), Some("table".to_string()));
        assert_eq!(tree.detach("cup"), None);
        tree.attach("robot", "cup").unwrap();
        assert!(tree.has_edge("robot", "cup"));
        assert!(!tree.has_edge("table", "cup"));
    }

    #[test]
    fn test_unknown_frame() {
        let mut tree = tree();
        let err = tree.attach("shelf", "cup").unwrap_err();
        assert_eq!(err.frame(), Some("shelf"));
        assert!(tree.set_origin("shelf", Configuration::zeros(2)).is_err());
    }

    #[test]
    fn test_cycle_rejected() {
        let mut tree = tree();
        tree.detach("cup");
        tree.attach("cup", "robot").unwrap();
        assert!(tree.attach("robot", "cup").is_err());
    }

    #[test]
    fn test_reparent() {
        let mut tree = tree();
        assert_eq!(tree.reparent("robot", "cup").unwrap(), Some("table".to_string()));
        assert!(tree.has_edge("robot", "cup"));
        assert!(!tree.has_edge("table", "cup"));

        // A rejected move keeps the existing support.
        assert!(tree.reparent("cup", "cup").is_err());
        assert!(tree.has_edge("robot", "cup"));
        assert!(tree.reparent("ghost", "cup").is_err());
        assert_eq!(tree.parent("cup"), Some("robot"));
    }

    #[test]
    fn test_global_origin() {
        let tree = tree();
        assert_eq!(
            tree.global_origin("cup"),
            Some(Configuration::new(vec![2.5, 0.0]))
        );
        assert_eq!(tree.frames_of_kind(FrameKind::Location).len(), 1);
    }
}
