//! Path-indexed aggregation tree
//!
//! The tree mirrors the scanned directory hierarchy. Inserting a payload at
//! a path folds it into every node along the canonical path, so an interior
//! node always carries the roll-up of its whole subtree. After ingest,
//! [`Tree::finalize`] gives each directory a synthetic `*.*` child holding
//! the share of its aggregate not accounted for by subdirectories — the
//! contribution of files and symlinks directly inside it.
//!
//! Nodes are arena-allocated: a single `Vec` plus integer handles, with the
//! parent back-link stored as an index. The attribute-key interner is owned
//! here too, so publishing the finalized tree publishes everything a reader
//! needs.

mod node;

pub use node::{NodeId, TreeNode};

use serde_json::{Map, Value};

use crate::indexed_map::IndexedMap;
use crate::intern::StringInterner;

/// Name of the synthetic per-directory child created by finalization.
pub const SYNTHETIC_CHILD_NAME: &str = "*.*";

/// The aggregation tree: arena, lazy root, and the attribute interner.
#[derive(Debug, Default)]
pub struct Tree {
    interner: StringInterner,
    nodes: Vec<TreeNode>,
    root: Option<NodeId>,
}

impl Tree {
    /// Create an empty tree.
    pub fn new() -> Self {
        Self::default()
    }

    /// The attribute-key interner shared by every payload map in this tree.
    pub fn interner(&self) -> &StringInterner {
        &self.interner
    }

    /// Root handle, if anything has been inserted.
    pub fn root(&self) -> Option<NodeId> {
        self.root
    }

    /// Borrow a node by handle.
    pub fn node(&self, id: NodeId) -> &TreeNode {
        &self.nodes[id.index()]
    }

    /// Total nodes allocated, synthetic children included.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Fold `im` into every node on the canonical path for `path`,
    /// creating missing nodes as the walk descends.
    ///
    /// Leading and trailing slashes are ignored, so `/x/y/z` and `x/y/z/`
    /// address the same node. The root is allocated lazily, named after the
    /// first segment of the first inserted path.
    pub fn add_node(&mut self, path: &str, im: &IndexedMap) {
        let trimmed = path.trim_matches('/');
        let mut segments = trimmed.split('/');
        let first = segments.next().unwrap_or_default();

        let root = match self.root {
            Some(root) => root,
            None => {
                let root = self.alloc(first, None);
                self.root = Some(root);
                root
            }
        };
        debug_assert_eq!(self.nodes[root.index()].name, first);

        let mut cur = root;
        for segment in segments {
            self.nodes[cur.index()].data.combine(im);
            cur = match self.nodes[cur.index()].children.get(segment) {
                Some(&child) => child,
                None => self.alloc(segment, Some(cur)),
            };
        }
        self.nodes[cur.index()].data.combine(im);
    }

    /// Locate the node at `path`, if every segment exists.
    pub fn get_node_at(&self, path: &str) -> Option<NodeId> {
        let trimmed = path.trim_matches('/');
        let mut segments = trimmed.split('/');
        let first = segments.next().unwrap_or_default();

        let root = self.root?;
        if self.nodes[root.index()].name != first {
            return None;
        }

        let mut cur = root;
        for segment in segments {
            cur = self.nodes[cur.index()].children.get(segment).copied()?;
        }
        Some(cur)
    }

    /// Reconstruct the absolute path of a node by walking parent links.
    /// Always starts with a slash.
    pub fn path_of(&self, id: NodeId) -> String {
        let mut stack = Vec::new();
        let mut cur = Some(id);
        while let Some(node_id) = cur {
            let node = &self.nodes[node_id.index()];
            stack.push(node.name.as_str());
            cur = node.parent;
        }

        let mut path = String::new();
        while let Some(segment) = stack.pop() {
            path.push('/');
            path.push_str(segment);
        }
        path
    }

    /// Post-order pass creating the synthetic `*.*` children.
    ///
    /// At each node the children's aggregates are subtracted from a clone
    /// of the node's own; whatever remains is the directory-local share and
    /// becomes the payload of a new `*.*` child. Nothing is attached when
    /// the remainder cancels to empty.
    pub fn finalize(&mut self) {
        if let Some(root) = self.root {
            self.finalize_node(root);
        }
    }

    fn finalize_node(&mut self, id: NodeId) {
        let children: Vec<NodeId> = self.nodes[id.index()].children.values().copied().collect();

        let mut remainder = self.nodes[id.index()].data.clone();
        for child in children {
            self.finalize_node(child);
            remainder.subtract(&self.nodes[child.index()].data);
        }

        if !remainder.is_empty() {
            let star = self.alloc(SYNTHETIC_CHILD_NAME, Some(id));
            self.nodes[star.index()].data.combine(&remainder);
        }
    }

    /// Serialize the subtree at `path` to `depth` levels of children.
    ///
    /// A missing or blank `path` addresses the root; an unknown path yields
    /// the empty object. A missing `depth` means unbounded. `child_dirs` is
    /// emitted only while depth remains, so `depth = Some(0)` is the node's
    /// own record with no `child_dirs` key.
    pub fn to_json(&self, path: Option<&str>, depth: Option<u64>) -> Value {
        let depth = depth.unwrap_or(u64::MAX);
        let target = match path.filter(|p| !p.trim_matches('/').is_empty()) {
            Some(p) => self.get_node_at(p),
            None => self.root,
        };
        match target {
            Some(id) => self.node_to_json(id, depth),
            None => Value::Object(Map::new()),
        }
    }

    fn node_to_json(&self, id: NodeId, depth: u64) -> Value {
        let node = &self.nodes[id.index()];
        let mut obj = Map::new();
        obj.insert("name".to_string(), Value::from(node.name.clone()));
        obj.insert("path".to_string(), Value::from(self.path_of(id)));
        obj.insert("data".to_string(), node.data.to_json_nested(&self.interner));

        if depth > 0 && !node.children.is_empty() {
            let child_dirs: Vec<Value> = node
                .children
                .values()
                .map(|&child| self.node_to_json(child, depth - 1))
                .collect();
            obj.insert("child_dirs".to_string(), Value::Array(child_dirs));
        }
        Value::Object(obj)
    }

    fn alloc(&mut self, name: &str, parent: Option<NodeId>) -> NodeId {
        let depth = parent
            .map(|p| self.nodes[p.index()].depth + 1)
            .unwrap_or(0);
        let id = NodeId(self.nodes.len() as u32);
        self.nodes
            .push(TreeNode::new(name.to_string(), parent, depth));
        if let Some(parent) = parent {
            self.nodes[parent.index()]
                .children
                .insert(name.to_string(), id);
        }
        id
    }
}
