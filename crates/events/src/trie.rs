//! Namespace trie: the data structure behind every emitter.
//!
//! Each node owns its children outright, so there are no parent pointers. The
//! recursion in [`Trie::traverse`] doubles as the stack of parents needed to
//! prune dead nodes while unwinding.
//!
//! ```text
//! root ─┬─ user ─┬─ created
//!       │        └─ deleted
//!       └─ order ── paid
//! ```
//!
//! Traversal descends along the path, then visits nodes **bottom-up**: the
//! deepest matching node first, then each ancestor up to the root, for as long
//! as the visitor keeps returning `true`.

use std::collections::HashMap;

use nsbus_core::Namespace;

use crate::listener::Listener;

/// One namespace segment.
#[derive(Debug)]
pub struct Node<A> {
    listeners: Vec<Listener<A>>,
    children: HashMap<String, Node<A>>,
}

impl<A> Default for Node<A> {
    fn default() -> Self {
        Self {
            listeners: Vec::new(),
            children: HashMap::new(),
        }
    }
}

impl<A> Node<A> {
    pub fn listeners(&self) -> &[Listener<A>] {
        &self.listeners
    }

    pub fn listeners_mut(&mut self) -> &mut Vec<Listener<A>> {
        &mut self.listeners
    }

    pub fn child(&self, segment: &str) -> Option<&Node<A>> {
        self.children.get(segment)
    }

    pub fn child_count(&self) -> usize {
        self.children.len()
    }

    /// No listeners and no children: eligible for pruning.
    pub fn is_dead(&self) -> bool {
        self.listeners.is_empty() && self.children.is_empty()
    }

    /// Drop every listener here and the whole subtree below.
    pub fn clear(&mut self) {
        self.listeners.clear();
        self.children.clear();
    }

    fn count(&self) -> usize {
        1 + self.children.values().map(Node::count).sum::<usize>()
    }
}

/// How the node handed to a visitor relates to the traversed path.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Reach {
    /// The node is exactly the traversed path.
    Exact,
    /// The path continues below this node but no matching child exists.
    Nearest,
    /// Visited while walking back up from a deeper node.
    Ancestor,
}

/// Position of a visited node.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Visit {
    /// Number of path segments leading to this node (0 for the root).
    pub depth: usize,
    pub reach: Reach,
}

/// The namespace tree. The root node stands for the empty namespace.
#[derive(Debug)]
pub struct Trie<A> {
    root: Node<A>,
}

impl<A> Default for Trie<A> {
    fn default() -> Self {
        Self {
            root: Node::default(),
        }
    }
}

impl<A> Trie<A> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach `listener` at `namespace`, creating intermediate nodes as needed.
    ///
    /// Appends; never replaces or prunes.
    pub fn insert(&mut self, namespace: &Namespace, listener: Listener<A>) {
        let mut node = &mut self.root;
        for segment in namespace.segments() {
            node = node.children.entry(segment.clone()).or_default();
        }
        node.listeners.push(listener);
    }

    /// Walk `namespace` and visit nodes from the deepest match back to the root.
    ///
    /// A visitor returning `false` stops ancestor visitation; the traversal then
    /// returns `false`. Dead nodes are pruned on the way up either way.
    pub fn traverse<F>(&mut self, namespace: &Namespace, mut visitor: F) -> bool
    where
        F: FnMut(&mut Node<A>, Visit) -> bool,
    {
        walk(&mut self.root, namespace.segments(), 0, &mut visitor)
    }

    /// The node at exactly `namespace`, if it exists.
    pub fn get(&self, namespace: &Namespace) -> Option<&Node<A>> {
        namespace
            .segments()
            .iter()
            .try_fold(&self.root, |node, segment| node.child(segment))
    }

    /// Whether any node on the prefix chain of `namespace` holds a listener.
    ///
    /// Read-only; does not prune.
    pub fn reaches_listener(&self, namespace: &Namespace) -> bool {
        let mut node = &self.root;
        if !node.listeners.is_empty() {
            return true;
        }
        for segment in namespace.segments() {
            match node.child(segment) {
                Some(next) => node = next,
                None => return false,
            }
            if !node.listeners.is_empty() {
                return true;
            }
        }
        false
    }

    /// Live nodes, root included.
    pub fn node_count(&self) -> usize {
        self.root.count()
    }
}

fn walk<A, F>(node: &mut Node<A>, path: &[String], depth: usize, visitor: &mut F) -> bool
where
    F: FnMut(&mut Node<A>, Visit) -> bool,
{
    let mut reach = if path.is_empty() {
        Reach::Exact
    } else {
        Reach::Nearest
    };

    if let Some((segment, rest)) = path.split_first() {
        if let Some(child) = node.children.get_mut(segment) {
            let propagate = walk(child, rest, depth + 1, visitor);

            if child.is_dead() {
                node.children.remove(segment);
                tracing::trace!(segment = %segment, depth = depth + 1, "pruned dead namespace node");
            }

            if !propagate {
                return false;
            }
            reach = Reach::Ancestor;
        }
    }

    visitor(node, Visit { depth, reach })
}
