use smt_core::trie::NodeHash;

/// Options when opening a [`crate::Tree`].
#[derive(Debug, Clone)]
pub struct Options {
    /// The length of every key, in bytes.
    pub(crate) key_length: usize,
    /// Whether nodes superseded by a mutation are kept in the store.
    pub(crate) retain_history: bool,
    /// Enable or disable metrics collection.
    pub(crate) metrics: bool,
    /// The root to open the tree at. `None` opens an empty tree.
    pub(crate) root: Option<NodeHash>,
}

impl Options {
    /// Create a new `Options` instance with the default values.
    pub fn new() -> Self {
        Self {
            key_length: 32,
            retain_history: false,
            metrics: false,
            root: None,
        }
    }

    /// Set the length of keys, in bytes.
    ///
    /// Must be more than 0.
    ///
    /// Default: 32.
    pub fn key_length(&mut self, key_length: usize) {
        self.key_length = key_length;
    }

    /// Keep nodes of previous roots in the store, so that they can still be proven against.
    ///
    /// Default: off.
    pub fn retain_history(&mut self, retain_history: bool) {
        self.retain_history = retain_history;
    }

    /// Set metrics collection on or off.
    ///
    /// Default: off.
    pub fn metrics(&mut self, metrics: bool) {
        self.metrics = metrics;
    }

    /// Open the tree at the given root. The store must hold every node reachable from it.
    ///
    /// Default: the empty tree.
    pub fn root(&mut self, root: NodeHash) {
        self.root = Some(root);
    }
}

impl Default for Options {
    fn default() -> Self {
        Self::new()
    }
}
