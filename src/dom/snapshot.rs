//! In-memory document backend
//!
//! A snapshot is a rendered dashboard serialized as a tree of nodes (tag,
//! class, role, own text, bounding size, children). An external capture
//! tool writes it after logging in; `SnapshotSession` reads it fresh for
//! every cycle. Replacing the tree with `rerender` bumps a generation
//! counter and invalidates every element handed out before, the same way
//! a live page invalidates references when it re-renders.

use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock, RwLockReadGuard};

use async_trait::async_trait;
use log::debug;
use serde::{Deserialize, Serialize};

use super::{DocumentHandle, Element, ElementHandle, Rect, TextQuery, normalize_text};
use crate::error::{Result, WatchError};
use crate::monitor::SessionProvider;

/// Serialized form of one rendered node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SnapshotNode {
    pub tag: String,
    pub class: Option<String>,
    pub role: Option<String>,
    /// Text directly inside this node, excluding children
    pub text: String,
    pub rect: Rect,
    pub children: Vec<SnapshotNode>,
}

impl Default for SnapshotNode {
    fn default() -> Self {
        Self {
            tag: "div".to_string(),
            class: None,
            role: None,
            text: String::new(),
            rect: Rect::default(),
            children: Vec::new(),
        }
    }
}

impl SnapshotNode {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            ..Default::default()
        }
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    pub fn with_class(mut self, class: impl Into<String>) -> Self {
        self.class = Some(class.into());
        self
    }

    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.role = Some(role.into());
        self
    }

    pub fn with_rect(mut self, width: f64, height: f64) -> Self {
        self.rect = Rect::new(width, height);
        self
    }

    pub fn with_child(mut self, child: SnapshotNode) -> Self {
        self.children.push(child);
        self
    }

    pub fn with_children(mut self, children: impl IntoIterator<Item = SnapshotNode>) -> Self {
        self.children.extend(children);
        self
    }
}

/// Flattened node; `index..end` spans the node and all its descendants
#[derive(Debug)]
struct Node {
    tag: String,
    class: Option<String>,
    role: Option<String>,
    text: String,
    rect: Rect,
    parent: Option<usize>,
    end: usize,
}

#[derive(Debug)]
struct Tree {
    generation: u64,
    /// Nodes in document (pre-)order
    nodes: Vec<Node>,
}

impl Tree {
    fn flatten(root: SnapshotNode, generation: u64) -> Self {
        let mut nodes = Vec::new();
        push_node(&mut nodes, root, None);
        Self { generation, nodes }
    }
}

fn push_node(nodes: &mut Vec<Node>, node: SnapshotNode, parent: Option<usize>) {
    let index = nodes.len();
    nodes.push(Node {
        tag: node.tag,
        class: node.class,
        role: node.role,
        text: node.text,
        rect: node.rect,
        parent,
        end: index + 1,
    });
    for child in node.children {
        push_node(nodes, child, Some(index));
    }
    nodes[index].end = nodes.len();
}

/// A rendered dashboard held in memory
#[derive(Debug, Clone)]
pub struct SnapshotDocument {
    tree: Arc<RwLock<Tree>>,
}

impl SnapshotDocument {
    pub fn new(root: SnapshotNode) -> Self {
        Self {
            tree: Arc::new(RwLock::new(Tree::flatten(root, 0))),
        }
    }

    /// Parse a snapshot from YAML (or JSON)
    pub fn from_yaml_str(content: &str) -> Result<Self> {
        let root: SnapshotNode = serde_yaml::from_str(content)?;
        Ok(Self::new(root))
    }

    /// Load a snapshot file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&content)
    }

    /// Replace the rendered tree; every element obtained earlier goes stale
    pub fn rerender(&self, root: SnapshotNode) {
        let mut tree = self.tree.write().unwrap_or_else(|e| e.into_inner());
        let generation = tree.generation + 1;
        *tree = Tree::flatten(root, generation);
        debug!("Snapshot re-rendered, generation {}", generation);
    }

    /// Number of times the tree has been replaced
    pub fn generation(&self) -> u64 {
        read_tree(&self.tree).generation
    }

    fn element(&self, generation: u64, index: usize) -> Element {
        Arc::new(SnapshotElement {
            tree: Arc::clone(&self.tree),
            generation,
            index,
        })
    }
}

fn read_tree(tree: &RwLock<Tree>) -> RwLockReadGuard<'_, Tree> {
    tree.read().unwrap_or_else(|e| e.into_inner())
}

#[async_trait]
impl DocumentHandle for SnapshotDocument {
    async fn find_all(&self, query: &TextQuery) -> Result<Vec<Element>> {
        let tree = read_tree(&self.tree);
        Ok(tree
            .nodes
            .iter()
            .enumerate()
            .filter(|(_, node)| query.matches(&node.text))
            .map(|(index, _)| self.element(tree.generation, index))
            .collect())
    }
}

/// Element of a SnapshotDocument, bound to the generation it came from
pub struct SnapshotElement {
    tree: Arc<RwLock<Tree>>,
    generation: u64,
    index: usize,
}

impl std::fmt::Debug for SnapshotElement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SnapshotElement")
            .field("generation", &self.generation)
            .field("index", &self.index)
            .finish()
    }
}

impl SnapshotElement {
    /// Read the tree, failing if it was re-rendered since this handle was made
    fn live(&self) -> Result<RwLockReadGuard<'_, Tree>> {
        let tree = read_tree(&self.tree);
        if tree.generation != self.generation || self.index >= tree.nodes.len() {
            return Err(WatchError::StaleReference);
        }
        Ok(tree)
    }

    fn sibling(&self, index: usize) -> Element {
        Arc::new(SnapshotElement {
            tree: Arc::clone(&self.tree),
            generation: self.generation,
            index,
        })
    }
}

#[async_trait]
impl ElementHandle for SnapshotElement {
    async fn text(&self) -> Result<String> {
        let tree = self.live()?;
        let node = &tree.nodes[self.index];
        let joined = tree.nodes[self.index..node.end]
            .iter()
            .map(|n| n.text.as_str())
            .filter(|t| !t.trim().is_empty())
            .collect::<Vec<_>>()
            .join(" ");
        Ok(normalize_text(&joined))
    }

    async fn rect(&self) -> Result<Rect> {
        let tree = self.live()?;
        Ok(tree.nodes[self.index].rect)
    }

    async fn attribute(&self, name: &str) -> Result<Option<String>> {
        let tree = self.live()?;
        let node = &tree.nodes[self.index];
        Ok(match name {
            "class" => node.class.clone(),
            "role" => node.role.clone(),
            "tag" => Some(node.tag.clone()),
            _ => None,
        })
    }

    async fn parent(&self) -> Result<Option<Element>> {
        let tree = self.live()?;
        Ok(tree.nodes[self.index].parent.map(|p| self.sibling(p)))
    }

    async fn descendants(&self, query: &TextQuery) -> Result<Vec<Element>> {
        let tree = self.live()?;
        let end = tree.nodes[self.index].end;
        Ok((self.index + 1..end)
            .filter(|&i| query.matches(&tree.nodes[i].text))
            .map(|i| self.sibling(i))
            .collect())
    }
}

/// Session provider that re-reads a snapshot file for every cycle
#[derive(Debug, Clone)]
pub struct SnapshotSession {
    path: PathBuf,
}

impl SnapshotSession {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl SessionProvider for SnapshotSession {
    async fn open(&self) -> Result<Box<dyn DocumentHandle>> {
        let content = tokio::fs::read_to_string(&self.path).await.map_err(|e| {
            WatchError::Session(format!("cannot read snapshot {}: {}", self.path.display(), e))
        })?;
        let document = SnapshotDocument::from_yaml_str(&content).map_err(|e| {
            WatchError::Session(format!("invalid snapshot {}: {}", self.path.display(), e))
        })?;
        debug!("Opened snapshot session from {}", self.path.display());
        Ok(Box::new(document))
    }

    fn describe(&self) -> String {
        format!("snapshot {}", self.path.display())
    }
}
