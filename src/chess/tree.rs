//! Move tree shared by every merged game.
//!
//! A trie over move sequences: each node is a position reached by a unique
//! path from the root, children are the distinct next moves seen from it.
//! Nodes live in an arena owned by the tree and are never removed while the
//! tree exists.

use super::types::GameRecord;
use shakmaty::Move;
use smallvec::SmallVec;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

#[derive(Debug, Clone)]
pub struct MoveNode {
    mv: Option<Move>,
    children: SmallVec<[NodeId; 2]>,
}

impl MoveNode {
    /// The move leading here; `None` only for the root.
    pub fn mv(&self) -> Option<Move> {
        self.mv
    }

    /// Children in the order their moves were first merged.
    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct MoveTree {
    nodes: Vec<MoveNode>,
    headers: Vec<(String, String)>,
}

impl Default for MoveTree {
    fn default() -> Self {
        Self::new()
    }
}

impl MoveTree {
    /// Empty tree carrying the headers of the merged game.
    pub fn new() -> Self {
        Self::with_headers(vec![
            ("Event".to_string(), "Merged Games".to_string()),
            ("White".to_string(), "Various".to_string()),
            ("Black".to_string(), "Various".to_string()),
            ("Result".to_string(), "*".to_string()),
        ])
    }

    pub fn with_headers(headers: Vec<(String, String)>) -> Self {
        Self {
            nodes: vec![MoveNode {
                mv: None,
                children: SmallVec::new(),
            }],
            headers,
        }
    }

    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    pub fn node(&self, id: NodeId) -> &MoveNode {
        &self.nodes[id.0]
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.node(id).children()
    }

    /// Number of nodes, root included.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn find_child(&self, parent: NodeId, mv: &Move) -> Option<NodeId> {
        self.children(parent)
            .iter()
            .copied()
            .find(|&child| self.nodes[child.0].mv.as_ref() == Some(mv))
    }

    fn add_child(&mut self, parent: NodeId, mv: Move) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(MoveNode {
            mv: Some(mv),
            children: SmallVec::new(),
        });
        self.nodes[parent.0].children.push(id);
        id
    }

    /// Folds one move sequence into the tree, reusing the shared prefix and
    /// appending new nodes from the first unseen move on.
    pub fn merge(&mut self, moves: &[Move]) {
        let mut cursor = self.root();
        for mv in moves {
            cursor = match self.find_child(cursor, mv) {
                Some(child) => child,
                None => self.add_child(cursor, *mv),
            };
        }
    }

    /// Only the mainline is merged; the record's own variations, comments
    /// and headers stay out of the shared tree.
    pub fn merge_game(&mut self, game: &GameRecord) {
        self.merge(&game.mainline);
    }

    /// Follows `moves` from the root, returning the node reached when the
    /// whole sequence is present.
    pub fn find_line(&self, moves: &[Move]) -> Option<NodeId> {
        moves
            .iter()
            .try_fold(self.root(), |cursor, mv| self.find_child(cursor, mv))
    }
}
