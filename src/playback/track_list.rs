//! Doubly linked view over the songs of a loaded playlist.
//!
//! Nodes live in a vector and link to each other by index, which keeps the
//! structure free of reference cycles while still giving O(1) neighbour
//! access in both directions.

use crate::catalog::Song;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

impl NodeId {
    /// Zero-based position of the node in link order.
    pub fn position(&self) -> usize {
        self.0
    }
}

#[derive(Debug, Clone)]
struct Node {
    song: Song,
    prev: Option<NodeId>,
    next: Option<NodeId>,
}

#[derive(Debug, Clone, Default)]
pub struct TrackList {
    nodes: Vec<Node>,
}

impl TrackList {
    pub fn new(songs: Vec<Song>) -> Self {
        let len = songs.len();
        let nodes = songs
            .into_iter()
            .enumerate()
            .map(|(i, song)| Node {
                song,
                prev: i.checked_sub(1).map(NodeId),
                next: if i + 1 < len { Some(NodeId(i + 1)) } else { None },
            })
            .collect();
        Self { nodes }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn head(&self) -> Option<NodeId> {
        if self.nodes.is_empty() {
            None
        } else {
            Some(NodeId(0))
        }
    }

    pub fn tail(&self) -> Option<NodeId> {
        self.nodes.len().checked_sub(1).map(NodeId)
    }

    pub fn next(&self, id: NodeId) -> Option<NodeId> {
        self.nodes.get(id.0).and_then(|node| node.next)
    }

    pub fn prev(&self, id: NodeId) -> Option<NodeId> {
        self.nodes.get(id.0).and_then(|node| node.prev)
    }

    pub fn song(&self, id: NodeId) -> Option<&Song> {
        self.nodes.get(id.0).map(|node| &node.song)
    }

    /// Node ids in link order.
    pub fn ids(&self) -> Vec<NodeId> {
        let mut ids = Vec::with_capacity(self.nodes.len());
        let mut cursor = self.head();
        while let Some(id) = cursor {
            ids.push(id);
            cursor = self.next(id);
        }
        ids
    }
}
