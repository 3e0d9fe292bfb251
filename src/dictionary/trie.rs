//! Trie dictionary
//!
//! Values are stored in a radix tree keyed by shared byte prefixes. Each node
//! holds the bytes common to its whole subtree, whether a value ends there,
//! and an ordered child table keyed by the next byte.
//!
//! ```text
//! [u32 size][u32 root_offset][u32 nodes_len][nodes]
//!
//! node: [u8 meta][u32 subtree_values][prefix?][children]
//!   meta bit0     value ends at this node
//!   meta bit1     prefix present: [u32 len][bytes]
//!   meta bits2..3 child shape
//!     0 leaf      no children
//!     1 single    [u8 byte][u32 child]
//!     2 sparse    [u32 n][n × u8 bytes][n × u32 children]
//!     3 dense     [u8 first][u32 span][span × u32 children], absent = u32::MAX
//! ```
//!
//! Nodes are written children first, so every child offset is smaller than
//! its parent's. The subtree value counts give ranks: the rank of a value is
//! the number of values ending on its path plus the counts of all smaller
//! sibling subtrees along the way.

use std::borrow::Cow;

use super::SortedByteArraySet;
use crate::buffer::Buffer;
use crate::format::codec::{put_u32, take_slice, take_u32};
use crate::format::{FormatError, FormatResult};

const META_VALUE: u8 = 0b0001;
const META_PREFIX: u8 = 0b0010;
const SHAPE_SHIFT: u8 = 2;

const SHAPE_LEAF: u8 = 0;
const SHAPE_SINGLE: u8 = 1;
const SHAPE_SPARSE: u8 = 2;
const SHAPE_DENSE: u8 = 3;

const ABSENT: u32 = u32::MAX;

/// Fields shared by every node shape
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeHead {
    /// A value ends at this node
    pub has_value: bool,
    /// Values in this subtree, this node's included
    pub count: usize,
    /// Offset of the prefix bytes within the node region
    pub prefix_at: usize,
    pub prefix_len: usize,
}

/// Decoded trie node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrieNode {
    Leaf(NodeHead),
    SingleEdge {
        head: NodeHead,
        byte: u8,
        child: usize,
    },
    SparseEdges {
        head: NodeHead,
        len: usize,
        /// Offset of the edge byte table; child offsets follow it
        table_at: usize,
    },
    DenseEdges {
        head: NodeHead,
        first: u8,
        span: usize,
        table_at: usize,
    },
}

impl TrieNode {
    pub fn head(&self) -> &NodeHead {
        match self {
            TrieNode::Leaf(head) => head,
            TrieNode::SingleEdge { head, .. } => head,
            TrieNode::SparseEdges { head, .. } => head,
            TrieNode::DenseEdges { head, .. } => head,
        }
    }

    /// Number of child slots; dense slots may be empty
    fn slots(&self) -> usize {
        match self {
            TrieNode::Leaf(_) => 0,
            TrieNode::SingleEdge { .. } => 1,
            TrieNode::SparseEdges { len, .. } => *len,
            TrieNode::DenseEdges { span, .. } => *span,
        }
    }

    /// Edge byte and child offset of slot `k`, in ascending byte order
    fn edge(&self, nodes: &Buffer, k: usize) -> Option<(u8, usize)> {
        match *self {
            TrieNode::Leaf(_) => None,
            TrieNode::SingleEdge { byte, child, .. } => Some((byte, child)),
            TrieNode::SparseEdges { len, table_at, .. } => {
                let byte = nodes.u8_at(table_at + k);
                let child = nodes.u32_at(table_at + len + k * 4) as usize;
                Some((byte, child))
            }
            TrieNode::DenseEdges {
                first, table_at, ..
            } => match nodes.u32_at(table_at + k * 4) {
                ABSENT => None,
                child => Some((first + k as u8, child as usize)),
            },
        }
    }
}

/// Trie-compressed dictionary
#[derive(Debug, Clone)]
pub struct TrieSortedSet {
    size: usize,
    root: usize,
    nodes: Buffer,
}

impl TrieSortedSet {
    /// Decodes the body that follows the kind tag and validates every node
    pub fn decode(buffer: &mut Buffer) -> FormatResult<Self> {
        let size = take_u32(buffer, "trie size")?;
        let root = take_u32(buffer, "trie root offset")?;
        let nodes_len = take_u32(buffer, "trie node region length")?;
        let nodes = take_slice(buffer, nodes_len, "trie nodes")?;
        let set = Self { size, root, nodes };
        set.validate()?;
        Ok(set)
    }

    /// Node at `offset`; offsets reachable from the root were validated on decode
    pub fn node(&self, offset: usize) -> TrieNode {
        let meta = self.nodes.u8_at(offset);
        let mut cursor = offset + 1;
        let count = self.nodes.u32_at(cursor) as usize;
        cursor += 4;
        let (prefix_at, prefix_len) = if meta & META_PREFIX != 0 {
            let len = self.nodes.u32_at(cursor) as usize;
            cursor += 4;
            (cursor, len)
        } else {
            (cursor, 0)
        };
        cursor += prefix_len;
        let head = NodeHead {
            has_value: meta & META_VALUE != 0,
            count,
            prefix_at,
            prefix_len,
        };
        match meta >> SHAPE_SHIFT {
            SHAPE_SINGLE => TrieNode::SingleEdge {
                head,
                byte: self.nodes.u8_at(cursor),
                child: self.nodes.u32_at(cursor + 1) as usize,
            },
            SHAPE_SPARSE => TrieNode::SparseEdges {
                head,
                len: self.nodes.u32_at(cursor) as usize,
                table_at: cursor + 4,
            },
            SHAPE_DENSE => TrieNode::DenseEdges {
                head,
                first: self.nodes.u8_at(cursor),
                span: self.nodes.u32_at(cursor + 1) as usize,
                table_at: cursor + 5,
            },
            _ => TrieNode::Leaf(head),
        }
    }

    fn prefix(&self, head: &NodeHead) -> &[u8] {
        self.nodes.bytes_at(head.prefix_at, head.prefix_len)
    }

    fn count_at(&self, offset: usize) -> usize {
        self.nodes.u32_at(offset + 1) as usize
    }

    /// Number of values smaller than `e`, and whether `e` itself is present
    fn locate(&self, e: &[u8]) -> (usize, bool) {
        if self.size == 0 {
            return (0, false);
        }
        let mut below = 0usize;
        let mut pos = 0usize;
        let mut offset = self.root;
        loop {
            let node = self.node(offset);
            let head = node.head();
            let prefix = self.prefix(head);
            let rest = &e[pos..];
            let common = prefix
                .iter()
                .zip(rest)
                .take_while(|(a, b)| a == b)
                .count();
            if common < prefix.len() {
                // `e` leaves the subtree inside the prefix
                if common < rest.len() && rest[common] > prefix[common] {
                    below += head.count;
                }
                return (below, false);
            }
            pos += prefix.len();
            if pos == e.len() {
                return (below, head.has_value);
            }
            if head.has_value {
                below += 1;
            }

            let byte = e[pos];
            let mut next = None;
            for k in 0..node.slots() {
                if let Some((edge, child)) = node.edge(&self.nodes, k) {
                    if edge < byte {
                        below += self.count_at(child);
                    } else {
                        if edge == byte {
                            next = Some(child);
                        }
                        break;
                    }
                }
            }
            match next {
                Some(child) => {
                    offset = child;
                    pos += 1;
                }
                None => return (below, false),
            }
        }
    }

    fn validate(&self) -> FormatResult<()> {
        if self.size == 0 {
            return Ok(());
        }
        let root = self.check_node(self.root)?;
        if root.head().count != self.size {
            return Err(FormatError::corrupt(format!(
                "trie holds {} values, header says {}",
                root.head().count,
                self.size
            )));
        }

        let mut stack = vec![self.root];
        while let Some(offset) = stack.pop() {
            let node = self.check_node(offset)?;
            let head = node.head();
            let mut total = usize::from(head.has_value);
            let mut last_edge: Option<u8> = None;
            for k in 0..node.slots() {
                let Some((edge, child)) = node.edge(&self.nodes, k) else {
                    continue;
                };
                if child >= offset {
                    return Err(FormatError::corrupt(format!(
                        "trie child {} does not precede node {}",
                        child, offset
                    )));
                }
                if last_edge.map_or(false, |last| edge <= last) {
                    return Err(FormatError::corrupt(format!(
                        "trie edges of node {} out of order",
                        offset
                    )));
                }
                last_edge = Some(edge);
                self.check_node(child)?;
                total += self.count_at(child);
                stack.push(child);
            }
            if head.count == 0 || total != head.count {
                return Err(FormatError::corrupt(format!(
                    "trie node {} counts {} values, children hold {}",
                    offset, head.count, total
                )));
            }
        }
        Ok(())
    }

    /// Bounds-checks the node at `offset` before decoding it
    fn check_node(&self, offset: usize) -> FormatResult<TrieNode> {
        let len = self.nodes.len();
        let out_of_bounds = || FormatError::corrupt(format!("trie node {} out of bounds", offset));
        let fits = |at: usize, width: usize| at.checked_add(width).map_or(false, |end| end <= len);

        if !fits(offset, 5) {
            return Err(out_of_bounds());
        }
        let meta = self.nodes.u8_at(offset);
        if meta & 0xF0 != 0 {
            return Err(FormatError::corrupt(format!(
                "trie node {} has meta {:#04x}",
                offset, meta
            )));
        }
        let mut cursor = offset + 5;
        if meta & META_PREFIX != 0 {
            if !fits(cursor, 4) {
                return Err(out_of_bounds());
            }
            let prefix_len = self.nodes.u32_at(cursor) as usize;
            cursor += 4;
            if !fits(cursor, prefix_len) {
                return Err(out_of_bounds());
            }
            cursor += prefix_len;
        }
        let table_fits = match meta >> SHAPE_SHIFT {
            SHAPE_SINGLE => fits(cursor, 5),
            SHAPE_SPARSE => {
                fits(cursor, 4) && {
                    let n = self.nodes.u32_at(cursor) as usize;
                    n.checked_mul(5).map_or(false, |w| fits(cursor + 4, w))
                }
            }
            SHAPE_DENSE => {
                fits(cursor, 5) && {
                    let first = self.nodes.u8_at(cursor) as usize;
                    let span = self.nodes.u32_at(cursor + 1) as usize;
                    first + span <= 256
                        && span.checked_mul(4).map_or(false, |w| fits(cursor + 5, w))
                }
            }
            _ => true,
        };
        if !table_fits {
            return Err(out_of_bounds());
        }
        Ok(self.node(offset))
    }
}

impl SortedByteArraySet for TrieSortedSet {
    fn size(&self) -> usize {
        self.size
    }

    fn get(&self, index: usize) -> Cow<'_, [u8]> {
        assert!(index < self.size, "index {} out of range {}", index, self.size);
        let mut remaining = index;
        let mut out = Vec::new();
        let mut offset = self.root;
        loop {
            let node = self.node(offset);
            let head = node.head();
            out.extend_from_slice(self.prefix(head));
            if head.has_value {
                if remaining == 0 {
                    return Cow::Owned(out);
                }
                remaining -= 1;
            }

            let mut next = None;
            for k in 0..node.slots() {
                if let Some((edge, child)) = node.edge(&self.nodes, k) {
                    let count = self.count_at(child);
                    if remaining < count {
                        next = Some((edge, child));
                        break;
                    }
                    remaining -= count;
                }
            }
            match next {
                Some((edge, child)) => {
                    out.push(edge);
                    offset = child;
                }
                None => return Cow::Owned(out),
            }
        }
    }

    fn search(&self, e: &[u8], skip_equal: bool, from: usize, to: usize) -> usize {
        let (below, found) = self.locate(e);
        let rank = below + usize::from(skip_equal && found);
        rank.clamp(from, to.max(from))
    }

    fn index_of(&self, e: &[u8]) -> Option<usize> {
        match self.locate(e) {
            (rank, true) => Some(rank),
            _ => None,
        }
    }
}

/// Writes `[u32 size][u32 root][u32 nodes_len][nodes]` for sorted distinct values
pub(super) fn write(values: &[&[u8]], out: &mut Vec<u8>) {
    let mut nodes = Vec::new();
    let root = if values.is_empty() {
        0
    } else {
        write_node(values, 0, &mut nodes)
    };
    put_u32(out, values.len());
    put_u32(out, root);
    put_u32(out, nodes.len());
    out.extend_from_slice(&nodes);
}

/// Writes the subtree of `values`, which all share their first `depth` bytes.
/// Returns the node offset.
fn write_node(values: &[&[u8]], depth: usize, nodes: &mut Vec<u8>) -> usize {
    let first = values[0];
    let last = values[values.len() - 1];
    let common = first[depth..]
        .iter()
        .zip(&last[depth..])
        .take_while(|(a, b)| a == b)
        .count();
    let end = depth + common;
    let has_value = first.len() == end;

    let rest = &values[usize::from(has_value)..];
    let mut children: Vec<(u8, usize)> = Vec::new();
    let mut start = 0;
    while start < rest.len() {
        let byte = rest[start][end];
        let mut stop = start + 1;
        while stop < rest.len() && rest[stop][end] == byte {
            stop += 1;
        }
        let child = write_node(&rest[start..stop], end + 1, nodes);
        children.push((byte, child));
        start = stop;
    }

    let shape = match children.len() {
        0 => SHAPE_LEAF,
        1 => SHAPE_SINGLE,
        n => {
            let span = (children[n - 1].0 - children[0].0) as usize + 1;
            let sparse_len = 4 + n * 5;
            let dense_len = 5 + span * 4;
            if dense_len < sparse_len {
                SHAPE_DENSE
            } else {
                SHAPE_SPARSE
            }
        }
    };

    let offset = nodes.len();
    let mut meta = shape << SHAPE_SHIFT;
    if has_value {
        meta |= META_VALUE;
    }
    if common > 0 {
        meta |= META_PREFIX;
    }
    nodes.push(meta);
    put_u32(nodes, values.len());
    if common > 0 {
        put_u32(nodes, common);
        nodes.extend_from_slice(&first[depth..end]);
    }

    match shape {
        SHAPE_SINGLE => {
            nodes.push(children[0].0);
            put_u32(nodes, children[0].1);
        }
        SHAPE_SPARSE => {
            put_u32(nodes, children.len());
            nodes.extend(children.iter().map(|(byte, _)| *byte));
            for (_, child) in &children {
                put_u32(nodes, *child);
            }
        }
        SHAPE_DENSE => {
            let first_byte = children[0].0;
            let span = (children[children.len() - 1].0 - first_byte) as usize + 1;
            nodes.push(first_byte);
            put_u32(nodes, span);
            let mut slots = vec![ABSENT; span];
            for (byte, child) in &children {
                slots[(byte - first_byte) as usize] = *child as u32;
            }
            for slot in slots {
                nodes.extend_from_slice(&slot.to_le_bytes());
            }
        }
        _ => {}
    }
    offset
}

#[cfg(test)]
mod tests {
    use super::*;

    fn trie(values: &[&[u8]]) -> TrieSortedSet {
        let mut out = Vec::new();
        write(values, &mut out);
        TrieSortedSet::decode(&mut Buffer::from_vec(out)).unwrap()
    }

    #[test]
    fn test_shared_prefixes() {
        let values: &[&[u8]] = &[b"doc1", b"doc1234", b"doc2", b"document"];
        let set = trie(values);
        assert_eq!(set.size(), 4);
        for (i, v) in values.iter().enumerate() {
            assert_eq!(&set.get(i)[..], *v);
            assert_eq!(set.index_of(v), Some(i));
        }
        assert_eq!(set.index_of(b"doc"), None);
        assert_eq!(set.index_of(b"doc12"), None);
        assert_eq!(set.index_of(b"documents"), None);
    }

    #[test]
    fn test_empty_value_and_root_value() {
        let set = trie(&[b"", b"a", b"b"]);
        assert_eq!(set.index_of(b""), Some(0));
        assert_eq!(&set.get(0)[..], b"");
        assert_eq!(set.index_of(b"b"), Some(2));
    }

    #[test]
    fn test_ranges_between_branches() {
        let set = trie(&[b"aa", b"ab", b"ba", b"bb"]);
        assert_eq!(set.index_of_greater_than(b"ab", false, usize::MAX), Some(2));
        assert_eq!(set.index_of_greater_than(b"a", false, usize::MAX), Some(0));
        assert_eq!(set.index_of_less_than(b"b", false, 0), Some(1));
        assert_eq!(set.index_of_less_than(b"bz", true, 0), Some(3));
        assert_eq!(set.index_of_less_than(b"a", true, 0), None);
    }

    #[test]
    fn test_dense_node() {
        let values: Vec<Vec<u8>> = (0u8..40).map(|b| vec![b'k', b]).collect();
        let refs: Vec<&[u8]> = values.iter().map(|v| v.as_slice()).collect();
        let set = trie(&refs);

        let root = set.node(set.root);
        assert!(matches!(root, TrieNode::DenseEdges { .. }));
        assert_eq!(root.head().count, 40);
        for (i, v) in refs.iter().enumerate() {
            assert_eq!(set.index_of(v), Some(i));
        }
    }

    #[test]
    fn test_sparse_node() {
        let set = trie(&[b"a", b"m", b"z"]);
        let root = set.node(set.root);
        assert!(matches!(root, TrieNode::SparseEdges { len: 3, .. }));
        assert!(!root.head().has_value);
    }

    #[test]
    fn test_rejects_child_after_parent() {
        // size 1, root 0, a single-edge node pointing at itself
        let mut nodes = vec![SHAPE_SINGLE << SHAPE_SHIFT];
        nodes.extend_from_slice(&1u32.to_le_bytes());
        nodes.push(b'a');
        nodes.extend_from_slice(&0u32.to_le_bytes());

        let mut out = Vec::new();
        put_u32(&mut out, 1);
        put_u32(&mut out, 0);
        put_u32(&mut out, nodes.len());
        out.extend_from_slice(&nodes);

        let err = TrieSortedSet::decode(&mut Buffer::from_vec(out)).unwrap_err();
        assert_eq!(err.code().code(), "SEAL_FORMAT_CORRUPT");
    }

    #[test]
    fn test_rejects_bad_count() {
        let mut out = Vec::new();
        write(&[b"a", b"b"], &mut out);
        // Header claims three values
        out[0..4].copy_from_slice(&3u32.to_le_bytes());
        let err = TrieSortedSet::decode(&mut Buffer::from_vec(out)).unwrap_err();
        assert_eq!(err.code().code(), "SEAL_FORMAT_CORRUPT");
    }
}
