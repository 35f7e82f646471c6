//! Merkle tree computation for Bitcoin transactions.
//!
//! The tree lives in an arena: nodes are stored in one vector and refer to
//! their children by index. When a level has an odd number of nodes the last
//! one is paired with itself, so a parent may reference the same child index
//! on both sides.

use crate::error::{Error, Result};
use crate::hash::hash_pair;

/// A node in the merkle arena. Leaves have neither child.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MerkleNode {
    /// Hash of this node (internal byte order).
    pub hash: [u8; 32],
    /// Arena index of the left child.
    pub left: Option<usize>,
    /// Arena index of the right child.
    pub right: Option<usize>,
}

impl MerkleNode {
    fn leaf(hash: [u8; 32]) -> Self {
        MerkleNode { hash, left: None, right: None }
    }

    /// Whether this node is a leaf (a transaction hash).
    pub fn is_leaf(&self) -> bool {
        self.left.is_none() && self.right.is_none()
    }
}

/// A full merkle tree over a block's transaction hashes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MerkleTree {
    nodes: Vec<MerkleNode>,
    root: Option<usize>,
    leaf_count: usize,
}

impl MerkleTree {
    /// Build the tree bottom-up from transaction hashes in block order.
    ///
    /// A single hash is its own root and is never re-hashed.
    pub fn build(leaves: &[[u8; 32]]) -> Self {
        let mut nodes: Vec<MerkleNode> = Vec::with_capacity(leaves.len() * 2);
        let mut level: Vec<usize> = Vec::with_capacity(leaves.len() + 1);
        for hash in leaves {
            level.push(nodes.len());
            nodes.push(MerkleNode::leaf(*hash));
        }

        if level.is_empty() {
            return MerkleTree::default();
        }

        while level.len() > 1 {
            if level.len() % 2 != 0 {
                level.push(level[level.len() - 1]);
            }

            let mut next = Vec::with_capacity(level.len() / 2 + 1);
            for pair in level.chunks_exact(2) {
                let (left, right) = (pair[0], pair[1]);
                let hash = hash_pair(&nodes[left].hash, &nodes[right].hash);
                next.push(nodes.len());
                nodes.push(MerkleNode { hash, left: Some(left), right: Some(right) });
            }
            level = next;
        }

        MerkleTree {
            nodes,
            root: Some(level[0]),
            leaf_count: leaves.len(),
        }
    }

    /// The merkle root, or all zeros for an empty tree.
    pub fn root(&self) -> [u8; 32] {
        self.root.map(|i| self.nodes[i].hash).unwrap_or([0u8; 32])
    }

    /// The root node, if the tree has any leaves.
    pub fn root_node(&self) -> Option<&MerkleNode> {
        self.root.map(|i| &self.nodes[i])
    }

    /// Look up a node by arena index.
    pub fn node(&self, index: usize) -> Option<&MerkleNode> {
        self.nodes.get(index)
    }

    /// Number of leaves (transactions).
    pub fn len(&self) -> usize {
        self.leaf_count
    }

    pub fn is_empty(&self) -> bool {
        self.leaf_count == 0
    }

    /// Arena indices from the root down to the leftmost leaf.
    fn left_path(&self) -> Vec<usize> {
        let mut path = Vec::new();
        let mut current = self.root;
        while let Some(index) = current {
            path.push(index);
            current = self.nodes[index].left;
        }
        path
    }

    /// Replace the leftmost leaf (the coinbase) and rehash only the nodes on
    /// its path to the root. Every other node is left untouched.
    pub fn update_leftmost(&mut self, leaf_hash: [u8; 32]) -> Result<()> {
        let path = self.left_path();
        let (&leaf, ancestors) = path
            .split_last()
            .ok_or(Error::UninitializedBlock("merkle tree has no leaves"))?;

        self.nodes[leaf].hash = leaf_hash;

        for &index in ancestors.iter().rev() {
            // Interior nodes always carry both children.
            if let MerkleNode { left: Some(left), right: Some(right), .. } = self.nodes[index] {
                self.nodes[index].hash = hash_pair(&self.nodes[left].hash, &self.nodes[right].hash);
            }
        }

        Ok(())
    }

    /// The merkle edge: sibling hashes of the leftmost leaf, from the bottom
    /// level up. Folding a coinbase hash through these reproduces the root.
    pub fn left_edge(&self) -> Vec<[u8; 32]> {
        let path = self.left_path();
        let mut edge: Vec<[u8; 32]> = path
            .iter()
            .filter_map(|&index| self.nodes[index].right)
            .map(|right| self.nodes[right].hash)
            .collect();
        edge.reverse();
        edge
    }
}

/// Compute the merkle root from a list of transaction IDs.
///
/// For a single transaction (like a coinbase-only block), the merkle root is
/// simply the txid itself. An empty list gives all zeros.
pub fn compute_merkle_root(txids: &[[u8; 32]]) -> [u8; 32] {
    MerkleTree::build(txids).root()
}

/// Fold a leaf hash up through a merkle edge: at each level the running hash
/// is the left input and the edge entry the right.
pub fn fold_merkle_edge(leaf: [u8; 32], edge: &[[u8; 32]]) -> [u8; 32] {
    edge.iter().fold(leaf, |running, sibling| hash_pair(&running, sibling))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hash::double_sha256;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn random_hashes(rng: &mut StdRng, n: usize) -> Vec<[u8; 32]> {
        (0..n).map(|_| rng.gen::<[u8; 32]>()).collect()
    }

    #[test]
    fn test_empty_tree() {
        let tree = MerkleTree::build(&[]);
        assert!(tree.is_empty());
        assert_eq!(tree.root(), [0u8; 32]);
        assert!(tree.left_edge().is_empty());

        let mut tree = tree;
        assert!(matches!(tree.update_leftmost([1u8; 32]), Err(Error::UninitializedBlock(_))));
    }

    #[test]
    fn test_single_tx_merkle_root() {
        let txid = [0x42u8; 32];
        let tree = MerkleTree::build(&[txid]);
        assert_eq!(tree.root(), txid);
        assert!(tree.root_node().unwrap().is_leaf());
        assert!(tree.left_edge().is_empty());
        assert_eq!(compute_merkle_root(&[txid]), txid);
    }

    #[test]
    fn test_two_tx_merkle_root() {
        let tx1 = [0x11u8; 32];
        let tx2 = [0x22u8; 32];

        let mut combined = [0u8; 64];
        combined[..32].copy_from_slice(&tx1);
        combined[32..].copy_from_slice(&tx2);
        let expected = double_sha256(&combined);

        assert_eq!(compute_merkle_root(&[tx1, tx2]), expected);
    }

    #[test]
    fn test_three_tx_merkle_root() {
        // With 3 transactions, the third is duplicated
        let tx1 = [0x11u8; 32];
        let tx2 = [0x22u8; 32];
        let tx3 = [0x33u8; 32];

        let tree = MerkleTree::build(&[tx1, tx2, tx3]);

        let h12 = hash_pair(&tx1, &tx2);
        let h33 = hash_pair(&tx3, &tx3);
        assert_eq!(tree.root(), hash_pair(&h12, &h33));

        // The duplicated node is shared, not copied.
        let root = tree.root_node().unwrap();
        let right = tree.node(root.right.unwrap()).unwrap();
        assert_eq!(right.left, right.right);
    }

    #[test]
    fn test_update_leftmost_matches_rebuild() {
        let mut rng = StdRng::seed_from_u64(0x5eed);

        for n in 1..=33 {
            let mut hashes = random_hashes(&mut rng, n);
            let mut tree = MerkleTree::build(&hashes);

            for _ in 0..3 {
                let coinbase = rng.gen::<[u8; 32]>();
                tree.update_leftmost(coinbase).unwrap();
                hashes[0] = coinbase;

                let rebuilt = MerkleTree::build(&hashes);
                assert_eq!(tree.root(), rebuilt.root(), "n = {n}");
                assert_eq!(tree, rebuilt, "n = {n}");
            }
        }
    }

    #[test]
    fn test_left_edge_folds_to_root() {
        let mut rng = StdRng::seed_from_u64(7);

        for n in 1..=20 {
            let hashes = random_hashes(&mut rng, n);
            let tree = MerkleTree::build(&hashes);
            let edge = tree.left_edge();

            let expected_depth = (usize::BITS - (n - 1).leading_zeros()) as usize;
            assert_eq!(edge.len(), expected_depth, "n = {n}");
            assert_eq!(fold_merkle_edge(hashes[0], &edge), tree.root(), "n = {n}");

            // The edge does not depend on the coinbase.
            let replacement = rng.gen::<[u8; 32]>();
            let mut changed = hashes.clone();
            changed[0] = replacement;
            assert_eq!(MerkleTree::build(&changed).left_edge(), edge);
            assert_eq!(fold_merkle_edge(replacement, &edge), compute_merkle_root(&changed));
        }
    }

    #[test]
    fn test_left_edge_for_three() {
        let tx = [[0x11u8; 32], [0x22u8; 32], [0x33u8; 32]];
        let edge = MerkleTree::build(&tx).left_edge();
        assert_eq!(edge, vec![tx[1], hash_pair(&tx[2], &tx[2])]);
    }
}
