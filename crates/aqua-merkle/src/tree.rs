//! Merkle aggregation over claim leaves
use crate::leaf::hash;
use aqua_core::MerkleProofNode;

/// Parent of two nodes: hash of the concatenated hex strings
pub fn combine(left: &str, right: &str) -> String {
    hash(&format!("{}{}", left, right))
}

/// Root of `leaves`, `None` when there are none
pub fn merkle_root(leaves: &[String]) -> Option<String> {
    MerkleTree::build(leaves).root().map(str::to_string)
}

/// Binary Merkle tree, kept level by level from the leaves up.
///
/// A level with an odd node count pairs its last node with itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MerkleTree {
    levels: Vec<Vec<String>>,
}

impl MerkleTree {
    pub fn build(leaves: &[String]) -> Self {
        let mut levels = vec![leaves.to_vec()];
        loop {
            let current = &levels[levels.len() - 1];
            if current.len() <= 1 {
                break;
            }
            let next: Vec<String> = current
                .chunks(2)
                .map(|pair| {
                    let left = &pair[0];
                    let right = pair.get(1).unwrap_or(left);
                    combine(left, right)
                })
                .collect();
            levels.push(next);
        }
        Self { levels }
    }

    pub fn root(&self) -> Option<&str> {
        self.levels
            .last()
            .and_then(|level| level.first())
            .map(String::as_str)
    }

    pub fn leaves(&self) -> &[String] {
        &self.levels[0]
    }

    /// Levels from the leaves (index 0) up to the root
    pub fn levels(&self) -> &[Vec<String>] {
        &self.levels
    }

    /// Number of combine steps between a leaf and the root
    pub fn depth(&self) -> usize {
        self.levels.len() - 1
    }

    /// Inclusion proof for the leaf at `index`, ordered leaf to root.
    ///
    /// A single-leaf tree yields an empty path.
    pub fn proof_for(&self, index: usize) -> Option<Vec<MerkleProofNode>> {
        if index >= self.leaves().len() {
            return None;
        }

        let mut path = Vec::with_capacity(self.depth());
        let mut position = index;
        for window in self.levels.windows(2) {
            let (level, parents) = (&window[0], &window[1]);
            let node = &level[position];
            let sibling = level.get(position ^ 1).unwrap_or(node);
            let (left, right) = if position % 2 == 0 {
                (node, sibling)
            } else {
                (sibling, node)
            };
            path.push(MerkleProofNode::new(
                Some(left.clone()),
                Some(right.clone()),
                parents[position / 2].clone(),
            ));
            position /= 2;
        }
        Some(path)
    }
}
