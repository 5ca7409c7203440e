//! Transaction merkle root.
//!
//! Leaves are hashed as `BLAKE3(0x00 || txid)` and inner nodes as
//! `BLAKE3(0x01 || left || right)`. An odd layer carries its last node up
//! by pairing it with itself. No transactions gives [`Hash256::ZERO`].

use crate::types::Hash256;

const LEAF_PREFIX: u8 = 0x00;
const NODE_PREFIX: u8 = 0x01;

fn leaf_hash(txid: &Hash256) -> Hash256 {
    let mut hasher = blake3::Hasher::new();
    hasher.update(&[LEAF_PREFIX]);
    hasher.update(txid.as_bytes());
    Hash256(hasher.finalize().into())
}

fn node_hash(left: &Hash256, right: &Hash256) -> Hash256 {
    let mut hasher = blake3::Hasher::new();
    hasher.update(&[NODE_PREFIX]);
    hasher.update(left.as_bytes());
    hasher.update(right.as_bytes());
    Hash256(hasher.finalize().into())
}

/// Merkle root over transaction ids in block order.
pub fn merkle_root(txids: &[Hash256]) -> Hash256 {
    let mut layer: Vec<Hash256> = txids.iter().map(leaf_hash).collect();
    if layer.is_empty() {
        return Hash256::ZERO;
    }
    while layer.len() > 1 {
        layer = layer
            .chunks(2)
            .map(|pair| node_hash(&pair[0], pair.get(1).unwrap_or(&pair[0])))
            .collect();
    }
    layer[0]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(n: u8) -> Vec<Hash256> {
        (0..n).map(|i| Hash256([i; 32])).collect()
    }

    #[test]
    fn empty_is_zero() {
        assert_eq!(merkle_root(&[]), Hash256::ZERO);
    }

    #[test]
    fn single_leaf_is_leaf_hash() {
        let leaves = ids(1);
        assert_eq!(merkle_root(&leaves), leaf_hash(&leaves[0]));
    }

    #[test]
    fn odd_layer_duplicates_last() {
        let leaves = ids(3);
        let l: Vec<Hash256> = leaves.iter().map(leaf_hash).collect();
        let expected = node_hash(&node_hash(&l[0], &l[1]), &node_hash(&l[2], &l[2]));
        assert_eq!(merkle_root(&leaves), expected);
    }

    #[test]
    fn order_matters() {
        let mut leaves = ids(4);
        let root = merkle_root(&leaves);
        leaves.swap(0, 1);
        assert_ne!(merkle_root(&leaves), root);
    }
}
