//! # Merkle Tree
//!
//! Contiguous-array tree over a committed block's member sequence.
//!
//! ## Layout
//!
//! `hashes` has length `branch_count + leaf_count` where `leaf_count` is
//! the member count rounded up to even and `branch_count` is the next
//! power of two at or above it. Index 0 holds `branch_count` as a sentinel
//! (not a digest), the root lives at index 1, node `i` has children at
//! `2i` and `2i+1`, and leaves occupy `[branch_count, branch_count +
//! leaf_count)`. Branch slots whose subtree is entirely padding stay at
//! the zero digest, which `combine` treats as the identity.
//!
//! Build is a pure function of the member sequence and salt: same input,
//! same `hashes` array, same index map.

use super::errors::MerkleError;
use super::hashing::{combine, leaf_hash};
use primitive_types::U256;
use shared_types::{Address, Hash, Member};
use std::collections::BTreeMap;

/// Leaf counts above this break the 32-bit index layout shared with the
/// on-chain verifier.
const MAX_LEAF_COUNT: usize = 1 << 31;

/// Deterministic sibling-sorted Merkle tree.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MerkleTree {
    hashes: Vec<Hash>,
    index_of: BTreeMap<Address, usize>,
    branch_count: usize,
    salt: Option<u64>,
}

impl MerkleTree {
    /// Build the tree over an ordered member sequence.
    ///
    /// Callers pass the members address-sorted; the build preserves the
    /// given order, so an unsorted input produces a different (still
    /// valid) root.
    pub fn build(members: &[Member], salt: Option<u64>) -> Result<Self, MerkleError> {
        if members.is_empty() {
            return Err(MerkleError::EmptyInput);
        }
        let leaf_count = members.len() + members.len() % 2;
        if leaf_count > MAX_LEAF_COUNT {
            return Err(MerkleError::TooManyLeaves(members.len()));
        }
        let branch_count = leaf_count.next_power_of_two();

        let mut hashes = vec![Hash::zero(); branch_count + leaf_count];
        let mut sentinel = [0u8; 32];
        U256::from(branch_count).to_big_endian(&mut sentinel);
        hashes[0] = Hash::from(sentinel);

        let mut index_of = BTreeMap::new();
        for (i, member) in members.iter().enumerate() {
            let slot = branch_count + i;
            hashes[slot] = leaf_hash(salt, &member.address, member.earnings);
            index_of.insert(member.address, slot);
        }

        // Fold levels inward; an out-of-range right child is a zero
        // sibling and combine passes the left node through.
        let mut first = branch_count;
        let mut count = leaf_count;
        while first > 1 {
            let parent_count = (count + 1) / 2;
            for k in 0..parent_count {
                let parent = first / 2 + k;
                let left = hashes[2 * parent];
                let right = if 2 * parent + 1 < first + count {
                    hashes[2 * parent + 1]
                } else {
                    Hash::zero()
                };
                hashes[parent] = combine(&left, &right);
            }
            first /= 2;
            count = parent_count;
        }

        Ok(Self {
            hashes,
            index_of,
            branch_count,
            salt,
        })
    }

    /// The root digest (index 1).
    pub fn root_hash(&self) -> Hash {
        self.hashes[1]
    }

    /// The root as `0x`-prefixed lowercase hex, the form submitted on
    /// chain.
    pub fn root_hex(&self) -> String {
        format!("0x{}", hex::encode(self.root_hash().as_bytes()))
    }

    /// Sibling digests from the member's leaf up to (excluding) the root.
    pub fn path(&self, address: &Address) -> Result<Vec<Hash>, MerkleError> {
        let mut index = *self
            .index_of
            .get(address)
            .ok_or(MerkleError::NotFound(*address))?;
        let mut path = Vec::new();
        while index > 1 {
            let sibling = index ^ 1;
            path.push(if sibling < self.hashes.len() {
                self.hashes[sibling]
            } else {
                Hash::zero()
            });
            index >>= 1;
        }
        Ok(path)
    }

    /// Salt the tree was built with.
    pub fn salt(&self) -> Option<u64> {
        self.salt
    }

    /// Number of branch slots; also the first leaf index and the sentinel
    /// value at index 0.
    pub fn branch_count(&self) -> usize {
        self.branch_count
    }

    /// Whether an address has a leaf in this tree.
    pub fn contains(&self, address: &Address) -> bool {
        self.index_of.contains_key(address)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::hashing::verify_path;

    fn member(byte: u8, earnings: u64) -> Member {
        let mut m = Member::new(Address::from_bytes([byte; 20]));
        m.add_revenue(U256::from(earnings));
        m
    }

    fn assert_all_paths_verify(members: &[Member], salt: Option<u64>) {
        let tree = MerkleTree::build(members, salt).unwrap();
        let root = tree.root_hash();
        for m in members {
            let path = tree.path(&m.address).unwrap();
            assert!(
                verify_path(&root, salt, &m.address, m.earnings, &path),
                "path for {} failed against root {}",
                m.address,
                tree.root_hex()
            );
        }
    }

    #[test]
    fn test_empty_input_rejected() {
        assert_eq!(MerkleTree::build(&[], None), Err(MerkleError::EmptyInput));
    }

    #[test]
    fn test_single_member_zero_sibling() {
        // leaf_count = 2, branch_count = 2: path is exactly the one
        // padding sibling and the root equals the leaf.
        let members = [member(0xAA, 100)];
        let tree = MerkleTree::build(&members, None).unwrap();
        assert_eq!(tree.branch_count(), 2);

        let path = tree.path(&members[0].address).unwrap();
        assert_eq!(path, vec![Hash::zero()]);
        assert_eq!(
            tree.root_hash(),
            leaf_hash(None, &members[0].address, members[0].earnings)
        );
        assert_all_paths_verify(&members, None);
    }

    #[test]
    fn test_two_members_no_padding() {
        let members = [member(1, 10), member(2, 20)];
        let tree = MerkleTree::build(&members, None).unwrap();
        assert_eq!(tree.branch_count(), 2);
        assert_eq!(tree.path(&members[0].address).unwrap().len(), 1);
        assert_all_paths_verify(&members, None);
    }

    #[test]
    fn test_three_members_trailing_zero_leaf() {
        let members = [member(1, 10), member(2, 20), member(3, 30)];
        let tree = MerkleTree::build(&members, None).unwrap();
        assert_eq!(tree.branch_count(), 4);

        // Middle member: one real sibling, then the pair-hash of the
        // other side.
        let path = tree.path(&members[1].address).unwrap();
        assert_eq!(path.len(), 2);
        assert_eq!(
            path[0],
            leaf_hash(None, &members[0].address, members[0].earnings)
        );
        assert_all_paths_verify(&members, None);
    }

    #[test]
    fn test_power_of_two_sizes() {
        for k in 1..=15u32 {
            let members: Vec<Member> = (0..2u64.pow(k))
                .map(|i| {
                    let mut bytes = [0u8; 20];
                    bytes[12..].copy_from_slice(&(i + 1).to_be_bytes());
                    let mut m = Member::new(Address::from_bytes(bytes));
                    m.add_revenue(U256::from(i * 7 + 1));
                    m
                })
                .collect();
            let tree = MerkleTree::build(&members, None).unwrap();
            assert_eq!(tree.branch_count(), members.len().max(2));
            if k <= 8 {
                assert_all_paths_verify(&members, None);
            }
            // Full tree: every path has log2(branch_count) siblings, and
            // the boundary leaves verify at every size.
            let root = tree.root_hash();
            for m in [&members[0], &members[members.len() - 1]] {
                let path = tree.path(&m.address).unwrap();
                assert_eq!(path.len(), tree.branch_count().trailing_zeros() as usize);
                assert!(verify_path(&root, None, &m.address, m.earnings, &path));
            }
        }
    }

    #[test]
    fn test_build_is_pure() {
        let members: Vec<Member> = (1..=5).map(|i| member(i, i as u64 * 100)).collect();
        let a = MerkleTree::build(&members, Some(42)).unwrap();
        let b = MerkleTree::build(&members, Some(42)).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.root_hex(), b.root_hex());
    }

    #[test]
    fn test_root_depends_on_salt() {
        let members: Vec<Member> = (1..=4).map(|i| member(i, 100)).collect();
        let unsalted = MerkleTree::build(&members, None).unwrap();
        let salted = MerkleTree::build(&members, Some(7)).unwrap();
        assert_ne!(unsalted.root_hash(), salted.root_hash());
    }

    #[test]
    fn test_unknown_address_not_found() {
        let members = [member(1, 10)];
        let tree = MerkleTree::build(&members, None).unwrap();
        let stranger = Address::from_bytes([9; 20]);
        assert_eq!(tree.path(&stranger), Err(MerkleError::NotFound(stranger)));
        assert!(!tree.contains(&stranger));
    }

    #[test]
    fn test_odd_sizes_verify() {
        for n in [5usize, 6, 7, 9, 13, 33] {
            let members: Vec<Member> = (0..n)
                .map(|i| member((i + 1) as u8, (i as u64 + 1) * 11))
                .collect();
            assert_all_paths_verify(&members, None);
        }
    }

    #[test]
    fn test_sentinel_holds_branch_count() {
        let members: Vec<Member> = (1..=6).map(|i| member(i, 100)).collect();
        let tree = MerkleTree::build(&members, None).unwrap();
        let mut expected = [0u8; 32];
        U256::from(8).to_big_endian(&mut expected);
        assert_eq!(tree.hashes[0], Hash::from(expected));
    }

    #[test]
    fn test_root_hex_encoding() {
        let members = [member(1, 10), member(2, 20)];
        let tree = MerkleTree::build(&members, None).unwrap();
        let hex_root = tree.root_hex();
        assert!(hex_root.starts_with("0x"));
        assert_eq!(hex_root.len(), 66);
        assert_eq!(hex_root, hex_root.to_lowercase());
    }
}
