//! # Ledger Entities
//!
//! Members, committed blocks, and the admin-fee fraction.
//!
//! ## Invariants
//!
//! | Invariant | Enforcement |
//! |-----------|-------------|
//! | Earnings monotonically non-decreasing | `Member::add_revenue` takes unsigned `U256` |
//! | No precision loss | decimal-string serialization via [`u256_dec`] |
//! | Block earnings conservation | `Block::earnings_sum` equals `total_earnings` |
//! | No floating point | fee is a 1e18-scaled integer, [`AdminFee`] |

use crate::address::Address;
use crate::Hash;
use primitive_types::{U256, U512};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Serde adapter: `U256` as a decimal string.
///
/// `primitive-types`' own serde impl uses hex; persisted earnings are
/// decimal strings, so every `U256` field opts in via
/// `#[serde(with = "u256_dec")]`.
pub mod u256_dec {
    use primitive_types::U256;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &U256, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<U256, D::Error> {
        let s = String::deserialize(deserializer)?;
        U256::from_dec_str(&s).map_err(serde::de::Error::custom)
    }
}

// =============================================================================
// MEMBER
// =============================================================================

/// Per-address ledger record.
///
/// A member is created on its first join and never deleted; parting only
/// clears the `active` flag. Earnings survive part/rejoin cycles.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    /// Canonical address; immutable once constructed.
    pub address: Address,
    /// Cumulative earnings in token base units.
    #[serde(with = "u256_dec")]
    pub earnings: U256,
    /// Only active members receive revenue distributions.
    pub active: bool,
    /// Optional display name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl Member {
    /// New active member with zero earnings.
    pub fn new(address: Address) -> Self {
        Self {
            address,
            earnings: U256::zero(),
            active: true,
            name: None,
        }
    }

    /// Attach a display name (builder pattern).
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Credit a revenue share. Unsigned input keeps earnings monotone.
    pub fn add_revenue(&mut self, amount: U256) {
        self.earnings += amount;
    }

    pub fn set_active(&mut self, active: bool) {
        self.active = active;
    }
}

/// Active/total member counts for the read surface.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberCounts {
    pub active: usize,
    pub total: usize,
}

// =============================================================================
// ADMIN FEE
// =============================================================================

/// Invalid admin-fee input.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AdminFeeError {
    /// Fraction above 1.0 (raw value above 1e18).
    #[error("admin fee out of range: {0} > 1.0")]
    OutOfRange(String),

    /// Not a parseable decimal fraction.
    #[error("admin fee not a decimal fraction: {0:?}")]
    BadDecimal(String),
}

/// Admin-fee fraction in `[0, 1]`, stored as a 1e18-scaled integer.
///
/// Matches the `AdminFeeChanged(uint256)` on-chain encoding; never converted
/// to floating point.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AdminFee(#[serde(with = "u256_dec")] U256);

impl AdminFee {
    /// 1e18: the scale of a fee of exactly 1.0.
    pub const SCALE: u64 = 1_000_000_000_000_000_000;

    /// Zero fee.
    pub fn zero() -> Self {
        AdminFee(U256::zero())
    }

    /// From the raw 1e18-scaled on-chain value.
    pub fn from_raw(raw: U256) -> Result<Self, AdminFeeError> {
        if raw > U256::from(Self::SCALE) {
            return Err(AdminFeeError::OutOfRange(raw.to_string()));
        }
        Ok(AdminFee(raw))
    }

    /// Raw 1e18-scaled value.
    pub fn raw(&self) -> U256 {
        self.0
    }

    /// `floor(amount * fee / 1e18)`.
    ///
    /// The multiplication widens to 512 bits so the full `U256` earnings
    /// range divides without overflow; the quotient is at most `amount`, so
    /// the narrowing back to 256 bits cannot truncate.
    pub fn share_of(&self, amount: U256) -> U256 {
        let quotient: U512 = amount.full_mul(self.0) / U512::from(Self::SCALE);
        let mut wide = [0u8; 64];
        quotient.to_big_endian(&mut wide);
        U256::from_big_endian(&wide[32..])
    }
}

impl FromStr for AdminFee {
    type Err = AdminFeeError;

    /// Parse a decimal fraction like `"0.2"`, `"0"`, or `"1"`.
    ///
    /// At most 18 fractional digits; anything finer than 1e-18 is not
    /// representable on chain and is rejected rather than silently rounded.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bad = || AdminFeeError::BadDecimal(s.to_string());
        let (int_part, frac_part) = match s.split_once('.') {
            Some((i, f)) => (i, f),
            None => (s, ""),
        };
        if int_part.is_empty() && frac_part.is_empty() {
            return Err(bad());
        }
        if frac_part.len() > 18 {
            return Err(bad());
        }
        let int: u64 = if int_part.is_empty() {
            0
        } else {
            int_part.parse().map_err(|_| bad())?
        };
        let mut frac: u64 = 0;
        if !frac_part.is_empty() {
            let scaled = format!("{frac_part:0<18}");
            frac = scaled.parse().map_err(|_| bad())?;
        }
        let raw = U256::from(int) * U256::from(Self::SCALE) + U256::from(frac);
        Self::from_raw(raw)
    }
}

impl fmt::Display for AdminFee {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let scale = U256::from(Self::SCALE);
        let int = self.0 / scale;
        let frac = (self.0 % scale).as_u64();
        if frac == 0 {
            write!(f, "{int}")
        } else {
            let digits = format!("{frac:018}");
            write!(f, "{int}.{}", digits.trim_end_matches('0'))
        }
    }
}

// =============================================================================
// COMMITTED BLOCK
// =============================================================================

/// Immutable ledger snapshot taken at commit time.
///
/// Stored by block number; the member sequence is address-sorted, which is
/// what makes the derived Merkle tree deterministic. Once the admin has
/// collected fees it appears in the sequence like any other member, so
/// `total_earnings` is exactly the sum over `members`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    pub block_number: u64,
    /// Commit time, ms since epoch.
    pub timestamp_ms: u64,
    /// Address-sorted member snapshot; includes the admin once it has
    /// earnings.
    pub members: Vec<Member>,
    #[serde(with = "u256_dec")]
    pub total_earnings: U256,
    pub admin_address: Address,
    pub admin_fee: AdminFee,
    /// Root recorded on chain for this block.
    pub root_hash: Hash,
}

impl Block {
    /// Look up a member in the snapshot.
    pub fn member(&self, address: &Address) -> Option<&Member> {
        self.members.iter().find(|m| m.address == *address)
    }

    /// Sum of per-member earnings; equals `total_earnings` for any block
    /// produced by the ledger.
    pub fn earnings_sum(&self) -> U256 {
        self.members
            .iter()
            .fold(U256::zero(), |acc, m| acc + m.earnings)
    }
}
