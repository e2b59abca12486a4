//! Identity types shared by the E2 node and its service models: PLMN, gNB ID, NCGI.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Public Land Mobile Network identifier.
///
/// The `long_mnc` field indicates whether the MNC uses 3 digits (true) or 2 digits (false).
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Plmn {
    /// Mobile Country Code (3 digits, range 0-999)
    pub mcc: u16,
    /// Mobile Network Code (2-3 digits, range 0-999)
    pub mnc: u16,
    /// True if MNC is 3 digits, false if 2 digits
    #[serde(default)]
    pub long_mnc: bool,
}

impl Plmn {
    /// Creates a new PLMN with the given MCC and MNC.
    pub const fn new(mcc: u16, mnc: u16, long_mnc: bool) -> Self {
        Self { mcc, mnc, long_mnc }
    }

    /// Returns true if this PLMN has valid values set.
    pub fn has_value(&self) -> bool {
        self.mcc > 0 || self.mnc > 0
    }

    /// Encodes the PLMN to the 3-octet TBCD form carried in the Global E2 Node ID.
    pub fn encode(&self) -> [u8; 3] {
        let digit = |value: u16, div: u16| ((value / div) % 10) as u8;
        let (mcc1, mcc2, mcc3) = (digit(self.mcc, 100), digit(self.mcc, 10), digit(self.mcc, 1));
        let (mnc1, mnc2, mnc3) = if self.long_mnc {
            (digit(self.mnc, 100), digit(self.mnc, 10), digit(self.mnc, 1))
        } else {
            (digit(self.mnc, 10), digit(self.mnc, 1), 0x0F)
        };

        [(mcc2 << 4) | mcc1, (mnc3 << 4) | mcc3, (mnc2 << 4) | mnc1]
    }

    /// Returns the 24-bit integer form of the encoded PLMN, used as the high
    /// bits of an NCGI.
    pub fn as_u24(&self) -> u32 {
        let [a, b, c] = self.encode();
        (u32::from(a) << 16) | (u32::from(b) << 8) | u32::from(c)
    }
}

impl fmt::Debug for Plmn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Plmn({self})")
    }
}

impl fmt::Display for Plmn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.long_mnc {
            write!(f, "{:03}-{:03}", self.mcc, self.mnc)
        } else {
            write!(f, "{:03}-{:02}", self.mcc, self.mnc)
        }
    }
}

/// gNB identifier (22..=32 bits) announced in the Global E2 Node ID.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GnbId(pub u32);

impl GnbId {
    /// Bit length used when the gNB ID is encoded.
    pub const BIT_LENGTH: u8 = 22;

    /// Returns true if the value fits into [`GnbId::BIT_LENGTH`] bits.
    pub fn is_valid(&self) -> bool {
        self.0 < (1 << Self::BIT_LENGTH)
    }
}

impl fmt::Display for GnbId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

/// NR Cell Global Identity: the 24-bit PLMN followed by the 36-bit NR cell identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Ncgi(pub u64);

impl Ncgi {
    const NCI_BITS: u32 = 36;
    const NCI_MASK: u64 = (1 << Self::NCI_BITS) - 1;

    /// Builds an NCGI from a PLMN and a 36-bit NR cell identity.
    pub fn new(plmn: Plmn, nci: u64) -> Self {
        Self((u64::from(plmn.as_u24()) << Self::NCI_BITS) | (nci & Self::NCI_MASK))
    }

    /// The NR cell identity part.
    pub fn nci(&self) -> u64 {
        self.0 & Self::NCI_MASK
    }

    /// The encoded PLMN part.
    pub fn plmn_u24(&self) -> u32 {
        (self.0 >> Self::NCI_BITS) as u32
    }
}

impl fmt::Display for Ncgi {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}
