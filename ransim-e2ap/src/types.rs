//! E2AP information elements shared by several procedures.

use std::collections::BTreeMap;
use std::fmt;
use std::net::{IpAddr, SocketAddr};

use serde::{Deserialize, Serialize};

/// E2AP transaction identifier (0..=255) carried by node-level procedures.
pub type TransactionId = u8;

/// RIC action identifier within a subscription.
pub type RicActionId = i32;

/// RAN function identifier, the dispatch key for every RIC procedure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RanFunctionId(pub i32);

impl RanFunctionId {
    /// Reserved for node-internal use, never announced
    pub const INTERNAL: RanFunctionId = RanFunctionId(0);
    /// E2SM-KPM v1
    pub const KPM: RanFunctionId = RanFunctionId(1);
    /// E2SM-RC pre-standard
    pub const RCPRE2: RanFunctionId = RanFunctionId(2);
    /// E2SM-KPM v2
    pub const KPM2: RanFunctionId = RanFunctionId(3);
    /// E2SM-MHO
    pub const MHO: RanFunctionId = RanFunctionId(4);
    /// E2SM-RC
    pub const RC: RanFunctionId = RanFunctionId(5);
    /// E2SM-CCC
    pub const CCC: RanFunctionId = RanFunctionId(6);
}

impl fmt::Display for RanFunctionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// RIC Request ID: requester ID assigned by the xApp plus the RIC instance ID.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RicRequestId {
    /// RIC requester ID
    pub requester_id: i32,
    /// RIC instance ID
    pub instance_id: i32,
}

impl RicRequestId {
    /// Creates a request ID.
    pub const fn new(requester_id: i32, instance_id: i32) -> Self {
        Self {
            requester_id,
            instance_id,
        }
    }
}

/// RAN function entry announced during E2 Setup and Configuration Update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RanFunctionItem {
    /// Encoded RAN Function Description of the service model
    pub description: Vec<u8>,
    /// RAN function revision
    pub revision: i32,
    /// Service model OID
    pub oid: String,
}

/// RAN functions keyed by ID.
pub type RanFunctions = BTreeMap<RanFunctionId, RanFunctionItem>;

/// Global gNB ID used as the Global E2 Node ID.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GlobalGnbId {
    /// PLMN Identity (3 bytes)
    pub plmn_identity: [u8; 3],
    /// gNB ID value
    pub gnb_id: u32,
    /// gNB ID bit length (22-32)
    pub gnb_id_length: u8,
}

/// Global RIC ID returned in the E2 Setup Response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GlobalRicId {
    /// PLMN Identity (3 bytes)
    pub plmn_identity: [u8; 3],
    /// Near-RT RIC ID (20 bits)
    pub ric_id: u32,
}

/// Time to wait before retrying a rejected procedure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TimeToWait {
    /// 1 second
    V1s,
    /// 2 seconds
    V2s,
    /// 5 seconds
    V5s,
    /// 10 seconds
    V10s,
    /// 20 seconds
    V20s,
    /// 60 seconds
    V60s,
}

impl TimeToWait {
    /// Returns the wait as a duration.
    pub fn as_duration(&self) -> std::time::Duration {
        let secs = match self {
            TimeToWait::V1s => 1,
            TimeToWait::V2s => 2,
            TimeToWait::V5s => 5,
            TimeToWait::V10s => 10,
            TimeToWait::V20s => 20,
            TimeToWait::V60s => 60,
        };
        std::time::Duration::from_secs(secs)
    }
}

/// Transport layer addressing carried in Connection Update IEs.
///
/// `address` holds the raw TNL address bit string: 4 octets (IPv4), 16 octets
/// (IPv6) or 20 octets (IPv4 followed by IPv6).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TnlInformation {
    /// TNL address octets
    pub address: Vec<u8>,
    /// TNL port, absent when the default E2AP port applies
    pub port: Option<u16>,
}

impl TnlInformation {
    /// Builds TNL information for a socket address.
    pub fn from_socket_addr(addr: SocketAddr) -> Self {
        let address = match addr.ip() {
            IpAddr::V4(v4) => v4.octets().to_vec(),
            IpAddr::V6(v6) => v6.octets().to_vec(),
        };
        Self {
            address,
            port: Some(addr.port()),
        }
    }
}

/// How the RIC intends to use a TNL association.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TnlUsage {
    /// RIC service procedures only
    RicService,
    /// Support procedures only
    SupportFunction,
    /// Both
    Both,
}

/// Outcome of a procedure answered with either a success or a failure message.
///
/// Transport-level problems that prevent any answer are reported through the
/// surrounding `Result` instead.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome<S, F> {
    /// Successful outcome message
    Success(S),
    /// Unsuccessful outcome message
    Failure(F),
}

impl<S, F> Outcome<S, F> {
    /// Returns true for [`Outcome::Success`].
    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success(_))
    }

    /// Returns the success message, if any.
    pub fn success(self) -> Option<S> {
        match self {
            Outcome::Success(s) => Some(s),
            Outcome::Failure(_) => None,
        }
    }

    /// Returns the failure message, if any.
    pub fn failure(self) -> Option<F> {
        match self {
            Outcome::Success(_) => None,
            Outcome::Failure(f) => Some(f),
        }
    }
}
