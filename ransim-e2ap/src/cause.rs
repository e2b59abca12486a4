//! E2AP Cause IE

use std::fmt;

use serde::{Deserialize, Serialize};

/// Cause values for RIC request related failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CauseRicRequest {
    RanFunctionIdInvalid,
    ActionNotSupported,
    ExcessiveActions,
    DuplicateAction,
    DuplicateEventTrigger,
    FunctionResourceLimit,
    RequestIdUnknown,
    InconsistentActionSubsequentActionSequence,
    ControlMessageInvalid,
    CallProcessIdInvalid,
    Unspecified,
}

/// Cause values for RIC service related failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CauseRicService {
    FunctionNotRequired,
    ExcessiveFunctions,
    RicResourceLimit,
}

/// Cause values for transport failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CauseTransport {
    Unspecified,
    TransportResourceUnavailable,
}

/// Cause values for protocol errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CauseProtocol {
    TransferSyntaxError,
    AbstractSyntaxErrorReject,
    AbstractSyntaxErrorIgnoreAndNotify,
    MessageNotCompatibleWithReceiverState,
    SemanticError,
    AbstractSyntaxErrorFalselyConstructedMessage,
    Unspecified,
}

/// Miscellaneous cause values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CauseMisc {
    ControlProcessingOverload,
    HardwareFailure,
    OmIntervention,
    Unspecified,
}

/// Cause IE
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Cause {
    RicRequest(CauseRicRequest),
    RicService(CauseRicService),
    Transport(CauseTransport),
    Protocol(CauseProtocol),
    Misc(CauseMisc),
}

impl Cause {
    /// `RicRequest(RanFunctionIdInvalid)`
    pub const RAN_FUNCTION_ID_INVALID: Cause = Cause::RicRequest(CauseRicRequest::RanFunctionIdInvalid);
    /// `RicRequest(RequestIdUnknown)`
    pub const REQUEST_ID_UNKNOWN: Cause = Cause::RicRequest(CauseRicRequest::RequestIdUnknown);
    /// `RicRequest(ActionNotSupported)`
    pub const ACTION_NOT_SUPPORTED: Cause = Cause::RicRequest(CauseRicRequest::ActionNotSupported);
    /// `RicRequest(Unspecified)`
    pub const RIC_REQUEST_UNSPECIFIED: Cause = Cause::RicRequest(CauseRicRequest::Unspecified);
    /// `Protocol(AbstractSyntaxErrorFalselyConstructedMessage)`
    pub const FALSELY_CONSTRUCTED_MESSAGE: Cause =
        Cause::Protocol(CauseProtocol::AbstractSyntaxErrorFalselyConstructedMessage);
    /// `Protocol(Unspecified)`
    pub const PROTOCOL_UNSPECIFIED: Cause = Cause::Protocol(CauseProtocol::Unspecified);
    /// `Misc(Unspecified)`
    pub const MISC_UNSPECIFIED: Cause = Cause::Misc(CauseMisc::Unspecified);
}

impl fmt::Display for Cause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cause::RicRequest(c) => write!(f, "ricRequest/{c:?}"),
            Cause::RicService(c) => write!(f, "ricService/{c:?}"),
            Cause::Transport(c) => write!(f, "transport/{c:?}"),
            Cause::Protocol(c) => write!(f, "protocol/{c:?}"),
            Cause::Misc(c) => write!(f, "misc/{c:?}"),
        }
    }
}
