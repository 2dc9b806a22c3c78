//! Classification of gRPC status codes returned by `Predict`.
//!
//! The harness only distinguishes three outcomes of a failed call:
//! - transport: the request never got a model-level answer
//!   (`UNAVAILABLE`, `DEADLINE_EXCEEDED`, `CANCELLED`)
//! - failed precondition: the server rejected the model as unloadable
//! - other: any remaining code, always unexpected

use tonic::Code;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureClass {
    Transport,
    FailedPrecondition,
    Other,
}

impl FailureClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureClass::Transport => "transport",
            FailureClass::FailedPrecondition => "failed_precondition",
            FailureClass::Other => "other",
        }
    }
}

impl std::str::FromStr for FailureClass {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "transport" => Ok(FailureClass::Transport),
            "failed_precondition" => Ok(FailureClass::FailedPrecondition),
            "other" => Ok(FailureClass::Other),
            _ => Err(()),
        }
    }
}

impl std::fmt::Display for FailureClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

pub fn classify(code: Code) -> FailureClass {
    match code {
        Code::Unavailable | Code::DeadlineExceeded | Code::Cancelled => FailureClass::Transport,
        Code::FailedPrecondition => FailureClass::FailedPrecondition,
        _ => FailureClass::Other,
    }
}

/// Upper-case canonical name of a status code, e.g. `FAILED_PRECONDITION`.
pub fn code_name(code: Code) -> &'static str {
    match code {
        Code::Ok => "OK",
        Code::Cancelled => "CANCELLED",
        Code::Unknown => "UNKNOWN",
        Code::InvalidArgument => "INVALID_ARGUMENT",
        Code::DeadlineExceeded => "DEADLINE_EXCEEDED",
        Code::NotFound => "NOT_FOUND",
        Code::AlreadyExists => "ALREADY_EXISTS",
        Code::PermissionDenied => "PERMISSION_DENIED",
        Code::ResourceExhausted => "RESOURCE_EXHAUSTED",
        Code::FailedPrecondition => "FAILED_PRECONDITION",
        Code::Aborted => "ABORTED",
        Code::OutOfRange => "OUT_OF_RANGE",
        Code::Unimplemented => "UNIMPLEMENTED",
        Code::Internal => "INTERNAL",
        Code::Unavailable => "UNAVAILABLE",
        Code::DataLoss => "DATA_LOSS",
        Code::Unauthenticated => "UNAUTHENTICATED",
    }
}
