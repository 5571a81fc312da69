//! Unified error types for the special-key reader.
//!
//! A single `Error` enum that every subsystem converts into.  All variants
//! are `Copy` so they can be stored in poll statistics and passed across the
//! worker boundary without allocation.

use core::fmt;

use crate::firmware::ObjectType;

// ---------------------------------------------------------------------------
// Top-level error
// ---------------------------------------------------------------------------

/// Every fallible operation in the crate funnels into this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// The firmware query failed or returned an unusable response.
    Firmware(FirmwareError),
    /// The attribute host could not create or remove a published endpoint.
    Host(HostError),
    /// The poll worker could not be started.
    Spawn,
    /// Configuration is invalid.
    Config(&'static str),
    /// Caller-supplied input was rejected.
    InvalidInput(&'static str),
}

impl Error {
    /// Negative errno-style status reported to the host runtime when a load
    /// is aborted.
    pub const fn errno(&self) -> i32 {
        match self {
            Self::Firmware(FirmwareError::CallFailed(CallFailure::NotFound)) => -ENODEV,
            Self::Firmware(_) | Self::Config(_) | Self::InvalidInput(_) => -EINVAL,
            Self::Host(HostError::AlreadyExists) => -EEXIST,
            Self::Host(HostError::OutOfMemory) => -ENOMEM,
            Self::Host(HostError::PermissionDenied) => -EACCES,
            Self::Host(HostError::Io) => -EIO,
            Self::Spawn => -EAGAIN,
        }
    }
}

const EIO: i32 = 5;
const EAGAIN: i32 = 11;
const ENOMEM: i32 = 12;
const EACCES: i32 = 13;
const EEXIST: i32 = 17;
const ENODEV: i32 = 19;
const EINVAL: i32 = 22;

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Firmware(e) => write!(f, "firmware: {e}"),
            Self::Host(e) => write!(f, "host: {e}"),
            Self::Spawn => write!(f, "poll worker could not be started"),
            Self::Config(msg) => write!(f, "config: {msg}"),
            Self::InvalidInput(msg) => write!(f, "invalid input: {msg}"),
        }
    }
}

impl std::error::Error for Error {}

// ---------------------------------------------------------------------------
// Firmware errors
// ---------------------------------------------------------------------------

/// Why a single firmware query produced no status buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FirmwareError {
    /// The firmware layer reported a failure status.
    CallFailed(CallFailure),
    /// The call succeeded but returned no object.
    EmptyResponse,
    /// The returned object is not a raw buffer.
    WrongType(ObjectType),
    /// The returned buffer does not hold exactly the status length.
    WrongSize(usize),
}

impl fmt::Display for FirmwareError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CallFailed(e) => write!(f, "method evaluation failed ({e})"),
            Self::EmptyResponse => write!(f, "empty response"),
            Self::WrongType(t) => write!(f, "wrong response type ({t})"),
            Self::WrongSize(n) => write!(f, "wrong response size ({n} bytes)"),
        }
    }
}

impl From<FirmwareError> for Error {
    fn from(e: FirmwareError) -> Self {
        Self::Firmware(e)
    }
}

/// Failure status reported by a [`FirmwarePort`](crate::app::ports::FirmwarePort).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallFailure {
    /// The method path does not exist in the firmware namespace.
    NotFound,
    /// The firmware interface itself is not reachable.
    Unavailable,
    /// The method ran but raised an exception.
    Exception,
    /// The backend reply could not be decoded.
    Malformed,
}

impl fmt::Display for CallFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound => write!(f, "method not found"),
            Self::Unavailable => write!(f, "firmware interface unavailable"),
            Self::Exception => write!(f, "firmware exception"),
            Self::Malformed => write!(f, "malformed reply"),
        }
    }
}

impl From<CallFailure> for FirmwareError {
    fn from(e: CallFailure) -> Self {
        Self::CallFailed(e)
    }
}

// ---------------------------------------------------------------------------
// Attribute host errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostError {
    AlreadyExists,
    OutOfMemory,
    PermissionDenied,
    Io,
}

impl fmt::Display for HostError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AlreadyExists => write!(f, "endpoint already exists"),
            Self::OutOfMemory => write!(f, "out of memory"),
            Self::PermissionDenied => write!(f, "permission denied"),
            Self::Io => write!(f, "I/O error"),
        }
    }
}

impl From<std::io::ErrorKind> for HostError {
    fn from(kind: std::io::ErrorKind) -> Self {
        match kind {
            std::io::ErrorKind::AlreadyExists => Self::AlreadyExists,
            std::io::ErrorKind::OutOfMemory => Self::OutOfMemory,
            std::io::ErrorKind::PermissionDenied => Self::PermissionDenied,
            _ => Self::Io,
        }
    }
}

impl From<HostError> for Error {
    fn from(e: HostError) -> Self {
        Self::Host(e)
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Crate-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
