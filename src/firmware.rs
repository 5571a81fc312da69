//! Firmware query adapter.
//!
//! Evaluates the EV20 method through a [`FirmwarePort`], validates the
//! returned object and copies the 32 status bytes out.  Whatever the outcome,
//! the returned object is held in a [`FirmwareResponse`] guard whose `Drop`
//! overwrites every byte with zeros before the allocation is released, so
//! stale key-event data never lingers in freed memory.
//!
//! Validation order:
//!
//! 1. the call succeeded at the firmware layer
//! 2. an object was returned
//! 3. the object is a raw buffer
//! 4. the buffer is exactly [`STATUS_LEN`](crate::status::STATUS_LEN) bytes

use core::fmt;
use core::sync::atomic::{Ordering, compiler_fence};

use crate::app::ports::FirmwarePort;
use crate::error::FirmwareError;
use crate::status::StatusBuffer;

/// ACPI path of the Maibenben special-key status method.
pub const EV20_METHOD: &str = "\\_SB_.PCI0.WMID.EV20";

// ═══════════════════════════════════════════════════════════════
//  Firmware objects
// ═══════════════════════════════════════════════════════════════

/// Typed result of a firmware method evaluation.
///
/// Not `Clone`: each copy of key-event data would need its own scrub.
#[derive(Debug, PartialEq, Eq)]
pub enum FirmwareObject {
    Integer(u64),
    String(String),
    Buffer(Vec<u8>),
    Package(Vec<FirmwareObject>),
}

/// Declared type of a [`FirmwareObject`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectType {
    Integer,
    String,
    Buffer,
    Package,
}

impl fmt::Display for ObjectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Integer => write!(f, "integer"),
            Self::String => write!(f, "string"),
            Self::Buffer => write!(f, "buffer"),
            Self::Package => write!(f, "package"),
        }
    }
}

impl FirmwareObject {
    pub fn object_type(&self) -> ObjectType {
        match self {
            Self::Integer(_) => ObjectType::Integer,
            Self::String(_) => ObjectType::String,
            Self::Buffer(_) => ObjectType::Buffer,
            Self::Package(_) => ObjectType::Package,
        }
    }

    /// Zero every byte this object owns, recursing into packages.
    fn scrub(&mut self) {
        match self {
            Self::Integer(v) => {
                // SAFETY: `v` is a valid, exclusively borrowed u64.
                unsafe { core::ptr::write_volatile(v, 0) };
            }
            Self::String(s) => {
                // SAFETY: NUL bytes are valid UTF-8, so the string stays
                // well-formed after the overwrite.
                secure_zero(unsafe { s.as_bytes_mut() });
            }
            Self::Buffer(b) => secure_zero(b),
            Self::Package(items) => items.iter_mut().for_each(Self::scrub),
        }
        compiler_fence(Ordering::SeqCst);
    }
}

/// Overwrite `bytes` with zeros in a way the optimiser cannot elide.
pub fn secure_zero(bytes: &mut [u8]) {
    for byte in bytes.iter_mut() {
        // SAFETY: `byte` is a valid, exclusively borrowed location.
        unsafe { core::ptr::write_volatile(byte, 0) };
    }
    compiler_fence(Ordering::SeqCst);
}

// ═══════════════════════════════════════════════════════════════
//  Scoped response guard
// ═══════════════════════════════════════════════════════════════

/// Owns the firmware result for the duration of one query.
///
/// Dropping the guard scrubs and releases the object exactly once.
pub struct FirmwareResponse {
    object: Option<FirmwareObject>,
}

impl FirmwareResponse {
    pub fn new(object: Option<FirmwareObject>) -> Self {
        Self { object }
    }

    pub fn object(&self) -> Option<&FirmwareObject> {
        self.object.as_ref()
    }

    fn scrub(&mut self) {
        if let Some(object) = self.object.as_mut() {
            object.scrub();
        }
    }
}

impl Drop for FirmwareResponse {
    fn drop(&mut self) {
        self.scrub();
    }
}

// ═══════════════════════════════════════════════════════════════
//  Query
// ═══════════════════════════════════════════════════════════════

/// Evaluate `method` once and return the validated status buffer.
///
/// Performs no cache mutation; the caller decides what a failure means.
pub fn query<F>(port: &mut F, method: &str) -> Result<StatusBuffer, FirmwareError>
where
    F: FirmwarePort + ?Sized,
{
    let response = FirmwareResponse::new(port.evaluate(method)?);

    let object = response.object().ok_or(FirmwareError::EmptyResponse)?;
    let FirmwareObject::Buffer(bytes) = object else {
        return Err(FirmwareError::WrongType(object.object_type()));
    };
    StatusBuffer::from_slice(bytes).ok_or(FirmwareError::WrongSize(bytes.len()))
}

// ═══════════════════════════════════════════════════════════════
//  Tests
// ═══════════════════════════════════════════════════════════════
