//! `acpi_call` firmware adapter.
//!
//! Implements [`FirmwarePort`] on Linux through the `acpi_call` kernel
//! module: the method path is written to `/proc/acpi/call` and the result is
//! read back as text.
//!
//! Reply grammar (one object, optional trailing NUL / newline):
//!
//! ```text
//!   integer  0x1f
//!   string   "text"
//!   buffer   {0x01, 0x00, 0xff}
//!   package  [0x1, {0x02}, "x"]
//!   failure  Error: AE_NOT_FOUND
//!   idle     not called
//! ```
//!
//! The raw reply bytes are scrubbed once parsing is done, and any partially
//! parsed object is scrubbed on the error path.  Every heap block that holds
//! reply data is sized before it is filled and never grows: a reallocation
//! would free the old block unscrubbed.

use std::fs::{File, OpenOptions};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use log::debug;

use crate::app::ports::FirmwarePort;
use crate::error::CallFailure;
use crate::firmware::{FirmwareObject, FirmwareResponse, secure_zero};

/// Packages nest at most this deep before the reply is called malformed.
const MAX_DEPTH: usize = 16;

/// Size of the `acpi_call` result buffer; longer replies are malformed.
pub const REPLY_CAPACITY: usize = 4096;

/// Firmware backend talking to `/proc/acpi/call`.
pub struct AcpiCallFirmware {
    path: PathBuf,
}

impl AcpiCallFirmware {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Check that the control file exists (the kernel module is loaded).
    pub fn probe(&self) -> Result<(), CallFailure> {
        std::fs::metadata(&self.path)
            .map(|_| ())
            .map_err(|e| {
                debug!("acpi_call: {} not usable: {e}", self.path.display());
                CallFailure::Unavailable
            })
    }
}

impl FirmwarePort for AcpiCallFirmware {
    fn evaluate(&mut self, method: &str) -> Result<Option<FirmwareObject>, CallFailure> {
        let unavailable = |e: std::io::Error| {
            debug!("acpi_call: {}: {e}", self.path.display());
            CallFailure::Unavailable
        };

        OpenOptions::new()
            .write(true)
            .open(&self.path)
            .and_then(|mut f| f.write_all(method.as_bytes()))
            .map_err(unavailable)?;

        let mut reply = vec![0u8; REPLY_CAPACITY];
        let read = File::open(&self.path).and_then(|mut f| read_bounded(&mut f, &mut reply));
        let parsed = match read {
            Ok(Some(len)) => parse_reply(&reply[..len]),
            Ok(None) => Err(CallFailure::Malformed),
            Err(e) => Err(unavailable(e)),
        };
        secure_zero(&mut reply);
        parsed
    }
}

/// Fill `buf` from `src` without growing it.  `None` if the reply does not
/// fit.
fn read_bounded(src: &mut impl Read, buf: &mut [u8]) -> std::io::Result<Option<usize>> {
    let mut filled = 0;
    loop {
        if filled == buf.len() {
            let mut extra = [0u8; 1];
            let more = src.read(&mut extra)?;
            secure_zero(&mut extra);
            return Ok((more == 0).then_some(filled));
        }
        match src.read(&mut buf[filled..]) {
            Ok(0) => return Ok(Some(filled)),
            Ok(n) => filled += n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }
}

// ═══════════════════════════════════════════════════════════════
//  Reply parser
// ═══════════════════════════════════════════════════════════════

/// Decode one `acpi_call` reply.
///
/// * `Ok(None)`: empty reply
/// * `Ok(Some(obj))`: a decoded object
/// * `Err(_)`: the call failed or the reply is not in the grammar
pub fn parse_reply(reply: &[u8]) -> Result<Option<FirmwareObject>, CallFailure> {
    let text = core::str::from_utf8(reply).map_err(|_| CallFailure::Malformed)?;
    let text = text.trim_matches(|c: char| c == '\0' || c.is_ascii_whitespace());

    if text.is_empty() {
        return Ok(None);
    }
    if text == "not called" {
        return Err(CallFailure::Unavailable);
    }
    if let Some(status) = text.strip_prefix("Error:") {
        let status = status.trim();
        debug!("acpi_call: evaluation failed: {status}");
        return Err(if status.starts_with("AE_NOT_FOUND") {
            CallFailure::NotFound
        } else {
            CallFailure::Exception
        });
    }

    let mut parser = Parser {
        src: text.as_bytes(),
        pos: 0,
    };
    let object = parser.object(0).ok_or(CallFailure::Malformed)?;
    parser.skip_ws();
    if parser.pos != parser.src.len() {
        discard(object);
        return Err(CallFailure::Malformed);
    }
    Ok(Some(object))
}

/// Scrub and drop an object that will not be returned.
fn discard(object: FirmwareObject) {
    drop(FirmwareResponse::new(Some(object)));
}

struct Parser<'a> {
    src: &'a [u8],
    pos: usize,
}

impl Parser<'_> {
    fn peek(&self) -> Option<u8> {
        self.src.get(self.pos).copied()
    }

    fn bump(&mut self) -> Option<u8> {
        let b = self.peek()?;
        self.pos += 1;
        Some(b)
    }

    fn eat(&mut self, expected: u8) -> Option<()> {
        (self.bump()? == expected).then_some(())
    }

    fn skip_ws(&mut self) {
        while self.peek().is_some_and(|b| b.is_ascii_whitespace()) {
            self.pos += 1;
        }
    }

    fn object(&mut self, depth: usize) -> Option<FirmwareObject> {
        if depth > MAX_DEPTH {
            return None;
        }
        self.skip_ws();
        match self.peek()? {
            b'{' => self.buffer(),
            b'[' => self.package(depth),
            b'"' => self.string(),
            b'0' => self.hex().map(FirmwareObject::Integer),
            _ => None,
        }
    }

    /// `0x` followed by 1..=16 hex digits.
    fn hex(&mut self) -> Option<u64> {
        self.eat(b'0')?;
        if !matches!(self.bump()?, b'x' | b'X') {
            return None;
        }
        let start = self.pos;
        while self.peek().is_some_and(|b| b.is_ascii_hexdigit()) {
            self.pos += 1;
        }
        let digits = core::str::from_utf8(&self.src[start..self.pos]).ok()?;
        if digits.is_empty() || digits.len() > 16 {
            return None;
        }
        u64::from_str_radix(digits, 16).ok()
    }

    /// Upper bound on the items of the list opening at the cursor: one more
    /// than the commas at its own nesting level.
    fn list_len(&self) -> usize {
        let mut depth = 0usize;
        let mut commas = 0;
        let mut in_string = false;
        for &b in self.src.get(self.pos + 1..).unwrap_or_default() {
            match b {
                b'"' => in_string = !in_string,
                _ if in_string => {}
                b'[' | b'{' => depth += 1,
                b']' | b'}' if depth == 0 => break,
                b']' | b'}' => depth -= 1,
                b',' if depth == 0 => commas += 1,
                _ => {}
            }
        }
        commas + 1
    }

    fn buffer(&mut self) -> Option<FirmwareObject> {
        let mut bytes = Vec::with_capacity(self.list_len());
        let ok = self.buffer_body(&mut bytes).is_some();
        let object = FirmwareObject::Buffer(bytes);
        if ok {
            Some(object)
        } else {
            discard(object);
            None
        }
    }

    fn buffer_body(&mut self, bytes: &mut Vec<u8>) -> Option<()> {
        self.eat(b'{')?;
        self.skip_ws();
        if self.peek()? == b'}' {
            self.pos += 1;
            return Some(());
        }
        loop {
            self.skip_ws();
            let value = self.hex()?;
            if bytes.len() == bytes.capacity() {
                return None;
            }
            bytes.push(u8::try_from(value).ok()?);
            self.skip_ws();
            match self.bump()? {
                b',' => {}
                b'}' => return Some(()),
                _ => return None,
            }
        }
    }

    fn package(&mut self, depth: usize) -> Option<FirmwareObject> {
        let mut items = Vec::with_capacity(self.list_len());
        let ok = self.package_body(depth, &mut items).is_some();
        let object = FirmwareObject::Package(items);
        if ok {
            Some(object)
        } else {
            discard(object);
            None
        }
    }

    fn package_body(&mut self, depth: usize, items: &mut Vec<FirmwareObject>) -> Option<()> {
        self.eat(b'[')?;
        self.skip_ws();
        if self.peek()? == b']' {
            self.pos += 1;
            return Some(());
        }
        loop {
            let item = self.object(depth + 1)?;
            if items.len() == items.capacity() {
                discard(item);
                return None;
            }
            items.push(item);
            self.skip_ws();
            match self.bump()? {
                b',' => {}
                b']' => return Some(()),
                _ => return None,
            }
        }
    }

    fn string(&mut self) -> Option<FirmwareObject> {
        self.eat(b'"')?;
        let start = self.pos;
        let len = self.src[start..].iter().position(|b| *b == b'"')?;
        self.pos = start + len + 1;
        let text = core::str::from_utf8(&self.src[start..start + len]).ok()?;
        Some(FirmwareObject::String(text.to_owned()))
    }
}
