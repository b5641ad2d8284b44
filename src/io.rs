//! Buffered byte I/O (spec.md §4.A) and the primitive wire codec (spec.md §4.B).
//!
//! Mirrors the teacher's `io.rs`: `ClickhouseRead`/`ClickhouseWrite` blanket
//! extension traits, just over `std::io::{Read, Write}` instead of tokio's
//! async traits, since there is no suspension point other than blocking
//! socket I/O in this client (spec.md §5).

use std::io::{Read, Write};

use crate::errors::{Error, Result};
use crate::protocol::MAX_STRING_SIZE;

/// Varuint64 is at most 10 bytes (7 bits/byte, 64 bits -> ceil(64/7) = 10).
const VARUINT_MAX_BYTES: u32 = 10;

/// Read-side primitives layered over any `std::io::Read`.
///
/// Every read here retries internally until the requested byte count is
/// obtained (via `read_exact`); a clean EOF surfaces as [`Error::Io`], per
/// spec.md §4.A/§7 ("partial reads of a multi-field packet that yield EOF are
/// classified as Io").
pub trait ClickhouseRead: Read {
    fn read_u8_wire(&mut self) -> Result<u8> {
        let mut buf = [0u8; 1];
        self.read_exact(&mut buf)?;
        Ok(buf[0])
    }

    fn read_bool(&mut self) -> Result<bool> {
        Ok(self.read_u8_wire()? != 0)
    }

    fn read_u16_le(&mut self) -> Result<u16> {
        let mut buf = [0u8; 2];
        self.read_exact(&mut buf)?;
        Ok(u16::from_le_bytes(buf))
    }

    fn read_u32_le(&mut self) -> Result<u32> {
        let mut buf = [0u8; 4];
        self.read_exact(&mut buf)?;
        Ok(u32::from_le_bytes(buf))
    }

    fn read_u64_le(&mut self) -> Result<u64> {
        let mut buf = [0u8; 8];
        self.read_exact(&mut buf)?;
        Ok(u64::from_le_bytes(buf))
    }

    fn read_i8_le(&mut self) -> Result<i8> {
        Ok(self.read_u8_wire()? as i8)
    }

    fn read_i16_le(&mut self) -> Result<i16> {
        Ok(self.read_u16_le()? as i16)
    }

    fn read_i32_le(&mut self) -> Result<i32> {
        Ok(self.read_u32_le()? as i32)
    }

    fn read_i64_le(&mut self) -> Result<i64> {
        Ok(self.read_u64_le()? as i64)
    }

    fn read_f32_le(&mut self) -> Result<f32> {
        let mut buf = [0u8; 4];
        self.read_exact(&mut buf)?;
        Ok(f32::from_le_bytes(buf))
    }

    fn read_f64_le(&mut self) -> Result<f64> {
        let mut buf = [0u8; 8];
        self.read_exact(&mut buf)?;
        Ok(f64::from_le_bytes(buf))
    }

    /// Unsigned LEB128-style varint: 7-bit groups, little-endian base-128,
    /// high bit as continuation. Rejects any sequence whose 10th byte still
    /// carries the continuation bit (spec.md §8 invariants).
    fn read_var_uint(&mut self) -> Result<u64> {
        let mut out = 0u64;
        for i in 0..VARUINT_MAX_BYTES {
            let octet = self.read_u8_wire()?;
            if i == VARUINT_MAX_BYTES - 1 {
                // Only bit 0 of the 10th byte fits in a u64 (9*7 = 63 bits so far).
                // A set continuation bit implies an 11th byte; any other high bit
                // set means the value can't be represented in 64 bits.
                if (octet & 0x80) != 0 {
                    return Err(Error::protocol("varuint64 exceeds 10 bytes"));
                }
                if (octet & 0x7E) != 0 {
                    return Err(Error::protocol("varuint64 high bits exceed 64 bits"));
                }
            }
            out |= ((octet & 0x7F) as u64) << (7 * i);
            if (octet & 0x80) == 0 {
                return Ok(out);
            }
        }
        unreachable!("loop always returns by the 10th byte")
    }

    fn read_binary(&mut self) -> Result<Vec<u8>> {
        let len = self.read_var_uint()?;
        if len as usize > MAX_STRING_SIZE {
            return Err(Error::protocol(format!(
                "binary payload too large: {len} > {MAX_STRING_SIZE}"
            )));
        }
        let mut buf = vec![0u8; len as usize];
        self.read_exact(&mut buf)?;
        Ok(buf)
    }

    fn read_string(&mut self) -> Result<String> {
        let buf = self.read_binary()?;
        String::from_utf8(buf).map_err(|e| Error::protocol(format!("invalid utf8 string: {e}")))
    }
}

impl<T: Read + ?Sized> ClickhouseRead for T {}

/// Write-side primitives layered over any `std::io::Write`.
///
/// Failures are not reported per-call (spec.md §4.B): they surface when the
/// caller later calls `flush()` on the underlying buffered writer.
pub trait ClickhouseWrite: Write {
    fn write_u8_wire(&mut self, value: u8) -> Result<()> {
        self.write_all(&[value])?;
        Ok(())
    }

    fn write_bool(&mut self, value: bool) -> Result<()> {
        self.write_u8_wire(if value { 1 } else { 0 })
    }

    fn write_u16_le(&mut self, value: u16) -> Result<()> {
        self.write_all(&value.to_le_bytes())?;
        Ok(())
    }

    fn write_u32_le(&mut self, value: u32) -> Result<()> {
        self.write_all(&value.to_le_bytes())?;
        Ok(())
    }

    fn write_u64_le(&mut self, value: u64) -> Result<()> {
        self.write_all(&value.to_le_bytes())?;
        Ok(())
    }

    fn write_i8_le(&mut self, value: i8) -> Result<()> {
        self.write_u8_wire(value as u8)
    }

    fn write_i16_le(&mut self, value: i16) -> Result<()> {
        self.write_u16_le(value as u16)
    }

    fn write_i32_le(&mut self, value: i32) -> Result<()> {
        self.write_u32_le(value as u32)
    }

    fn write_i64_le(&mut self, value: i64) -> Result<()> {
        self.write_u64_le(value as u64)
    }

    fn write_f32_le(&mut self, value: f32) -> Result<()> {
        self.write_all(&value.to_le_bytes())?;
        Ok(())
    }

    fn write_f64_le(&mut self, value: f64) -> Result<()> {
        self.write_all(&value.to_le_bytes())?;
        Ok(())
    }

    /// Minimal-length encoding, per spec.md §8 invariants.
    fn write_var_uint(&mut self, mut value: u64) -> Result<()> {
        loop {
            let mut byte = (value & 0x7F) as u8;
            value >>= 7;
            if value != 0 {
                byte |= 0x80;
            }
            self.write_u8_wire(byte)?;
            if value == 0 {
                return Ok(());
            }
        }
    }

    fn write_binary(&mut self, value: &[u8]) -> Result<()> {
        self.write_var_uint(value.len() as u64)?;
        self.write_all(value)?;
        Ok(())
    }

    fn write_string(&mut self, value: &str) -> Result<()> {
        self.write_binary(value.as_bytes())
    }
}

impl<T: Write + ?Sized> ClickhouseWrite for T {}
