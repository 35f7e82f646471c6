//! Bitcoin wire primitives: fixed-width integers, compact-size integers,
//! length-prefixed byte strings and script push helpers.
//!
//! Every `unpack_*` function consumes a prefix of its input and returns the
//! decoded value together with the unconsumed remainder, so parsers compose by
//! threading the remainder through.

use crate::error::{Error, Result};

/// Split off exactly `N` bytes.
#[inline]
fn take<const N: usize>(bytes: &[u8]) -> Result<([u8; N], &[u8])> {
    if bytes.len() < N {
        return Err(Error::truncated(N, bytes.len()));
    }
    let (head, rest) = bytes.split_at(N);
    let mut out = [0u8; N];
    out.copy_from_slice(head);
    Ok((out, rest))
}

/// Serialize a `u32` as 4 little-endian bytes.
#[inline]
pub fn pack_u32(value: u32) -> [u8; 4] {
    value.to_le_bytes()
}

/// Deserialize a little-endian `u32`.
#[inline]
pub fn unpack_u32(bytes: &[u8]) -> Result<(u32, &[u8])> {
    let (raw, rest) = take::<4>(bytes)?;
    Ok((u32::from_le_bytes(raw), rest))
}

/// Serialize a `u64` as 8 little-endian bytes.
#[inline]
pub fn pack_u64(value: u64) -> [u8; 8] {
    value.to_le_bytes()
}

/// Deserialize a little-endian `u64`.
#[inline]
pub fn unpack_u64(bytes: &[u8]) -> Result<(u64, &[u8])> {
    let (raw, rest) = take::<8>(bytes)?;
    Ok((u64::from_le_bytes(raw), rest))
}

/// Read a raw 32-byte hash, kept in internal byte order.
#[inline]
pub fn unpack_hash(bytes: &[u8]) -> Result<([u8; 32], &[u8])> {
    take::<32>(bytes)
}

/// Append a compact-size integer to `output`.
pub fn write_compact_int(value: u64, output: &mut Vec<u8>) {
    if value < 0xfd {
        output.push(value as u8);
    } else if value <= 0xffff {
        output.push(0xfd);
        output.extend_from_slice(&(value as u16).to_le_bytes());
    } else if value <= 0xffff_ffff {
        output.push(0xfe);
        output.extend_from_slice(&(value as u32).to_le_bytes());
    } else {
        output.push(0xff);
        output.extend_from_slice(&value.to_le_bytes());
    }
}

/// Encode a compact-size integer.
pub fn pack_compact_int(value: u64) -> Vec<u8> {
    let mut output = Vec::with_capacity(9);
    write_compact_int(value, &mut output);
    output
}

/// Decode a compact-size integer, dispatching on the marker byte.
pub fn unpack_compact_int(bytes: &[u8]) -> Result<(u64, &[u8])> {
    let (&marker, rest) = bytes.split_first().ok_or(Error::truncated(1, 0))?;
    match marker {
        0xfd => {
            let (raw, rest) = take::<2>(rest)?;
            Ok((u16::from_le_bytes(raw) as u64, rest))
        }
        0xfe => {
            let (value, rest) = unpack_u32(rest)?;
            Ok((value as u64, rest))
        }
        0xff => unpack_u64(rest),
        small => Ok((small as u64, rest)),
    }
}

/// Append a compact-size length followed by the bytes themselves.
pub fn write_var_str(data: &[u8], output: &mut Vec<u8>) {
    write_compact_int(data.len() as u64, output);
    output.extend_from_slice(data);
}

/// Encode a length-prefixed byte string.
pub fn pack_var_str(data: &[u8]) -> Vec<u8> {
    let mut output = Vec::with_capacity(data.len() + 9);
    write_var_str(data, &mut output);
    output
}

/// Decode a length-prefixed byte string, borrowing it from the input.
pub fn unpack_var_str(bytes: &[u8]) -> Result<(&[u8], &[u8])> {
    let (len, rest) = unpack_compact_int(bytes)?;
    let len = usize::try_from(len).map_err(|_| Error::truncated(usize::MAX, rest.len()))?;
    if rest.len() < len {
        return Err(Error::truncated(len, rest.len()));
    }
    Ok(rest.split_at(len))
}

/// Render a signed integer in the shortest little-endian form whose final
/// byte carries the sign in its top bit.
///
/// This is the number format scripts use, e.g. for the BIP34 block height in a
/// coinbase scriptSig. Zero renders as no bytes at all.
pub fn render_int(n: i64) -> Vec<u8> {
    let mut magnitude = n.unsigned_abs();
    let mut bytes = Vec::with_capacity(9);
    while magnitude > 0 {
        bytes.push((magnitude & 0xff) as u8);
        magnitude >>= 8;
    }

    match bytes.last().copied() {
        // Top bit already taken by the magnitude: sign goes in a fresh byte.
        Some(last) if last & 0x80 != 0 => bytes.push(if n < 0 { 0x80 } else { 0x00 }),
        Some(_) if n < 0 => {
            let last = bytes.len() - 1;
            bytes[last] |= 0x80;
        }
        _ => {}
    }

    bytes
}

/// The opcodes the push helpers need, supplied by whoever owns the script
/// opcode table.
pub trait OpcodeTable {
    /// `OP_PUSHDATA1`, `OP_PUSHDATA2` or `OP_PUSHDATA4` for a length prefix
    /// of `width` bytes.
    fn pushdata(&self, width: usize) -> u8;

    /// The opcode pushing the small integer `n` (`OP_0` through `OP_16`).
    fn small_int(&self, n: u8) -> u8;
}

/// Bitcoin's own opcode values.
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardOpcodes;

impl OpcodeTable for StandardOpcodes {
    fn pushdata(&self, width: usize) -> u8 {
        match width {
            1 => 0x4c,
            2 => 0x4d,
            _ => 0x4e,
        }
    }

    fn small_int(&self, n: u8) -> u8 {
        match n {
            0 => 0x00,
            n => 0x50 + n,
        }
    }
}

/// Build the script fragment that pushes `data` onto the stack, using the
/// narrowest push form for its length.
pub fn make_push_str(data: &[u8], ops: &impl OpcodeTable) -> Vec<u8> {
    let len = data.len();
    let mut script = Vec::with_capacity(len + 5);

    if len < ops.pushdata(1) as usize {
        script.push(len as u8);
    } else if len <= 0xff {
        script.push(ops.pushdata(1));
        script.push(len as u8);
    } else if len <= 0xffff {
        script.push(ops.pushdata(2));
        script.extend_from_slice(&(len as u16).to_le_bytes());
    } else {
        script.push(ops.pushdata(4));
        script.extend_from_slice(&(len as u32).to_le_bytes());
    }

    script.extend_from_slice(data);
    script
}

/// Build the script fragment that pushes the integer `n`.
pub fn make_push_int(n: i64, ops: &impl OpcodeTable) -> Vec<u8> {
    match n {
        0..=16 => vec![ops.small_int(n as u8)],
        _ => make_push_str(&render_int(n), ops),
    }
}

/// Hex-encode bytes. For logs and external representations only.
pub fn bytes_to_hex(bytes: &[u8]) -> String {
    hex::encode(bytes)
}

/// Decode a hex string.
pub fn hex_to_bytes(s: &str) -> Result<Vec<u8>> {
    hex::decode(s.trim()).map_err(|e| Error::DecodeError(format!("invalid hex: {e}")))
}
