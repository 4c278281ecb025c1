//! Fixed-layout field primitives
//!
//! Every persisted header in this crate is a sequence of u8/u32 scalars and
//! fixed-size byte arrays, emitted in declaration order with no padding,
//! little-endian for multi-byte scalars. These helpers are the only
//! serialization mechanism headers use; each header type owns its audited
//! encode/decode built from them. Short reads fail with the underlying
//! `UnexpectedEof`.

use std::io::{self, Read, Write};

pub fn write_u8<W: Write>(w: &mut W, value: u8) -> io::Result<()> {
    w.write_all(&[value])
}

pub fn write_u32_le<W: Write>(w: &mut W, value: u32) -> io::Result<()> {
    w.write_all(&value.to_le_bytes())
}

pub fn write_bytes<W: Write>(w: &mut W, value: &[u8]) -> io::Result<()> {
    w.write_all(value)
}

pub fn read_u8<R: Read>(r: &mut R) -> io::Result<u8> {
    let mut buf = [0u8; 1];
    r.read_exact(&mut buf)?;
    Ok(buf[0])
}

pub fn read_u32_le<R: Read>(r: &mut R) -> io::Result<u32> {
    let mut buf = [0u8; 4];
    r.read_exact(&mut buf)?;
    Ok(u32::from_le_bytes(buf))
}

pub fn read_array<const N: usize, R: Read>(r: &mut R) -> io::Result<[u8; N]> {
    let mut buf = [0u8; N];
    r.read_exact(&mut buf)?;
    Ok(buf)
}
