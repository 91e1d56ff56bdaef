//! Little-endian wire primitives
//!
//! Every on-disk section in the crate is built from fixed-width `i32`,
//! IEEE-754 `f32`, and single-byte bools. Readers mirror writers exactly;
//! a short read surfaces as `io::ErrorKind::UnexpectedEof`.

use std::io::{self, Read, Write};

pub(crate) fn write_i32<W: Write>(out: &mut W, value: i32) -> io::Result<()> {
    out.write_all(&value.to_le_bytes())
}

pub(crate) fn write_f32<W: Write>(out: &mut W, value: f32) -> io::Result<()> {
    out.write_all(&value.to_le_bytes())
}

pub(crate) fn write_bool<W: Write>(out: &mut W, value: bool) -> io::Result<()> {
    out.write_all(&[value as u8])
}

pub(crate) fn write_f32_slice<W: Write>(out: &mut W, values: &[f32]) -> io::Result<()> {
    for &v in values {
        out.write_all(&v.to_le_bytes())?;
    }
    Ok(())
}

pub(crate) fn read_i32<R: Read>(input: &mut R) -> io::Result<i32> {
    let mut buf = [0u8; 4];
    input.read_exact(&mut buf)?;
    Ok(i32::from_le_bytes(buf))
}

pub(crate) fn read_f32<R: Read>(input: &mut R) -> io::Result<f32> {
    let mut buf = [0u8; 4];
    input.read_exact(&mut buf)?;
    Ok(f32::from_le_bytes(buf))
}

pub(crate) fn read_bool<R: Read>(input: &mut R) -> io::Result<bool> {
    let mut buf = [0u8; 1];
    input.read_exact(&mut buf)?;
    Ok(buf[0] != 0)
}

pub(crate) fn read_f32_vec<R: Read>(input: &mut R, len: usize) -> io::Result<Vec<f32>> {
    let mut values = Vec::with_capacity(len);
    for _ in 0..len {
        values.push(read_f32(input)?);
    }
    Ok(values)
}

/// Read a length-prefixed list of non-negative `i32` vector IDs.
pub(crate) fn read_id_list<R: Read>(input: &mut R) -> io::Result<Vec<usize>> {
    let len = read_i32(input)?;
    if len < 0 {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("Negative ID list length: {len}"),
        ));
    }
    let mut ids = Vec::with_capacity(len as usize);
    for _ in 0..len {
        ids.push(read_i32(input)? as usize);
    }
    Ok(ids)
}

pub(crate) fn write_id_list<W: Write>(out: &mut W, ids: &[usize]) -> io::Result<()> {
    write_i32(out, ids.len() as i32)?;
    for &id in ids {
        write_i32(out, id as i32)?;
    }
    Ok(())
}
