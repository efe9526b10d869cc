//! Binary data body reader
//!
//! A `Binary:` body is a bare run of scalars with no framing and no end
//! marker; its length follows from the header counts alone.

use crate::types::{Endian, Precision, Result};
use byteorder::{BigEndian, LittleEndian, ReadBytesExt};
use std::io::Read;

/// Values decoded per read call. Bounds the allocation made ahead of
/// the data actually being present.
const CHUNK_VALUES: usize = 64 * 1024;

/// Reader for fixed-width binary data blocks
pub struct BlockReader<'a, R: Read> {
    reader: &'a mut R,
    precision: Precision,
    byte_order: Endian,
    /// Number of bytes consumed so far
    bytes_consumed: usize,
}

impl<'a, R: Read> BlockReader<'a, R> {
    pub fn new(reader: &'a mut R, precision: Precision, byte_order: Endian) -> Self {
        Self {
            reader,
            precision,
            byte_order,
            bytes_consumed: 0,
        }
    }

    /// Get item size in bytes
    #[inline]
    pub fn item_size(&self) -> usize {
        self.precision.item_size()
    }

    /// Get format name (for log output)
    #[inline]
    pub fn format_name(&self) -> &'static str {
        self.precision.format_name()
    }

    #[inline]
    pub fn bytes_consumed(&self) -> usize {
        self.bytes_consumed
    }

    /// Read exactly `count` scalars, widened to f64.
    ///
    /// A stream that ends early yields an `UnexpectedEof` IO error.
    pub fn read_block(&mut self, count: usize) -> Result<Vec<f64>> {
        let mut values = Vec::with_capacity(count.min(CHUNK_VALUES));
        let mut remaining = count;

        while remaining > 0 {
            let n = remaining.min(CHUNK_VALUES);
            self.read_chunk_into(n, &mut values)?;
            remaining -= n;
        }

        Ok(values)
    }

    fn read_chunk_into(&mut self, n: usize, out: &mut Vec<f64>) -> Result<()> {
        match self.precision {
            Precision::Single => {
                let mut buf = vec![0f32; n];
                match self.byte_order {
                    Endian::Big => self.reader.read_f32_into::<BigEndian>(&mut buf)?,
                    Endian::Little => self.reader.read_f32_into::<LittleEndian>(&mut buf)?,
                }
                out.extend(buf.into_iter().map(f64::from));
            }
            Precision::Double => {
                let mut buf = vec![0f64; n];
                match self.byte_order {
                    Endian::Big => self.reader.read_f64_into::<BigEndian>(&mut buf)?,
                    Endian::Little => self.reader.read_f64_into::<LittleEndian>(&mut buf)?,
                }
                out.extend(buf);
            }
        }
        self.bytes_consumed += n * self.item_size();
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================
