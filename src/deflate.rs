#![forbid(unsafe_code)]

use std::io::{BufRead, Write};

use anyhow::{bail, ensure, Result};
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use log::*;

use crate::bit_reader::BitReader;
use crate::history_writer::HistoryWriter;
use crate::huffman_coding::{self, BlockCodings, LitLenToken};

////////////////////////////////////////////////////////////////////////////////

#[derive(Debug)]
pub struct BlockHeader {
    pub is_final: bool,
    pub compression_type: CompressionType,
}

#[derive(Debug, PartialEq, Eq)]
pub enum CompressionType {
    Uncompressed,
    FixedTree,
    DynamicTree,
    Reserved,
}

impl From<u16> for CompressionType {
    fn from(num: u16) -> Self {
        match num {
            0 => CompressionType::Uncompressed,
            1 => CompressionType::FixedTree,
            2 => CompressionType::DynamicTree,
            _ => CompressionType::Reserved,
        }
    }
}

////////////////////////////////////////////////////////////////////////////////

/// Summary of an inflated deflate stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Inflated {
    pub byte_count: u64,
    pub adler32: u32,
}

pub struct DeflateReader<T> {
    bit_reader: BitReader<T>,
    reached_last: bool,
}

impl<T: BufRead> DeflateReader<T> {
    pub fn new(bit_reader: BitReader<T>) -> Self {
        Self {
            bit_reader,
            reached_last: false,
        }
    }

    fn next_block(&mut self) -> Result<Option<BlockHeader>> {
        if self.reached_last {
            return Ok(None);
        }
        let is_final = self.bit_reader.read_bits(1)?.bits() == 1;
        let compression_type = self.bit_reader.read_bits(2)?.bits().into();
        self.reached_last = is_final;
        Ok(Some(BlockHeader {
            is_final,
            compression_type,
        }))
    }

    /// Inflate every block of the stream into `output`.
    ///
    /// Returns the underlying reader positioned at the first byte after the
    /// final block, so the caller can read whatever trails the deflate data.
    pub fn inflate<W: Write>(mut self, output: W) -> Result<(Inflated, T, W)> {
        let mut writer = HistoryWriter::new(output);

        while let Some(header) = self.next_block()? {
            debug!("ISFINAL:\t{:?}", header.is_final);
            debug!("BTYPE:\t{:?}", header.compression_type);
            match header.compression_type {
                CompressionType::Uncompressed => self.copy_stored(&mut writer)?,
                CompressionType::FixedTree => {
                    let codings = huffman_coding::get_fixed_coding()?;
                    self.decode_compressed(&codings, &mut writer)?;
                }
                CompressionType::DynamicTree => {
                    let codings =
                        huffman_coding::decode_litlen_distance_trees(&mut self.bit_reader)?;
                    self.decode_compressed(&codings, &mut writer)?;
                }
                CompressionType::Reserved => bail!("reserved block type"),
            }
        }

        writer.flush()?;

        let inflated = Inflated {
            byte_count: writer.byte_count(),
            adler32: writer.adler32(),
        };
        let reader = {
            let mut bit_reader = self.bit_reader;
            bit_reader.align_to_byte();
            bit_reader.into_inner()
        };
        Ok((inflated, reader, writer.into_inner()))
    }

    fn copy_stored<W: Write>(&mut self, writer: &mut HistoryWriter<W>) -> Result<()> {
        let reader = self.bit_reader.align_to_byte();
        let len = reader.read_u16::<LittleEndian>()?;
        let nlen = reader.read_u16::<LittleEndian>()?;
        ensure!(len == !nlen, "stored block length check failed");
        debug!("copying {} stored bytes", len);

        let mut buffer = vec![0; len.into()];
        reader.read_exact(&mut buffer)?;
        writer.write_all(&buffer)?;
        Ok(())
    }

    fn decode_compressed<W: Write>(
        &mut self,
        (litlen, dist): &BlockCodings,
        writer: &mut HistoryWriter<W>,
    ) -> Result<()> {
        let bit_reader = &mut self.bit_reader;
        loop {
            match litlen.read_symbol(bit_reader)? {
                LitLenToken::Literal(lit) => writer.write_u8(lit)?,
                LitLenToken::Length { base, extra_bits } => {
                    let len = base + bit_reader.read_extra(extra_bits)?;
                    let dist = dist.read_symbol(bit_reader)?;
                    let distance = dist.base + bit_reader.read_extra(dist.extra_bits)?;
                    trace!("dist: {}, len: {}", distance, len);

                    writer.write_previous(distance.into(), len.into())?;
                }
                LitLenToken::EndOfBlock => return Ok(()),
            }
        }
    }
}

////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::*;

    fn inflate(data: &[u8]) -> Result<(Inflated, Vec<u8>)> {
        let reader = DeflateReader::new(BitReader::new(data));
        let (inflated, _, output) = reader.inflate(Vec::new())?;
        Ok((inflated, output))
    }

    #[test]
    fn fixed_block_with_back_reference() -> Result<()> {
        // Deflate body of zlib.compress(b"a" * 10).
        let (inflated, output) = inflate(&[0x4b, 0x4c, 0x84, 0x01, 0x00])?;
        assert_eq!(output, b"aaaaaaaaaa");
        assert_eq!(inflated.byte_count, 10);
        assert_eq!(inflated.adler32, 0x14e1_03cb);
        Ok(())
    }

    #[test]
    fn stored_block() -> Result<()> {
        let (_, output) = inflate(&[0x01, 0x03, 0x00, 0xfc, 0xff, b'x', b'y', b'z'])?;
        assert_eq!(output, b"xyz");
        Ok(())
    }

    #[test]
    fn stored_block_length_mismatch() {
        assert!(inflate(&[0x01, 0x03, 0x00, 0xfd, 0xff, b'x', b'y', b'z']).is_err());
    }

    #[test]
    fn reserved_block_type() {
        assert!(inflate(&[0x07]).is_err());
    }

    #[test]
    fn truncated_stream() {
        assert!(inflate(&[0x4b, 0x4c]).is_err());
    }

    #[test]
    fn leaves_reader_after_final_block() -> Result<()> {
        let data: &[u8] = &[0x01, 0x01, 0x00, 0xfe, 0xff, b'q', 0xaa, 0xbb];
        let reader = DeflateReader::new(BitReader::new(data));
        let (_, rest, output) = reader.inflate(Vec::new())?;
        assert_eq!(output, b"q");
        assert_eq!(rest, &[0xaa, 0xbb]);
        Ok(())
    }
}
