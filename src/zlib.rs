#![forbid(unsafe_code)]

use std::io::{BufRead, Write};

use anyhow::{bail, ensure, Context, Result};
use byteorder::{BigEndian, ReadBytesExt};
use log::*;

use crate::{bit_reader::BitReader, deflate::DeflateReader};

////////////////////////////////////////////////////////////////////////////////

const CM_DEFLATE: u8 = 8;
const MAX_CINFO: u8 = 7;

const FDICT_OFFSET: u8 = 5;

////////////////////////////////////////////////////////////////////////////////

/// Compression level hint stored in the top bits of `FLG`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CompressionLevel {
    Fastest,
    Fast,
    Default,
    Maximum,
}

impl From<u8> for CompressionLevel {
    fn from(flg: u8) -> Self {
        match flg >> 6 {
            0 => Self::Fastest,
            1 => Self::Fast,
            2 => Self::Default,
            _ => Self::Maximum,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StreamHeader {
    pub window_size: usize,
    pub level: CompressionLevel,
    pub has_dictionary: bool,
}

impl StreamHeader {
    pub fn parse(cmf: u8, flg: u8) -> Result<Self> {
        let method = cmf & 0x0f;
        ensure!(
            method == CM_DEFLATE,
            "unsupported compression method {}",
            method
        );

        let cinfo = cmf >> 4;
        ensure!(cinfo <= MAX_CINFO, "invalid window size (CINFO = {})", cinfo);

        ensure!(
            (u16::from(cmf) << 8 | u16::from(flg)) % 31 == 0,
            "header check failed"
        );

        Ok(Self {
            window_size: 1 << (cinfo + 8),
            level: flg.into(),
            has_dictionary: (flg >> FDICT_OFFSET) & 1 != 0,
        })
    }
}

////////////////////////////////////////////////////////////////////////////////

pub struct ZlibReader<T> {
    reader: T,
}

impl<T: BufRead> ZlibReader<T> {
    pub fn new(reader: T) -> Self {
        Self { reader }
    }

    /// Decode one zlib stream into `output`, verifying the Adler-32 trailer.
    ///
    /// Returns the reader positioned right after the trailer.
    pub fn decompress<W: Write>(mut self, output: W) -> Result<(T, W)> {
        let header = Self::parse_header(&mut self.reader)?;
        debug!(
            "window: {} bytes, level: {:?}",
            header.window_size, header.level
        );
        if header.has_dictionary {
            bail!("preset dictionaries are not supported");
        }

        let deflate_reader = DeflateReader::new(BitReader::new(self.reader));
        let (inflated, mut reader, writer) = deflate_reader.inflate(output)?;
        debug!("inflated {} bytes", inflated.byte_count);

        let expected = reader
            .read_u32::<BigEndian>()
            .context("truncated stream: missing adler32 trailer")?;
        ensure!(
            expected == inflated.adler32,
            "adler32 check failed: expected {:#010x}, got {:#010x}",
            expected,
            inflated.adler32
        );

        Ok((reader, writer))
    }

    fn parse_header(reader: &mut T) -> Result<StreamHeader> {
        let cmf = reader.read_u8().context("empty input")?;
        let flg = reader.read_u8().context("truncated stream header")?;
        StreamHeader::parse(cmf, flg)
    }
}

////////////////////////////////////////////////////////////////////////////////
