#![forbid(unsafe_code)]

use std::io::{BufRead, Write};

use anyhow::Result;
use log::*;

use crate::zlib::ZlibReader;

mod adler32;
mod bit_reader;
mod deflate;
mod history_writer;
mod huffman_coding;
mod zlib;

pub mod label;
pub mod report;
pub mod walk;

pub use label::LabelStyle;
pub use report::{run, ErrorMode, Options, Outcome};

/// Decompress a single zlib stream from `input` into `output`.
///
/// Bytes following the stream's checksum are ignored.
pub fn decompress<R: BufRead, W: Write>(input: R, output: W) -> Result<W> {
    let (mut rest, output) = ZlibReader::new(input).decompress(output)?;
    let trailing = rest.fill_buf()?.len();
    if trailing != 0 {
        warn!("ignoring data after the end of the zlib stream");
    }
    Ok(output)
}

pub fn decompress_to_vec(data: &[u8]) -> Result<Vec<u8>> {
    decompress(data, Vec::new())
}

////////////////////////////////////////////////////////////////////////////////
