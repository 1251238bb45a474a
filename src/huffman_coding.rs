#![forbid(unsafe_code)]

use std::{collections::HashMap, convert::TryFrom, io::BufRead};

use anyhow::{anyhow, bail, ensure, Context, Result};
use log::*;

use crate::bit_reader::{BitReader, BitSequence};

////////////////////////////////////////////////////////////////////////////////

/// Order in which code length code lengths are stored in a dynamic block header.
const TREE_CODE_ORDER: [usize; 19] = [
    16, 17, 18, 0, 8, 7, 9, 6, 10, 5, 11, 4, 12, 3, 13, 2, 14, 1, 15,
];

pub type BlockCodings = (HuffmanCoding<LitLenToken>, HuffmanCoding<DistanceToken>);

pub fn decode_litlen_distance_trees<T: BufRead>(
    bit_reader: &mut BitReader<T>,
) -> Result<BlockCodings> {
    debug!("dynamic tree");

    let hlit = usize::from(bit_reader.read_bits(5)?.bits()) + 257;
    let hdist = usize::from(bit_reader.read_bits(5)?.bits()) + 1;
    let hclen = usize::from(bit_reader.read_bits(4)?.bits()) + 4;
    debug!("HLIT:\t{}", hlit);
    debug!("HDIST:\t{}", hdist);
    debug!("HCLEN:\t{}", hclen);
    ensure!(hlit <= 286, "too many literal/length codes: {}", hlit);
    ensure!(hdist <= 30, "too many distance codes: {}", hdist);

    let mut tree_len = [0u8; 19];
    for &position in TREE_CODE_ORDER.iter().take(hclen) {
        tree_len[position] = bit_reader.read_bits(3)?.bits() as u8;
    }
    let tree_code_huffman = HuffmanCoding::<TreeCodeToken>::from_lengths(&tree_len)
        .context("invalid code lengths set")?;

    let total = hlit + hdist;
    let mut code_lengths = Vec::<u8>::with_capacity(total);
    while code_lengths.len() < total {
        let (value, repeat) = match tree_code_huffman.read_symbol(bit_reader)? {
            TreeCodeToken::Length(len) => (len, 1),
            TreeCodeToken::CopyPrev => {
                let prev = *code_lengths
                    .last()
                    .ok_or_else(|| anyhow!("repeat code with no previous length"))?;
                (prev, bit_reader.read_extra(2)? + 3)
            }
            TreeCodeToken::RepeatZero { base, extra_bits } => {
                (0, base + bit_reader.read_extra(extra_bits)?)
            }
        };
        let repeat = usize::from(repeat);
        ensure!(
            code_lengths.len() + repeat <= total,
            "code length repeat runs past the end of the table"
        );
        code_lengths.resize(code_lengths.len() + repeat, value);
    }

    let (lit_lengths, dist_lengths) = code_lengths.split_at(hlit);
    ensure!(lit_lengths[256] != 0, "missing end-of-block code");

    Ok((
        HuffmanCoding::from_lengths_allowing_single(lit_lengths)
            .context("invalid literal/lengths set")?,
        HuffmanCoding::from_lengths_allowing_single(dist_lengths)
            .context("invalid distances set")?,
    ))
}

pub fn get_fixed_coding() -> Result<BlockCodings> {
    debug!("fixed tree");
    let mut lit_lengths = [0u8; 288];
    for (lit, len) in lit_lengths.iter_mut().enumerate() {
        *len = match lit {
            0..=143 => 8,
            144..=255 => 9,
            256..=279 => 7,
            _ => 8,
        };
    }
    let dist_lengths = [5u8; 30];

    // The fixed distance code leaves two 5-bit codes unused.
    Ok((
        HuffmanCoding::build(&lit_lengths, Completeness::Any)?,
        HuffmanCoding::build(&dist_lengths, Completeness::Any)?,
    ))
}

////////////////////////////////////////////////////////////////////////////////

#[derive(Clone, Copy, Debug)]
pub enum TreeCodeToken {
    Length(u8),
    CopyPrev,
    RepeatZero { base: u16, extra_bits: u8 },
}

impl TryFrom<HuffmanCodeWord> for TreeCodeToken {
    type Error = anyhow::Error;

    fn try_from(value: HuffmanCodeWord) -> Result<Self> {
        match value.0 {
            0..=15 => Ok(Self::Length(value.0 as u8)),
            16 => Ok(Self::CopyPrev),
            17 => Ok(Self::RepeatZero {
                base: 3,
                extra_bits: 3,
            }),
            18 => Ok(Self::RepeatZero {
                base: 11,
                extra_bits: 7,
            }),
            _ => Err(anyhow!("bad code length code: {}", value.0)),
        }
    }
}

////////////////////////////////////////////////////////////////////////////////

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum LitLenToken {
    Literal(u8),
    EndOfBlock,
    Length { base: u16, extra_bits: u8 },
}

impl TryFrom<HuffmanCodeWord> for LitLenToken {
    type Error = anyhow::Error;

    fn try_from(value: HuffmanCodeWord) -> Result<Self> {
        match value.0 {
            0..=255 => Ok(Self::Literal(value.0 as u8)),
            256 => Ok(Self::EndOfBlock),
            257..=264 => Ok(Self::Length {
                base: value.0 - 254,
                extra_bits: 0,
            }),
            265..=284 => {
                let extra_bits = ((value.0 - 265) / 4 + 1) as u8;
                let group_base = (1 << (extra_bits + 2)) + 3;
                let base = group_base + ((value.0 - 265) % 4) * (1 << extra_bits);

                Ok(Self::Length { base, extra_bits })
            }
            285 => Ok(Self::Length {
                base: 258,
                extra_bits: 0,
            }),
            _ => Err(anyhow!("bad literal/length code: {}", value.0)),
        }
    }
}

////////////////////////////////////////////////////////////////////////////////

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DistanceToken {
    pub base: u16,
    pub extra_bits: u8,
}

impl TryFrom<HuffmanCodeWord> for DistanceToken {
    type Error = anyhow::Error;

    fn try_from(value: HuffmanCodeWord) -> Result<Self> {
        match value.0 {
            0..=3 => Ok(Self {
                base: value.0 + 1,
                extra_bits: 0,
            }),
            4..=29 => {
                let extra_bits = (value.0 / 2 - 1) as u8;
                Ok(Self {
                    base: (1 << (extra_bits + 1)) + (value.0 % 2) * (1 << extra_bits) + 1,
                    extra_bits,
                })
            }
            _ => Err(anyhow!("bad distance code: {}", value.0)),
        }
    }
}

////////////////////////////////////////////////////////////////////////////////

const MAX_BITS: usize = 15;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Completeness {
    /// Every bit sequence must decode to a symbol.
    Full,
    /// Like `Full`, but a lone code of length one is also accepted.
    FullOrSingle,
    Any,
}

#[derive(Clone, Copy, Debug)]
pub struct HuffmanCodeWord(pub u16);

/// Canonical Huffman code mapping bit sequences (read MSB first) to symbols.
///
/// Symbols are only interpreted as `T` when they are read, so tables may
/// assign codes to symbols the format reserves (e.g. literal codes 286 and
/// 287 of the fixed tree) as long as the stream never uses them.
pub struct HuffmanCoding<T> {
    map: HashMap<BitSequence, HuffmanCodeWord>,
    _token: std::marker::PhantomData<T>,
}

impl<T> HuffmanCoding<T>
where
    T: TryFrom<HuffmanCodeWord, Error = anyhow::Error>,
{
    pub fn decode_symbol(&self, seq: BitSequence) -> Option<HuffmanCodeWord> {
        self.map.get(&seq).copied()
    }

    pub fn read_symbol<U: BufRead>(&self, bit_reader: &mut BitReader<U>) -> Result<T> {
        let mut bits = BitSequence::empty();
        while usize::from(bits.len()) < MAX_BITS {
            bits = bits.concat(bit_reader.read_bits(1)?);
            if let Some(word) = self.decode_symbol(bits) {
                return T::try_from(word);
            }
        }
        bail!("invalid huffman code {:#b}", bits.bits())
    }

    /// Build a complete code. An all-zero set yields an empty code that
    /// fails on first use.
    pub fn from_lengths(code_lengths: &[u8]) -> Result<Self> {
        Self::build(code_lengths, Completeness::Full)
    }

    /// Build a literal/length or distance code, which may also consist of a
    /// single one-bit code.
    pub fn from_lengths_allowing_single(code_lengths: &[u8]) -> Result<Self> {
        Self::build(code_lengths, Completeness::FullOrSingle)
    }

    fn build(code_lengths: &[u8], completeness: Completeness) -> Result<Self> {
        debug!("creating huffman coding from {} lengths", code_lengths.len());

        let mut bl_count = [0u16; MAX_BITS + 1];
        for &len in code_lengths {
            ensure!(usize::from(len) <= MAX_BITS, "code length {} too long", len);
            bl_count[usize::from(len)] += 1;
        }
        bl_count[0] = 0;

        let mut left: i32 = 1;
        for &count in &bl_count[1..] {
            left = (left << 1) - i32::from(count);
            ensure!(left >= 0, "over-subscribed huffman code");
        }
        let used: u16 = bl_count.iter().sum();
        let incomplete = left > 0 && used != 0;
        match completeness {
            Completeness::Full => {
                ensure!(!incomplete, "incomplete huffman code");
            }
            Completeness::FullOrSingle => {
                ensure!(
                    !incomplete || (used == 1 && bl_count[1] == 1),
                    "incomplete huffman code"
                );
            }
            Completeness::Any => {}
        }

        let mut next_code = [0u16; MAX_BITS + 1];
        let mut code: u16 = 0;
        for bits in 1..=MAX_BITS {
            code = (code + bl_count[bits - 1]) << 1;
            next_code[bits] = code;
        }

        let mut map = HashMap::new();
        for (symbol, &len) in code_lengths.iter().enumerate() {
            if len == 0 {
                continue;
            }
            let slot = &mut next_code[usize::from(len)];
            map.insert(BitSequence::new(*slot, len), HuffmanCodeWord(symbol as u16));
            *slot += 1;
        }

        Ok(Self {
            map,
            _token: std::marker::PhantomData,
        })
    }
}

////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone, Copy, Debug, PartialEq)]
    struct Value(u16);

    impl TryFrom<HuffmanCodeWord> for Value {
        type Error = anyhow::Error;

        fn try_from(x: HuffmanCodeWord) -> Result<Self> {
            Ok(Self(x.0))
        }
    }

    fn symbol(code: &HuffmanCoding<Value>, bits: u16, len: u8) -> Option<u16> {
        code.decode_symbol(BitSequence::new(bits, len)).map(|w| w.0)
    }

    #[test]
    fn from_lengths() -> Result<()> {
        let code = HuffmanCoding::<Value>::from_lengths(&[2, 3, 4, 3, 3, 4, 2])?;

        assert_eq!(symbol(&code, 0b00, 2), Some(0));
        assert_eq!(symbol(&code, 0b100, 3), Some(1));
        assert_eq!(symbol(&code, 0b1110, 4), Some(2));
        assert_eq!(symbol(&code, 0b101, 3), Some(3));
        assert_eq!(symbol(&code, 0b110, 3), Some(4));
        assert_eq!(symbol(&code, 0b1111, 4), Some(5));
        assert_eq!(symbol(&code, 0b01, 2), Some(6));

        assert_eq!(symbol(&code, 0b0, 1), None);
        assert_eq!(symbol(&code, 0b10, 2), None);
        assert_eq!(symbol(&code, 0b111, 3), None);

        Ok(())
    }

    #[test]
    fn read_symbol() -> Result<()> {
        let code = HuffmanCoding::<Value>::from_lengths(&[2, 3, 4, 3, 3, 4, 2])?;
        let mut data: &[u8] = &[0b10111001, 0b11001010, 0b11101101];
        let mut reader = BitReader::new(&mut data);

        assert_eq!(code.read_symbol(&mut reader)?, Value(1));
        assert_eq!(code.read_symbol(&mut reader)?, Value(2));
        assert_eq!(code.read_symbol(&mut reader)?, Value(3));
        assert_eq!(code.read_symbol(&mut reader)?, Value(6));
        assert_eq!(code.read_symbol(&mut reader)?, Value(0));
        assert_eq!(code.read_symbol(&mut reader)?, Value(2));
        assert_eq!(code.read_symbol(&mut reader)?, Value(4));
        assert!(code.read_symbol(&mut reader).is_err());

        Ok(())
    }

    #[test]
    fn over_subscribed_lengths_are_rejected() {
        assert!(HuffmanCoding::<Value>::from_lengths(&[1, 1, 1]).is_err());
    }

    #[test]
    fn incomplete_lengths_are_rejected() {
        assert!(HuffmanCoding::<Value>::from_lengths(&[1, 2]).is_err());
        assert!(HuffmanCoding::<Value>::from_lengths(&[0, 1]).is_err());
        assert!(HuffmanCoding::<Value>::from_lengths_allowing_single(&[1, 2]).is_err());
        assert!(HuffmanCoding::<Value>::from_lengths_allowing_single(&[0, 2]).is_err());
    }

    #[test]
    fn single_one_bit_code() -> Result<()> {
        let code = HuffmanCoding::<Value>::from_lengths_allowing_single(&[0, 0, 1])?;
        assert_eq!(symbol(&code, 0b0, 1), Some(2));
        assert_eq!(symbol(&code, 0b1, 1), None);

        let empty = HuffmanCoding::<Value>::from_lengths(&[0, 0, 0])?;
        assert_eq!(symbol(&empty, 0b0, 1), None);
        Ok(())
    }

    #[test]
    fn length_tokens() -> Result<()> {
        let cases = [
            (257, 3, 0),
            (264, 10, 0),
            (265, 11, 1),
            (266, 13, 1),
            (269, 19, 2),
            (284, 227, 5),
            (285, 258, 0),
        ];
        for (code, base, extra_bits) in cases {
            assert_eq!(
                LitLenToken::try_from(HuffmanCodeWord(code))?,
                LitLenToken::Length { base, extra_bits }
            );
        }
        assert!(LitLenToken::try_from(HuffmanCodeWord(286)).is_err());
        Ok(())
    }

    #[test]
    fn distance_tokens() -> Result<()> {
        let cases = [(0, 1, 0), (3, 4, 0), (4, 5, 1), (5, 7, 1), (29, 24577, 13)];
        for (code, base, extra_bits) in cases {
            assert_eq!(
                DistanceToken::try_from(HuffmanCodeWord(code))?,
                DistanceToken { base, extra_bits }
            );
        }
        assert!(DistanceToken::try_from(HuffmanCodeWord(30)).is_err());
        Ok(())
    }

    #[test]
    fn fixed_coding_decodes_literals() -> Result<()> {
        let (litlen, _) = get_fixed_coding()?;
        // 'a' is 0x30 + 97 = 0b10010001 in the fixed tree, sent MSB first.
        let mut data: &[u8] = &[0b10001001];
        let mut reader = BitReader::new(&mut data);
        assert_eq!(litlen.read_symbol(&mut reader)?, LitLenToken::Literal(b'a'));
        Ok(())
    }
}
