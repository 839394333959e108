//! Greedy hash-chain encoder.

use crate::error::CodecError;

use super::Header;

/// Shortest back-reference any control code can express.
const MIN_MATCH: usize = 3;

/// Longest back-reference (4-byte code).
const MAX_MATCH: usize = 1028;

/// Farthest back-reference distance (4-byte code).
const MAX_DISTANCE: usize = 131_072;

/// Largest literal run a single literal-block code carries.
const MAX_LITERAL_BLOCK: usize = 112;

const HASH_BITS: u32 = 16;

const NONE: usize = usize::MAX;

/// A back-reference chosen by the match finder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Match {
    len: usize,
    distance: usize,
}

/// Minimum copy length encodable at a given distance.
fn min_len_for(distance: usize) -> usize {
    match distance {
        0..=1024 => 3,
        1025..=16_384 => 4,
        _ => 5,
    }
}

/// Hash chains over every 3-byte prefix seen so far.
struct MatchFinder {
    head: Vec<usize>,
    prev: Vec<usize>,
    max_chain: usize,
}

impl MatchFinder {
    fn new(len: usize, max_chain: usize) -> Self {
        Self {
            head: vec![NONE; 1 << HASH_BITS],
            prev: vec![NONE; len],
            max_chain: max_chain.max(1),
        }
    }

    fn hash(data: &[u8], pos: usize) -> usize {
        let key = (u32::from(data[pos]) << 16)
            | (u32::from(data[pos + 1]) << 8)
            | u32::from(data[pos + 2]);
        (key.wrapping_mul(2_654_435_761) >> (32 - HASH_BITS)) as usize
    }

    fn insert(&mut self, data: &[u8], pos: usize) {
        let h = Self::hash(data, pos);
        self.prev[pos] = self.head[h];
        self.head[h] = pos;
    }

    /// Finds the longest encodable match for `pos`, nearest first on ties.
    fn find(&self, data: &[u8], pos: usize) -> Option<Match> {
        let limit = MAX_MATCH.min(data.len() - pos);
        let mut best: Option<Match> = None;
        let mut candidate = self.head[Self::hash(data, pos)];
        let mut steps = 0;

        while candidate != NONE && steps < self.max_chain {
            let distance = pos - candidate;
            if distance > MAX_DISTANCE {
                break;
            }
            let len = data[candidate..]
                .iter()
                .zip(&data[pos..pos + limit])
                .take_while(|(a, b)| a == b)
                .count();
            if len >= min_len_for(distance) && best.map_or(true, |b| len > b.len) {
                best = Some(Match { len, distance });
                if len == limit {
                    break;
                }
            }
            candidate = self.prev[candidate];
            steps += 1;
        }
        best
    }
}

/// Emits literal-block codes for all but the last 0..=3 bytes of `literals`.
///
/// Returns the remainder, which rides on the next copy or terminal code.
fn emit_literal_blocks<'a>(out: &mut Vec<u8>, mut literals: &'a [u8]) -> &'a [u8] {
    while literals.len() > 3 {
        let len = MAX_LITERAL_BLOCK.min(literals.len() & !3);
        out.push(0xE0 | ((len - 4) >> 2) as u8);
        out.extend_from_slice(&literals[..len]);
        literals = &literals[len..];
    }
    literals
}

/// Emits the smallest control code that carries `m` with `literals` (0..=3 bytes).
fn emit_copy(out: &mut Vec<u8>, literals: &[u8], m: Match) {
    let lit = literals.len();
    let offset = m.distance - 1;
    if m.len <= 10 && m.distance <= 1024 {
        out.push((((offset >> 8) << 5) | ((m.len - 3) << 2) | lit) as u8);
        out.push(offset as u8);
    } else if m.len <= 67 && m.distance <= 16_384 {
        out.push((0x80 | (m.len - 4)) as u8);
        out.push(((lit << 6) | (offset >> 8)) as u8);
        out.push(offset as u8);
    } else {
        let len = m.len - 5;
        out.push((0xC0 | ((offset >> 16) << 4) | ((len >> 8) << 2) | lit) as u8);
        out.push((offset >> 8) as u8);
        out.push(offset as u8);
        out.push(len as u8);
    }
    out.extend_from_slice(literals);
}

/// Compresses `data` into an internal-compression stream.
///
/// `max_chain` bounds how many earlier positions are tried per match. Inputs
/// larger than `u32::MAX` bytes cannot be described by the header.
pub fn encode(data: &[u8], max_chain: usize) -> Result<Vec<u8>, CodecError> {
    let size = u32::try_from(data.len()).map_err(|_| CodecError::InputTooLarge {
        len: data.len(),
        max: u32::MAX as usize,
    })?;

    let mut out = Vec::with_capacity(data.len() / 2 + 16);
    Header::write(&mut out, size);

    let mut finder = MatchFinder::new(data.len(), max_chain);
    let mut pos = 0;
    let mut literal_start = 0;

    while pos + MIN_MATCH <= data.len() {
        let found = finder.find(data, pos);
        finder.insert(data, pos);
        match found {
            Some(m) => {
                let rest = emit_literal_blocks(&mut out, &data[literal_start..pos]);
                emit_copy(&mut out, rest, m);
                for p in pos + 1..pos + m.len {
                    if p + MIN_MATCH <= data.len() {
                        finder.insert(data, p);
                    }
                }
                pos += m.len;
                literal_start = pos;
            }
            None => pos += 1,
        }
    }

    let rest = emit_literal_blocks(&mut out, &data[literal_start..]);
    out.push(0xFC | rest.len() as u8);
    out.extend_from_slice(rest);
    Ok(out)
}
