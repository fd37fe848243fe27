//! ASCII armor (RFC 4880 section 6)

use crate::{PolicyError, Result};
use base64::{Engine as _, engine::general_purpose::STANDARD};
use std::fmt;
use std::str::FromStr;

const LINE_WIDTH: usize = 64;
const CRC24_INIT: u32 = 0x00B7_04CE;
const CRC24_POLY: u32 = 0x0186_4CFB;

/// Armor block types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArmorBlock {
    /// `PGP PUBLIC KEY BLOCK`
    PublicKey,
    /// `PGP PRIVATE KEY BLOCK`
    PrivateKey,
    /// `PGP MESSAGE`
    Message,
    /// `PGP SIGNATURE`
    Signature,
}

impl ArmorBlock {
    /// Label used in the BEGIN and END lines
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::PublicKey => "PGP PUBLIC KEY BLOCK",
            Self::PrivateKey => "PGP PRIVATE KEY BLOCK",
            Self::Message => "PGP MESSAGE",
            Self::Signature => "PGP SIGNATURE",
        }
    }
}

impl fmt::Display for ArmorBlock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for ArmorBlock {
    type Err = PolicyError;

    fn from_str(s: &str) -> Result<Self> {
        [
            Self::PublicKey,
            Self::PrivateKey,
            Self::Message,
            Self::Signature,
        ]
        .into_iter()
        .find(|block| block.label() == s)
        .ok_or_else(|| PolicyError::invalid_request(format!("unknown armor block type {s}")))
    }
}

/// CRC-24 over `data`
#[must_use]
pub fn crc24(data: &[u8]) -> u32 {
    let mut crc = CRC24_INIT;
    for &byte in data {
        crc ^= u32::from(byte) << 16;
        for _ in 0..8 {
            crc <<= 1;
            if crc & 0x0100_0000 != 0 {
                crc ^= CRC24_POLY;
            }
        }
    }
    crc & 0x00FF_FFFF
}

/// Armor `data` as `block` with no headers
#[must_use]
pub fn armor(block: ArmorBlock, data: &[u8]) -> String {
    let encoded = STANDARD.encode(data);
    let crc = crc24(data).to_be_bytes();

    let mut out = format!("-----BEGIN {block}-----\n\n");
    // base64 output is ASCII, so byte chunks are valid UTF-8
    for line in encoded.as_bytes().chunks(LINE_WIDTH) {
        out.push_str(&String::from_utf8_lossy(line));
        out.push('\n');
    }
    out.push('=');
    out.push_str(&STANDARD.encode(&crc[1..]));
    out.push_str(&format!("\n-----END {block}-----\n"));
    out
}

/// Decode the first armored block in `text`, verifying its checksum if present
///
/// # Errors
///
/// Returns a parse error when the BEGIN or END line is missing or
/// mismatched, the body is not valid base64, or the checksum does not match.
pub fn dearmor(text: &str) -> Result<(ArmorBlock, Vec<u8>)> {
    let mut lines = text.lines().map(str::trim_end);

    let label = lines
        .by_ref()
        .find_map(|line| {
            line.strip_prefix("-----BEGIN ")
                .and_then(|rest| rest.strip_suffix("-----"))
        })
        .ok_or_else(|| PolicyError::Parse("missing armor BEGIN line".to_string()))?;
    let block = label
        .parse::<ArmorBlock>()
        .map_err(|_| PolicyError::Parse(format!("unknown armor block type {label}")))?;

    // armor headers end at the first blank line
    for line in lines.by_ref() {
        if line.is_empty() {
            break;
        }
    }

    let mut body = String::new();
    let mut checksum = None;
    let mut terminated = false;
    for line in lines {
        if let Some(rest) = line.strip_prefix("-----END ") {
            if rest.strip_suffix("-----") != Some(label) {
                return Err(PolicyError::Parse(format!(
                    "armor END line does not match {label}"
                )));
            }
            terminated = true;
            break;
        }
        match line.strip_prefix('=') {
            Some(crc) => checksum = Some(crc.to_string()),
            None => body.push_str(line),
        }
    }
    if !terminated {
        return Err(PolicyError::Parse("missing armor END line".to_string()));
    }

    let data = STANDARD
        .decode(body.as_bytes())
        .map_err(|e| PolicyError::Parse(format!("invalid armor body: {e}")))?;

    if let Some(checksum) = checksum {
        let expected = STANDARD
            .decode(checksum.as_bytes())
            .map_err(|e| PolicyError::Parse(format!("invalid armor checksum: {e}")))?;
        if expected.as_slice() != &crc24(&data).to_be_bytes()[1..] {
            return Err(PolicyError::Parse("armor checksum mismatch".to_string()));
        }
    }

    Ok((block, data))
}
