//! RFC 4880 packet framing
//!
//! Only what key ring export needs: split a binary key ring into packets,
//! group them into entities, and re-serialize an entity's public component.

use crate::{PolicyError, Result};

/// Packet tags used by key rings (RFC 4880 section 4.3)
pub mod tag {
    /// Signature packet
    pub const SIGNATURE: u8 = 2;
    /// Secret-key packet
    pub const SECRET_KEY: u8 = 5;
    /// Public-key packet
    pub const PUBLIC_KEY: u8 = 6;
    /// Secret-subkey packet
    pub const SECRET_SUBKEY: u8 = 7;
    /// Marker packet
    pub const MARKER: u8 = 10;
    /// User ID packet
    pub const USER_ID: u8 = 13;
    /// Public-subkey packet
    pub const PUBLIC_SUBKEY: u8 = 14;
    /// User attribute packet
    pub const USER_ATTRIBUTE: u8 = 17;
}

/// One framed packet with its tag and body
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    /// Packet tag
    pub tag: u8,
    /// Packet body without the header
    pub body: Vec<u8>,
}

impl Packet {
    /// Append the packet to `out` using a new-format header
    pub fn write_to(&self, out: &mut Vec<u8>) {
        out.push(0xC0 | self.tag);
        let len = self.body.len();
        if len < 192 {
            out.push(len as u8);
        } else if len < 8384 {
            let rest = len - 192;
            out.push(((rest >> 8) as u8) + 192);
            out.push(rest as u8);
        } else {
            out.push(0xFF);
            out.extend_from_slice(&(len as u32).to_be_bytes());
        }
        out.extend_from_slice(&self.body);
    }
}

/// A primary key with the packets that follow it up to the next primary key
#[derive(Debug, Clone)]
pub struct Entity {
    /// Primary key packet (public or secret)
    pub primary: Packet,
    /// User IDs, signatures and subkeys, in ring order
    pub packets: Vec<Packet>,
}

impl Entity {
    /// First User ID declared by the entity
    #[must_use]
    pub fn first_identity(&self) -> Option<String> {
        self.packets
            .iter()
            .find(|packet| packet.tag == tag::USER_ID)
            .map(|packet| String::from_utf8_lossy(&packet.body).into_owned())
    }

    /// Binary public key ring for this entity
    ///
    /// Secret key and subkey packets are cut down to their public fields and
    /// retagged; trust and other local packets are dropped.
    ///
    /// # Errors
    ///
    /// Returns a parse error when a key packet uses an unsupported version or
    /// algorithm, or is truncated.
    pub fn serialize_public(&self) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        public_packet(&self.primary)?.write_to(&mut out);

        for packet in &self.packets {
            match packet.tag {
                tag::SECRET_KEY | tag::PUBLIC_KEY | tag::SECRET_SUBKEY | tag::PUBLIC_SUBKEY => {
                    public_packet(packet)?.write_to(&mut out);
                }
                tag::USER_ID | tag::USER_ATTRIBUTE | tag::SIGNATURE => packet.write_to(&mut out),
                _ => {}
            }
        }

        Ok(out)
    }
}

/// Split a binary key ring into packets
///
/// # Errors
///
/// Returns a parse error for malformed headers, truncated bodies and
/// partial body lengths.
pub fn parse_packets(data: &[u8]) -> Result<Vec<Packet>> {
    let mut packets = Vec::new();
    let mut reader = Reader::new(data);

    while !reader.is_empty() {
        let header = reader.byte()?;
        if header & 0x80 == 0 {
            return Err(PolicyError::Parse(format!(
                "invalid packet header byte {header:#04x}"
            )));
        }

        let (tag, len) = if header & 0x40 != 0 {
            (header & 0x3F, new_format_length(&mut reader)?)
        } else {
            let tag = (header >> 2) & 0x0F;
            let len = match header & 0x03 {
                0 => usize::from(reader.byte()?),
                1 => usize::from(u16::from_be_bytes(reader.array()?)),
                2 => u32::from_be_bytes(reader.array()?) as usize,
                _ => reader.remaining(),
            };
            (tag, len)
        };

        packets.push(Packet {
            tag,
            body: reader.take(len)?.to_vec(),
        });
    }

    Ok(packets)
}

/// Group packets into entities, each starting at a primary key packet
///
/// # Errors
///
/// Returns a parse error when a packet other than a marker precedes the first
/// primary key.
pub fn group_entities(packets: Vec<Packet>) -> Result<Vec<Entity>> {
    let mut entities: Vec<Entity> = Vec::new();

    for packet in packets {
        match packet.tag {
            tag::SECRET_KEY | tag::PUBLIC_KEY => entities.push(Entity {
                primary: packet,
                packets: Vec::new(),
            }),
            tag::MARKER => {}
            other => match entities.last_mut() {
                Some(entity) => entity.packets.push(packet),
                None => {
                    return Err(PolicyError::Parse(format!(
                        "packet with tag {other} precedes the primary key"
                    )));
                }
            },
        }
    }

    Ok(entities)
}

fn new_format_length(reader: &mut Reader<'_>) -> Result<usize> {
    let first = reader.byte()?;
    match first {
        0..=191 => Ok(usize::from(first)),
        192..=223 => {
            let second = reader.byte()?;
            Ok(((usize::from(first) - 192) << 8) + usize::from(second) + 192)
        }
        255 => Ok(u32::from_be_bytes(reader.array()?) as usize),
        _ => Err(PolicyError::Parse(
            "partial body lengths are not supported in key rings".to_string(),
        )),
    }
}

/// Key packet with every secret field removed and the tag switched to its public form
fn public_packet(packet: &Packet) -> Result<Packet> {
    let tag = match packet.tag {
        tag::SECRET_KEY | tag::PUBLIC_KEY => tag::PUBLIC_KEY,
        _ => tag::PUBLIC_SUBKEY,
    };
    let len = public_fields_len(&packet.body)?;

    Ok(Packet {
        tag,
        body: packet.body[..len].to_vec(),
    })
}

/// Length of the public-key portion at the start of a key packet body
fn public_fields_len(body: &[u8]) -> Result<usize> {
    let mut reader = Reader::new(body);

    match reader.byte()? {
        2 | 3 => {
            // creation time, validity days
            reader.take(6)?;
        }
        4 => {
            reader.take(4)?;
        }
        version => {
            return Err(PolicyError::Parse(format!(
                "unsupported key packet version {version}"
            )));
        }
    }

    match reader.byte()? {
        // RSA: n, e
        1..=3 => reader.skip_mpis(2)?,
        // Elgamal: p, g, y
        16 => reader.skip_mpis(3)?,
        // DSA: p, q, g, y
        17 => reader.skip_mpis(4)?,
        // ECDH: curve OID, point, KDF parameters
        18 => {
            reader.skip_oid()?;
            reader.skip_mpis(1)?;
            let kdf_len = usize::from(reader.byte()?);
            reader.take(kdf_len)?;
        }
        // ECDSA and EdDSA: curve OID, point
        19 | 22 => {
            reader.skip_oid()?;
            reader.skip_mpis(1)?;
        }
        algorithm => {
            return Err(PolicyError::Parse(format!(
                "unsupported public key algorithm {algorithm}"
            )));
        }
    }

    Ok(reader.position())
}

struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    fn is_empty(&self) -> bool {
        self.pos >= self.data.len()
    }

    fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.pos)
    }

    fn position(&self) -> usize {
        self.pos
    }

    fn take(&mut self, len: usize) -> Result<&'a [u8]> {
        if len > self.remaining() {
            return Err(PolicyError::Parse(format!(
                "truncated packet: need {len} bytes, have {}",
                self.remaining()
            )));
        }
        let slice = &self.data[self.pos..self.pos + len];
        self.pos += len;
        Ok(slice)
    }

    fn byte(&mut self) -> Result<u8> {
        Ok(self.take(1)?[0])
    }

    fn array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    fn skip_mpis(&mut self, count: usize) -> Result<()> {
        for _ in 0..count {
            let bits = usize::from(u16::from_be_bytes(self.array()?));
            self.take(bits.div_ceil(8))?;
        }
        Ok(())
    }

    fn skip_oid(&mut self) -> Result<()> {
        let len = usize::from(self.byte()?);
        self.take(len)?;
        Ok(())
    }
}
