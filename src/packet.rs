use crate::{
    Error,
    cursor::Cursor,
    extensions::{ExtensionProfile, Extensions},
    options::DuplicateExtension,
};

use bytes::{BufMut, Bytes, BytesMut};

const MARKER_MASK: u8 = 0b10000000;
const VERSION_MASK: u8 = 0b11000000;
const PADDING_MASK: u8 = 0b00100000;
const EXTENSION_MASK: u8 = 0b00010000;
const CSRC_COUNT_MASK: u8 = 0b00001111;
const PAYLOAD_KIND_MASK: u8 = 0b01111111;

/// The RTP version defined by RFC 3550, the only one accepted.
pub const VERSION: u8 = 2;

/// Size of the fixed part of the header.
pub const FIXED_HEADER_SIZE: usize = 12;

/// The CC field is 4 bits wide.
pub const MAX_CSRC_COUNT: usize = 15;

/// ### RTP Data Transfer Protocol
///
/// ```text
///  0                   1                   2                   3
///  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |V=2|P|X|  CC   |M|     PT      |       sequence number         |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |                           timestamp                           |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |           synchronization source (SSRC) identifier            |
/// +=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+
/// |            contributing source (CSRC) identifiers             |
/// |                             ....                              |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |      defined by profile       |           length              |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |                        header extension                       |
/// |                             ....                              |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |                          payload  ...                         |
/// |                               +-------------------------------+
/// |                               | RTP padding   | RTP pad count |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// ```
///
/// The version, padding, extension and CC fields are not stored, they
/// follow from the rest of the packet so an encoded header can not
/// disagree with its body.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Packet {
    /// The interpretation of the marker is defined by a profile.  It is
    /// intended to allow significant events such as frame boundaries to
    /// be marked in the packet stream.
    pub marker: bool,
    /// This field identifies the format of the RTP payload and determines
    /// its interpretation by the application.  Only the low 7 bits are
    /// put on the wire.
    pub payload_type: u8,
    /// The sequence number increments by one for each RTP data packet
    /// sent, and may be used by the receiver to detect packet loss and to
    /// restore packet sequence.
    pub sequence_number: u16,
    /// The timestamp reflects the sampling instant of the first octet in
    /// the RTP data packet.
    pub timestamp: u32,
    /// The SSRC field identifies the synchronization source.
    pub ssrc: u32,
    /// The CSRC list identifies the contributing sources for the payload
    /// contained in this packet.  If there are more than 15 contributing
    /// sources, only 15 can be identified.
    pub csrc: Vec<u32>,
    /// One-byte header extension elements, in wire order.
    pub extensions: Extensions,
    /// Number of trailing padding octets, the count octet included.  Zero
    /// means the padding bit is clear.
    pub padding_size: u8,
    pub payload: Bytes,
}

impl Packet {
    pub fn version(&self) -> u8 {
        VERSION
    }

    pub fn padding(&self) -> bool {
        self.padding_size > 0
    }

    pub fn has_extension(&self) -> bool {
        !self.extensions.is_empty()
    }

    pub fn csrc_count(&self) -> usize {
        self.csrc.len()
    }

    /// Always the one-byte header profile, the only one supported.
    pub fn extension_profile(&self) -> u16 {
        ExtensionProfile::OneByte as u16
    }

    /// Attaches a header extension element.
    ///
    /// The first write of an id wins, a later call with the same id leaves
    /// the packet untouched.
    ///
    /// # Test
    ///
    /// ```
    /// use rtp_codec::Packet;
    ///
    /// let mut packet = Packet::default();
    /// packet.add_extension(3, &[0x01, 0x02]).unwrap();
    /// packet.add_extension(3, &[0x09]).unwrap();
    ///
    /// assert_eq!(packet.extensions.len(), 1);
    /// assert_eq!(packet.extensions.get(3), Some(&[0x01, 0x02][..]));
    /// assert!(packet.add_extension(15, &[0x01]).is_err());
    /// ```
    pub fn add_extension(&mut self, id: u8, data: &[u8]) -> Result<(), Error> {
        self.extensions.insert(id, data)?;
        Ok(())
    }

    /// Exact size of the encoded packet.
    ///
    /// # Test
    ///
    /// ```
    /// use rtp_codec::Packet;
    ///
    /// let mut packet = Packet {
    ///     csrc: vec![1, 2],
    ///     padding_size: 4,
    ///     payload: vec![0u8; 10].into(),
    ///     ..Default::default()
    /// };
    ///
    /// assert_eq!(packet.encoded_len(), 12 + 8 + 10 + 4);
    ///
    /// packet.add_extension(1, &[0xaa]).unwrap();
    /// assert_eq!(packet.encoded_len(), 12 + 8 + 8 + 10 + 4);
    /// ```
    pub fn encoded_len(&self) -> usize {
        let mut size = FIXED_HEADER_SIZE + self.csrc.len() * 4;

        if self.has_extension() {
            size += self.extensions.encoded_len();
        }

        size + self.payload.len() + self.padding_size as usize
    }

    /// Checks everything that could make the packet unencodable within
    /// `capacity`, nothing is written when this fails.
    fn validate(&self, capacity: usize) -> Result<usize, Error> {
        if self.csrc.len() > MAX_CSRC_COUNT {
            return Err(Error::TooManyCsrc(self.csrc.len()));
        }

        self.extensions.validate()?;

        let size = self.encoded_len();
        if size > capacity {
            log::debug!(
                "rtp packet does not fit: size={}, capacity={}",
                size,
                capacity
            );

            return Err(Error::BufferTooSmall);
        }

        Ok(size)
    }

    /// Appends the encoded packet to `bytes`.
    ///
    /// `capacity` bounds the size of this packet only, what `bytes` already
    /// holds is not counted.
    ///
    /// # Test
    ///
    /// ```
    /// use bytes::BytesMut;
    /// use rtp_codec::Packet;
    ///
    /// let buffer = [
    ///     0x90, 0x72, 0x04, 0xf1, 0xf8, 0x87, 0x3f, 0xad, 0x67, 0xfe,
    ///     0x9d, 0xfc, 0xbe, 0xde, 0x00, 0x01, 0x22, 0xaa, 0x36, 0x3f,
    ///     0x00, 0x00, 0x00, 0x00, 0x00,
    /// ];
    ///
    /// let mut packet = Packet {
    ///     marker: false,
    ///     payload_type: 114,
    ///     sequence_number: 1265,
    ///     timestamp: 4169613229,
    ///     ssrc: 1744739836,
    ///     payload: vec![0u8; 5].into(),
    ///     ..Default::default()
    /// };
    ///
    /// packet.add_extension(2, &[0xaa, 0x36, 0x3f]).unwrap();
    ///
    /// let mut writer = BytesMut::new();
    /// packet.encode_into(&mut writer, 1500).unwrap();
    /// assert_eq!(&writer[..], &buffer[..]);
    /// ```
    #[rustfmt::skip]
    pub fn encode_into(&self, bytes: &mut BytesMut, capacity: usize) -> Result<(), Error> {
        let size = self.validate(capacity)?;
        bytes.reserve(size);

        let mut basic = [0u8; 2];
        basic[0] = VERSION << 6;
        basic[0] = if self.padding() { basic[0] | PADDING_MASK } else { basic[0] };
        basic[0] = if self.has_extension() { basic[0] | EXTENSION_MASK } else { basic[0] };
        basic[0] |= self.csrc.len() as u8 & CSRC_COUNT_MASK;
        basic[1] = if self.marker { MARKER_MASK } else { 0 };
        basic[1] |= self.payload_type & PAYLOAD_KIND_MASK;

        bytes.put(&basic[..]);
        bytes.put_u16(self.sequence_number);
        bytes.put_u32(self.timestamp);
        bytes.put_u32(self.ssrc);

        for item in &self.csrc {
            bytes.put_u32(*item);
        }

        if self.has_extension() {
            self.extensions.encode(bytes);
        }

        bytes.put(&self.payload[..]);

        if self.padding_size > 0 {
            bytes.put_bytes(0, self.padding_size as usize - 1);
            bytes.put_u8(self.padding_size);
        }

        Ok(())
    }

    /// # Test
    ///
    /// ```
    /// use rtp_codec::Packet;
    ///
    /// let packet = Packet {
    ///     payload_type: 0x60,
    ///     sequence_number: 1,
    ///     timestamp: 10,
    ///     ssrc: 1,
    ///     ..Default::default()
    /// };
    ///
    /// let bytes = packet.encode(1500).unwrap();
    /// assert_eq!(
    ///     &bytes[..],
    ///     &[0x80, 0x60, 0x00, 0x01, 0x00, 0x00, 0x00, 0x0a, 0x00, 0x00, 0x00, 0x01]
    /// );
    ///
    /// assert!(packet.encode(11).is_err());
    /// ```
    pub fn encode(&self, capacity: usize) -> Result<Bytes, Error> {
        let mut bytes = BytesMut::with_capacity(self.encoded_len().min(capacity));
        self.encode_into(&mut bytes, capacity)?;
        Ok(bytes.freeze())
    }

    /// # Test
    ///
    /// ```
    /// use rtp_codec::Packet;
    ///
    /// let buffer = [
    ///     0xB0, 0x72, 0x04, 0xf1, 0xf8, 0x87, 0x3f, 0xad, 0x67, 0xfe,
    ///     0x9d, 0xfc, 0xbe, 0xde, 0x00, 0x01, 0x22, 0xaa, 0x36, 0x3f,
    ///     0x00, 0x00, 0x00, 0x00, 0x00, 0x01, 0x01, 0x01, 0x01, 0x05,
    /// ];
    ///
    /// let packet = Packet::decode(&buffer[..]).unwrap();
    /// assert_eq!(packet.marker, false);
    /// assert_eq!(packet.payload_type, 114);
    /// assert_eq!(packet.sequence_number, 1265);
    /// assert_eq!(packet.timestamp, 4169613229);
    /// assert_eq!(packet.ssrc, 1744739836);
    /// assert!(packet.csrc.is_empty());
    /// assert_eq!(packet.padding_size, 5);
    /// assert_eq!(packet.extensions.get(2), Some(&[0xaa, 0x36, 0x3f][..]));
    /// assert_eq!(&packet.payload[..], &[0x00, 0x00, 0x00, 0x00, 0x00]);
    /// ```
    pub fn decode(bytes: &[u8]) -> Result<Self, Error> {
        Self::decode_with(bytes, DuplicateExtension::Reject)
    }

    #[rustfmt::skip]
    pub(crate) fn decode_with(bytes: &[u8], duplicate: DuplicateExtension) -> Result<Self, Error> {
        if bytes.len() < FIXED_HEADER_SIZE {
            return Err(Error::Truncated);
        }

        let mut cursor = Cursor::new(bytes);
        let basic = cursor.take(2)?;

        // lock rtp version in rfc 3550
        let version = (basic[0] & VERSION_MASK) >> 6;
        if version != VERSION {
            log::debug!("rtp version is not rfc3550: version={}", version);

            return Err(Error::UnsupportedVersion(version));
        }

        let is_padding = (basic[0] & PADDING_MASK) != 0;
        let is_extension = (basic[0] & EXTENSION_MASK) != 0;
        let csrc_count = (basic[0] & CSRC_COUNT_MASK) as usize;
        let marker = (basic[1] & MARKER_MASK) != 0;
        let payload_type = basic[1] & PAYLOAD_KIND_MASK;

        let sequence_number = cursor.get_u16()?;
        let timestamp = cursor.get_u32()?;
        let ssrc = cursor.get_u32()?;

        let mut csrc = Vec::with_capacity(csrc_count);
        for _ in 0..csrc_count {
            csrc.push(cursor.get_u32()?);
        }

        let extensions = if is_extension {
            let profile = cursor.get_u16()?;
            match ExtensionProfile::try_from(profile) {
                Ok(ExtensionProfile::OneByte) => (),
                Ok(ExtensionProfile::TwoByte) | Err(_) => {
                    log::debug!("rtp extension profile is not supported: profile={:#06x}", profile);

                    return Err(Error::UnsupportedExtensionProfile(profile));
                }
            }

            let size = cursor.get_u16()? as usize * 4;
            Extensions::decode(cursor.take(size)?, duplicate)?
        } else {
            Extensions::default()
        };

        let payload_start = cursor.position();
        let available = cursor.remaining();

        // the last octet of the datagram is the padding count,
        // including itself.
        let padding_size = if is_padding {
            let size = bytes[bytes.len() - 1];
            if size == 0 || size as usize > available {
                log::debug!(
                    "rtp padding size is invalid: padding={}, available={}",
                    size,
                    available
                );

                return Err(Error::Malformed);
            }

            size
        } else {
            0
        };

        let payload_end = payload_start + available - padding_size as usize;
        let payload = Bytes::copy_from_slice(&bytes[payload_start..payload_end]);

        Ok(Self {
            marker,
            payload_type,
            sequence_number,
            timestamp,
            ssrc,
            csrc,
            extensions,
            padding_size,
            payload,
        })
    }
}

impl<'a> TryFrom<&'a [u8]> for Packet {
    type Error = Error;

    fn try_from(bytes: &'a [u8]) -> Result<Self, Self::Error> {
        Self::decode(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_bits() {
        let packet = Packet {
            marker: true,
            payload_type: 0xff,
            csrc: vec![0xdeadbeef],
            padding_size: 1,
            ..Default::default()
        };

        let bytes = packet.encode(1500).unwrap();
        assert_eq!(bytes[0], 0b1010_0001);
        assert_eq!(bytes[1], 0xff);
        assert_eq!(&bytes[12..16], &[0xde, 0xad, 0xbe, 0xef]);
        assert_eq!(bytes[16], 1);
        assert_eq!(bytes.len(), 17);
    }

    #[test]
    fn extension_bit_follows_elements() {
        let mut packet = Packet::default();
        assert_eq!(packet.encode(1500).unwrap()[0] & EXTENSION_MASK, 0);

        packet.add_extension(5, &[0x01]).unwrap();
        assert_eq!(packet.encode(1500).unwrap()[0] & EXTENSION_MASK, EXTENSION_MASK);
    }

    #[test]
    fn capacity_is_exact() {
        let packet = Packet {
            payload: Bytes::from_static(&[0u8; 100]),
            padding_size: 3,
            ..Default::default()
        };

        assert_eq!(packet.encoded_len(), 115);
        assert_eq!(packet.encode(114), Err(Error::BufferTooSmall));
        assert_eq!(packet.encode(115).unwrap().len(), 115);
    }

    #[test]
    fn encode_into_appends() {
        let packet = Packet::default();
        let mut bytes = BytesMut::from(&b"head"[..]);

        packet.encode_into(&mut bytes, 12).unwrap();
        assert_eq!(bytes.len(), 16);
        assert_eq!(&bytes[..4], b"head");
    }

    #[test]
    fn too_many_csrc() {
        let packet = Packet {
            csrc: (0..16).collect(),
            ..Default::default()
        };

        assert_eq!(packet.encode(1500), Err(Error::TooManyCsrc(16)));
    }

    #[test]
    fn padding_covering_whole_body() {
        let bytes = [0xa0, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x01, 0x00, 0x02];
        let packet = Packet::decode(&bytes).unwrap();

        assert_eq!(packet.padding_size, 2);
        assert!(packet.payload.is_empty());
    }

    #[test]
    fn padding_count_out_of_range() {
        let mut bytes = vec![0xa0, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x01];
        bytes.extend_from_slice(&[0x00, 0x00, 0x03]);
        assert!(Packet::decode(&bytes).is_ok());

        *bytes.last_mut().unwrap() = 0x04;
        assert_eq!(Packet::decode(&bytes), Err(Error::Malformed));

        *bytes.last_mut().unwrap() = 0x00;
        assert_eq!(Packet::decode(&bytes), Err(Error::Malformed));

        // padding bit without any byte after the header
        assert_eq!(Packet::decode(&bytes[..12]), Err(Error::Malformed));
    }
}
