//! ## RTP: A Transport Protocol for Real-Time Applications
//!
//! [RFC3550]: https://tools.ietf.org/html/rfc3550
//! [RFC5285]: https://tools.ietf.org/html/rfc5285
//!
//! The real-time transport protocol [RFC3550] provides end-to-end delivery
//! services for data with real-time characteristics, such as interactive
//! audio and video.  Those services include payload type identification,
//! sequence numbering, timestamping and delivery monitoring.
//!
//! This crate is the packet codec only: it turns a datagram into a
//! [`Packet`] and a [`Packet`] back into a datagram, including the
//! one-byte header form of the general header extension mechanism
//! [RFC5285].  Sockets, sessions and jitter buffers are left to the
//! caller.
//!
//! ```
//! use rtp_codec::{Packet, decode, encode};
//!
//! let mut packet = Packet {
//!     payload_type: 96,
//!     sequence_number: 1,
//!     timestamp: 3000,
//!     ssrc: 0x1234_5678,
//!     payload: vec![0xde, 0xad].into(),
//!     ..Default::default()
//! };
//!
//! packet.add_extension(1, &[0x30]).unwrap();
//!
//! let bytes = encode(&packet, 1500).unwrap();
//! assert_eq!(decode(&bytes).unwrap(), packet);
//! ```

mod cursor;

pub mod extensions;
pub mod options;
pub mod packet;

pub use self::{
    extensions::{Extension, Extensions},
    options::{DuplicateExtension, Options},
    packet::Packet,
};

use bytes::{Bytes, BytesMut};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// The version field is not 2.
    UnsupportedVersion(u8),
    /// The buffer ends inside a field it must contain.
    Truncated,
    /// The header extension is not in the one-byte header form.
    UnsupportedExtensionProfile(u16),
    /// An extension element overruns its block, an extension id repeats,
    /// or the padding count is out of range.
    Malformed,
    TooManyCsrc(usize),
    TooManyExtensionElements(usize),
    InvalidElementLength(usize),
    InvalidArgument,
    BufferTooSmall,
}

impl std::error::Error for Error {}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// Packet decoder.
///
/// Holds the options that affect parsing, decoding itself keeps no state
/// between calls.
#[derive(Debug, Default, Clone)]
pub struct Decoder {
    options: Options,
}

impl Decoder {
    pub fn new(options: Options) -> Self {
        Self { options }
    }

    /// # Test
    ///
    /// ```
    /// use rtp_codec::{Decoder, DuplicateExtension, Error, Options};
    ///
    /// let buffer = [
    ///     0x90, 0x60, 0x00, 0x01, 0x00, 0x00, 0x00, 0x0a, 0x00, 0x00,
    ///     0x00, 0x01, 0xbe, 0xde, 0x00, 0x01, 0x10, 0xaa, 0x10, 0xbb,
    /// ];
    ///
    /// assert_eq!(Decoder::default().decode(&buffer), Err(Error::Malformed));
    ///
    /// let decoder = Decoder::new(Options {
    ///     duplicate_extension: DuplicateExtension::Overwrite,
    ///     ..Default::default()
    /// });
    ///
    /// let packet = decoder.decode(&buffer).unwrap();
    /// assert_eq!(packet.extensions.get(1), Some(&[0xbb][..]));
    /// ```
    pub fn decode(&self, bytes: &[u8]) -> Result<Packet, Error> {
        Packet::decode_with(bytes, self.options.duplicate_extension)
    }
}

/// Packet encoder bounded by the configured MTU.
#[derive(Debug, Default, Clone)]
pub struct Encoder {
    options: Options,
}

impl Encoder {
    pub fn new(options: Options) -> Self {
        Self { options }
    }

    /// # Test
    ///
    /// ```
    /// use rtp_codec::{Encoder, Error, Options, Packet};
    ///
    /// let encoder = Encoder::new(Options {
    ///     mtu: 64,
    ///     ..Default::default()
    /// });
    ///
    /// let mut packet = Packet {
    ///     payload: vec![0u8; 52].into(),
    ///     ..Default::default()
    /// };
    ///
    /// assert_eq!(encoder.encode(&packet).unwrap().len(), 64);
    ///
    /// packet.padding_size = 1;
    /// assert_eq!(encoder.encode(&packet), Err(Error::BufferTooSmall));
    /// ```
    pub fn encode(&self, packet: &Packet) -> Result<Bytes, Error> {
        packet.encode(self.options.mtu)
    }

    /// Appends the encoded packet to a reused buffer.
    pub fn encode_into(&self, packet: &Packet, bytes: &mut BytesMut) -> Result<(), Error> {
        packet.encode_into(bytes, self.options.mtu)
    }
}

/// Decodes a single RTP packet, `bytes` must be exactly one datagram.
///
/// # Test
///
/// ```
/// use rtp_codec::decode;
///
/// let buffer = [
///     0x80, 0x60, 0x00, 0x01, 0x00, 0x00, 0x00, 0x0A, 0x00, 0x00, 0x00, 0x01,
/// ];
///
/// let packet = decode(&buffer).unwrap();
/// assert_eq!(packet.version(), 2);
/// assert!(!packet.padding());
/// assert!(!packet.has_extension());
/// assert_eq!(packet.csrc_count(), 0);
/// assert!(!packet.marker);
/// assert_eq!(packet.payload_type, 0x60);
/// assert_eq!(packet.sequence_number, 1);
/// assert_eq!(packet.timestamp, 10);
/// assert_eq!(packet.ssrc, 1);
/// assert!(packet.payload.is_empty());
/// ```
pub fn decode(bytes: &[u8]) -> Result<Packet, Error> {
    Packet::decode(bytes)
}

/// Encodes a packet, failing if it needs more than `capacity` bytes.
///
/// The returned buffer holds exactly the packet.
pub fn encode(packet: &Packet, capacity: usize) -> Result<Bytes, Error> {
    packet.encode(capacity)
}

/// Attaches a header extension element to the packet, see
/// [`Packet::add_extension`].
pub fn add_extension(packet: &mut Packet, id: u8, data: &[u8]) -> Result<(), Error> {
    packet.add_extension(id, data)
}
