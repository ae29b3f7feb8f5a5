use crate::{Error, cursor::Cursor, options::DuplicateExtension};

use bytes::{BufMut, Bytes, BytesMut};
use num_enum::TryFromPrimitive;

const HEAD_MASK: u8 = 0b11110000;
const LE_HEAD_MASK: u8 = 0b00001111;

/// Element id that fills a single byte of alignment padding.
const PADDING_ID: u8 = 0;

/// Element id that terminates the block.
const TERMINATOR_ID: u8 = 15;

/// The maximum number of elements a one-byte header block can carry, one
/// per usable id (1-14).
pub const MAX_EXTENSION_ELEMENTS: usize = 14;

/// The maximum data length of a single element.
pub const MAX_ELEMENT_LENGTH: usize = 16;

/// "defined by profile" values of the RTP header extension.
#[repr(u16)]
#[derive(TryFromPrimitive, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtensionProfile {
    /// RFC 5285 one-byte header form.
    OneByte = 0xBEDE,
    /// RFC 5285 two-byte header form, recognized but not supported.
    TwoByte = 0x1000,
}

/// ### One-Byte Header
///
/// Each extension element starts with a byte containing an ID and a
/// length:
///
/// ```text
///  0
///  0 1 2 3 4 5 6 7
/// +-+-+-+-+-+-+-+-+
/// |  ID   |  len  |
/// +-+-+-+-+-+-+-+-+
/// ```
///
/// The 4-bit ID is the local identifier of this element in the range
/// 1-14 inclusive.
///
/// The 4-bit length is the number minus one of data bytes of this header
/// extension element following the one-byte header.  Therefore, the
/// value zero in this field indicates that one byte of data follows, and
/// a value of 15 (the maximum) indicates element data of 16 bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extension {
    pub id: u8,
    pub data: Bytes,
}

impl Extension {
    /// # Test
    ///
    /// ```
    /// use rtp_codec::extensions::Extension;
    ///
    /// let extension = Extension::new(2, &[0xaa, 0x36, 0x3f]);
    /// assert_eq!(extension.id, 2);
    /// assert_eq!(extension.data.as_ref(), &[0xaa, 0x36, 0x3f]);
    /// ```
    pub fn new(id: u8, data: &[u8]) -> Self {
        Self {
            id,
            data: Bytes::copy_from_slice(data),
        }
    }

    /// Wire size of the element, control byte included.
    ///
    /// # Test
    ///
    /// ```
    /// use rtp_codec::extensions::Extension;
    ///
    /// assert_eq!(Extension::new(2, &[0xaa, 0x36, 0x3f]).len(), 4);
    /// ```
    pub fn len(&self) -> usize {
        self.data.len() + 1
    }

    /// Whether the element can be put on the wire as is.
    fn validate(&self) -> Result<(), Error> {
        if self.data.is_empty() || self.data.len() > MAX_ELEMENT_LENGTH {
            return Err(Error::InvalidElementLength(self.data.len()));
        }

        if !(1..=14).contains(&self.id) {
            return Err(Error::InvalidArgument);
        }

        Ok(())
    }

    fn encode(&self, bytes: &mut BytesMut) {
        let size = (self.data.len() - 1) as u8;
        let mut head = 0u8;

        head = (head & LE_HEAD_MASK) | (self.id << 4);
        head = (head & HEAD_MASK) | size;

        bytes.put_u8(head);
        bytes.put(&self.data[..]);
    }
}

/// ### RTP Header Extension
///
/// In the one-byte header form of extensions, the 16-bit value required
/// by the RTP specification for a header extension, labeled in the RTP
/// specification as "defined by profile", takes the fixed bit pattern
/// 0xBEDE (the first version of this specification was written on the
/// feast day of the Venerable Bede).
///
/// ```text
///  0                   1                   2                   3
///  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |       0xBE    |    0xDE       |           length=3            |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |  ID   | L=0   |     data      |  ID   |  L=1  |   data...     |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |     ...data   |    0 (pad)    |    0 (pad)    |  ID   | L=3   |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |                          data                                 |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// ```
///
/// The list keeps elements in wire order and tracks the summed element
/// size, so the size of the encoded block is known without walking it.
#[derive(Debug, Clone, Default)]
pub struct Extensions {
    list: Vec<Extension>,
    size: usize,
}

impl PartialEq for Extensions {
    fn eq(&self, other: &Self) -> bool {
        self.list == other.list
    }
}

impl Eq for Extensions {}

impl Extensions {
    /// Adds an element unless one with the same id is already present.
    ///
    /// Returns `false` when the id was taken, the existing element is kept.
    ///
    /// # Test
    ///
    /// ```
    /// use rtp_codec::extensions::Extensions;
    ///
    /// let mut extensions = Extensions::default();
    ///
    /// assert!(extensions.insert(1, &[0x01]).unwrap());
    /// assert!(!extensions.insert(1, &[0x02, 0x03]).unwrap());
    /// assert_eq!(extensions.get(1), Some(&[0x01][..]));
    /// assert_eq!(extensions.byte_len(), 2);
    ///
    /// assert!(extensions.insert(0, &[0x01]).is_err());
    /// assert!(extensions.insert(15, &[0x01]).is_err());
    /// assert!(extensions.insert(2, &[]).is_err());
    /// assert!(extensions.insert(2, &[0u8; 17]).is_err());
    /// ```
    pub fn insert(&mut self, id: u8, data: &[u8]) -> Result<bool, Error> {
        if !(1..=14).contains(&id) || data.is_empty() || data.len() > MAX_ELEMENT_LENGTH {
            return Err(Error::InvalidArgument);
        }

        if self.contains(id) {
            return Ok(false);
        }

        self.push(Extension::new(id, data));
        Ok(true)
    }

    /// Appends an element without checking it.
    ///
    /// Elements added this way are validated when the packet is encoded.
    pub fn push(&mut self, extension: Extension) {
        self.size += extension.len();
        self.list.push(extension);
    }

    /// Gets the data of the element with the given id.
    pub fn get(&self, id: u8) -> Option<&[u8]> {
        self.list
            .iter()
            .find(|it| it.id == id)
            .map(|it| it.data.as_ref())
    }

    pub fn contains(&self, id: u8) -> bool {
        self.list.iter().any(|it| it.id == id)
    }

    /// Elements in wire order.
    pub fn iter(&self) -> impl Iterator<Item = &Extension> {
        self.list.iter()
    }

    pub fn len(&self) -> usize {
        self.list.len()
    }

    pub fn is_empty(&self) -> bool {
        self.list.is_empty()
    }

    /// Summed size of all elements, control bytes included, without the
    /// block header and alignment padding.
    pub fn byte_len(&self) -> usize {
        self.size
    }

    /// Size of the extension length field, in 32-bit words.
    fn words(&self) -> usize {
        self.size.div_ceil(4)
    }

    /// Size of the whole block on the wire, profile and length included.
    ///
    /// # Test
    ///
    /// ```
    /// use rtp_codec::extensions::Extensions;
    ///
    /// let mut extensions = Extensions::default();
    /// extensions.insert(1, &[0x01]).unwrap();
    /// extensions.insert(2, &[0x01, 0x02]).unwrap();
    ///
    /// assert_eq!(extensions.encoded_len(), 12);
    /// ```
    pub fn encoded_len(&self) -> usize {
        4 + self.words() * 4
    }

    pub(crate) fn validate(&self) -> Result<(), Error> {
        if self.list.len() > MAX_EXTENSION_ELEMENTS {
            return Err(Error::TooManyExtensionElements(self.list.len()));
        }

        for (index, extension) in self.list.iter().enumerate() {
            extension.validate()?;

            if self.list[..index].iter().any(|it| it.id == extension.id) {
                return Err(Error::InvalidArgument);
            }
        }

        Ok(())
    }

    /// Writes the block: profile, length in words, the elements in list
    /// order and zero padding up to the word boundary.
    ///
    /// The caller validates the list first.
    pub(crate) fn encode(&self, bytes: &mut BytesMut) {
        let words = self.words();

        bytes.put_u16(ExtensionProfile::OneByte as u16);
        bytes.put_u16(words as u16);

        for extension in &self.list {
            extension.encode(bytes);
        }

        let psize = words * 4 - self.size;
        if psize > 0 {
            bytes.put(&[0u8; 3][..psize]);
        }
    }

    /// Parses the element area of a one-byte header block, the profile and
    /// length fields are already consumed.
    pub(crate) fn decode(block: &[u8], duplicate: DuplicateExtension) -> Result<Self, Error> {
        let mut extensions = Self::default();
        let mut cursor = Cursor::new(block);

        while cursor.remaining() > 0 {
            let head = cursor.get_u8()?;
            let id = (head & HEAD_MASK) >> 4;

            if id == PADDING_ID {
                continue;
            }

            if id == TERMINATOR_ID {
                log::trace!(
                    "rtp extension terminator at offset {}, {} bytes ignored",
                    cursor.position() - 1,
                    cursor.remaining()
                );

                break;
            }

            let size = ((head & LE_HEAD_MASK) + 1) as usize;
            let data = match cursor.take(size) {
                Ok(it) => it,
                Err(_) => {
                    log::debug!(
                        "rtp extension element overruns block: id={}, len={}, remaining={}",
                        id,
                        size,
                        cursor.remaining()
                    );

                    return Err(Error::Malformed);
                }
            };

            if let Some(index) = extensions.list.iter().position(|it| it.id == id) {
                match duplicate {
                    DuplicateExtension::Reject => {
                        log::debug!("rtp extension id {} repeated in block", id);

                        return Err(Error::Malformed);
                    }
                    DuplicateExtension::Overwrite => {
                        log::trace!("rtp extension id {} repeated, overwriting", id);

                        let previous = extensions.list[index].len();
                        extensions.list[index].data = Bytes::copy_from_slice(data);
                        extensions.size = extensions.size - previous + size + 1;
                        continue;
                    }
                }
            }

            extensions.push(Extension::new(id, data));
        }

        Ok(extensions)
    }
}

impl From<Vec<Extension>> for Extensions {
    fn from(list: Vec<Extension>) -> Self {
        let size = list.iter().map(|it| it.len()).sum();
        Self { list, size }
    }
}

impl<'a> IntoIterator for &'a Extensions {
    type Item = &'a Extension;
    type IntoIter = std::slice::Iter<'a, Extension>;

    fn into_iter(self) -> Self::IntoIter {
        self.list.iter()
    }
}
