#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// What the decoder does when a one-byte header block repeats an
/// extension id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Deserialize, Serialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "kebab-case"))]
pub enum DuplicateExtension {
    /// The packet is rejected with [`crate::Error::Malformed`].
    #[default]
    Reject,
    /// The later element replaces the data of the earlier one, which keeps
    /// its position in the list.
    Overwrite,
}

/// Codec options.
///
/// With the `serde` feature enabled this can be embedded in an
/// application configuration file:
///
/// ```toml
/// [rtp]
/// mtu = 1200
/// duplicate-extension = "overwrite"
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Deserialize, Serialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "kebab-case"))]
pub struct Options {
    ///
    /// Maximum Transmission Unit (MTU) size for network packets.
    ///
    /// Used as the output capacity by [`crate::Encoder::encode`], a packet
    /// whose wire size exceeds it is refused with
    /// [`crate::Error::BufferTooSmall`].
    ///
    #[cfg_attr(feature = "serde", serde(default = "Options::mtu"))]
    pub mtu: usize,
    ///
    /// Repeated extension id policy of the decoder.
    ///
    #[cfg_attr(feature = "serde", serde(default))]
    pub duplicate_extension: DuplicateExtension,
}

impl Options {
    fn mtu() -> usize {
        1500
    }
}

impl Default for Options {
    fn default() -> Self {
        Self {
            mtu: Self::mtu(),
            duplicate_extension: DuplicateExtension::default(),
        }
    }
}
