use std::sync::Once;

use anyhow::Result;
use bytes::Bytes;
use rand::Rng;
use rtp_codec::{Error, Extension, Extensions, Packet, add_extension, decode, encode};

#[rustfmt::skip]
mod samples {
    /// no csrc, no extension, no padding.
    pub const MINIMAL: &[u8] = &[
        0x80, 0x60, 0x00, 0x01, 0x00, 0x00, 0x00, 0x0A, 0x00, 0x00, 0x00, 0x01,
    ];

    /// marker, two csrc, one-byte header extension with a terminator,
    /// 3 payload octets and 4 padding octets.
    pub const FULL: &[u8] = &[
        0xB2, 0xE4, 0x12, 0x34, 0x00, 0x01, 0x00, 0x02, 0xca, 0xfe, 0xba, 0xbe,
        0x00, 0x00, 0x00, 0x0a, 0x00, 0x00, 0x00, 0x0b,
        0xbe, 0xde, 0x00, 0x02, 0x10, 0x7f, 0x21, 0x01, 0x02, 0xf0, 0x00, 0x00,
        0x01, 0x02, 0x03,
        0x00, 0x00, 0x00, 0x04,
    ];
}

fn init_logger() {
    static INIT: Once = Once::new();

    INIT.call_once(|| {
        let _ = simple_logger::init_with_level(log::Level::Trace);
    });
}

fn base_packet() -> Packet {
    Packet {
        marker: false,
        payload_type: 111,
        sequence_number: 0xfffe,
        timestamp: 0xdeadbeef,
        ssrc: 0x01020304,
        payload: Bytes::from_static(&[0x11, 0x22, 0x33, 0x44, 0x55]),
        ..Default::default()
    }
}

fn round_trip(packet: &Packet) -> Result<Packet> {
    let bytes = encode(packet, 1500)?;
    assert_eq!(bytes.len(), packet.encoded_len());
    Ok(decode(&bytes)?)
}

#[test]
fn decode_minimal_packet() -> Result<()> {
    init_logger();

    let packet = decode(samples::MINIMAL)?;

    assert_eq!(packet.version(), 2);
    assert!(!packet.padding());
    assert!(!packet.has_extension());
    assert_eq!(packet.csrc_count(), 0);
    assert!(!packet.marker);
    assert_eq!(packet.payload_type, 0x60);
    assert_eq!(packet.sequence_number, 1);
    assert_eq!(packet.timestamp, 10);
    assert_eq!(packet.ssrc, 1);
    assert!(packet.payload.is_empty());

    assert_eq!(&encode(&packet, 1500)?[..], samples::MINIMAL);

    Ok(())
}

#[test]
fn decode_full_packet() -> Result<()> {
    init_logger();

    let packet = decode(samples::FULL)?;

    assert!(packet.marker);
    assert_eq!(packet.payload_type, 100);
    assert_eq!(packet.sequence_number, 0x1234);
    assert_eq!(packet.timestamp, 0x00010002);
    assert_eq!(packet.ssrc, 0xcafebabe);
    assert_eq!(packet.csrc, vec![0x0a, 0x0b]);
    assert_eq!(packet.extension_profile(), 0xBEDE);
    assert_eq!(packet.extensions.len(), 2);
    assert_eq!(packet.extensions.get(1), Some(&[0x7f][..]));
    assert_eq!(packet.extensions.get(2), Some(&[0x01, 0x02][..]));
    assert_eq!(packet.padding_size, 4);
    assert_eq!(&packet.payload[..], &[0x01, 0x02, 0x03]);

    // the terminator is not kept, the block is rewritten with zero padding.
    let bytes = encode(&packet, 1500)?;
    assert_eq!(bytes.len(), samples::FULL.len());
    assert_eq!(&bytes[..29], &samples::FULL[..29]);
    assert_eq!(bytes[29], 0x00);
    assert_eq!(&bytes[30..], &samples::FULL[30..]);

    Ok(())
}

#[test]
fn round_trip_without_csrc_or_extension() -> Result<()> {
    let packet = base_packet();
    assert_eq!(round_trip(&packet)?, packet);

    Ok(())
}

#[test]
fn round_trip_with_csrc() -> Result<()> {
    let packet = Packet {
        csrc: vec![1, 0x7fffffff, u32::MAX],
        ..base_packet()
    };

    let decoded = round_trip(&packet)?;
    assert_eq!(decoded.csrc_count(), 3);
    assert_eq!(decoded, packet);

    Ok(())
}

#[test]
fn round_trip_with_single_byte_extension() -> Result<()> {
    let mut packet = base_packet();
    add_extension(&mut packet, 7, &[0x42])?;

    let bytes = encode(&packet, 1500)?;
    assert_eq!(&bytes[12..20], &[0xbe, 0xde, 0x00, 0x01, 0x70, 0x42, 0x00, 0x00]);
    assert_eq!(decode(&bytes)?, packet);

    Ok(())
}

#[test]
fn round_trip_with_intra_block_padding() -> Result<()> {
    let mut packet = base_packet();
    add_extension(&mut packet, 3, &[0x01, 0x02, 0x03, 0x04])?;
    add_extension(&mut packet, 1, &[0x05])?;
    add_extension(&mut packet, 2, &[0x06, 0x07])?;

    // 5 + 2 + 3 element bytes, three words with two octets of padding.
    assert_eq!(packet.extensions.byte_len(), 10);

    let bytes = encode(&packet, 1500)?;
    assert_eq!(&bytes[14..16], &[0x00, 0x03]);
    assert_eq!(&bytes[26..28], &[0x00, 0x00]);

    let decoded = decode(&bytes)?;
    assert_eq!(decoded, packet);

    let ids = decoded.extensions.iter().map(|it| it.id).collect::<Vec<_>>();
    assert_eq!(ids, vec![3, 1, 2]);

    Ok(())
}

#[test]
fn round_trip_with_padding_trailer() -> Result<()> {
    for padding_size in [1u8, 4, 255] {
        let packet = Packet {
            padding_size,
            ..base_packet()
        };

        let bytes = encode(&packet, 1500)?;
        assert_eq!(bytes[0] & 0x20, 0x20);
        assert_eq!(bytes[bytes.len() - 1], padding_size);
        assert_eq!(round_trip(&packet)?, packet);
    }

    Ok(())
}

#[test]
fn padding_trailer_layout() -> Result<()> {
    let packet = Packet {
        padding_size: 4,
        ..base_packet()
    };

    let bytes = encode(&packet, 1500)?;
    assert_eq!(&bytes[bytes.len() - 4..], &[0x00, 0x00, 0x00, 0x04]);

    Ok(())
}

#[test]
fn rejects_other_versions() {
    init_logger();

    for version in [0u8, 1, 3] {
        let mut bytes = samples::FULL.to_vec();
        bytes[0] = (bytes[0] & 0x3f) | (version << 6);

        assert_eq!(decode(&bytes), Err(Error::UnsupportedVersion(version)));
    }
}

#[test]
fn rejects_other_extension_profiles() {
    init_logger();

    for profile in [0x0000u16, 0x1000, 0xBEDF, 0xffff] {
        let mut bytes = samples::FULL.to_vec();
        bytes[20..22].copy_from_slice(&profile.to_be_bytes());

        assert_eq!(decode(&bytes), Err(Error::UnsupportedExtensionProfile(profile)));
    }
}

#[test]
fn truncation_never_overreads() {
    init_logger();

    // 12 header + 8 csrc + 12 extension block.
    let payload_start = 32;

    for size in 0..samples::FULL.len() {
        let result = decode(&samples::FULL[..size]);

        if size < payload_start {
            assert!(
                matches!(result, Err(Error::Truncated) | Err(Error::Malformed)),
                "size={} result={:?}",
                size,
                result
            );
        }
    }
}

#[test]
fn extension_length_field_bounds() -> Result<()> {
    let mut bytes = samples::MINIMAL.to_vec();
    bytes[0] |= 0x10;
    bytes.extend_from_slice(&[0xbe, 0xde, 0x00, 0x05, 0x1f]);
    bytes.extend_from_slice(&[0xab; 16]);
    bytes.extend_from_slice(&[0x20, 0xcd, 0x00]);

    let packet = decode(&bytes)?;
    assert_eq!(packet.extensions.get(1).map(|it| it.len()), Some(16));
    assert_eq!(packet.extensions.get(2).map(|it| it.len()), Some(1));

    let mut packet = base_packet();
    packet.extensions.push(Extension::new(1, &[0u8; 17]));
    assert_eq!(encode(&packet, 1500), Err(Error::InvalidElementLength(17)));

    Ok(())
}

#[test]
fn duplicate_extension_ids() -> Result<()> {
    init_logger();

    let mut bytes = samples::MINIMAL.to_vec();
    bytes[0] |= 0x10;
    bytes.extend_from_slice(&[0xbe, 0xde, 0x00, 0x01, 0x40, 0x01, 0x40, 0x02]);
    assert_eq!(decode(&bytes), Err(Error::Malformed));

    let mut packet = base_packet();
    add_extension(&mut packet, 4, &[0x01])?;
    add_extension(&mut packet, 4, &[0x02, 0x03])?;

    assert_eq!(packet.extensions.len(), 1);
    assert_eq!(packet.extensions.get(4), Some(&[0x01][..]));
    assert_eq!(packet.extensions.byte_len(), 2);

    Ok(())
}

#[test]
fn add_extension_arguments() {
    let mut packet = base_packet();

    assert_eq!(add_extension(&mut packet, 0, &[0x01]), Err(Error::InvalidArgument));
    assert_eq!(add_extension(&mut packet, 15, &[0x01]), Err(Error::InvalidArgument));
    assert_eq!(add_extension(&mut packet, 1, &[]), Err(Error::InvalidArgument));
    assert_eq!(add_extension(&mut packet, 1, &[0u8; 17]), Err(Error::InvalidArgument));
    assert!(packet.extensions.is_empty());
}

#[test]
fn encode_limits() {
    let packet = Packet {
        csrc: vec![0; 16],
        ..base_packet()
    };
    assert_eq!(encode(&packet, 1500), Err(Error::TooManyCsrc(16)));

    let packet = Packet {
        extensions: Extensions::from(
            (1..=15u8)
                .map(|id| Extension::new(id, &[id]))
                .collect::<Vec<_>>(),
        ),
        ..base_packet()
    };
    assert_eq!(encode(&packet, 1500), Err(Error::TooManyExtensionElements(15)));

    let packet = base_packet();
    assert_eq!(encode(&packet, packet.encoded_len() - 1), Err(Error::BufferTooSmall));
}

#[test]
fn random_input_never_panics() {
    let mut rng = rand::rng();
    let mut buffer = [0u8; 128];

    for _ in 0..10_000 {
        let size = rng.random_range(0..buffer.len());
        rng.fill(&mut buffer[..size]);

        // force the version so the parser goes past the first check.
        if size > 0 && rng.random_bool(0.9) {
            buffer[0] = (buffer[0] & 0x3f) | 0x80;
        }

        if let Ok(packet) = decode(&buffer[..size]) {
            assert!(packet.encoded_len() <= size);
            assert!(packet.csrc_count() <= 15);
            assert!(packet.extensions.len() <= 14);
        }
    }
}
