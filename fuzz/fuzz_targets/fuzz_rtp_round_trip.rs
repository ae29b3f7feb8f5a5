#![no_main]

use bytes::BytesMut;
use libfuzzer_sys::fuzz_target;
use rtp_codec::{Packet, decode};

fuzz_target!(|data: &[u8]| {
    // anything the decoder accepts re-encodes within the size it came in.
    if let Ok(packet) = decode(data) {
        let mut buffer = BytesMut::with_capacity(data.len());
        packet
            .encode_into(&mut buffer, data.len())
            .expect("decoded packet must re-encode");

        assert_eq!(decode(&buffer).ok(), Some(packet));
    }

    let mut packet = Packet {
        payload: data.to_vec().into(),
        ..Default::default()
    };

    if let Some((&id, rest)) = data.split_first() {
        let size = rest.len().min(16);
        let _ = packet.add_extension(id, &rest[..size]);
        packet.padding_size = id;
    }

    if let Ok(bytes) = packet.encode(usize::MAX) {
        assert_eq!(decode(&bytes).ok(), Some(packet));
    }
});
