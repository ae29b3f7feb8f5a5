#![no_main]

use libfuzzer_sys::fuzz_target;
use rtp_codec::{Decoder, DuplicateExtension, Options};

fuzz_target!(|data: &[u8]| {
    let _ = Decoder::default().decode(data);

    let _ = Decoder::new(Options {
        duplicate_extension: DuplicateExtension::Overwrite,
        ..Default::default()
    })
    .decode(data);
});
