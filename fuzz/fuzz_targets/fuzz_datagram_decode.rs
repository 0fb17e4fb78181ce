#![no_main]

use libfuzzer_sys::fuzz_target;
use ripple_protocol::{Datagram, DATAGRAM_LEN};

// Decoding never panics, and whatever decodes re-encodes to the same bytes.
fuzz_target!(|data: &[u8]| {
    if let Ok(datagram) = Datagram::decode(data) {
        assert_eq!(data.len(), DATAGRAM_LEN);
        assert_eq!(&datagram.encode()[..], data, "decoding must be canonical");
    }
});
