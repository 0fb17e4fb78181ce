#![no_main]

use libfuzzer_sys::fuzz_target;
use ripple_protocol::{ClientResponse, Frame};
use ripple_types::SecretKey;

// Frames and signed responses from the network never panic the parser.
fuzz_target!(|data: &[u8]| {
    if let Ok(Frame::Message { payload, .. }) = Frame::parse(data) {
        let _ = ripple_protocol::Datagram::decode(payload);
        let key = SecretKey::new(b"fuzz".to_vec());
        if let Ok(response) = ClientResponse::decode(payload, &key) {
            let _ = response.error_message();
            let _ = ripple_protocol::PaymentReport::decode(response.body());
        }
    }
});
