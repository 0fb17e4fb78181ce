use proptest::prelude::*;

use ripple_types::{PaymentId, ServerAddress, Timestamp, Username, NAME_LEN};

proptest! {
    /// Any valid name survives the NUL-padded wire encoding.
    #[test]
    fn username_padding_roundtrip(name in "[a-z0-9_.-]{0,32}") {
        let user = Username::new(name.clone()).unwrap();
        let decoded = Username::from_padded(&user.to_padded()).unwrap();
        prop_assert_eq!(decoded.as_str(), name.as_str());
    }

    /// Server addresses with explicit ports fit the same field.
    #[test]
    fn server_address_padding_roundtrip(host in "[a-z]{1,20}", port in 1u16..) {
        let raw = format!("{host}:{port}");
        prop_assume!(raw.len() <= NAME_LEN);
        let server = ServerAddress::new(raw).unwrap();
        prop_assert_eq!(ServerAddress::from_padded(&server.to_padded()).unwrap(), server);
    }

    /// Names longer than the field are always rejected.
    #[test]
    fn oversize_names_rejected(name in "[a-z]{33,64}") {
        prop_assert!(Username::new(name).is_err());
    }

    /// Names survive bincode (the storage encoding) unchanged.
    #[test]
    fn username_bincode_roundtrip(name in "[a-z]{1,32}") {
        let user = Username::new(name).unwrap();
        let encoded = bincode::serialize(&user).unwrap();
        let decoded: Username = bincode::deserialize(&encoded).unwrap();
        prop_assert_eq!(decoded, user);
    }

    #[test]
    fn payment_id_roundtrip(bytes in prop::array::uniform32(0u8..)) {
        let id = PaymentId::new(bytes);
        prop_assert_eq!(id.as_bytes(), &bytes);
    }

    #[test]
    fn timestamp_elapsed_never_negative(a in 0u64..u64::MAX / 2, b in 0u64..u64::MAX / 2) {
        let elapsed = Timestamp::new(a).elapsed_since(Timestamp::new(b));
        prop_assert_eq!(elapsed, b.saturating_sub(a));
    }
}
