/// GATT characteristic property bits, as reported by the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct CharacteristicProperties(u8);

impl CharacteristicProperties {
    /// Value may be broadcast.
    pub const BROADCAST: Self = Self(0x01);
    /// Value may be read.
    pub const READ: Self = Self(0x02);
    /// Value may be written without a response.
    pub const WRITE_WITHOUT_RESPONSE: Self = Self(0x04);
    /// Value may be written.
    pub const WRITE: Self = Self(0x08);
    /// Peer may notify value changes.
    pub const NOTIFY: Self = Self(0x10);
    /// Peer may indicate value changes.
    pub const INDICATE: Self = Self(0x20);
    /// Value may be written with a signature.
    pub const AUTHENTICATED_SIGNED_WRITES: Self = Self(0x40);
    /// Extended properties descriptor present.
    pub const EXTENDED_PROPERTIES: Self = Self(0x80);

    /// Names in the order web content expects them.
    const NAMED: [(Self, &'static str); 8] = [
        (Self::READ, "read"),
        (Self::WRITE, "write"),
        (Self::WRITE_WITHOUT_RESPONSE, "writeWithoutResponse"),
        (Self::NOTIFY, "notify"),
        (Self::INDICATE, "indicate"),
        (Self::BROADCAST, "broadcast"),
        (Self::AUTHENTICATED_SIGNED_WRITES, "authenticatedSignedWrites"),
        (Self::EXTENDED_PROPERTIES, "extendedProperties"),
    ];

    /// Wraps raw platform bits.
    #[must_use]
    pub const fn from_bits(bits: u8) -> Self {
        Self(bits)
    }

    /// Raw bits.
    #[must_use]
    pub const fn bits(self) -> u8 {
        self.0
    }

    /// Whether every bit of `other` is set.
    #[must_use]
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// Names of the set properties.
    #[must_use]
    pub fn names(self) -> Vec<&'static str> {
        Self::NAMED
            .iter()
            .filter(|(flag, _)| self.contains(*flag))
            .map(|(_, name)| *name)
            .collect()
    }
}

impl std::ops::BitOr for CharacteristicProperties {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_follow_fixed_order() {
        let props = CharacteristicProperties::from_bits(0xff);
        assert_eq!(
            props.names(),
            [
                "read",
                "write",
                "writeWithoutResponse",
                "notify",
                "indicate",
                "broadcast",
                "authenticatedSignedWrites",
                "extendedProperties",
            ]
        );
    }

    #[test]
    fn only_set_bits_are_named() {
        let props = CharacteristicProperties::NOTIFY | CharacteristicProperties::READ;
        assert_eq!(props.names(), ["read", "notify"]);
        assert!(props.contains(CharacteristicProperties::NOTIFY));
        assert!(!props.contains(CharacteristicProperties::INDICATE));
        assert!(CharacteristicProperties::default().names().is_empty());
    }
}
