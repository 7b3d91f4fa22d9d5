//! Packed trit values: 243-trit hashes and 81-trit tags.
//!
//! The trit codec lives outside this workspace. By the time a value reaches
//! the storage engine it is already packed five trits per byte, so a 243-trit
//! hash occupies 49 bytes and an 81-trit tag (tag, obsolete tag, nonce)
//! occupies 17 bytes. The engine treats both as opaque, totally ordered keys.

use serde::de::{self, SeqAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

use crate::TypesError;

/// Bytes of a packed 243-trit hash.
pub const HASH_SIZE: usize = 49;

/// Bytes of a packed 81-trit tag.
pub const TAG_SIZE: usize = 17;

macro_rules! packed_trits {
    ($(#[$doc:meta])* $name:ident, $size:expr) => {
        $(#[$doc])*
        #[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub struct $name([u8; $size]);

        impl $name {
            pub const ZERO: Self = Self([0u8; $size]);

            pub fn new(bytes: [u8; $size]) -> Self {
                Self(bytes)
            }

            pub fn as_bytes(&self) -> &[u8; $size] {
                &self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::ZERO
            }
        }

        impl TryFrom<&[u8]> for $name {
            type Error = TypesError;

            fn try_from(bytes: &[u8]) -> Result<Self, Self::Error> {
                let arr: [u8; $size] =
                    bytes.try_into().map_err(|_| TypesError::InvalidLength {
                        kind: stringify!($name),
                        expected: $size,
                        actual: bytes.len(),
                    })?;
                Ok(Self(arr))
            }
        }

        impl AsRef<[u8]> for $name {
            fn as_ref(&self) -> &[u8] {
                &self.0
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}(", stringify!($name))?;
                for b in &self.0[..4] {
                    write!(f, "{:02x}", b)?;
                }
                write!(f, "\u{2026})")
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                for b in &self.0 {
                    write!(f, "{:02x}", b)?;
                }
                Ok(())
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_bytes(&self.0)
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                struct PackedVisitor;

                impl<'de> Visitor<'de> for PackedVisitor {
                    type Value = $name;

                    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                        write!(f, "{} packed bytes", $size)
                    }

                    fn visit_bytes<E: de::Error>(self, v: &[u8]) -> Result<$name, E> {
                        $name::try_from(v).map_err(|_| E::invalid_length(v.len(), &self))
                    }

                    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<$name, A::Error> {
                        let mut bytes = [0u8; $size];
                        for (i, slot) in bytes.iter_mut().enumerate() {
                            *slot = seq
                                .next_element()?
                                .ok_or_else(|| de::Error::invalid_length(i, &self))?;
                        }
                        Ok($name(bytes))
                    }
                }

                deserializer.deserialize_bytes(PackedVisitor)
            }
        }
    };
}

packed_trits!(
    /// A packed 243-trit hash: transaction hashes, addresses, bundles, trunk
    /// and branch references.
    Hash243,
    HASH_SIZE
);

packed_trits!(
    /// A packed 81-trit value: tag, obsolete tag and nonce.
    Tag,
    TAG_SIZE
);
