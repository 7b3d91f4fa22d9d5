//! Column groups of a transaction and the mask reporting which were loaded.

use std::fmt;
use std::ops::{BitOr, BitOrAssign};

/// Set of transaction column groups.
///
/// Every loaded [`Transaction`](crate::Transaction) carries the mask of the
/// groups that were actually read. Groups outside the mask hold their zero
/// value and must not be interpreted.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct ColumnMask(u8);

impl ColumnMask {
    pub const NONE: Self = Self(0);
    pub const ESSENCE: Self = Self(1 << 0);
    pub const ATTACHMENT: Self = Self(1 << 1);
    pub const CONSENSUS: Self = Self(1 << 2);
    pub const DATA: Self = Self(1 << 3);
    pub const METADATA: Self = Self(1 << 4);

    /// The immutable record: everything except metadata.
    pub const IMMUTABLE: Self = Self::ESSENCE
        .union(Self::ATTACHMENT)
        .union(Self::CONSENSUS)
        .union(Self::DATA);
    pub const ALL: Self = Self::IMMUTABLE.union(Self::METADATA);

    pub const ESSENCE_METADATA: Self = Self::ESSENCE.union(Self::METADATA);
    pub const ESSENCE_ATTACHMENT_METADATA: Self = Self::ESSENCE_METADATA.union(Self::ATTACHMENT);
    pub const ESSENCE_CONSENSUS: Self = Self::ESSENCE.union(Self::CONSENSUS);

    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    /// Whether every group of `other` is in `self`.
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// Whether `self` and `other` share at least one group.
    pub const fn intersects(self, other: Self) -> bool {
        self.0 & other.0 != 0
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub const fn bits(self) -> u8 {
        self.0
    }
}

impl BitOr for ColumnMask {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        self.union(rhs)
    }
}

impl BitOrAssign for ColumnMask {
    fn bitor_assign(&mut self, rhs: Self) {
        *self = self.union(rhs);
    }
}

impl fmt::Debug for ColumnMask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        const NAMES: [(ColumnMask, &str); 5] = [
            (ColumnMask::ESSENCE, "essence"),
            (ColumnMask::ATTACHMENT, "attachment"),
            (ColumnMask::CONSENSUS, "consensus"),
            (ColumnMask::DATA, "data"),
            (ColumnMask::METADATA, "metadata"),
        ];
        let mut set = f.debug_set();
        for (mask, name) in NAMES {
            if self.contains(mask) {
                set.entry(&name);
            }
        }
        set.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn presets_are_exact() {
        assert!(ColumnMask::ESSENCE_METADATA.contains(ColumnMask::ESSENCE));
        assert!(ColumnMask::ESSENCE_METADATA.contains(ColumnMask::METADATA));
        assert!(!ColumnMask::ESSENCE_METADATA.intersects(ColumnMask::ATTACHMENT));
        assert!(!ColumnMask::ESSENCE_CONSENSUS.intersects(ColumnMask::DATA | ColumnMask::METADATA));
        assert!(!ColumnMask::IMMUTABLE.contains(ColumnMask::METADATA));
        assert_eq!(ColumnMask::ALL.bits(), 0b1_1111);
    }

    #[test]
    fn debug_lists_groups() {
        assert_eq!(
            format!("{:?}", ColumnMask::ESSENCE_CONSENSUS),
            r#"{"essence", "consensus"}"#
        );
        assert_eq!(format!("{:?}", ColumnMask::NONE), "{}");
    }
}
