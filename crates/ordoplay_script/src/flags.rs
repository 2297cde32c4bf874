// SPDX-License-Identifier: MIT OR Apache-2.0
//! Bit-flag sets for nodes, pins and graphs.

use serde::{Deserialize, Serialize};
use std::ops::{BitAnd, BitOr, BitOrAssign};

macro_rules! flag_set {
    (
        $(#[$meta:meta])*
        $name:ident {
            $( $(#[$flag_meta:meta])* $flag:ident = $bit:expr; )*
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(u32);

        impl $name {
            $( $(#[$flag_meta])* pub const $flag: Self = Self($bit); )*

            /// The empty set
            pub const fn empty() -> Self {
                Self(0)
            }

            /// Build a set from raw bits, keeping unknown bits
            pub const fn from_bits_retain(bits: u32) -> Self {
                Self(bits)
            }

            /// The raw bits
            pub const fn bits(&self) -> u32 {
                self.0
            }

            /// Whether no flag is set
            pub const fn is_empty(&self) -> bool {
                self.0 == 0
            }

            /// Whether every flag in `other` is set
            pub const fn contains(&self, other: Self) -> bool {
                self.0 & other.0 == other.0
            }

            /// Whether any flag in `other` is set
            pub const fn intersects(&self, other: Self) -> bool {
                self.0 & other.0 != 0
            }

            /// Set the flags in `other`
            pub fn insert(&mut self, other: Self) {
                self.0 |= other.0;
            }

            /// Clear the flags in `other`
            pub fn remove(&mut self, other: Self) {
                self.0 &= !other.0;
            }

            /// Set or clear the flags in `other`
            pub fn set(&mut self, other: Self, value: bool) {
                if value {
                    self.insert(other);
                } else {
                    self.remove(other);
                }
            }
        }

        impl BitOr for $name {
            type Output = Self;

            fn bitor(self, rhs: Self) -> Self {
                Self(self.0 | rhs.0)
            }
        }

        impl BitOrAssign for $name {
            fn bitor_assign(&mut self, rhs: Self) {
                self.0 |= rhs.0;
            }
        }

        impl BitAnd for $name {
            type Output = Self;

            fn bitand(self, rhs: Self) -> Self {
                Self(self.0 & rhs.0)
            }
        }
    };
}

flag_set! {
    /// Catalog and presentation flags of a script node.
    NodeFlags {
        /// Node should appear in the action catalog
        CATALOGABLE = 1 << 1;
        /// Node is marked in the UI as development only
        DEVELOPMENT_ONLY = 1 << 2;
        /// Node is experimental and may change
        EXPERIMENTAL = 1 << 3;
    }
}

flag_set! {
    /// Behavior and capability flags of a pin.
    PinFlags {
        /// Pin carries a data value
        DATA = 1 << 0;
        /// Pin transfers control flow only
        EXECUTION = 1 << 1;
        /// Pin's default value is not editable
        IGNORE_DEFAULT = 1 << 2;
        /// Pin is read-only
        READ_ONLY = 1 << 3;
        /// Pin is not rendered
        HIDDEN = 1 << 4;
        /// Pin label is always rendered
        SHOW_LABEL = 1 << 5;
        /// Pin label is never rendered
        HIDE_LABEL = 1 << 6;
        /// Pin label is rendered as-is
        NO_CAPITALIZE = 1 << 7;
        /// Pin carries an object reference
        OBJECT = 1 << 8;
        /// Pin default value is edited as multi-line text
        MULTILINE = 1 << 9;
    }
}

flag_set! {
    /// Kind and editing flags of a graph.
    GraphFlags {
        /// Graph hosts event entry points
        EVENT = 1 << 0;
        /// Graph is a function body
        FUNCTION = 1 << 1;
        /// Graph can be edited
        EDITABLE = 1 << 2;
        /// Graph can be renamed
        RENAMABLE = 1 << 3;
        /// Graph can be deleted
        DELETABLE = 1 << 4;
    }
}
