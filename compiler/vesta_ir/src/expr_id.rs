//! Index types into an [`ExprArena`](crate::ExprArena).
//!
//! # Flatten Everything
//!
//! Nodes never own their children. A child is a 32-bit `ExprId`, a child
//! list is an `(start, len)` range into a side table of the arena. Every id
//! type here is `Copy`, so node kinds are `Copy` too and the evaluator can
//! read a node without holding a borrow of the arena.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Expression node identity within one arena.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[repr(transparent)]
pub struct ExprId(u32);

impl ExprId {
    /// Sentinel for "no expression".
    pub const INVALID: ExprId = ExprId(u32::MAX);

    #[inline]
    pub const fn new(index: u32) -> Self {
        ExprId(index)
    }

    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }

    #[inline]
    pub const fn raw(self) -> u32 {
        self.0
    }

    #[inline]
    pub const fn is_valid(self) -> bool {
        self.0 != u32::MAX
    }
}

impl fmt::Debug for ExprId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_valid() {
            write!(f, "ExprId({})", self.0)
        } else {
            write!(f, "ExprId::INVALID")
        }
    }
}

macro_rules! define_range {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Default)]
        pub struct $name {
            pub start: u32,
            pub len: u32,
        }

        impl $name {
            pub const EMPTY: $name = $name { start: 0, len: 0 };

            #[inline]
            pub const fn new(start: u32, len: u32) -> Self {
                $name { start, len }
            }

            #[inline]
            pub const fn is_empty(self) -> bool {
                self.len == 0
            }

            #[inline]
            pub const fn len(self) -> usize {
                self.len as usize
            }

            #[inline]
            pub(crate) fn as_range(self) -> std::ops::Range<usize> {
                let start = self.start as usize;
                start..start + self.len as usize
            }
        }
    };
}

define_range!(
    /// A list of expression ids (arguments, block statements, variables).
    ExprRange
);
define_range!(
    /// A list of catch blocks of a try node.
    CatchRange
);
define_range!(
    /// A list of cases of a switch node.
    CaseRange
);

/// A jump target. Labels are shared by the `Label`/`Loop`/`Switch` node that
/// defines them and every `Goto` that targets them.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
#[repr(transparent)]
pub struct LabelId(u32);

impl LabelId {
    #[inline]
    pub const fn new(index: u32) -> Self {
        LabelId(index)
    }

    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

/// Index of a late binder in a script's binder table.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
#[repr(transparent)]
pub struct BinderId(u32);

impl BinderId {
    #[inline]
    pub const fn new(index: u32) -> Self {
        BinderId(index)
    }

    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

/// Process-unique identity of an arena.
///
/// Node identity is only meaningful within one arena; caches keyed by node
/// pair the `ExprId` with the arena's id.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub struct ArenaId(u64);

impl ArenaId {
    pub(crate) fn fresh() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        ArenaId(NEXT.fetch_add(1, Ordering::Relaxed))
    }

    #[inline]
    pub const fn raw(self) -> u64 {
        self.0
    }
}
