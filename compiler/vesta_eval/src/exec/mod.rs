//! Execution support beyond the tree walk itself.

pub(crate) mod dynamic;
