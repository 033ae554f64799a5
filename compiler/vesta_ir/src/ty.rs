//! Static result types of expression nodes.

use crate::Name;

/// Static type of an expression node.
///
/// Primitive variants mirror the host runtime's primitive types one to one;
/// `Named` refers to a host type by its registered name.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Default)]
pub enum ExprType {
    Void,
    #[default]
    Object,
    Bool,
    I8,
    U8,
    I16,
    U16,
    I32,
    U32,
    I64,
    U64,
    F32,
    F64,
    Char,
    Str,
    Array,
    Named(Name),
}

impl ExprType {
    #[inline]
    pub fn is_void(self) -> bool {
        matches!(self, ExprType::Void)
    }

    pub fn is_integer(self) -> bool {
        matches!(
            self,
            ExprType::I8
                | ExprType::U8
                | ExprType::I16
                | ExprType::U16
                | ExprType::I32
                | ExprType::U32
                | ExprType::I64
                | ExprType::U64
        )
    }

    pub fn is_numeric(self) -> bool {
        self.is_integer() || matches!(self, ExprType::F32 | ExprType::F64)
    }

    /// Host name of a primitive type, `None` for `Named`.
    pub fn primitive_name(self) -> Option<&'static str> {
        Some(match self {
            ExprType::Void => "Void",
            ExprType::Object => "Object",
            ExprType::Bool => "Boolean",
            ExprType::I8 => "SByte",
            ExprType::U8 => "Byte",
            ExprType::I16 => "Int16",
            ExprType::U16 => "UInt16",
            ExprType::I32 => "Int32",
            ExprType::U32 => "UInt32",
            ExprType::I64 => "Int64",
            ExprType::U64 => "UInt64",
            ExprType::F32 => "Single",
            ExprType::F64 => "Double",
            ExprType::Char => "Char",
            ExprType::Str => "String",
            ExprType::Array => "Array",
            ExprType::Named(_) => return None,
        })
    }
}
