//! Operator enums for unary and binary nodes.

/// Binary operators.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum BinaryOp {
    Add,
    AddChecked,
    Sub,
    SubChecked,
    Mul,
    MulChecked,
    Div,
    Mod,
    Power,
    BitAnd,
    BitOr,
    BitXor,
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    /// `array[index]` on a one-dimensional array.
    ArrayIndex,
    AndAlso,
    OrElse,
    Coalesce,
}

impl BinaryOp {
    pub fn as_symbol(self) -> &'static str {
        match self {
            BinaryOp::Add | BinaryOp::AddChecked => "+",
            BinaryOp::Sub | BinaryOp::SubChecked => "-",
            BinaryOp::Mul | BinaryOp::MulChecked => "*",
            BinaryOp::Div => "/",
            BinaryOp::Mod => "%",
            BinaryOp::Power => "**",
            BinaryOp::BitAnd => "&",
            BinaryOp::BitOr => "|",
            BinaryOp::BitXor => "^",
            BinaryOp::Eq => "==",
            BinaryOp::NotEq => "!=",
            BinaryOp::Lt => "<",
            BinaryOp::LtEq => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::GtEq => ">=",
            BinaryOp::ArrayIndex => "[]",
            BinaryOp::AndAlso => "&&",
            BinaryOp::OrElse => "||",
            BinaryOp::Coalesce => "??",
        }
    }

    /// Operation name used in overflow and unsupported-operand errors.
    pub fn name(self) -> &'static str {
        match self {
            BinaryOp::Add => "add",
            BinaryOp::AddChecked => "checked add",
            BinaryOp::Sub => "subtract",
            BinaryOp::SubChecked => "checked subtract",
            BinaryOp::Mul => "multiply",
            BinaryOp::MulChecked => "checked multiply",
            BinaryOp::Div => "divide",
            BinaryOp::Mod => "modulo",
            BinaryOp::Power => "power",
            BinaryOp::BitAnd => "and",
            BinaryOp::BitOr => "or",
            BinaryOp::BitXor => "exclusive or",
            BinaryOp::Eq => "equal",
            BinaryOp::NotEq => "not equal",
            BinaryOp::Lt => "less than",
            BinaryOp::LtEq => "less than or equal",
            BinaryOp::Gt => "greater than",
            BinaryOp::GtEq => "greater than or equal",
            BinaryOp::ArrayIndex => "array index",
            BinaryOp::AndAlso => "and also",
            BinaryOp::OrElse => "or else",
            BinaryOp::Coalesce => "coalesce",
        }
    }

    /// Comparison and equality operators produce `Bool`.
    pub fn is_comparison(self) -> bool {
        matches!(
            self,
            BinaryOp::Eq
                | BinaryOp::NotEq
                | BinaryOp::Lt
                | BinaryOp::LtEq
                | BinaryOp::Gt
                | BinaryOp::GtEq
        )
    }

    /// Operators whose right operand is only evaluated on demand.
    pub fn is_short_circuit(self) -> bool {
        matches!(self, BinaryOp::AndAlso | BinaryOp::OrElse | BinaryOp::Coalesce)
    }
}

/// Unary operators. The node's static type is the conversion target for
/// `Convert`, `ConvertChecked`, `TypeAs` and `Unbox`.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum UnaryOp {
    Negate,
    NegateChecked,
    UnaryPlus,
    Not,
    Convert,
    ConvertChecked,
    TypeAs,
    Unbox,
    ArrayLength,
    Quote,
}

impl UnaryOp {
    pub fn name(self) -> &'static str {
        match self {
            UnaryOp::Negate => "negate",
            UnaryOp::NegateChecked => "checked negate",
            UnaryOp::UnaryPlus => "unary plus",
            UnaryOp::Not => "not",
            UnaryOp::Convert => "convert",
            UnaryOp::ConvertChecked => "checked convert",
            UnaryOp::TypeAs => "type as",
            UnaryOp::Unbox => "unbox",
            UnaryOp::ArrayLength => "array length",
            UnaryOp::Quote => "quote",
        }
    }
}
