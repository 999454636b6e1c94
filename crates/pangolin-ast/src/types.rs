use std::fmt;

/// Primitive types of the contract language.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimType {
    Int32,
    Int64,
    Int128,
    Int256,
    Uint32,
    Uint64,
    Uint128,
    Uint256,
    String,
    /// 20-byte address.
    ByStr20,
    /// Block number.
    BNum,
    Msg,
    Event,
}

impl PrimType {
    /// Signed integer at any width.
    pub fn is_int(self) -> bool {
        matches!(
            self,
            PrimType::Int32 | PrimType::Int64 | PrimType::Int128 | PrimType::Int256
        )
    }

    /// Unsigned integer at any width.
    pub fn is_uint(self) -> bool {
        matches!(
            self,
            PrimType::Uint32 | PrimType::Uint64 | PrimType::Uint128 | PrimType::Uint256
        )
    }

    pub fn is_integer(self) -> bool {
        self.is_int() || self.is_uint()
    }
}

impl fmt::Display for PrimType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PrimType::Int32 => "Int32",
            PrimType::Int64 => "Int64",
            PrimType::Int128 => "Int128",
            PrimType::Int256 => "Int256",
            PrimType::Uint32 => "Uint32",
            PrimType::Uint64 => "Uint64",
            PrimType::Uint128 => "Uint128",
            PrimType::Uint256 => "Uint256",
            PrimType::String => "String",
            PrimType::ByStr20 => "ByStr20",
            PrimType::BNum => "BNum",
            PrimType::Msg => "Message",
            PrimType::Event => "Event",
        };
        write!(f, "{s}")
    }
}

/// A contract-language type, as produced by the external type checker.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SType {
    Prim(PrimType),
    /// Map from key type to value type. Nested maps nest on the value side.
    Map(Box<SType>, Box<SType>),
    /// Function type; curried functions chain on the result side.
    Fun(Box<SType>, Box<SType>),
    /// An algebraic data type applied to type arguments (`Option Int32`).
    Adt(String, Vec<SType>),
    TypeVar(String),
    Unit,
}

impl SType {
    /// Map-nesting depth of this type: the number of key lookups needed to
    /// reach a non-map value. Zero for non-map types.
    pub fn map_depth(&self) -> usize {
        match self {
            SType::Map(_, v) => 1 + v.map_depth(),
            _ => 0,
        }
    }

    /// Number of curried arrows in a function type; zero for non-functions.
    pub fn fun_arity(&self) -> usize {
        match self {
            SType::Fun(_, ret) => 1 + ret.fun_arity(),
            _ => 0,
        }
    }

    pub fn is_fun(&self) -> bool {
        matches!(self, SType::Fun(..))
    }

    /// The element type of an `Option` instantiation, if this is one.
    pub fn option_elem(&self) -> Option<&SType> {
        match self {
            SType::Adt(name, args) if name == "Option" && args.len() == 1 => Some(&args[0]),
            _ => None,
        }
    }
}

impl fmt::Display for SType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SType::Prim(p) => write!(f, "{p}"),
            SType::Map(k, v) => write!(f, "Map {k} {v}"),
            SType::Fun(a, r) => write!(f, "({a} -> {r})"),
            SType::Adt(name, args) => {
                write!(f, "{name}")?;
                for a in args {
                    write!(f, " {a}")?;
                }
                Ok(())
            }
            SType::TypeVar(v) => write!(f, "'{v}"),
            SType::Unit => write!(f, "()"),
        }
    }
}
