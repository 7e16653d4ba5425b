//! The type system.
//!
//! Primitive types are small, `Copy`, cheaply-compared values; a handful of
//! derived shapes (`Ptr`, `Array`, `Struct`, `Func`) that need more than a
//! tag and a size are boxed once and shared via `Arc` so `Type` itself stays
//! a thin, `Clone`-cheap handle no matter how large the struct it names is.
//! This mirrors the source's "payload size shouldn't blow up the per-node
//! footprint" design note: the common scalar case is
//! inline, the rare large-aggregate case is one indirection away.

use crate::error::{Error, Result};
use std::fmt;
use std::sync::Arc;

/// A field of a [`TypeKind::Struct`], with its offset already computed by
/// [`Type::struct_`].
#[derive(Debug, Clone, PartialEq)]
pub struct StructField {
    /// The field's type.
    pub ty: Type,
    /// Byte offset of this field from the start of the struct.
    pub offset: u32,
}

/// The shape of a [`Type`].
#[derive(Debug, Clone, PartialEq)]
pub enum TypeKind {
    /// The empty type; only valid as a function return type.
    Void,
    /// Signed integers.
    I8,
    I16,
    I32,
    I64,
    /// Unsigned integers.
    U8,
    U16,
    U32,
    U64,
    /// IEEE-754 single precision (or, on HFP-only mainframe targets, the
    /// backend's short hexadecimal float).
    F32,
    /// IEEE-754 double precision (or the backend's long hexadecimal float).
    F64,
    /// A pointer to `pointee`. Its size is the current target's pointer
    /// size, populated when the owning [`crate::Context`] selects a target.
    Ptr(Arc<Type>),
    /// A fixed-length array of `elem`.
    Array { elem: Arc<Type>, count: u32 },
    /// A structure with fields laid out by [`Type::struct_`].
    Struct {
        name: Option<String>,
        fields: Arc<[StructField]>,
        packed: bool,
    },
    /// A function signature: not sized, only used to type `Func` values and
    /// `CALL` instructions.
    Func {
        ret: Arc<Type>,
        params: Arc<[Type]>,
        variadic: bool,
    },
}

/// A type in the IR's type system.
///
/// Primitive types are interned per [`crate::Context`] (obtained through its
/// `i32()`/`f64()`/... constructors) so two calls for the same primitive
/// compare `==` and are cheap to clone; derived types (`ptr`, `array`,
/// `struct_`, `func`) are plain values built directly by their constructor
/// and are just as cheap to clone thanks to the `Arc` indirection above.
#[derive(Debug, Clone, PartialEq)]
pub struct Type {
    kind: TypeKind,
    size: u32,
    align: u32,
}

impl Type {
    /// The type's shape.
    pub fn kind(&self) -> &TypeKind {
        &self.kind
    }

    /// Size in bytes. Zero for `Void` and `Func`.
    pub fn size(&self) -> u32 {
        self.size
    }

    /// Natural alignment in bytes. One for `Void` and `Func`.
    pub fn align(&self) -> u32 {
        self.align
    }

    /// Is this an integer type (signed or unsigned)?
    pub fn is_int(&self) -> bool {
        matches!(
            self.kind,
            TypeKind::I8
                | TypeKind::I16
                | TypeKind::I32
                | TypeKind::I64
                | TypeKind::U8
                | TypeKind::U16
                | TypeKind::U32
                | TypeKind::U64
        )
    }

    /// Is this a signed integer type?
    pub fn is_signed_int(&self) -> bool {
        matches!(self.kind, TypeKind::I8 | TypeKind::I16 | TypeKind::I32 | TypeKind::I64)
    }

    /// Is this a floating-point type?
    pub fn is_float(&self) -> bool {
        matches!(self.kind, TypeKind::F32 | TypeKind::F64)
    }

    /// Is this a pointer type?
    pub fn is_ptr(&self) -> bool {
        matches!(self.kind, TypeKind::Ptr(_))
    }

    /// Is this an aggregate (struct or array) type?
    pub fn is_aggregate(&self) -> bool {
        matches!(self.kind, TypeKind::Struct { .. } | TypeKind::Array { .. })
    }

    /// The pointee, if this is a pointer type.
    pub fn pointee(&self) -> Option<&Type> {
        match &self.kind {
            TypeKind::Ptr(p) => Some(p),
            _ => None,
        }
    }

    pub(crate) fn void() -> Self {
        Type { kind: TypeKind::Void, size: 0, align: 1 }
    }

    pub(crate) fn primitive(kind: TypeKind, size: u32) -> Self {
        Type { kind, size, align: size.max(1) }
    }

    /// A pointer to `pointee`, sized per `ptr_size` (the current target's
    /// pointer size).
    pub fn ptr(pointee: Type, ptr_size: u32) -> Self {
        Type {
            kind: TypeKind::Ptr(Arc::new(pointee)),
            size: ptr_size,
            align: ptr_size,
        }
    }

    /// A fixed-length array of `count` elements of `elem`.
    pub fn array(elem: Type, count: u32) -> Result<Self> {
        if count == 0 {
            return Err(Error::invalid_argument("array type must have a non-zero element count"));
        }
        let align = elem.align;
        let size = elem
            .size
            .checked_mul(count)
            .ok_or_else(|| Error::invalid_argument("array type size overflows u32"))?;
        Ok(Type { kind: TypeKind::Array { elem: Arc::new(elem), count }, size, align })
    }

    /// A struct with the given ordered fields, laid out by rounding each
    /// field's offset up to its own alignment (the C layout algorithm);
    /// the struct's size is padded up to its own alignment (the maximum
    /// field alignment), and its alignment is that maximum.
    ///
    /// `packed` structs skip the rounding (offsets are simply cumulative)
    /// but this port never selects it implicitly, matching "packed structs
    /// are representable but off by default" in the design.
    pub fn struct_(name: Option<String>, field_types: &[Type], packed: bool) -> Result<Self> {
        let mut offset: u32 = 0;
        let mut max_align: u32 = 1;
        let mut fields = Vec::with_capacity(field_types.len());
        for ty in field_types {
            let field_align = if packed { 1 } else { ty.align };
            offset = round_up(offset, field_align);
            fields.push(StructField { ty: ty.clone(), offset });
            offset = offset
                .checked_add(ty.size)
                .ok_or_else(|| Error::invalid_argument("struct type size overflows u32"))?;
            max_align = max_align.max(field_align);
        }
        let size = if packed { offset } else { round_up(offset, max_align) };
        Ok(Type {
            kind: TypeKind::Struct { name, fields: fields.into(), packed },
            size,
            align: if packed { 1 } else { max_align },
        })
    }

    /// A function type: `params -> ret`, optionally variadic.
    ///
    /// `variadic` is observable at call-lowering time: some targets (x86-64
    /// System V, the mainframe family) require a different argument
    /// convention for variadic calls.
    pub fn func(ret: Type, params: &[Type], variadic: bool) -> Self {
        Type {
            kind: TypeKind::Func {
                ret: Arc::new(ret),
                params: params.to_vec().into(),
                variadic,
            },
            size: 0,
            align: 1,
        }
    }

    /// The field list of a struct type, or an empty slice otherwise.
    pub fn fields(&self) -> &[StructField] {
        match &self.kind {
            TypeKind::Struct { fields, .. } => fields,
            _ => &[],
        }
    }

    /// Look up a field by index, per the precomputed layout from
    /// [`Type::struct_`]. Returns [`Error::InvalidArgument`] if `index` is
    /// out of range or `self` is not a struct, matching
    /// "out-of-range field index is a construction error" for `STRUCT_GEP`.
    pub fn field(&self, index: u32) -> Result<&StructField> {
        self.fields()
            .get(index as usize)
            .ok_or_else(|| Error::invalid_argument(format!("struct field index {index} out of range")))
    }

    /// The parameter types, return type and variadic flag of a function
    /// type. Panics (a construction-time bug) if `self` is not `Func`.
    pub fn func_parts(&self) -> (&[Type], &Type, bool) {
        match &self.kind {
            TypeKind::Func { ret, params, variadic } => (params, ret, *variadic),
            _ => panic!("func_parts called on a non-function type"),
        }
    }
}

fn round_up(offset: u32, align: u32) -> u32 {
    debug_assert!(align.is_power_of_two());
    (offset + align - 1) & !(align - 1)
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match &self.kind {
            TypeKind::Void => write!(f, "void"),
            TypeKind::I8 => write!(f, "i8"),
            TypeKind::I16 => write!(f, "i16"),
            TypeKind::I32 => write!(f, "i32"),
            TypeKind::I64 => write!(f, "i64"),
            TypeKind::U8 => write!(f, "u8"),
            TypeKind::U16 => write!(f, "u16"),
            TypeKind::U32 => write!(f, "u32"),
            TypeKind::U64 => write!(f, "u64"),
            TypeKind::F32 => write!(f, "f32"),
            TypeKind::F64 => write!(f, "f64"),
            TypeKind::Ptr(p) => write!(f, "{p}*"),
            TypeKind::Array { elem, count } => write!(f, "[{elem} x {count}]"),
            TypeKind::Struct { name, .. } => match name {
                Some(n) => write!(f, "%{n}"),
                None => write!(f, "%anon"),
            },
            TypeKind::Func { ret, params, variadic } => {
                write!(f, "(")?;
                for (i, p) in params.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{p}")?;
                }
                if *variadic {
                    write!(f, "{}...", if params.is_empty() { "" } else { ", " })?;
                }
                write!(f, ") -> {ret}")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn i32_() -> Type {
        Type::primitive(TypeKind::I32, 4)
    }

    fn i8_() -> Type {
        Type::primitive(TypeKind::I8, 1)
    }

    fn i64_() -> Type {
        Type::primitive(TypeKind::I64, 8)
    }

    #[test]
    fn struct_layout_rounds_up_to_field_alignment() {
        // { i8, i32, i8, i64 } on a target with natural alignment.
        let s = Type::struct_(None, &[i8_(), i32_(), i8_(), i64_()], false).unwrap();
        let offsets: Vec<u32> = s.fields().iter().map(|f| f.offset).collect();
        assert_eq!(offsets, vec![0, 4, 8, 16]);
        assert_eq!(s.size(), 24);
        assert_eq!(s.align(), 8);
    }

    #[test]
    fn packed_struct_has_no_padding() {
        let s = Type::struct_(None, &[i8_(), i32_()], true).unwrap();
        let offsets: Vec<u32> = s.fields().iter().map(|f| f.offset).collect();
        assert_eq!(offsets, vec![0, 1]);
        assert_eq!(s.size(), 5);
        assert_eq!(s.align(), 1);
    }

    #[test]
    fn struct_field_out_of_range_is_an_error() {
        let s = Type::struct_(None, &[i32_()], false).unwrap();
        assert!(s.field(1).is_err());
    }

    #[test]
    fn array_size_is_elem_size_times_count() {
        let a = Type::array(i32_(), 10).unwrap();
        assert_eq!(a.size(), 40);
        assert_eq!(a.align(), 4);
    }

    #[test]
    fn ptr_size_tracks_target_pointer_size() {
        let p32 = Type::ptr(i32_(), 4);
        let p64 = Type::ptr(i32_(), 8);
        assert_eq!(p32.size(), 4);
        assert_eq!(p64.size(), 8);
    }
}
