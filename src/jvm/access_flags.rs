use super::{Error, Serialize};
use bitflags::bitflags;
use byteorder::WriteBytesExt;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::io::Result as IoResult;
use std::marker::PhantomData;
use std::ops::{Add, BitOr};

bitflags! {
    /// Every access and property flag bit, across all kinds of elements
    ///
    /// Several bits mean different things depending on the element they are on (eg. `0x0040` is
    /// `ACC_VOLATILE` on fields but `ACC_BRIDGE` on methods), which is why the typed
    /// [`AccessFlags`] is what the rest of the crate uses.
    ///
    /// [0]: https://docs.oracle.com/javase/specs/jvms/se15/html/jvms-4.html#jvms-4.1-200-E.1
    pub struct RawAccessFlags: u16 {
        const PUBLIC = 0x0001;
        const PRIVATE = 0x0002;
        const PROTECTED = 0x0004;
        const STATIC = 0x0008;
        const FINAL = 0x0010;
        const SUPER = 0x0020;
        const SYNCHRONIZED = 0x0020;
        const OPEN = 0x0020;
        const VOLATILE = 0x0040;
        const BRIDGE = 0x0040;
        const TRANSIENT = 0x0080;
        const VARARGS = 0x0080;
        const NATIVE = 0x0100;
        const INTERFACE = 0x0200;
        const ABSTRACT = 0x0400;
        const STRICT = 0x0800;
        const SYNTHETIC = 0x1000;
        const ANNOTATION = 0x2000;
        const ENUM = 0x4000;
        const MODULE = 0x8000;
        const MANDATED = 0x8000;
    }
}

/// Kind of element that access flags can be put on
pub trait AccessKind {
    /// Human readable name of the element kind
    const NAME: &'static str;

    /// Flags which are meaningful on this kind of element
    const ALLOWED: RawAccessFlags;

    /// Names of the allowed flags, for debug output
    const FLAG_NAMES: &'static [(&'static str, u16)];
}

/// Set of access flags for one kind of element
///
/// Flags are only nameable through the kind they are valid for, so it isn't possible to
/// accidentally end up with `ACC_VOLATILE` on a method. Combining is commutative and idempotent,
/// with [`AccessFlags::NONE`] as the identity.
pub struct AccessFlags<K> {
    raw: RawAccessFlags,
    kind: PhantomData<fn() -> K>,
}

pub enum ClassKind {}
pub enum MethodKind {}
pub enum ConstructorKind {}
pub enum FieldKind {}
pub enum ParameterKind {}
pub enum ModuleKind {}

pub type ClassAccessFlags = AccessFlags<ClassKind>;
pub type MethodAccessFlags = AccessFlags<MethodKind>;
pub type ConstructorAccessFlags = AccessFlags<ConstructorKind>;
pub type FieldAccessFlags = AccessFlags<FieldKind>;
pub type ParameterAccessFlags = AccessFlags<ParameterKind>;
pub type ModuleAccessFlags = AccessFlags<ModuleKind>;

macro_rules! access_kind {
    ($kind:ident, $name:literal, [$($flag:ident),* $(,)?]) => {
        impl AccessKind for $kind {
            const NAME: &'static str = $name;
            const ALLOWED: RawAccessFlags =
                RawAccessFlags::from_bits_truncate(0 $(| RawAccessFlags::$flag.bits())*);
            const FLAG_NAMES: &'static [(&'static str, u16)] =
                &[$((stringify!($flag), RawAccessFlags::$flag.bits())),*];
        }

        impl AccessFlags<$kind> {
            $(pub const $flag: Self = Self::from_raw_unchecked(RawAccessFlags::$flag);)*
        }
    };
}

access_kind!(
    ClassKind,
    "class",
    [PUBLIC, FINAL, SUPER, INTERFACE, ABSTRACT, SYNTHETIC, ANNOTATION, ENUM, MODULE]
);
access_kind!(
    MethodKind,
    "method",
    [
        PUBLIC,
        PRIVATE,
        PROTECTED,
        STATIC,
        FINAL,
        SYNCHRONIZED,
        BRIDGE,
        VARARGS,
        NATIVE,
        ABSTRACT,
        STRICT,
        SYNTHETIC,
    ]
);
access_kind!(
    ConstructorKind,
    "constructor",
    [PUBLIC, PRIVATE, PROTECTED, VARARGS, STRICT, SYNTHETIC]
);
access_kind!(
    FieldKind,
    "field",
    [PUBLIC, PRIVATE, PROTECTED, STATIC, FINAL, VOLATILE, TRANSIENT, SYNTHETIC, ENUM]
);
access_kind!(ParameterKind, "parameter", [FINAL, SYNTHETIC, MANDATED]);
access_kind!(ModuleKind, "module", [OPEN, SYNTHETIC, MANDATED]);

impl<K> AccessFlags<K> {
    /// Empty set of flags
    pub const NONE: Self = Self::from_raw_unchecked(RawAccessFlags::empty());

    const fn from_raw_unchecked(raw: RawAccessFlags) -> Self {
        AccessFlags {
            raw,
            kind: PhantomData,
        }
    }

    pub fn bits(&self) -> u16 {
        self.raw.bits()
    }

    pub fn is_none(&self) -> bool {
        self.raw.is_empty()
    }

    /// Check whether all of `other` is set in these flags
    ///
    /// [`AccessFlags::NONE`] is never considered contained.
    pub fn contains(&self, other: Self) -> bool {
        !other.is_none() && self.raw.contains(other.raw)
    }
}

impl<K: AccessKind> AccessFlags<K> {
    /// Interpret raw bits, rejecting any bit which isn't valid for this kind of element
    pub fn from_raw(bits: u16) -> Result<Self, Error> {
        match RawAccessFlags::from_bits(bits) {
            Some(raw) if K::ALLOWED.contains(raw) => Ok(Self::from_raw_unchecked(raw)),
            _ => Err(Error::InvalidAccessFlags {
                bits,
                kind: K::NAME,
            }),
        }
    }
}

impl From<ConstructorAccessFlags> for MethodAccessFlags {
    fn from(flags: ConstructorAccessFlags) -> MethodAccessFlags {
        AccessFlags::from_raw_unchecked(flags.raw)
    }
}

impl<K> Add for AccessFlags<K> {
    type Output = Self;

    fn add(self, other: Self) -> Self {
        Self::from_raw_unchecked(self.raw | other.raw)
    }
}

impl<K> BitOr for AccessFlags<K> {
    type Output = Self;

    fn bitor(self, other: Self) -> Self {
        self + other
    }
}

impl<K> Clone for AccessFlags<K> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<K> Copy for AccessFlags<K> {}

impl<K> PartialEq for AccessFlags<K> {
    fn eq(&self, other: &Self) -> bool {
        self.raw == other.raw
    }
}

impl<K> Eq for AccessFlags<K> {}

impl<K> Hash for AccessFlags<K> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.raw.hash(state)
    }
}

impl<K> Default for AccessFlags<K> {
    fn default() -> Self {
        Self::NONE
    }
}

impl<K: AccessKind> fmt::Debug for AccessFlags<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_none() {
            return f.write_str("NONE");
        }
        let mut first = true;
        for (name, bits) in K::FLAG_NAMES {
            if self.raw.bits() & bits == *bits {
                if !first {
                    f.write_str(" | ")?;
                }
                f.write_str(name)?;
                first = false;
            }
        }
        Ok(())
    }
}

impl<K> Serialize for AccessFlags<K> {
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> IoResult<()> {
        self.bits().serialize(writer)
    }
}
