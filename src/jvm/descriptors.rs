use super::code::Opcode;
use super::{BinaryName, Error, Name};
use crate::util::Width;
use std::iter::Peekable;
use std::str::Chars;

/// Utility trait for converting descriptors to and from string representations
pub trait RenderDescriptor {
    /// Turn the descriptor into a string
    fn render(&self) -> String {
        let mut string = String::new();
        self.render_to(&mut string);
        string
    }

    /// Write the descriptor to a string
    fn render_to(&self, write_to: &mut String);
}

pub trait ParseDescriptor: Sized {
    /// Parse a descriptor from a string
    fn parse(source: &str) -> Result<Self, Error> {
        let mut chars = source.chars().peekable();
        let ret = Self::parse_from(&mut chars)?;
        match chars.next() {
            None => Ok(ret),
            Some(c) => Err(Error::MalformedDescriptor(format!(
                "Unexpected leftover input '{}' in '{}'",
                c, source
            ))),
        }
    }

    /// Read the descriptor from a character buffer
    fn parse_from(source: &mut Peekable<Chars>) -> Result<Self, Error>;
}

/// Primitive value types
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub enum BaseType {
    Byte,
    Char,
    Double,
    Float,
    Int,
    Long,
    Short,
    Boolean,
}

impl BaseType {
    /// Class which boxes values of this type (eg. `java/lang/Integer` for `int`)
    pub fn boxed_class(&self) -> BinaryName {
        match self {
            BaseType::Byte => BinaryName::BYTE,
            BaseType::Char => BinaryName::CHARACTER,
            BaseType::Double => BinaryName::DOUBLE,
            BaseType::Float => BinaryName::FLOAT,
            BaseType::Int => BinaryName::INTEGER,
            BaseType::Long => BinaryName::LONG,
            BaseType::Short => BinaryName::SHORT,
            BaseType::Boolean => BinaryName::BOOLEAN,
        }
    }

    /// Operand of the `newarray` instruction for an array of this element type
    pub fn array_type_code(&self) -> u8 {
        match self {
            BaseType::Boolean => 4,
            BaseType::Char => 5,
            BaseType::Float => 6,
            BaseType::Double => 7,
            BaseType::Byte => 8,
            BaseType::Short => 9,
            BaseType::Int => 10,
            BaseType::Long => 11,
        }
    }

    /// Values of this type live on the operand stack as `int`
    pub fn is_int_like(&self) -> bool {
        matches!(
            self,
            BaseType::Byte | BaseType::Char | BaseType::Short | BaseType::Int | BaseType::Boolean
        )
    }
}

impl Width for BaseType {
    fn width(&self) -> usize {
        match self {
            BaseType::Byte
            | BaseType::Char
            | BaseType::Float
            | BaseType::Int
            | BaseType::Short
            | BaseType::Boolean => 1,
            BaseType::Double | BaseType::Long => 2,
        }
    }
}

impl BaseType {
    const DESCRIPTOR_CHARS: [(char, BaseType); 8] = [
        ('B', BaseType::Byte),
        ('C', BaseType::Char),
        ('D', BaseType::Double),
        ('F', BaseType::Float),
        ('I', BaseType::Int),
        ('J', BaseType::Long),
        ('S', BaseType::Short),
        ('Z', BaseType::Boolean),
    ];

    fn descriptor_char(&self) -> char {
        Self::DESCRIPTOR_CHARS
            .iter()
            .find(|(_, base_type)| base_type == self)
            .map_or('?', |(c, _)| *c)
    }
}

impl RenderDescriptor for BaseType {
    fn render_to(&self, write_to: &mut String) {
        write_to.push(self.descriptor_char());
    }
}

impl ParseDescriptor for BaseType {
    fn parse_from(source: &mut Peekable<Chars>) -> Result<Self, Error> {
        let c = source.next().ok_or_else(|| {
            Error::MalformedDescriptor(String::from("Expected a primitive type, found the end"))
        })?;
        BaseType::DESCRIPTOR_CHARS
            .iter()
            .find(|(descriptor_char, _)| *descriptor_char == c)
            .map(|(_, base_type)| *base_type)
            .ok_or_else(|| Error::MalformedDescriptor(format!("'{}' is not a primitive type", c)))
    }
}

/// Reference type
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub enum RefType {
    Object(BinaryName),
    ObjectArray(ArrayType<BinaryName>),
    PrimitiveArray(ArrayType<BaseType>),
}

/// Generic array type
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub struct ArrayType<T> {
    /// Additional dimensions (`A[]` has 0 additional dimensions, `A[][][][]` has 3)
    pub additional_dimensions: usize,

    /// Underlying element type (`A` is the underlying element type of `A[][]`)
    pub element_type: T,
}

impl<T> ArrayType<T> {
    /// Total number of dimensions in the array type
    ///
    /// This is always just `additional_dimensions + 1`
    pub const fn dimensions(&self) -> usize {
        self.additional_dimensions + 1
    }
}

impl<T: RenderDescriptor> RenderDescriptor for ArrayType<T> {
    fn render_to(&self, write_to: &mut String) {
        for _ in 0..=self.additional_dimensions {
            write_to.push('[');
        }
        self.element_type.render_to(write_to);
    }
}

impl RenderDescriptor for BinaryName {
    fn render_to(&self, write_to: &mut String) {
        write_to.push('L');
        write_to.push_str(self.as_str());
        write_to.push(';');
    }
}

impl ParseDescriptor for BinaryName {
    fn parse_from(source: &mut Peekable<Chars>) -> Result<Self, Error> {
        if source.next_if_eq(&'L').is_none() {
            return Err(Error::MalformedDescriptor(String::from(
                "Object types start with 'L'",
            )));
        }
        let class_name: String = std::iter::from_fn(|| source.next_if(|c| *c != ';')).collect();
        if source.next_if_eq(&';').is_none() {
            return Err(Error::MalformedDescriptor(format!(
                "Object type 'L{}' is missing its ';'",
                class_name
            )));
        }
        BinaryName::from_string(class_name)
    }
}

impl RenderDescriptor for RefType {
    fn render_to(&self, write_to: &mut String) {
        match self {
            RefType::Object(cls) => cls.render_to(write_to),
            RefType::PrimitiveArray(arr) => arr.render_to(write_to),
            RefType::ObjectArray(arr) => arr.render_to(write_to),
        }
    }
}

impl ParseDescriptor for RefType {
    fn parse_from(source: &mut Peekable<Chars>) -> Result<Self, Error> {
        let mut dimensions = 0;
        while source.next_if_eq(&'[').is_some() {
            dimensions += 1;
        }
        if dimensions == 0 {
            return BinaryName::parse_from(source).map(RefType::Object);
        }

        let element_type = if source.peek() == Some(&'L') {
            FieldType::object(BinaryName::parse_from(source)?)
        } else {
            FieldType::Base(BaseType::parse_from(source)?)
        };
        let innermost = RefType::array(element_type);
        Ok((1..dimensions).fold(innermost, |array, _| RefType::array(FieldType::Ref(array))))
    }
}

impl RefType {
    pub const OBJECT: RefType = RefType::Object(BinaryName::OBJECT);
    pub const STRING: RefType = RefType::Object(BinaryName::STRING);
    pub const THROWABLE: RefType = RefType::Object(BinaryName::THROWABLE);

    /// Array whose elements have the given type
    pub fn array(field_type: FieldType) -> RefType {
        match field_type {
            FieldType::Base(element_type) => RefType::PrimitiveArray(ArrayType {
                additional_dimensions: 0,
                element_type,
            }),
            FieldType::Ref(RefType::Object(element_type)) => RefType::ObjectArray(ArrayType {
                additional_dimensions: 0,
                element_type,
            }),
            FieldType::Ref(RefType::PrimitiveArray(arr)) => RefType::PrimitiveArray(ArrayType {
                additional_dimensions: arr.additional_dimensions + 1,
                element_type: arr.element_type,
            }),
            FieldType::Ref(RefType::ObjectArray(arr)) => RefType::ObjectArray(ArrayType {
                additional_dimensions: arr.additional_dimensions + 1,
                element_type: arr.element_type,
            }),
        }
    }

    /// Number of array dimensions (0 for non-arrays)
    pub fn dimensions(&self) -> usize {
        match self {
            RefType::Object(_) => 0,
            RefType::ObjectArray(arr) => arr.dimensions(),
            RefType::PrimitiveArray(arr) => arr.dimensions(),
        }
    }

    /// Type of the elements, if this is an array type
    pub fn element_type(&self) -> Option<FieldType> {
        match self {
            RefType::Object(_) => None,
            RefType::ObjectArray(ArrayType {
                additional_dimensions: 0,
                element_type,
            }) => Some(FieldType::object(element_type.clone())),
            RefType::PrimitiveArray(ArrayType {
                additional_dimensions: 0,
                element_type,
            }) => Some(FieldType::Base(*element_type)),
            RefType::ObjectArray(arr) => Some(FieldType::Ref(RefType::ObjectArray(ArrayType {
                additional_dimensions: arr.additional_dimensions - 1,
                element_type: arr.element_type.clone(),
            }))),
            RefType::PrimitiveArray(arr) => {
                Some(FieldType::Ref(RefType::PrimitiveArray(ArrayType {
                    additional_dimensions: arr.additional_dimensions - 1,
                    element_type: arr.element_type,
                })))
            }
        }
    }

    /// Name used by instructions which take a class operand (`new`, `checkcast`, ...)
    ///
    /// Classes use their binary name while arrays use their full descriptor.
    pub fn internal_name(&self) -> String {
        match self {
            RefType::Object(cls) => String::from(cls.as_str()),
            _ => self.render(),
        }
    }
}

/// Type of a class, instance, or local variable
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub enum FieldType {
    Base(BaseType),
    Ref(RefType),
}

impl Width for FieldType {
    fn width(&self) -> usize {
        match self {
            FieldType::Base(base_type) => base_type.width(),
            FieldType::Ref(_) => 1,
        }
    }
}

impl FieldType {
    pub fn array(field_type: FieldType) -> FieldType {
        FieldType::Ref(RefType::array(field_type))
    }

    pub const fn object(class_name: BinaryName) -> FieldType {
        FieldType::Ref(RefType::Object(class_name))
    }

    pub const fn int() -> FieldType {
        FieldType::Base(BaseType::Int)
    }

    pub const fn long() -> FieldType {
        FieldType::Base(BaseType::Long)
    }

    pub const fn float() -> FieldType {
        FieldType::Base(BaseType::Float)
    }

    pub const fn double() -> FieldType {
        FieldType::Base(BaseType::Double)
    }

    pub const fn char() -> FieldType {
        FieldType::Base(BaseType::Char)
    }

    pub const fn short() -> FieldType {
        FieldType::Base(BaseType::Short)
    }

    pub const fn byte() -> FieldType {
        FieldType::Base(BaseType::Byte)
    }

    pub const fn boolean() -> FieldType {
        FieldType::Base(BaseType::Boolean)
    }

    pub fn is_reference(&self) -> bool {
        matches!(self, FieldType::Ref(_))
    }

    /// Select the variant of an opcode family matching this type
    ///
    /// `base` must be the `int` member of the family: `iload`, `istore`, `ireturn`, `iaload`,
    /// `iastore`, or one of the `int` arithmetic instructions. The other members of these
    /// families are laid out at fixed offsets from the `int` member. Only the array families
    /// distinguish `byte`/`boolean`, `char`, and `short`.
    pub fn opcode(&self, base: Opcode) -> Opcode {
        let array_family = base == Opcode::IALOAD || base == Opcode::IASTORE;
        let offset = match self {
            FieldType::Base(BaseType::Byte | BaseType::Boolean) if array_family => 5,
            FieldType::Base(BaseType::Char) if array_family => 6,
            FieldType::Base(BaseType::Short) if array_family => 7,
            FieldType::Base(
                BaseType::Int
                | BaseType::Byte
                | BaseType::Boolean
                | BaseType::Char
                | BaseType::Short,
            ) => 0,
            FieldType::Base(BaseType::Long) => 1,
            FieldType::Base(BaseType::Float) => 2,
            FieldType::Base(BaseType::Double) => 3,
            FieldType::Ref(_) => 4,
        };
        Opcode(base.0 + offset)
    }
}

impl RenderDescriptor for FieldType {
    fn render_to(&self, write_to: &mut String) {
        match self {
            FieldType::Base(base_type) => base_type.render_to(write_to),
            FieldType::Ref(reference_type) => reference_type.render_to(write_to),
        }
    }
}

impl ParseDescriptor for FieldType {
    fn parse_from(source: &mut Peekable<Chars>) -> Result<Self, Error> {
        match source.peek().copied() {
            None => Err(Error::MalformedDescriptor(String::from(
                "Missing field type",
            ))),
            Some('B' | 'C' | 'D' | 'F' | 'I' | 'J' | 'S' | 'Z') => {
                BaseType::parse_from(source).map(FieldType::Base)
            }
            Some('L' | '[') => RefType::parse_from(source).map(FieldType::Ref),
            Some(c) => Err(Error::MalformedDescriptor(format!(
                "Invalid field type character '{}'",
                c
            ))),
        }
    }
}

/// Signature of a method
#[derive(PartialEq, Eq, Hash, Debug, Clone)]
pub struct MethodDescriptor {
    pub parameters: Vec<FieldType>,
    pub return_type: Option<FieldType>, // `None` is for `void` (ie. no return)
}

impl MethodDescriptor {
    /// Total length of parameters (not the same as the length of the vector),
    /// which must be 255 or less for it to be valid
    pub fn parameter_length(&self, has_this_param: bool) -> usize {
        let this_len = if has_this_param { 1 } else { 0 };
        this_len + self.parameters.iter().map(Width::width).sum::<usize>()
    }

    /// Local variable slot at which the `n`-th parameter starts
    pub fn parameter_slot(&self, n: usize, has_this_param: bool) -> Option<u16> {
        if n >= self.parameters.len() {
            return None;
        }
        let this_len = if has_this_param { 1 } else { 0 };
        let before: usize = self.parameters[..n].iter().map(Width::width).sum();
        u16::try_from(this_len + before).ok()
    }
}

impl RenderDescriptor for MethodDescriptor {
    fn render_to(&self, write_to: &mut String) {
        write_to.push('(');
        for parameter in &self.parameters {
            parameter.render_to(write_to);
        }
        write_to.push(')');
        match &self.return_type {
            None => write_to.push('V'),
            Some(typ) => typ.render_to(write_to),
        };
    }
}

impl ParseDescriptor for MethodDescriptor {
    fn parse_from(source: &mut Peekable<Chars>) -> Result<Self, Error> {
        if source.next_if_eq(&'(').is_none() {
            let msg = String::from("Expected '(' for method");
            return Err(Error::MalformedDescriptor(msg));
        }

        let mut parameters = vec![];
        while !matches!(source.peek().copied(), Some(')') | None) {
            parameters.push(FieldType::parse_from(source)?);
        }

        if source.next_if_eq(&')').is_none() {
            let msg = String::from("Expected ')' for method");
            return Err(Error::MalformedDescriptor(msg));
        }

        let return_type = if source.next_if_eq(&'V').is_some() {
            None
        } else {
            Some(FieldType::parse_from(source)?)
        };

        Ok(MethodDescriptor {
            parameters,
            return_type,
        })
    }
}
