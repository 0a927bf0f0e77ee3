//! Annotation values attached to generated code
//!
//! Only the value model lives here. Producing the `RuntimeVisibleTypeAnnotations` bytes is the
//! class writer's job, and populating annotations from some host-language object goes through the
//! explicit [`AnnotationSource`] hook instead of any kind of reflection.

use super::{BinaryName, FieldType, UnqualifiedName};
use std::borrow::Cow;

/// Constant value of an annotation element
///
/// This mirrors the `element_value` structure of class files: every variant has a one-character
/// tag (see [`AnnotationValue::tag`]).
#[derive(Clone, PartialEq, Debug)]
pub enum AnnotationValue {
    String(Cow<'static, str>),
    Boolean(bool),
    Char(u16),
    Byte(i8),
    Short(i16),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    Class(Option<FieldType>), // `None` is for `void.class`
    Enum {
        type_name: BinaryName,
        constant: UnqualifiedName,
    },
    Array(Vec<AnnotationValue>),
    Annotation(Box<Annotation>),
}

impl AnnotationValue {
    /// Tag character used in the `element_value` structure
    pub fn tag(&self) -> char {
        match self {
            AnnotationValue::String(_) => 's',
            AnnotationValue::Boolean(_) => 'Z',
            AnnotationValue::Char(_) => 'C',
            AnnotationValue::Byte(_) => 'B',
            AnnotationValue::Short(_) => 'S',
            AnnotationValue::Int(_) => 'I',
            AnnotationValue::Long(_) => 'J',
            AnnotationValue::Float(_) => 'F',
            AnnotationValue::Double(_) => 'D',
            AnnotationValue::Class(_) => 'c',
            AnnotationValue::Enum { .. } => 'e',
            AnnotationValue::Array(_) => '[',
            AnnotationValue::Annotation(_) => '@',
        }
    }
}

/// Annotation instance: the annotation interface plus its explicitly set elements
#[derive(Clone, PartialEq, Debug)]
pub struct Annotation {
    pub type_name: BinaryName,
    pub elements: Vec<(UnqualifiedName, AnnotationValue)>,
}

impl Annotation {
    /// Marker annotation (no elements)
    pub fn marker(type_name: BinaryName) -> Annotation {
        Annotation {
            type_name,
            elements: vec![],
        }
    }

    /// Extract an annotation from something which knows how to describe itself as one
    pub fn from_source<S: AnnotationSource + ?Sized>(source: &S) -> Annotation {
        Annotation {
            type_name: source.annotation_type(),
            elements: source.elements(),
        }
    }

    /// Look up the value of an element
    pub fn element(&self, name: &UnqualifiedName) -> Option<&AnnotationValue> {
        self.elements
            .iter()
            .find(|(element_name, _)| element_name == name)
            .map(|(_, value)| value)
    }
}

/// Hook for the embedding application to turn its own values into annotations
///
/// Elements should be listed in declaration order, and only those which differ from their
/// defaults need to be returned.
pub trait AnnotationSource {
    /// Annotation interface being instantiated
    fn annotation_type(&self) -> BinaryName;

    /// Element name/value pairs
    fn elements(&self) -> Vec<(UnqualifiedName, AnnotationValue)>;
}

impl AnnotationSource for Annotation {
    fn annotation_type(&self) -> BinaryName {
        self.type_name.clone()
    }

    fn elements(&self) -> Vec<(UnqualifiedName, AnnotationValue)> {
        self.elements.clone()
    }
}
