use super::code::{Label, Opcode, OrdComparison};
use super::{BinaryName, FieldType};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// A label can only be placed once (indicates a bug)
    #[error("Label {0:?} is already bound")]
    DuplicateLabelBinding(Label),

    /// The label was generated by some other method's label arena
    #[error("Label {0:?} does not belong to this method")]
    ForeignLabel(Label),

    /// Labels were referenced but never placed by the time the method body was built
    #[error("Labels {0:?} are referenced but never bound")]
    UnboundLabels(Vec<Label>),

    /// Label marks must go through `bind_label` so the label state gets updated
    #[error("Raw label mark for {0:?} (use `bind_label`)")]
    UnregisteredLabelMark(Label),

    /// The stream was already closed (so it can't be appended to or closed again)
    #[error("Instruction stream ending at {0:?} is closed")]
    StreamClosed(Label),

    /// Only closed streams can be spliced or turned into chunks
    #[error("Instruction stream ending at {0:?} is still open")]
    StreamNotClosed(Label),

    /// The method body was built while nested blocks were still being generated
    #[error("{0} nested block(s) are still open")]
    UnclosedBlocks(usize),

    #[error("Lookup switch keys are not strictly ascending: {0:?}")]
    UnsortedSwitchKeys(Vec<i32>),

    #[error("Table switch starting at {min} with {count} entries does not fit in a method")]
    InvalidSwitchRange { min: i32, count: usize },

    #[error("Switch case {0} appears more than once")]
    DuplicateSwitchCase(i32),

    #[error("Try block generated no instructions")]
    EmptyTryBody,

    #[error("Exception {0:?} is caught more than once by the same try block")]
    DuplicateCaughtException(Option<BinaryName>),

    #[error("Multi-catch clause without any exception types")]
    EmptyCatchTypes,

    #[error("Array size {0} is negative")]
    NegativeArraySize(i32),

    #[error("Cannot allocate {dimensions} dimension(s) of array type {descriptor}")]
    InvalidArrayDimensions { descriptor: String, dimensions: u8 },

    #[error("No conversion from {from:?} to {to:?}")]
    IncompatibleConversion { from: FieldType, to: FieldType },

    #[error("Operands of type {operand:?} cannot be compared with {comparison:?}")]
    UnsupportedComparison {
        operand: FieldType,
        comparison: OrdComparison,
    },

    #[error("{opcode:?} does not accept operands of type {operand:?}")]
    UnsupportedOperand { opcode: Opcode, operand: FieldType },

    #[error("Access flags {bits:#06x} are not valid on a {kind}")]
    InvalidAccessFlags { bits: u16, kind: &'static str },

    #[error("Malformed name: {0}")]
    MalformedName(String),

    #[error("Malformed descriptor: {0}")]
    MalformedDescriptor(String),

    /// `<init>` methods must return `void`
    #[error("Constructor has non-void return type {0:?}")]
    NonVoidConstructor(FieldType),

    #[error("Static method has no `this`")]
    MissingThis,

    #[error("Method has {available} parameter(s), no parameter at index {index}")]
    ArgumentOutOfRange { index: usize, available: usize },

    #[error("Local variable slots exhausted")]
    LocalsOverflow,

    #[error("Return of {found:?} from a method returning {expected:?}")]
    MismatchedReturn {
        found: Option<FieldType>,
        expected: Option<FieldType>,
    },
}
