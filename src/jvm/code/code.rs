use super::{Instruction, Label};
use crate::jvm::annotations::Annotation;
use crate::jvm::{BinaryName, FieldType, UnqualifiedName};
use std::collections::HashMap;

/// Immutable run of instructions, framed by its start and end label marks
#[derive(Clone, PartialEq, Debug)]
pub struct CodeChunk {
    pub instructions: Vec<Instruction>,
    pub start: Label,
    pub end: Label,
}

/// Exception handler covering the instructions between `start` (inclusive) and `end` (exclusive)
#[derive(Clone, PartialEq, Debug)]
pub struct TryCatchRegion {
    pub start: Label,
    pub end: Label,
    pub handler: Label,

    /// Class of exceptions caught (`None` catches everything)
    pub exception_type: Option<BinaryName>,

    /// Type annotations on the caught exception type
    pub type_annotations: Vec<Annotation>,
}

/// Entry in the local variable table
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct LocalVariable {
    pub name: UnqualifiedName,
    pub descriptor: FieldType,
    pub index: u16,

    /// Variable is in scope from `start` until `end`
    pub start: Label,
    pub end: Label,
}

/// Entry in the line number table
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub struct LineNumber {
    pub line: u16,
    pub start: Label,
}

/// Finished method body, ready to be handed to a class writer
#[derive(Debug)]
pub struct Code {
    /// Instructions of the body, framed by the method start and end labels
    pub chunk: CodeChunk,

    /// Exception handlers, innermost first
    pub try_catch_regions: Vec<TryCatchRegion>,

    pub local_variables: Vec<LocalVariable>,

    pub line_numbers: Vec<LineNumber>,

    /// Index in `chunk.instructions` of every placed label's mark
    pub label_positions: HashMap<Label, usize>,

    /// Number of local variable slots used (including parameters)
    pub max_locals: u16,
}

impl Code {
    pub fn instructions(&self) -> &[Instruction] {
        &self.chunk.instructions
    }

    /// Position of a label in the instructions
    pub fn position(&self, label: Label) -> Option<usize> {
        self.label_positions.get(&label).copied()
    }

    /// Instructions which are not pseudo-instructions
    pub fn opcodes(&self) -> impl Iterator<Item = super::Opcode> + '_ {
        self.chunk.instructions.iter().filter_map(Instruction::opcode)
    }
}
