use super::{Label, Opcode};
use crate::jvm::{BaseType, BinaryName, FieldType, MethodDescriptor, RefType, UnqualifiedName};
use std::borrow::Cow;
use std::ops::Not;

/// Instruction in a method body
///
/// Operands are kept symbolic: classes, members, and constants are referred to by name and type
/// (the class writer interns them into the constant pool) and jumps refer to [`Label`]s (the class
/// writer resolves them into byte offsets). Besides real instructions, there are pseudo-instructions
/// for placing labels, line numbers, and stack map frames.
#[derive(Clone, PartialEq, Debug)]
pub enum Instruction {
    /// Instruction without operands (`iadd`, `arraylength`, `athrow`, `ireturn`, ...)
    Plain(Opcode),

    /// Instruction on a local variable slot (`iload`, `astore`, ...)
    VarSlot(Opcode, u16),

    /// Instruction with an immediate `int` operand (`bipush`, `sipush`, `newarray`)
    IntOperand(Opcode, i32),

    /// Instruction with a class operand (`new`, `anewarray`, `checkcast`, `instanceof`)
    TypeRef(Opcode, RefType),

    /// `getstatic`, `putstatic`, `getfield`, or `putfield`
    FieldRef {
        opcode: Opcode,
        owner: BinaryName,
        name: UnqualifiedName,
        descriptor: FieldType,
    },

    /// `invokevirtual`, `invokespecial`, `invokestatic`, or `invokeinterface`
    MethodRef {
        opcode: Opcode,
        owner: BinaryName,
        name: UnqualifiedName,
        descriptor: MethodDescriptor,
        interface: bool,
    },

    /// Conditional or unconditional jump
    Jump(Opcode, Label),

    /// Position of a label (pseudo-instruction)
    LabelMark(Label),

    /// Source line starting at a label (pseudo-instruction)
    LineMark(u16, Label),

    /// `ldc` (or `ldc2_w` for `long` and `double` constants)
    Constant(ConstantData),

    /// `iinc`
    IncrementLocal(u16, i16),

    /// `lookupswitch`, with `keys` strictly ascending and parallel to `labels`
    LookupSwitch {
        default: Label,
        keys: Vec<i32>,
        labels: Vec<Label>,
    },

    /// `tableswitch`, with one label per value in `min..=max`
    TableSwitch {
        min: i32,
        max: i32,
        default: Label,
        labels: Vec<Label>,
    },

    /// `multianewarray`, allocating the given number of dimensions
    MultiNewArray(RefType, u8),

    /// `invokedynamic`
    InvokeDynamic {
        name: UnqualifiedName,
        descriptor: MethodDescriptor,
        bootstrap: MethodHandle,
        arguments: Vec<ConstantData>,
    },

    /// Stack map frame supplied by the caller (pseudo-instruction)
    Frame {
        kind: FrameKind,
        locals: Vec<VerificationType>,
        stack: Vec<VerificationType>,
    },
}

impl Instruction {
    /// Opcode of the instruction (`None` for pseudo-instructions)
    pub fn opcode(&self) -> Option<Opcode> {
        match self {
            Instruction::Plain(opcode)
            | Instruction::VarSlot(opcode, _)
            | Instruction::IntOperand(opcode, _)
            | Instruction::TypeRef(opcode, _)
            | Instruction::FieldRef { opcode, .. }
            | Instruction::MethodRef { opcode, .. }
            | Instruction::Jump(opcode, _) => Some(*opcode),
            Instruction::Constant(constant) if constant.is_wide() => Some(Opcode::LDC2_W),
            Instruction::Constant(_) => Some(Opcode::LDC),
            Instruction::IncrementLocal(_, _) => Some(Opcode::IINC),
            Instruction::LookupSwitch { .. } => Some(Opcode::LOOKUPSWITCH),
            Instruction::TableSwitch { .. } => Some(Opcode::TABLESWITCH),
            Instruction::MultiNewArray(_, _) => Some(Opcode::MULTIANEWARRAY),
            Instruction::InvokeDynamic { .. } => Some(Opcode::INVOKEDYNAMIC),
            Instruction::LabelMark(_) | Instruction::LineMark(_, _) | Instruction::Frame { .. } => {
                None
            }
        }
    }

    /// Labels which this instruction refers to without placing them
    pub fn referenced_labels(&self) -> Vec<Label> {
        match self {
            Instruction::Jump(_, label) | Instruction::LineMark(_, label) => vec![*label],
            Instruction::LookupSwitch {
                default, labels, ..
            }
            | Instruction::TableSwitch {
                default, labels, ..
            } => {
                let mut referenced = vec![*default];
                referenced.extend(labels.iter().copied());
                referenced
            }
            Instruction::Frame { locals, stack, .. } => locals
                .iter()
                .chain(stack.iter())
                .filter_map(|typ| match typ {
                    VerificationType::Uninitialized(label) => Some(*label),
                    _ => None,
                })
                .collect(),
            _ => vec![],
        }
    }
}

/// Constant pool entry loadable with `ldc`/`ldc2_w` (or used as a bootstrap argument)
#[derive(Clone, PartialEq, Debug)]
pub enum ConstantData {
    Integer(i32),
    Float(f32),
    Long(i64),
    Double(f64),
    String(Cow<'static, str>),
    Class(RefType),
    MethodType(MethodDescriptor),
    MethodHandle(MethodHandle),
}

impl ConstantData {
    /// Takes up two stack slots (so must be loaded with `ldc2_w`)
    pub fn is_wide(&self) -> bool {
        matches!(self, ConstantData::Long(_) | ConstantData::Double(_))
    }
}

/// Symbolic reference to a method, as found in `CONSTANT_MethodHandle`
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub struct MethodHandle {
    pub kind: HandleKind,
    pub owner: BinaryName,
    pub name: UnqualifiedName,
    pub descriptor: MethodDescriptor,
    pub interface: bool,
}

/// Method handle behaviours for methods
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub enum HandleKind {
    InvokeVirtual,
    InvokeStatic,
    InvokeSpecial,
    NewInvokeSpecial,
    InvokeInterface,
}

impl HandleKind {
    /// `reference_kind` value in the constant pool
    pub fn reference_kind(&self) -> u8 {
        match self {
            HandleKind::InvokeVirtual => 5,
            HandleKind::InvokeStatic => 6,
            HandleKind::InvokeSpecial => 7,
            HandleKind::NewInvokeSpecial => 8,
            HandleKind::InvokeInterface => 9,
        }
    }
}

/// Comparison modes for floating point
#[derive(Copy, Clone, Eq, PartialEq, Debug, Hash)]
pub enum CompareMode {
    /// -1 on NaN
    L,

    /// 1 on NaN
    G,
}

/// Binary comparison operators available for `int` branches
#[derive(Copy, Clone, Eq, PartialEq, Debug, Hash)]
pub enum OrdComparison {
    EQ,
    GE,
    GT,
    LE,
    LT,
    NE,
}

impl OrdComparison {
    /// Offset of the comparison within the `ifeq`..`ifle` (or `if_icmpeq`..`if_icmple`) family
    fn opcode_offset(&self) -> u8 {
        match self {
            OrdComparison::EQ => 0,
            OrdComparison::NE => 1,
            OrdComparison::LT => 2,
            OrdComparison::GE => 3,
            OrdComparison::GT => 4,
            OrdComparison::LE => 5,
        }
    }

    /// Restrict to an equality comparison, if possible
    pub fn as_eq(&self) -> Option<EqComparison> {
        match self {
            OrdComparison::EQ => Some(EqComparison::EQ),
            OrdComparison::NE => Some(EqComparison::NE),
            _ => None,
        }
    }
}

impl Not for OrdComparison {
    type Output = Self;

    fn not(self) -> Self::Output {
        match self {
            OrdComparison::EQ => OrdComparison::NE,
            OrdComparison::GE => OrdComparison::LT,
            OrdComparison::GT => OrdComparison::LE,
            OrdComparison::LE => OrdComparison::GT,
            OrdComparison::LT => OrdComparison::GE,
            OrdComparison::NE => OrdComparison::EQ,
        }
    }
}

/// Equality/inequality comparison operators
#[derive(Copy, Clone, Eq, PartialEq, Debug, Hash)]
pub enum EqComparison {
    EQ,
    NE,
}

impl Not for EqComparison {
    type Output = Self;

    fn not(self) -> Self::Output {
        match self {
            EqComparison::EQ => EqComparison::NE,
            EqComparison::NE => EqComparison::EQ,
        }
    }
}

/// Type of method to invoke
///
/// Note: `invokedynamic` is kept separate because it is not made against a method reference.
#[derive(Copy, Clone, Eq, PartialEq, Debug, Hash)]
pub enum InvokeType {
    Virtual,
    Special,
    Static,
    Interface,
}

impl InvokeType {
    pub fn opcode(&self) -> Opcode {
        match self {
            InvokeType::Virtual => Opcode::INVOKEVIRTUAL,
            InvokeType::Special => Opcode::INVOKESPECIAL,
            InvokeType::Static => Opcode::INVOKESTATIC,
            InvokeType::Interface => Opcode::INVOKEINTERFACE,
        }
    }
}

/// Conditional branch condition
///
/// The condition consumes its operands from the stack: `If` and `IfNull` take one, `IfICmp` and
/// `IfACmp` take two.
#[derive(Copy, Clone, Eq, PartialEq, Debug, Hash)]
pub enum BranchCond {
    If(OrdComparison),
    IfICmp(OrdComparison),
    IfACmp(EqComparison),
    IfNull(EqComparison),
}

impl Not for BranchCond {
    type Output = Self;

    fn not(self) -> Self::Output {
        match self {
            BranchCond::If(ord) => BranchCond::If(!ord),
            BranchCond::IfICmp(ord) => BranchCond::IfICmp(!ord),
            BranchCond::IfACmp(eq) => BranchCond::IfACmp(!eq),
            BranchCond::IfNull(eq) => BranchCond::IfNull(!eq),
        }
    }
}

impl BranchCond {
    pub fn opcode(&self) -> Opcode {
        match self {
            BranchCond::If(ord) => Opcode(Opcode::IFEQ.0 + ord.opcode_offset()),
            BranchCond::IfICmp(ord) => Opcode(Opcode::IF_ICMPEQ.0 + ord.opcode_offset()),
            BranchCond::IfACmp(EqComparison::EQ) => Opcode::IF_ACMPEQ,
            BranchCond::IfACmp(EqComparison::NE) => Opcode::IF_ACMPNE,
            BranchCond::IfNull(EqComparison::EQ) => Opcode::IFNULL,
            BranchCond::IfNull(EqComparison::NE) => Opcode::IFNONNULL,
        }
    }

    /// Jump to `jump_lbl` if the condition holds
    pub fn into_instruction(&self, jump_lbl: Label) -> Instruction {
        Instruction::Jump(self.opcode(), jump_lbl)
    }
}

/// Stack map frame encodings
///
/// See <https://docs.oracle.com/javase/specs/jvms/se16/html/jvms-4.html#jvms-4.7.4>
#[derive(Copy, Clone, Eq, PartialEq, Debug, Hash)]
pub enum FrameKind {
    /// Same locals as the previous frame, empty stack
    Same,

    /// Same locals as the previous frame, one stack entry
    SameLocals1StackItem,

    /// Previous frame with the last few locals removed, empty stack
    Chop(u8),

    /// Previous frame with some extra locals, empty stack
    Append,

    /// Locals and stack given in full
    Full,
}

/// Types of values, as seen by the bytecode verifier
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub enum VerificationType {
    Top,
    Integer,
    Float,
    Long,
    Double,
    Null,
    UninitializedThis,
    Object(RefType),

    /// Result of the `new` instruction placed right after the label
    Uninitialized(Label),
}

impl From<&FieldType> for VerificationType {
    fn from(field_type: &FieldType) -> VerificationType {
        match field_type {
            FieldType::Base(base_type) if base_type.is_int_like() => VerificationType::Integer,
            FieldType::Base(BaseType::Float) => VerificationType::Float,
            FieldType::Base(BaseType::Long) => VerificationType::Long,
            FieldType::Base(_) => VerificationType::Double,
            FieldType::Ref(ref_type) => VerificationType::Object(ref_type.clone()),
        }
    }
}
