use super::{
    BranchCond, CodeBuilder, CompareMode, ConstantData, EqComparison, Instruction, InvokeType,
    Label, MethodHandle, MethodHeader, Opcode, OrdComparison,
};
use crate::jvm::{
    BaseType, BinaryName, Error, FieldAccessFlags, FieldType, MethodDescriptor, RefType,
    RenderDescriptor, UnqualifiedName,
};
use crate::util::Width;
use std::borrow::Cow;

/// Field being read or written
#[derive(Clone, Debug)]
pub struct FieldData {
    /// Class declaring the field
    pub owner: BinaryName,
    pub name: UnqualifiedName,
    pub descriptor: FieldType,
    pub access_flags: FieldAccessFlags,
}

impl FieldData {
    pub fn is_static(&self) -> bool {
        self.access_flags.contains(FieldAccessFlags::STATIC)
    }
}

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum AccessMode {
    Read,
    Write,
}

/// Arithmetic and bitwise operations
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum ArithmeticOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Neg,
    Shl,
    Shr,
    Ushr,
    And,
    Or,
    Xor,
}

impl ArithmeticOp {
    /// `int` member of the opcode family
    fn int_opcode(&self) -> Opcode {
        match self {
            ArithmeticOp::Add => Opcode::IADD,
            ArithmeticOp::Sub => Opcode::ISUB,
            ArithmeticOp::Mul => Opcode::IMUL,
            ArithmeticOp::Div => Opcode::IDIV,
            ArithmeticOp::Rem => Opcode::IREM,
            ArithmeticOp::Neg => Opcode::INEG,
            ArithmeticOp::Shl => Opcode::ISHL,
            ArithmeticOp::Shr => Opcode::ISHR,
            ArithmeticOp::Ushr => Opcode::IUSHR,
            ArithmeticOp::And => Opcode::IAND,
            ArithmeticOp::Or => Opcode::IOR,
            ArithmeticOp::Xor => Opcode::IXOR,
        }
    }

    /// Only defined on `int` and `long`
    fn is_integral_only(&self) -> bool {
        self.is_shift() || self.is_bitwise()
    }

    fn is_shift(&self) -> bool {
        matches!(
            self,
            ArithmeticOp::Shl | ArithmeticOp::Shr | ArithmeticOp::Ushr
        )
    }

    fn is_bitwise(&self) -> bool {
        matches!(self, ArithmeticOp::And | ArithmeticOp::Or | ArithmeticOp::Xor)
    }
}

/// Typed operations on top of [`CodeBuilder`]
///
/// These pick the right member of each opcode family from the static type of the operands, and
/// the shortest encoding for constants.
pub trait CodeBuilderExts {
    /// Zero initialize a local variable
    fn zero_local(&mut self, offset: u16, field_type: &FieldType) -> Result<(), Error>;

    /// Push `null` onto the stack
    fn const_null(&mut self) -> Result<(), Error>;

    /// Push a constant string onto the stack
    fn const_string(&mut self, string: impl Into<Cow<'static, str>>) -> Result<(), Error>;

    /// Get a local at a particular offset
    fn get_local(&mut self, offset: u16, field_type: &FieldType) -> Result<(), Error>;

    /// Set a local at a particular offset
    fn set_local(&mut self, offset: u16, field_type: &FieldType) -> Result<(), Error>;

    /// Return from a `void` method
    fn return_(&mut self) -> Result<(), Error>;

    /// Return the value on top of the stack
    fn return_value(&mut self, field_type: &FieldType) -> Result<(), Error>;

    /// Push an integer constant onto the stack
    fn const_int(&mut self, integer: i32) -> Result<(), Error>;

    /// Push a long constant onto the stack
    fn const_long(&mut self, long: i64) -> Result<(), Error>;

    /// Push a float constant onto the stack
    fn const_float(&mut self, float: f32) -> Result<(), Error>;

    /// Push a double constant onto the stack
    fn const_double(&mut self, double: f64) -> Result<(), Error>;

    /// Push a boolean constant onto the stack
    fn const_bool(&mut self, boolean: bool) -> Result<(), Error>;

    /// Push a value of type `java/lang/Class` onto the stack
    fn const_class(&mut self, field_type: &FieldType) -> Result<(), Error>;

    /// Push a value of type `java/lang/invoke/MethodHandle` onto the stack
    fn const_method_handle(&mut self, handle: MethodHandle) -> Result<(), Error>;

    /// Push a value of type `java/lang/invoke/MethodType` onto the stack
    fn const_method_type(&mut self, descriptor: MethodDescriptor) -> Result<(), Error>;

    /// Pop the top of the stack, accounting for the different possible type widths
    fn pop(&mut self, field_type: &FieldType) -> Result<(), Error>;

    /// Duplicate the top of the stack, accounting for the different possible type widths
    fn dup(&mut self, field_type: &FieldType) -> Result<(), Error>;

    /// Swap the two (single slot) values on top of the stack
    fn swap(&mut self) -> Result<(), Error>;

    /// Push 1 or 0 onto the stack depending if the condition holds or not
    fn condition(&mut self, condition: BranchCond) -> Result<(), Error>;

    /// Prepare two operands of the given type for a comparison
    ///
    /// This emits whatever is needed to reduce the comparison to a branch (`lcmp`, `fcmpl`, ...)
    /// and returns the condition to branch on.
    fn compare(
        &mut self,
        operand: &FieldType,
        comparison: OrdComparison,
    ) -> Result<BranchCond, Error>;

    /// Compare two operands of the given type and jump if the comparison holds
    fn if_cmp(
        &mut self,
        operand: &FieldType,
        comparison: OrdComparison,
        label: Label,
    ) -> Result<(), Error>;

    /// Compare an `int` against zero and jump if the comparison holds
    fn if_zero_cmp(&mut self, comparison: OrdComparison, label: Label) -> Result<(), Error>;

    /// Compare a reference against `null` and jump if the comparison holds
    fn if_null(&mut self, comparison: EqComparison, label: Label) -> Result<(), Error>;

    /// Jump if the condition holds
    fn jump(&mut self, condition: BranchCond, label: Label) -> Result<(), Error>;

    /// Jump unconditionally
    fn goto_(&mut self, label: Label) -> Result<(), Error>;

    /// Convert the primitive value on top of the stack
    fn convert(&mut self, from: &FieldType, to: &FieldType) -> Result<(), Error>;

    /// Increment an `int` local variable
    fn increment(&mut self, offset: u16, amount: i16) -> Result<(), Error>;

    /// Arithmetic or bitwise operation on values of the given type
    fn arithmetic(&mut self, op: ArithmeticOp, operand: &FieldType) -> Result<(), Error>;

    /// Construct a new array whose size is on top of the stack
    fn new_array(&mut self, element_type: &FieldType) -> Result<(), Error>;

    /// Construct a new array of a constant size
    fn new_array_sized(&mut self, element_type: &FieldType, size: i32) -> Result<(), Error>;

    /// Construct a multi-dimensional array, with the sizes of the first `dimensions` on the stack
    fn multi_new_array(&mut self, array_type: &RefType, dimensions: u8) -> Result<(), Error>;

    /// Load an element from an array
    fn array_load(&mut self, element_type: &FieldType) -> Result<(), Error>;

    /// Store an element into an array
    fn array_store(&mut self, element_type: &FieldType) -> Result<(), Error>;

    /// Push the length of an array
    fn array_length(&mut self) -> Result<(), Error>;

    /// Allocate an uninitialized object of the given class
    fn new_instance(&mut self, class: BinaryName) -> Result<(), Error>;

    /// Cast the reference on top of the stack
    fn check_cast(&mut self, ref_type: RefType) -> Result<(), Error>;

    /// Check if the reference on top of the stack is an instance of a type
    fn instance_of(&mut self, ref_type: RefType) -> Result<(), Error>;

    /// Get/put a field
    fn access_field(&mut self, field: &FieldData, access_mode: AccessMode) -> Result<(), Error>;

    /// Invoke a method
    fn invoke(&mut self, method: &MethodHeader) -> Result<(), Error>;

    /// Invoke a method explicitly specifying the invocation type
    fn invoke_explicit(
        &mut self,
        invoke_type: InvokeType,
        method: &MethodHeader,
    ) -> Result<(), Error>;

    /// Invoke dynamic
    fn invoke_dynamic(
        &mut self,
        bootstrap: MethodHandle,
        arguments: Vec<ConstantData>,
        method_name: UnqualifiedName,
        descriptor: MethodDescriptor,
    ) -> Result<(), Error>;

    /// Throw the exception on top of the stack
    fn throw(&mut self) -> Result<(), Error>;
}

impl CodeBuilderExts for CodeBuilder {
    fn zero_local(&mut self, offset: u16, field_type: &FieldType) -> Result<(), Error> {
        let zero = match field_type {
            FieldType::Base(BaseType::Float) => Opcode::FCONST_0,
            FieldType::Base(BaseType::Long) => Opcode::LCONST_0,
            FieldType::Base(BaseType::Double) => Opcode::DCONST_0,
            FieldType::Base(_) => Opcode::ICONST_0,
            FieldType::Ref(_) => Opcode::ACONST_NULL,
        };
        self.push_instruction(Instruction::Plain(zero))?;
        self.set_local(offset, field_type)
    }

    fn const_null(&mut self) -> Result<(), Error> {
        self.push_instruction(Instruction::Plain(Opcode::ACONST_NULL))
    }

    fn const_string(&mut self, string: impl Into<Cow<'static, str>>) -> Result<(), Error> {
        let constant = ConstantData::String(string.into());
        self.push_instruction(Instruction::Constant(constant))
    }

    fn get_local(&mut self, offset: u16, field_type: &FieldType) -> Result<(), Error> {
        self.push_instruction(Instruction::VarSlot(
            field_type.opcode(Opcode::ILOAD),
            offset,
        ))
    }

    fn set_local(&mut self, offset: u16, field_type: &FieldType) -> Result<(), Error> {
        self.push_instruction(Instruction::VarSlot(
            field_type.opcode(Opcode::ISTORE),
            offset,
        ))
    }

    fn return_(&mut self) -> Result<(), Error> {
        if let Some(expected) = &self.header.descriptor.return_type {
            return Err(Error::MismatchedReturn {
                found: None,
                expected: Some(expected.clone()),
            });
        }
        self.push_instruction(Instruction::Plain(Opcode::RETURN))
    }

    fn return_value(&mut self, field_type: &FieldType) -> Result<(), Error> {
        let opcode = field_type.opcode(Opcode::IRETURN);
        match &self.header.descriptor.return_type {
            Some(expected) if expected.opcode(Opcode::IRETURN) == opcode => {
                self.push_instruction(Instruction::Plain(opcode))
            }
            expected => Err(Error::MismatchedReturn {
                found: Some(field_type.clone()),
                expected: expected.clone(),
            }),
        }
    }

    fn const_int(&mut self, integer: i32) -> Result<(), Error> {
        let insn = match integer {
            -1..=5 => Instruction::Plain(Opcode((Opcode::ICONST_0.0 as i32 + integer) as u8)),
            -128..=127 => Instruction::IntOperand(Opcode::BIPUSH, integer),
            -32768..=32767 => Instruction::IntOperand(Opcode::SIPUSH, integer),
            _ => Instruction::Constant(ConstantData::Integer(integer)),
        };
        self.push_instruction(insn)
    }

    fn const_long(&mut self, long: i64) -> Result<(), Error> {
        let insn = match long {
            0 => Instruction::Plain(Opcode::LCONST_0),
            1 => Instruction::Plain(Opcode::LCONST_1),
            _ => Instruction::Constant(ConstantData::Long(long)),
        };
        self.push_instruction(insn)
    }

    /// Push a float constant onto the stack
    ///
    /// Matching is on the exact bits, so `-0.0` and NaNs go through the constant pool.
    fn const_float(&mut self, float: f32) -> Result<(), Error> {
        let insn = match float.to_bits() {
            bits if bits == 0.0f32.to_bits() => Instruction::Plain(Opcode::FCONST_0),
            bits if bits == 1.0f32.to_bits() => Instruction::Plain(Opcode::FCONST_1),
            bits if bits == 2.0f32.to_bits() => Instruction::Plain(Opcode::FCONST_2),
            _ => Instruction::Constant(ConstantData::Float(float)),
        };
        self.push_instruction(insn)
    }

    fn const_double(&mut self, double: f64) -> Result<(), Error> {
        let insn = match double.to_bits() {
            bits if bits == 0.0f64.to_bits() => Instruction::Plain(Opcode::DCONST_0),
            bits if bits == 1.0f64.to_bits() => Instruction::Plain(Opcode::DCONST_1),
            _ => Instruction::Constant(ConstantData::Double(double)),
        };
        self.push_instruction(insn)
    }

    fn const_bool(&mut self, boolean: bool) -> Result<(), Error> {
        self.const_int(i32::from(boolean))
    }

    /// Push a constant of type `java.lang.Class` onto the stack
    ///
    /// Primitive classes can't be loaded from the constant pool, so they are read from the
    /// `TYPE` field of the matching boxed class.
    fn const_class(&mut self, field_type: &FieldType) -> Result<(), Error> {
        match field_type {
            FieldType::Base(base_type) => {
                let type_field = FieldData {
                    owner: base_type.boxed_class(),
                    name: UnqualifiedName::TYPE,
                    descriptor: FieldType::object(BinaryName::CLASS),
                    access_flags: FieldAccessFlags::PUBLIC
                        + FieldAccessFlags::STATIC
                        + FieldAccessFlags::FINAL,
                };
                self.access_field(&type_field, AccessMode::Read)
            }
            FieldType::Ref(ref_type) => {
                let constant = ConstantData::Class(ref_type.clone());
                self.push_instruction(Instruction::Constant(constant))
            }
        }
    }

    fn const_method_handle(&mut self, handle: MethodHandle) -> Result<(), Error> {
        self.push_instruction(Instruction::Constant(ConstantData::MethodHandle(handle)))
    }

    fn const_method_type(&mut self, descriptor: MethodDescriptor) -> Result<(), Error> {
        self.push_instruction(Instruction::Constant(ConstantData::MethodType(descriptor)))
    }

    fn pop(&mut self, field_type: &FieldType) -> Result<(), Error> {
        let opcode = if field_type.width() == 2 {
            Opcode::POP2
        } else {
            Opcode::POP
        };
        self.push_instruction(Instruction::Plain(opcode))
    }

    fn dup(&mut self, field_type: &FieldType) -> Result<(), Error> {
        let opcode = if field_type.width() == 2 {
            Opcode::DUP2
        } else {
            Opcode::DUP
        };
        self.push_instruction(Instruction::Plain(opcode))
    }

    fn swap(&mut self) -> Result<(), Error> {
        self.push_instruction(Instruction::Plain(Opcode::SWAP))
    }

    fn condition(&mut self, condition: BranchCond) -> Result<(), Error> {
        let els = self.fresh_label();
        let end = self.fresh_label();

        self.jump(condition, els)?;
        self.push_instruction(Instruction::Plain(Opcode::ICONST_0))?;
        self.goto_(end)?;
        self.bind_label(els)?;
        self.push_instruction(Instruction::Plain(Opcode::ICONST_1))?;
        self.bind_label(end)?;

        Ok(())
    }

    fn compare(
        &mut self,
        operand: &FieldType,
        comparison: OrdComparison,
    ) -> Result<BranchCond, Error> {
        // `fcmpl`/`dcmpl` produce -1 on NaN and `fcmpg`/`dcmpg` produce 1, so pick whichever makes
        // the comparison false on NaN
        let nan_mode = match comparison {
            OrdComparison::GE | OrdComparison::GT => CompareMode::L,
            _ => CompareMode::G,
        };

        let compare_opcode = match operand {
            FieldType::Ref(_) => {
                return match comparison.as_eq() {
                    Some(eq) => Ok(BranchCond::IfACmp(eq)),
                    None => Err(Error::UnsupportedComparison {
                        operand: operand.clone(),
                        comparison,
                    }),
                };
            }
            FieldType::Base(BaseType::Long) => Opcode::LCMP,
            FieldType::Base(BaseType::Float) => match nan_mode {
                CompareMode::L => Opcode::FCMPL,
                CompareMode::G => Opcode::FCMPG,
            },
            FieldType::Base(BaseType::Double) => match nan_mode {
                CompareMode::L => Opcode::DCMPL,
                CompareMode::G => Opcode::DCMPG,
            },
            FieldType::Base(_) => return Ok(BranchCond::IfICmp(comparison)),
        };
        self.push_instruction(Instruction::Plain(compare_opcode))?;
        Ok(BranchCond::If(comparison))
    }

    fn if_cmp(
        &mut self,
        operand: &FieldType,
        comparison: OrdComparison,
        label: Label,
    ) -> Result<(), Error> {
        let condition = self.compare(operand, comparison)?;
        self.jump(condition, label)
    }

    fn if_zero_cmp(&mut self, comparison: OrdComparison, label: Label) -> Result<(), Error> {
        self.jump(BranchCond::If(comparison), label)
    }

    fn if_null(&mut self, comparison: EqComparison, label: Label) -> Result<(), Error> {
        self.jump(BranchCond::IfNull(comparison), label)
    }

    fn jump(&mut self, condition: BranchCond, label: Label) -> Result<(), Error> {
        self.push_instruction(condition.into_instruction(label))
    }

    fn goto_(&mut self, label: Label) -> Result<(), Error> {
        self.push_instruction(Instruction::Jump(Opcode::GOTO, label))
    }

    /// Convert the primitive value on top of the stack
    ///
    /// `long`, `float`, and `double` values narrow to `byte`, `char`, and `short` by going
    /// through `int` first. Widening between `int`-like types is a no-op except when the target
    /// can't represent every value of the source.
    fn convert(&mut self, from: &FieldType, to: &FieldType) -> Result<(), Error> {
        if from == to {
            return Ok(());
        }
        let incompatible = || Error::IncompatibleConversion {
            from: from.clone(),
            to: to.clone(),
        };
        let (from_base, to_base) = match (from, to) {
            (FieldType::Base(BaseType::Boolean), _) | (_, FieldType::Base(BaseType::Boolean)) => {
                return Err(incompatible())
            }
            (FieldType::Base(from_base), FieldType::Base(to_base)) => (*from_base, *to_base),
            _ => return Err(incompatible()),
        };

        // Step to `int` (or straight to the target when there is a direct instruction)
        let direct = match (from_base, to_base) {
            (BaseType::Long, BaseType::Float) => Some(Opcode::L2F),
            (BaseType::Long, BaseType::Double) => Some(Opcode::L2D),
            (BaseType::Long, _) => Some(Opcode::L2I),
            (BaseType::Float, BaseType::Long) => Some(Opcode::F2L),
            (BaseType::Float, BaseType::Double) => Some(Opcode::F2D),
            (BaseType::Float, _) => Some(Opcode::F2I),
            (BaseType::Double, BaseType::Long) => Some(Opcode::D2L),
            (BaseType::Double, BaseType::Float) => Some(Opcode::D2F),
            (BaseType::Double, _) => Some(Opcode::D2I),
            (_, BaseType::Long) => Some(Opcode::I2L),
            (_, BaseType::Float) => Some(Opcode::I2F),
            (_, BaseType::Double) => Some(Opcode::I2D),
            _ => None,
        };
        if let Some(opcode) = direct {
            self.push_instruction(Instruction::Plain(opcode))?;
        }

        // Narrow the `int` further, if needed
        let narrowing = match (from_base, to_base) {
            (BaseType::Byte, BaseType::Short) => None,
            (_, BaseType::Byte) => Some(Opcode::I2B),
            (_, BaseType::Char) => Some(Opcode::I2C),
            (_, BaseType::Short) => Some(Opcode::I2S),
            _ => None,
        };
        if let Some(opcode) = narrowing {
            self.push_instruction(Instruction::Plain(opcode))?;
        }
        Ok(())
    }

    fn increment(&mut self, offset: u16, amount: i16) -> Result<(), Error> {
        self.push_instruction(Instruction::IncrementLocal(offset, amount))
    }

    fn arithmetic(&mut self, op: ArithmeticOp, operand: &FieldType) -> Result<(), Error> {
        let supported = match operand {
            FieldType::Ref(_) => false,
            FieldType::Base(BaseType::Float | BaseType::Double) => !op.is_integral_only(),
            FieldType::Base(BaseType::Boolean) => op.is_bitwise(),
            FieldType::Base(_) => true,
        };
        if !supported {
            return Err(Error::UnsupportedOperand {
                opcode: op.int_opcode(),
                operand: operand.clone(),
            });
        }
        self.push_instruction(Instruction::Plain(operand.opcode(op.int_opcode())))
    }

    fn new_array(&mut self, element_type: &FieldType) -> Result<(), Error> {
        let insn = match element_type {
            FieldType::Base(base_type) => {
                Instruction::IntOperand(Opcode::NEWARRAY, i32::from(base_type.array_type_code()))
            }
            FieldType::Ref(ref_type) => Instruction::TypeRef(Opcode::ANEWARRAY, ref_type.clone()),
        };
        self.push_instruction(insn)
    }

    fn new_array_sized(&mut self, element_type: &FieldType, size: i32) -> Result<(), Error> {
        if size < 0 {
            return Err(Error::NegativeArraySize(size));
        }
        self.const_int(size)?;
        self.new_array(element_type)
    }

    fn multi_new_array(&mut self, array_type: &RefType, dimensions: u8) -> Result<(), Error> {
        if dimensions == 0 || usize::from(dimensions) > array_type.dimensions() {
            return Err(Error::InvalidArrayDimensions {
                descriptor: array_type.render(),
                dimensions,
            });
        }
        self.push_instruction(Instruction::MultiNewArray(array_type.clone(), dimensions))
    }

    fn array_load(&mut self, element_type: &FieldType) -> Result<(), Error> {
        self.push_instruction(Instruction::Plain(element_type.opcode(Opcode::IALOAD)))
    }

    fn array_store(&mut self, element_type: &FieldType) -> Result<(), Error> {
        self.push_instruction(Instruction::Plain(element_type.opcode(Opcode::IASTORE)))
    }

    fn array_length(&mut self) -> Result<(), Error> {
        self.push_instruction(Instruction::Plain(Opcode::ARRAYLENGTH))
    }

    fn new_instance(&mut self, class: BinaryName) -> Result<(), Error> {
        self.push_instruction(Instruction::TypeRef(Opcode::NEW, RefType::Object(class)))
    }

    fn check_cast(&mut self, ref_type: RefType) -> Result<(), Error> {
        self.push_instruction(Instruction::TypeRef(Opcode::CHECKCAST, ref_type))
    }

    fn instance_of(&mut self, ref_type: RefType) -> Result<(), Error> {
        self.push_instruction(Instruction::TypeRef(Opcode::INSTANCEOF, ref_type))
    }

    fn access_field(&mut self, field: &FieldData, access_mode: AccessMode) -> Result<(), Error> {
        let opcode = match (field.is_static(), access_mode) {
            (true, AccessMode::Read) => Opcode::GETSTATIC,
            (true, AccessMode::Write) => Opcode::PUTSTATIC,
            (false, AccessMode::Read) => Opcode::GETFIELD,
            (false, AccessMode::Write) => Opcode::PUTFIELD,
        };
        self.push_instruction(Instruction::FieldRef {
            opcode,
            owner: field.owner.clone(),
            name: field.name.clone(),
            descriptor: field.descriptor.clone(),
        })
    }

    fn invoke(&mut self, method: &MethodHeader) -> Result<(), Error> {
        self.invoke_explicit(method.infer_invoke_type(), method)
    }

    fn invoke_explicit(
        &mut self,
        invoke_type: InvokeType,
        method: &MethodHeader,
    ) -> Result<(), Error> {
        self.push_instruction(Instruction::MethodRef {
            opcode: invoke_type.opcode(),
            owner: method.owner.clone(),
            name: method.name.clone(),
            descriptor: method.descriptor.clone(),
            interface: invoke_type == InvokeType::Interface,
        })
    }

    fn invoke_dynamic(
        &mut self,
        bootstrap: MethodHandle,
        arguments: Vec<ConstantData>,
        method_name: UnqualifiedName,
        descriptor: MethodDescriptor,
    ) -> Result<(), Error> {
        self.push_instruction(Instruction::InvokeDynamic {
            name: method_name,
            descriptor,
            bootstrap,
            arguments,
        })
    }

    fn throw(&mut self) -> Result<(), Error> {
        self.push_instruction(Instruction::Plain(Opcode::ATHROW))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::jvm::code::Settings;
    use crate::jvm::{MethodAccessFlags, Name, ParseDescriptor};

    fn builder(descriptor: &str) -> CodeBuilder {
        let header = MethodHeader {
            owner: BinaryName::from_string("me/alec/Ops").unwrap(),
            name: UnqualifiedName::from_string("run").unwrap(),
            descriptor: MethodDescriptor::parse(descriptor).unwrap(),
            access_flags: MethodAccessFlags::STATIC,
        };
        CodeBuilder::new(header, Settings::default()).unwrap()
    }

    /// Instructions emitted by `generate`, without the leading start label mark
    fn emitted(
        generate: impl FnOnce(&mut CodeBuilder) -> Result<(), Error>,
    ) -> Result<Vec<Instruction>, Error> {
        let mut code = builder("()V");
        generate(&mut code)?;
        Ok(code.current_stream().instructions()[1..].to_vec())
    }

    fn plain(opcode: Opcode) -> Instruction {
        Instruction::Plain(opcode)
    }

    #[test]
    fn int_constants() -> Result<(), Error> {
        for (value, expected) in [
            (-1, plain(Opcode::ICONST_M1)),
            (0, plain(Opcode::ICONST_0)),
            (5, plain(Opcode::ICONST_5)),
            (6, Instruction::IntOperand(Opcode::BIPUSH, 6)),
            (-2, Instruction::IntOperand(Opcode::BIPUSH, -2)),
            (127, Instruction::IntOperand(Opcode::BIPUSH, 127)),
            (-128, Instruction::IntOperand(Opcode::BIPUSH, -128)),
            (128, Instruction::IntOperand(Opcode::SIPUSH, 128)),
            (-32768, Instruction::IntOperand(Opcode::SIPUSH, -32768)),
            (32768, Instruction::Constant(ConstantData::Integer(32768))),
        ] {
            assert_eq!(emitted(|code| code.const_int(value))?, vec![expected]);
        }
        Ok(())
    }

    #[test]
    fn float_constants() -> Result<(), Error> {
        assert_eq!(
            emitted(|code| code.const_float(0.0))?,
            vec![plain(Opcode::FCONST_0)]
        );
        assert_eq!(
            emitted(|code| code.const_float(2.0))?,
            vec![plain(Opcode::FCONST_2)]
        );
        assert_eq!(
            emitted(|code| code.const_float(-0.0))?,
            vec![Instruction::Constant(ConstantData::Float(-0.0))]
        );
        let nan = emitted(|code| code.const_float(f32::NAN))?;
        assert!(matches!(
            nan.as_slice(),
            [Instruction::Constant(ConstantData::Float(f))] if f.is_nan()
        ));
        assert_eq!(
            emitted(|code| code.const_double(1.0))?,
            vec![plain(Opcode::DCONST_1)]
        );
        assert_eq!(
            emitted(|code| code.const_double(-0.0))?,
            vec![Instruction::Constant(ConstantData::Double(-0.0))]
        );
        assert_eq!(
            emitted(|code| code.const_long(1))?,
            vec![plain(Opcode::LCONST_1)]
        );
        assert_eq!(
            emitted(|code| code.const_long(2))?,
            vec![Instruction::Constant(ConstantData::Long(2))]
        );
        Ok(())
    }

    #[test]
    fn comparisons() -> Result<(), Error> {
        let mut code = builder("()V");
        assert_eq!(
            code.compare(&FieldType::int(), OrdComparison::LT)?,
            BranchCond::IfICmp(OrdComparison::LT)
        );
        assert_eq!(
            code.compare(&FieldType::char(), OrdComparison::EQ)?,
            BranchCond::IfICmp(OrdComparison::EQ)
        );
        assert_eq!(
            code.compare(&FieldType::long(), OrdComparison::GE)?,
            BranchCond::If(OrdComparison::GE)
        );
        code.compare(&FieldType::float(), OrdComparison::GT)?;
        code.compare(&FieldType::float(), OrdComparison::LE)?;
        code.compare(&FieldType::double(), OrdComparison::GE)?;
        code.compare(&FieldType::double(), OrdComparison::NE)?;
        assert_eq!(
            code.compare(&FieldType::object(BinaryName::OBJECT), OrdComparison::NE)?,
            BranchCond::IfACmp(EqComparison::NE)
        );
        assert!(matches!(
            code.compare(&FieldType::object(BinaryName::STRING), OrdComparison::LT),
            Err(Error::UnsupportedComparison {
                comparison: OrdComparison::LT,
                ..
            })
        ));

        let opcodes: Vec<Opcode> = code.current_stream().instructions()[1..]
            .iter()
            .filter_map(Instruction::opcode)
            .collect();
        assert_eq!(
            opcodes,
            vec![
                Opcode::LCMP,
                Opcode::FCMPL,
                Opcode::FCMPG,
                Opcode::DCMPL,
                Opcode::DCMPG
            ]
        );
        Ok(())
    }

    #[test]
    fn conditional_jumps() -> Result<(), Error> {
        let mut code = builder("()V");
        let label = code.fresh_label();
        code.if_cmp(&FieldType::long(), OrdComparison::LT, label)?;
        code.if_zero_cmp(OrdComparison::NE, label)?;
        code.if_null(EqComparison::EQ, label)?;
        code.bind_label(label)?;
        assert_eq!(
            code.current_stream().instructions()[1..4],
            [
                plain(Opcode::LCMP),
                Instruction::Jump(Opcode::IFLT, label),
                Instruction::Jump(Opcode::IFNE, label),
            ]
        );
        assert_eq!(
            code.current_stream().instructions()[4],
            Instruction::Jump(Opcode::IFNULL, label)
        );
        Ok(())
    }

    #[test]
    fn conversions() -> Result<(), Error> {
        let check = |from: FieldType, to: FieldType, expected: Vec<Opcode>| -> Result<(), Error> {
            let insns = emitted(|code| code.convert(&from, &to))?;
            let expected: Vec<Instruction> = expected.into_iter().map(plain).collect();
            assert_eq!(insns, expected, "{:?} -> {:?}", from, to);
            Ok(())
        };

        check(FieldType::int(), FieldType::int(), vec![])?;
        check(FieldType::int(), FieldType::long(), vec![Opcode::I2L])?;
        check(FieldType::char(), FieldType::double(), vec![Opcode::I2D])?;
        check(FieldType::int(), FieldType::byte(), vec![Opcode::I2B])?;
        check(FieldType::byte(), FieldType::short(), vec![])?;
        check(FieldType::short(), FieldType::char(), vec![Opcode::I2C])?;
        check(FieldType::byte(), FieldType::int(), vec![])?;
        check(FieldType::long(), FieldType::int(), vec![Opcode::L2I])?;
        check(FieldType::long(), FieldType::short(), vec![Opcode::L2I, Opcode::I2S])?;
        check(FieldType::float(), FieldType::char(), vec![Opcode::F2I, Opcode::I2C])?;
        check(FieldType::double(), FieldType::float(), vec![Opcode::D2F])?;
        check(FieldType::float(), FieldType::long(), vec![Opcode::F2L])?;

        let mut code = builder("()V");
        assert!(matches!(
            code.convert(&FieldType::boolean(), &FieldType::int()),
            Err(Error::IncompatibleConversion { .. })
        ));
        assert!(matches!(
            code.convert(&FieldType::object(BinaryName::INTEGER), &FieldType::int()),
            Err(Error::IncompatibleConversion { .. })
        ));
        Ok(())
    }

    #[test]
    fn typed_locals_and_returns() -> Result<(), Error> {
        let insns = emitted(|code| {
            code.get_local(0, &FieldType::double())?;
            code.set_local(2, &FieldType::object(BinaryName::STRING))?;
            code.zero_local(3, &FieldType::long())?;
            code.increment(5, -1)
        })?;
        assert_eq!(
            insns,
            vec![
                Instruction::VarSlot(Opcode::DLOAD, 0),
                Instruction::VarSlot(Opcode::ASTORE, 2),
                plain(Opcode::LCONST_0),
                Instruction::VarSlot(Opcode::LSTORE, 3),
                Instruction::IncrementLocal(5, -1),
            ]
        );

        let mut code = builder("()Z");
        assert!(matches!(
            code.return_(),
            Err(Error::MismatchedReturn { found: None, .. })
        ));
        assert!(code.return_value(&FieldType::long()).is_err());
        code.return_value(&FieldType::int())?;
        assert!(!code.is_reachable());

        let mut code = builder("()V");
        assert!(code.return_value(&FieldType::int()).is_err());
        code.return_()?;
        Ok(())
    }

    #[test]
    fn arithmetic() -> Result<(), Error> {
        let insns = emitted(|code| {
            code.arithmetic(ArithmeticOp::Add, &FieldType::double())?;
            code.arithmetic(ArithmeticOp::Ushr, &FieldType::long())?;
            code.arithmetic(ArithmeticOp::Xor, &FieldType::boolean())?;
            code.arithmetic(ArithmeticOp::Neg, &FieldType::float())
        })?;
        assert_eq!(
            insns,
            vec![
                plain(Opcode::DADD),
                plain(Opcode::LUSHR),
                plain(Opcode::IXOR),
                plain(Opcode::FNEG),
            ]
        );

        let mut code = builder("()V");
        assert!(matches!(
            code.arithmetic(ArithmeticOp::Shl, &FieldType::float()),
            Err(Error::UnsupportedOperand { .. })
        ));
        assert!(code
            .arithmetic(ArithmeticOp::Add, &FieldType::object(BinaryName::STRING))
            .is_err());
        assert!(code
            .arithmetic(ArithmeticOp::Mul, &FieldType::boolean())
            .is_err());
        Ok(())
    }

    #[test]
    fn arrays() -> Result<(), Error> {
        let strings = FieldType::object(BinaryName::STRING);
        let insns = emitted(|code| {
            code.new_array_sized(&FieldType::int(), 3)?;
            code.new_array(&strings)?;
            code.array_load(&FieldType::byte())?;
            code.array_store(&strings)?;
            code.array_length()
        })?;
        assert_eq!(
            insns,
            vec![
                plain(Opcode::ICONST_3),
                Instruction::IntOperand(Opcode::NEWARRAY, 10),
                Instruction::TypeRef(Opcode::ANEWARRAY, RefType::STRING),
                plain(Opcode::BALOAD),
                plain(Opcode::AASTORE),
                plain(Opcode::ARRAYLENGTH),
            ]
        );

        let mut code = builder("()V");
        assert!(matches!(
            code.new_array_sized(&FieldType::int(), -1),
            Err(Error::NegativeArraySize(-1))
        ));

        let matrix = RefType::array(FieldType::array(FieldType::double()));
        code.multi_new_array(&matrix, 2)?;
        code.multi_new_array(&matrix, 1)?;
        assert!(matches!(
            code.multi_new_array(&matrix, 3),
            Err(Error::InvalidArrayDimensions { dimensions: 3, .. })
        ));
        assert!(code.multi_new_array(&matrix, 0).is_err());
        assert!(code.multi_new_array(&RefType::STRING, 1).is_err());
        Ok(())
    }

    #[test]
    fn primitive_class_constants() -> Result<(), Error> {
        let insns = emitted(|code| {
            code.const_class(&FieldType::long())?;
            code.const_class(&FieldType::object(BinaryName::STRING))
        })?;
        assert_eq!(
            insns,
            vec![
                Instruction::FieldRef {
                    opcode: Opcode::GETSTATIC,
                    owner: BinaryName::LONG,
                    name: UnqualifiedName::TYPE,
                    descriptor: FieldType::object(BinaryName::CLASS),
                },
                Instruction::Constant(ConstantData::Class(RefType::STRING)),
            ]
        );
        Ok(())
    }

    #[test]
    fn condition_pushes_boolean() -> Result<(), Error> {
        let insns = emitted(|code| code.condition(BranchCond::IfNull(EqComparison::NE)))?;
        let opcodes: Vec<Opcode> = insns.iter().filter_map(Instruction::opcode).collect();
        assert_eq!(
            opcodes,
            vec![
                Opcode::IFNONNULL,
                Opcode::ICONST_0,
                Opcode::GOTO,
                Opcode::ICONST_1
            ]
        );
        Ok(())
    }

    #[test]
    fn invocations() -> Result<(), Error> {
        let init = MethodHeader {
            owner: BinaryName::OBJECT,
            name: UnqualifiedName::INIT,
            descriptor: MethodDescriptor::parse("()V")?,
            access_flags: MethodAccessFlags::PUBLIC,
        };
        let value_of = MethodHeader {
            owner: BinaryName::INTEGER,
            name: UnqualifiedName::from_string("valueOf")?,
            descriptor: MethodDescriptor::parse("(I)Ljava/lang/Integer;")?,
            access_flags: MethodAccessFlags::PUBLIC + MethodAccessFlags::STATIC,
        };
        let insns = emitted(|code| {
            code.new_instance(BinaryName::OBJECT)?;
            code.dup(&FieldType::object(BinaryName::OBJECT))?;
            code.invoke(&init)?;
            code.invoke(&value_of)?;
            code.invoke_explicit(InvokeType::Interface, &value_of)
        })?;
        let opcodes: Vec<Opcode> = insns.iter().filter_map(Instruction::opcode).collect();
        assert_eq!(
            opcodes,
            vec![
                Opcode::NEW,
                Opcode::DUP,
                Opcode::INVOKESPECIAL,
                Opcode::INVOKESTATIC,
                Opcode::INVOKEINTERFACE
            ]
        );
        assert!(matches!(
            &insns[4],
            Instruction::MethodRef {
                interface: true,
                ..
            }
        ));
        Ok(())
    }
}
