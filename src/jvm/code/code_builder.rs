use super::{
    Code, FrameKind, Instruction, InstructionStream, InvokeType, Label, Labels, LineNumber,
    LocalVariable, Settings, TryCatchRegion, VerificationType,
};
use crate::jvm::{
    BinaryName, Error, FieldType, MethodAccessFlags, MethodDescriptor, RenderDescriptor,
    UnqualifiedName,
};
use crate::util::Width;
use std::collections::{BTreeSet, HashMap};

/// Method whose body is being generated
#[derive(Clone, Debug)]
pub struct MethodHeader {
    /// Class declaring the method
    pub owner: BinaryName,
    pub name: UnqualifiedName,
    pub descriptor: MethodDescriptor,
    pub access_flags: MethodAccessFlags,
}

impl MethodHeader {
    pub fn is_static(&self) -> bool {
        self.access_flags.contains(MethodAccessFlags::STATIC)
    }

    /// Invocation type used to call this method from outside (ignoring interfaces)
    pub fn infer_invoke_type(&self) -> InvokeType {
        if self.is_static() {
            InvokeType::Static
        } else if self.name.is_constructor()
            || self.access_flags.contains(MethodAccessFlags::PRIVATE)
        {
            InvokeType::Special
        } else {
            InvokeType::Virtual
        }
    }
}

/// This provides the interface for building up method bodies from top to bottom. It does the
/// bookkeeping for labels, reachability, local variables, line numbers, and exception handlers.
///
/// ### Nested streams
///
/// Instructions always go into the innermost open [`InstructionStream`]. Structured constructs
/// (see [`CodeBuilder::block`], [`CodeBuilder::if_then_else`], [`CodeBuilder::trying`], and the
/// switch generators) open a child stream, run the caller's closure into it, close it, and then
/// splice it into the parent. Since the child is only spliced after its closure has run, the
/// parent can still emit the jumps which lead into (or around) the child once the child's
/// reachability is known. That is what makes it possible to skip the `goto` at the end of a
/// `then` branch that always returns.
///
/// ### Labels
///
/// Labels are only ever checked for being placed once, as they are placed. Jumps to labels which
/// are never placed are caught when the body is [built](CodeBuilder::build).
pub struct CodeBuilder {
    /// Method under construction
    pub header: MethodHeader,

    pub settings: Settings,

    pub(super) labels: Labels,

    /// Innermost open stream (the method body itself when not inside any block)
    pub(super) current: InstructionStream,

    /// Number of streams enclosing `current`
    pub(super) depth: usize,

    pub(super) try_catch_regions: Vec<TryCatchRegion>,

    local_variables: Vec<LocalVariable>,

    line_numbers: Vec<LineNumber>,

    /// End label of the method body
    method_end: Label,

    /// Next free local variable slot
    next_local: u16,
}

impl CodeBuilder {
    /// Create a builder for a new method
    ///
    /// The initial locals are just the parameters (including maybe `this`).
    pub fn new(header: MethodHeader, settings: Settings) -> Result<CodeBuilder, Error> {
        if header.name.is_constructor() {
            if let Some(return_type) = &header.descriptor.return_type {
                return Err(Error::NonVoidConstructor(return_type.clone()));
            }
        }

        let has_this = !header.is_static();
        let next_local = u16::try_from(header.descriptor.parameter_length(has_this))
            .map_err(|_| Error::LocalsOverflow)?;

        let mut labels = Labels::new();
        let current = InstructionStream::new(&mut labels)?;
        let method_end = current.end();

        let mut local_variables = vec![];
        if has_this && settings.local_variable_table {
            local_variables.push(LocalVariable {
                name: UnqualifiedName::THIS,
                descriptor: FieldType::object(header.owner.clone()),
                index: 0,
                start: current.start(),
                end: method_end,
            });
        }

        Ok(CodeBuilder {
            header,
            settings,
            labels,
            current,
            depth: 0,
            try_catch_regions: vec![],
            local_variables,
            line_numbers: vec![],
            method_end,
            next_local,
        })
    }

    /// Generate a fresh label
    pub fn fresh_label(&mut self) -> Label {
        self.labels.fresh_label()
    }

    /// Place a label at the current position
    pub fn bind_label(&mut self, label: Label) -> Result<(), Error> {
        self.current.bind_label(&mut self.labels, label)
    }

    /// Push a new instruction to the innermost open stream
    ///
    /// Label marks are accepted here too (unlike [`InstructionStream::append`]) and are routed
    /// through [`CodeBuilder::bind_label`].
    pub fn push_instruction(&mut self, insn: Instruction) -> Result<(), Error> {
        match insn {
            Instruction::LabelMark(label) => self.bind_label(label),
            insn => self.current.append(insn),
        }
    }

    /// Could the next instruction be reached by falling through?
    pub fn is_reachable(&self) -> bool {
        self.current.is_reachable()
    }

    /// Innermost open stream
    pub fn current_stream(&self) -> &InstructionStream {
        &self.current
    }

    pub fn labels(&self) -> &Labels {
        &self.labels
    }

    /// Run `body` into a fresh child stream, then close that stream and hand it back unspliced
    ///
    /// The parent stream becomes current again even if `body` fails (the half-built child is
    /// dropped in that case).
    pub(super) fn nested<T>(
        &mut self,
        body: impl FnOnce(&mut CodeBuilder) -> Result<T, Error>,
    ) -> Result<(InstructionStream, T), Error> {
        let child = InstructionStream::new(&mut self.labels)?;
        let parent = std::mem::replace(&mut self.current, child);
        self.depth += 1;
        let result = body(self);
        self.depth -= 1;
        let mut child = std::mem::replace(&mut self.current, parent);

        let value = result?;
        child.close(&mut self.labels)?;
        Ok((child, value))
    }

    /// Splice a closed child stream into the innermost open stream
    pub(super) fn splice(&mut self, child: InstructionStream) -> Result<(), Error> {
        self.current.splice(child)
    }

    /// Allocate a new local variable, live from here until the end of the method
    pub fn new_local(&mut self, name: UnqualifiedName, field_type: FieldType) -> Result<u16, Error> {
        let index = self.next_local;
        let width = u16::try_from(field_type.width()).map_err(|_| Error::LocalsOverflow)?;
        self.next_local = index.checked_add(width).ok_or(Error::LocalsOverflow)?;

        if self.settings.local_variable_table {
            let start = self.fresh_label();
            self.bind_label(start)?;
            self.local_variables.push(LocalVariable {
                name,
                descriptor: field_type,
                index,
                start,
                end: self.method_end,
            });
        }
        Ok(index)
    }

    /// Local variable slot holding `this`
    pub fn this_local(&self) -> Result<u16, Error> {
        if self.header.is_static() {
            Err(Error::MissingThis)
        } else {
            Ok(0)
        }
    }

    /// Local variable slot holding the `n`-th parameter (not counting `this`)
    pub fn argument(&self, n: usize) -> Result<u16, Error> {
        let descriptor = &self.header.descriptor;
        descriptor
            .parameter_slot(n, !self.header.is_static())
            .ok_or(Error::ArgumentOutOfRange {
                index: n,
                available: descriptor.parameters.len(),
            })
    }

    /// Type of the `n`-th parameter
    pub fn argument_type(&self, n: usize) -> Result<&FieldType, Error> {
        let parameters = &self.header.descriptor.parameters;
        parameters.get(n).ok_or(Error::ArgumentOutOfRange {
            index: n,
            available: parameters.len(),
        })
    }

    /// Mark the following instructions as coming from a source line
    pub fn line_number(&mut self, line: u16) -> Result<(), Error> {
        if !self.settings.line_numbers {
            return Ok(());
        }
        let start = self.fresh_label();
        self.bind_label(start)?;
        self.current.append(Instruction::LineMark(line, start))?;
        self.line_numbers.push(LineNumber { line, start });
        Ok(())
    }

    /// Supply a stack map frame for the current position
    pub fn frame(
        &mut self,
        kind: FrameKind,
        locals: Vec<VerificationType>,
        stack: Vec<VerificationType>,
    ) -> Result<(), Error> {
        self.current.append(Instruction::Frame {
            kind,
            locals,
            stack,
        })
    }

    /// Finish the method body
    ///
    /// This places the method end label and checks that every label referred to anywhere (jumps,
    /// switches, exception handlers, line numbers, local variables) has been placed.
    pub fn build(mut self) -> Result<Code, Error> {
        if self.depth != 0 {
            return Err(Error::UnclosedBlocks(self.depth));
        }

        self.current.close(&mut self.labels)?;
        let chunk = self.current.into_chunk()?;

        let mut label_positions = HashMap::new();
        let mut referenced: BTreeSet<Label> = BTreeSet::new();
        for (position, insn) in chunk.instructions.iter().enumerate() {
            if let Instruction::LabelMark(label) = insn {
                label_positions.insert(*label, position);
            }
            referenced.extend(insn.referenced_labels());
        }
        for region in &self.try_catch_regions {
            referenced.extend([region.start, region.end, region.handler]);
        }
        for local in &self.local_variables {
            referenced.extend([local.start, local.end]);
        }
        referenced.extend(self.line_numbers.iter().map(|line| line.start));

        let unbound: Vec<Label> = referenced
            .into_iter()
            .filter(|label| !self.labels.is_bound(*label))
            .collect();
        if !unbound.is_empty() {
            return Err(Error::UnboundLabels(unbound));
        }

        log::debug!(
            "Built {}.{}{}: {} instructions, {} try/catch regions, {} labels",
            self.header.owner,
            self.header.name,
            self.header.descriptor.render(),
            chunk.instructions.len(),
            self.try_catch_regions.len(),
            label_positions.len(),
        );

        Ok(Code {
            chunk,
            try_catch_regions: self.try_catch_regions,
            local_variables: self.local_variables,
            line_numbers: self.line_numbers,
            label_positions,
            max_locals: self.next_local,
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::jvm::code::Opcode;
    use crate::jvm::{Name, ParseDescriptor};

    fn header(name: &str, descriptor: &str, access_flags: MethodAccessFlags) -> MethodHeader {
        MethodHeader {
            owner: BinaryName::from_string("me/alec/Sample").unwrap(),
            name: UnqualifiedName::from_string(name).unwrap(),
            descriptor: MethodDescriptor::parse(descriptor).unwrap(),
            access_flags,
        }
    }

    #[test]
    fn empty_body() -> Result<(), Error> {
        let code = CodeBuilder::new(
            header("run", "()V", MethodAccessFlags::STATIC),
            Settings::default(),
        )?;
        let code = code.build()?;
        assert_eq!(code.instructions().len(), 2);
        assert_eq!(code.position(code.chunk.start), Some(0));
        assert_eq!(code.position(code.chunk.end), Some(1));
        assert_eq!(code.max_locals, 0);
        assert!(code.local_variables.is_empty());
        Ok(())
    }

    #[test]
    fn constructor_must_return_void() {
        let result = CodeBuilder::new(
            header("<init>", "(I)I", MethodAccessFlags::PUBLIC),
            Settings::default(),
        );
        assert!(matches!(result, Err(Error::NonVoidConstructor(t)) if t == FieldType::int()));
        assert!(CodeBuilder::new(
            header("<init>", "(I)V", MethodAccessFlags::PUBLIC),
            Settings::default(),
        )
        .is_ok());
    }

    #[test]
    fn parameters_and_locals() -> Result<(), Error> {
        let mut code = CodeBuilder::new(
            header("sum", "(JILjava/lang/String;)V", MethodAccessFlags::PUBLIC),
            Settings::default(),
        )?;
        assert_eq!(code.this_local()?, 0);
        assert_eq!(code.argument(0)?, 1);
        assert_eq!(code.argument(1)?, 3);
        assert_eq!(code.argument(2)?, 4);
        assert_eq!(code.argument_type(2)?, &FieldType::object(BinaryName::STRING));
        assert!(matches!(
            code.argument(3),
            Err(Error::ArgumentOutOfRange {
                index: 3,
                available: 3
            })
        ));

        let total = UnqualifiedName::from_string("total")?;
        let flag = UnqualifiedName::from_string("flag")?;
        assert_eq!(code.new_local(total, FieldType::double())?, 5);
        assert_eq!(code.new_local(flag, FieldType::boolean())?, 7);
        code.push_instruction(Instruction::Plain(Opcode::RETURN))?;

        let code = code.build()?;
        assert_eq!(code.max_locals, 8);
        let names: Vec<&str> = code
            .local_variables
            .iter()
            .map(|local| local.name.as_str())
            .collect();
        assert_eq!(names, vec!["this", "total", "flag"]);
        assert!(code
            .local_variables
            .iter()
            .all(|local| local.end == code.chunk.end));
        Ok(())
    }

    #[test]
    fn static_methods_have_no_this() -> Result<(), Error> {
        let code = CodeBuilder::new(
            header("run", "(I)V", MethodAccessFlags::STATIC),
            Settings::default(),
        )?;
        assert!(matches!(code.this_local(), Err(Error::MissingThis)));
        assert_eq!(code.argument(0)?, 0);
        Ok(())
    }

    #[test]
    fn local_variable_table_disabled() -> Result<(), Error> {
        let settings = Settings {
            local_variable_table: false,
            ..Settings::default()
        };
        let mut code = CodeBuilder::new(header("run", "()V", MethodAccessFlags::PUBLIC), settings)?;
        let tmp = UnqualifiedName::from_string("tmp")?;
        assert_eq!(code.new_local(tmp, FieldType::long())?, 1);
        let code = code.build()?;
        assert!(code.local_variables.is_empty());
        assert_eq!(code.max_locals, 3);
        assert_eq!(code.instructions().len(), 2);
        Ok(())
    }

    #[test]
    fn line_numbers() -> Result<(), Error> {
        let mut code = CodeBuilder::new(
            header("run", "()V", MethodAccessFlags::STATIC),
            Settings::default(),
        )?;
        code.line_number(10)?;
        code.push_instruction(Instruction::Plain(Opcode::NOP))?;
        code.line_number(11)?;
        code.push_instruction(Instruction::Plain(Opcode::RETURN))?;
        let code = code.build()?;

        let lines: Vec<u16> = code.line_numbers.iter().map(|line| line.line).collect();
        assert_eq!(lines, vec![10, 11]);
        assert_eq!(code.position(code.line_numbers[0].start), Some(1));
        assert_eq!(
            code.instructions()[2],
            Instruction::LineMark(10, code.line_numbers[0].start)
        );

        let mut silent = CodeBuilder::new(
            header("run", "()V", MethodAccessFlags::STATIC),
            Settings {
                line_numbers: false,
                ..Settings::default()
            },
        )?;
        silent.line_number(10)?;
        assert!(silent.build()?.line_numbers.is_empty());
        Ok(())
    }

    #[test]
    fn unbound_labels_rejected() -> Result<(), Error> {
        let mut code = CodeBuilder::new(
            header("run", "()V", MethodAccessFlags::STATIC),
            Settings::default(),
        )?;
        let nowhere = code.fresh_label();
        code.push_instruction(Instruction::Jump(Opcode::GOTO, nowhere))?;
        assert!(matches!(
            code.build(),
            Err(Error::UnboundLabels(labels)) if labels == vec![nowhere]
        ));
        Ok(())
    }

    #[test]
    fn label_marks_go_through_binding() -> Result<(), Error> {
        let mut code = CodeBuilder::new(
            header("run", "()V", MethodAccessFlags::STATIC),
            Settings::default(),
        )?;
        let label = code.fresh_label();
        code.push_instruction(Instruction::Plain(Opcode::RETURN))?;
        assert!(!code.is_reachable());
        code.push_instruction(Instruction::LabelMark(label))?;
        assert!(code.is_reachable());
        assert!(code.labels().is_bound(label));
        assert!(matches!(
            code.bind_label(label),
            Err(Error::DuplicateLabelBinding(_))
        ));
        Ok(())
    }
}
