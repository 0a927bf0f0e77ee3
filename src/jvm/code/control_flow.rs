use super::{BranchCond, CodeBuilder, Instruction, Label, Opcode, TryCatchRegion};
use crate::jvm::annotations::Annotation;
use crate::jvm::{BinaryName, Error};
use std::collections::HashSet;

/// Handle to an enclosing block, for jumping out of it
#[derive(Copy, Clone, Debug)]
pub struct BlockHandle {
    /// Label placed right after the block
    pub exit: Label,
}

impl CodeBuilder {
    /// Generate a block with a label at its end
    ///
    /// Jumping to `handle.exit` from inside the body leaves the block.
    pub fn block<T>(
        &mut self,
        body: impl FnOnce(&mut CodeBuilder, BlockHandle) -> Result<T, Error>,
    ) -> Result<T, Error> {
        let (block, value) = self.nested(|code| {
            let handle = BlockHandle {
                exit: code.current.end(),
            };
            body(code, handle)
        })?;
        self.splice(block)?;
        Ok(value)
    }

    /// Generate code that only runs if a condition holds
    ///
    /// ```text
    ///     if !cond goto end
    ///     <then>
    /// end:
    /// ```
    pub fn if_then<T>(
        &mut self,
        cond: BranchCond,
        then: impl FnOnce(&mut CodeBuilder) -> Result<T, Error>,
    ) -> Result<T, Error> {
        let (then_block, value) = self.nested(then)?;
        self.push_instruction((!cond).into_instruction(then_block.end()))?;
        self.splice(then_block)?;
        Ok(value)
    }

    /// Generate a two-way conditional
    ///
    /// ```text
    ///     if !cond goto else
    ///     <then>
    ///     goto end               // omitted when `then` never falls through
    /// else:
    ///     <else>
    /// end:
    /// ```
    pub fn if_then_else<T, E>(
        &mut self,
        cond: BranchCond,
        then: impl FnOnce(&mut CodeBuilder) -> Result<T, Error>,
        els: impl FnOnce(&mut CodeBuilder) -> Result<E, Error>,
    ) -> Result<(T, E), Error> {
        let (then_block, then_value) = self.nested(then)?;
        let (else_block, else_value) = self.nested(els)?;

        self.push_instruction((!cond).into_instruction(else_block.start()))?;
        let then_falls_through = then_block.falls_through();
        self.splice(then_block)?;
        if then_falls_through {
            self.push_instruction(Instruction::Jump(Opcode::GOTO, else_block.end()))?;
        }
        self.splice(else_block)?;
        Ok((then_value, else_value))
    }

    /// Generate a `try` block and its exception handlers
    ///
    /// The handlers are registered through the [`CatchBuilder`] passed to `catches`. Every handler
    /// covers exactly the instructions of `try_body`, and control rejoins after the last handler.
    ///
    /// ```text
    /// start:
    ///     <try_body>
    /// end:
    ///     goto exit              // omitted when `try_body` never falls through
    /// handler1:
    ///     <catch 1>
    ///     goto exit              // omitted when the handler never falls through
    /// handler2:
    ///     <catch 2>
    /// exit:
    /// ```
    pub fn trying<T>(
        &mut self,
        try_body: impl FnOnce(&mut CodeBuilder) -> Result<T, Error>,
        catches: impl FnOnce(&mut CatchBuilder<'_>) -> Result<(), Error>,
    ) -> Result<T, Error> {
        let (try_block, value) = self.nested(try_body)?;
        if try_block
            .instructions()
            .iter()
            .all(|insn| insn.opcode().is_none())
        {
            return Err(Error::EmptyTryBody);
        }

        let start = try_block.start();
        let end = try_block.end();
        let falls_through = try_block.falls_through();
        self.splice(try_block)?;

        let exit = self.fresh_label();
        let mut catch_builder = CatchBuilder {
            code: self,
            start,
            end,
            exit,
            previous_falls_through: falls_through,
            caught: HashSet::new(),
        };
        catches(&mut catch_builder)?;
        self.bind_label(exit)?;
        Ok(value)
    }
}

/// Registers the exception handlers of a `try` block
pub struct CatchBuilder<'a> {
    code: &'a mut CodeBuilder,

    /// Range covered by the handlers
    start: Label,
    end: Label,

    /// Label placed after the last handler
    exit: Label,

    /// Whether the try body or latest handler could fall through into the next handler
    previous_falls_through: bool,

    /// Exception types already handled (`None` for catch-all)
    caught: HashSet<Option<BinaryName>>,
}

impl<'a> CatchBuilder<'a> {
    /// Label placed after the last handler
    pub fn exit(&self) -> Label {
        self.exit
    }

    /// Handle exceptions of one type
    ///
    /// The handler starts with the caught exception on top of the stack.
    pub fn catching(
        &mut self,
        exception: BinaryName,
        body: impl FnOnce(&mut CodeBuilder) -> Result<(), Error>,
    ) -> Result<(), Error> {
        self.handler(vec![(Some(exception), vec![])], body)
    }

    /// Handle exceptions of one type, recording type annotations on the caught type
    pub fn catching_annotated(
        &mut self,
        exception: BinaryName,
        annotations: Vec<Annotation>,
        body: impl FnOnce(&mut CodeBuilder) -> Result<(), Error>,
    ) -> Result<(), Error> {
        self.handler(vec![(Some(exception), annotations)], body)
    }

    /// Handle exceptions of several types with the same handler
    pub fn catching_multi(
        &mut self,
        exceptions: Vec<BinaryName>,
        body: impl FnOnce(&mut CodeBuilder) -> Result<(), Error>,
    ) -> Result<(), Error> {
        let exceptions = exceptions
            .into_iter()
            .map(|exception| (Some(exception), vec![]))
            .collect();
        self.handler(exceptions, body)
    }

    /// Handle exceptions of several types with the same handler, with type annotations for each
    pub fn catching_multi_annotated(
        &mut self,
        exceptions: Vec<(BinaryName, Vec<Annotation>)>,
        body: impl FnOnce(&mut CodeBuilder) -> Result<(), Error>,
    ) -> Result<(), Error> {
        let exceptions = exceptions
            .into_iter()
            .map(|(exception, annotations)| (Some(exception), annotations))
            .collect();
        self.handler(exceptions, body)
    }

    /// Handle every exception (like a `finally` handler)
    pub fn catching_all(
        &mut self,
        body: impl FnOnce(&mut CodeBuilder) -> Result<(), Error>,
    ) -> Result<(), Error> {
        self.handler(vec![(None, vec![])], body)
    }

    fn handler(
        &mut self,
        exceptions: Vec<(Option<BinaryName>, Vec<Annotation>)>,
        body: impl FnOnce(&mut CodeBuilder) -> Result<(), Error>,
    ) -> Result<(), Error> {
        if exceptions.is_empty() {
            return Err(Error::EmptyCatchTypes);
        }
        let mut new_types = HashSet::new();
        for (exception, _) in &exceptions {
            if self.caught.contains(exception) || !new_types.insert(exception.clone()) {
                return Err(Error::DuplicateCaughtException(exception.clone()));
            }
        }

        let (handler_block, ()) = self.code.nested(body)?;
        if self.previous_falls_through {
            self.code
                .push_instruction(Instruction::Jump(Opcode::GOTO, self.exit))?;
        }

        let handler = handler_block.start();
        for (exception_type, type_annotations) in exceptions {
            self.code.try_catch_regions.push(TryCatchRegion {
                start: self.start,
                end: self.end,
                handler,
                exception_type,
                type_annotations,
            });
        }
        self.caught.extend(new_types);
        self.previous_falls_through = handler_block.falls_through();
        self.code.splice(handler_block)
    }
}
