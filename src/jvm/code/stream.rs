use super::{CodeChunk, Instruction, Label, Labels, Opcode};
use crate::jvm::Error;

/// Ordered, append-only sequence of instructions between a start and an end label
///
/// A stream starts open, with its start label already placed. Closing it places the end label,
/// after which it can only be spliced into a parent stream or turned into a [`CodeChunk`].
///
/// ### Reachability
///
/// The stream tracks whether the next instruction could be reached by falling through from the
/// previous one. Unconditional terminators (returns, `goto`, `athrow`, switches) make the position
/// unreachable and placing any label makes it reachable again, since we don't know whether there
/// will be a jump to that label.
#[derive(Debug)]
pub struct InstructionStream {
    instructions: Vec<Instruction>,
    start: Label,
    end: Label,

    /// Current position can be reached by falling through
    reachable: bool,

    /// Reachability right before the end label got placed (only meaningful once closed)
    falls_through: bool,

    /// Some return instruction was emitted (sticky)
    returns: bool,

    /// Some `athrow` instruction was emitted (sticky)
    throws: bool,

    closed: bool,
}

impl InstructionStream {
    /// Open a new stream, placing its start label
    pub fn new(labels: &mut Labels) -> Result<InstructionStream, Error> {
        let start = labels.fresh_label();
        let end = labels.fresh_label();
        let mut stream = InstructionStream {
            instructions: vec![],
            start,
            end,
            reachable: true,
            falls_through: true,
            returns: false,
            throws: false,
            closed: false,
        };
        stream.bind_label(labels, start)?;
        Ok(stream)
    }

    pub fn start(&self) -> Label {
        self.start
    }

    pub fn end(&self) -> Label {
        self.end
    }

    pub fn is_reachable(&self) -> bool {
        self.reachable
    }

    /// Control could reach the end label by falling off the last instruction
    pub fn falls_through(&self) -> bool {
        if self.closed {
            self.falls_through
        } else {
            self.reachable
        }
    }

    pub fn returns(&self) -> bool {
        self.returns
    }

    pub fn throws(&self) -> bool {
        self.throws
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn instructions(&self) -> &[Instruction] {
        &self.instructions
    }

    /// Number of instructions (including label marks)
    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    fn check_open(&self) -> Result<(), Error> {
        if self.closed {
            Err(Error::StreamClosed(self.end))
        } else {
            Ok(())
        }
    }

    /// Add an instruction to the end of the stream
    ///
    /// Label marks are rejected: use [`InstructionStream::bind_label`] instead.
    pub fn append(&mut self, instruction: Instruction) -> Result<(), Error> {
        self.check_open()?;
        if let Instruction::LabelMark(label) = instruction {
            return Err(Error::UnregisteredLabelMark(label));
        }

        if let Some(opcode) = instruction.opcode() {
            if opcode.is_return() {
                self.returns = true;
            }
            if opcode == Opcode::ATHROW {
                self.throws = true;
            }
            if opcode.is_unconditional() {
                self.reachable = false;
            }
        }
        self.instructions.push(instruction);
        Ok(())
    }

    /// Place a label at the current end of the stream
    pub fn bind_label(&mut self, labels: &mut Labels, label: Label) -> Result<(), Error> {
        self.check_open()?;
        labels.bind(label)?;
        self.instructions.push(Instruction::LabelMark(label));
        self.reachable = true;
        Ok(())
    }

    /// Place the end label and freeze the stream
    pub fn close(&mut self, labels: &mut Labels) -> Result<(), Error> {
        self.check_open()?;
        let falls_through = self.reachable;
        self.bind_label(labels, self.end)?;
        self.falls_through = falls_through;
        self.closed = true;
        Ok(())
    }

    /// Move all of a closed child stream's instructions onto the end of this stream
    pub fn splice(&mut self, child: InstructionStream) -> Result<(), Error> {
        self.check_open()?;
        if !child.closed {
            return Err(Error::StreamNotClosed(child.end));
        }

        log::trace!(
            "Splicing {} instructions ({:?}..{:?})",
            child.instructions.len(),
            child.start,
            child.end
        );
        self.instructions.extend(child.instructions);
        self.returns |= child.returns;
        self.throws |= child.throws;
        self.reachable = true;
        Ok(())
    }

    /// Turn a closed stream into an immutable chunk
    pub fn into_chunk(self) -> Result<CodeChunk, Error> {
        if !self.closed {
            return Err(Error::StreamNotClosed(self.end));
        }
        Ok(CodeChunk {
            instructions: self.instructions,
            start: self.start,
            end: self.end,
        })
    }
}
