//! Method body generation
//!
//! A method body is an [`InstructionStream`]: instructions addressed by [`Label`]s, along with
//! whether the end of the stream is still reachable. Structured constructs (blocks, `if`,
//! `try`/`catch`, switches) generate their parts into child streams, then splice the closed
//! children into the parent once it is known which jumps are needed between them.
//!
//! [`CodeBuilder`] does the bookkeeping and [`CodeBuilderExts`] picks opcodes based on operand
//! types. [`CodeBuilder::build`] checks the labels and hands back a [`Code`].

mod code;
mod code_builder;
mod code_builder_exts;
mod control_flow;
mod instruction;
mod label;
mod opcode;
mod settings;
mod stream;
mod switch;

pub use code::*;
pub use code_builder::*;
pub use code_builder_exts::*;
pub use control_flow::*;
pub use instruction::*;
pub use label::*;
pub use opcode::*;
pub use settings::*;
pub use stream::*;
pub use switch::*;
