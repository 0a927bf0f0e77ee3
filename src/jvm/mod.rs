//! Build JVM method bodies
//!
//! Names, descriptors, access flags and annotation values are the vocabulary shared with whatever
//! class writer ends up consuming the generated code. The code generation proper is in [`code`].
//!
//! ### Simple example
//!
//! A static method adding its two `int` arguments:
//!
//! ```
//! use classgen::jvm::code::{ArithmeticOp, CodeBuilder, CodeBuilderExts, MethodHeader, Settings};
//! use classgen::jvm::*;
//!
//! # fn generate() -> Result<(), Error> {
//! let header = MethodHeader {
//!     owner: BinaryName::from_string("me/alec/Adder")?,
//!     name: UnqualifiedName::from_string("add")?,
//!     descriptor: MethodDescriptor::parse("(II)I")?,
//!     access_flags: MethodAccessFlags::PUBLIC + MethodAccessFlags::STATIC,
//! };
//! let mut code = CodeBuilder::new(header, Settings::default())?;
//! let (x, y) = (code.argument(0)?, code.argument(1)?);
//! code.get_local(x, &FieldType::int())?;
//! code.get_local(y, &FieldType::int())?;
//! code.arithmetic(ArithmeticOp::Add, &FieldType::int())?;
//! code.return_value(&FieldType::int())?;
//! let code = code.build()?;
//! assert_eq!(code.chunk.instructions.len(), 4 + 2);
//! # Ok(())
//! # }
//! # generate().unwrap();
//! ```

mod access_flags;
pub mod annotations;
mod binary_format;
pub mod code;
mod descriptors;
mod errors;
mod names;

pub use access_flags::*;
pub use binary_format::*;
pub use descriptors::*;
pub use errors::*;
pub use names::*;
