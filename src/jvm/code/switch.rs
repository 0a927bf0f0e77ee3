use super::{CodeBuilder, Instruction, Label, Opcode};
use crate::jvm::Error;
use log::debug;
use std::collections::HashSet;

/// Which encoding to use for a switch
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum SwitchMode {
    /// Pick based on how densely the keys cover their range
    Auto,

    /// Always `tableswitch`
    Dense,

    /// Always `lookupswitch`
    Sparse,
}

/// One case of a `lookupswitch`
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub struct SwitchCase {
    pub value: i32,
    pub target: Label,
}

/// Most jump targets a `tableswitch` can have and still fit in the 65535 bytes of a method body
///
/// That is the opcode, up to 3 bytes of padding, the default offset, the bounds, and then 4
/// bytes per target.
pub const MAX_TABLE_SWITCH_LABELS: usize = (u16::MAX as usize - 1 - 3 - 12) / 4;

/// Smallest key and the number of values from there up to the largest key
fn key_range(keys: &[i32]) -> (i32, i64) {
    let min = keys.iter().copied().min().unwrap_or(0);
    let max = keys.iter().copied().max().unwrap_or(0);
    (min, i64::from(max) - i64::from(min) + 1)
}

/// Ratio of keys to the size of the range they span
fn density(keys: &[i32]) -> f64 {
    let (_, span) = key_range(keys);
    keys.len() as f64 / span as f64
}

impl CodeBuilder {
    /// Generate a switch on the `int` on top of the stack
    ///
    /// `case` is called once per key, in the order of `keys`, to generate the body for that key.
    /// `default` generates the body for every other value. Bodies that fall through jump to a
    /// label shared by the whole switch.
    ///
    /// ```text
    ///     tableswitch/lookupswitch
    /// case1:
    ///     <case 1>
    ///     goto end               // omitted when the case never falls through
    /// ...
    /// default:
    ///     <default>
    /// end:
    /// ```
    pub fn switch<T>(
        &mut self,
        keys: Vec<i32>,
        mode: SwitchMode,
        mut case: impl FnMut(&mut CodeBuilder, i32) -> Result<T, Error>,
        default: impl FnOnce(&mut CodeBuilder) -> Result<(), Error>,
    ) -> Result<Vec<T>, Error> {
        let mut seen = HashSet::new();
        for key in &keys {
            if !seen.insert(*key) {
                return Err(Error::DuplicateSwitchCase(*key));
            }
        }

        // Nothing to dispatch on
        if keys.is_empty() {
            debug!("Switch without cases, only generating the default");
            self.push_instruction(Instruction::Plain(Opcode::POP))?;
            let (default_block, ()) = self.nested(default)?;
            self.splice(default_block)?;
            return Ok(vec![]);
        }

        let (min, span) = key_range(&keys);
        let fits_table = span <= MAX_TABLE_SWITCH_LABELS as i64;
        let dense = match mode {
            SwitchMode::Dense if !fits_table => {
                return Err(Error::InvalidSwitchRange {
                    min,
                    count: usize::try_from(span).unwrap_or(usize::MAX),
                });
            }
            SwitchMode::Dense => true,
            SwitchMode::Sparse => false,
            SwitchMode::Auto => {
                let density = density(&keys);
                let dense = fits_table && density >= self.settings.switch_density_threshold;
                debug!(
                    "Switch on {} keys has density {:.3}, using {}",
                    keys.len(),
                    density,
                    if dense { "tableswitch" } else { "lookupswitch" }
                );
                dense
            }
        };
        if !dense {
            check_ascending(&keys)?;
        }

        let mut case_blocks = Vec::with_capacity(keys.len());
        let mut values = Vec::with_capacity(keys.len());
        for key in &keys {
            let (block, value) = self.nested(|code| case(code, *key))?;
            case_blocks.push(block);
            values.push(value);
        }
        let (default_block, ()) = self.nested(default)?;
        let end = default_block.end();

        if dense {
            let mut targets = vec![default_block.start(); span as usize];
            for (key, block) in keys.iter().zip(&case_blocks) {
                targets[(i64::from(*key) - i64::from(min)) as usize] = block.start();
            }
            self.table_switch(min, default_block.start(), targets)?;
        } else {
            let cases = keys
                .iter()
                .zip(&case_blocks)
                .map(|(value, block)| SwitchCase {
                    value: *value,
                    target: block.start(),
                })
                .collect();
            self.lookup_switch(default_block.start(), cases)?;
        }

        for block in case_blocks {
            let falls_through = block.falls_through();
            self.splice(block)?;
            if falls_through {
                self.push_instruction(Instruction::Jump(Opcode::GOTO, end))?;
            }
        }
        self.splice(default_block)?;

        Ok(values)
    }

    /// Emit a `tableswitch` covering `min..(min + labels.len())`
    ///
    /// There must be between 1 and [`MAX_TABLE_SWITCH_LABELS`] labels.
    pub fn table_switch(
        &mut self,
        min: i32,
        default: Label,
        labels: Vec<Label>,
    ) -> Result<(), Error> {
        let invalid_range = || Error::InvalidSwitchRange {
            min,
            count: labels.len(),
        };
        if labels.is_empty() || labels.len() > MAX_TABLE_SWITCH_LABELS {
            return Err(invalid_range());
        }
        let count = labels.len() as i64;
        let max = i32::try_from(i64::from(min) + count - 1).map_err(|_| invalid_range())?;

        self.push_instruction(Instruction::TableSwitch {
            min,
            max,
            default,
            labels,
        })
    }

    /// Emit a `lookupswitch`, with cases given in strictly ascending order
    pub fn lookup_switch(&mut self, default: Label, cases: Vec<SwitchCase>) -> Result<(), Error> {
        let keys: Vec<i32> = cases.iter().map(|case| case.value).collect();
        check_ascending(&keys)?;

        self.push_instruction(Instruction::LookupSwitch {
            default,
            keys,
            labels: cases.iter().map(|case| case.target).collect(),
        })
    }
}

fn check_ascending(keys: &[i32]) -> Result<(), Error> {
    for pair in keys.windows(2) {
        if pair[0] == pair[1] {
            return Err(Error::DuplicateSwitchCase(pair[0]));
        } else if pair[0] > pair[1] {
            return Err(Error::UnsortedSwitchKeys(keys.to_vec()));
        }
    }
    Ok(())
}
