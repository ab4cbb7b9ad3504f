//! Binary persistence for parse tables.
//!
//! Layout, all fields little-endian:
//!
//! ```text
//! [start: i32] [action_count: i32] [goto_count: i32]
//! action_count x [state: i32] [terminal: i32] [(type << 30) | count: u32] [count x number: i32]
//! goto_count   x [state: i32] [nonterminal: i32] [target: i32]
//! ```
//!
//! Action types: 0 = shift (one number, the target state), 1 = reduce (the
//! candidate rules), 2 = accept (no numbers). The count occupies the low 30
//! bits of the packed word.

use crate::{
    grammar::{NonterminalID, RuleID, TerminalID},
    lr0::StateID,
    table::{Action, ParseTable},
    types::Map,
};
use std::io::{Read, Write};

const TYPE_SHIFT: u32 = 0;
const TYPE_REDUCE: u32 = 1;
const TYPE_ACCEPT: u32 = 2;
const COUNT_MASK: u32 = 0x3FFF_FFFF;

#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("i/o error")]
    Io(#[from] std::io::Error),

    #[error("unknown action type: {0}")]
    InvalidActionType(u32),

    #[error("reduction count {0} does not fit the 30-bit field")]
    CountOverflow(usize),

    #[error("encoded value {0} is out of range")]
    ValueOutOfRange(i64),

    #[error("malformed action entry")]
    MalformedAction,
}

impl ParseTable {
    /// Serialize the table.
    pub fn encode<W: Write>(&self, writer: &mut W) -> Result<(), CodecError> {
        write_i32(writer, i32::from(self.start_state.raw()))?;
        write_i32(writer, count_i32(self.actions.len())?)?;
        write_i32(writer, count_i32(self.gotos.len())?)?;

        for ((state, terminal), action) in &self.actions {
            write_i32(writer, i32::from(state.raw()))?;
            write_i32(writer, i32::from(terminal.raw()))?;
            match action {
                Action::Shift(to) => {
                    writer.write_all(&((TYPE_SHIFT << 30) | 1).to_le_bytes())?;
                    write_i32(writer, i32::from(to.raw()))?;
                }
                Action::Reduce(rules) => {
                    if rules.len() > COUNT_MASK as usize {
                        return Err(CodecError::CountOverflow(rules.len()));
                    }
                    writer.write_all(&((TYPE_REDUCE << 30) | rules.len() as u32).to_le_bytes())?;
                    for rule in rules {
                        write_i32(writer, i32::from(rule.raw()))?;
                    }
                }
                Action::Accept => {
                    writer.write_all(&(TYPE_ACCEPT << 30).to_le_bytes())?;
                }
            }
        }

        for ((state, nonterminal), to) in &self.gotos {
            write_i32(writer, i32::from(state.raw()))?;
            write_i32(writer, i32::from(nonterminal.raw()))?;
            write_i32(writer, i32::from(to.raw()))?;
        }

        Ok(())
    }

    /// Deserialize a table previously written by [`encode`](Self::encode).
    pub fn decode<R: Read>(reader: &mut R) -> Result<Self, CodecError> {
        let start_state = StateID::from_raw(read_id(reader)?);
        let action_count = read_len(reader)?;
        let goto_count = read_len(reader)?;

        let mut actions = Map::default();
        for _ in 0..action_count {
            let state = StateID::from_raw(read_id(reader)?);
            let terminal = TerminalID::new(read_id(reader)?);

            let word = read_u32(reader)?;
            let count = (word & COUNT_MASK) as usize;
            let action = match word >> 30 {
                TYPE_SHIFT => {
                    if count != 1 {
                        return Err(CodecError::MalformedAction);
                    }
                    Action::Shift(StateID::from_raw(read_id(reader)?))
                }
                TYPE_REDUCE => {
                    if count == 0 {
                        return Err(CodecError::MalformedAction);
                    }
                    let mut rules = Vec::with_capacity(count);
                    for _ in 0..count {
                        rules.push(RuleID::new(read_id(reader)?));
                    }
                    Action::Reduce(rules)
                }
                TYPE_ACCEPT => {
                    if count != 0 {
                        return Err(CodecError::MalformedAction);
                    }
                    Action::Accept
                }
                other => return Err(CodecError::InvalidActionType(other)),
            };
            actions.insert((state, terminal), action);
        }

        let mut gotos = Map::default();
        for _ in 0..goto_count {
            let state = StateID::from_raw(read_id(reader)?);
            let nonterminal = NonterminalID::new(read_id(reader)?);
            let to = StateID::from_raw(read_id(reader)?);
            gotos.insert((state, nonterminal), to);
        }

        Ok(Self {
            start_state,
            actions,
            gotos,
        })
    }
}

fn write_i32<W: Write>(writer: &mut W, value: i32) -> Result<(), CodecError> {
    writer.write_all(&value.to_le_bytes())?;
    Ok(())
}

fn count_i32(len: usize) -> Result<i32, CodecError> {
    i32::try_from(len).map_err(|_| CodecError::ValueOutOfRange(len as i64))
}

fn read_u32<R: Read>(reader: &mut R) -> Result<u32, CodecError> {
    let mut buf = [0u8; 4];
    reader.read_exact(&mut buf)?;
    Ok(u32::from_le_bytes(buf))
}

fn read_i32<R: Read>(reader: &mut R) -> Result<i32, CodecError> {
    let mut buf = [0u8; 4];
    reader.read_exact(&mut buf)?;
    Ok(i32::from_le_bytes(buf))
}

fn read_id<R: Read>(reader: &mut R) -> Result<u16, CodecError> {
    let value = read_i32(reader)?;
    u16::try_from(value).map_err(|_| CodecError::ValueOutOfRange(i64::from(value)))
}

fn read_len<R: Read>(reader: &mut R) -> Result<usize, CodecError> {
    let value = read_i32(reader)?;
    usize::try_from(value).map_err(|_| CodecError::ValueOutOfRange(i64::from(value)))
}
