//! Acode vocabulary: word types, sentinels, instruction encoding and the
//! enumerations shared between the loader, the interpreter and the world model.

use num_derive::FromPrimitive;
use serde::{Deserialize, Serialize};
use strum::{Display, IntoStaticStr};

pub type Aword = u32;
pub type Aaddr = u32;
pub type Aint = i32;

/// First word of the record following the last one in every table.
pub const END_OF_TABLE: Aword = 0xFFFF_FFFF;
/// Terminates the element list of a syntax.
pub const END_OF_SYNTAX: Aword = 0xFFFF_FFFE;

/// Location value of an instance that is not anywhere.
pub const NO_LOCATION: Aint = 0;
/// The predefined `nowhere` location instance.
pub const NOWHERE: Aint = 1;

/// Predefined attribute codes.
pub const OPAQUE_ATTRIBUTE: Aint = 1;
pub const VISITS_ATTRIBUTE: Aint = 2;

/// Header words are at most this many; older shapes are shorter.
pub const HEADER_WORDS: usize = 50;

/// Instruction classes kept in the top nibble of an instruction word.
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromPrimitive, Display)]
pub enum OpClass {
    Const = 0,
    StmOp = 1,
    CurVar = 2,
}

/// VM registers readable through `CURVAR` instructions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromPrimitive, Display, IntoStaticStr)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum CurVar {
    Param = 0,
    CurLoc,
    CurAct,
    CurVrb,
    Score,
    CurrentInstance,
    MaxInstance,
}

/// Statement operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromPrimitive, Display, IntoStaticStr)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum StmOp {
    Line = 0,
    Print,
    Style,
    Quit,
    Look,
    Save,
    Restore,
    List,
    Empty,
    Score,
    Visits,
    Schedule,
    Cancel,
    Locate,
    Make,
    Set,
    SetStr,
    SetSet,
    NewSet,
    Attribute,
    AttrStr,
    AttrSet,
    Union,
    Incr,
    Decr,
    Include,
    Exclude,
    SetSize,
    SetMemb,
    ContSize,
    ContMemb,
    Use,
    Stop,
    At,
    In,
    InSet,
    Here,
    Nearby,
    Near,
    Where,
    Location,
    Describe,
    Say,
    SayInt,
    SayStr,
    If,
    Else,
    EndIf,
    And,
    Or,
    Ne,
    Eq,
    StrEq,
    StrExact,
    Le,
    Ge,
    Lt,
    Gt,
    Plus,
    Minus,
    Mult,
    Div,
    Not,
    UMinus,
    Rnd,
    Return,
    System,
    Restart,
    Btw,
    Contains,
    Dup,
    Depend,
    DepCase,
    DepExec,
    DepElse,
    EndDep,
    Isa,
    Frame,
    SetLocal,
    GetLocal,
    EndFrame,
    Loop,
    LoopNext,
    LoopEnd,
    Sum,
    Max,
    Min,
    Count,
    Show,
    Play,
    Concat,
    Strip,
    Pop,
    Transcript,
    DupStr,
    GetStr,
}

/// Attribute code marking a container limit on the number of items.
pub const COUNT_LIMIT_ATTRIBUTE: Aint = 1 - StmOp::Count as Aint;

/// Containment sense for AT, IN, WHERE and friends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromPrimitive, Display)]
pub enum Transitivity {
    Transitive = 0,
    Direct = 1,
    Indirect = 2,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, FromPrimitive, Display)]
pub enum SayForm {
    Simple = 0,
    Definite,
    Indefinite,
    Negative,
    Pronoun,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, FromPrimitive, Display, Serialize, Deserialize)]
pub enum Style {
    Normal = 0,
    Emphasized,
    Preformatted,
    Alert,
    Quote,
}

/// Ordering qualifier of a verb alternative.
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromPrimitive, Display)]
pub enum Qualifier {
    Default = 0,
    After,
    Before,
    Only,
}

/// Bit numbers of `DictionaryEntry::class_bits`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromPrimitive)]
pub enum WordClass {
    Synonym = 0,
    Adjective,
    All,
    Except,
    Conjunction,
    Preposition,
    Direction,
    It,
    Noise,
    Noun,
    Them,
    Verb,
    Pronoun,
}

impl WordClass {
    pub const fn bit(self) -> Aword {
        1 << self as u32
    }
}

/// Index into the message table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromPrimitive, Display, IntoStaticStr)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum MsgKind {
    UnknownWord = 0,
    What,
    WhatWord,
    Multiple,
    Noun,
    AfterBut,
    ButAll,
    NotMuch,
    WhichOneStart,
    WhichOneComma,
    WhichOneOr,
    NoSuch,
    NoWay,
    Cant0,
    SeeStart,
    SeeComma,
    SeeAnd,
    SeeEnd,
    Contains,
    Carries,
    ContainsComma,
    ContainsAnd,
    ContainsEnd,
    Empty,
    EmptyHanded,
    CannotContain,
    Score,
    More,
    Again,
    SaveWhere,
    SaveOverwrite,
    SaveFailed,
    RestoreFrom,
    SaveMissing,
    NotASaveFile,
    SaveVers,
    SaveName,
    Really,
    QuitAction,
    Undone,
    NoUndo,
    WhichPronounStart,
    WhichPronounFirst,
    ImpossibleWith,
    ContainmentLoop,
    ContainmentLoop2,
    /// Aborts a command without printing anything.
    NoMsg,
}

// -------------------------
// Instruction words
// -------------------------

pub fn op_class(word: Aword) -> Aword {
    word >> 28
}

/// Operand field, sign-extended from bit 27.
pub fn operand(word: Aword) -> Aword {
    if word & 0x0800_0000 != 0 {
        word | 0xF000_0000
    } else {
        word & 0x0FFF_FFFF
    }
}

pub const fn stm(op: StmOp) -> Aword {
    ((OpClass::StmOp as Aword) << 28) | op as Aword
}

pub const fn curvar(var: CurVar) -> Aword {
    ((OpClass::CurVar as Aword) << 28) | var as Aword
}

pub const fn constant(value: Aint) -> Aword {
    (value as Aword) & 0x0FFF_FFFF
}

/// The word ending every statement stream.
pub const RETURN_WORD: Aword = stm(StmOp::Return);

#[cfg(test)]
mod tests {
    use super::*;
    use num_traits::FromPrimitive;
    use pretty_assertions::assert_eq;

    #[test]
    fn operands_are_sign_extended() {
        assert_eq!(operand(constant(-3)) as Aint, -3);
        assert_eq!(operand(constant(17)), 17);
        assert_eq!(op_class(stm(StmOp::Say)), OpClass::StmOp as Aword);
        assert_eq!(operand(curvar(CurVar::Score)), CurVar::Score as Aword);
    }

    #[test]
    fn opcode_numbering() {
        assert_eq!(StmOp::Return as u32, 65);
        assert_eq!(StmOp::Count as u32, 87);
        assert_eq!(StmOp::from_u32(95), Some(StmOp::GetStr));
        assert_eq!(COUNT_LIMIT_ATTRIBUTE, -86);
        assert_eq!(MsgKind::ContainmentLoop2 as u32 + 1, MsgKind::NoMsg as u32);
    }
}
