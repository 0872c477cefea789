//! Fixed-size records of the image tables.
//!
//! Each record is a run of host-order words. `Record::WORDS` is the stride used
//! to walk a table; a table ends at a record whose first word is
//! [`END_OF_TABLE`](crate::acode::END_OF_TABLE).

use crate::acode::{Aaddr, Aint, Aword};

/// A value occupying one or more consecutive words of a record.
pub trait Field: Sized {
    const WORDS: usize;
    fn take(words: &mut impl Iterator<Item = Aword>) -> Self;
    fn put(&self, out: &mut Vec<Aword>);
}

impl Field for u32 {
    const WORDS: usize = 1;
    fn take(words: &mut impl Iterator<Item = Aword>) -> Self {
        words.next().unwrap_or(0)
    }
    fn put(&self, out: &mut Vec<Aword>) {
        out.push(*self);
    }
}

impl Field for i32 {
    const WORDS: usize = 1;
    fn take(words: &mut impl Iterator<Item = Aword>) -> Self {
        words.next().unwrap_or(0) as i32
    }
    fn put(&self, out: &mut Vec<Aword>) {
        out.push(*self as Aword);
    }
}

/// Article or form statements of a class or instance.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Article {
    pub address: Aaddr,
    /// The statements produce the whole form, not just an article before the name.
    pub is_form: bool,
}

impl Field for Article {
    const WORDS: usize = 2;
    fn take(words: &mut impl Iterator<Item = Aword>) -> Self {
        let address = words.next().unwrap_or(0);
        let is_form = words.next().unwrap_or(0) != 0;
        Article { address, is_form }
    }
    fn put(&self, out: &mut Vec<Aword>) {
        out.push(self.address);
        out.push(self.is_form as Aword);
    }
}

pub trait Record: Sized {
    const WORDS: usize;
    fn from_words(words: &[Aword]) -> Self;
    fn put(&self, out: &mut Vec<Aword>);

    fn to_words(&self) -> Vec<Aword> {
        let mut out = Vec::with_capacity(Self::WORDS);
        self.put(&mut out);
        out
    }
}

macro_rules! record {
    ($(#[$meta:meta])* $name:ident { $($(#[$fmeta:meta])* $field:ident : $ty:ty),* $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
        pub struct $name {
            $($(#[$fmeta])* pub $field: $ty,)*
        }

        impl Record for $name {
            const WORDS: usize = 0 $(+ <$ty as Field>::WORDS)*;

            fn from_words(words: &[Aword]) -> Self {
                let mut it = words.iter().copied();
                Self {
                    $($field: <$ty as Field>::take(&mut it),)*
                }
            }

            fn put(&self, out: &mut Vec<Aword>) {
                $(self.$field.put(out);)*
            }
        }
    };
}

record! {
    DictionaryEntry {
        /// Address of a NUL-terminated string.
        string: Aaddr,
        class_bits: Aword,
        code: Aint,
        adjective_refs: Aaddr,
        noun_refs: Aaddr,
        pronoun_refs: Aaddr,
    }
}

record! {
    ClassEntry {
        code: Aint,
        id: Aaddr,
        parent: Aint,
        name: Aaddr,
        pronoun: Aint,
        initialize: Aaddr,
        description_checks: Aaddr,
        description: Aaddr,
        definite: Article,
        indefinite: Article,
        negative: Article,
        mentioned: Aaddr,
        verbs: Aaddr,
        entered: Aaddr,
    }
}

record! {
    InstanceEntry {
        code: Aint,
        id: Aaddr,
        parent: Aint,
        name: Aaddr,
        pronoun: Aint,
        initial_location: Aint,
        initialize: Aaddr,
        container: Aint,
        initial_attributes: Aaddr,
        checks: Aaddr,
        description: Aaddr,
        definite: Article,
        indefinite: Article,
        negative: Article,
        mentioned: Aaddr,
        verbs: Aaddr,
        entered: Aaddr,
        exits: Aaddr,
    }
}

record! {
    AttributeEntry {
        code: Aint,
        value: Aword,
        /// Address of the attribute name.
        id: Aaddr,
    }
}

record! {
    ExitEntry {
        code: Aint,
        checks: Aaddr,
        action: Aaddr,
        target: Aint,
    }
}

record! {
    ScriptEntry {
        code: Aint,
        id: Aaddr,
        description: Aaddr,
        steps: Aaddr,
    }
}

record! {
    StepEntry {
        after: Aaddr,
        exp: Aaddr,
        stms: Aaddr,
    }
}

record! {
    ContainerEntry {
        owner: Aint,
        /// Class an instance must belong to in order to be taken.
        class: Aint,
        limits: Aaddr,
        header: Aaddr,
        empty: Aaddr,
        extract_checks: Aaddr,
        extract_statements: Aaddr,
    }
}

record! {
    LimitEntry {
        atr: Aint,
        val: Aint,
        stms: Aaddr,
    }
}

record! {
    EventEntry {
        id: Aaddr,
        code: Aaddr,
    }
}

record! {
    RuleEntry {
        already_run: Aword,
        exp: Aaddr,
        stms: Aaddr,
    }
}

record! {
    VerbEntry {
        code: Aint,
        alts: Aaddr,
    }
}

record! {
    AltEntry {
        /// Parameter position the alternative is bound to, 0 for any.
        param: Aint,
        qual: Aword,
        checks: Aaddr,
        action: Aaddr,
    }
}

record! {
    CheckEntry {
        exp: Aaddr,
        stms: Aaddr,
    }
}

record! {
    MessageEntry {
        stms: Aaddr,
    }
}

record! {
    StringInitEntry {
        fpos: Aword,
        len: Aword,
        instance_code: Aint,
        attribute_code: Aint,
    }
}

record! {
    SetInitEntry {
        size: Aword,
        set_address: Aaddr,
        instance_code: Aint,
        attribute_code: Aint,
    }
}

record! {
    SourceFileEntry {
        fpos: Aword,
        len: Aword,
    }
}

record! {
    SourceLineEntry {
        file: Aint,
        line: Aint,
    }
}

record! {
    SyntaxEntry {
        code: Aint,
        elms: Aaddr,
        parameter_name_table: Aaddr,
    }
}

record! {
    /// Syntax entry of images before 3.0 beta 2.
    PreBeta2SyntaxEntry {
        code: Aint,
        elms: Aaddr,
    }
}

record! {
    ElementEntry {
        code: Aint,
        flags: Aword,
        /// Next element list, or the restrictions when `code` is end-of-syntax.
        next: Aaddr,
    }
}

record! {
    RestrictionEntry {
        parameter_number: Aint,
        kind: Aint,
        class: Aint,
        stms: Aaddr,
    }
}

record! {
    ParameterMapEntry {
        syntax_number: Aint,
        parameter_mapping: Aaddr,
        verb_code: Aint,
    }
}

/// A one-word record, used for word lists such as score or set init tables.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WordEntry(pub Aword);

impl Record for WordEntry {
    const WORDS: usize = 1;
    fn from_words(words: &[Aword]) -> Self {
        WordEntry(words.first().copied().unwrap_or(0))
    }
    fn put(&self, out: &mut Vec<Aword>) {
        out.push(self.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn record_sizes() {
        assert_eq!(DictionaryEntry::WORDS, 6);
        assert_eq!(ClassEntry::WORDS, 17);
        assert_eq!(InstanceEntry::WORDS, 21);
        assert_eq!(ContainerEntry::WORDS, 7);
        assert_eq!(AltEntry::WORDS, 4);
        assert_eq!(SyntaxEntry::WORDS, 3);
        assert_eq!(PreBeta2SyntaxEntry::WORDS, 2);
    }

    #[test]
    fn articles_span_two_words() {
        let inst = InstanceEntry {
            code: 3,
            definite: Article { address: 40, is_form: true },
            exits: 99,
            ..Default::default()
        };
        let words = inst.to_words();
        assert_eq!(words.len(), InstanceEntry::WORDS);
        assert_eq!(words[11..13], [40, 1]);
        assert_eq!(InstanceEntry::from_words(&words), inst);
    }
}
