//! A small word-matching front end.
//!
//! Understands `VERB [noun phrase | preposition]...`, bare directions, `all`,
//! numbers, quoted strings and `undo`. Noun phrases are adjectives followed by
//! a noun and resolve to the present instances all their words refer to.

use arun_core::acode::{Aaddr, Aint, Aword, WordClass, END_OF_SYNTAX};
use arun_core::host::{Binding, Command, ParameterValue, ParseContext, ParsedParameter};
use arun_core::image::records::{DictionaryEntry, ElementEntry, ParameterMapEntry, SyntaxEntry, WordEntry};
use arun_core::Program;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("I don't know the word '{0}'.")]
    UnknownWord(String),
    #[error("I don't understand.")]
    NoVerb,
    #[error("You can't see any such thing.")]
    NoSuch,
    #[error("I don't know which one you mean.")]
    Ambiguous,
    #[error("That sentence doesn't make sense to me.")]
    BadSyntax,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    Word(String),
    Number(Aint),
    Quoted(String),
}

/// Split a line into lower-cased words, numbers and double-quoted strings.
pub fn tokenize(line: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut rest = line.trim();
    while !rest.is_empty() {
        if let Some(quoted) = rest.strip_prefix('"') {
            let end = quoted.find('"').unwrap_or(quoted.len());
            tokens.push(Token::Quoted(quoted[..end].to_string()));
            rest = quoted.get(end + 1..).unwrap_or("").trim_start();
            continue;
        }
        let end = rest.find(|c: char| c.is_whitespace() || c == ',' || c == '"').unwrap_or(rest.len());
        let word = &rest[..end];
        if !word.is_empty() {
            tokens.push(match word.parse::<Aint>() {
                Ok(n) => Token::Number(n),
                Err(_) => Token::Word(word.to_lowercase()),
            });
        }
        rest = rest[end..].trim_start_matches(|c: char| c.is_whitespace() || c == ',');
    }
    tokens
}

struct Word {
    index: usize,
    entry: DictionaryEntry,
}

impl Word {
    fn is(&self, class: WordClass) -> bool {
        self.entry.class_bits & class.bit() != 0
    }
}

/// A player phrase before it is matched against a syntax.
enum Phrase {
    Word(Word),
    Parameter(Binding),
}

/// Dictionary of a loaded program, keyed by lower-cased spelling.
pub struct Lexicon {
    words: Vec<(String, DictionaryEntry)>,
}

impl Lexicon {
    pub fn new(program: &Program) -> Self {
        let words = (0..)
            .map_while(|i| Some((program.word_string(i)?, program.dictionary_entry(i)?)))
            .map(|(text, entry)| (text.to_lowercase(), entry))
            .collect();
        Self { words }
    }

    fn lookup(&self, text: &str) -> Result<Word, ParseError> {
        self.words
            .iter()
            .position(|(w, _)| w == text)
            .map(|index| Word { index, entry: self.words[index].1 })
            .ok_or_else(|| ParseError::UnknownWord(text.to_string()))
    }

    pub fn parse(&self, tokens: &[Token], context: &ParseContext<'_>) -> Result<Command, ParseError> {
        let Some(first) = tokens.first() else {
            return Ok(Command::Empty);
        };
        let Token::Word(first) = first else {
            return Err(ParseError::NoVerb);
        };
        if first == "undo" && tokens.len() == 1 {
            return Ok(Command::Undo);
        }

        let verb = self.lookup(first)?;
        if tokens.len() == 1 && verb.is(WordClass::Direction) && !verb.is(WordClass::Verb) {
            return Ok(Command::Go { direction: verb.entry.code });
        }
        if !verb.is(WordClass::Verb) {
            return Err(ParseError::NoVerb);
        }

        let phrases = self.phrases(&tokens[1..], context)?;
        let (verb_code, parameters) = self.match_syntax(context.program, verb.entry.code, phrases)?;
        Ok(Command::Action { verb: verb_code, verb_word: Some(verb.index), parameters })
    }

    fn phrases(&self, tokens: &[Token], context: &ParseContext<'_>) -> Result<Vec<Phrase>, ParseError> {
        let mut phrases = Vec::new();
        let mut adjectives: Vec<Word> = Vec::new();
        for token in tokens {
            let word = match token {
                Token::Number(n) => {
                    phrases.push(Phrase::Parameter(literal(ParameterValue::Integer(*n))));
                    continue;
                }
                Token::Quoted(text) => {
                    phrases.push(Phrase::Parameter(literal(ParameterValue::Text(text.clone()))));
                    continue;
                }
                Token::Word(text) => self.lookup(text)?,
            };

            if word.is(WordClass::Noun) {
                adjectives.push(word);
                let binding = resolve(context, std::mem::take(&mut adjectives))?;
                phrases.push(Phrase::Parameter(binding));
            } else if word.is(WordClass::Adjective) {
                adjectives.push(word);
            } else if word.is(WordClass::All) {
                phrases.push(Phrase::Parameter(Binding::Multiple(everything(context))));
            } else if word.is(WordClass::Noise) || word.is(WordClass::Conjunction) {
                continue;
            } else {
                phrases.push(Phrase::Word(word));
            }
        }
        if !adjectives.is_empty() {
            // Trailing adjectives name a thing by themselves.
            phrases.push(Phrase::Parameter(resolve(context, adjectives)?));
        }
        Ok(phrases)
    }

    /// Walk the syntax tree of the verb word and map the parameters into the
    /// order the verb expects.
    fn match_syntax(
        &self,
        program: &Program,
        verb_word_code: Aint,
        phrases: Vec<Phrase>,
    ) -> Result<(Aint, Vec<Binding>), ParseError> {
        let header = program.header();
        let Some(syntax) = program.table::<SyntaxEntry>(header.syntax_table_address).find(|s| s.code == verb_word_code)
        else {
            // No syntax table: the word code is the verb itself.
            let parameters = phrases
                .into_iter()
                .filter_map(|p| match p {
                    Phrase::Parameter(b) => Some(b),
                    Phrase::Word(_) => None,
                })
                .collect();
            return Ok((verb_word_code, parameters));
        };

        let mut elements = syntax.elms;
        let mut parameters = Vec::new();
        for phrase in phrases {
            let list: Vec<ElementEntry> = program.table(elements).collect();
            let next = match &phrase {
                Phrase::Parameter(_) => list.iter().find(|e| e.code == 0),
                Phrase::Word(w) => list.iter().find(|e| e.code == w.index as Aint),
            };
            let Some(next) = next else {
                return Err(ParseError::BadSyntax);
            };
            if let Phrase::Parameter(binding) = phrase {
                parameters.push(binding);
            }
            elements = next.next;
        }

        let end = program.table::<ElementEntry>(elements).find(|e| e.code as Aword == END_OF_SYNTAX);
        let Some(end) = end else {
            return Err(ParseError::BadSyntax);
        };
        let syntax_number = end.flags as Aint;
        let Some(map) = program.table::<ParameterMapEntry>(header.parameter_map_address).find(|m| m.syntax_number == syntax_number)
        else {
            return Ok((verb_word_code, parameters));
        };

        let mut mapped = Vec::with_capacity(parameters.len());
        for WordEntry(from) in program.table::<WordEntry>(map.parameter_mapping) {
            let Some(binding) = parameters.get((from as usize).wrapping_sub(1)) else {
                return Err(ParseError::BadSyntax);
            };
            mapped.push(binding.clone());
        }
        if mapped.len() != parameters.len() {
            return Err(ParseError::BadSyntax);
        }
        Ok((map.verb_code, mapped))
    }
}

fn literal(value: ParameterValue) -> Binding {
    Binding::Single(ParsedParameter { value, words: Vec::new(), use_words: false })
}

fn refs(program: &Program, addr: Aaddr) -> Vec<Aint> {
    program.table::<WordEntry>(addr).map(|WordEntry(id)| id as Aint).collect()
}

/// The present instances every word of the phrase refers to.
fn resolve(context: &ParseContext<'_>, words: Vec<Word>) -> Result<Binding, ParseError> {
    let mut candidates: Vec<Aint> = context.present.to_vec();
    for word in &words {
        let mut referred = Vec::new();
        if word.is(WordClass::Noun) {
            referred.extend(refs(context.program, word.entry.noun_refs));
        }
        if word.is(WordClass::Adjective) {
            referred.extend(refs(context.program, word.entry.adjective_refs));
        }
        candidates.retain(|c| referred.contains(c));
    }
    match candidates.as_slice() {
        [] => Err(ParseError::NoSuch),
        [instance] => Ok(Binding::Single(ParsedParameter {
            value: ParameterValue::Instance(*instance),
            words: words.iter().map(|w| w.index).collect(),
            use_words: false,
        })),
        _ => Err(ParseError::Ambiguous),
    }
}

/// Objects the hero can see, for ALL.
fn everything(context: &ParseContext<'_>) -> Vec<ParsedParameter> {
    let header = context.program.header();
    let object = header.object_class_id as Aint;
    context
        .present
        .iter()
        .copied()
        .filter(|&i| i != header.the_hero as Aint)
        .filter(|&i| {
            context
                .program
                .instance(i)
                .is_some_and(|e| context.program.class_chain(e.parent).any(|(id, _)| id == object))
        })
        .map(ParsedParameter::instance)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use arun_core::testing::{ImageBuilder, HERO};
    use arun_core::Options;

    #[test]
    fn tokenize_words_numbers_and_strings() {
        assert_eq!(
            tokenize("  Put 3 \"Red Ball\" in,box "),
            vec![
                Token::Word("put".into()),
                Token::Number(3),
                Token::Quoted("Red Ball".into()),
                Token::Word("in".into()),
                Token::Word("box".into()),
            ]
        );
        assert!(tokenize("   ").is_empty());
    }

    fn game() -> anyhow::Result<(Program, Aint, Aint)> {
        let mut b = ImageBuilder::new();
        let hall = b.location("hall");
        b.hero_at(hall);
        let lamp = b.object("lamp", hall);
        b.word("lamp", WordClass::Noun, lamp);
        b.word("take", WordClass::Verb, 7);
        b.word("north", WordClass::Direction, 10);
        Ok((b.program(&Options::default())?, hall, lamp))
    }

    #[test]
    fn verbs_directions_and_undo() -> anyhow::Result<()> {
        let (program, hall, lamp) = game()?;
        let lexicon = Lexicon::new(&program);
        let present = [HERO, lamp];
        let context = ParseContext { program: &program, location: hall, present: &present };

        assert_eq!(lexicon.parse(&tokenize("north"), &context), Ok(Command::Go { direction: 10 }));
        assert_eq!(lexicon.parse(&tokenize("undo"), &context), Ok(Command::Undo));
        assert_eq!(lexicon.parse(&[], &context), Ok(Command::Empty));
        assert_eq!(lexicon.parse(&tokenize("xyzzy"), &context), Err(ParseError::UnknownWord("xyzzy".into())));

        let Ok(Command::Action { verb, parameters, .. }) = lexicon.parse(&tokenize("take lamp"), &context) else {
            panic!("take lamp did not parse");
        };
        assert_eq!(verb, 7);
        assert_eq!(parameters.len(), 1);
        assert!(matches!(&parameters[0], Binding::Single(p) if p.value == ParameterValue::Instance(lamp)));

        let absent = [HERO];
        let context = ParseContext { program: &program, location: hall, present: &absent };
        assert_eq!(lexicon.parse(&tokenize("take lamp"), &context), Err(ParseError::NoSuch));
        Ok(())
    }
}
