//! Saying instances: names, articles, forms and pronouns.

use crate::acode::{Aint, SayForm, Transitivity, WordClass};
use crate::error::Result;
use crate::host::Host;
use crate::image::records::{Article, DictionaryEntry};
use crate::syserr;
use crate::vm::Vm;
use crate::world::Value;

/// Which article slot of an instance or class to use.
#[derive(Debug, Clone, Copy)]
enum ArticleKind {
    Definite,
    Indefinite,
    Negative,
}

impl ArticleKind {
    fn missing(self) -> &'static str {
        match self {
            ArticleKind::Definite => "No default definite article",
            ArticleKind::Indefinite => "No default indefinite article",
            ArticleKind::Negative => "No default negative form",
        }
    }
}

impl<H: Host> Vm<H> {
    /// Run `f` with `current.instance` temporarily set to `instance`.
    pub(crate) fn with_current_instance<T>(
        &mut self,
        instance: Aint,
        f: impl FnOnce(&mut Self) -> Result<T>,
    ) -> Result<T> {
        let previous = std::mem::replace(&mut self.current.instance, instance);
        let result = f(self);
        self.current.instance = previous;
        result
    }

    fn hero_is_here(&self) -> Result<bool> {
        self.is_here(self.hero(), Transitivity::Transitive)
    }

    /// Say the plain name of an instance, or a literal's value.
    pub fn say(&mut self, instance: Aint) -> Result<()> {
        self.with_current_instance(instance, |vm| {
            if !vm.hero_is_here()? {
                return Ok(());
            }
            if vm.is_literal(instance) {
                vm.say_literal(instance)
            } else {
                vm.verify_instance(instance, "SAY")?;
                vm.say_instance(instance)
            }
        })
    }

    pub fn say_form(&mut self, instance: Aint, form: SayForm) -> Result<()> {
        self.with_current_instance(instance, |vm| {
            if vm.is_literal(instance) {
                return vm.say(instance);
            }
            match form {
                SayForm::Simple => vm.say(instance),
                SayForm::Definite => vm.say_article(instance, ArticleKind::Definite),
                SayForm::Indefinite => vm.say_article(instance, ArticleKind::Indefinite),
                SayForm::Negative => vm.say_article(instance, ArticleKind::Negative),
                SayForm::Pronoun => vm.say_pronoun(instance),
            }
        })
    }

    pub fn say_integer(&mut self, value: Aint) -> Result<()> {
        if self.hero_is_here()? {
            self.output(&value.to_string())?;
        }
        Ok(())
    }

    pub fn say_string(&mut self, text: &str) -> Result<()> {
        if self.hero_is_here()? {
            self.output(text)?;
        }
        Ok(())
    }

    fn say_literal(&mut self, literal: Aint) -> Result<()> {
        let Some(value) = self.literal(literal).map(|l| l.value.clone()) else {
            syserr!("Literal {} does not exist.", literal);
        };
        match value {
            Value::Int(v) => self.say_integer(v),
            Value::Str(s) => self.say_string(&s),
            Value::Set(_) => syserr!("Can't SAY a set literal."),
        }
    }

    /// Run the MENTIONED statements of the instance or its nearest class that
    /// has some.
    fn mention(&mut self, instance: Aint) -> Result<bool> {
        let Some(entry) = self.program.instance(instance) else {
            return Ok(false);
        };
        let mentioned = if entry.mentioned != 0 {
            entry.mentioned
        } else {
            match self.program.class_chain(entry.parent).find(|(_, c)| c.mentioned != 0) {
                Some((_, class)) => class.mentioned,
                None => return Ok(false),
            }
        };
        self.interpret(mentioned)?;
        Ok(true)
    }

    pub fn say_instance(&mut self, instance: Aint) -> Result<()> {
        if self.mention(instance)? {
            return Ok(());
        }
        match self.program.instance(instance) {
            Some(entry) => self.interpret(entry.name),
            None => syserr!("Can't SAY instance ({}).", instance),
        }
    }

    fn article_of(kind: ArticleKind, definite: Article, indefinite: Article, negative: Article) -> Article {
        match kind {
            ArticleKind::Definite => definite,
            ArticleKind::Indefinite => indefinite,
            ArticleKind::Negative => negative,
        }
    }

    /// Say an article (or a whole form) followed by the name unless the
    /// statements were a complete form.
    fn say_article(&mut self, instance: Aint, kind: ArticleKind) -> Result<()> {
        let Some(entry) = self.program.instance(instance) else {
            syserr!("Can't SAY instance ({}).", instance);
        };
        let own = Self::article_of(kind, entry.definite, entry.indefinite, entry.negative);
        let article = if own.address != 0 {
            own
        } else {
            let inherited = self
                .program
                .class_chain(entry.parent)
                .map(|(_, c)| Self::article_of(kind, c.definite, c.indefinite, c.negative))
                .find(|a| a.address != 0);
            match inherited {
                Some(article) => article,
                None => syserr!("{}", kind.missing()),
            }
        };
        self.interpret(article.address)?;
        if !article.is_form {
            self.say_instance(instance)?;
        }
        Ok(())
    }

    fn say_pronoun(&mut self, instance: Aint) -> Result<()> {
        let Some(entry) = self.program.instance(instance) else {
            syserr!("Can't SAY instance ({}).", instance);
        };
        let pronoun = if entry.pronoun != 0 {
            entry.pronoun
        } else {
            match self.program.class_chain(entry.parent).find(|(_, c)| c.pronoun != 0) {
                Some((_, class)) => class.pronoun,
                None => syserr!("No default pronoun"),
            }
        };
        let word = self.word_with_code(WordClass::Pronoun, pronoun)?;
        self.output(&word)
    }

    fn word_with_code(&self, class: WordClass, code: Aint) -> Result<String> {
        let header = self.program.header();
        let found = self
            .program
            .table::<DictionaryEntry>(header.dictionary)
            .find(|w| w.code == code && w.class_bits & class.bit() != 0);
        match found {
            Some(word) => Ok(self.program.string_at(word.string)),
            None => syserr!("Could not find word of class {} with code {}.", class.bit(), code),
        }
    }
}
