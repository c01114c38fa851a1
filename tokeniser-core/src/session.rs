//! # Sessão
//!
//! Contexto compartilhado por toda a tokenização: a classe de separadores e o léxico.
//! É passado explicitamente por referência ao compilador de padrões, às features e à busca
//! em feixe, em vez de viver num estado global.

use std::sync::Arc;

use crate::error::Result;
use crate::lexicon::{EmptyLexicon, Lexicon, MemoryLexicon};
use crate::token::SeparatorClass;

#[derive(Clone)]
pub struct TokeniserSession {
    separators: SeparatorClass,
    lexicon: Arc<dyn Lexicon>,
}

impl TokeniserSession {
    pub fn new(separators: SeparatorClass, lexicon: Arc<dyn Lexicon>) -> Self {
        Self { separators, lexicon }
    }

    /// Sessão com uma classe de separadores customizada e léxico vazio.
    pub fn with_separators(class: &str) -> Result<Self> {
        Ok(Self::new(SeparatorClass::new(class)?, Arc::new(EmptyLexicon)))
    }

    /// Separadores padrão e o léxico francês de demonstração.
    pub fn french() -> Self {
        Self::new(SeparatorClass::default(), Arc::new(MemoryLexicon::french()))
    }

    pub fn separators(&self) -> &SeparatorClass {
        &self.separators
    }

    pub fn lexicon(&self) -> &dyn Lexicon {
        self.lexicon.as_ref()
    }
}

impl Default for TokeniserSession {
    fn default() -> Self {
        Self::new(SeparatorClass::default(), Arc::new(EmptyLexicon))
    }
}

impl std::fmt::Debug for TokeniserSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokeniserSession")
            .field("separators", &self.separators.as_str())
            .finish_non_exhaustive()
    }
}
