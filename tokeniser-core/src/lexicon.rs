//! # Léxico
//!
//! Consulta somente-leitura de palavras conhecidas, usada pelas features (`UnknownWord`,
//! `LexiconPosTags`) e pelos filtros de caixa (maiúsculas no início de frase, títulos em
//! caixa alta).
//!
//! O léxico completo é um serviço externo; aqui há apenas o contrato ([`Lexicon`]) e uma
//! implementação em memória ([`MemoryLexicon`]) suficiente para testes e para a demonstração.

use std::collections::{BTreeSet, HashMap};

use serde::{Deserialize, Serialize};

/// Uma entrada do léxico.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LexicalEntry {
    pub word: String,
    pub lemma: String,
    pub pos_tag: String,
}

/// Contrato do léxico. Implementações precisam ser seguras para leitura concorrente.
pub trait Lexicon: Send + Sync {
    /// Todas as etiquetas morfossintáticas possíveis para a forma exata `word`.
    fn find_possible_pos_tags(&self, word: &str) -> BTreeSet<String>;

    /// Entradas para `word`, opcionalmente restritas a uma etiqueta.
    fn find_lexical_entries(&self, word: &str, pos_tag: Option<&str>) -> Vec<LexicalEntry>;

    /// A forma exata é conhecida?
    fn contains(&self, word: &str) -> bool {
        !self.find_lexical_entries(word, None).is_empty()
    }
}

/// Léxico vazio: toda palavra é desconhecida.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmptyLexicon;

impl Lexicon for EmptyLexicon {
    fn find_possible_pos_tags(&self, _word: &str) -> BTreeSet<String> {
        BTreeSet::new()
    }

    fn find_lexical_entries(&self, _word: &str, _pos_tag: Option<&str>) -> Vec<LexicalEntry> {
        Vec::new()
    }
}

/// Léxico em memória indexado pela forma.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MemoryLexicon {
    entries: HashMap<String, Vec<LexicalEntry>>,
}

impl MemoryLexicon {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, word: &str, lemma: &str, pos_tag: &str) {
        self.entries.entry(word.to_string()).or_default().push(LexicalEntry {
            word: word.to_string(),
            lemma: lemma.to_string(),
            pos_tag: pos_tag.to_string(),
        });
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Pequeno léxico francês usado pela demonstração e pelos testes.
    pub fn french() -> Self {
        let mut lexicon = Self::new();
        for &(word, lemma, tag) in FRENCH_ENTRIES {
            lexicon.insert(word, lemma, tag);
        }
        lexicon
    }
}

impl Lexicon for MemoryLexicon {
    fn find_possible_pos_tags(&self, word: &str) -> BTreeSet<String> {
        self.entries
            .get(word)
            .map(|entries| entries.iter().map(|e| e.pos_tag.clone()).collect())
            .unwrap_or_default()
    }

    fn find_lexical_entries(&self, word: &str, pos_tag: Option<&str>) -> Vec<LexicalEntry> {
        self.entries
            .get(word)
            .map(|entries| {
                entries
                    .iter()
                    .filter(|e| pos_tag.map_or(true, |tag| e.pos_tag == tag))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// (forma, lema, etiqueta)
const FRENCH_ENTRIES: &[(&str, &str, &str)] = &[
    ("parce", "parce", "ADV"),
    ("que", "que", "CS"),
    ("que", "que", "PROREL"),
    ("qu'", "que", "CS"),
    ("aussi", "aussi", "ADV"),
    ("bien", "bien", "ADV"),
    ("bien", "bien", "NC"),
    ("il", "il", "CLS"),
    ("elle", "elle", "CLS"),
    ("je", "je", "CLS"),
    ("moi", "moi", "PRO"),
    ("la", "le", "DET"),
    ("le", "le", "DET"),
    ("les", "le", "DET"),
    ("de", "de", "P"),
    ("du", "de", "P+D"),
    ("des", "de", "P+D"),
    ("à", "à", "P"),
    ("a", "avoir", "V"),
    ("est", "être", "V"),
    ("été", "été", "NC"),
    ("été", "être", "VPP"),
    ("état", "état", "NC"),
    ("école", "école", "NC"),
    ("homme", "homme", "NC"),
    ("eau", "eau", "NC"),
    ("abord", "abord", "NC"),
    ("chante", "chanter", "V"),
    ("pleut", "pleuvoir", "V"),
    ("part", "partir", "V"),
    ("vient", "venir", "V"),
    ("reste", "rester", "V"),
    ("dort", "dormir", "V"),
    ("lui", "lui", "PRO"),
    ("toi", "toi", "PRO"),
    ("très", "très", "ADV"),
    ("fatigué", "fatiguer", "VPP"),
    ("français", "français", "ADJ"),
    ("société", "société", "NC"),
    ("générale", "général", "ADJ"),
    ("sa", "son", "DET"),
    ("sœur", "sœur", "NC"),
    ("et", "et", "CC"),
    ("mais", "mais", "CC"),
    ("non", "non", "ADV"),
    ("ici", "ici", "ADV"),
    ("demain", "demain", "ADV"),
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_lexicon_lookup() {
        let lexicon = MemoryLexicon::french();
        let tags = lexicon.find_possible_pos_tags("que");
        assert_eq!(tags.into_iter().collect::<Vec<_>>(), vec!["CS", "PROREL"]);
        assert_eq!(lexicon.find_lexical_entries("été", Some("VPP"))[0].lemma, "être");
        assert!(lexicon.contains("homme"));
        assert!(!lexicon.contains("Homme"));
    }

    #[test]
    fn test_empty_lexicon() {
        assert!(EmptyLexicon.find_possible_pos_tags("que").is_empty());
        assert!(!EmptyLexicon.contains("que"));
    }
}
