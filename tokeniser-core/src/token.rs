//! # Átomos, Tokens e Sequências
//!
//! Antes de qualquer decisão estatística o texto é quebrado em **átomos**: cada caractere
//! separador (espaço, pontuação, aspas, apóstrofo...) vira um átomo próprio e cada sequência
//! contínua de não-separadores vira um único átomo. O tokenizador por padrões decide depois,
//! para cada átomo, se ele **junta** (JOIN) com o anterior ou **separa** (SEPARATE).
//!
//! ## Duas visões
//!
//! Uma [`TokenSequence`] guarda os átomos em duas visões:
//!
//! - **com espaços** ([`TokenSequence::with_whitespace`]): todos os átomos, inclusive os
//!   espaços entre palavras. É a visão usada pelo casamento de padrões (um padrão como
//!   `"parce que"` precisa ver o espaço explicitamente) e pela aritmética de offsets.
//! - **sem espaços** ([`TokenSequence::iter`], [`TokenSequence::get`]): apenas os tokens que
//!   não são espaço em branco. É a visão usada para indexar decisões e features.
//!
//! Invariante: removendo os espaços da visão completa obtém-se exatamente a visão sem espaços.
//!
//! ## Marcadores
//!
//! Um [`TokenPlaceholder`] (produzido por [`crate::filters::TokenRegexFilter`]) reserva um
//! trecho da sentença, como uma URL ou um número decimal, que vira **um único átomo**
//! mesmo contendo separadores. Nenhuma decisão da busca pode então partir o trecho.
//!
//! ## Exemplo
//!
//! ```rust
//! use tokeniser_core::token::{SeparatorClass, TokenSequence};
//!
//! let separators = SeparatorClass::default();
//! let atoms = TokenSequence::atomise("Il vient, parce que.", &separators);
//!
//! // "Il", " ", "vient", ",", " ", "parce", " ", "que", "."
//! assert_eq!(atoms.atom_count(), 9);
//! assert_eq!(atoms.len(), 6);
//! ```

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{Result, TokeniserError};

/// Classe de separadores padrão: espaços, pontuação Unicode e aspas/traços tipográficos.
pub const DEFAULT_SEPARATORS: &str = r"[\s\p{P}«»_‒–—―‛“”„‟′″‴‹›‘’‚*\x{FEFF}]";

/// Predicado de caracteres separadores, construído a partir de uma classe regex.
#[derive(Debug, Clone)]
pub struct SeparatorClass {
    source: String,
    /// Casa exatamente um separador (texto inteiro).
    single: Regex,
    /// Encontra um separador em qualquer ponto do texto.
    any: Regex,
}

impl SeparatorClass {
    /// Compila uma classe de separadores (ex: `[\s\p{P}]`).
    pub fn new(class: &str) -> Result<Self> {
        let compile = |regex: String| {
            Regex::new(&regex).map_err(|source| TokeniserError::InvalidRegex { regex, source })
        };
        Ok(Self {
            source: class.to_string(),
            single: compile(format!("^(?:{class})$"))?,
            any: compile(class.to_string())?,
        })
    }

    /// A expressão regular original.
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// O caractere `c` é um separador?
    pub fn is_separator_char(&self, c: char) -> bool {
        let mut buf = [0u8; 4];
        self.single.is_match(c.encode_utf8(&mut buf))
    }

    /// O texto inteiro é um único separador?
    pub fn is_separator(&self, text: &str) -> bool {
        self.single.is_match(text)
    }

    /// O texto contém pelo menos um separador?
    pub fn contains_separator(&self, text: &str) -> bool {
        self.any.is_match(text)
    }
}

impl Default for SeparatorClass {
    fn default() -> Self {
        Self::new(DEFAULT_SEPARATORS).expect("a classe de separadores padrão é uma regex válida")
    }
}

/// Um token (ou átomo) extraído do texto original.
///
/// O `Token` mantém a referência exata de sua posição no texto original (`start` e `end`),
/// o que garante que a concatenação de `original_text` da visão com espaços reconstrói a
/// sentença inteira, independente de quais átomos foram unidos.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Token {
    /// Texto de análise. Filtros podem reescrevê-lo (ex: "ETAT" -> "état").
    pub text: String,
    /// Texto exatamente como aparece na sentença.
    pub original_text: String,
    /// Índice de byte inicial no texto original (inclusive).
    pub start: usize,
    /// Índice de byte final no texto original (exclusivo).
    pub end: usize,
    /// Posição na visão sem espaços; `None` para espaços em branco.
    pub index: Option<usize>,
    /// Posição na visão com espaços.
    pub index_with_whitespace: usize,
    /// O átomo é um caractere separador.
    pub separator: bool,
    /// O token contém apenas espaços em branco.
    pub whitespace: bool,
}

impl Token {
    pub fn new(text: &str, start: usize, end: usize, separator: bool) -> Self {
        Self {
            text: text.to_string(),
            original_text: text.to_string(),
            start,
            end,
            index: None,
            index_with_whitespace: 0,
            separator,
            whitespace: text.trim().is_empty(),
        }
    }
}

/// Trecho da sentença que deve virar um único átomo.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenPlaceholder {
    /// Índice de byte inicial (inclusive).
    pub start: usize,
    /// Índice de byte final (exclusivo).
    pub end: usize,
    /// Texto de análise do átomo; `None` mantém o texto original.
    pub replacement: Option<String>,
    /// Expressão que produziu o marcador.
    pub regex: String,
}

/// Sequência ordenada de tokens com as visões "com espaços" e "sem espaços".
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TokenSequence {
    text: String,
    atoms: Vec<Token>,
    /// Posições (na visão com espaços) dos tokens que não são espaço.
    words: Vec<usize>,
}

impl TokenSequence {
    /// Quebra a sentença em átomos usando a classe de separadores.
    pub fn atomise(text: &str, separators: &SeparatorClass) -> Self {
        Self::atomise_with_placeholders(text, separators, &[])
    }

    /// Quebra a sentença em átomos, mantendo cada marcador como um átomo único.
    ///
    /// Marcadores vazios, fora da sentença ou que se sobrepõem a um marcador anterior (na
    /// ordem de início, o mais longo primeiro) são ignorados.
    pub fn atomise_with_placeholders(text: &str, separators: &SeparatorClass, placeholders: &[TokenPlaceholder]) -> Self {
        let mut sorted: Vec<&TokenPlaceholder> = placeholders
            .iter()
            .filter(|p| p.start < p.end && text.get(p.start..p.end).is_some())
            .collect();
        sorted.sort_by(|a, b| a.start.cmp(&b.start).then(b.end.cmp(&a.end)));

        let mut atoms = Vec::new();
        let mut cursor = 0;
        for placeholder in sorted {
            if placeholder.start < cursor {
                continue;
            }
            split_range(text, cursor, placeholder.start, separators, &mut atoms);
            let original = &text[placeholder.start..placeholder.end];
            let mut atom = Token::new(original, placeholder.start, placeholder.end, false);
            if let Some(replacement) = &placeholder.replacement {
                atom.text = replacement.clone();
            }
            atoms.push(atom);
            cursor = placeholder.end;
        }
        split_range(text, cursor, text.len(), separators, &mut atoms);

        Self::from_tokens(text, atoms)
    }

    /// Monta uma sequência a partir de tokens já recortados, recalculando os índices.
    pub fn from_tokens(text: &str, mut tokens: Vec<Token>) -> Self {
        let mut words = Vec::with_capacity(tokens.len());
        for (i, token) in tokens.iter_mut().enumerate() {
            token.index_with_whitespace = i;
            if token.whitespace {
                token.index = None;
            } else {
                token.index = Some(words.len());
                words.push(i);
            }
        }
        Self {
            text: text.to_string(),
            atoms: tokens,
            words,
        }
    }

    /// A sentença original.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Número de tokens que não são espaço.
    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    /// Número total de átomos, espaços incluídos.
    pub fn atom_count(&self) -> usize {
        self.atoms.len()
    }

    /// Token `index` da visão sem espaços.
    pub fn get(&self, index: usize) -> Option<&Token> {
        self.words.get(index).map(|&i| &self.atoms[i])
    }

    /// Átomo `index` da visão com espaços.
    pub fn atom(&self, index: usize) -> Option<&Token> {
        self.atoms.get(index)
    }

    /// Quantos tokens não-espaço aparecem antes do átomo `atom`.
    pub fn words_before(&self, atom: usize) -> usize {
        self.words.partition_point(|&w| w < atom)
    }

    /// Visão com espaços.
    pub fn with_whitespace(&self) -> &[Token] {
        &self.atoms
    }

    /// Itera pela visão sem espaços.
    pub fn iter(&self) -> impl Iterator<Item = &Token> {
        self.words.iter().map(move |&i| &self.atoms[i])
    }

    /// Acesso mutável aos tokens não-espaço (usado pelos filtros).
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Token> {
        self.atoms.iter_mut().filter(|t| !t.whitespace)
    }

    /// Textos de análise da visão sem espaços.
    pub fn texts(&self) -> Vec<&str> {
        self.iter().map(|t| t.text.as_str()).collect()
    }
}

/// Atomiza `text[from..to]`, com offsets relativos à sentença inteira.
fn split_range(text: &str, from: usize, to: usize, separators: &SeparatorClass, atoms: &mut Vec<Token>) {
    let mut current = String::new();
    let mut current_start = from;

    for (offset, ch) in text[from..to].char_indices() {
        let pos = from + offset;
        if separators.is_separator_char(ch) {
            flush_atom(atoms, &mut current, current_start, pos);
            let end = pos + ch.len_utf8();
            atoms.push(Token::new(&text[pos..end], pos, end, true));
        } else {
            if current.is_empty() {
                current_start = pos;
            }
            current.push(ch);
        }
    }
    flush_atom(atoms, &mut current, current_start, to);
}

/// Fecha o átomo acumulado e adiciona à lista (se não vazio)
fn flush_atom(atoms: &mut Vec<Token>, text: &mut String, start: usize, end: usize) {
    if !text.is_empty() {
        atoms.push(Token::new(text, start, end, false));
        text.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_atomise_splits_every_separator() {
        let atoms = TokenSequence::atomise("Moi, j'aime.", &SeparatorClass::default());
        let texts: Vec<&str> = atoms.with_whitespace().iter().map(|t| t.text.as_str()).collect();
        assert_eq!(texts, vec!["Moi", ",", " ", "j", "'", "aime", "."]);
        assert!(atoms.with_whitespace()[1].separator);
        assert!(!atoms.with_whitespace()[0].separator);
    }

    #[test]
    fn test_whitespace_view_invariant() {
        let atoms = TokenSequence::atomise("  a  b\tc ", &SeparatorClass::default());
        let filtered: Vec<&Token> = atoms.with_whitespace().iter().filter(|t| !t.whitespace).collect();
        let words: Vec<&Token> = atoms.iter().collect();
        assert_eq!(filtered, words);
        assert_eq!(atoms.texts(), vec!["a", "b", "c"]);
        assert_eq!(atoms.get(1).map(|t| t.index_with_whitespace), Some(5));
    }

    #[test]
    fn test_offsets_are_bytes() {
        let atoms = TokenSequence::atomise("été ça", &SeparatorClass::default());
        let first = atoms.get(0).unwrap();
        assert_eq!((first.start, first.end), (0, "été".len()));
        let last = atoms.get(1).unwrap();
        assert_eq!(&atoms.text()[last.start..last.end], "ça");
    }

    #[test]
    fn test_typographic_separators() {
        let separators = SeparatorClass::default();
        for c in ['«', '»', '’', '—', '*', '\u{feff}', '\'', '-', '.'] {
            assert!(separators.is_separator_char(c), "{c:?} deveria ser separador");
        }
        for c in ['a', 'é', '1', '+', '$'] {
            assert!(!separators.is_separator_char(c), "{c:?} não deveria ser separador");
        }
        assert!(separators.contains_separator("a-b"));
        assert!(!separators.contains_separator("ab"));
    }

    #[test]
    fn test_custom_separator_class() {
        let separators = SeparatorClass::new(r"[\s]").unwrap();
        let atoms = TokenSequence::atomise("a-b c", &separators);
        assert_eq!(atoms.texts(), vec!["a-b", "c"]);
    }

    fn placeholder(start: usize, end: usize, replacement: Option<&str>) -> TokenPlaceholder {
        TokenPlaceholder {
            start,
            end,
            replacement: replacement.map(String::from),
            regex: "test".into(),
        }
    }

    #[test]
    fn test_placeholder_becomes_single_atom() {
        let text = "voir www.exemple.fr, ou 3,5 kg";
        let separators = SeparatorClass::default();
        let placeholders = [placeholder(5, 19, None), placeholder(24, 27, Some("NOMBRE"))];
        let atoms = TokenSequence::atomise_with_placeholders(text, &separators, &placeholders);

        assert_eq!(atoms.texts(), vec!["voir", "www.exemple.fr", ",", "ou", "NOMBRE", "kg"]);
        let number = atoms.get(4).unwrap();
        assert_eq!(number.original_text, "3,5");
        assert!(!number.separator);
        let rebuilt: String = atoms.with_whitespace().iter().map(|t| t.original_text.as_str()).collect();
        assert_eq!(rebuilt, text);
    }

    #[test]
    fn test_overlapping_placeholders_keep_the_first() {
        let separators = SeparatorClass::default();
        // o mais longo que começa primeiro vence; o sobreposto e o inválido são ignorados
        let placeholders = [placeholder(2, 5, None), placeholder(0, 3, None), placeholder(0, 5, None), placeholder(9, 40, None)];
        let atoms = TokenSequence::atomise_with_placeholders("a-b-c d-e", &separators, &placeholders);
        assert_eq!(atoms.texts(), vec!["a-b-c", "d", "-", "e"]);
    }

    #[test]
    fn test_empty_text() {
        let atoms = TokenSequence::atomise("", &SeparatorClass::default());
        assert!(atoms.is_empty());
        assert_eq!(atoms.atom_count(), 0);
    }
}
