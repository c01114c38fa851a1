//! # Compilador de Padrões
//!
//! Um padrão de tokenização é escrito numa DSL parecida com regex, mas que descreve uma
//! **sequência de átomos** em vez de uma sequência de caracteres. O compilador quebra a string
//! em *chunks*, um por átomo, sempre que encontra um separador:
//!
//! | DSL                | chunks                                   |
//! |--------------------|------------------------------------------|
//! | `parce que`        | `[pP]arce`, ` `, `que`                   |
//! | `.+qu'`            | `.+qu`, `'`                              |
//! | `.+\.\p`           | `.+`, `\.`, `\p`                         |
//! | `.+-t{-}elle`      | `.+`, `-`, `t`, `-`, `elle`              |
//!
//! ## Regras da varredura
//!
//! - Meta-caracteres (`. + ( ) | ^ ? !`) são absorvidos pelo chunk corrente.
//! - O hífen é separador fora de `[...]` e marcador de intervalo dentro.
//! - `\d`, `\D` e `\z` nunca quebram; `\p` (qualquer separador), `\s` (espaço), `\b`
//!   (espaço ou fronteira da sentença) e separadores escapados sempre quebram.
//! - Um agrupamento `[...]` só de separadores vira um chunk próprio.
//! - Posições entre `{` e `}` são apenas contexto: nunca são testadas.
//!
//! O primeiro chunk alfabético aceita também a forma maiúscula (com equivalências de vogais
//! acentuadas), para casar no início da frase.
//!
//! ## Índices a testar
//!
//! A decisão de um átomo é sobre a fronteira **antes** dele, então a posição 0 nunca é
//! testada. Também não são testadas as posições de classe de separador (`\s`, `\b`, `\p`) e
//! as posições dentro de `{...}`.

use std::fmt;

use regex::Regex;

use crate::error::{Result, TokeniserError};
use crate::token::{SeparatorClass, Token};

/// Meta-caracteres absorvidos sem quebrar o chunk.
const META_CHARACTERS: &str = ".+()|^?!";

/// Um padrão compilado.
#[derive(Debug, Clone)]
pub struct TokenPattern {
    regexp: String,
    name: String,
    group_name: Option<String>,
    chunks: Vec<PatternChunk>,
    indexes_to_test: Vec<usize>,
    separators: SeparatorClass,
}

/// O casador de uma única posição do padrão.
#[derive(Debug, Clone)]
pub struct PatternChunk {
    source: String,
    matcher: ChunkMatcher,
    separator_class: bool,
}

#[derive(Debug, Clone)]
enum ChunkMatcher {
    /// Contém `.+` ou `\D`: casa apenas átomos que não são separadores.
    NonSeparator(ChunkRegex),
    /// Sem nenhum separador: igualdade de strings.
    Literal(String),
    /// Separador escapado (ex: `\.`), comparado sem a barra.
    EscapedSeparator(String),
    /// Um único separador sem escape.
    Separator(String),
    /// `\b`: espaço em branco ou fronteira da sentença.
    Boundary,
    /// `\p`: qualquer separador.
    AnySeparator,
    Regex(ChunkRegex),
}

/// Regex ancorada de um chunk, com a exclusão opcional vinda de um `(?!...)` inicial.
#[derive(Debug, Clone)]
struct ChunkRegex {
    regex: Regex,
    exclusion: Option<Regex>,
}

impl ChunkRegex {
    fn compile(source: &str, pattern: &str) -> Result<Self> {
        let (exclusion, body) = match source.strip_prefix("(?!") {
            Some(rest) => {
                let close = group_end(rest).ok_or_else(|| TokeniserError::PatternSyntax {
                    pattern: pattern.to_string(),
                    message: format!("look-ahead sem `)` em `{source}`"),
                })?;
                (Some(&rest[..close]), &rest[close + 1..])
            }
            None => (None, source),
        };

        if ["(?=", "(?!", "(?<=", "(?<!"].iter().any(|l| body.contains(l)) {
            return Err(TokeniserError::PatternSyntax {
                pattern: pattern.to_string(),
                message: format!("look-around só é aceito no início do chunk: `{source}`"),
            });
        }

        Ok(Self {
            regex: compile_regex(format!("^(?:{body})$"))?,
            exclusion: exclusion
                .map(|x| compile_regex(format!("^(?:{x})")))
                .transpose()?,
        })
    }

    fn is_match(&self, text: &str) -> bool {
        if let Some(exclusion) = &self.exclusion {
            if exclusion.is_match(text) {
                return false;
            }
        }
        self.regex.is_match(text)
    }
}

fn compile_regex(regex: String) -> Result<Regex> {
    Regex::new(&regex).map_err(|source| TokeniserError::InvalidRegex { regex, source })
}

/// Posição (em bytes) do `)` que fecha o grupo já aberto, respeitando escapes e `[...]`.
fn group_end(s: &str) -> Option<usize> {
    let mut depth = 0usize;
    let mut escaped = false;
    let mut in_class = false;
    for (i, c) in s.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' => escaped = true,
            '[' => in_class = true,
            ']' => in_class = false,
            '(' if !in_class => depth += 1,
            ')' if !in_class => {
                if depth == 0 {
                    return Some(i);
                }
                depth -= 1;
            }
            _ => {}
        }
    }
    None
}

impl PatternChunk {
    /// Texto DSL do chunk (após a expansão de maiúsculas).
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Posição de classe de separador (`\s`, `\b`, `\p`).
    pub fn is_separator_class(&self) -> bool {
        self.separator_class
    }

    /// `\b`: também casa as sentinelas de início/fim da sentença.
    pub fn is_boundary(&self) -> bool {
        matches!(self.matcher, ChunkMatcher::Boundary)
    }

    /// O chunk casa o átomo? `None` representa a sentinela fora da sentença.
    pub fn matches(&self, atom: Option<&Token>, separators: &SeparatorClass) -> bool {
        let Some(atom) = atom else {
            return self.is_boundary();
        };
        let text = atom.text.as_str();
        match &self.matcher {
            ChunkMatcher::NonSeparator(regex) => !separators.is_separator(text) && regex.is_match(text),
            ChunkMatcher::Literal(literal)
            | ChunkMatcher::EscapedSeparator(literal)
            | ChunkMatcher::Separator(literal) => text == literal.as_str(),
            ChunkMatcher::Boundary => atom.whitespace,
            ChunkMatcher::AnySeparator => separators.is_separator(text),
            ChunkMatcher::Regex(regex) => regex.is_match(text),
        }
    }
}

impl TokenPattern {
    /// Compila a DSL. O nome padrão é a própria string.
    pub fn compile(regexp: &str, separators: &SeparatorClass) -> Result<Self> {
        let mut builder = ChunkBuilder {
            regexp,
            chars: regexp.chars().collect(),
            separators,
            chunks: Vec::new(),
            indexes_to_test: Vec::new(),
            starts_with_separator_class: false,
        };
        builder.scan()?;

        if builder.indexes_to_test.is_empty() {
            return Err(TokeniserError::NoIndexesToTest {
                pattern: regexp.to_string(),
            });
        }

        Ok(Self {
            regexp: regexp.to_string(),
            name: regexp.to_string(),
            group_name: None,
            chunks: builder.chunks,
            indexes_to_test: builder.indexes_to_test,
            separators: separators.clone(),
        })
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_group(mut self, group: impl Into<String>) -> Self {
        self.group_name = Some(group.into());
        self
    }

    /// A DSL original.
    pub fn regexp(&self) -> &str {
        &self.regexp
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Grupo que compartilha a identidade estatística (ex: "parce que" / "parce qu'").
    pub fn group_name(&self) -> Option<&str> {
        self.group_name.as_deref()
    }

    pub fn chunks(&self) -> &[PatternChunk] {
        &self.chunks
    }

    /// Número de átomos cobertos pelo padrão.
    pub fn token_count(&self) -> usize {
        self.chunks.len()
    }

    pub fn indexes_to_test(&self) -> &[usize] {
        &self.indexes_to_test
    }

    /// Textos DSL de cada chunk.
    pub fn sources(&self) -> Vec<&str> {
        self.chunks.iter().map(|c| c.source.as_str()).collect()
    }

    pub fn separators(&self) -> &SeparatorClass {
        &self.separators
    }

    /// O chunk `index` casa o átomo (ou a sentinela `None`)?
    pub fn chunk_matches(&self, index: usize, atom: Option<&Token>) -> bool {
        self.chunks
            .get(index)
            .is_some_and(|chunk| chunk.matches(atom, &self.separators))
    }

    pub fn starts_with_boundary(&self) -> bool {
        self.chunks.first().is_some_and(PatternChunk::is_boundary)
    }

    pub fn ends_with_boundary(&self) -> bool {
        self.chunks.last().is_some_and(PatternChunk::is_boundary)
    }
}

impl fmt::Display for TokenPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// Estado da varredura da DSL.
struct ChunkBuilder<'a> {
    regexp: &'a str,
    chars: Vec<char>,
    separators: &'a SeparatorClass,
    chunks: Vec<PatternChunk>,
    indexes_to_test: Vec<usize>,
    starts_with_separator_class: bool,
}

impl ChunkBuilder<'_> {
    fn scan(&mut self) -> Result<()> {
        let mut in_literal = false;
        let mut in_exception = false;
        let mut in_grouping = false;
        let mut grouping_has_letters = false;
        let mut grouping_has_separators = false;
        let mut grouping_start = 0;
        let mut current_start = 0;
        let mut current_end = 0;

        for i in 0..self.chars.len() {
            let c = self.chars[i];
            if !in_literal && c == '\\' {
                in_literal = true;
            } else if in_literal {
                if matches!(c, 'd' | 'D' | 'z') || in_grouping {
                    current_end = i + 1;
                } else {
                    self.push(current_start, current_end, in_exception)?;
                    self.push(i - 1, i + 1, in_exception)?;
                    current_start = i + 1;
                    current_end = i + 1;
                }
                in_literal = false;
            } else if c == '[' {
                in_grouping = true;
                grouping_has_letters = false;
                grouping_has_separators = false;
                grouping_start = i;
                current_end = i + 1;
            } else if c == ']' {
                if grouping_has_letters {
                    current_end = i + 1;
                } else {
                    if grouping_start > 0 {
                        self.push(current_start, grouping_start, in_exception)?;
                    }
                    self.push(grouping_start, i + 1, in_exception)?;
                    current_start = i + 1;
                    current_end = i + 1;
                }
                in_grouping = false;
            } else if c == '{' {
                self.push(current_start, current_end, in_exception)?;
                in_exception = true;
                current_start = i + 1;
                current_end = i + 1;
            } else if c == '}' {
                self.push(current_start, current_end, in_exception)?;
                in_exception = false;
                current_start = i + 1;
                current_end = i + 1;
            } else if META_CHARACTERS.contains(c) {
                current_end = i + 1;
            } else if c == '-' {
                if !in_grouping {
                    self.push(current_start, current_end, in_exception)?;
                    self.push(i, i + 1, in_exception)?;
                    current_start = i + 1;
                    current_end = i + 1;
                }
            } else if self.separators.is_separator_char(c) {
                if in_grouping {
                    if grouping_has_letters {
                        return Err(self.mixed_grouping(i));
                    }
                    grouping_has_separators = true;
                } else {
                    self.push(current_start, current_end, in_exception)?;
                    self.push(i, i + 1, in_exception)?;
                    current_start = i + 1;
                    current_end = i + 1;
                }
            } else {
                if in_grouping {
                    if grouping_has_separators {
                        return Err(self.mixed_grouping(i));
                    }
                    grouping_has_letters = true;
                }
                current_end = i + 1;
            }
        }
        self.push(current_start, current_end, in_exception)
    }

    fn mixed_grouping(&self, position: usize) -> TokeniserError {
        TokeniserError::MixedGrouping {
            pattern: self.regexp.to_string(),
            position,
        }
    }

    fn push(&mut self, start: usize, end: usize, in_exception: bool) -> Result<()> {
        if start >= end {
            return Ok(());
        }
        let raw: String = self.chars[start..end].iter().collect();
        let index = self.chunks.len();

        let (source, matcher, separator_class) = if raw == "\\p" {
            (raw, ChunkMatcher::AnySeparator, true)
        } else {
            let initial = index == 0 || (index == 1 && self.chunks[0].source == "\\b");
            let source = if initial {
                self.expand_initial_case(&raw)?
            } else {
                raw
            };
            let separator_class = source == "\\s" || source == "\\b";
            let matcher = self.classify(&source)?;
            (source, matcher, separator_class)
        };

        if separator_class && index == 0 {
            self.starts_with_separator_class = true;
        }
        let context_only = index == 0
            || (index == 1 && self.starts_with_separator_class)
            || in_exception
            || separator_class;
        if !context_only {
            self.indexes_to_test.push(index);
        }

        self.chunks.push(PatternChunk {
            source,
            matcher,
            separator_class,
        });
        Ok(())
    }

    /// Precedência de casamento, decidida uma única vez na compilação.
    fn classify(&self, source: &str) -> Result<ChunkMatcher> {
        if source.contains(".+") || source.contains("\\D") {
            return Ok(ChunkMatcher::NonSeparator(ChunkRegex::compile(source, self.regexp)?));
        }
        if !self.separators.contains_separator(source) {
            return Ok(ChunkMatcher::Literal(source.to_string()));
        }
        if let Some(escaped) = source.strip_prefix('\\') {
            if !["d", "s", "p", "b"].iter().any(|class| escaped.starts_with(class)) {
                return Ok(ChunkMatcher::EscapedSeparator(escaped.to_string()));
            }
        }
        if source.chars().count() == 1 {
            return Ok(ChunkMatcher::Separator(source.to_string()));
        }
        if source == "\\b" {
            return Ok(ChunkMatcher::Boundary);
        }
        Ok(ChunkMatcher::Regex(ChunkRegex::compile(source, self.regexp)?))
    }

    /// Aceita a forma maiúscula da primeira letra, inclusive em cada alternativa de `(a|b)`.
    fn expand_initial_case(&self, raw: &str) -> Result<String> {
        if !raw.starts_with('(') {
            return Ok(expand_first_letter(raw));
        }
        let close = raw.find(')').ok_or_else(|| TokeniserError::PatternSyntax {
            pattern: self.regexp.to_string(),
            message: format!("alternância sem `)` em `{raw}`"),
        })?;
        let (opening, inner) = match raw[1..close].strip_prefix("?!") {
            Some(inner) => ("(?!", inner),
            None => ("(", &raw[1..close]),
        };
        let parts: Vec<String> = inner
            .split('|')
            .filter(|part| !part.is_empty())
            .map(expand_first_letter)
            .collect();
        Ok(format!("{opening}{}{}", parts.join("|"), &raw[close..]))
    }
}

fn expand_first_letter(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next().and_then(case_class) {
        Some(class) => format!("{class}{}", chars.as_str()),
        None => s.to_string(),
    }
}

/// `[cC]`, `[éÉE]`... ou `None` se a letra não tem forma maiúscula distinta.
fn case_class(c: char) -> Option<String> {
    let mut upper = c.to_uppercase();
    let u = upper.next()?;
    if upper.next().is_some() || u == c {
        return None;
    }
    let mut class = String::from('[');
    class.push(c);
    class.push(u);
    if let Some(base) = unaccented_capital(c) {
        class.push(base);
    }
    class.push(']');
    Some(class)
}

/// Maiúsculas sem acento aceitas no início de frase (ex: "Etre" por "Être").
fn unaccented_capital(c: char) -> Option<char> {
    match c {
        'à' | 'â' => Some('A'),
        'é' | 'ê' => Some('E'),
        'ô' => Some('O'),
        'ç' => Some('C'),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::TokenSequence;

    fn compile(dsl: &str) -> TokenPattern {
        TokenPattern::compile(dsl, &SeparatorClass::default()).unwrap()
    }

    #[test]
    fn test_parce_que_chunks() {
        let pattern = compile("parce que");
        assert_eq!(pattern.sources(), vec!["[pP]arce", " ", "que"]);
        assert_eq!(pattern.indexes_to_test(), &[1, 2]);
        assert_eq!(pattern.name(), "parce que");
    }

    #[test]
    fn test_negative_lookahead_first_chunk() {
        let pattern = compile(r"(?![cdCD]\z|qu\z|jusqu\z).+'.+");
        assert_eq!(pattern.token_count(), 3);
        assert_eq!(pattern.sources()[0], r"(?![cdCD]\z|[qQ]u\z|[jJ]usqu\z).+");
        assert_eq!(pattern.sources()[1], "'");
        assert_eq!(pattern.sources()[2], ".+");
    }

    #[test]
    fn test_accented_initial_and_alternation() {
        let pattern = compile("être (de|d)");
        assert_eq!(pattern.sources(), vec!["[êÊE]tre", " ", "(de|d)"]);
        let pattern = compile("lors (de|du|des|d)");
        assert_eq!(pattern.sources()[0], "[lL]ors");
        let pattern = compile("(de|du) plus");
        assert_eq!(pattern.sources()[0], "([dD]e|[dD]u)");
    }

    #[test]
    fn test_escaped_and_any_separator() {
        let pattern = compile(r".+\.\p");
        assert_eq!(pattern.sources(), vec![".+", r"\.", r"\p"]);
        assert!(pattern.chunks()[2].is_separator_class());
        assert_eq!(pattern.indexes_to_test(), &[1]);

        let pattern = compile(".+qu'");
        assert_eq!(pattern.sources(), vec![".+qu", "'"]);

        // `\p` inicial, como `\b`, deixa a posição seguinte só como contexto
        let pattern = compile(r"\pqu'");
        assert_eq!(pattern.sources(), vec![r"\p", "qu", "'"]);
        assert_eq!(pattern.indexes_to_test(), &[2]);
    }

    #[test]
    fn test_separator_grouping_is_one_chunk() {
        let pattern = compile(r"\D+\.a[ \)]c[abc]");
        assert_eq!(pattern.sources(), vec![r"\D+", r"\.", "a", r"[ \)]", "c[abc]"]);
    }

    #[test]
    fn test_hyphen_and_exception_block() {
        let pattern = compile(".+-t-elle");
        assert_eq!(pattern.token_count(), 5);
        assert_eq!(pattern.indexes_to_test(), &[1, 2, 3, 4]);

        let pattern = compile(".+-t{-}elle");
        assert_eq!(pattern.token_count(), 5);
        assert_eq!(pattern.indexes_to_test(), &[1, 2, 4]);
    }

    #[test]
    fn test_hyphen_inside_grouping_is_range() {
        let pattern = compile("[a-z]+ que");
        assert_eq!(pattern.sources(), vec!["[a-z]+", " ", "que"]);
    }

    #[test]
    fn test_leading_boundary_skips_next_position() {
        let pattern = compile(r"\bparce que");
        assert_eq!(pattern.sources(), vec![r"\b", "[pP]arce", " ", "que"]);
        assert_eq!(pattern.indexes_to_test(), &[2, 3]);
        assert!(pattern.starts_with_boundary());
    }

    #[test]
    fn test_mixed_grouping_is_rejected() {
        let err = TokenPattern::compile("a[b,]c d", &SeparatorClass::default()).unwrap_err();
        assert!(matches!(err, TokeniserError::MixedGrouping { .. }));
        let err = TokenPattern::compile("a[,b]c d", &SeparatorClass::default()).unwrap_err();
        assert!(matches!(err, TokeniserError::MixedGrouping { .. }));
    }

    #[test]
    fn test_pattern_without_indexes_to_test() {
        let err = TokenPattern::compile("parce", &SeparatorClass::default()).unwrap_err();
        assert!(matches!(err, TokeniserError::NoIndexesToTest { .. }));
        let err = TokenPattern::compile(r"a\s", &SeparatorClass::default()).unwrap_err();
        assert!(matches!(err, TokeniserError::NoIndexesToTest { .. }));
    }

    #[test]
    fn test_unsupported_lookaround() {
        let err = TokenPattern::compile(r"a .+(?=x)", &SeparatorClass::default()).unwrap_err();
        assert!(matches!(err, TokeniserError::PatternSyntax { .. }));
    }

    #[test]
    fn test_chunk_matching_precedence() {
        let separators = SeparatorClass::default();
        let atoms = TokenSequence::atomise("Jusqu'ici l'eau , 12", &separators);
        let atom = |i: usize| atoms.atom(i);
        // "Jusqu", "'", "ici", " ", "l", "'", "eau", " ", ",", " ", "12"
        let pattern = compile(r"(?![cdCD]\z|qu\z|jusqu\z).+'.+");
        assert!(!pattern.chunk_matches(0, atom(0)), "jusqu é excluído pelo look-ahead");
        assert!(pattern.chunk_matches(0, atom(4)));
        assert!(pattern.chunk_matches(1, atom(1)));
        assert!(!pattern.chunk_matches(2, atom(8)), ".+ não casa separadores");

        let pattern = compile(r"\d+ ,");
        assert!(pattern.chunk_matches(0, atom(10)));

        let pattern = compile(r"\b, \p");
        assert!(pattern.chunk_matches(0, atom(3)));
        assert!(pattern.chunk_matches(0, None));
        assert!(!pattern.chunk_matches(0, atom(2)));
        assert!(pattern.chunk_matches(3, atom(8)));
        assert!(!pattern.chunk_matches(3, atom(6)));
    }
}
