//! # Features para Decisões de Tokenização
//!
//! Cada casamento de padrão é descrito ao classificador por um conjunto de features avaliadas
//! sobre o **token cabeça** do casamento (o primeiro átomo a testar) e seu contexto.
//!
//! ## Árvore fechada de expressões
//!
//! Em vez de uma hierarquia de classes, as features formam um único `enum`
//! ([`FeatureExpr`]) avaliado por um único interpretador ([`FeatureSet::evaluate`]).
//! Comportamentos transversais são variantes que envolvem outras:
//!
//! - [`FeatureExpr::Offset`] / [`FeatureExpr::PatternOffset`]: avaliam a feature interna em
//!   outro token (endereçamento).
//! - [`FeatureExpr::Cached`]: memoriza o valor por sentença.
//! - [`FeatureExpr::Named`]: renomeia o resultado.
//!
//! ## Ausência de valor
//!
//! Toda avaliação devolve `Option<FeatureValue>`. `None` significa "não se aplica aqui"
//! (ex: offset fora da frase) e é diferente de um `false` definitivo. Um `None` num
//! operando propaga para a expressão inteira, nunca para a sentença.
//!
//! ## Aritmética de offsets
//!
//! Offsets contam tokens **não-espaço**. Se o token corrente é um espaço, o primeiro passo
//! do offset leva ao vizinho não-espaço mais próximo na direção do offset: `Offset(-1)`
//! num espaço é a palavra imediatamente antes dele.
//!
//! ## Exemplo
//!
//! ```rust
//! use tokeniser_core::features::FeatureExpr;
//!
//! // "a palavra anterior ao padrão, em minúsculas"
//! let previous = FeatureExpr::PatternOffset { offset: -1, feature: Box::new(FeatureExpr::WordForm) };
//! assert_eq!(previous.name(), "PatternOffset(-1,WordForm())");
//! ```

use std::collections::HashMap;
use std::fmt;

use regex::Regex;
use serde::{Deserialize, Serialize};
use unicode_segmentation::UnicodeSegmentation;

use crate::error::{Result, TokeniserError};
use crate::lexicon::Lexicon;
use crate::matcher::{MatchAnnotations, PatternMatchSequence};
use crate::token::{Token, TokenSequence};

/// Valor de uma feature.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FeatureValue {
    Bool(bool),
    Int(i64),
    Double(f64),
    Text(String),
}

impl FeatureValue {
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            FeatureValue::Bool(b) => Some(*b),
            _ => None,
        }
    }
}

impl fmt::Display for FeatureValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FeatureValue::Bool(b) => write!(f, "{b}"),
            FeatureValue::Int(i) => write!(f, "{i}"),
            FeatureValue::Double(d) => write!(f, "{d}"),
            FeatureValue::Text(s) => f.write_str(s),
        }
    }
}

/// Resultado nomeado entregue ao classificador.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureResult {
    pub name: String,
    pub value: FeatureValue,
}

fn default_forward_start() -> i32 {
    1
}

fn default_backward_start() -> i32 {
    -1
}

/// Expressão de feature.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FeatureExpr {
    // === Token corrente ===
    /// Texto do token.
    Word,
    /// Texto em minúsculas.
    WordForm,
    /// Primeiros `n` grafemas.
    NLetterPrefix { n: usize },
    /// Últimos `n` grafemas.
    NLetterSuffix { n: usize },
    /// O texto inteiro casa a regex?
    Regex { pattern: String },
    /// Posição na visão sem espaços.
    TokenIndex,
    FirstWordInSentence,
    LastWordInSentence,
    /// O léxico não conhece a forma.
    UnknownWord,
    /// Etiquetas possíveis no léxico, separadas por `|`.
    LexiconPosTags,

    // === Casamento de padrão ===
    CurrentPattern,
    CurrentGroup,
    /// Texto coberto pelo casamento, em minúsculas.
    PatternWordForm,
    /// Índice do primeiro token do casamento na visão sem espaços.
    PatternIndexInSentence,
    /// Padrões que testam o átomo corrente, separados por `|` (lidos da tabela de anotações).
    TokeniserPatterns,

    // === Endereçamento ===
    Offset { offset: i32, feature: Box<FeatureExpr> },
    /// Offset relativo ao casamento: negativo conta a partir do primeiro token, positivo a
    /// partir do último.
    PatternOffset { offset: i32, feature: Box<FeatureExpr> },

    // === Busca ===
    /// Primeiro token para frente que satisfaz `criterion`; avalia `feature` nele.
    ForwardSearch {
        criterion: Box<FeatureExpr>,
        feature: Box<FeatureExpr>,
        #[serde(default = "default_forward_start")]
        start_offset: i32,
        #[serde(default)]
        end_offset: Option<i32>,
    },
    /// Primeiro token para trás que satisfaz `criterion`; avalia `feature` nele.
    BackwardSearch {
        criterion: Box<FeatureExpr>,
        feature: Box<FeatureExpr>,
        #[serde(default = "default_backward_start")]
        start_offset: i32,
        #[serde(default)]
        end_offset: Option<i32>,
    },
    /// Quantos tokens da janela satisfazem `criterion`.
    CountIf {
        criterion: Box<FeatureExpr>,
        start_offset: i32,
        end_offset: i32,
    },

    // === Lógica e composição ===
    And { features: Vec<FeatureExpr> },
    Or { features: Vec<FeatureExpr> },
    Not { feature: Box<FeatureExpr> },
    Equals { left: Box<FeatureExpr>, right: Box<FeatureExpr> },
    Concat { features: Vec<FeatureExpr> },
    Named { name: String, feature: Box<FeatureExpr> },
    Cached { feature: Box<FeatureExpr> },
}

impl FeatureExpr {
    /// Nome estável da feature, usado como chave no modelo.
    pub fn name(&self) -> String {
        let list = |features: &[FeatureExpr]| features.iter().map(FeatureExpr::name).collect::<Vec<_>>().join(",");
        match self {
            FeatureExpr::Word => "Word()".into(),
            FeatureExpr::WordForm => "WordForm()".into(),
            FeatureExpr::NLetterPrefix { n } => format!("NLetterPrefix({n})"),
            FeatureExpr::NLetterSuffix { n } => format!("NLetterSuffix({n})"),
            FeatureExpr::Regex { pattern } => format!("Regex(\"{pattern}\")"),
            FeatureExpr::TokenIndex => "TokenIndex()".into(),
            FeatureExpr::FirstWordInSentence => "FirstWordInSentence()".into(),
            FeatureExpr::LastWordInSentence => "LastWordInSentence()".into(),
            FeatureExpr::UnknownWord => "UnknownWord()".into(),
            FeatureExpr::LexiconPosTags => "LexiconPosTags()".into(),
            FeatureExpr::CurrentPattern => "CurrentPattern()".into(),
            FeatureExpr::CurrentGroup => "CurrentGroup()".into(),
            FeatureExpr::PatternWordForm => "PatternWordForm()".into(),
            FeatureExpr::PatternIndexInSentence => "PatternIndexInSentence()".into(),
            FeatureExpr::TokeniserPatterns => "TokeniserPatterns()".into(),
            FeatureExpr::Offset { offset, feature } => format!("Offset({offset},{})", feature.name()),
            FeatureExpr::PatternOffset { offset, feature } => format!("PatternOffset({offset},{})", feature.name()),
            FeatureExpr::ForwardSearch { criterion, feature, start_offset, end_offset } => format!(
                "ForwardSearch({},{},{start_offset},{})",
                criterion.name(),
                feature.name(),
                end_offset.map_or("*".to_string(), |e| e.to_string())
            ),
            FeatureExpr::BackwardSearch { criterion, feature, start_offset, end_offset } => format!(
                "BackwardSearch({},{},{start_offset},{})",
                criterion.name(),
                feature.name(),
                end_offset.map_or("*".to_string(), |e| e.to_string())
            ),
            FeatureExpr::CountIf { criterion, start_offset, end_offset } => {
                format!("CountIf({},{start_offset},{end_offset})", criterion.name())
            }
            FeatureExpr::And { features } => format!("And({})", list(features)),
            FeatureExpr::Or { features } => format!("Or({})", list(features)),
            FeatureExpr::Not { feature } => format!("Not({})", feature.name()),
            FeatureExpr::Equals { left, right } => format!("Equals({},{})", left.name(), right.name()),
            FeatureExpr::Concat { features } => format!("Concat({})", list(features)),
            FeatureExpr::Named { name, .. } => name.clone(),
            FeatureExpr::Cached { feature } => feature.name(),
        }
    }

    /// Atalho para `Offset`.
    pub fn offset(offset: i32, feature: FeatureExpr) -> Self {
        FeatureExpr::Offset { offset, feature: Box::new(feature) }
    }

    /// Atalho para `PatternOffset`.
    pub fn pattern_offset(offset: i32, feature: FeatureExpr) -> Self {
        FeatureExpr::PatternOffset { offset, feature: Box::new(feature) }
    }

    fn children(&self) -> Vec<&FeatureExpr> {
        match self {
            FeatureExpr::Offset { feature, .. }
            | FeatureExpr::PatternOffset { feature, .. }
            | FeatureExpr::Not { feature }
            | FeatureExpr::Named { feature, .. }
            | FeatureExpr::Cached { feature } => vec![feature],
            FeatureExpr::ForwardSearch { criterion, feature, .. }
            | FeatureExpr::BackwardSearch { criterion, feature, .. } => vec![criterion, feature],
            FeatureExpr::CountIf { criterion, .. } => vec![criterion],
            FeatureExpr::Equals { left, right } => vec![left, right],
            FeatureExpr::And { features } | FeatureExpr::Or { features } | FeatureExpr::Concat { features } => {
                features.iter().collect()
            }
            _ => Vec::new(),
        }
    }
}

/// Contexto de avaliação: um átomo da sentença e, opcionalmente, o casamento em análise e a
/// tabela de anotações da sentença.
#[derive(Debug, Clone, Copy)]
pub struct FeatureContext<'a, 'p> {
    pub tokens: &'a TokenSequence,
    /// Posição na visão com espaços.
    pub atom: usize,
    pub pattern_match: Option<&'a PatternMatchSequence<'p>>,
    pub annotations: Option<&'a MatchAnnotations<'p>>,
}

impl<'a, 'p> FeatureContext<'a, 'p> {
    /// Contexto do token cabeça de um casamento.
    pub fn for_match(tokens: &'a TokenSequence, pattern_match: &'a PatternMatchSequence<'p>) -> Self {
        Self {
            tokens,
            atom: pattern_match.head(),
            pattern_match: Some(pattern_match),
            annotations: None,
        }
    }

    /// Contexto de um átomo isolado, sem casamento corrente (busca por intervalos).
    pub fn for_atom(tokens: &'a TokenSequence, atom: usize, annotations: &'a MatchAnnotations<'p>) -> Self {
        Self {
            tokens,
            atom,
            pattern_match: None,
            annotations: Some(annotations),
        }
    }

    pub fn with_annotations(self, annotations: &'a MatchAnnotations<'p>) -> Self {
        Self {
            annotations: Some(annotations),
            ..self
        }
    }

    fn token(&self) -> Option<&'a Token> {
        self.tokens.atom(self.atom)
    }

    fn at_word(&self, word: usize) -> Option<Self> {
        let token = self.tokens.get(word)?;
        Some(Self {
            atom: token.index_with_whitespace,
            ..*self
        })
    }
}

/// Memória das features `Cached`, válida durante uma sentença.
#[derive(Debug, Default)]
pub struct FeatureCache {
    values: HashMap<(String, usize, Option<(usize, usize, String)>), Option<FeatureValue>>,
}

/// Índice (na visão sem espaços) do token a `offset` posições do átomo, sem limitar à frase.
///
/// Num espaço, o primeiro passo leva ao vizinho não-espaço na direção do offset.
fn relative_word(tokens: &TokenSequence, atom: usize, offset: i32) -> Option<i64> {
    let token = tokens.atom(atom)?;
    let offset = i64::from(offset);
    match token.index {
        Some(index) => Some(index as i64 + offset),
        None => {
            let before = tokens.words_before(atom) as i64;
            match offset.signum() {
                -1 => Some(before - 1 + offset + 1),
                1 => Some(before + offset - 1),
                _ => None,
            }
        }
    }
}

fn in_sentence(tokens: &TokenSequence, word: i64) -> Option<usize> {
    (0..tokens.len() as i64).contains(&word).then_some(word as usize)
}

/// Conjunto validado de features, com as regexes pré-compiladas.
#[derive(Debug, Clone)]
pub struct FeatureSet {
    features: Vec<FeatureExpr>,
    regexes: HashMap<String, Regex>,
}

impl FeatureSet {
    /// Valida as expressões. Offsets contraditórios e regexes inválidas são erros de
    /// configuração.
    pub fn new(features: Vec<FeatureExpr>) -> Result<Self> {
        let mut regexes = HashMap::new();
        let mut stack: Vec<&FeatureExpr> = features.iter().collect();
        while let Some(expr) = stack.pop() {
            validate(expr, &mut regexes)?;
            stack.extend(expr.children());
        }
        Ok(Self { features, regexes })
    }

    pub fn empty() -> Self {
        Self {
            features: Vec::new(),
            regexes: HashMap::new(),
        }
    }

    pub fn features(&self) -> &[FeatureExpr] {
        &self.features
    }

    /// Avalia todas as features, descartando as que não se aplicam.
    pub fn evaluate_all(&self, context: &FeatureContext, lexicon: &dyn Lexicon, cache: &mut FeatureCache) -> Vec<FeatureResult> {
        self.features
            .iter()
            .filter_map(|expr| {
                let value = self.evaluate(expr, context, lexicon, cache)?;
                Some(FeatureResult { name: expr.name(), value })
            })
            .collect()
    }

    /// O interpretador.
    pub fn evaluate(
        &self,
        expr: &FeatureExpr,
        context: &FeatureContext,
        lexicon: &dyn Lexicon,
        cache: &mut FeatureCache,
    ) -> Option<FeatureValue> {
        let mut eval = |e: &FeatureExpr, c: &FeatureContext| self.evaluate(e, c, lexicon, cache);

        match expr {
            FeatureExpr::Word => Some(FeatureValue::Text(context.token()?.text.clone())),
            FeatureExpr::WordForm => Some(FeatureValue::Text(context.token()?.text.to_lowercase())),
            FeatureExpr::NLetterPrefix { n } => {
                let graphemes: Vec<&str> = context.token()?.text.graphemes(true).collect();
                (graphemes.len() >= *n).then(|| FeatureValue::Text(graphemes[..*n].concat()))
            }
            FeatureExpr::NLetterSuffix { n } => {
                let graphemes: Vec<&str> = context.token()?.text.graphemes(true).collect();
                (graphemes.len() >= *n).then(|| FeatureValue::Text(graphemes[graphemes.len() - n..].concat()))
            }
            FeatureExpr::Regex { pattern } => {
                let regex = self.regexes.get(pattern)?;
                Some(FeatureValue::Bool(regex.is_match(&context.token()?.text)))
            }
            FeatureExpr::TokenIndex => Some(FeatureValue::Int(context.token()?.index? as i64)),
            FeatureExpr::FirstWordInSentence => Some(FeatureValue::Bool(context.token()?.index? == 0)),
            FeatureExpr::LastWordInSentence => {
                let index = context.token()?.index?;
                Some(FeatureValue::Bool(index + 1 == context.tokens.len()))
            }
            FeatureExpr::UnknownWord => {
                let token = context.token()?;
                Some(FeatureValue::Bool(lexicon.find_possible_pos_tags(&token.text).is_empty()))
            }
            FeatureExpr::LexiconPosTags => {
                let tags = lexicon.find_possible_pos_tags(&context.token()?.text);
                (!tags.is_empty()).then(|| FeatureValue::Text(tags.into_iter().collect::<Vec<_>>().join("|")))
            }

            FeatureExpr::CurrentPattern => Some(FeatureValue::Text(context.pattern_match?.pattern().name().to_string())),
            FeatureExpr::CurrentGroup => {
                let group = context.pattern_match?.pattern().group_name()?;
                Some(FeatureValue::Text(group.to_string()))
            }
            FeatureExpr::PatternWordForm => {
                let pattern_match = context.pattern_match?;
                let text: String = pattern_match
                    .covered_atoms()
                    .filter_map(|atom| context.tokens.atom(atom))
                    .map(|token| token.text.as_str())
                    .collect();
                Some(FeatureValue::Text(text.to_lowercase()))
            }
            FeatureExpr::PatternIndexInSentence => {
                let pattern_match = context.pattern_match?;
                let first = pattern_match
                    .covered_atoms()
                    .find_map(|atom| context.tokens.atom(atom).and_then(|t| t.index))?;
                Some(FeatureValue::Int(first as i64))
            }
            FeatureExpr::TokeniserPatterns => {
                let mut names: Vec<&str> = context
                    .annotations?
                    .for_atom(context.atom)
                    .iter()
                    .filter(|a| a.pattern.indexes_to_test().contains(&a.position))
                    .map(|a| a.pattern.name())
                    .collect();
                names.sort_unstable();
                names.dedup();
                (!names.is_empty()).then(|| FeatureValue::Text(names.join("|")))
            }

            FeatureExpr::Offset { offset, feature } => {
                let word = in_sentence(context.tokens, relative_word(context.tokens, context.atom, *offset)?)?;
                eval(feature, &context.at_word(word)?)
            }
            FeatureExpr::PatternOffset { offset, feature } => {
                let pattern_match = context.pattern_match?;
                let mut words = pattern_match
                    .covered_atoms()
                    .filter_map(|atom| context.tokens.atom(atom).and_then(|t| t.index));
                let base = if *offset < 0 { words.next()? } else { words.last()? };
                let word = in_sentence(context.tokens, base as i64 + i64::from(*offset))?;
                eval(feature, &context.at_word(word)?)
            }

            FeatureExpr::ForwardSearch { criterion, feature, start_offset, end_offset } => {
                let last = context.tokens.len() as i64 - 1;
                let start = relative_word(context.tokens, context.atom, *start_offset)?.max(0);
                let end = match end_offset {
                    Some(e) => relative_word(context.tokens, context.atom, *e)?.min(last),
                    None => last,
                };
                (start..=end).find_map(|word| {
                    let target = context.at_word(word as usize)?;
                    let found = eval(criterion, &target)?.as_bool()?;
                    found.then(|| eval(feature, &target)).flatten()
                })
            }
            FeatureExpr::BackwardSearch { criterion, feature, start_offset, end_offset } => {
                let last = context.tokens.len() as i64 - 1;
                let start = relative_word(context.tokens, context.atom, *start_offset)?.min(last);
                let end = match end_offset {
                    Some(e) => relative_word(context.tokens, context.atom, *e)?.max(0),
                    None => 0,
                };
                (end..=start).rev().find_map(|word| {
                    let target = context.at_word(word as usize)?;
                    let found = eval(criterion, &target)?.as_bool()?;
                    found.then(|| eval(feature, &target)).flatten()
                })
            }
            FeatureExpr::CountIf { criterion, start_offset, end_offset } => {
                let last = context.tokens.len() as i64 - 1;
                let start = relative_word(context.tokens, context.atom, *start_offset)?.max(0);
                let end = relative_word(context.tokens, context.atom, *end_offset)?.min(last);
                let count = (start..=end)
                    .filter_map(|word| context.at_word(word as usize))
                    .filter(|target| eval(criterion, target).and_then(|v| v.as_bool()) == Some(true))
                    .count();
                Some(FeatureValue::Int(count as i64))
            }

            FeatureExpr::And { features } => {
                let mut result = true;
                for feature in features {
                    result &= eval(feature, context)?.as_bool()?;
                }
                Some(FeatureValue::Bool(result))
            }
            FeatureExpr::Or { features } => {
                let mut result = false;
                for feature in features {
                    result |= eval(feature, context)?.as_bool()?;
                }
                Some(FeatureValue::Bool(result))
            }
            FeatureExpr::Not { feature } => Some(FeatureValue::Bool(!eval(feature, context)?.as_bool()?)),
            FeatureExpr::Equals { left, right } => {
                let left = eval(left, context)?;
                let right = eval(right, context)?;
                Some(FeatureValue::Bool(left == right))
            }
            FeatureExpr::Concat { features } => {
                let mut parts = Vec::with_capacity(features.len());
                for feature in features {
                    parts.push(eval(feature, context)?.to_string());
                }
                Some(FeatureValue::Text(parts.join("|")))
            }
            FeatureExpr::Named { feature, .. } => eval(feature, context),
            FeatureExpr::Cached { feature } => {
                let key = (
                    feature.name(),
                    context.atom,
                    context
                        .pattern_match
                        .map(|m| (m.first_atom(), m.end(), m.pattern().regexp().to_string())),
                );
                if let Some(value) = cache.values.get(&key) {
                    return value.clone();
                }
                let value = self.evaluate(feature, context, lexicon, cache);
                cache.values.insert(key, value.clone());
                value
            }
        }
    }
}

fn validate(expr: &FeatureExpr, regexes: &mut HashMap<String, Regex>) -> Result<()> {
    let invalid = |message: &str| {
        Err(TokeniserError::InvalidFeature {
            feature: expr.name(),
            message: message.to_string(),
        })
    };
    match expr {
        FeatureExpr::NLetterPrefix { n } | FeatureExpr::NLetterSuffix { n } if *n == 0 => {
            invalid("n precisa ser positivo")
        }
        FeatureExpr::PatternOffset { offset: 0, .. } => invalid("offset 0 não aponta para fora do padrão"),
        FeatureExpr::ForwardSearch { start_offset, end_offset, .. }
            if *start_offset < 0 || end_offset.is_some_and(|e| e < 0) =>
        {
            invalid("busca para frente exige offsets não-negativos")
        }
        FeatureExpr::BackwardSearch { start_offset, end_offset, .. }
            if *start_offset > 0 || end_offset.is_some_and(|e| e > 0) =>
        {
            invalid("busca para trás exige offsets não-positivos")
        }
        FeatureExpr::CountIf { start_offset, end_offset, .. } if start_offset > end_offset => {
            invalid("janela vazia: start_offset > end_offset")
        }
        FeatureExpr::Regex { pattern } => {
            if !regexes.contains_key(pattern) {
                let regex = format!("^(?:{pattern})$");
                let compiled = Regex::new(&regex).map_err(|source| TokeniserError::InvalidRegex { regex, source })?;
                regexes.insert(pattern.clone(), compiled);
            }
            Ok(())
        }
        _ => Ok(()),
    }
}

/// Vetor esparso de features numéricas, como o classificador MaxEnt as consome.
///
/// Features booleanas viram indicadores (`nome` -> 1.0 quando verdadeiras), textos e inteiros
/// viram categorias (`nome=valor` -> 1.0) e reais entram com o próprio valor.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FeatureVector {
    pub features: HashMap<String, f64>,
}

impl FeatureVector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: f64) {
        self.features.insert(key.into(), value);
    }

    /// Converte resultados de features, sempre incluindo o termo de viés.
    pub fn from_results(results: &[FeatureResult]) -> Self {
        let mut fv = Self::new();
        fv.insert("bias", 1.0);
        for result in results {
            match &result.value {
                FeatureValue::Bool(true) => fv.insert(result.name.clone(), 1.0),
                FeatureValue::Bool(false) => {}
                FeatureValue::Double(d) => fv.insert(result.name.clone(), *d),
                FeatureValue::Int(i) => fv.insert(format!("{}={i}", result.name), 1.0),
                FeatureValue::Text(s) => fv.insert(format!("{}={s}", result.name), 1.0),
            }
        }
        fv
    }
}
