//! # Decisões Padrão e Descritor de Padrões
//!
//! ## Resolvedor de separadores
//!
//! Antes de qualquer estatística cada átomo recebe uma decisão **padrão**. O resolvedor
//! percorre os átomos da esquerda para a direita carregando um único estado, a decisão
//! padrão do *próximo* átomo, que começa em SEPARATE (o primeiro átomo sempre abre um token).
//!
//! | regra                 | átomo atual | próximo átomo |
//! |-----------------------|-------------|---------------|
//! | `IS_SEPARATOR`        | SEPARATE    | SEPARATE      |
//! | `IS_NOT_SEPARATOR`    | JOIN        | JOIN          |
//! | `IS_SEPARATOR_BEFORE` | SEPARATE    | JOIN          |
//! | `IS_SEPARATOR_AFTER`  | JOIN        | SEPARATE      |
//!
//! Separadores sem regra são `IS_SEPARATOR`. Átomos que não são separadores herdam o estado.
//!
//! ## Formato do descritor
//!
//! ```text
//! # comentário
//! IS_NOT_SEPARATOR -
//! IS_SEPARATOR_AFTER '
//! parce que
//! ParceQue\tparce qu'
//! AussiBienQue\tAussiBien\taussi bien que
//! ```

use serde::{Deserialize, Serialize};

use crate::decision::TokeniserOutcome;
use crate::error::{Result, TokeniserError};
use crate::pattern::TokenPattern;
use crate::token::{SeparatorClass, TokenSequence};

/// Comportamento de um caractere separador.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SeparatorDecision {
    IsSeparator,
    IsNotSeparator,
    IsSeparatorBefore,
    IsSeparatorAfter,
}

impl SeparatorDecision {
    /// Palavras-chave aceitas no descritor.
    const KEYWORDS: [(&'static str, SeparatorDecision); 3] = [
        ("IS_NOT_SEPARATOR", SeparatorDecision::IsNotSeparator),
        ("IS_SEPARATOR_AFTER", SeparatorDecision::IsSeparatorAfter),
        ("IS_SEPARATOR_BEFORE", SeparatorDecision::IsSeparatorBefore),
    ];

    /// Decisão do átomo atual e decisão padrão carregada para o próximo.
    fn outcomes(self) -> (TokeniserOutcome, TokeniserOutcome) {
        use TokeniserOutcome::{Join, Separate};
        match self {
            SeparatorDecision::IsSeparator => (Separate, Separate),
            SeparatorDecision::IsNotSeparator => (Join, Join),
            SeparatorDecision::IsSeparatorBefore => (Separate, Join),
            SeparatorDecision::IsSeparatorAfter => (Join, Separate),
        }
    }
}

/// Uma linha da tabela de regras.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeparatorRule {
    pub decision: SeparatorDecision,
    pub characters: String,
}

impl SeparatorRule {
    fn matches(&self, text: &str) -> bool {
        let mut chars = text.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => self.characters.contains(c),
            _ => false,
        }
    }
}

/// Tabela de regras do resolvedor, na ordem do descritor.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SeparatorDefaults {
    rules: Vec<SeparatorRule>,
}

impl SeparatorDefaults {
    pub fn new(rules: Vec<SeparatorRule>) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &[SeparatorRule] {
        &self.rules
    }

    /// Primeira regra que casa o texto do separador.
    pub fn decision_for(&self, text: &str) -> SeparatorDecision {
        self.rules
            .iter()
            .find(|rule| rule.matches(text))
            .map_or(SeparatorDecision::IsSeparator, |rule| rule.decision)
    }

    /// Decisão padrão de cada átomo da visão com espaços.
    pub fn default_outcomes(&self, sequence: &TokenSequence, separators: &SeparatorClass) -> Vec<TokeniserOutcome> {
        let mut next = TokeniserOutcome::Separate;
        sequence
            .with_whitespace()
            .iter()
            .map(|atom| {
                if separators.is_separator(&atom.text) {
                    let (current, carried) = self.decision_for(&atom.text).outcomes();
                    next = carried;
                    current
                } else {
                    next
                }
            })
            .collect()
    }
}

/// O descritor de padrões interpretado e compilado.
#[derive(Debug, Clone)]
pub struct TokeniserPatternManager {
    descriptors: Vec<String>,
    separators: SeparatorClass,
    defaults: SeparatorDefaults,
    patterns: Vec<TokenPattern>,
}

impl TokeniserPatternManager {
    /// Interpreta as linhas do descritor, compilando todos os padrões.
    ///
    /// Qualquer padrão inválido é um erro de configuração e aborta a construção. A classe de
    /// separadores fica guardada no gerenciador: decisões padrão e casamentos sempre usam a
    /// mesma classe com que os padrões foram compilados.
    pub fn new<S: AsRef<str>>(descriptors: &[S], separators: &SeparatorClass) -> Result<Self> {
        let mut rules = Vec::new();
        let mut patterns = Vec::new();

        for (number, line) in descriptors.iter().map(|s| s.as_ref()).enumerate() {
            if line.starts_with('#') {
                continue;
            }
            if let Some(rule) = parse_rule(line) {
                rules.extend(rule);
                continue;
            }
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            let fields: Vec<&str> = line.split('\t').collect();
            let pattern = match fields.as_slice() {
                [dsl] => TokenPattern::compile(dsl, separators)?,
                [name, dsl] => TokenPattern::compile(dsl, separators)?.with_name(*name),
                [name, group, dsl] => TokenPattern::compile(dsl, separators)?
                    .with_name(*name)
                    .with_group(*group),
                _ => {
                    return Err(TokeniserError::InvalidDescriptor {
                        line: number + 1,
                        message: format!("esperados no máximo 3 campos separados por tab: `{line}`"),
                    })
                }
            };
            patterns.push(pattern);
        }

        Ok(Self {
            descriptors: descriptors.iter().map(|s| s.as_ref().to_string()).collect(),
            separators: separators.clone(),
            defaults: SeparatorDefaults::new(rules),
            patterns,
        })
    }

    /// Lê um descritor a partir de texto (uma entrada por linha).
    pub fn from_text(text: &str, separators: &SeparatorClass) -> Result<Self> {
        let lines: Vec<&str> = text.lines().collect();
        Self::new(&lines, separators)
    }

    /// As linhas originais, para persistir junto do modelo.
    pub fn descriptors(&self) -> &[String] {
        &self.descriptors
    }

    /// A classe de separadores com que o descritor foi compilado.
    pub fn separators(&self) -> &SeparatorClass {
        &self.separators
    }

    pub fn defaults(&self) -> &SeparatorDefaults {
        &self.defaults
    }

    /// Decisão padrão de cada átomo, com a classe de separadores do gerenciador.
    pub fn default_outcomes(&self, sequence: &TokenSequence) -> Vec<TokeniserOutcome> {
        self.defaults.default_outcomes(sequence, &self.separators)
    }

    /// Atomiza uma sentença com a classe de separadores do gerenciador.
    pub fn atomise(&self, text: &str) -> TokenSequence {
        TokenSequence::atomise(text, &self.separators)
    }

    pub fn patterns(&self) -> &[TokenPattern] {
        &self.patterns
    }
}

/// Linha de regra: `None` se a linha não começa com uma palavra-chave, `Some(None)` para
/// uma palavra-chave sem caracteres (a linha é consumida sem criar regra).
fn parse_rule(line: &str) -> Option<Option<SeparatorRule>> {
    SeparatorDecision::KEYWORDS.iter().find_map(|&(keyword, decision)| {
        let rest = line.strip_prefix(keyword)?;
        // "IS_NOT_SEPARATOR -": o primeiro caractere depois da palavra-chave é o espaçador
        let mut chars = rest.chars();
        let characters = chars.next().map(|_| chars.as_str()).unwrap_or_default();
        Some((!characters.is_empty()).then(|| SeparatorRule {
            decision,
            characters: characters.to_string(),
        }))
    })
}
