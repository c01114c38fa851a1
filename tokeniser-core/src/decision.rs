//! # Decisões de Tokenização
//!
//! Cada átomo recebe um veredito binário: **JOIN** (o átomo se une ao token anterior) ou
//! **SEPARATE** (o átomo começa um token novo). Uma [`Decision`] carrega o veredito, sua
//! probabilidade e as "autoridades" (regras ou padrões) que a produziram: informação de
//! proveniência usada para depuração e para gerar dados de treino, nunca para o algoritmo.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::features::FeatureResult;

/// Autoridade das decisões produzidas pelo resolvedor de separadores.
pub const AUTHORITY_DEFAULT: &str = "_DefaultDecision";
/// Autoridade das decisões estatísticas tomadas no token cabeça de um padrão.
pub const AUTHORITY_PATTERNS: &str = "_Patterns";
/// Autoridade das decisões anexadas aos demais tokens de um padrão escolhido.
pub const AUTHORITY_IN_SEQUENCE: &str = "_DecisionInSequence";
pub const AUTHORITY_IN_SEQUENCE_NON_DEFAULT: &str = "_DecisionInSequence_non_default";
/// Autoridade de um átomo coberto por algum padrão mas que ficou com a decisão padrão.
pub const AUTHORITY_IN_SEQUENCE_DEFAULT: &str = "_DecisionInSequence_default";
/// Autoridade das decisões estatísticas da busca por intervalos.
pub const AUTHORITY_INTERVAL: &str = "_IntervalPatternTokeniser";
/// Autoridade das decisões do modo simples.
pub const AUTHORITY_SIMPLE: &str = "_SimpleTokeniser";

/// Os dois resultados possíveis para a fronteira antes de um átomo.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TokeniserOutcome {
    /// O átomo se une ao token anterior.
    #[serde(alias = "DOES_NOT_SEPARATE")]
    Join,
    /// O átomo inicia um novo token.
    #[serde(alias = "DOES_SEPARATE")]
    Separate,
}

impl TokeniserOutcome {
    /// Todos os resultados, em ordem estável.
    pub const ALL: [TokeniserOutcome; 2] = [TokeniserOutcome::Join, TokeniserOutcome::Separate];

    /// O resultado oposto.
    pub fn opposite(self) -> Self {
        match self {
            TokeniserOutcome::Join => TokeniserOutcome::Separate,
            TokeniserOutcome::Separate => TokeniserOutcome::Join,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TokeniserOutcome::Join => "JOIN",
            TokeniserOutcome::Separate => "SEPARATE",
        }
    }
}

impl fmt::Display for TokeniserOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TokeniserOutcome {
    type Err = String;

    /// Aceita também os rótulos legados `DOES_SEPARATE` / `DOES_NOT_SEPARATE`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "JOIN" | "DOES_NOT_SEPARATE" => Ok(TokeniserOutcome::Join),
            "SEPARATE" | "DOES_SEPARATE" => Ok(TokeniserOutcome::Separate),
            other => Err(format!("resultado desconhecido: {other}")),
        }
    }
}

/// Um veredito para um átomo.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Decision {
    pub outcome: TokeniserOutcome,
    pub probability: f64,
    /// Decisões estatísticas entram no score da hipótese; decisões padrão não.
    pub statistical: bool,
    /// Regras/padrões que produziram a decisão.
    pub authorities: Vec<String>,
}

impl Decision {
    /// Decisão estatística com a probabilidade dada.
    pub fn new(outcome: TokeniserOutcome, probability: f64) -> Self {
        Self {
            outcome,
            probability,
            statistical: true,
            authorities: Vec::new(),
        }
    }

    /// Decisão padrão (não estatística, probabilidade 1).
    pub fn default_decision(outcome: TokeniserOutcome) -> Self {
        Self {
            outcome,
            probability: 1.0,
            statistical: false,
            authorities: Vec::new(),
        }
    }

    pub fn with_authority(mut self, authority: impl Into<String>) -> Self {
        self.authorities.push(authority.into());
        self
    }

    pub fn add_authority(&mut self, authority: impl Into<String>) {
        self.authorities.push(authority.into());
    }
}

/// Um átomo (pela sua posição na visão com espaços) com a decisão tomada para ele.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaggedToken {
    pub atom: usize,
    pub decision: Decision,
}

impl TaggedToken {
    pub fn new(atom: usize, decision: Decision) -> Self {
        Self { atom, decision }
    }
}

/// O classificador externo: recebe as features de um casamento de padrão e devolve a
/// distribuição sobre {JOIN, SEPARATE}, da mais para a menos provável.
///
/// Implementações devem ser somente-leitura (`&self`) para poderem ser compartilhadas entre
/// threads durante a tokenização em lote.
pub trait DecisionMaker: Send + Sync {
    fn decide(&self, features: &[FeatureResult]) -> Vec<Decision>;
}

/// Classificador fixo, útil para testes e para demonstrar a combinação de probabilidades.
///
/// Sempre devolve a mesma distribuição, independente das features.
#[derive(Debug, Clone)]
pub struct FixedDecisionMaker {
    pub separate_probability: f64,
}

impl DecisionMaker for FixedDecisionMaker {
    fn decide(&self, _features: &[FeatureResult]) -> Vec<Decision> {
        let p = self.separate_probability;
        let mut decisions = vec![
            Decision::new(TokeniserOutcome::Separate, p),
            Decision::new(TokeniserOutcome::Join, 1.0 - p),
        ];
        decisions.sort_by(|a, b| b.probability.total_cmp(&a.probability));
        decisions
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_labels() {
        assert_eq!("DOES_SEPARATE".parse::<TokeniserOutcome>(), Ok(TokeniserOutcome::Separate));
        assert_eq!("JOIN".parse::<TokeniserOutcome>(), Ok(TokeniserOutcome::Join));
        assert!("MAYBE".parse::<TokeniserOutcome>().is_err());
        assert_eq!(TokeniserOutcome::Join.opposite(), TokeniserOutcome::Separate);
    }

    #[test]
    fn test_outcome_serde_accepts_legacy_names() {
        let outcome: TokeniserOutcome = serde_json::from_str("\"DOES_NOT_SEPARATE\"").unwrap();
        assert_eq!(outcome, TokeniserOutcome::Join);
        assert_eq!(serde_json::to_string(&TokeniserOutcome::Separate).unwrap(), "\"SEPARATE\"");
    }

    #[test]
    fn test_fixed_decision_maker_is_ranked() {
        let maker = FixedDecisionMaker { separate_probability: 0.3 };
        let decisions = maker.decide(&[]);
        assert_eq!(decisions[0].outcome, TokeniserOutcome::Join);
        let total: f64 = decisions.iter().map(|d| d.probability).sum();
        assert!((total - 1.0).abs() < 1e-12);
    }
}
