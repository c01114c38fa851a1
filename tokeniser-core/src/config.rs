//! # Configuração
//!
//! Parâmetros do tokenizador lidos de JSON. Todos os campos têm valor padrão, então um
//! arquivo parcial (ou `{}`) é válido:
//!
//! ```json
//! {
//!   "beam_width": 5,
//!   "scoring": "product",
//!   "mode": "pattern",
//!   "regex_filters": [{ "regex": "\\d+(?:[.,]\\d+)+" }],
//!   "training": { "iterations": 30, "learning_rate": 0.1, "lambda": 0.001 }
//! }
//! ```
//!
//! Sem `regex_filters`, valem os filtros de [`crate::filters::default_regex_filters`].

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::beam::DEFAULT_BEAM_WIDTH;
use crate::error::Result;
use crate::filters::{default_regex_filters, RegexFilterSpec};
use crate::sequence::ScoringStrategy;
use crate::token::{SeparatorClass, DEFAULT_SEPARATORS};

/// Estratégia de tokenização.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokeniserMode {
    /// Padrões + classificador + busca em feixe, com decisões em sequência.
    #[default]
    Pattern,
    /// Padrões + classificador, uma decisão independente por átomo testado.
    Interval,
    /// Separa em todo separador, exceto o apóstrofo, que cola na palavra anterior.
    Simple,
}

/// Hiperparâmetros do SGD do MaxEnt.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingParams {
    pub iterations: usize,
    pub learning_rate: f64,
    /// Regularização L2.
    pub lambda: f64,
}

impl Default for TrainingParams {
    fn default() -> Self {
        Self {
            iterations: 30,
            learning_rate: 0.1,
            lambda: 0.001,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TokeniserConfig {
    pub beam_width: usize,
    pub scoring: ScoringStrategy,
    /// Classe regex de caracteres separadores.
    pub separators: String,
    pub mode: TokeniserMode,
    /// Trechos que viram um único átomo antes da busca.
    pub regex_filters: Vec<RegexFilterSpec>,
    pub training: TrainingParams,
}

impl Default for TokeniserConfig {
    fn default() -> Self {
        Self {
            beam_width: DEFAULT_BEAM_WIDTH,
            scoring: ScoringStrategy::default(),
            separators: DEFAULT_SEPARATORS.to_string(),
            mode: TokeniserMode::default(),
            regex_filters: default_regex_filters(),
            training: TrainingParams::default(),
        }
    }
}

impl TokeniserConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    /// Compila a classe de separadores configurada.
    pub fn separator_class(&self) -> Result<SeparatorClass> {
        SeparatorClass::new(&self.separators)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TokeniserError;

    #[test]
    fn test_defaults_from_empty_object() {
        let config = TokeniserConfig::from_json_str("{}").unwrap();
        assert_eq!(config, TokeniserConfig::default());
        assert_eq!(config.beam_width, 5);
        assert_eq!(config.scoring, ScoringStrategy::Product);
        assert_eq!(config.mode, TokeniserMode::Pattern);
        assert_eq!(config.regex_filters.len(), 3);
    }

    #[test]
    fn test_partial_config() {
        let json = r#"{"beam_width": 2, "scoring": "geometric_mean", "mode": "simple", "training": {"iterations": 3}}"#;
        let config = TokeniserConfig::from_json_str(json).unwrap();
        assert_eq!(config.beam_width, 2);
        assert_eq!(config.scoring, ScoringStrategy::GeometricMean);
        assert_eq!(config.mode, TokeniserMode::Simple);
        assert_eq!(config.training.iterations, 3);
        assert_eq!(config.training.learning_rate, 0.1);

        let json = r#"{"mode": "interval", "regex_filters": [{"regex": "n°\\d+", "case_sensitive": false}]}"#;
        let config = TokeniserConfig::from_json_str(json).unwrap();
        assert_eq!(config.mode, TokeniserMode::Interval);
        assert_eq!(config.regex_filters.len(), 1);
        assert_eq!(config.regex_filters[0].regex, r"n°\d+");
        assert!(!config.regex_filters[0].case_sensitive);
        assert_eq!(config.regex_filters[0].group, 0);
    }

    #[test]
    fn test_invalid_config() {
        assert!(matches!(
            TokeniserConfig::from_json_str(r#"{"mode": "fancy"}"#),
            Err(TokeniserError::Config(_))
        ));
        let config = TokeniserConfig {
            separators: "[".into(),
            ..TokeniserConfig::default()
        };
        assert!(config.separator_class().is_err());
        assert!(matches!(
            TokeniserConfig::from_path("/caminho/que/nao/existe.json"),
            Err(TokeniserError::Io(_))
        ));
    }
}
