//! # Erros do Tokenizador
//!
//! Todos os erros aqui são **erros de configuração**: aparecem ao compilar padrões,
//! ao montar o conjunto de features ou ao carregar modelos/configurações. A tokenização
//! propriamente dita nunca falha: na pior das hipóteses ela degrada para as decisões
//! padrão do resolvedor de separadores.

use thiserror::Error;

/// Erro único do crate.
#[derive(Debug, Error)]
pub enum TokeniserError {
    /// O padrão DSL está mal formado (ex: alternância sem `)` de fechamento).
    #[error("padrão inválido `{pattern}`: {message}")]
    PatternSyntax { pattern: String, message: String },

    /// Um agrupamento `[...]` mistura separadores e letras.
    #[error("padrão inválido `{pattern}`: agrupamento mistura separadores e letras na posição {position}")]
    MixedGrouping { pattern: String, position: usize },

    /// Nenhuma posição do padrão precisa de decisão estatística.
    #[error("padrão `{pattern}` não tem nenhuma posição a testar")]
    NoIndexesToTest { pattern: String },

    /// Um trecho do padrão não compila como expressão regular.
    #[error("expressão regular inválida `{regex}`: {source}")]
    InvalidRegex {
        regex: String,
        #[source]
        source: regex::Error,
    },

    /// Feature mal configurada (offset zero, direção de busca contraditória...).
    #[error("feature inválida `{feature}`: {message}")]
    InvalidFeature { feature: String, message: String },

    /// Filtro de regex que não pode produzir marcadores (ex: regex vazia, grupo inexistente).
    #[error("filtro inválido `{regex}`: {message}")]
    InvalidFilter { regex: String, message: String },

    /// Linha do descritor de padrões que não pôde ser interpretada.
    #[error("descritor inválido na linha {line}: {message}")]
    InvalidDescriptor { line: usize, message: String },

    /// Sentença anotada cujos tokens não se alinham com o texto.
    #[error("corpus inválido: {0}")]
    Corpus(String),

    #[error("configuração inválida: {0}")]
    Config(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Atalho para `Result<T, TokeniserError>`.
pub type Result<T> = std::result::Result<T, TokeniserError>;
