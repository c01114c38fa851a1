//! # tokeniser-core - Tokenizador por Padrões com Busca em Feixe
//!
//! Este crate decide onde começam e terminam os tokens de uma sentença, reconhecendo
//! palavras compostas de várias palavras ("parce que", "aussi bien que", "pomme de terre")
//! como um único token quando o contexto pede. Foi projetado para ser didático: cada passo
//! pode ser observado pelos eventos do [`pipeline`].
//!
//! ## Arquitetura do Sistema
//!
//! 1.  **Atomização** ([`token`]): a sentença vira uma sequência de átomos (cada separador é
//!     um átomo próprio), preservando offsets originais. Trechos casados pelos filtros de
//!     regex ([`filters`]) ficam inteiros num só átomo.
//! 2.  **Decisões padrão** ([`defaults`]): regras dos separadores dão JOIN/SEPARATE para cada
//!     átomo antes de qualquer estatística.
//! 3.  **Padrões** ([`pattern`], [`matcher`]): uma DSL de expressões regulares por token
//!     descreve as locuções candidatas; cada casamento marca os átomos "a testar".
//! 4.  **Features + Classificador** ([`features`], [`maxent`]): para cada casamento, o
//!     [`decision::DecisionMaker`] devolve a distribuição sobre {JOIN, SEPARATE}.
//! 5.  **Busca em Feixe** ([`beam`]): combina as decisões em hipóteses consistentes e
//!     mantém as `K` melhores. No modo por intervalos, cada átomo testado recebe uma decisão
//!     independente.
//! 6.  **Saída**: a [`token::TokenSequence`] materializada, com o texto original intacto.
//!
//! ## Exemplo de Uso
//!
//! ```rust,no_run
//! use tokeniser_core::{TokeniserMode, TokeniserPipeline};
//!
//! // 1. Treina o modelo francês padrão sobre o corpus embutido
//! let pipeline = TokeniserPipeline::french_default().unwrap();
//!
//! // 2. Tokeniza e mostra as hipóteses
//! for result in pipeline.tokenise_with_mode("Il chante aussi bien que moi.", TokeniserMode::Pattern) {
//!     println!("{:.3} {:?}", result.score, result.tokens.texts());
//! }
//! ```
//!
//! ## Módulos Principais
//!
//! - [`pipeline`]: Orquestrador principal que conecta todos os estágios.
//! - [`model`]: Descritor, features e pesos treinados, serializáveis em JSON.
//! - [`events`] e [`corpus`]: Dados de treino anotados e sua conversão em eventos.
//! - [`filters`]: Reescrita do texto de análise (caixa alta, primeira palavra) e filtros de
//!   regex.
//! - [`evaluation`]: Precisão, revocação e F-score contra um corpus anotado.

pub mod beam;
pub mod config;
pub mod corpus;
pub mod decision;
pub mod defaults;
pub mod error;
pub mod evaluation;
pub mod events;
pub mod features;
pub mod filters;
pub mod lexicon;
pub mod matcher;
pub mod maxent;
pub mod model;
pub mod pattern;
pub mod pipeline;
pub mod sequence;
pub mod session;
pub mod token;

pub use config::{TokeniserConfig, TokeniserMode};
pub use decision::{Decision, DecisionMaker, TaggedToken, TokeniserOutcome};
pub use error::{Result, TokeniserError};
pub use pipeline::{PipelineEvent, TokeniserPipeline, TokeniserResult};
pub use session::TokeniserSession;
pub use token::{Token, TokenSequence};
