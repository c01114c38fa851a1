//! # Eventos de Treino
//!
//! Converte um corpus com tokenização de referência em eventos de classificação: um evento
//! por casamento de padrão, com as features do token cabeça e o resultado correto.
//!
//! O resultado correto de um átomo é SEPARATE quando o átomo começa numa fronteira de token
//! da referência e JOIN caso contrário. Todos os átomos testados de um casamento deveriam
//! concordar; quando não concordam (padrões sobrepostos, como "aussi bien que" anotado como
//! "aussi bien" + "que"), o evento usa a decisão padrão da cabeça.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::corpus::AnnotatedSentence;
use crate::decision::TokeniserOutcome;
use crate::defaults::TokeniserPatternManager;
use crate::error::Result;
use crate::features::{FeatureCache, FeatureContext, FeatureResult, FeatureSet};
use crate::matcher::match_all;
use crate::session::TokeniserSession;

/// Um exemplo de treino.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingEvent {
    pub pattern: String,
    pub features: Vec<FeatureResult>,
    pub outcome: TokeniserOutcome,
}

/// Gera os eventos de todas as sentenças do corpus.
pub fn pattern_events(
    sentences: &[AnnotatedSentence],
    manager: &TokeniserPatternManager,
    features: &FeatureSet,
    session: &TokeniserSession,
) -> Result<Vec<TrainingEvent>> {
    let mut events = Vec::new();

    for sentence in sentences {
        let splits = sentence.token_splits()?;
        let atoms = manager.atomise(sentence.text);
        let gold: Vec<TokeniserOutcome> = atoms
            .with_whitespace()
            .iter()
            .map(|atom| {
                if splits.contains(&atom.start) {
                    TokeniserOutcome::Separate
                } else {
                    TokeniserOutcome::Join
                }
            })
            .collect();
        let defaults = manager.default_outcomes(&atoms);

        let matches = match_all(manager.patterns(), &atoms);
        let mut cache = FeatureCache::default();
        for sequence in &matches.sequences {
            let head = sequence.head();
            let expected = gold[head];
            let outcome = if sequence.tokens_to_check().iter().all(|&atom| gold[atom] == expected) {
                expected
            } else {
                warn!(
                    pattern = sequence.pattern().name(),
                    sentence = sentence.text,
                    "referência inconsistente dentro do casamento; usando a decisão padrão"
                );
                defaults[head]
            };

            let context = FeatureContext::for_match(&atoms, sequence).with_annotations(&matches.annotations);
            events.push(TrainingEvent {
                pattern: sequence.pattern().name().to_string(),
                features: features.evaluate_all(&context, session.lexicon(), &mut cache),
                outcome,
            });
        }
    }

    debug!(sentences = sentences.len(), events = events.len(), "eventos de treino gerados");
    Ok(events)
}
