//! # Avaliação do Tokenizador
//!
//! Compara a melhor hipótese do pipeline com a tokenização de referência de um corpus
//! anotado. A unidade avaliada é a decisão de cada átomo: o resultado real é SEPARATE
//! quando o átomo começa numa fronteira de token da referência e JOIN caso contrário.
//!
//! Para cada resultado são contados verdadeiros positivos, falsos positivos e falsos
//! negativos, dos quais saem precisão, revocação e F-score. As contagens também são
//! separadas por autoridade (padrão, regra padrão, intervalo...), o que mostra qual parte
//! do tokenizador erra.
//!
//! ```rust,no_run
//! use tokeniser_core::corpus::get_corpus;
//! use tokeniser_core::evaluation::evaluate;
//! use tokeniser_core::pipeline::TokeniserPipeline;
//!
//! let pipeline = TokeniserPipeline::french_default().unwrap();
//! let evaluation = evaluate(&pipeline, &get_corpus()).unwrap();
//! println!("F-score: {:.3}", evaluation.overall.total_f_score());
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::TokeniserMode;
use crate::corpus::AnnotatedSentence;
use crate::decision::TokeniserOutcome;
use crate::error::Result;
use crate::pipeline::TokeniserPipeline;

/// Caracteres de contexto mostrados de cada lado de um erro.
const CONTEXT_CHARS: usize = 20;

/// Contagens de um resultado.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutcomeCounts {
    pub true_positives: usize,
    pub false_positives: usize,
    pub false_negatives: usize,
}

impl OutcomeCounts {
    /// `tp / (tp + fp)`, ou 0 sem nenhum palpite.
    pub fn precision(&self) -> f64 {
        ratio(self.true_positives, self.true_positives + self.false_positives)
    }

    /// `tp / (tp + fn)`, ou 0 sem nenhum caso real.
    pub fn recall(&self) -> f64 {
        ratio(self.true_positives, self.true_positives + self.false_negatives)
    }

    /// Média harmônica de precisão e revocação.
    pub fn f_score(&self) -> f64 {
        let (precision, recall) = (self.precision(), self.recall());
        if precision + recall > 0.0 {
            2.0 * precision * recall / (precision + recall)
        } else {
            0.0
        }
    }
}

fn ratio(numerator: usize, denominator: usize) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64
    }
}

/// Acumula pares (real, palpite) e calcula as métricas por resultado.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FScoreCalculator {
    counts: BTreeMap<TokeniserOutcome, OutcomeCounts>,
}

impl FScoreCalculator {
    pub fn increment(&mut self, real: TokeniserOutcome, guess: TokeniserOutcome) {
        if real == guess {
            self.counts.entry(real).or_default().true_positives += 1;
        } else {
            self.counts.entry(real).or_default().false_negatives += 1;
            self.counts.entry(guess).or_default().false_positives += 1;
        }
    }

    /// Resultados já vistos, como real ou como palpite.
    pub fn outcomes(&self) -> impl Iterator<Item = TokeniserOutcome> + '_ {
        self.counts.keys().copied()
    }

    pub fn counts(&self, outcome: TokeniserOutcome) -> OutcomeCounts {
        self.counts.get(&outcome).copied().unwrap_or_default()
    }

    pub fn precision(&self, outcome: TokeniserOutcome) -> f64 {
        self.counts(outcome).precision()
    }

    pub fn recall(&self, outcome: TokeniserOutcome) -> f64 {
        self.counts(outcome).recall()
    }

    pub fn f_score(&self, outcome: TokeniserOutcome) -> f64 {
        self.counts(outcome).f_score()
    }

    /// Soma das contagens de todos os resultados (micro-média).
    pub fn total(&self) -> OutcomeCounts {
        self.counts.values().fold(OutcomeCounts::default(), |total, counts| OutcomeCounts {
            true_positives: total.true_positives + counts.true_positives,
            false_positives: total.false_positives + counts.false_positives,
            false_negatives: total.false_negatives + counts.false_negatives,
        })
    }

    pub fn total_f_score(&self) -> f64 {
        self.total().f_score()
    }
}

/// Uma decisão errada, com o trecho da sentença em volta.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvaluationError {
    pub real: TokeniserOutcome,
    pub guess: TokeniserOutcome,
    /// Texto antes do átomo, `[+]` (separação a mais) ou `[-]` (separação perdida), e o texto
    /// a partir do átomo.
    pub context: String,
    pub authorities: Vec<String>,
}

/// Resultado da avaliação de um corpus.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TokeniserEvaluation {
    pub sentences: usize,
    pub overall: FScoreCalculator,
    pub by_authority: BTreeMap<String, FScoreCalculator>,
    pub errors: Vec<EvaluationError>,
}

/// Avalia o pipeline no modo configurado.
pub fn evaluate(pipeline: &TokeniserPipeline, corpus: &[AnnotatedSentence]) -> Result<TokeniserEvaluation> {
    evaluate_with_mode(pipeline, corpus, pipeline.config().mode)
}

/// Avalia a melhor hipótese de cada sentença do corpus contra a referência.
///
/// Uma anotação que não corresponde ao texto interrompe a avaliação com
/// [`crate::error::TokeniserError::Corpus`].
pub fn evaluate_with_mode(
    pipeline: &TokeniserPipeline,
    corpus: &[AnnotatedSentence],
    mode: TokeniserMode,
) -> Result<TokeniserEvaluation> {
    let mut evaluation = TokeniserEvaluation::default();

    for sentence in corpus {
        let splits = sentence.token_splits()?;
        let atoms = pipeline.atomise(sentence.text);
        let Some(best) = pipeline.tokenise_with_mode(sentence.text, mode).into_iter().next() else {
            continue;
        };
        evaluation.sentences += 1;

        for tagged in &best.decisions {
            let Some(atom) = atoms.atom(tagged.atom) else {
                continue;
            };
            let real = if splits.contains(&atom.start) {
                TokeniserOutcome::Separate
            } else {
                TokeniserOutcome::Join
            };
            let guess = tagged.decision.outcome;

            evaluation.overall.increment(real, guess);
            for authority in &tagged.decision.authorities {
                evaluation.by_authority.entry(authority.clone()).or_default().increment(real, guess);
            }

            if real != guess {
                let error = EvaluationError {
                    real,
                    guess,
                    context: error_context(sentence.text, atom.start, real),
                    authorities: tagged.decision.authorities.clone(),
                };
                debug!(real = %error.real, guess = %error.guess, context = %error.context, "erro de tokenização");
                evaluation.errors.push(error);
            }
        }
    }

    for (authority, calculator) in &evaluation.by_authority {
        debug!(%authority, f_score = calculator.total_f_score(), "F-score por autoridade");
    }
    info!(
        ?mode,
        sentences = evaluation.sentences,
        errors = evaluation.errors.len(),
        f_score = evaluation.overall.total_f_score(),
        "avaliação concluída"
    );
    Ok(evaluation)
}

fn error_context(text: &str, start: usize, real: TokeniserOutcome) -> String {
    let before: String = {
        let chars: Vec<char> = text[..start].chars().collect();
        chars[chars.len().saturating_sub(CONTEXT_CHARS)..].iter().collect()
    };
    let after: String = text[start..].chars().take(CONTEXT_CHARS).collect();
    let symbol = match real {
        TokeniserOutcome::Separate => '-',
        TokeniserOutcome::Join => '+',
    };
    format!("{before:>width$}[{symbol}]{after}", width = CONTEXT_CHARS)
}
