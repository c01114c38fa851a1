//! # Maximum Entropy (Regressão Logística) para Decisões de Tokenização
//!
//! Classificador discriminativo log-linear que decide, para cada casamento de padrão, entre
//! JOIN e SEPARATE a partir das features do token cabeça. É o [`DecisionMaker`] usado pela
//! busca em feixe.
//!
//! ## Algoritmo
//! - **Treinamento**: Stochastic Gradient Descent (SGD) com regularização L2, sobre os
//!   eventos gerados por [`crate::events::pattern_events`].
//! - **Predição**: softmax dos scores de cada resultado, devolvida como distribuição ordenada.
//!
//! O modelo calcula: P(resultado | features) ~ exp(dot(pesos, features))

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::TrainingParams;
use crate::decision::{Decision, DecisionMaker, TokeniserOutcome};
use crate::events::TrainingEvent;
use crate::features::{FeatureResult, FeatureVector};

/// Modelo de Entropia Máxima, também conhecido como Regressão Logística Multinomial.
///
/// Diferente de um modelo generativo, o MaxEnt é **discriminativo**: modela diretamente
/// $P(y|x)$, o que permite features arbitrárias e sobrepostas (ex: "palavra depois do padrão"
/// E "padrão no início da frase").
///
/// # Fórmula
/// $$ P(y|x) = \frac{\exp(\sum_i w_i \cdot f_i(x,y))}{Z(x)} $$
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MaxEntModel {
    /// Peso de cada feature para cada resultado, na ordem de `outcomes`.
    weights: HashMap<String, Vec<f64>>,
    outcomes: Vec<TokeniserOutcome>,
}

impl Default for MaxEntModel {
    fn default() -> Self {
        Self::new()
    }
}

impl MaxEntModel {
    pub fn new() -> Self {
        Self {
            weights: HashMap::new(),
            outcomes: TokeniserOutcome::ALL.to_vec(),
        }
    }

    /// Número de features com algum peso não nulo.
    pub fn feature_count(&self) -> usize {
        self.weights.len()
    }

    /// Treina o modelo usando **Stochastic Gradient Descent (SGD)**.
    ///
    /// # Parâmetros
    /// * `events` - Eventos de treino (features + resultado correto).
    /// * `params.iterations` - Número de épocas.
    /// * `params.learning_rate` ($\eta$) - Tamanho do passo do gradiente.
    /// * `params.lambda` ($\lambda$) - Regularização L2, pune pesos muito grandes.
    pub fn train(&mut self, events: &[TrainingEvent], params: &TrainingParams) {
        let vectors: Vec<FeatureVector> = events.iter().map(|e| FeatureVector::from_results(&e.features)).collect();

        for epoch in 0..params.iterations {
            let mut correct = 0;

            for (event, fv) in events.iter().zip(&vectors) {
                // 1. Predição (forward)
                let probs = self.softmax(&self.compute_scores(fv));
                if self.best(&probs) == event.outcome {
                    correct += 1;
                }

                // 2. Atualização: w = w + rate * ((indicador - prob) * valor - lambda * w)
                for (index, outcome) in self.outcomes.iter().enumerate() {
                    let indicator = if *outcome == event.outcome { 1.0 } else { 0.0 };
                    let error = indicator - probs[index];
                    if error.abs() <= 1e-6 {
                        continue;
                    }
                    for (name, value) in &fv.features {
                        let weights = self
                            .weights
                            .entry(name.clone())
                            .or_insert_with(|| vec![0.0; self.outcomes.len()]);
                        let current = weights[index];
                        weights[index] = current + params.learning_rate * (error * value - params.lambda * current);
                    }
                }
            }

            if epoch % 5 == 0 && !events.is_empty() {
                debug!(epoch, accuracy = correct as f64 / events.len() as f64, "época do maxent");
            }
        }

        // esparsidade: descarta features sem nenhum peso relevante
        self.weights.retain(|_, w| w.iter().any(|v| v.abs() > 1e-9));
        info!(events = events.len(), features = self.weights.len(), "modelo maxent treinado");
    }

    /// Distribuição sobre os resultados, na ordem de `outcomes`.
    pub fn probabilities(&self, fv: &FeatureVector) -> Vec<(TokeniserOutcome, f64)> {
        let probs = self.softmax(&self.compute_scores(fv));
        self.outcomes.iter().copied().zip(probs).collect()
    }

    fn compute_scores(&self, fv: &FeatureVector) -> Vec<f64> {
        let mut scores = vec![0.0; self.outcomes.len()];
        for (name, value) in &fv.features {
            if let Some(weights) = self.weights.get(name) {
                for (score, w) in scores.iter_mut().zip(weights) {
                    *score += w * value;
                }
            }
        }
        scores
    }

    fn softmax(&self, scores: &[f64]) -> Vec<f64> {
        let max_score = scores.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let exps: Vec<f64> = scores.iter().map(|s| (s - max_score).exp()).collect();
        let sum: f64 = exps.iter().sum();
        exps.iter().map(|e| e / sum).collect()
    }

    fn best(&self, probs: &[f64]) -> TokeniserOutcome {
        let mut best = 0;
        for (i, p) in probs.iter().enumerate() {
            if *p > probs[best] {
                best = i;
            }
        }
        self.outcomes[best]
    }
}

impl DecisionMaker for MaxEntModel {
    fn decide(&self, features: &[FeatureResult]) -> Vec<Decision> {
        let fv = FeatureVector::from_results(features);
        let mut decisions: Vec<Decision> = self
            .probabilities(&fv)
            .into_iter()
            .map(|(outcome, p)| Decision::new(outcome, p))
            .collect();
        decisions.sort_by(|a, b| b.probability.total_cmp(&a.probability));
        decisions
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decision::TokeniserOutcome::{Join, Separate};
    use crate::features::FeatureValue;

    fn event(next_word: &str, outcome: TokeniserOutcome) -> TrainingEvent {
        TrainingEvent {
            pattern: "BienQue".into(),
            features: vec![FeatureResult {
                name: "PatternOffset(1,WordForm())".into(),
                value: FeatureValue::Text(next_word.into()),
            }],
            outcome,
        }
    }

    #[test]
    fn test_maxent_simple_learning() {
        let events = vec![
            event("la", Join),
            event("le", Join),
            event("tu", Separate),
            event("il", Separate),
            event("la", Join),
            event("tu", Separate),
        ];
        let mut model = MaxEntModel::new();
        model.train(&events, &TrainingParams { iterations: 20, learning_rate: 0.1, lambda: 0.001 });

        let decisions = model.decide(&event("la", Join).features);
        assert_eq!(decisions[0].outcome, Join);
        assert!(decisions[0].statistical);
        let decisions = model.decide(&event("tu", Join).features);
        assert_eq!(decisions[0].outcome, Separate);
    }

    #[test]
    fn test_decisions_form_distribution() {
        let model = MaxEntModel::new();
        let decisions = model.decide(&[]);
        assert_eq!(decisions.len(), 2);
        let total: f64 = decisions.iter().map(|d| d.probability).sum();
        assert!((total - 1.0).abs() < 1e-12);
        assert!((decisions[0].probability - 0.5).abs() < 1e-12);
    }
}
