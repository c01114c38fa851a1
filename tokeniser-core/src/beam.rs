//! # Busca em Feixe sobre Decisões de Separação
//!
//! O motor percorre a visão **com espaços** da esquerda para a direita mantendo as `K`
//! melhores tokenizações parciais ([`TokenisedAtomicTokenSequence`]). Para cada átomo, cada
//! hipótese sobrevivente é estendida de um de três jeitos:
//!
//! 1. **Decisão pendente**: o átomo já foi decidido por um padrão escolhido antes (membro não
//!    cabeça de um casamento sobrescrito). A decisão é apenas aplicada.
//! 2. **Cabeça de casamentos**: o átomo é o primeiro "token a testar" de `n` casamentos. Há
//!    exatamente `n + 1` soluções consistentes (nenhum sobrescrito, só o mais curto, ..., todos),
//!    e cada uma vira uma hipótese sucessora com o peso normalizado de [`solution_weights`].
//! 3. **Padrão**: aplica a decisão padrão do resolvedor de separadores.
//!
//! ## Estratégia por intervalos
//!
//! [`BeamSearch::search_intervals`] é a alternativa mais simples: cada átomo que algum
//! casamento marca como "a testar" é decidido sozinho pelo classificador, com as features do
//! próprio átomo ([`crate::features::FeatureExpr::TokeniserPatterns`] diz quais padrões o
//! testam). Não há decisões em sequência, então as hipóteses podem partir um padrão ao meio.
//!
//! ## Custo do classificador
//!
//! Features e classificador são avaliados **uma vez por casamento**, antes da busca, e os
//! pesos de cada cabeça uma vez por sentença. O custo de classificação é `O(casamentos)`,
//! independente da largura do feixe.
//!
//! ## Modo degenerado
//!
//! Sem classificador, com `K = 0` ou sem átomos, não há bifurcação: a saída é uma única hipótese com as
//! decisões padrão de todos os átomos.
//!
//! ## Exemplo
//!
//! ```rust
//! use tokeniser_core::beam::BeamSearch;
//! use tokeniser_core::decision::FixedDecisionMaker;
//! use tokeniser_core::defaults::TokeniserPatternManager;
//! use tokeniser_core::features::FeatureSet;
//! use tokeniser_core::session::TokeniserSession;
//! use tokeniser_core::token::TokenSequence;
//!
//! let session = TokeniserSession::default();
//! let manager = TokeniserPatternManager::new(&["parce que"], session.separators()).unwrap();
//! let features = FeatureSet::empty();
//! let classifier = FixedDecisionMaker { separate_probability: 0.1 };
//!
//! let atoms = TokenSequence::atomise("parce que", session.separators());
//! let result = BeamSearch::new(&manager, &features, &session)
//!     .with_decision_maker(&classifier)
//!     .search(&atoms);
//!
//! let best = result.hypotheses[0].materialize(&atoms);
//! assert_eq!(best.texts(), vec!["parce que"]);
//! ```

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet, BinaryHeap};

use serde::{Deserialize, Serialize};
use tracing::{debug, trace, warn};

use crate::decision::{
    Decision, DecisionMaker, TaggedToken, TokeniserOutcome, AUTHORITY_DEFAULT, AUTHORITY_IN_SEQUENCE,
    AUTHORITY_IN_SEQUENCE_DEFAULT, AUTHORITY_IN_SEQUENCE_NON_DEFAULT, AUTHORITY_INTERVAL, AUTHORITY_PATTERNS,
};
use crate::defaults::TokeniserPatternManager;
use crate::features::{FeatureCache, FeatureContext, FeatureSet};
use crate::matcher::{match_all, PatternMatches};
use crate::sequence::{ScoringStrategy, TokenisedAtomicTokenSequence};
use crate::session::TokeniserSession;
use crate::token::TokenSequence;

/// Largura padrão do feixe.
pub const DEFAULT_BEAM_WIDTH: usize = 5;

/// Registro de uma bifurcação, para inspeção e para os eventos do pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FanOutStep {
    /// Átomo cabeça.
    pub atom: usize,
    /// Nomes dos padrões, do casamento mais curto ao mais longo.
    pub patterns: Vec<String>,
    /// Peso normalizado de cada solução (índice 0 = tudo padrão).
    pub weights: Vec<f64>,
}

/// Um casamento classificado, desacoplado do gerenciador de padrões.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchSummary {
    pub pattern: String,
    pub group: Option<String>,
    pub head: usize,
    /// Átomos testados do casamento (a cabeça primeiro).
    pub atoms: Vec<usize>,
    /// Todos os átomos reais cobertos pelo casamento.
    pub covered: Vec<usize>,
}

/// Saída da busca.
#[derive(Debug, Clone)]
pub struct BeamResult {
    /// As melhores hipóteses, em ordem decrescente de score.
    pub hypotheses: Vec<TokenisedAtomicTokenSequence>,
    pub fan_outs: Vec<FanOutStep>,
    /// Casamentos classificados, na ordem em que foram encontrados.
    pub matches: Vec<MatchSummary>,
}

/// Hipótese com prioridade no heap: maior score primeiro, empate para a inserida antes.
struct Ranked {
    score: f64,
    order: usize,
    hypothesis: TokenisedAtomicTokenSequence,
}

impl PartialEq for Ranked {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Ranked {}

impl PartialOrd for Ranked {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Ranked {
    fn cmp(&self, other: &Self) -> Ordering {
        self.score
            .total_cmp(&other.score)
            .then_with(|| other.order.cmp(&self.order))
    }
}

#[derive(Default)]
struct Beam {
    heap: BinaryHeap<Ranked>,
    inserted: usize,
}

impl Beam {
    fn push(&mut self, hypothesis: TokenisedAtomicTokenSequence) {
        let ranked = Ranked {
            score: hypothesis.score(),
            order: self.inserted,
            hypothesis,
        };
        self.inserted += 1;
        self.heap.push(ranked);
    }

    fn pop(&mut self) -> Option<TokenisedAtomicTokenSequence> {
        self.heap.pop().map(|ranked| ranked.hypothesis)
    }

    fn len(&self) -> usize {
        self.heap.len()
    }
}

/// Pesos normalizados das `n + 1` soluções numa cabeça com `n` casamentos.
///
/// `matches` traz, do mais curto ao mais longo, o último átomo a testar de cada casamento e
/// as decisões do classificador para ele. O peso da solução `k` multiplica a probabilidade do
/// resultado padrão dos casamentos ainda não sobrescritos e a do resultado oposto dos já
/// sobrescritos. Casamentos que terminam no mesmo átomo que o anterior são sobrescritos
/// juntos com ele. Um casamento sem decisões não altera nenhum peso.
pub fn solution_weights(default_outcome: TokeniserOutcome, matches: &[(usize, &[Decision])]) -> Vec<f64> {
    let mut weights = vec![1.0; matches.len() + 1];
    let mut previous_end: Option<usize> = None;

    for (p, &(end, decisions)) in matches.iter().enumerate().map(|(i, m)| (i + 1, m)) {
        let tied = previous_end.is_some_and(|previous| end <= previous);
        for decision in decisions {
            let is_default = decision.outcome == default_outcome;
            for (k, weight) in weights.iter_mut().enumerate() {
                let applies = match (is_default, tied) {
                    (true, false) => k < p,
                    (true, true) => k + 1 < p,
                    (false, false) => k >= p,
                    (false, true) => k + 1 >= p,
                };
                if applies {
                    *weight *= decision.probability;
                }
            }
        }
        previous_end = Some(end);
    }

    let total: f64 = weights.iter().sum();
    if total > 0.0 {
        for weight in &mut weights {
            *weight /= total;
        }
    }
    weights
}

/// Fan-out pré-calculado de uma cabeça.
struct HeadPlan {
    /// Índices dos casamentos, do mais curto ao mais longo.
    sequences: Vec<usize>,
    default_outcome: TokeniserOutcome,
    weights: Vec<f64>,
}

/// O motor de busca em feixe.
pub struct BeamSearch<'a> {
    manager: &'a TokeniserPatternManager,
    features: &'a FeatureSet,
    session: &'a TokeniserSession,
    decision_maker: Option<&'a dyn DecisionMaker>,
    beam_width: usize,
    scoring: ScoringStrategy,
}

impl<'a> BeamSearch<'a> {
    pub fn new(manager: &'a TokeniserPatternManager, features: &'a FeatureSet, session: &'a TokeniserSession) -> Self {
        Self {
            manager,
            features,
            session,
            decision_maker: None,
            beam_width: DEFAULT_BEAM_WIDTH,
            scoring: ScoringStrategy::default(),
        }
    }

    pub fn with_decision_maker(mut self, decision_maker: &'a dyn DecisionMaker) -> Self {
        self.decision_maker = Some(decision_maker);
        self
    }

    pub fn with_beam_width(mut self, beam_width: usize) -> Self {
        self.beam_width = beam_width;
        self
    }

    pub fn with_scoring(mut self, scoring: ScoringStrategy) -> Self {
        self.scoring = scoring;
        self
    }

    pub fn beam_width(&self) -> usize {
        self.beam_width
    }

    /// Tokeniza os átomos de uma sentença, devolvendo as `K` melhores hipóteses.
    pub fn search(&self, atoms: &TokenSequence) -> BeamResult {
        let defaults = self.manager.default_outcomes(atoms);

        let decision_maker = match self.decision_maker {
            Some(decision_maker) if self.beam_width > 0 && atoms.atom_count() > 0 => decision_maker,
            _ => return self.degenerate(&defaults),
        };

        let matches = match_all(self.manager.patterns(), atoms);
        let classified = self.classify(atoms, &matches, decision_maker);
        let plans = plan_heads(&matches, &classified, &defaults);

        let fan_outs: Vec<FanOutStep> = plans
            .iter()
            .map(|(&atom, plan)| FanOutStep {
                atom,
                patterns: plan
                    .sequences
                    .iter()
                    .map(|&s| matches.sequences[s].pattern().name().to_string())
                    .collect(),
                weights: plan.weights.clone(),
            })
            .collect();
        for step in &fan_outs {
            debug!(atom = step.atom, patterns = ?step.patterns, weights = ?step.weights, "fan-out");
        }

        let mut beam = Beam::default();
        for i in 0..atoms.atom_count() {
            if i == 0 {
                let mut hypothesis = TokenisedAtomicTokenSequence::new(self.scoring);
                let decision = Decision::default_decision(TokeniserOutcome::Separate).with_authority(AUTHORITY_DEFAULT);
                hypothesis.push(TaggedToken::new(0, decision));
                beam.push(hypothesis);
                continue;
            }

            let mut previous = std::mem::take(&mut beam);
            let survivors = previous.len().min(self.beam_width);
            for _ in 0..survivors {
                let Some(mut history) = previous.pop() else {
                    break;
                };

                if let Some(tagged) = history.take_pending(i) {
                    history.push(tagged);
                    beam.push(history);
                } else if let Some(plan) = plans.get(&i) {
                    for successor in self.fan_out(i, plan, &history, &matches) {
                        beam.push(successor);
                    }
                } else {
                    let decision = if matches.is_checked(i) {
                        Decision::default_decision(defaults[i])
                            .with_authority(AUTHORITY_IN_SEQUENCE)
                            .with_authority(AUTHORITY_IN_SEQUENCE_DEFAULT)
                            .with_authority(AUTHORITY_PATTERNS)
                    } else {
                        Decision::default_decision(defaults[i]).with_authority(AUTHORITY_DEFAULT)
                    };
                    history.push(TaggedToken::new(i, decision));
                    beam.push(history);
                }
            }
        }

        BeamResult {
            hypotheses: self.best(beam),
            fan_outs,
            matches: summarise(&matches),
        }
    }

    /// Busca por intervalos: uma decisão independente por átomo testado.
    ///
    /// O classificador é chamado uma vez por átomo testado. Os demais átomos recebem a
    /// decisão padrão, e o primeiro sempre abre um token.
    pub fn search_intervals(&self, atoms: &TokenSequence) -> BeamResult {
        let defaults = self.manager.default_outcomes(atoms);

        let decision_maker = match self.decision_maker {
            Some(decision_maker) if self.beam_width > 0 && atoms.atom_count() > 0 => decision_maker,
            _ => return self.degenerate(&defaults),
        };

        let matches = match_all(self.manager.patterns(), atoms);
        let to_check: BTreeSet<usize> = matches
            .sequences
            .iter()
            .flat_map(|sequence| sequence.tokens_to_check().iter().copied())
            .filter(|&atom| atom > 0)
            .collect();

        let mut cache = FeatureCache::default();
        let mut checked: BTreeMap<usize, Vec<Decision>> = BTreeMap::new();
        let mut fan_outs = Vec::with_capacity(to_check.len());
        for &atom in &to_check {
            let context = FeatureContext::for_atom(atoms, atom, &matches.annotations);
            let results = self.features.evaluate_all(&context, self.session.lexicon(), &mut cache);
            let patterns = tested_patterns(&matches, atom);

            let decisions: Vec<Decision> = decision_maker
                .decide(&results)
                .into_iter()
                .map(|decision| {
                    let mut decision = decision.with_authority(AUTHORITY_INTERVAL);
                    for name in &patterns {
                        decision.add_authority(name.as_str());
                    }
                    decision
                })
                .collect();
            if decisions.is_empty() {
                warn!(atom, "classificador sem resposta; usando a decisão padrão");
                continue;
            }

            let default_outcome = defaults[atom];
            let weights = [default_outcome, default_outcome.opposite()]
                .map(|outcome| {
                    decisions
                        .iter()
                        .filter(|d| d.outcome == outcome)
                        .map(|d| d.probability)
                        .sum::<f64>()
                })
                .to_vec();
            debug!(atom, ?patterns, ?weights, "intervalo");
            fan_outs.push(FanOutStep { atom, patterns, weights });
            checked.insert(atom, decisions);
        }

        let mut beam = Beam::default();
        beam.push(TokenisedAtomicTokenSequence::new(self.scoring));
        for (i, &default_outcome) in defaults.iter().enumerate() {
            let mut previous = std::mem::take(&mut beam);
            let survivors = previous.len().min(self.beam_width);
            for _ in 0..survivors {
                let Some(mut history) = previous.pop() else {
                    break;
                };
                match checked.get(&i) {
                    Some(decisions) => {
                        for decision in decisions {
                            let mut successor = history.clone();
                            successor.push(TaggedToken::new(i, decision.clone()));
                            beam.push(successor);
                        }
                    }
                    None => {
                        let outcome = if i == 0 { TokeniserOutcome::Separate } else { default_outcome };
                        let decision = Decision::default_decision(outcome).with_authority(AUTHORITY_DEFAULT);
                        history.push(TaggedToken::new(i, decision));
                        beam.push(history);
                    }
                }
            }
        }

        BeamResult {
            hypotheses: self.best(beam),
            fan_outs,
            matches: summarise(&matches),
        }
    }

    /// As `K` melhores hipóteses do feixe final, em ordem decrescente de score.
    fn best(&self, mut beam: Beam) -> Vec<TokenisedAtomicTokenSequence> {
        let mut hypotheses = Vec::with_capacity(self.beam_width);
        while hypotheses.len() < self.beam_width {
            match beam.pop() {
                Some(hypothesis) => hypotheses.push(hypothesis),
                None => break,
            }
        }
        hypotheses
    }

    /// Uma única hipótese com as decisões padrão.
    fn degenerate(&self, defaults: &[TokeniserOutcome]) -> BeamResult {
        let mut hypothesis = TokenisedAtomicTokenSequence::new(self.scoring);
        for (i, &outcome) in defaults.iter().enumerate() {
            hypothesis.push(TaggedToken::new(
                i,
                Decision::default_decision(outcome).with_authority(AUTHORITY_DEFAULT),
            ));
        }
        BeamResult {
            hypotheses: vec![hypothesis],
            fan_outs: Vec::new(),
            matches: Vec::new(),
        }
    }

    /// Features e classificador, uma vez por casamento.
    fn classify(
        &self,
        atoms: &TokenSequence,
        matches: &PatternMatches,
        decision_maker: &dyn DecisionMaker,
    ) -> Vec<Vec<Decision>> {
        let mut cache = FeatureCache::default();
        matches
            .sequences
            .iter()
            .enumerate()
            .map(|(index, sequence)| {
                let head = sequence.head();
                if let Some(primary) = matches.annotations.for_atom(head).iter().find(|m| m.sequence == index) {
                    trace!(pattern = %primary.pattern, position = primary.position, head, "match");
                }

                let context = FeatureContext::for_match(atoms, sequence).with_annotations(&matches.annotations);
                let results = self.features.evaluate_all(&context, self.session.lexicon(), &mut cache);
                let name = sequence.pattern().name();
                decision_maker
                    .decide(&results)
                    .into_iter()
                    .map(|decision| decision.with_authority(AUTHORITY_PATTERNS).with_authority(name))
                    .collect()
            })
            .collect()
    }

    /// As `n + 1` sucessoras de `history` numa cabeça.
    fn fan_out(
        &self,
        head: usize,
        plan: &HeadPlan,
        history: &TokenisedAtomicTokenSequence,
        matches: &PatternMatches,
    ) -> Vec<TokenisedAtomicTokenSequence> {
        let other_outcome = plan.default_outcome.opposite();
        let mut successors = Vec::with_capacity(plan.sequences.len() + 1);

        // solução 0: o padrão só para a cabeça; os demais membros ficam livres
        let mut decision = Decision::new(plan.default_outcome, plan.weights[0]).with_authority(AUTHORITY_PATTERNS);
        for &s in &plan.sequences {
            decision.add_authority(matches.sequences[s].pattern().name());
        }
        let mut default_successor = history.clone();
        default_successor.push(TaggedToken::new(head, decision));
        successors.push(default_successor);

        for (k, &s) in plan.sequences.iter().enumerate() {
            let sequence = &matches.sequences[s];
            let decision = Decision::new(other_outcome, plan.weights[k + 1])
                .with_authority(AUTHORITY_PATTERNS)
                .with_authority(sequence.pattern().name());

            let mut successor = history.clone();
            successor.push(TaggedToken::new(head, decision));
            for &member in sequence.tokens_to_check().iter().filter(|&&t| t != head) {
                let in_sequence = Decision::default_decision(other_outcome)
                    .with_authority(AUTHORITY_IN_SEQUENCE)
                    .with_authority(AUTHORITY_IN_SEQUENCE_NON_DEFAULT)
                    .with_authority(AUTHORITY_PATTERNS);
                if let Some(replaced) = successor.add_pending(TaggedToken::new(member, in_sequence)) {
                    warn!(
                        atom = member,
                        previous = %replaced.decision.outcome,
                        current = %other_outcome,
                        pattern = sequence.pattern().name(),
                        "decisões conflitantes para o mesmo átomo; a mais recente prevalece"
                    );
                }
            }
            successors.push(successor);
        }
        successors
    }
}

fn summarise(matches: &PatternMatches) -> Vec<MatchSummary> {
    matches
        .sequences
        .iter()
        .map(|sequence| MatchSummary {
            pattern: sequence.pattern().name().to_string(),
            group: sequence.pattern().group_name().map(String::from),
            head: sequence.head(),
            atoms: sequence.tokens_to_check().to_vec(),
            covered: sequence.covered_atoms().collect(),
        })
        .collect()
}

/// Nomes dos padrões cujos casamentos testam o átomo, sem repetição.
fn tested_patterns(matches: &PatternMatches, atom: usize) -> Vec<String> {
    let mut names: Vec<String> = matches
        .sequences
        .iter()
        .filter(|sequence| sequence.tokens_to_check().contains(&atom))
        .map(|sequence| sequence.pattern().name().to_string())
        .collect();
    names.dedup();
    names
}

/// Agrupa os casamentos por cabeça e calcula os pesos de cada bifurcação.
fn plan_heads(
    matches: &PatternMatches,
    classified: &[Vec<Decision>],
    defaults: &[TokeniserOutcome],
) -> BTreeMap<usize, HeadPlan> {
    matches
        .by_head()
        .into_iter()
        .map(|(head, sequences)| {
            let default_outcome = defaults[head];
            let inputs: Vec<(usize, &[Decision])> = sequences
                .iter()
                .map(|&s| (matches.sequences[s].end(), classified[s].as_slice()))
                .collect();
            let weights = solution_weights(default_outcome, &inputs);
            (
                head,
                HeadPlan {
                    sequences,
                    default_outcome,
                    weights,
                },
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decision::FixedDecisionMaker;
    use crate::features::FeatureResult;
    use std::sync::atomic::{AtomicUsize, Ordering as AtomicOrdering};

    use crate::decision::TokeniserOutcome::{Join, Separate};

    struct CountingDecisionMaker {
        calls: AtomicUsize,
        inner: FixedDecisionMaker,
    }

    impl DecisionMaker for CountingDecisionMaker {
        fn decide(&self, features: &[FeatureResult]) -> Vec<Decision> {
            self.calls.fetch_add(1, AtomicOrdering::SeqCst);
            self.inner.decide(features)
        }
    }

    struct Fixture {
        session: TokeniserSession,
        manager: TokeniserPatternManager,
        features: FeatureSet,
    }

    fn fixture(descriptors: &[&str]) -> Fixture {
        let session = TokeniserSession::default();
        let manager = TokeniserPatternManager::new(descriptors, session.separators()).unwrap();
        Fixture {
            session,
            manager,
            features: FeatureSet::empty(),
        }
    }

    fn texts(result: &BeamResult, atoms: &TokenSequence) -> Vec<Vec<String>> {
        result
            .hypotheses
            .iter()
            .map(|h| h.materialize(atoms).texts().into_iter().map(String::from).collect())
            .collect()
    }

    fn decisions(outcomes: &[(TokeniserOutcome, f64)]) -> Vec<Decision> {
        outcomes.iter().map(|&(o, p)| Decision::new(o, p)).collect()
    }

    #[test]
    fn test_solution_weights_nested() {
        let short = decisions(&[(Join, 0.6), (Separate, 0.4)]);
        let long = decisions(&[(Join, 0.3), (Separate, 0.7)]);
        let weights = solution_weights(Separate, &[(6, &short), (8, &long)]);
        let expected = [0.28 / 0.88, 0.42 / 0.88, 0.18 / 0.88];
        for (w, e) in weights.iter().zip(expected) {
            assert!((w - e).abs() < 1e-12, "{weights:?}");
        }
        assert!((weights.iter().sum::<f64>() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_solution_weights_same_end_are_chained() {
        let first = decisions(&[(Join, 0.6), (Separate, 0.4)]);
        let second = decisions(&[(Join, 0.3), (Separate, 0.7)]);
        let weights = solution_weights(Separate, &[(6, &first), (6, &second)]);
        assert_eq!(weights.len(), 3);
        assert!((weights[1] - weights[2]).abs() < 1e-12);
        assert!((weights.iter().sum::<f64>() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_solution_weights_empty_answer_is_neutral() {
        let weights = solution_weights(Separate, &[(3, &[])]);
        assert_eq!(weights, vec![0.5, 0.5]);

        let join_default = decisions(&[(Join, 0.9), (Separate, 0.1)]);
        let weights = solution_weights(Join, &[(3, &join_default)]);
        assert!((weights[0] - 0.9).abs() < 1e-12);
    }

    #[test]
    fn test_parce_que_round_trip() {
        let f = fixture(&["parce que"]);
        let classifier = FixedDecisionMaker { separate_probability: 0.2 };
        let atoms = TokenSequence::atomise("Il part parce que.", f.session.separators());
        let result = BeamSearch::new(&f.manager, &f.features, &f.session)
            .with_decision_maker(&classifier)
            .search(&atoms);

        let all = texts(&result, &atoms);
        assert_eq!(all.len(), 2);
        assert_eq!(all[0], vec!["Il", "part", "parce que", "."]);
        assert_eq!(all[1], vec!["Il", "part", "parce", "que", "."]);
        assert!((result.hypotheses[0].score() - 0.8).abs() < 1e-12);

        let best = result.hypotheses[0].tagged_tokens();
        let member = best.iter().find(|t| t.atom == 6).unwrap();
        assert!(!member.decision.statistical);
        assert!(member.decision.authorities.contains(&AUTHORITY_IN_SEQUENCE_NON_DEFAULT.to_string()));
    }

    #[test]
    fn test_nested_matches_yield_three_solutions() {
        let f = fixture(&["aussi bien", "aussi bien que"]);
        let classifier = FixedDecisionMaker { separate_probability: 0.3 };
        let atoms = TokenSequence::atomise("Il chante aussi bien que moi.", f.session.separators());
        let result = BeamSearch::new(&f.manager, &f.features, &f.session)
            .with_decision_maker(&classifier)
            .search(&atoms);

        assert_eq!(result.fan_outs.len(), 1);
        assert_eq!(result.fan_outs[0].atom, 5);
        assert_eq!(result.fan_outs[0].weights.len(), 3);

        let all = texts(&result, &atoms);
        assert_eq!(all.len(), 3);
        assert_eq!(all[0], vec!["Il", "chante", "aussi bien que", "moi", "."]);
        assert_eq!(all[1], vec!["Il", "chante", "aussi bien", "que", "moi", "."]);
        assert_eq!(all[2], vec!["Il", "chante", "aussi", "bien", "que", "moi", "."]);
        assert!((result.hypotheses[0].score() - 0.49 / 0.79).abs() < 1e-12);
    }

    #[test]
    fn test_beam_width_bound() {
        let f = fixture(&["aussi bien", "aussi bien que"]);
        let classifier = FixedDecisionMaker { separate_probability: 0.3 };
        let atoms = TokenSequence::atomise("Il chante aussi bien que moi.", f.session.separators());
        for k in 1..=4 {
            let result = BeamSearch::new(&f.manager, &f.features, &f.session)
                .with_decision_maker(&classifier)
                .with_beam_width(k)
                .search(&atoms);
            assert_eq!(result.hypotheses.len(), k.min(3));
            let scores: Vec<f64> = result.hypotheses.iter().map(|h| h.score()).collect();
            assert!(scores.windows(2).all(|w| w[0] >= w[1]), "{scores:?}");
        }
    }

    #[test]
    fn test_classifier_called_once_per_match() {
        let f = fixture(&["aussi bien", "aussi bien que", "bien que"]);
        let atoms = TokenSequence::atomise("aussi bien que lui, bien que moi", f.session.separators());
        for k in [1, 5, 20] {
            let classifier = CountingDecisionMaker {
                calls: AtomicUsize::new(0),
                inner: FixedDecisionMaker { separate_probability: 0.4 },
            };
            let result = BeamSearch::new(&f.manager, &f.features, &f.session)
                .with_decision_maker(&classifier)
                .with_beam_width(k)
                .search(&atoms);
            assert_eq!(classifier.calls.load(AtomicOrdering::SeqCst), result.matches.len());
            assert_eq!(result.matches.len(), 4);
        }
    }

    #[test]
    fn test_degenerate_mode() {
        let f = fixture(&["IS_SEPARATOR_BEFORE\t-", "parce que"]);
        let atoms = TokenSequence::atomise("parce que -là", f.session.separators());

        let without_classifier = BeamSearch::new(&f.manager, &f.features, &f.session).search(&atoms);
        assert_eq!(without_classifier.hypotheses.len(), 1);
        assert_eq!(
            texts(&without_classifier, &atoms)[0],
            vec!["parce", "que", "-là"]
        );
        assert!(without_classifier.hypotheses[0].decisions().is_empty());

        let classifier = FixedDecisionMaker { separate_probability: 0.0 };
        let zero_width = BeamSearch::new(&f.manager, &f.features, &f.session)
            .with_decision_maker(&classifier)
            .with_beam_width(0)
            .search(&atoms);
        assert_eq!(zero_width.hypotheses.len(), 1);
        assert!(zero_width.matches.is_empty());
    }

    #[test]
    fn test_search_is_deterministic() {
        let f = fixture(&["aussi bien", "aussi bien que", "parce que", "bien que"]);
        let classifier = FixedDecisionMaker { separate_probability: 0.5 };
        let atoms = TokenSequence::atomise("Aussi bien que lui, parce que bien que moi.", f.session.separators());
        let search = BeamSearch::new(&f.manager, &f.features, &f.session)
            .with_decision_maker(&classifier)
            .with_beam_width(4);
        let first = search.search(&atoms);
        let second = search.search(&atoms);
        assert_eq!(texts(&first, &atoms), texts(&second, &atoms));
        let tagged: Vec<_> = first.hypotheses.iter().map(|h| h.tagged_tokens()).collect();
        let again: Vec<_> = second.hypotheses.iter().map(|h| h.tagged_tokens()).collect();
        assert_eq!(tagged, again);
    }

    #[test]
    fn test_every_hypothesis_covers_sentence() {
        let f = fixture(&["aussi bien", "aussi bien que", "bien que"]);
        let classifier = FixedDecisionMaker { separate_probability: 0.5 };
        let text = " aussi bien que lui, bien que moi ";
        let atoms = TokenSequence::atomise(text, f.session.separators());
        let result = BeamSearch::new(&f.manager, &f.features, &f.session)
            .with_decision_maker(&classifier)
            .with_beam_width(10)
            .search(&atoms);
        for hypothesis in &result.hypotheses {
            assert_eq!(hypothesis.len(), atoms.atom_count());
            let rebuilt: String = hypothesis
                .materialize(&atoms)
                .with_whitespace()
                .iter()
                .map(|t| t.original_text.as_str())
                .collect();
            assert_eq!(rebuilt, text);
        }
    }

    #[test]
    fn test_empty_sentence_yields_one_empty_hypothesis() {
        let f = fixture(&["parce que"]);
        let classifier = FixedDecisionMaker { separate_probability: 0.5 };
        let atoms = TokenSequence::atomise("", f.session.separators());
        let result = BeamSearch::new(&f.manager, &f.features, &f.session)
            .with_decision_maker(&classifier)
            .search(&atoms);
        assert_eq!(result.hypotheses.len(), 1);
        assert!(result.hypotheses[0].is_empty());
        assert!(result.hypotheses[0].materialize(&atoms).is_empty());
    }

    #[test]
    fn test_interval_search_decides_each_checked_atom() {
        let f = fixture(&["parce que"]);
        let classifier = FixedDecisionMaker { separate_probability: 0.2 };
        // "Il"(0) " "(1) "part"(2) " "(3) "parce"(4) " "(5) "que"(6) "."(7)
        let atoms = TokenSequence::atomise("Il part parce que.", f.session.separators());
        let result = BeamSearch::new(&f.manager, &f.features, &f.session)
            .with_decision_maker(&classifier)
            .search_intervals(&atoms);

        assert_eq!(result.fan_outs.iter().map(|s| s.atom).collect::<Vec<_>>(), vec![5, 6]);
        for step in &result.fan_outs {
            assert_eq!(step.patterns, vec!["parce que".to_string()]);
            assert!((step.weights[0] - 0.2).abs() < 1e-12);
            assert!((step.weights[1] - 0.8).abs() < 1e-12);
        }

        // duas decisões independentes: 4 combinações
        let all = texts(&result, &atoms);
        assert_eq!(all.len(), 4);
        assert_eq!(all[0], vec!["Il", "part", "parce que", "."]);
        assert_eq!(all[3], vec!["Il", "part", "parce", "que", "."]);
        assert!((result.hypotheses[0].score() - 0.64).abs() < 1e-12);
        assert!((result.hypotheses[3].score() - 0.04).abs() < 1e-12);

        let best = result.hypotheses[0].tagged_tokens();
        assert_eq!(best.len(), atoms.atom_count());
        let member = best.iter().find(|t| t.atom == 6).unwrap();
        assert!(member.decision.statistical);
        assert!(member.decision.authorities.contains(&AUTHORITY_INTERVAL.to_string()));
        assert!(member.decision.authorities.contains(&"parce que".to_string()));
    }

    #[test]
    fn test_interval_classifier_called_once_per_checked_atom() {
        let f = fixture(&["aussi bien", "aussi bien que"]);
        // "aussi"(0) " "(1) "bien"(2) " "(3) "que"(4): testados {1, 2, 3, 4}
        let atoms = TokenSequence::atomise("aussi bien que", f.session.separators());
        for k in [1, 3, 20] {
            let classifier = CountingDecisionMaker {
                calls: AtomicUsize::new(0),
                inner: FixedDecisionMaker { separate_probability: 0.4 },
            };
            let result = BeamSearch::new(&f.manager, &f.features, &f.session)
                .with_decision_maker(&classifier)
                .with_beam_width(k)
                .search_intervals(&atoms);
            assert_eq!(classifier.calls.load(AtomicOrdering::SeqCst), 4);
            assert_eq!(result.hypotheses.len(), k.min(16));
            assert_eq!(result.matches.len(), 2);
        }
    }

    #[test]
    fn test_interval_degenerate_mode() {
        let f = fixture(&["parce que"]);
        let atoms = TokenSequence::atomise("parce que", f.session.separators());
        let result = BeamSearch::new(&f.manager, &f.features, &f.session).search_intervals(&atoms);
        assert_eq!(result.hypotheses.len(), 1);
        assert_eq!(texts(&result, &atoms)[0], vec!["parce", "que"]);
        assert!(result.fan_outs.is_empty());
    }

    #[test]
    fn test_match_summaries() {
        let f = fixture(&["BienQue\tConjonctions\tbien que"]);
        let classifier = FixedDecisionMaker { separate_probability: 0.5 };
        let atoms = TokenSequence::atomise("bien que", f.session.separators());
        let result = BeamSearch::new(&f.manager, &f.features, &f.session)
            .with_decision_maker(&classifier)
            .search(&atoms);
        assert_eq!(
            result.matches,
            vec![MatchSummary {
                pattern: "BienQue".into(),
                group: Some("Conjonctions".into()),
                head: 1,
                atoms: vec![1, 2],
                covered: vec![0, 1, 2],
            }]
        );
    }
}
