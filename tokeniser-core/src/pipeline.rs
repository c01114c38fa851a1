//! # Pipeline de Tokenização - Orquestrador com Eventos Observáveis
//!
//! O pipeline coordena todos os módulos (atomização, filtros, casamento de padrões, busca
//! em feixe, materialização) e emite eventos em cada passo via um canal Rust (`mpsc`),
//! permitindo que o servidor WebSocket transmita o progresso em tempo real para o cliente.
//!
//! ## Fluxo
//!
//! 1. **Atomização** com a classe de separadores do gerenciador de padrões. Trechos
//!    casados pelos filtros de regex ([`TokenRegexFilter`]) viram um único átomo.
//! 2. **Filtros** reescrevem o texto de análise dos átomos ("ETAT" -> "état").
//! 3. **Busca** em feixe ([`TokeniserMode::Pattern`]), por intervalos
//!    ([`TokeniserMode::Interval`]) ou regra fixa ([`TokeniserMode::Simple`]).
//! 4. **Materialização** de cada hipótese e nova passagem dos filtros sobre os tokens.
//!
//! ## Exemplo
//!
//! ```rust,no_run
//! use tokeniser_core::pipeline::TokeniserPipeline;
//!
//! let pipeline = TokeniserPipeline::french_default().unwrap();
//! let tokens = pipeline.tokenise("Il reste parce que la pluie tombe.");
//! assert!(tokens.texts().contains(&"parce que"));
//! ```

use std::sync::{mpsc, Arc};
use std::time::Instant;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::beam::{BeamSearch, FanOutStep, MatchSummary};
use crate::config::{TokeniserConfig, TokeniserMode};
use crate::decision::{Decision, DecisionMaker, TaggedToken, TokeniserOutcome, AUTHORITY_SIMPLE};
use crate::defaults::TokeniserPatternManager;
use crate::error::Result;
use crate::features::FeatureSet;
use crate::filters::{AllUppercaseFilter, LowercaseKnownFirstWordFilter, TokenRegexFilter, TokenSequenceFilter};
use crate::lexicon::MemoryLexicon;
use crate::model::TokeniserModel;
use crate::sequence::TokenisedAtomicTokenSequence;
use crate::session::TokeniserSession;
use crate::token::{Token, TokenSequence};

/// Uma tokenização candidata, já materializada.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokeniserResult {
    pub tokens: TokenSequence,
    pub score: f64,
    /// Decisão tomada para cada átomo, na ordem dos átomos.
    pub decisions: Vec<TaggedToken>,
}

/// Eventos emitidos pelo pipeline durante o processamento.
///
/// Estes eventos permitem que a UI visualize o "raciocínio" do tokenizador passo a passo.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum PipelineEvent {
    /// **Passo 1**: Atomização (e filtros) concluída.
    AtomsReady {
        atoms: Vec<Token>,
        total: usize,
    },
    /// **Passo 2**: Um padrão casou com a sentença.
    PatternMatched {
        summary: MatchSummary,
        /// Trecho da sentença coberto pelo casamento.
        text: String,
    },
    /// **Passo 3**: Bifurcação da busca numa cabeça de casamentos.
    FanOut {
        step: FanOutStep,
        head_text: String,
    },
    /// **Passo 4**: Uma hipótese final, na ordem do feixe.
    HypothesisRanked {
        rank: usize,
        score: f64,
        tokens: Vec<String>,
    },
    /// **Conclusão**: as hipóteses materializadas e o tempo de processamento.
    Done {
        results: Vec<TokeniserResult>,
        total_tokens: usize,
        processing_ms: u64,
    },
    /// **Falha**: Ocorreu um erro irrecuperável.
    Error {
        message: String,
    },
}

/// O pipeline de tokenização principal.
///
/// Todo o estado é somente-leitura depois da construção, então uma instância pode ser
/// compartilhada entre threads (ver [`TokeniserPipeline::tokenise_batch`]).
pub struct TokeniserPipeline {
    config: TokeniserConfig,
    session: TokeniserSession,
    manager: TokeniserPatternManager,
    features: FeatureSet,
    decision_maker: Option<Box<dyn DecisionMaker>>,
    filters: Vec<Box<dyn TokenSequenceFilter>>,
    regex_filters: Vec<TokenRegexFilter>,
}

impl TokeniserPipeline {
    /// Cria o pipeline francês treinando o modelo padrão com os parâmetros da configuração.
    pub fn new(config: TokeniserConfig) -> Result<Self> {
        let session = TokeniserSession::new(config.separator_class()?, Arc::new(MemoryLexicon::french()));
        let model = TokeniserModel::french_default(&session, &config.training)?;
        Self::from_model(config, session, model)
    }

    pub fn french_default() -> Result<Self> {
        Self::new(TokeniserConfig::default())
    }

    /// Monta o pipeline a partir de um modelo já treinado (ou carregado de disco), com os
    /// filtros padrão e os filtros de regex da configuração.
    pub fn from_model(config: TokeniserConfig, session: TokeniserSession, model: TokeniserModel) -> Result<Self> {
        let manager = model.pattern_manager(session.separators())?;
        let features = model.feature_set()?;
        let regex_filters = config
            .regex_filters
            .iter()
            .cloned()
            .map(TokenRegexFilter::new)
            .collect::<Result<Vec<_>>>()?;

        let mut pipeline = Self::from_parts(config, session, manager, features, Some(Box::new(model.maxent)))
            .with_filter(LowercaseKnownFirstWordFilter)
            .with_filter(AllUppercaseFilter);
        pipeline.regex_filters = regex_filters;
        Ok(pipeline)
    }

    /// Monta o pipeline peça por peça, sem filtros (os `regex_filters` da configuração são
    /// ignorados). Sem classificador, a busca fica no modo degenerado.
    pub fn from_parts(
        config: TokeniserConfig,
        session: TokeniserSession,
        manager: TokeniserPatternManager,
        features: FeatureSet,
        decision_maker: Option<Box<dyn DecisionMaker>>,
    ) -> Self {
        Self {
            config,
            session,
            manager,
            features,
            decision_maker,
            filters: Vec::new(),
            regex_filters: Vec::new(),
        }
    }

    pub fn with_filter(mut self, filter: impl TokenSequenceFilter + 'static) -> Self {
        self.filters.push(Box::new(filter));
        self
    }

    pub fn with_regex_filter(mut self, filter: TokenRegexFilter) -> Self {
        self.regex_filters.push(filter);
        self
    }

    pub fn config(&self) -> &TokeniserConfig {
        &self.config
    }

    pub fn session(&self) -> &TokeniserSession {
        &self.session
    }

    /// A melhor tokenização no modo configurado.
    pub fn tokenise(&self, text: &str) -> TokenSequence {
        self.tokenise_with_decisions(text)
            .into_iter()
            .next()
            .map(|result| result.tokens)
            .unwrap_or_else(|| self.atomise(text))
    }

    /// Átomos da sentença como a busca os vê: separadores do gerenciador de padrões,
    /// marcadores dos filtros de regex e filtros de sequência já aplicados.
    pub fn atomise(&self, text: &str) -> TokenSequence {
        let placeholders: Vec<_> = self.regex_filters.iter().flat_map(|filter| filter.apply(text)).collect();
        let mut atoms = TokenSequence::atomise_with_placeholders(text, self.manager.separators(), &placeholders);
        self.apply_filters(&mut atoms);
        atoms
    }

    /// Todas as hipóteses do modo configurado, da melhor para a pior.
    pub fn tokenise_with_decisions(&self, text: &str) -> Vec<TokeniserResult> {
        self.tokenise_with_mode(text, self.config.mode)
    }

    /// Processa o texto de forma síncrona, consumindo os eventos até o `Done`.
    pub fn tokenise_with_mode(&self, text: &str, mode: TokeniserMode) -> Vec<TokeniserResult> {
        let (tx, rx) = mpsc::channel();
        self.tokenise_streaming(text, mode, tx);

        let mut results = vec![];
        while let Ok(event) = rx.recv() {
            if let PipelineEvent::Done { results: done, .. } = event {
                results = done;
            }
        }
        results
    }

    /// Tokeniza várias sentenças em paralelo (uma busca independente por sentença).
    pub fn tokenise_batch(&self, texts: &[&str]) -> Vec<TokenSequence> {
        texts.par_iter().map(|text| self.tokenise(text)).collect()
    }

    /// Executa o pipeline enviando eventos de progresso em tempo real.
    ///
    /// # Fluxo de Eventos
    /// 1. `AtomsReady`: átomos gerados e filtrados.
    /// 2. `PatternMatched` (Loop): casamentos encontrados (fora do modo simples).
    /// 3. `FanOut` (Loop): bifurcações da busca.
    /// 4. `HypothesisRanked` (Loop): hipóteses finais em ordem de score.
    /// 5. `Done`: resultado consolidado.
    pub fn tokenise_streaming(&self, text: &str, mode: TokeniserMode, tx: mpsc::Sender<PipelineEvent>) {
        let start = Instant::now();

        // === Passo 1: Atomização + filtros ===
        let atoms = self.atomise(text);
        let _ = tx.send(PipelineEvent::AtomsReady {
            atoms: atoms.with_whitespace().to_vec(),
            total: atoms.atom_count(),
        });

        // === Passos 2 e 3: decisões ===
        let hypotheses = match mode {
            TokeniserMode::Simple => vec![self.simple_hypothesis(&atoms)],
            TokeniserMode::Pattern | TokeniserMode::Interval => {
                let mut search = BeamSearch::new(&self.manager, &self.features, &self.session)
                    .with_beam_width(self.config.beam_width)
                    .with_scoring(self.config.scoring);
                if let Some(decision_maker) = &self.decision_maker {
                    search = search.with_decision_maker(decision_maker.as_ref());
                }
                let result = if mode == TokeniserMode::Interval {
                    search.search_intervals(&atoms)
                } else {
                    search.search(&atoms)
                };

                for summary in result.matches {
                    let text = covered_text(&atoms, &summary.covered);
                    let _ = tx.send(PipelineEvent::PatternMatched { summary, text });
                }
                for step in result.fan_outs {
                    let head_text = atoms.atom(step.atom).map(|t| t.text.clone()).unwrap_or_default();
                    let _ = tx.send(PipelineEvent::FanOut { step, head_text });
                }
                result.hypotheses
            }
        };

        // === Passo 4: materialização ===
        let results: Vec<TokeniserResult> = hypotheses
            .iter()
            .map(|hypothesis| {
                let mut tokens = hypothesis.materialize(&atoms);
                self.apply_filters(&mut tokens);
                TokeniserResult {
                    tokens,
                    score: hypothesis.score(),
                    decisions: hypothesis.tagged_tokens(),
                }
            })
            .collect();

        for (rank, result) in results.iter().enumerate() {
            let _ = tx.send(PipelineEvent::HypothesisRanked {
                rank,
                score: result.score,
                tokens: result.tokens.texts().into_iter().map(String::from).collect(),
            });
        }

        let total_tokens = results.first().map_or(0, |r| r.tokens.len());
        debug!(?mode, atoms = atoms.atom_count(), hypotheses = results.len(), total_tokens, "sentença tokenizada");
        let _ = tx.send(PipelineEvent::Done {
            results,
            total_tokens,
            processing_ms: start.elapsed().as_millis() as u64,
        });
    }

    fn apply_filters(&self, tokens: &mut TokenSequence) {
        for filter in &self.filters {
            filter.apply(tokens, &self.session);
        }
    }

    /// Modo simples: todo átomo separa, exceto o apóstrofo, que cola no token anterior.
    fn simple_hypothesis(&self, atoms: &TokenSequence) -> TokenisedAtomicTokenSequence {
        let mut hypothesis = TokenisedAtomicTokenSequence::new(self.config.scoring);
        for (i, atom) in atoms.with_whitespace().iter().enumerate() {
            let outcome = if i > 0 && is_apostrophe(&atom.original_text) {
                TokeniserOutcome::Join
            } else {
                TokeniserOutcome::Separate
            };
            hypothesis.push(TaggedToken::new(
                i,
                Decision::default_decision(outcome).with_authority(AUTHORITY_SIMPLE),
            ));
        }
        hypothesis
    }
}

fn is_apostrophe(text: &str) -> bool {
    matches!(text, "'" | "’")
}

/// Trecho da sentença entre o primeiro e o último átomo dados.
fn covered_text(atoms: &TokenSequence, indexes: &[usize]) -> String {
    let first = indexes.iter().min().and_then(|&i| atoms.atom(i));
    let last = indexes.iter().max().and_then(|&i| atoms.atom(i));
    match (first, last) {
        (Some(first), Some(last)) => atoms.text().get(first.start..last.end).unwrap_or_default().to_string(),
        _ => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decision::{FixedDecisionMaker, AUTHORITY_INTERVAL};
    use crate::filters::RegexFilterSpec;
    use crate::token::SeparatorClass;
    use proptest::prelude::*;
    use std::sync::OnceLock;

    fn french() -> &'static TokeniserPipeline {
        static PIPELINE: OnceLock<TokeniserPipeline> = OnceLock::new();
        PIPELINE.get_or_init(|| TokeniserPipeline::french_default().unwrap())
    }

    fn texts(tokens: &TokenSequence) -> Vec<String> {
        tokens.texts().into_iter().map(String::from).collect()
    }

    fn rebuilt(tokens: &TokenSequence) -> String {
        tokens.with_whitespace().iter().map(|t| t.original_text.as_str()).collect()
    }

    #[test]
    fn test_pipeline_joins_compound() {
        let tokens = french().tokenise("Il reste ici parce que la pluie tombe.");
        // "Il" -> "il": o léxico só conhece a forma minúscula
        assert_eq!(
            texts(&tokens),
            vec!["il", "reste", "ici", "parce que", "la", "pluie", "tombe", "."]
        );
        assert_eq!(rebuilt(&tokens), "Il reste ici parce que la pluie tombe.");
    }

    #[test]
    fn test_pipeline_empty() {
        let tokens = french().tokenise("");
        assert!(tokens.is_empty());
        let results = french().tokenise_with_decisions("");
        assert_eq!(results.len(), 1);
    }

    #[test]
    fn test_simple_mode_keeps_apostrophe_with_previous_word() {
        let results = french().tokenise_with_mode("l'homme arrive parce que", TokeniserMode::Simple);
        assert_eq!(results.len(), 1);
        assert_eq!(texts(&results[0].tokens), vec!["l'", "homme", "arrive", "parce", "que"]);
        assert!(results[0]
            .decisions
            .iter()
            .all(|t| t.decision.authorities == vec![AUTHORITY_SIMPLE.to_string()]));
        assert_eq!(results[0].score, 1.0);
    }

    #[test]
    fn test_filters_rewrite_analysis_text_only() {
        let tokens = french().tokenise("ETAT ET ECOLE");
        assert_eq!(texts(&tokens), vec!["état", "et", "école"]);
        assert_eq!(rebuilt(&tokens), "ETAT ET ECOLE");

        let tokens = french().tokenise("Parce que il pleut.");
        let first = tokens.get(0).unwrap();
        assert!(first.text.starts_with("parce"));
        assert!(first.original_text.starts_with("Parce"));
    }

    #[test]
    fn test_pipeline_events_streaming() {
        let (tx, rx) = mpsc::channel();
        french().tokenise_streaming("Il chante aussi bien que moi.", TokeniserMode::Pattern, tx);

        let events: Vec<PipelineEvent> = rx.try_iter().collect();
        assert!(
            matches!(&events[0], PipelineEvent::AtomsReady { total: 12, .. }),
            "Primeiro evento deve ser AtomsReady"
        );
        assert!(
            matches!(events.last(), Some(PipelineEvent::Done { .. })),
            "Último evento deve ser Done"
        );

        let matched: Vec<&str> = events
            .iter()
            .filter_map(|e| match e {
                PipelineEvent::PatternMatched { text, .. } => Some(text.as_str()),
                _ => None,
            })
            .collect();
        assert!(matched.contains(&"aussi bien"));
        assert!(matched.contains(&"aussi bien que"));

        let first_fan_out = events.iter().position(|e| matches!(e, PipelineEvent::FanOut { .. }));
        let first_ranked = events.iter().position(|e| matches!(e, PipelineEvent::HypothesisRanked { .. }));
        assert!(first_fan_out.is_some());
        assert!(first_fan_out < first_ranked);
    }

    #[test]
    fn test_event_json_shape() {
        let event = PipelineEvent::Error { message: "falhou".into() };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "Error");
        assert_eq!(json["data"]["message"], "falhou");
    }

    #[test]
    fn test_hypotheses_sorted_and_bounded() {
        let results = french().tokenise_with_decisions("Il chante aussi bien que moi, bien que fatigué.");
        assert!(!results.is_empty());
        assert!(results.len() <= french().config().beam_width);
        assert!(results.windows(2).all(|w| w[0].score >= w[1].score));
    }

    #[test]
    fn test_batch_matches_sequential() {
        let texts = ["Il dort parce que la nuit tombe.", "", "Elle parle aussi bien le français.", "l'été"];
        let batch = french().tokenise_batch(&texts);
        let sequential: Vec<TokenSequence> = texts.iter().map(|t| french().tokenise(t)).collect();
        assert_eq!(batch, sequential);
    }

    #[test]
    fn test_pipeline_without_classifier_uses_defaults() {
        let session = TokeniserSession::default();
        let manager = TokeniserPatternManager::new(&["parce que"], session.separators()).unwrap();
        let pipeline = TokeniserPipeline::from_parts(
            TokeniserConfig::default(),
            session.clone(),
            manager.clone(),
            FeatureSet::empty(),
            None,
        );
        assert_eq!(texts(&pipeline.tokenise("parce que")), vec!["parce", "que"]);

        let pipeline = TokeniserPipeline::from_parts(
            TokeniserConfig::default(),
            session,
            manager,
            FeatureSet::empty(),
            Some(Box::new(FixedDecisionMaker { separate_probability: 0.2 })),
        );
        assert_eq!(texts(&pipeline.tokenise("parce que")), vec!["parce que"]);
    }

    fn parce_que_pipeline(decision_maker: Option<Box<dyn DecisionMaker>>) -> TokeniserPipeline {
        let session = TokeniserSession::default();
        let manager = TokeniserPatternManager::new(&["parce que"], session.separators()).unwrap();
        TokeniserPipeline::from_parts(TokeniserConfig::default(), session, manager, FeatureSet::empty(), decision_maker)
    }

    #[test]
    fn test_interval_mode_decides_each_tested_atom() {
        let pipeline = parce_que_pipeline(Some(Box::new(FixedDecisionMaker { separate_probability: 0.2 })));
        let results = pipeline.tokenise_with_mode("Il part parce que.", TokeniserMode::Interval);
        assert_eq!(results.len(), 4);
        assert_eq!(texts(&results[0].tokens), vec!["Il", "part", "parce que", "."]);
        assert!((results[0].score - 0.64).abs() < 1e-12);
        assert!(results[0]
            .decisions
            .iter()
            .any(|t| t.decision.authorities.contains(&AUTHORITY_INTERVAL.to_string())));

        // sem classificador, cai nas decisões padrão
        let pipeline = parce_que_pipeline(None);
        let results = pipeline.tokenise_with_mode("Il part parce que.", TokeniserMode::Interval);
        assert_eq!(results.len(), 1);
        assert_eq!(texts(&results[0].tokens), vec!["Il", "part", "parce", "que", "."]);
    }

    #[test]
    fn test_interval_mode_streams_matches() {
        let (tx, rx) = mpsc::channel();
        french().tokenise_streaming("Il reste ici parce que la pluie tombe.", TokeniserMode::Interval, tx);
        let events: Vec<PipelineEvent> = rx.try_iter().collect();
        assert!(events.iter().any(|e| matches!(e, PipelineEvent::PatternMatched { .. })));
        assert!(events.iter().any(|e| matches!(e, PipelineEvent::FanOut { .. })));

        let Some(PipelineEvent::Done { results, .. }) = events.last() else {
            panic!("Último evento deve ser Done");
        };
        assert!(!results.is_empty());
        assert!(results.windows(2).all(|w| w[0].score >= w[1].score));
        for result in results {
            assert_eq!(rebuilt(&result.tokens), "Il reste ici parce que la pluie tombe.");
        }
    }

    #[test]
    fn test_regex_filters_keep_spans_whole() {
        let tokens = french().tokenise("Il a payé 3,50 euros à www.exemple.fr.");
        let words = texts(&tokens);
        assert!(words.contains(&"3,50".to_string()), "{words:?}");
        assert!(words.contains(&"www.exemple.fr".to_string()), "{words:?}");
        assert_eq!(words.last().map(String::as_str), Some("."));
        assert_eq!(rebuilt(&tokens), "Il a payé 3,50 euros à www.exemple.fr.");
    }

    #[test]
    fn test_regex_filter_replacement_is_analysis_text() {
        let filter = TokenRegexFilter::new(RegexFilterSpec {
            replacement: Some("NUMERO".into()),
            ..RegexFilterSpec::new(r"n° ?\d+")
        })
        .unwrap();
        let pipeline = parce_que_pipeline(None).with_regex_filter(filter);

        let atoms = pipeline.atomise("article n° 12 parce que");
        assert_eq!(atoms.atom_count(), 7);
        let tokens = pipeline.tokenise("article n° 12 parce que");
        assert_eq!(texts(&tokens), vec!["article", "NUMERO", "parce", "que"]);
        assert_eq!(tokens.get(1).unwrap().original_text, "n° 12");
        assert_eq!(rebuilt(&tokens), "article n° 12 parce que");
    }

    #[test]
    fn test_atomisation_follows_the_manager_separators() {
        // a sessão usa a classe padrão (com apóstrofo); o gerenciador, só espaços
        let session = TokeniserSession::default();
        let manager = TokeniserPatternManager::new(&["parce que"], &SeparatorClass::new(r"[\s]").unwrap()).unwrap();
        let pipeline =
            TokeniserPipeline::from_parts(TokeniserConfig::default(), session, manager, FeatureSet::empty(), None);

        assert_eq!(texts(&pipeline.atomise("l'homme, parce que")), vec!["l'homme,", "parce", "que"]);
        assert_eq!(texts(&pipeline.tokenise("l'homme")), vec!["l'homme"]);
    }

    fn sentence_strategy() -> impl Strategy<Value = String> {
        let pieces = vec![
            "parce", "que", "aussi", "bien", "à", "la", "fois", "ETAT", "ET", "Il", "l", "'", "’", " ", "  ", ",",
            ".", "-", "é", "\t",
        ];
        prop::collection::vec(prop::sample::select(pieces), 0..24).prop_map(|parts| parts.concat())
    }

    proptest! {
        #[test]
        fn test_every_result_covers_the_sentence(text in sentence_strategy()) {
            for mode in [TokeniserMode::Pattern, TokeniserMode::Interval, TokeniserMode::Simple] {
                let results = french().tokenise_with_mode(&text, mode);
                prop_assert!(!results.is_empty());
                for result in &results {
                    prop_assert_eq!(rebuilt(&result.tokens), text.clone());
                }
            }
        }
    }
}
