//! # Modelo de Tokenização
//!
//! O modelo encapsula tudo o que o tokenizador precisa para decidir:
//! - **Descritor de padrões**: regras padrão dos separadores + padrões a testar
//! - **Features** avaliadas em cada casamento
//! - **Pesos MaxEnt** treinados sobre os eventos do corpus
//!
//! Tudo é serializável em JSON, então um modelo treinado pode ser salvo e recarregado sem
//! retreino. O modelo francês padrão é treinado na hora sobre o corpus embutido.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::TrainingParams;
use crate::corpus::{get_corpus, AnnotatedSentence};
use crate::defaults::TokeniserPatternManager;
use crate::error::Result;
use crate::events::pattern_events;
use crate::features::{FeatureExpr, FeatureSet};
use crate::maxent::MaxEntModel;
use crate::session::TokeniserSession;
use crate::token::SeparatorClass;

/// Descritor francês: comportamento padrão dos separadores e locuções a testar.
pub const FRENCH_DESCRIPTOR: &str = "\
# Comportement par défaut des séparateurs
IS_NOT_SEPARATOR -
IS_SEPARATOR_AFTER '
# Conjonctions
ParceQue\tConjonctions\tparce que
AussiBienQue\tConjonctions\taussi bien que
BienQue\tConjonctions\tbien que
TandisQue\tConjonctions\ttandis que
# Adverbes et prépositions
AussiBien\tAdverbes\taussi bien
ALaFois\tAdverbes\tà la fois
ParExemple\tAdverbes\tpar exemple
AfinDe\tPrépositions\tafin de
# Noms composés
PommeDeTerre\tNoms\tpomme de terre
";

/// O modelo completo.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokeniserModel {
    /// Linhas do descritor, na ordem original.
    pub descriptors: Vec<String>,
    pub features: Vec<FeatureExpr>,
    pub maxent: MaxEntModel,
}

impl TokeniserModel {
    /// Treina um modelo a partir de um descritor, das features e de um corpus de referência.
    pub fn train(
        descriptors: Vec<String>,
        features: Vec<FeatureExpr>,
        corpus: &[AnnotatedSentence],
        session: &TokeniserSession,
        params: &TrainingParams,
    ) -> Result<Self> {
        let manager = TokeniserPatternManager::new(&descriptors, session.separators())?;
        let feature_set = FeatureSet::new(features.clone())?;
        let events = pattern_events(corpus, &manager, &feature_set, session)?;

        let mut maxent = MaxEntModel::new();
        maxent.train(&events, params);
        info!(
            patterns = manager.patterns().len(),
            features = features.len(),
            events = events.len(),
            "modelo de tokenização treinado"
        );

        Ok(Self {
            descriptors,
            features,
            maxent,
        })
    }

    /// Constrói o modelo francês padrão treinando sobre o corpus embutido.
    pub fn french_default(session: &TokeniserSession, params: &TrainingParams) -> Result<Self> {
        let descriptors = FRENCH_DESCRIPTOR.lines().map(String::from).collect();
        Self::train(descriptors, french_features(), &get_corpus(), session, params)
    }

    /// Compila o descritor com a classe de separadores da sessão.
    pub fn pattern_manager(&self, separators: &SeparatorClass) -> Result<TokeniserPatternManager> {
        TokeniserPatternManager::new(&self.descriptors, separators)
    }

    pub fn feature_set(&self) -> Result<FeatureSet> {
        FeatureSet::new(self.features.clone())
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        std::fs::write(path, self.to_json()?)?;
        Ok(())
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let model = Self::from_json(&std::fs::read_to_string(path.as_ref())?)?;
        info!(path = %path.as_ref().display(), "modelo de tokenização carregado");
        Ok(model)
    }
}

/// Features do modelo francês: o padrão e as palavras em volta do casamento.
pub fn french_features() -> Vec<FeatureExpr> {
    use crate::features::FeatureExpr::*;

    let before = FeatureExpr::pattern_offset(-1, WordForm);
    let after = FeatureExpr::pattern_offset(1, WordForm);
    vec![
        CurrentPattern,
        CurrentGroup,
        PatternIndexInSentence,
        TokeniserPatterns,
        before.clone(),
        after.clone(),
        FeatureExpr::pattern_offset(-1, LexiconPosTags),
        FeatureExpr::pattern_offset(1, LexiconPosTags),
        FeatureExpr::pattern_offset(1, UnknownWord),
        Concat { features: vec![CurrentPattern, before] },
        Concat { features: vec![CurrentPattern, after] },
        Named {
            name: "NextIsCapitalised".into(),
            feature: Box::new(FeatureExpr::pattern_offset(1, Regex { pattern: r"\p{Lu}.*".into() })),
        },
        Cached {
            feature: Box::new(FeatureExpr::pattern_offset(-1, NLetterSuffix { n: 2 })),
        },
    ]
}
