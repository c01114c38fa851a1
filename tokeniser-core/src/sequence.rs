//! # Hipóteses da Busca em Feixe
//!
//! Uma [`TokenisedAtomicTokenSequence`] é uma tokenização parcial: uma decisão por átomo,
//! da esquerda para a direita. A busca em feixe bifurca hipóteses a cada casamento de padrão,
//! então copiar o histórico inteiro a cada bifurcação seria quadrático no tamanho da frase.
//!
//! ## Representação persistente
//!
//! O histórico é uma lista ligada compartilhada (`Arc<DecisionNode>`): estender uma hipótese
//! cria um único nó novo apontando para o histórico anterior, que continua válido para as
//! outras hipóteses que o compartilham. As decisões anexadas antecipadamente aos demais
//! átomos de um padrão escolhido ficam num pequeno mapa `pending` até a busca chegar nelas.
//!
//! ## Score
//!
//! Apenas decisões **estatísticas** contam. O score padrão é o produto das probabilidades
//! (acumulado em log); a alternativa é a média geométrica, que não penaliza frases com
//! muitos padrões.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::decision::{Decision, TaggedToken, TokeniserOutcome};
use crate::token::{Token, TokenSequence};

/// Como combinar as probabilidades das decisões estatísticas.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoringStrategy {
    /// Produto das probabilidades.
    #[default]
    Product,
    /// Média geométrica das probabilidades.
    GeometricMean,
}

#[derive(Debug)]
struct DecisionNode {
    tagged: TaggedToken,
    previous: Option<Arc<DecisionNode>>,
}

/// Uma hipótese do feixe.
#[derive(Debug, Clone)]
pub struct TokenisedAtomicTokenSequence {
    tail: Option<Arc<DecisionNode>>,
    len: usize,
    /// Decisões antecipadas, ordenadas pelo átomo.
    pending: Vec<TaggedToken>,
    log_probability: f64,
    statistical_count: usize,
    scoring: ScoringStrategy,
}

impl TokenisedAtomicTokenSequence {
    pub fn new(scoring: ScoringStrategy) -> Self {
        Self {
            tail: None,
            len: 0,
            pending: Vec::new(),
            log_probability: 0.0,
            statistical_count: 0,
            scoring,
        }
    }

    /// Número de decisões já aplicadas (sem contar as pendentes).
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Acrescenta a decisão do próximo átomo.
    pub fn push(&mut self, tagged: TaggedToken) {
        if tagged.decision.statistical {
            self.log_probability += tagged.decision.probability.ln();
            self.statistical_count += 1;
        }
        let previous = self.tail.take();
        self.tail = Some(Arc::new(DecisionNode { tagged, previous }));
        self.len += 1;
    }

    /// Registra uma decisão para um átomo ainda não alcançado.
    ///
    /// Se já havia uma decisão pendente com outro resultado, ela é substituída e devolvida
    /// para que o chamador possa reportar a inconsistência.
    pub fn add_pending(&mut self, tagged: TaggedToken) -> Option<TaggedToken> {
        match self.pending.binary_search_by_key(&tagged.atom, |t| t.atom) {
            Ok(i) => {
                let previous = std::mem::replace(&mut self.pending[i], tagged);
                (previous.decision.outcome != self.pending[i].decision.outcome).then_some(previous)
            }
            Err(i) => {
                self.pending.insert(i, tagged);
                None
            }
        }
    }

    /// Remove a decisão pendente do átomo, se houver.
    pub fn take_pending(&mut self, atom: usize) -> Option<TaggedToken> {
        let i = self.pending.binary_search_by_key(&atom, |t| t.atom).ok()?;
        Some(self.pending.remove(i))
    }

    pub fn has_pending(&self, atom: usize) -> bool {
        self.pending.binary_search_by_key(&atom, |t| t.atom).is_ok()
    }

    /// Score usado como prioridade no feixe.
    pub fn score(&self) -> f64 {
        match self.scoring {
            ScoringStrategy::Product => self.log_probability.exp(),
            ScoringStrategy::GeometricMean if self.statistical_count == 0 => 1.0,
            ScoringStrategy::GeometricMean => (self.log_probability / self.statistical_count as f64).exp(),
        }
    }

    pub fn scoring(&self) -> ScoringStrategy {
        self.scoring
    }

    /// Todas as decisões aplicadas, em ordem.
    pub fn tagged_tokens(&self) -> Vec<TaggedToken> {
        let mut tagged = Vec::with_capacity(self.len);
        let mut node = self.tail.as_deref();
        while let Some(current) = node {
            tagged.push(current.tagged.clone());
            node = current.previous.as_deref();
        }
        tagged.reverse();
        tagged
    }

    /// Apenas as decisões estatísticas.
    pub fn decisions(&self) -> Vec<Decision> {
        self.tagged_tokens()
            .into_iter()
            .filter(|t| t.decision.statistical)
            .map(|t| t.decision)
            .collect()
    }

    /// Une os átomos conforme as decisões: JOIN cola no token corrente, SEPARATE abre um novo.
    pub fn materialize(&self, atoms: &TokenSequence) -> TokenSequence {
        let mut tokens: Vec<Token> = Vec::new();
        let mut current: Option<Token> = None;

        for tagged in self.tagged_tokens() {
            let Some(atom) = atoms.atom(tagged.atom) else {
                continue;
            };
            match current.as_mut() {
                Some(token) if tagged.decision.outcome == TokeniserOutcome::Join => {
                    token.end = atom.end;
                    token.text.push_str(&atom.text);
                    token.original_text.push_str(&atom.original_text);
                    token.whitespace &= atom.whitespace;
                    token.separator = false;
                }
                _ => {
                    tokens.extend(current.take());
                    current = Some(atom.clone());
                }
            }
        }
        tokens.extend(current);

        TokenSequence::from_tokens(atoms.text(), tokens)
    }
}
