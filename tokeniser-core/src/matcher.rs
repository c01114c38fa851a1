//! # Casamento de Padrões
//!
//! Procura, na visão **com espaços** de uma [`TokenSequence`], todas as posições em que um
//! [`TokenPattern`] casa uma sequência contígua de átomos. Cada casamento vira um
//! [`PatternMatchSequence`]. Casamentos sobrepostos são todos mantidos: a consistência entre
//! eles é problema da busca em feixe, não do casador.
//!
//! ## Sentinelas
//!
//! Um padrão que começa com `\b` também é testado numa posição virtual antes do primeiro
//! átomo; um padrão que termina com `\b` aceita uma posição virtual depois do último. Essas
//! posições aparecem como `None` em [`PatternMatchSequence::atoms`].
//!
//! ## Anotações
//!
//! Em vez de anotar os tokens in-place, o casador devolve uma tabela lateral
//! ([`MatchAnnotations`]) indexada pela posição do átomo. Ela é preenchida uma única vez,
//! antes da busca em feixe, e só é lida depois disso (pela feature
//! [`crate::features::FeatureExpr::TokeniserPatterns`] e pelos registros de depuração).

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};

use crate::pattern::TokenPattern;
use crate::token::{Token, TokenSequence};

/// Um casamento concreto de um padrão contra átomos contíguos.
#[derive(Debug, Clone)]
pub struct PatternMatchSequence<'p> {
    pattern: &'p TokenPattern,
    atoms: Vec<Option<usize>>,
    tokens_to_check: Vec<usize>,
}

impl<'p> PatternMatchSequence<'p> {
    pub fn pattern(&self) -> &'p TokenPattern {
        self.pattern
    }

    /// Átomos casados na ordem do padrão (`None` nas sentinelas).
    pub fn atoms(&self) -> &[Option<usize>] {
        &self.atoms
    }

    /// Átomos nas posições "a testar" do padrão.
    pub fn tokens_to_check(&self) -> &[usize] {
        &self.tokens_to_check
    }

    /// O primeiro átomo a testar: é nele que a decisão estatística é tomada.
    pub fn head(&self) -> usize {
        self.tokens_to_check[0]
    }

    /// O último átomo a testar, usado para ordenar casamentos aninhados.
    pub fn end(&self) -> usize {
        self.tokens_to_check[self.tokens_to_check.len() - 1]
    }

    /// Primeiro átomo real coberto pelo casamento.
    pub fn first_atom(&self) -> usize {
        self.atoms.iter().flatten().next().copied().unwrap_or_else(|| self.head())
    }

    /// Átomos reais cobertos pelo casamento.
    pub fn covered_atoms(&self) -> impl Iterator<Item = usize> + '_ {
        self.atoms.iter().flatten().copied()
    }

    fn order_key(&self) -> (usize, usize, usize, &str) {
        (self.first_atom(), self.end(), self.atoms.len(), self.pattern.regexp())
    }
}

impl PartialEq for PatternMatchSequence<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.order_key() == other.order_key()
    }
}

impl Eq for PatternMatchSequence<'_> {}

impl PartialOrd for PatternMatchSequence<'_> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for PatternMatchSequence<'_> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.order_key().cmp(&other.order_key())
    }
}

/// "O átomo foi casado pelo padrão P na posição i".
#[derive(Debug, Clone, Copy)]
pub struct TokenPatternMatch<'p> {
    pub pattern: &'p TokenPattern,
    /// Posição dentro do padrão.
    pub position: usize,
    /// Índice do casamento em [`PatternMatches::sequences`].
    pub sequence: usize,
}

/// Tabela lateral: átomo -> casamentos que o cobrem.
#[derive(Debug, Clone, Default)]
pub struct MatchAnnotations<'p> {
    by_atom: HashMap<usize, Vec<TokenPatternMatch<'p>>>,
}

impl<'p> MatchAnnotations<'p> {
    fn record(&mut self, atom: usize, annotation: TokenPatternMatch<'p>) {
        self.by_atom.entry(atom).or_default().push(annotation);
    }

    pub fn for_atom(&self, atom: usize) -> &[TokenPatternMatch<'p>] {
        self.by_atom.get(&atom).map(Vec::as_slice).unwrap_or(&[])
    }
}

/// Todos os casamentos de uma sentença.
#[derive(Debug, Clone, Default)]
pub struct PatternMatches<'p> {
    pub sequences: Vec<PatternMatchSequence<'p>>,
    pub annotations: MatchAnnotations<'p>,
}

impl<'p> PatternMatches<'p> {
    pub fn is_empty(&self) -> bool {
        self.sequences.is_empty()
    }

    /// Casamentos agrupados pelo átomo cabeça, do mais curto ao mais longo.
    pub fn by_head(&self) -> BTreeMap<usize, Vec<usize>> {
        let mut heads: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
        for (i, sequence) in self.sequences.iter().enumerate() {
            heads.entry(sequence.head()).or_default().push(i);
        }
        for indexes in heads.values_mut() {
            indexes.sort_by(|&a, &b| self.sequences[a].cmp(&self.sequences[b]));
        }
        heads
    }

    /// O átomo é algum dos "tokens a testar" de algum casamento?
    pub fn is_checked(&self, atom: usize) -> bool {
        self.sequences.iter().any(|s| s.tokens_to_check.contains(&atom))
    }
}

/// Todos os casamentos de um padrão na sequência.
pub fn match_pattern<'p>(pattern: &'p TokenPattern, sequence: &TokenSequence) -> Vec<PatternMatchSequence<'p>> {
    let atoms = sequence.with_whitespace();
    let mut matches = Vec::new();

    if pattern.starts_with_boundary() {
        matches.extend(align(pattern, atoms, None, 0));
    }
    for (t0, atom) in atoms.iter().enumerate() {
        if pattern.chunk_matches(0, Some(atom)) {
            matches.extend(align(pattern, atoms, Some(t0), t0 + 1));
        }
    }
    matches
}

/// Alinha os chunks restantes a partir de `next`, sem lacunas.
fn align<'p>(
    pattern: &'p TokenPattern,
    atoms: &[Token],
    first: Option<usize>,
    mut next: usize,
) -> Option<PatternMatchSequence<'p>> {
    let count = pattern.token_count();
    let mut matched = vec![first];
    let mut p = 1;

    while p < count && next < atoms.len() {
        if !pattern.chunk_matches(p, Some(&atoms[next])) {
            return None;
        }
        matched.push(Some(next));
        p += 1;
        next += 1;
    }

    // fim da sentença: só o `\b` final pode casar a sentinela
    if p + 1 == count && next == atoms.len() && pattern.chunk_matches(p, None) {
        matched.push(None);
    }
    if matched.len() != count {
        return None;
    }

    let tokens_to_check: Vec<usize> = pattern
        .indexes_to_test()
        .iter()
        .filter_map(|&i| matched[i])
        .collect();
    if tokens_to_check.is_empty() {
        return None;
    }

    Some(PatternMatchSequence {
        pattern,
        atoms: matched,
        tokens_to_check,
    })
}

/// Casa todos os padrões e monta a tabela de anotações.
pub fn match_all<'p>(patterns: &'p [TokenPattern], sequence: &TokenSequence) -> PatternMatches<'p> {
    let mut result = PatternMatches::default();
    for pattern in patterns {
        for matched in match_pattern(pattern, sequence) {
            let index = result.sequences.len();
            for (position, atom) in matched.atoms.iter().enumerate() {
                if let Some(atom) = atom {
                    result.annotations.record(
                        *atom,
                        TokenPatternMatch {
                            pattern,
                            position,
                            sequence: index,
                        },
                    );
                }
            }
            result.sequences.push(matched);
        }
    }
    result
}
