//! # Filtros de Sequência
//!
//! Filtros reescrevem o **texto de análise** dos tokens (`Token::text`) sem tocar no texto
//! original, de modo que a cobertura da sentença continua exata. São aplicados aos átomos
//! antes do casamento de padrões e de novo sobre a tokenização final.
//!
//! - [`LowercaseKnownFirstWordFilter`]: "Parce que..." -> "parce que..." quando o léxico só
//!   conhece a forma minúscula.
//! - [`AllUppercaseFilter`]: títulos em caixa alta ("ETAT ET ECOLE") voltam a ter caixa
//!   e acentos ("état et école") quando o léxico reconhece a forma.
//!
//! ## Filtros de regex
//!
//! Um [`TokenRegexFilter`] atua **antes** da atomização: cada trecho casado pela regex
//! (URL, e-mail, número decimal...) vira um [`TokenPlaceholder`], e a atomização mantém o
//! trecho como um único átomo. O texto de análise pode ser trocado por um substituto com
//! referências a grupos (`$1`, `${nome}`).

use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};

use crate::error::{Result, TokeniserError};
use crate::session::TokeniserSession;
use crate::token::{TokenPlaceholder, TokenSequence};

/// Um filtro sobre uma sequência de tokens.
pub trait TokenSequenceFilter: Send + Sync {
    fn apply(&self, tokens: &mut TokenSequence, session: &TokeniserSession);
}

/// Minúscula na primeira palavra se só a forma minúscula é conhecida.
#[derive(Debug, Clone, Copy, Default)]
pub struct LowercaseKnownFirstWordFilter;

impl TokenSequenceFilter for LowercaseKnownFirstWordFilter {
    fn apply(&self, tokens: &mut TokenSequence, session: &TokeniserSession) {
        let lexicon = session.lexicon();
        let Some(first) = tokens.iter_mut().next() else {
            return;
        };
        if !first.text.chars().next().is_some_and(char::is_uppercase) {
            return;
        }
        let lower = first.text.to_lowercase();
        if !lexicon.contains(&first.text) && lexicon.contains(&lower) {
            first.text = lower;
        }
    }
}

/// Sufixos societários mantidos em caixa alta.
const COMPANY_SUFFIXES: [&str; 5] = ["SA", "SARL", "SAS", "EURL", "SNC"];

/// Máximo de formas candidatas testadas por palavra.
const MAX_CANDIDATES: usize = 512;

/// Reescreve séries de pelo menos duas palavras em caixa alta.
///
/// Cada palavra da série recebe a primeira forma minúscula (com ou sem acento) que o léxico
/// conhece; se nenhuma é conhecida, fica só com a inicial maiúscula ("DUPONT" -> "Dupont").
#[derive(Debug, Clone, Copy, Default)]
pub struct AllUppercaseFilter;

impl AllUppercaseFilter {
    fn is_uppercase_word(text: &str) -> bool {
        text.chars().any(char::is_uppercase) && !text.chars().any(char::is_lowercase)
    }

    fn letter_candidates(c: char) -> Vec<char> {
        match c {
            'E' => vec!['e', 'é', 'ê', 'è', 'ë'],
            'A' => vec!['a', 'à', 'â'],
            'O' => vec!['o', 'ô'],
            'I' => vec!['i', 'î', 'ï'],
            'U' => vec!['u', 'ù', 'û'],
            'C' => vec!['c', 'ç'],
            other => other.to_lowercase().collect(),
        }
    }

    /// Formas minúsculas candidatas, da sem acento para as acentuadas.
    fn candidates(word: &str) -> Vec<String> {
        let mut forms = vec![String::new()];
        for c in word.chars() {
            let letters = Self::letter_candidates(c);
            if forms.len() * letters.len() > MAX_CANDIDATES {
                for form in &mut forms {
                    form.push(letters[0]);
                }
                continue;
            }
            forms = forms
                .iter()
                .flat_map(|form| {
                    letters.iter().map(move |&l| {
                        let mut next = form.clone();
                        next.push(l);
                        next
                    })
                })
                .collect();
        }
        forms
    }

    fn capitalised(word: &str) -> String {
        let mut chars = word.chars();
        match chars.next() {
            Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
            None => String::new(),
        }
    }
}

impl TokenSequenceFilter for AllUppercaseFilter {
    fn apply(&self, tokens: &mut TokenSequence, session: &TokeniserSession) {
        let lexicon = session.lexicon();
        let words: Vec<bool> = tokens.iter().map(|t| Self::is_uppercase_word(&t.text)).collect();
        let has_lowercase: Vec<bool> = tokens.iter().map(|t| t.text.chars().any(char::is_lowercase)).collect();

        // séries: uppercase e separadores/números no meio, até a primeira palavra com minúscula
        let mut in_series = vec![false; words.len()];
        let mut start = 0;
        while start < words.len() {
            if !words[start] {
                start += 1;
                continue;
            }
            let mut end = start;
            while end < words.len() && !has_lowercase[end] {
                end += 1;
            }
            if words[start..end].iter().filter(|&&w| w).count() > 1 {
                in_series[start..end].iter_mut().for_each(|s| *s = true);
            }
            start = end;
        }

        for (token, _) in tokens.iter_mut().zip(&in_series).filter(|(_, selected)| **selected) {
            if !Self::is_uppercase_word(&token.text) || COMPANY_SUFFIXES.contains(&token.text.as_str()) {
                continue;
            }
            token.text = Self::candidates(&token.text)
                .into_iter()
                .find(|form| lexicon.contains(form))
                .unwrap_or_else(|| Self::capitalised(&token.text));
        }
    }
}

/// Configuração serializável de um [`TokenRegexFilter`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegexFilterSpec {
    pub regex: String,
    /// Texto de análise do átomo; aceita `$1`, `${nome}`.
    #[serde(default)]
    pub replacement: Option<String>,
    /// Grupo da regex que delimita o marcador (0 = casamento inteiro).
    #[serde(default)]
    pub group: usize,
    #[serde(default = "case_sensitive_default")]
    pub case_sensitive: bool,
}

fn case_sensitive_default() -> bool {
    true
}

impl RegexFilterSpec {
    pub fn new(regex: impl Into<String>) -> Self {
        Self {
            regex: regex.into(),
            replacement: None,
            group: 0,
            case_sensitive: true,
        }
    }
}

/// Filtros de regex padrão do francês: e-mails, URLs e números com separador decimal ou de
/// milhar.
pub fn default_regex_filters() -> Vec<RegexFilterSpec> {
    vec![
        RegexFilterSpec::new(r"[\w.+-]+@[\w-]+(?:\.[\w-]+)+"),
        RegexFilterSpec::new(r#"(?:https?://|www\.)\S*[^\s.,;:!?)»"']"#),
        RegexFilterSpec::new(r"\d+(?:[.,]\d+)+"),
    ]
}

/// Encontra trechos que devem virar um único átomo.
#[derive(Debug, Clone)]
pub struct TokenRegexFilter {
    spec: RegexFilterSpec,
    regex: Regex,
}

impl TokenRegexFilter {
    /// Compila o filtro. Regex vazia ou grupo inexistente são erros de configuração.
    pub fn new(spec: RegexFilterSpec) -> Result<Self> {
        if spec.regex.is_empty() {
            return Err(TokeniserError::InvalidFilter {
                regex: spec.regex,
                message: "regex vazia".into(),
            });
        }
        let regex = RegexBuilder::new(&spec.regex)
            .case_insensitive(!spec.case_sensitive)
            .build()
            .map_err(|source| TokeniserError::InvalidRegex {
                regex: spec.regex.clone(),
                source,
            })?;
        if spec.group >= regex.captures_len() {
            return Err(TokeniserError::InvalidFilter {
                message: format!("grupo {} inexistente", spec.group),
                regex: spec.regex,
            });
        }
        Ok(Self { spec, regex })
    }

    pub fn spec(&self) -> &RegexFilterSpec {
        &self.spec
    }

    /// Marcadores para cada casamento não vazio, da esquerda para a direita.
    pub fn apply(&self, text: &str) -> Vec<TokenPlaceholder> {
        let mut placeholders: Vec<TokenPlaceholder> = Vec::new();
        for captures in self.regex.captures_iter(text) {
            let Some(span) = captures.get(self.spec.group) else {
                continue;
            };
            if span.is_empty() || placeholders.last().is_some_and(|p| span.start() <= p.start) {
                continue;
            }
            let replacement = self.spec.replacement.as_ref().map(|template| {
                let mut expanded = String::new();
                captures.expand(template, &mut expanded);
                expanded
            });
            placeholders.push(TokenPlaceholder {
                start: span.start(),
                end: span.end(),
                replacement,
                regex: self.spec.regex.clone(),
            });
        }
        placeholders
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn apply(filter: &dyn TokenSequenceFilter, text: &str) -> (Vec<String>, String) {
        let session = TokeniserSession::french();
        let mut tokens = TokenSequence::atomise(text, session.separators());
        filter.apply(&mut tokens, &session);
        let texts = tokens.texts().into_iter().map(String::from).collect();
        let original = tokens.with_whitespace().iter().map(|t| t.original_text.as_str()).collect();
        (texts, original)
    }

    #[test]
    fn test_lowercase_known_first_word() {
        let (texts, original) = apply(&LowercaseKnownFirstWordFilter, "Parce que il pleut.");
        assert_eq!(texts[0], "parce");
        assert_eq!(original, "Parce que il pleut.");

        let (texts, _) = apply(&LowercaseKnownFirstWordFilter, "Marie dort.");
        assert_eq!(texts[0], "Marie");
    }

    #[test]
    fn test_uppercase_series_recovers_accents() {
        let (texts, original) = apply(&AllUppercaseFilter, "ETAT ET ECOLE sont fermés");
        assert_eq!(texts, vec!["état", "et", "école", "sont", "fermés"]);
        assert_eq!(original, "ETAT ET ECOLE sont fermés");
    }

    #[test]
    fn test_unknown_uppercase_words_are_capitalised() {
        let (texts, _) = apply(&AllUppercaseFilter, "DUPONT SARL vend");
        assert_eq!(texts, vec!["Dupont", "SARL", "vend"]);
    }

    #[test]
    fn test_single_uppercase_word_is_kept() {
        let (texts, _) = apply(&AllUppercaseFilter, "la SNCF roule");
        assert_eq!(texts, vec!["la", "SNCF", "roule"]);
    }

    #[test]
    fn test_candidates_start_unaccented() {
        let forms = AllUppercaseFilter::candidates("ETE");
        assert_eq!(forms[0], "ete");
        assert!(forms.contains(&"été".to_string()));
        assert_eq!(forms.len(), 25);
    }

    fn regex_filter(regex: &str) -> TokenRegexFilter {
        TokenRegexFilter::new(RegexFilterSpec::new(regex)).unwrap()
    }

    #[test]
    fn test_regex_filter_placeholders() {
        let filter = regex_filter(r"\d+(?:[.,]\d+)+");
        let text = "Il pèse 3,5 kg, soit 3.500 g.";
        let placeholders = filter.apply(text);
        let spans: Vec<&str> = placeholders.iter().map(|p| &text[p.start..p.end]).collect();
        assert_eq!(spans, vec!["3,5", "3.500"]);
        assert!(placeholders.iter().all(|p| p.replacement.is_none()));

        let session = TokeniserSession::french();
        let atoms = TokenSequence::atomise_with_placeholders(text, session.separators(), &placeholders);
        assert_eq!(atoms.texts(), vec!["Il", "pèse", "3,5", "kg", ",", "soit", "3.500", "g", "."]);
    }

    #[test]
    fn test_regex_filter_replacement_and_group() {
        let spec = RegexFilterSpec {
            regex: r"(?P<user>\w+)@(\w+)\.fr".into(),
            replacement: Some("EMAIL_${user}".into()),
            group: 0,
            case_sensitive: true,
        };
        let placeholders = TokenRegexFilter::new(spec).unwrap().apply("écrire à marie@poste.fr demain");
        assert_eq!(placeholders.len(), 1);
        assert_eq!(placeholders[0].replacement.as_deref(), Some("EMAIL_marie"));

        let spec = RegexFilterSpec {
            group: 1,
            ..RegexFilterSpec::new(r"n° ?(\d+)")
        };
        let text = "le n° 12 et le n°7";
        let placeholders = TokenRegexFilter::new(spec).unwrap().apply(text);
        let spans: Vec<&str> = placeholders.iter().map(|p| &text[p.start..p.end]).collect();
        assert_eq!(spans, vec!["12", "7"]);
    }

    #[test]
    fn test_regex_filter_case_insensitive() {
        let spec = RegexFilterSpec {
            case_sensitive: false,
            ..RegexFilterSpec::new("c'est-à-dire")
        };
        let text = "C'EST-À-DIRE ici";
        let placeholders = TokenRegexFilter::new(spec).unwrap().apply(text);
        assert_eq!(placeholders.len(), 1);
        assert_eq!(&text[placeholders[0].start..placeholders[0].end], "C'EST-À-DIRE");
    }

    #[test]
    fn test_invalid_regex_filters() {
        assert!(matches!(
            TokenRegexFilter::new(RegexFilterSpec::new("")),
            Err(TokeniserError::InvalidFilter { .. })
        ));
        assert!(matches!(
            TokenRegexFilter::new(RegexFilterSpec::new("(")),
            Err(TokeniserError::InvalidRegex { .. })
        ));
        let spec = RegexFilterSpec {
            group: 2,
            ..RegexFilterSpec::new(r"(\d)")
        };
        assert!(matches!(TokenRegexFilter::new(spec), Err(TokeniserError::InvalidFilter { .. })));
    }

    #[test]
    fn test_default_regex_filters() {
        let filters: Vec<TokenRegexFilter> = default_regex_filters()
            .into_iter()
            .map(|spec| TokenRegexFilter::new(spec).unwrap())
            .collect();
        let text = "Écrivez à jean.dupont@exemple.fr ou voyez https://exemple.fr/page.html, prix 12,50.";
        let spans: Vec<&str> = filters
            .iter()
            .flat_map(|f| f.apply(text))
            .map(|p| &text[p.start..p.end])
            .collect();
        assert!(spans.contains(&"jean.dupont@exemple.fr"));
        assert!(spans.contains(&"https://exemple.fr/page.html"));
        assert!(spans.contains(&"12,50"));
    }
}
