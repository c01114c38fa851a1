//! # Corpus Francês com Tokenização de Referência
//!
//! Sentenças francesas anotadas à mão com a tokenização correta ("ouro"). Cobrem os casos
//! em que a mesma sequência de palavras é ora uma locução (um token), ora palavras soltas:
//!
//! - "aussi bien que" como conjunção vs "aussi bien" advérbio + adjetivo;
//! - "bien que" concessivo vs "bien" + "que" completivo;
//! - "à la fois" locução vs "à la fois suivante".
//!
//! Servem para gerar os eventos de treino do classificador e para a demonstração web.

use std::collections::BTreeSet;

use crate::error::{Result, TokeniserError};

/// Uma sentença com sua tokenização de referência.
#[derive(Debug, Clone, Copy)]
pub struct AnnotatedSentence {
    /// A sentença bruta.
    pub text: &'static str,
    /// Tema da sentença (usado só para agrupar na demonstração).
    pub domain: &'static str,
    /// Tokens na ordem, sem espaços. Uma locução é um único token: `"parce que"`.
    pub tokens: &'static [&'static str],
}

impl AnnotatedSentence {
    /// Posições de byte onde há fronteira de token: o início do texto e o início e o fim de
    /// cada token.
    ///
    /// Entre dois tokens consecutivos só pode haver espaço em branco; qualquer outra coisa
    /// indica uma anotação que não corresponde ao texto.
    pub fn token_splits(&self) -> Result<BTreeSet<usize>> {
        let mut splits = BTreeSet::from([0]);
        let mut cursor = 0;

        for token in self.tokens {
            let offset = self.text[cursor..].find(token).ok_or_else(|| {
                TokeniserError::Corpus(format!("token `{token}` não encontrado em `{}`", self.text))
            })?;
            let start = cursor + offset;
            if !self.text[cursor..start].trim().is_empty() {
                return Err(TokeniserError::Corpus(format!(
                    "texto não anotado `{}` antes de `{token}` em `{}`",
                    &self.text[cursor..start],
                    self.text
                )));
            }
            splits.insert(start);
            cursor = start + token.len();
            splits.insert(cursor);
        }

        if !self.text[cursor..].trim().is_empty() {
            return Err(TokeniserError::Corpus(format!("fim não anotado em `{}`", self.text)));
        }
        Ok(splits)
    }
}

/// Retorna o corpus de treino.
pub fn get_corpus() -> Vec<AnnotatedSentence> {
    vec![
        // ===== CONJUNÇÕES =====
        AnnotatedSentence {
            text: "Elle reste ici parce que la pluie tombe.",
            domain: "conjonctions",
            tokens: &["Elle", "reste", "ici", "parce que", "la", "pluie", "tombe", "."],
        },
        AnnotatedSentence {
            text: "Il part demain parce que sa sœur arrive.",
            domain: "conjonctions",
            tokens: &["Il", "part", "demain", "parce que", "sa", "sœur", "arrive", "."],
        },
        AnnotatedSentence {
            text: "Il chante aussi bien que moi.",
            domain: "conjonctions",
            tokens: &["Il", "chante", "aussi bien que", "moi", "."],
        },
        AnnotatedSentence {
            text: "Le chat dort aussi bien que le chien.",
            domain: "conjonctions",
            tokens: &["Le", "chat", "dort", "aussi bien que", "le", "chien", "."],
        },
        AnnotatedSentence {
            text: "Bien que la pluie tombe, il part.",
            domain: "conjonctions",
            tokens: &["Bien que", "la", "pluie", "tombe", ",", "il", "part", "."],
        },
        AnnotatedSentence {
            text: "Elle sort bien que la nuit tombe.",
            domain: "conjonctions",
            tokens: &["Elle", "sort", "bien que", "la", "nuit", "tombe", "."],
        },
        AnnotatedSentence {
            text: "Il travaille tandis que Marie dort.",
            domain: "conjonctions",
            tokens: &["Il", "travaille", "tandis que", "Marie", "dort", "."],
        },
        // ===== PALAVRAS SOLTAS =====
        AnnotatedSentence {
            text: "Elle parle aussi bien le français.",
            domain: "adverbes",
            tokens: &["Elle", "parle", "aussi", "bien", "le", "français", "."],
        },
        AnnotatedSentence {
            text: "Il est aussi bien placé que toi.",
            domain: "adverbes",
            tokens: &["Il", "est", "aussi", "bien", "placé", "que", "toi", "."],
        },
        AnnotatedSentence {
            text: "Je sais bien que tu dors.",
            domain: "adverbes",
            tokens: &["Je", "sais", "bien", "que", "tu", "dors", "."],
        },
        AnnotatedSentence {
            text: "Il voit bien que la porte est ouverte.",
            domain: "adverbes",
            tokens: &["Il", "voit", "bien", "que", "la", "porte", "est", "ouverte", "."],
        },
        // ===== LOCUÇÕES ADVERBIAIS =====
        AnnotatedSentence {
            text: "Il mange à la fois du pain et du fromage.",
            domain: "adverbes",
            tokens: &["Il", "mange", "à la fois", "du", "pain", "et", "du", "fromage", "."],
        },
        AnnotatedSentence {
            text: "Il gagnera à la fois suivante.",
            domain: "adverbes",
            tokens: &["Il", "gagnera", "à", "la", "fois", "suivante", "."],
        },
        AnnotatedSentence {
            text: "Par exemple, le chat dort.",
            domain: "adverbes",
            tokens: &["Par exemple", ",", "le", "chat", "dort", "."],
        },
        AnnotatedSentence {
            text: "Il travaille afin de réussir.",
            domain: "adverbes",
            tokens: &["Il", "travaille", "afin de", "réussir", "."],
        },
        // ===== NOMES COMPOSTOS =====
        AnnotatedSentence {
            text: "Je mange une pomme de terre.",
            domain: "noms",
            tokens: &["Je", "mange", "une", "pomme de terre", "."],
        },
        AnnotatedSentence {
            text: "La pomme de Marie est rouge.",
            domain: "noms",
            tokens: &["La", "pomme", "de", "Marie", "est", "rouge", "."],
        },
        AnnotatedSentence {
            text: "La Société Générale a été fondée en 1864.",
            domain: "noms",
            tokens: &["La", "Société", "Générale", "a", "été", "fondée", "en", "1864", "."],
        },
    ]
}

/// Sentenças de demonstração (não anotadas) para a interface web.
pub fn demo_texts() -> Vec<(&'static str, &'static str)> {
    vec![
        ("conjonctions", "Il reste à la maison parce que la pluie tombe."),
        ("conjonctions", "Elle chante aussi bien que sa sœur."),
        ("conjonctions", "Bien que le chat dorme, le chien veille."),
        ("adverbes", "Il sait bien que la porte est fermée."),
        ("adverbes", "Elle est aussi bien préparée que lui."),
        ("adverbes", "Il parle à la fois anglais et français."),
        ("noms", "Il épluche une pomme de terre."),
        ("majuscules", "L'ETAT ET L'ECOLE SONT FERMES aujourd'hui."),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_corpus_is_consistent() {
        for sentence in get_corpus() {
            assert!(sentence.token_splits().is_ok(), "{}", sentence.text);
        }
    }

    #[test]
    fn test_token_splits() {
        let sentence = AnnotatedSentence {
            text: "Il part parce que.",
            domain: "test",
            tokens: &["Il", "part", "parce que", "."],
        };
        let splits: Vec<usize> = sentence.token_splits().unwrap().into_iter().collect();
        assert_eq!(splits, vec![0, 2, 3, 7, 8, 17, 18]);
    }

    #[test]
    fn test_misaligned_annotation_is_rejected() {
        let missing = AnnotatedSentence {
            text: "Il part demain.",
            domain: "test",
            tokens: &["Il", "demain", "."],
        };
        assert!(matches!(missing.token_splits(), Err(TokeniserError::Corpus(_))));

        let unknown = AnnotatedSentence {
            text: "Il part.",
            domain: "test",
            tokens: &["Il", "vient", "."],
        };
        assert!(unknown.token_splits().is_err());
    }
}
