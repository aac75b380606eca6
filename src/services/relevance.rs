// src/services/relevance.rs

//! Relevance scoring and requirement sentences.
//!
//! Plain keyword rules over the notice text; no language model involved.

use regex::Regex;
use unicode_segmentation::UnicodeSegmentation;

use crate::error::Result;
use crate::models::{Complexity, Recommendation, Relevance, RelevanceProfile, Requirement};
use crate::utils::normalize_whitespace;

const AREA_POINTS: u32 = 20;
const PROFESSOR_POINTS: u32 = 15;
const STUDENT_POINTS: u32 = 15;
const INSTITUTION_POINTS: u32 = 10;

const HIGH_COMPLEXITY_ABOVE: usize = 10;
const LOW_COMPLEXITY_BELOW: usize = 5;

const REQUIREMENT_CUES: [&str; 10] = [
    "deve",
    "deverá",
    "precisa",
    "necessário",
    "obrigatório",
    "exigido",
    "requisito",
    "critério",
    "condição",
    "elegível",
];

const MANDATORY_CUES: [&str; 6] = [
    "obrigatório",
    "deve",
    "deverá",
    "necessário",
    "exigido",
    "imprescindível",
];

const REQUIREMENT_KINDS: [(&str, &[&str]); 6] = [
    (
        "vinculo",
        &["vinculado", "vínculo", "lotação", "servidor", "docente"],
    ),
    (
        "titulacao",
        &["doutor", "mestre", "graduado", "pós-graduação", "titulação"],
    ),
    ("experiencia", &["experiência", "atuação", "anos de"]),
    (
        "documentacao",
        &["documento", "comprovante", "certificado", "declaração"],
    ),
    (
        "financeiro",
        &["cnpj", "cpf", "conta bancária", "regularidade fiscal"],
    ),
    ("tecnico", &["lattes", "publicações", "projeto", "proposta"]),
];

/// Scores notices against the institution's interest profile.
#[derive(Debug)]
pub struct RelevanceScorer {
    areas: Vec<(String, Regex)>,
    professors: Regex,
    students: Regex,
    institution: Regex,
    complexity_cue: Regex,
    high_threshold: u32,
    medium_threshold: u32,
}

impl RelevanceScorer {
    pub fn new(profile: &RelevanceProfile) -> Result<Self> {
        let mut areas = Vec::with_capacity(profile.areas.len());
        for area in &profile.areas {
            match keyword_pattern(&area.keywords)? {
                Some(pattern) => areas.push((area.id.clone(), pattern)),
                None => log::warn!("Interest area '{}' has no keywords, skipping", area.id),
            }
        }

        Ok(Self {
            areas,
            professors: Regex::new(r"(?i)\b(?:docente|professor)")?,
            students: Regex::new(r"(?i)\b(?:estudante|aluno)")?,
            institution: Regex::new(r"(?i)\b(?:universidade|icts?\b)")?,
            complexity_cue: Regex::new(r"(?i)requisito|condição|exigência")?,
            high_threshold: profile.high_threshold,
            medium_threshold: profile.medium_threshold,
        })
    }

    pub fn score(&self, text: &str) -> Relevance {
        let mut score = 0;
        let mut areas = Vec::new();
        for (id, pattern) in &self.areas {
            if pattern.is_match(text) {
                areas.push(id.clone());
                score += AREA_POINTS;
            }
        }

        let mut audience = Vec::new();
        for (pattern, label, points) in [
            (&self.professors, "docentes", PROFESSOR_POINTS),
            (&self.students, "estudantes", STUDENT_POINTS),
            (&self.institution, "instituicao", INSTITUTION_POINTS),
        ] {
            if pattern.is_match(text) {
                audience.push(label.to_string());
                score += points;
            }
        }

        let cues = self.complexity_cue.find_iter(text).count();
        let complexity = if cues > HIGH_COMPLEXITY_ABOVE {
            Complexity::High
        } else if cues < LOW_COMPLEXITY_BELOW {
            Complexity::Low
        } else {
            Complexity::Medium
        };

        Relevance {
            score,
            areas,
            audience,
            complexity,
            recommendation: self.recommend(score),
        }
    }

    pub fn recommend(&self, score: u32) -> Recommendation {
        if score >= self.high_threshold {
            Recommendation::High
        } else if score >= self.medium_threshold {
            Recommendation::Medium
        } else {
            Recommendation::Low
        }
    }
}

/// Case-insensitive match on any keyword at a word start. Keywords of up
/// to three letters must also end at a word boundary. `None` when no
/// keyword is left after dropping blanks.
fn keyword_pattern(keywords: &[String]) -> Result<Option<Regex>> {
    let alternatives: Vec<String> = keywords
        .iter()
        .map(|k| k.trim())
        .filter(|k| !k.is_empty())
        .map(|k| {
            let escaped = regex::escape(k);
            if k.chars().count() <= 3 {
                format!(r"{escaped}\b")
            } else {
                escaped
            }
        })
        .collect();
    if alternatives.is_empty() {
        return Ok(None);
    }
    Ok(Some(Regex::new(&format!(
        r"(?i)\b(?:{})",
        alternatives.join("|")
    ))?))
}

/// Sentences that state a requirement, in document order.
pub fn requirements(text: &str) -> Vec<Requirement> {
    text.unicode_sentences()
        .map(normalize_whitespace)
        .filter(|sentence| {
            let lower = sentence.to_lowercase();
            REQUIREMENT_CUES.iter().any(|cue| lower.contains(cue))
        })
        .map(|sentence| {
            let lower = sentence.to_lowercase();
            Requirement {
                kind: classify_requirement(&lower).to_string(),
                mandatory: MANDATORY_CUES.iter().any(|cue| lower.contains(cue)),
                text: sentence,
            }
        })
        .collect()
}

fn classify_requirement(lower: &str) -> &'static str {
    REQUIREMENT_KINDS
        .iter()
        .find(|(_, words)| words.iter().any(|w| lower.contains(w)))
        .map_or("geral", |(kind, _)| *kind)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::InterestArea;

    fn scorer() -> RelevanceScorer {
        RelevanceScorer::new(&RelevanceProfile::default()).unwrap()
    }

    #[test]
    fn test_score_areas_and_audience() {
        let relevance = scorer().score(
            "Chamada para docentes e estudantes de universidades em projetos de \
             agronomia e saúde pública.",
        );
        assert_eq!(relevance.areas, vec!["agronomia", "saude"]);
        assert_eq!(
            relevance.audience,
            vec!["docentes", "estudantes", "instituicao"]
        );
        assert_eq!(relevance.score, 20 + 20 + 15 + 15 + 10);
        assert_eq!(relevance.recommendation, Recommendation::High);
        assert_eq!(relevance.complexity, Complexity::Low);
    }

    #[test]
    fn test_short_keywords_need_whole_words() {
        let scorer = scorer();
        assert!(scorer.score("Ações de TI na gestão").areas.contains(&"tecnologia".to_string()));
        assert!(scorer.score("Atividades práticas").areas.is_empty());
    }

    #[test]
    fn test_area_without_keywords_never_matches() {
        let mut profile = RelevanceProfile::default();
        profile.areas.push(InterestArea {
            id: "vazia".to_string(),
            keywords: Vec::new(),
        });
        profile.areas.push(InterestArea {
            id: "branca".to_string(),
            keywords: vec![" ".to_string()],
        });
        let relevance = RelevanceScorer::new(&profile)
            .unwrap()
            .score("texto qualquer sem relação");

        assert!(relevance.areas.is_empty());
        assert_eq!(relevance.score, 0);
    }

    #[test]
    fn test_recommendation_thresholds() {
        let scorer = scorer();
        assert_eq!(scorer.recommend(40), Recommendation::High);
        assert_eq!(scorer.recommend(39), Recommendation::Medium);
        assert_eq!(scorer.recommend(20), Recommendation::Medium);
        assert_eq!(scorer.recommend(19), Recommendation::Low);
        assert_eq!(scorer.score("nada relevante").recommendation, Recommendation::Low);
    }

    #[test]
    fn test_complexity_counts_cues() {
        let scorer = scorer();
        assert_eq!(scorer.score(&"requisito ".repeat(11)).complexity, Complexity::High);
        assert_eq!(scorer.score(&"condição ".repeat(5)).complexity, Complexity::Medium);
        assert_eq!(scorer.score(&"exigência ".repeat(4)).complexity, Complexity::Low);
    }

    #[test]
    fn test_requirement_sentences() {
        let text = "O proponente deve ser docente vinculado a instituição de ensino superior. \
                    É necessário possuir titulação mínima de doutorado. \
                    Apresentar currículo Lattes atualizado. \
                    A proposta elegível poderá incluir bolsas.";
        let reqs = requirements(text);

        assert_eq!(reqs.len(), 3);
        assert_eq!(reqs[0].kind, "vinculo");
        assert!(reqs[0].mandatory);
        assert_eq!(reqs[1].kind, "titulacao");
        assert!(reqs[1].mandatory);
        assert_eq!(reqs[2].kind, "tecnico");
        assert!(!reqs[2].mandatory);
        assert!(reqs.iter().all(|r| !r.text.contains("Lattes")));
    }
}
