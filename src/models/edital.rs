// src/models/edital.rs

//! Edital (grant notice) data structures.

use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::models::ChangeReport;

/// A grant notice harvested from the listing pages.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Edital {
    /// Notice title as shown in the listing
    pub title: String,

    /// Absolute URL of the notice page
    pub url: String,

    /// Publication date text ("Publicado em")
    #[serde(default)]
    pub published: Option<String>,

    /// Last update text ("Última Atualização em")
    #[serde(default)]
    pub updated: Option<String>,

    /// Notice number, e.g. "28/2025"
    #[serde(default)]
    pub number: Option<String>,

    /// Issuing entities joined by '/'
    pub entity: String,

    /// Focus areas guessed from the title
    #[serde(default)]
    pub focus_areas: Vec<String>,

    /// Kind of support offered
    pub support_type: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<EditalDetails>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pdf: Option<PdfDetails>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relevance: Option<Relevance>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub requirements: Vec<Requirement>,
}

impl Edital {
    /// Text of the notice page, empty until details are fetched.
    pub fn content_text(&self) -> &str {
        self.details
            .as_ref()
            .map_or("", |d| d.content_text.as_str())
    }

    /// First PDF linked from the notice page.
    pub fn first_pdf(&self) -> Option<&Link> {
        self.details.as_ref().and_then(|d| d.pdf_links.first())
    }

    /// Relevance score, 0 when not scored.
    pub fn score(&self) -> u32 {
        self.relevance.as_ref().map_or(0, |r| r.score)
    }

    /// Plain-text executive summary for circulation.
    pub fn executive_summary(&self) -> String {
        let pdf = self.pdf.as_ref();
        let values = pdf.map(|p| &p.values);
        let dates = pdf.map(|p| &p.dates);

        let money = |v: Option<f64>| v.map_or("A definir".to_string(), format_brl);
        let date = |d: Option<NaiveDate>| {
            d.map_or("Consultar edital".to_string(), |d| {
                d.format("%d/%m/%Y").to_string()
            })
        };
        let audience = pdf
            .map(|p| p.audience.join(", "))
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| "A definir".to_string());

        let mut out = String::new();
        out.push_str(&format!("RESUMO EXECUTIVO - {}\n\n", self.title));
        out.push_str(&format!(
            "NÚMERO: {}\n",
            self.number.as_deref().unwrap_or("N/A")
        ));
        out.push_str(&format!("INSTITUIÇÃO: {}\n", self.entity));
        out.push_str(&format!(
            "PUBLICAÇÃO: {}\n\n",
            self.published.as_deref().unwrap_or("N/A")
        ));
        out.push_str("RECURSOS DISPONÍVEIS:\n");
        out.push_str(&format!(
            "- Valor Total: {}\n",
            money(values.and_then(|v| v.total))
        ));
        out.push_str(&format!(
            "- Por Projeto: {}\n",
            money(values.and_then(|v| v.per_project))
        ));
        out.push_str(&format!(
            "- Quantidade: {}\n\n",
            values
                .and_then(|v| v.project_count)
                .map_or("A definir".to_string(), |n| format!("{n} projetos"))
        ));
        out.push_str(&format!("PÚBLICO-ALVO:\n{audience}\n\n"));
        out.push_str("DATAS IMPORTANTES:\n");
        out.push_str(&format!(
            "- Inscrições até: {}\n",
            date(dates.and_then(|d| d.registration_end))
        ));
        out.push_str(&format!(
            "- Resultado: {}\n\n",
            date(dates.and_then(|d| d.final_result))
        ));
        out.push_str(&format!("MAIS INFORMAÇÕES:\n{}\n", self.url));
        out
    }
}

/// Format a value as Brazilian currency, e.g. `R$ 1.500.000,00`.
pub fn format_brl(value: f64) -> String {
    let cents = (value * 100.0).round() as i64;
    let (int_part, frac) = (cents / 100, (cents % 100).abs());
    let digits = int_part.abs().to_string();

    let mut grouped = String::new();
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(c);
    }
    let sign = if int_part < 0 { "-" } else { "" };
    format!("R$ {sign}{grouped},{frac:02}")
}

/// A hyperlink found on a notice page.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Link {
    pub url: String,
    pub text: String,
}

/// Data extracted from a notice's own page.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct EditalDetails {
    pub url: String,
    #[serde(default)]
    pub pdf_links: Vec<Link>,
    #[serde(default)]
    pub attachment_links: Vec<Link>,
    #[serde(default)]
    pub result_links: Vec<Link>,
    #[serde(default)]
    pub content_text: String,
}

/// How text was obtained from a PDF.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ExtractionMethod {
    Text,
    Ocr,
}

/// Money figures found in a notice document.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Values {
    pub total: Option<f64>,
    pub per_project: Option<f64>,
    pub project_count: Option<u32>,
    pub counterpart: Option<String>,
}

/// Key dates of a notice schedule.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct KeyDates {
    pub registration_start: Option<NaiveDate>,
    pub registration_end: Option<NaiveDate>,
    pub preliminary_result: Option<NaiveDate>,
    pub final_result: Option<NaiveDate>,
}

/// Who a notice is aimed at.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct BeneficiaryProfile {
    #[serde(default)]
    pub categories: Vec<String>,
    /// Highest degree the document mentions, e.g. `doutorado`
    pub min_degree: Option<String>,
    /// `ICT` when applicants must belong to a research institution
    pub institutional_link: Option<String>,
}

/// One line of a notice schedule.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SchedulePhase {
    pub name: String,
    pub description: String,
    #[serde(default)]
    pub dates: Vec<NaiveDate>,
}

/// Structured fields extracted from a notice PDF.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PdfDetails {
    pub url: String,
    pub values: Values,
    pub dates: KeyDates,
    pub audience: Vec<String>,
    pub requirements: Vec<String>,
    pub thematic_areas: Vec<String>,
    #[serde(default)]
    pub beneficiary: BeneficiaryProfile,
    #[serde(default)]
    pub schedule: Vec<SchedulePhase>,
    pub text_length: usize,
    pub pages: usize,
    pub method: ExtractionMethod,
    /// Raw text, kept for the NLP stage
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub text: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Complexity {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum Recommendation {
    Low,
    Medium,
    High,
}

impl fmt::Display for Recommendation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Recommendation::High => "ALTA - Amplamente divulgar",
            Recommendation::Medium => "MÉDIA - Divulgar para áreas específicas",
            Recommendation::Low => "BAIXA - Avaliar relevância",
        };
        f.write_str(text)
    }
}

/// Relevance of a notice for the institution's interest profile.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Relevance {
    pub score: u32,
    pub areas: Vec<String>,
    pub audience: Vec<String>,
    pub complexity: Complexity,
    pub recommendation: Recommendation,
}

/// An eligibility requirement sentence.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Requirement {
    pub text: String,
    pub kind: String,
    pub mandatory: bool,
}

/// Structure check result for one visited page.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StructureCheck {
    pub url: String,
    pub report: ChangeReport,
}

/// Everything one run persists.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectionOutput {
    pub collected_at: DateTime<Utc>,
    pub count: usize,
    pub editais: Vec<Edital>,
    /// Pages whose tracked counts moved during this run
    #[serde(default)]
    pub structure_changes: Vec<StructureCheck>,
}

impl CollectionOutput {
    pub fn new(editais: Vec<Edital>, structure_changes: Vec<StructureCheck>) -> Self {
        Self {
            collected_at: Utc::now(),
            count: editais.len(),
            editais,
            structure_changes,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_edital() -> Edital {
        Edital {
            title: "Chamada Pública nº 28/2025 - Apoio a Equipamentos".to_string(),
            url: "https://goias.gov.br/fapeg/chamada-28-2025/".to_string(),
            published: Some("01/09/2025".to_string()),
            updated: None,
            number: Some("28/2025".to_string()),
            entity: "FAPEG".to_string(),
            focus_areas: vec!["Infraestrutura".to_string()],
            support_type: "Apoio Geral".to_string(),
            details: None,
            pdf: None,
            relevance: None,
            requirements: Vec::new(),
        }
    }

    #[test]
    fn test_format_brl() {
        assert_eq!(format_brl(1_500_000.0), "R$ 1.500.000,00");
        assert_eq!(format_brl(950.5), "R$ 950,50");
        assert_eq!(format_brl(0.0), "R$ 0,00");
    }

    #[test]
    fn test_executive_summary_without_pdf() {
        let summary = sample_edital().executive_summary();
        assert!(summary.starts_with("RESUMO EXECUTIVO - Chamada Pública"));
        assert!(summary.contains("NÚMERO: 28/2025"));
        assert!(summary.contains("- Valor Total: A definir"));
        assert!(summary.contains("- Inscrições até: Consultar edital"));
        assert!(summary.contains("https://goias.gov.br/fapeg/chamada-28-2025/"));
    }

    #[test]
    fn test_pdf_details_without_profile_or_schedule_parse() {
        let raw = r#"{
            "url": "https://example.com/a.pdf",
            "values": {"total": null, "per_project": null, "project_count": null, "counterpart": null},
            "dates": {"registration_start": null, "registration_end": null,
                      "preliminary_result": null, "final_result": null},
            "audience": ["Geral"],
            "requirements": [],
            "thematic_areas": ["Multidisciplinar"],
            "text_length": 10,
            "pages": 1,
            "method": "text"
        }"#;
        let details: PdfDetails = serde_json::from_str(raw).unwrap();
        assert_eq!(details.beneficiary, BeneficiaryProfile::default());
        assert!(details.schedule.is_empty());
        assert!(details.text.is_empty());
    }

    #[test]
    fn test_executive_summary_with_pdf() {
        let mut edital = sample_edital();
        edital.pdf = Some(PdfDetails {
            url: "https://example.com/a.pdf".to_string(),
            values: Values {
                total: Some(2_000_000.0),
                per_project: None,
                project_count: Some(20),
                counterpart: None,
            },
            dates: KeyDates {
                registration_end: NaiveDate::from_ymd_opt(2025, 10, 30),
                ..KeyDates::default()
            },
            audience: vec!["Pesquisadores".to_string(), "ICTs".to_string()],
            requirements: Vec::new(),
            thematic_areas: vec!["Tecnologia".to_string()],
            beneficiary: BeneficiaryProfile::default(),
            schedule: Vec::new(),
            text_length: 1000,
            pages: 3,
            method: ExtractionMethod::Text,
            text: String::new(),
        });

        let summary = edital.executive_summary();
        assert!(summary.contains("- Valor Total: R$ 2.000.000,00"));
        assert!(summary.contains("- Quantidade: 20 projetos"));
        assert!(summary.contains("Pesquisadores, ICTs"));
        assert!(summary.contains("- Inscrições até: 30/10/2025"));
    }

    #[test]
    fn test_recommendation_ordering() {
        assert!(Recommendation::High > Recommendation::Medium);
        assert!(Recommendation::Medium > Recommendation::Low);
    }
}
