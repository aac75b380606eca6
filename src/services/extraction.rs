// src/services/extraction.rs

//! Field extraction from notice document text.
//!
//! Everything here is keyword and pattern matching over plain text. Nothing
//! fails: a field that cannot be found is left empty.

use chrono::NaiveDate;
use regex::Regex;

use crate::error::Result;
use crate::models::{BeneficiaryProfile, KeyDates, PdfDetails, SchedulePhase, Values};
use crate::services::pdf::PdfText;

/// Maximum number of requirement items kept per document.
pub const MAX_REQUIREMENTS: usize = 10;

const DATE: &str = r"(\d{1,2}[/-]\d{1,2}[/-]\d{4}|\d{1,2}\s+de\s+\w+\s+de\s+\d{4})";

const SCHEDULE_HEADINGS: [&str; 3] = ["cronograma", "calendário", "prazo"];

const AUDIENCE: [(&str, &str); 6] = [
    ("Pesquisadores", r"\b(?:pesquisador|docente|professor)"),
    (
        "Estudantes",
        r"\b(?:estudante|aluno|graduação|mestrado|doutorado)",
    ),
    ("Empresas", r"\b(?:empresa|cnpj\b|mei\b|startup)"),
    ("ICTs", r"\b(?:icts?\b|instituição de ciência|universidade)"),
    (
        "ONGs",
        r"\b(?:ongs?\b|organização não governamental|terceiro setor)",
    ),
    ("Empreendedores", r"\b(?:empreendedor|inovador)"),
];

const BENEFICIARIES: [(&str, &str); 5] = [
    ("Pesquisadores", r"\b(?:pesquisador|cientista)"),
    ("Docentes", r"\b(?:docente|professor)"),
    ("Estudantes", r"\b(?:estudante|aluno|discente)"),
    ("Empresas", r"\b(?:empresa|cnpj\b|mei\b)"),
    ("Empreendedores", r"\b(?:empreendedor|startup)"),
];

/// Checked in order, the first one mentioned wins.
const DEGREES: [&str; 4] = ["doutorado", "mestrado", "graduação", "especialização"];

const THEMES: [(&str, &str); 9] = [
    ("Saúde", r"\b(?:saúde|medicina|farmácia|enfermagem)"),
    ("Tecnologia", r"\b(?:tecnologia|ti\b|informática|software)"),
    ("Agricultura", r"\b(?:agricultura|agropecuária|rural|agronomia)"),
    ("Energia", r"\b(?:energia|energético|solar|eólica|renovável)"),
    ("Meio Ambiente", r"\b(?:ambiente|sustentabilidade|ecologia)"),
    ("Educação", r"\b(?:educação|ensino|pedagógico)"),
    ("Inovação", r"\b(?:inovação|startup|empreendedorismo)"),
    ("Ciências Sociais", r"\b(?:social|humanas|sociologia)"),
    ("Engenharia", r"\b(?:engenharia|construção|infraestrutura)"),
];

/// Extracts structured fields from the text of a notice.
#[derive(Debug)]
pub struct FieldExtractor {
    amount: Regex,
    per_project_after: Regex,
    per_project_before: Regex,
    project_count: Regex,
    counterpart: Regex,
    registration: Regex,
    preliminary: Regex,
    final_result: Regex,
    requirement_heading: Regex,
    section_end: Regex,
    list_item: Regex,
    phase: Regex,
    date: Regex,
    institution: Regex,
    beneficiaries: Vec<(&'static str, Regex)>,
    audience: Vec<(&'static str, Regex)>,
    themes: Vec<(&'static str, Regex)>,
}

impl FieldExtractor {
    pub fn new() -> Result<Self> {
        Ok(Self {
            amount: Regex::new(r"R\$\s*(\d[\d.,]*)")?,
            per_project_after: Regex::new(
                r"(?i)por\s+(?:projeto|proposta)\D{0,60}?R\$\s*(\d[\d.,]*)",
            )?,
            per_project_before: Regex::new(
                r"(?i)R\$\s*(\d[\d.,]*)[^\n]{0,40}?por\s+(?:projeto|proposta)",
            )?,
            project_count: Regex::new(r"(?i)até\s+(\d+)\s+projetos?")?,
            counterpart: Regex::new(r"(?i)contrapartida\D*?(\d[\d.,]*\s*%|R\$\s*\d[\d.,]*)")?,
            registration: Regex::new(&format!(
                r"(?i)inscriç(?:ões|ão)\D*?{DATE}\s+(?:a|até|e)\s+{DATE}"
            ))?,
            preliminary: Regex::new(&format!(r"(?i)resultado\s+(?:preliminar|parcial)\D*?{DATE}"))?,
            final_result: Regex::new(&format!(r"(?i)resultado\s+final\D*?{DATE}"))?,
            requirement_heading: Regex::new(r"(?i)requisitos?|critérios?|condições")?,
            section_end: Regex::new(r"\n[A-Za-zÀ-ÿ]")?,
            list_item: Regex::new(r"(?m)^\s*(?:\d+[.)]?|[-•])\s*([^\n]+)")?,
            phase: Regex::new(
                r"(?m)^[ \t]*(?:\d+[.)]?[ \t]*|[-•][ \t]*)?([^:\n]+):[ \t]*([^\n]*\S)",
            )?,
            date: Regex::new(DATE)?,
            institution: Regex::new(r"\b(?:icts?\b|universidade|instituição)")?,
            beneficiaries: compile_table(&BENEFICIARIES)?,
            audience: compile_table(&AUDIENCE)?,
            themes: compile_table(&THEMES)?,
        })
    }

    /// Money figures: the largest `R$` amount is taken as the total.
    pub fn values(&self, text: &str) -> Values {
        let total = self
            .amount
            .captures_iter(text)
            .filter_map(|c| parse_brl(&c[1]))
            .reduce(f64::max);

        let per_project = self
            .per_project_after
            .captures(text)
            .or_else(|| self.per_project_before.captures(text))
            .and_then(|c| parse_brl(&c[1]));

        let project_count = self
            .project_count
            .captures(text)
            .and_then(|c| c[1].parse().ok());

        let counterpart = self
            .counterpart
            .captures(text)
            .map(|c| c[1].trim().trim_end_matches(['.', ',']).to_string());

        Values {
            total,
            per_project,
            project_count,
            counterpart,
        }
    }

    /// Registration window and result dates.
    ///
    /// Searched inside the schedule sections when the document has any,
    /// otherwise over the whole text.
    pub fn key_dates(&self, text: &str) -> KeyDates {
        let schedule = schedule_sections(text);
        let haystack = if schedule.is_empty() {
            text
        } else {
            schedule.as_str()
        };

        let mut dates = KeyDates::default();
        if let Some(c) = self.registration.captures(haystack) {
            dates.registration_start = parse_date(&c[1]);
            dates.registration_end = parse_date(&c[2]);
        }
        dates.preliminary_result = self
            .preliminary
            .captures(haystack)
            .and_then(|c| parse_date(&c[1]));
        dates.final_result = self
            .final_result
            .captures(haystack)
            .and_then(|c| parse_date(&c[1]));
        dates
    }

    pub fn audience(&self, text: &str) -> Vec<String> {
        matching_labels(&self.audience, &text.to_lowercase(), "Geral")
    }

    pub fn thematic_areas(&self, text: &str) -> Vec<String> {
        matching_labels(&self.themes, &text.to_lowercase(), "Multidisciplinar")
    }

    /// Applicant categories, minimum degree and institutional link.
    pub fn beneficiary_profile(&self, text: &str) -> BeneficiaryProfile {
        let lower = text.to_lowercase();
        BeneficiaryProfile {
            categories: self
                .beneficiaries
                .iter()
                .filter(|(_, re)| re.is_match(&lower))
                .map(|(label, _)| label.to_string())
                .collect(),
            min_degree: DEGREES
                .iter()
                .find(|degree| lower.contains(*degree))
                .map(|degree| degree.to_string()),
            institutional_link: self.institution.is_match(&lower).then(|| "ICT".to_string()),
        }
    }

    /// `name: description` lines of the schedule sections, with the dates
    /// each one mentions. Repeated lines are kept once.
    pub fn schedule(&self, text: &str) -> Vec<SchedulePhase> {
        let sections = schedule_sections(text);
        let mut phases: Vec<SchedulePhase> = Vec::new();
        for c in self.phase.captures_iter(&sections) {
            let name = c[1].trim();
            let description = c[2].trim();
            if name.is_empty() {
                continue;
            }
            if phases.iter().any(|p| p.name == name && p.description == description) {
                continue;
            }
            phases.push(SchedulePhase {
                name: name.to_string(),
                description: description.to_string(),
                dates: self
                    .date
                    .find_iter(description)
                    .filter_map(|m| parse_date(m.as_str()))
                    .collect(),
            });
        }
        phases
    }

    /// Numbered or bulleted items under requirement, criteria and condition
    /// headings.
    pub fn requirements(&self, text: &str) -> Vec<String> {
        let mut items = Vec::new();
        for heading in ["requisito", "critério", "condições"] {
            let Some(start) = self
                .requirement_heading
                .find_iter(text)
                .find(|m| m.as_str().to_lowercase().starts_with(heading))
            else {
                continue;
            };

            let rest = &text[start.end()..];
            let section = match self.section_end.find(rest) {
                Some(end) => &rest[..end.start()],
                None => rest,
            };
            items.extend(
                self.list_item
                    .captures_iter(section)
                    .map(|c| c[1].trim().to_string())
                    .filter(|item| !item.is_empty()),
            );
        }
        items.truncate(MAX_REQUIREMENTS);
        items
    }

    /// Every field of a notice document.
    pub fn analyze_pdf(&self, url: &str, pdf: PdfText) -> PdfDetails {
        PdfDetails {
            url: url.to_string(),
            values: self.values(&pdf.text),
            dates: self.key_dates(&pdf.text),
            audience: self.audience(&pdf.text),
            requirements: self.requirements(&pdf.text),
            thematic_areas: self.thematic_areas(&pdf.text),
            beneficiary: self.beneficiary_profile(&pdf.text),
            schedule: self.schedule(&pdf.text),
            text_length: pdf.text.chars().count(),
            pages: pdf.pages,
            method: pdf.method,
            text: pdf.text,
        }
    }
}

fn compile_table(table: &[(&'static str, &str)]) -> Result<Vec<(&'static str, Regex)>> {
    table
        .iter()
        .map(|(label, pattern)| -> Result<(&'static str, Regex)> {
            Ok((*label, Regex::new(pattern)?))
        })
        .collect()
}

fn matching_labels(table: &[(&'static str, Regex)], lower: &str, fallback: &str) -> Vec<String> {
    let labels: Vec<String> = table
        .iter()
        .filter(|(_, re)| re.is_match(lower))
        .map(|(label, _)| label.to_string())
        .collect();
    if labels.is_empty() {
        vec![fallback.to_string()]
    } else {
        labels
    }
}

/// Text from each schedule heading to the next blank line.
fn schedule_sections(text: &str) -> String {
    let lower = text.to_lowercase();
    let mut out = String::new();
    for heading in SCHEDULE_HEADINGS {
        // Lowercasing can shift byte offsets, so only trust a hit that lines
        // up with the original text.
        let Some(start) = lower.find(heading) else {
            continue;
        };
        let Some(rest) = text.get(start..) else {
            continue;
        };
        if !rest.to_lowercase().starts_with(heading) {
            continue;
        }
        let section = rest.find("\n\n").map_or(rest, |end| &rest[..end]);
        out.push_str(section);
        out.push('\n');
    }
    out
}

/// Parse a Brazilian formatted amount such as `1.500.000,00`.
pub fn parse_brl(raw: &str) -> Option<f64> {
    let trimmed = raw.trim_end_matches(['.', ',']);
    trimmed
        .replace('.', "")
        .replace(',', ".")
        .parse()
        .ok()
        .filter(|v: &f64| v.is_finite())
}

/// Parse `dd/mm/yyyy`, `dd-mm-yyyy` or `dd de <mês> de yyyy`.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    for fmt in ["%d/%m/%Y", "%d-%m-%Y"] {
        if let Ok(date) = NaiveDate::parse_from_str(raw, fmt) {
            return Some(date);
        }
    }

    let parts: Vec<&str> = raw.split_whitespace().collect();
    let [day, "de", month, "de", year] = parts.as_slice() else {
        return None;
    };
    NaiveDate::from_ymd_opt(
        year.parse().ok()?,
        month_number(&month.to_lowercase())?,
        day.parse().ok()?,
    )
}

fn month_number(name: &str) -> Option<u32> {
    let month = match name {
        "janeiro" => 1,
        "fevereiro" => 2,
        "março" | "marco" => 3,
        "abril" => 4,
        "maio" => 5,
        "junho" => 6,
        "julho" => 7,
        "agosto" => 8,
        "setembro" => 9,
        "outubro" => 10,
        "novembro" => 11,
        "dezembro" => 12,
        _ => return None,
    };
    Some(month)
}
