use serde::{Deserialize, Serialize};

use super::taxonomy::{LocationEntry, TaxonomyEntry};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractedCompany {
    pub name: String,
    pub website: String,
    pub industry: Option<String>,
    pub location: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassificationOutcome {
    pub is_company: bool,
    pub company_name: Option<String>,
    pub confidence: f32,
    pub reasoning: Option<String>,
    pub extracted: Option<ExtractedCompany>,
}

impl ClassificationOutcome {
    pub fn new(is_company: bool, confidence: f32) -> Self {
        ClassificationOutcome {
            is_company,
            company_name: None,
            confidence: clamp_confidence(confidence),
            reasoning: None,
            extracted: None,
        }
    }

    /// Attached to results the classifier returned nothing for.
    pub fn no_data() -> Self {
        ClassificationOutcome {
            reasoning: Some("No classification data returned".to_string()),
            ..ClassificationOutcome::new(false, 0.0)
        }
    }

    pub fn with_company_name(mut self, name: impl Into<String>) -> Self {
        self.company_name = Some(name.into());
        self
    }

    pub fn with_reasoning(mut self, reasoning: impl Into<String>) -> Self {
        self.reasoning = Some(reasoning.into());
        self
    }
}

fn clamp_confidence(confidence: f32) -> f32 {
    if confidence.is_nan() {
        0.0
    } else {
        confidence.clamp(0.0, 1.0)
    }
}

/// What the bulk extraction, background job and directory APIs need to know
/// about the search that produced the results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassificationContext {
    pub industry_title: String,
    pub city: String,
    pub state_or_province: Option<String>,
    pub country: String,
    pub min_confidence: f32,
}

impl ClassificationContext {
    pub fn new(taxonomy: &TaxonomyEntry, location: &LocationEntry, min_confidence: f32) -> Self {
        ClassificationContext {
            industry_title: taxonomy.title.clone(),
            city: location.name.clone(),
            state_or_province: location.state().map(|s| s.to_string()),
            country: location.country.clone(),
            min_confidence: clamp_confidence(min_confidence),
        }
    }

    pub fn location_label(&self) -> String {
        match &self.state_or_province {
            Some(state) => format!("{}, {}, {}", self.city, state, self.country),
            None => format!("{}, {}", self.city, self.country),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClassificationMode {
    Inline,
    Background,
}

impl ClassificationMode {
    pub fn select(result_count: usize, force_background: bool, inline_threshold: usize) -> Self {
        match force_background || result_count > inline_threshold {
            true => ClassificationMode::Background,
            false => ClassificationMode::Inline,
        }
    }
}

pub fn build_classification_prompt(url: &str, context: Option<&ClassificationContext>) -> String {
    let hint = match context {
        Some(ctx) => format!(
            "We are looking for {} businesses located in {}.\n",
            ctx.industry_title,
            ctx.location_label()
        ),
        None => String::new(),
    };

    format!(
        r#"{}Is the website at {} the official website of a single company or business?
Directories, listing sites, news articles, blogs, forums and social media pages are not company websites.
Answer with only a JSON object of the form:
{{"isCompany": true, "companyName": "...", "industry": "...", "location": "...", "confidence": 0.0, "reasoning": "..."}}"#,
        hint, url
    )
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct LlmVerdict {
    #[serde(alias = "isCompanyWebsite")]
    is_company: bool,
    company_name: Option<String>,
    industry: Option<String>,
    location: Option<String>,
    confidence: Option<f32>,
    reasoning: Option<String>,
}

/// Turns the model's free text into a verdict.
///
/// The prompt asks for JSON. When the model ignores that, a keyword match
/// decides, with a flat 0.5 confidence for positive answers.
pub fn parse_verdict(text: &str, url: &str) -> ClassificationOutcome {
    if let Some(verdict) = extract_json(text).and_then(|j| serde_json::from_str::<LlmVerdict>(j).ok())
    {
        return outcome_from_verdict(verdict, url);
    }

    let lowered = text.to_lowercase();
    let negative = ["not a company", "not a business", "no,", "no."]
        .iter()
        .any(|p| lowered.contains(p))
        || lowered.trim() == "no";

    let positive = ["company", "business", "yes"]
        .iter()
        .any(|p| lowered.contains(p));

    let reasoning = text.trim().chars().take(500).collect::<String>();
    match positive && !negative {
        true => ClassificationOutcome::new(true, 0.5).with_reasoning(reasoning),
        false => ClassificationOutcome::new(false, 0.0).with_reasoning(reasoning),
    }
}

fn outcome_from_verdict(verdict: LlmVerdict, url: &str) -> ClassificationOutcome {
    let default_confidence = match verdict.is_company {
        true => 0.5,
        false => 0.0,
    };
    let mut outcome =
        ClassificationOutcome::new(verdict.is_company, verdict.confidence.unwrap_or(default_confidence));
    outcome.reasoning = verdict.reasoning;

    let name = verdict.company_name.filter(|n| !n.trim().is_empty());
    if let Some(name) = name {
        if verdict.is_company {
            outcome.extracted = Some(ExtractedCompany {
                name: name.clone(),
                website: url.to_string(),
                industry: verdict.industry,
                location: verdict.location,
            });
        }
        outcome.company_name = Some(name);
    }

    outcome
}

fn extract_json(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (start < end).then(|| &text[start..=end])
}
