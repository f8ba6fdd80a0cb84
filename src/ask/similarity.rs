//! Tiered suggestions shown when a question resembles saved ones

use crate::api::{SimilarQueries, SimilarQuery};
use crate::error::AppError;
use askama::Template;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimilarityTier {
    High,
    Medium,
    Low,
}

impl SimilarityTier {
    /// Display order
    pub const ALL: [SimilarityTier; 3] = [Self::High, Self::Medium, Self::Low];

    pub fn label(&self) -> &'static str {
        match self {
            Self::High => "High similarity (85%+)",
            Self::Medium => "Medium similarity (70-84%)",
            Self::Low => "Low similarity (60-69%)",
        }
    }

    fn css(&self) -> &'static str {
        match self {
            Self::High => "bg-green-100 border-green-200",
            Self::Medium => "bg-yellow-100 border-yellow-200",
            Self::Low => "bg-orange-100 border-orange-200",
        }
    }

    fn entries<'a>(&self, similar: &'a SimilarQueries) -> &'a [SimilarQuery] {
        match self {
            Self::High => &similar.high,
            Self::Medium => &similar.medium,
            Self::Low => &similar.low,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SimilarRow {
    pub uuid: String,
    pub text: String,
    pub url: String,
    /// Rounded percentage, e.g. "91%"
    pub percent: String,
}

#[derive(Debug, Clone)]
pub struct TierView {
    pub tier: SimilarityTier,
    pub label: &'static str,
    pub css: &'static str,
    pub rows: Vec<SimilarRow>,
}

/// Non-empty tiers of `similar`, highest first
pub fn tier_views(similar: &SimilarQueries) -> Vec<TierView> {
    SimilarityTier::ALL
        .iter()
        .filter_map(|tier| {
            let entries = tier.entries(similar);
            if entries.is_empty() {
                return None;
            }
            Some(TierView {
                tier: *tier,
                label: tier.label(),
                css: tier.css(),
                rows: entries
                    .iter()
                    .map(|q| SimilarRow {
                        uuid: q.uuid.clone(),
                        text: q.query_text.clone(),
                        url: q.url.clone(),
                        percent: percent(q.similarity),
                    })
                    .collect(),
            })
        })
        .collect()
}

fn percent(similarity: f64) -> String {
    format!("{}%", (similarity * 100.0).round() as i64)
}

/// The "reuse or search anew" panel
#[derive(Debug, Clone)]
pub struct DisambiguationView {
    pub message: String,
    pub tiers: Vec<TierView>,
}

impl DisambiguationView {
    pub fn new(similar: &SimilarQueries, message: Option<&str>) -> Self {
        Self {
            message: message
                .filter(|m| !m.trim().is_empty())
                .unwrap_or("Similar questions were found.")
                .to_string(),
            tiers: tier_views(similar),
        }
    }

    /// Rows in display order; the position is what the console asks for
    pub fn rows(&self) -> impl Iterator<Item = &SimilarRow> {
        self.tiers.iter().flat_map(|t| t.rows.iter())
    }

    pub fn render_html(&self) -> Result<String, AppError> {
        Ok(DisambiguationTemplate { view: self }.render()?)
    }
}

#[derive(Template)]
#[template(
    source = r#"<div id="similarQueriesDiv" class="bg-blue-50 border-l-4 border-blue-400 p-4 mb-6">
  <h3 class="text-sm font-medium text-blue-800">Similar questions found</h3>
  <p class="mt-2 text-sm text-blue-700">{{ view.message }}</p>
  <button type="button" data-action="search-anew" class="bg-blue-600 text-white px-4 py-2 rounded text-sm">Search again</button>
</div>
{% for tier in view.tiers %}
<div class="mt-4 {{ tier.css }} border rounded-lg p-4" data-tier="{{ tier.label }}">
  <h4 class="font-semibold mb-3 text-gray-800">{{ tier.label }}</h4>
  <div class="space-y-2">
  {% for row in tier.rows %}
    <div class="bg-white p-3 rounded border similar-row">
      <p class="text-sm text-gray-700 mb-2">{{ row.text }}</p>
      <span class="text-xs text-gray-500">Similarity: {{ row.percent }}</span>
      <button type="button" data-action="reuse" data-uuid="{{ row.uuid }}" class="bg-blue-500 text-white px-3 py-1 rounded text-xs">Use this answer</button>
    </div>
  {% endfor %}
  </div>
</div>
{% endfor %}"#,
    ext = "html"
)]
struct DisambiguationTemplate<'a> {
    view: &'a DisambiguationView,
}
