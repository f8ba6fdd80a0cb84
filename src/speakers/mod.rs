//! Speaker analytics over a date range
//!
//! Picking a range loads the speakers that took part in it (`gen_stats`);
//! analysing a selection loads per-episode figures (`speaker_stats`) and turns
//! them into charts and detail tables.

pub mod charts;
pub mod tables;

use crate::api::{ApiClient, GenStats, SpeakerStat};
use crate::error::AppError;
use crate::text::format_hours_minutes;
use askama::Template;
use chrono::NaiveDate;

pub use charts::{ApproxMeasure, BarDatum, Chart, ChartLayout, TextMeasure};
pub use tables::{episode_link, DetailTable, EpisodeRow};

/// Above this many speakers the report skips the per-speaker tables
pub const MAX_DETAILED_SPEAKERS: usize = 20;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpeakerOption {
    pub tag: String,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeriodSummary {
    pub total_episodes: u64,
    pub speakers: usize,
    pub hours: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RangeOutcome {
    /// A date is missing; the selector was emptied and disabled
    Cleared,
    /// Same range as the one already loaded
    Unchanged,
    Loaded(PeriodSummary),
}

#[derive(Debug, Clone)]
pub enum Details {
    Tables(Vec<DetailTable>),
    /// Number of selected speakers
    TooMany(usize),
}

#[derive(Debug, Clone)]
pub struct SpeakerReport {
    pub charts: Vec<Chart>,
    pub details: Details,
}

impl SpeakerReport {
    fn build(stats: &[SpeakerStat], base_path: &str) -> Self {
        let episodes = stats
            .iter()
            .map(|s| BarDatum {
                name: s.tag.clone(),
                value: s.episodes.len() as f64,
            })
            .collect();
        let minutes = stats
            .iter()
            .map(|s| BarDatum {
                name: s.tag.clone(),
                value: (s.episodes.iter().map(|e| e.duration).sum::<f64>() / 60.0).round(),
            })
            .collect();

        let charts = vec![
            Chart::bars("Episodes per speaker", "Episodes", "#F59E0B", episodes),
            Chart::bars("Total speaking time per speaker (minutes)", "Minutes", "#10B981", minutes),
            Chart::timeline("Episode and intervention timeline", stats),
        ];

        let details = if stats.len() <= MAX_DETAILED_SPEAKERS {
            Details::Tables(
                stats
                    .iter()
                    .filter(|s| !s.episodes.is_empty())
                    .map(|s| DetailTable::build(s, base_path))
                    .collect(),
            )
        } else {
            Details::TooMany(stats.len())
        };

        Self { charts, details }
    }

    /// Lay out every chart for the container width
    pub fn on_layout(&mut self, container_width: f64, measure: &dyn TextMeasure) {
        for chart in &mut self.charts {
            chart.on_layout(container_width, measure);
        }
    }

    pub fn render_html(&self) -> Result<String, AppError> {
        let charts = self
            .charts
            .iter()
            .map(|c| (c.title.clone(), c.to_svg().unwrap_or_default()))
            .collect();
        let tables = match &self.details {
            Details::Tables(tables) => tables
                .iter()
                .map(|t| t.render_html())
                .collect::<Result<Vec<_>, _>>()?,
            Details::TooMany(_) => Vec::new(),
        };
        let too_many = match self.details {
            Details::TooMany(n) => n,
            Details::Tables(_) => 0,
        };
        Ok(ReportTemplate {
            charts,
            tables,
            too_many,
        }
        .render()?)
    }
}

#[derive(Template)]
#[template(
    source = r#"<div id="chartsContainer" class="space-y-6">
{% for (title, svg) in charts %}
  <div class="bg-white p-3 rounded-lg border shadow-sm overflow-visible">
    <h4 class="text-lg font-semibold mb-4 text-gray-800">{{ title }}</h4>
    {{ svg|safe }}
  </div>
{% endfor %}
{% for table in tables %}{{ table|safe }}
{% endfor %}
{% if too_many > 0 %}
  <div class="bg-blue-50 p-4 rounded-lg mt-6"><p class="text-blue-800 text-sm"><strong>Note:</strong> {{ too_many }} speakers selected (too many to show details).</p></div>
{% endif %}
</div>"#,
    ext = "html"
)]
struct ReportTemplate {
    charts: Vec<(String, String)>,
    tables: Vec<String>,
    too_many: usize,
}

pub struct SpeakerAnalyticsController {
    api: ApiClient,
    range: Option<(NaiveDate, NaiveDate)>,
    stats: Option<GenStats>,
    selected: Vec<String>,
    loading: bool,
    selector_enabled: bool,
}

impl SpeakerAnalyticsController {
    pub fn new(api: ApiClient) -> Self {
        Self {
            api,
            range: None,
            stats: None,
            selected: Vec::new(),
            loading: false,
            selector_enabled: false,
        }
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn selector_enabled(&self) -> bool {
        self.selector_enabled
    }

    pub fn stats(&self) -> Option<&GenStats> {
        self.stats.as_ref()
    }

    pub fn selected(&self) -> &[String] {
        &self.selected
    }

    /// Load the speakers of a period. Only a complete, ordered range that
    /// differs from the loaded one reaches the backend.
    pub async fn set_range(
        &mut self,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
    ) -> Result<RangeOutcome, AppError> {
        let (from, to) = match (from, to) {
            (Some(from), Some(to)) => (from, to),
            _ => {
                self.range = None;
                self.stats = None;
                self.selected.clear();
                self.selector_enabled = false;
                return Ok(RangeOutcome::Cleared);
            }
        };
        if from > to {
            return Err(AppError::Validation(
                "The start date must be before the end date.".into(),
            ));
        }
        if self.range == Some((from, to)) && self.stats.is_some() {
            return Ok(RangeOutcome::Unchanged);
        }

        self.loading = true;
        self.selector_enabled = false;
        let result = self
            .api
            .gen_stats(&from.to_string(), &to.to_string())
            .await;
        self.loading = false;

        match result {
            Ok(stats) => {
                log::info!(
                    "Loaded {} speakers for {} .. {}",
                    stats.speakers.len(),
                    from,
                    to
                );
                self.range = Some((from, to));
                self.stats = Some(stats);
                self.selected.clear();
                self.selector_enabled = true;
                self.period_summary()
                    .map(RangeOutcome::Loaded)
                    .ok_or_else(|| AppError::Other("No speakers loaded".into()))
            }
            Err(e) => {
                log::error!("Failed to load speakers: {}", e);
                self.selector_enabled = self.stats.is_some();
                Err(e)
            }
        }
    }

    /// `"{tag} ({n} episodes, {h}h {m}m)"` for each loaded speaker
    pub fn options(&self) -> Vec<SpeakerOption> {
        self.stats
            .iter()
            .flat_map(|s| s.speakers.iter())
            .map(|s| SpeakerOption {
                tag: s.tag.clone(),
                label: format!(
                    "{} ({} episodes, {})",
                    s.tag,
                    s.total_episodes,
                    format_hours_minutes(s.total_duration)
                ),
            })
            .collect()
    }

    pub fn period_summary(&self) -> Option<PeriodSummary> {
        self.stats.as_ref().map(|s| PeriodSummary {
            total_episodes: s.total_episodes,
            speakers: s.speakers.len(),
            hours: (s.total_duration / 3600.0).round() as u64,
        })
    }

    pub fn select(&mut self, tags: &[String]) {
        self.selected = tags.to_vec();
    }

    pub fn analyze_enabled(&self) -> bool {
        self.stats.is_some() && !self.selected.is_empty() && !self.loading
    }

    /// Fetch per-episode figures for the selected speakers and build the report
    pub async fn analyze(&mut self) -> Result<SpeakerReport, AppError> {
        if self.selected.is_empty() {
            return Err(AppError::Validation(
                "Select at least one speaker.".into(),
            ));
        }
        let (from, to) = self.range.ok_or_else(|| {
            AppError::Validation("Pick a date range first.".into())
        })?;

        self.loading = true;
        let result = self
            .api
            .speaker_stats(&self.selected, &from.to_string(), &to.to_string())
            .await;
        self.loading = false;

        let stats = result?;
        log::info!("Building report for {} speakers", stats.len());
        Ok(SpeakerReport::build(&stats, &self.api.api_path("")))
    }
}
