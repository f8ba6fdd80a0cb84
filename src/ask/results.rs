//! Answer panel: response text, references, share link and related questions

use super::similarity::{tier_views, TierView};
use crate::api::AskResponse;
use crate::error::AppError;
use crate::text::format_time;
use askama::Template;

const NO_ANSWER: &str = "No answer for this language.";

#[derive(Debug, Clone)]
pub struct ReferenceRow {
    pub tag: String,
    pub label: String,
    pub file: String,
    pub link: Option<String>,
    /// `m:ss` into the episode
    pub time: String,
}

#[derive(Debug, Clone)]
pub struct ResultsView {
    /// Answer HTML produced by the backend, shown as-is
    pub answer_html: String,
    pub references: Vec<ReferenceRow>,
    pub share_url: Option<String>,
    pub similar: Vec<TierView>,
}

impl ResultsView {
    /// Build the panel for `lang`. `origin` is prefixed to the saved-query path.
    pub fn build(data: &AskResponse, lang: &str, origin: &str) -> Self {
        let answer_html = data
            .response
            .get(lang)
            .filter(|s| !s.is_empty())
            .cloned()
            .unwrap_or_else(|| NO_ANSWER.to_string());

        let references = data
            .references
            .iter()
            .map(|r| ReferenceRow {
                tag: r.tag.clone().unwrap_or_default(),
                label: r.label.get(lang).cloned().unwrap_or_default(),
                file: r.file.clone(),
                link: r.hyperlink.get(lang).filter(|u| !u.is_empty()).cloned(),
                time: format_time(r.time),
            })
            .collect();

        let share_url = data
            .saved_query_url
            .as_deref()
            .filter(|u| !u.is_empty())
            .map(|path| format!("{}{}", origin.trim_end_matches('/'), path));

        let similar = data
            .similar_queries
            .as_ref()
            .map(tier_views)
            .unwrap_or_default();

        Self {
            answer_html,
            references,
            share_url,
            similar,
        }
    }

    pub fn render_html(&self) -> Result<String, AppError> {
        Ok(ResultsTemplate { view: self }.render()?)
    }
}

#[derive(Template)]
#[template(
    source = r#"<div id="searchResult" class="prose" tabindex="-1">{{ view.answer_html|safe }}</div>
<table class="min-w-full"><tbody id="refsTable">
{% if view.references.is_empty() %}
  <tr><td colspan="4" class="px-4 py-2 text-gray-400">No references.</td></tr>
{% endif %}
{% for r in view.references %}
  <tr>
    <td class="px-4 py-2 border-b">{{ r.tag }}</td>
    <td class="px-4 py-2 border-b">{{ r.label }}</td>
    <td class="px-4 py-2 border-b">{% match r.link %}{% when Some with (url) %}<a class="text-blue-600 underline" href="{{ url }}" target="_blank">{{ r.file }}</a>{% when None %}<span class="text-gray-400">{{ r.file }}</span>{% endmatch %}</td>
    <td class="px-4 py-2 border-b">{{ r.time }}</td>
  </tr>
{% endfor %}
</tbody></table>
{% match view.share_url %}{% when Some with (url) %}<div id="shareUrlSection"><input id="shareUrlInput" readonly value="{{ url }}"></div>{% when None %}{% endmatch %}
{% if !view.similar.is_empty() %}
<section id="similarQueriesSection">
{% for tier in view.similar %}
  <div class="{{ tier.css }}" data-tier="{{ tier.label }}">
    <h4>{{ tier.label }}</h4>
    <table><tbody>
    {% for row in tier.rows %}
      <tr><td class="px-4 py-2 text-sm"><a href="{{ row.url }}" class="text-blue-600 hover:underline">{{ row.text }}</a></td><td class="px-4 py-2 text-center text-sm font-semibold">{{ row.percent }}</td></tr>
    {% endfor %}
    </tbody></table>
  </div>
{% endfor %}
</section>
{% endif %}"#,
    ext = "html"
)]
struct ResultsTemplate<'a> {
    view: &'a ResultsView,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{Reference, SimilarQueries, SimilarQuery};
    use std::collections::HashMap;

    fn answer() -> AskResponse {
        AskResponse {
            response: HashMap::from([("es".to_string(), "<p>Respuesta</p>".to_string())]),
            references: vec![
                Reference {
                    tag: Some("ep042".into()),
                    label: HashMap::from([("es".to_string(), "Inicio".to_string())]),
                    file: "ep042.html".into(),
                    hyperlink: HashMap::from([(
                        "es".to_string(),
                        "/transcripts/ep042.html#t=65".to_string(),
                    )]),
                    time: 65.0,
                },
                Reference {
                    tag: None,
                    file: "ep043.html".into(),
                    time: 5.0,
                    ..Default::default()
                },
            ],
            saved_query_url: Some("/sttcast/savedquery/abc".into()),
            ..Default::default()
        }
    }

    #[test]
    fn test_build_for_language() {
        let view = ResultsView::build(&answer(), "es", "https://example.org/");
        assert_eq!(view.answer_html, "<p>Respuesta</p>");
        assert_eq!(view.references[0].time, "1:05");
        assert!(view.references[0].link.is_some());
        assert!(view.references[1].link.is_none());
        assert_eq!(
            view.share_url.as_deref(),
            Some("https://example.org/sttcast/savedquery/abc")
        );

        let en = ResultsView::build(&answer(), "en", "https://example.org");
        assert_eq!(en.answer_html, NO_ANSWER);
        assert!(en.references[0].link.is_none());
        assert_eq!(en.references[0].label, "");
    }

    #[test]
    fn test_render_keeps_answer_html_and_escapes_rest() {
        let mut data = answer();
        data.references[1].file = "<b>raw</b>".into();
        let html = ResultsView::build(&data, "es", "https://example.org")
            .render_html()
            .unwrap();
        assert!(html.contains("<p>Respuesta</p>"));
        assert!(!html.contains("<b>raw"));
        assert!(html.contains("&lt;b&gt;raw"));
        assert!(html.contains("shareUrlInput"));
        assert!(!html.contains("similarQueriesSection"));
    }

    #[test]
    fn test_empty_references_row() {
        let data = AskResponse {
            response: HashMap::from([("es".to_string(), "x".to_string())]),
            ..Default::default()
        };
        let html = ResultsView::build(&data, "es", "").render_html().unwrap();
        assert!(html.contains("No references."));
        assert!(!html.contains("shareUrlInput"));
    }

    #[test]
    fn test_related_questions_section() {
        let mut data = answer();
        data.similar_queries = Some(SimilarQueries {
            low: vec![SimilarQuery {
                uuid: "u1".into(),
                query_text: "Otra".into(),
                similarity: 0.634,
                url: "/savedquery/u1".into(),
            }],
            ..Default::default()
        });
        let view = ResultsView::build(&data, "es", "");
        assert_eq!(view.similar.len(), 1);
        let html = view.render_html().unwrap();
        assert!(html.contains("similarQueriesSection"));
        assert!(html.contains("63%"));
    }
}
