//! Per-speaker episode tables

use crate::api::{SpeakerEpisode, SpeakerStat};
use crate::error::AppError;
use crate::text::round2;
use askama::Template;

#[derive(Debug, Clone, PartialEq)]
pub struct EpisodeRow {
    pub name: String,
    pub link: String,
    pub date: String,
    pub minutes: f64,
    pub percent: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DetailTable {
    pub tag: String,
    pub rows: Vec<EpisodeRow>,
    pub episode_count: usize,
    pub total_minutes: f64,
    /// Share of the speaker's period total covered by the listed episodes
    pub total_percent: f64,
}

/// Transcript page of an episode
pub fn episode_link(base_path: &str, name: &str) -> String {
    format!("{}/transcripts/{}_whisper_audio_es.html", base_path, name)
}

fn percent_of(part: f64, whole: f64) -> f64 {
    if whole > 0.0 {
        round2(part / whole * 100.0)
    } else {
        0.0
    }
}

impl DetailTable {
    pub fn build(speaker: &SpeakerStat, base_path: &str) -> Self {
        let mut episodes: Vec<&SpeakerEpisode> = speaker.episodes.iter().collect();
        // ISO dates sort lexically
        episodes.sort_by(|a, b| a.date.cmp(&b.date));

        let rows = episodes
            .iter()
            .map(|ep| EpisodeRow {
                name: ep.name.clone(),
                link: episode_link(base_path, &ep.name),
                date: ep.date.clone(),
                minutes: round2(ep.duration / 60.0),
                percent: percent_of(ep.duration, ep.total_episode_duration),
            })
            .collect();

        let spoken: f64 = episodes.iter().map(|ep| ep.duration).sum();
        Self {
            tag: speaker.tag.clone(),
            rows,
            episode_count: speaker.episodes.len(),
            total_minutes: round2(spoken / 60.0),
            total_percent: percent_of(spoken, speaker.total_duration),
        }
    }

    pub fn render_html(&self) -> Result<String, AppError> {
        Ok(DetailTableTemplate { table: self }.render()?)
    }
}

#[derive(Template)]
#[template(
    source = r#"<div class="bg-white p-6 rounded-lg border shadow-sm mt-6">
  <h4 class="text-lg font-semibold mb-4 text-gray-800">Participation detail - {{ table.tag }}</h4>
  <table class="w-full text-sm">
    <thead><tr class="border-b border-gray-200"><th>Episode</th><th>Date</th><th>Duration (min)</th><th>% of episode</th></tr></thead>
    <tbody>
    {% for row in table.rows %}
      <tr><td><a class="text-blue-600 hover:underline" href="{{ row.link }}" target="_blank">{{ row.name }}</a></td><td>{{ row.date }}</td><td class="text-right">{{ row.minutes }}</td><td class="text-right">{{ row.percent }}%</td></tr>
    {% endfor %}
    </tbody>
    <tfoot><tr class="border-t-2 border-gray-300 font-semibold"><td>TOTAL</td><td>{{ table.episode_count }} episodes</td><td class="text-right">{{ table.total_minutes }}</td><td class="text-right">{{ table.total_percent }}%</td></tr></tfoot>
  </table>
</div>"#,
    ext = "html"
)]
struct DetailTableTemplate<'a> {
    table: &'a DetailTable,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn episode(name: &str, date: &str, duration: f64, total: f64) -> SpeakerEpisode {
        SpeakerEpisode {
            name: name.into(),
            date: date.into(),
            duration,
            total_episode_duration: total,
        }
    }

    #[test]
    fn test_rows_sorted_and_rounded() {
        let speaker = SpeakerStat {
            tag: "Ana".into(),
            total_duration: 1000.0,
            total_episodes: Some(2),
            episodes: vec![
                episode("ep2", "2024-02-01", 100.0, 0.0),
                episode("ep1", "2024-01-15", 200.0, 3000.0),
            ],
        };
        let table = DetailTable::build(&speaker, "/sttcast");
        assert_eq!(table.rows[0].name, "ep1");
        assert_eq!(table.rows[0].minutes, 3.33);
        assert_eq!(table.rows[0].percent, 6.67);
        assert_eq!(
            table.rows[0].link,
            "/sttcast/transcripts/ep1_whisper_audio_es.html"
        );
        // unknown episode length
        assert_eq!(table.rows[1].percent, 0.0);

        assert_eq!(table.episode_count, 2);
        assert_eq!(table.total_minutes, 5.0);
        assert_eq!(table.total_percent, 30.0);
    }

    #[test]
    fn test_zero_speaker_total() {
        let speaker = SpeakerStat {
            tag: "Ana".into(),
            total_duration: 0.0,
            total_episodes: None,
            episodes: vec![episode("ep1", "2024-01-15", 60.0, 600.0)],
        };
        let table = DetailTable::build(&speaker, "");
        assert_eq!(table.total_percent, 0.0);
        let html = table.render_html().unwrap();
        assert!(html.contains("TOTAL"));
        assert!(html.contains("1 episodes"));
        assert!(html.contains("10%"));
    }
}
