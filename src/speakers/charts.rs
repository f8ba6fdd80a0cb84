//! Chart layout and SVG output for the speaker report.
//!
//! Charts hold their data until [`Chart::on_layout`] is called with the width
//! of the container they will live in; only then are coordinates computed.
//! Text widths come from a [`TextMeasure`] so the layout can be tested without
//! a font rasteriser.

use crate::api::SpeakerStat;
use crate::text::{escape_attr, escape_text};
use std::collections::BTreeMap;
use std::fmt::Write as _;

/// Horizontal padding of the card around each chart
const CARD_PADDING: f64 = 24.0;

const PALETTE: [&str; 10] = [
    "#3B82F6", "#EF4444", "#10B981", "#F59E0B", "#8B5CF6", "#EC4899", "#14B8A6", "#F97316",
    "#6366F1", "#84CC16",
];

/// Width of rendered text, in pixels
pub trait TextMeasure {
    fn width(&self, text: &str, font_px: f64) -> f64;
}

/// Average glyph width approximation for proportional sans-serif fonts
#[derive(Debug, Clone, Copy, Default)]
pub struct ApproxMeasure;

impl TextMeasure for ApproxMeasure {
    fn width(&self, text: &str, font_px: f64) -> f64 {
        text.chars().count() as f64 * font_px * 0.6
    }
}

/// `count` distinct colours: the fixed palette first, then golden-angle hues
pub fn generate_colors(count: usize) -> Vec<String> {
    (0..count)
        .map(|i| match PALETTE.get(i) {
            Some(c) => c.to_string(),
            None => format!("hsl({}, 70%, 50%)", (i as f64 * 137.508) % 360.0),
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq)]
pub struct BarDatum {
    pub name: String,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Bar {
    pub name: String,
    pub value: f64,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BarLayout {
    pub width: f64,
    pub height: f64,
    pub pad_left: f64,
    pub pad_right: f64,
    pub pad_top: f64,
    pub pad_bottom: f64,
    /// Sorted by value, largest first
    pub bars: Vec<Bar>,
}

/// Horizontal bars, one per speaker
pub fn layout_bars(data: &[BarDatum], container_width: f64, measure: &dyn TextMeasure) -> BarLayout {
    let width = (container_width - CARD_PADDING).max(0.0);
    let height = (data.len() as f64 * 50.0).max(400.0);

    let max_label = data
        .iter()
        .map(|d| measure.width(&d.name, 12.0))
        .fold(0.0, f64::max);
    let pad_left = (max_label + 10.0).max(80.0);
    let (pad_right, pad_top, pad_bottom) = (30.0, 40.0, 60.0);

    let mut layout = BarLayout {
        width,
        height,
        pad_left,
        pad_right,
        pad_top,
        pad_bottom,
        bars: Vec::new(),
    };
    if data.is_empty() {
        return layout;
    }

    let chart_w = width - pad_left - pad_right;
    let chart_h = height - pad_top - pad_bottom;
    let slot = chart_h / data.len() as f64;
    let bar_h = slot * 0.7;
    let spacing = slot * 0.3;
    let max_value = data.iter().map(|d| d.value).fold(f64::MIN, f64::max);

    let mut sorted = data.to_vec();
    sorted.sort_by(|a, b| b.value.total_cmp(&a.value));

    layout.bars = sorted
        .into_iter()
        .enumerate()
        .map(|(i, d)| {
            let bar_w = if max_value > 0.0 {
                d.value / max_value * chart_w * 0.9
            } else {
                0.0
            };
            Bar {
                x: pad_left,
                y: pad_top + i as f64 * (bar_h + spacing) + spacing / 2.0,
                width: bar_w,
                height: bar_h,
                name: d.name,
                value: d.value,
            }
        })
        .collect();
    layout
}

fn format_value(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{}", value as i64)
    } else {
        format!("{:.2}", value)
    }
}

fn bar_svg(layout: &BarLayout, axis_label: &str, color: &str) -> String {
    let mut svg = String::new();
    let _ = write!(
        svg,
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{w:.0}" height="{h:.0}" viewBox="0 0 {w:.0} {h:.0}" font-family="Arial">"#,
        w = layout.width,
        h = layout.height
    );
    if layout.bars.is_empty() {
        let _ = write!(
            svg,
            r##"<text x="{:.1}" y="{:.1}" text-anchor="middle" font-size="16" fill="#6B7280">No data to display</text></svg>"##,
            layout.width / 2.0,
            layout.height / 2.0
        );
        return svg;
    }

    for bar in &layout.bars {
        let mid = bar.y + bar.height / 2.0 + 4.0;
        let _ = write!(
            svg,
            r##"<rect x="{:.1}" y="{:.1}" width="{:.1}" height="{:.1}" fill="{}"><title>{}</title></rect>"##,
            bar.x,
            bar.y,
            bar.width,
            bar.height,
            escape_attr(color),
            escape_text(&bar.name)
        );
        let _ = write!(
            svg,
            r##"<text x="{:.1}" y="{:.1}" font-size="12" fill="#374151">{}</text>"##,
            bar.x + bar.width + 5.0,
            mid,
            format_value(bar.value)
        );
        let _ = write!(
            svg,
            r##"<text x="{:.1}" y="{:.1}" font-size="12" text-anchor="end" fill="#374151">{}</text>"##,
            layout.pad_left - 10.0,
            mid,
            escape_text(&bar.name)
        );
    }

    let bottom = layout.height - layout.pad_bottom;
    let _ = write!(
        svg,
        r##"<line x1="{l:.1}" y1="{b:.1}" x2="{r:.1}" y2="{b:.1}" stroke="#D1D5DB"/><line x1="{l:.1}" y1="{t:.1}" x2="{l:.1}" y2="{b:.1}" stroke="#D1D5DB"/>"##,
        l = layout.pad_left,
        r = layout.width - layout.pad_right,
        t = layout.pad_top,
        b = bottom
    );
    let chart_w = layout.width - layout.pad_left - layout.pad_right;
    let _ = write!(
        svg,
        r##"<text x="{:.1}" y="{:.1}" text-anchor="middle" font-size="14" fill="#6B7280">{}</text></svg>"##,
        layout.pad_left + chart_w / 2.0,
        bottom + 40.0,
        escape_text(axis_label)
    );
    svg
}

// ── Timeline ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct Intervention {
    pub speaker: String,
    pub label: String,
    pub duration: f64,
    pub color: String,
    pub x: f64,
    pub width: f64,
    /// Minutes, e.g. "12m"
    pub duration_label: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TimelineEpisode {
    pub date: String,
    pub name: String,
    /// Episode name shortened to fit the row
    pub display_name: String,
    pub y: f64,
    pub interventions: Vec<Intervention>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LegendEntry {
    pub tag: String,
    pub color: String,
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TimelineLayout {
    pub width: f64,
    pub height: f64,
    pub pad_top: f64,
    pub pad_bottom: f64,
    pub timeline_x: f64,
    pub legend: Vec<LegendEntry>,
    /// Sorted by date
    pub episodes: Vec<TimelineEpisode>,
}

struct MergedEpisode<'a> {
    name: &'a str,
    date: &'a str,
    interventions: Vec<(usize, f64)>,
}

/// Episodes shared between speakers collapse into one row keyed by date and name
fn merge_episodes(stats: &[SpeakerStat]) -> Vec<MergedEpisode<'_>> {
    let mut merged: BTreeMap<(&str, &str), MergedEpisode<'_>> = BTreeMap::new();
    for (speaker_idx, speaker) in stats.iter().enumerate() {
        for ep in &speaker.episodes {
            merged
                .entry((ep.date.as_str(), ep.name.as_str()))
                .or_insert_with(|| MergedEpisode {
                    name: &ep.name,
                    date: &ep.date,
                    interventions: Vec::new(),
                })
                .interventions
                .push((speaker_idx, ep.duration));
        }
    }
    merged.into_values().collect()
}

fn speaker_label(tag: &str) -> String {
    if tag.chars().count() > 8 {
        format!("{}..", tag.chars().take(6).collect::<String>())
    } else {
        tag.to_string()
    }
}

fn fit_name(name: &str, max_width: f64, measure: &dyn TextMeasure) -> String {
    let mut out = name.to_string();
    while measure.width(&out, 12.0) > max_width && out.chars().count() > 10 {
        let keep = out.chars().count() - 4;
        out = format!("{}...", out.chars().take(keep).collect::<String>());
    }
    out
}

pub fn layout_timeline(
    stats: &[SpeakerStat],
    container_width: f64,
    measure: &dyn TextMeasure,
) -> TimelineLayout {
    let width = (container_width - CARD_PADDING).max(0.0);
    let colors = generate_colors(stats.len());
    let episodes = merge_episodes(stats);

    let legend_lines = stats.len().div_ceil(5);
    let legend_height = legend_lines as f64 * 20.0 + 40.0;
    let height = (episodes.len() as f64 * 80.0).max(600.0) + legend_height;

    let pad_left = 90.0;
    let pad_right = 30.0;
    let pad_top = legend_height + 40.0;
    let pad_bottom = 60.0;
    let timeline_x = pad_left;

    let mut legend = Vec::with_capacity(stats.len());
    let (mut lx, mut ly) = (pad_left, 20.0);
    for (speaker, color) in stats.iter().zip(&colors) {
        legend.push(LegendEntry {
            tag: speaker.tag.clone(),
            color: color.clone(),
            x: lx,
            y: ly,
        });
        lx += measure.width(&speaker.tag, 11.0) + 30.0;
        if lx > width - 150.0 {
            lx = pad_left;
            ly += 20.0;
        }
    }

    let chart_h = height - pad_top - pad_bottom;
    let spacing = chart_h / (episodes.len().saturating_sub(1)).max(1) as f64;
    let max_name_w = width - timeline_x - pad_right - 30.0;
    let max_bar_w = width - timeline_x - pad_right - 15.0;

    let episodes = episodes
        .into_iter()
        .enumerate()
        .map(|(i, ep)| {
            let total: f64 = ep.interventions.iter().map(|(_, d)| d).sum();
            let mut x = timeline_x + 15.0;
            let interventions = ep
                .interventions
                .iter()
                .map(|&(speaker_idx, duration)| {
                    let share = if total > 0.0 { duration / total } else { 0.0 };
                    let bar_w = (share * max_bar_w * 0.8).max(30.0);
                    let tag = &stats[speaker_idx].tag;
                    let item = Intervention {
                        speaker: tag.clone(),
                        label: speaker_label(tag),
                        duration,
                        color: colors[speaker_idx].clone(),
                        x,
                        width: bar_w,
                        duration_label: format!("{}m", (duration / 60.0).round() as i64),
                    };
                    x += bar_w + 5.0;
                    item
                })
                .collect();
            TimelineEpisode {
                date: ep.date.to_string(),
                name: ep.name.to_string(),
                display_name: fit_name(ep.name, max_name_w, measure),
                y: pad_top + i as f64 * spacing,
                interventions,
            }
        })
        .collect();

    TimelineLayout {
        width,
        height,
        pad_top,
        pad_bottom,
        timeline_x,
        legend,
        episodes,
    }
}

fn timeline_svg(layout: &TimelineLayout) -> String {
    let mut svg = String::new();
    let _ = write!(
        svg,
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{w:.0}" height="{h:.0}" viewBox="0 0 {w:.0} {h:.0}" font-family="Arial">"#,
        w = layout.width,
        h = layout.height
    );
    if layout.episodes.is_empty() {
        let _ = write!(
            svg,
            r##"<text x="{:.1}" y="100" text-anchor="middle" font-size="16" fill="#6B7280">No episodes to display</text></svg>"##,
            layout.width / 2.0
        );
        return svg;
    }

    for entry in &layout.legend {
        let _ = write!(
            svg,
            r##"<rect x="{:.1}" y="{:.1}" width="12" height="12" fill="{}"/><text x="{:.1}" y="{:.1}" font-size="11" fill="#374151">{}</text>"##,
            entry.x,
            entry.y,
            escape_attr(&entry.color),
            entry.x + 16.0,
            entry.y + 10.0,
            escape_text(&entry.tag)
        );
    }

    let _ = write!(
        svg,
        r##"<line x1="{x:.1}" y1="{t:.1}" x2="{x:.1}" y2="{b:.1}" stroke="#9CA3AF" stroke-width="2"/>"##,
        x = layout.timeline_x,
        t = layout.pad_top,
        b = layout.height - layout.pad_bottom
    );

    for ep in &layout.episodes {
        let _ = write!(
            svg,
            r##"<circle cx="{:.1}" cy="{:.1}" r="6" fill="#3B82F6"/><text x="{:.1}" y="{:.1}" font-size="11" text-anchor="end" fill="#374151">{}</text><text x="{:.1}" y="{:.1}" font-size="12" font-weight="bold" fill="#374151"><title>{}</title>{}</text>"##,
            layout.timeline_x,
            ep.y,
            layout.timeline_x - 15.0,
            ep.y + 4.0,
            escape_text(&ep.date),
            layout.timeline_x + 15.0,
            ep.y - 10.0,
            escape_text(&ep.name),
            escape_text(&ep.display_name)
        );
        for iv in &ep.interventions {
            let center = iv.x + iv.width / 2.0;
            let _ = write!(
                svg,
                r##"<rect x="{:.1}" y="{:.1}" width="{:.1}" height="20" fill="{}"><title>{}</title></rect><text x="{c:.1}" y="{:.1}" font-size="10" text-anchor="middle" fill="#FFFFFF">{}</text><text x="{c:.1}" y="{:.1}" font-size="9" text-anchor="middle" fill="#6B7280">{}</text>"##,
                iv.x,
                ep.y + 5.0,
                iv.width,
                escape_attr(&iv.color),
                escape_text(&iv.speaker),
                ep.y + 18.0,
                escape_text(&iv.label),
                ep.y + 35.0,
                escape_text(&iv.duration_label),
                c = center
            );
        }
    }
    svg.push_str("</svg>");
    svg
}

// ── Chart ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
enum ChartData {
    Bars {
        data: Vec<BarDatum>,
        axis_label: String,
        color: &'static str,
    },
    Timeline(Vec<SpeakerStat>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum ChartLayout {
    Bars(BarLayout),
    Timeline(TimelineLayout),
}

/// A chart waiting for its container width
#[derive(Debug, Clone)]
pub struct Chart {
    pub title: String,
    data: ChartData,
    layout: Option<ChartLayout>,
}

impl Chart {
    pub fn bars(title: &str, axis_label: &str, color: &'static str, data: Vec<BarDatum>) -> Self {
        Self {
            title: title.to_string(),
            data: ChartData::Bars {
                data,
                axis_label: axis_label.to_string(),
                color,
            },
            layout: None,
        }
    }

    pub fn timeline(title: &str, stats: &[SpeakerStat]) -> Self {
        Self {
            title: title.to_string(),
            data: ChartData::Timeline(stats.to_vec()),
            layout: None,
        }
    }

    /// Post-layout callback: compute coordinates for `container_width`
    pub fn on_layout(&mut self, container_width: f64, measure: &dyn TextMeasure) {
        let layout = match &self.data {
            ChartData::Bars { data, .. } => {
                ChartLayout::Bars(layout_bars(data, container_width, measure))
            }
            ChartData::Timeline(stats) => {
                ChartLayout::Timeline(layout_timeline(stats, container_width, measure))
            }
        };
        self.layout = Some(layout);
    }

    pub fn layout(&self) -> Option<&ChartLayout> {
        self.layout.as_ref()
    }

    /// SVG markup; `None` until the chart has been laid out
    pub fn to_svg(&self) -> Option<String> {
        match (&self.layout, &self.data) {
            (Some(ChartLayout::Bars(layout)), ChartData::Bars { axis_label, color, .. }) => {
                Some(bar_svg(layout, axis_label, color))
            }
            (Some(ChartLayout::Timeline(layout)), _) => Some(timeline_svg(layout)),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::SpeakerEpisode;

    fn datum(name: &str, value: f64) -> BarDatum {
        BarDatum {
            name: name.into(),
            value,
        }
    }

    fn speaker(tag: &str, episodes: &[(&str, &str, f64)]) -> SpeakerStat {
        SpeakerStat {
            tag: tag.into(),
            total_duration: episodes.iter().map(|e| e.2).sum(),
            total_episodes: None,
            episodes: episodes
                .iter()
                .map(|(name, date, duration)| SpeakerEpisode {
                    name: name.to_string(),
                    date: date.to_string(),
                    duration: *duration,
                    total_episode_duration: 3600.0,
                })
                .collect(),
        }
    }

    #[test]
    fn test_colors_extend_palette() {
        let colors = generate_colors(12);
        assert_eq!(colors[0], "#3B82F6");
        assert_eq!(colors[9], "#84CC16");
        assert!(colors[10].starts_with("hsl("));
        assert_ne!(colors[10], colors[11]);
        assert_eq!(generate_colors(3).len(), 3);
    }

    #[test]
    fn test_bar_layout_sorted_and_scaled() {
        let data = vec![datum("Ana", 2.0), datum("Bob", 8.0), datum("Eva", 4.0)];
        let layout = layout_bars(&data, 824.0, &ApproxMeasure);
        assert_eq!(layout.width, 800.0);
        assert_eq!(layout.height, 400.0);
        assert_eq!(layout.pad_left, 80.0);

        let names: Vec<_> = layout.bars.iter().map(|b| b.name.as_str()).collect();
        assert_eq!(names, vec!["Bob", "Eva", "Ana"]);

        let chart_w = 800.0 - 80.0 - 30.0;
        assert!((layout.bars[0].width - chart_w * 0.9).abs() < 1e-9);
        assert!((layout.bars[2].width - chart_w * 0.9 / 4.0).abs() < 1e-9);
        assert!(layout.bars[0].y < layout.bars[1].y);
    }

    #[test]
    fn test_bar_layout_grows_with_data_and_labels() {
        let data: Vec<_> = (0..10)
            .map(|i| datum(&format!("speaker-with-long-name-{}", i), i as f64))
            .collect();
        let layout = layout_bars(&data, 1000.0, &ApproxMeasure);
        assert_eq!(layout.height, 500.0);
        assert!(layout.pad_left > 80.0);
    }

    #[test]
    fn test_empty_bar_chart_says_so() {
        let mut chart = Chart::bars("Episodes", "Episodes", "#F59E0B", vec![]);
        assert!(chart.to_svg().is_none());
        chart.on_layout(600.0, &ApproxMeasure);
        assert!(chart.to_svg().unwrap().contains("No data to display"));
    }

    #[test]
    fn test_timeline_merges_shared_episodes() {
        let stats = vec![
            speaker("Ana", &[("ep2", "2024-02-01", 600.0), ("ep1", "2024-01-01", 300.0)]),
            speaker("Bob", &[("ep1", "2024-01-01", 900.0)]),
        ];
        let layout = layout_timeline(&stats, 824.0, &ApproxMeasure);
        assert_eq!(layout.episodes.len(), 2);
        assert_eq!(layout.episodes[0].name, "ep1");
        assert_eq!(layout.episodes[0].interventions.len(), 2);
        assert_eq!(layout.episodes[0].interventions[1].speaker, "Bob");
        assert_eq!(layout.episodes[0].interventions[1].duration_label, "15m");
        assert_eq!(layout.episodes[0].interventions[0].color, "#3B82F6");
        assert_eq!(layout.episodes[0].interventions[1].color, "#EF4444");

        // one legend line: 20 * 1 + 40
        assert_eq!(layout.pad_top, 100.0);
        assert_eq!(layout.height, 660.0);
        assert!(layout.episodes[0].y < layout.episodes[1].y);
    }

    #[test]
    fn test_timeline_bars_have_minimum_width() {
        let stats = vec![
            speaker("Ana", &[("ep1", "2024-01-01", 3590.0)]),
            speaker("Bob", &[("ep1", "2024-01-01", 10.0)]),
        ];
        let layout = layout_timeline(&stats, 824.0, &ApproxMeasure);
        assert_eq!(layout.episodes[0].interventions[1].width, 30.0);
    }

    #[test]
    fn test_zero_duration_episode_does_not_divide_by_zero() {
        let stats = vec![speaker("Ana", &[("ep1", "2024-01-01", 0.0)])];
        let layout = layout_timeline(&stats, 824.0, &ApproxMeasure);
        let bar = &layout.episodes[0].interventions[0];
        assert_eq!(bar.width, 30.0);
        assert!(bar.x.is_finite());
    }

    #[test]
    fn test_long_names_are_shortened() {
        assert_eq!(speaker_label("Alejandro"), "Alejan..");
        assert_eq!(speaker_label("Ana"), "Ana");

        let name = "a".repeat(200);
        let fitted = fit_name(&name, 300.0, &ApproxMeasure);
        assert!(fitted.ends_with("..."));
        assert!(ApproxMeasure.width(&fitted, 12.0) <= 300.0);
    }

    #[test]
    fn test_svg_escapes_names() {
        let stats = vec![speaker("<Ana>", &[("ep&1", "2024-01-01", 60.0)])];
        let mut chart = Chart::timeline("Timeline", &stats);
        chart.on_layout(800.0, &ApproxMeasure);
        let svg = chart.to_svg().unwrap();
        assert!(svg.contains("&lt;Ana&gt;"));
        assert!(svg.contains("ep&amp;1"));
        assert!(!svg.contains("<Ana>"));
    }
}
