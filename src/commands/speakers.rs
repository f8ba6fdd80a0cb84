use crate::api::ApiClient;
use crate::config::ClientConfig;
use crate::error::AppError;
use crate::speakers::{
    ApproxMeasure, ChartLayout, Details, RangeOutcome, SpeakerAnalyticsController,
};
use chrono::NaiveDate;
use std::path::Path;

/// List the speakers of a period, and analyse `tags` when any are given
pub async fn speakers(
    config: &ClientConfig,
    from: Option<NaiveDate>,
    to: Option<NaiveDate>,
    tags: &[String],
    svg_dir: Option<&Path>,
) -> Result<(), AppError> {
    let mut ctl = SpeakerAnalyticsController::new(ApiClient::new(config)?);

    match ctl.set_range(from, to).await? {
        RangeOutcome::Cleared => {
            println!("Pick both dates first (--from and --to).");
            return Ok(());
        }
        RangeOutcome::Loaded(summary) => {
            println!(
                "{} episodes, {} speakers, {} hours",
                summary.total_episodes, summary.speakers, summary.hours
            );
        }
        RangeOutcome::Unchanged => {}
    }

    if tags.is_empty() {
        for option in ctl.options() {
            println!("  {}", option.label);
        }
        return Ok(());
    }

    ctl.select(tags);
    let mut report = ctl.analyze().await?;
    report.on_layout(config.chart_width, &ApproxMeasure);

    for chart in &report.charts {
        println!("\n{}", chart.title);
        match chart.layout() {
            Some(ChartLayout::Bars(layout)) if layout.bars.is_empty() => {
                println!("  No data to display");
            }
            Some(ChartLayout::Bars(layout)) => {
                for bar in &layout.bars {
                    println!("  {:<20} {}", bar.name, bar.value);
                }
            }
            Some(ChartLayout::Timeline(layout)) => {
                for ep in &layout.episodes {
                    let parts: Vec<String> = ep
                        .interventions
                        .iter()
                        .map(|i| format!("{} {}", i.speaker, i.duration_label))
                        .collect();
                    println!("  {}  {:<30} {}", ep.date, ep.display_name, parts.join(", "));
                }
            }
            None => {}
        }
    }

    match &report.details {
        Details::Tables(tables) => {
            for table in tables {
                println!("\nParticipation detail - {}", table.tag);
                for row in &table.rows {
                    println!(
                        "  {}  {:<30} {:>8} min {:>7}%",
                        row.date, row.name, row.minutes, row.percent
                    );
                }
                println!(
                    "  TOTAL {} episodes {:>8} min {:>7}%",
                    table.episode_count, table.total_minutes, table.total_percent
                );
            }
        }
        Details::TooMany(n) => {
            println!("\n{} speakers selected (too many to show details).", n);
        }
    }

    if let Some(dir) = svg_dir {
        std::fs::create_dir_all(dir)?;
        for (i, chart) in report.charts.iter().enumerate() {
            if let Some(svg) = chart.to_svg() {
                std::fs::write(dir.join(format!("chart-{}.svg", i + 1)), svg)?;
            }
        }
        std::fs::write(dir.join("report.html"), report.render_html()?)?;
        println!("\nCharts written to {}", dir.display());
    }
    Ok(())
}
