use crate::api::ApiClient;
use crate::ask::{loading_label, AskOutcome, DisambiguationView, QuerySubmissionController, ResultsView};
use crate::config::ClientConfig;
use crate::error::AppError;
use crate::wake;
use regex::Regex;
use std::future::Future;
use std::path::Path;
use std::sync::OnceLock;
use std::time::{Duration, Instant};

fn controller(config: &ClientConfig, lang: Option<&str>) -> Result<QuerySubmissionController, AppError> {
    let api = ApiClient::new(config)?;
    Ok(QuerySubmissionController::new(
        api,
        wake::from_config(config.wake_lock.as_ref()),
        config.ask_timeout(),
        lang.unwrap_or(&config.language),
    ))
}

/// Ask a question, walking the operator through any similarity prompt
pub async fn ask(
    config: &ClientConfig,
    question: &str,
    lang: Option<&str>,
    html: Option<&Path>,
) -> Result<(), AppError> {
    let mut ctl = controller(config, lang)?;
    ctl.set_input(question);

    // Ctrl-C aborts the request instead of killing the process
    let abort = ctl.abort_handle();
    let interrupt = tokio::spawn(async move {
        while tokio::signal::ctrl_c().await.is_ok() {
            abort.cancel();
        }
    });

    let result = run(&mut ctl, html).await;
    interrupt.abort();
    result
}

async fn run(ctl: &mut QuerySubmissionController, html: Option<&Path>) -> Result<(), AppError> {
    let mut outcome = with_countdown(ctl.submit()).await?;
    loop {
        match outcome {
            AskOutcome::Answered(view) => {
                print_results(&view);
                if let Some(path) = html {
                    std::fs::write(path, view.render_html()?)?;
                    println!("Answer written to {}", path.display());
                }
                return Ok(());
            }
            AskOutcome::Disambiguate(view) => {
                print_disambiguation(&view);
                let choice = super::prompt("Number of the answer to reuse, or n to search anew: ")?;
                if choice.eq_ignore_ascii_case("n") {
                    outcome = with_countdown(ctl.search_anew()).await?;
                    continue;
                }
                let uuid = choice
                    .parse::<usize>()
                    .ok()
                    .and_then(|n| n.checked_sub(1))
                    .and_then(|i| view.rows().nth(i))
                    .map(|row| row.uuid.clone())
                    .ok_or_else(|| AppError::Validation(format!("Not an option: {}", choice)))?;
                outcome = ctl.reuse(&uuid).await?;
            }
            AskOutcome::Blocked => {
                println!("{}", ctl.submit_button().label);
                return Ok(());
            }
        }
    }
}

/// Show a saved answer by uuid
pub async fn saved(config: &ClientConfig, uuid: &str, lang: Option<&str>) -> Result<(), AppError> {
    let mut ctl = controller(config, lang)?;
    if let AskOutcome::Answered(view) = ctl.reuse(uuid).await? {
        if let Some(question) = ctl.last_answer().and_then(|a| a.query.as_deref()) {
            println!("Q: {}\n", question);
        }
        print_results(&view);
    }
    Ok(())
}

/// Await `fut` while a countdown ticks on stderr
async fn with_countdown<F: Future>(fut: F) -> F::Output {
    let started = Instant::now();
    let ticker = tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(1));
        loop {
            interval.tick().await;
            eprint!("\r{:<20}", loading_label(started.elapsed()));
        }
    });
    let output = fut.await;
    ticker.abort();
    eprint!("\r{:<20}\r", "");
    output
}

fn plain_text(html: &str) -> String {
    static TAGS: OnceLock<Regex> = OnceLock::new();
    static BREAKS: OnceLock<Regex> = OnceLock::new();
    let breaks = BREAKS.get_or_init(|| Regex::new(r"(?i)<br\s*/?>|</p>|</li>").expect("valid regex"));
    let tags = TAGS.get_or_init(|| Regex::new(r"<[^>]+>").expect("valid regex"));
    let text = breaks.replace_all(html, "\n");
    let text = tags.replace_all(&text, "");
    html_escape::decode_html_entities(&text)
        .replace('\u{a0}', " ")
        .trim()
        .to_string()
}

fn print_results(view: &ResultsView) {
    println!("{}\n", plain_text(&view.answer_html));
    if view.references.is_empty() {
        println!("No references.");
    } else {
        println!("References:");
        for r in &view.references {
            let target = r.link.as_deref().unwrap_or(&r.file);
            println!("  {:<12} {:>7}  {}  {}", r.tag, r.time, r.label, target);
        }
    }
    if let Some(url) = &view.share_url {
        println!("\nShare: {}", url);
    }
    for tier in &view.similar {
        println!("\n{}", tier.label);
        for row in &tier.rows {
            println!("  {:>4}  {}  {}", row.percent, row.text, row.url);
        }
    }
}

fn print_disambiguation(view: &DisambiguationView) {
    println!("{}\n", view.message);
    let mut n = 0;
    for tier in &view.tiers {
        println!("{}", tier.label);
        for row in &tier.rows {
            n += 1;
            println!("  [{}] {:>4}  {}", n, row.percent, row.text);
        }
    }
    println!();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_text() {
        assert_eq!(
            plain_text("<p>Uno &amp; dos</p><p>tres<br/>cuatro</p>"),
            "Uno & dos\ntres\ncuatro"
        );
        assert_eq!(
            plain_text("<p>Canci&oacute;n&nbsp;de&#32;la &#x27;f&#237;sica&#39;</p>"),
            "Canción de la 'física'"
        );
    }
}
