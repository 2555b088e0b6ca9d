//! Book and question-bank recommendations.
//!
//! Searches the configured bookstore domains first and lets the model pick from
//! the hits. A failed search is not fatal: the model then recommends from its own
//! knowledge. When the model output cannot be parsed, the raw search hits are
//! returned instead.

use super::fallback::FallbackChain;
use super::{finish, search_phrase, Agent, AgentContext, AgentInput, AgentResult, BOOK_AGENT};
use crate::error::Result;
use crate::search::{WebResult, WebSearch};
use async_trait::async_trait;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, OnceLock};
use tracing::{debug, instrument, warn};

/// A recommended book.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BookRecommendation {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub publisher: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Price in TL, when one could be found.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
}

/// Output of the book agent.
#[derive(Debug, Default, Serialize)]
pub struct BookRecommendations {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub weak_topics: Vec<String>,
    pub recommendations: Vec<BookRecommendation>,
    pub total_found: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ModelBooks {
    #[serde(default)]
    recommendations: Vec<ModelBook>,
}

#[derive(Debug, Deserialize)]
struct ModelBook {
    #[serde(default)]
    title: String,
    #[serde(default)]
    author: Option<String>,
    #[serde(default)]
    publisher: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    price: Option<serde_json::Value>,
}

fn price_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?i)(₺\s*)?(\d{1,3}(?:[.\x{00A0}\x{202F}]\d{3})+(?:,\d{1,2})?|\d+(?:[.,]\d{1,2})?)\s*(TL|TRY|₺)?",
        )
        .expect("valid price regex")
    })
}

/// Parse a Turkish-formatted amount: `.` groups thousands and `,` marks decimals.
fn parse_amount(raw: &str) -> Option<f64> {
    let compact: String = raw.chars().filter(|c| !c.is_whitespace()).collect();
    let normalized = if compact.contains(',') {
        compact.replace('.', "").replace(',', ".")
    } else if let Some((_, tail)) = compact.rsplit_once('.') {
        if tail.len() == 3 {
            compact.replace('.', "")
        } else {
            compact
        }
    } else {
        compact
    };
    normalized.parse().ok()
}

/// Find the first TL price in `text` that falls within `[min, max]`.
///
/// Only amounts marked with `₺`, `TL` or `TRY` are considered.
pub fn extract_price(text: &str, min: f64, max: f64) -> Option<f64> {
    price_regex()
        .captures_iter(text)
        .filter(|caps| caps.get(1).is_some() || caps.get(3).is_some())
        .filter_map(|caps| parse_amount(caps.get(2)?.as_str()))
        .find(|price| (min..=max).contains(price))
}

fn model_price(value: &serde_json::Value, min: f64, max: f64) -> Option<f64> {
    let price = match value {
        serde_json::Value::Number(n) => n.as_f64(),
        serde_json::Value::String(s) => {
            extract_price(s, min, max).or_else(|| parse_amount(s.trim()))
        }
        _ => None,
    }?;
    (min..=max).contains(&price).then_some(price)
}

fn snippet(text: &str, max_chars: usize) -> String {
    let text = text.trim();
    if text.chars().count() <= max_chars {
        text.to_string()
    } else {
        format!("{}...", text.chars().take(max_chars).collect::<String>())
    }
}

fn format_hits(hits: &[WebResult]) -> String {
    if hits.is_empty() {
        return "(no search results; recommend from your own knowledge)".to_string();
    }
    hits.iter()
        .enumerate()
        .map(|(i, hit)| {
            format!(
                "{}. {}\n   {}\n   {}",
                i + 1,
                hit.title,
                hit.url,
                snippet(&hit.content, 300)
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Recommends books and question banks for weak topics.
pub struct BookAgent {
    ctx: AgentContext,
    search: Option<Arc<dyn WebSearch>>,
}

impl BookAgent {
    pub fn new(ctx: AgentContext, search: Option<Arc<dyn WebSearch>>) -> Self {
        Self { ctx, search }
    }

    async fn search_books(&self, query: &str) -> (Vec<WebResult>, Option<String>) {
        let Some(search) = &self.search else {
            return (
                Vec::new(),
                Some("Web search is not configured; recommendations come from the model".into()),
            );
        };
        match search.search(query, &self.ctx.settings.search.book_domains).await {
            Ok(hits) => (hits, None),
            Err(e) => {
                warn!("Book search failed, continuing without results: {}", e);
                (Vec::new(), Some(format!("Book search unavailable: {}", e)))
            }
        }
    }

    /// Search hits shaped like model output, for the static tier.
    fn hits_as_books(&self, hits: &[WebResult]) -> Option<ModelBooks> {
        if hits.is_empty() {
            return None;
        }
        let books = &self.ctx.settings.books;
        let recommendations = hits
            .iter()
            .map(|hit| ModelBook {
                title: hit.title.clone(),
                author: None,
                publisher: None,
                description: Some(snippet(&hit.content, 200)).filter(|s| !s.is_empty()),
                url: Some(hit.url.clone()),
                price: extract_price(&hit.content, books.min_price, books.max_price)
                    .map(serde_json::Value::from),
            })
            .collect();
        Some(ModelBooks { recommendations })
    }

    #[instrument(skip(self, input), fields(subject = ?input.subject))]
    async fn recommend(&self, input: &AgentInput) -> Result<BookRecommendations> {
        let weak_topics = input.clean_weak_topics();
        let max_topics = self.ctx.settings.orchestrator.max_query_topics;
        let phrase = match input.query() {
            Some(q) => Some(q.to_string()),
            None => search_phrase(&weak_topics, input.subject(), max_topics),
        };
        let Some(phrase) = phrase else {
            debug!("No topics or subject, nothing to recommend");
            return Ok(BookRecommendations::default());
        };

        let books = &self.ctx.settings.books;
        let query = format!("{} {}", phrase, books.query_suffix).trim().to_string();
        let limit = input.max_results.unwrap_or(books.max_recommendations).max(1);
        let (hits, note) = self.search_books(&query).await;

        let topics_text = if weak_topics.is_empty() {
            input.subject().unwrap_or_default().to_string()
        } else {
            weak_topics.join(", ")
        };
        let extra = [
            ("topics", topics_text),
            ("max_results", limit.to_string()),
            ("search_results", format_hits(&hits)),
        ];
        let prompts = &self.ctx.prompts.books;
        let outcome = FallbackChain::new(
            self.ctx.llm.as_ref(),
            self.ctx.json_request(&prompts.system, &prompts.user, input, &extra),
        )
        .with_simplified(self.ctx.json_request(&prompts.system, &prompts.simplified, input, &extra))
        .run(|| self.hits_as_books(&hits))
        .await?;
        let note = outcome.note().or(note);

        let mut recommendations: Vec<BookRecommendation> = outcome
            .value
            .recommendations
            .into_iter()
            .filter(|b| !b.title.trim().is_empty())
            .map(|b| {
                let url = b.url.filter(|u| url::Url::parse(u).is_ok());
                let price = b
                    .price
                    .as_ref()
                    .and_then(|p| model_price(p, books.min_price, books.max_price))
                    .or_else(|| {
                        let hit = hits.iter().find(|h| Some(&h.url) == url.as_ref())?;
                        extract_price(&hit.content, books.min_price, books.max_price)
                    });
                BookRecommendation {
                    title: b.title.trim().to_string(),
                    author: b.author.filter(|a| !a.trim().is_empty()),
                    publisher: b.publisher.filter(|p| !p.trim().is_empty()),
                    description: b.description,
                    url,
                    price,
                }
            })
            .collect();
        recommendations.truncate(limit);

        Ok(BookRecommendations {
            query: Some(query),
            weak_topics,
            total_found: recommendations.len(),
            recommendations,
            note,
        })
    }
}

#[async_trait]
impl Agent for BookAgent {
    fn name(&self) -> &'static str {
        BOOK_AGENT
    }

    fn description(&self) -> &'static str {
        "Recommends books and question banks for weak topics from Turkish bookstores"
    }

    async fn process(&self, input: &AgentInput) -> AgentResult {
        finish(BOOK_AGENT, self.recommend(input).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::AgentStatus;
    use crate::testing::{context, web_hit, FailingLlm, FakeWebSearch, SequenceLlm};
    use std::sync::atomic::Ordering;

    #[test]
    fn test_extract_price_turkish_format() {
        assert_eq!(extract_price("Fiyat: 149,90 TL", 5.0, 5000.0), Some(149.9));
        assert_eq!(extract_price("₺1.250,50 indirimli", 5.0, 5000.0), Some(1250.5));
        assert_eq!(extract_price("sadece ₺1.250", 5.0, 5000.0), Some(1250.0));
        assert_eq!(extract_price("99 TRY", 5.0, 5000.0), Some(99.0));
    }

    #[test]
    fn test_extract_price_requires_currency_and_range() {
        assert_eq!(extract_price("2024 baskı, 320 sayfa", 5.0, 5000.0), None);
        assert_eq!(extract_price("Kargo 2 TL, kitap 85 TL", 5.0, 5000.0), Some(85.0));
        assert_eq!(extract_price("12.000 TL", 5.0, 5000.0), None);
    }

    #[test]
    fn test_extract_price_ignores_preceding_count() {
        assert_eq!(extract_price("Sayfa Sayısı: 320 149,90 TL", 5.0, 5000.0), Some(149.9));
        assert_eq!(extract_price("480 sayfa 1.250 TL", 5.0, 5000.0), Some(1250.0));
        assert_eq!(extract_price("Fiyat: 1\u{00A0}250,00 TL", 5.0, 5000.0), Some(1250.0));
    }

    #[test]
    fn test_model_price_accepts_number_or_text() {
        assert_eq!(model_price(&serde_json::json!(120.5), 5.0, 5000.0), Some(120.5));
        assert_eq!(model_price(&serde_json::json!("189,00 TL"), 5.0, 5000.0), Some(189.0));
        assert_eq!(model_price(&serde_json::json!("bilinmiyor"), 5.0, 5000.0), None);
    }

    #[tokio::test]
    async fn test_no_topics_and_no_subject_short_circuits() {
        let search = Arc::new(FakeWebSearch::with_results(vec![]));
        let llm = SequenceLlm::new(vec![]);
        let agent = BookAgent::new(context(llm), Some(search.clone()));

        let result = agent.process(&AgentInput::default()).await;
        assert_eq!(result.status, AgentStatus::Success);
        assert_eq!(
            result.data.unwrap(),
            serde_json::json!({"recommendations": [], "total_found": 0})
        );
        assert_eq!(search.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_recommendations_pick_up_search_prices() {
        let search = Arc::new(FakeWebSearch::with_results(vec![web_hit(
            "Kesirler Soru Bankası",
            "https://www.kitapyurdu.com/kesirler",
            "Yayınevi: X. Fiyat 145,00 TL",
        )]));
        let llm = SequenceLlm::new(vec![
            r#"{"recommendations": [{
                "title": "Kesirler Soru Bankası",
                "author": "A. Yazar",
                "url": "https://www.kitapyurdu.com/kesirler"
            }]}"#,
        ]);
        let agent = BookAgent::new(context(llm), Some(search));

        let input = AgentInput {
            subject: Some("Matematik".into()),
            weak_topics: vec!["Kesirler".into()],
            ..Default::default()
        };
        let data = agent.process(&input).await.data.unwrap();
        assert_eq!(data["total_found"], 1);
        assert_eq!(data["recommendations"][0]["price"], 145.0);
        assert!(data["query"].as_str().unwrap().starts_with("Matematik Kesirler"));
    }

    #[tokio::test]
    async fn test_search_failure_is_not_fatal() {
        let search = Arc::new(FakeWebSearch::failing());
        let llm =
            SequenceLlm::new(vec![r#"{"recommendations": [{"title": "Fizik Konu Anlatımı"}]}"#]);
        let agent = BookAgent::new(context(llm), Some(search));

        let input = AgentInput {
            subject: Some("Fizik".into()),
            ..Default::default()
        };
        let result = agent.process(&input).await;
        assert_eq!(result.status, AgentStatus::Success);
        let data = result.data.unwrap();
        assert_eq!(data["total_found"], 1);
        assert!(data["note"].as_str().unwrap().contains("unavailable"));
    }

    #[tokio::test]
    async fn test_unparseable_output_lists_search_hits() {
        let search = Arc::new(FakeWebSearch::with_results(vec![web_hit(
            "Oran Orantı Fasikülü",
            "https://www.dr.com.tr/oran",
            "₺75",
        )]));
        let llm = SequenceLlm::new(vec!["sorry", "still sorry"]);
        let agent = BookAgent::new(context(llm), Some(search));

        let input = AgentInput {
            weak_topics: vec!["Oran".into()],
            ..Default::default()
        };
        let data = agent.process(&input).await.data.unwrap();
        assert_eq!(data["recommendations"][0]["title"], "Oran Orantı Fasikülü");
        assert_eq!(data["recommendations"][0]["price"], 75.0);
        assert!(data["note"].is_string());
    }

    #[tokio::test]
    async fn test_provider_failure_is_error() {
        let agent = BookAgent::new(context(FailingLlm), None);
        let input = AgentInput {
            subject: Some("Kimya".into()),
            ..Default::default()
        };
        assert_eq!(agent.process(&input).await.status, AgentStatus::Error);
    }
}
