//! Publishing finished reports to an external workspace (Notion).

use async_trait::async_trait;
use reqwest::Client;
use rights_core::{AppConfig, AppError, AppResult};
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, info, instrument};

/// Source label used when none is given.
pub const DEFAULT_SOURCE: &str = "Human Rights LLM Report";

/// Maximum characters in one Notion rich-text block.
pub const MAX_SEGMENT_CHARS: usize = 2000;

const NOTION_API_URL: &str = "https://api.notion.com";
const NOTION_VERSION: &str = "2022-06-28";

/// Notion accepts at most this many children per append request.
const MAX_BLOCKS_PER_REQUEST: usize = 100;

/// A report ready to publish.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Report {
    pub title: String,
    pub content: String,
    pub date: String,
    pub source: String,
}

impl Report {
    /// Build a report. Date defaults to today, source to [`DEFAULT_SOURCE`].
    pub fn new(
        title: impl Into<String>,
        content: impl Into<String>,
        date: Option<String>,
        source: Option<String>,
    ) -> AppResult<Self> {
        let title = title.into().trim().to_string();
        let content = content.into().trim().to_string();
        if title.is_empty() {
            return Err(AppError::Publish("Report title is required".to_string()));
        }
        if content.is_empty() {
            return Err(AppError::Publish("Report content is required".to_string()));
        }

        let date = date
            .filter(|d| !d.trim().is_empty())
            .unwrap_or_else(|| chrono::Local::now().format("%Y-%m-%d").to_string());
        let source = source
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_SOURCE.to_string());

        Ok(Self {
            title,
            content,
            date,
            source,
        })
    }

    pub fn metadata_line(&self) -> String {
        format!("Date: {} | Source: {}", self.date, self.source)
    }
}

/// Split content into segments of at most `max_chars` characters.
///
/// Cuts between paragraphs where possible, then between lines, and only
/// inside a line when the line itself is too long.
pub fn split_segments(content: &str, max_chars: usize) -> Vec<String> {
    let max_chars = max_chars.max(1);
    let mut segments = Vec::new();
    let mut current = String::new();

    for paragraph in content.split("\n\n").filter(|p| !p.trim().is_empty()) {
        let paragraph = paragraph.trim_matches('\n');
        let pieces = if char_len(paragraph) <= max_chars {
            vec![paragraph.to_string()]
        } else {
            split_lines(paragraph, max_chars)
        };
        for piece in pieces {
            pack(&mut segments, &mut current, piece, "\n\n", max_chars);
        }
    }

    if !current.is_empty() {
        segments.push(current);
    }
    segments
}

fn split_lines(paragraph: &str, max_chars: usize) -> Vec<String> {
    let mut pieces = Vec::new();
    let mut current = String::new();

    for line in paragraph.lines() {
        if char_len(line) <= max_chars {
            pack(&mut pieces, &mut current, line.to_string(), "\n", max_chars);
            continue;
        }
        let chars: Vec<char> = line.chars().collect();
        for window in chars.chunks(max_chars) {
            pack(&mut pieces, &mut current, window.iter().collect(), "\n", max_chars);
        }
    }

    if !current.is_empty() {
        pieces.push(current);
    }
    pieces
}

fn pack(out: &mut Vec<String>, current: &mut String, piece: String, sep: &str, max_chars: usize) {
    if current.is_empty() {
        *current = piece;
    } else if char_len(current) + char_len(sep) + char_len(&piece) <= max_chars {
        current.push_str(sep);
        current.push_str(&piece);
    } else {
        out.push(std::mem::replace(current, piece));
    }
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

/// Destination for finished reports.
#[async_trait]
pub trait ReportPublisher: Send + Sync {
    async fn publish(&self, report: &Report) -> AppResult<()>;
}

/// Appends reports as blocks to a Notion page.
#[derive(Debug, Clone)]
pub struct NotionPublisher {
    client: Client,
    base_url: String,
    api_key: String,
    page_id: String,
}

impl NotionPublisher {
    pub fn new(api_key: impl Into<String>, page_id: impl Into<String>) -> AppResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| AppError::Publish(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: NOTION_API_URL.to_string(),
            api_key: api_key.into(),
            page_id: page_id.into(),
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Build from the `publish` config section and the token environment
    /// variable it names.
    pub fn from_config(config: &AppConfig) -> AppResult<Self> {
        let page_id = config
            .publish
            .page_id
            .clone()
            .filter(|p| !p.trim().is_empty())
            .ok_or_else(|| {
                AppError::Config("publish.pageId is not set in the configuration".to_string())
            })?;
        let api_key = config.resolve_publish_key().ok_or_else(|| {
            AppError::Config(format!(
                "Notion token not found; set {}",
                config.publish.api_key_env
            ))
        })?;

        Self::new(api_key, page_id)
    }

    /// Blocks for a report: heading, metadata line, content segments.
    pub fn blocks(report: &Report) -> Vec<Value> {
        let mut blocks = vec![
            text_block("heading_2", &report.title),
            text_block("paragraph", &report.metadata_line()),
        ];
        blocks.extend(
            split_segments(&report.content, MAX_SEGMENT_CHARS)
                .iter()
                .map(|segment| text_block("paragraph", segment)),
        );
        blocks
    }
}

fn text_block(kind: &str, content: &str) -> Value {
    json!({
        "object": "block",
        "type": kind,
        kind: {
            "rich_text": [{ "type": "text", "text": { "content": content } }]
        }
    })
}

#[async_trait]
impl ReportPublisher for NotionPublisher {
    #[instrument(skip(self, report), fields(title = %report.title))]
    async fn publish(&self, report: &Report) -> AppResult<()> {
        let url = format!("{}/v1/blocks/{}/children", self.base_url, self.page_id);
        let blocks = Self::blocks(report);

        for batch in blocks.chunks(MAX_BLOCKS_PER_REQUEST) {
            let response = self
                .client
                .patch(&url)
                .bearer_auth(&self.api_key)
                .header("Notion-Version", NOTION_VERSION)
                .json(&json!({ "children": batch }))
                .send()
                .await
                .map_err(|e| AppError::Publish(format!("Failed to reach Notion: {}", e)))?;

            let status = response.status();
            if !status.is_success() {
                let body = response
                    .text()
                    .await
                    .unwrap_or_else(|_| "Unknown error".to_string());
                return Err(AppError::Publish(format!(
                    "Notion API error ({}): {}",
                    status, body
                )));
            }
            debug!("Appended {} blocks", batch.len());
        }

        info!("Published report with {} blocks", blocks.len());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_defaults() {
        let report = Report::new("Syria", "body", None, None).unwrap();
        assert_eq!(report.source, DEFAULT_SOURCE);
        assert_eq!(report.date.len(), 10);
        assert_eq!(
            report.metadata_line(),
            format!("Date: {} | Source: {}", report.date, DEFAULT_SOURCE)
        );
    }

    #[test]
    fn test_report_requires_title_and_content() {
        assert!(Report::new("  ", "body", None, None).is_err());
        assert!(Report::new("title", "\n", None, None).is_err());
        let report = Report::new(
            "t",
            "c",
            Some("2025-06-21".to_string()),
            Some("DOS".to_string()),
        )
        .unwrap();
        assert_eq!(report.metadata_line(), "Date: 2025-06-21 | Source: DOS");
    }

    #[test]
    fn test_short_content_is_one_segment() {
        assert_eq!(
            split_segments("para one\n\npara two", 2000),
            vec!["para one\n\npara two".to_string()]
        );
        assert!(split_segments("  \n\n ", 2000).is_empty());
    }

    #[test]
    fn test_segments_break_between_paragraphs() {
        let a = "a".repeat(1200);
        let b = "b".repeat(1200);
        let segments = split_segments(&format!("{}\n\n{}", a, b), 2000);
        assert_eq!(segments, vec![a, b]);
    }

    #[test]
    fn test_long_lines_are_cut() {
        let line = "x".repeat(4500);
        let segments = split_segments(&line, 2000);
        assert_eq!(segments.len(), 3);
        assert!(segments.iter().all(|s| s.chars().count() <= 2000));
        assert_eq!(segments.concat(), line);
    }

    #[test]
    fn test_segments_never_exceed_limit() {
        let content = (0..200)
            .map(|i| format!("Line {} about detention conditions and due process.", i))
            .collect::<Vec<_>>()
            .join("\n");
        let segments = split_segments(&content, 2000);
        assert!(segments.len() > 1);
        assert!(segments.iter().all(|s| s.chars().count() <= 2000));
        assert_eq!(segments.join("\n"), content);
    }

    #[test]
    fn test_blocks_layout() {
        let report = Report::new(
            "Syria report",
            "First.\n\nSecond.",
            Some("2025-06-21".to_string()),
            None,
        )
        .unwrap();
        let blocks = NotionPublisher::blocks(&report);

        assert_eq!(blocks.len(), 3);
        assert_eq!(blocks[0]["type"], "heading_2");
        assert_eq!(
            blocks[0]["heading_2"]["rich_text"][0]["text"]["content"],
            "Syria report"
        );
        assert_eq!(
            blocks[1]["paragraph"]["rich_text"][0]["text"]["content"],
            "Date: 2025-06-21 | Source: Human Rights LLM Report"
        );
        assert_eq!(
            blocks[2]["paragraph"]["rich_text"][0]["text"]["content"],
            "First.\n\nSecond."
        );
    }

    #[test]
    fn test_from_config_requires_page_id() {
        let mut config = AppConfig::default();
        config.publish.page_id = None;
        let err = NotionPublisher::from_config(&config).unwrap_err();
        assert!(err.to_string().contains("pageId"));
    }

    #[tokio::test]
    async fn test_publish_failure_is_publish_error() {
        let publisher = NotionPublisher::new("token", "page")
            .unwrap()
            .with_base_url("http://127.0.0.1:9");
        let report = Report::new("t", "c", None, None).unwrap();
        let err = publisher.publish(&report).await.unwrap_err();
        assert!(matches!(err, AppError::Publish(_)));
    }
}
