//! Turns a significant [`ChangeEvent`] into notification text.
//!
//! The AI is asked for a JSON analysis; anything that goes wrong on that
//! path (disabled, rate limited, network, unparseable output) ends in the
//! deterministic template, so composition itself cannot fail.

use std::sync::Arc;

use tracing::{debug, warn};
use uuid::Uuid;

use crate::models::{
    AnalysisSource, ChangeEvent, ComposedAnalysis, CreateNotification, Direction, IconHint,
    NotificationCategory, StructuredAnalysis,
};
use crate::services::ai_response_parser::parse_ai_response;
use crate::services::analysis_cache::AnalysisCache;
use crate::services::llm_service::LlmService;

const SYSTEM_PROMPT: &str = "Kamu adalah asisten analisis pasar untuk pelaku UMKM di Indonesia. \
Jawab hanya dengan satu objek JSON dengan kunci \"title\", \"message\" dan \"recommendation\". \
Gunakan bahasa Indonesia yang singkat dan mudah dipahami.";

const MAX_TITLE_CHARS: usize = 120;

pub struct NotificationComposer {
    llm: Arc<LlmService>,
    cache: Arc<dyn AnalysisCache>,
}

impl NotificationComposer {
    pub fn new(llm: Arc<LlmService>, cache: Arc<dyn AnalysisCache>) -> Self {
        Self { llm, cache }
    }

    pub fn cache(&self) -> &Arc<dyn AnalysisCache> {
        &self.cache
    }

    /// Analysis for `event`: cache, then AI, then template.
    pub async fn compose_analysis(&self, event: &ChangeEvent) -> ComposedAnalysis {
        let key = event.cache_key();
        if let Some(analysis) = self.cache.get(&key) {
            return ComposedAnalysis {
                analysis,
                source: AnalysisSource::Cache,
            };
        }

        if !self.llm.is_enabled() {
            debug!("LLM disabled, using template for '{}'", event.keyword);
            return template(event);
        }

        let prompt = build_prompt(event);
        let raw = match self.llm.generate_completion(SYSTEM_PROMPT, &prompt).await {
            Ok(raw) => raw,
            Err(e) => {
                warn!("AI analysis for '{}' failed: {}. Using template.", event.keyword, e);
                return template(event);
            }
        };

        match parse_ai_response(&raw) {
            Ok(analysis) => {
                self.cache.insert(key, analysis.clone());
                ComposedAnalysis {
                    analysis,
                    source: AnalysisSource::Ai,
                }
            }
            Err(e) => {
                warn!("Unusable AI response for '{}': {}. Using template.", event.keyword, e);
                template(event)
            }
        }
    }

    /// Notification for `user_id` describing `event`.
    pub async fn compose(&self, event: &ChangeEvent, user_id: Uuid) -> CreateNotification {
        let ComposedAnalysis { analysis, .. } = self.compose_analysis(event).await;

        let title = analysis
            .title
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(|t| truncate_chars(t, MAX_TITLE_CHARS))
            .unwrap_or_else(|| default_title(event));

        let body = match analysis.recommendation.as_deref().map(str::trim) {
            Some(rec) if !rec.is_empty() => format!("{}\n\nSaran: {}", analysis.message, rec),
            _ => analysis.message,
        };

        CreateNotification {
            user_id,
            title,
            body,
            direction: event.direction,
            category: NotificationCategory::PriceChange,
            icon_hint: IconHint::for_direction(event.direction),
            target_link: Some(target_link(&event.keyword)),
        }
    }
}

fn template(event: &ChangeEvent) -> ComposedAnalysis {
    ComposedAnalysis {
        analysis: fallback_template(event),
        source: AnalysisSource::Template,
    }
}

pub fn build_prompt(event: &ChangeEvent) -> String {
    format!(
        "Minat pencarian Google untuk \"{keyword}\" {direction} sebesar {pct:.1}% \
(dari {prev:.0} menjadi {cur:.0}) per {date}.\n\
Jelaskan singkat apa arti perubahan ini bagi pelaku UMKM dan berikan satu saran tindakan.\n\
Format: {{\"title\": \"...\", \"message\": \"...\", \"recommendation\": \"...\"}}",
        keyword = event.keyword,
        direction = event.direction,
        pct = event.percent_change.abs(),
        prev = event.previous_value,
        cur = event.current_value,
        date = event.observed_at.format("%Y-%m-%d"),
    )
}

/// Deterministic Indonesian text for `event`. Never empty.
pub fn fallback_template(event: &ChangeEvent) -> StructuredAnalysis {
    let pct = event.percent_change.abs();
    let keyword = &event.keyword;

    let (message, recommendation) = match event.direction {
        Direction::Up => (
            format!(
                "Minat terhadap {} naik {:.1}% dibanding periode sebelumnya. \
Permintaan berpotensi meningkat dan harga bisa ikut naik.",
                keyword, pct
            ),
            "Pertimbangkan menambah stok lebih awal dan pantau harga dari pemasok.",
        ),
        Direction::Down => (
            format!(
                "Minat terhadap {} turun {:.1}% dibanding periode sebelumnya. \
Permintaan berpotensi melemah.",
                keyword, pct
            ),
            "Hindari menimbun stok dan pertimbangkan promosi untuk menjaga penjualan.",
        ),
        Direction::Stable => (
            format!("Minat terhadap {} relatif stabil.", keyword),
            "Lanjutkan strategi stok seperti biasa.",
        ),
    };

    StructuredAnalysis {
        title: Some(default_title(event)),
        message,
        recommendation: Some(recommendation.to_string()),
    }
}

fn default_title(event: &ChangeEvent) -> String {
    let title = match event.direction {
        Direction::Up => format!("Tren {} naik {:.1}%", event.keyword, event.percent_change.abs()),
        Direction::Down => format!("Tren {} turun {:.1}%", event.keyword, event.percent_change.abs()),
        Direction::Stable => format!("Tren {} stabil", event.keyword),
    };
    truncate_chars(&title, MAX_TITLE_CHARS)
}

fn target_link(keyword: &str) -> String {
    let encoded: String = url::form_urlencoded::byte_serialize(keyword.as_bytes()).collect();
    format!("/trends/{}", encoded)
}

fn truncate_chars(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}
