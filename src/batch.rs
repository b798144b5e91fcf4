use std::fmt;
use std::time::{Duration, Instant};

use chrono::Utc;
use tracing::{debug, error, info};

use crate::config::Config;
use crate::error::Result;
use crate::gemini::FeedbackGenerator;
use crate::markdown::assemble_report;
use crate::notion::collector::DEFAULT_PACING;
use crate::notion::writer::write_feedback;
use crate::notion::{Collector, NotionClient};
use crate::prompt::load_prompt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Done,
    Skipped,
    Failed,
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Status::Done => "done",
            Status::Skipped => "skipped",
            Status::Failed => "failed",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reason {
    InsufficientContent,
    Exception,
}

impl fmt::Display for Reason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Reason::InsufficientContent => "insufficient_content",
            Reason::Exception => "exception",
        })
    }
}

/// Outcome for one page in one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessResult {
    pub page_id: String,
    pub status: Status,
    pub reason: Option<Reason>,
    pub message: Option<String>,
}

impl ProcessResult {
    fn done(page_id: &str) -> Self {
        Self {
            page_id: page_id.to_string(),
            status: Status::Done,
            reason: None,
            message: None,
        }
    }

    fn skipped(page_id: &str) -> Self {
        Self {
            page_id: page_id.to_string(),
            status: Status::Skipped,
            reason: Some(Reason::InsufficientContent),
            message: None,
        }
    }

    fn failed(page_id: &str, message: String) -> Self {
        Self {
            page_id: page_id.to_string(),
            status: Status::Failed,
            reason: Some(Reason::Exception),
            message: Some(message),
        }
    }
}

/// Results of one run.
#[derive(Debug, Default)]
pub struct Summary {
    pub results: Vec<ProcessResult>,
    pub duration: Duration,
}

impl Summary {
    pub fn count(&self, status: Status) -> usize {
        self.results.iter().filter(|r| r.status == status).count()
    }
}

/// One scheduled run: query ready pages, then write feedback into each in turn.
pub struct Batch<'a> {
    config: &'a Config,
    notion: &'a NotionClient,
    generator: &'a dyn FeedbackGenerator,
    request_id: String,
    collector_pacing: Duration,
}

impl<'a> Batch<'a> {
    pub fn new(
        config: &'a Config,
        notion: &'a NotionClient,
        generator: &'a dyn FeedbackGenerator,
        request_id: impl Into<String>,
    ) -> Self {
        Self {
            config,
            notion,
            generator,
            request_id: request_id.into(),
            collector_pacing: DEFAULT_PACING,
        }
    }

    #[cfg(test)]
    pub fn with_collector_pacing(mut self, pacing: Duration) -> Self {
        self.collector_pacing = pacing;
        self
    }

    /// Run the batch. Only the query and prompt load are fatal; per-page
    /// failures are recorded in the summary.
    pub async fn run(&self) -> Result<Summary> {
        let t0 = Instant::now();
        let rid = &self.request_id;
        info!("[START] requestId={} ts={}", rid, Utc::now().to_rfc3339());

        let page_ids = self
            .notion
            .query_ready_pages(self.config.batch.max_items_per_run)
            .await?;
        info!("[INFO] requestId={} targets={}", rid, page_ids.len());

        if page_ids.is_empty() {
            info!(
                "[END] requestId={} durationMs={} done=0 skipped=0 failed=0",
                rid,
                t0.elapsed().as_millis()
            );
            return Ok(Summary {
                results: Vec::new(),
                duration: t0.elapsed(),
            });
        }

        let system_prompt = load_prompt(&self.config.prompt_dir, &self.config.batch.prompt_version).await?;
        let interval = Duration::from_millis(self.config.batch.gemini_interval_ms);
        let total = page_ids.len();
        let mut results = Vec::with_capacity(total);

        for (i, page_id) in page_ids.iter().enumerate() {
            if i > 0 {
                info!(
                    "[WAIT] geminiIntervalMs={} pageId={}",
                    self.config.batch.gemini_interval_ms, page_id
                );
                tokio::time::sleep(interval).await;
            }

            let t_item = Instant::now();
            info!("[ITEM_START] {}/{} pageId={}", i + 1, total, page_id);

            match self.process_one(&system_prompt, page_id).await {
                Ok(r) => {
                    let reason = r.reason.map(|r| format!(" reason={r}")).unwrap_or_default();
                    info!(
                        "[ITEM_END] pageId={} status={}{} durationMs={}",
                        page_id,
                        r.status,
                        reason,
                        t_item.elapsed().as_millis()
                    );
                    results.push(r);
                }
                Err(e) => {
                    let message = e.to_string();
                    error!("[ITEM_FAIL] pageId={} durationMs={}", page_id, t_item.elapsed().as_millis());
                    error!("{}", message);
                    results.push(ProcessResult::failed(page_id, message));
                }
            }
        }

        let summary = Summary {
            results,
            duration: t0.elapsed(),
        };
        info!(
            "[SUMMARY] done={} skipped={} failed={}",
            summary.count(Status::Done),
            summary.count(Status::Skipped),
            summary.count(Status::Failed)
        );
        info!("[END] requestId={} durationMs={}", rid, summary.duration.as_millis());
        Ok(summary)
    }

    /// Collect, generate and write feedback for a single page.
    ///
    /// Nothing on the page is modified unless generation succeeded.
    pub async fn process_one(&self, system_prompt: &str, page_id: &str) -> Result<ProcessResult> {
        let collector = Collector::new(self.notion).with_pacing(self.collector_pacing);
        let collected = collector.collect(page_id).await?;
        let report = assemble_report(&collected.blocks);

        let chars = report.chars().count();
        debug!("Report for {} has {} chars", page_id, chars);
        if report.is_empty() || chars < self.config.batch.min_body_chars {
            return Ok(ProcessResult::skipped(page_id));
        }
        if self.config.batch.debug {
            debug!("[DEBUG] ReportMarkdown (pageId={}):\n{}", page_id, report);
        }

        let container_id = collected.feedback_container(page_id)?;

        let feedback = self.generator.generate(system_prompt, &report).await?;
        if self.config.batch.debug {
            debug!("[DEBUG] Feedback (pageId={}):\n{}", page_id, feedback);
        }

        write_feedback(
            self.notion,
            page_id,
            &feedback,
            container_id,
            &collected.feedback_content_ids,
        )
        .await?;

        Ok(ProcessResult::done(page_id))
    }
}

// ── Tests ──
