use anyhow::{Context, Result};
use async_trait::async_trait;
use std::path::PathBuf;

use crate::report::{read_report, validate_chats};
use crate::types::Report;

/// Something that can hand over a freshly extracted report.
#[async_trait]
pub trait RecordSource: Send + Sync {
    /// Get the display name for this source
    fn display_name(&self) -> &str;

    /// Check if this source currently has data to offer
    fn is_available(&self) -> bool;

    /// Load the complete report
    async fn load_report(&self) -> Result<Report>;
}

/// A report previously written to disk by the extractor.
#[derive(Debug, Clone)]
pub struct JsonReportSource {
    path: PathBuf,
    name: String,
}

impl JsonReportSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let name = path.display().to_string();
        Self { path, name }
    }
}

#[async_trait]
impl RecordSource for JsonReportSource {
    fn display_name(&self) -> &str {
        &self.name
    }

    fn is_available(&self) -> bool {
        self.path.is_file()
    }

    async fn load_report(&self) -> Result<Report> {
        let path = self.path.clone();
        let report = tokio::task::spawn_blocking(move || read_report(&path)).await??;
        Ok(report)
    }
}

/// Registry for managing multiple record sources
#[derive(Default)]
pub struct SourceRegistry {
    sources: Vec<Box<dyn RecordSource>>,
}

impl SourceRegistry {
    pub fn new() -> Self {
        Self {
            sources: Vec::new(),
        }
    }

    pub fn register<S: RecordSource + 'static>(&mut self, source: S) {
        self.sources.push(Box::new(source));
    }

    /// Get available sources (those that currently have data)
    pub fn available_sources(&self) -> Vec<&dyn RecordSource> {
        self.sources
            .iter()
            .filter(|s| s.is_available())
            .map(|s| s.as_ref())
            .collect()
    }

    /// Load every available source into one combined report.
    ///
    /// A failing source is reported and skipped. The combined report keeps
    /// the first source's generation stamp and filters, and chat ids must
    /// stay unique across sources.
    pub async fn load_combined(&self) -> Result<Report> {
        let available = self.available_sources();
        if available.is_empty() {
            anyhow::bail!("No report sources available");
        }

        let mut combined: Option<Report> = None;
        for source in available {
            match source.load_report().await {
                Ok(report) => match combined.as_mut() {
                    Some(existing) => existing.chats.extend(report.chats),
                    None => combined = Some(report),
                },
                Err(e) => {
                    eprintln!("⚠️  Error loading {}: {e:#}", source.display_name());
                }
            }
        }

        let combined =
            combined.ok_or_else(|| anyhow::anyhow!("Every report source failed to load"))?;
        validate_chats(&combined.chats).context("Combined report sources disagree")?;
        Ok(combined)
    }
}
