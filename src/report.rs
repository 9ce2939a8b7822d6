//! Reading and writing statistics reports.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use thiserror::Error;

use crate::merge::{combine_response_stats, merge_chats};
use crate::types::{ChatStats, LeftOnRead, Report, ReportFilters, ResponseTimes, Summary, Totals};

/// Why a report could not be accepted.
#[derive(Debug, Error)]
pub enum ReportError {
    #[error("failed to read report {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed report: {0}")]
    Malformed(#[from] simd_json::Error),
    #[error("chat {0} has a negative id but is not a merged record")]
    NegativeChatId(i64),
    #[error("chat id {0} appears more than once")]
    DuplicateChatId(i64),
}

/// Parse a report from raw bytes and validate record ids.
pub fn parse_report(bytes: &mut [u8]) -> Result<Report, ReportError> {
    let report: Report = simd_json::serde::from_slice(bytes)?;
    validate_chats(&report.chats)?;
    Ok(report)
}

pub fn read_report(path: &Path) -> Result<Report, ReportError> {
    let mut bytes = fs::read(path).map_err(|source| ReportError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    parse_report(&mut bytes)
}

/// Extractor ids are non-negative and unique; only records produced by a
/// previous merge pass may carry a negative id.
pub fn validate_chats(chats: &[ChatStats]) -> Result<(), ReportError> {
    let mut seen = HashSet::with_capacity(chats.len());
    for chat in chats {
        if chat.chat_id < 0 && chat.merged_from.is_empty() {
            return Err(ReportError::NegativeChatId(chat.chat_id));
        }
        if !seen.insert(chat.chat_id) {
            return Err(ReportError::DuplicateChatId(chat.chat_id));
        }
    }
    Ok(())
}

/// Aggregate totals, left-on-read counts and reply times across records.
pub fn summarize(chats: &[ChatStats]) -> Summary {
    let mut totals = Totals::default();
    let mut left_on_read = LeftOnRead::default();
    for chat in chats {
        totals += chat.totals;
        left_on_read += chat.left_on_read;
    }

    Summary {
        totals,
        left_on_read,
        response_times: ResponseTimes {
            you_reply: combine_response_stats(chats.iter().map(|c| &c.response_times.you_reply)),
            they_reply: combine_response_stats(
                chats.iter().map(|c| &c.response_times.they_reply),
            ),
        },
    }
}

/// Sort by message total (busiest first) and keep the top `top` records.
/// `top == 0` keeps everything.
pub fn rank_chats(mut chats: Vec<ChatStats>, top: usize) -> Vec<ChatStats> {
    chats.sort_by(|a, b| b.totals.total.cmp(&a.totals.total));
    if top > 0 {
        chats.truncate(top);
    }
    chats
}

/// Options for turning an input report into an output report.
#[derive(Debug, Clone)]
pub struct FoldOptions {
    pub merge: bool,
    pub top: usize,
}

/// Merge the report's chats, rebuild its summary and apply the top-N cut.
///
/// The summary is computed before truncation so it covers every chat.
pub fn fold_report(report: Report, options: &FoldOptions) -> Report {
    let chats = if options.merge {
        merge_chats(&report.chats)
    } else {
        report.chats
    };
    finish_report(chats, report.generated_at, report.filters, options.top)
}

/// Assemble an output report from already-merged chats.
pub fn finish_report(
    chats: Vec<ChatStats>,
    generated_at: Option<String>,
    filters: Option<ReportFilters>,
    top: usize,
) -> Report {
    let summary = summarize(&chats);
    Report {
        summary,
        chats: rank_chats(chats, top),
        generated_at,
        filters,
    }
}

pub fn to_json(report: &Report, pretty: bool) -> Result<String> {
    let json = if pretty {
        simd_json::to_string_pretty(report)
    } else {
        simd_json::to_string(report)
    };
    json.context("Failed to serialize report")
}

pub fn write_report(report: &Report, path: &Path, pretty: bool) -> Result<()> {
    let json = to_json(report, pretty)?;
    fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))
}

#[cfg(test)]
mod tests;
