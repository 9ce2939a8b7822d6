use super::*;
use crate::types::ResponseStat;

const SAMPLE_REPORT: &str = r#"{
  "summary": {
    "totals": {"sent": 0, "received": 0, "total": 0}
  },
  "generated_at": "2024-05-01T09:00:00+00:00",
  "filters": {"since": null, "until": null, "threshold_hours": 24, "top": 20, "date_scale": "nanoseconds"},
  "chats": [
    {
      "chat_id": 11,
      "chat_identifier": "+15551234567",
      "display_name": null,
      "label": "+15551234567",
      "handles": ["+15551234567"],
      "totals": {"sent": 10, "received": 12, "total": 22},
      "left_on_read": {"you_left_them": 1, "they_left_you": 2},
      "response_times": {
        "you_reply": {"count": 2, "avg_minutes": 10.0, "median_minutes": 10.0, "p90_minutes": 12.0},
        "they_reply": {"count": 0, "avg_minutes": null, "median_minutes": null, "p90_minutes": null}
      },
      "hourly": [{"hour": 8, "you": 1, "them": 2, "total": 3}],
      "mood_timeline": [{"date": "2024-04-01", "friendly": 1, "romantic": 0, "professional": 0, "neutral": 2}]
    },
    {
      "chat_id": 12,
      "label": "Jane",
      "handles": ["iMessage:+1 555 123 4567"],
      "totals": {"sent": 3, "received": 1, "total": 4},
      "response_times": {
        "you_reply": {"count": 1, "avg_minutes": 20.0, "median_minutes": 20.0, "p90_minutes": 20.0},
        "they_reply": {"count": 3, "avg_minutes": 5.0, "median_minutes": 4.0, "p90_minutes": 9.0}
      }
    },
    {
      "chat_id": 13,
      "label": "Family",
      "is_group": true,
      "participant_count": 4,
      "totals": {"sent": 50, "received": 70, "total": 120}
    }
  ]
}"#;

fn sample_bytes() -> Vec<u8> {
    SAMPLE_REPORT.as_bytes().to_vec()
}

#[test]
fn parses_extractor_report_with_defaults() {
    let report = parse_report(&mut sample_bytes()).expect("parse");
    assert_eq!(report.chats.len(), 3);
    assert_eq!(report.generated_at.as_deref(), Some("2024-05-01T09:00:00+00:00"));
    assert_eq!(report.filters.as_ref().and_then(|f| f.top), Some(20));

    let first = &report.chats[0];
    assert_eq!(first.hourly[0].hour, 8);
    assert_eq!(first.hourly[0].counts.total, 3);
    assert_eq!(first.mood_timeline[0].counts.neutral, 2);
    assert_eq!(first.response_times.they_reply.avg_minutes, None);

    let second = &report.chats[1];
    assert_eq!(second.left_on_read, LeftOnRead::default());
    assert!(second.weekdays.is_empty());
    assert!(report.chats[2].is_group);
}

#[test]
fn rejects_malformed_json() {
    let mut bytes = b"{\"chats\": [ {\"chat_id\": 1} ]}".to_vec();
    assert!(matches!(
        parse_report(&mut bytes),
        Err(ReportError::Malformed(_))
    ));

    let mut bytes = b"not json".to_vec();
    assert!(matches!(
        parse_report(&mut bytes),
        Err(ReportError::Malformed(_))
    ));
}

#[test]
fn rejects_negative_and_duplicate_ids() {
    let chat = |id: i64| {
        format!(r#"{{"chat_id": {id}, "label": "x", "totals": {{"sent": 0, "received": 0, "total": 0}}}}"#)
    };

    let mut negative = format!(r#"{{"chats": [{}]}}"#, chat(-4)).into_bytes();
    assert!(matches!(
        parse_report(&mut negative),
        Err(ReportError::NegativeChatId(-4))
    ));

    let mut duplicate = format!(r#"{{"chats": [{}, {}]}}"#, chat(3), chat(3)).into_bytes();
    assert!(matches!(
        parse_report(&mut duplicate),
        Err(ReportError::DuplicateChatId(3))
    ));
}

#[test]
fn read_report_reports_missing_file() {
    let dir = tempfile::tempdir().expect("tempdir");
    let missing = dir.path().join("missing.json");
    let err = read_report(&missing).unwrap_err();
    assert!(matches!(err, ReportError::Read { .. }));
    assert!(err.to_string().contains("missing.json"));
}

#[test]
fn fold_merges_and_rebuilds_summary() {
    let report = parse_report(&mut sample_bytes()).expect("parse");
    let folded = fold_report(
        report,
        &FoldOptions {
            merge: true,
            top: 20,
        },
    );

    // Group chat first by volume, then the merged Jane record.
    assert_eq!(folded.chats.len(), 2);
    assert_eq!(folded.chats[0].chat_id, 13);
    let jane = &folded.chats[1];
    assert!(jane.is_merged());
    assert_eq!(jane.label, "Jane");
    assert_eq!(jane.totals.total, 26);
    assert_eq!(jane.merged_from, vec![11, 12]);

    assert_eq!(folded.summary.totals.total, 146);
    assert_eq!(folded.summary.left_on_read.they_left_you, 2);
    let you = folded.summary.response_times.you_reply;
    assert_eq!(you.count, 3);
    assert_eq!(you.avg_minutes, Some(13.33));
    assert_eq!(folded.summary.response_times.they_reply.count, 3);
    assert_eq!(folded.generated_at.as_deref(), Some("2024-05-01T09:00:00+00:00"));
}

#[test]
fn fold_without_merge_only_ranks() {
    let report = parse_report(&mut sample_bytes()).expect("parse");
    let folded = fold_report(
        report,
        &FoldOptions {
            merge: false,
            top: 2,
        },
    );
    let ids: Vec<i64> = folded.chats.iter().map(|c| c.chat_id).collect();
    assert_eq!(ids, vec![13, 11]);
    // Summary still covers the chat cut by the top-N limit.
    assert_eq!(folded.summary.totals.total, 146);
}

#[test]
fn rank_keeps_input_order_for_ties_and_zero_means_all() {
    let chat = |id, total| ChatStats {
        chat_id: id,
        totals: Totals {
            sent: total,
            received: 0,
            total,
        },
        ..Default::default()
    };
    let ranked = rank_chats(vec![chat(1, 5), chat(2, 9), chat(3, 5)], 0);
    let ids: Vec<i64> = ranked.iter().map(|c| c.chat_id).collect();
    assert_eq!(ids, vec![2, 1, 3]);
}

#[test]
fn summary_of_empty_report_is_empty() {
    let summary = summarize(&[]);
    assert_eq!(summary.totals, Totals::default());
    assert_eq!(summary.response_times.you_reply, ResponseStat::default());
}

#[test]
fn written_report_reads_back() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("merged.json");
    let report = fold_report(
        parse_report(&mut sample_bytes()).expect("parse"),
        &FoldOptions {
            merge: true,
            top: 0,
        },
    );

    write_report(&report, &path, true).expect("write");
    let reread = read_report(&path).expect("merged output is itself a valid report");
    assert_eq!(reread.chats, report.chats);
    assert_eq!(reread.summary, report.summary);
}
