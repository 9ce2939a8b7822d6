//! Field-by-field combination of a group of records into one merged record.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};

use crate::types::{
    Attachments, BinCounts, ChatStats, FrequencyEntry, FrequencyTables, Greetings, HourBin,
    Initiators, LeftOnRead, MoodCounts, MoodDay, ParticipantCount, ParticipantReplySpeed, Peak,
    PhraseMood, REACTION_TABLE_LIMIT, RecentBalance, Reengagement, ReengagementSide,
    ResponseStat, ResponseTimes, Streaks, Totals, WeekdayBin, EMOJI_TABLE_LIMIT,
    PHRASE_TABLE_LIMIT, WORD_TABLE_LIMIT,
};
use crate::utils::{parse_report_date, round2};

use super::id::merged_chat_id;
use super::label::resolve_label;

const HOURS_PER_DAY: u8 = 24;
const DAYS_PER_WEEK: u8 = 7;

/// Participant count of every merged record: you and the correspondent.
const MERGED_PARTICIPANT_COUNT: u32 = 2;

/// Merge one bucket of records sharing `merge_key`. Returns `None` for an
/// empty group.
pub fn merge_group(merge_key: &str, group: &[&ChatStats]) -> Option<ChatStats> {
    let first = *group.first()?;
    let most_recent = most_recently_active(group).unwrap_or(first);
    let earliest = earliest_started(group).unwrap_or(first);

    let mut totals = Totals::default();
    let mut left_on_read = LeftOnRead::default();
    let mut initiators = Initiators::default();
    let mut attachments = Attachments::default();
    let mut greetings = Greetings::default();
    let mut mood = MoodCounts::default();
    for chat in group {
        totals += chat.totals;
        left_on_read += chat.left_on_read;
        initiators += chat.initiators;
        attachments += chat.attachments;
        greetings += chat.greetings;
        mood += chat.mood;
    }

    Some(ChatStats {
        chat_id: merged_chat_id(merge_key),
        chat_identifier: merge_key.to_string(),
        display_name: group
            .iter()
            .filter_map(|chat| chat.display_name.as_deref())
            .find(|name| !name.trim().is_empty())
            .map(str::to_string),
        label: resolve_label(group, most_recent),
        handles: merge_handles(group),
        contact_key: group
            .iter()
            .filter_map(|chat| chat.contact_key.as_deref())
            .find(|key| !key.is_empty())
            .map(str::to_string),
        is_group: false,
        participant_count: MERGED_PARTICIPANT_COUNT,

        totals,
        left_on_read,
        response_times: ResponseTimes {
            you_reply: combine_response_stats(group.iter().map(|c| &c.response_times.you_reply)),
            they_reply: combine_response_stats(
                group.iter().map(|c| &c.response_times.they_reply),
            ),
        },
        streaks: Streaks {
            current_streak_days: most_recent.streaks.current_streak_days,
            longest_streak_days: max_of(group, |c| c.streaks.longest_streak_days),
            longest_silence_days: max_of(group, |c| c.streaks.longest_silence_days),
        },
        initiators,
        peak: merge_peak(group),
        reengagement: Reengagement {
            you: merge_reengagement_side(group.iter().map(|c| &c.reengagement.you)),
            them: merge_reengagement_side(group.iter().map(|c| &c.reengagement.them)),
        },
        hourly: merge_hourly(group),
        weekdays: merge_weekdays(group),
        recent_balance: merge_recent_balance(group),
        attachments,

        words: merge_frequency_tables(group, |c| &c.words, WORD_TABLE_LIMIT),
        emojis: merge_frequency_tables(group, |c| &c.emojis, EMOJI_TABLE_LIMIT),
        phrases: merge_frequency_tables(group, |c| &c.phrases, PHRASE_TABLE_LIMIT),
        reactions: merge_frequency(
            group.iter().map(|c| c.reactions.as_slice()),
            REACTION_TABLE_LIMIT,
        ),
        phrase_moods: merge_phrase_moods(group),

        mood,
        mood_timeline: merge_mood_timeline(group),
        greetings,

        participants: merge_participants(group),
        participant_reply_speeds: merge_reply_speeds(group),

        first_conversation: earliest.first_conversation.clone(),
        last_message_date: latest_message_date(group)
            .or_else(|| most_recent.last_message_date.clone()),
        energy_score: merge_energy_score(group, &totals).unwrap_or(first.energy_score),

        merged_from: group.iter().map(|chat| chat.chat_id).collect(),
    })
}

/// Count-weighted mean over `(value, weight)` samples.
///
/// Samples with zero weight or an undefined value are skipped entirely rather
/// than counted as zero. Returns `None` when nothing contributes.
pub fn weighted_mean<I, T, F>(items: I, sample: F) -> Option<f64>
where
    I: IntoIterator<Item = T>,
    F: Fn(T) -> (Option<f64>, u64),
{
    let (sum, weight) = items
        .into_iter()
        .filter_map(|item| match sample(item) {
            (Some(value), weight) if weight > 0 && value.is_finite() => Some((value, weight)),
            _ => None,
        })
        .fold((0.0_f64, 0_u64), |(sum, total), (value, weight)| {
            (sum + value * weight as f64, total.saturating_add(weight))
        });

    (weight > 0).then(|| sum / weight as f64)
}

/// Combine response-time statistics: counts add up, minute figures are
/// count-weighted means of the contributing statistics.
pub fn combine_response_stats<'a, I>(stats: I) -> ResponseStat
where
    I: IntoIterator<Item = &'a ResponseStat>,
{
    let stats: Vec<&ResponseStat> = stats.into_iter().collect();
    let mean_of = |field: fn(&ResponseStat) -> Option<f64>| {
        weighted_mean(stats.iter(), |s| (field(s), s.count)).map(round2)
    };

    ResponseStat {
        count: stats.iter().map(|s| s.count).sum(),
        avg_minutes: mean_of(|s| s.avg_minutes),
        median_minutes: mean_of(|s| s.median_minutes),
        p90_minutes: mean_of(|s| s.p90_minutes),
    }
}

fn merge_reengagement_side<'a>(sides: impl Iterator<Item = &'a ReengagementSide>) -> ReengagementSide {
    let sides: Vec<&ReengagementSide> = sides.collect();
    ReengagementSide {
        avg_gap_hours: weighted_mean(sides.iter(), |s| (s.avg_gap_hours, s.count)).map(round2),
        count: sides.iter().map(|s| s.count).sum(),
    }
}

fn max_of(group: &[&ChatStats], field: impl Fn(&ChatStats) -> u32) -> u32 {
    group.iter().map(|chat| field(chat)).max().unwrap_or_default()
}

/// Pick the record whose date is extreme under `prefer`; the first record wins
/// ties. Records without a parseable date never win.
fn pick_by_date<'a>(
    group: &[&'a ChatStats],
    date: impl Fn(&ChatStats) -> Option<&str>,
    prefer: impl Fn(&DateTime<Utc>, &DateTime<Utc>) -> bool,
) -> Option<(&'a ChatStats, DateTime<Utc>)> {
    let mut best: Option<(&'a ChatStats, DateTime<Utc>)> = None;
    for chat in group {
        let Some(parsed) = date(chat).and_then(parse_report_date) else {
            continue;
        };
        match &best {
            Some((_, current)) if !prefer(&parsed, current) => {}
            _ => best = Some((*chat, parsed)),
        }
    }
    best
}

/// The constituent with the latest last-message date.
pub fn most_recently_active<'a>(group: &[&'a ChatStats]) -> Option<&'a ChatStats> {
    pick_by_date(group, |c| c.last_message_date.as_deref(), |a, b| a > b).map(|(chat, _)| chat)
}

fn earliest_started<'a>(group: &[&'a ChatStats]) -> Option<&'a ChatStats> {
    pick_by_date(
        group,
        |c| c.first_conversation.first_message_date.as_deref(),
        |a, b| a < b,
    )
    .map(|(chat, _)| chat)
}

fn latest_message_date(group: &[&ChatStats]) -> Option<String> {
    pick_by_date(group, |c| c.last_message_date.as_deref(), |a, b| a > b)
        .and_then(|(chat, _)| chat.last_message_date.clone())
}

fn merge_handles(group: &[&ChatStats]) -> Vec<String> {
    group
        .iter()
        .flat_map(|chat| chat.handles.iter().cloned())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

fn merge_peak(group: &[&ChatStats]) -> Peak {
    let mut busiest: Option<&Peak> = None;
    for chat in group {
        if busiest.is_none_or(|best| chat.peak.total > best.total) {
            busiest = Some(&chat.peak);
        }
    }

    let (date, total) = busiest
        .map(|peak| (peak.date.clone(), peak.total))
        .unwrap_or_default();

    Peak {
        date,
        total,
        longest_chain: group
            .iter()
            .map(|chat| chat.peak.longest_chain)
            .max()
            .unwrap_or_default(),
    }
}

fn merge_hourly(group: &[&ChatStats]) -> Vec<HourBin> {
    let mut bins = [BinCounts::default(); HOURS_PER_DAY as usize];
    for bin in group.iter().flat_map(|chat| chat.hourly.iter()) {
        if let Some(slot) = bins.get_mut(bin.hour as usize) {
            *slot += bin.counts;
        }
    }

    (0..HOURS_PER_DAY)
        .zip(bins)
        .map(|(hour, counts)| HourBin { hour, counts })
        .collect()
}

fn merge_weekdays(group: &[&ChatStats]) -> Vec<WeekdayBin> {
    let mut bins: BTreeMap<u8, BinCounts> = BTreeMap::new();
    for bin in group.iter().flat_map(|chat| chat.weekdays.iter()) {
        if bin.weekday < DAYS_PER_WEEK {
            *bins.entry(bin.weekday).or_default() += bin.counts;
        }
    }

    bins.into_iter()
        .map(|(weekday, counts)| WeekdayBin { weekday, counts })
        .collect()
}

fn merge_recent_balance(group: &[&ChatStats]) -> RecentBalance {
    let mut last_30_days = 0u64;
    let mut last_90_days = 0u64;
    let mut total = 0u64;
    for chat in group {
        last_30_days = last_30_days.saturating_add(chat.recent_balance.last_30_days);
        last_90_days = last_90_days.saturating_add(chat.recent_balance.last_90_days);
        total = total.saturating_add(chat.recent_balance.total);
    }

    let denominator = total.max(1) as f64;
    RecentBalance {
        last_30_days,
        last_90_days,
        total,
        last_30_pct: round2(last_30_days as f64 / denominator * 100.0),
        last_90_pct: round2(last_90_days as f64 / denominator * 100.0),
    }
}

/// Sum counts per key across tables, then re-rank and re-truncate.
///
/// Ties order by key so the output is stable across runs.
pub fn merge_frequency<'a>(
    tables: impl Iterator<Item = &'a [FrequencyEntry]>,
    limit: usize,
) -> Vec<FrequencyEntry> {
    let mut counts: BTreeMap<&str, u64> = BTreeMap::new();
    for entry in tables.flatten() {
        let count = counts.entry(entry.key.as_str()).or_default();
        *count = count.saturating_add(entry.count);
    }

    let mut merged: Vec<FrequencyEntry> = counts
        .into_iter()
        .map(|(key, count)| FrequencyEntry::new(key, count))
        .collect();
    // BTreeMap order already sorts by key; a stable sort keeps it for ties.
    merged.sort_by(|a, b| b.count.cmp(&a.count));
    merged.truncate(limit);
    merged
}

fn merge_frequency_tables(
    group: &[&ChatStats],
    tables: impl Fn(&ChatStats) -> &FrequencyTables,
    limit: usize,
) -> FrequencyTables {
    FrequencyTables {
        combined: merge_frequency(group.iter().map(|c| tables(c).combined.as_slice()), limit),
        you: merge_frequency(group.iter().map(|c| tables(c).you.as_slice()), limit),
        them: merge_frequency(group.iter().map(|c| tables(c).them.as_slice()), limit),
    }
}

fn merge_phrase_moods(group: &[&ChatStats]) -> Vec<PhraseMood> {
    let mut pairs: BTreeMap<(&str, &str), (u64, u64)> = BTreeMap::new();
    for entry in group.iter().flat_map(|chat| chat.phrase_moods.iter()) {
        let (you, them) = pairs
            .entry((entry.mood.as_str(), entry.phrase.as_str()))
            .or_default();
        *you = you.saturating_add(entry.you_count);
        *them = them.saturating_add(entry.them_count);
    }

    let mut merged: Vec<PhraseMood> = pairs
        .into_iter()
        .map(|((mood, phrase), (you_count, them_count))| PhraseMood {
            mood: mood.to_string(),
            phrase: phrase.to_string(),
            you_count,
            them_count,
        })
        .collect();
    merged.sort_by(|a, b| {
        let a_sum = a.you_count.saturating_add(a.them_count);
        let b_sum = b.you_count.saturating_add(b.them_count);
        b_sum.cmp(&a_sum)
    });
    merged
}

fn merge_mood_timeline(group: &[&ChatStats]) -> Vec<MoodDay> {
    let mut days: BTreeMap<&str, MoodCounts> = BTreeMap::new();
    for day in group.iter().flat_map(|chat| chat.mood_timeline.iter()) {
        *days.entry(day.date.as_str()).or_default() += day.counts;
    }

    days.into_iter()
        .map(|(date, counts)| MoodDay {
            date: date.to_string(),
            counts,
        })
        .collect()
}

fn merge_participants(group: &[&ChatStats]) -> Vec<ParticipantCount> {
    let mut counts: BTreeMap<&str, u64> = BTreeMap::new();
    for participant in group.iter().flat_map(|chat| chat.participants.iter()) {
        let count = counts.entry(participant.name.as_str()).or_default();
        *count = count.saturating_add(participant.count);
    }

    let mut merged: Vec<ParticipantCount> = counts
        .into_iter()
        .map(|(name, count)| ParticipantCount {
            name: name.to_string(),
            count,
        })
        .collect();
    merged.sort_by(|a, b| b.count.cmp(&a.count));
    merged
}

/// Unweighted mean of each participant's average reply time, one sample per
/// constituent.
fn merge_reply_speeds(group: &[&ChatStats]) -> Vec<ParticipantReplySpeed> {
    let mut samples: BTreeMap<&str, Vec<f64>> = BTreeMap::new();
    for chat in group {
        let mut seen: BTreeSet<&str> = BTreeSet::new();
        for speed in &chat.participant_reply_speeds {
            let name = speed.name.as_str();
            let values = samples.entry(name).or_default();
            if !seen.insert(name) {
                continue;
            }
            if let Some(avg) = speed.avg_minutes.filter(|v| v.is_finite()) {
                values.push(avg);
            }
        }
    }

    samples
        .into_iter()
        .map(|(name, values)| ParticipantReplySpeed {
            name: name.to_string(),
            avg_minutes: (!values.is_empty())
                .then(|| round2(values.iter().sum::<f64>() / values.len() as f64)),
        })
        .collect()
}

/// Message-count-weighted mean of the constituents' energy scores.
fn merge_energy_score(group: &[&ChatStats], totals: &Totals) -> Option<u8> {
    if totals.total == 0 {
        return None;
    }
    weighted_mean(group.iter(), |c| (Some(f64::from(c.energy_score)), c.totals.total))
        .map(|score| score.round().clamp(0.0, 100.0) as u8)
}
