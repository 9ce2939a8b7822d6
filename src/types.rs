use serde::{Deserialize, Serialize};

/// Top-N limits for the per-record frequency tables.
pub const WORD_TABLE_LIMIT: usize = 10;
pub const EMOJI_TABLE_LIMIT: usize = 10;
pub const PHRASE_TABLE_LIMIT: usize = 10;
pub const REACTION_TABLE_LIMIT: usize = 12;

/// A full statistics report as written by the extractor.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Report {
    #[serde(default)]
    pub summary: Summary,
    pub chats: Vec<ChatStats>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generated_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filters: Option<ReportFilters>,
}

/// Extraction parameters recorded by the extractor. Carried through untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReportFilters {
    #[serde(default)]
    pub since: Option<String>,
    #[serde(default)]
    pub until: Option<String>,
    #[serde(default)]
    pub threshold_hours: Option<f64>,
    #[serde(default)]
    pub top: Option<usize>,
    #[serde(default)]
    pub date_scale: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    #[serde(default)]
    pub totals: Totals,
    #[serde(default)]
    pub left_on_read: LeftOnRead,
    #[serde(default)]
    pub response_times: ResponseTimes,
}

/// One conversation thread's statistics snapshot.
///
/// Raw records come from the extractor with non-negative ids. Merged records
/// share the same shape but carry a negative synthetic id, `is_group == false`
/// and the list of constituent ids in `merged_from`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChatStats {
    pub chat_id: i64,
    #[serde(default)]
    pub chat_identifier: String,
    #[serde(default)]
    pub display_name: Option<String>,
    pub label: String,
    #[serde(default)]
    pub handles: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact_key: Option<String>,
    #[serde(default)]
    pub is_group: bool,
    #[serde(default)]
    pub participant_count: u32,

    pub totals: Totals,
    #[serde(default)]
    pub left_on_read: LeftOnRead,
    #[serde(default)]
    pub response_times: ResponseTimes,
    #[serde(default)]
    pub streaks: Streaks,
    #[serde(default)]
    pub initiators: Initiators,
    #[serde(default)]
    pub peak: Peak,
    #[serde(default)]
    pub reengagement: Reengagement,
    #[serde(default)]
    pub hourly: Vec<HourBin>,
    #[serde(default)]
    pub weekdays: Vec<WeekdayBin>,
    #[serde(default)]
    pub recent_balance: RecentBalance,
    #[serde(default)]
    pub attachments: Attachments,

    // Frequency tables
    #[serde(default)]
    pub words: FrequencyTables,
    #[serde(default)]
    pub emojis: FrequencyTables,
    #[serde(default)]
    pub phrases: FrequencyTables,
    #[serde(default)]
    pub reactions: Vec<FrequencyEntry>,
    #[serde(default)]
    pub phrase_moods: Vec<PhraseMood>,

    // Mood
    #[serde(default)]
    pub mood: MoodCounts,
    #[serde(default)]
    pub mood_timeline: Vec<MoodDay>,
    #[serde(default)]
    pub greetings: Greetings,

    #[serde(default)]
    pub participants: Vec<ParticipantCount>,
    #[serde(default)]
    pub participant_reply_speeds: Vec<ParticipantReplySpeed>,

    #[serde(default)]
    pub first_conversation: FirstConversation,
    #[serde(default)]
    pub last_message_date: Option<String>,
    #[serde(default)]
    pub energy_score: u8,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub merged_from: Vec<i64>,
}

impl ChatStats {
    pub fn is_merged(&self) -> bool {
        self.chat_id < 0
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Totals {
    pub sent: u64,
    pub received: u64,
    pub total: u64,
}

impl std::ops::AddAssign for Totals {
    fn add_assign(&mut self, rhs: Self) {
        self.sent = self.sent.saturating_add(rhs.sent);
        self.received = self.received.saturating_add(rhs.received);
        self.total = self.total.saturating_add(rhs.total);
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeftOnRead {
    pub you_left_them: u64,
    pub they_left_you: u64,
}

impl std::ops::AddAssign for LeftOnRead {
    fn add_assign(&mut self, rhs: Self) {
        self.you_left_them = self.you_left_them.saturating_add(rhs.you_left_them);
        self.they_left_you = self.they_left_you.saturating_add(rhs.they_left_you);
    }
}

/// Reply latency summary. The minute statistics are `None` when `count == 0`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ResponseStat {
    pub count: u64,
    #[serde(default)]
    pub avg_minutes: Option<f64>,
    #[serde(default)]
    pub median_minutes: Option<f64>,
    #[serde(default)]
    pub p90_minutes: Option<f64>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ResponseTimes {
    #[serde(default)]
    pub you_reply: ResponseStat,
    #[serde(default)]
    pub they_reply: ResponseStat,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Streaks {
    pub current_streak_days: u32,
    pub longest_streak_days: u32,
    pub longest_silence_days: u32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Initiators {
    pub you_started: u64,
    pub them_started: u64,
}

impl std::ops::AddAssign for Initiators {
    fn add_assign(&mut self, rhs: Self) {
        self.you_started = self.you_started.saturating_add(rhs.you_started);
        self.them_started = self.them_started.saturating_add(rhs.them_started);
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Peak {
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub total: u64,
    /// Longest uninterrupted back-and-forth chain anywhere in the thread.
    #[serde(default)]
    pub longest_chain: u64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ReengagementSide {
    #[serde(default)]
    pub avg_gap_hours: Option<f64>,
    #[serde(default)]
    pub count: u64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Reengagement {
    #[serde(default)]
    pub you: ReengagementSide,
    #[serde(default)]
    pub them: ReengagementSide,
}

/// Counts for one bucket of a histogram (an hour of day or a weekday).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BinCounts {
    pub you: u64,
    pub them: u64,
    pub total: u64,
}

impl std::ops::AddAssign for BinCounts {
    fn add_assign(&mut self, rhs: Self) {
        self.you = self.you.saturating_add(rhs.you);
        self.them = self.them.saturating_add(rhs.them);
        self.total = self.total.saturating_add(rhs.total);
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HourBin {
    pub hour: u8,
    #[serde(flatten)]
    pub counts: BinCounts,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeekdayBin {
    pub weekday: u8,
    #[serde(flatten)]
    pub counts: BinCounts,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct RecentBalance {
    pub last_30_days: u64,
    pub last_90_days: u64,
    pub total: u64,
    #[serde(default)]
    pub last_30_pct: f64,
    #[serde(default)]
    pub last_90_pct: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachments {
    pub you: u64,
    pub them: u64,
    pub total: u64,
}

impl std::ops::AddAssign for Attachments {
    fn add_assign(&mut self, rhs: Self) {
        self.you = self.you.saturating_add(rhs.you);
        self.them = self.them.saturating_add(rhs.them);
        self.total = self.total.saturating_add(rhs.total);
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrequencyEntry {
    pub key: String,
    pub count: u64,
}

impl FrequencyEntry {
    pub fn new(key: impl Into<String>, count: u64) -> Self {
        Self {
            key: key.into(),
            count,
        }
    }
}

/// A top-N table kept for both sides combined and for each side separately.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrequencyTables {
    #[serde(default)]
    pub combined: Vec<FrequencyEntry>,
    #[serde(default)]
    pub you: Vec<FrequencyEntry>,
    #[serde(default)]
    pub them: Vec<FrequencyEntry>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhraseMood {
    pub mood: String,
    pub phrase: String,
    pub you_count: u64,
    pub them_count: u64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoodCounts {
    pub friendly: u64,
    pub romantic: u64,
    pub professional: u64,
    pub neutral: u64,
}

impl std::ops::AddAssign for MoodCounts {
    fn add_assign(&mut self, rhs: Self) {
        self.friendly = self.friendly.saturating_add(rhs.friendly);
        self.romantic = self.romantic.saturating_add(rhs.romantic);
        self.professional = self.professional.saturating_add(rhs.professional);
        self.neutral = self.neutral.saturating_add(rhs.neutral);
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoodDay {
    pub date: String,
    #[serde(flatten)]
    pub counts: MoodCounts,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Greetings {
    pub you_morning: u64,
    pub them_morning: u64,
    pub you_night: u64,
    pub them_night: u64,
}

impl std::ops::AddAssign for Greetings {
    fn add_assign(&mut self, rhs: Self) {
        self.you_morning = self.you_morning.saturating_add(rhs.you_morning);
        self.them_morning = self.them_morning.saturating_add(rhs.them_morning);
        self.you_night = self.you_night.saturating_add(rhs.you_night);
        self.them_night = self.them_night.saturating_add(rhs.them_night);
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParticipantCount {
    pub name: String,
    pub count: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParticipantReplySpeed {
    pub name: String,
    #[serde(default)]
    pub avg_minutes: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExcerptLine {
    pub sender: String,
    pub text: String,
}

/// Opening lines of the thread plus metadata about its very first message.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FirstConversation {
    #[serde(default)]
    pub lines: Vec<ExcerptLine>,
    #[serde(default)]
    pub first_message_date: Option<String>,
    #[serde(default)]
    pub first_message_text: Option<String>,
    #[serde(default)]
    pub first_message_from_me: Option<bool>,
}
