//! Counselor Chat
//!
//! A two-state machine (Inactive / Active) around one model session. Starting
//! a chat seeds the transcript with a compact dataset of recent records so the
//! model can answer questions about them.
//!
//! ```text
//!   Inactive --start--> Active --reset--> Inactive
//!                        |  ^
//!                        +--+ send
//! ```

use std::collections::HashMap;

use serde::Serialize;

use crate::ai::{ChatTurn, LanguageModel, ModelClient, SessionHandle};
use crate::error::Result;
use crate::insights::stats::{mean, mean_pain};
use crate::models::{Profile, Record};
use crate::prompts::Prompt;

/// Returned by `send` when there is no live session
pub const CHAT_NOT_ACTIVE: &str =
    "The counselor chat isn't active. Start a new chat to talk about your migraines.";

/// Returned by every chat entry point when the model is unavailable
pub const CHAT_UNAVAILABLE: &str =
    "The on-device assistant isn't available right now, so the counselor chat is turned off.";

/// Returned by `send` when the model call fails
pub const CHAT_FAILED: &str =
    "Sorry, I couldn't come up with an answer just now. Please try again in a moment.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatState {
    Inactive,
    Active,
}

/// What a `send` did
#[derive(Debug, Clone, PartialEq)]
pub enum ChatReply {
    /// The model answered
    Answered(String),
    /// No live session; the model was not called
    NotActive,
    /// The model call failed with this cause
    Failed(String),
}

impl ChatReply {
    /// Text shown to the user (and appended to the transcript)
    pub fn text(&self) -> &str {
        match self {
            ChatReply::Answered(text) => text,
            ChatReply::NotActive => CHAT_NOT_ACTIVE,
            ChatReply::Failed(_) => CHAT_FAILED,
        }
    }
}

/// Initial transcript and session instructions for a new chat
#[derive(Debug, Clone)]
pub struct ChatSeed {
    pub transcript: Vec<ChatTurn>,
    pub instructions: String,
    /// Dataset turns and greeting the model session starts with
    pub context: Vec<ChatTurn>,
    pub record_count: usize,
}

#[derive(Debug)]
pub struct CounselorChat {
    state: ChatState,
    handle: Option<SessionHandle>,
    transcript: Vec<ChatTurn>,
}

impl Default for CounselorChat {
    fn default() -> Self {
        Self::new()
    }
}

impl CounselorChat {
    pub fn new() -> Self {
        Self {
            state: ChatState::Inactive,
            handle: None,
            transcript: Vec::new(),
        }
    }

    pub fn state(&self) -> ChatState {
        self.state
    }

    pub fn has_session(&self) -> bool {
        self.handle.is_some()
    }

    pub fn transcript(&self) -> &[ChatTurn] {
        &self.transcript
    }

    /// Enter Active with a fresh transcript and open a model session.
    ///
    /// When the session cannot be opened the chat stays Active without a
    /// handle, so later sends answer with `CHAT_NOT_ACTIVE`.
    pub async fn start(&mut self, client: &ModelClient, seed: ChatSeed) -> Result<()> {
        if let Some(previous) = self.handle.take() {
            client.close_session(previous);
        }
        self.state = ChatState::Active;
        self.transcript = seed.transcript;

        let handle = client.open_session(&seed.instructions, &seed.context).await?;
        self.handle = Some(handle);
        tracing::info!(%handle, records = seed.record_count, "Counselor chat started");
        Ok(())
    }

    /// Forward one user message. The user message and the reply (or the
    /// fallback text) are always both appended.
    pub async fn send(&mut self, client: &ModelClient, message: &str) -> ChatReply {
        self.transcript.push(ChatTurn::user(message));

        let reply = match self.handle {
            None => ChatReply::NotActive,
            Some(handle) => match client.session_send(handle, message).await {
                Ok(text) => ChatReply::Answered(text),
                Err(e) => {
                    tracing::warn!(%handle, error = %e, "Counselor chat send failed");
                    ChatReply::Failed(e.to_string())
                }
            },
        };

        self.transcript.push(ChatTurn::assistant(reply.text()));
        reply
    }

    /// Drop the session and transcript and return to Inactive
    pub fn reset(&mut self, client: Option<&ModelClient>) {
        if let (Some(handle), Some(client)) = (self.handle.take(), client) {
            client.close_session(handle);
        }
        self.transcript.clear();
        self.state = ChatState::Inactive;
    }
}

/// One row of the seed dataset
#[derive(Debug, Serialize)]
struct SeedRow {
    date: String,
    pain: u8,
    stress: u8,
    triggers: Vec<String>,
    duration_h: Option<f64>,
    sleep_h: Option<f64>,
    caffeine_mg: Option<f64>,
    #[serde(rename = "pressure_hPa")]
    pressure_hpa: Option<f64>,
    humidity_pct: Option<f64>,
    #[serde(rename = "temp_C")]
    temp_c: Option<f64>,
}

impl SeedRow {
    fn from_record(record: &Record) -> Self {
        let health = record.health.as_ref();
        let weather = record.weather.as_ref();
        Self {
            date: record.start_date.format("%Y-%m-%d").to_string(),
            pain: record.pain_level,
            stress: record.stress_level,
            triggers: record.trigger_names(),
            duration_h: record.duration_hours().map(|h| (h * 10.0).round() / 10.0),
            sleep_h: health.and_then(|h| h.sleep_hours),
            caffeine_mg: health.and_then(|h| h.caffeine_mg),
            pressure_hpa: weather.map(|w| w.pressure_hpa),
            humidity_pct: weather.map(|w| w.humidity_percent),
            temp_c: weather.map(|w| w.temperature_celsius),
        }
    }
}

fn cell(value: Option<f64>, precision: usize) -> String {
    value
        .map(|v| format!("{:.*}", precision, v))
        .unwrap_or_else(|| "-".to_string())
}

fn markdown_table(rows: &[SeedRow]) -> String {
    let mut table = String::from(
        "| date | pain | stress | triggers | duration_h | sleep_h | caffeine_mg | pressure_hPa | humidity_pct | temp_C |\n\
         |---|---|---|---|---|---|---|---|---|---|\n",
    );
    for row in rows {
        let triggers = if row.triggers.is_empty() {
            "-".to_string()
        } else {
            row.triggers.join("; ").replace('|', "/")
        };
        table.push_str(&format!(
            "| {} | {} | {} | {} | {} | {} | {} | {} | {} | {} |\n",
            row.date,
            row.pain,
            row.stress,
            triggers,
            row.duration_h
                .map(|h| format!("{:.1}", h))
                .unwrap_or_else(|| "ongoing".to_string()),
            cell(row.sleep_h, 1),
            cell(row.caffeine_mg, 0),
            cell(row.pressure_hpa, 0),
            cell(row.humidity_pct, 0),
            cell(row.temp_c, 1),
        ));
    }
    table
}

/// Present profile fields as one line; `None` when there is nothing to say
pub fn profile_summary(profile: &Profile) -> Option<String> {
    let mut parts = Vec::new();
    if let Some(name) = profile.name.as_deref().filter(|n| !n.trim().is_empty()) {
        parts.push(format!("Name: {}.", name.trim()));
    }
    if let Some(sleep) = profile.average_sleep_hours {
        parts.push(format!("Usually sleeps {:.1} h.", sleep));
    }
    if let Some(caffeine) = profile.average_caffeine_mg {
        parts.push(format!("Usually has {:.0} mg caffeine a day.", caffeine));
    }
    if !profile.chronic_conditions.is_empty() {
        parts.push(format!(
            "Chronic conditions: {}.",
            profile.chronic_conditions.join(", ")
        ));
    }
    if !profile.dietary_restrictions.is_empty() {
        parts.push(format!(
            "Dietary restrictions: {}.",
            profile.dietary_restrictions.join(", ")
        ));
    }
    (!parts.is_empty()).then(|| parts.join(" "))
}

/// Aggregate facts over the whole log
pub fn history_summary(records: &[Record]) -> Option<String> {
    let first = records.iter().map(|r| r.start_date).min()?;
    let last = records.iter().map(|r| r.start_date).max()?;
    let avg_pain = mean_pain(records)?;

    let mut summary = format!(
        "{} migraines logged between {} and {}, average pain {:.1}/10.",
        records.len(),
        first.format("%Y-%m-%d"),
        last.format("%Y-%m-%d"),
        avg_pain
    );

    let durations: Vec<f64> = records.iter().filter_map(Record::duration_hours).collect();
    if let Some(avg_hours) = mean(durations.iter().copied()) {
        summary.push_str(&format!(
            " Finished episodes lasted {:.1} h on average ({} episodes).",
            avg_hours,
            durations.len()
        ));
    }

    let mut counts: HashMap<String, usize> = HashMap::new();
    for record in records {
        for name in record.trigger_names() {
            *counts.entry(name).or_default() += 1;
        }
    }
    let mut ranked: Vec<_> = counts.into_iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    if !ranked.is_empty() {
        let top = ranked
            .iter()
            .take(3)
            .map(|(name, count)| format!("{} ({})", name, count))
            .collect::<Vec<_>>()
            .join(", ");
        summary.push_str(&format!(" Most common triggers: {}.", top));
    }

    Some(summary)
}

/// Build the seeded transcript and session instructions.
///
/// Transcript order: framing, Markdown table, JSON array, optional profile
/// summary, optional history summary, assistant greeting.
pub fn build_seed(
    template: &Prompt,
    records: &[Record],
    profile: Option<&Profile>,
    max_records: usize,
) -> ChatSeed {
    let mut recent: Vec<&Record> = records.iter().collect();
    recent.sort_by(|a, b| b.start_date.cmp(&a.start_date));
    recent.truncate(max_records);

    let rows: Vec<SeedRow> = recent.iter().map(|r| SeedRow::from_record(r)).collect();
    let json = serde_json::to_string_pretty(&rows).unwrap_or_else(|_| "[]".to_string());

    let profile_text = profile.and_then(profile_summary);
    let history_text = history_summary(records);
    let count = rows.len().to_string();

    let framing = template.render_system(&HashMap::new());
    let instructions = template.render_system(&HashMap::from([
        ("profile", profile_text.as_deref().unwrap_or_default()),
        ("history", history_text.as_deref().unwrap_or_default()),
    ]));
    let greeting = template.render_section("# Greeting", &HashMap::from([("count", count.as_str())]));

    let table_turn = ChatTurn::system(format!(
        "Recent migraine records, most recent first:\n\n{}",
        markdown_table(&rows)
    ));
    let json_turn = ChatTurn::system(format!("The same records as JSON:\n\n{}", json));
    let greeting_turn = ChatTurn::assistant(greeting);

    let mut transcript = vec![ChatTurn::system(framing), table_turn.clone(), json_turn.clone()];
    if let Some(text) = &profile_text {
        transcript.push(ChatTurn::system(format!("User profile: {}", text)));
    }
    if let Some(text) = &history_text {
        transcript.push(ChatTurn::system(format!("History summary: {}", text)));
    }
    transcript.push(greeting_turn.clone());

    // Profile and history already ride in the instructions
    ChatSeed {
        transcript,
        instructions,
        context: vec![table_turn, json_turn, greeting_turn],
        record_count: rows.len(),
    }
}
