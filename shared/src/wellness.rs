//! Companion wellness endpoints: shield status, reminders, mood analysis and
//! journal summaries.

use serde::{Deserialize, Serialize};

/// Characters kept by [`summarize`] before the ellipsis.
pub const SUMMARY_CHARS: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ShieldStatus {
    pub enabled: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    pub id: u32,
    pub message: &'static str,
}

/// Reminders shown on the dashboard.
pub fn notifications() -> Vec<Notification> {
    vec![
        Notification {
            id: 1,
            message: "Time to write your journal!",
        },
        Notification {
            id: 2,
            message: "Try a 5-min meditation session.",
        },
    ]
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Sentiment {
    Positive,
    Negative,
    Neutral,
}

/// Map a self-reported mood to a coarse sentiment.
pub fn sentiment_for(mood: &str) -> Sentiment {
    match mood {
        "happy" | "excited" => Sentiment::Positive,
        "sad" | "angry" => Sentiment::Negative,
        _ => Sentiment::Neutral,
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct MoodRequest {
    pub mood: Option<String>,
}

#[derive(Debug, PartialEq, Serialize)]
pub struct MoodAnalysis {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mood: Option<String>,
    pub sentiment: Sentiment,
}

pub fn analyze_mood(request: MoodRequest) -> MoodAnalysis {
    let sentiment = request
        .mood
        .as_deref()
        .map(sentiment_for)
        .unwrap_or(Sentiment::Neutral);
    MoodAnalysis {
        mood: request.mood,
        sentiment,
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct SummarizeRequest {
    pub content: Option<String>,
}

#[derive(Debug, PartialEq, Serialize)]
pub struct Summary {
    pub summary: String,
}

/// Short preview of a journal entry. `None` when there is nothing to summarise.
pub fn summarize(request: &SummarizeRequest) -> Option<Summary> {
    let content = request.content.as_deref().filter(|c| !c.is_empty())?;
    let head: String = content.chars().take(SUMMARY_CHARS).collect();
    Some(Summary {
        summary: format!("{}...", head),
    })
}
