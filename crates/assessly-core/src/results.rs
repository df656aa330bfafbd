//! Scored review of a graded attempt.
//!
//! Everything here is a pure function of a [`GradedResult`]; the same
//! result always renders to the same text.

use std::fmt::Write;

use serde::Serialize;

use crate::model::{percentage, GradedResult};

/// One option line in the review.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OptionView {
    pub text: String,
    pub is_user_answer: bool,
    pub is_correct_answer: bool,
}

/// One question in the review.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutcomeView {
    /// 1-based position in the result list.
    pub number: usize,
    pub question_text: String,
    pub options: Vec<OptionView>,
    pub is_correct: bool,
    pub explanation: Option<String>,
}

/// Display model for a graded attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResultsView {
    pub score: u32,
    pub total: u32,
    pub percentage: u32,
    pub attempt_number: u32,
    pub outcomes: Vec<OutcomeView>,
}

impl ResultsView {
    pub fn new(result: &GradedResult) -> Self {
        let outcomes = result
            .results
            .iter()
            .enumerate()
            .map(|(i, outcome)| OutcomeView {
                number: i + 1,
                question_text: outcome.question_text.clone(),
                options: outcome
                    .options
                    .iter()
                    .enumerate()
                    .map(|(idx, text)| OptionView {
                        text: text.clone(),
                        is_user_answer: idx == outcome.user_answer,
                        is_correct_answer: idx == outcome.correct_answer,
                    })
                    .collect(),
                is_correct: outcome.is_correct,
                explanation: outcome
                    .explanation
                    .clone()
                    .filter(|e| !e.trim().is_empty()),
            })
            .collect();

        Self {
            score: result.score,
            total: result.total,
            percentage: percentage(result.score, result.total),
            attempt_number: result.attempt_number,
            outcomes,
        }
    }

    /// `"2 / 3"`.
    pub fn score_line(&self) -> String {
        format!("{} / {}", self.score, self.total)
    }

    /// `"67% Correct"`.
    pub fn percentage_line(&self) -> String {
        format!("{}% Correct", self.percentage)
    }

    /// Plain-text review.
    pub fn render_text(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "Score: {}", self.score_line());
        let _ = writeln!(out, "{}", self.percentage_line());
        let _ = writeln!(out, "Attempt #{}", self.attempt_number);

        for outcome in &self.outcomes {
            let marker = if outcome.is_correct { '✓' } else { '✗' };
            let _ = writeln!(out);
            let _ = writeln!(
                out,
                "{marker} {}. {}",
                outcome.number, outcome.question_text
            );
            for (idx, option) in outcome.options.iter().enumerate() {
                let mut tags = Vec::new();
                if option.is_user_answer {
                    tags.push("your answer");
                }
                if option.is_correct_answer {
                    tags.push("correct answer");
                }
                let suffix = if tags.is_empty() {
                    String::new()
                } else {
                    format!(" ({})", tags.join(", "))
                };
                let _ = writeln!(out, "   {}) {}{suffix}", option_label(idx), option.text);
            }
            if let Some(explanation) = &outcome.explanation {
                let _ = writeln!(out, "   Explanation: {explanation}");
            }
        }
        out
    }
}

/// `0 → "A"`, `25 → "Z"`, `26 → "27"`.
pub fn option_label(index: usize) -> String {
    if index < 26 {
        ((b'A' + index as u8) as char).to_string()
    } else {
        (index + 1).to_string()
    }
}
