//! The `assessly take` command.

use std::io::{BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;

use assessly_client::config::DraftStorage;
use assessly_client::{create_backend, create_draft_store, create_session, load_config_from};
use assessly_core::engine::{AttemptSession, Engine, OpenOutcome, Phase, SubmitOutcome};
use assessly_core::model::{AssessmentId, QuestionId};
use assessly_core::results::{option_label, ResultsView};
use assessly_core::submission::{blocked_message, confirm_prompt};
use assessly_core::task::{Activity, Teardown};

use crate::console::Console;

/// How an interactive attempt ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowEnd {
    /// A result was reviewed and the user chose not to retry.
    Finished,
    /// The user left early. Answers so far are in the draft.
    Quit,
    /// The outstanding request was torn down.
    Cancelled,
}

enum Reply {
    Answered,
    Skipped,
    Quit,
}

pub async fn execute(
    assessment: String,
    config_path: Option<PathBuf>,
    draft_dir: Option<PathBuf>,
) -> Result<()> {
    let mut config = load_config_from(config_path.as_deref())?;
    if let Some(dir) = draft_dir {
        config.drafts.storage = DraftStorage::File;
        config.drafts.dir = dir;
    }

    let backend = create_backend(&config)?;
    let mut engine = Engine::new(
        backend.clone(),
        create_draft_store(&config),
        create_session(&config),
    );
    if config.api.check_access {
        engine = engine.with_gate(backend);
    }
    tracing::debug!(session = %engine.session().session_id(), "session started");

    let teardown = Teardown::new();
    spawn_interrupt_handler(teardown.clone());

    let stdin = std::io::stdin();
    let mut console = Console::new(stdin.lock(), std::io::stdout());

    let id = AssessmentId::new(assessment);
    let mut attempt = loop {
        match engine.open(&id, teardown.clone()).await {
            OpenOutcome::Ready(attempt) => break attempt,
            OpenOutcome::Failed(message) => {
                console.say(&format!("Error: {message}"))?;
                if console.confirm("Try loading again?", true)? != Some(true) {
                    anyhow::bail!("could not load assessment '{id}'");
                }
            }
            OpenOutcome::Cancelled => anyhow::bail!("cancelled"),
        }
    };

    let end = run_attempt(&mut attempt, &mut console).await?;
    match end {
        FlowEnd::Quit => console.say("Draft saved. Run the same command to pick up where you left off.")?,
        FlowEnd::Cancelled => console.say("Cancelled.")?,
        FlowEnd::Finished => {}
    }
    attempt.back();
    Ok(())
}

/// Ctrl-C aborts any outstanding request and exits. Answers are saved as
/// they are entered, so nothing is lost.
fn spawn_interrupt_handler(teardown: Teardown) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            let activity = teardown.activity();
            teardown.fire();
            eprintln!("\n{}", interrupt_message(activity));
            std::process::exit(130);
        }
    });
}

/// What to tell the user about the request that was in flight when interrupted.
fn interrupt_message(activity: Option<Activity>) -> String {
    match activity {
        Some(Activity::Submitting) => "Interrupted while submitting. The submission may still be \
            recorded; your draft was kept."
            .to_string(),
        Some(activity) => format!("Interrupted while {}. Draft saved.", activity.label()),
        None => "Interrupted. Draft saved.".to_string(),
    }
}

/// Drive one attempt from the console until it is finished or abandoned.
pub async fn run_attempt<R: BufRead, W: Write>(
    attempt: &mut AttemptSession,
    console: &mut Console<R, W>,
) -> Result<FlowEnd> {
    let assessment = Arc::clone(attempt.assessment());
    console.say(&format!(
        "{} ({} questions)",
        assessment.title, assessment.total_questions
    ))?;
    let answered = attempt.collector().answered_count();
    if answered > 0 {
        console.say(&format!(
            "Resuming saved draft: {answered} of {} answered.",
            assessment.total_questions
        ))?;
    }

    loop {
        let pending: Vec<QuestionId> = attempt
            .collector()
            .unanswered()
            .into_iter()
            .cloned()
            .collect();
        for question_id in &pending {
            if let Reply::Quit = ask_question(attempt, console, question_id)? {
                return Ok(FlowEnd::Quit);
            }
        }

        match attempt.request_submit()?.clone() {
            Phase::Blocked { remaining } => {
                console.say(&blocked_message(remaining))?;
                match console.confirm("Continue answering?", true)? {
                    Some(true) => continue,
                    _ => return Ok(FlowEnd::Quit),
                }
            }
            Phase::Confirming { total } => {
                match console.confirm(&confirm_prompt(total), false)? {
                    Some(true) => {}
                    Some(false) => {
                        attempt.cancel_submit()?;
                        if let Reply::Quit = revise(attempt, console)? {
                            return Ok(FlowEnd::Quit);
                        }
                        continue;
                    }
                    None => return Ok(FlowEnd::Quit),
                }
            }
            other => anyhow::bail!("unexpected phase after submit request: {}", other.label()),
        }

        console.say("Submitting...")?;
        match attempt.confirm_submit().await? {
            SubmitOutcome::Graded(result) => {
                console.say("")?;
                console.say(&ResultsView::new(&result).render_text())?;
                match console.confirm("Retry this assessment?", false)? {
                    Some(true) => attempt.retry()?,
                    _ => return Ok(FlowEnd::Finished),
                }
            }
            SubmitOutcome::Failed(message) => {
                console.say(&format!("Error: {message}"))?;
                console.say("Your answers are saved.")?;
                match console.confirm("Try submitting again?", true)? {
                    Some(true) => {}
                    _ => return Ok(FlowEnd::Quit),
                }
            }
            SubmitOutcome::Cancelled => return Ok(FlowEnd::Cancelled),
        }
    }
}

/// Let the user change answers after declining to submit.
fn revise<R: BufRead, W: Write>(
    attempt: &mut AttemptSession,
    console: &mut Console<R, W>,
) -> Result<Reply> {
    let assessment = Arc::clone(attempt.assessment());
    let count = assessment.questions.len();
    loop {
        let Some(reply) = console.ask(&format!(
            "Question number to change (1-{count}, Enter to review submission, q to quit): "
        ))?
        else {
            return Ok(Reply::Quit);
        };
        match reply.as_str() {
            "" => return Ok(Reply::Answered),
            "q" | "Q" => return Ok(Reply::Quit),
            _ => {}
        }
        let Some(question) = reply
            .parse::<usize>()
            .ok()
            .and_then(|n| n.checked_sub(1))
            .and_then(|idx| assessment.questions.get(idx))
        else {
            console.say(&format!("Please enter a number between 1 and {count}."))?;
            continue;
        };
        if let Reply::Quit = ask_question(attempt, console, &question.question_id)? {
            return Ok(Reply::Quit);
        }
    }
}

fn ask_question<R: BufRead, W: Write>(
    attempt: &mut AttemptSession,
    console: &mut Console<R, W>,
    question_id: &QuestionId,
) -> Result<Reply> {
    let assessment = Arc::clone(attempt.assessment());
    let Some((position, question)) = assessment
        .questions
        .iter()
        .enumerate()
        .find(|(_, q)| &q.question_id == question_id)
    else {
        anyhow::bail!("unknown question: {question_id}");
    };
    let current = attempt.collector().answer(question_id);

    console.say("")?;
    console.say(&format!(
        "Question {}/{}: {}",
        position + 1,
        assessment.questions.len(),
        question.question_text
    ))?;
    for (idx, option) in question.options.iter().enumerate() {
        let marker = if current == Some(idx) { " *" } else { "" };
        console.say(&format!("  {}) {option}{marker}", option_label(idx)))?;
    }

    let last = option_label(question.options.len() - 1);
    loop {
        let Some(reply) =
            console.ask(&format!("Answer (A-{last}, Enter to skip, q to quit): "))?
        else {
            return Ok(Reply::Quit);
        };
        if reply.is_empty() {
            return Ok(Reply::Skipped);
        }
        if reply.eq_ignore_ascii_case("q") {
            return Ok(Reply::Quit);
        }
        match parse_option(&reply, question.options.len()) {
            Some(option) => {
                attempt.set_answer(question_id, option)?;
                return Ok(Reply::Answered);
            }
            None => console.say(&format!("Please choose an option between A and {last}."))?,
        }
    }
}

/// Accept a letter (`b`, `B`) or a 1-based number (`2`).
fn parse_option(reply: &str, option_count: usize) -> Option<usize> {
    let index = match reply.parse::<usize>() {
        Ok(n) => n.checked_sub(1)?,
        Err(_) => {
            let mut chars = reply.chars();
            let c = chars.next()?.to_ascii_uppercase();
            if chars.next().is_some() || !c.is_ascii_uppercase() {
                return None;
            }
            (c as u8 - b'A') as usize
        }
    };
    (index < option_count).then_some(index)
}
