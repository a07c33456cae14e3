//! Line-based quiz loop. The CLI hands it stdin/stdout; tests hand it buffers.

use std::io::{BufRead, Write};

use rand::Rng;
use serde::Serialize;
use url::Url;

use crate::error::Result;
use crate::models::IdiomRecord;
use crate::question::{Question, QuestionKind, Response};
use crate::session::{QuizService, QuizSession, Score};
use crate::store::KeyValueStore;

const BLANK_MARK: char = '＿';

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RunOutcome {
    pub score: Score,
    /// False when the learner quit or input ended early.
    pub completed: bool,
}

enum Input {
    Answer(Response),
    Hint,
    Quit,
    Invalid,
}

/// Reads a learner's line for `question`. Numbers pick from the listed
/// options; the text of an offered option or bank tile is accepted too.
/// Anything else is `None` so the caller can ask again.
pub fn parse_response(question: &Question, line: &str) -> Option<Response> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }

    match &question.kind {
        QuestionKind::Choice { options, .. } => {
            if let Ok(n) = line.parse::<usize>() {
                return options.get(n.checked_sub(1)?).cloned().map(Response::Choice);
            }
            options
                .iter()
                .find(|opt| opt.as_str() == line)
                .cloned()
                .map(Response::Choice)
        }
        QuestionKind::Judgment { .. } => match line.to_lowercase().as_str() {
            "y" | "yes" | "t" | "true" | "是" | "對" => Some(Response::Judgment(true)),
            "n" | "no" | "f" | "false" | "不是" | "不對" => Some(Response::Judgment(false)),
            _ => None,
        },
        QuestionKind::FillBlank { bank, .. } => {
            if let Ok(n) = line.parse::<usize>() {
                return bank.get(n.checked_sub(1)?).copied().map(Response::Placed);
            }
            let mut chars = line.chars();
            match (chars.next(), chars.next()) {
                (Some(ch), None) if bank.contains(&ch) => Some(Response::Placed(ch)),
                _ => None,
            }
        }
    }
}

fn classify(question: &Question, line: &str) -> Input {
    match line.trim() {
        "q" | "quit" => Input::Quit,
        "?" | "h" | "hint" => Input::Hint,
        other => parse_response(question, other)
            .map(Input::Answer)
            .unwrap_or(Input::Invalid),
    }
}

pub fn media_url(item: &IdiomRecord) -> String {
    match item.media_link.as_deref().map(str::trim).filter(|l| !l.is_empty()) {
        Some(id) => youtube_url("watch", "v", id),
        None => youtube_url("results", "search_query", &format!("{} 成語故事", item.idiom)),
    }
}

fn youtube_url(path: &str, key: &str, value: &str) -> String {
    let base = format!("https://www.youtube.com/{path}");
    match Url::parse_with_params(&base, &[(key, value)]) {
        Ok(url) => url.into(),
        Err(_) => base,
    }
}

fn write_question<W: Write>(out: &mut W, session: &QuizSession, question: &Question) -> Result<()> {
    let score = session.score();
    writeln!(out)?;
    writeln!(
        out,
        "[{}/{}] {}  (score: {})",
        session.position() + 1,
        score.total,
        question.mode.label(),
        score.correct
    )?;

    match &question.kind {
        QuestionKind::Choice { prompt, options, .. } => {
            writeln!(out, "  {prompt}")?;
            for (i, opt) in options.iter().enumerate() {
                writeln!(out, "  {}. {}", i + 1, opt)?;
            }
        }
        QuestionKind::Judgment { idiom, statement, .. } => {
            writeln!(out, "  Is this the meaning of 「{idiom}」?")?;
            writeln!(out, "  {statement}")?;
            writeln!(out, "  (y/n)")?;
        }
        QuestionKind::FillBlank { chars, blank, bank } => {
            let shown: String = chars
                .iter()
                .enumerate()
                .map(|(i, ch)| if i == *blank { BLANK_MARK } else { *ch })
                .collect();
            writeln!(out, "  {shown}")?;
            let tiles: Vec<String> = bank
                .iter()
                .enumerate()
                .map(|(i, ch)| format!("{}. {}", i + 1, ch))
                .collect();
            writeln!(out, "  {}", tiles.join("   "))?;
        }
    }
    write!(out, "> ")?;
    out.flush()?;
    Ok(())
}

/// Runs the remaining questions of `session`, recording misses through
/// `service`. Quitting keeps whatever was already saved.
pub fn run_quiz<S, I, W, R>(
    service: &QuizService<'_, S>,
    session: &mut QuizSession,
    input: &mut I,
    out: &mut W,
    rng: &mut R,
) -> Result<RunOutcome>
where
    S: KeyValueStore + ?Sized,
    I: BufRead,
    W: Write,
    R: Rng + ?Sized,
{
    while let Some(question) = session.question(rng) {
        let Some(item) = session.current().cloned() else {
            break;
        };
        write_question(out, session, &question)?;

        let response = loop {
            let mut line = String::new();
            if input.read_line(&mut line)? == 0 {
                tracing::info!(answered = session.position(), "input closed, abandoning quiz");
                return Ok(RunOutcome {
                    score: session.score(),
                    completed: false,
                });
            }
            match classify(&question, &line) {
                Input::Answer(r) => break r,
                Input::Quit => {
                    return Ok(RunOutcome {
                        score: session.score(),
                        completed: false,
                    })
                }
                Input::Hint => writeln!(out, "  注音: {}", item.zhuyin)?,
                Input::Invalid => writeln!(out, "  Please answer with one of the options (? for a hint, q to quit).")?,
            }
            write!(out, "> ")?;
            out.flush()?;
        };

        let eval = service.submit(session, &question, &response)?;
        if eval.correct {
            writeln!(out, "  Correct!")?;
        } else {
            writeln!(out, "  Not quite. Answer: {}", eval.correct_answer)?;
        }
        writeln!(out, "  {}: {}", item.idiom, item.meaning)?;
        writeln!(out, "  Story video: {}", media_url(&item))?;
        session.advance();
    }

    let score = session.score();
    writeln!(out)?;
    writeln!(
        out,
        "Finished! {} / {} ({}%)",
        score.correct,
        score.total,
        score.percent()
    )?;
    Ok(RunOutcome {
        score,
        completed: true,
    })
}
