//! Builds one question for a drawn idiom and grades the learner's answer.

use rand::Rng;
use serde::Serialize;

use crate::models::{IdiomRecord, QuestionMode};
use crate::sampling::{pick_n, pick_one, shuffle, unique_by};

const CHOICE_DISTRACTORS: usize = 3;
const BANK_DISTRACTORS: usize = 3;
/// Other idioms whose characters feed the fill-in-blank bank.
const BANK_SOURCE_IDIOMS: usize = 6;
const FILL_BLANK_LEN: usize = 4;

/// The modes still available in this session.
///
/// Starts as a copy of the learner's settings; dropping a mode here never
/// touches the saved settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModeSet {
    modes: Vec<QuestionMode>,
}

impl ModeSet {
    pub fn new(modes: &[QuestionMode]) -> Self {
        Self {
            modes: modes.to_vec(),
        }
    }

    /// Uniform over the enabled modes; meaning choice once none are left.
    pub fn pick<R: Rng + ?Sized>(&self, rng: &mut R) -> QuestionMode {
        pick_one(&self.modes, rng).unwrap_or(QuestionMode::MeaningChoice)
    }

    pub fn disable(&mut self, mode: QuestionMode) {
        self.modes.retain(|m| *m != mode);
    }

    #[cfg(test)]
    pub fn contains(&self, mode: QuestionMode) -> bool {
        self.modes.contains(&mode)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum QuestionKind {
    /// Pick the idiom matching `prompt` (a meaning or a scene).
    Choice {
        prompt: String,
        options: Vec<String>,
        answer: String,
    },
    /// Is `statement` the meaning of `idiom`?
    Judgment {
        idiom: String,
        statement: String,
        is_true: bool,
    },
    /// Place the missing character at `blank`.
    FillBlank {
        chars: Vec<char>,
        blank: usize,
        bank: Vec<char>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Question {
    pub idiom_id: String,
    pub mode: QuestionMode,
    #[serde(flatten)]
    pub kind: QuestionKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    Choice(String),
    Judgment(bool),
    Placed(char),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Evaluation {
    pub correct: bool,
    pub correct_answer: String,
    /// Wrongbook tag to record, set only on a miss.
    pub miss_tag: Option<&'static str>,
}

pub fn generate_question<R: Rng + ?Sized>(
    item: &IdiomRecord,
    all: &[IdiomRecord],
    modes: &mut ModeSet,
    rng: &mut R,
) -> Question {
    let others: Vec<&IdiomRecord> = all.iter().filter(|x| x.id != item.id).collect();

    loop {
        let mode = modes.pick(rng);
        let kind = match mode {
            QuestionMode::MeaningChoice => choice(item, &item.meaning, &others, rng),
            QuestionMode::SceneChoice => choice(item, &item.story, &others, rng),
            QuestionMode::TrueFalse => judgment(item, &others, rng),
            QuestionMode::FillBlank => {
                if item.char_count() != FILL_BLANK_LEN {
                    tracing::debug!(idiom = %item.idiom, "not a four-character idiom, dropping fill-in-blank");
                    modes.disable(QuestionMode::FillBlank);
                    continue;
                }
                fill_blank(item, &others, rng)
            }
        };

        return Question {
            idiom_id: item.id.clone(),
            mode,
            kind,
        };
    }
}

fn choice<R: Rng + ?Sized>(
    item: &IdiomRecord,
    prompt: &str,
    others: &[&IdiomRecord],
    rng: &mut R,
) -> QuestionKind {
    // distinct option texts even if two records share an idiom
    let candidates: Vec<&str> = unique_by(
        others
            .iter()
            .map(|x| x.idiom.as_str())
            .filter(|text| *text != item.idiom)
            .collect(),
        |text| *text,
    );

    let mut options = vec![item.idiom.clone()];
    options.extend(
        pick_n(&candidates, CHOICE_DISTRACTORS, rng)
            .into_iter()
            .map(str::to_string),
    );

    QuestionKind::Choice {
        prompt: prompt.to_string(),
        options: shuffle(&options, rng),
        answer: item.idiom.clone(),
    }
}

fn judgment<R: Rng + ?Sized>(
    item: &IdiomRecord,
    others: &[&IdiomRecord],
    rng: &mut R,
) -> QuestionKind {
    let other = pick_one(others, rng);
    let (statement, is_true) = match other {
        Some(other) if !rng.gen_bool(0.5) => (other.meaning.clone(), false),
        _ => (item.meaning.clone(), true),
    };

    QuestionKind::Judgment {
        idiom: item.idiom.clone(),
        statement,
        is_true,
    }
}

fn fill_blank<R: Rng + ?Sized>(
    item: &IdiomRecord,
    others: &[&IdiomRecord],
    rng: &mut R,
) -> QuestionKind {
    let chars: Vec<char> = item.idiom.chars().collect();
    let positions: Vec<usize> = (0..chars.len()).collect();
    let blank = pick_one(&positions, rng).unwrap_or(0);
    let correct = chars[blank];

    let pool: Vec<char> = pick_n(others, BANK_SOURCE_IDIOMS, rng)
        .into_iter()
        .flat_map(|x| x.idiom.chars())
        .filter(|ch| *ch != correct)
        .collect();
    let pool = unique_by(pool, |ch| *ch);

    let mut bank = vec![correct];
    bank.extend(pick_n(&pool, BANK_DISTRACTORS, rng));

    QuestionKind::FillBlank {
        chars,
        blank,
        bank: shuffle(&bank, rng),
    }
}

impl Question {
    pub fn correct_answer(&self) -> String {
        match &self.kind {
            QuestionKind::Choice { answer, .. } => answer.clone(),
            QuestionKind::Judgment { is_true, .. } => is_true.to_string(),
            QuestionKind::FillBlank { chars, blank, .. } => chars[*blank].to_string(),
        }
    }
}

/// Grades a response. A response of the wrong shape is a miss.
pub fn evaluate(question: &Question, response: &Response) -> Evaluation {
    let correct = match (&question.kind, response) {
        (QuestionKind::Choice { answer, .. }, Response::Choice(picked)) => picked == answer,
        (QuestionKind::Judgment { is_true, .. }, Response::Judgment(says)) => says == is_true,
        (QuestionKind::FillBlank { chars, blank, .. }, Response::Placed(ch)) => {
            *ch == chars[*blank]
        }
        _ => false,
    };

    Evaluation {
        correct,
        correct_answer: question.correct_answer(),
        miss_tag: (!correct).then(|| question.mode.miss_tag()),
    }
}
