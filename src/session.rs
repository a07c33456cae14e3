//! Drawing a quiz and running it question by question.

use std::collections::HashSet;

use chrono::{Local, NaiveDate, Utc};
use rand::Rng;
use serde::Serialize;

use crate::error::Result;
use crate::history::HistoryLog;
use crate::models::{IdiomRecord, LearnerSettings};
use crate::pool::build_pool;
use crate::question::{evaluate, generate_question, Evaluation, ModeSet, Question, Response};
use crate::sampling::pick_n;
use crate::store::{self, KeyValueStore};
use crate::wrongbook::Wrongbook;

/// Draws the questions for one session and records them in `history`.
///
/// An empty result means nothing is available to ask; it is not an error.
pub fn make_quiz<R: Rng + ?Sized>(
    items: &[IdiomRecord],
    settings: &LearnerSettings,
    history: &mut HistoryLog,
    wrongbook: &Wrongbook,
    only_wrong: bool,
    today: NaiveDate,
    rng: &mut R,
) -> Vec<IdiomRecord> {
    let pool = if only_wrong {
        let wrong: HashSet<&str> = wrongbook.ids(&settings.learner).into_iter().collect();
        let wrong_items: Vec<IdiomRecord> = items
            .iter()
            .filter(|it| wrong.contains(it.id.as_str()))
            .cloned()
            .collect();
        // remediation must not be starved by recent draws
        let remedial = LearnerSettings {
            avoid_days: 0,
            ..settings.clone()
        };
        build_pool(&wrong_items, &remedial, history)
    } else {
        build_pool(items, settings, history)
    };

    let drawn = pick_n(&pool, settings.count, rng);
    let ids: Vec<String> = drawn.iter().map(|it| it.id.clone()).collect();
    history.record_draw(&settings.learner, today, &ids);

    tracing::info!(
        learner = %settings.learner,
        only_wrong,
        pool = pool.len(),
        drawn = drawn.len(),
        "drew quiz"
    );
    drawn
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Score {
    pub correct: usize,
    pub total: usize,
}

impl Score {
    pub fn percent(&self) -> u32 {
        if self.total == 0 {
            0
        } else {
            ((self.correct as f64 / self.total as f64) * 100.0).round() as u32
        }
    }
}

/// One quiz in progress. Lives only in memory.
#[derive(Debug, Clone)]
pub struct QuizSession {
    pub items: Vec<IdiomRecord>,
    all: Vec<IdiomRecord>,
    idx: usize,
    score: usize,
    settings: LearnerSettings,
    only_wrong: bool,
    modes: ModeSet,
}

impl QuizSession {
    pub fn new(
        items: Vec<IdiomRecord>,
        all: Vec<IdiomRecord>,
        settings: LearnerSettings,
        only_wrong: bool,
    ) -> Self {
        let modes = ModeSet::new(&settings.modes);
        Self {
            items,
            all,
            idx: 0,
            score: 0,
            settings,
            only_wrong,
            modes,
        }
    }

    pub fn settings(&self) -> &LearnerSettings {
        &self.settings
    }

    pub fn only_wrong(&self) -> bool {
        self.only_wrong
    }

    #[cfg(test)]
    pub fn modes(&self) -> &ModeSet {
        &self.modes
    }

    pub fn position(&self) -> usize {
        self.idx
    }

    pub fn current(&self) -> Option<&IdiomRecord> {
        self.items.get(self.idx)
    }

    #[cfg(test)]
    pub fn is_finished(&self) -> bool {
        self.idx >= self.items.len()
    }

    /// Question for the current item, or `None` once the session is done.
    pub fn question<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Option<Question> {
        let item = self.items.get(self.idx)?;
        Some(generate_question(item, &self.all, &mut self.modes, rng))
    }

    /// Grades a response and bumps the score; the caller records misses.
    pub fn answer(&mut self, question: &Question, response: &Response) -> Evaluation {
        let eval = evaluate(question, response);
        if eval.correct {
            self.score += 1;
        }
        eval
    }

    pub fn advance(&mut self) {
        if self.idx < self.items.len() {
            self.idx += 1;
        }
    }

    pub fn score(&self) -> Score {
        Score {
            correct: self.score,
            total: self.items.len(),
        }
    }
}

/// Session operations backed by a key-value store.
pub struct QuizService<'a, S: KeyValueStore + ?Sized> {
    store: &'a S,
}

impl<'a, S: KeyValueStore + ?Sized> QuizService<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// Draws a session for the saved settings. `None` when nothing can be
    /// asked (empty pool or empty wrongbook).
    pub fn start_session<R: Rng + ?Sized>(
        &self,
        all: Vec<IdiomRecord>,
        only_wrong: bool,
        rng: &mut R,
    ) -> Result<Option<QuizSession>> {
        self.start_session_on(all, only_wrong, Local::now().date_naive(), rng)
    }

    pub fn start_session_on<R: Rng + ?Sized>(
        &self,
        all: Vec<IdiomRecord>,
        only_wrong: bool,
        today: NaiveDate,
        rng: &mut R,
    ) -> Result<Option<QuizSession>> {
        let settings = store::load_settings(self.store)?;
        let mut history = store::load_history(self.store)?;
        let wrongbook = store::load_wrongbook(self.store)?;

        let items = make_quiz(
            &all,
            &settings,
            &mut history,
            &wrongbook,
            only_wrong,
            today,
            rng,
        );
        store::save_history(self.store, &history)?;

        if items.is_empty() {
            return Ok(None);
        }
        Ok(Some(QuizSession::new(items, all, settings, only_wrong)))
    }

    /// Grades the answer and writes a miss to the wrongbook.
    pub fn submit(
        &self,
        session: &mut QuizSession,
        question: &Question,
        response: &Response,
    ) -> Result<Evaluation> {
        let eval = session.answer(question, response);
        if let Some(tag) = eval.miss_tag {
            self.record_miss(&session.settings.learner, &question.idiom_id, tag)?;
        }
        Ok(eval)
    }

    pub fn record_miss(&self, learner: &str, idiom_id: &str, tag: &str) -> Result<()> {
        let mut wrongbook = store::load_wrongbook(self.store)?;
        wrongbook.record_miss(learner, idiom_id, tag, Utc::now());
        tracing::debug!(learner, idiom_id, tag, "recorded miss");
        store::save_wrongbook(self.store, &wrongbook)
    }

    /// Removes an idiom from the learner's wrongbook. Returns whether it was there.
    pub fn clear_wrong(&self, learner: &str, idiom_id: &str) -> Result<bool> {
        let mut wrongbook = store::load_wrongbook(self.store)?;
        let removed = wrongbook.clear(learner, idiom_id);
        if removed {
            store::save_wrongbook(self.store, &wrongbook)?;
        }
        Ok(removed)
    }
}
