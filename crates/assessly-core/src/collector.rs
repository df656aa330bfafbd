//! In-memory answer collection, mirrored into the draft store.

use std::sync::Arc;

use crate::draft::{Draft, DraftStore};
use crate::error::AnswerError;
use crate::model::{Assessment, QuestionId};

/// Holds the answers of one active attempt.
///
/// The only in-memory mutator of answers while an attempt is open. Every
/// accepted answer is written through to the [`DraftStore`] before
/// `set_answer` returns.
pub struct AnswerCollector {
    assessment: Arc<Assessment>,
    draft: Draft,
    store: DraftStore,
}

impl AnswerCollector {
    /// Start from whatever draft is stored for this assessment.
    ///
    /// Stored entries that no longer fit the assessment (unknown question,
    /// option index out of range) are dropped, in storage as well.
    pub fn seeded(assessment: Arc<Assessment>, store: DraftStore) -> Self {
        let mut draft = store.load(&assessment.id);
        let stale: Vec<QuestionId> = draft
            .iter()
            .filter(|(qid, option)| check(&assessment, qid, *option).is_err())
            .map(|(qid, _)| qid.clone())
            .collect();
        for qid in &stale {
            draft.remove(qid);
        }
        if !stale.is_empty() {
            tracing::warn!(
                assessment = %assessment.id,
                dropped = stale.len(),
                "dropped draft answers that do not match the assessment"
            );
            store.save(&assessment.id, &mut draft);
        }
        if !draft.is_empty() {
            tracing::info!(
                assessment = %assessment.id,
                answered = draft.len(),
                "resuming from saved draft"
            );
        }

        Self {
            assessment,
            draft,
            store,
        }
    }

    pub fn assessment(&self) -> &Arc<Assessment> {
        &self.assessment
    }

    pub fn draft(&self) -> &Draft {
        &self.draft
    }

    /// Record `option` for `question_id`, replacing any earlier choice.
    pub fn set_answer(&mut self, question_id: &QuestionId, option: usize) -> Result<(), AnswerError> {
        check(&self.assessment, question_id, option)?;
        self.draft.set(question_id.clone(), option);
        self.store.save(&self.assessment.id, &mut self.draft);
        Ok(())
    }

    pub fn answer(&self, question_id: &QuestionId) -> Option<usize> {
        self.draft.get(question_id)
    }

    /// Distinct questions with a recorded answer.
    pub fn answered_count(&self) -> usize {
        self.draft.len()
    }

    pub fn total_questions(&self) -> usize {
        self.assessment.total_questions
    }

    /// `answered / total`, or 0 for an empty assessment.
    pub fn progress_ratio(&self) -> f64 {
        match self.total_questions() {
            0 => 0.0,
            total => self.answered_count() as f64 / total as f64,
        }
    }

    /// Questions without an answer, in assessment order.
    pub fn unanswered(&self) -> Vec<&QuestionId> {
        self.assessment
            .questions
            .iter()
            .map(|q| &q.question_id)
            .filter(|qid| !self.draft.contains(qid))
            .collect()
    }

    /// Forget every answer, in memory and in storage.
    pub fn reset(&mut self) {
        self.draft = Draft::new();
        self.store.clear(&self.assessment.id);
    }
}

fn check(assessment: &Assessment, question_id: &QuestionId, option: usize) -> Result<(), AnswerError> {
    let question = assessment
        .question(question_id)
        .ok_or_else(|| AnswerError::UnknownQuestion(question_id.clone()))?;
    if option >= question.options.len() {
        return Err(AnswerError::OptionOutOfRange {
            question_id: question_id.clone(),
            index: option,
            option_count: question.options.len(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::sample_assessment;

    fn collector(store: &DraftStore) -> AnswerCollector {
        AnswerCollector::seeded(Arc::new(sample_assessment("a1", 3)), store.clone())
    }

    #[test]
    fn starts_empty_without_draft() {
        let c = collector(&DraftStore::in_memory());
        assert_eq!(c.answered_count(), 0);
        assert_eq!(c.progress_ratio(), 0.0);
        assert_eq!(c.unanswered().len(), 3);
    }

    #[test]
    fn every_answer_is_persisted() {
        let store = DraftStore::in_memory();
        let mut c = collector(&store);
        c.set_answer(&"q1".into(), 2).unwrap();
        c.set_answer(&"q1".into(), 3).unwrap();
        c.set_answer(&"q3".into(), 0).unwrap();

        assert_eq!(c.answered_count(), 2);
        assert!((c.progress_ratio() - 2.0 / 3.0).abs() < f64::EPSILON);
        assert_eq!(c.unanswered(), vec![&QuestionId::from("q2")]);

        let reloaded = collector(&store);
        assert_eq!(reloaded.answer(&"q1".into()), Some(3));
        assert_eq!(reloaded.answer(&"q3".into()), Some(0));
        assert_eq!(reloaded.answered_count(), 2);
    }

    #[test]
    fn rejects_invalid_answers_without_persisting() {
        let store = DraftStore::in_memory();
        let mut c = collector(&store);
        assert_eq!(
            c.set_answer(&"q9".into(), 0),
            Err(AnswerError::UnknownQuestion("q9".into()))
        );
        assert!(matches!(
            c.set_answer(&"q1".into(), 4),
            Err(AnswerError::OptionOutOfRange { option_count: 4, .. })
        ));
        assert_eq!(c.answered_count(), 0);
        assert!(store.load(&"a1".into()).is_empty());
    }

    #[test]
    fn seeding_drops_stale_entries() {
        let store = DraftStore::in_memory();
        let mut stale = Draft::new();
        stale.set("q1".into(), 1);
        stale.set("q2".into(), 7);
        stale.set("gone".into(), 0);
        store.save(&"a1".into(), &mut stale);

        let c = collector(&store);
        assert_eq!(c.answered_count(), 1);
        assert_eq!(c.answer(&"q1".into()), Some(1));

        let stored = store.inspect(&"a1".into()).unwrap().unwrap();
        assert_eq!(stored.answers.len(), 1);
        assert_eq!(stored.answers.get(&QuestionId::from("q1")), Some(&1));
    }

    #[test]
    fn reset_clears_memory_and_storage() {
        let store = DraftStore::in_memory();
        let mut c = collector(&store);
        c.set_answer(&"q2".into(), 1).unwrap();
        c.reset();
        assert_eq!(c.answered_count(), 0);
        assert!(store.load(&"a1".into()).is_empty());
    }
}
