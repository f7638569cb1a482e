use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng, rng};
use std::collections::BTreeMap;

use quiz_core::model::{Question, QuestionDraft, QuizSettings, SubjectKey};

/// Question pools keyed by subject. Key order is the round-robin visiting order.
pub type SubjectPools = BTreeMap<SubjectKey, Vec<QuestionDraft>>;

/// Output of a composition.
#[derive(Debug, Clone, PartialEq)]
pub struct ComposedQuiz {
    pub questions: Vec<Question>,
    /// How many questions each subject contributed.
    pub per_subject: BTreeMap<SubjectKey, usize>,
}

impl ComposedQuiz {
    /// Total number of questions in this quiz.
    #[must_use]
    pub fn total(&self) -> usize {
        self.questions.len()
    }

    /// Returns true when no question could be drawn.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }
}

/// Builds a custom quiz by drawing round-robin from several subject pools.
///
/// Each pool is copied, shuffled, and drained one question per visit until the
/// quiz is full or every pool is empty. The caller's pools are never modified.
#[derive(Debug, Clone)]
pub struct QuizComposer {
    max_total: usize,
    shuffle: bool,
}

impl QuizComposer {
    #[must_use]
    pub fn new(settings: &QuizSettings) -> Self {
        Self {
            max_total: usize::try_from(settings.max_total()).unwrap_or(usize::MAX),
            shuffle: settings.shuffle(),
        }
    }

    #[must_use]
    pub fn with_max_total(mut self, max_total: usize) -> Self {
        self.max_total = max_total;
        self
    }

    /// Enable or disable shuffling inside each subject before drawing.
    #[must_use]
    pub fn with_shuffle(mut self, shuffle: bool) -> Self {
        self.shuffle = shuffle;
        self
    }

    /// Compose using the thread-local RNG.
    #[must_use]
    pub fn compose(&self, pools: &SubjectPools) -> ComposedQuiz {
        self.compose_with_rng(pools, &mut rng())
    }

    /// Compose deterministically: the same seed and pools give the same quiz.
    #[must_use]
    pub fn compose_with_seed(&self, pools: &SubjectPools, seed: u64) -> ComposedQuiz {
        self.compose_with_rng(pools, &mut StdRng::seed_from_u64(seed))
    }

    pub fn compose_with_rng<R: Rng + ?Sized>(
        &self,
        pools: &SubjectPools,
        rng: &mut R,
    ) -> ComposedQuiz {
        let mut stacks: Vec<(SubjectKey, Vec<Question>)> = pools
            .iter()
            .map(|(key, drafts)| (*key, self.prepare_pool(*key, drafts, rng)))
            .collect();

        let available: usize = stacks.iter().map(|(_, s)| s.len()).sum();
        let mut questions = Vec::with_capacity(available.min(self.max_total));
        let mut per_subject = BTreeMap::new();

        'rounds: loop {
            let mut drew_any = false;
            for (key, stack) in &mut stacks {
                if questions.len() >= self.max_total {
                    break 'rounds;
                }
                if let Some(question) = stack.pop() {
                    questions.push(question);
                    *per_subject.entry(*key).or_insert(0) += 1;
                    drew_any = true;
                }
            }
            if !drew_any {
                break;
            }
        }

        tracing::debug!(
            subjects = pools.len(),
            available,
            composed = questions.len(),
            max_total = self.max_total,
            "composed quiz"
        );

        ComposedQuiz {
            questions,
            per_subject,
        }
    }

    /// Assigns ids from the original positions, drops invalid drafts, and
    /// returns the pool as a stack whose next draw is at the end.
    fn prepare_pool<R: Rng + ?Sized>(
        &self,
        key: SubjectKey,
        drafts: &[QuestionDraft],
        rng: &mut R,
    ) -> Vec<Question> {
        let mut pool: Vec<Question> = drafts
            .iter()
            .zip(0_u32..)
            .filter(|(draft, index)| {
                let valid = draft.is_valid();
                if !valid {
                    tracing::debug!(subject = %key, index, "dropping invalid question");
                }
                valid
            })
            .map(|(draft, index)| draft.assign_id(key.question_id(index)))
            .collect();

        if self.shuffle {
            pool.as_mut_slice().shuffle(rng);
        }
        pool.reverse();
        pool
    }
}

impl Default for QuizComposer {
    fn default() -> Self {
        Self::new(&QuizSettings::default())
    }
}

/// Compose a shuffled quiz of at most `max_total` questions.
#[must_use]
pub fn compose_quiz(pools: &SubjectPools, max_total: usize) -> Vec<Question> {
    QuizComposer::default()
        .with_max_total(max_total)
        .compose(pools)
        .questions
}

#[cfg(test)]
mod tests {
    use super::*;
    use quiz_core::model::{ChoiceDraft, QuestionId};
    use std::collections::HashSet;

    fn draft(text: &str) -> QuestionDraft {
        QuestionDraft::new(
            text,
            vec![ChoiceDraft::new("right", true), ChoiceDraft::new("wrong", false)],
        )
    }

    fn pool(prefix: &str, n: usize) -> Vec<QuestionDraft> {
        (0..n).map(|i| draft(&format!("{prefix}{i}"))).collect()
    }

    fn pools(sizes: &[usize]) -> SubjectPools {
        sizes
            .iter()
            .enumerate()
            .map(|(i, n)| {
                let subject = u32::try_from(i).unwrap();
                (SubjectKey::new(0, subject), pool(&format!("s{i}q"), *n))
            })
            .collect()
    }

    #[test]
    fn output_size_is_min_of_cap_and_available() {
        let p = pools(&[3, 2, 7]);
        for cap in [0, 1, 5, 12, 100] {
            let quiz = QuizComposer::default()
                .with_max_total(cap)
                .compose_with_seed(&p, 7);
            assert_eq!(quiz.total(), cap.min(12));
        }
    }

    #[test]
    fn size_and_uniqueness_hold_for_any_seed() {
        let p = pools(&[5, 1, 0, 8]);
        for seed in [0, 1, 2, 99, 12_345, u64::MAX] {
            for cap in [1, 3, 14, 50] {
                let quiz = QuizComposer::default()
                    .with_max_total(cap)
                    .compose_with_seed(&p, seed);
                assert_eq!(quiz.total(), cap.min(14), "seed {seed} cap {cap}");
                let ids: HashSet<_> = quiz.questions.iter().map(|q| q.id.clone()).collect();
                assert_eq!(ids.len(), quiz.total(), "seed {seed} cap {cap}");
                assert_eq!(quiz.per_subject.values().sum::<usize>(), quiz.total());
            }
        }

        let thread_rng_quiz = QuizComposer::default().compose(&p);
        assert_eq!(thread_rng_quiz.total(), 14);
    }

    #[test]
    fn ids_are_unique_and_composite() {
        let quiz = QuizComposer::default().compose_with_seed(&pools(&[4, 4, 4]), 1);
        let ids: HashSet<_> = quiz.questions.iter().map(|q| q.id.clone()).collect();
        assert_eq!(ids.len(), 12);
        assert!(quiz.questions.iter().all(|q| q.id.parts().is_ok()));
    }

    #[test]
    fn same_seed_same_quiz() {
        let p = pools(&[5, 6]);
        let composer = QuizComposer::default();
        assert_eq!(composer.compose_with_seed(&p, 42), composer.compose_with_seed(&p, 42));
    }

    #[test]
    fn ids_follow_original_positions_not_shuffle_order() {
        let p = pools(&[6]);
        let quiz = QuizComposer::default().compose_with_seed(&p, 3);
        for q in &quiz.questions {
            let (_, _, index) = q.id.parts().unwrap();
            assert_eq!(q.question, format!("s0q{index}"));
        }
    }

    #[test]
    fn round_robin_alternates_subjects() {
        let p = pools(&[3, 3]);
        let quiz = QuizComposer::default().compose_with_seed(&p, 9);
        let subjects: Vec<u32> = quiz
            .questions
            .iter()
            .map(|q| q.id.subject().unwrap().subject_index)
            .collect();
        assert_eq!(subjects, vec![0, 1, 0, 1, 0, 1]);
    }

    #[test]
    fn uneven_pools_drain_the_larger_one_last() {
        let p = pools(&[1, 4]);
        let quiz = QuizComposer::default()
            .with_shuffle(false)
            .compose_with_seed(&p, 0);
        let ids: Vec<String> = quiz.questions.iter().map(|q| q.id.to_string()).collect();
        assert_eq!(ids, vec!["0-0-0", "0-1-0", "0-1-1", "0-1-2", "0-1-3"]);
        assert_eq!(quiz.per_subject[&SubjectKey::new(0, 0)], 1);
        assert_eq!(quiz.per_subject[&SubjectKey::new(0, 1)], 4);
    }

    #[test]
    fn invalid_drafts_are_skipped_without_renumbering() {
        let mut p = SubjectPools::new();
        p.insert(
            SubjectKey::new(2, 1),
            vec![draft("ok"), QuestionDraft::new("", vec![]), draft("also ok")],
        );
        let quiz = QuizComposer::default()
            .with_shuffle(false)
            .compose_with_seed(&p, 0);
        let ids: Vec<QuestionId> = quiz.questions.into_iter().map(|q| q.id).collect();
        assert_eq!(
            ids,
            vec![QuestionId::compose(2, 1, 0), QuestionId::compose(2, 1, 2)]
        );
    }

    #[test]
    fn empty_pools_compose_nothing() {
        assert!(compose_quiz(&SubjectPools::new(), 100).is_empty());
        let quiz = QuizComposer::default().compose(&pools(&[0, 0]));
        assert!(quiz.is_empty());
        assert!(quiz.per_subject.is_empty());
    }

    #[test]
    fn caller_pools_are_untouched() {
        let p = pools(&[4, 2]);
        let before = p.clone();
        let _ = compose_quiz(&p, 3);
        assert_eq!(p, before);
    }
}
