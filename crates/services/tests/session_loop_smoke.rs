use chrono::Duration;

use quiz_core::model::{ChoiceDraft, QuestionDraft, QuizId, QuizSettings, SubjectKey};
use quiz_core::time::fixed_clock;
use services::{QuizSession, QuizSessionService, ResultHistoryService, SubjectPools};

fn pools() -> SubjectPools {
    let subject = |module, subject, n: u32| {
        let drafts = (0..n)
            .map(|i| {
                QuestionDraft::new(
                    format!("m{module}s{subject}q{i}"),
                    vec![
                        ChoiceDraft::new("wrong", false),
                        ChoiceDraft::new("right", true),
                        ChoiceDraft::new("", true),
                    ],
                )
            })
            .collect();
        (SubjectKey::new(module, subject), drafts)
    };
    [subject(0, 0, 3), subject(0, 1, 2)].into_iter().collect()
}

fn service() -> QuizSessionService {
    QuizSessionService::in_memory(fixed_clock(), QuizSettings::default())
}

async fn play(svc: &mut QuizSessionService, session: &mut QuizSession, skip_at: Option<usize>) {
    let mut position = 0;
    while !session.is_complete() {
        let question = session.tracker().frontier().unwrap().clone();
        svc.clock_mut().advance(Duration::seconds(2));
        let step = if skip_at == Some(position) {
            svc.skip(session, &question.id).await.unwrap()
        } else {
            let right = question.correct_choices().next().unwrap();
            svc.answer(session, &question.id, &right.id).await.unwrap()
        };
        assert!(step.outcome.is_ok());
        position += 1;
    }
}

#[tokio::test]
async fn all_correct_session_persists_result() {
    let mut svc = service();
    let quiz = QuizId::new("geo").unwrap();
    let mut session = svc.start(quiz.clone(), &pools()).unwrap();
    assert_eq!(session.tracker().state().total(), 5);

    play(&mut svc, &mut session, None).await;

    let result = session.result().unwrap();
    assert_eq!(
        (result.correct(), result.incorrect(), result.unanswered(), result.total()),
        (5, 0, 0, 5)
    );
    assert_eq!(result.elapsed_ms(), Some(10_000));
    assert_eq!(result.duration_stats().sum_ms(), Some(10_000));

    let history = ResultHistoryService::new(fixed_clock(), svc.results());
    let latest = history.latest(&quiz).await.unwrap().unwrap();
    assert_eq!(&latest, result);
}

#[tokio::test]
async fn skipping_the_third_question_leaves_it_unanswered() {
    let mut svc = service();
    let quiz = QuizId::new("geo").unwrap();
    let mut session = svc.start(quiz.clone(), &pools()).unwrap();

    play(&mut svc, &mut session, Some(2)).await;

    let result = session.result().unwrap();
    assert_eq!(
        (result.correct(), result.incorrect(), result.unanswered(), result.total()),
        (4, 0, 1, 5)
    );
    assert_eq!(session.progress().skipped, 1);
    assert_eq!(session.history_index(), Some(0));
}

#[tokio::test]
async fn consecutive_sessions_append_to_history() {
    let mut svc = service();
    let quiz = QuizId::new("geo").unwrap();

    for skip in [None, Some(0)] {
        let mut session = svc.start(quiz.clone(), &pools()).unwrap();
        play(&mut svc, &mut session, skip).await;
    }

    let history = ResultHistoryService::new(fixed_clock(), svc.results());
    let items = history.list_recent(&quiz, 10).await.unwrap();
    let correct: Vec<u32> = items.iter().map(|i| i.correct).collect();
    assert_eq!(correct, vec![4, 5]);
}
