use criterion::{black_box, criterion_group, criterion_main, Criterion};

use assessly_core::draft::Draft;
use assessly_core::model::{Assessment, GradedResult, Question, QuestionOutcome};
use assessly_core::results::ResultsView;
use assessly_core::submission::{format_submission, validate};

fn make_assessment(n: usize) -> Assessment {
    Assessment {
        id: "bench".into(),
        title: "Bench".into(),
        total_questions: n,
        questions: (0..n)
            .map(|i| Question {
                question_id: format!("q{i}").as_str().into(),
                question_text: format!("Question {i}?"),
                options: vec!["A".into(), "B".into(), "C".into(), "D".into()],
                explanation: Some(format!("Explanation {i}")),
            })
            .collect(),
    }
}

fn make_draft(assessment: &Assessment) -> Draft {
    let mut draft = Draft::new();
    for (i, q) in assessment.questions.iter().enumerate().rev() {
        draft.set(q.question_id.clone(), i % 4);
    }
    draft
}

fn make_result(assessment: &Assessment) -> GradedResult {
    GradedResult {
        score: (assessment.questions.len() / 2) as u32,
        total: assessment.questions.len() as u32,
        attempt_number: 1,
        results: assessment
            .questions
            .iter()
            .enumerate()
            .map(|(i, q)| QuestionOutcome {
                question_id: q.question_id.clone(),
                question_text: q.question_text.clone(),
                options: q.options.clone(),
                user_answer: i % 4,
                correct_answer: (i / 2) % 4,
                is_correct: i % 4 == (i / 2) % 4,
                explanation: q.explanation.clone(),
            })
            .collect(),
    }
}

fn bench_submission(c: &mut Criterion) {
    let mut group = c.benchmark_group("submission");

    for n in [10, 100, 500] {
        let assessment = make_assessment(n);
        let draft = make_draft(&assessment);

        group.bench_function(format!("validate n={n}"), |b| {
            b.iter(|| validate(black_box(&assessment), black_box(&draft)))
        });
        group.bench_function(format!("format n={n}"), |b| {
            b.iter(|| format_submission(black_box(&assessment), black_box(&draft)))
        });
    }

    group.finish();
}

fn bench_render(c: &mut Criterion) {
    let assessment = make_assessment(200);
    let result = make_result(&assessment);

    c.bench_function("render_text n=200", |b| {
        b.iter(|| ResultsView::new(black_box(&result)).render_text())
    });
}

criterion_group!(benches, bench_submission, bench_render);
criterion_main!(benches);
