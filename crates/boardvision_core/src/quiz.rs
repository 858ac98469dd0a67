//! crates/boardvision_core/src/quiz.rs
//!
//! Scoring of a submitted quiz.

use std::collections::HashMap;

use serde::Serialize;

use crate::domain::QuizQuestion;

/// Letter grade derived from the fraction of correct answers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Grade {
    S,
    A,
    B,
    C,
}

impl Grade {
    pub fn from_score(score: usize, total: usize) -> Self {
        if total == 0 {
            return Self::C;
        }
        let ratio = score as f64 / total as f64;
        if ratio >= 0.9 {
            Self::S
        } else if ratio >= 0.8 {
            Self::A
        } else if ratio >= 0.7 {
            Self::B
        } else {
            Self::C
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QuizScore {
    pub score: usize,
    pub total: usize,
    pub grade: Grade,
}

/// Counts the questions whose recorded answer is the correct one.
/// Unanswered questions and unknown ids count as wrong.
pub fn score(quiz: &[QuizQuestion], answers: &HashMap<String, usize>) -> usize {
    quiz.iter()
        .filter(|q| answers.get(&q.id) == Some(&q.correct_answer_index))
        .count()
}

pub fn evaluate(quiz: &[QuizQuestion], answers: &HashMap<String, usize>) -> QuizScore {
    let score = score(quiz, answers);
    QuizScore {
        score,
        total: quiz.len(),
        grade: Grade::from_score(score, quiz.len()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn question(id: &str, correct: usize) -> QuizQuestion {
        QuizQuestion {
            id: id.to_string(),
            question: format!("Question {}", id),
            options: vec!["a".into(), "b".into(), "c".into(), "d".into()],
            correct_answer_index: correct,
            explanation: String::new(),
        }
    }

    #[test]
    fn test_score_counts_matching_answers() {
        let quiz = vec![question("q1", 0), question("q2", 1), question("q3", 2)];
        let answers = HashMap::from([
            ("q1".to_string(), 0),
            ("q2".to_string(), 3),
            ("q3".to_string(), 2),
            ("other".to_string(), 1),
        ]);
        assert_eq!(score(&quiz, &answers), 2);
    }

    #[test]
    fn test_score_is_bounded() {
        let quiz: Vec<QuizQuestion> = (0..5).map(|i| question(&format!("q{}", i), i % 4)).collect();
        let none = HashMap::new();
        assert_eq!(score(&quiz, &none), 0);

        let all: HashMap<String, usize> = quiz
            .iter()
            .map(|q| (q.id.clone(), q.correct_answer_index))
            .collect();
        assert_eq!(score(&quiz, &all), quiz.len());
    }

    #[test]
    fn test_grade_thresholds() {
        assert_eq!(Grade::from_score(9, 10), Grade::S);
        assert_eq!(Grade::from_score(4, 5), Grade::A);
        assert_eq!(Grade::from_score(7, 10), Grade::B);
        assert_eq!(Grade::from_score(3, 5), Grade::C);
        assert_eq!(Grade::from_score(0, 0), Grade::C);
    }

    #[test]
    fn test_evaluate() {
        let quiz = vec![question("q1", 1)];
        let answers = HashMap::from([("q1".to_string(), 1)]);
        assert_eq!(
            evaluate(&quiz, &answers),
            QuizScore {
                score: 1,
                total: 1,
                grade: Grade::S
            }
        );
    }
}
