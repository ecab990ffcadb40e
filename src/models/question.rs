use serde::Deserialize;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Question {
    pub text: String,
    pub answer: String,
}

impl Question {
    pub fn new(text: impl Into<String>, answer: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            answer: answer.into(),
        }
    }
}

/// Round-robin question table. Never empty.
#[derive(Debug, Clone)]
pub struct QuestionBank {
    questions: Vec<Question>,
}

impl QuestionBank {
    /// Returns `None` for an empty table.
    pub fn new(questions: Vec<Question>) -> Option<Self> {
        if questions.is_empty() {
            None
        } else {
            Some(Self { questions })
        }
    }

    pub fn len(&self) -> usize {
        self.questions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    /// Question for a 1-based round number. Round 0 is treated as round 1.
    pub fn pick(&self, round: u32) -> &Question {
        let idx = round.max(1) as usize - 1;
        &self.questions[idx % self.questions.len()]
    }
}

impl Default for QuestionBank {
    fn default() -> Self {
        Self {
            questions: vec![
                Question::new("Which way does the opening of a Snellen E point?", "right"),
                Question::new(
                    "Where does a myopic eye bring light to focus?",
                    "in front of the retina",
                ),
                Question::new(
                    "What does the Jackson cross-cylinder test refine?",
                    "cylinder axis and power",
                ),
            ],
        }
    }
}
