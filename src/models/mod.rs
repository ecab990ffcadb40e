mod player;
mod question;

pub use player::PlayerId;
pub use question::{Question, QuestionBank};
