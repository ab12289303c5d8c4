//! Records exchanged between the stores and the HTTP layer

pub mod catalog;
pub mod quiz;
pub mod user;

pub use catalog::{Language, NewLanguage, NewStatus, Status};
pub use quiz::{NewQuiz, NewQuizResult, Quiz, QuizResult};
pub use user::{NewUser, UpdateUser, User, UserField};
