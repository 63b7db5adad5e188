pub mod schema;
pub mod store;

pub use schema::{MoodEvent, NewMoodEvent, normalize_emotion};
pub use store::{EmotionTally, MoodRecordStore, SqliteMoodStore};
