//! Client-side routes each step sends the user to when it completes.

pub const HOME: &str = "/";
pub const UPLOAD: &str = "/upload-image";
pub const QUESTION: &str = "/question";
pub const STORY_THEME: &str = "/story-theme";

pub fn storybook(storybook_id: i64) -> String {
    format!("/storybook/{}", storybook_id)
}
