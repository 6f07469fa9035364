mod course;
mod jwt;
mod language;
mod user;
mod word;

pub use course::{Course, CoursePatch};
pub use jwt::{JwtCredential, JWT_DATE_FORMAT};
pub use language::{Language, LanguagePatch};
pub use user::{User, UserPatch};
pub use word::{Word, WordPatch};
