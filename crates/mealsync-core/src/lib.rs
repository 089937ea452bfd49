mod error;

pub use error::{ErrorKind, ExitCode, MealError, MealResult};
