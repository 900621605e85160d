pub mod data_validation;
pub mod parameter_validation;

/// A check over some input that records a message for every failure it finds.
pub trait Validator {
    /// Run the checks, return `true` if all of them passed.
    fn validate(&mut self) -> bool;

    /// All the failure messages recorded so far, oldest first.
    fn errors(&self) -> &[String];

    /// The most recent failure, the one to report to the user.
    fn last_error(&self) -> Option<&str> {
        self.errors().last().map(|e| e.as_str())
    }
}
