/// A trial that did not leave a usable result behind.
#[derive(Debug, thiserror::Error)]
pub enum TrialError {
    #[error("Trial {trial} failed: {diagnostic}")]
    Failed { trial: usize, diagnostic: String },
}

impl TrialError {
    pub fn failed(trial: usize, diagnostic: Option<&str>) -> Self {
        TrialError::Failed {
            trial,
            diagnostic: diagnostic.unwrap_or("unknown error").to_string(),
        }
    }
}
