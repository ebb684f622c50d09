use snafu::Snafu;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum MessagingError {
    #[snafu(display("invalid input on `{stage}`: {field} must not be blank"))]
    InvalidInput {
        stage: &'static str,
        field: &'static str,
    },
    #[snafu(display("messaging id '{raw}' is invalid for {id_type}"))]
    InvalidId {
        stage: &'static str,
        id_type: &'static str,
        raw: String,
        source: uuid::Error,
    },
}

pub type MessagingResult<T> = Result<T, MessagingError>;

/// Rejects blank (empty or whitespace-only) text fields.
pub(crate) fn ensure_present(
    value: &str,
    stage: &'static str,
    field: &'static str,
) -> MessagingResult<()> {
    snafu::ensure!(!value.trim().is_empty(), InvalidInputSnafu { stage, field });
    Ok(())
}
