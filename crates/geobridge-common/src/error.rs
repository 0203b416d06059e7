use thiserror::Error;

pub type CommonResult<T> = Result<T, CommonError>;

#[derive(Debug, Error)]
pub enum CommonError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

impl CommonError {
    pub fn invalid(message: impl Into<String>) -> Self {
        CommonError::InvalidArgument(message.into())
    }
}

pub type DatasourceResult<T> = Result<T, DatasourceError>;

/// The single error kind a datasource surfaces to its host.
///
/// The variants only distinguish how the message was produced.
/// Hosts are expected to present [`DatasourceError::message`] and nothing else.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DatasourceError {
    #[error("Python: could not access {0} property")]
    MissingParameter(String),
    #[error("Python: {0} property is None")]
    NullParameter(String),
    #[error("Python: could not convert {field}: {reason}")]
    Conversion { field: String, reason: String },
    #[error("{0}")]
    Python(String),
    #[error("internal error: {0}")]
    Internal(String),
}

impl DatasourceError {
    pub fn missing(name: impl Into<String>) -> Self {
        DatasourceError::MissingParameter(name.into())
    }

    pub fn null(name: impl Into<String>) -> Self {
        DatasourceError::NullParameter(name.into())
    }

    pub fn conversion(field: impl Into<String>, reason: impl Into<String>) -> Self {
        DatasourceError::Conversion {
            field: field.into(),
            reason: reason.into(),
        }
    }

    pub fn python(message: impl Into<String>) -> Self {
        DatasourceError::Python(message.into())
    }

    pub fn internal(message: impl Into<String>) -> Self {
        DatasourceError::Internal(message.into())
    }

    pub fn message(&self) -> String {
        self.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_datasource_error_messages() {
        assert_eq!(
            DatasourceError::missing("envelope").message(),
            "Python: could not access envelope property"
        );
        assert_eq!(
            DatasourceError::null("envelope").message(),
            "Python: envelope property is None"
        );
        let error = DatasourceError::conversion("envelope.minx", "'str' object cannot be converted");
        assert!(error.message().starts_with("Python: could not convert envelope.minx"));
        assert_eq!(
            DatasourceError::python("Traceback ...").message(),
            "Traceback ..."
        );
    }
}
