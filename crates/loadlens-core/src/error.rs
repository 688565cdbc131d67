#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Template error: {0}")]
    Template(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_error_display() {
        let err = ReportError::Config("profiles must be an object".to_string());
        assert_eq!(err.to_string(), "Config error: profiles must be an object");
    }

    #[test]
    fn template_error_display() {
        let err = ReportError::Template("template is empty".to_string());
        assert_eq!(err.to_string(), "Template error: template is empty");
    }

    #[test]
    fn io_error_from_std() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: ReportError = io_err.into();
        let msg = err.to_string();
        assert!(msg.contains("IO error"));
        assert!(msg.contains("file not found"));
    }

    #[test]
    fn serde_error_from_json() {
        let json_err = serde_json::from_str::<serde_json::Value>("not valid json").unwrap_err();
        let err: ReportError = json_err.into();
        assert!(err.to_string().contains("Serialization error"));
    }

    #[test]
    fn error_is_debug() {
        let err = ReportError::Template("test".to_string());
        let debug = format!("{:?}", err);
        assert!(debug.contains("Template"));
    }
}
