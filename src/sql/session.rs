/// Per-session inputs of a translation.

use std::collections::HashMap;

use serde::Deserialize;

use crate::common::{Datum, PlanError, PlanResult};
use crate::config::{DEFAULT_CHARSET, DEFAULT_COLLATION};

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SessionContext {
    pub current_db: Option<String>,
    pub charset: String,
    pub collation: String,
    /// STRICT_TRANS_TABLES / STRICT_ALL_TABLES in effect.
    pub strict_mode: bool,
    pub user_vars: HashMap<String, Datum>,
    /// Prepared statement name to its parameter count.
    pub prepared: HashMap<String, usize>,
}

impl Default for SessionContext {
    fn default() -> Self {
        SessionContext {
            current_db: None,
            charset: DEFAULT_CHARSET.to_string(),
            collation: DEFAULT_COLLATION.to_string(),
            strict_mode: true,
            user_vars: HashMap::new(),
            prepared: HashMap::new(),
        }
    }
}

impl SessionContext {
    pub fn with_db(db: &str) -> Self {
        SessionContext { current_db: Some(db.to_string()), ..Default::default() }
    }

    pub fn from_json(text: &str) -> PlanResult<Self> {
        serde_json::from_str(text).map_err(|e| PlanError::Internal(format!("invalid session context: {}", e)))
    }

    pub fn current_db(&self) -> &str {
        self.current_db.as_deref().unwrap_or("")
    }

    pub fn user_var(&self, name: &str) -> Option<&Datum> {
        self.user_vars.get(&name.to_lowercase())
    }

    pub fn set_user_var(&mut self, name: &str, value: Datum) {
        self.user_vars.insert(name.to_lowercase(), value);
    }

    pub fn register_prepared(&mut self, name: &str, param_count: usize) {
        self.prepared.insert(name.to_lowercase(), param_count);
    }

    pub fn prepared_param_count(&self, name: &str) -> Option<usize> {
        self.prepared.get(&name.to_lowercase()).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_from_json_defaults() {
        let session = SessionContext::from_json(r#"{"current_db": "shop"}"#).unwrap();
        assert_eq!(session.current_db(), "shop");
        assert_eq!(session.charset, DEFAULT_CHARSET);
        assert!(session.strict_mode);
        assert!(SessionContext::from_json("{").is_err());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"current_db": "test", "strict_mode": false, "user_vars": {{"q": {{"String": "select 1"}}}}, "prepared": {{"s1": 2}}}}"#
        )
        .unwrap();
        let text = std::fs::read_to_string(file.path()).unwrap();
        let session = SessionContext::from_json(&text).unwrap();
        assert!(!session.strict_mode);
        assert_eq!(session.user_var("Q"), Some(&Datum::String("select 1".to_string())));
        assert_eq!(session.prepared_param_count("S1"), Some(2));
    }
}
