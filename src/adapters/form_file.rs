use crate::domain::model::FormData;
use crate::utils::error::{Result, ValidatorError};
use std::path::Path;

/// Reads applicant data from a flat `.json` or `.toml` object. Scalars are
/// stringified the way a form input would hold them; nulls are skipped.
pub fn load_form_data<P: AsRef<Path>>(path: P) -> Result<FormData> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path)?;

    let value: serde_json::Value = match path.extension().and_then(|ext| ext.to_str()) {
        Some("toml") => {
            let table: toml::Table =
                toml::from_str(&content).map_err(|e| ValidatorError::FormDataError {
                    message: format!("TOML parsing error: {}", e),
                })?;
            serde_json::to_value(table)?
        }
        _ => serde_json::from_str(&content)?,
    };

    form_data_from_value(value)
}

pub fn form_data_from_value(value: serde_json::Value) -> Result<FormData> {
    let serde_json::Value::Object(map) = value else {
        return Err(ValidatorError::FormDataError {
            message: "applicant data must be an object of field names to values".to_string(),
        });
    };

    let mut data = FormData::new();
    for (field, value) in map {
        let text = match value {
            serde_json::Value::Null => continue,
            serde_json::Value::String(s) => s,
            serde_json::Value::Bool(b) => b.to_string(),
            serde_json::Value::Number(n) => n.to_string(),
            _ => {
                return Err(ValidatorError::FormDataError {
                    message: format!("field '{}' must be a scalar value", field),
                })
            }
        };
        data.insert(field, text);
    }

    tracing::debug!("📂 Loaded {} form fields", data.len());
    Ok(data)
}
