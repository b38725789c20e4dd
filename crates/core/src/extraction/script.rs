//! Script template rendering.
//!
//! Templates use `${name}` placeholders; `$$` produces a literal `$`. Any
//! other `$` is copied through unchanged. An unknown placeholder is an error
//! so a typo never reaches the interpreter.

use std::collections::BTreeMap;
use std::path::Path;

use chrono::NaiveDate;

use super::error::ExtractionError;
use super::types::ExtractionRequest;

/// A loaded script template.
#[derive(Debug, Clone)]
pub struct ScriptTemplate {
    source: String,
}

impl ScriptTemplate {
    pub fn from_source(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
        }
    }

    /// Reads a template from disk.
    pub async fn load(path: &Path) -> Result<Self, ExtractionError> {
        let source = tokio::fs::read_to_string(path).await.map_err(|e| {
            ExtractionError::template(format!("cannot read {}: {}", path.display(), e))
        })?;
        Ok(Self::from_source(source))
    }

    /// Substitutes every placeholder from `vars`.
    pub fn render(&self, vars: &BTreeMap<&str, String>) -> Result<String, ExtractionError> {
        let mut out = String::with_capacity(self.source.len());
        let mut rest = self.source.as_str();

        while let Some(pos) = rest.find('$') {
            out.push_str(&rest[..pos]);
            let after = &rest[pos + 1..];

            if let Some(stripped) = after.strip_prefix('$') {
                out.push('$');
                rest = stripped;
            } else if let Some(body) = after.strip_prefix('{') {
                let end = body.find('}').ok_or_else(|| {
                    ExtractionError::template("unterminated placeholder".to_string())
                })?;
                let name = &body[..end];
                let value = vars.get(name).ok_or_else(|| {
                    ExtractionError::template(format!("unknown placeholder ${{{}}}", name))
                })?;
                out.push_str(value);
                rest = &body[end + 1..];
            } else {
                out.push('$');
                rest = after;
            }
        }

        out.push_str(rest);
        Ok(out)
    }
}

/// Values available to extraction and probe templates.
pub fn script_variables(request: &ExtractionRequest) -> BTreeMap<&'static str, String> {
    let mut vars = BTreeMap::new();
    vars.insert("start_date", request.range.start_str());
    vars.insert("end_date", request.range.end_str());
    vars.insert("download_dir", request.download_dir.display().to_string());
    vars.insert("output_filename", request.output_filename.clone());
    vars.insert("target_file", request.target_file().display().to_string());
    vars.insert("max_wait_seconds", request.max_wait.as_secs().to_string());
    vars.insert("attempt", request.attempt.to_string());
    vars.insert(
        "generated_at",
        request.generated_at.format("%Y-%m-%d %H:%M:%S").to_string(),
    );
    vars
}

/// Expands `{date}` in an output file name pattern as `MM-DD-YYYY`.
pub fn render_output_filename(pattern: &str, day: NaiveDate) -> String {
    pattern.replace("{date}", &day.format("%m-%d-%Y").to_string())
}
