use serde::Serialize;
use serde_json::{json, Value};

/// How command results are printed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    Human,
    Json,
}

impl OutputMode {
    pub fn from_flag(json: bool) -> Self {
        if json { OutputMode::Json } else { OutputMode::Human }
    }

    pub fn is_human(&self) -> bool {
        *self == OutputMode::Human
    }
}

pub fn success_envelope(command: &str, data: Value) -> Value {
    json!({
        "ok": true,
        "command": command,
        "data": data,
    })
}

pub fn error_envelope(command: &str, kind: &str, message: &str) -> Value {
    json!({
        "ok": false,
        "command": command,
        "error": {
            "kind": kind,
            "message": message,
        },
    })
}

/// Print `data` wrapped in the success envelope (JSON mode only)
pub fn emit_success<T: Serialize>(mode: OutputMode, command: &str, data: &T) -> anyhow::Result<()> {
    if mode == OutputMode::Json {
        let envelope = success_envelope(command, serde_json::to_value(data)?);
        println!("{}", serde_json::to_string_pretty(&envelope)?);
    }
    Ok(())
}

/// Tag an `anyhow` error for the error envelope
pub fn error_kind(err: &anyhow::Error) -> &'static str {
    match err.downcast_ref::<crate::Error>() {
        Some(e) => e.kind(),
        None => "error",
    }
}

pub fn emit_error(mode: OutputMode, command: &str, err: &anyhow::Error) {
    match mode {
        OutputMode::Json => {
            let envelope = error_envelope(command, error_kind(err), &err.to_string());
            println!("{}", serde_json::to_string_pretty(&envelope).unwrap_or_default());
        }
        OutputMode::Human => crate::ui::error(&err.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kind_from_store_error() {
        let err = anyhow::Error::new(crate::Error::SourceNotFound("x".into()));
        assert_eq!(error_kind(&err), "source_not_found");
        assert_eq!(error_kind(&anyhow::anyhow!("plain")), "error");
    }

    #[test]
    fn test_envelopes() {
        let ok = success_envelope("stats", json!({"total_sources": 0}));
        assert_eq!(ok["ok"], true);
        assert_eq!(ok["data"]["total_sources"], 0);

        let err = error_envelope("show", "source_not_found", "Source not found: x");
        assert_eq!(err["ok"], false);
        assert_eq!(err["error"]["kind"], "source_not_found");
    }
}
