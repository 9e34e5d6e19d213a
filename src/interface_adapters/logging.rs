use crate::domain::{EventSink, LogLevel};

// Forwards core diagnostics to `tracing`. Known keys become event fields of their own.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

// Field names must be static, so the keys the crate logs are spelled out once here.
macro_rules! emit {
    ($level:expr, $context:expr, $message:expr, $fields:expr, $extra:expr) => {
        tracing::event!(
            $level,
            context = $context,
            action = $fields.get("action"),
            request_id = $fields.get("request_id"),
            network = $fields.get("network"),
            from = $fields.get("from"),
            to = $fields.get("to"),
            generation = $fields.get("generation"),
            epoch = $fields.get("epoch"),
            ticket = $fields.get("ticket"),
            kind = $fields.get("type"),
            error = $fields.get("error"),
            reason = $fields.get("reason"),
            pending = $fields.get("pending"),
            cancelled = $fields.get("cancelled"),
            timeout_ms = $fields.get("timeout_ms"),
            extra = $extra,
            "{}",
            $message
        )
    };
}

const KNOWN_KEYS: [&str; 14] = [
    "action",
    "request_id",
    "network",
    "from",
    "to",
    "generation",
    "epoch",
    "ticket",
    "type",
    "error",
    "reason",
    "pending",
    "cancelled",
    "timeout_ms",
];

struct Fields<'a>(&'a [(&'a str, String)]);

impl Fields<'_> {
    fn get(&self, key: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(name, _)| *name == key)
            .map(|(_, value)| value.as_str())
    }

    // Pairs without a dedicated field, as "k=v k=v".
    fn extra(&self) -> Option<String> {
        let rest: Vec<String> = self
            .0
            .iter()
            .filter(|(name, _)| !KNOWN_KEYS.contains(name))
            .map(|(name, value)| format!("{name}={value}"))
            .collect();
        (!rest.is_empty()).then(|| rest.join(" "))
    }
}

impl EventSink for TracingSink {
    fn log(&self, level: LogLevel, context: &str, message: &str, fields: &[(&str, String)]) {
        let fields = Fields(fields);
        let extra = fields.extra();
        let extra = extra.as_deref();
        match level {
            LogLevel::Debug => emit!(tracing::Level::DEBUG, context, message, fields, extra),
            LogLevel::Info => emit!(tracing::Level::INFO, context, message, fields, extra),
            LogLevel::Warn => emit!(tracing::Level::WARN, context, message, fields, extra),
            LogLevel::Error => emit!(tracing::Level::ERROR, context, message, fields, extra),
        }
    }
}
