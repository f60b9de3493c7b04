use crate::envelope::AlertEnvelope;
use regex::Regex;
use serde::Serialize;
use std::fmt::{Display, Formatter};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MessageError {
    #[error("could not resolve event region")]
    UnresolvedRegion,
    #[error("invalid subscription filter pattern: {0}")]
    Pattern(#[from] regex::Error),
    #[error("could not serialize chatbot message: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Which service an alert is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Subject {
    Codesets,
    CodesetsCache,
    EscoApi,
    Unknown,
}

// checked in order, first match wins
const SUBJECT_PATTERNS: [(&str, Subject); 3] = [
    ("codesets-LambdaAtEdge", Subject::Codesets),
    ("codesets-CacheUpdaterFunction", Subject::CodesetsCache),
    ("escoApi", Subject::EscoApi),
];

impl Subject {
    pub fn classify(log_group: &str) -> Self {
        SUBJECT_PATTERNS
            .iter()
            .find(|(pattern, _)| log_group.contains(pattern))
            .map(|(_, subject)| *subject)
            .unwrap_or(Subject::Unknown)
    }

    pub fn label(&self) -> &'static str {
        match self {
            Subject::Codesets => "Codesets",
            Subject::CodesetsCache => "Codesets cache",
            Subject::EscoApi => "Esco API",
            Subject::Unknown => "Unknown",
        }
    }

    pub fn has_dashboard(&self) -> bool {
        matches!(self, Subject::Codesets | Subject::EscoApi)
    }
}

impl Display for Subject {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Lambda@Edge logs land in the edge region, and the event does not say
/// which one. Our subscription filters are named
/// `{service}-EdgeRegion-CloudWatchLogSubFilter-{region}-{stage}-{suffix}`,
/// so the region is read from the first filter name.
pub fn resolve_event_region(
    subscription_filters: &[String],
    stage: &str,
    primary_region: &str,
) -> Result<String, MessageError> {
    let mut region = primary_region.to_string();

    if let Some(filter) = subscription_filters.first() {
        let pattern = Regex::new(&format!(
            "(.*)-EdgeRegion-CloudWatchLogSubFilter-(.*)-{}-(.*)",
            regex::escape(stage)
        ))?;
        if let Some(captures) = pattern.captures(filter) {
            region = captures.get(2).map_or("", |m| m.as_str()).to_string();
        }
    }

    if region.is_empty() {
        return Err(MessageError::UnresolvedRegion);
    }
    Ok(region)
}

pub fn log_events_url(region: &str, log_group: &str, log_stream: &str) -> String {
    format!(
        "https://console.aws.amazon.com/cloudwatch/home?region={}#logEventViewer:group={};stream={}",
        region, log_group, log_stream
    )
}

pub fn dashboard_url(subject: Subject, primary_region: &str, stage: &str) -> Option<String> {
    subject.has_dashboard().then(|| {
        format!(
            "https://{0}.console.aws.amazon.com/cloudwatch/home?region={0}#dashboards/dashboard/codesets-dashboard-{1}",
            primary_region, stage
        )
    })
}

/// Cosmetic cleanup of a JSON-encoded message: turns escaped newlines, tabs
/// and quotes back into the real characters and drops the outer quotes.
pub fn unescape_message(text: &str) -> String {
    let text = text
        .replace("\\\n", "\n")
        .replace("\\n", "\n")
        .replace("\\t", "\t")
        .replace("\\\"", "\"");
    let text = text.strip_prefix('"').unwrap_or(&text);
    text.strip_suffix('"').unwrap_or(text).to_string()
}

/// AWS Chatbot custom notification payload.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatbotCustomFormat {
    pub version: &'static str,
    pub source: &'static str,
    pub content: ChatbotContent,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatbotContent {
    pub title: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keywords: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_steps: Option<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AlertMessage {
    pub subject: Subject,
    pub email_body: String,
    pub chatbot: ChatbotCustomFormat,
}

impl AlertMessage {
    /// SNS subject line shared by every channel.
    pub fn sns_subject(&self) -> String {
        format!("{} Error!", self.subject)
    }

    pub fn chatbot_json(&self) -> Result<String, MessageError> {
        Ok(serde_json::to_string(&self.chatbot)?)
    }
}

pub struct AlertMessageBuilder<'a> {
    stage: &'a str,
    primary_region: &'a str,
}

impl<'a> AlertMessageBuilder<'a> {
    pub fn new(stage: &'a str, primary_region: &'a str) -> Self {
        Self {
            stage,
            primary_region,
        }
    }

    pub fn build(&self, envelope: &AlertEnvelope) -> Result<AlertMessage, MessageError> {
        let message = serde_json::to_string_pretty(&envelope.message)?;
        let subject = Subject::classify(&envelope.log_group);
        let dashboard = dashboard_url(subject, self.primary_region, self.stage);
        let region = resolve_event_region(&envelope.subscription_filters, self.stage, self.primary_region)?;
        let log_url = log_events_url(&region, &envelope.log_group, &envelope.log_stream);
        let text = unescape_message(&message);

        let mut email_body = format!("{}\n\nView in AWS console: {}", text, log_url);
        if let Some(dashboard) = &dashboard {
            email_body.push_str(&format!("\n\nView dashboard: {}", dashboard));
        }

        // https://api.slack.com/reference/surfaces/formatting#links-in-retrieved-messages
        let mut next_steps = vec![format!("<{}|View in AWS console>", log_url)];
        if let Some(dashboard) = &dashboard {
            next_steps.push(format!("<{}|View dashboard>", dashboard));
        }

        Ok(AlertMessage {
            subject,
            email_body,
            chatbot: ChatbotCustomFormat {
                version: "1.0",
                source: "custom",
                content: ChatbotContent {
                    title: format!(":boom: {} Error! :boom:", subject),
                    description: format!("```{}", text),
                    keywords: Some(vec![format!("Virtual Finland {}", self.stage), subject.to_string()]),
                    next_steps: Some(next_steps),
                },
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn classifies_subjects() {
        assert_eq!(Subject::classify("codesets-LambdaAtEdge-123"), Subject::Codesets);
        assert_eq!(Subject::classify("codesets-CacheUpdaterFunction-xyz"), Subject::CodesetsCache);
        assert_eq!(Subject::classify("escoApi-handler"), Subject::EscoApi);
        assert_eq!(Subject::classify("/aws/lambda/users-api"), Subject::Unknown);
        assert_eq!(Subject::CodesetsCache.to_string(), "Codesets cache");
    }

    #[test]
    fn resolves_region_from_filter_name() {
        let filters = vec!["codesets-EdgeRegion-CloudWatchLogSubFilter-eu-central-1-dev-abc123".to_string()];
        assert_eq!(resolve_event_region(&filters, "dev", "eu-north-1").unwrap(), "eu-central-1");
    }

    #[test]
    fn falls_back_to_primary_region() {
        assert_eq!(resolve_event_region(&[], "dev", "eu-north-1").unwrap(), "eu-north-1");
        let other = vec!["some-other-filter".to_string()];
        assert_eq!(resolve_event_region(&other, "dev", "eu-north-1").unwrap(), "eu-north-1");
    }

    #[test]
    fn no_region_is_an_error() {
        assert!(matches!(
            resolve_event_region(&[], "dev", ""),
            Err(MessageError::UnresolvedRegion)
        ));
    }

    #[test]
    fn unescapes_encoded_message() {
        let encoded = serde_json::to_string(&json!("line one\nline\ttwo \"quoted\"")).unwrap();
        assert_eq!(unescape_message(&encoded), "line one\nline\ttwo \"quoted\"");
        assert_eq!(unescape_message("no quotes"), "no quotes");
    }

    fn envelope(log_group: &str) -> AlertEnvelope {
        AlertEnvelope {
            log_group: log_group.to_string(),
            log_stream: "2024/03/01/stream".to_string(),
            subscription_filters: vec![],
            message: json!("ERROR something broke"),
        }
    }

    #[test]
    fn builds_email_with_dashboard_link() {
        let message = AlertMessageBuilder::new("dev", "eu-north-1")
            .build(&envelope("codesets-LambdaAtEdge-123"))
            .unwrap();
        assert_eq!(message.sns_subject(), "Codesets Error!");
        assert_eq!(
            message.email_body,
            "ERROR something broke\n\n\
             View in AWS console: https://console.aws.amazon.com/cloudwatch/home?region=eu-north-1#logEventViewer:group=codesets-LambdaAtEdge-123;stream=2024/03/01/stream\n\n\
             View dashboard: https://eu-north-1.console.aws.amazon.com/cloudwatch/home?region=eu-north-1#dashboards/dashboard/codesets-dashboard-dev"
        );
    }

    #[test]
    fn structured_message_keeps_field_order() {
        let mut envelope = envelope("escoApi-handler");
        envelope.message = serde_json::from_str(r#"{"level":"error","code":500,"cause":"timeout"}"#).unwrap();
        let message = AlertMessageBuilder::new("dev", "eu-north-1").build(&envelope).unwrap();
        assert!(message
            .email_body
            .starts_with("{\n  \"level\": \"error\",\n  \"code\": 500,\n  \"cause\": \"timeout\"\n}\n\n"));
    }

    #[test]
    fn unknown_subject_has_no_dashboard() {
        let message = AlertMessageBuilder::new("dev", "eu-north-1")
            .build(&envelope("/aws/lambda/users-api"))
            .unwrap();
        assert!(!message.email_body.contains("View dashboard"));
        assert_eq!(message.chatbot.content.next_steps.as_ref().map(Vec::len), Some(1));
    }

    #[test]
    fn chatbot_format_matches_custom_notification_schema() {
        let message = AlertMessageBuilder::new("staging", "eu-north-1")
            .build(&envelope("escoApi-handler"))
            .unwrap();
        let value: serde_json::Value = serde_json::from_str(&message.chatbot_json().unwrap()).unwrap();
        assert_eq!(value["version"], "1.0");
        assert_eq!(value["source"], "custom");
        assert_eq!(value["content"]["title"], ":boom: Esco API Error! :boom:");
        assert_eq!(value["content"]["description"], "```ERROR something broke");
        assert_eq!(value["content"]["keywords"], json!(["Virtual Finland staging", "Esco API"]));
        assert_eq!(value["content"]["nextSteps"].as_array().map(Vec::len), Some(2));
    }
}
