use serde::{Deserialize, Serialize};

/// Credential bundle handed to a chat view so it can connect to the chat
/// service directly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatCredentials {
    pub user_id: String,
    pub user_name: String,
    pub channel_id: String,
    pub token: String,
    pub api_key: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinBody {
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub lead_id: Option<String>,
    #[serde(default)]
    pub is_sales_admin: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageBody {
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranscriptBody {
    #[serde(default)]
    pub lead_id: Option<String>,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub message: Option<MessageBody>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeadDescQuery {
    #[serde(default)]
    pub lead_id: Option<String>,
}

/// A user record in the chat directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatUser {
    pub id: String,
    pub name: String,
    pub role: String,
}

/// One line of the transcript mirror.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranscriptEntry {
    pub lead_id: String,
    pub author: String,
    pub text: String,
}

impl TranscriptBody {
    pub fn into_entry(self) -> Option<TranscriptEntry> {
        let lead_id = self.lead_id.filter(|v| !v.trim().is_empty())?;
        let author = self.author?;
        let text = self.message?.text?;
        Some(TranscriptEntry {
            lead_id: lead_id.trim().to_string(),
            author,
            text,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn credentials_serialize_camel_case() {
        let creds = ChatCredentials {
            user_id: "ana".to_string(),
            user_name: "ana".to_string(),
            channel_id: "ana".to_string(),
            token: "t".to_string(),
            api_key: "k".to_string(),
        };
        assert_eq!(
            serde_json::to_value(&creds).expect("serialize"),
            json!({
                "userId": "ana",
                "userName": "ana",
                "channelId": "ana",
                "token": "t",
                "apiKey": "k"
            })
        );
    }

    #[test]
    fn transcript_body_requires_lead_author_and_text() {
        let body: TranscriptBody = serde_json::from_value(json!({
            "leadId": "42",
            "author": "Customer",
            "message": { "text": "Hi", "attachments": [] }
        }))
        .expect("parse");
        let entry = body.into_entry().expect("entry");
        assert_eq!(entry.lead_id, "42");
        assert_eq!(entry.author, "Customer");
        assert_eq!(entry.text, "Hi");

        let missing_lead: TranscriptBody =
            serde_json::from_value(json!({ "author": "Customer", "message": { "text": "Hi" } }))
                .expect("parse");
        assert!(missing_lead.into_entry().is_none());

        let blank_lead: TranscriptBody = serde_json::from_value(
            json!({ "leadId": "  ", "author": "Customer", "message": { "text": "Hi" } }),
        )
        .expect("parse");
        assert!(blank_lead.into_entry().is_none());
    }
}
