use serde::Serialize;

/// Body of a Discord webhook execution.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct WebhookMessage {
    pub username: String,
    pub avatar_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub embeds: Vec<Embed>,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct Embed {
    pub title: String,
    pub description: String,
    pub color: u32,
    pub timestamp: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<EmbedAuthor>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub footer: Option<EmbedFooter>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<EmbedThumbnail>,
    pub fields: Vec<EmbedField>,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct EmbedAuthor {
    pub name: String,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct EmbedFooter {
    pub text: String,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct EmbedThumbnail {
    pub url: String,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct EmbedField {
    pub name: String,
    pub value: String,
    pub inline: bool,
}

impl EmbedField {
    pub fn inline(name: &str, value: &str) -> Self {
        Self {
            name: name.to_string(),
            value: value.to_string(),
            inline: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_content_message_omits_embeds() {
        let message = WebhookMessage {
            username: "Pi IP Logger".to_string(),
            avatar_url: String::new(),
            content: Some("hello".to_string()),
            embeds: Vec::new(),
        };
        assert_eq!(
            serde_json::to_value(&message).unwrap(),
            json!({"username": "Pi IP Logger", "avatar_url": "", "content": "hello"})
        );
    }

    #[test]
    fn test_embed_omits_missing_thumbnail() {
        let embed = Embed {
            title: "t".to_string(),
            description: "d".to_string(),
            color: 1,
            timestamp: "2025-01-01T00:00:00Z".to_string(),
            author: None,
            footer: None,
            thumbnail: None,
            fields: vec![EmbedField::inline("Branch", "main")],
        };
        let value = serde_json::to_value(&embed).unwrap();
        assert!(value.get("thumbnail").is_none());
        assert_eq!(value["fields"][0], json!({"name": "Branch", "value": "main", "inline": true}));
    }
}
