//! Services the engine receives from its host instead of building itself.
//!
//! Each capability is an async trait object. The defaults here are enough to
//! run automations locally: a keyword classifier, canned replies per intent,
//! a messenger that only logs and the system clock.

use std::sync::LazyLock;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{Result, runtime::session::SessionMessage, utils};

/// Intent returned when nothing else fits.
pub const FALLBACK_INTENT: &str = "autre";

/// Input of a text classification.
#[derive(Debug, Clone, Default)]
pub struct ClassifyRequest {
    pub text: String,
    /// Extra categories the automation author allows.
    pub categories: Vec<String>,
    pub instructions: String,
    /// Earlier messages of the same conversation, oldest first.
    pub history: Vec<SessionMessage>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq, strum::AsRefStr, strum::Display, strum::EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Sentiment {
    Positive,
    #[default]
    Neutral,
    Negative,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub intent: String,
    /// 1 (can wait) to 5 (urgent)
    pub urgency: u8,
    pub sentiment: Sentiment,
}

impl Classification {
    /// Keeps the first lowercase word of the intent, `autre` when unusable.
    pub fn normalized(mut self) -> Self {
        let word = self.intent.trim().to_lowercase();
        let word: String = word.split(|c: char| c.is_whitespace() || ",.!?".contains(c)).next().unwrap_or_default().chars().filter(|c| c.is_alphabetic() || *c == '_').collect();
        self.intent = if word.is_empty() || word.chars().count() > 25 { FALLBACK_INTENT.to_string() } else { word };
        self.urgency = self.urgency.clamp(1, 5);
        self
    }
}

#[async_trait]
pub trait Classifier: Send + Sync {
    async fn classify(
        &self,
        request: ClassifyRequest,
    ) -> Result<Classification>;
}

/// Input of a reply generation.
#[derive(Debug, Clone, Default)]
pub struct RespondRequest {
    /// Message to answer.
    pub text: String,
    /// System prompt, detected intent context included.
    pub system: String,
    pub model: String,
    /// Intent detected earlier in the run, if any.
    pub intent: Option<String>,
    /// Earlier messages of the same conversation, oldest first.
    pub history: Vec<SessionMessage>,
}

/// Generates the text of a reply to the contact.
#[async_trait]
pub trait Responder: Send + Sync {
    async fn respond(
        &self,
        request: RespondRequest,
    ) -> Result<String>;
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MessageContent {
    Text {
        body: String,
        preview_url: bool,
        /// Keep `*bold*`/`_italic_` markers when true.
        formatted: bool,
    },
    Image {
        url: String,
        caption: String,
    },
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct OutgoingMessage {
    pub recipient: String,
    pub content: MessageContent,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct DeliveryReceipt {
    pub message_id: String,
    pub status: String,
}

#[async_trait]
pub trait Messenger: Send + Sync {
    async fn send(
        &self,
        message: OutgoingMessage,
    ) -> Result<DeliveryReceipt>;
}

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Messenger that only records the message in the trace.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogMessenger;

#[async_trait]
impl Messenger for LogMessenger {
    async fn send(
        &self,
        message: OutgoingMessage,
    ) -> Result<DeliveryReceipt> {
        let message_id = utils::shortid();
        match &message.content {
            MessageContent::Text {
                body,
                ..
            } => info!(message_id = message_id.as_str(), recipient = message.recipient.as_str(), body = body.as_str(), "text message"),
            MessageContent::Image {
                url,
                caption,
            } => info!(message_id = message_id.as_str(), recipient = message.recipient.as_str(), url = url.as_str(), caption = caption.as_str(), "image message"),
        }

        Ok(DeliveryReceipt {
            message_id,
            status: "sent".to_string(),
        })
    }
}

static INTENT_RULES: LazyLock<Vec<(&'static str, Regex)>> = LazyLock::new(|| {
    [
        ("salutation", r"^(bonjour|salut|hello|hi|hey|coucou|bonsoir)"),
        ("question_prix", r"combien|prix|co[uû]t|tarif|cher|moins cher|promotion"),
        ("demande_produit", r"produit|article|disponib|stock|catalog|commande"),
        ("plainte", r"probl[eè]me|erreur|bug|marche pas|fonctionne pas|retard|insatisfait|m[eé]content"),
        ("remerciement", r"merci|super|g[eé]nial|parfait|excellent|top"),
        ("confirmation", r"^(oui|ok|d'accord|parfait|je confirme|c'est bon|exactement)$"),
        ("annulation", r"annuler|non|arr[eê]ter|stop|cancel"),
        ("demande_aide", r"aide|help|assistance|support|comment"),
    ]
    .into_iter()
    .filter_map(|(intent, pattern)| Regex::new(&format!("(?i){}", pattern)).ok().map(|re| (intent, re)))
    .collect()
});

const POSITIVE_WORDS: &[&str] = &[
    "merci", "super", "génial", "top", "bon", "bien", "bravo", "ok", "parfait", "excellent", "content", "heureux", "satisfait", "j'adore", "incroyable",
];
const NEGATIVE_WORDS: &[&str] = &[
    "nul", "mauvais", "problème", "erreur", "pas", "non", "déçu", "mécontent", "frustré", "colère", "arnaque", "honte", "inacceptable", "scandaleux",
];
const URGENT_WORDS: &[&str] = &["urgent", "vite", "immédiatement", "rapidement", "asap", "maintenant", "pressé"];

/// Keyword based classifier tuned for French chat messages.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalClassifier;

impl LocalClassifier {
    pub fn classify_text(
        &self,
        text: &str,
        categories: &[String],
    ) -> Classification {
        let msg = text.trim().to_lowercase();
        let words: Vec<&str> = msg.split(|c: char| !(c.is_alphanumeric() || c == '\'')).filter(|w| !w.is_empty()).collect();

        let intent = categories
            .iter()
            .map(|c| c.trim().to_lowercase())
            .find(|c| !c.is_empty() && msg.contains(c.as_str()))
            .or_else(|| INTENT_RULES.iter().find(|(_, re)| re.is_match(&msg)).map(|(intent, _)| intent.to_string()))
            .unwrap_or_else(|| FALLBACK_INTENT.to_string());

        let score = 50 + 8 * POSITIVE_WORDS.iter().filter(|w| words.contains(*w)).count() as i64 - 12 * NEGATIVE_WORDS.iter().filter(|w| words.contains(*w)).count() as i64;
        let sentiment = match score.clamp(0, 100) {
            s if s >= 55 => Sentiment::Positive,
            s if s <= 45 => Sentiment::Negative,
            _ => Sentiment::Neutral,
        };

        let urgency = if URGENT_WORDS.iter().any(|w| msg.contains(w)) {
            5
        } else if intent == "plainte" {
            4
        } else if sentiment == Sentiment::Negative {
            3
        } else {
            2
        };

        Classification {
            intent,
            urgency,
            sentiment,
        }
        .normalized()
    }
}

#[async_trait]
impl Classifier for LocalClassifier {
    async fn classify(
        &self,
        request: ClassifyRequest,
    ) -> Result<Classification> {
        Ok(self.classify_text(&request.text, &request.categories))
    }
}

/// Replies with a canned French answer chosen by intent.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalResponder;

impl LocalResponder {
    pub fn fallback_response(intent: Option<&str>) -> &'static str {
        match intent.unwrap_or_default() {
            "salutation" => "Bonjour ! 👋 Je suis là pour vous aider. Que puis-je faire pour vous aujourd'hui ?",
            "question_prix" => "Merci pour votre intérêt ! Pour les informations de prix, veuillez consulter notre catalogue ou contactez-nous directement.",
            "demande_produit" => "Merci de votre intérêt pour nos produits ! Un conseiller vous répondra très prochainement.",
            "plainte" => "Je suis désolé d'apprendre que vous rencontrez un problème. Nous prenons votre retour très au sérieux et allons y remédier.",
            "remerciement" => "Je vous en prie ! N'hésitez pas si vous avez d'autres questions. 😊",
            "confirmation" => "Parfait, c'est noté ! Je continue avec votre demande.",
            "annulation" => "D'accord, j'ai pris note de votre demande d'annulation.",
            "demande_aide" => "Je suis là pour vous aider ! Pouvez-vous me donner plus de détails sur votre demande ?",
            _ => "Merci pour votre message ! Un conseiller vous répondra dans les plus brefs délais.",
        }
    }
}

#[async_trait]
impl Responder for LocalResponder {
    async fn respond(
        &self,
        request: RespondRequest,
    ) -> Result<String> {
        Ok(Self::fallback_response(request.intent.as_deref()).to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_local_intents() {
        let c = LocalClassifier;
        assert_eq!(c.classify_text("Bonjour !", &[]).intent, "salutation");
        assert_eq!(c.classify_text("Combien coûte l'iPhone ?", &[]).intent, "question_prix");
        assert_eq!(c.classify_text("Le produit est en stock ?", &[]).intent, "demande_produit");
        assert_eq!(c.classify_text("J'ai un problème avec ma livraison", &[]).intent, "plainte");
        assert_eq!(c.classify_text("oui", &[]).intent, "confirmation");
        assert_eq!(c.classify_text("je veux annuler", &[]).intent, "annulation");
        assert_eq!(c.classify_text("zzz", &[]).intent, FALLBACK_INTENT);
    }

    #[test]
    fn test_local_custom_category_first() {
        let c = LocalClassifier;
        let cats = vec!["livraison".to_string()];
        assert_eq!(c.classify_text("Bonjour, où en est ma livraison ?", &cats).intent, "livraison");
    }

    #[test]
    fn test_local_sentiment_and_urgency() {
        let c = LocalClassifier;
        let r = c.classify_text("merci, parfait", &[]);
        assert_eq!(r.sentiment, Sentiment::Positive);
        assert_eq!(r.urgency, 2);

        let r = c.classify_text("c'est urgent, erreur sur ma commande", &[]);
        assert_eq!(r.sentiment, Sentiment::Negative);
        assert_eq!(r.urgency, 5);
    }

    #[test]
    fn test_normalized() {
        let c = Classification {
            intent: "  Question_Prix, sans doute".into(),
            urgency: 9,
            sentiment: Sentiment::Neutral,
        }
        .normalized();
        assert_eq!(c.intent, "question_prix");
        assert_eq!(c.urgency, 5);

        let c = Classification {
            intent: "???".into(),
            urgency: 0,
            sentiment: Sentiment::Neutral,
        }
        .normalized();
        assert_eq!(c.intent, FALLBACK_INTENT);
        assert_eq!(c.urgency, 1);
    }

    #[tokio::test]
    async fn test_local_responder() {
        let reply = LocalResponder
            .respond(RespondRequest {
                text: "Combien ?".into(),
                intent: Some("question_prix".into()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert!(reply.contains("informations de prix"));
        assert_eq!(LocalResponder::fallback_response(None), LocalResponder::fallback_response(Some(FALLBACK_INTENT)));
        assert!(LocalResponder::fallback_response(Some("salutation")).starts_with("Bonjour"));
    }

    #[tokio::test]
    async fn test_log_messenger() {
        let receipt = LogMessenger
            .send(OutgoingMessage {
                recipient: "+22500000000".into(),
                content: MessageContent::Text {
                    body: "hi".into(),
                    preview_url: false,
                    formatted: true,
                },
            })
            .await
            .unwrap();
        assert_eq!(receipt.status, "sent");
        assert_eq!(receipt.message_id.len(), 10);
    }
}
