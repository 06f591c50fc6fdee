//! Response generation
//!
//! Wraps the language model with the robot persona and turns whatever comes
//! back into a [`ResponseEnvelope`]. [`ResponseGenerator::generate`] is total:
//! model failures and unparseable replies become a localized apology.

use std::sync::{Arc, LazyLock};

use regex::Regex;
use serde_json::Value;

use crate::gesture::{Gesture, ResponseEnvelope};
use crate::language::{self, Language};
use crate::llm::LanguageModel;
use crate::{Error, Result};

/// First `{` through last `}`, across newlines
static JSON_OBJECT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)\{.*\}").expect("valid regex"));

const PERSONA_ES: &str = r#"Tu nombre es Dinner.
Eres un robot repartidor de comida.
Nunca uses emojis en tus respuestas.
Hablas de forma infantil, amable y corta.
No vendes nada, solo entregas pedidos.
De vez en cuando di frases con actitud positiva.
Responde siempre en español.

Devuelve SOLO un JSON válido, sin texto extra:

{
  "mensaje": "frase infantil corta",
  "gesto": "muerto | sospecha | triste | lado | feliz"
}

Reglas:
- Si dicen bang → muerto
- Si agradecen o son amables → feliz
- Si se quejan → triste
- Si algo no coincide → sospecha
- Si hay rechazo o insultos → muerto
"#;

const PERSONA_EN: &str = r#"Your name is Dinner.
You are a food delivery robot.
Never use emojis in your answers.
You speak in a childish, kind and short way.
You do not sell anything, you only deliver orders.
Every now and then say something with a positive attitude.
Always answer in English.

Return ONLY valid JSON, with no extra text:

{
  "mensaje": "short childish phrase",
  "gesto": "muerto | sospecha | triste | lado | feliz"
}

Gesture meanings: muerto = dead, sospecha = suspicious, triste = sad,
lado = neutral, feliz = happy.

Rules:
- If they say bang → muerto
- If they thank you or are kind → feliz
- If they complain → triste
- If something does not match → sospecha
- If there is rejection or insults → muerto
"#;

/// Build the full prompt for an utterance
#[must_use]
pub fn build_prompt(text: &str, language: Language) -> String {
    match language {
        Language::Es => format!("{PERSONA_ES}\nHumano dice: \"{text}\""),
        Language::En => format!("{PERSONA_EN}\nHuman says: \"{text}\""),
    }
}

/// Turns user utterances into robot replies
pub struct ResponseGenerator {
    model: Arc<dyn LanguageModel>,
}

impl ResponseGenerator {
    #[must_use]
    pub fn new(model: Arc<dyn LanguageModel>) -> Self {
        Self { model }
    }

    /// Generate a reply for a user utterance
    ///
    /// The reply language mirrors the detected input language. Never fails.
    pub async fn generate(&self, text: &str) -> ResponseEnvelope {
        let language = language::detect(text);

        match self.try_generate(text, language).await {
            Ok(envelope) => {
                tracing::info!(
                    message = %envelope.message,
                    gesture = %envelope.gesture,
                    language = %envelope.language,
                    "response generated"
                );
                envelope
            }
            Err(e) => {
                tracing::warn!(error = %e, language = %language, "response generation failed, apologizing");
                ResponseEnvelope::apology(language)
            }
        }
    }

    async fn try_generate(&self, text: &str, language: Language) -> Result<ResponseEnvelope> {
        let prompt = build_prompt(text, language);
        let reply = self.model.generate(&prompt).await?;
        parse_reply(&reply, language)
    }
}

/// Extract the envelope from a raw model reply
///
/// Strips code fences, takes the outermost brace region and reads the
/// `mensaje`/`gesto` fields (English names accepted too). Missing or
/// malformed fields get language-appropriate defaults.
///
/// # Errors
///
/// Returns error if the reply holds no parseable JSON object
pub fn parse_reply(reply: &str, language: Language) -> Result<ResponseEnvelope> {
    let cleaned = reply.replace("```json", "").replace("```", "");

    let candidate = JSON_OBJECT
        .find(&cleaned)
        .ok_or_else(|| Error::Reply("no JSON object in reply".to_string()))?;

    let value: Value = serde_json::from_str(candidate.as_str())
        .map_err(|e| Error::Reply(format!("invalid JSON: {e}")))?;

    let Value::Object(fields) = value else {
        return Err(Error::Reply("reply is not a JSON object".to_string()));
    };

    let field = |es: &str, en: &str| {
        fields
            .get(es)
            .or_else(|| fields.get(en))
            .and_then(Value::as_str)
    };

    let message = field("mensaje", "message")
        .filter(|m| !m.trim().is_empty())
        .map_or_else(
            || ResponseEnvelope::default_message(language).to_string(),
            ToString::to_string,
        );

    let gesture = field("gesto", "gesture")
        .and_then(Gesture::parse)
        .unwrap_or_default();

    Ok(ResponseEnvelope {
        message,
        gesture,
        language,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fenced_reply_with_prose_round_trips() {
        let reply = "```json\n{\"mensaje\":\"hola\",\"gesto\":\"feliz\"}\n```\nEspero que te guste!";
        let envelope = parse_reply(reply, Language::Es).unwrap();
        assert_eq!(envelope.message, "hola");
        assert_eq!(envelope.gesture, Gesture::Happy);
        assert_eq!(envelope.language, Language::Es);
    }

    #[test]
    fn leading_prose_is_skipped() {
        let reply = "Sure! Here you go:\n{\n  \"message\": \"yay\",\n  \"gesture\": \"sad\"\n}";
        let envelope = parse_reply(reply, Language::En).unwrap();
        assert_eq!(envelope.message, "yay");
        assert_eq!(envelope.gesture, Gesture::Sad);
    }

    #[test]
    fn missing_fields_get_defaults() {
        let envelope = parse_reply("{}", Language::En).unwrap();
        assert_eq!(envelope.message, ResponseEnvelope::default_message(Language::En));
        assert_eq!(envelope.gesture, Gesture::Neutral);
    }

    #[test]
    fn malformed_fields_get_defaults() {
        let envelope =
            parse_reply(r#"{"mensaje": 42, "gesto": "bailar"}"#, Language::Es).unwrap();
        assert_eq!(envelope.message, ResponseEnvelope::default_message(Language::Es));
        assert_eq!(envelope.gesture, Gesture::Neutral);

        let envelope = parse_reply(r#"{"mensaje": "   ", "gesto": null}"#, Language::Es).unwrap();
        assert_eq!(envelope.message, ResponseEnvelope::default_message(Language::Es));
    }

    #[test]
    fn prose_only_reply_is_an_error() {
        assert!(matches!(
            parse_reply("I am a robot and I like food", Language::En),
            Err(Error::Reply(_))
        ));
        assert!(parse_reply("", Language::En).is_err());
        assert!(parse_reply("{not json}", Language::En).is_err());
    }

    struct Canned(&'static str);

    #[async_trait::async_trait]
    impl LanguageModel for Canned {
        async fn generate(&self, _prompt: &str) -> Result<String> {
            if self.0.is_empty() {
                return Err(Error::Llm("timed out".to_string()));
            }
            Ok(self.0.to_string())
        }
    }

    #[test]
    fn generate_tags_reply_with_detected_language() {
        let generator = ResponseGenerator::new(Arc::new(Canned(r#"{"message": "On my way", "gesture": "happy"}"#)));
        let envelope = tokio_test::block_on(generator.generate("hello, where is my food"));
        assert_eq!(envelope.message, "On my way");
        assert_eq!(envelope.gesture, Gesture::Happy);
        assert_eq!(envelope.language, Language::En);
    }

    #[test]
    fn generate_never_fails() {
        let generator = ResponseGenerator::new(Arc::new(Canned("")));
        let envelope = tokio_test::block_on(generator.generate("hola, tengo hambre"));
        assert_eq!(envelope, ResponseEnvelope::apology(Language::Es));

        let generator = ResponseGenerator::new(Arc::new(Canned("no idea")));
        let envelope = tokio_test::block_on(generator.generate("hello there, thank you"));
        assert_eq!(envelope, ResponseEnvelope::apology(Language::En));
    }

    #[test]
    fn prompt_carries_utterance_and_language() {
        let es = build_prompt("hola dinner", Language::Es);
        assert!(es.contains("Humano dice: \"hola dinner\""));
        assert!(es.contains("Dinner"));

        let en = build_prompt("hi dinner", Language::En);
        assert!(en.contains("Human says: \"hi dinner\""));
        assert!(en.contains("Always answer in English"));
    }
}
