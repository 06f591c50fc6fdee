//! Gestures, response envelopes and the idle phrase table
//!
//! Gestures drive the avatar animation in the browser. On the wire they use
//! the animation asset names (`muerto`, `sospecha`, `triste`, `lado`,
//! `feliz`); the English names are accepted on input as well since the
//! language model is prompted in either language.

use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

use crate::language::Language;

/// Facial gesture attached to every robot phrase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Gesture {
    #[serde(rename = "muerto", alias = "dead")]
    Dead,
    #[serde(rename = "sospecha", alias = "suspicious")]
    Suspicious,
    #[serde(rename = "triste", alias = "sad")]
    Sad,
    #[default]
    #[serde(rename = "lado", alias = "neutral")]
    Neutral,
    #[serde(rename = "feliz", alias = "happy")]
    Happy,
}

impl Gesture {
    /// Animation name sent to the front end
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Dead => "muerto",
            Self::Suspicious => "sospecha",
            Self::Sad => "triste",
            Self::Neutral => "lado",
            Self::Happy => "feliz",
        }
    }

    /// Parse a gesture tag from either vocabulary
    ///
    /// Returns `None` for anything outside the fixed vocabulary.
    #[must_use]
    pub fn parse(tag: &str) -> Option<Self> {
        match tag.trim().to_lowercase().as_str() {
            "muerto" | "muere" | "dead" => Some(Self::Dead),
            "sospecha" | "suspicious" => Some(Self::Suspicious),
            "triste" | "sad" => Some(Self::Sad),
            "lado" | "neutral" => Some(Self::Neutral),
            "feliz" | "happy" => Some(Self::Happy),
            _ => None,
        }
    }
}

impl std::fmt::Display for Gesture {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Normalized robot reply, produced once per utterance or idle filler
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseEnvelope {
    pub message: String,
    pub gesture: Gesture,
    pub language: Language,
}

impl ResponseEnvelope {
    /// Apology returned when the language model fails or replies garbage
    #[must_use]
    pub fn apology(language: Language) -> Self {
        let message = match language {
            Language::Es => "Ups… mi chip se confundió",
            Language::En => "Oops… my chip got confused",
        };

        Self {
            message: message.to_string(),
            gesture: Gesture::Sad,
            language,
        }
    }

    /// Text used when the model reply has no usable message
    #[must_use]
    pub const fn default_message(language: Language) -> &'static str {
        match language {
            Language::Es => "Hola… soy tu robot",
            Language::En => "Hi… I'm your robot",
        }
    }
}

/// A canned phrase spoken to fill silence
#[derive(Debug, Clone, Copy)]
pub struct IdlePhrase {
    pub es: &'static str,
    pub en: &'static str,
    pub gesture: Gesture,
}

impl IdlePhrase {
    /// Phrase text in the requested language
    #[must_use]
    pub const fn text(&self, language: Language) -> &'static str {
        match language {
            Language::Es => self.es,
            Language::En => self.en,
        }
    }

    /// Build the envelope broadcast for this phrase
    #[must_use]
    pub fn envelope(&self, language: Language) -> ResponseEnvelope {
        ResponseEnvelope {
            message: self.text(language).to_string(),
            gesture: self.gesture,
            language,
        }
    }
}

/// Static idle phrase table, all reminding people of the wake word
pub const IDLE_PHRASES: &[IdlePhrase] = &[
    IdlePhrase {
        es: "A Dinner le gusta que lo llamen por su nombre. Decí 'Dinner' y te escucho",
        en: "Dinner likes to be called by name. Say 'Dinner' and I'll listen",
        gesture: Gesture::Neutral,
    },
    IdlePhrase {
        es: "Regla básica: si no decís 'Dinner', sigo comiendo bits.",
        en: "Basic rule: if you don't say 'Dinner', I keep eating bits",
        gesture: Gesture::Suspicious,
    },
    IdlePhrase {
        es: "¿Querés hablar conmigo? Fácil: decí 'Dinner' primero.",
        en: "Want to talk to me? Easy: say 'Dinner' first",
        gesture: Gesture::Happy,
    },
    IdlePhrase {
        es: "Estoy en standby… activame diciendo 'Dinner'.",
        en: "I'm on standby... activate me by saying 'Dinner'",
        gesture: Gesture::Neutral,
    },
    IdlePhrase {
        es: "Dinner no responde a gritos, solo a su nombre",
        en: "Dinner doesn't respond to shouts, only to its name",
        gesture: Gesture::Suspicious,
    },
    IdlePhrase {
        es: "Escaneando antojos… resultado: TODO. (Después de decir 'Dinner').",
        en: "Scanning cravings... result: EVERYTHING. (After saying 'Dinner').",
        gesture: Gesture::Suspicious,
    },
    IdlePhrase {
        es: "Confirmado: decir 'Dinner' fue una excelente decisión.",
        en: "Confirmed: saying 'Dinner' was an excellent decision",
        gesture: Gesture::Happy,
    },
    IdlePhrase {
        es: "El hambre no negocia… pero Dinner sí, si lo llamás.",
        en: "Hunger doesn't negotiate... but Dinner does, if you call it",
        gesture: Gesture::Neutral,
    },
    IdlePhrase {
        es: "Procesando pedido… activación por palabra clave detectada.",
        en: "Processing order... keyword activation detected",
        gesture: Gesture::Suspicious,
    },
    IdlePhrase {
        es: "Nivel de felicidad subiendo desde que dijiste 'Dinner'.",
        en: "Happiness level rising since you said 'Dinner'",
        gesture: Gesture::Happy,
    },
    IdlePhrase {
        es: "Comida en camino… wake word correcta, paciencia en cooldown.",
        en: "Food on the way... correct wake word, patience on cooldown",
        gesture: Gesture::Neutral,
    },
    IdlePhrase {
        es: "Alerta: decir 'Dinner' puede generar respuestas automáticas.",
        en: "Alert: saying 'Dinner' may generate automatic responses",
        gesture: Gesture::Suspicious,
    },
    IdlePhrase {
        es: "El universo aprueba que llames a Dinner por su nombre.",
        en: "The universe approves that you call Dinner by its name",
        gesture: Gesture::Happy,
    },
    IdlePhrase {
        es: "Hambre derrotada tras pronunciación correcta de 'Dinner'.",
        en: "Hunger defeated after correct pronunciation of 'Dinner'",
        gesture: Gesture::Happy,
    },
    IdlePhrase {
        es: "Comer solo es triste… por suerte llamaste a Dinner.",
        en: "Eating alone is sad... luckily you called Dinner",
        gesture: Gesture::Neutral,
    },
];

/// Pick a random idle phrase
#[must_use]
pub fn random_idle_phrase() -> &'static IdlePhrase {
    IDLE_PHRASES
        .choose(&mut rand::thread_rng())
        .unwrap_or(&IDLE_PHRASES[0])
}
