use crate::audio::{self, SPEECH_SAMPLE_RATE};
use crate::error::AudioError;
use crate::settings::SpeechCredentials;
use async_trait::async_trait;
use reqwest::header::{ACCEPT, CONTENT_TYPE, USER_AGENT};
use serde::Deserialize;
use std::time::Duration;

pub const NOTHING_HEARD: &str = "Sorry, I didn't hear anything.";
pub const DEFAULT_LISTEN_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_RECORD_WINDOW: Duration = Duration::from_secs(5);

const SUBSCRIPTION_KEY_HEADER: &str = "Ocp-Apim-Subscription-Key";
const OUTPUT_FORMAT_HEADER: &str = "X-Microsoft-OutputFormat";
const OUTPUT_FORMAT: &str = "riff-24khz-16bit-mono-pcm";

/// Outcome of one voice input attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Heard {
    Speech(String),
    Nothing,
    Failed(String),
}

impl Heard {
    pub fn message(&self) -> String {
        match self {
            Heard::Speech(text) => text.clone(),
            Heard::Nothing => NOTHING_HEARD.to_string(),
            Heard::Failed(reason) => format!("Voice recognition failed: {reason}"),
        }
    }
}

pub trait SpeechSynthesizer: Send + Sync {
    // Fire and forget: the caller never waits for playback.
    fn speak(&self, text: String);
}

#[async_trait]
pub trait SpeechRecognizer: Send + Sync {
    async fn recognize(&self) -> Result<Option<String>, AudioError>;
}

/// Runs one recognition, giving up after `limit`.
pub async fn listen(recognizer: &dyn SpeechRecognizer, limit: Duration) -> Heard {
    match tokio::time::timeout(limit, recognizer.recognize()).await {
        Ok(Ok(Some(text))) if !text.trim().is_empty() => Heard::Speech(text.trim().to_string()),
        Ok(Ok(_)) => Heard::Nothing,
        Ok(Err(e)) => {
            log::error!("Speech recognition failed: {e}");
            Heard::Failed(e.to_string())
        }
        Err(_) => {
            log::warn!("Speech recognition timed out after {limit:?}");
            Heard::Nothing
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RecognitionResponse {
    recognition_status: String,
    #[serde(default)]
    display_text: Option<String>,
}

/// Azure Speech through its REST endpoints.
#[derive(Debug, Clone)]
pub struct AzureSpeech {
    http: reqwest::Client,
    key: String,
    region: String,
    voice: String,
    language: String,
    record_window: Duration,
}

impl AzureSpeech {
    pub fn new(credentials: &SpeechCredentials, record_window: Duration) -> Self {
        Self {
            http: reqwest::Client::new(),
            key: credentials.key.clone(),
            region: credentials.region.clone(),
            voice: credentials.voice.clone(),
            language: credentials.language.clone(),
            record_window,
        }
    }

    fn synthesis_url(&self) -> String {
        format!(
            "https://{}.tts.speech.microsoft.com/cognitiveservices/v1",
            self.region
        )
    }

    fn recognition_url(&self) -> String {
        format!(
            "https://{}.stt.speech.microsoft.com/speech/recognition/conversation/cognitiveservices/v1",
            self.region
        )
    }

    pub async fn synthesize(&self, text: &str) -> Result<Vec<u8>, AudioError> {
        let response = self
            .http
            .post(self.synthesis_url())
            .header(SUBSCRIPTION_KEY_HEADER, &self.key)
            .header(CONTENT_TYPE, "application/ssml+xml")
            .header(OUTPUT_FORMAT_HEADER, OUTPUT_FORMAT)
            .header(USER_AGENT, env!("CARGO_PKG_NAME"))
            .body(ssml(&self.language, &self.voice, text))
            .send()
            .await?
            .error_for_status()?;
        Ok(response.bytes().await?.to_vec())
    }

    pub async fn transcribe(&self, wav: Vec<u8>) -> Result<Option<String>, AudioError> {
        let response: RecognitionResponse = self
            .http
            .post(self.recognition_url())
            .query(&[("language", self.language.as_str()), ("format", "simple")])
            .header(SUBSCRIPTION_KEY_HEADER, &self.key)
            .header(
                CONTENT_TYPE,
                format!("audio/wav; codecs=audio/pcm; samplerate={SPEECH_SAMPLE_RATE}"),
            )
            .header(ACCEPT, "application/json")
            .body(wav)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        recognized_text(response)
    }
}

fn recognized_text(response: RecognitionResponse) -> Result<Option<String>, AudioError> {
    match response.recognition_status.as_str() {
        "Success" => Ok(response.display_text),
        "NoMatch" | "InitialSilenceTimeout" | "BabbleTimeout" => Ok(None),
        other => Err(AudioError::Service(other.to_string())),
    }
}

impl SpeechSynthesizer for AzureSpeech {
    fn speak(&self, text: String) {
        let speech = self.clone();
        tokio::spawn(async move {
            match speech.synthesize(&text).await {
                Ok(audio) => audio::play_audio(audio),
                Err(e) => log::error!("Speech synthesis failed: {e}"),
            }
        });
    }
}

#[async_trait]
impl SpeechRecognizer for AzureSpeech {
    async fn recognize(&self) -> Result<Option<String>, AudioError> {
        let wav = audio::record_wav(self.record_window).await?;
        self.transcribe(wav).await
    }
}

fn ssml(language: &str, voice: &str, text: &str) -> String {
    format!(
        "<speak version='1.0' xml:lang='{language}'><voice name='{voice}'>{}</voice></speak>",
        escape_xml(text)
    )
}

fn escape_xml(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ssml_escapes_narration() {
        let body = ssml("en-US", "en-US-GuyNeural", "Tuckersoft & \"Colin\" <1984>");
        assert!(body.contains("Tuckersoft &amp; &quot;Colin&quot; &lt;1984&gt;"));
        assert!(body.starts_with("<speak version='1.0' xml:lang='en-US'>"));
    }

    #[test]
    fn recognition_statuses_map_to_outcomes() {
        let parse = |json: &str| {
            recognized_text(serde_json::from_str::<RecognitionResponse>(json).unwrap())
        };
        assert_eq!(
            parse(r#"{"RecognitionStatus":"Success","DisplayText":"Take the pill."}"#).unwrap(),
            Some("Take the pill.".to_string())
        );
        assert_eq!(parse(r#"{"RecognitionStatus":"NoMatch"}"#).unwrap(), None);
        assert!(parse(r#"{"RecognitionStatus":"Error"}"#).is_err());
    }
}
