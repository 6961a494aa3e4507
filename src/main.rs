use color_eyre::eyre::Result;
use parallel_paths::{
    ai::provider_from_backend,
    app::App,
    cleanup::install_panic_hook,
    logging,
    orchestrator::{OrchestratorConfig, Session, TurnOrchestrator},
    settings::{Settings, data_dir},
    speech::{AzureSpeech, SpeechRecognizer, SpeechSynthesizer},
};
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    let settings = Settings::load()?;
    logging::init(&data_dir()?, settings.debug_mode)?;
    install_panic_hook();

    // No model, no story.
    let backend = settings.model_backend()?;
    let provider = provider_from_backend(&backend);

    let mut orchestrator =
        TurnOrchestrator::with_random_drift(OrchestratorConfig::from(&settings), provider);

    let speech = settings
        .speech_credentials()
        .map(|credentials| Arc::new(AzureSpeech::new(&credentials, settings.record_window())));
    if speech.is_none() {
        log::warn!("Azure Speech credentials missing, voice features are disabled");
    }
    if let Some(speech) = &speech {
        orchestrator = orchestrator.with_synthesizer(Arc::clone(speech) as Arc<dyn SpeechSynthesizer>);
    }

    let session = Session::new(orchestrator);
    session.set_voice_output(speech.is_some() && settings.audio_output_enabled);

    let mut app = App::new(session)
        .with_voice_output_available(speech.is_some())
        .listen_timeout(settings.listen_timeout());
    if let Some(speech) = speech.filter(|_| settings.audio_input_enabled) {
        app = app.with_recognizer(speech as Arc<dyn SpeechRecognizer>);
    }

    app.run().await
}
