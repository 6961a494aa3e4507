use parallel_paths::reveal::{Reveal, RevealPacing};
use std::time::Duration;

const TEXT: &str = "The clock ticks. You wait: nothing happens!";

#[tokio::test(start_paused = true)]
async fn reveal_runs_to_completion() {
    let reveal = Reveal::start(TEXT.to_string(), RevealPacing::default());
    let frame = reveal.finished().await;
    assert!(frame.done);
    assert_eq!(frame.text, TEXT);
}

#[tokio::test(start_paused = true)]
async fn partial_frames_are_prefixes() {
    let reveal = Reveal::start(TEXT.to_string(), RevealPacing::default());

    tokio::time::sleep(Duration::from_millis(100)).await;
    let frame = reveal.frame();
    assert!(!frame.done);
    assert!(!frame.text.is_empty());
    assert!(frame.text.len() < TEXT.len());
    assert!(TEXT.starts_with(&frame.text));
}

#[tokio::test(start_paused = true)]
async fn skip_still_delivers_the_full_text() {
    let reveal = Reveal::start(TEXT.to_string(), RevealPacing::default());
    tokio::time::sleep(Duration::from_millis(30)).await;
    assert!(!reveal.is_done());

    reveal.skip();
    let frame = reveal.finished().await;
    assert!(frame.done);
    assert_eq!(frame.text, TEXT);
}

#[test]
fn punctuation_pauses_longer() {
    let pacing = RevealPacing::default();
    assert_eq!(pacing.delay_after('a'), Duration::from_millis(20));
    assert_eq!(pacing.delay_after('.'), Duration::from_millis(150));
    assert_eq!(pacing.delay_after(':'), pacing.pause_delay);
}
