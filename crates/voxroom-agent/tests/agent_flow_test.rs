use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use voxroom_agent::{LoopbackRelay, Worker, LOOPBACK_AGENT_IDENTITY};
use voxroom_types::{ParticipantInfo, TrackKind, TrackPublishOptions};
use voxroom_voice::{
    CannedReply, RelayConfig, SpeechStack, SpeechSynthesizer, StubRecognizer, VoiceError,
};

const REPLY_AUDIO: &[u8] = b"ID3-reply-audio";

/// Synthesizer that records the text it was asked to speak.
#[derive(Default)]
struct RecordingSynthesizer {
    spoken: Mutex<Vec<String>>,
    fail: bool,
}

#[async_trait]
impl SpeechSynthesizer for RecordingSynthesizer {
    async fn synthesize(&self, text: &str) -> Result<Vec<u8>, VoiceError> {
        self.spoken.lock().unwrap().push(text.to_string());
        if self.fail {
            return Err(VoiceError::Synthesis("simulated network error".to_string()));
        }
        Ok(REPLY_AUDIO.to_vec())
    }
}

fn relay_config() -> RelayConfig {
    RelayConfig::new("ws://localhost:7880", "devkey", "secret")
}

fn speech(synthesizer: Arc<RecordingSynthesizer>) -> SpeechStack {
    SpeechStack::new(
        Arc::new(StubRecognizer::new("Hello agent!")),
        Arc::new(CannedReply::new("Hi! This is a test voice reply.")),
        synthesizer,
    )
}

async fn start_worker(synthesizer: Arc<RecordingSynthesizer>) -> (LoopbackRelay, Arc<Worker>) {
    let relay = LoopbackRelay::new();
    let worker = Worker::new(speech(synthesizer));
    worker
        .start(&relay, &relay_config())
        .await
        .expect("worker registration");
    (relay, worker)
}

async fn wait_until<F: Fn() -> bool>(condition: F) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("condition not reached in time");
}

#[tokio::test]
async fn test_alice_audio_gets_one_voice_reply() {
    let synthesizer = Arc::new(RecordingSynthesizer::default());
    let (relay, worker) = start_worker(synthesizer.clone()).await;

    let room = relay.assign_room("demo", Vec::new()).await.unwrap();
    assert_eq!(worker.active_rooms(), vec!["demo".to_string()]);

    room.connect_participant("alice").unwrap();
    room.subscribe_track("alice", "t1", TrackKind::Audio).unwrap();

    let published = room.wait_for_published(1, Duration::from_secs(5)).await;
    assert_eq!(published.len(), 1);
    assert_eq!(published[0].publisher, LOOPBACK_AGENT_IDENTITY);
    assert_eq!(published[0].options, TrackPublishOptions::agent_voice());
    assert_eq!(published[0].payload, REPLY_AUDIO);
    assert_eq!(
        *synthesizer.spoken.lock().unwrap(),
        vec!["Hi! This is a test voice reply.".to_string()]
    );

    // No second reply shows up later.
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(room.published().len(), 1);
}

#[tokio::test]
async fn test_video_track_gets_no_reply() {
    let synthesizer = Arc::new(RecordingSynthesizer::default());
    let (relay, _worker) = start_worker(synthesizer.clone()).await;

    let room = relay
        .assign_room("demo", vec![ParticipantInfo::connected("alice")])
        .await
        .unwrap();
    room.subscribe_track("alice", "cam", TrackKind::Video).unwrap();

    let published = room.wait_for_published(1, Duration::from_millis(200)).await;
    assert!(published.is_empty());
    assert!(synthesizer.spoken.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_synthesis_failure_publishes_nothing() {
    let synthesizer = Arc::new(RecordingSynthesizer {
        fail: true,
        ..Default::default()
    });
    let (relay, _worker) = start_worker(synthesizer.clone()).await;

    let room = relay
        .assign_room("demo", vec![ParticipantInfo::connected("alice")])
        .await
        .unwrap();
    room.subscribe_track("alice", "t1", TrackKind::Audio).unwrap();

    wait_until(|| !synthesizer.spoken.lock().unwrap().is_empty()).await;
    let published = room.wait_for_published(1, Duration::from_millis(200)).await;
    assert!(published.is_empty());
}

#[tokio::test]
async fn test_rejected_publish_then_fresh_subscription_replies() {
    let synthesizer = Arc::new(RecordingSynthesizer::default());
    let (relay, _worker) = start_worker(synthesizer.clone()).await;

    let room = relay
        .assign_room("demo", vec![ParticipantInfo::connected("alice")])
        .await
        .unwrap();
    room.reject_publishes(true);
    room.subscribe_track("alice", "t1", TrackKind::Audio).unwrap();
    wait_until(|| synthesizer.spoken.lock().unwrap().len() == 1).await;
    // Give the failed pipeline time to report back before resubscribing.
    tokio::time::sleep(Duration::from_millis(100)).await;

    room.reject_publishes(false);
    room.subscribe_track("alice", "t1", TrackKind::Audio).unwrap();

    let published = room.wait_for_published(1, Duration::from_secs(5)).await;
    assert_eq!(published.len(), 1);
    assert_eq!(synthesizer.spoken.lock().unwrap().len(), 2);
}

#[tokio::test]
async fn test_second_assignment_for_live_room_is_ignored() {
    let synthesizer = Arc::new(RecordingSynthesizer::default());
    let (relay, worker) = start_worker(synthesizer).await;

    let first = relay.assign_room("demo", Vec::new()).await.unwrap();
    let second = relay.assign_room("demo", Vec::new()).await.unwrap();

    assert_eq!(worker.active_rooms(), vec!["demo".to_string()]);
    assert!(first.connect_participant("alice").is_ok());
    assert!(matches!(
        second.connect_participant("alice"),
        Err(VoiceError::Relay(_))
    ));
}

#[tokio::test]
async fn test_closing_room_ends_its_session() {
    let synthesizer = Arc::new(RecordingSynthesizer::default());
    let (relay, worker) = start_worker(synthesizer).await;

    let demo = relay.assign_room("demo", Vec::new()).await.unwrap();
    let _lobby = relay.assign_room("lobby", Vec::new()).await.unwrap();
    assert_eq!(
        worker.active_rooms(),
        vec!["demo".to_string(), "lobby".to_string()]
    );

    demo.close();
    wait_until(|| worker.active_rooms() == vec!["lobby".to_string()]).await;
}

#[tokio::test]
async fn test_registration_requires_credentials() {
    let relay = LoopbackRelay::new();
    let worker = Worker::new(speech(Arc::new(RecordingSynthesizer::default())));

    let result = worker
        .start(&relay, &RelayConfig::new("ws://localhost:7880", "devkey", ""))
        .await;
    assert!(matches!(result, Err(VoiceError::Relay(_))));
    assert!(!relay.is_registered());

    assert!(matches!(
        relay.assign_room("demo", Vec::new()).await,
        Err(VoiceError::Relay(_))
    ));
}

#[tokio::test]
async fn test_only_one_worker_may_register() {
    let (relay, _worker) = start_worker(Arc::new(RecordingSynthesizer::default())).await;
    let other = Worker::new(speech(Arc::new(RecordingSynthesizer::default())));

    let result = other.start(&relay, &relay_config()).await;
    assert!(matches!(result, Err(VoiceError::Relay(_))));
}
