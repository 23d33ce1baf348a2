//! Broadcast fan-out and pacing
//!
//! Uses paused tokio time so the chunk-interval sleeps are asserted exactly
//! instead of approximately.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::Instant;
use uuid::Uuid;

use aria_relay::relay::protocol::Outbound;
use aria_relay::relay::{Broadcaster, Registry};

const CHUNK: usize = 1024;
const RATE: u32 = 16_000;

fn received_audio(rx: &mut mpsc::Receiver<Outbound>) -> Vec<Vec<u8>> {
    let mut chunks = Vec::new();
    while let Ok(item) = rx.try_recv() {
        if let Outbound::Audio(bytes) = item {
            chunks.push(bytes);
        }
    }
    chunks
}

#[tokio::test(start_paused = true)]
async fn every_live_session_hears_every_chunk_in_order() {
    let registry = Arc::new(Registry::new());
    let broadcaster = Broadcaster::new(Arc::clone(&registry), CHUNK, RATE);

    let (tx_a, mut rx_a) = mpsc::channel(8);
    let (tx_b, mut rx_b) = mpsc::channel(8);
    registry.add(Uuid::new_v4(), tx_a).await;
    registry.add(Uuid::new_v4(), tx_b).await;

    let waveform: Vec<u8> = (0..CHUNK * 3).map(|i| (i % 251) as u8).collect();
    let passes = broadcaster.stream(&waveform).await;
    assert_eq!(passes, 3);

    for rx in [&mut rx_a, &mut rx_b] {
        let chunks = received_audio(rx);
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks.concat(), waveform);
    }
}

#[tokio::test(start_paused = true)]
async fn failed_recipient_is_removed_without_disturbing_others() {
    let registry = Arc::new(Registry::new());
    let broadcaster = Broadcaster::new(Arc::clone(&registry), CHUNK, RATE);

    let (tx_live, mut rx_live) = mpsc::channel(8);
    let (tx_gone, rx_gone) = mpsc::channel(8);
    let live_id = Uuid::new_v4();
    registry.add(live_id, tx_live).await;
    registry.add(Uuid::new_v4(), tx_gone).await;
    drop(rx_gone);

    let waveform = vec![7u8; CHUNK * 3];
    let passes = broadcaster.stream(&waveform).await;
    assert_eq!(passes, 3);

    // The dropped session disappeared on its first failed send
    assert_eq!(registry.len().await, 1);
    assert_eq!(received_audio(&mut rx_live).len(), 3);
}

#[tokio::test(start_paused = true)]
async fn delivery_is_paced_at_one_chunk_interval_per_pass() {
    let registry = Arc::new(Registry::new());
    let broadcaster = Broadcaster::new(Arc::clone(&registry), CHUNK, RATE);

    let (tx, mut rx) = mpsc::channel(8);
    registry.add(Uuid::new_v4(), tx).await;

    let waveform = vec![0u8; CHUNK * 3];
    let start = Instant::now();
    broadcaster.stream(&waveform).await;

    let expected = Duration::from_secs_f64(3.0 * CHUNK as f64 / f64::from(RATE));
    assert_eq!(start.elapsed(), expected);
    assert_eq!(received_audio(&mut rx).len(), 3);
}

#[tokio::test(start_paused = true)]
async fn short_final_chunk_is_delivered_as_is() {
    let registry = Arc::new(Registry::new());
    let broadcaster = Broadcaster::new(Arc::clone(&registry), CHUNK, RATE);

    let (tx, mut rx) = mpsc::channel(8);
    registry.add(Uuid::new_v4(), tx).await;

    let waveform = vec![9u8; CHUNK + 100];
    let passes = broadcaster.stream(&waveform).await;
    assert_eq!(passes, 2);

    let chunks = received_audio(&mut rx);
    assert_eq!(chunks[0].len(), CHUNK);
    assert_eq!(chunks[1].len(), 100);
}

// Sessions drive broadcasts from spawned tasks, so the stream future has to
// be Send
#[tokio::test(start_paused = true)]
async fn stream_runs_on_a_spawned_task() {
    let registry = Arc::new(Registry::new());
    let broadcaster = Broadcaster::new(Arc::clone(&registry), CHUNK, RATE);

    let (tx, mut rx) = mpsc::channel(8);
    registry.add(Uuid::new_v4(), tx).await;

    let waveform = vec![3u8; CHUNK * 2];
    let passes = tokio::spawn(async move { broadcaster.stream(&waveform).await })
        .await
        .unwrap();

    assert_eq!(passes, 2);
    assert_eq!(received_audio(&mut rx).len(), 2);
}

#[tokio::test(start_paused = true)]
async fn empty_waveform_sends_nothing() {
    let registry = Arc::new(Registry::new());
    let broadcaster = Broadcaster::new(Arc::clone(&registry), CHUNK, RATE);

    let (tx, mut rx) = mpsc::channel(8);
    registry.add(Uuid::new_v4(), tx).await;

    assert_eq!(broadcaster.stream(&[]).await, 0);
    assert!(received_audio(&mut rx).is_empty());
}
