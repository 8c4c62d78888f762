//! Example ad session between a player and a creative in one process.
//!
//! Run with: cargo run -p ad-session-demo
//!
//! Set `RUST_LOG=simid_protocol=trace` to watch every envelope.

use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration,
};

use serde_json::{Value, json};
use simid_protocol::{
    Endpoint, EndpointConfig, Envelope, ErrorPayload, RequestError,
    messages::{creative, media, player},
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const REPLY_TIMEOUT: Duration = Duration::from_secs(2);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let player_side = Endpoint::new(EndpointConfig::host());
    let creative_side = Endpoint::new(EndpointConfig::guest());
    let link = simid_transport::connect(&player_side, &creative_side);

    let playing = Arc::new(AtomicBool::new(false));
    install_player_listeners(&player_side, Arc::clone(&playing));
    install_creative_listeners(&creative_side);

    // Player: initialize the creative and wait for it to accept.
    let init = json!({
        "environmentData": {
            "videoDimensions": {"x": 0, "y": 0, "width": 640, "height": 360},
            "fullscreen": false,
            "variableDurationAllowed": true,
            "muted": false,
            "volume": 0.8
        },
        "creativeData": {
            "adParameters": "",
            "clickThroughUrl": "http://example.com"
        }
    });
    let accepted = player_side
        .send_message_with_timeout(player::INIT, init, REPLY_TIMEOUT)
        .await?;
    tracing::info!(session_id = ?player_side.session_id(), %accepted, "Creative initialized");

    player_side
        .send_message_with_timeout(player::START_CREATIVE, Value::Null, REPLY_TIMEOUT)
        .await?;
    playing.store(true, Ordering::SeqCst);

    player_side.send_message(media::PLAY, Value::Null).await?;
    for second in 1..=3 {
        player_side
            .send_message(media::TIME_UPDATE, json!({"currentTime": second}))
            .await?;
    }

    // Creative: two requests in flight at once; answers correlate by id.
    let (pause, skip) = futures::future::join(
        creative_side.send_message(creative::REQUEST_PAUSE, Value::Null),
        creative_side.send_message(creative::REQUEST_SKIP, Value::Null),
    )
    .await;
    tracing::info!(?pause, "Pause request answered");
    match skip {
        Err(RequestError::Rejected(payload)) => {
            let reason = ErrorPayload::from_value(&payload);
            tracing::info!(?reason, "Skip request rejected");
        }
        other => tracing::warn!(?other, "Unexpected skip outcome"),
    }

    player_side
        .send_message_with_timeout(
            player::AD_STOPPED,
            json!({"code": 0}),
            REPLY_TIMEOUT,
        )
        .await?;

    creative_side.close();
    player_side.close();
    let (to_player, to_creative) = (link.host_pump.await?, link.guest_pump.await?);
    tracing::info!(to_player, to_creative, "Ad session finished");

    Ok(())
}

fn install_player_listeners(endpoint: &Endpoint, playing: Arc<AtomicBool>) {
    let pause_state = Arc::clone(&playing);
    endpoint.add_listener(creative::REQUEST_PAUSE, move |ep: &Endpoint, env: &Envelope| {
        pause_state.store(false, Ordering::SeqCst);
        ep.resolve(env, json!({}));
        let _ = ep.send_message(media::PAUSE, Value::Null);
    });

    endpoint.add_listener(creative::REQUEST_PLAY, move |ep: &Endpoint, env: &Envelope| {
        playing.store(true, Ordering::SeqCst);
        ep.resolve(env, json!({}));
        let _ = ep.send_message(media::PLAY, Value::Null);
    });

    endpoint.add_listener(creative::REQUEST_SKIP, |ep: &Endpoint, env: &Envelope| {
        ep.reject(
            env,
            ErrorPayload::new(1202, "Skipping is not allowed for this ad").into_value(),
        );
    });

    endpoint.add_listener(creative::LOG, |_: &Endpoint, env: &Envelope| {
        tracing::info!(args = %env.args, "Creative log");
    });
}

fn install_creative_listeners(endpoint: &Endpoint) {
    endpoint.add_listener(player::INIT, |ep: &Endpoint, env: &Envelope| {
        let width = env.args["environmentData"]["videoDimensions"]["width"].as_u64();
        tracing::info!(?width, "Creative received init");
        ep.resolve(env, json!({}));
    });

    endpoint.add_listener(player::START_CREATIVE, |ep: &Endpoint, env: &Envelope| {
        ep.resolve(env, json!({}));
        let _ = ep.send_message(creative::LOG, json!("creative started"));
    });

    endpoint.add_listener(player::AD_STOPPED, |ep: &Endpoint, env: &Envelope| {
        ep.resolve(env, json!({}));
    });

    endpoint.add_listener(media::TIME_UPDATE, |_: &Endpoint, env: &Envelope| {
        tracing::debug!(current_time = %env.args["currentTime"], "Video progress");
    });
}
