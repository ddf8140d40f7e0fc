use anyhow::Result;
use std::io;
use std::time::Instant;
use tokio::time::{interval, MissedTickBehavior};

use crate::camera::Camera;
use crate::config::ClientConfig;
use crate::game::{frame_dt, Game, InputSender};
use crate::input::{KeyTracker, ReleaseMode};
use crate::messages::ClientMessage;
use crate::network::{LinkStatus, NetworkLink, RECONNECT_DELAY};
use crate::render::{render, Canvas};
use crate::terminal::{self, Control, TerminalCanvas, TerminalSession};
use crate::utils::now_millis;

/// Run the client until the player quits.
pub async fn run(config: ClientConfig) -> Result<()> {
    let mut link = match &config.ws_url {
        Some(url) => {
            log::info!("Using WS_URL = {}", url);
            NetworkLink::spawn(url, RECONNECT_DELAY)
        }
        None => {
            log::info!("No server configured, playing offline");
            NetworkLink::disabled()
        }
    };

    let session = TerminalSession::start()?;
    let result = frame_loop(&config, &session, &mut link).await;
    drop(session);
    result
}

async fn frame_loop(config: &ClientConfig, session: &TerminalSession, link: &mut NetworkLink) -> Result<()> {
    let mut canvas = TerminalCanvas::from_terminal()?;
    let mut tracker = KeyTracker::new(if session.reports_release() {
        ReleaseMode::Reported
    } else {
        ReleaseMode::HoldWindow(config.key_hold)
    });
    let mut game = Game::new(config.world);
    let mut camera = Camera::new(canvas.viewport());
    let mut sender = InputSender::new(config.name.clone(), config.input_interval);
    let mut stdout = io::stdout();

    let mut ticker = interval(config.frame_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    let mut last = Instant::now();
    let mut last_status = link.status();

    loop {
        ticker.tick().await;
        let now = Instant::now();
        let dt = frame_dt(now.saturating_duration_since(last));
        last = now;

        if terminal::poll_events(&mut tracker, &mut canvas, now)? == Control::Quit {
            log::info!("Quit requested");
            return Ok(());
        }

        let input = tracker.state(now);
        game.update(&input, dt);

        for msg in link.drain() {
            game.apply_server_message(msg, now_millis());
        }

        let status = link.status();
        if status != last_status {
            log::info!("ws status: {}", status);
            // A fresh connection has not seen our input yet.
            if status == LinkStatus::Open {
                sender.reset();
            }
            last_status = status;
        }

        camera.resize(canvas.viewport());
        camera.follow(&game.player);
        render(&mut canvas, &game, &camera, status);
        canvas.present(&mut stdout)?;

        if status == LinkStatus::Open {
            if let Some(msg) = sender.poll(&game, &input, now) {
                link.send(ClientMessage::Input(msg));
            }
        }
    }
}
