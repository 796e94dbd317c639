use crate::backend::interface::Backend;
use crate::config::Config;
use crate::device_display::interface::DeviceDisplay;
use crate::device_player::interface::DevicePlayer;
use crate::library::logger::interface::Logger;
use crate::live_stream::bridge::LiveStreamBridge;
use crate::overlay_app::core::{init, transition, Effect, Event, Model};
use crate::overlay_app::render::Render;
use crate::overlay_app::run_effect::RunEffect;
use std::sync::mpsc::{channel, Receiver, Sender};
use std::sync::{Arc, Mutex};

type Error = Box<dyn std::error::Error + Send + Sync>;

enum MediaJob {
    Run(Effect),
    Flush(Sender<()>),
}

/// Owns the model and runs the event loop: every event goes through
/// `transition`, the display is redrawn, then the effects are spawned.
///
/// Media effects go to a single worker so that a close always reaches the
/// player or camera before the open that follows it.
pub struct OverlayApp {
    pub model: Arc<Mutex<Model>>,
    event_sender: Sender<Event>,
    event_receiver: Receiver<Event>,
    media_jobs: Sender<MediaJob>,
    config: Config,
    logger: Arc<dyn Logger + Send + Sync>,
    render: Render,
    run_effect: RunEffect,
}

impl OverlayApp {
    pub fn new(
        config: Config,
        logger: Arc<dyn Logger + Send + Sync>,
        backend: Arc<dyn Backend + Send + Sync>,
        device_player: Arc<dyn DevicePlayer + Send + Sync>,
        device_display: Arc<Mutex<dyn DeviceDisplay + Send + Sync>>,
        live_stream: LiveStreamBridge,
    ) -> Self {
        let (event_sender, event_receiver) = channel();
        let logger = logger.with_namespace("overlay_app");
        let run_effect = RunEffect::new(
            config.clone(),
            logger.clone(),
            backend,
            device_player,
            device_display.clone(),
            live_stream,
            event_sender.clone(),
        );

        let (media_jobs, media_queue) = channel();
        {
            let run_effect = run_effect.clone();
            std::thread::spawn(move || {
                for job in media_queue {
                    match job {
                        MediaJob::Run(effect) => run_effect.run_effect(effect),
                        MediaJob::Flush(done) => {
                            let _ = done.send(());
                        }
                    }
                }
            });
        }

        Self {
            model: Arc::new(Mutex::new(init().0)),
            render: Render::new(device_display, config.clone()),
            run_effect,
            media_jobs,
            event_sender,
            event_receiver,
            config,
            logger,
        }
    }

    /// Handle for feeding events from outside the loop.
    pub fn sender(&self) -> Sender<Event> {
        self.event_sender.clone()
    }

    fn queue_media(&self, job: MediaJob) -> Result<(), Error> {
        self.media_jobs
            .send(job)
            .map_err(|_| "media worker stopped".into())
    }

    fn spawn_effects(&self, effects: Vec<Effect>) -> Result<(), Error> {
        for effect in effects {
            if effect.is_media() {
                self.queue_media(MediaJob::Run(effect))?;
                continue;
            }
            let run_effect = self.run_effect.clone();
            std::thread::spawn(move || run_effect.run_effect(effect));
        }
        Ok(())
    }

    /// Blocks until every media effect queued so far has run.
    fn flush_media(&self) -> Result<(), Error> {
        let (done, flushed) = channel();
        self.queue_media(MediaJob::Flush(done))?;
        flushed.recv()?;
        Ok(())
    }

    fn store(&self, model: &Model) -> Result<(), Error> {
        *self.model.lock().map_err(|_| "model lock poisoned")? = model.clone();
        Ok(())
    }

    /// Runs until a `Quit` event. Teardown effects of the final transition
    /// finish before this returns.
    pub fn run(&self) -> Result<(), Error> {
        let (initial, effects) = init();
        self.store(&initial)?;
        self.render.render(&initial)?;
        self.spawn_effects(effects)?;

        let mut current_model = initial;

        loop {
            let event = self.event_receiver.recv()?;

            let _ = self.logger.info(&format!(
                "\nold model:\n\t{}\n\nevent:\n\t{}",
                current_model.to_display_string(),
                event.to_display_string(),
            ));
            let (new_model, effects) = transition(&self.config, current_model, event);
            let _ = self.logger.info(&format!(
                "\nnew model:\n\t{}\n\neffects:\n\t{:?}",
                new_model.to_display_string(),
                effects
            ));

            self.store(&new_model)?;
            self.render.render(&new_model)?;

            if new_model.exiting {
                for effect in effects.into_iter().filter(|e| !e.is_subscription()) {
                    if effect.is_media() {
                        self.queue_media(MediaJob::Run(effect))?;
                    } else {
                        self.run_effect.run_effect(effect);
                    }
                }
                self.flush_media()?;
                return Ok(());
            }

            self.spawn_effects(effects)?;
            current_model = new_model;
        }
    }
}
