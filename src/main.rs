use backend::impl_fake::BackendFake;
use backend::impl_http::BackendHttp;
use backend::interface::Backend;
use clap::Parser;
use cli::{run_chat, run_falcon, Cli, Command, DisplayKind};
use config::Config;
use device_camera::impl_fake::DeviceCameraFake;
use device_camera::impl_image_file::DeviceCameraImageFile;
use device_camera::interface::DeviceCamera;
use device_display::impl_console::DeviceDisplayConsole;
use device_display::impl_gui::{run_window, DeviceDisplayGui};
use device_player::impl_clock::DevicePlayerClock;
use duplex::impl_websocket::DuplexConnectorWebSocket;
use library::logger::impl_console::LoggerConsole;
use library::logger::interface::Logger;
use live_stream::bridge::LiveStreamBridge;
use overlay_app::main::OverlayApp;
use std::sync::{Arc, Mutex};

mod annotation_store;
mod backend;
mod cli;
mod config;
mod detection;
mod device_camera;
mod device_display;
mod device_player;
mod duplex;
mod frame_resolver;
mod library;
mod live_stream;
mod overlay;
mod overlay_app;
mod picture;

type Error = Box<dyn std::error::Error + Send + Sync>;

fn main() -> Result<(), Error> {
    let cli = Cli::parse();

    let mut config = Config::from_env();
    cli.apply(&mut config);

    let logger: Arc<dyn Logger + Send + Sync> =
        Arc::new(LoggerConsole::new(config.logger_timezone));

    let backend: Arc<dyn Backend + Send + Sync> = if cli.fake_backend {
        Arc::new(BackendFake::new(logger.clone()))
    } else {
        Arc::new(BackendHttp::new(config.clone(), logger.clone())?)
    };

    if let Some(Command::Falcon { command }) = &cli.command {
        for line in run_falcon(backend.as_ref(), command)? {
            println!("{}", line);
        }
        return Ok(());
    }

    if let Some(Command::Chat { question, image }) = &cli.command {
        for line in run_chat(backend.as_ref(), question, image.as_deref())? {
            println!("{}", line);
        }
        return Ok(());
    }

    let device_camera: Arc<dyn DeviceCamera + Send + Sync> = match &cli.camera_image {
        Some(path) => Arc::new(DeviceCameraImageFile::new(logger.clone(), path.clone())),
        None => Arc::new(DeviceCameraFake::new(logger.clone())),
    };
    let device_player = Arc::new(DevicePlayerClock::new(
        logger.clone(),
        config.player_tick_rate,
    ));
    let live_stream = LiveStreamBridge::new(
        config.clone(),
        logger.clone(),
        device_camera,
        Arc::new(DuplexConnectorWebSocket::new(logger.clone())),
    );
    let initial_event = cli.command.as_ref().and_then(Command::initial_event);

    match cli.display {
        DisplayKind::Console => {
            let device_display = Arc::new(Mutex::new(DeviceDisplayConsole::new()));
            let app = OverlayApp::new(
                config,
                logger,
                backend,
                device_player,
                device_display,
                live_stream,
            );
            if let Some(event) = initial_event {
                app.sender().send(event)?;
            }
            app.run()
        }
        DisplayKind::Gui => {
            let gui = DeviceDisplayGui::new();
            let window = gui.window(config.overlay.clone());
            let device_display = Arc::new(Mutex::new(gui));
            let app = OverlayApp::new(
                config,
                logger.clone(),
                backend,
                device_player,
                device_display,
                live_stream,
            );
            if let Some(event) = initial_event {
                app.sender().send(event)?;
            }

            let session = std::thread::spawn(move || app.run());
            if let Err(e) = run_window(window) {
                let _ = logger.error(&format!("Window failed: {}", e));
            }
            session
                .join()
                .map_err(|_| "session thread panicked")?
        }
    }
}
