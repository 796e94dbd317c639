#[cfg(test)]
mod main_test {

    use std::path::PathBuf;
    use std::time::Duration;

    use crate::device_camera::interface::DeviceCamera;
    use crate::device_display::interface::DisplayInput;
    use crate::device_player::impl_fake::PlayerCall;
    use crate::device_player::interface::{MediaEvent, MediaEventKind};
    use crate::overlay_app::core::Event;
    use crate::overlay_app::tests::fixture::{wait_for_frame, wait_until, Fixture};

    #[test]
    fn test_live_stream_is_released_on_quit() {
        let Fixture {
            device_camera,
            device_display,
            duplex,
            overlay_app,
            ..
        } = Fixture::new();
        let sender = overlay_app.sender();
        let handle = std::thread::spawn(move || overlay_app.run());

        sender.send(Event::StartLiveStream).unwrap();

        let frame = wait_for_frame(&device_display, |frame| {
            frame.source == "Live"
                && frame.metrics.iter().any(|m| m.contains("objects"))
                && frame
                    .media
                    .as_ref()
                    .is_some_and(|media| media.picture.is_some())
        });
        assert_eq!(frame.media.unwrap().intrinsic.width, 320.0);
        assert_eq!(duplex.open_channels(), 1);
        assert_eq!(device_camera.active_tracks(), 1);

        device_display.lock().unwrap().input(DisplayInput::Quit);
        handle.join().unwrap().unwrap();

        assert_eq!(device_camera.active_tracks(), 0);
        assert_eq!(duplex.open_channels(), 0);
        assert!(device_display.lock().unwrap().last_frame().unwrap().exiting);
    }

    #[test]
    fn test_image_is_decoded_and_annotated() {
        let f = Fixture::new();
        let path = std::env::temp_dir().join(format!("overlay-main-test-{}.png", std::process::id()));
        image::RgbaImage::new(64, 48).save(&path).unwrap();

        let sender = f.overlay_app.sender();
        let device_display = f.device_display.clone();
        let overlay_app = f.overlay_app;
        let handle = std::thread::spawn(move || overlay_app.run());

        sender.send(Event::LoadImage(path.clone())).unwrap();

        let frame = wait_for_frame(&device_display, |frame| {
            frame.source.starts_with("Image: overlay-main-test-")
                && frame.metrics.iter().any(|m| m.contains("objects in"))
                && frame
                    .media
                    .as_ref()
                    .is_some_and(|media| media.picture.is_some())
        });
        let media = frame.media.unwrap();
        assert_eq!(media.intrinsic.width, 64.0);
        assert_eq!(media.intrinsic.height, 48.0);
        assert!(!media.detections.is_empty());

        sender.send(Event::Quit).unwrap();
        handle.join().unwrap().unwrap();
        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn test_video_annotations_follow_player_events() {
        let f = Fixture::new();
        let sender = f.overlay_app.sender();
        let device_display = f.device_display.clone();
        let device_player = f.device_player.clone();
        let overlay_app = f.overlay_app;
        let handle = std::thread::spawn(move || overlay_app.run());

        sender.send(Event::LoadVideo(PathBuf::from("drill.mp4"))).unwrap();

        wait_for_frame(&device_display, |frame| {
            frame.metrics.iter().any(|m| m.starts_with("20 frames"))
        });

        device_player.emit(MediaEvent {
            kind: MediaEventKind::Seeked,
            current_time: 1.1,
        });

        let frame = wait_for_frame(&device_display, |frame| {
            frame
                .metrics
                .iter()
                .any(|m| m == "Frame 33 -> annotations of frame 30")
        });
        assert!(!frame.media.unwrap().detections.is_empty());

        sender.send(Event::Quit).unwrap();
        handle.join().unwrap().unwrap();
    }

    #[test]
    fn test_rapid_start_stop_leaves_nothing_open() {
        let Fixture {
            device_camera,
            device_display,
            duplex,
            overlay_app,
            ..
        } = Fixture::new();
        let sender = overlay_app.sender();
        let handle = std::thread::spawn(move || overlay_app.run());

        for _ in 0..20 {
            sender.send(Event::StartLiveStream).unwrap();
            sender.send(Event::StopLiveStream).unwrap();
        }
        sender.send(Event::StartLiveStream).unwrap();

        wait_for_frame(&device_display, |frame| {
            frame.source == "Live"
                && frame
                    .media
                    .as_ref()
                    .is_some_and(|media| media.picture.is_some())
        });
        sender.send(Event::StopLiveStream).unwrap();

        wait_for_frame(&device_display, |frame| frame.source == "Idle");
        wait_until("camera and transport are released", || {
            device_camera.active_tracks() == 0 && duplex.open_channels() == 0
        });
        std::thread::sleep(Duration::from_millis(100));
        assert_eq!(device_camera.active_tracks(), 0);
        assert_eq!(duplex.open_channels(), 0);

        sender.send(Event::Quit).unwrap();
        handle.join().unwrap().unwrap();
        assert_eq!(device_camera.active_tracks(), 0);
    }

    #[test]
    fn test_loading_image_releases_live_stream() {
        let Fixture {
            device_camera,
            device_display,
            duplex,
            overlay_app,
            ..
        } = Fixture::new();
        let path = std::env::temp_dir().join(format!("overlay-replace-test-{}.png", std::process::id()));
        image::RgbaImage::new(32, 32).save(&path).unwrap();
        let sender = overlay_app.sender();
        let handle = std::thread::spawn(move || overlay_app.run());

        sender.send(Event::StartLiveStream).unwrap();
        sender.send(Event::LoadImage(path.clone())).unwrap();

        wait_for_frame(&device_display, |frame| {
            frame.source.starts_with("Image: overlay-replace-test-")
                && frame
                    .media
                    .as_ref()
                    .is_some_and(|media| media.picture.is_some())
        });
        wait_until("camera and transport are released", || {
            device_camera.active_tracks() == 0 && duplex.open_channels() == 0
        });
        std::thread::sleep(Duration::from_millis(100));
        assert_eq!(device_camera.active_tracks(), 0);
        assert_eq!(duplex.open_channels(), 0);

        sender.send(Event::Quit).unwrap();
        handle.join().unwrap().unwrap();
        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn test_second_video_keeps_receiving_player_events() {
        let f = Fixture::new();
        let sender = f.overlay_app.sender();
        let device_display = f.device_display.clone();
        let device_player = f.device_player.clone();
        let overlay_app = f.overlay_app;
        let handle = std::thread::spawn(move || overlay_app.run());

        sender.send(Event::LoadVideo(PathBuf::from("first.mp4"))).unwrap();
        sender.send(Event::LoadVideo(PathBuf::from("second.mp4"))).unwrap();

        wait_for_frame(&device_display, |frame| {
            frame.source == "Video: second.mp4"
                && frame.metrics.iter().any(|m| m.starts_with("20 frames"))
        });
        assert_eq!(
            device_player.calls(),
            vec![
                PlayerCall::Load(PathBuf::from("first.mp4")),
                PlayerCall::Close,
                PlayerCall::Load(PathBuf::from("second.mp4")),
            ]
        );

        device_player.emit(MediaEvent {
            kind: MediaEventKind::Seeked,
            current_time: 1.1,
        });

        wait_for_frame(&device_display, |frame| {
            frame
                .metrics
                .iter()
                .any(|m| m == "Frame 33 -> annotations of frame 30")
        });

        sender.send(Event::Quit).unwrap();
        handle.join().unwrap().unwrap();
    }
}
