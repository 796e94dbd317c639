use crate::device_display::interface::{DeviceDisplay, DisplayFrame, DisplayInput};
use std::error::Error;
use std::io::BufRead;
use std::sync::mpsc::{channel, Receiver};

const WIDTH: usize = 64;

/// Prints each frame as a text panel and reads commands from stdin.
pub struct DeviceDisplayConsole {
    inputs_taken: bool,
}

impl DeviceDisplayConsole {
    pub fn new() -> Self {
        Self {
            inputs_taken: false,
        }
    }
}

/// Lines of the text panel, without borders.
pub fn panel_lines(frame: &DisplayFrame) -> Vec<String> {
    let mut lines = vec![frame.source.clone(), frame.health.clone()];

    lines.extend(frame.metrics.iter().cloned());

    if let Some(media) = &frame.media {
        lines.push(format!(
            "media {}x{}{}",
            media.intrinsic.width,
            media.intrinsic.height,
            if media.picture.is_some() { "" } else { " (no picture)" }
        ));
        for detection in &media.detections {
            let [x1, y1, x2, y2] = detection.bounding_box.0;
            lines.push(format!(
                "  {} [{:.2}, {:.2}, {:.2}, {:.2}]",
                detection.label_text(),
                x1,
                y1,
                x2,
                y2
            ));
        }
    }

    lines.push(frame.healing.clone());
    lines.extend(frame.falcon.iter().cloned());
    lines.extend(frame.notices.iter().map(|notice| format!("! {}", notice)));
    lines.extend(frame.log.iter().cloned());
    lines.extend(frame.chat.iter().cloned());
    lines
}

impl DeviceDisplay for DeviceDisplayConsole {
    fn show(&mut self, frame: &DisplayFrame) -> Result<(), Box<dyn Error + Send + Sync>> {
        println!("┌{}┐", "─".repeat(WIDTH));
        for line in panel_lines(frame) {
            let line: String = line.chars().take(WIDTH).collect();
            let padding = WIDTH - line.chars().count();
            println!("│{}{}│", line, " ".repeat(padding));
        }
        println!("└{}┘", "─".repeat(WIDTH));
        Ok(())
    }

    fn inputs(&mut self) -> Result<Receiver<DisplayInput>, Box<dyn Error + Send + Sync>> {
        if self.inputs_taken {
            return Err("console input already subscribed".into());
        }
        self.inputs_taken = true;

        let (sender, receiver) = channel();
        std::thread::spawn(move || {
            for line in std::io::stdin().lock().lines() {
                let Ok(line) = line else {
                    break;
                };
                if line.trim().is_empty() {
                    continue;
                }
                match DisplayInput::parse(&line) {
                    Ok(input) => {
                        if sender.send(input).is_err() {
                            break;
                        }
                    }
                    Err(e) => eprintln!("{}", e),
                }
            }
        });
        Ok(receiver)
    }
}
