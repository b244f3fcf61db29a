//! Desktop window front-end
//!
//! The window never blocks on the assistant. Each interaction runs on its own
//! worker thread, which drives the async pipeline on the shared runtime and
//! reports back through [`UiEvent`]s.

use std::sync::mpsc::{self, Receiver, Sender};
use std::time::Duration;

use eframe::egui;

use crate::assistant::Assistant;
use crate::voice::{Heard, Listener};

/// Window title
pub const WINDOW_TITLE: &str = "MΛLIK • Voice AI";

/// First line in the chat log
pub const WELCOME: &str = "What’s good? I’m online and ready to help. 👋";

/// Shown when the microphone opens
pub const LISTENING: &str = "I’m listening… go ahead. 🎙️";

/// Lets the last reply finish before the window closes
const CLOSE_DELAY: Duration = Duration::from_millis(1500);

/// Header status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Standby,
    Listening,
    Processing,
    Thinking,
    Offline,
}

impl Status {
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Standby => "Standby 💤",
            Self::Listening => "Listening 🎧…",
            Self::Processing => "Processing 🧠…",
            Self::Thinking => "Thinking 🧠…",
            Self::Offline => "Offline ❌",
        }
    }
}

/// Who a chat line belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Who {
    You,
    Malik,
}

impl Who {
    #[must_use]
    pub const fn prefix(self) -> &'static str {
        match self {
            Self::You => "🧍 You:",
            Self::Malik => "🤖 Malik:",
        }
    }

    #[must_use]
    pub const fn color(self) -> egui::Color32 {
        match self {
            Self::You => egui::Color32::from_rgb(0x91, 0xE6, 0xFF),
            Self::Malik => egui::Color32::from_rgb(0xA3, 0xFF, 0x9B),
        }
    }
}

/// Update posted from a worker thread to the window
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UiEvent {
    Status(Status),
    Message(Who, String),
    Close,
}

/// Posts events to the window and wakes it
#[derive(Clone)]
pub struct EventSink {
    tx: Sender<UiEvent>,
    ctx: Option<egui::Context>,
}

impl EventSink {
    #[must_use]
    pub const fn new(tx: Sender<UiEvent>, ctx: Option<egui::Context>) -> Self {
        Self { tx, ctx }
    }

    pub fn send(&self, event: UiEvent) {
        if self.tx.send(event).is_err() {
            tracing::debug!("window closed, dropping event");
        }
        if let Some(ctx) = &self.ctx {
            ctx.request_repaint();
        }
    }
}

/// Route typed or recognized text, speak and show the reply
pub async fn handle_text(assistant: &Assistant, sink: &EventSink, text: &str) {
    sink.send(UiEvent::Status(Status::Thinking));

    let reply = assistant.handle(text).await;
    assistant.speak(&reply.text).await;
    sink.send(UiEvent::Message(Who::Malik, reply.text.clone()));

    if reply.is_shutdown() {
        sink.send(UiEvent::Status(Status::Offline));
        tokio::time::sleep(CLOSE_DELAY).await;
        sink.send(UiEvent::Close);
    } else {
        sink.send(UiEvent::Status(Status::Standby));
    }
}

/// Listen for one command, show it, then handle it like typed text
#[allow(clippy::future_not_send)]
pub async fn handle_mic(assistant: &Assistant, listener: Option<&Listener>, sink: &EventSink) {
    let heard = match listener {
        Some(listener) => listener.listen_command().await,
        None => {
            tracing::warn!("speech recognition not configured");
            Heard::ServiceDown
        }
    };
    sink.send(UiEvent::Status(Status::Processing));

    let text = heard.into_text();
    sink.send(UiEvent::Message(Who::You, text.clone()));
    handle_text(assistant, sink, &text).await;
}

enum Job {
    Text(String),
    Mic,
}

/// The chat window
pub struct MalikApp {
    assistant: Assistant,
    listener: Option<Listener>,
    runtime: tokio::runtime::Handle,
    tx: Sender<UiEvent>,
    rx: Receiver<UiEvent>,
    messages: Vec<(Who, String)>,
    input: String,
    status: Status,
}

impl MalikApp {
    #[must_use]
    pub fn new(
        assistant: Assistant,
        listener: Option<Listener>,
        runtime: tokio::runtime::Handle,
    ) -> Self {
        let (tx, rx) = mpsc::channel();
        Self {
            assistant,
            listener,
            runtime,
            tx,
            rx,
            messages: vec![(Who::Malik, WELCOME.to_string())],
            input: String::new(),
            status: Status::Standby,
        }
    }

    fn submit(&mut self, ctx: &egui::Context) {
        let text = self.input.trim().to_string();
        if text.is_empty() {
            return;
        }
        self.input.clear();
        self.messages.push((Who::You, text.clone()));
        self.spawn_worker(ctx, Job::Text(text));
    }

    fn listen(&mut self, ctx: &egui::Context) {
        self.status = Status::Listening;
        self.messages.push((Who::Malik, LISTENING.to_string()));
        self.spawn_worker(ctx, Job::Mic);
    }

    fn spawn_worker(&self, ctx: &egui::Context, job: Job) {
        let assistant = self.assistant.clone();
        let listener = self.listener.clone();
        let runtime = self.runtime.clone();
        let sink = EventSink::new(self.tx.clone(), Some(ctx.clone()));

        let spawned = std::thread::Builder::new()
            .name("malik-worker".to_string())
            .spawn(move || {
                runtime.block_on(async move {
                    match job {
                        Job::Text(text) => handle_text(&assistant, &sink, &text).await,
                        Job::Mic => handle_mic(&assistant, listener.as_ref(), &sink).await,
                    }
                });
            });

        if let Err(e) = spawned {
            tracing::error!(error = %e, "failed to spawn worker thread");
        }
    }

    fn drain_events(&mut self, ctx: &egui::Context) {
        while let Ok(event) = self.rx.try_recv() {
            match event {
                UiEvent::Status(status) => self.status = status,
                UiEvent::Message(who, text) => self.messages.push((who, text)),
                UiEvent::Close => ctx.send_viewport_cmd(egui::ViewportCommand::Close),
            }
        }
    }
}

impl eframe::App for MalikApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.drain_events(ctx);

        egui::TopBottomPanel::top("header").show(ctx, |ui| {
            ui.horizontal(|ui| {
                ui.label(egui::RichText::new("MΛLIK").size(28.0).strong());
                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    ui.label(egui::RichText::new(self.status.label()).size(14.0));
                });
            });
        });

        egui::TopBottomPanel::bottom("input").show(ctx, |ui| {
            ui.add_space(8.0);
            ui.horizontal(|ui| {
                let entry = ui.add(
                    egui::TextEdit::singleline(&mut self.input)
                        .hint_text("Type a message or press 🎤 to talk...")
                        .desired_width(ui.available_width() - 120.0),
                );
                let entered = entry.lost_focus() && ui.input(|i| i.key_pressed(egui::Key::Enter));
                let mic = ui
                    .add(egui::Button::new("🎤").min_size(egui::vec2(50.0, 0.0)))
                    .clicked();
                let send = ui.button("Send").clicked();

                if entered || send {
                    self.submit(ctx);
                    entry.request_focus();
                }
                if mic {
                    self.listen(ctx);
                }
            });
            ui.add_space(8.0);
        });

        egui::CentralPanel::default().show(ctx, |ui| {
            egui::ScrollArea::vertical()
                .auto_shrink([false; 2])
                .stick_to_bottom(true)
                .show(ui, |ui| {
                    for (who, text) in &self.messages {
                        ui.horizontal_wrapped(|ui| {
                            ui.label(egui::RichText::new(who.prefix()).color(who.color()).strong());
                            ui.label(egui::RichText::new(text).size(14.0));
                        });
                        ui.add_space(8.0);
                    }
                });
        });
    }
}

/// Open the window; blocks until it closes
///
/// # Errors
///
/// Returns error if the native window cannot be created
pub fn run(
    assistant: Assistant,
    listener: Option<Listener>,
    runtime: tokio::runtime::Handle,
) -> eframe::Result<()> {
    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_title(WINDOW_TITLE)
            .with_inner_size([900.0, 600.0])
            .with_min_inner_size([800.0, 500.0]),
        ..Default::default()
    };

    eframe::run_native(
        WINDOW_TITLE,
        options,
        Box::new(move |cc| {
            cc.egui_ctx.set_visuals(egui::Visuals::dark());
            Ok(Box::new(MalikApp::new(assistant, listener, runtime)))
        }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::brain::CommandRouter;

    fn sink() -> (EventSink, Receiver<UiEvent>) {
        let (tx, rx) = mpsc::channel();
        (EventSink::new(tx, None), rx)
    }

    fn assistant() -> Assistant {
        Assistant::new(CommandRouter::new(None), None)
    }

    #[tokio::test]
    async fn typed_text_posts_reply() {
        let (sink, rx) = sink();
        handle_text(&assistant(), &sink, "tell me a joke").await;

        let events: Vec<_> = rx.try_iter().collect();
        assert_eq!(
            events,
            [
                UiEvent::Status(Status::Thinking),
                UiEvent::Message(
                    Who::Malik,
                    "Why did the AI go broke? Because it had too many neural debts!".to_string()
                ),
                UiEvent::Status(Status::Standby),
            ]
        );
    }

    #[tokio::test]
    async fn shutdown_goes_offline_then_closes() {
        let (sink, rx) = sink();
        handle_text(&assistant(), &sink, "shut down").await;

        let events: Vec<_> = rx.try_iter().collect();
        assert_eq!(events[1], UiEvent::Message(Who::Malik, "Shutting down. Goodbye.".to_string()));
        assert_eq!(events[2], UiEvent::Status(Status::Offline));
        assert_eq!(events[3], UiEvent::Close);
    }

    #[tokio::test]
    async fn mic_without_recognizer_reports_service_down() {
        let (sink, rx) = sink();
        handle_mic(&assistant(), None, &sink).await;

        let events: Vec<_> = rx.try_iter().collect();
        assert_eq!(events[0], UiEvent::Status(Status::Processing));
        assert_eq!(
            events[1],
            UiEvent::Message(Who::You, crate::voice::SERVICE_DOWN.to_string())
        );
    }

    #[test]
    fn status_labels() {
        assert_eq!(Status::Standby.label(), "Standby 💤");
        assert_eq!(Status::Offline.label(), "Offline ❌");
        assert_eq!(Who::You.color(), egui::Color32::from_rgb(145, 230, 255));
    }
}
