mod annotate;
mod assistant;
mod config;
mod history;
mod progress;
mod references;

use iced::{
    widget::{column, container, scrollable, text, text_input, button, text_input::Id},
    Element, Length, Task, Theme, Font, Subscription,
    time, clipboard,
    keyboard::{self, Key},
    event::{self, Event as IcedEvent},
    alignment, Padding,
    window::{self, Level},
};
use std::sync::Arc;
use std::time::Duration;

fn main() -> iced::Result {
    let config = config::Config::load();

    iced::application("Guidance Assistant", App::update, App::view)
        .theme(App::theme)
        .subscription(App::subscription)
        .window(window::Settings {
            size: iced::Size::new(config.window.width as f32, config.window.height as f32),
            min_size: Some(iced::Size::new(
                config.window.min_width as f32,
                config.window.min_height as f32,
            )),
            position: window::Position::Centered,
            ..Default::default()
        })
        .default_font(Font::MONOSPACE)
        .run_with(App::new)
}

#[derive(Debug, Clone)]
enum Message {
    InputChanged(String),
    Submit,
    AnswerReady(annotate::Annotated),
    Error(String),
    Tick,
    CopyOutput,
    RecallLast,
    Exit,
}

struct App {
    input_text: String,
    answer: Option<annotate::Annotated>,
    error_text: String,
    is_loading: bool,
    loading_frame: usize,
    client: Option<Arc<assistant::AssistantClient>>,
    document_url: String,
    input_id: Id,
}

impl App {
    fn new() -> (Self, Task<Message>) {
        let config = config::Config::load();

        if let Err(e) = history::init() {
            eprintln!("Warning: could not initialize history store: {}", e);
        }

        let client = config::Config::load_api_key()
            .map(|api_key| Arc::new(assistant::AssistantClient::new(&config.assistant, api_key)));
        if client.is_none() {
            eprintln!("Warning: no API key found. Set OPENAI_API_KEY or add api_keys.toml.");
        }

        let input_id = Id::unique();

        let app = App {
            input_text: String::new(),
            answer: None,
            error_text: String::new(),
            is_loading: false,
            loading_frame: 0,
            client,
            document_url: config.document.url,
            input_id: input_id.clone(),
        };

        let focus_task = text_input::focus(input_id);
        let window_task = window::get_latest()
            .and_then(|id| window::change_level(id, Level::AlwaysOnTop));

        (app, Task::batch([focus_task, window_task]))
    }

    fn update(&mut self, message: Message) -> Task<Message> {
        match message {
            Message::InputChanged(value) => {
                self.input_text = value;
                Task::none()
            }
            Message::Submit => {
                // One query in flight at a time.
                if self.input_text.trim().is_empty() || self.is_loading {
                    return Task::none();
                }

                let Some(client) = self.client.clone() else {
                    self.answer = None;
                    self.error_text =
                        "No API key configured. Set OPENAI_API_KEY or add api_keys.toml."
                            .to_string();
                    return Task::none();
                };

                let prompt = self.input_text.clone();
                let document_url = self.document_url.clone();
                self.is_loading = true;
                self.answer = None;
                self.error_text = String::new();
                progress::clear();
                progress::log("Submitting question");

                Task::future(async move {
                    match client.submit_query(&prompt).await {
                        Ok(raw) => {
                            let annotated = annotate::annotate(&raw, &document_url);
                            if let Err(e) =
                                history::add_entry(&prompt, &annotated.html, &annotated.citations)
                            {
                                eprintln!("Warning: could not record history: {}", e);
                            }
                            Message::AnswerReady(annotated)
                        }
                        Err(e) => Message::Error(format!("Error: {}", e)),
                    }
                })
            }
            Message::AnswerReady(annotated) => {
                self.answer = Some(annotated);
                self.is_loading = false;
                Task::none()
            }
            Message::Error(error) => {
                self.error_text = error;
                self.is_loading = false;
                Task::none()
            }
            Message::Tick => {
                if self.is_loading {
                    self.loading_frame = (self.loading_frame + 1) % 10;
                }
                Task::none()
            }
            Message::CopyOutput => {
                if let Some(answer) = &self.answer {
                    clipboard::write(answer.html.clone())
                } else {
                    Task::none()
                }
            }
            Message::RecallLast => {
                if self.is_loading {
                    return Task::none();
                }
                match history::last_entry() {
                    Ok(Some(entry)) => {
                        self.input_text = entry.prompt;
                        self.answer = Some(annotate::Annotated {
                            html: entry.response,
                            citations: entry.citations,
                        });
                        self.error_text = String::new();
                    }
                    Ok(None) => {}
                    Err(e) => eprintln!("Warning: could not read history: {}", e),
                }
                Task::none()
            }
            Message::Exit => {
                iced::exit()
            }
        }
    }

    fn subscription(&self) -> Subscription<Message> {
        let timer = if self.is_loading {
            time::every(Duration::from_millis(80)).map(|_| Message::Tick)
        } else {
            Subscription::none()
        };

        let events = event::listen_with(|event, _status, _id| {
            match event {
                IcedEvent::Keyboard(keyboard::Event::KeyPressed {
                    key: Key::Named(keyboard::key::Named::Escape),
                    ..
                }) => Some(Message::Exit),
                IcedEvent::Keyboard(keyboard::Event::KeyPressed {
                    key: Key::Named(keyboard::key::Named::ArrowUp),
                    ..
                }) => Some(Message::RecallLast),
                _ => None,
            }
        });

        Subscription::batch([timer, events])
    }

    fn view(&self) -> Element<Message> {
        let input = text_input("Ask about the guidance document...", &self.input_text)
            .on_input(Message::InputChanged)
            .on_submit(Message::Submit)
            .padding(15)
            .size(18)
            .id(self.input_id.clone());

        let output: Element<Message> = if self.is_loading {
            let loading_frames = ["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];
            let spinner_idx = self.loading_frame % loading_frames.len();

            let stage = progress::latest()
                .map(|entry| format!("[{}] {}", entry.kind.label(), entry.text))
                .unwrap_or_else(|| "Contacting the assistant...".to_string());

            container(
                column![
                    text(loading_frames[spinner_idx].to_string())
                        .size(32),
                    text(stage)
                        .size(15)
                ]
                .spacing(10)
                .align_x(alignment::Horizontal::Center)
            )
            .width(Length::Fill)
            .height(Length::Fill)
            .align_x(alignment::Horizontal::Center)
            .align_y(alignment::Vertical::Center)
            .into()
        } else if let Some(answer) = &self.answer {
            let mut body = column![
                text(annotate::display_text(&answer.html)).size(15)
            ]
            .spacing(10);

            if !answer.citations.is_empty() {
                let mut sources = column![text("Sources").size(14)].spacing(4);
                for (i, citation) in answer.citations.iter().enumerate() {
                    sources = sources.push(text(format!("{}. {}", i + 1, citation)).size(13));
                }
                sources = sources.push(
                    text(format!("Document: {}", self.document_url)).size(13),
                );
                body = body.push(sources);
            }

            scrollable(
                container(body)
                    .padding(15)
                    .width(Length::Fill)
            )
            .height(Length::Fill)
            .into()
        } else {
            scrollable(
                container(text(self.error_text.clone()).size(15))
                    .padding(15)
                    .width(Length::Fill)
            )
            .height(Length::Fill)
            .into()
        };

        let mut content_column = column![input, output]
            .spacing(10)
            .padding(10);

        if self.answer.is_some() && !self.is_loading {
            let copy_button = container(
                button(text("[Copy]").size(14))
                    .on_press(Message::CopyOutput)
                    .padding(10)
            )
            .width(Length::Fill)
            .align_x(alignment::Horizontal::Right)
            .padding(Padding::from([10, 10]));

            content_column = content_column.push(copy_button);
        }

        container(content_column)
            .width(Length::Fill)
            .height(Length::Fill)
            .into()
    }

    fn theme(&self) -> Theme {
        Theme::TokyoNight
    }
}
