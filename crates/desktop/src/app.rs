use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use crossbeam_channel::Receiver;
use iced::widget::{button, column, container, row, scrollable, text};
use iced::{Element, Length, Subscription, Task, Theme};

use facetone_core::capture::domain::image_loader::ImageSource;
use facetone_core::shared::constants::IMAGE_EXTENSIONS;

use crate::settings::{Appearance, Settings};
use crate::tabs;
use crate::tabs::camera_tab::{CameraState, CameraStatus};
use crate::tabs::image_tab::{ImageState, ImageStatus};
use crate::theme;
use crate::workers::image_worker::{self, ImageMessage, ImageParams};
use crate::workers::model_cache::ModelCache;
use crate::workers::session_worker::{self, CameraStop, SessionMessage, SessionParams};

const WORKER_POLL: Duration = Duration::from_millis(33);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tab {
    Camera,
    Image,
    Settings,
    Appearance,
    About,
}

impl Tab {
    const ALL: &[Tab] = &[
        Tab::Camera,
        Tab::Image,
        Tab::Settings,
        Tab::Appearance,
        Tab::About,
    ];

    fn label(self) -> &'static str {
        match self {
            Tab::Camera => "Camera",
            Tab::Image => "Image",
            Tab::Settings => "Settings",
            Tab::Appearance => "Appearance",
            Tab::About => "About",
        }
    }
}

#[derive(Debug, Clone)]
pub enum Message {
    TabSelected(Tab),
    OpenLink(&'static str),
    StartCamera,
    StopCamera,
    PollWorkers,
    SelectImage,
    ImageSelected(Option<PathBuf>),
    ImageUrlChanged(String),
    AnalyzeUrl,
    FileHovered(bool),
    FileDropped(PathBuf),
    ConfidenceChanged(u32),
    TickIntervalChanged(u32),
    CameraDeviceChanged(String),
    RestoreDefaults,
    AppearanceChanged(Appearance),
    HighContrastChanged(bool),
    FontScaleChanged(f32),
    PollSystemTheme,
}

struct CameraWorker {
    rx: Receiver<SessionMessage>,
    stop: Arc<CameraStop>,
}

pub struct App {
    active_tab: Tab,
    settings: Settings,
    model_cache: Arc<ModelCache>,
    camera: CameraState,
    camera_worker: Option<CameraWorker>,
    image: ImageState,
    image_rx: Option<Receiver<ImageMessage>>,
    file_hovered: bool,
}

impl App {
    pub fn new() -> (Self, Task<Message>) {
        (
            Self {
                active_tab: Tab::Camera,
                settings: Settings::load(),
                model_cache: ModelCache::new(),
                camera: CameraState::default(),
                camera_worker: None,
                image: ImageState::default(),
                image_rx: None,
                file_hovered: false,
            },
            Task::none(),
        )
    }

    pub fn update(&mut self, message: Message) -> Task<Message> {
        match message {
            Message::TabSelected(tab) => {
                self.active_tab = tab;
            }
            Message::OpenLink(url) => {
                if let Err(e) = open::that(url) {
                    log::warn!("Failed to open {url}: {e}");
                }
            }
            Message::StartCamera => self.start_camera(),
            Message::StopCamera => {
                if let Some(worker) = &self.camera_worker {
                    worker.stop.request();
                    self.camera.status = CameraStatus::Stopping;
                }
            }
            Message::PollWorkers => {
                self.poll_camera();
                self.poll_image();
            }
            Message::SelectImage => {
                return Task::perform(
                    async {
                        rfd::AsyncFileDialog::new()
                            .set_title("Select an image")
                            .add_filter("Images", IMAGE_EXTENSIONS)
                            .pick_file()
                            .await
                            .map(|h| h.path().to_path_buf())
                    },
                    Message::ImageSelected,
                );
            }
            Message::ImageSelected(Some(path)) | Message::FileDropped(path) => {
                self.file_hovered = false;
                self.active_tab = Tab::Image;
                if is_image(&path) {
                    self.analyze_image(ImageSource::File(path));
                } else {
                    self.image.status = ImageStatus::Failed(format!(
                        "Unsupported file: {}",
                        path.display()
                    ));
                }
            }
            Message::ImageSelected(None) => {}
            Message::ImageUrlChanged(url) => {
                self.image.url = url;
            }
            Message::AnalyzeUrl => {
                let url = self.image.url.trim().to_string();
                if !url.is_empty() {
                    self.analyze_image(ImageSource::from_arg(&url));
                }
            }
            Message::FileHovered(hovered) => {
                self.file_hovered = hovered;
            }
            Message::ConfidenceChanged(val) => {
                self.settings.confidence = val;
                self.settings.save();
            }
            Message::TickIntervalChanged(val) => {
                self.settings.tick_interval_ms = val;
                self.settings.save();
            }
            Message::CameraDeviceChanged(device) => {
                self.settings.camera_device = device;
                self.settings.save();
            }
            Message::RestoreDefaults => {
                let defaults = Settings::default();
                self.settings.confidence = defaults.confidence;
                self.settings.tick_interval_ms = defaults.tick_interval_ms;
                self.settings.camera_device = defaults.camera_device;
                self.settings.save();
            }
            Message::AppearanceChanged(appearance) => {
                self.settings.appearance = appearance;
                self.settings.save();
            }
            Message::HighContrastChanged(enabled) => {
                self.settings.high_contrast = enabled;
                self.settings.save();
            }
            Message::FontScaleChanged(scale) => {
                self.settings.font_scale = scale;
                self.settings.save();
            }
            Message::PollSystemTheme => {
                // theme() re-reads the system setting on every render.
            }
        }
        Task::none()
    }

    fn start_camera(&mut self) {
        if self.camera_worker.is_some() {
            return;
        }
        self.camera.begin();
        let (rx, stop) = session_worker::spawn(SessionParams {
            device: self.settings.camera_device.clone(),
            confidence: self.settings.confidence_fraction(),
            tick_interval: self.settings.tick_interval(),
            model_cache: self.model_cache.clone(),
        });
        self.camera_worker = Some(CameraWorker { rx, stop });
    }

    fn poll_camera(&mut self) {
        let Some(worker) = &self.camera_worker else {
            return;
        };
        let messages: Vec<SessionMessage> = worker.rx.try_iter().collect();
        for message in messages {
            match message {
                SessionMessage::DownloadProgress(downloaded, total) => {
                    if let CameraStatus::Loading(_) = self.camera.status {
                        self.camera.status = CameraStatus::Loading(Some((downloaded, total)));
                    }
                }
                SessionMessage::Started(description) => {
                    if self.camera.status != CameraStatus::Stopping {
                        self.camera.status = CameraStatus::Running(description);
                    }
                }
                SessionMessage::Frame(frame) => self.camera.show_frame(frame),
                SessionMessage::Warning(warning) => {
                    log::warn!("Camera session: {warning}");
                    self.camera.push_log(format!("Warning: {warning}"));
                }
                SessionMessage::Finished(summary) => {
                    self.camera.summary = Some(summary);
                    self.finish_camera();
                }
                SessionMessage::Error(error) => {
                    log::error!("Camera session failed: {error}");
                    self.camera.error = Some(error);
                    self.finish_camera();
                }
                SessionMessage::Cancelled => self.finish_camera(),
            }
        }
    }

    fn finish_camera(&mut self) {
        self.camera.status = CameraStatus::Idle;
        self.camera_worker = None;
    }

    fn analyze_image(&mut self, source: ImageSource) {
        if self.image.is_working() {
            return;
        }
        self.image.begin(source.to_string());
        self.image_rx = Some(image_worker::spawn(ImageParams {
            source,
            confidence: self.settings.confidence_fraction(),
            model_cache: self.model_cache.clone(),
        }));
    }

    fn poll_image(&mut self) {
        let Some(rx) = &self.image_rx else {
            return;
        };
        let messages: Vec<ImageMessage> = rx.try_iter().collect();
        for message in messages {
            match message {
                ImageMessage::DownloadProgress(downloaded, total) => {
                    self.image.status = ImageStatus::Working(Some((downloaded, total)));
                }
                ImageMessage::Complete(result) => {
                    self.image.finish(result);
                    self.image_rx = None;
                }
                ImageMessage::Error(error) => {
                    log::error!("Image analysis failed: {error}");
                    self.image.status = ImageStatus::Failed(error);
                    self.image_rx = None;
                }
            }
        }
    }

    pub fn view(&self) -> Element<'_, Message> {
        let fs = self.settings.font_scale;

        let tab_bar = row(Tab::ALL
            .iter()
            .map(|&tab| {
                let label = text(tab.label()).size(scaled(13.0, fs));
                let btn = button(label)
                    .on_press(Message::TabSelected(tab))
                    .padding([6, 14]);
                if tab == self.active_tab {
                    btn.style(button::primary).into()
                } else {
                    btn.style(button::text).into()
                }
            })
            .collect::<Vec<_>>())
        .spacing(2);

        let theme = self.theme();
        let content: Element<'_, Message> = match self.active_tab {
            Tab::Camera => tabs::camera_tab::view(&self.camera, fs),
            Tab::Image => tabs::image_tab::view(&self.image, fs, &theme, self.file_hovered),
            Tab::Settings => tabs::settings_tab::view(&self.settings),
            Tab::Appearance => tabs::appearance_tab::view(&self.settings),
            Tab::About => tabs::about_tab::view(fs),
        };

        let tab_content = container(scrollable(content).height(Length::Fill))
            .padding(16)
            .height(Length::Fill);

        column![tab_bar, tab_content]
            .spacing(0)
            .height(Length::Fill)
            .into()
    }

    pub fn theme(&self) -> Theme {
        theme::resolve_theme(self.settings.appearance, self.settings.high_contrast)
    }

    pub fn subscription(&self) -> Subscription<Message> {
        let mut subscriptions = vec![iced::event::listen_with(file_drop_event)];
        if self.camera_worker.is_some() || self.image_rx.is_some() {
            subscriptions.push(iced::time::every(WORKER_POLL).map(|_| Message::PollWorkers));
        }
        if self.settings.appearance == Appearance::System {
            subscriptions
                .push(iced::time::every(Duration::from_secs(2)).map(|_| Message::PollSystemTheme));
        }
        Subscription::batch(subscriptions)
    }
}

impl Drop for App {
    fn drop(&mut self) {
        if let Some(worker) = &self.camera_worker {
            worker.stop.request();
        }
    }
}

fn file_drop_event(
    event: iced::Event,
    _status: iced::event::Status,
    _window: iced::window::Id,
) -> Option<Message> {
    match event {
        iced::Event::Window(iced::window::Event::FileHovered(_)) => {
            Some(Message::FileHovered(true))
        }
        iced::Event::Window(iced::window::Event::FilesHoveredLeft) => {
            Some(Message::FileHovered(false))
        }
        iced::Event::Window(iced::window::Event::FileDropped(path)) => {
            Some(Message::FileDropped(path))
        }
        _ => None,
    }
}

fn is_image(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| IMAGE_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}

/// Scale a base font size by the user's font_scale setting.
pub fn scaled(base: f32, font_scale: f32) -> f32 {
    (base * font_scale).round()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scaled_rounds() {
        assert_eq!(scaled(13.0, 1.0), 13.0);
        assert_eq!(scaled(13.0, 1.5), 20.0);
    }

    #[test]
    fn test_is_image_ignores_case() {
        assert!(is_image(Path::new("face.JPG")));
        assert!(!is_image(Path::new("clip.mp4")));
        assert!(!is_image(Path::new("noext")));
    }

    #[test]
    fn test_file_drop_events_map_to_messages() {
        let dropped = iced::Event::Window(iced::window::Event::FileDropped(PathBuf::from("a.png")));
        assert!(matches!(
            file_drop_event(dropped, iced::event::Status::Ignored, iced::window::Id::unique()),
            Some(Message::FileDropped(p)) if p == PathBuf::from("a.png")
        ));
        let left = iced::Event::Window(iced::window::Event::FilesHoveredLeft);
        assert!(matches!(
            file_drop_event(left, iced::event::Status::Ignored, iced::window::Id::unique()),
            Some(Message::FileHovered(false))
        ));
    }
}
