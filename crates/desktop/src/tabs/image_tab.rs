use iced::widget::{button, column, container, image, row, text, text_input, Space};
use iced::{Element, Length, Theme};

use facetone_core::analysis::analyze_image_use_case::ImageAnalysis;

use crate::app::{scaled, Message};
use crate::widgets::{drop_zone, expression_bars};
use crate::workers::image_worker::ImageResult;

#[derive(Debug, Clone, PartialEq)]
pub enum ImageStatus {
    Idle,
    Working(Option<(u64, u64)>),
    Failed(String),
    Done,
}

pub struct ImageState {
    pub status: ImageStatus,
    pub url: String,
    pub preview: Option<image::Handle>,
    pub analysis: Option<ImageAnalysis>,
    pub source_label: Option<String>,
}

impl Default for ImageState {
    fn default() -> Self {
        Self {
            status: ImageStatus::Idle,
            url: String::new(),
            preview: None,
            analysis: None,
            source_label: None,
        }
    }
}

impl ImageState {
    pub fn is_working(&self) -> bool {
        matches!(self.status, ImageStatus::Working(_))
    }

    pub fn begin(&mut self, label: String) {
        self.status = ImageStatus::Working(None);
        self.preview = None;
        self.analysis = None;
        self.source_label = Some(label);
    }

    pub fn finish(&mut self, result: ImageResult) {
        self.preview = Some(image::Handle::from_rgba(
            result.width,
            result.height,
            result.rgba,
        ));
        self.analysis = Some(result.analysis);
        self.status = ImageStatus::Done;
    }
}

pub fn view<'a>(
    state: &'a ImageState,
    fs: f32,
    theme: &Theme,
    drop_hovered: bool,
) -> Element<'a, Message> {
    let busy = state.is_working();

    let url_row = row![
        text_input("or paste an image URL", &state.url)
            .on_input(Message::ImageUrlChanged)
            .on_submit(Message::AnalyzeUrl)
            .size(scaled(13.0, fs))
            .padding(8),
        button(text("Analyze").size(scaled(13.0, fs)))
            .on_press_maybe((!busy && !state.url.trim().is_empty()).then_some(Message::AnalyzeUrl))
            .padding([8, 16]),
    ]
    .spacing(8)
    .align_y(iced::Alignment::Center);

    let mut content = column![
        drop_zone::view(fs, theme, drop_hovered),
        Space::new().height(12),
        url_row,
        Space::new().height(16),
    ]
    .spacing(0);

    if let Some(label) = &state.source_label {
        content = content.push(
            text(label.as_str())
                .size(scaled(12.0, fs))
                .color(crate::theme::muted_text(theme)),
        );
        content = content.push(Space::new().height(8));
    }

    match &state.status {
        ImageStatus::Idle | ImageStatus::Done => {}
        ImageStatus::Working(Some((downloaded, total))) if *total > 0 => {
            content = content.push(
                text(format!("Downloading models\u{2026} {}%", downloaded * 100 / total))
                    .size(scaled(13.0, fs)),
            );
        }
        ImageStatus::Working(_) => {
            content = content.push(text("Analyzing\u{2026}").size(scaled(13.0, fs)));
        }
        ImageStatus::Failed(error) => {
            content = content.push(
                text(error.as_str())
                    .size(scaled(13.0, fs))
                    .style(text::danger),
            );
        }
    }

    if let Some(handle) = &state.preview {
        content = content.push(
            container(image(handle.clone()).width(Length::Fill))
                .max_height(320.0)
                .center_x(Length::Fill),
        );
        content = content.push(Space::new().height(12));
    }

    match &state.analysis {
        None => {}
        Some(ImageAnalysis::NoFaceDetected) => {
            content = content.push(text("No face detected.").size(scaled(15.0, fs)));
        }
        Some(ImageAnalysis::Faces { faces, primary }) => {
            content = content.push(text("Detected Expressions").size(scaled(16.0, fs)));
            content = content.push(Space::new().height(8));
            content = content.push(expression_bars::view(primary, fs));
            if faces.len() > 1 {
                content = content.push(Space::new().height(6));
                content = content.push(
                    text(format!(
                        "{} faces found; showing the most confident one.",
                        faces.len()
                    ))
                    .size(scaled(12.0, fs)),
                );
            }
        }
    }

    content.into()
}
