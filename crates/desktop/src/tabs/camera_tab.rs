use std::collections::VecDeque;

use iced::widget::{button, column, container, image, row, scrollable, text, Space};
use iced::{Element, Length};

use facetone_core::analysis::capture_session::SessionSummary;

use crate::app::{scaled, Message};
use crate::widgets::expression_bars;
use crate::workers::session_worker::PreviewFrame;

const LOG_CAPACITY: usize = 200;

#[derive(Debug, Clone, PartialEq)]
pub enum CameraStatus {
    Idle,
    /// Waiting for models; carries download progress when known.
    Loading(Option<(u64, u64)>),
    Running(String),
    Stopping,
}

/// Everything the Camera tab shows.
pub struct CameraState {
    pub status: CameraStatus,
    pub preview: Option<image::Handle>,
    pub log: VecDeque<String>,
    pub summary: Option<SessionSummary>,
    pub error: Option<String>,
}

impl Default for CameraState {
    fn default() -> Self {
        Self {
            status: CameraStatus::Idle,
            preview: None,
            log: VecDeque::with_capacity(LOG_CAPACITY),
            summary: None,
            error: None,
        }
    }
}

impl CameraState {
    pub fn is_active(&self) -> bool {
        self.status != CameraStatus::Idle
    }

    /// Clears the previous session's output.
    pub fn begin(&mut self) {
        *self = Self {
            status: CameraStatus::Loading(None),
            ..Self::default()
        };
    }

    pub fn show_frame(&mut self, frame: PreviewFrame) {
        let line = match frame.dominant {
            Some(expression) => format!("Frame {}: {expression}", frame.index),
            None if frame.faces == 0 => format!("Frame {}: no face", frame.index),
            None => format!("Frame {}: undetermined", frame.index),
        };
        self.push_log(line);
        self.preview = Some(image::Handle::from_rgba(
            frame.width,
            frame.height,
            frame.rgba,
        ));
    }

    pub fn push_log(&mut self, line: String) {
        if self.log.len() == LOG_CAPACITY {
            self.log.pop_front();
        }
        self.log.push_back(line);
    }
}

pub fn view(state: &CameraState, fs: f32) -> Element<'_, Message> {
    let (label, action) = match &state.status {
        CameraStatus::Idle => ("Start", Some(Message::StartCamera)),
        CameraStatus::Loading(_) | CameraStatus::Running(_) => ("Stop", Some(Message::StopCamera)),
        CameraStatus::Stopping => ("Stopping\u{2026}", None),
    };
    let control = button(text(label).size(scaled(14.0, fs)))
        .on_press_maybe(action)
        .style(button::primary)
        .padding([8, 24]);

    let status_line = match &state.status {
        CameraStatus::Idle => String::new(),
        CameraStatus::Loading(Some((downloaded, total))) if *total > 0 => {
            format!("Downloading models\u{2026} {}%", downloaded * 100 / total)
        }
        CameraStatus::Loading(_) => "Loading models\u{2026}".to_string(),
        CameraStatus::Running(source) => format!("Analyzing {source}"),
        CameraStatus::Stopping => "Finishing session\u{2026}".to_string(),
    };

    let mut content = column![
        row![control, text(status_line).size(scaled(13.0, fs))]
            .spacing(12)
            .align_y(iced::Alignment::Center),
        Space::new().height(12),
    ]
    .spacing(0);

    if let Some(error) = &state.error {
        content = content.push(
            text(format!("Camera error: {error}"))
                .size(scaled(13.0, fs))
                .style(text::danger),
        );
        content = content.push(Space::new().height(12));
    }

    if let Some(handle) = &state.preview {
        content = content.push(
            container(image(handle.clone()).width(Length::Fill))
                .max_height(360.0)
                .center_x(Length::Fill),
        );
        content = content.push(Space::new().height(12));
    }

    if !state.log.is_empty() {
        let lines = column(
            state
                .log
                .iter()
                .rev()
                .map(|line| text(line.as_str()).size(scaled(12.0, fs)).into()),
        )
        .spacing(2);
        content = content.push(
            container(scrollable(lines).height(Length::Fixed(140.0)))
                .padding(8)
                .width(Length::Fill)
                .style(container::bordered_box),
        );
        content = content.push(Space::new().height(16));
    }

    if let Some(summary) = &state.summary {
        content = content.push(summary_view(summary, fs));
    }

    content.into()
}

fn summary_view(summary: &SessionSummary, fs: f32) -> Element<'_, Message> {
    let body: Element<'_, Message> = if summary.breakdown.is_empty() {
        text("No expressions recorded.").size(scaled(13.0, fs)).into()
    } else {
        expression_bars::view(&summary.breakdown, fs)
    };

    column![
        text("Summary of Expressions").size(scaled(16.0, fs)),
        Space::new().height(8),
        body,
        Space::new().height(8),
        text(format!(
            "{} frames analyzed, {} with a face, {:.1}s",
            summary.frames_analyzed,
            summary.frames_with_face,
            summary.duration.as_secs_f64()
        ))
        .size(scaled(12.0, fs)),
    ]
    .spacing(0)
    .into()
}
