use iced::widget::{button, column, row, slider, text, text_input, Space};
use iced::Element;

use crate::app::{scaled, Message};
use crate::settings::{Settings, MAX_TICK_INTERVAL_MS, MIN_TICK_INTERVAL_MS};

pub fn view(settings: &Settings) -> Element<'_, Message> {
    let fs = settings.font_scale;

    column![
        text("Detection").size(scaled(16.0, fs)),
        Space::new().height(8),
        row![
            text("Confidence").size(scaled(13.0, fs)),
            slider(5..=95, settings.confidence, Message::ConfidenceChanged),
            text(format!("{}%", settings.confidence)).size(scaled(13.0, fs)),
        ]
        .spacing(12)
        .align_y(iced::Alignment::Center),
        text("Faces scoring below this are ignored.").size(scaled(12.0, fs)),
        Space::new().height(20),
        text("Camera").size(scaled(16.0, fs)),
        Space::new().height(8),
        row![
            text("Analyze every").size(scaled(13.0, fs)),
            slider(
                MIN_TICK_INTERVAL_MS..=MAX_TICK_INTERVAL_MS,
                settings.tick_interval_ms,
                Message::TickIntervalChanged
            ),
            text(format!("{} ms", settings.tick_interval_ms)).size(scaled(13.0, fs)),
        ]
        .spacing(12)
        .align_y(iced::Alignment::Center),
        Space::new().height(12),
        row![
            text("Device").size(scaled(13.0, fs)),
            text_input("camera device", &settings.camera_device)
                .on_input(Message::CameraDeviceChanged)
                .size(scaled(13.0, fs))
                .padding(6),
        ]
        .spacing(12)
        .align_y(iced::Alignment::Center),
        text("Changes apply to the next session.").size(scaled(12.0, fs)),
        Space::new().height(24),
        button(text("Restore Defaults").size(scaled(13.0, fs)))
            .on_press(Message::RestoreDefaults)
            .padding([6, 14]),
    ]
    .spacing(0)
    .into()
}
