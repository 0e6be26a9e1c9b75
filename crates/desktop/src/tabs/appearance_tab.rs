use iced::widget::{button, checkbox, column, container, radio, row, slider, text, Space};
use iced::{Element, Length};

use crate::app::{scaled, Message};
use crate::settings::{Appearance, Settings};

pub fn view(settings: &Settings) -> Element<'_, Message> {
    let fs = settings.font_scale;

    let modes = Appearance::ALL.iter().fold(row![].spacing(20), |modes, &mode| {
        modes.push(
            radio(
                mode.to_string(),
                mode,
                Some(settings.appearance),
                Message::AppearanceChanged,
            )
            .text_size(scaled(13.0, fs)),
        )
    });

    let sample = container(
        column![
            text("Summary of Expressions").size(scaled(16.0, fs)),
            text("happy: 66.67%").size(scaled(13.0, fs)),
            text("sad: 33.33%").size(scaled(13.0, fs)),
        ]
        .spacing(4),
    )
    .padding(12)
    .width(Length::Fill)
    .style(container::bordered_box);

    column![
        text("Theme").size(scaled(16.0, fs)),
        Space::new().height(10),
        modes,
        Space::new().height(12),
        checkbox(settings.high_contrast)
            .label("Increase contrast")
            .on_toggle(Message::HighContrastChanged)
            .text_size(scaled(13.0, fs)),
        Space::new().height(24),
        text("Text size").size(scaled(16.0, fs)),
        Space::new().height(10),
        row![
            text("A").size(scaled(11.0, fs)),
            slider(0.8..=1.5, settings.font_scale, Message::FontScaleChanged).step(0.05),
            text("A").size(scaled(18.0, fs)),
            button(text("Reset").size(scaled(12.0, fs)))
                .on_press_maybe(
                    ((settings.font_scale - 1.0).abs() > f32::EPSILON)
                        .then_some(Message::FontScaleChanged(1.0))
                )
                .style(button::text),
        ]
        .spacing(10)
        .align_y(iced::Alignment::Center),
        Space::new().height(16),
        sample,
    ]
    .into()
}
