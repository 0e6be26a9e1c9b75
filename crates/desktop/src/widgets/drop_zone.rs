use iced::widget::{button, column, container, text, Space};
use iced::{Color, Element, Length, Theme};

use facetone_core::shared::constants::IMAGE_EXTENSIONS;

use crate::app::{scaled, Message};
use crate::theme::surface_color;

/// Target area for dropped image files, with a browse button as fallback.
///
/// `hovered` is driven by window file-hover events, so the highlight shows
/// while a file is dragged anywhere over the window.
pub fn view(fs: f32, theme: &Theme, hovered: bool) -> Element<'static, Message> {
    let palette = theme.extended_palette();
    let accent = palette.primary.base.color;
    let muted = crate::theme::muted_text(theme);
    let surface = surface_color(theme);
    let idle_border = Color {
        a: 0.25,
        ..palette.background.base.text
    };

    let formats = IMAGE_EXTENSIONS
        .iter()
        .map(|ext| ext.to_uppercase())
        .collect::<Vec<_>>()
        .join(", ");

    let inner = column![
        text(if hovered {
            "Release to analyze"
        } else {
            "Drop an image here"
        })
        .size(scaled(18.0, fs))
        .font(iced::Font {
            weight: iced::font::Weight::Bold,
            ..iced::Font::DEFAULT
        }),
        Space::new().height(6),
        text("or pick one from your computer")
            .size(scaled(14.0, fs))
            .color(muted),
        Space::new().height(16),
        button(text("Browse Files").size(scaled(14.0, fs)))
            .on_press(Message::SelectImage)
            .style(button::primary)
            .padding([8, 20]),
        Space::new().height(12),
        text(formats).size(scaled(12.0, fs)).color(muted),
    ]
    .align_x(iced::Alignment::Center);

    container(inner)
        .width(Length::Fill)
        .padding([scaled(32.0, fs) as u16, 24])
        .center_x(Length::Fill)
        .style(move |_theme: &Theme| container::Style {
            background: Some(iced::Background::Color(if hovered {
                Color { a: 0.08, ..accent }
            } else {
                surface
            })),
            border: iced::border::Border {
                color: if hovered {
                    Color { a: 0.6, ..accent }
                } else {
                    idle_border
                },
                width: 2.0,
                radius: 14.0.into(),
            },
            ..container::Style::default()
        })
        .into()
}
