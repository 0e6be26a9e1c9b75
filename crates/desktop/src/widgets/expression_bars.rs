use iced::widget::{column, progress_bar, row, text};
use iced::{Element, Length};

use facetone_core::expression::domain::expression::ExpressionBreakdown;

use crate::app::{scaled, Message};

/// One labelled bar per expression, in the breakdown's order.
pub fn view<'a>(breakdown: &ExpressionBreakdown, fs: f32) -> Element<'a, Message> {
    column(breakdown.entries().iter().map(|&(expression, pct)| {
        row![
            text(expression.label())
                .size(scaled(13.0, fs))
                .width(Length::Fixed(scaled(84.0, fs))),
            progress_bar(0.0..=100.0, pct.clamp(0.0, 100.0) as f32),
            text(format!("{pct:.2}%"))
                .size(scaled(13.0, fs))
                .width(Length::Fixed(scaled(64.0, fs))),
        ]
        .spacing(10)
        .align_y(iced::Alignment::Center)
        .into()
    }))
    .spacing(6)
    .into()
}
