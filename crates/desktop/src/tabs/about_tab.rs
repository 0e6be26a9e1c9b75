use iced::widget::{button, column, text, Space};
use iced::Element;

use crate::app::{scaled, Message};

pub const DETECTOR_CREDIT_URL: &str = "https://github.com/ultralytics/ultralytics";
pub const EXPRESSION_CREDIT_URL: &str =
    "https://github.com/onnx/models/tree/main/validated/vision/body_analysis/emotion_ferplus";

pub fn view(fs: f32) -> Element<'static, Message> {
    let version = env!("CARGO_PKG_VERSION");

    column![
        text("Facetone").size(scaled(22.0, fs)),
        Space::new().height(4),
        text(format!("Version {version}")).size(scaled(13.0, fs)),
        Space::new().height(12),
        text(
            "Reads facial expressions from your camera or from still images. \
             All analysis runs on this computer; the only network access is the \
             one-time model download and images you load by URL."
        )
        .size(scaled(13.0, fs)),
        Space::new().height(20),
        text("Models").size(scaled(16.0, fs)),
        Space::new().height(8),
        text("Face detection: YOLO11n-pose fine-tuned on WIDER FACE").size(scaled(13.0, fs)),
        button(text("Ultralytics").size(scaled(12.0, fs)))
            .on_press(Message::OpenLink(DETECTOR_CREDIT_URL))
            .style(button::text),
        Space::new().height(8),
        text("Expression recognition: FER+ (ONNX Model Zoo, MIT)").size(scaled(13.0, fs)),
        button(text("emotion_ferplus").size(scaled(12.0, fs)))
            .on_press(Message::OpenLink(EXPRESSION_CREDIT_URL))
            .style(button::text),
    ]
    .spacing(0)
    .into()
}
