use iced::color;
use iced::theme::Palette;
use iced::{Color, Theme};

use crate::settings::Appearance;

/// Builds the app theme for the chosen appearance.
pub fn resolve_theme(appearance: Appearance, high_contrast: bool) -> Theme {
    let dark = match appearance {
        Appearance::Dark => true,
        Appearance::Light => false,
        Appearance::System => system_prefers_dark(),
    };

    let palette = match (dark, high_contrast) {
        (true, false) => Palette {
            background: color!(0x17, 0x19, 0x1d),
            text: color!(0xd4, 0xd6, 0xda),
            primary: color!(0xf2, 0x9e, 0x4c),
            success: color!(0x4c, 0xc9, 0x7a),
            warning: color!(0xf5, 0xc5, 0x42),
            danger: color!(0xef, 0x5b, 0x5b),
        },
        (false, false) => Palette {
            background: color!(0xf7, 0xf6, 0xf3),
            text: color!(0x22, 0x23, 0x26),
            primary: color!(0xd9, 0x73, 0x1f),
            success: color!(0x2f, 0x9e, 0x5a),
            warning: color!(0xc7, 0x8a, 0x00),
            danger: color!(0xd0, 0x3a, 0x3a),
        },
        (true, true) => Palette {
            background: color!(0x00, 0x00, 0x00),
            text: color!(0xff, 0xff, 0xff),
            primary: color!(0xff, 0xb3, 0x47),
            success: color!(0x5c, 0xe0, 0x8a),
            warning: color!(0xff, 0xd6, 0x0a),
            danger: color!(0xff, 0x6b, 0x6b),
        },
        (false, true) => Palette {
            background: color!(0xff, 0xff, 0xff),
            text: color!(0x00, 0x00, 0x00),
            primary: color!(0x9a, 0x45, 0x00),
            success: color!(0x1c, 0x6e, 0x3a),
            warning: color!(0x8a, 0x55, 0x00),
            danger: color!(0xb0, 0x00, 0x10),
        },
    };

    Theme::custom("Facetone", palette)
}

/// Slightly raised background for cards and the drop zone.
pub fn surface_color(theme: &Theme) -> Color {
    let palette = theme.extended_palette();
    if palette.is_dark {
        Color { a: 0.04, ..Color::WHITE }
    } else {
        Color { a: 0.03, ..Color::BLACK }
    }
}

/// De-emphasised text for hints and captions.
pub fn muted_text(theme: &Theme) -> Color {
    Color {
        a: 0.6,
        ..theme.palette().text
    }
}

#[cfg(target_os = "macos")]
fn system_prefers_dark() -> bool {
    std::process::Command::new("defaults")
        .args(["read", "-g", "AppleInterfaceStyle"])
        .output()
        .map(|o| {
            String::from_utf8_lossy(&o.stdout)
                .trim()
                .eq_ignore_ascii_case("dark")
        })
        .unwrap_or(true)
}

#[cfg(target_os = "windows")]
fn system_prefers_dark() -> bool {
    // AppsUseLightTheme is 0x0 in dark mode.
    std::process::Command::new("reg")
        .args([
            "query",
            r"HKCU\Software\Microsoft\Windows\CurrentVersion\Themes\Personalize",
            "/v",
            "AppsUseLightTheme",
        ])
        .output()
        .map(|o| String::from_utf8_lossy(&o.stdout).contains("0x0"))
        .unwrap_or(true)
}

#[cfg(not(any(target_os = "macos", target_os = "windows")))]
fn system_prefers_dark() -> bool {
    true
}
